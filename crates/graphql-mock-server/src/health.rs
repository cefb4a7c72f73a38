//! Liveness endpoint for container orchestrators and load balancers

use axum::{Json, http::StatusCode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Health status enumeration
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
}

/// Health response structure
#[derive(Debug, Serialize, PartialEq)]
pub struct Health {
    pub status: HealthStatus,
}

/// Configuration options for the health check component.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Set to false to disable the health check
    pub enabled: bool,

    /// Optionally set a custom healthcheck path
    /// Defaults to /health
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
        }
    }
}

/// A server that answers at all is up
pub async fn health() -> (StatusCode, Json<Health>) {
    (
        StatusCode::OK,
        Json(Health {
            status: HealthStatus::Up,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HealthCheckConfig::default();
        assert!(config.enabled);
        assert_eq!(config.path, "/health");
    }

    #[tokio::test]
    async fn reports_up() {
        let (status, Json(health)) = health().await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&health).unwrap(),
            serde_json::json!({"status": "UP"})
        );
    }
}
