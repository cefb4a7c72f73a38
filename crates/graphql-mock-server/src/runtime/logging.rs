//! Logging config and utilities
//!
//! This module is only used by the main binary and provides logging config structures and setup
//! helper functions

use std::{path::PathBuf, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer};
use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Logging related options
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(deserialize_with = "level_from_str")]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// A directory to write log files to instead of stdout
    pub path: Option<PathBuf>,

    /// Log file rotation period to use when log file path provided
    /// [default: Hourly]
    pub rotation: LogRotationKind,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            path: None,
            rotation: LogRotationKind::Hourly,
        }
    }
}

/// How often log files roll over
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub enum LogRotationKind {
    #[serde(alias = "minutely", alias = "MINUTELY")]
    Minutely,
    #[serde(alias = "hourly", alias = "HOURLY")]
    Hourly,
    #[serde(alias = "daily", alias = "DAILY")]
    Daily,
    #[serde(alias = "never", alias = "NEVER")]
    Never,
}

impl From<LogRotationKind> for Rotation {
    fn from(value: LogRotationKind) -> Self {
        match value {
            LogRotationKind::Minutely => Rotation::MINUTELY,
            LogRotationKind::Hourly => Rotation::HOURLY,
            LogRotationKind::Daily => Rotation::DAILY,
            LogRotationKind::Never => Rotation::NEVER,
        }
    }
}

fn level_from_str<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let level = String::deserialize(deserializer)?;
    Level::from_str(&level).map_err(serde::de::Error::custom)
}

impl Logging {
    /// `RUST_LOG` directives, with the configured level as the baseline
    pub fn env_filter(&self) -> Result<EnvFilter, anyhow::Error> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(self.level.into());

        // Per-request spans from the HTTP trace layer are only useful when debugging
        if self.level == Level::INFO {
            env_filter = env_filter.add_directive("tower_http=warn".parse()?);
        }
        Ok(env_filter)
    }

    /// Install the global subscriber.
    ///
    /// Logs go to a rolling file when `path` is set and to stdout otherwise. The returned
    /// guard must be held for as long as file logs should be flushed.
    pub fn setup(&self) -> Result<Option<WorkerGuard>, anyhow::Error> {
        let (writer, guard, with_ansi) = match self.file_appender() {
            Some(appender) => {
                let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);
                (BoxMakeWriter::new(non_blocking_appender), Some(guard), false)
            }
            None => (BoxMakeWriter::new(std::io::stdout), None, true),
        };

        tracing_subscriber::registry()
            .with(self.env_filter()?)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(with_ansi)
                    .with_target(false),
            )
            .try_init()?;

        Ok(guard)
    }

    /// A rolling appender in the configured directory, if any. Falls back to stdout on
    /// failure since logging is not yet available to report it.
    fn file_appender(&self) -> Option<RollingFileAppender> {
        let path = self.path.as_ref()?;
        let appender = std::fs::create_dir_all(path)
            .map_err(anyhow::Error::from)
            .and_then(|_| {
                RollingFileAppender::builder()
                    .rotation(self.rotation.into())
                    .filename_prefix("graphql_mock_server")
                    .filename_suffix("log")
                    .build(path)
                    .map_err(anyhow::Error::from)
            });

        match appender {
            Ok(appender) => Some(appender),
            Err(error) => {
                eprintln!("Log file setup failed - falling back to stdout: {error:?}");
                None
            }
        }
    }
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    // This is just an intermediate type to auto create schema information for,
    // so it is OK if it is never used
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}
