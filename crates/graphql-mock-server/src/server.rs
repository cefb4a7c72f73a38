//! HTTP front of the mock server
//!
//! Serves GraphQL over HTTP on a single path. `POST` takes a JSON body and
//! `GET` takes URL query parameters. Browsers asking for HTML get GraphiQL.

use std::{
    collections::HashMap,
    future::Future,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
};

use apollo_compiler::ast::OperationType;
use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT, ALLOW, CONTENT_TYPE},
    },
    response::{Html, IntoResponse},
    routing::get,
};
use bon::bon;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::{
    cors::CorsConfig,
    errors::ServerError,
    graphql::{Error, Request, Response},
    health::{self, HealthCheckConfig},
    mock::MockedSchema,
};

pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_PATH: &str = "/graphql";

const GRAPHIQL_HTML: &str = include_str!("../assets/graphiql.html");

const GRAPHQL_RESPONSE_JSON: &str = "application/graphql-response+json";
const APPLICATION_JSON: &str = "application/json";

/// A GraphQL server answering every operation with mock data
pub struct Server {
    schema: Arc<MockedSchema>,
    address: IpAddr,
    port: u16,
    path: String,
    graphiql: bool,
    cors: CorsConfig,
    health_check: HealthCheckConfig,
}

#[bon]
impl Server {
    #[builder]
    pub fn new(
        schema: Arc<MockedSchema>,
        #[builder(default = DEFAULT_ADDRESS)] address: IpAddr,
        #[builder(default = DEFAULT_PORT)] port: u16,
        #[builder(into, default = DEFAULT_PATH.to_string())] path: String,
        #[builder(default = true)] graphiql: bool,
        #[builder(default)] cors: CorsConfig,
        #[builder(default)] health_check: HealthCheckConfig,
    ) -> Self {
        let health_check = HealthCheckConfig {
            path: absolute_path(health_check.path),
            ..health_check
        };
        Self {
            schema,
            address,
            port,
            path: absolute_path(path),
            graphiql,
            cors,
            health_check,
        }
    }

    /// The socket address the server listens on
    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    pub fn router(&self) -> Result<Router, ServerError> {
        let state = AppState {
            schema: self.schema.clone(),
            graphiql: self.graphiql,
        };

        let mut router = Router::new()
            .route(&self.path, get(graphql_get).post(graphql_post))
            .with_state(state);

        if self.health_check.enabled {
            if self.health_check.path == self.path {
                warn!(
                    path = %self.path,
                    "Health check path is the GraphQL path, not serving health checks"
                );
            } else {
                router = router.route(&self.health_check.path, get(health::health));
            }
        }

        router = router.layer(TraceLayer::new_for_http());
        if self.cors.enabled {
            router = router.layer(self.cors.clone().into_layer()?);
        }
        Ok(router)
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let address = self.socket_address();
        TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.router()?;
        let port = listener
            .local_addr()
            .map(|address| address.port())
            .unwrap_or(self.port);

        info!(
            "GraphQL Server is listening on http://localhost:{port}{}",
            self.path
        );
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(ServerError::Serve)
    }

    /// Bind and serve until the process is asked to stop
    pub async fn start(self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }
}

/// Routes must start with a slash
fn absolute_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Resolves on CTRL+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            error!(%error, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                error!(%error, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down GraphQL server");
}

#[derive(Clone)]
struct AppState {
    schema: Arc<MockedSchema>,
    graphiql: bool,
}

/// Media type of GraphQL responses, negotiated from the `Accept` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    /// `application/graphql-response+json`: request errors get a 400
    GraphQLResponseJson,
    /// Legacy `application/json`: every GraphQL response is a 200
    Json,
}

impl ResponseFormat {
    fn from_headers(headers: &HeaderMap) -> Self {
        if accepts(headers, GRAPHQL_RESPONSE_JSON) {
            Self::GraphQLResponseJson
        } else {
            Self::Json
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::GraphQLResponseJson => GRAPHQL_RESPONSE_JSON,
            Self::Json => APPLICATION_JSON,
        }
    }

    fn status(self, response: &Response) -> StatusCode {
        match self {
            Self::GraphQLResponseJson if response.is_request_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::OK,
        }
    }
}

fn accepts(headers: &HeaderMap, media_type: &str) -> bool {
    headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|range| range.split(';').next())
        .any(|range| range.trim().eq_ignore_ascii_case(media_type))
}

async fn graphql_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    if state.graphiql && !params.contains_key("query") && accepts(&headers, "text/html") {
        return Html(GRAPHIQL_HTML).into_response();
    }

    let format = ResponseFormat::from_headers(&headers);
    let request = match Request::from_query_params(params) {
        Ok(request) => request,
        Err(error) => return bad_request(format, error),
    };
    let prepared = match state.schema.prepare(&request) {
        Ok(prepared) => prepared,
        Err(response) => return graphql_response(format, format.status(&response), &response),
    };

    if prepared.operation_type() == OperationType::Mutation {
        let response = Response::from_errors([Error::new(
            "Can only perform a mutation operation from a POST request.",
        )]);
        let mut http_response =
            graphql_response(format, StatusCode::METHOD_NOT_ALLOWED, &response);
        http_response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST"));
        return http_response;
    }

    let response = state.schema.execute_prepared(&prepared);
    graphql_response(format, format.status(&response), &response)
}

async fn graphql_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let format = ResponseFormat::from_headers(&headers);
    let request = match Request::from_body(&body) {
        Ok(request) => request,
        Err(error) => return bad_request(format, error),
    };

    let response = state.schema.execute(&request);
    graphql_response(format, format.status(&response), &response)
}

/// The request is not a GraphQL request at all
fn bad_request(format: ResponseFormat, error: Error) -> axum::response::Response {
    debug!(message = %error.message, "Rejected malformed GraphQL request");
    graphql_response(
        format,
        StatusCode::BAD_REQUEST,
        &Response::from_errors([error]),
    )
}

fn graphql_response(
    format: ResponseFormat,
    status: StatusCode,
    response: &Response,
) -> axum::response::Response {
    match serde_json::to_vec(response) {
        Ok(body) => (status, [(CONTENT_TYPE, format.content_type())], body).into_response(),
        Err(error) => {
            error!(%error, "Failed to serialize GraphQL response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tracing_test::traced_test;

    use super::*;
    use crate::{mock::MockOptions, schema::parse_schema};

    fn mocked_schema() -> Arc<MockedSchema> {
        let document = parse_schema("type Query { hello: String }", "schema.graphql").unwrap();
        Arc::new(MockedSchema::new(&document, MockOptions::default()).unwrap())
    }

    #[rstest]
    #[case("graphql", "health", "/graphql", "/health")]
    #[case("/api", "/status", "/api", "/status")]
    fn paths_without_a_leading_slash_are_made_absolute(
        #[case] path: &str,
        #[case] health_path: &str,
        #[case] expected_path: &str,
        #[case] expected_health_path: &str,
    ) {
        let server = Server::builder()
            .schema(mocked_schema())
            .path(path)
            .health_check(HealthCheckConfig {
                enabled: true,
                path: health_path.to_string(),
            })
            .build();

        assert_eq!(server.path, expected_path);
        assert_eq!(server.health_check.path, expected_health_path);
        assert!(server.router().is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn announces_the_listening_address() {
        let server = Server::builder()
            .schema(mocked_schema())
            .address(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .port(0)
            .build();
        let listener = server.bind().await.unwrap();
        let port = listener.local_addr().unwrap().port();

        server.serve(listener, async {}).await.unwrap();

        assert!(logs_contain(&format!(
            "GraphQL Server is listening on http://localhost:{port}/graphql"
        )));
    }

    fn accept(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(value));
        headers
    }

    #[rstest]
    #[case("application/graphql-response+json", ResponseFormat::GraphQLResponseJson)]
    #[case(
        "application/graphql-response+json;charset=utf-8, application/json;q=0.9",
        ResponseFormat::GraphQLResponseJson
    )]
    #[case("application/json", ResponseFormat::Json)]
    #[case("*/*", ResponseFormat::Json)]
    fn negotiates_response_format(#[case] header: &'static str, #[case] expected: ResponseFormat) {
        assert_eq!(ResponseFormat::from_headers(&accept(header)), expected);
    }

    #[test]
    fn missing_accept_header_means_json() {
        assert_eq!(
            ResponseFormat::from_headers(&HeaderMap::new()),
            ResponseFormat::Json
        );
    }

    #[test]
    fn request_errors_are_bad_requests_only_for_graphql_response_json() {
        let failed = Response::from_errors([Error::new("boom")]);
        let executed = Response::default();

        assert_eq!(
            ResponseFormat::GraphQLResponseJson.status(&failed),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ResponseFormat::Json.status(&failed), StatusCode::OK);
        assert_eq!(
            ResponseFormat::GraphQLResponseJson.status(&Response {
                data: Some(serde_json::json!({})),
                ..executed
            }),
            StatusCode::OK
        );
    }

    #[test]
    fn browsers_accept_html() {
        assert!(accepts(
            &accept("text/html,application/xhtml+xml,*/*;q=0.8"),
            "text/html"
        ));
        assert!(!accepts(&accept("application/json"), "text/html"));
    }
}
