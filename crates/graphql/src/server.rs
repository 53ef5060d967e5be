//! GraphQL HTTP server.

use std::future::Future;
use std::time::Duration;

use async_graphql::http::GraphiQLSource;
use async_graphql::{Response, ServerError};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use tracing::{info, warn};

use crate::types::WaypointSchema;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_playground: bool,
    /// Upper bound on the execution of one GraphQL request.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            enable_playground: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
struct AppState {
    schema: WaypointSchema,
    request_timeout: Duration,
}

/// Build the HTTP router serving `schema`.
pub fn router(schema: WaypointSchema, config: &ServerConfig) -> Router {
    let mut app = Router::new().route("/health", get(health_check));

    app = if config.enable_playground {
        app.route("/graphql", get(graphql_playground).post(graphql_handler))
            .route("/", get(graphql_playground))
    } else {
        app.route("/graphql", axum::routing::post(graphql_handler))
    };

    app.with_state(AppState {
        schema,
        request_timeout: config.request_timeout,
    })
}

/// Start the GraphQL server.
pub async fn serve(schema: WaypointSchema, config: ServerConfig) -> Result<(), std::io::Error> {
    serve_with_shutdown(schema, config, std::future::pending()).await
}

/// Start the GraphQL server with graceful shutdown support.
pub async fn serve_with_shutdown<F>(
    schema: WaypointSchema,
    config: ServerConfig,
    shutdown_signal: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(schema, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("⚡ GraphQL server listening on http://{}/graphql", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

/// GraphQL query handler.
///
/// Dropping the execution future on timeout drops any open storage
/// snapshot with it, rolling the transaction back.
async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    match tokio::time::timeout(state.request_timeout, state.schema.execute(req.into_inner())).await
    {
        Ok(response) => response.into(),
        Err(_) => {
            warn!(timeout = ?state.request_timeout, "GraphQL request timed out");
            Response::from_errors(vec![ServerError::new("Request timed out", None)]).into()
        }
    }
}

/// GraphQL Playground UI.
async fn graphql_playground() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
