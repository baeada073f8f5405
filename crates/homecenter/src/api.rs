use std::net::AddrParseError;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::bridge::ConfigEntries;
use crate::engine::Host;
use crate::error::CommandError;

/// Response for the /v1/ping endpoint
#[derive(Serialize)]
struct PingResponse {
    status: String,
}

/// Response for the /v1/info endpoint
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    hostname: String,
    entries: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    version: &'static str,
    entries: Arc<ConfigEntries>,
}

impl AppState {
    pub fn new(entries: Arc<ConfigEntries>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            entries,
        }
    }
}

/// A failed request, rendered as `{"error": ...}`.
struct ApiError(StatusCode, String);

impl From<CommandError> for ApiError {
    fn from(error: CommandError) -> Self {
        let status = match &error {
            CommandError::UnknownEntity(_) => StatusCode::NOT_FOUND,
            CommandError::Unsupported { .. } | CommandError::InvalidArgument(_) => {
                StatusCode::BAD_REQUEST
            }
            CommandError::Rejected(_) => StatusCode::BAD_GATEWAY,
            CommandError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            CommandError::ChannelGone(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorResponse { error: self.1 })).into_response()
    }
}

/// Handler for GET /v1/ping
#[tracing::instrument]
async fn ping() -> impl IntoResponse {
    tracing::debug!("Handling /v1/ping request");
    (
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    )
}

/// Handler for GET /v1/info
#[tracing::instrument(skip(state))]
async fn info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::debug!("Handling /v1/info request");

    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    (
        StatusCode::OK,
        Json(InfoResponse {
            version: state.version.to_string(),
            hostname,
            entries: state.entries.entry_ids().await,
        }),
    )
}

/// Handler for GET /v1/states
#[tracing::instrument(skip(state))]
async fn list_states(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.entries.host().states())
}

/// Handler for GET /v1/states/:entity_id
#[tracing::instrument(skip(state))]
async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(entity_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .entries
        .host()
        .get_state(&entity_id)
        .map(Json)
        .ok_or_else(|| {
            ApiError(
                StatusCode::NOT_FOUND,
                format!("no state for '{}'", entity_id),
            )
        })
}

/// Handler for POST /v1/services/:domain/:service
#[tracing::instrument(skip(state, data))]
async fn call_service(
    State(state): State<Arc<AppState>>,
    Path((domain, service)): Path<(String, String)>,
    Json(data): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .entries
        .call_service(&domain, &service, &data)
        .await?;
    Ok((
        StatusCode::OK,
        Json(PingResponse {
            status: "ok".to_string(),
        }),
    ))
}

/// Create the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/ping", get(ping))
        .route("/v1/info", get(info))
        .route("/v1/states", get(list_states))
        .route("/v1/states/:entity_id", get(get_state))
        .route("/v1/services/:domain/:service", post(call_service))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("invalid listen address: {0}")]
    Address(#[from] AddrParseError),

    #[error("HTTP server failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the HTTP API server
///
/// Binds to `listen:port` and serves until `shutdown_rx` fires.
pub async fn serve(
    listen: String,
    port: u16,
    entries: Arc<ConfigEntries>,
    shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> Result<(), ServeError> {
    let app = create_router(Arc::new(AppState::new(entries)));

    let addr: SocketAddr = format!("{}:{}", listen, port).parse()?;
    tracing::info!("Starting HTTP API server on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            tracing::info!("HTTP API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
