use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use latmetrics_common::{ErrorResponse, HealthResponse, LatMetricsError, MetricsRequest};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod aggregator;
pub mod config;
pub mod dataset;
pub mod loader;
pub mod numeric;

use config::MAX_BODY_BYTES;
use dataset::{Dataset, LoadMode};
use loader::RegionIndex;

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Periodic snapshot refresh; only honoured in `LoadMode::Startup`.
    pub reload_interval: Option<Duration>,
}

/// LatMetrics Server
pub struct Server {
    config: ServerConfig,
    dataset: Arc<Dataset>,
}

impl Server {
    /// Create a new server serving `dataset` with the given configuration
    pub fn new(config: ServerConfig, dataset: Arc<Dataset>) -> Self {
        Self { config, dataset }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Create the application router with the given state
    pub fn create_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::POST])
            .allow_headers(Any);

        Router::new()
            .route("/", post(handle_metrics).fallback(handle_method_not_allowed))
            .route("/health", get(handle_health).fallback(handle_method_not_allowed))
            .fallback(handle_not_found)
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let reloader = match (self.config.reload_interval, self.dataset.mode()) {
            (Some(interval), LoadMode::Startup) => Some(self.dataset.spawn_reloader(interval)),
            (Some(_), LoadMode::PerRequest) => {
                tracing::warn!("reload interval ignored: dataset is read on every request");
                None
            }
            (None, _) => None,
        };

        let app = Self::create_router(AppState::new(self.dataset));
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "listening");
        ready_tx.send(local_addr).ok();
        let served = axum::serve(listener, app).await;

        if let Some(handle) = reloader {
            handle.abort();
        }
        served?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Body decode failures are 422; buffering failures (e.g. over the body limit) keep
/// the status axum assigns.
fn rejection_response(rejection: JsonRejection) -> Response {
    let status = match rejection {
        JsonRejection::JsonDataError(_)
        | JsonRejection::JsonSyntaxError(_)
        | JsonRejection::MissingJsonContentType(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ref other => other.status(),
    };
    let err = LatMetricsError::InvalidRequest(rejection.body_text());
    error_response(status, err.to_string())
}

/// Fetch the index for one request. Per-request loads touch the filesystem, so they run
/// on the blocking pool.
async fn current_snapshot(state: &AppState) -> Result<Arc<RegionIndex>, LatMetricsError> {
    match state.dataset.mode() {
        LoadMode::Startup => state.dataset.snapshot(),
        LoadMode::PerRequest => {
            let dataset = Arc::clone(&state.dataset);
            tokio::task::spawn_blocking(move || dataset.snapshot())
                .await
                .map_err(|e| LatMetricsError::DataUnavailable(format!("load task failed: {}", e)))?
        }
    }
}

/// Handler for POST / — returns the per-region summary for the requested regions.
/// Unknown regions are left out of the response rather than rejected.
pub async fn handle_metrics(
    State(state): State<AppState>,
    payload: Result<Json<MetricsRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => return rejection_response(rejection),
    };

    let index = match current_snapshot(&state).await {
        Ok(index) => index,
        Err(err) => {
            tracing::error!(error = %err, "cannot serve metrics request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    let result = aggregator::aggregate(&index, &request.regions, request.threshold_ms);
    (StatusCode::OK, Json(result)).into_response()
}

/// Handler for GET /health — reports snapshot size, or 503 if the dataset cannot be read.
pub async fn handle_health(State(state): State<AppState>) -> Response {
    match current_snapshot(&state).await {
        Ok(index) => Json(HealthResponse {
            status: "ok".to_string(),
            regions: index.len(),
            samples: index.sample_count(),
        })
        .into_response(),
        Err(err) => error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
    }
}

/// Fallback for a known path hit with an unsupported method.
pub async fn handle_method_not_allowed(method: Method) -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, format!("Method not allowed: {}", method))
}

/// Fallback for unknown paths.
pub async fn handle_not_found(uri: Uri) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Not found: {}", uri.path()))
}
