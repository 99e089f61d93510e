//! HTTP server
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service name, version and endpoint map |
//! | `GET`  | `/health` | Backend reachability and index size |
//! | `POST` | `/api/v1/ask` | Answer a question with citations and metrics |
//! | `GET`  | `/api/v1/metrics` | Aggregate statistics and recent requests |
//!
//! All origins, methods and headers are permitted.

use crate::schema::{ApiError, AskRequest, HealthResponse, MetricsResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use microrag_core::pipeline::{AnswerPipeline, PipelineAnswer};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Entries returned in `recent_requests`
const RECENT_REQUESTS_LIMIT: usize = 10;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnswerPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<AnswerPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Build the router with CORS, request tracing and panic recovery
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/v1/ask", post(handle_ask))
        .route("/api/v1/metrics", get(handle_metrics))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `bind` and serve until Ctrl-C
pub async fn start_server(pipeline: Arc<AnswerPipeline>, bind: &str) -> anyhow::Result<()> {
    let app = router(AppState::new(pipeline));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

async fn handle_root() -> Json<Value> {
    Json(json!({
        "service": "microrag",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "ask": "/api/v1/ask",
            "metrics": "/api/v1/metrics"
        }
    }))
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, llm_status) = if state.pipeline.backend_healthy().await {
        ("healthy", "healthy")
    } else {
        tracing::error!(
            model = state.pipeline.llm_model(),
            "Generation backend health check failed"
        );
        ("degraded", "unhealthy")
    };

    Json(HealthResponse {
        status: status.to_string(),
        llm_status: llm_status.to_string(),
        documents_indexed: state.pipeline.documents_indexed(),
        embedding_model: state.pipeline.embedding_model().to_string(),
        timestamp: Utc::now(),
    })
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<PipelineAnswer>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    let top_k = request.validate()?;

    let answer = state.pipeline.answer(&request.question, top_k).await?;
    Ok(Json(answer))
}

async fn handle_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    let metrics = state.pipeline.metrics();
    Json(MetricsResponse {
        statistics: metrics.statistics(),
        recent_requests: metrics.recent(RECENT_REQUESTS_LIMIT),
        timestamp: Utc::now(),
    })
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(error = detail, "Unhandled exception");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_server_error",
            "message": "An unexpected error occurred"
        })),
    )
        .into_response()
}
