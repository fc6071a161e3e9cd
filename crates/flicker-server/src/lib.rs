//! HTTP front end for the oscillation engine.
//!
//! Thin JSON layer over [`flicker_core::OscillationEngine`]: context
//! lifecycle, ticking, metrics, entropy diagnostics, and session
//! export/import. All engine state lives in one shared [`OscillationEngine`];
//! the engine does its own locking, so handlers stay synchronous inside.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use flicker_core::{
    ContextConfig, EngineError, MetricsReport, OscillationEngine, PersistedContext, TickOutput,
};

/// Map engine errors onto HTTP status codes.
fn error_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::UnknownContext(_) => StatusCode::NOT_FOUND,
        EngineError::ContextExists(_) => StatusCode::CONFLICT,
        EngineError::AllSourcesFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::InvalidConfiguration { .. } | EngineError::BufferCapacityViolation { .. } => {
            StatusCode::BAD_REQUEST
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_err<T>(err: EngineError) -> ApiResult<T> {
    Err((
        error_status(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    ))
}

#[derive(Deserialize, Default)]
struct CreateContextRequest {
    /// Explicit context id; omitted means a UUID is generated.
    id: Option<String>,
    #[serde(default)]
    config: ContextConfig,
}

#[derive(Serialize)]
struct CreateContextResponse {
    context_id: String,
}

#[derive(Deserialize)]
struct TickParams {
    /// Attach a metrics snapshot to the tick response.
    metrics: Option<bool>,
}

#[derive(Serialize)]
struct TickResponse {
    #[serde(flatten)]
    output: TickOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<MetricsReport>,
}

#[derive(Deserialize)]
struct SelfTestParams {
    samples: Option<usize>,
}

async fn handle_health(State(engine): State<Arc<OscillationEngine>>) -> Json<serde_json::Value> {
    let status = engine.entropy_status();
    Json(serde_json::json!({
        "status": if status.quality_score > 0.0 { "healthy" } else { "starting" },
        "version": flicker_core::VERSION,
        "contexts": engine.context_ids().len(),
        "quality_score": status.quality_score,
    }))
}

async fn handle_entropy_status(
    State(engine): State<Arc<OscillationEngine>>,
) -> Json<flicker_core::EntropyStatus> {
    Json(engine.entropy_status())
}

async fn handle_selftest(
    State(engine): State<Arc<OscillationEngine>>,
    Query(params): Query<SelfTestParams>,
) -> ApiResult<flicker_core::SelfTestReport> {
    let samples = params.samples.unwrap_or(32).clamp(1, 4096);
    match engine.self_test(samples) {
        Ok(report) => Ok(Json(report)),
        Err(err) => api_err(err),
    }
}

async fn handle_create_context(
    State(engine): State<Arc<OscillationEngine>>,
    body: String,
) -> ApiResult<CreateContextResponse> {
    // An empty body means all defaults.
    let req: CreateContextRequest = if body.trim().is_empty() {
        CreateContextRequest::default()
    } else {
        match serde_json::from_str(&body) {
            Ok(req) => req,
            Err(err) => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("malformed request body: {err}"),
                    }),
                ));
            }
        }
    };
    match engine.create_context(req.id.as_deref(), req.config) {
        Ok(context_id) => Ok(Json(CreateContextResponse { context_id })),
        Err(err) => api_err(err),
    }
}

async fn handle_list_contexts(
    State(engine): State<Arc<OscillationEngine>>,
) -> Json<serde_json::Value> {
    let ids = engine.context_ids();
    Json(serde_json::json!({ "contexts": ids, "total": ids.len() }))
}

async fn handle_remove_context(
    State(engine): State<Arc<OscillationEngine>>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    if engine.remove_context(&id) {
        Ok(Json(serde_json::json!({ "removed": id })))
    } else {
        api_err(EngineError::UnknownContext(id))
    }
}

async fn handle_tick(
    State(engine): State<Arc<OscillationEngine>>,
    Path(id): Path<String>,
    Query(params): Query<TickParams>,
) -> ApiResult<TickResponse> {
    let output = match engine.tick(&id) {
        Ok(output) => output,
        Err(err) => return api_err(err),
    };
    let metrics = if params.metrics.unwrap_or(false) {
        match engine.metrics(&id) {
            Ok(report) => Some(report),
            Err(err) => return api_err(err),
        }
    } else {
        None
    };
    Ok(Json(TickResponse { output, metrics }))
}

async fn handle_metrics(
    State(engine): State<Arc<OscillationEngine>>,
    Path(id): Path<String>,
) -> ApiResult<MetricsReport> {
    match engine.metrics(&id) {
        Ok(report) => Ok(Json(report)),
        Err(err) => api_err(err),
    }
}

async fn handle_export(
    State(engine): State<Arc<OscillationEngine>>,
    Path(id): Path<String>,
) -> ApiResult<PersistedContext> {
    match engine.export_context(&id) {
        Ok(persisted) => Ok(Json(persisted)),
        Err(err) => api_err(err),
    }
}

async fn handle_import(
    State(engine): State<Arc<OscillationEngine>>,
    Json(persisted): Json<PersistedContext>,
) -> ApiResult<CreateContextResponse> {
    match engine.import_context(persisted) {
        Ok(context_id) => Ok(Json(CreateContextResponse { context_id })),
        Err(err) => api_err(err),
    }
}

async fn handle_index(State(engine): State<Arc<OscillationEngine>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Flicker Server",
        "version": flicker_core::VERSION,
        "contexts": engine.context_ids().len(),
        "endpoints": {
            "/": "This API index",
            "/health": "Health check",
            "/entropy/status": "Per-source success rates and quality score",
            "/entropy/selftest": {
                "method": "GET",
                "params": { "samples": "Pipeline samples to draw (1-4096, default: 32)" },
            },
            "/contexts": {
                "GET": "List context ids",
                "POST": "Create a context (body: optional id + config)",
            },
            "/contexts/{id}": { "DELETE": "Remove a context" },
            "/contexts/{id}/tick": {
                "method": "POST",
                "params": { "metrics": "Attach a metrics snapshot (default: false)" },
            },
            "/contexts/{id}/metrics": "Metrics over the context history",
            "/contexts/{id}/export": "Export the context as a plain structured record",
            "/contexts/import": { "method": "POST", "description": "Restore an exported context" },
        },
    }))
}

/// Build the axum router.
pub fn build_router(engine: Arc<OscillationEngine>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/entropy/status", get(handle_entropy_status))
        .route("/entropy/selftest", get(handle_selftest))
        .route("/contexts", get(handle_list_contexts).post(handle_create_context))
        .route("/contexts/import", post(handle_import))
        .route("/contexts/{id}", delete(handle_remove_context))
        .route("/contexts/{id}/tick", post(handle_tick))
        .route("/contexts/{id}/metrics", get(handle_metrics))
        .route("/contexts/{id}/export", get(handle_export))
        .with_state(engine)
}

/// Run the HTTP server until the process exits.
pub async fn run_server(engine: Arc<OscillationEngine>, host: &str, port: u16) {
    let app = build_router(engine);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    log::info!("listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
