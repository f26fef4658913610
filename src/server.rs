//! HTTP surface of the worker.
//!
//! JSON request/response on five routes. Every route except `GET /` goes
//! through the shared-secret middleware. Handlers read fields out of loose
//! JSON bodies (the callers are scripted clients, not typed SDKs) and fold
//! failures into the `{ok:false, error}` envelope.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::WorkerError;
use crate::expand::ExpansionClient;
use crate::search::SearchClient;
use crate::session::BrowserSession;
use crate::{pipeline, precheck, WorkerConfig, WORKER_NAME};

/// Header carrying the shared secret.
pub const WORKER_KEY_HEADER: &str = "x-worker-key";

const BODY_LIMIT: usize = 30 * 1024 * 1024;

/// Upper bound on concurrent browser sessions. Each session is a full
/// Chrome process (~150MB), so unbounded admission exhausts memory under a
/// request burst.
const MAX_CONCURRENT_SESSIONS: usize = 4;

/// Shared handler state: immutable config plus the two outbound adapters.
pub struct AppState {
    pub config: WorkerConfig,
    pub search: SearchClient,
    pub expander: ExpansionClient,
    session_permits: Semaphore,
}

impl AppState {
    pub fn new(config: WorkerConfig) -> Self {
        let search = SearchClient::new(config.google_api_key.clone(), config.google_cx.clone());
        let expander = ExpansionClient::new(config.openai_api_key.clone());
        Self {
            config,
            search,
            expander,
            session_permits: Semaphore::new(MAX_CONCURRENT_SESSIONS),
        }
    }
}

/// Build the worker router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/search-portal", post(search_portal))
        .route("/lgd-expand", post(lgd_expand))
        .route("/precheck", post(run_precheck))
        .route("/run-pipeline", post(run_pipeline))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_worker_key,
        ));

    Router::new()
        .route("/", get(health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Reject requests whose `x-worker-key` header does not match the
/// configured secret. With no secret configured everything passes
/// (dev mode). Runs before any handler, so an unauthorized request never
/// launches a browser.
async fn require_worker_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(secret) = &state.config.secret {
        let presented = request
            .headers()
            .get(WORKER_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(secret.as_str()) {
            return WorkerError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "worker": WORKER_NAME }))
}

fn str_field(body: &Value, name: &str) -> Option<String> {
    body.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

async fn search_portal(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, WorkerError> {
    let query = str_field(&body, "query").ok_or_else(|| WorkerError::invalid("Missing query"))?;
    let limit = body.get("limit").and_then(Value::as_u64).unwrap_or(5) as u32;

    let results = state.search.search_portals(&query, limit).await?;
    Ok(Json(json!({ "ok": true, "results": results })))
}

async fn lgd_expand(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, WorkerError> {
    let service_name = str_field(&body, "service_name").unwrap_or_default();
    let variant_type = str_field(&body, "variant_type").unwrap_or_default();

    let expansions = state
        .expander
        .expand(&service_name, &variant_type)
        .await?
        .into_list();
    Ok(Json(json!({ "ok": true, "expansions": expansions })))
}

async fn run_precheck(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, WorkerError> {
    let url = str_field(&body, "url").ok_or_else(|| WorkerError::failed("Missing url"))?;

    info!(url, "Precheck requested");
    let _permit = state
        .session_permits
        .acquire()
        .await
        .map_err(|_| WorkerError::failed("Worker is shutting down"))?;
    let session = BrowserSession::launch(&state.config.browser).await?;
    // The result is held, not propagated, until the session is closed, so
    // the browser is torn down on the error path too.
    let result = precheck::classify(&session, &url).await;
    session.close().await;

    Ok(Json(json!({ "ok": true, "precheck": result? })))
}

async fn run_pipeline(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, WorkerError> {
    let steps: Vec<Value> = match body.get("pipeline") {
        Some(Value::Array(steps)) => steps.clone(),
        _ => return Err(WorkerError::failed("Invalid pipeline")),
    };

    info!(steps = steps.len(), "Pipeline run requested");
    let _permit = state
        .session_permits
        .acquire()
        .await
        .map_err(|_| WorkerError::failed("Worker is shutting down"))?;
    let session = BrowserSession::launch(&state.config.browser).await?;
    // run_steps captures every step error into its results, so closing the
    // session here covers all exit paths.
    let run = pipeline::run_steps(&session, &steps).await;
    session.close().await;

    Ok(Json(
        json!({ "ok": true, "runId": run.run_id, "steps": run.steps }),
    ))
}
