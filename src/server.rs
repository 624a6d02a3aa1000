//! Jury HTTP server.
//!
//! Exposes the two jury calls behind the [`RateGovernor`], plus a health
//! check. Every jury request is admitted or denied *before* the body is
//! looked at or the provider is contacted.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/jury/analyze` | Digest → metrics, summary, concepts, ten questions |
//! | `POST` | `/jury/evaluate` | Summary + answers → feedback, scores, grey areas |
//! | `GET`  | `/health` | Health check (returns service name) |
//!
//! # Error Contract
//!
//! | Status | Body |
//! |--------|------|
//! | 400 | `{ "error": "project_digest is required" }` |
//! | 429 | `{ "error": "Rate limit exceeded (10 requests per minute)", "retryAfter": 42 }` |
//! | 500 | `{ "error": "Analysis failed", "details": "..." }` |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front-end
//! served from another origin can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::governor::{Admission, RateGovernor};
use crate::jury::{AnalyzeResponse, Answer, EvaluateResponse, JuryEngine};
use crate::provider::{create_provider, ReasoningProvider};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    governor: Arc<RateGovernor>,
    jury: JuryEngine,
    /// Cancelled on shutdown; each provider call runs under a child token.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: &Config, provider: Arc<dyn ReasoningProvider>) -> Self {
        Self {
            config: Arc::new(config.clone()),
            governor: Arc::new(RateGovernor::new(&config.limits)),
            jury: JuryEngine::new(provider, Duration::from_secs(config.provider.timeout_secs)),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn governor(&self) -> Arc<RateGovernor> {
        self.governor.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

/// Builds the router. The caller must serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/jury/analyze", post(handle_analyze))
        .route("/jury/evaluate", post(handle_evaluate))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the jury server on `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let provider: Arc<dyn ReasoningProvider> = Arc::from(create_provider(&config.provider)?);
    let state = AppState::new(config, provider);

    spawn_sweeper(
        state.governor(),
        Duration::from_secs(config.server.sweep_interval_secs),
        state.shutdown_token(),
    );

    let shutdown = state.shutdown_token();
    let provider_name = state.jury.provider_name();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        provider = %provider_name,
        per_minute = config.limits.per_minute,
        per_day = config.limits.per_day,
        "jury server listening"
    );
    if !config.provider.is_enabled() {
        tracing::warn!("no reasoning provider configured; jury calls will return 500");
    }
    println!("Jury Mode API running on http://{}", config.server.bind);
    println!(
        "Rate limits: {} RPM, {} RPD",
        config.limits.per_minute, config.limits.per_day
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down");
        shutdown.cancel();
    })
    .await?;

    Ok(())
}

/// Periodically drops governor entries that no longer constrain anyone.
pub fn spawn_sweeper(
    governor: Arc<RateGovernor>,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let evicted = governor.sweep(Utc::now());
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = governor.client_count(), "rate limit sweep");
                    }
                }
            }
        }
    })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    error: String,
    retry_after: Option<u64>,
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_header = self
            .retry_after
            .and_then(|secs| HeaderValue::from_str(&secs.to_string()).ok());
        let body = ErrorBody {
            error: self.error,
            retry_after: self.retry_after,
            details: self.details,
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(value) = retry_header {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        error: message.into(),
        retry_after: None,
        details: None,
    }
}

/// Constructs a 429 error carrying retry guidance.
fn too_many_requests(message: impl Into<String>, retry_after: u64) -> AppError {
    AppError {
        status: StatusCode::TOO_MANY_REQUESTS,
        error: message.into(),
        retry_after: Some(retry_after),
        details: None,
    }
}

/// Constructs a 500 error for provider failures, keeping the raw cause.
fn upstream_error(message: &str, err: anyhow::Error) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        error: message.to_string(),
        retry_after: None,
        details: Some(format!("{:#}", err)),
    }
}

fn admit(state: &AppState, addr: SocketAddr) -> Result<(), AppError> {
    let client = addr.ip().to_string();
    match state.governor.check(&client, Utc::now()) {
        Admission::Allowed => Ok(()),
        Admission::Denied {
            reason,
            retry_after_secs,
        } => {
            tracing::warn!(client = %client, %reason, retry_after_secs, "request denied");
            Err(too_many_requests(reason.to_string(), retry_after_secs))
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config.server.service.clone(),
    })
}

// ============ POST /jury/analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    project_digest: Option<String>,
}

async fn handle_analyze(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    admit(&state, addr)?;

    let digest = body
        .ok()
        .and_then(|Json(req)| req.project_digest)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| bad_request("project_digest is required"))?;

    let cancel = state.shutdown.child_token();
    let reply = state.jury.analyze(&digest, &cancel).await.map_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "analyze failed");
        upstream_error("Analysis failed", e)
    })?;

    tracing::info!(questions = reply.questions.len(), "analyze ok");
    Ok(Json(reply))
}

// ============ POST /jury/evaluate ============

#[derive(Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    project_summary: Option<String>,
    #[serde(default)]
    answers: Option<Vec<Answer>>,
}

async fn handle_evaluate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, AppError> {
    admit(&state, addr)?;

    let missing = || bad_request("project_summary and answers are required");
    let Json(req) = body.map_err(|_| missing())?;
    let summary = req
        .project_summary
        .filter(|s| !s.is_empty())
        .ok_or_else(missing)?;
    let answers = req.answers.ok_or_else(missing)?;

    let cancel = state.shutdown.child_token();
    let reply = state
        .jury
        .evaluate(&summary, &answers, &cancel)
        .await
        .map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "evaluate failed");
            upstream_error("Evaluation failed", e)
        })?;

    Ok(Json(reply))
}
