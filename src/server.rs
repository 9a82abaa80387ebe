use crate::{
    audit::{self, DynAuditSink},
    config::Config,
    errors::{into_response, AppError, AppResult},
    gallery::page,
    media::ImageKind,
    resolver::{BaseDirectory, ResolvedPath, SafePathResolver},
};
use anyhow::Context;
use axum::{
    extract::{RawQuery, State},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use http::{header, StatusCode};
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tokio::{
    io::AsyncReadExt,
    time::{timeout, Duration},
};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub resolver: SafePathResolver,
    pub audit: Option<DynAuditSink>,
}

impl AppState {
    pub fn new(cfg: Config, base: BaseDirectory) -> Self {
        let audit = audit::from_config(&cfg.audit);
        Self { cfg: Arc::new(cfg), resolver: SafePathResolver::new(base), audit }
    }
}

pub async fn serve(cfg: Config, base: BaseDirectory) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port)
        .parse()
        .context("parsing bind address")?;
    let app = build_router(AppState::new(cfg, base));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    }
}

pub fn build_router(shared: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/image", get(image))
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render_index(&state.cfg.gallery.images))
}

async fn image(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    match load_image(&state, query.as_deref()).await {
        Ok((kind, body)) => {
            audit_end(&request_id, "allow", "OK", started.elapsed().as_millis() as u64, body.len() as u64);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, kind.content_type()),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            let decision = match &e {
                AppError::Internal(detail) => {
                    tracing::warn!(request_id = %request_id, detail = %detail, "image request failed");
                    "error"
                }
                AppError::Timeout => "error",
                _ => "deny",
            };
            audit_end(&request_id, decision, e.code(), started.elapsed().as_millis() as u64, 0);
            into_response(e).into_response()
        }
    }
}

async fn load_image(state: &AppState, query: Option<&str>) -> AppResult<(ImageKind, Bytes)> {
    let raw = query.and_then(file_param).ok_or(AppError::BadRequest)?;
    let resolved = resolve_bounded(state, raw.to_string()).await?;

    let kind = ImageKind::from_path(resolved.path()).ok_or(AppError::UnsupportedMediaType)?;
    if resolved.size_bytes() > state.cfg.max_file_bytes() {
        return Err(AppError::TooLarge);
    }
    let limit = resolved.size_bytes();
    let mut data = Vec::with_capacity(limit as usize);
    // read from the handle opened during resolution, never by path again
    tokio::fs::File::from_std(resolved.into_file())
        .take(limit)
        .read_to_end(&mut data)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok((kind, Bytes::from(data)))
}

/// Runs the blocking resolver off the async workers, bounded by
/// `limits.resolve_timeout_ms`.
async fn resolve_bounded(state: &AppState, raw: String) -> AppResult<ResolvedPath> {
    let resolver = state.resolver.clone();
    let input = raw.clone();
    let job = tokio::task::spawn_blocking(move || resolver.resolve(&input));

    let limit = Duration::from_millis(state.cfg.limits.resolve_timeout_ms);
    let outcome = match timeout(limit, job).await {
        Err(_) => return Err(AppError::Timeout),
        Ok(Err(join)) => return Err(AppError::Internal(join.to_string())),
        Ok(Ok(outcome)) => outcome,
    };
    outcome.map_err(|reason| {
        if let Some(sink) = &state.audit {
            sink.rejected(&reason, &raw);
        }
        AppError::from(reason)
    })
}

/// First `file` value of the raw query string, still percent-encoded.
pub fn file_param(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == "file").then_some(value)
    })
}

fn audit_end(request_id: &str, decision: &str, code: &str, duration_ms: u64, bytes_out: u64) {
    tracing::info!(
        request_id = request_id,
        route = "/image",
        decision = decision,
        code = code,
        duration_ms = duration_ms,
        bytes_out = bytes_out,
        "audit"
    );
}
