mod error;

use crate::{
    media::{MediaResolver, NormalizedResult},
    proxy::{DownloadProxy, ProxyError},
};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use error::{ApiError, ApiResult, EXTRACTION_FAILED, INTERNAL_ERROR};
use serde::Deserialize;
use serde_json::{json, Value};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    resolver: Arc<MediaResolver>,
    proxy: Arc<DownloadProxy>,
}

impl AppState {
    pub fn new(resolver: MediaResolver, proxy: DownloadProxy) -> Self {
        Self {
            resolver: Arc::new(resolver),
            proxy: Arc::new(proxy),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DownloadRequest {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/download", post(download))
        .route("/proxy", get(proxy))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running HTTP server")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
    }
}

async fn download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<Json<NormalizedResult>> {
    let Json(request) = payload.map_err(|e| {
        warn!("Rejected download request body: {}", e);
        ApiError::bad_request("URL is required")
    })?;

    let url = request
        .url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;

    // A panic inside extraction surfaces as a JoinError instead of a dropped connection.
    let resolver = Arc::clone(&state.resolver);
    let task = tokio::spawn(async move { resolver.resolve(&url).await });

    match task.await {
        Ok(Ok(result)) => Ok(Json(result)),
        Ok(Err(e)) => {
            error!("Extraction error: {}", e);
            Err(ApiError::internal(EXTRACTION_FAILED))
        }
        Err(e) => {
            error!("An unexpected error occurred: {}", e);
            Err(ApiError::internal(INTERNAL_ERROR))
        }
    }
}

async fn proxy(
    State(state): State<AppState>,
    Query(params): Query<ProxyQuery>,
) -> Result<Response, ProxyError> {
    let target = params.url.ok_or(ProxyError::MissingUrl)?;
    let download = state.proxy.fetch(&target).await?;
    download.into_attachment()
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "extractor": state.resolver.extractor_name(),
        "available": state.resolver.is_available().await,
    }))
}
