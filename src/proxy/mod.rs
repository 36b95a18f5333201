//! Streams a resolved media URL back to the client as a file download.
//!
//! The upstream body is relayed through a fixed-capacity buffer, so memory use
//! per request stays bounded no matter how large the media is.

use crate::config::ProxyConfig;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use futures::TryStreamExt;
use std::time::Duration;
use thiserror::Error;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info};
use url::Url;

pub const FALLBACK_FILENAME: &str = "video.mp4";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to fetch upstream media: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {0}")]
    UpstreamStatus(StatusCode),

    #[error("Failed to build proxy response: {0}")]
    Internal(String),
}

pub struct DownloadProxy {
    client: reqwest::Client,
    chunk_size: usize,
}

impl DownloadProxy {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            chunk_size: config.chunk_size.max(1),
        })
    }

    /// Open one streaming GET to the target. No retries.
    pub async fn fetch(&self, target: &str) -> Result<ProxiedDownload, ProxyError> {
        let url = decode_target(target)?;
        let filename = filename_from_url(&url);
        debug!("Proxying {} as {}", url, filename);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let content_length = response.content_length();

        info!(
            "Streaming {} ({} bytes)",
            filename,
            content_length.map_or_else(|| "unknown".to_string(), |len| len.to_string())
        );

        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        let body = Body::from_stream(ReaderStream::with_capacity(reader, self.chunk_size));

        Ok(ProxiedDownload {
            filename,
            content_type,
            content_length,
            body,
        })
    }
}

pub struct ProxiedDownload {
    pub filename: String,
    pub content_type: HeaderValue,
    pub content_length: Option<u64>,
    body: Body,
}

impl ProxiedDownload {
    /// Response carrying the upstream body with a forced attachment disposition.
    pub fn into_attachment(self) -> Result<Response, ProxyError> {
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            self.filename
        ))
        .map_err(|e| ProxyError::Internal(e.to_string()))?;

        let mut builder = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type)
            .header(header::CONTENT_DISPOSITION, disposition);
        if let Some(len) = self.content_length {
            builder = builder.header(header::CONTENT_LENGTH, len);
        }

        builder
            .body(self.body)
            .map_err(|e| ProxyError::Internal(e.to_string()))
    }
}

/// Parses the caller-supplied target. An absolute http(s) URL is used as-is
/// so signed query strings survive; anything else is percent-decoded once
/// (e.g. `https%3A%2F%2F...`) and parsed again.
pub fn decode_target(raw: &str) -> Result<Url, ProxyError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ProxyError::MissingUrl);
    }

    if let Some(url) = Url::parse(raw).ok().filter(is_http) {
        return Ok(url);
    }

    let decoded = urlencoding::decode(raw).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;
    let url = Url::parse(&decoded).map_err(|e| ProxyError::InvalidUrl(e.to_string()))?;
    if is_http(&url) {
        Ok(url)
    } else {
        Err(ProxyError::InvalidUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )))
    }
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Last path segment of the URL, made safe for a quoted header parameter.
pub fn filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    let cleaned: String = decoded
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}
