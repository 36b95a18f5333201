use crate::proxy::ProxyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

pub const EXTRACTION_FAILED: &str =
    "Failed to process URL. It might be private, invalid, or removed.";
pub const INTERNAL_ERROR: &str = "An internal server error occurred.";

/// JSON error body (`{"error": ...}`) returned by the API routes.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingUrl | ProxyError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ProxyError::MissingUrl => "URL is required",
            ProxyError::InvalidUrl(_) => "Invalid URL",
            ProxyError::Upstream(_) | ProxyError::UpstreamStatus(_) => {
                "Failed to fetch media from upstream"
            }
            ProxyError::Internal(_) => INTERNAL_ERROR,
        }
    }
}

/// Proxy failures are plain text; details stay in the server log.
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Proxy request failed: {}", self);
        } else {
            warn!("Rejected proxy request: {}", self);
        }
        (status, self.public_message()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::header};
    use serde_json::Value;

    #[tokio::test]
    async fn test_api_error_is_json() {
        let response = ApiError::bad_request("URL is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "URL is required");
    }

    #[tokio::test]
    async fn test_proxy_error_hides_detail() {
        let response =
            ProxyError::Internal("header value contained secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), INTERNAL_ERROR.as_bytes());
    }

    #[test]
    fn test_proxy_error_status() {
        assert_eq!(ProxyError::MissingUrl.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ProxyError::InvalidUrl("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProxyError::UpstreamStatus(StatusCode::NOT_FOUND).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
