use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::github::ProfileError;

pub type AvatarResult<T> = Result<T, AvatarError>;

#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests. Try again later.")]
    RateLimited,

    #[error("Too many requests. Try again in {retry_after_secs} seconds.")]
    Blocked { retry_after_secs: u64 },

    #[error("Error fetching GitHub data: {0}")]
    Upstream(#[from] ProfileError),

    #[error("Failed to encode image")]
    Encoding(#[from] image::ImageError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AvatarError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AvatarError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AvatarError::NotFound(_) => StatusCode::NOT_FOUND,
            AvatarError::RateLimited | AvatarError::Blocked { .. } => StatusCode::TOO_MANY_REQUESTS,
            AvatarError::Upstream(_)
            | AvatarError::Encoding(_)
            | AvatarError::Internal(_)
            | AvatarError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

impl From<&AvatarError> for ErrorResponse {
    fn from(err: &AvatarError) -> Self {
        Self::new(err.to_string())
    }
}

impl IntoResponse for AvatarError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AvatarError::Encoding(source) => {
                tracing::error!(error = %source, "raster encoding failed");
            }
            err if status.is_server_error() => {
                tracing::error!(error = %err, "request failed");
            }
            err => {
                tracing::debug!(error = %err, status = %status, "request rejected");
            }
        }

        let mut response = (status, Json(ErrorResponse::from(&self))).into_response();

        if let AvatarError::Blocked { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AvatarError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AvatarError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AvatarError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AvatarError::Blocked { retry_after_secs: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AvatarError::Upstream(ProfileError::RateLimitExceeded).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_shape() {
        let body = ErrorResponse::from(&AvatarError::Blocked { retry_after_secs: 7 });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "Too many requests. Try again in 7 seconds.");
    }

    #[test]
    fn test_upstream_message_wraps_condition() {
        let err = AvatarError::from(ProfileError::Status(404));
        assert_eq!(
            err.to_string(),
            "Error fetching GitHub data: GitHub API returned status: 404"
        );
    }

    #[test]
    fn test_blocked_response_sets_retry_after() {
        let response = AvatarError::Blocked { retry_after_secs: 4 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "4");
    }
}
