// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Everything that can go wrong talking to the backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Rejected by the server: {message}")]
    Validation { status: StatusCode, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// Maps a non-success response to the matching error kind.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = backend_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation { status, message }
            }
            _ => ApiError::Server { status, message },
        }
    }

    /// Short text suitable for an inline error line.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(e) if e.is_timeout() => {
                "The server took too long to answer.".to_string()
            }
            ApiError::Network(_) => "Could not reach the server.".to_string(),
            ApiError::Unauthorized(_) => "Please sign in again.".to_string(),
            ApiError::Validation { message, .. } | ApiError::NotFound(message) => message.clone(),
            ApiError::Server { .. } | ApiError::Decode(_) => {
                "Something went wrong on the server.".to_string()
            }
            ApiError::InvalidBaseUrl(_) => self.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

// Error bodies come as `{"detail": ...}` or `{"error": ...}`; anything else
// non-empty is used verbatim.
fn backend_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<ErrorBody>(trimmed) {
        Ok(ErrorBody {
            detail: Some(serde_json::Value::String(detail)),
            ..
        }) => Some(detail),
        Ok(ErrorBody {
            detail: Some(detail),
            ..
        }) => Some(detail.to_string()),
        Ok(ErrorBody {
            error: Some(error), ..
        }) => Some(error),
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, ""),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, ""),
            ApiError::Server { .. }
        ));
    }

    #[test]
    fn test_detail_message_is_extracted() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Invalid invite code"}"#,
        );

        assert_eq!(err.user_message(), "Invalid invite code");
        assert_eq!(err.to_string(), "Rejected by the server: Invalid invite code");
    }

    #[test]
    fn test_error_field_and_plain_text() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, r#"{"error": "Task not found"}"#);
        assert_eq!(err.user_message(), "Task not found");

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "no such user");
        assert_eq!(err.user_message(), "no such user");
    }

    #[test]
    fn test_empty_body_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");

        assert_eq!(err.to_string(), "Not found: Not Found");
    }
}
