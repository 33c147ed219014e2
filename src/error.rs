//! Error taxonomy for the edge functions and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;

/// Every failure a handler can end with. Rate-limit rejections are not
/// errors: they are prebuilt responses from [`crate::rate_limit::apply_rate_limit`].
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{message}")]
    InvalidInput {
        message: String,
        missing: Vec<String>,
    },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("entity store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn missing_fields(missing: Vec<String>) -> Self {
        Self::InvalidInput {
            message: "Missing required fields".to_string(),
            missing,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            missing: Vec::new(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        let body = match &self {
            Self::InvalidInput { message, missing } if !missing.is_empty() => {
                serde_json::json!({ "error": message, "code": code, "missing": missing })
            }
            // detail stays in the logs, never in the body
            Self::Store(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                serde_json::json!({ "error": "Internal server error", "code": code })
            }
            _ => serde_json::json!({ "error": self.to_string(), "code": code }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid(format!("Invalid request body: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            AppError::missing_fields(vec!["title".into()]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes_are_machine_readable() {
        assert_eq!(AppError::invalid("bad").error_code(), "INVALID_INPUT");
        assert_eq!(AppError::Unauthorized.error_code(), "UNAUTHORIZED");
        assert_eq!(
            AppError::Store(StoreError::Decode("x".into())).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let response = AppError::Internal("db password leaked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("password"));
        assert!(body.contains("Internal server error"));
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let response =
            AppError::missing_fields(vec!["boardId".into(), "title".into()]).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "INVALID_INPUT");
        assert_eq!(json["missing"], serde_json::json!(["boardId", "title"]));
    }
}
