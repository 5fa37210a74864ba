//! HTTP Error Types
//!
//! Maps application errors to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use courier_core::error::AppError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    App {
        context: &'static str,
        #[source]
        source: AppError,
    },
}

impl ApiError {
    /// Attach the failing step to an application error
    pub fn app(context: &'static str) -> impl FnOnce(AppError) -> ApiError {
        move |source| ApiError::App { context, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::App { source, .. } => status_for(source),
        }
    }
}

/// Validation problems are the caller's fault; everything else is ours
fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
            StatusCode::BAD_REQUEST
        }
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::app("send")(AppError::QueueNotDefined("q".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::app("register")(AppError::Validation("bad email".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::app("register")(AppError::Conflict("dup".into())).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_message_includes_context() {
        let err = ApiError::app("failed to send message")(AppError::QueueNotDefined(
            "orders".into(),
        ));
        assert_eq!(
            err.to_string(),
            "failed to send message: queue not defined: orders"
        );
    }
}
