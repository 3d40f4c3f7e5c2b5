use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bv_core::Error;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Request failure rendered as `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Core(Error),
}

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        Self::Core(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "bad_request", message.clone()),
            ApiError::Core(Error::NotFound(what)) => {
                (StatusCode::NOT_FOUND, "not_found", format!("{} not found", what))
            }
            ApiError::Core(Error::Conflict(message)) => (StatusCode::CONFLICT, "conflict", message.clone()),
            ApiError::Core(e @ Error::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "validation_error", e.to_string())
            }
            ApiError::Core(e) => {
                // Internal detail stays in the log.
                error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal Server Error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, Json(ErrorBody { error: ErrorDetail { code, message } })).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
