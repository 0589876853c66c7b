//! Maps scheduler/auth errors onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use distcalc_shared::errors::SchedulerError;
use serde_json::json;

pub struct ApiError(SchedulerError);

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        Self(e)
    }
}

impl From<distcalc_shared::errors::AuthError> for ApiError {
    fn from(e: distcalc_shared::errors::AuthError) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            SchedulerError::InvalidExpression(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            SchedulerError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            SchedulerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            SchedulerError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            SchedulerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            SchedulerError::NoTasks => (StatusCode::INTERNAL_SERVER_ERROR, "no tasks".to_string()),
            SchedulerError::DivisionByZero => {
                (StatusCode::UNPROCESSABLE_ENTITY, "division by zero".to_string())
            }
            SchedulerError::Store(_) | SchedulerError::Transient(_) => {
                tracing::error!(error = %self.0, "internal error handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
