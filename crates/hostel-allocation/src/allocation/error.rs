use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error taxonomy shared by every allocation-core operation.
///
/// `CapacityExceeded` is kept apart from the generic `Conflict` because a
/// room filling up mid-review is an expected race outcome and callers route
/// it to a different admin-facing path (offer an alternate room).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("room {room} filled while you were reviewing")]
    CapacityExceeded { room: String },
    #[error("transient failure: {0}")]
    Transient(String),
}

impl AllocationError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub const fn code(&self) -> &'static str {
        match self {
            AllocationError::Validation { .. } => "validation_failed",
            AllocationError::NotFound { .. } => "not_found",
            AllocationError::Conflict(_) => "conflict",
            AllocationError::CapacityExceeded { .. } => "capacity_exceeded",
            AllocationError::Transient(_) => "transient",
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            AllocationError::Validation { .. } => StatusCode::BAD_REQUEST,
            AllocationError::NotFound { .. } => StatusCode::NOT_FOUND,
            AllocationError::Conflict(_) | AllocationError::CapacityExceeded { .. } => {
                StatusCode::CONFLICT
            }
            AllocationError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AllocationError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (self.status(), body).into_response()
    }
}
