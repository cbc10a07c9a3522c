use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::services::transport::TransportError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Announcement {0} not found")]
    NotFound(Uuid),

    #[error("You are already registered. Please withdraw before switching roles.")]
    AlreadyRegistered,

    #[error("You are not registered for this announcement.")]
    NotRegistered,

    #[error("{0}")]
    InvalidState(String),

    /// Transport unreachable or timed out. Safe to retry.
    #[error("external service unavailable: {0}")]
    Transient(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRegistered | Self::NotRegistered | Self::InvalidState(_) => {
                StatusCode::CONFLICT
            }
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TransportError> for AppError {
    /// A missing platform object will not reappear on retry, so only `Unavailable` is transient.
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::NotFound => {
                Self::Internal("referenced platform object no longer exists".into())
            }
            TransportError::Unavailable(msg) => Self::Transient(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
