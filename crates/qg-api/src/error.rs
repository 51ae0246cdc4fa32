use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use qg_core::{DecodeError, InvalidConfig, SessionError};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session not found")]
    SessionNotFound,
    #[error("Session already exists")]
    SessionExists,
    #[error("A quiz is already being generated for this session")]
    GenerationInProgress,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Invalid challenge code: {0}")]
    Decode(#[from] DecodeError),
    #[error("Invalid quiz configuration: {0}")]
    Config(#[from] InvalidConfig),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::SessionExists | Self::GenerationInProgress => StatusCode::CONFLICT,
            Self::Session(e) => match e {
                SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
                SessionError::NoSuchFile(_) => StatusCode::NOT_FOUND,
                SessionError::NotReady(_) | SessionError::UnknownOption(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Decode(_) | Self::Config(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!("{self}");
            "Internal server error".to_string()
        } else {
            tracing::debug!(status = status.as_u16(), "{self}");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
