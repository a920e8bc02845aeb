pub mod alerts;
pub mod runs;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use engine::EngineError;
use tracing::error;

pub async fn teapot() -> (StatusCode, &'static str) {
    (StatusCode::IM_A_TEAPOT, "I'm a teapot.")
}

/// Handler failure, rendered as a plain-text body.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    NotFound(String),
    Internal,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnsupportedAlertType(_) | EngineError::MissingData => {
                Self::BadRequest("bad request".into())
            }
            EngineError::UnknownService(_) => Self::BadRequest(err.to_string()),
            EngineError::RunNotFound(_) => Self::NotFound(err.to_string()),
            other => {
                error!("request failed: {other}");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_owned()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned()),
        }
        .into_response()
    }
}
