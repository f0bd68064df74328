//! The `error` module defines the error type used across the relay.
//!
//! Validation failures are client errors and map to `400 Bad Request` when
//! they reach an HTTP caller. Transport failures never appear here: they are
//! contained inside a session (see `session::Disconnect`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid topic id: {0}")]
    InvalidTopic(String),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    #[error("relay hub is not running")]
    HubClosed,

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidTopic(_) | RelayError::MalformedEnvelope(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::HubClosed => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Bind(_) | RelayError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
