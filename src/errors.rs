use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::protocol::ApiResponse;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected request parameters. The message is shown to the caller verbatim.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    /// Non-success answer from the intake server, already decoded.
    #[error("Server responded {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl IntakeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            IntakeError::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to users. Internal failures never leak filesystem details.
    pub fn user_message(&self) -> String {
        match self {
            IntakeError::Server { message, .. } => message.clone(),
            IntakeError::InvalidInput(_) | IntakeError::NotFound => self.to_string(),
            IntakeError::Io(_) => "Could not write to the log file".into(),
            other => other.to_string(),
        }
    }
}

impl serde::Serialize for IntakeError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::failure(self.user_message()))).into_response()
    }
}

pub type IntakeResult<T> = Result<T, IntakeError>;
