// Error taxonomy for calls against the biking API and the location feed
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// 400, the body carries the field level message.
    #[error("validation failed: {0}")]
    Validation(String),

    /// 404, a referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// 409, a uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// The payload did not match the expected shape.
    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("stream disconnected: {0}")]
    StreamDisconnected(String),
}

impl ApiError {
    /// Maps a non-success status and its body onto the error contract of the API.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => ApiError::Validation(body),
            404 => ApiError::NotFound(body),
            409 => ApiError::Conflict(body),
            _ => ApiError::Status { status, body },
        }
    }

    /// Message suitable for an inline alert next to a view or form.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(body) if !body.trim().is_empty() => body.trim().to_string(),
            ApiError::Validation(_) => "The submitted data is invalid.".to_string(),
            ApiError::NotFound(_) => "The requested item does not exist.".to_string(),
            ApiError::Conflict(_) => "The item conflicts with an existing one.".to_string(),
            ApiError::Status { status, .. } => format!("The server answered with status {}.", status),
            ApiError::Transport(_) => "The server could not be reached.".to_string(),
            ApiError::Schema(_) => "The server sent data that could not be read.".to_string(),
            ApiError::StreamDisconnected(_) => "Not connected.".to_string(),
        }
    }
}
