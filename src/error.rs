use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Local input rejected before anything was sent.
    #[error("{0}")]
    Validation(String),

    #[error("Server error ({status}): {body}")]
    Request {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store error: {0}")]
    Storage(String),
}

impl ChatError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ChatError::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }

    /// Non-2xx responses and transport failures.
    pub fn is_request_error(&self) -> bool {
        matches!(self, ChatError::Request { .. } | ChatError::Http(_))
    }
}
