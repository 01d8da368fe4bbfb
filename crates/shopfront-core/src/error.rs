//! Centralized error types for Shopfront.

use thiserror::Error;

/// Main error type for Shopfront operations.
#[derive(Error, Debug)]
pub enum ShopfrontError {
    #[error("Cart line not found: {0}")]
    LineNotFound(String),

    #[error("Chat session not found: {0}")]
    ChatNotFound(String),

    #[error("Not signed in")]
    Unauthorized,

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Socket is not connected")]
    SocketClosed,

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("No active chat session")]
    NoActiveChat,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Shopfront operations.
pub type ShopfrontResult<T> = Result<T, ShopfrontError>;

impl ShopfrontError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create an API error from a status code and server message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error is an expired/missing session rather than a real failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized) || matches!(self, Self::Api { status: 401, .. })
    }
}
