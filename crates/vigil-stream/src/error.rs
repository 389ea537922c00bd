//! Error types for the alert stream.

use thiserror::Error;

/// Stream transport errors.
///
/// None of these are fatal: the connection manager logs them and schedules
/// the next attempt.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection could not be established
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// Established connection failed mid-stream
    #[error("Stream protocol error: {0}")]
    Protocol(String),
}

impl StreamError {
    pub fn connect(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, StreamError>;
