//! Error types for the REST client.

use thiserror::Error;

/// REST client errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request did not complete within the configured timeout
    #[error("Request timed out after {0}s: {1}")]
    Timeout(u64, String),

    /// Backend could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Backend answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Backend answered 2xx but the envelope says `success: false`
    #[error("{0}")]
    Rejected(String),

    /// Response body did not match the expected shape
    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Input refused before sending anything
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Report file could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other HTTP client failure
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] vigil_core::VigilError),
}

impl ApiError {
    /// Classify an HTTP status and its (possibly JSON) body.
    ///
    /// The backend puts a human-readable reason in an `error` field; when
    /// there is none the status text is used.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));

        match status {
            408 | 504 => ApiError::Timeout(0, message),
            _ => ApiError::Http { status, message },
        }
    }

    /// Map a reqwest failure onto the network variants.
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            ApiError::Timeout(timeout_secs, err.to_string())
        } else if err.is_connect() {
            ApiError::ConnectionFailed(err.to_string())
        } else {
            ApiError::Request(err)
        }
    }

    /// Check if this error is a network-related error.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            ApiError::Timeout(_, _) | ApiError::ConnectionFailed(_) | ApiError::Request(_)
        )
    }

    /// Check if the backend itself refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ApiError::Rejected(_) | ApiError::Http { .. })
    }

    /// HTTP status, when the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Short message for a toast.
    pub fn friendly_message(&self) -> String {
        match self {
            ApiError::Timeout(secs, _) if *secs > 0 => format!("Request timed out after {}s", secs),
            ApiError::Timeout(_, msg) => msg.clone(),
            ApiError::ConnectionFailed(_) => "Network error".to_string(),
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Rejected(msg) => msg.clone(),
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Decode { endpoint, .. } => format!("Unexpected response from {}", endpoint),
            ApiError::Io(e) => format!("Could not save file: {}", e),
            _ => format!("Error: {}", self),
        }
    }
}

/// Result type for REST operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status_uses_error_field() {
        let err = ApiError::from_http_status(400, r#"{"error":"IP already blocked"}"#);
        assert_eq!(err.friendly_message(), "IP already blocked");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_from_http_status_without_json_body() {
        let err = ApiError::from_http_status(500, "<html>Internal Server Error</html>");
        assert_eq!(err.friendly_message(), "HTTP error! status: 500");
        assert!(err.is_rejection());
        assert!(!err.is_network_error());
    }

    #[test]
    fn test_gateway_timeout_is_network_error() {
        let err = ApiError::from_http_status(504, "");
        assert!(err.is_network_error());
    }

    #[test]
    fn test_rejected_message_passthrough() {
        let err = ApiError::Rejected("Rule not found".to_string());
        assert_eq!(err.to_string(), "Rule not found");
        assert_eq!(err.friendly_message(), "Rule not found");
        assert!(err.is_rejection());
    }
}
