//! Error types for Vigil operations.
//!
//! This module defines [`VigilError`], the error enum shared by every Vigil
//! crate. Errors carry enough context to be shown to the operator as-is, and
//! most of them come with a short hint from [`VigilError::guidance`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`VigilError`].
pub type Result<T> = std::result::Result<T, VigilError>;

/// Error type for core Vigil operations.
///
/// Nothing in the console is fatal except terminal setup: transport drops are
/// retried by the stream task, malformed payloads are dropped, and request
/// failures become transient notifications.
#[derive(Debug, Error)]
pub enum VigilError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file could not be read
    #[error("Configuration not readable at {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    /// Inbound alert payload did not match the alert schema
    #[error("Malformed alert payload: {message}")]
    MalformedAlert { message: String },

    // =========================================================================
    // TUI Errors
    // =========================================================================
    /// Terminal initialization failed
    #[error("Terminal initialization failed")]
    TerminalInit {
        #[source]
        source: std::io::Error,
    },

    /// Terminal restore failed
    #[error("Failed to restore terminal")]
    TerminalRestore {
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in Vigil)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl VigilError {
    // =========================================================================
    // Constructor helpers for common error patterns
    // =========================================================================

    /// Create a ConfigNotFound error with source
    pub fn config_not_found_with_source(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigNotFound {
            path: path.into(),
            source: Some(source),
        }
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigValidation error
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create a malformed alert error
    pub fn malformed_alert(message: impl Into<String>) -> Self {
        Self::MalformedAlert {
            message: message.into(),
        }
    }

    pub fn terminal_init(source: std::io::Error) -> Self {
        Self::TerminalInit { source }
    }

    pub fn terminal_restore(source: std::io::Error) -> Self {
        Self::TerminalRestore { source }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Error classification helpers
    // =========================================================================

    /// Returns true if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound { .. } | Self::ConfigInvalid { .. } | Self::ConfigValidation { .. }
        )
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound { .. } => {
                Some("Check permissions on ~/.vigil/config.yaml or pass --config")
            }
            Self::ConfigInvalid { .. } => Some("Check YAML syntax in ~/.vigil/config.yaml"),
            Self::ConfigValidation { .. } => {
                Some("Fix the reported field in ~/.vigil/config.yaml or override it with a flag")
            }
            Self::DirectoryCreation { .. } => Some("Check that the parent directory is writable"),
            Self::TerminalInit { .. } => {
                Some("Vigil needs an interactive terminal; try another one")
            }
            Self::TerminalRestore { .. } => Some("Run `reset` to get the terminal back"),
            _ => None,
        }
    }
}
