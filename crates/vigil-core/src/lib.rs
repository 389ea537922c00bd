//! # vigil-core
//!
//! Core types, errors, and utilities for the Vigil IDS console.
//!
//! This crate provides:
//! - [`VigilError`] - Error type shared across Vigil crates
//! - [`logging`] - Tracing setup and log file locations
//! - [`types`] - [`AlertRecord`] and [`SeverityBucket`]
//! - [`normalize`] - Validation of inbound alert payloads
//!
//! ## Example
//!
//! ```
//! use vigil_core::{normalize_alert, SeverityBucket};
//!
//! let alert = normalize_alert(
//!     r#"{"timestamp":"2025-01-15T10:30:00Z","src_ip":"10.0.0.5","severity":1}"#,
//! )?;
//! assert_eq!(alert.bucket(), Some(SeverityBucket::Critical));
//! # Ok::<(), vigil_core::VigilError>(())
//! ```

pub mod error;
pub mod logging;
pub mod normalize;
pub mod types;

// Re-export main types for convenience
pub use error::{Result, VigilError};
pub use logging::{LogGuard, init_logging};
pub use normalize::{normalize_alert, normalize_value};
pub use types::{AlertRecord, AlertTime, SeverityBucket};
