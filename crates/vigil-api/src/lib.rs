//! # vigil-api
//!
//! REST client for the Vigil IDS dashboard backend.
//!
//! This crate provides:
//! - [`ApiClient`] - One async method per backend endpoint
//! - [`ApiError`] - Transport, status and envelope failures
//! - [`envelope`] - The `{success, error}` wrapper every response uses
//! - [`models`] - Typed payloads (stats, rules, reports, comparison)
//!
//! Alert lists are normalized with the same rules as the live stream, so a
//! malformed entry is skipped rather than failing the whole list.
//!
//! ## Example
//!
//! ```no_run
//! use vigil_api::ApiClient;
//! use vigil_config::ConsoleConfig;
//!
//! #[tokio::main]
//! async fn main() -> vigil_api::Result<()> {
//!     let client = ApiClient::from_config(&ConsoleConfig::default())?;
//!
//!     let stats = client.stats().await?;
//!     println!("{} alerts in the last 24h", stats.total_alerts_24h);
//!
//!     client.block_ip("203.0.113.7").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod envelope;
pub mod error;
pub mod models;

// Re-export main types
pub use client::{AlertFilter, ApiClient};
pub use error::{ApiError, Result};
pub use models::{
    Comparison, ComparisonAnalysis, ComparisonEvent, LoginOutcome, ReportEntry, ReportFormat,
    ReportRequest, ReportType, RuleEntry, RuleList, SeverityDistribution, StatsSummary,
    TimelinePoint, TimelineRange,
};
