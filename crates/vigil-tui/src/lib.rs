//! Terminal UI for Vigil.
//!
//! This crate provides the Ratatui-based console for a Suricata IDS/IPS
//! dashboard backend.
//!
//! ## Features
//!
//! - Overview with live counters, severity chart, timeline and recent alerts
//! - Alert list with severity and count filters
//! - IPS rules with search, category filter and AI rule deletion
//! - Report generation, download and deletion
//! - Attack vs defense comparison
//! - Login with optional one-time code
//!
//! Alerts pushed over the live stream are folded into whatever is on screen
//! by [`reconcile::reconcile`].
//!
//! ## Hotkeys
//!
//! - `o` - Overview
//! - `a` - Alerts
//! - `r` - Rules
//! - `p` - Reports
//! - `g` - Generate report
//! - `c` - Comparison
//! - `R` - Refresh
//! - `T` - Toggle theme
//! - `?` - Help
//! - `q` - Quit
//! - `Tab` - Cycle views
//! - `Esc` - Cancel/back

pub mod app;
pub mod data;
pub mod event;
pub mod pages;
pub mod reconcile;
pub mod surface;
pub mod theme;
pub mod toast;
pub mod view;
pub mod widget;

pub use app::{App, AppResult};
pub use view::View;
