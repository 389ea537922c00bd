//! # vigil-stream
//!
//! Live alert stream for the Vigil console.
//!
//! [`ConnectionManager`] holds one WebSocket connection to the backend's
//! alert endpoint, normalizes every text frame into an
//! [`AlertRecord`](vigil_core::AlertRecord) and forwards it over an
//! unbounded channel. Malformed frames are logged and dropped. Dropped
//! connections are retried after a fixed delay with no attempt limit.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use vigil_stream::{ConnectionManager, StreamEvent};
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let manager = ConnectionManager::websocket(
//!     "ws://localhost:8000/ws/alerts",
//!     Duration::from_secs(5),
//!     tx,
//! );
//! let handle = manager.spawn(&tokio::runtime::Handle::current());
//!
//! while let Some(event) = rx.recv().await {
//!     if let StreamEvent::Alert(alert) = event {
//!         println!("{} from {}", alert.signature_display(), alert.src_ip_display());
//!     }
//! }
//! handle.shutdown();
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod transport;

pub use connection::{ConnectionManager, StreamEvent, StreamHandle, StreamStatus, StreamSummary};
pub use error::{Result, StreamError};
pub use transport::{Connector, Frame, FrameSource, WsConnector};
