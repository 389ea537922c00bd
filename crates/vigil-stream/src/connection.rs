//! Connection manager for the live alert stream.
//!
//! Keeps exactly one connection open at a time. When it ends for any reason
//! the manager waits a fixed delay and tries again, forever, until shut down.
//! A new attempt only starts after the previous connection has fully ended.
//!
//! Nothing is queued while disconnected and nothing is replayed after a
//! reconnect.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use vigil_core::{AlertRecord, log_stream_event, normalize_alert};

use crate::transport::{Connector, Frame, FrameSource, WsConnector};

/// Connectivity as shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// An attempt is in progress
    Connecting,
    /// Frames are flowing
    Connected,
    /// Waiting out the reconnect delay
    Disconnected,
}

impl StreamStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, StreamStatus::Connected)
    }
}

/// What the manager hands to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Status(StreamStatus),
    Alert(AlertRecord),
}

/// Counters for one manager run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub attempts: u64,
    pub connections: u64,
    pub alerts_delivered: u64,
    pub malformed_dropped: u64,
}

/// Why a connection stopped being read.
enum SessionEnd {
    Closed,
    Shutdown,
    ReceiverGone,
}

/// Owns the stream connection and its reconnect loop.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    url: String,
    reconnect_delay: Duration,
    events: mpsc::UnboundedSender<StreamEvent>,
}

impl ConnectionManager<WsConnector> {
    /// Manager for a real WebSocket endpoint.
    pub fn websocket(
        url: impl Into<String>,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Self {
        Self::new(WsConnector, url, reconnect_delay, events)
    }
}

impl<C: Connector + 'static> ConnectionManager<C> {
    pub fn new(
        connector: C,
        url: impl Into<String>,
        reconnect_delay: Duration,
        events: mpsc::UnboundedSender<StreamEvent>,
    ) -> Self {
        Self {
            connector,
            url: url.into(),
            reconnect_delay,
            events,
        }
    }

    /// Run the manager on `handle` and return a handle to stop it.
    pub fn spawn(self, handle: &Handle) -> StreamHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = handle.spawn(self.run(shutdown_rx));
        StreamHandle { shutdown_tx, task }
    }

    /// Connect, read, and reconnect until `shutdown` flips to true, its
    /// sender is dropped, or the event receiver goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> StreamSummary {
        let mut summary = StreamSummary::default();
        let delay_ms = self.reconnect_delay.as_millis() as u64;

        loop {
            if *shutdown.borrow() {
                break;
            }

            summary.attempts += 1;
            let attempt = summary.attempts;
            if !self.publish(StreamEvent::Status(StreamStatus::Connecting)) {
                break;
            }
            debug!(url = %self.url, attempt, "connecting to alert stream");

            let connected = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.connector.connect(&self.url) => result,
            };

            match connected {
                Ok(source) => {
                    summary.connections += 1;
                    log_stream_event!("connected", url = %self.url, attempt);
                    if !self.publish(StreamEvent::Status(StreamStatus::Connected)) {
                        break;
                    }
                    match self.read_session(source, &mut shutdown, &mut summary).await {
                        SessionEnd::Closed => {}
                        SessionEnd::Shutdown | SessionEnd::ReceiverGone => break,
                    }
                }
                Err(e) => {
                    warn!(url = %self.url, attempt, error = %e, "alert stream connection failed");
                }
            }

            if !self.publish(StreamEvent::Status(StreamStatus::Disconnected)) {
                break;
            }
            log_stream_event!("reconnect_scheduled", attempt, delay_ms);

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        log_stream_event!(
            "stopped",
            attempts = summary.attempts,
            alerts = summary.alerts_delivered,
            dropped = summary.malformed_dropped
        );
        summary
    }

    async fn read_session(
        &self,
        mut source: Box<dyn FrameSource>,
        shutdown: &mut watch::Receiver<bool>,
        summary: &mut StreamSummary,
    ) -> SessionEnd {
        loop {
            let frame = tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                frame = source.next_frame() => frame,
            };

            match frame {
                None => {
                    log_stream_event!("closed", reason = "eof");
                    return SessionEnd::Closed;
                }
                Some(Err(e)) => {
                    warn!(url = %self.url, error = %e, "alert stream error");
                    return SessionEnd::Closed;
                }
                Some(Ok(Frame::Text(payload))) => match normalize_alert(&payload) {
                    Ok(alert) => {
                        summary.alerts_delivered += 1;
                        if !self.publish(StreamEvent::Alert(alert)) {
                            return SessionEnd::ReceiverGone;
                        }
                    }
                    Err(e) => {
                        summary.malformed_dropped += 1;
                        warn!(error = %e, len = payload.len(), "dropping malformed alert frame");
                    }
                },
                Some(Ok(Frame::Binary(len))) => {
                    debug!(len, "ignoring binary frame");
                }
                Some(Ok(Frame::Control)) => {}
                Some(Ok(Frame::Close(reason))) => {
                    log_stream_event!("closed", reason = reason.as_deref().unwrap_or(""));
                    return SessionEnd::Closed;
                }
            }
        }
    }

    fn publish(&self, event: StreamEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Handle to a spawned [`ConnectionManager`].
pub struct StreamHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<StreamSummary>,
}

impl StreamHandle {
    /// Signal the manager to stop at its next await point.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the manager to stop.
    pub async fn join(self) -> Option<StreamSummary> {
        self.task.await.ok()
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
