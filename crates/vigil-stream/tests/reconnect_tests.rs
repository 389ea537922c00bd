//! Connection manager behavior under a scripted transport.
//!
//! The clock is paused so reconnect delays are observed exactly without
//! the tests actually sleeping.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use vigil_stream::{
    ConnectionManager, Connector, Frame, FrameSource, StreamError, StreamEvent, StreamStatus,
};

const DELAY: Duration = Duration::from_secs(5);

/// What one connection attempt does.
enum Session {
    /// Connection refused
    Refuse,
    /// Yield these frames, then end
    Frames(Vec<Frame>),
    /// Yield these frames, then stay open
    Hold(Vec<Frame>),
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    script: Arc<Mutex<VecDeque<Session>>>,
    connects: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedConnector {
    fn new(sessions: Vec<Session>) -> Self {
        Self {
            script: Arc::new(Mutex::new(sessions.into())),
            connects: Arc::default(),
        }
    }

    fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> vigil_stream::Result<Box<dyn FrameSource>> {
        self.connects.lock().unwrap().push(Instant::now());
        let session = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Session::Hold(Vec::new()));

        match session {
            Session::Refuse => Err(StreamError::connect(url, "connection refused")),
            Session::Frames(frames) => Ok(Box::new(ScriptedSource {
                frames: frames.into(),
                hold: false,
            })),
            Session::Hold(frames) => Ok(Box::new(ScriptedSource {
                frames: frames.into(),
                hold: true,
            })),
        }
    }
}

struct ScriptedSource {
    frames: VecDeque<Frame>,
    hold: bool,
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Option<vigil_stream::Result<Frame>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.hold {
            std::future::pending::<()>().await;
        }
        None
    }
}

fn alert_json(src_ip: &str, severity: i64) -> Frame {
    Frame::Text(
        serde_json::json!({
            "timestamp": "2025-01-15T10:30:00Z",
            "src_ip": src_ip,
            "signature": "ET SCAN",
            "severity": severity
        })
        .to_string(),
    )
}

fn drain(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn alert_ips(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Alert(a) => a.src_ip.clone(),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod reconnect {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_waits_fixed_delay_once_per_closure() {
        let connector = ScriptedConnector::new(vec![
            Session::Frames(vec![]),
            Session::Refuse,
            Session::Frames(vec![Frame::Close(None)]),
            Session::Hold(vec![]),
        ]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector.clone(), "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(60)).await;
        shutdown_tx.send(true).unwrap();
        let summary = task.await.unwrap();

        let times = connector.connect_times();
        assert_eq!(times.len(), 4, "one attempt per closure, then held open");
        for pair in times.windows(2) {
            let gap = pair[1] - pair[0];
            assert!(gap >= DELAY, "reconnected after {gap:?}");
            assert!(gap < DELAY + Duration::from_secs(1), "waited {gap:?}");
        }
        assert_eq!(summary.attempts, 4);
        assert_eq!(summary.connections, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_attempt_limit() {
        let sessions = (0..50).map(|_| Session::Refuse).collect();
        let connector = ScriptedConnector::new(sessions);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector.clone(), "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        // 50 refusals take 250s; the 51st attempt is held open.
        tokio::time::sleep(Duration::from_secs(300)).await;
        shutdown_tx.send(true).unwrap();
        let summary = task.await.unwrap();

        assert_eq!(summary.attempts, 51);
        assert_eq!(summary.connections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_delay_stops_without_retry() {
        let connector = ScriptedConnector::new(vec![Session::Refuse]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector.clone(), "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        let started = Instant::now();
        shutdown_tx.send(true).unwrap();
        let summary = task.await.unwrap();

        assert_eq!(summary.attempts, 1);
        assert!(started.elapsed() < DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_shutdown_sender_stops_manager() {
        let connector = ScriptedConnector::new(vec![Session::Hold(vec![])]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector, "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(shutdown_tx);
        let summary = task.await.unwrap();
        assert_eq!(summary.connections, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receiver_gone_stops_manager() {
        let connector =
            ScriptedConnector::new(vec![Session::Hold(vec![alert_json("10.0.0.5", 2)])]);
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(rx);

        let manager = ConnectionManager::new(connector, "ws://test/ws/alerts", DELAY, tx);
        let summary = manager.run(shutdown_rx).await;
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.alerts_delivered, 0);
    }
}

#[cfg(test)]
mod delivery {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_alerts_delivered_in_order_and_malformed_dropped() {
        let connector = ScriptedConnector::new(vec![Session::Hold(vec![
            alert_json("10.0.0.1", 1),
            Frame::Text("not json".to_string()),
            Frame::Binary(16),
            Frame::Text("[1,2,3]".to_string()),
            Frame::Text(r#"{"src_ip":"10.9.9.9"}"#.to_string()),
            Frame::Control,
            alert_json("10.0.0.2", 3),
        ])]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector, "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown_tx.send(true).unwrap();
        let summary = task.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events[..2],
            [
                StreamEvent::Status(StreamStatus::Connecting),
                StreamEvent::Status(StreamStatus::Connected)
            ]
        );
        assert_eq!(alert_ips(&events), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(summary.alerts_delivered, 2);
        assert_eq!(summary.malformed_dropped, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_frame_ends_session_and_nothing_after_it_is_read() {
        let connector = ScriptedConnector::new(vec![
            Session::Frames(vec![
                alert_json("10.0.0.1", 2),
                Frame::Close(Some("going away".to_string())),
                alert_json("10.0.0.99", 2),
            ]),
            Session::Hold(vec![alert_json("10.0.0.2", 2)]),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector, "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(alert_ips(&events), vec!["10.0.0.1", "10.0.0.2"]);

        let statuses: Vec<StreamStatus> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Status(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                StreamStatus::Connecting,
                StreamStatus::Connected,
                StreamStatus::Disconnected,
                StreamStatus::Connecting,
                StreamStatus::Connected,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_delivered_while_disconnected() {
        let connector = ScriptedConnector::new(vec![Session::Refuse, Session::Refuse]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let manager = ConnectionManager::new(connector, "ws://test/ws/alerts", DELAY, tx);
        let task = tokio::spawn(manager.run(shutdown_rx));

        tokio::time::sleep(Duration::from_secs(7)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let events = drain(&mut rx);
        assert!(alert_ips(&events).is_empty());
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, StreamEvent::Status(StreamStatus::Connected)))
        );
    }
}
