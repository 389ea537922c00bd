//! Transport seam between the connection manager and the wire.
//!
//! [`WsConnector`] opens real WebSocket connections with tokio-tungstenite.
//! Tests substitute their own [`Connector`] to script sessions.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{Result, StreamError};

/// One inbound frame, reduced to what the manager cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text payload, expected to be one alert
    Text(String),
    /// A binary payload of the given length
    Binary(usize),
    /// Ping or pong; the transport answers pings itself
    Control,
    /// The peer closed the connection
    Close(Option<String>),
}

/// An open connection yielding frames in transport order.
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame, or `None` once the connection has ended.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Opens connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSource>>;
}

/// WebSocket connector (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn FrameSource>> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| StreamError::connect(url, e.to_string()))?;
        Ok(Box::new(WsSource { stream }))
    }
}

struct WsSource {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(e.into())),
            };
            let frame = match message {
                Message::Text(text) => Frame::Text(text.to_string()),
                Message::Binary(data) => Frame::Binary(data.len()),
                Message::Ping(_) | Message::Pong(_) => Frame::Control,
                Message::Close(close) => Frame::Close(close.map(|c| c.reason.to_string())),
                // Raw frames are never yielded when reading.
                Message::Frame(_) => continue,
            };
            return Some(Ok(frame));
        }
    }
}
