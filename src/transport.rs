//! Transport traits the feed runs on
//!
//! The driver never touches a socket directly. [`Connector`] opens one
//! [`Transport`] per attempt; production code uses the WebSocket implementation
//! in [`crate::transports`], tests use a scripted mock.

use crate::Result;
use bytes::Bytes;

/// One received application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    /// Frame payload
    Binary(Bytes),
    /// JSON control message
    Text(String),
}

/// An open, message-oriented connection to the backend.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Wait for the next application message.
    ///
    /// Returns:
    /// - `Some(Ok(message))` - message received
    /// - `Some(Err(e))` - the connection failed; it is unusable afterwards
    /// - `None` - the peer closed the connection
    ///
    /// Control frames (ping, pong) are handled internally and never returned.
    async fn recv(&mut self) -> Option<Result<WireMessage>>;

    /// Send a text message. Fails with [`crate::FeedError::Closed`] once closed.
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the connection. Idempotent.
    async fn close(&mut self);

    /// Whether the connection can currently send.
    fn is_open(&self) -> bool;
}

/// Opens transports.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport>;
}
