//! Frame acknowledgments
//!
//! The backend sends the next frame only after the previous one was
//! acknowledged. An acknowledgment goes out once per fully processed message and
//! only while the connection is open; if it cannot be sent it is dropped, never
//! queued for a later connection.

use crate::protocol::ClientMessage;
use crate::transport::Transport;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct AckEmitter {
    sent: u64,
    dropped: u64,
    last_acknowledged: Option<i64>,
}

impl AckEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge `frame_number` on `transport`.
    ///
    /// Returns whether the acknowledgment was sent.
    pub async fn acknowledge<T>(&mut self, transport: &mut T, frame_number: i64) -> bool
    where
        T: Transport + ?Sized,
    {
        if !transport.is_open() {
            self.dropped += 1;
            warn!(frame_number, "Cannot acknowledge frame: connection not open");
            return false;
        }

        let text = match ClientMessage::acknowledgment(frame_number).to_json() {
            Ok(text) => text,
            Err(e) => {
                self.dropped += 1;
                warn!(frame_number, "Cannot encode acknowledgment: {}", e);
                return false;
            }
        };

        match transport.send_text(text).await {
            Ok(()) => {
                self.sent += 1;
                self.last_acknowledged = Some(frame_number);
                debug!(frame_number, "Acknowledged frame");
                true
            }
            Err(e) => {
                self.dropped += 1;
                warn!(frame_number, "Failed to send acknowledgment: {}", e);
                false
            }
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last_acknowledged(&self) -> Option<i64> {
        self.last_acknowledged
    }
}
