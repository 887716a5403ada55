//! Per-message processing
//!
//! One binary message runs decode, materialize, install and acknowledge in that
//! order before the next message is read. A structurally invalid message stops
//! at decode: nothing is installed and nothing is acknowledged.

use crate::ack::AckEmitter;
use crate::bitmaps::BitmapStore;
use crate::error::DecodeError;
use crate::protocol::ServerMessage;
use crate::stats::{Framerate, FramerateTracker};
use crate::transport::{Transport, WireMessage};
use crate::wire::decode_frame_message;
use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// What happened to one received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Frame batch installed
    Processed {
        frame_number: i64,
        installed: usize,
        failed: usize,
        acknowledged: bool,
    },
    /// Binary message failed structural validation
    Rejected(DecodeError),
    /// Server text message published to subscribers
    Dispatched,
    /// Text message that did not parse; dropped
    Ignored,
}

/// Processes the messages of one connection.
pub struct FramePipeline {
    store: Arc<BitmapStore>,
    acks: AckEmitter,
    framerate: FramerateTracker,
    framerate_tx: Arc<watch::Sender<Option<Framerate>>>,
    server_tx: broadcast::Sender<ServerMessage>,
    last_frame_number: Option<i64>,
    processed: u64,
    rejected: u64,
}

impl FramePipeline {
    pub fn new(
        store: Arc<BitmapStore>,
        framerate_window: usize,
        framerate_tx: Arc<watch::Sender<Option<Framerate>>>,
        server_tx: broadcast::Sender<ServerMessage>,
    ) -> Self {
        Self {
            store,
            acks: AckEmitter::new(),
            framerate: FramerateTracker::new(framerate_window),
            framerate_tx,
            server_tx,
            last_frame_number: None,
            processed: 0,
            rejected: 0,
        }
    }

    pub async fn handle<T>(&mut self, transport: &mut T, message: WireMessage) -> Outcome
    where
        T: Transport + ?Sized,
    {
        match message {
            WireMessage::Binary(bytes) => self.process_binary(transport, &bytes).await,
            WireMessage::Text(text) => self.process_text(&text),
        }
    }

    /// Decode, materialize, install and acknowledge one frame message.
    pub async fn process_binary<T>(&mut self, transport: &mut T, message: &Bytes) -> Outcome
    where
        T: Transport + ?Sized,
    {
        let batch = match decode_frame_message(message) {
            Ok(batch) => batch,
            Err(e) => {
                self.rejected += 1;
                warn!(bytes = message.len(), "Rejecting frame message: {}", e);
                return Outcome::Rejected(e);
            }
        };

        let frame_number = batch.frame_number;
        if let Some(last) = self.last_frame_number.filter(|&last| frame_number <= last) {
            warn!(frame_number, last_frame_number = last, "Frame number did not increase");
        }

        let materialized = self.store.materialize(&batch).await;
        let installed = materialized.bitmaps.len();
        let failed = materialized.failed.len();
        self.store.install(materialized);

        if let Some(rate) = self.framerate.record(Instant::now()) {
            self.framerate_tx.send_replace(Some(rate));
        }

        let acknowledged = self.acks.acknowledge(transport, frame_number).await;
        self.last_frame_number = Some(frame_number);
        self.processed += 1;

        trace!(frame_number, installed, failed, acknowledged, "Processed frame message");

        Outcome::Processed { frame_number, installed, failed, acknowledged }
    }

    /// Parse a text message and publish it to subscribers.
    pub fn process_text(&self, text: &str) -> Outcome {
        match ServerMessage::parse(text) {
            Ok(message) => {
                debug!(kind = message.kind(), "Server message");
                // No subscribers is fine
                let _ = self.server_tx.send(message);
                Outcome::Dispatched
            }
            Err(e) => {
                let preview: String = text.chars().take(80).collect();
                warn!("Ignoring unrecognized text message ({}): {}", e, preview);
                Outcome::Ignored
            }
        }
    }

    /// Forget per-connection history after a reconnect.
    pub fn reset_connection(&mut self) {
        self.last_frame_number = None;
        self.framerate.reset();
        self.framerate_tx.send_replace(None);
    }

    pub fn last_frame_number(&self) -> Option<i64> {
        self.last_frame_number
    }

    pub fn acks(&self) -> &AckEmitter {
        &self.acks
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}
