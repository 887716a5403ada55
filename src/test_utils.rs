//! Test helpers: synthetic JPEGs and frame messages, plus a scripted transport
//!
//! Available to unit tests and, behind the `benchmark` feature, to benches.

#![cfg(any(test, feature = "benchmark"))]

use crate::protocol::ClientMessage;
use crate::transport::{Connector, Transport, WireMessage};
use crate::types::FrameBatch;
use crate::wire::{FrameMessageBuilder, decode_frame_message};
use crate::{FeedError, Result};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Encode a solid-color RGB image as JPEG.
pub fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
    let pixels = RgbImage::from_pixel(width, height, Rgb([200, 40, 40]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .expect("JPEG encoding of an in-memory image");
    buf.into_inner()
}

/// Well-formed message with `cam_0` and `cam_1`, each a 1x1 JPEG.
pub fn two_camera_message(frame_number: i64) -> Bytes {
    FrameMessageBuilder::new(frame_number)
        .camera("cam_0", 1, 1, 3, tiny_jpeg(1, 1))
        .camera("cam_1", 1, 1, 3, tiny_jpeg(1, 1))
        .build()
}

/// Decoded batch holding the given camera payloads.
pub fn batch_from(frame_number: i64, cameras: &[(&str, Vec<u8>)]) -> FrameBatch {
    let mut builder = FrameMessageBuilder::new(frame_number);
    for (camera_id, jpeg) in cameras {
        builder = builder.camera(*camera_id, 1, 1, 3, jpeg.clone());
    }
    decode_frame_message(&builder.build()).expect("builder output decodes")
}

/// In-memory transport driven by a [`MockHandle`].
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Result<WireMessage>>,
    sent: Arc<Mutex<Vec<String>>>,
    open: bool,
}

/// Server side of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    incoming: Arc<Mutex<Option<mpsc::UnboundedSender<Result<WireMessage>>>>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = Self { incoming: rx, sent: sent.clone(), open: true };
        let handle = MockHandle { incoming: Arc::new(Mutex::new(Some(tx))), sent };
        (transport, handle)
    }
}

impl MockHandle {
    fn push(&self, message: Result<WireMessage>) {
        if let Some(tx) = self.incoming.lock().unwrap().as_ref() {
            let _ = tx.send(message);
        }
    }

    pub fn send_binary(&self, bytes: Bytes) {
        self.push(Ok(WireMessage::Binary(bytes)));
    }

    pub fn send_text(&self, text: &str) {
        self.push(Ok(WireMessage::Text(text.to_string())));
    }

    /// Fail the connection with a transport error.
    pub fn fail(&self, reason: &str) {
        self.push(Err(FeedError::connection_failed(reason)));
        self.disconnect();
    }

    /// Close from the server side once queued messages are drained.
    pub fn disconnect(&self) {
        self.incoming.lock().unwrap().take();
    }

    /// Every text message the client sent, in order
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Frame numbers of the acknowledgments the client sent
    pub fn acknowledged_frames(&self) -> Vec<i64> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str::<ClientMessage>(text).ok())
            .map(|ClientMessage::Acknowledgment { frame_number }| frame_number)
            .collect()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn recv(&mut self) -> Option<Result<WireMessage>> {
        if !self.open {
            return None;
        }
        let message = self.incoming.recv().await;
        if !matches!(message, Some(Ok(_))) {
            self.open = false;
        }
        message
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        if !self.open {
            return Err(FeedError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Result of one scripted connection attempt.
pub enum Attempt {
    /// Connection refused
    Refuse,
    /// Connection accepted with this transport
    Accept(MockTransport),
    /// Attempt never completes
    Hang,
}

/// Connector that plays back a script of attempts; refuses once the script runs out.
#[derive(Clone, Default)]
pub struct MockConnector {
    script: Arc<Mutex<VecDeque<Attempt>>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl MockConnector {
    pub fn new(script: impl IntoIterator<Item = Attempt>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            attempts: Arc::default(),
        }
    }

    /// Queue one more attempt outcome.
    pub fn push(&self, attempt: Attempt) {
        self.script.lock().unwrap().push_back(attempt);
    }

    /// Script an accepted connection and return its server handle.
    pub fn accept_next(&self) -> MockHandle {
        let (transport, handle) = MockTransport::new();
        self.push(Attempt::Accept(transport));
        handle
    }

    /// When each connection attempt started
    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, url: &str) -> Result<MockTransport> {
        self.attempts.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Attempt::Accept(transport)) => Ok(transport),
            Some(Attempt::Hang) => std::future::pending().await,
            Some(Attempt::Refuse) | None => {
                Err(FeedError::connection_failed(format!("{url} refused the connection")))
            }
        }
    }
}
