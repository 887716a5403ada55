//! Client library for live multi-camera frame feeds.
//!
//! A camera backend pushes one binary WebSocket message per captured instant,
//! carrying a JPEG for every camera. camfeed decodes those messages, turns the
//! JPEGs into drawable bitmaps, acknowledges each processed frame so the backend
//! can send the next one, and keeps the connection alive with capped
//! exponential backoff.
//!
//! # Features
//!
//! - **Strict decoding**: a message is accepted whole or not at all
//! - **Bounded memory**: each camera's previous bitmap is released as soon as
//!   its successor is installed
//! - **Backpressure**: exactly one acknowledgment per processed frame
//! - **Observable lifecycle**: connection state, framerate and server messages
//!   are all watch or broadcast channels
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use camfeed::{Camfeed, UpdateRate};
//! use futures::StreamExt;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> camfeed::Result<()> {
//!     let feed = Camfeed::connect("ws://localhost:8006/websocket/connect")?;
//!     let mut frames = feed.subscribe(UpdateRate::Native);
//!
//!     while let Some(latest) = frames.next().await {
//!         println!("frame {:?}: {} cameras", latest.frame_number, latest.len());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire format and message handling
pub mod ack;
pub mod bitmaps;
pub mod pipeline;
pub mod protocol;
pub mod wire;

// Connection architecture
pub mod connection;
pub mod driver;
pub mod transport;
pub mod transports;

// Support
pub mod config;
pub mod stats;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

pub use bitmaps::BitmapStore;
pub use config::FeedConfig;
pub use connection::{Backoff, FeedConnection};
pub use protocol::{ClientMessage, ServerMessage};
pub use stats::Framerate;
pub use transport::{Connector, Transport, WireMessage};
pub use transports::WsConnector;

/// Entry point for camera feed connections.
///
/// ```rust,no_run
/// use camfeed::{Camfeed, FeedConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> camfeed::Result<()> {
/// let config = FeedConfig::from_file("camfeed.yaml")?.apply_env()?;
/// let feed = Camfeed::connect_with_config(config)?;
/// # Ok(())
/// # }
/// ```
pub struct Camfeed;

impl Camfeed {
    /// Connect to `url` with default settings.
    ///
    /// Returns immediately; progress is reported through
    /// [`FeedConnection::state_updates`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `url` is not a `ws://` or `wss://` URL.
    pub fn connect(url: impl Into<String>) -> Result<FeedConnection> {
        FeedConnection::open(FeedConfig::with_url(url))
    }

    /// Connect with a full configuration.
    pub fn connect_with_config(config: FeedConfig) -> Result<FeedConnection> {
        FeedConnection::open(config)
    }
}
