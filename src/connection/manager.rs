//! Owned connection handle

use crate::bitmaps::BitmapStore;
use crate::config::FeedConfig;
use crate::connection::Lifecycle;
use crate::driver::{Driver, DriverContext};
use crate::pipeline::FramePipeline;
use crate::protocol::ServerMessage;
use crate::stats::Framerate;
use crate::stream::ThrottleExt;
use crate::transport::Connector;
use crate::transports::WsConnector;
use crate::types::{Bitmap, ConnectionState, LatestBitmaps, UpdateRate};
use crate::Result;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct RunningDriver {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Connection to a camera backend.
///
/// Owns the background driver task and every channel renderers read from.
/// Construct it once, hand it to whatever owns the UI, and drop it (or call
/// [`FeedConnection::disconnect`]) to tear everything down.
///
/// ```rust,no_run
/// use camfeed::{FeedConfig, FeedConnection, UpdateRate};
/// use futures::StreamExt;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> camfeed::Result<()> {
/// let mut feed = FeedConnection::open(FeedConfig::default())?;
/// let mut frames = feed.subscribe(UpdateRate::Max(30));
///
/// while let Some(latest) = frames.next().await {
///     for camera_id in latest.camera_ids() {
///         let bitmap = &latest.bitmaps[camera_id];
///         println!("{camera_id}: {}x{}", bitmap.width(), bitmap.height());
///     }
/// }
/// feed.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct FeedConnection<C: Connector = WsConnector> {
    config: FeedConfig,
    connector: Arc<C>,
    store: Arc<BitmapStore>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    framerate_tx: Arc<watch::Sender<Option<Framerate>>>,
    server_tx: broadcast::Sender<ServerMessage>,
    driver: Option<RunningDriver>,
}

impl FeedConnection<WsConnector> {
    /// Validate `config` and start connecting over WebSocket.
    pub fn open(config: FeedConfig) -> Result<Self> {
        let mut connection = Self::new(config, WsConnector)?;
        connection.connect();
        Ok(connection)
    }
}

impl<C: Connector> FeedConnection<C> {
    /// Create an idle connection; nothing happens until [`connect`](Self::connect).
    pub fn new(config: FeedConfig, connector: C) -> Result<Self> {
        config.validate()?;
        let (server_tx, _) = broadcast::channel(config.server_message_capacity);

        Ok(Self {
            config,
            connector: Arc::new(connector),
            store: Arc::new(BitmapStore::new()),
            state_tx: Arc::new(watch::Sender::new(ConnectionState::Disconnected)),
            framerate_tx: Arc::new(watch::Sender::new(None)),
            server_tx,
            driver: None,
        })
    }

    /// Start connecting with a fresh attempt budget.
    ///
    /// No-op while a driver is still running. After the budget was exhausted or
    /// after [`disconnect`](Self::disconnect), this is the manual reconnect.
    pub fn connect(&mut self) {
        if self.driver_running() {
            debug!("Connect requested while driver is running; ignoring");
            return;
        }
        if let Some(previous) = self.driver.take() {
            previous.cancel.cancel();
        }

        info!("Starting camera feed connection to {}", self.config.url);

        let cancel = CancellationToken::new();
        let pipeline = FramePipeline::new(
            self.store.clone(),
            self.config.framerate_window,
            self.framerate_tx.clone(),
            self.server_tx.clone(),
        );
        let handle = Driver::spawn(DriverContext {
            connector: self.connector.clone(),
            url: self.config.url.clone(),
            greeting: self.config.greeting.clone(),
            lifecycle: Lifecycle::new(self.config.backoff(), self.config.max_reconnect_attempts),
            pipeline,
            state: self.state_tx.clone(),
            cancel: cancel.clone(),
        });

        self.driver = Some(RunningDriver { handle, cancel });
    }

    /// A driver that published `Exhausted` has nothing left to do, even if its
    /// task has not been reaped yet.
    fn driver_running(&self) -> bool {
        let exhausted = matches!(self.state(), ConnectionState::Exhausted { .. });
        !exhausted && self.driver.as_ref().is_some_and(|driver| !driver.handle.is_finished())
    }

    /// Stop the driver, close the socket and release all bitmaps.
    pub async fn disconnect(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.cancel.cancel();
            if let Err(e) = driver.handle.await {
                warn!("Connection driver ended abnormally: {}", e);
            }
        }
        self.store.clear();
        self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("Camera feed disconnected");
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Current state, then every change
    pub fn state_updates(&self) -> impl Stream<Item = ConnectionState> + 'static {
        WatchStream::new(self.state_tx.subscribe())
    }

    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Snapshot of the current bitmaps
    pub fn bitmaps(&self) -> LatestBitmaps {
        self.store.snapshot()
    }

    pub fn bitmap(&self, camera_id: &str) -> Option<Arc<Bitmap>> {
        self.store.bitmap(camera_id)
    }

    pub fn bitmap_receiver(&self) -> watch::Receiver<LatestBitmaps> {
        self.store.subscribe()
    }

    /// Bitmap snapshots for a renderer.
    ///
    /// Yields the current bitmaps first, then one snapshot per installed batch,
    /// or at most `Max(hz)` per second keeping only the newest.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, LatestBitmaps> {
        let updates = WatchStream::new(self.store.subscribe());
        match rate.throttle_interval() {
            None => updates.boxed(),
            Some(period) => updates.throttle(period).boxed(),
        }
    }

    /// Most recent framerate figures, if at least two batches arrived
    pub fn framerate(&self) -> Option<Framerate> {
        *self.framerate_tx.borrow()
    }

    pub fn framerate_receiver(&self) -> watch::Receiver<Option<Framerate>> {
        self.framerate_tx.subscribe()
    }

    /// Server text messages received from now on.
    ///
    /// A subscriber that falls behind by more than the configured capacity
    /// skips the missed messages.
    pub fn server_messages(&self) -> impl Stream<Item = ServerMessage> + 'static {
        BroadcastStream::new(self.server_tx.subscribe()).filter_map(|message| async move {
            match message {
                Ok(message) => Some(message),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    warn!(missed, "Server message subscriber lagged");
                    None
                }
            }
        })
    }

    /// Bitmaps decoded by this connection that are still alive
    pub fn live_bitmaps(&self) -> usize {
        self.store.live_bitmaps()
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}

impl<C: Connector> Drop for FeedConnection<C> {
    fn drop(&mut self) {
        if let Some(driver) = &self.driver {
            debug!("Dropping feed connection");
            driver.cancel.cancel();
        }
    }
}
