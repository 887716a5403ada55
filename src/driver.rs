//! Driver task owning the connection lifecycle
//!
//! One driver task holds at most one open transport at a time. It connects,
//! greets the backend, feeds every received message through the
//! [`FramePipeline`] and reconnects with backoff when the connection is lost.
//! All progress is published as [`ConnectionState`] on a watch channel; nothing
//! is returned to the caller as an error.

use crate::connection::{Lifecycle, RetryDecision};
use crate::pipeline::FramePipeline;
use crate::transport::{Connector, Transport};
use crate::types::ConnectionState;
use crate::FeedError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Everything one driver run needs.
pub struct DriverContext<C: Connector> {
    pub connector: Arc<C>,
    pub url: String,
    pub greeting: String,
    pub lifecycle: Lifecycle,
    pub pipeline: FramePipeline,
    pub state: Arc<watch::Sender<ConnectionState>>,
    pub cancel: CancellationToken,
}

/// How an open connection ended.
enum SessionEnd {
    Cancelled,
    Closed,
    Failed(FeedError),
}

/// Spawns and runs the connection task.
pub struct Driver;

impl Driver {
    /// Spawn the connection task.
    ///
    /// The task ends when `cancel` fires (state `Disconnected`) or when the
    /// reconnect budget is used up (state `Exhausted`).
    pub fn spawn<C: Connector>(context: DriverContext<C>) -> JoinHandle<()> {
        tokio::spawn(Self::run(context))
    }

    async fn run<C: Connector>(context: DriverContext<C>) {
        let DriverContext { connector, url, greeting, mut lifecycle, mut pipeline, state, cancel } =
            context;

        info!("Connection driver started for {}", url);

        loop {
            let attempt = lifecycle.next_attempt();
            state.send_replace(ConnectionState::Connecting { attempt });
            debug!(attempt, "Connecting to {}", url);

            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = connector.connect(&url) => result,
            };

            match connected {
                Ok(mut transport) => {
                    lifecycle.on_open();
                    pipeline.reset_connection();
                    state.send_replace(ConnectionState::Connected);
                    info!("Connected to {}", url);

                    if let Err(e) = transport.send_text(greeting.clone()).await {
                        warn!("Failed to send greeting: {}", e);
                    }

                    match Self::receive(&mut transport, &mut pipeline, &cancel).await {
                        SessionEnd::Cancelled => {
                            transport.close().await;
                            break;
                        }
                        SessionEnd::Closed => info!("Connection to {} closed", url),
                        SessionEnd::Failed(e) => warn!("Connection to {} lost: {}", url, e),
                    }
                }
                Err(e) => warn!(attempt, "Connection attempt failed: {}", e),
            }

            match lifecycle.on_failure() {
                RetryDecision::Retry { attempt, delay } => {
                    state.send_replace(ConnectionState::RetryPending { attempt, delay });
                    info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::Exhausted { attempts } => {
                    state.send_replace(ConnectionState::Exhausted { attempts });
                    info!(
                        "Connection driver stopped after {} attempts ({} frames processed)",
                        attempts,
                        pipeline.processed()
                    );
                    return;
                }
            }
        }

        state.send_replace(ConnectionState::Disconnected);
        info!("Connection driver stopped ({} frames processed)", pipeline.processed());
    }

    /// Feed messages through the pipeline until the connection ends.
    async fn receive<T: Transport>(
        transport: &mut T,
        pipeline: &mut FramePipeline,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                next = transport.recv() => next,
            };

            match next {
                Some(Ok(message)) => {
                    pipeline.handle(transport, message).await;
                }
                Some(Err(e)) => return SessionEnd::Failed(e),
                None => return SessionEnd::Closed,
            }
        }
    }
}
