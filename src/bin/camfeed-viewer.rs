//! Headless feed viewer
//!
//! Connects to a camera backend and logs connection changes, per-camera
//! dimensions and the frontend framerate.
//!
//! ```text
//! camfeed-viewer [config.yaml]
//! ```
//!
//! `CAMFEED_URL` and `CAMFEED_MAX_RECONNECT_ATTEMPTS` override the file.
//! `RUST_LOG` controls verbosity (default `camfeed=info`).

use anyhow::Context;
use camfeed::{ConnectionState, FeedConfig, FeedConnection, ServerMessage, UpdateRate};
use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("camfeed=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => FeedConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => FeedConfig::default(),
    };
    let config = config.apply_env().context("applying environment overrides")?;

    let mut feed = FeedConnection::open(config).context("starting camera feed")?;

    let mut states = feed.state_updates();
    let mut frames = feed.subscribe(UpdateRate::Max(1));
    let mut messages = Box::pin(feed.server_messages());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            Some(state) = states.next() => {
                info!("Connection {}", state);
                if let ConnectionState::Exhausted { .. } = state {
                    warn!("Backend unreachable; giving up");
                    break;
                }
            }
            Some(latest) = frames.next() => {
                if let Some(frame_number) = latest.frame_number {
                    for camera_id in latest.camera_ids() {
                        let bitmap = &latest.bitmaps[camera_id];
                        info!(frame_number, camera_id, "{}x{}", bitmap.width(), bitmap.height());
                    }
                    if let Some(rate) = feed.framerate() {
                        info!(
                            "{:.1} fps (frame time {:?} min, {:?} max)",
                            rate.fps, rate.min_frame_duration, rate.max_frame_duration
                        );
                    }
                }
            }
            Some(message) = messages.next() => match message {
                ServerMessage::LogRecord(record) => {
                    info!(logger = %record.logger_name, "[{}] {}", record.level_name, record.message)
                }
                ServerMessage::RecordingInfo(recording) => {
                    info!(recording = recording.is_recording, "Recording state changed")
                }
                ServerMessage::AppState(state) => {
                    info!(cameras = state.camera_configs.len(), "Backend state {}", state.state_timestamp)
                }
            },
        }
    }

    feed.disconnect().await;
    Ok(())
}
