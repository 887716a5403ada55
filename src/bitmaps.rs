//! Bitmap materialization and the per-camera bitmap store
//!
//! A validated [`FrameBatch`] still holds compressed JPEG bytes. The store decodes
//! every camera concurrently on the blocking pool, then installs the results in
//! one step so observers never see a half-updated set.
//!
//! ## Release
//!
//! The store keeps one `Arc<Bitmap>` per camera. Installing a newer bitmap for a
//! camera drops the store's reference to the previous one, so a renderer that is
//! not holding on to an old snapshot sees its memory released immediately. The
//! number of bitmaps still alive is available from [`BitmapStore::live_bitmaps`].

use crate::types::{Bitmap, FrameBatch, LatestBitmaps, LiveCounter};
use crate::{FeedError, Result};
use futures::future::join_all;
use image::{ImageFormat, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Decoded images of one batch, ready to install.
#[derive(Debug, Default)]
pub struct Materialized {
    pub frame_number: i64,
    pub bitmaps: HashMap<String, Arc<Bitmap>>,
    /// Cameras whose JPEG bytes could not be decoded
    pub failed: Vec<String>,
}

/// Latest bitmap per camera, shared with renderers through a watch channel.
#[derive(Debug)]
pub struct BitmapStore {
    latest: watch::Sender<LatestBitmaps>,
    live: LiveCounter,
}

impl Default for BitmapStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BitmapStore {
    pub fn new() -> Self {
        Self { latest: watch::Sender::new(LatestBitmaps::default()), live: LiveCounter::default() }
    }

    /// Decode every camera of `batch` concurrently.
    ///
    /// A camera whose bytes do not decode is logged and left out; the rest of
    /// the batch is unaffected.
    pub async fn materialize(&self, batch: &FrameBatch) -> Materialized {
        let frame_number = batch.frame_number;

        let tasks = batch.images.values().map(|image| {
            let camera_id = image.camera_id.clone();
            let jpeg = image.jpeg.clone();
            let live = self.live.clone();
            let handle = tokio::task::spawn_blocking(move || {
                decode_jpeg(&camera_id, &jpeg)
                    .map(|pixels| Bitmap::new(camera_id, frame_number, pixels, &live))
            });
            async move { (image.camera_id.as_str(), handle.await) }
        });

        let mut materialized = Materialized { frame_number, ..Materialized::default() };
        for (camera_id, result) in join_all(tasks).await {
            match result {
                Ok(Ok(bitmap)) => {
                    materialized.bitmaps.insert(camera_id.to_string(), Arc::new(bitmap));
                }
                Ok(Err(e)) => {
                    let cause = std::error::Error::source(&e).map(ToString::to_string);
                    warn!(frame_number, camera_id, cause = cause.as_deref().unwrap_or("unknown"), "{}", e);
                    materialized.failed.push(camera_id.to_string());
                }
                Err(e) => {
                    warn!(frame_number, camera_id, "Image decode task failed: {}", e);
                    materialized.failed.push(camera_id.to_string());
                }
            }
        }

        materialized
    }

    /// Replace each camera's bitmap with the newly decoded one.
    ///
    /// Cameras not present in `materialized` keep their current bitmap.
    pub fn install(&self, materialized: Materialized) {
        let Materialized { frame_number, bitmaps, .. } = materialized;
        let installed = bitmaps.len();

        self.latest.send_modify(|latest| {
            latest.frame_number = Some(frame_number);
            for (camera_id, bitmap) in bitmaps {
                // Replaced Arc drops here
                latest.bitmaps.insert(camera_id, bitmap);
            }
        });

        debug!(frame_number, installed, live = self.live.get(), "Installed bitmaps");
    }

    /// Drop every bitmap and forget the last frame number.
    pub fn clear(&self) {
        self.latest.send_modify(|latest| {
            latest.bitmaps.clear();
            latest.frame_number = None;
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<LatestBitmaps> {
        self.latest.subscribe()
    }

    /// Cheap clone of the current bitmaps
    pub fn snapshot(&self) -> LatestBitmaps {
        self.latest.borrow().clone()
    }

    pub fn bitmap(&self, camera_id: &str) -> Option<Arc<Bitmap>> {
        self.latest.borrow().get(camera_id).cloned()
    }

    /// Bitmaps created by this store that have not been released yet
    pub fn live_bitmaps(&self) -> usize {
        self.live.get()
    }
}

/// Decode JPEG bytes into RGBA8 pixels.
pub fn decode_jpeg(camera_id: &str, jpeg: &[u8]) -> Result<RgbaImage> {
    image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| FeedError::image_error(camera_id, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{batch_from, tiny_jpeg};

    #[test]
    fn decodes_valid_jpeg() {
        let pixels = decode_jpeg("cam_0", &tiny_jpeg(4, 3)).unwrap();
        assert_eq!(pixels.dimensions(), (4, 3));
    }

    #[test]
    fn invalid_jpeg_names_the_camera() {
        let error = decode_jpeg("cam_7", b"definitely not a jpeg").unwrap_err();
        assert!(matches!(&error, FeedError::Image { camera_id, .. } if camera_id == "cam_7"));
    }

    #[tokio::test]
    async fn materializes_every_camera() {
        let store = BitmapStore::new();
        let batch = batch_from(42, &[("cam_0", tiny_jpeg(1, 1)), ("cam_1", tiny_jpeg(2, 2))]);

        let materialized = store.materialize(&batch).await;
        assert_eq!(materialized.frame_number, 42);
        assert_eq!(materialized.bitmaps.len(), 2);
        assert!(materialized.failed.is_empty());
        assert_eq!(materialized.bitmaps["cam_1"].width(), 2);

        store.install(materialized);
        let latest = store.snapshot();
        assert_eq!(latest.frame_number, Some(42));
        assert_eq!(latest.camera_ids(), ["cam_0", "cam_1"]);
    }

    #[tokio::test]
    async fn corrupt_camera_is_omitted() {
        let store = BitmapStore::new();
        let batch = batch_from(
            1,
            &[("cam_0", tiny_jpeg(1, 1)), ("cam_1", b"garbage".to_vec()), ("cam_2", tiny_jpeg(1, 1))],
        );

        let materialized = store.materialize(&batch).await;
        assert_eq!(materialized.bitmaps.len(), 2);
        assert_eq!(materialized.failed, ["cam_1"]);
        assert!(!materialized.bitmaps.contains_key("cam_1"));
    }

    #[tokio::test]
    async fn replacing_a_camera_releases_the_old_bitmap() {
        let store = BitmapStore::new();

        let first = store.materialize(&batch_from(1, &[("cam_0", tiny_jpeg(1, 1))])).await;
        store.install(first);
        assert_eq!(store.live_bitmaps(), 1);

        let second = store.materialize(&batch_from(2, &[("cam_0", tiny_jpeg(1, 1))])).await;
        assert_eq!(store.live_bitmaps(), 2, "both alive until the new one is installed");
        store.install(second);

        assert_eq!(store.live_bitmaps(), 1);
        assert_eq!(store.bitmap("cam_0").unwrap().frame_number(), 2);
    }

    #[tokio::test]
    async fn renderer_reference_keeps_bitmap_alive() {
        let store = BitmapStore::new();
        store.install(store.materialize(&batch_from(1, &[("cam_0", tiny_jpeg(1, 1))])).await);

        let held = store.bitmap("cam_0").unwrap();
        store.install(store.materialize(&batch_from(2, &[("cam_0", tiny_jpeg(1, 1))])).await);
        assert_eq!(store.live_bitmaps(), 2);

        drop(held);
        assert_eq!(store.live_bitmaps(), 1);
    }

    #[tokio::test]
    async fn absent_cameras_keep_their_bitmap() {
        let store = BitmapStore::new();
        let both = batch_from(1, &[("cam_0", tiny_jpeg(1, 1)), ("cam_1", tiny_jpeg(1, 1))]);
        store.install(store.materialize(&both).await);

        store.install(store.materialize(&batch_from(2, &[("cam_0", tiny_jpeg(1, 1))])).await);

        let latest = store.snapshot();
        assert_eq!(latest.frame_number, Some(2));
        assert_eq!(latest.get("cam_0").unwrap().frame_number(), 2);
        assert_eq!(latest.get("cam_1").unwrap().frame_number(), 1);
    }

    #[tokio::test]
    async fn clear_releases_everything() {
        let store = BitmapStore::new();
        let batch = batch_from(1, &[("cam_0", tiny_jpeg(1, 1)), ("cam_1", tiny_jpeg(1, 1))]);
        store.install(store.materialize(&batch).await);

        store.clear();
        assert_eq!(store.live_bitmaps(), 0);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.snapshot().frame_number, None);
    }

    #[tokio::test]
    async fn subscribers_see_installs() {
        let store = BitmapStore::new();
        let mut rx = store.subscribe();

        store.install(store.materialize(&batch_from(5, &[("cam_0", tiny_jpeg(1, 1))])).await);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().frame_number, Some(5));
    }
}
