//! Decoded bitmap resources

use image::RgbaImage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts bitmaps that are still alive for one [`crate::BitmapStore`].
#[derive(Debug, Clone, Default)]
pub(crate) struct LiveCounter(Arc<AtomicUsize>);

impl LiveCounter {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) -> LiveToken {
        self.0.fetch_add(1, Ordering::AcqRel);
        LiveToken(Arc::clone(&self.0))
    }
}

struct LiveToken(Arc<AtomicUsize>);

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A decoded, drawable camera image.
///
/// The pixel buffer is freed when the last `Arc<Bitmap>` referencing it is
/// dropped; the store drops its reference the moment a newer bitmap for the
/// same camera is installed.
pub struct Bitmap {
    camera_id: String,
    frame_number: i64,
    image: RgbaImage,
    _live: LiveToken,
}

impl Bitmap {
    pub(crate) fn new(
        camera_id: String,
        frame_number: i64,
        image: RgbaImage,
        live: &LiveCounter,
    ) -> Self {
        Self { camera_id, frame_number, image, _live: live.acquire() }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Frame number of the message this bitmap was decoded from
    pub fn frame_number(&self) -> i64 {
        self.frame_number
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// RGBA8 pixels, row-major
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("camera_id", &self.camera_id)
            .field("frame_number", &self.frame_number)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}

/// Latest bitmap per camera, as exposed to renderers.
#[derive(Debug, Clone, Default)]
pub struct LatestBitmaps {
    /// Frame number of the most recently installed batch
    pub frame_number: Option<i64>,

    /// Current bitmap by camera id
    pub bitmaps: HashMap<String, Arc<Bitmap>>,
}

impl LatestBitmaps {
    pub fn get(&self, camera_id: &str) -> Option<&Arc<Bitmap>> {
        self.bitmaps.get(camera_id)
    }

    pub fn len(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bitmaps.is_empty()
    }

    /// Camera ids, sorted
    pub fn camera_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bitmaps.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_counter_tracks_bitmap_lifetime() {
        let live = LiveCounter::default();

        let first = Bitmap::new("cam_0".into(), 1, RgbaImage::new(2, 2), &live);
        let second = Arc::new(Bitmap::new("cam_1".into(), 1, RgbaImage::new(2, 2), &live));
        assert_eq!(live.get(), 2);

        drop(first);
        assert_eq!(live.get(), 1);

        let shared = Arc::clone(&second);
        drop(second);
        assert_eq!(live.get(), 1, "still referenced");

        drop(shared);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn bitmap_exposes_dimensions_and_pixels() {
        let live = LiveCounter::default();
        let bitmap = Bitmap::new("cam_0".into(), 5, RgbaImage::new(3, 2), &live);

        assert_eq!(bitmap.width(), 3);
        assert_eq!(bitmap.height(), 2);
        assert_eq!(bitmap.pixels().len(), 3 * 2 * 4);
        assert_eq!(bitmap.frame_number(), 5);
        assert_eq!(bitmap.camera_id(), "cam_0");
    }
}
