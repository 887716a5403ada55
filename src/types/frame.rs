//! Decoded frame batch types

use bytes::Bytes;
use std::collections::BTreeMap;

/// One camera's still-encoded image taken from a frame message.
///
/// Width, height and channel count are the values announced by the backend.
/// They are informational; the real bitmap dimensions come from decoding `jpeg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub camera_id: String,
    pub image_width: i32,
    pub image_height: i32,
    pub color_channels: i32,
    /// JPEG bytes (zero-copy slice of the wire message)
    pub jpeg: Bytes,
}

/// Validated result of decoding one binary frame message.
///
/// Images are keyed by camera id. A camera id repeated inside one message keeps
/// only its last record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBatch {
    /// Frame number shared by header, every frame record and footer
    pub frame_number: i64,

    /// Camera count declared by the payload header
    pub declared_cameras: usize,

    /// Encoded images by camera id
    pub images: BTreeMap<String, EncodedImage>,
}

impl FrameBatch {
    /// Number of distinct cameras in the batch
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Look up one camera's encoded image
    pub fn image(&self, camera_id: &str) -> Option<&EncodedImage> {
        self.images.get(camera_id)
    }

    /// Camera ids in the batch, sorted
    pub fn camera_ids(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Total encoded image payload in bytes
    pub fn encoded_bytes(&self) -> usize {
        self.images.values().map(|image| image.jpeg.len()).sum()
    }
}
