//! Frame message encoder
//!
//! Produces messages in the backend's layout. Used by the mock backend in tests
//! and benchmarks; individual fields can be overridden to produce malformed
//! messages on purpose.

use super::format::{FrameHeader, MessageType, PayloadBracket};
use bytes::Bytes;

#[derive(Debug, Clone)]
struct CameraRecord {
    camera_id: String,
    image_width: i32,
    image_height: i32,
    color_channels: i32,
    jpeg: Vec<u8>,
    message_type: u8,
    frame_number: Option<i64>,
    jpeg_length: Option<i32>,
}

/// Builder for binary frame messages.
///
/// ```rust
/// use camfeed::wire::{FrameMessageBuilder, decode_frame_message};
///
/// let message = FrameMessageBuilder::new(42)
///     .camera("cam_0", 640, 480, 3, vec![0xFF, 0xD8, 0xFF, 0xD9])
///     .build();
///
/// let batch = decode_frame_message(&message).unwrap();
/// assert_eq!(batch.frame_number, 42);
/// ```
#[derive(Debug, Clone)]
pub struct FrameMessageBuilder {
    frame_number: i64,
    cameras: Vec<CameraRecord>,
    header_type: u8,
    footer_type: u8,
    declared_cameras: Option<i32>,
    footer_cameras: Option<i32>,
    footer_frame_number: Option<i64>,
}

impl FrameMessageBuilder {
    pub fn new(frame_number: i64) -> Self {
        Self {
            frame_number,
            cameras: Vec::new(),
            header_type: MessageType::PayloadHeader as u8,
            footer_type: MessageType::PayloadFooter as u8,
            declared_cameras: None,
            footer_cameras: None,
            footer_frame_number: None,
        }
    }

    /// Append one camera record.
    pub fn camera(
        mut self,
        camera_id: impl Into<String>,
        image_width: i32,
        image_height: i32,
        color_channels: i32,
        jpeg: Vec<u8>,
    ) -> Self {
        self.cameras.push(CameraRecord {
            camera_id: camera_id.into(),
            image_width,
            image_height,
            color_channels,
            jpeg,
            message_type: MessageType::FrameHeader as u8,
            frame_number: None,
            jpeg_length: None,
        });
        self
    }

    pub fn header_type(mut self, tag: u8) -> Self {
        self.header_type = tag;
        self
    }

    pub fn footer_type(mut self, tag: u8) -> Self {
        self.footer_type = tag;
        self
    }

    /// Camera count written to the header (and to the footer unless overridden)
    pub fn declared_cameras(mut self, count: i32) -> Self {
        self.declared_cameras = Some(count);
        self
    }

    pub fn footer_cameras(mut self, count: i32) -> Self {
        self.footer_cameras = Some(count);
        self
    }

    pub fn footer_frame_number(mut self, frame_number: i64) -> Self {
        self.footer_frame_number = Some(frame_number);
        self
    }

    /// Override the tag of the camera record at `index`.
    pub fn frame_type(mut self, index: usize, tag: u8) -> Self {
        if let Some(camera) = self.cameras.get_mut(index) {
            camera.message_type = tag;
        }
        self
    }

    /// Override the frame number of the camera record at `index`.
    pub fn frame_number_override(mut self, index: usize, frame_number: i64) -> Self {
        if let Some(camera) = self.cameras.get_mut(index) {
            camera.frame_number = Some(frame_number);
        }
        self
    }

    /// Override the announced JPEG length of the camera record at `index`.
    /// The actual bytes written are unchanged.
    pub fn jpeg_length_override(mut self, index: usize, length: i32) -> Self {
        if let Some(camera) = self.cameras.get_mut(index) {
            camera.jpeg_length = Some(length);
        }
        self
    }

    /// Serialize the message.
    pub fn build(self) -> Bytes {
        let declared = self.declared_cameras.unwrap_or(self.cameras.len() as i32);
        let image_bytes: usize = self.cameras.iter().map(|camera| camera.jpeg.len()).sum();
        let mut buf = Vec::with_capacity(
            PayloadBracket::SIZE * 2 + FrameHeader::SIZE * self.cameras.len() + image_bytes,
        );

        PayloadBracket {
            message_type: self.header_type,
            frame_number: self.frame_number,
            number_of_cameras: declared,
        }
        .write_to(&mut buf);

        for camera in self.cameras {
            FrameHeader {
                message_type: camera.message_type,
                frame_number: camera.frame_number.unwrap_or(self.frame_number),
                camera_id: camera.camera_id,
                image_width: camera.image_width,
                image_height: camera.image_height,
                color_channels: camera.color_channels,
                jpeg_length: camera.jpeg_length.unwrap_or(camera.jpeg.len() as i32),
            }
            .write_to(&mut buf);
            buf.extend_from_slice(&camera.jpeg);
        }

        PayloadBracket {
            message_type: self.footer_type,
            frame_number: self.footer_frame_number.unwrap_or(self.frame_number),
            number_of_cameras: self.footer_cameras.unwrap_or(declared),
        }
        .write_to(&mut buf);

        Bytes::from(buf)
    }
}
