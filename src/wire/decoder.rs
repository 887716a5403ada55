//! Binary frame message decoder
//!
//! Decoding is all-or-nothing: a single cursor walks the message front to back
//! and the first structural violation rejects the whole message. Image bytes are
//! sliced out of the original buffer without copying.

use super::format::{FrameHeader, MessageType, PayloadBracket};
use crate::error::{DecodeError, Section};
use crate::types::{EncodedImage, FrameBatch};
use bytes::Bytes;
use std::collections::BTreeMap;
use tracing::{trace, warn};

/// Decode one binary frame message into a [`FrameBatch`].
///
/// Rejects the message when any record carries the wrong type tag or frame
/// number, when the footer disagrees with the header about the camera count,
/// when the header announces no cameras, when an image length is negative,
/// when the buffer ends early, or when bytes remain after the footer.
pub fn decode_frame_message(message: &Bytes) -> Result<FrameBatch, DecodeError> {
    let mut cursor = Cursor::new(message);

    let header = PayloadBracket::parse(cursor.take_record(Section::PayloadHeader)?);
    expect_type(Section::PayloadHeader, MessageType::PayloadHeader, header.message_type)?;

    let frame_number = header.frame_number;
    if header.number_of_cameras <= 0 {
        return Err(DecodeError::InvalidCameraCount { count: header.number_of_cameras });
    }
    let declared_cameras = header.number_of_cameras as usize;

    let mut images = BTreeMap::new();
    for index in 0..declared_cameras {
        let section = Section::FrameHeader(index);
        let frame = FrameHeader::parse(cursor.take_record(section)?);
        expect_type(section, MessageType::FrameHeader, frame.message_type)?;
        expect_frame_number(section, frame_number, frame.frame_number)?;

        if frame.jpeg_length < 0 {
            return Err(DecodeError::InvalidImageLength { section, length: frame.jpeg_length });
        }
        let jpeg = cursor.take_bytes(frame.jpeg_length as usize, Section::ImageData(index))?;

        let image = EncodedImage {
            camera_id: frame.camera_id,
            image_width: frame.image_width,
            image_height: frame.image_height,
            color_channels: frame.color_channels,
            jpeg,
        };
        if let Some(previous) = images.insert(image.camera_id.clone(), image) {
            warn!(
                frame_number,
                camera_id = %previous.camera_id,
                "Duplicate camera id in frame message, keeping the later record"
            );
        }
    }

    let footer = PayloadBracket::parse(cursor.take_record(Section::PayloadFooter)?);
    expect_type(Section::PayloadFooter, MessageType::PayloadFooter, footer.message_type)?;
    expect_frame_number(Section::PayloadFooter, frame_number, footer.frame_number)?;
    if footer.number_of_cameras != header.number_of_cameras {
        return Err(DecodeError::CameraCountMismatch {
            expected: header.number_of_cameras,
            found: footer.number_of_cameras,
        });
    }

    let trailing = cursor.remaining();
    if trailing != 0 {
        return Err(DecodeError::TrailingBytes { trailing, total: message.len() });
    }

    trace!(frame_number, cameras = images.len(), bytes = message.len(), "Decoded frame message");

    Ok(FrameBatch { frame_number, declared_cameras, images })
}

fn expect_type(section: Section, expected: MessageType, found: u8) -> Result<(), DecodeError> {
    if found == expected as u8 {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedMessageType { section, expected: expected as u8, found })
    }
}

fn expect_frame_number(section: Section, expected: i64, found: i64) -> Result<(), DecodeError> {
    if found == expected {
        Ok(())
    } else {
        Err(DecodeError::FrameNumberMismatch { section, expected, found })
    }
}

/// Read position over the message buffer.
struct Cursor<'a> {
    message: &'a Bytes,
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(message: &'a Bytes) -> Self {
        Self { message, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.message.len() - self.offset
    }

    fn take_record<const N: usize>(&mut self, section: Section) -> Result<&'a [u8; N], DecodeError> {
        let message: &'a [u8] = self.message;
        let rest = &message[self.offset..];
        let (record, _) = rest.split_first_chunk::<N>().ok_or(DecodeError::Truncated {
            section,
            offset: self.offset,
            needed: N,
            available: rest.len(),
        })?;
        self.offset += N;
        Ok(record)
    }

    fn take_bytes(&mut self, len: usize, section: Section) -> Result<Bytes, DecodeError> {
        let available = self.remaining();
        if len > available {
            return Err(DecodeError::Truncated { section, offset: self.offset, needed: len, available });
        }
        let bytes = self.message.slice(self.offset..self.offset + len);
        self.offset += len;
        Ok(bytes)
    }
}
