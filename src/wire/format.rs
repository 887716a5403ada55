//! Fixed-layout records of the binary frame message
//!
//! The backend writes aligned C-style structs back to back, so every field sits at
//! a fixed byte offset and alignment padding must be skipped, never interpreted.
//!
//! ## Message Structure
//!
//! 1. **Payload Header** (24 bytes) - message type, frame number, camera count
//! 2. **Frame Header** (48 bytes, once per camera) - camera id and image geometry,
//!    immediately followed by `jpeg_length` bytes of JPEG data
//! 3. **Payload Footer** (24 bytes) - repeats the frame number and camera count
//!
//! All multi-byte integers are little-endian.

use std::borrow::Cow;

/// Total size of the payload header record, including padding.
pub const PAYLOAD_HEADER_SIZE: usize = 24;

/// Size of a frame header record, excluding the image bytes that follow it.
pub const FRAME_HEADER_SIZE: usize = 48;

/// Total size of the payload footer record, including padding.
pub const PAYLOAD_FOOTER_SIZE: usize = 24;

/// Size of the fixed camera id field.
pub const CAMERA_ID_SIZE: usize = 16;

// Shared by all three records
const MESSAGE_TYPE_OFFSET: usize = 0;
const FRAME_NUMBER_OFFSET: usize = 8;

// Payload header / footer
const CAMERA_COUNT_OFFSET: usize = 16;

// Frame header
const CAMERA_ID_OFFSET: usize = 16;
const IMAGE_WIDTH_OFFSET: usize = 32;
const IMAGE_HEIGHT_OFFSET: usize = 36;
const COLOR_CHANNELS_OFFSET: usize = 40;
const JPEG_LENGTH_OFFSET: usize = 44;

/// Record tag stored in the first byte of every record.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    PayloadHeader = 0,
    FrameHeader = 1,
    PayloadFooter = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::PayloadHeader),
            1 => Ok(MessageType::FrameHeader),
            2 => Ok(MessageType::PayloadFooter),
            other => Err(other),
        }
    }
}

/// Payload header or footer; both records share one layout.
///
/// ```text
/// struct payload_bracket {
///   uint8_t message_type;     // offset 0
///   uint8_t pad[7];           // offset 1
///   int64_t frame_number;     // offset 8
///   int32_t number_of_cameras;// offset 16
///   uint8_t pad[4];           // offset 20
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadBracket {
    /// Raw tag byte; validated by the decoder, not here.
    pub message_type: u8,
    pub frame_number: i64,
    pub number_of_cameras: i32,
}

impl PayloadBracket {
    /// Size of the bracket record in bytes
    pub const SIZE: usize = PAYLOAD_HEADER_SIZE;

    pub fn parse(record: &[u8; PAYLOAD_HEADER_SIZE]) -> Self {
        Self {
            message_type: record[MESSAGE_TYPE_OFFSET],
            frame_number: read_i64_le(record, FRAME_NUMBER_OFFSET),
            number_of_cameras: read_i32_le(record, CAMERA_COUNT_OFFSET),
        }
    }

    /// Append the record, zero-filling padding.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        let mut record = [0u8; PAYLOAD_HEADER_SIZE];
        record[MESSAGE_TYPE_OFFSET] = self.message_type;
        record[FRAME_NUMBER_OFFSET..FRAME_NUMBER_OFFSET + 8]
            .copy_from_slice(&self.frame_number.to_le_bytes());
        record[CAMERA_COUNT_OFFSET..CAMERA_COUNT_OFFSET + 4]
            .copy_from_slice(&self.number_of_cameras.to_le_bytes());
        buf.extend_from_slice(&record);
    }
}

/// Per-camera frame header.
///
/// ```text
/// struct frame_header {
///   uint8_t message_type;     // offset 0
///   uint8_t pad[7];           // offset 1
///   int64_t frame_number;     // offset 8
///   char    camera_id[16];    // offset 16, NUL-terminated
///   int32_t image_width;      // offset 32
///   int32_t image_height;     // offset 36
///   int32_t color_channels;   // offset 40
///   int32_t jpeg_length;      // offset 44
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_type: u8,
    pub frame_number: i64,
    pub camera_id: String,
    pub image_width: i32,
    pub image_height: i32,
    pub color_channels: i32,
    pub jpeg_length: i32,
}

impl FrameHeader {
    /// Size of the frame header record in bytes
    pub const SIZE: usize = FRAME_HEADER_SIZE;

    pub fn parse(record: &[u8; FRAME_HEADER_SIZE]) -> Self {
        let mut camera_id = [0u8; CAMERA_ID_SIZE];
        camera_id.copy_from_slice(&record[CAMERA_ID_OFFSET..CAMERA_ID_OFFSET + CAMERA_ID_SIZE]);

        Self {
            message_type: record[MESSAGE_TYPE_OFFSET],
            frame_number: read_i64_le(record, FRAME_NUMBER_OFFSET),
            camera_id: decode_camera_id(&camera_id).into_owned(),
            image_width: read_i32_le(record, IMAGE_WIDTH_OFFSET),
            image_height: read_i32_le(record, IMAGE_HEIGHT_OFFSET),
            color_channels: read_i32_le(record, COLOR_CHANNELS_OFFSET),
            jpeg_length: read_i32_le(record, JPEG_LENGTH_OFFSET),
        }
    }

    /// Append the record, zero-filling padding.
    ///
    /// Camera ids longer than 16 bytes are cut at the field boundary, which
    /// leaves them without a terminator, exactly as the backend does.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        let mut record = [0u8; FRAME_HEADER_SIZE];
        record[MESSAGE_TYPE_OFFSET] = self.message_type;
        record[FRAME_NUMBER_OFFSET..FRAME_NUMBER_OFFSET + 8]
            .copy_from_slice(&self.frame_number.to_le_bytes());

        let id = self.camera_id.as_bytes();
        let id_len = id.len().min(CAMERA_ID_SIZE);
        record[CAMERA_ID_OFFSET..CAMERA_ID_OFFSET + id_len].copy_from_slice(&id[..id_len]);

        for (offset, value) in [
            (IMAGE_WIDTH_OFFSET, self.image_width),
            (IMAGE_HEIGHT_OFFSET, self.image_height),
            (COLOR_CHANNELS_OFFSET, self.color_channels),
            (JPEG_LENGTH_OFFSET, self.jpeg_length),
        ] {
            record[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }

        buf.extend_from_slice(&record);
    }
}

/// Decode the fixed camera id field.
///
/// Bytes after the first NUL are padding. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn decode_camera_id(field: &[u8; CAMERA_ID_SIZE]) -> Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(CAMERA_ID_SIZE);
    String::from_utf8_lossy(&field[..end])
}

fn read_i32_le(record: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([record[offset], record[offset + 1], record[offset + 2], record[offset + 3]])
}

fn read_i64_le(record: &[u8], offset: usize) -> i64 {
    i64::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
        record[offset + 4],
        record[offset + 5],
        record[offset + 6],
        record[offset + 7],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_round_trips_known_tags() {
        assert_eq!(MessageType::try_from(0), Ok(MessageType::PayloadHeader));
        assert_eq!(MessageType::try_from(1), Ok(MessageType::FrameHeader));
        assert_eq!(MessageType::try_from(2), Ok(MessageType::PayloadFooter));
        assert_eq!(MessageType::try_from(3), Err(3));
    }

    #[test]
    fn payload_bracket_reads_fixed_offsets() {
        let mut record = [0xAAu8; PAYLOAD_HEADER_SIZE];
        record[0] = 0;
        record[8..16].copy_from_slice(&42i64.to_le_bytes());
        record[16..20].copy_from_slice(&2i32.to_le_bytes());

        let bracket = PayloadBracket::parse(&record);

        // Padding bytes are 0xAA and must not leak into any field
        assert_eq!(bracket.message_type, 0);
        assert_eq!(bracket.frame_number, 42);
        assert_eq!(bracket.number_of_cameras, 2);
    }

    #[test]
    fn payload_bracket_writes_zeroed_padding() {
        let mut buf = Vec::new();
        PayloadBracket { message_type: 2, frame_number: -7, number_of_cameras: 3 }
            .write_to(&mut buf);

        assert_eq!(buf.len(), PAYLOAD_FOOTER_SIZE);
        assert_eq!(buf[0], 2);
        assert!(buf[1..8].iter().all(|&b| b == 0));
        assert_eq!(&buf[8..16], &(-7i64).to_le_bytes());
        assert_eq!(&buf[16..20], &3i32.to_le_bytes());
        assert!(buf[20..24].iter().all(|&b| b == 0));
    }

    #[test]
    fn frame_header_layout_matches_backend_struct() {
        let header = FrameHeader {
            message_type: 1,
            frame_number: 9,
            camera_id: "cam_0".to_string(),
            image_width: 640,
            image_height: 480,
            color_channels: 3,
            jpeg_length: 1234,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf);

        assert_eq!(buf.len(), FRAME_HEADER_SIZE);
        assert_eq!(&buf[16..21], b"cam_0");
        assert!(buf[21..32].iter().all(|&b| b == 0));
        assert_eq!(&buf[32..36], &640i32.to_le_bytes());
        assert_eq!(&buf[36..40], &480i32.to_le_bytes());
        assert_eq!(&buf[40..44], &3i32.to_le_bytes());
        assert_eq!(&buf[44..48], &1234i32.to_le_bytes());

        let record: &[u8; FRAME_HEADER_SIZE] = buf.as_slice().try_into().unwrap();
        assert_eq!(FrameHeader::parse(record), header);
    }

    #[test]
    fn camera_id_stops_at_first_nul() {
        let mut field = [0u8; CAMERA_ID_SIZE];
        field[..3].copy_from_slice(b"abc");
        field[4..7].copy_from_slice(b"xyz");
        assert_eq!(decode_camera_id(&field), "abc");
    }

    #[test]
    fn camera_id_without_terminator_uses_all_sixteen_bytes() {
        let field = *b"0123456789abcdef";
        assert_eq!(decode_camera_id(&field), "0123456789abcdef");
    }

    #[test]
    fn camera_id_with_invalid_utf8_is_replaced() {
        let mut field = [0u8; CAMERA_ID_SIZE];
        field[..3].copy_from_slice(&[b'c', 0xFF, b'0']);
        assert_eq!(decode_camera_id(&field), "c\u{FFFD}0");
    }

    #[test]
    fn long_camera_id_is_cut_at_field_boundary() {
        let header = FrameHeader {
            message_type: 1,
            frame_number: 0,
            camera_id: "a-camera-id-longer-than-sixteen".to_string(),
            image_width: 1,
            image_height: 1,
            color_channels: 3,
            jpeg_length: 0,
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf);

        let record: &[u8; FRAME_HEADER_SIZE] = buf.as_slice().try_into().unwrap();
        assert_eq!(FrameHeader::parse(record).camera_id, "a-camera-id-long");
    }
}
