//! Binary frame message wire format.
//!
//! Every binary WebSocket message from the backend carries one batch of
//! per-camera JPEG images framed by a payload header and footer. See
//! [`format`] for the record layouts.

pub mod format;

mod decoder;
mod encoder;

pub use decoder::decode_frame_message;
pub use encoder::FrameMessageBuilder;
