//! Core types shared across the feed pipeline.
//!
//! - [`FrameBatch`] is the validated, still-encoded content of one wire message
//! - [`Bitmap`] is one decoded camera image; [`LatestBitmaps`] is what renderers see
//! - [`ConnectionState`] is the observable lifecycle of the WebSocket connection
//! - [`UpdateRate`] controls how often renderers are woken up
//!
//! ## Ownership
//!
//! Bitmaps are shared as `Arc<Bitmap>`. The [`crate::BitmapStore`] holds exactly
//! one reference per camera; installing a newer bitmap drops the old reference,
//! and the pixel memory is released once renderers let go of theirs.

mod bitmap;
mod connection_state;
mod frame;
mod update_rate;

pub(crate) use bitmap::LiveCounter;
pub use bitmap::{Bitmap, LatestBitmaps};
pub use connection_state::ConnectionState;
pub use frame::{EncodedImage, FrameBatch};
pub use update_rate::UpdateRate;
