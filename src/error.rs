//! Error types for frame feed processing.
//!
//! Errors fall into two layers:
//!
//! - [`DecodeError`] describes a structural violation of the binary frame
//!   message format. It carries the expected and the actual value together with
//!   the section of the message where decoding stopped, so protocol drift between
//!   client and backend can be diagnosed from a single log line.
//! - [`FeedError`] is the crate-wide error type. It wraps decode errors and adds
//!   per-camera image failures, connection failures and configuration problems.
//!
//! ## Propagation
//!
//! Structural and per-camera errors are logged and absorbed by the frame
//! pipeline. Connection failures surface as [`crate::ConnectionState`]
//! transitions rather than as errors returned to the caller.
//!
//! ```rust
//! use camfeed::FeedError;
//!
//! let error = FeedError::connection_failed("backend not reachable");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Result type alias for feed operations.
pub type Result<T, E = FeedError> = std::result::Result<T, E>;

/// Location inside a frame message where a structural check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// The leading payload header record.
    PayloadHeader,
    /// The frame header of the camera record at this index.
    FrameHeader(usize),
    /// The encoded image bytes of the camera record at this index.
    ImageData(usize),
    /// The trailing payload footer record.
    PayloadFooter,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::PayloadHeader => f.write_str("payload header"),
            Section::FrameHeader(index) => write!(f, "frame header #{index}"),
            Section::ImageData(index) => write!(f, "image data #{index}"),
            Section::PayloadFooter => f.write_str("payload footer"),
        }
    }
}

/// Structural violation found while decoding a binary frame message.
///
/// Any of these rejects the whole message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("{section}: expected message type {expected}, found {found}")]
    UnexpectedMessageType { section: Section, expected: u8, found: u8 },

    #[error("{section}: expected frame number {expected}, found {found}")]
    FrameNumberMismatch { section: Section, expected: i64, found: i64 },

    #[error("payload footer: expected {expected} cameras, found {found}")]
    CameraCountMismatch { expected: i32, found: i32 },

    #[error("payload header: camera count must be positive, found {count}")]
    InvalidCameraCount { count: i32 },

    #[error("{section}: image length cannot be negative, found {length}")]
    InvalidImageLength { section: Section, length: i32 },

    #[error("{section}: message truncated at offset {offset} (need {needed} bytes, have {available})")]
    Truncated { section: Section, offset: usize, needed: usize, available: usize },

    #[error("{trailing} trailing bytes after payload footer ({total} byte message)")]
    TrailingBytes { trailing: usize, total: usize },
}

/// Main error type for feed operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FeedError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to decode image for camera '{camera_id}'")]
    Image {
        camera_id: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Connection failed: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("WebSocket transport error")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid control message: {details}")]
    Message { details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },

    #[error("Connection is closed")]
    Closed,
}

impl FeedError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Connection { .. } => true,
            FeedError::Transport(_) => true,
            FeedError::Closed => true,
            FeedError::Decode(_) => false,
            FeedError::Image { .. } => false,
            FeedError::Message { .. } => false,
            FeedError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            FeedError::Decode(_) => vec![
                "Check that client and backend agree on the frame message layout",
                "Verify the backend version",
            ],
            FeedError::Image { .. } => vec![
                "Check the camera's JPEG encoder settings",
                "Inspect the camera feed for corruption",
            ],
            FeedError::Connection { .. } | FeedError::Transport(_) => vec![
                "Ensure the camera backend is running",
                "Verify the WebSocket URL and port",
                "Check local firewall rules",
            ],
            FeedError::Message { .. } => vec!["Check the backend message schema"],
            FeedError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Verify environment variable values",
            ],
            FeedError::Closed => vec!["Reconnect before sending"],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        FeedError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        FeedError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for per-camera image errors.
    pub fn image_error(camera_id: impl Into<String>, source: image::ImageError) -> Self {
        FeedError::Image { camera_id: camera_id.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(details: impl Into<String>) -> Self {
        FeedError::Config { details: details.into() }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Message { details: err.to_string() }
    }
}

impl From<serde_yaml_ng::Error> for FeedError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        FeedError::Config { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_errors_name_their_section_and_values(
                index in 0usize..64,
                expected in any::<i64>(),
                found in any::<i64>(),
            ) {
                let error = DecodeError::FrameNumberMismatch {
                    section: Section::FrameHeader(index),
                    expected,
                    found,
                };
                let message = error.to_string();
                let index_text = format!("#{}", index);
                prop_assert!(message.contains(&index_text));
                prop_assert!(message.contains(&expected.to_string()));
                prop_assert!(message.contains(&found.to_string()));
            }

            #[test]
            fn connection_errors_keep_their_reason(reason in ".*") {
                let error = FeedError::connection_failed(reason.clone());
                prop_assert!(error.to_string().contains(&reason));
                prop_assert!(error.is_retryable());
            }
        }
    }

    #[test]
    fn decode_error_converts_into_feed_error() {
        let error: FeedError = DecodeError::InvalidCameraCount { count: 0 }.into();
        assert!(matches!(error, FeedError::Decode(DecodeError::InvalidCameraCount { count: 0 })));
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "payload header: camera count must be positive, found 0");
    }

    #[test]
    fn truncation_message_reports_offsets() {
        let error = DecodeError::Truncated {
            section: Section::PayloadFooter,
            offset: 72,
            needed: 24,
            available: 3,
        };
        assert_eq!(
            error.to_string(),
            "payload footer: message truncated at offset 72 (need 24 bytes, have 3)"
        );
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<FeedError>();
        assert_send_sync_static::<DecodeError>();

        let error = FeedError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_suggestions_are_provided() {
        let errors = [
            FeedError::connection_failed("refused"),
            FeedError::config_error("empty url"),
            FeedError::Closed,
            DecodeError::TrailingBytes { trailing: 1, total: 97 }.into(),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no suggestions for {error:?}");
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }

        assert!(!FeedError::config_error("empty url").is_retryable());
    }

    #[test]
    fn json_errors_become_message_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: FeedError = err.into();
        assert!(matches!(error, FeedError::Message { .. }));
    }
}
