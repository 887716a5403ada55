//! JSON text messages exchanged with the backend.
//!
//! Every text message carries a `type` discriminator. The client reads the tag
//! once and parses exactly one variant; there is no shape-guessing across
//! schemas.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Messages the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Confirms that a frame was fully processed; the backend paces on it.
    Acknowledgment { frame_number: i64 },
}

impl ClientMessage {
    pub fn acknowledgment(frame_number: i64) -> Self {
        ClientMessage::Acknowledgment { frame_number }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Messages the backend sends as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    LogRecord(LogRecord),
    RecordingInfo(RecordingInfo),
    AppState(AppState),
}

impl ServerMessage {
    pub fn parse(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Tag as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::LogRecord(_) => "log_record",
            ServerMessage::RecordingInfo(_) => "recording_info",
            ServerMessage::AppState(_) => "app_state",
        }
    }
}

/// A backend log line forwarded to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "levelname")]
    pub level_name: String,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(rename = "name")]
    pub logger_name: String,
    #[serde(default)]
    pub formatted_message: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, rename = "lineno")]
    pub line_number: Option<u32>,
    #[serde(default, rename = "funcName")]
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub is_recording: bool,
    #[serde(default)]
    pub recording_name: Option<String>,
    #[serde(default)]
    pub recording_directory: Option<String>,
}

/// Backend state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub state_timestamp: String,
    #[serde(default)]
    pub camera_configs: BTreeMap<String, CameraConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    pub camera_name: String,
    pub use_this_camera: bool,
    pub resolution: Resolution,
    pub color_channels: u32,
    #[serde(default)]
    pub pixel_format: Option<String>,
    #[serde(default)]
    pub exposure_mode: Option<String>,
    #[serde(default)]
    pub exposure: Option<Exposure>,
    pub framerate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Manual exposure value, or a mode keyword such as `"AUTO"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Exposure {
    Manual(f64),
    Mode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn acknowledgment_wire_shape() {
        let text = ClientMessage::acknowledgment(42).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({"type": "acknowledgment", "frame_number": 42}));
    }

    #[test]
    fn parses_log_record() {
        let text = json!({
            "type": "log_record",
            "levelname": "WARNING",
            "msg": "camera 0 dropped a frame",
            "name": "skellycam.camera",
            "lineno": 88,
        })
        .to_string();

        let ServerMessage::LogRecord(record) = ServerMessage::parse(&text).unwrap() else {
            panic!("expected log record");
        };
        assert_eq!(record.level_name, "WARNING");
        assert_eq!(record.message, "camera 0 dropped a frame");
        assert_eq!(record.line_number, Some(88));
        assert_eq!(record.formatted_message, None);
    }

    #[test]
    fn parses_recording_info() {
        let text = r#"{"type":"recording_info","is_recording":true,"recording_name":"take_3"}"#;
        let message = ServerMessage::parse(text).unwrap();
        assert_eq!(message.kind(), "recording_info");
        assert_eq!(
            message,
            ServerMessage::RecordingInfo(RecordingInfo {
                is_recording: true,
                recording_name: Some("take_3".into()),
                recording_directory: None,
            })
        );
    }

    #[test]
    fn parses_app_state_with_camera_configs() {
        let text = json!({
            "type": "app_state",
            "state_timestamp": "2024-05-01T12:00:00",
            "camera_configs": {
                "0": {
                    "camera_name": "Camera 0",
                    "use_this_camera": true,
                    "resolution": {"width": 1280, "height": 720},
                    "color_channels": 3,
                    "exposure": "AUTO",
                    "framerate": 30.0
                },
                "1": {
                    "camera_name": "Camera 1",
                    "use_this_camera": false,
                    "resolution": {"width": 640, "height": 480},
                    "color_channels": 3,
                    "exposure": -7,
                    "framerate": 30.0
                }
            }
        })
        .to_string();

        let ServerMessage::AppState(state) = ServerMessage::parse(&text).unwrap() else {
            panic!("expected app state");
        };
        assert_eq!(state.camera_configs.len(), 2);
        assert_eq!(state.camera_configs["0"].exposure, Some(Exposure::Mode("AUTO".into())));
        assert_eq!(state.camera_configs["1"].exposure, Some(Exposure::Manual(-7.0)));
        assert_eq!(state.camera_configs["0"].resolution, Resolution { width: 1280, height: 720 });
    }

    #[test]
    fn unknown_type_is_rejected() {
        let error = ServerMessage::parse(r#"{"type":"telemetry","value":1}"#).unwrap_err();
        assert!(matches!(error, crate::FeedError::Message { .. }));
    }

    #[test]
    fn untagged_payload_is_rejected() {
        // Shape matches a recording info but carries no discriminator
        assert!(ServerMessage::parse(r#"{"is_recording":false}"#).is_err());
        assert!(ServerMessage::parse("Hello from the server").is_err());
    }
}
