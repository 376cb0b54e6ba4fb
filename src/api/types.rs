use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /process_frame` and `POST /process_image`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    /// `data:<mime>;base64,...`
    pub image: String,
}

/// Environment verdict reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafetyStatus {
    #[default]
    Safe,
    Unsafe,
}

impl SafetyStatus {
    pub fn is_safe(&self) -> bool {
        matches!(self, SafetyStatus::Safe)
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyStatus::Safe => f.write_str("Safe"),
            SafetyStatus::Unsafe => f.write_str("Unsafe"),
        }
    }
}

/// Alert data attached to a processed frame. Every field is optional; an
/// absent `environment_unsafe` or `unsafe_count` skips that alarm branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(default)]
    pub environment_unsafe: Option<bool>,
    #[serde(default)]
    pub unsafe_count: Option<u32>,
    #[serde(default)]
    pub with_mask: Option<u64>,
    #[serde(default)]
    pub without_mask: Option<u64>,
    #[serde(default)]
    pub incorrect_mask: Option<u64>,
    #[serde(default)]
    pub total_detections: Option<u64>,
    #[serde(default)]
    pub current_status: Option<SafetyStatus>,
    #[serde(default)]
    pub safety_percentage: Option<f64>,
    #[serde(default)]
    pub last_violation: Option<String>,
    /// Track ids that became unsafe in this frame
    #[serde(default)]
    pub new_alerts: Vec<i64>,
}

/// Response of `POST /process_frame`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessFrameResponse {
    /// Annotated frame as a data URL
    pub image: String,
    #[serde(default)]
    pub alert_data: Option<AlertPayload>,
}

/// Per-class counts for a single uploaded image
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDetections {
    #[serde(default)]
    pub with_mask: u64,
    #[serde(default)]
    pub without_mask: u64,
    #[serde(default)]
    pub incorrect_mask: u64,
    #[serde(default)]
    pub total: u64,
}

/// Response of `POST /process_image`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessImageResponse {
    pub image: String,
    #[serde(default)]
    pub detections: ImageDetections,
}

/// One point of the server's rolling detection history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    #[serde(default)]
    pub with_mask: u64,
    #[serde(default)]
    pub without_mask: u64,
    #[serde(default)]
    pub incorrect_mask: u64,
}

/// Response of `GET /statistics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    #[serde(default)]
    pub with_mask: u64,
    #[serde(default)]
    pub without_mask: u64,
    #[serde(default)]
    pub incorrect_mask: u64,
    #[serde(default)]
    pub total_detections: u64,
    #[serde(default)]
    pub current_status: SafetyStatus,
    /// The server may round to one decimal place
    #[serde(default = "full_compliance")]
    pub safety_percentage: f64,
    #[serde(default)]
    pub last_violation: Option<String>,
    #[serde(default)]
    pub environment_unsafe: Option<bool>,
    #[serde(default)]
    pub unsafe_count: Option<u32>,
    #[serde(default)]
    pub tracked_count: Option<u32>,
    #[serde(default)]
    pub detection_history: Vec<HistoryEntry>,
}

impl Statistics {
    /// State right after a successful reset
    pub fn cleared() -> Self {
        Self {
            with_mask: 0,
            without_mask: 0,
            incorrect_mask: 0,
            total_detections: 0,
            current_status: SafetyStatus::Safe,
            safety_percentage: full_compliance(),
            last_violation: None,
            environment_unsafe: Some(false),
            unsafe_count: Some(0),
            tracked_count: None,
            detection_history: Vec::new(),
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::cleared()
    }
}

/// Response of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHealth {
    pub status: String,
    #[serde(default)]
    pub camera_active: bool,
}

fn full_compliance() -> f64 {
    100.0
}
