use serde::{Deserialize, Serialize};
use std::fmt;

/// Which physical camera is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the operator
    User,
    /// Back camera, facing the scene
    Environment,
}

impl FacingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacingMode::User => "user",
            FacingMode::Environment => "environment",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Idle,
    Active,
}

/// Requested device properties. Resolution is a hint; drivers may adjust it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub facing_mode: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub device_index: u32,
}

/// Properties reported by an open device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSettings {
    /// Not every device reports its facing mode
    pub facing_mode: Option<FacingMode>,
    pub width: u32,
    pub height: u32,
    pub label: String,
}
