use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskguardError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl MaskguardError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Capture device failures. Each variant is a distinct, user-facing condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera not supported on this system")]
    Unsupported,

    #[error("Camera access requires HTTPS or a local server (origin: {origin})")]
    InsecureContext { origin: String },

    #[error("Camera permission denied. Please allow camera access for {device}.")]
    PermissionDenied { device: String },

    #[error("No camera found on this device ({device})")]
    DeviceNotFound { device: String },

    #[error("Camera is already in use by another application ({device})")]
    DeviceBusy { device: String },

    #[error("Camera backend failure: {details}")]
    Backend { details: String },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error from {endpoint}: status {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
    },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed JSON from {endpoint}: {source}")]
    Json {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed data URL: {0}")]
    DataUrl(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Not an image file: {0}")]
    NotAnImage(String),
}

/// Side-effect failures from an alert sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    /// Playback refused by the environment (no audio output, no terminal).
    /// Expected and not worth an error log.
    #[error("Audio playback blocked")]
    Blocked,

    #[error("Audio playback failed: {0}")]
    Playback(String),

    #[error("Speech synthesis failed: {0}")]
    Speech(String),
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, MaskguardError>;
