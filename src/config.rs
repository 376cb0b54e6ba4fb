use crate::camera::FacingMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MaskguardConfig {
    pub server: ServerConfig,
    pub camera: CameraConfig,
    pub alarm: AlarmConfig,
    pub stats: StatsConfig,
    pub report: ReportConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the detection server
    #[serde(default = "default_server_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Facing mode used when the session first starts
    #[serde(default = "default_facing_mode")]
    pub facing_mode: FacingMode,

    /// Ideal capture resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frame submission rate
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// JPEG quality for submitted frames (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Video device index for the front ("user") camera
    #[serde(default = "default_device_index")]
    pub device_index: u32,

    /// Video device index for the back ("environment") camera
    #[serde(default = "default_back_device_index")]
    pub back_device_index: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AlarmConfig {
    /// Audio alerts are muted when disabled; speech warnings still run
    #[serde(default = "default_alarm_enabled")]
    pub enabled: bool,

    /// Period of the repeating audio alert while the environment is unsafe
    #[serde(default = "default_audio_interval_ms")]
    pub audio_interval_ms: u64,

    /// Period of the repeating speech warning while the environment is unsafe
    #[serde(default = "default_speech_interval_ms")]
    pub speech_interval_ms: u64,

    /// Phrase spoken when the environment becomes unsafe
    #[serde(default = "default_warning_phrase")]
    pub warning_phrase: String,

    /// External text-to-speech program (e.g. "espeak"); speech is logged only when unset
    #[serde(default)]
    pub speech_command: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    /// Statistics polling period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReportConfig {
    /// Directory for exported PDF reports
    #[serde(default = "default_report_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl MaskguardConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("maskguard.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("server.base_url", default_server_base_url())?
            .set_default("server.request_timeout_ms", default_request_timeout_ms())?
            .set_default("camera.facing_mode", default_facing_mode().as_str())?
            .set_default(
                "camera.resolution",
                vec![default_camera_resolution().0, default_camera_resolution().1],
            )?
            .set_default("camera.fps", default_camera_fps())?
            .set_default("camera.jpeg_quality", default_jpeg_quality() as u64)?
            .set_default("camera.device_index", default_device_index())?
            .set_default("camera.back_device_index", default_back_device_index())?
            .set_default("alarm.enabled", default_alarm_enabled())?
            .set_default("alarm.audio_interval_ms", default_audio_interval_ms())?
            .set_default("alarm.speech_interval_ms", default_speech_interval_ms())?
            .set_default("alarm.warning_phrase", default_warning_phrase())?
            .set_default("stats.poll_interval_ms", default_poll_interval_ms())?
            .set_default("report.output_dir", default_report_output_dir())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with MASKGUARD_ prefix
            .add_source(
                Environment::with_prefix("MASKGUARD")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: MaskguardConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if reqwest::Url::parse(&self.server.base_url).is_err() {
            return Err(ConfigError::Message(format!(
                "Server base_url is not a valid URL: {}",
                self.server.base_url
            )));
        }

        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Server request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(ConfigError::Message(
                "Camera jpeg_quality must be between 1 and 100".to_string(),
            ));
        }

        if self.alarm.audio_interval_ms == 0 || self.alarm.speech_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Alarm intervals must be greater than 0".to_string(),
            ));
        }

        if self.stats.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Stats poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize to TOML, used by `--print-config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl CameraConfig {
    /// Interval between frame submission ticks
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.fps.max(1) as u64)
    }

    /// Device index that backs a facing mode
    pub fn device_for(&self, facing_mode: FacingMode) -> u32 {
        match facing_mode {
            FacingMode::User => self.device_index,
            FacingMode::Environment => self.back_device_index,
        }
    }
}

impl AlarmConfig {
    pub fn audio_interval(&self) -> Duration {
        Duration::from_millis(self.audio_interval_ms)
    }

    pub fn speech_interval(&self) -> Duration {
        Duration::from_millis(self.speech_interval_ms)
    }
}

impl StatsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for MaskguardConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                base_url: default_server_base_url(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            camera: CameraConfig::default(),
            alarm: AlarmConfig::default(),
            stats: StatsConfig {
                poll_interval_ms: default_poll_interval_ms(),
            },
            report: ReportConfig {
                output_dir: default_report_output_dir(),
            },
            system: SystemConfig {
                event_bus_capacity: default_event_bus_capacity(),
            },
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing_mode: default_facing_mode(),
            resolution: default_camera_resolution(),
            fps: default_camera_fps(),
            jpeg_quality: default_jpeg_quality(),
            device_index: default_device_index(),
            back_device_index: default_back_device_index(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            enabled: default_alarm_enabled(),
            audio_interval_ms: default_audio_interval_ms(),
            speech_interval_ms: default_speech_interval_ms(),
            warning_phrase: default_warning_phrase(),
            speech_command: None,
        }
    }
}

// Default value functions
fn default_server_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_facing_mode() -> FacingMode {
    FacingMode::User
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    10
}
fn default_jpeg_quality() -> u8 {
    80
}
fn default_device_index() -> u32 {
    0
}
fn default_back_device_index() -> u32 {
    1
}

fn default_alarm_enabled() -> bool {
    true
}
fn default_audio_interval_ms() -> u64 {
    2000
}
fn default_speech_interval_ms() -> u64 {
    10_000
}
fn default_warning_phrase() -> String {
    "Environment not safe".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_report_output_dir() -> String {
    "./reports".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MaskguardConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.camera.resolution, (640, 480));
        assert_eq!(config.camera.frame_interval(), Duration::from_millis(100));
        assert_eq!(config.alarm.audio_interval(), Duration::from_secs(2));
        assert_eq!(config.alarm.speech_interval(), Duration::from_secs(10));
        assert_eq!(config.stats.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_validation() {
        let mut config = MaskguardConfig::default();

        config.camera.jpeg_quality = 0;
        assert!(config.validate().is_err());
        config.camera.jpeg_quality = 80;

        config.server.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.server.base_url = "https://maskguard.local".to_string();

        config.alarm.audio_interval_ms = 0;
        assert!(config.validate().is_err());
        config.alarm.audio_interval_ms = 2000;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
base_url = "https://detector.example:8443"

[camera]
facing_mode = "environment"
fps = 5

[alarm]
enabled = false
"#
        )
        .unwrap();

        let config = MaskguardConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.server.base_url, "https://detector.example:8443");
        assert_eq!(config.camera.facing_mode, FacingMode::Environment);
        assert_eq!(config.camera.fps, 5);
        assert!(!config.alarm.enabled);
        // Untouched sections keep their defaults
        assert_eq!(config.stats.poll_interval_ms, 1000);
        assert_eq!(config.alarm.warning_phrase, "Environment not safe");
    }

    #[test]
    fn test_default_config_serializes_to_toml() {
        let toml = MaskguardConfig::default().to_toml().unwrap();
        assert!(toml.contains("[server]"));
        assert!(toml.contains("base_url"));
        assert!(toml.contains("warning_phrase"));
    }
}
