//! # Acquisition Configuration
//!
//! Configuration for scan sessions and the vision fallback.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SHELF_CAMERA_DEVICE_ID=...                                         │
//! │     SHELF_VISION_API_KEY=...   (or GEMINI_API_KEY)                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scanner/scanner.toml (Linux)                             │
//! │     ~/Library/Application Support/com.shelf.scanner/scanner.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     rear-camera label hints, Gemini endpoint, 2 retries                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanner.toml
//! [camera]
//! device_id = "3f1c..."          # optional explicit camera choice
//! label_hints = ["back", "rear", "environment"]
//! fps = 10
//! notice_clear_secs = 3
//!
//! [vision]
//! endpoint = "https://generativelanguage.googleapis.com"
//! model = "gemini-2.5-flash"
//! request_timeout_secs = 30
//! max_retries = 2
//! ```
//!
//! The API key is a server-side secret; prefer the environment over the file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use shelf_core::{DEFAULT_LABEL_HINTS, NOTICE_CLEAR_SECS};

use crate::error::{AcquireError, AcquireResult};

// =============================================================================
// Camera Settings
// =============================================================================

/// Settings for live camera sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Explicit camera id chosen by the user. Overrides the label heuristic
    /// when the device is present.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Label fragments that identify a rear-facing camera.
    #[serde(default = "default_label_hints")]
    pub label_hints: Vec<String>,

    /// Decode attempts per second requested from the platform.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Width of the scan region in pixels.
    #[serde(default = "default_scan_box_width")]
    pub scan_box_width: u32,

    /// Height of the scan region in pixels.
    #[serde(default = "default_scan_box_height")]
    pub scan_box_height: u32,

    /// How long an invalid-format notice stays visible (seconds).
    #[serde(default = "default_notice_clear")]
    pub notice_clear_secs: u64,
}

fn default_label_hints() -> Vec<String> {
    DEFAULT_LABEL_HINTS.iter().map(|h| h.to_string()).collect()
}

fn default_fps() -> u32 {
    10
}

fn default_scan_box_width() -> u32 {
    250
}

fn default_scan_box_height() -> u32 {
    150
}

fn default_notice_clear() -> u64 {
    NOTICE_CLEAR_SECS
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            device_id: None,
            label_hints: default_label_hints(),
            fps: default_fps(),
            scan_box_width: default_scan_box_width(),
            scan_box_height: default_scan_box_height(),
            notice_clear_secs: default_notice_clear(),
        }
    }
}

impl CameraSettings {
    /// Returns the notice lifetime as a Duration.
    pub fn notice_clear_after(&self) -> Duration {
        Duration::from_secs(self.notice_clear_secs)
    }
}

// =============================================================================
// Vision Settings
// =============================================================================

/// Settings for the still-image vision fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionSettings {
    /// Base URL of the generative-language API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name used for `generateContent`.
    #[serde(default = "default_model")]
    pub model: String,

    /// API key. `None` disables the vision fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for transient failures.
    /// Set to 0 to disable retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff duration (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Largest image accepted, in bytes.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    5
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

impl Default for VisionSettings {
    fn default() -> Self {
        VisionSettings {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl VisionSettings {
    /// Returns true if an API key is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete acquisition configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Live camera settings.
    #[serde(default)]
    pub camera: CameraSettings,

    /// Vision fallback settings.
    #[serde(default)]
    pub vision: VisionSettings,
}

impl AcquireConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> AcquireResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> AcquireResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| AcquireError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AcquireError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| AcquireError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> AcquireResult<()> {
        if self.camera.label_hints.iter().all(|h| h.trim().is_empty()) {
            return Err(AcquireError::InvalidConfig(
                "camera.label_hints must contain at least one non-empty hint".into(),
            ));
        }

        if self.camera.fps == 0 {
            return Err(AcquireError::InvalidConfig(
                "camera.fps must be greater than 0".into(),
            ));
        }

        let endpoint = url::Url::parse(&self.vision.endpoint)?;
        if endpoint.scheme() != "https" && endpoint.scheme() != "http" {
            return Err(AcquireError::InvalidConfig(format!(
                "vision.endpoint must be http(s), got: {}",
                self.vision.endpoint
            )));
        }

        if self.vision.model.trim().is_empty() {
            return Err(AcquireError::InvalidConfig(
                "vision.model must not be empty".into(),
            ));
        }

        if self.vision.request_timeout_secs == 0 {
            return Err(AcquireError::InvalidConfig(
                "vision.request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.vision.max_image_bytes == 0 {
            return Err(AcquireError::InvalidConfig(
                "vision.max_image_bytes must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    ///
    /// Takes a lookup function so tests do not have to mutate the process
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("SHELF_CAMERA_DEVICE_ID") {
            debug!(device_id = %id, "Overriding camera device from environment");
            self.camera.device_id = Some(id);
        }

        if let Some(endpoint) = lookup("SHELF_VISION_ENDPOINT") {
            debug!(endpoint = %endpoint, "Overriding vision endpoint from environment");
            self.vision.endpoint = endpoint;
        }

        if let Some(model) = lookup("SHELF_VISION_MODEL") {
            debug!(model = %model, "Overriding vision model from environment");
            self.vision.model = model;
        }

        if let Some(retries) = lookup("SHELF_VISION_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.vision.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid SHELF_VISION_MAX_RETRIES"),
            }
        }

        // Never log the key itself
        if let Some(key) = lookup("SHELF_VISION_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            debug!("Vision API key provided by environment");
            self.vision.api_key = Some(key);
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "shelf", "scanner")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    /// Returns a copy safe to print (API key masked).
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.vision.api_key.is_some() {
            copy.vision.api_key = Some("********".to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AcquireConfig::default();
        assert_eq!(config.camera.label_hints, vec!["back", "rear", "environment"]);
        assert_eq!(config.camera.notice_clear_secs, 3);
        assert_eq!(config.vision.max_retries, 2);
        assert!(!config.vision.is_configured());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AcquireConfig::default();

        config.camera.fps = 0;
        assert!(config.validate().is_err());
        config.camera.fps = 10;

        config.vision.endpoint = "ftp://example.com".into();
        assert!(config.validate().is_err());

        config.vision.endpoint = "not a url".into();
        assert!(config.validate().is_err());

        config.vision.endpoint = "http://localhost:8080".into();
        assert!(config.validate().is_ok());

        config.camera.label_hints = vec!["".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("SHELF_CAMERA_DEVICE_ID", "cam-7"),
            ("SHELF_VISION_MODEL", "gemini-test"),
            ("SHELF_VISION_MAX_RETRIES", "5"),
            ("GEMINI_API_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let mut config = AcquireConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.camera.device_id.as_deref(), Some("cam-7"));
        assert_eq!(config.vision.model, "gemini-test");
        assert_eq!(config.vision.max_retries, 5);
        assert!(config.vision.is_configured());
    }

    #[test]
    fn test_shelf_key_beats_gemini_key() {
        let mut config = AcquireConfig::default();
        config.apply_env_overrides(|k| match k {
            "SHELF_VISION_API_KEY" => Some("shelf".into()),
            "GEMINI_API_KEY" => Some("gemini".into()),
            _ => None,
        });
        assert_eq!(config.vision.api_key.as_deref(), Some("shelf"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AcquireConfig = toml::from_str(
            r#"
            [camera]
            device_id = "usb-1"

            [vision]
            max_retries = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.camera.device_id.as_deref(), Some("usb-1"));
        assert_eq!(config.camera.fps, 10);
        assert_eq!(config.vision.max_retries, 0);
        assert_eq!(config.vision.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_redacted_hides_key() {
        let mut config = AcquireConfig::default();
        config.vision.api_key = Some("secret".into());

        let toml_str = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(toml_str.contains("[camera]"));
        assert!(toml_str.contains("[vision]"));
        assert!(!toml_str.contains("secret"));
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let mut config = AcquireConfig::default();
        config.vision.api_key = Some("   ".into());
        assert!(!config.vision.is_configured());
    }
}
