//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where rendered videos, clips, and screenshots are written.
    pub artifacts_dir: PathBuf,

    /// Frame capture settings.
    pub capture: CaptureDefaults,

    /// Subprocess timeout settings.
    pub timeouts: TimeoutConfig,

    /// Webhook delivery settings.
    pub delivery: DeliveryConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default frame capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureDefaults {
    /// Target capture frame rate.
    pub fps: u32,

    /// Page pool size for full-video rendering. Zero means host CPU count.
    pub render_pool_size: usize,

    /// Page pool size for element screenshot extraction.
    pub screenshot_pool_size: usize,
}

/// Wall-clock timeouts applied to external processes and page waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// How long to wait for the encoder to exit after its stdin closes.
    pub encoder_exit_ms: u64,

    /// How long a single clip trim may run before it is killed.
    pub clip_trim_ms: u64,

    /// How long to wait for the page to report an element bounding rect.
    pub bounding_rect_ms: u64,
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Base URL under which generated artifacts are served.
    pub public_base_url: String,

    /// Callback POST request timeout.
    pub request_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: dirs_default_artifacts(),
            capture: CaptureDefaults::default(),
            timeouts: TimeoutConfig::default(),
            delivery: DeliveryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            render_pool_size: 0,
            screenshot_pool_size: 2,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            encoder_exit_ms: 30_000,
            clip_trim_ms: 60_000,
            bounding_rect_ms: 10_000,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_string(),
            request_timeout_ms: 15_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Effective render pool size (resolves the CPU-count default).
    pub fn render_pool_size(&self) -> usize {
        if self.capture.render_pool_size > 0 {
            self.capture.render_pool_size
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelcut").join("config.json")
}

/// Default artifacts directory.
fn dirs_default_artifacts() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("reelcut").join("artifacts")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.capture.fps, 30);
        assert_eq!(parsed.timeouts.clip_trim_ms, 60_000);
    }

    #[test]
    fn test_render_pool_size_resolves_cpu_default() {
        let config = AppConfig::default();
        assert!(config.render_pool_size() >= 1);

        let mut fixed = AppConfig::default();
        fixed.capture.render_pool_size = 3;
        assert_eq!(fixed.render_pool_size(), 3);
    }
}
