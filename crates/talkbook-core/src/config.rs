use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TalkbookError};

/// Top-level configuration for Talkbook.
///
/// Loaded from `~/.talkbook/config.toml` by default. Every section and field
/// has a default so partial files are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TalkbookConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub autosave: AutoSaveConfig,
}

impl TalkbookConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TalkbookConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Recordings directory, with a relative `recordings_dir` placed under
    /// `general.data_dir`.
    pub fn recordings_path(&self) -> PathBuf {
        let recordings = self.recording.recordings_path();
        if recordings.is_relative() {
            Path::new(&self.general.data_dir).join(recordings)
        } else {
            recordings
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TalkbookError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for documents and relative recording paths.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.talkbook/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Recording session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Directory the capture process writes audio files into.
    pub recordings_dir: String,
    /// Upper bound on how long `connect()` waits for the capture process.
    pub connect_timeout_ms: u64,
    /// Interval between duration ticks published by the capture process.
    pub tick_interval_ms: u64,
    /// Maximum length of a single recording in seconds.
    pub max_duration_secs: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            recordings_dir: "~/.talkbook/data/recordings".to_string(),
            connect_timeout_ms: 3000,
            tick_interval_ms: 100,
            max_duration_secs: 3600,
        }
    }
}

impl RecordingConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn recordings_path(&self) -> PathBuf {
        PathBuf::from(&self.recordings_dir)
    }

    /// Recording length limit; `None` when `max_duration_secs` is 0.
    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration_secs > 0).then(|| Duration::from_secs(u64::from(self.max_duration_secs)))
    }
}

/// Voice command configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether spoken commands are recognized at all.
    pub enabled: bool,
    /// Whether dispatch results are spoken back to the user.
    pub feedback_enabled: bool,
    /// Capacity of the spoken-feedback queue.
    pub feedback_queue_capacity: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            feedback_enabled: true,
            feedback_queue_capacity: 16,
        }
    }
}

/// Auto-save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSaveConfig {
    /// Quiet period after the last edit before a chapter is persisted.
    pub debounce_ms: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 1500 }
    }
}

impl AutoSaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
