use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TalkbackError};

/// Top-level configuration for the Talkback application.
///
/// Loaded from `~/.talkback/config.toml` by default. Each section corresponds
/// to one subsystem; all values have defaults so a missing or partial file
/// still yields a working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkbackConfig {
    pub general: GeneralConfig,
    pub recognition: RecognitionConfig,
    pub synthesis: SynthesisConfig,
    pub session: SessionConfig,
}

impl Default for TalkbackConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            recognition: RecognitionConfig::default(),
            synthesis: SynthesisConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl TalkbackConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TalkbackConfig = toml::from_str(&content)?;
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

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TalkbackError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// BCP-47 language tag for the recognizer (e.g., "en-US").
    pub language: String,
    /// Whether the recognizer keeps capturing across utterances. In
    /// non-continuous mode a pass ends on silence and must be relaunched.
    pub continuous: bool,
    /// Whether interim (partial) hypotheses are reported.
    pub interim_results: bool,
    /// Maximum recognition alternatives per result.
    pub max_alternatives: u8,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            continuous: false,
            interim_results: true,
            max_alternatives: 1,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Preferred voice language prefix (e.g., "en").
    pub language: String,
    /// Playback rate multiplier.
    pub rate: f32,
    /// Voice pitch multiplier.
    pub pitch: f32,
    /// Playback volume in [0.0, 1.0].
    pub volume: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Session coordinator timing knobs.
///
/// Both delays are tunables, not correctness-critical values: they exist to
/// avoid capturing the tail of the assistant's own speech and to avoid
/// thrashing on rapid empty-result recognition loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delay between `start()` and the first listening pass, in milliseconds.
    pub start_delay_ms: u64,
    /// Delay before relaunching recognition after speech playback or an
    /// empty recognition pass, in milliseconds.
    pub restart_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: 1000,
            restart_delay_ms: 800,
        }
    }
}

impl SessionConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Short delays for tests and demos.
    pub fn fast() -> Self {
        Self {
            start_delay_ms: 10,
            restart_delay_ms: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TalkbackConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.recognition.language, "en-US");
        assert!(!config.recognition.continuous);
        assert!(config.recognition.interim_results);
        assert_eq!(config.synthesis.rate, 1.0);
        assert_eq!(config.session.start_delay_ms, 1000);
        assert_eq!(config.session.restart_delay_ms, 800);
    }

    #[test]
    fn test_session_durations() {
        let session = SessionConfig::default();
        assert_eq!(session.start_delay(), Duration::from_millis(1000));
        assert_eq!(session.restart_delay(), Duration::from_millis(800));
    }

    #[test]
    fn test_fast_session_config() {
        let session = SessionConfig::fast();
        assert!(session.restart_delay() < Duration::from_millis(100));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = TalkbackConfig::default();
        config.recognition.language = "de-DE".to_string();
        config.session.restart_delay_ms = 250;
        config.save(&path).unwrap();

        let loaded = TalkbackConfig::load(&path).unwrap();
        assert_eq!(loaded.recognition.language, "de-DE");
        assert_eq!(loaded.session.restart_delay_ms, 250);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = TalkbackConfig::load(Path::new("/nonexistent/talkback.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = TalkbackConfig::load_or_default(Path::new("/nonexistent/talkback.toml"));
        assert_eq!(config.recognition.language, "en-US");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[session]\nrestart_delay_ms = 300\n").unwrap();

        let config = TalkbackConfig::load(&path).unwrap();
        assert_eq!(config.session.restart_delay_ms, 300);
        // Everything unspecified falls back to defaults.
        assert_eq!(config.session.start_delay_ms, 1000);
        assert_eq!(config.recognition.language, "en-US");
    }
}
