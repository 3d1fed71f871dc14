use crate::defaults;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub timing: TimingConfig,
    pub voice: VoiceConfig,
    pub announce: AnnounceConfig,
}

/// Event source configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Decoder-bridge endpoint polled for new passes
    pub url: String,
    /// Poll interval as a humantime string ("1s", "500ms")
    pub poll_interval: String,
}

/// Lap plausibility window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub min_lap_secs: f64,
    pub max_lap_secs: f64,
}

/// Speech output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub enabled: bool,
    /// Engine preference: "auto", "remote", "spd", "espeak", "none"
    pub engine: EnginePreference,
    pub volume: f32,
    /// Speaking rate in words per minute
    pub rate: u32,
    pub language: String,
    pub queue_capacity: usize,
}

/// Announcement policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnnounceConfig {
    pub car_numbers: bool,
    pub lap_numbers: bool,
    pub all_times: bool,
    /// Minimum spacing between standings announcements ("30s", "2m")
    pub all_times_interval: String,
}

/// Engine preference enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnginePreference {
    /// Walk the fallback chain: remote → spd → espeak → log-only
    #[default]
    Auto,
    Remote,
    Spd,
    Espeak,
    /// Log-only mode, no synthesis
    None,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::SOURCE_URL.to_string(),
            poll_interval: "1s".to_string(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_lap_secs: defaults::MIN_LAP_SECS,
            max_lap_secs: defaults::MAX_LAP_SECS,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engine: EnginePreference::Auto,
            volume: defaults::VOICE_VOLUME,
            rate: defaults::VOICE_RATE,
            language: defaults::VOICE_LANGUAGE.to_string(),
            queue_capacity: defaults::ANNOUNCE_QUEUE_CAPACITY,
        }
    }
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self {
            car_numbers: false,
            lap_numbers: false,
            all_times: false,
            all_times_interval: "30s".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - RACECALL_SOURCE_URL → source.url
    /// - RACECALL_ENGINE → voice.engine
    /// - RACECALL_LANGUAGE → voice.language
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("RACECALL_SOURCE_URL")
            && !url.is_empty()
        {
            self.source.url = url;
        }

        if let Ok(engine) = std::env::var("RACECALL_ENGINE")
            && let Some(pref) = EnginePreference::parse(&engine)
        {
            self.voice.engine = pref;
        }

        if let Ok(language) = std::env::var("RACECALL_LANGUAGE")
            && !language.is_empty()
        {
            self.voice.language = language;
        }

        self
    }

    /// Parsed poll interval; falls back to the default on an unparsable value.
    pub fn poll_interval(&self) -> Duration {
        parse_duration_or(&self.source.poll_interval, defaults::POLL_INTERVAL)
    }

    /// Parsed standings interval; falls back to the default on an unparsable value.
    pub fn all_times_interval(&self) -> Duration {
        parse_duration_or(&self.announce.all_times_interval, defaults::ALL_TIMES_INTERVAL)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/racecall/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("racecall")
            .join("config.toml")
    }
}

impl EnginePreference {
    /// Parse a preference name; accepts the same spellings the config file uses.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "remote" => Some(Self::Remote),
            "spd" => Some(Self::Spd),
            "espeak" => Some(Self::Espeak),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Parse a humantime duration string, also accepting bare seconds.
fn parse_duration_or(s: &str, fallback: Duration) -> Duration {
    let s = s.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Duration::from_secs(secs);
    }
    humantime::parse_duration(s).unwrap_or(fallback)
}
