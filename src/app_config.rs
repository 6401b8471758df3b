use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use url::Url;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Backend service settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Playback sampling settings
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Flashcard generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceConfig {
    // @field: Base URL of the flashcard backend
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// How the active cue is compared when deciding whether it changed
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CueChangePolicy {
    // @policy: Compare cue text; identical consecutive cues keep the selection
    #[default]
    Text,
    // @policy: Compare cue position; any cue boundary resets the selection
    Identity,
}

impl std::fmt::Display for CueChangePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Identity => write!(f, "identity"),
        }
    }
}

impl std::str::FromStr for CueChangePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "identity" => Ok(Self::Identity),
            _ => Err(anyhow!("Invalid cue change policy: {}", s)),
        }
    }
}

/// Playback sampling configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlaybackConfig {
    /// Milliseconds between clock samples while playing
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Active cue comparison policy
    #[serde(default)]
    pub cue_change_policy: CueChangePolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            cue_change_policy: CueChangePolicy::default(),
        }
    }
}

/// Flashcard generation configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GenerationConfig {
    /// Themes for out-of-context generation; empty means none are sent
    #[serde(default)]
    pub custom_themes: Vec<String>,
}

impl GenerationConfig {
    pub fn themes(&self) -> Option<Vec<String>> {
        let themes: Vec<String> = self
            .custom_themes
            .iter()
            .map(|theme| theme.trim().to_string())
            .filter(|theme| !theme.is_empty())
            .collect();
        if themes.is_empty() { None } else { Some(themes) }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_tick_interval_ms() -> u64 {
    250
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.service.endpoint)
            .with_context(|| format!("Service endpoint is not a valid URL: {}", self.service.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("Service endpoint must use http or https: {}", self.service.endpoint));
        }

        if self.service.timeout_secs == 0 {
            return Err(anyhow!("Service timeout must be greater than zero"));
        }

        if self.playback.tick_interval_ms == 0 {
            return Err(anyhow!("Tick interval must be greater than zero"));
        }

        Ok(())
    }

    /// Load the configuration file, writing a default one if it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            warn!("Config file not found at '{}', creating default config.", path.display());
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }
}
