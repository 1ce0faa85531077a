//! Client config load/save for `~/.nl2sql-chat/config.yaml`.
//! Two sections: `engine.*` (endpoint, model, HTTP timeouts) and `stream.*`
//! (chunking, pacing, streaming timeout). Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_DATABASE: &str = "noaa";
pub const DEFAULT_LLM_NAME: &str = "gpt-4o";
pub const DEFAULT_CHUNK_SIZE: usize = 2048;
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 60;

/// Engine section (base_url, default_database, llm_name, HTTP timeouts).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct EngineSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

/// Stream section (chunk_size, chunk_delay_ms, timeout_secs).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StreamSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Full config file.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub stream: StreamSection,
}

/// HTTP and streaming knobs handed to [`crate::EngineClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub llm_name: String,
    pub chunk_size: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub stream_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Config::default().engine_options()
    }
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.engine.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn default_database(&self) -> &str {
        self.engine
            .default_database
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE)
    }

    /// Pause inserted after each relayed chunk. Zero disables pacing.
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.stream.chunk_delay_ms.unwrap_or(DEFAULT_CHUNK_DELAY_MS))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            llm_name: self
                .engine
                .llm_name
                .clone()
                .unwrap_or_else(|| DEFAULT_LLM_NAME.into()),
            // A zero chunk size would never make progress.
            chunk_size: self.stream.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1),
            request_timeout: Duration::from_secs(
                self.engine
                    .request_timeout_secs
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            connect_timeout: Duration::from_secs(
                self.engine
                    .connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            stream_timeout: Duration::from_secs(
                self.stream.timeout_secs.unwrap_or(DEFAULT_STREAM_TIMEOUT_SECS),
            ),
        }
    }
}

/// Returns the default config file path: `~/.nl2sql-chat/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".nl2sql-chat").join("config.yaml"))
}

/// Load config from a YAML file.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Load config from `path`, falling back to defaults when the file does not exist.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load(path)
}

/// Save config to a YAML file. Creates parent directory if missing.
pub fn save(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    std::fs::write(path, contents).map_err(write_err)
}
