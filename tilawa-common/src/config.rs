//! Bootstrap configuration loading
//!
//! Settings come from a TOML file that is read once at startup. A missing file
//! is not fatal: the service logs a warning and runs on compiled defaults.
//!
//! Config file location priority:
//! 1. Explicit path (command-line `--config`)
//! 2. `TILAWA_CONFIG` environment variable
//! 3. `<config_dir>/tilawa/<module>.toml` (e.g. `~/.config/tilawa/tilawa-ra.toml`)

use crate::matcher::MatcherConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TILAWA_CONFIG";

/// Default hosted inference endpoint
pub const DEFAULT_INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the corpus JSON document
    #[serde(default)]
    pub corpus_path: Option<PathBuf>,

    /// HTTP listen port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP listen address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Inference API token
    #[serde(default)]
    pub hf_token: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub transcription: TranscriptionConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Speech-to-text collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,

    /// Attempts while the remote model reports it is still loading
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between attempts when the server gives no estimate
    #[serde(default = "default_loading_retry_secs")]
    pub loading_retry_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model: default_transcription_model(),
            base_url: default_base_url(),
            timeout_secs: default_transcription_timeout(),
            max_attempts: default_max_attempts(),
            loading_retry_secs: default_loading_retry_secs(),
        }
    }
}

/// Report-writing collaborator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_report_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            model: default_report_model(),
            base_url: default_base_url(),
            timeout_secs: default_report_timeout(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    DEFAULT_INFERENCE_BASE_URL.to_string()
}

fn default_transcription_model() -> String {
    "tarteel-ai/whisper-base-ar-quran".to_string()
}

fn default_report_model() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}

fn default_transcription_timeout() -> u64 {
    60
}

fn default_report_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_loading_retry_secs() -> u64 {
    10
}

fn default_max_new_tokens() -> u32 {
    400
}

/// Locate the config file for `module`
///
/// Returns `None` if no candidate can be determined.
pub fn resolve_config_path(explicit: Option<&Path>, module: &str) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("tilawa").join(format!("{}.toml", module)))
}

/// Load TOML config, falling back to defaults if the file does not exist
///
/// # Errors
/// Returns `Error::Config` if the file exists but cannot be read or parsed.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        warn!("No config file location available, using built-in defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using built-in defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    validate(&config)?;

    info!(path = %path.display(), "Loaded config file");
    Ok(config)
}

fn validate(config: &TomlConfig) -> Result<()> {
    let min_score = config.matcher.min_score;
    if !(0.0..=1.0).contains(&min_score) {
        return Err(Error::Config(format!(
            "matcher.min_score must be within 0.0-1.0, got {}",
            min_score
        )));
    }
    if config.transcription.max_attempts == 0 {
        return Err(Error::Config("transcription.max_attempts must be at least 1".to_string()));
    }
    Ok(())
}

/// Non-empty, non-whitespace token check
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}
