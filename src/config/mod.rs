//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `SEARCH_BUDDY` (nested keys use `__`,
//! e.g. `SEARCH_BUDDY_LLM__MODEL=gpt-4o-mini`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [registry]
//! crossref_base_url = "https://api.crossref.org"
//! datacite_base_url = "https://api.datacite.org"
//! mailto = "you@example.edu"
//! timeout_secs = 10
//!
//! [llm]
//! enabled = true
//! model = "gpt-4o"
//! max_concurrent = 2
//! requests_per_minute = 60
//!
//! [detection]
//! header_char_cap = 500
//! chunk_words = 500
//!
//! [pipeline]
//! workers = 4
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const ENV_PREFIX: &str = "SEARCH_BUDDY";
const CONFIG_FILE_NAME: &str = "search-buddy.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bibliographic registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Reasoning service settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Positionality detection tuning
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Batch settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bibliographic registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_crossref_base_url")]
    pub crossref_base_url: String,

    #[serde(default = "default_datacite_base_url")]
    pub datacite_base_url: String,

    /// Contact address sent in the user agent (CrossRef "polite pool")
    #[serde(default)]
    pub mailto: Option<String>,

    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            crossref_base_url: default_crossref_base_url(),
            datacite_base_url: default_datacite_base_url(),
            mailto: None,
            timeout_secs: default_registry_timeout(),
        }
    }
}

fn default_crossref_base_url() -> String {
    "https://api.crossref.org".to_string()
}

fn default_datacite_base_url() -> String {
    "https://api.datacite.org".to_string()
}

fn default_registry_timeout() -> u64 {
    10
}

/// Reasoning service (hosted LLM) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Set to false to skip every LLM-backed strategy
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key; falls back to `OPENAI_API_KEY`
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Maximum in-flight requests across all workers
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Replaces the built-in detection instruction sent to the model
    #[serde(default)]
    pub detection_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_max_tokens(),
            max_concurrent: default_max_concurrent(),
            requests_per_minute: default_rpm(),
            max_retries: default_max_retries(),
            detection_prompt: None,
        }
    }
}

impl LlmConfig {
    /// The configured key, or `OPENAI_API_KEY` from the environment.
    /// Blank keys count as missing.
    pub fn resolved_api_key(&self) -> Option<String> {
        fn usable(key: &str) -> Option<String> {
            let key = key.trim();
            (!key.is_empty()).then(|| key.to_string())
        }

        self.api_key
            .as_deref()
            .and_then(usable)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().as_deref().and_then(usable))
    }

    /// The user's detection prompt, if one is set and not blank
    pub fn custom_prompt(&self) -> Option<String> {
        self.detection_prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }
}

fn default_true() -> bool {
    true
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    200
}

fn default_max_concurrent() -> usize {
    2
}

fn default_rpm() -> u32 {
    60
}

fn default_max_retries() -> u32 {
    2
}

/// Positionality detection tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Divisor for the baseline score; defaults to the regex tag count + 2
    #[serde(default)]
    pub score_normalization: Option<f64>,

    #[serde(default = "default_header_char_cap")]
    pub header_char_cap: usize,

    #[serde(default = "default_header_line_cap")]
    pub header_line_cap: usize,

    /// Characters sent to the header LLM pass
    #[serde(default = "default_header_char_cap")]
    pub header_llm_chars: usize,

    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Upper bound on chunks sent by the full-text LLM pass
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    #[serde(default = "default_full_text_min_score")]
    pub full_text_min_score: f64,

    #[serde(default = "default_tail_score_floor")]
    pub tail_score_floor: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_normalization: None,
            header_char_cap: default_header_char_cap(),
            header_line_cap: default_header_line_cap(),
            header_llm_chars: default_header_char_cap(),
            chunk_words: default_chunk_words(),
            max_chunks: default_max_chunks(),
            full_text_min_score: default_full_text_min_score(),
            tail_score_floor: default_tail_score_floor(),
        }
    }
}

fn default_header_char_cap() -> usize {
    500
}

fn default_header_line_cap() -> usize {
    12
}

fn default_chunk_words() -> usize {
    500
}

fn default_max_chunks() -> usize {
    20
}

fn default_full_text_min_score() -> f64 {
    0.1
}

fn default_tail_score_floor() -> f64 {
    0.5
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Documents processed concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    4
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
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

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Render as TOML (the API key is never written)
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Load configuration from an optional file plus the environment
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("search-buddy").join("config.toml"))
        .filter(|p| p.is_file())
}
