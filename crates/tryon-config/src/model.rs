use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use tryon_utils::types::{ConfigSource, MAX_IMAGE_BYTES};

/// Default listen address of `tryon serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Default synthesis endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co/models/yisol/IDM-VTON";

/// Environment variable holding the synthesis API key unless overridden.
pub const DEFAULT_API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

/// Hard limit of a single synthesis attempt.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Backoff before the first retry; doubled for every later retry.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;

/// Server the client talks to unless overridden.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Configuration for tryon.
///
/// Built by [`Config::discover()`] with precedence CLI arguments > config file >
/// built-in defaults, or programmatically through [`Config::builder()`].
///
/// # Configuration File Format
///
/// ```toml
/// [server]
/// bind = "0.0.0.0:5000"
/// max_upload_bytes = 8388608
///
/// [synthesis]
/// endpoint = "https://api-inference.huggingface.co/models/yisol/IDM-VTON"
/// api_key_env = "HUGGINGFACE_API_KEY"
/// timeout_secs = 60
/// max_retries = 1
/// initial_backoff_ms = 1000
///
/// [client]
/// server_url = "http://127.0.0.1:5000"
///
/// [logging]
/// verbose = false
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub synthesis: SynthesisConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
    /// Config file the values were read from, if any.
    pub config_path: Option<PathBuf>,
    /// Source attribution for each setting (for `tryon config`).
    pub source_attribution: HashMap<String, ConfigSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// Per-part upload limit in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_upload_bytes: MAX_IMAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisConfig {
    pub endpoint: String,
    /// Base URL for fetching result files; the endpoint origin when unset.
    pub file_base_url: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            file_base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub verbose: bool,
}

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlConfig {
    pub server: Option<TomlServer>,
    pub synthesis: Option<TomlSynthesis>,
    pub client: Option<TomlClient>,
    pub logging: Option<TomlLogging>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlServer {
    pub bind: Option<String>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlSynthesis {
    pub endpoint: Option<String>,
    pub file_base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlClient {
    pub server_url: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TomlLogging {
    pub verbose: Option<bool>,
}

/// Every key reported by [`Config::effective_config()`].
pub const CONFIG_KEYS: [&str; 10] = [
    "bind",
    "max_upload_bytes",
    "endpoint",
    "file_base_url",
    "api_key_env",
    "timeout_secs",
    "max_retries",
    "initial_backoff_ms",
    "server_url",
    "verbose",
];
