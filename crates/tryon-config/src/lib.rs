//! Configuration management for tryon
//!
//! Hierarchical configuration with discovery and precedence:
//! CLI > file > defaults. TOML files carry `[server]`, `[synthesis]`,
//! `[client]` and `[logging]` sections.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use tryon_utils::types::ConfigSource;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use tryon_utils::error::ConfigError;

impl Config {
    /// Built-in defaults with every key attributed to [`ConfigSource::Default`].
    #[must_use]
    pub fn defaults() -> Self {
        let source_attribution: HashMap<String, ConfigSource> = CONFIG_KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Default))
            .collect();

        Self {
            server: ServerConfig::default(),
            synthesis: SynthesisConfig::default(),
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
            config_path: None,
            source_attribution,
        }
    }

    /// Parsed listen address of the server.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "bind".to_string(),
                value: format!("'{}' is not a socket address", self.server.bind),
            })
    }

    #[must_use]
    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis.timeout_secs)
    }

    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.synthesis.initial_backoff_ms)
    }

    /// Base URL for result files: `file_base_url` if set, else the endpoint's origin.
    #[must_use]
    pub fn file_base_url(&self) -> String {
        match &self.synthesis.file_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => origin_of(&self.synthesis.endpoint).to_string(),
        }
    }
}

/// `scheme://host[:port]` part of a URL.
fn origin_of(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url;
    };
    let after = scheme_end + 3;
    match url[after..].find('/') {
        Some(path_start) => &url[..after + path_start],
        None => url,
    }
}
