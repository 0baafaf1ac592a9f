use std::time::Duration;

use tryon_utils::error::ConfigError;

use super::{Config, ConfigSource};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding the server or client without relying on
    /// environment variables or config files.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tryon_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .endpoint("http://localhost:7860/tryon")
    ///     .timeout(Duration::from_secs(30))
    ///     .max_retries(2)
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.synthesis.max_retries, 2);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration.
///
/// All values set via the builder are attributed to
/// [`ConfigSource::Programmatic`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    bind: Option<String>,
    max_upload_bytes: Option<usize>,
    endpoint: Option<String>,
    file_base_url: Option<String>,
    api_key_env: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    initial_backoff_ms: Option<u64>,
    server_url: Option<String>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = Some(addr.into());
        self
    }

    /// Per-part upload limit in bytes.
    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    #[must_use]
    pub fn file_base_url(mut self, url: impl Into<String>) -> Self {
        self.file_base_url = Some(url.into());
        self
    }

    /// Name of the environment variable holding the API key.
    #[must_use]
    pub fn api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    /// Timeout of a single synthesis attempt, truncated to whole seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = Some(u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Build the configuration, applying defaults for unset values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any value fails validation.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::defaults();
        let mut marked = Vec::new();
        if let Some(v) = self.bind {
            config.server.bind = v;
            marked.push("bind");
        }
        if let Some(v) = self.max_upload_bytes {
            config.server.max_upload_bytes = v;
            marked.push("max_upload_bytes");
        }
        if let Some(v) = self.endpoint {
            config.synthesis.endpoint = v;
            marked.push("endpoint");
        }
        if let Some(v) = self.file_base_url {
            config.synthesis.file_base_url = Some(v);
            marked.push("file_base_url");
        }
        if let Some(v) = self.api_key_env {
            config.synthesis.api_key_env = v;
            marked.push("api_key_env");
        }
        if let Some(v) = self.timeout_secs {
            config.synthesis.timeout_secs = v;
            marked.push("timeout_secs");
        }
        if let Some(v) = self.max_retries {
            config.synthesis.max_retries = v;
            marked.push("max_retries");
        }
        if let Some(v) = self.initial_backoff_ms {
            config.synthesis.initial_backoff_ms = v;
            marked.push("initial_backoff_ms");
        }
        if let Some(v) = self.server_url {
            config.client.server_url = v;
            marked.push("server_url");
        }
        if let Some(v) = self.verbose {
            config.logging.verbose = v;
            marked.push("verbose");
        }
        for key in marked {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Programmatic);
        }

        config.validate()?;
        Ok(config)
    }
}
