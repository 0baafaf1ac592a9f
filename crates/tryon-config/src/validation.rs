use std::net::SocketAddr;

use tryon_utils::error::ConfigError;

use super::Config;

const MAX_UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn check_http_url(key: &str, url: &str) -> Result<(), ConfigError> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| invalid(key, format!("'{url}' must start with http:// or https://")))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid(key, format!("'{url}' has no valid host")));
    }
    Ok(())
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "bind",
                format!("'{}' is not a socket address (e.g. 127.0.0.1:5000)", self.server.bind),
            ));
        }

        if self.server.max_upload_bytes == 0 {
            return Err(invalid("max_upload_bytes", "must be greater than 0"));
        }
        if self.server.max_upload_bytes > MAX_UPLOAD_LIMIT {
            return Err(invalid("max_upload_bytes", "exceeds maximum limit of 64MB"));
        }

        check_http_url("endpoint", &self.synthesis.endpoint)?;
        if let Some(base) = &self.synthesis.file_base_url {
            check_http_url("file_base_url", base)?;
        }
        check_http_url("server_url", &self.client.server_url)?;

        if self.synthesis.api_key_env.trim().is_empty() {
            return Err(invalid("api_key_env", "must not be empty"));
        }

        if self.synthesis.timeout_secs < 5 {
            return Err(invalid("timeout_secs", "must be at least 5 seconds"));
        }
        if self.synthesis.timeout_secs > 600 {
            return Err(invalid("timeout_secs", "exceeds maximum limit of 600 seconds"));
        }

        if self.synthesis.max_retries > 5 {
            return Err(invalid("max_retries", "exceeds maximum limit of 5"));
        }

        if self.synthesis.initial_backoff_ms > 60_000 {
            return Err(invalid(
                "initial_backoff_ms",
                "exceeds maximum limit of 60000 ms (1 minute)",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(err: ConfigError) -> String {
        match err {
            ConfigError::InvalidValue { key, .. } => key,
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::defaults();
        config.synthesis.timeout_secs = 4;
        assert_eq!(key_of(config.validate().unwrap_err()), "timeout_secs");
        config.synthesis.timeout_secs = 5;
        assert!(config.validate().is_ok());
        config.synthesis.timeout_secs = 600;
        assert!(config.validate().is_ok());
        config.synthesis.timeout_secs = 601;
        assert_eq!(key_of(config.validate().unwrap_err()), "timeout_secs");
    }

    #[test]
    fn test_retry_and_backoff_limits() {
        let mut config = Config::defaults();
        config.synthesis.max_retries = 0;
        assert!(config.validate().is_ok());
        config.synthesis.max_retries = 6;
        assert_eq!(key_of(config.validate().unwrap_err()), "max_retries");

        let mut config = Config::defaults();
        config.synthesis.initial_backoff_ms = 0;
        assert!(config.validate().is_ok());
        config.synthesis.initial_backoff_ms = 60_001;
        assert_eq!(key_of(config.validate().unwrap_err()), "initial_backoff_ms");
    }

    #[test]
    fn test_upload_limit() {
        let mut config = Config::defaults();
        config.server.max_upload_bytes = 0;
        assert_eq!(key_of(config.validate().unwrap_err()), "max_upload_bytes");
        config.server.max_upload_bytes = 65 * 1024 * 1024;
        assert_eq!(key_of(config.validate().unwrap_err()), "max_upload_bytes");
    }

    #[test]
    fn test_urls_and_bind() {
        let mut config = Config::defaults();
        config.synthesis.endpoint = "ftp://example.com".to_string();
        assert_eq!(key_of(config.validate().unwrap_err()), "endpoint");

        let mut config = Config::defaults();
        config.client.server_url = "http://".to_string();
        assert_eq!(key_of(config.validate().unwrap_err()), "server_url");

        let mut config = Config::defaults();
        config.synthesis.file_base_url = Some("localhost:7860".to_string());
        assert_eq!(key_of(config.validate().unwrap_err()), "file_base_url");

        let mut config = Config::defaults();
        config.server.bind = "localhost".to_string();
        assert_eq!(key_of(config.validate().unwrap_err()), "bind");
    }
}
