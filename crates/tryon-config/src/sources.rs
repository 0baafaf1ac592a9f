use std::collections::HashMap;

use super::{Config, ConfigSource};

fn source_label(source: Option<&ConfigSource>) -> String {
    source.unwrap_or(&ConfigSource::Default).to_string()
}

impl Config {
    /// Get effective configuration as key-value pairs with source attribution
    #[must_use]
    pub fn effective_config(&self) -> HashMap<String, (String, String)> {
        let mut config = HashMap::new();

        let mut add_config = |key: &str, value: String| {
            let source = source_label(self.source_attribution.get(key));
            config.insert(key.to_string(), (value, source));
        };

        add_config("bind", self.server.bind.clone());
        add_config("max_upload_bytes", self.server.max_upload_bytes.to_string());
        add_config("endpoint", self.synthesis.endpoint.clone());
        add_config("file_base_url", self.file_base_url());
        add_config("api_key_env", self.synthesis.api_key_env.clone());
        add_config("timeout_secs", self.synthesis.timeout_secs.to_string());
        add_config("max_retries", self.synthesis.max_retries.to_string());
        add_config(
            "initial_backoff_ms",
            self.synthesis.initial_backoff_ms.to_string(),
        );
        add_config("server_url", self.client.server_url.clone());
        add_config("verbose", self.logging.verbose.to_string());

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CONFIG_KEYS;

    #[test]
    fn test_every_key_is_reported() {
        let effective = Config::defaults().effective_config();
        for key in CONFIG_KEYS {
            let (_, source) = effective
                .get(key)
                .unwrap_or_else(|| panic!("missing key {key}"));
            assert_eq!(source, "default");
        }
        assert_eq!(effective.len(), CONFIG_KEYS.len());
    }
}
