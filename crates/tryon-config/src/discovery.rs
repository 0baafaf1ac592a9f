use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CliArgs, Config, ConfigSource, TomlConfig};

/// Environment variable naming a directory that holds `config.toml`.
pub const TRYON_HOME_ENV: &str = "TRYON_HOME";

fn set<T>(
    slot: &mut T,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if let Some(value) = value {
        *slot = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Without an explicit `--config`, `$TRYON_HOME/config.toml` is used when it
    /// exists; otherwise `.tryon/config.toml` is searched upward from the
    /// current directory.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        if cli_args.config_path.is_none()
            && let Some(home) = std::env::var_os(TRYON_HOME_ENV)
        {
            let candidate = PathBuf::from(home).join("config.toml");
            if candidate.exists() {
                let mut args = cli_args.clone();
                args.config_path = Some(candidate);
                let start_dir =
                    std::env::current_dir().context("Failed to get current directory")?;
                return Self::discover_from(&start_dir, &args);
            }
        }

        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory
    ///
    /// Path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::defaults();

        let config_path = match &cli_args.config_path {
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
            config.config_path = Some(path.clone());
        }

        config.apply_cli(cli_args);

        config.validate()?;

        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let source = ConfigSource::Config;
        let attr = &mut self.source_attribution;

        if let Some(server) = file.server {
            set(&mut self.server.bind, server.bind, "bind", &source, attr);
            set(
                &mut self.server.max_upload_bytes,
                server.max_upload_bytes,
                "max_upload_bytes",
                &source,
                attr,
            );
        }

        if let Some(synthesis) = file.synthesis {
            set(&mut self.synthesis.endpoint, synthesis.endpoint, "endpoint", &source, attr);
            if synthesis.file_base_url.is_some() {
                self.synthesis.file_base_url = synthesis.file_base_url;
                attr.insert("file_base_url".to_string(), source.clone());
            }
            set(
                &mut self.synthesis.api_key_env,
                synthesis.api_key_env,
                "api_key_env",
                &source,
                attr,
            );
            set(
                &mut self.synthesis.timeout_secs,
                synthesis.timeout_secs,
                "timeout_secs",
                &source,
                attr,
            );
            set(
                &mut self.synthesis.max_retries,
                synthesis.max_retries,
                "max_retries",
                &source,
                attr,
            );
            set(
                &mut self.synthesis.initial_backoff_ms,
                synthesis.initial_backoff_ms,
                "initial_backoff_ms",
                &source,
                attr,
            );
        }

        if let Some(client) = file.client {
            set(&mut self.client.server_url, client.server_url, "server_url", &source, attr);
        }

        if let Some(logging) = file.logging {
            set(&mut self.logging.verbose, logging.verbose, "verbose", &source, attr);
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let source = ConfigSource::Cli;
        let attr = &mut self.source_attribution;

        set(&mut self.server.bind, cli.bind.clone(), "bind", &source, attr);
        set(&mut self.synthesis.endpoint, cli.endpoint.clone(), "endpoint", &source, attr);
        set(&mut self.synthesis.timeout_secs, cli.timeout_secs, "timeout_secs", &source, attr);
        set(&mut self.synthesis.max_retries, cli.max_retries, "max_retries", &source, attr);
        set(&mut self.client.server_url, cli.server_url.clone(), "server_url", &source, attr);
        set(&mut self.logging.verbose, cli.verbose, "verbose", &source, attr);
    }

    /// Discover config file by searching upward from a given directory
    ///
    /// Walks up the directory tree looking for `.tryon/config.toml`, stopping
    /// at repository root markers (.git, .hg, .svn) or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".tryon").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    /// Load configuration from TOML file
    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config: TomlConfig = toml::from_str(&content).with_context(|| {
                    format!("Failed to parse TOML config file: {}", path.display())
                })?;
                Ok(config)
            }
            // Missing config file means defaults
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            )),
        }
    }
}
