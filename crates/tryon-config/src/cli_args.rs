use std::path::PathBuf;

/// Configuration overrides collected from the command line.
///
/// `None` means "not given"; only `Some` values take part in precedence.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub bind: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub server_url: Option<String>,
}
