use std::fmt;
use std::io;
use thiserror::Error;

/// Library-level error type for tryon operations.
///
/// `TryOnError` wraps the narrower error enums so the CLI has a single type to
/// report and map onto exit codes.
///
/// | Variant | Exit code |
/// |---------|-----------|
/// | `Config` | 2 |
/// | `Synthesis(Validation)` | 3 |
/// | `Synthesis(Timeout / RateLimited / ServiceLoading)` | 69 |
/// | `Synthesis(AuthConfig / Unknown)` | 70 |
/// | `DataUrl`, `Io` | 1 |
///
/// # Example
///
/// ```rust
/// use tryon_utils::error::{SynthesisError, TryOnError};
/// use tryon_utils::exit_codes::ExitCode;
///
/// let err = TryOnError::from(SynthesisError::RateLimited("slow down".to_string()));
/// assert_eq!(err.to_exit_code(), ExitCode::SERVICE_UNAVAILABLE);
/// ```
#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Data URL error: {0}")]
    DataUrl(#[from] DataUrlError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TryOnError {
    /// Format the error with its suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("✗ {}", self.user_message());
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for s in suggestions {
                out.push_str("\n  • ");
                out.push_str(&s);
            }
        }
        out
    }
}

/// Trait for providing user-friendly error reporting with suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;
}

/// Stable classification of a synthesis failure.
///
/// The kind decides both the retry policy and the HTTP status returned to
/// callers of the try-on endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller's request is malformed or incomplete
    Validation,
    /// Upstream took too long
    Timeout,
    /// Upstream throttling
    RateLimited,
    /// Upstream cold start or unavailability
    ServiceLoading,
    /// Deployment misconfiguration (credentials, endpoint)
    AuthConfig,
    /// Anything unrecognized, including malformed upstream responses
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Validation,
        ErrorKind::Timeout,
        ErrorKind::RateLimited,
        ErrorKind::ServiceLoading,
        ErrorKind::AuthConfig,
        ErrorKind::Unknown,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::ServiceLoading => "service_loading",
            Self::AuthConfig => "auth_config",
            Self::Unknown => "unknown",
        }
    }

    /// HTTP status code used by the try-on endpoint for this kind.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::AuthConfig => 500,
            Self::ServiceLoading => 503,
            Self::RateLimited => 429,
            Self::Timeout => 504,
            Self::Unknown => 500,
        }
    }

    /// Recover a kind from a status code returned by the try-on endpoint.
    ///
    /// `AuthConfig` and `Unknown` share 500, so 500 always reads back as `Unknown`.
    #[must_use]
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            503 => Self::ServiceLoading,
            504 => Self::Timeout,
            400..=499 => Self::Validation,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure of the try-on pipeline.
///
/// Each variant carries a human-readable message. The message is what ends up
/// in the `error` field of the JSON response, except for `AuthConfig`, whose
/// detail is never returned to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Service loading: {0}")]
    ServiceLoading(String),

    #[error("Configuration error: {0}")]
    AuthConfig(String),

    #[error("Synthesis failed: {0}")]
    Unknown(String),
}

impl SynthesisError {
    /// Build an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Timeout => Self::Timeout(message),
            ErrorKind::RateLimited => Self::RateLimited(message),
            ErrorKind::ServiceLoading => Self::ServiceLoading(message),
            ErrorKind::AuthConfig => Self::AuthConfig(message),
            ErrorKind::Unknown => Self::Unknown(message),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::ServiceLoading(_) => ErrorKind::ServiceLoading,
            Self::AuthConfig(_) => ErrorKind::AuthConfig,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// The bare message, without the kind prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Timeout(m)
            | Self::RateLimited(m)
            | Self::ServiceLoading(m)
            | Self::AuthConfig(m)
            | Self::Unknown(m) => m,
        }
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// Validation and configuration failures are deterministic.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::AuthConfig(_))
    }
}

impl UserFriendlyError for SynthesisError {
    fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Invalid try-on request: {msg}"),
            Self::Timeout(msg) => format!("The model took too long to respond: {msg}"),
            Self::RateLimited(msg) => format!("The model service is rate limiting requests: {msg}"),
            Self::ServiceLoading(msg) => format!("The model service is not ready: {msg}"),
            Self::AuthConfig(msg) => format!("Synthesis service configuration error: {msg}"),
            Self::Unknown(msg) => format!("Outfit generation failed: {msg}"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Validation(_) => vec![
                "Provide a person photo and at least one garment image".to_string(),
                "Use PNG, JPEG or WEBP images no larger than 8MB".to_string(),
            ],
            Self::Timeout(_) | Self::ServiceLoading(_) => vec![
                "Wait a few moments and try again".to_string(),
                "Increase [synthesis] timeout_secs if the model is consistently slow".to_string(),
            ],
            Self::RateLimited(_) => vec![
                "Wait a minute and try again".to_string(),
                "Check the usage limits of the synthesis provider account".to_string(),
            ],
            Self::AuthConfig(_) => vec![
                "Check that the API key environment variable named by [synthesis] api_key_env is set".to_string(),
                "Verify [synthesis] endpoint in .tryon/config.toml".to_string(),
            ],
            Self::Unknown(_) => vec![
                "Try again; run with --verbose to see detailed error information".to_string(),
            ],
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(msg) => format!("Configuration file is invalid: {msg}"),
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration value for '{key}' is invalid: {value}")
            }
            Self::DiscoveryFailed { reason } => {
                format!("Could not locate configuration: {reason}")
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .tryon/config.toml".to_string(),
                "Run 'tryon config' to see the effective configuration".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Set '{key}' in .tryon/config.toml")],
            Self::InvalidValue { key, .. } => vec![
                format!("Fix '{key}' in .tryon/config.toml or the matching CLI flag"),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Pass --config with an explicit path".to_string(),
                "Set TRYON_HOME to the directory containing config.toml".to_string(),
            ],
        }
    }
}

/// Errors produced while encoding or decoding data URLs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,

    #[error("data URL has no payload separator")]
    MissingPayload,

    #[error("data URL is not base64 encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),
}

impl UserFriendlyError for TryOnError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Synthesis(e) => e.user_message(),
            Self::DataUrl(e) => format!("Could not decode image data: {e}"),
            Self::Io(e) => format!("File operation failed: {e}"),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Synthesis(e) => e.suggestions(),
            Self::DataUrl(_) => vec!["The server returned an unreadable image; try again".to_string()],
            Self::Io(_) => vec!["Check that the path exists and is writable".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::AuthConfig.http_status(), 500);
        assert_eq!(ErrorKind::ServiceLoading.http_status(), 503);
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::Timeout.http_status(), 504);
        assert_eq!(ErrorKind::Unknown.http_status(), 500);
    }

    #[test]
    fn test_status_reads_back_except_auth_config() {
        for kind in ErrorKind::ALL {
            let back = ErrorKind::from_http_status(kind.http_status());
            if kind == ErrorKind::AuthConfig {
                assert_eq!(back, ErrorKind::Unknown);
            } else {
                assert_eq!(back, kind, "kind {kind} did not survive the status mapping");
            }
        }
    }

    #[test]
    fn test_new_preserves_kind_and_message() {
        for kind in ErrorKind::ALL {
            let err = SynthesisError::new(kind, "boom");
            assert_eq!(err.kind(), kind);
            assert_eq!(err.message(), "boom");
        }
    }

    #[test]
    fn test_retriable() {
        assert!(!SynthesisError::AuthConfig("key".into()).is_retriable());
        assert!(!SynthesisError::Validation("bad".into()).is_retriable());
        assert!(SynthesisError::ServiceLoading("cold".into()).is_retriable());
        assert!(SynthesisError::RateLimited("429".into()).is_retriable());
        assert!(SynthesisError::Timeout("60s".into()).is_retriable());
        assert!(SynthesisError::Unknown("?".into()).is_retriable());
    }

    #[test]
    fn test_display_for_user_lists_suggestions() {
        let err = TryOnError::from(SynthesisError::AuthConfig("missing key".into()));
        let text = err.display_for_user();
        assert!(text.contains("missing key"));
        assert!(text.contains("Suggestions:"));
        assert!(text.contains("api_key_env"));
    }
}
