//! Logging setup for tryon binaries
//!
//! Library crates only emit `tracing` events; installing a subscriber is the
//! job of the binary, done once through [`init_tracing`].

use std::io::IsTerminal;
use tracing::{Level, info, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Default filter directive when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "tryon=debug,tower_http=debug,info"
    } else {
        "tryon=info,warn"
    }
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over the built-in filter. Verbose mode adds
/// targets and span close events (request durations).
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_color())
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false);

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                layer
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.with_target(false).compact())
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one try-on request on the server.
pub fn tryon_span(request_id: u64) -> tracing::Span {
    span!(Level::INFO, "tryon_request", request_id = request_id)
}

/// Log the start of a synthesis attempt with structured fields.
pub fn log_attempt_start(attempt: u32, max_attempts: u32, garment_role: &str) {
    info!(
        attempt = attempt,
        max_attempts = max_attempts,
        garment_role = %garment_role,
        "Starting synthesis attempt"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_verbosity() {
        assert!(default_filter(true).contains("tryon=debug"));
        assert!(default_filter(false).contains("tryon=info"));
    }

    #[test]
    fn test_filters_parse() {
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
        assert!(EnvFilter::try_new(default_filter(false)).is_ok());
    }
}
