//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs the tracing
//! subscriber, creates the tokio runtime and dispatches. It prints every
//! error itself; `main` only maps the returned code to the process exit.

use anyhow::Result;
use clap::Parser;

use tryon_config::Config;
use tryon_error_redaction::redact_error_message;
use tryon_utils::error::{ConfigError, TryOnError};
use tryon_utils::exit_codes::ExitCode;
use tryon_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    let cli_args = cli.config_args();

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            match err.downcast_ref::<ConfigError>() {
                Some(config_err) => {
                    let err = TryOnError::Config(config_err.clone());
                    eprintln!("{}", err.display_for_user());
                }
                None => eprintln!("✗ Failed to load configuration: {err:#}"),
            }
            return Err(ExitCode::CLI_ARGS);
        }
    };

    // A subscriber may already be installed when embedded; keep going without ours.
    let _ = init_tracing(config.logging.verbose);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        match cli.command {
            Commands::Serve { .. } => commands::execute_serve_command(&config).await,
            Commands::Submit {
                person,
                shirt,
                pants,
                clothing,
                out,
                ..
            } => {
                commands::execute_submit_command(
                    &config,
                    &commands::SubmitPaths {
                        person,
                        shirt,
                        pants,
                        out,
                    },
                    clothing.as_deref(),
                )
                .await
            }
            Commands::Config { json } => commands::execute_config_command(&config, json),
        }
    });

    if let Err(error) = result {
        return Err(report_error(&error));
    }

    Ok(())
}

fn report_error(error: &anyhow::Error) -> ExitCode {
    if let Some(tryon_error) = error.downcast_ref::<TryOnError>() {
        eprintln!("{}", redact_error_message(&tryon_error.display_for_user()));
        return tryon_error.to_exit_code();
    }

    eprintln!("✗ Unexpected error: {}", redact_error_message(&format!("{error:#}")));
    eprintln!("\n  General troubleshooting:");
    eprintln!("    - Run with --verbose for more detailed output");
    eprintln!("    - Run 'tryon config' to check the effective configuration");
    ExitCode::INTERNAL
}
