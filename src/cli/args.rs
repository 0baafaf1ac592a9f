//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tryon_config::CliArgs;

/// tryon - virtual try-on server and client
#[derive(Parser, Debug)]
#[command(name = "tryon")]
#[command(about = "Virtual try-on: serve the try-on endpoint or submit images to it")]
#[command(long_about = r#"
tryon runs an HTTP endpoint that composites garment images onto a person photo
through a remote synthesis model, and a client that submits to it.

EXAMPLES:
  # Start the server (reads HUGGINGFACE_API_KEY)
  tryon serve --bind 0.0.0.0:5000

  # Try a shirt on
  tryon submit --person me.jpg --shirt shirt.png --out ./results

  # Show the effective configuration and where each value came from
  tryon config --json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for .tryon/config.toml,
  or read from $TRYON_HOME/config.toml. Use --config to pass an explicit path.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Synthesis model endpoint URL
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Synthesis timeout in seconds (default: 60, min: 5)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Retries after a failed synthesis attempt (default: 1)
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the try-on HTTP server
    Serve {
        /// Address to listen on (default: 127.0.0.1:5000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Submit a person photo and garments to a try-on server
    Submit {
        /// Person photo
        #[arg(long)]
        person: PathBuf,

        /// Shirt image
        #[arg(long)]
        shirt: Option<PathBuf>,

        /// Pants image
        #[arg(long)]
        pants: Option<PathBuf>,

        /// Clothing metadata as JSON, e.g. '{"shirt":{"type":"T-Shirt","color":"red"}}'
        #[arg(long)]
        clothing: Option<String>,

        /// Directory to write the generated image to
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Try-on server base URL
        #[arg(long)]
        server: Option<String>,
    },

    /// Print the effective configuration with sources
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Configuration overrides given on the command line.
    #[must_use]
    pub fn config_args(&self) -> CliArgs {
        let (bind, server_url) = match &self.command {
            Commands::Serve { bind } => (bind.clone(), None),
            Commands::Submit { server, .. } => (None, server.clone()),
            Commands::Config { .. } => (None, None),
        };

        CliArgs {
            config_path: self.config.clone(),
            verbose: self.verbose.then_some(true),
            bind,
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            server_url,
        }
    }
}
