//! CLI command implementations.

mod config;
mod serve;
mod submit;

pub use config::{execute_config_command, render_config_table};
pub use serve::execute_serve_command;
pub use submit::{SubmitPaths, execute_submit_command};
