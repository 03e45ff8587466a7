use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// An interactive shell over an in-memory filesystem.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// File to read commands from instead of stdin
    pub script: Option<PathBuf>,
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// YAML configuration file (defaults to ./yshell.yaml when present)
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Echo every command after the prompt
    #[clap(long, short)]
    pub echo: bool,
}
