use std::path::PathBuf;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub script: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub echo: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            script: cli.script,
            config: cli.config,
            echo: cli.echo,
        }
    }
}
