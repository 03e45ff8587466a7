use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use compio::fs;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::config::{ConfigError, ShellConfig};
use crate::shell::{Shell, ShellError, ShellOptions, lossy_lines};

pub struct Application;

impl Application {
    /// Runs one shell session and returns its exit status.
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<i32, ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let config = ShellConfig::read(app_config.config.as_deref())
            .await
            .context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let color = config.color.enabled();
        colored::control::set_override(color);

        let script = match app_config.script {
            Some(path) => Some(Self::read_script(path).await?),
            None => None,
        };

        let mut shell = Shell::new(ShellOptions {
            prompt: Some(config.prompt),
            echo: config.echo || app_config.echo,
            color,
        });

        let mut stdout = io::stdout().lock();
        let mut stderr = io::stderr().lock();
        let outcome = match script {
            Some(lines) => {
                info!("Running script of {} lines", lines.len());
                shell.run(
                    lines.into_iter().map(Ok::<_, io::Error>),
                    false,
                    &mut stdout,
                    &mut stderr,
                )
            }
            None => {
                let stdin = io::stdin();
                let interactive = stdin.is_terminal();
                info!("Reading commands from stdin (interactive: {})", interactive);
                shell.run(lossy_lines(stdin.lock()), interactive, &mut stdout, &mut stderr)
            }
        };
        let flushed = stdout.flush();

        // The tree is torn down even when the session ended on an I/O failure.
        let status = shell.finish();
        info!("Shell exited with status {}", status);
        outcome.context(ShellSnafu)?;
        flushed.context(FlushSnafu)?;
        Ok(status)
    }

    async fn read_script(path: PathBuf) -> Result<Vec<String>, ApplicationError> {
        debug!("Reading script file: {}", path.display());
        let bytes = fs::read(&path).await.context(ScriptReadSnafu {
            file_path: path.display().to_string(),
        })?;
        Ok(String::from_utf8_lossy(&bytes)
            .lines()
            .map(String::from)
            .collect())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Failed to read the script file: {}", file_path))]
    ScriptReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Critical failure encountered while running the shell"))]
    ShellError { source: ShellError },
    #[snafu(display("Failed to flush standard output"))]
    FlushError { source: std::io::Error },
}
