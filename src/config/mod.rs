mod shell_config;

pub use shell_config::{ColorMode, ConfigError, ShellConfig};
