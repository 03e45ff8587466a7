use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "yshell.yaml";
const DEFAULT_PROMPT: &str = "% ";

fn get_default_config_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// When error output gets colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves `Auto` against what the terminal behind stderr supports.
    pub fn enabled(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => supports_color::on(supports_color::Stream::Stderr).is_some(),
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "auto" => Ok(ColorMode::Auto),
            "always" => Ok(ColorMode::Always),
            "never" => Ok(ColorMode::Never),
            _ => InvalidValueSnafu {
                key: "color",
                expected: "one of auto, always, never",
            }
            .fail(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: String,
    pub echo: bool,
    pub color: ColorMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            echo: false,
            color: ColorMode::default(),
        }
    }
}

impl ShellConfig {
    /// Loads `path` when given. Otherwise `yshell.yaml` in the working
    /// directory is used if it exists, and the defaults if it does not.
    pub async fn read(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path).await,
            None => {
                let default_path = get_default_config_path();
                if default_path.is_file() {
                    Self::from_path(&default_path).await
                } else {
                    info!("No {} found, using default configuration", CONFIG_FILE_NAME);
                    Ok(Self::default())
                }
            }
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading config file: {}", path.display());
        let bytes = fs::read(path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.display().to_string(),
        })?;
        debug!("Successfully read config file: {} bytes", contents.len());
        contents.as_str().try_into()
    }

    fn from_mapping(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in top_level {
            let Yaml::Value(Scalar::String(key)) = key else {
                warn!("Skipping non-string config key: {:?}", key);
                continue;
            };
            let key: &str = key;
            match key {
                "prompt" => {
                    config.prompt = value
                        .as_str()
                        .context(InvalidValueSnafu {
                            key: "prompt",
                            expected: "a string",
                        })?
                        .to_string();
                }
                "echo" => {
                    config.echo = match value {
                        Yaml::Value(Scalar::Boolean(echo)) => *echo,
                        _ => {
                            return InvalidValueSnafu {
                                key: "echo",
                                expected: "a boolean",
                            }
                            .fail();
                        }
                    };
                }
                "color" => {
                    config.color = value
                        .as_str()
                        .context(InvalidValueSnafu {
                            key: "color",
                            expected: "a string",
                        })?
                        .parse()?;
                }
                other => warn!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(config)
    }
}

impl TryFrom<&str> for ShellConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        };
        if let Yaml::Value(Scalar::Null) = document {
            return Ok(Self::default());
        }

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
        Self::from_mapping(top_level)
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("The config file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue { key: String, expected: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[compio::test]
    async fn config_returns_error_on_nonexistent_file() {
        let result = ShellConfig::from_path(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[compio::test]
    async fn config_is_read_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(file, "prompt: \"$ \"\necho: true\ncolor: never").expect("Failed to write config");

        let config = ShellConfig::read(Some(file.path()))
            .await
            .expect("Failed to read config");
        assert_eq!(
            config,
            ShellConfig {
                prompt: "$ ".into(),
                echo: true,
                color: ColorMode::Never,
            }
        );
    }

    #[rstest]
    #[case("")]
    #[case("~")]
    #[case("other_setting: 3")]
    fn config_falls_back_to_defaults(#[case] contents: &str) {
        let config: ShellConfig = contents.try_into().unwrap();
        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn config_returns_error_on_invalid_yaml() {
        let result: Result<ShellConfig, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn config_returns_error_when_top_level_is_not_map(#[case] contents: &str) {
        let result: Result<ShellConfig, _> = contents.try_into();
        assert!(matches!(result, Err(ConfigError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("prompt: [1, 2]", "prompt")]
    #[case("echo: sometimes", "echo")]
    #[case("color: purple", "color")]
    #[case("color: 7", "color")]
    fn config_rejects_wrong_value_types(#[case] contents: &str, #[case] bad_key: &str) {
        let result: Result<ShellConfig, _> = contents.try_into();
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, bad_key),
            other => panic!("Expected InvalidValue, got {other:?}"),
        }
    }

    #[rstest]
    #[case(ColorMode::Always, true)]
    #[case(ColorMode::Never, false)]
    fn explicit_color_modes_ignore_the_terminal(#[case] mode: ColorMode, #[case] expected: bool) {
        assert_eq!(mode.enabled(), expected);
    }

    #[test]
    fn default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.prompt, "% ");
        assert!(!config.echo);
        assert_eq!(config.color, ColorMode::Auto);
    }
}
