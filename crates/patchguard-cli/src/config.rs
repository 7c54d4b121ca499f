use std::path::{Path, PathBuf};

use clap::ValueEnum;
use patchguard_validate::ValidateOptions;
use serde::{Deserialize, Serialize};

use crate::{CliError, CliResult};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "patchguard.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Filter directives used when `PATCHGUARD_LOG` is not set.
    pub filter: Option<String>,
    /// Append JSON log lines to this file instead of stderr.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub validate: ValidateOptions,
    pub log: LogSettings,
}

/// Load the configuration file, falling back to defaults when none exists.
///
/// An explicitly requested file must exist.
pub fn load_config(explicit: Option<&Path>) -> CliResult<CliConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::InvalidConfig(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                return Ok(CliConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> CliResult<CliConfig> {
    let config: CliConfig = toml::from_str(content)?;
    Ok(config)
}

pub fn render_config(config: &CliConfig) -> CliResult<String> {
    let encoded = toml::to_string_pretty(config)?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchguard_validate::OpKind;
    use serde_json::json;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").expect("parse empty config");
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let config = parse_config(
            r#"
[validate]
abort_early = false
allowed_ops = ["add", "replace"]
presence = "required"

[log]
format = "json"
filter = "patchguard_validate=debug"
"#,
        )
        .expect("parse config");

        assert!(!config.validate.abort_early);
        assert!(config.validate.convert);
        assert_eq!(config.validate.allowed_ops.len(), 2);
        assert!(config.validate.allowed_ops.contains(&OpKind::Replace));
        assert_eq!(config.validate.extra.get("presence"), Some(&json!("required")));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter.as_deref(), Some("patchguard_validate=debug"));
    }

    #[test]
    fn rendered_config_parses_back() {
        let mut config = CliConfig::default();
        config.validate.allow_unknown = true;
        let rendered = render_config(&config).expect("render config");
        assert_eq!(parse_config(&rendered).expect("parse rendered"), config);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("does/not/exist.toml"))).expect_err("missing file");
        assert!(err.to_string().contains("config file not found"));
    }
}
