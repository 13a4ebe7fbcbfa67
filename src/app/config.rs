//! Configuration loading: a YAML file merged with dotted-path overrides.

use crate::core::{ConfigValue, RawConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("config file {path} must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },
    #[error("malformed override '{token}': expected key.path=value")]
    MalformedOverride { token: String },
    #[error("cannot set '{key_path}': '{segment}' already holds a non-mapping value")]
    PathConflict { key_path: String, segment: String },
}

/// Loads a YAML file as raw configuration. An empty file is an empty mapping.
pub fn load_yaml(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let value: ConfigValue = if content.trim().is_empty() {
        ConfigValue::Null
    } else {
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };

    match value {
        ConfigValue::Object(map) => Ok(map),
        ConfigValue::Null => Ok(RawConfig::new()),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Sets `value` at a dotted `key_path`, creating missing levels as mappings.
pub fn set_nested_value(
    config: &mut RawConfig,
    key_path: &str,
    value: ConfigValue,
) -> Result<(), ConfigError> {
    let keys: Vec<&str> = key_path.split('.').collect();
    if keys.iter().any(|key| key.is_empty()) {
        return Err(ConfigError::MalformedOverride {
            token: key_path.to_string(),
        });
    }
    let Some((last, parents)) = keys.split_last() else {
        return Err(ConfigError::MalformedOverride {
            token: key_path.to_string(),
        });
    };

    let mut level = config;
    for key in parents {
        let entry = level
            .entry(key.to_string())
            .or_insert_with(|| ConfigValue::Object(RawConfig::new()));
        level = match entry {
            ConfigValue::Object(map) => map,
            _ => {
                return Err(ConfigError::PathConflict {
                    key_path: key_path.to_string(),
                    segment: key.to_string(),
                });
            }
        };
    }

    level.insert(last.to_string(), value);
    Ok(())
}

/// Applies one `key.path=value` token. The value stays a string; binding coerces it.
pub fn apply_override(config: &mut RawConfig, token: &str) -> Result<(), ConfigError> {
    let Some((key_path, value)) = token.split_once('=') else {
        return Err(ConfigError::MalformedOverride {
            token: token.to_string(),
        });
    };
    set_nested_value(config, key_path.trim(), ConfigValue::String(value.to_string())).map_err(
        |e| match e {
            ConfigError::MalformedOverride { .. } => ConfigError::MalformedOverride {
                token: token.to_string(),
            },
            other => other,
        },
    )
}

/// Loads the optional config file, then applies overrides in order.
pub fn merge(path: Option<&Path>, overrides: &[String]) -> Result<RawConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_yaml(path)?,
        None => RawConfig::new(),
    };
    for token in overrides {
        apply_override(&mut config, token)?;
    }
    Ok(config)
}
