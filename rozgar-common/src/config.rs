//! Configuration file primitives shared by Rozgar services
//!
//! Resolution priority used by every service:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: loading reports a
//! [`ConfigOrigin::Defaults`] and the service warns about it once logging
//! is up.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Default TOML path for a module: `<config_dir>/rozgar/<module>.toml`
///
/// On Linux `/etc/rozgar/<module>.toml` is used when no per-user file exists.
pub fn default_config_path(module_name: &str) -> PathBuf {
    let file_name = format!("{}.toml", module_name);
    let user_config = dirs::config_dir().map(|d| d.join("rozgar").join(&file_name));

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rozgar").join(&file_name);
        match user_config {
            Some(path) if path.exists() => path,
            _ if system_config.exists() => system_config,
            Some(path) => path,
            None => system_config,
        }
    } else {
        user_config.unwrap_or_else(|| PathBuf::from(file_name))
    }
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// Parsed from this file
    File(PathBuf),
    /// The file at this path did not exist; compiled defaults were used
    Defaults(PathBuf),
}

impl ConfigOrigin {
    pub fn path(&self) -> &Path {
        match self {
            ConfigOrigin::File(p) | ConfigOrigin::Defaults(p) => p,
        }
    }

    pub fn is_defaults(&self) -> bool {
        matches!(self, ConfigOrigin::Defaults(_))
    }
}

/// Parse a TOML file into `T`, falling back to `T::default()` when the file
/// does not exist. A file that exists but cannot be parsed is still an error.
///
/// Nothing is logged here; callers usually load config before the tracing
/// subscriber exists and should report the origin afterwards.
pub fn load_toml_or_default<T: DeserializeOwned + Default>(
    path: &Path,
) -> Result<(T, ConfigOrigin)> {
    if !path.exists() {
        return Ok((T::default(), ConfigOrigin::Defaults(path.to_path_buf())));
    }

    let config = load_toml(path)?;
    Ok((config, ConfigOrigin::File(path.to_path_buf())))
}

/// Read an environment variable, treating empty or whitespace values as unset
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean environment flag (`true/false`, `1/0`, `yes/no`, `on/off`)
pub fn env_flag(name: &str) -> Option<bool> {
    env_var(name).and_then(|v| match v.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring unrecognized boolean value '{}' for {}", v, name);
            None
        }
    })
}
