//! # Configuration
//!
//! Settings for the dumper engine and logging, read from an optional TOML file
//! and then overridden by `SYMGROUP_*` environment variables.
//!
//! ```toml
//! [dump]
//! max_container_items = 50
//! string_limit = 2000
//! chunk_size = 10240
//! library_namespace = ""
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::logging::{LogFormat, LogLevel};

/// Hard ceiling on decoded container children, regardless of configuration.
pub const CONTAINER_ITEM_CAP: usize = 100;

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings
{
    /// Dumper engine behaviour
    pub dump: DumpSettings,
    /// Logging setup
    pub logging: LoggingSettings,
}

/// Knobs used by the dumper engine and the response writer.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DumpSettings
{
    /// Maximum number of synthetic container children, clamped to [`CONTAINER_ITEM_CAP`]
    pub max_container_items: usize,
    /// Maximum number of characters shown inline for strings
    pub string_limit: usize,
    /// Maximum payload bytes per response chunk
    pub chunk_size: usize,
    /// Namespace the inspected library was built in (empty for none)
    pub library_namespace: String,
    /// Force a library major version instead of detecting it from module names
    pub library_major_version: Option<u32>,
}

impl Default for DumpSettings
{
    fn default() -> Self
    {
        Self {
            max_container_items: CONTAINER_ITEM_CAP,
            string_limit: 10_000,
            chunk_size: 10_240,
            library_namespace: String::new(),
            library_major_version: None,
        }
    }
}

impl DumpSettings
{
    /// Container item limit after applying the hard cap.
    #[must_use]
    pub fn container_limit(&self) -> usize
    {
        self.max_container_items.min(CONTAINER_ITEM_CAP)
    }
}

/// Logging section of the settings file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings
{
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Settings
{
    /// Load settings from `path` (if given) and apply environment overrides.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or an
    /// environment override cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError>
    {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse settings from a TOML file.
    ///
    /// ## Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError>
    {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse settings from TOML text.
    ///
    /// ## Errors
    ///
    /// Returns an error if the text is not valid TOML for [`Settings`].
    pub fn from_toml(text: &str) -> Result<Self, ConfigError>
    {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SYMGROUP_*` overrides using `lookup` to read variables.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError>
    {
        if let Some(value) = lookup("SYMGROUP_MAX_CONTAINER_ITEMS") {
            self.dump.max_container_items = parse_number("SYMGROUP_MAX_CONTAINER_ITEMS", &value)?;
        }
        if let Some(value) = lookup("SYMGROUP_STRING_LIMIT") {
            self.dump.string_limit = parse_number("SYMGROUP_STRING_LIMIT", &value)?;
        }
        if let Some(value) = lookup("SYMGROUP_CHUNK_SIZE") {
            self.dump.chunk_size = parse_number("SYMGROUP_CHUNK_SIZE", &value)?;
        }
        if let Some(value) = lookup("SYMGROUP_LIBRARY_NAMESPACE") {
            self.dump.library_namespace = value;
        }
        if let Some(value) = lookup("SYMGROUP_LIBRARY_VERSION") {
            self.dump.library_major_version = Some(parse_number("SYMGROUP_LIBRARY_VERSION", &value)?);
        }
        if let Some(value) = lookup("SYMGROUP_LOG_LEVEL") {
            self.logging.level = value.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "SYMGROUP_LOG_LEVEL".to_string(),
                reason,
            })?;
        }
        if let Some(value) = lookup("SYMGROUP_LOG_FORMAT") {
            self.logging.format = value.parse().map_err(|reason| ConfigError::InvalidValue {
                key: "SYMGROUP_LOG_FORMAT".to_string(),
                reason,
            })?;
        }
        if let Some(value) = lookup("SYMGROUP_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(value));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    /// The settings file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Read
    {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML
    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override has the wrong shape
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue
    {
        key: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults()
    {
        let settings = Settings::default();
        assert_eq!(settings.dump.max_container_items, 100);
        assert_eq!(settings.dump.chunk_size, 10_240);
        assert_eq!(settings.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_partial_toml_keeps_defaults()
    {
        let settings = Settings::from_toml("[dump]\nstring_limit = 12\n").unwrap();
        assert_eq!(settings.dump.string_limit, 12);
        assert_eq!(settings.dump.max_container_items, 100);
        assert!(settings.dump.library_namespace.is_empty());
    }

    #[test]
    fn test_container_limit_is_capped()
    {
        let settings = Settings::from_toml("[dump]\nmax_container_items = 5000\n").unwrap();
        assert_eq!(settings.dump.container_limit(), CONTAINER_ITEM_CAP);
    }

    #[test]
    fn test_env_overrides()
    {
        let vars: HashMap<&str, &str> = [
            ("SYMGROUP_CHUNK_SIZE", "64"),
            ("SYMGROUP_LIBRARY_VERSION", "4"),
            ("SYMGROUP_LOG_LEVEL", "trace"),
            ("SYMGROUP_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings.apply_env(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
        assert_eq!(settings.dump.chunk_size, 64);
        assert_eq!(settings.dump.library_major_version, Some(4));
        assert_eq!(settings.logging.level, LogLevel::Trace);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_bad_env_override()
    {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|key| (key == "SYMGROUP_STRING_LIMIT").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("SYMGROUP_STRING_LIMIT"));
    }
}
