//! Activation configuration.
//!
//! Sources in priority order (highest first):
//! 1. Environment variables with the `IOC_` prefix
//! 2. TOML configuration file
//! 3. Defaults
//!
//! ```toml
//! sequence_detection = "include_inherited"
//! resolution_mode = "parallel"
//! log_resolutions = true
//! max_depth = 32
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::cardinality::SequenceDetection;

pub const ENV_PREFIX: &str = "IOC_";

/// How the parameters of one activation are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// One after another in declaration order
    #[default]
    Sequential,
    /// Concurrently on the rayon pool; results are still placed by position
    Parallel,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings shared by the descriptor builder, factories and the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivationConfig {
    pub sequence_detection: SequenceDetection,
    pub resolution_mode: ResolutionMode,
    /// Log each parameter resolution at debug level instead of trace
    pub log_resolutions: bool,
    /// Recursion limit enforced by resolvers that track the resolution path
    pub max_depth: usize,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            sequence_detection: SequenceDetection::DirectOnly,
            resolution_mode: ResolutionMode::Sequential,
            log_resolutions: false,
            max_depth: 64,
        }
    }
}

impl ActivationConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded activation config from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Defaults, then the optional file, then `IOC_*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Non-UTF-8 variables cannot carry an override
        let vars = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::load_with_env(path, vars)
    }

    /// Same layering as [`ActivationConfig::load`] with an explicit environment
    pub fn load_with_env<I, K, V>(path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(vars)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `IOC_*` overrides from an iterator of environment pairs
    pub fn apply_overrides<I, K, V>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match name {
                "SEQUENCE_DETECTION" => {
                    self.sequence_detection = parse_enum(key.as_ref(), value)?;
                }
                "RESOLUTION_MODE" => {
                    self.resolution_mode = parse_enum(key.as_ref(), value)?;
                }
                "LOG_RESOLUTIONS" => {
                    self.log_resolutions = parse_value(key.as_ref(), value)?;
                }
                "MAX_DEPTH" => {
                    self.max_depth = parse_value(key.as_ref(), value)?;
                }
                _ => continue,
            }
            debug!("Applied override {}={}", key.as_ref(), value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a snake_case enum value through its serde representation
fn parse_enum<T: for<'de> Deserialize<'de>>(key: &str, value: &str) -> Result<T, ConfigError> {
    T::deserialize(toml::Value::String(value.to_lowercase())).map_err(|_| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ActivationConfig::default();
        assert_eq!(config.sequence_detection, SequenceDetection::DirectOnly);
        assert_eq!(config.resolution_mode, ResolutionMode::Sequential);
        assert!(!config.log_resolutions);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ActivationConfig::from_toml_str(r#"resolution_mode = "parallel""#).unwrap();
        assert_eq!(config.resolution_mode, ResolutionMode::Parallel);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "sequence_detection = \"include_inherited\"\nlog_resolutions = true\nmax_depth = 8"
        )
        .unwrap();

        let config = ActivationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.sequence_detection, SequenceDetection::IncludeInherited);
        assert!(config.log_resolutions);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn test_missing_file() {
        let err = ActivationConfig::from_file("/nonexistent/ioc.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_overrides() {
        let mut config = ActivationConfig::default();
        config
            .apply_overrides([
                ("IOC_RESOLUTION_MODE", "PARALLEL"),
                ("IOC_MAX_DEPTH", "12"),
                ("IOC_LOG_RESOLUTIONS", "true"),
                ("PATH", "/usr/bin"),
                ("IOC_UNKNOWN", "ignored"),
            ])
            .unwrap();

        assert_eq!(config.resolution_mode, ResolutionMode::Parallel);
        assert_eq!(config.max_depth, 12);
        assert!(config.log_resolutions);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = ActivationConfig::default();
        let err = config
            .apply_overrides([("IOC_SEQUENCE_DETECTION", "sometimes")])
            .unwrap_err();
        assert!(err.to_string().contains("IOC_SEQUENCE_DETECTION"));
    }

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_env_overrides_file() {
        let file = config_file(
            "resolution_mode = \"parallel\"\nmax_depth = 8\nlog_resolutions = true",
        );

        let config = ActivationConfig::load_with_env(
            Some(file.path()),
            [("IOC_MAX_DEPTH", "16"), ("IOC_SEQUENCE_DETECTION", "include_inherited")],
        )
        .unwrap();

        assert_eq!(config.max_depth, 16);
        assert_eq!(config.sequence_detection, SequenceDetection::IncludeInherited);
        // Keys without an override keep the file value
        assert_eq!(config.resolution_mode, ResolutionMode::Parallel);
        assert!(config.log_resolutions);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config =
            ActivationConfig::load_with_env(None, [("IOC_RESOLUTION_MODE", "parallel")]).unwrap();
        assert_eq!(config.resolution_mode, ResolutionMode::Parallel);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_load_validates_after_overrides() {
        let file = config_file("max_depth = 8");

        let err = ActivationConfig::load_with_env(Some(file.path()), [("IOC_MAX_DEPTH", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("max_depth"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = ActivationConfig::load_with_env(
            Some(Path::new("/nonexistent/ioc.toml")),
            std::iter::empty::<(String, String)>(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_reads_process_environment() {
        let file = config_file("max_depth = 8");
        let config = ActivationConfig::load(Some(file.path())).unwrap();
        assert!(config.max_depth >= 1);
    }

    #[test]
    fn test_zero_depth_rejected() {
        assert!(ActivationConfig::from_toml_str("max_depth = 0").is_err());
    }
}
