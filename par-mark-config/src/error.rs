//! Typed error variants for the par-mark-config crate.
//!
//! Provides structured error types for config I/O and validation operations,
//! so callers can match on the failure mode instead of inspecting strings.

use std::fmt;

/// Errors that can occur when loading or saving the bookmark configuration.
///
/// # Example
///
/// ```rust,no_run
/// use par_mark_config::{BookmarkConfig, ConfigError};
///
/// match BookmarkConfig::load_from(std::path::Path::new("config.yaml")) {
///     Ok(config) => println!("{} colors", config.colors.len()),
///     Err(ConfigError::Parse(p)) => eprintln!("YAML parse error: {p}"),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing the config file.
    Io(std::io::Error),

    /// The config file contained invalid YAML that could not be parsed.
    Parse(serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string describes which field is invalid and why.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error reading config: {e}"),
            ConfigError::Parse(e) => write!(f, "YAML parse error in config: {e}"),
            ConfigError::Validation(msg) => write!(f, "Config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Validation(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "config missing");
        let err: ConfigError = io_err.into();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().contains("config missing"));
    }

    #[test]
    fn test_validation_display() {
        let err = ConfigError::Validation("max_group_name_length must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Config validation error: max_group_name_length must be positive"
        );
        assert!(std::error::Error::source(&err).is_none());
    }
}
