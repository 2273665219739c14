use std::time::Duration;

use thiserror::Error;

/// Custom error type for Scrivo operations.
#[derive(Debug, Error)]
pub enum ScrivoError {
    /// Entity catalog could not be read or parsed.
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// A filter or replacement pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Input validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external completion or retrieval provider failed.
    #[error("Provider error: {0}")]
    Provider(String),

    /// An external call did not resolve in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ScrivoError {
    fn from(err: std::io::Error) -> Self {
        ScrivoError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ScrivoError {
    fn from(err: serde_json::Error) -> Self {
        ScrivoError::Catalog(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml_ng::Error> for ScrivoError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ScrivoError::Catalog(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ScrivoError {
    fn from(err: toml::de::Error) -> Self {
        ScrivoError::Config(format!("TOML error: {}", err))
    }
}

impl From<regex::Error> for ScrivoError {
    fn from(err: regex::Error) -> Self {
        ScrivoError::Pattern {
            pattern: String::new(),
            message: err.to_string(),
        }
    }
}
