//! Error types for flutter-assemble settings handling.

use thiserror::Error;

/// Errors raised while locating, reading or writing tool settings
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Io(e) => format!("File operation failed: {}", e),
            CoreError::Config(msg) => format!("Configuration error: {}", msg),
            CoreError::TomlParse(e) => format!("Settings file is not valid TOML: {}", e),
            CoreError::TomlSerialize(e) => format!("Could not write settings: {}", e),
        }
    }
}
