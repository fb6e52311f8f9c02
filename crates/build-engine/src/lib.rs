//! Flutter Assemble Build Engine
//!
//! Validates a build step, resolves the `flutter assemble` rules it needs,
//! builds the command line and runs it.

pub mod config;
pub mod preconditions;
pub mod rules;
pub mod invocation;
pub mod depfile;
pub mod runner;

pub use config::{AndroidArch, BuildConfiguration, BuildConfigurationBuilder, BuildMode};
pub use preconditions::check_source_dir;
pub use rules::resolve_rules;
pub use invocation::InvocationDescriptor;
pub use depfile::{dependency_files, DependencyFiles, DEPFILE_NAME};
pub use runner::{BuildOutput, BuildProgress, BuildRunner};

use std::path::PathBuf;

/// Build errors
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid Flutter source directory: {}", display_source_dir(.path))]
    InvalidSourceDirectory { path: Option<PathBuf> },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invocation failed: {0}")]
    InvocationFailed(String),
}

fn display_source_dir(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => p.display().to_string(),
        None => "null".to_string(),
    }
}

/// Result type alias for build engine operations
pub type Result<T> = std::result::Result<T, BuildError>;
