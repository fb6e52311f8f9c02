//! flutter-assemble core - shared settings and errors
//!
//! Holds the user-level tool settings that supply defaults to build files.

pub mod config;
pub mod error;

pub use config::ToolConfig;
pub use error::{CoreError, Result};

/// flutter-assemble version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "flutter-assemble";
