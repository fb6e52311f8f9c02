//! flutter-assemble
//!
//! Android build step that drives `flutter assemble` from a declarative
//! configuration.
//!
//! ## Architecture
//!
//! - `flutter-assemble-core`: user settings and shared errors
//! - `flutter-assemble-build-engine`: precondition checks, rule names,
//!   invocation building, depfile declaration and the process runner
//!
//! This crate adds the command-line front end on top.

#![warn(missing_docs)]
#![warn(clippy::all)]

#[allow(missing_docs)]
pub mod commands;

// Re-export main components for library usage
pub use flutter_assemble_build_engine as build;
pub use flutter_assemble_core as core;

/// Prelude module for convenient imports
pub mod prelude {
    pub use flutter_assemble_build_engine::{
        BuildConfiguration, BuildMode, BuildRunner, InvocationDescriptor,
    };
    pub use flutter_assemble_core::ToolConfig;
}
