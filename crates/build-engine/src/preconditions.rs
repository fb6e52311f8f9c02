//! Precondition checks run before an invocation is built or launched.

use std::path::Path;

use tracing::debug;

use crate::BuildError;

/// Ensure the Flutter source directory is present and is a directory.
pub fn check_source_dir(source_dir: Option<&Path>) -> Result<(), BuildError> {
    match source_dir {
        Some(dir) if dir.is_dir() => {
            debug!("Source directory ok: {:?}", dir);
            Ok(())
        }
        other => Err(BuildError::InvalidSourceDirectory {
            path: other.map(Path::to_path_buf),
        }),
    }
}
