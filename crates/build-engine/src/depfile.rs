//! Dependency file declaration.
//!
//! `flutter assemble` writes a make-style depfile listing every input it
//! read. The surrounding scheduler treats it as an output of the step.

use std::path::{Path, PathBuf};

/// File name of the depfile inside the intermediate directory.
pub const DEPFILE_NAME: &str = "flutter_build.d";

/// Path of the depfile for an intermediate directory.
pub fn depfile_path(intermediate_dir: &Path) -> PathBuf {
    intermediate_dir.join(DEPFILE_NAME)
}

/// Output files declared to the build scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyFiles {
    files: Vec<PathBuf>,
}

impl DependencyFiles {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> + '_ {
        self.files.iter().map(PathBuf::as_path)
    }
}

impl IntoIterator for DependencyFiles {
    type Item = PathBuf;
    type IntoIter = std::vec::IntoIter<PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

/// Dependency files produced by a build into `intermediate_dir`.
pub fn dependency_files(intermediate_dir: &Path) -> DependencyFiles {
    DependencyFiles {
        files: vec![depfile_path(intermediate_dir)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depfile_location() {
        let files = dependency_files(Path::new("/out"));
        assert_eq!(files.len(), 1);
        assert!(files.contains(Path::new("/out/flutter_build.d")));
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/out/flutter_build.d")]
        );
    }

    #[test]
    fn test_depfile_string_form() {
        let path = depfile_path(Path::new("/proj/build"));
        assert_eq!(path.to_string_lossy(), "/proj/build/flutter_build.d");
    }
}
