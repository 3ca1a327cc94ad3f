//! Removal of generated object files

use crate::project::Project;
use crate::staleness::object_path;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error};

/// Outcome of a clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    /// Object files that were deleted
    pub removed: Vec<PathBuf>,
    /// Object files that existed but could not be deleted
    pub failed: Vec<PathBuf>,
}

/// Delete the object file of every discovered source.
///
/// Executables are left alone. A file that cannot be removed is reported
/// and skipped.
#[must_use]
pub fn clean(project: &Project) -> CleanReport {
    let mut report = CleanReport::default();

    for source in project.sources() {
        let object = object_path(&source.path);
        let full = project.root().join(&object);
        if !full.is_file() {
            continue;
        }
        match std::fs::remove_file(&full) {
            Ok(()) => {
                debug!("Removed {}", object.display());
                report.removed.push(object);
            }
            Err(e) => {
                error!("Failed to remove {}: {}", full.display(), e);
                report.failed.push(object);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::SourceFile;
    use std::path::Path;

    #[test]
    fn test_clean_removes_objects_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("lib")).unwrap();
        std::fs::write(root.join(".main.o"), "obj").unwrap();
        std::fs::write(root.join("main"), "exe").unwrap();

        let project = Project::from_parts(
            root,
            vec![
                SourceFile::new("main.cpp", "int main() {}").unwrap(),
                SourceFile::new("lib/never_built.cpp", "").unwrap(),
            ],
            Vec::new(),
        );

        let report = clean(&project);
        assert_eq!(report.removed, vec![PathBuf::from(".main.o")]);
        assert!(report.failed.is_empty());
        assert!(!root.join(".main.o").exists());
        assert!(root.join("main").exists());
        assert!(!Path::new(&root.join("lib/.never_built.o")).exists());
    }
}
