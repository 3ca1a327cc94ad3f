//! Header to implementation file correspondence
//!
//! Dependency edges come from a naming policy: including `util/strings.h`
//! means depending on whichever implementation file implements that header.
//! The policy sits behind [`CorrespondenceResolver`] so the graph builder
//! does not care how the mapping is made.

use crate::config::ToolchainConfig;
use crate::project::Project;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maps a project header to the implementation files that define it.
pub trait CorrespondenceResolver {
    /// Implementation files for `header`, sorted by path.
    ///
    /// An empty result marks an interface-only header.
    fn implementations(&self, header: &Path, project: &Project) -> Vec<PathBuf>;
}

/// Same relative path, different extension: `net/socket.h` maps to
/// `net/socket.cpp`, `net/socket.cxx` or `net/socket.cc`.
///
/// Headers in different directories never collide because the whole
/// relative stem is compared, not just the basename.
#[derive(Debug, Clone)]
pub struct StemCorrespondence {
    source_extensions: Vec<String>,
}

impl StemCorrespondence {
    /// Match against the given implementation file extensions.
    #[must_use]
    pub fn new(source_extensions: Vec<String>) -> Self {
        Self { source_extensions }
    }

    /// Match against the configured implementation file extensions.
    #[must_use]
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(config.source_extensions.clone())
    }
}

impl Default for StemCorrespondence {
    fn default() -> Self {
        Self::from_config(&ToolchainConfig::default())
    }
}

impl CorrespondenceResolver for StemCorrespondence {
    fn implementations(&self, header: &Path, project: &Project) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .source_extensions
            .iter()
            .map(|ext| header.with_extension(ext))
            .filter(|candidate| project.source(candidate).is_some())
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

/// A hand-written header to implementation mapping.
///
/// Headers absent from the map are interface-only. Mapped files that were
/// not discovered are ignored.
#[derive(Debug, Clone, Default)]
pub struct ExplicitCorrespondence {
    mapping: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl ExplicitCorrespondence {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every project header once through `resolver`.
    ///
    /// Headers that match several implementation files keep all of them
    /// and are reported with a warning.
    #[must_use]
    pub fn snapshot(project: &Project, resolver: &dyn CorrespondenceResolver) -> Self {
        let mut mapping = BTreeMap::new();
        let mut interface_only = Vec::new();

        for header in project.headers() {
            let found = resolver.implementations(header, project);
            match found.len() {
                0 => interface_only.push(header.display().to_string()),
                1 => {}
                _ => warn!(
                    "Header {} matches several implementation files, depending on all of them: {}",
                    header.display(),
                    found.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
                ),
            }
            if !found.is_empty() {
                let _ = mapping.insert(header.clone(), found);
            }
        }

        if !interface_only.is_empty() {
            debug!("Interface-only headers: {}", interface_only.join(", "));
        }
        Self { mapping }
    }

    /// Declare that `implementation` implements `header`.
    #[must_use]
    pub fn with(mut self, header: impl Into<PathBuf>, implementation: impl Into<PathBuf>) -> Self {
        self.mapping.entry(header.into()).or_default().push(implementation.into());
        self
    }
}

impl CorrespondenceResolver for ExplicitCorrespondence {
    fn implementations(&self, header: &Path, project: &Project) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .mapping
            .get(header)
            .into_iter()
            .flatten()
            .filter(|candidate| project.source(candidate).is_some())
            .cloned()
            .collect();
        found.sort();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::SourceFile;
    use tracing_test::traced_test;

    fn project(sources: &[&str], headers: &[&str]) -> Project {
        Project::from_parts(
            "/project",
            sources.iter().map(|p| SourceFile::new(*p, "").unwrap()).collect(),
            headers.iter().map(PathBuf::from).collect(),
        )
    }

    #[test]
    fn test_stem_match() {
        let project = project(&["net/socket.cc", "util.cpp"], &["net/socket.h", "util.hpp", "types.h"]);
        let resolver = StemCorrespondence::default();

        assert_eq!(
            resolver.implementations(Path::new("net/socket.h"), &project),
            vec![PathBuf::from("net/socket.cc")]
        );
        assert_eq!(
            resolver.implementations(Path::new("util.hpp"), &project),
            vec![PathBuf::from("util.cpp")]
        );
        assert!(resolver.implementations(Path::new("types.h"), &project).is_empty());
    }

    #[test]
    fn test_same_basename_other_directory() {
        let project = project(&["a/config.cpp"], &["a/config.h", "b/config.h"]);
        let resolver = StemCorrespondence::default();
        assert!(resolver.implementations(Path::new("b/config.h"), &project).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_ambiguous_stem_keeps_all() {
        let project = project(&["codec.cc", "codec.cpp"], &["codec.h", "types.h"]);
        let snapshot = ExplicitCorrespondence::snapshot(&project, &StemCorrespondence::default());

        assert_eq!(
            snapshot.implementations(Path::new("codec.h"), &project),
            vec![PathBuf::from("codec.cc"), PathBuf::from("codec.cpp")]
        );
        assert!(snapshot.implementations(Path::new("types.h"), &project).is_empty());
        assert!(logs_contain("matches several implementation files"));
        assert!(logs_contain("Interface-only headers: types.h"));
    }

    #[test]
    fn test_explicit_mapping() {
        let project = project(&["impl/engine_gl.cpp", "impl/engine_vk.cpp"], &["engine.h"]);
        let resolver = ExplicitCorrespondence::new()
            .with("engine.h", "impl/engine_gl.cpp")
            .with("engine.h", "impl/missing.cpp");

        assert_eq!(
            resolver.implementations(Path::new("engine.h"), &project),
            vec![PathBuf::from("impl/engine_gl.cpp")]
        );
        assert!(resolver.implementations(Path::new("other.h"), &project).is_empty());
    }
}
