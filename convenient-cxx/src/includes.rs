//! Include extraction
//!
//! Asks the preprocessor for each translation unit's complete header set
//! (`-E -M`), which already includes headers pulled in transitively. Every
//! run rescans every file; nothing is cached between runs.

use crate::config::ToolchainConfig;
use crate::flags::DirectiveScope;
use crate::project::{Project, normalize};
use crate::toolchain::Toolchain;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parse a make-style dependency listing.
///
/// ```text
/// .main.o: main.cpp util.h \
///   /usr/include/c++/12/cmath
/// ```
///
/// Line continuations, the target token and tokens with a source extension
/// are dropped. The remaining paths are normalized, deduplicated and sorted.
#[must_use]
pub fn parse_dependency_listing(listing: &str, config: &ToolchainConfig) -> Vec<PathBuf> {
    listing
        .split_whitespace()
        .filter(|token| *token != "\\" && !token.ends_with(':'))
        .map(|token| normalize(Path::new(token)))
        .filter(|path| !config.is_source(path))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Full include closure of every implementation file.
#[derive(Debug, Clone, Default)]
pub struct IncludeScan {
    closures: BTreeMap<PathBuf, Vec<PathBuf>>,
}

impl IncludeScan {
    /// Scan every source in the project, one preprocessor run per file.
    ///
    /// Each scan uses the file's own `compile with` flags.
    ///
    /// # Errors
    ///
    /// The first failing scan aborts the whole stage.
    pub fn scan(project: &Project, toolchain: &dyn Toolchain, config: &ToolchainConfig) -> Result<Self> {
        info!("Scanning dependencies...");
        let total = project.sources().len();
        let mut closures = BTreeMap::new();

        for (position, source) in project.sources().iter().enumerate() {
            debug!("Scanning dependencies... {}/{} {}", position + 1, total, source.path.display());
            let listing =
                toolchain.preprocess_report_only(&source.path, source.directives.compile(DirectiveScope::Own))?;
            let _ = closures.insert(source.path.clone(), parse_dependency_listing(&listing, config));
        }

        Ok(Self { closures })
    }

    /// Build a scan from precomputed closures.
    #[must_use]
    pub fn from_closures(closures: BTreeMap<PathBuf, Vec<PathBuf>>) -> Self {
        Self { closures }
    }

    /// Every path `source` includes, project and system alike.
    ///
    /// Unscanned files have an empty closure.
    #[must_use]
    pub fn closure(&self, source: &Path) -> &[PathBuf] {
        self.closures.get(source).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::SourceFile;
    use std::cell::RefCell;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_parse_listing() {
        let listing = "src/.main.o: src/main.cpp src/util.h \\\n \
                       ./src/../include/config.hpp /usr/include/c++/12/cmath \\\n \
                       src/util.h\n";
        assert_eq!(
            parse_dependency_listing(listing, &ToolchainConfig::default()),
            paths(&["/usr/include/c++/12/cmath", "include/config.hpp", "src/util.h"])
        );
    }

    #[test]
    fn test_parse_listing_without_headers() {
        let listing = "main.o: main.cpp\n";
        assert!(parse_dependency_listing(listing, &ToolchainConfig::default()).is_empty());
    }

    struct RecordingToolchain {
        scans: RefCell<Vec<(PathBuf, Vec<String>)>>,
    }

    impl Toolchain for RecordingToolchain {
        fn preprocess_report_only(&self, source: &Path, flags: &[String]) -> Result<String> {
            self.scans.borrow_mut().push((source.to_path_buf(), flags.to_vec()));
            Ok(format!("x.o: {} shared.h\n", source.display()))
        }

        fn compile(&self, _source: &Path, _object: &Path, _flags: &[String]) -> Result<()> {
            unreachable!("scanning never compiles")
        }

        fn link(&self, _objects: &[PathBuf], _executable: &Path, _flags: &[String]) -> Result<()> {
            unreachable!("scanning never links")
        }
    }

    #[test]
    fn test_scan_uses_own_flags() {
        let project = Project::from_parts(
            "/project",
            vec![
                SourceFile::new("b.cpp", "// compile with: -DB\n// compile all with: -DALL\n").unwrap(),
                SourceFile::new("a.cpp", "int main() {}").unwrap(),
            ],
            paths(&["shared.h"]),
        );
        let toolchain = RecordingToolchain {
            scans: RefCell::new(Vec::new()),
        };

        let scan = IncludeScan::scan(&project, &toolchain, &ToolchainConfig::default()).unwrap();

        assert_eq!(
            toolchain.scans.into_inner(),
            vec![
                (PathBuf::from("a.cpp"), Vec::new()),
                (PathBuf::from("b.cpp"), vec!["-DB".to_string()]),
            ]
        );
        assert_eq!(scan.closure(Path::new("a.cpp")), paths(&["shared.h"]));
        assert!(scan.closure(Path::new("unknown.cpp")).is_empty());
    }
}
