//! Source tree discovery
//!
//! Walks the project directory once, skipping hidden entries, and sorts what
//! it finds into implementation files and headers. Every implementation
//! file is read exactly once here; later stages work from that text.

use crate::config::ToolchainConfig;
use crate::flags::Directives;
use crate::{BuildError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

#[allow(clippy::expect_used)]
static ENTRY_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmain\s*\(").expect("entry point pattern is valid"));

#[allow(clippy::expect_used)]
static DO_NOT_BUILD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)//\s+do\s+not\s+build").expect("marker pattern is valid"));

/// An implementation file (translation unit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root
    pub path: PathBuf,
    /// File contents
    pub text: String,
    /// Contains `main(` and no "do not build" marker
    pub is_entry_point: bool,
    /// Flag directives declared in comments
    pub directives: Directives,
}

impl SourceFile {
    /// Classify already-loaded source text.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Directive` if a flag directive is malformed.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Result<Self> {
        let path = path.into();
        let text = text.into();
        let is_entry_point = ENTRY_POINT.is_match(&text) && !DO_NOT_BUILD.is_match(&text);
        let directives = Directives::parse(&path, &text)?;

        Ok(Self {
            path,
            text,
            is_entry_point,
            directives,
        })
    }

    /// Read and classify `relative` under `root`.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Io` if the file cannot be read and
    /// `BuildError::Decode` if it is not UTF-8.
    pub fn read(root: &Path, relative: &Path) -> Result<Self> {
        let full = root.join(relative);
        let bytes = std::fs::read(&full).map_err(|e| BuildError::Io(full.clone(), e))?;
        let text = String::from_utf8(bytes).map_err(|_| BuildError::Decode(full))?;
        Self::new(relative, text)
    }
}

/// Everything discovered in one project tree.
#[derive(Debug, Clone, Default)]
pub struct Project {
    root: PathBuf,
    sources: Vec<SourceFile>,
    headers: Vec<PathBuf>,
    index: HashMap<PathBuf, usize>,
}

impl Project {
    /// Assemble a project from files that are already loaded.
    ///
    /// Sources and headers are sorted by path.
    #[must_use]
    pub fn from_parts(root: impl Into<PathBuf>, mut sources: Vec<SourceFile>, mut headers: Vec<PathBuf>) -> Self {
        sources.sort_by(|a, b| a.path.cmp(&b.path));
        sources.dedup_by(|a, b| a.path == b.path);
        headers.sort();
        headers.dedup();

        let index = sources
            .iter()
            .enumerate()
            .map(|(position, source)| (source.path.clone(), position))
            .collect();

        Self {
            root: root.into(),
            sources,
            headers,
            index,
        }
    }

    /// Walk `root` and collect sources and headers by extension.
    ///
    /// Hidden files and directories (leading `.`) are skipped, which also
    /// keeps the generated `.stem.o` objects out of the listing. Symbolic
    /// links to files are listed; linked directories are not entered.
    ///
    /// # Errors
    ///
    /// Fails if the tree cannot be walked or a source cannot be read.
    pub fn discover(root: &Path, config: &ToolchainConfig) -> Result<Self> {
        info!("Searching for sources in {}", root.display());
        let mut sources = Vec::new();
        let mut headers = Vec::new();

        let walker = WalkDir::new(root).follow_links(false).into_iter();
        for entry in walker.filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
            let entry = entry?;
            if !is_file(&entry) {
                if entry.path_is_symlink() {
                    debug!("Not following link {}", entry.path().display());
                }
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = normalize(relative);

            if config.is_source(&relative) {
                debug!("Found source {}", relative.display());
                sources.push(SourceFile::read(root, &relative)?);
            } else if config.is_header(&relative) {
                debug!("Found header {}", relative.display());
                headers.push(relative);
            }
        }

        let project = Self::from_parts(root, sources, headers);
        info!(
            "Found {} sources, {} headers, {} entry points",
            project.sources.len(),
            project.headers.len(),
            project.entry_points().count()
        );
        Ok(project)
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Implementation files, sorted by path.
    #[must_use]
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Header files, sorted by path.
    #[must_use]
    pub fn headers(&self) -> &[PathBuf] {
        &self.headers
    }

    /// Entry points in discovery order.
    pub fn entry_points(&self) -> impl Iterator<Item = &SourceFile> {
        self.sources.iter().filter(|source| source.is_entry_point)
    }

    /// Look up an implementation file.
    #[must_use]
    pub fn source(&self, path: &Path) -> Option<&SourceFile> {
        self.index.get(path).map(|&position| &self.sources[position])
    }

    /// Look up an implementation file that must exist.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file was not discovered.
    pub fn require(&self, path: &Path) -> Result<&SourceFile> {
        self.source(path)
            .ok_or_else(|| BuildError::UnknownFile(path.to_path_buf()))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

/// Regular files, and links whose target is a regular file.
fn is_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() || (entry.path_is_symlink() && entry.path().is_file())
}

/// Lexically normalize a relative path: drop `.` and fold `dir/..`.
///
/// `..` components that would climb above the start are kept.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    let _ = parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    parts.iter().collect()
}
