//! Human and machine readable view of the analysis

use crate::context::BuildContext;
use crate::Result;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Analysis results for one implementation file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Source path relative to the project root
    pub path: PathBuf,
    /// Builds an executable
    pub entry_point: bool,
    /// Project headers in the include closure
    pub local_headers: Vec<PathBuf>,
    /// Implementation files depended on directly
    pub direct_dependencies: Vec<PathBuf>,
    /// Implementation files that depend on this one directly
    pub direct_dependents: Vec<PathBuf>,
    /// Files needed to link this one
    pub closure: Vec<PathBuf>,
    /// Final compile flags
    pub compile_flags: Vec<String>,
    /// Final link flags, reported for entry points only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_flags: Option<Vec<String>>,
}

/// Analysis results for a whole project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySummary {
    /// One entry per implementation file, sorted by path
    pub files: Vec<FileSummary>,
    /// Groups of mutually dependent files
    pub cycles: Vec<Vec<PathBuf>>,
}

impl DependencySummary {
    /// Collect the summary from an analyzed project.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the context is inconsistent.
    pub fn collect(context: &BuildContext) -> Result<Self> {
        let mut files = Vec::new();
        for source in context.project().sources() {
            let flags = context.flags(&source.path)?;
            files.push(FileSummary {
                path: source.path.clone(),
                entry_point: source.is_entry_point,
                local_headers: context.graph().local_headers(&source.path).to_vec(),
                direct_dependencies: context.graph().direct_dependencies(&source.path)?,
                direct_dependents: context.graph().direct_dependents(&source.path)?,
                closure: context.closure(&source.path)?.to_vec(),
                compile_flags: flags.compile.clone(),
                link_flags: source.is_entry_point.then(|| flags.link.clone()),
            });
        }

        Ok(Self {
            files,
            cycles: context.graph().cycles()?,
        })
    }
}

fn list(f: &mut fmt::Formatter<'_>, label: &str, items: impl IntoIterator<Item = String>) -> fmt::Result {
    let items: Vec<String> = items.into_iter().collect();
    if items.is_empty() {
        writeln!(f, "  {label}: (none)")
    } else {
        writeln!(f, "  {label}: {}", items.join(" "))
    }
}

fn display_paths(paths: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    paths.iter().map(|p| p.display().to_string())
}

impl fmt::Display for DependencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            if file.entry_point {
                writeln!(f, "{} (entry point)", file.path.display())?;
            } else {
                writeln!(f, "{}", file.path.display())?;
            }
            list(f, "headers", display_paths(&file.local_headers))?;
            list(f, "depends on", display_paths(&file.direct_dependencies))?;
            list(f, "used by", display_paths(&file.direct_dependents))?;
            list(f, "closure", display_paths(&file.closure))?;
            list(f, "compile flags", file.compile_flags.iter().cloned())?;
            if let Some(link) = &file.link_flags {
                list(f, "link flags", link.iter().cloned())?;
            }
        }
        for cycle in &self.cycles {
            writeln!(f, "cycle: {}", display_paths(cycle).collect::<Vec<_>>().join(" <-> "))?;
        }
        Ok(())
    }
}
