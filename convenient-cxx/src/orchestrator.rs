//! Build orchestration
//!
//! Entry points are built one after another in path order. For each one the
//! stale members of its closure are compiled, then the executable is linked
//! if anything it is made of changed. The first toolchain failure stops the
//! run; whatever was produced before it stays on disk.

use crate::context::BuildContext;
use crate::staleness::{Timestamp, executable_is_stale, executable_path, object_is_stale, object_path};
use crate::toolchain::Toolchain;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What one build run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Sources compiled, in compilation order
    pub compiled: Vec<PathBuf>,
    /// Executables linked, in link order
    pub linked: Vec<PathBuf>,
    /// Entry points skipped because their closure was empty
    pub skipped: Vec<PathBuf>,
}

impl BuildReport {
    /// Whether the run compiled and linked nothing.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.compiled.is_empty() && self.linked.is_empty()
    }
}

/// Compile and link every entry point of an analyzed project.
///
/// A source shared by several entry points is compiled at most once per
/// run, and still counts as freshly compiled for each of them.
///
/// # Errors
///
/// Returns the first compile or link failure.
pub fn build(context: &BuildContext, toolchain: &dyn Toolchain) -> Result<BuildReport> {
    let root = context.project().root();
    let mut report = BuildReport::default();
    let mut compiled = BTreeSet::new();

    for entry in context.project().entry_points() {
        let closure = context.closure(&entry.path)?;
        if closure.is_empty() {
            warn!("No implementation files found for {}, skipping", entry.path.display());
            report.skipped.push(entry.path.clone());
            continue;
        }

        let mut recompiled = false;
        let mut newest_object = Timestamp::MISSING;
        let mut objects = Vec::with_capacity(closure.len());

        for member in closure {
            let object = object_path(member);
            let mut object_time = Timestamp::of(&root.join(&object));

            if compiled.contains(member) {
                recompiled = true;
            } else if object_is_stale(object_time, context.timestamps().effective(member)?) {
                info!("Compiling {}", member.display());
                toolchain.compile(member, &object, &context.flags(member)?.compile)?;
                object_time = Timestamp::of(&root.join(&object));
                let _ = compiled.insert(member.clone());
                report.compiled.push(member.clone());
                recompiled = true;
            } else {
                debug!("{} is up to date", object.display());
            }

            newest_object = newest_object.max(object_time);
            objects.push(object);
        }

        let executable = executable_path(&entry.path);
        let executable_time = Timestamp::of(&root.join(&executable));
        if executable_is_stale(executable_time, newest_object, recompiled) {
            if recompiled {
                info!("Linking {}", executable.display());
            } else {
                info!("Relinking {}", executable.display());
            }
            toolchain.link(&objects, &executable, &context.flags(&entry.path)?.link)?;
            report.linked.push(executable);
        } else {
            debug!("{} is up to date", executable.display());
        }
    }

    Ok(report)
}
