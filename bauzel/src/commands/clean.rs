//! Clean command

use convenient_cxx::{ConfigOptions, Project, ToolchainConfig};
use std::path::Path;

/// Remove the object file of every source under `root`.
pub fn execute(root: &Path, options: &ConfigOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ToolchainConfig::load(root, options)?;
    let project = Project::discover(root, &config)?;

    let report = convenient_cxx::clean(&project);
    println!("Removed {} object files", report.removed.len());
    if !report.failed.is_empty() {
        println!("Could not remove {} object files", report.failed.len());
    }
    Ok(())
}
