//! Build command

use convenient_cxx::{
    BuildContext, ConfigOptions, DependencySummary, GccToolchain, Project, StemCorrespondence, ToolchainConfig,
};
use std::path::Path;
use tracing::{Level, debug};

/// Build every out-of-date entry point under `root`.
pub fn execute(
    root: &Path,
    options: &ConfigOptions,
    clean_after: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ToolchainConfig::load(root, options)?;
    let project = Project::discover(root, &config)?;

    if project.entry_points().next().is_none() {
        println!("No main files found to build.");
    } else {
        build_entry_points(root, &config, &project)?;
    }

    if clean_after {
        let cleaned = convenient_cxx::clean(&project);
        println!("Removed {} object files", cleaned.removed.len());
    }
    Ok(())
}

fn build_entry_points(
    root: &Path,
    config: &ToolchainConfig,
    project: &Project,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let toolchain = GccToolchain::new(root, config);
    let resolver = StemCorrespondence::from_config(config);
    let context = BuildContext::analyze(project.clone(), config, &toolchain, &resolver)?;
    if tracing::enabled!(Level::DEBUG) {
        debug!("Dependency summary:\n{}", DependencySummary::collect(&context)?);
    }

    let report = convenient_cxx::build(&context, &toolchain)?;
    for skipped in &report.skipped {
        println!("Skipped {}", skipped.display());
    }
    if report.is_up_to_date() {
        println!("All targets are up-to-date.");
    } else {
        println!(
            "Compiled {} files, linked {} executables",
            report.compiled.len(),
            report.linked.len()
        );
    }
    Ok(())
}
