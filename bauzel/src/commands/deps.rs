//! Dependency summary command

use super::Format;
use convenient_cxx::{
    BuildContext, ConfigOptions, DependencySummary, GccToolchain, Project, StemCorrespondence, ToolchainConfig,
};
use std::path::Path;

/// Analyze `root` and print what was inferred, without building.
pub fn execute(
    root: &Path,
    options: &ConfigOptions,
    format: Format,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ToolchainConfig::load(root, options)?;
    let project = Project::discover(root, &config)?;
    let toolchain = GccToolchain::new(root, &config);
    let resolver = StemCorrespondence::from_config(&config);
    let context = BuildContext::analyze(project, &config, &toolchain, &resolver)?;

    let summary = DependencySummary::collect(&context)?;
    match format {
        Format::Text => print!("{summary}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}
