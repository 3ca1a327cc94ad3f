//! Toolchain configuration
//!
//! The build works without any configuration file. An optional `bauzel.yml`
//! next to the sources can override the compiler, base settings and
//! extension lists; command-line options override the file. The file's
//! mtime feeds into every effective timestamp, so editing it rebuilds
//! everything.

use crate::staleness::Timestamp;
use crate::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "bauzel.yml";

const DEFAULT_COMPILER: &str = "g++";
const DEFAULT_STD: &str = "-std=c++11";
const DEFAULT_OPTIMIZATION: [&str; 2] = ["-O3", "-DNDEBUG"];
const DEFAULT_WARNINGS: [&str; 4] = ["-Wall", "-Wextra", "-Wpedantic", "-Wdisabled-optimization"];
const DEFAULT_SOURCE_EXTENSIONS: [&str; 3] = ["cpp", "cxx", "cc"];
const DEFAULT_HEADER_EXTENSIONS: [&str; 3] = ["h", "hpp", "hxx"];

/// Contents of `bauzel.yml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Compiler driver used for scanning, compiling and linking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    /// Language standard flag; an empty string disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<String>,
    /// Replaces the default optimization settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_settings: Option<Vec<String>>,
    /// Extra settings passed to every link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_settings: Option<Vec<String>>,
    /// Extensions recognized as implementation files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_extensions: Option<Vec<String>>,
    /// Extensions recognized as headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_extensions: Option<Vec<String>>,
}

impl ConfigFile {
    /// Parse configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Config` if the text is not a valid configuration.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| BuildError::Config(path.to_path_buf(), e.to_string()))
    }
}

/// Switches that come from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Compiler override
    pub compiler: Option<String>,
    /// Standard flag override; an empty string disables it
    pub std: Option<String>,
    /// Replace the warning set with `-w`
    pub ignore_warnings: bool,
    /// Define `NO_GPL`
    pub no_gpl: bool,
    /// Echo every header-scanning command
    pub show_header_scanning: bool,
}

/// Fully resolved toolchain settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolchainConfig {
    /// Compiler driver
    pub compiler: String,
    /// Settings passed to every scan and compile
    pub compile_settings: Vec<String>,
    /// Settings passed to every link
    pub link_settings: Vec<String>,
    /// Implementation file extensions, without the leading dot
    pub source_extensions: Vec<String>,
    /// Header file extensions, without the leading dot
    pub header_extensions: Vec<String>,
    /// Echo header-scanning commands
    pub show_header_scanning: bool,
    /// Newest mtime of anything that configures the build
    pub config_time: Timestamp,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self::resolve(ConfigFile::default(), &ConfigOptions::default())
    }
}

impl ToolchainConfig {
    /// Merge defaults, the configuration file and command-line options.
    ///
    /// The configuration timestamp is left at [`Timestamp::MISSING`].
    #[must_use]
    pub fn resolve(file: ConfigFile, options: &ConfigOptions) -> Self {
        let compiler = options
            .compiler
            .clone()
            .or(file.compiler)
            .unwrap_or_else(|| DEFAULT_COMPILER.to_string());
        let std = options
            .std
            .clone()
            .or(file.std)
            .unwrap_or_else(|| DEFAULT_STD.to_string());

        let mut compile_settings = file
            .compile_settings
            .unwrap_or_else(|| DEFAULT_OPTIMIZATION.iter().map(ToString::to_string).collect());
        if options.ignore_warnings {
            compile_settings.push("-w".to_string());
        } else {
            compile_settings.extend(DEFAULT_WARNINGS.iter().map(ToString::to_string));
        }
        if options.no_gpl {
            compile_settings.push("-DNO_GPL".to_string());
        }

        let mut link_settings = file.link_settings.unwrap_or_default();
        if !std.is_empty() {
            compile_settings.push(std.clone());
            link_settings.push(std);
        }

        Self {
            compiler,
            compile_settings,
            link_settings,
            source_extensions: extensions(file.source_extensions, &DEFAULT_SOURCE_EXTENSIONS),
            header_extensions: extensions(file.header_extensions, &DEFAULT_HEADER_EXTENSIONS),
            show_header_scanning: options.show_header_scanning,
            config_time: Timestamp::MISSING,
        }
    }

    /// Load `bauzel.yml` from `root` if present and resolve it with `options`.
    ///
    /// The configuration timestamp covers both the file and the running
    /// executable, so upgrading the tool also invalidates every output.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path, options: &ConfigOptions) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        let file = if path.is_file() {
            debug!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path).map_err(|e| BuildError::Io(path.clone(), e))?;
            ConfigFile::parse(&path, &content)?
        } else {
            ConfigFile::default()
        };

        let tool_time = std::env::current_exe()
            .map(|exe| Timestamp::of(&exe))
            .unwrap_or(Timestamp::MISSING);

        let mut config = Self::resolve(file, options);
        config.config_time = Timestamp::of(&path).max(tool_time);
        Ok(config)
    }

    /// Whether `path` has one of the implementation file extensions.
    #[must_use]
    pub fn is_source(&self, path: &Path) -> bool {
        has_extension(path, &self.source_extensions)
    }

    /// Whether `path` has one of the header extensions.
    #[must_use]
    pub fn is_header(&self, path: &Path) -> bool {
        has_extension(path, &self.header_extensions)
    }
}

fn extensions(configured: Option<Vec<String>>, defaults: &[&str]) -> Vec<String> {
    configured.map_or_else(
        || defaults.iter().map(ToString::to_string).collect(),
        |list| {
            list.into_iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect()
        },
    )
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|known| known == ext))
}
