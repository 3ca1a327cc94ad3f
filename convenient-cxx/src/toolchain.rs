//! Toolchain abstraction
//!
//! The engine never talks to a compiler directly. It goes through the
//! [`Toolchain`] trait, which has exactly the three capabilities the build
//! needs: report dependencies, compile one file, link objects. The
//! production implementation shells out to a GCC-compatible driver; tests
//! substitute scripted fakes.
//!
//! All paths handed to a toolchain are relative to the project root.

use crate::config::ToolchainConfig;
use crate::{BuildError, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, info, warn};

/// External compiler, linker and preprocessor.
///
/// Flags are opaque tokens; implementations add their own base settings.
pub trait Toolchain {
    /// Run the preprocessor in dependency-report mode and return its listing.
    ///
    /// # Errors
    ///
    /// Fails if the preprocessor is missing or exits unsuccessfully.
    fn preprocess_report_only(&self, source: &Path, flags: &[String]) -> Result<String>;

    /// Compile `source` into `object`.
    ///
    /// # Errors
    ///
    /// Fails if the compiler is missing or exits unsuccessfully.
    fn compile(&self, source: &Path, object: &Path, flags: &[String]) -> Result<()>;

    /// Link `objects` into `executable`.
    ///
    /// # Errors
    ///
    /// Fails if the linker is missing or exits unsuccessfully.
    fn link(&self, objects: &[PathBuf], executable: &Path, flags: &[String]) -> Result<()>;
}

/// GCC-compatible driver (`g++`, `clang++`, ...) run from the project root.
#[derive(Debug, Clone)]
pub struct GccToolchain {
    root: PathBuf,
    compiler: String,
    compile_settings: Vec<String>,
    link_settings: Vec<String>,
    show_header_scanning: bool,
}

impl GccToolchain {
    /// Create a toolchain rooted at `root` using the resolved configuration.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: &ToolchainConfig) -> Self {
        Self {
            root: root.into(),
            compiler: config.compiler.clone(),
            compile_settings: config.compile_settings.clone(),
            link_settings: config.link_settings.clone(),
            show_header_scanning: config.show_header_scanning,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.compiler);
        cmd.current_dir(&self.root);
        cmd
    }

    /// Preprocessor arguments for a dependency scan.
    #[must_use]
    pub fn scan_args(&self, source: &Path, flags: &[String]) -> Vec<String> {
        let mut args = vec!["-E".to_string(), "-M".to_string()];
        args.extend(self.compile_settings.iter().cloned());
        args.extend(flags.iter().cloned());
        args.push(source.display().to_string());
        args
    }

    /// Compiler arguments for one translation unit.
    #[must_use]
    pub fn compile_args(&self, source: &Path, object: &Path, flags: &[String]) -> Vec<String> {
        let mut args = vec!["-c".to_string()];
        args.extend(self.compile_settings.iter().cloned());
        args.extend(flags.iter().cloned());
        args.push(source.display().to_string());
        args.push("-o".to_string());
        args.push(object.display().to_string());
        args
    }

    /// Linker arguments for one executable.
    #[must_use]
    pub fn link_args(&self, objects: &[PathBuf], executable: &Path, flags: &[String]) -> Vec<String> {
        let mut args: Vec<String> = objects.iter().map(|o| o.display().to_string()).collect();
        args.push("-o".to_string());
        args.push(executable.display().to_string());
        args.extend(self.link_settings.iter().cloned());
        args.extend(flags.iter().cloned());
        args
    }

    fn run(&self, args: &[String], echo: bool) -> Result<Output> {
        let rendered = render(&self.compiler, args);
        if echo {
            info!("{}", rendered);
        } else {
            debug!("{}", rendered);
        }

        let mut cmd = self.command();
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                BuildError::ToolchainMissing {
                    program: self.compiler.clone(),
                }
            } else {
                BuildError::Toolchain {
                    command: rendered.clone(),
                    status: format!("could not start: {e}"),
                    stderr: String::new(),
                }
            }
        })?;

        if !output.status.success() {
            return Err(BuildError::Toolchain {
                command: rendered,
                status: output
                    .status
                    .code()
                    .map_or_else(|| "terminated by signal".to_string(), |code| format!("exit code {code}")),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!("{}", stderr.trim_end());
        }
        Ok(output)
    }
}

impl Toolchain for GccToolchain {
    fn preprocess_report_only(&self, source: &Path, flags: &[String]) -> Result<String> {
        let output = self.run(&self.scan_args(source, flags), self.show_header_scanning)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn compile(&self, source: &Path, object: &Path, flags: &[String]) -> Result<()> {
        let _ = self.run(&self.compile_args(source, object, flags), false)?;
        Ok(())
    }

    fn link(&self, objects: &[PathBuf], executable: &Path, flags: &[String]) -> Result<()> {
        let _ = self.run(&self.link_args(objects, executable, flags), false)?;
        Ok(())
    }
}

/// Render a command line for display, quoting arguments that need it.
#[must_use]
pub fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(quote)
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=+:,@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn toolchain() -> GccToolchain {
        let config = ToolchainConfig {
            compile_settings: strings(&["-O2"]),
            link_settings: strings(&["-std=c++17"]),
            ..ToolchainConfig::default()
        };
        GccToolchain::new("/project", &config)
    }

    #[test]
    fn test_scan_args() {
        let args = toolchain().scan_args(Path::new("src/main.cpp"), &strings(&["-DTRACE"]));
        assert_eq!(args, strings(&["-E", "-M", "-O2", "-DTRACE", "src/main.cpp"]));
    }

    #[test]
    fn test_compile_args() {
        let args = toolchain().compile_args(Path::new("a.cpp"), Path::new(".a.o"), &strings(&["-fopenmp"]));
        assert_eq!(args, strings(&["-c", "-O2", "-fopenmp", "a.cpp", "-o", ".a.o"]));
    }

    #[test]
    fn test_link_args() {
        let objects = vec![PathBuf::from(".a.o"), PathBuf::from("lib/.b.o")];
        let args = toolchain().link_args(&objects, Path::new("a"), &strings(&["-lm"]));
        assert_eq!(args, strings(&[".a.o", "lib/.b.o", "-o", "a", "-std=c++17", "-lm"]));
    }

    #[test]
    fn test_render_quotes() {
        assert_eq!(
            render("g++", &strings(&["-DNAME=a b", "-c", "it's.cpp"])),
            r"g++ '-DNAME=a b' -c 'it'\''s.cpp'"
        );
    }

    fn scanning_toolchain(dir: &Path, show_header_scanning: bool) -> GccToolchain {
        let config = ToolchainConfig {
            compiler: "true".to_string(),
            show_header_scanning,
            ..ToolchainConfig::default()
        };
        GccToolchain::new(dir, &config)
    }

    fn scan_lines_at(lines: &[&str], level: &str) -> usize {
        lines
            .iter()
            .filter(|line| line.contains(level) && line.contains("true -E -M"))
            .count()
    }

    #[cfg(unix)]
    #[traced_test]
    #[test]
    fn test_header_scanning_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = scanning_toolchain(dir.path(), true);

        let listing = toolchain.preprocess_report_only(Path::new("main.cpp"), &[]).unwrap();

        assert!(listing.is_empty());
        logs_assert(|lines: &[&str]| match scan_lines_at(lines, "INFO") {
            1 => Ok(()),
            n => Err(format!("expected one echoed scan, found {n}")),
        });
    }

    #[cfg(unix)]
    #[traced_test]
    #[test]
    fn test_header_scanning_is_quiet_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = scanning_toolchain(dir.path(), false);

        let _ = toolchain.preprocess_report_only(Path::new("main.cpp"), &[]).unwrap();

        logs_assert(|lines: &[&str]| match (scan_lines_at(lines, "INFO"), scan_lines_at(lines, "DEBUG")) {
            (0, 1) => Ok(()),
            counts => Err(format!("expected only a debug line, found {counts:?}")),
        });
    }

    #[test]
    fn test_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolchainConfig {
            compiler: "bauzel-no-such-compiler".to_string(),
            ..ToolchainConfig::default()
        };
        let toolchain = GccToolchain::new(dir.path(), &config);
        let result = toolchain.preprocess_report_only(Path::new("main.cpp"), &[]);
        assert!(matches!(
            result,
            Err(BuildError::ToolchainMissing { program }) if program == "bauzel-no-such-compiler"
        ));
    }
}
