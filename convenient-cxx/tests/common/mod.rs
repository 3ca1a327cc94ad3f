//! Scripted toolchain and scratch project helpers shared by the integration tests

#![allow(dead_code)]

use convenient_cxx::{
    BuildContext, BuildError, Project, Result, StemCorrespondence, Toolchain, ToolchainConfig, object_path,
};
use filetime::FileTime;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// One recorded toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Scan {
        source: PathBuf,
        flags: Vec<String>,
    },
    Compile {
        source: PathBuf,
        object: PathBuf,
        flags: Vec<String>,
    },
    Link {
        objects: Vec<PathBuf>,
        executable: PathBuf,
        flags: Vec<String>,
    },
}

/// In-memory toolchain: dependency listings come from a script, compile and
/// link write placeholder artifacts under the project root.
pub struct FakeToolchain {
    root: PathBuf,
    listings: BTreeMap<PathBuf, Vec<PathBuf>>,
    failing_scans: BTreeSet<PathBuf>,
    failing_compiles: BTreeSet<PathBuf>,
    calls: RefCell<Vec<Call>>,
}

impl FakeToolchain {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            listings: BTreeMap::new(),
            failing_scans: BTreeSet::new(),
            failing_compiles: BTreeSet::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Script the full include closure the preprocessor reports for `source`.
    pub fn includes(mut self, source: &str, headers: &[&str]) -> Self {
        let _ = self
            .listings
            .insert(PathBuf::from(source), headers.iter().map(PathBuf::from).collect());
        self
    }

    pub fn fail_scan(mut self, source: &str) -> Self {
        let _ = self.failing_scans.insert(PathBuf::from(source));
        self
    }

    pub fn fail_compile(mut self, source: &str) -> Self {
        let _ = self.failing_compiles.insert(PathBuf::from(source));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn forget_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn compiled(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Compile { source, .. } => Some(source.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn linked(&self) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Link { executable, .. } => Some(executable.clone()),
                _ => None,
            })
            .collect()
    }

    fn failure(command: String) -> BuildError {
        BuildError::Toolchain {
            command,
            status: "exit code 1".to_string(),
            stderr: "error: expected ';' before '}' token".to_string(),
        }
    }

    fn write(&self, relative: &Path, content: &str) {
        let full = self.root.join(relative);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
    }
}

impl Toolchain for FakeToolchain {
    fn preprocess_report_only(&self, source: &Path, flags: &[String]) -> Result<String> {
        self.calls.borrow_mut().push(Call::Scan {
            source: source.to_path_buf(),
            flags: flags.to_vec(),
        });
        if self.failing_scans.contains(source) {
            return Err(Self::failure(format!("g++ -E -M {}", source.display())));
        }

        let mut listing = format!("{}: {}", object_path(source).display(), source.display());
        for header in self.listings.get(source).into_iter().flatten() {
            listing.push_str(" \\\n  ");
            listing.push_str(&header.display().to_string());
        }
        listing.push('\n');
        Ok(listing)
    }

    fn compile(&self, source: &Path, object: &Path, flags: &[String]) -> Result<()> {
        self.calls.borrow_mut().push(Call::Compile {
            source: source.to_path_buf(),
            object: object.to_path_buf(),
            flags: flags.to_vec(),
        });
        if self.failing_compiles.contains(source) {
            return Err(Self::failure(format!("g++ -c {}", source.display())));
        }
        self.write(object, &format!("object for {}\n", source.display()));
        Ok(())
    }

    fn link(&self, objects: &[PathBuf], executable: &Path, flags: &[String]) -> Result<()> {
        self.calls.borrow_mut().push(Call::Link {
            objects: objects.to_vec(),
            executable: executable.to_path_buf(),
            flags: flags.to_vec(),
        });
        self.write(executable, "executable\n");
        Ok(())
    }
}

/// Write a file under `root`, creating directories as needed.
pub fn write(root: &Path, relative: &str, text: &str) {
    let full = root.join(relative);
    std::fs::create_dir_all(full.parent().unwrap()).unwrap();
    std::fs::write(full, text).unwrap();
}

/// Set the mtime of `relative` to `secs` seconds before now.
pub fn age(root: &Path, relative: &str, secs: u64) {
    set_mtime(&root.join(relative), SystemTime::now() - Duration::from_secs(secs));
}

/// Move every regular file under `root` to the same instant, `secs` seconds ago.
pub fn age_all(root: &Path, secs: u64) {
    let time = SystemTime::now() - Duration::from_secs(secs);
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            set_mtime(entry.path(), time);
        }
    }
}

fn set_mtime(path: &Path, time: SystemTime) {
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).unwrap();
}

/// Discover and analyze `root` with default settings.
pub fn analyze(root: &Path, toolchain: &FakeToolchain) -> BuildContext {
    analyze_with(root, toolchain, &ToolchainConfig::default())
}

pub fn analyze_with(root: &Path, toolchain: &FakeToolchain, config: &ToolchainConfig) -> BuildContext {
    let project = Project::discover(root, config).unwrap();
    BuildContext::analyze(project, config, toolchain, &StemCorrespondence::from_config(config)).unwrap()
}

pub fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
