//! Compiler and linker flag inference
//!
//! Flags come from two places:
//!
//! 1. **Directives** written in source comments:
//!    - `compile with: ...` applies to the file itself
//!    - `compile related with: ...` also applies to files that include its header directly
//!    - `compile all with: ...` applies to every file whose link closure contains it
//!    - `link with: ...` is collected over the link closure of an entry point
//! 2. **Header signatures**: well-known headers in a file's include closure
//!    imply libraries (`cmath` needs `-lm`, `omp.h` needs `-fopenmp`, ...).
//!
//! Propagation produces one deduplicated, sorted compile and link flag list
//! per implementation file.

use crate::closure::ClosureTable;
use crate::graph::SourceGraph;
use crate::includes::IncludeScan;
use crate::project::Project;
use crate::{BuildError, Result};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// A deduplicated, ordered set of opaque flag tokens.
pub type FlagSet = BTreeSet<String>;

/// How far a comment-declared compile flag travels through the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveScope {
    /// Only the declaring file
    Own,
    /// The declaring file and its direct dependents
    Related,
    /// The declaring file and every file whose closure contains it
    All,
}

static COMPILE_OWN: LazyLock<Regex> = LazyLock::new(|| directive_regex("compile with"));
static COMPILE_RELATED: LazyLock<Regex> = LazyLock::new(|| directive_regex("compile related with"));
static COMPILE_ALL: LazyLock<Regex> = LazyLock::new(|| directive_regex("compile all with"));
static LINK: LazyLock<Regex> = LazyLock::new(|| directive_regex("link with"));

#[allow(clippy::expect_used)]
fn directive_regex(keyword: &str) -> Regex {
    // Optional colon, then whitespace (possibly a line break), then the rest of the line
    Regex::new(&format!(r"{}:?\s*(.*)", regex::escape(keyword))).expect("directive pattern is valid")
}

/// Flags declared in one file's comments, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    compile_own: Vec<String>,
    compile_related: Vec<String>,
    compile_all: Vec<String>,
    link: Vec<String>,
}

impl Directives {
    /// Extract every directive from a file's text.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Directive` if a flag list has unbalanced quotes
    /// or a dangling escape.
    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        Ok(Self {
            compile_own: extract(path, text, &COMPILE_OWN)?,
            compile_related: extract(path, text, &COMPILE_RELATED)?,
            compile_all: extract(path, text, &COMPILE_ALL)?,
            link: extract(path, text, &LINK)?,
        })
    }

    /// Compile flags declared with the given scope.
    #[must_use]
    pub fn compile(&self, scope: DirectiveScope) -> &[String] {
        match scope {
            DirectiveScope::Own => &self.compile_own,
            DirectiveScope::Related => &self.compile_related,
            DirectiveScope::All => &self.compile_all,
        }
    }

    /// Link flags declared with `link with`.
    #[must_use]
    pub fn link(&self) -> &[String] {
        &self.link
    }
}

fn extract(path: &Path, text: &str, pattern: &Regex) -> Result<Vec<String>> {
    let mut flags = Vec::new();
    for captures in pattern.captures_iter(text) {
        let line = captures.get(1).map_or("", |m| m.as_str()).trim_end();
        let line = line.strip_suffix("*/").unwrap_or(line);
        let tokens = split_shell(line).map_err(|message| BuildError::Directive {
            path: path.to_path_buf(),
            message: format!("{message} in `{}`", captures[0].trim_end()),
        })?;
        flags.extend(tokens);
    }
    Ok(flags)
}

/// Split a flag list the way a POSIX shell would.
///
/// Supports single quotes, double quotes with backslash escapes, and
/// backslash escapes outside quotes. No variable expansion.
///
/// # Errors
///
/// Returns a description of the problem for an unterminated quote or a
/// trailing backslash.
pub fn split_shell(line: &str) -> std::result::Result<Vec<String>, String> {
    #[derive(PartialEq)]
    enum State {
        Between,
        Word,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Between | State::Word => match c {
                c if c.is_whitespace() => {
                    if state == State::Word {
                        tokens.push(std::mem::take(&mut current));
                        state = State::Between;
                    }
                }
                '\'' => state = State::Single,
                '"' => state = State::Double,
                '\\' => {
                    let escaped = chars.next().ok_or("no escaped character")?;
                    current.push(escaped);
                    state = State::Word;
                }
                c => {
                    current.push(c);
                    state = State::Word;
                }
            },
            State::Single => match c {
                '\'' => state = State::Word,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Word,
                '\\' => {
                    let escaped = chars.next().ok_or("no escaped character")?;
                    if !matches!(escaped, '"' | '\\' | '$' | '`' | '\n') {
                        current.push('\\');
                    }
                    current.push(escaped);
                }
                c => current.push(c),
            },
        }
    }

    match state {
        State::Single | State::Double => Err("no closing quotation".to_string()),
        State::Word => {
            tokens.push(current);
            Ok(tokens)
        }
        State::Between => Ok(tokens),
    }
}

/// Flags implied by well-known headers in an include closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFlags {
    /// Implied compile flags
    pub compile: FlagSet,
    /// Implied link flags
    pub link: FlagSet,
}

impl HeaderFlags {
    /// Inspect the basenames of every included path.
    #[must_use]
    pub fn detect(includes: &[PathBuf]) -> Self {
        let mut flags = Self::default();
        let mut add_link = |flag: &str| {
            let _ = flags.link.insert(flag.to_string());
        };

        let basenames: BTreeSet<String> = includes
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        let has = |name: &str| basenames.contains(name);

        if has("math.h") || has("cmath") {
            add_link("-lm");
        }
        if has("metis.h") {
            add_link("-lmetis");
        }
        let opencl = includes.iter().any(|path| {
            path.parent()
                .and_then(Path::file_name)
                .is_some_and(|dir| dir == "CL")
        }) || basenames
            .iter()
            .any(|name| name == "cl.h" || name.to_lowercase().contains("opencl"));
        if opencl {
            add_link("-lOpenCL");
        }
        if has("omp.h") {
            add_link("-fopenmp");
        }
        if ["pthread.h", "thread", "future", "mutex", "atomic"]
            .into_iter()
            .any(has)
        {
            add_link("-lpthread");
        }

        if has("omp.h") {
            let _ = flags.compile.insert("-fopenmp".to_string());
        }
        flags
    }
}

/// Final flags for one implementation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFlags {
    /// Sorted compile flags
    pub compile: Vec<String>,
    /// Sorted link flags; only consumed when the file is an entry point
    pub link: Vec<String>,
}

/// Propagated flags for every implementation file.
#[derive(Debug, Clone, Default)]
pub struct FlagTable {
    flags: BTreeMap<PathBuf, FileFlags>,
}

impl FlagTable {
    /// Combine directives and header signatures across the dependency graph.
    ///
    /// For a file `f`:
    /// - compile = own directives, own header flags, related directives of
    ///   `f` and its direct dependencies, all-scope directives and header
    ///   compile flags of every closure member
    /// - link = link directives and header link flags of every closure member
    ///
    /// # Errors
    ///
    /// Returns an error if the graph or closures do not cover a discovered file.
    pub fn propagate(
        project: &Project,
        includes: &IncludeScan,
        graph: &SourceGraph,
        closures: &ClosureTable,
    ) -> Result<Self> {
        let detected: BTreeMap<&Path, HeaderFlags> = project
            .sources()
            .iter()
            .map(|source| {
                let found = HeaderFlags::detect(includes.closure(&source.path));
                (source.path.as_path(), found)
            })
            .collect();

        let mut flags = BTreeMap::new();
        for source in project.sources() {
            let path = source.path.as_path();
            let mut compile = FlagSet::new();
            let mut link = FlagSet::new();

            compile.extend(source.directives.compile(DirectiveScope::Own).iter().cloned());
            compile.extend(detected_for(&detected, path)?.compile.iter().cloned());

            compile.extend(source.directives.compile(DirectiveScope::Related).iter().cloned());
            for dependency in graph.direct_dependencies(path)? {
                let declared = &project.require(&dependency)?.directives;
                compile.extend(declared.compile(DirectiveScope::Related).iter().cloned());
            }

            for member in closures.closure(path)? {
                let declared = &project.require(member)?.directives;
                let implied = detected_for(&detected, member)?;
                compile.extend(declared.compile(DirectiveScope::All).iter().cloned());
                compile.extend(implied.compile.iter().cloned());
                link.extend(declared.link().iter().cloned());
                link.extend(implied.link.iter().cloned());
            }

            debug!(
                "Flags for {}: compile [{}] link [{}]",
                path.display(),
                compile.iter().cloned().collect::<Vec<_>>().join(" "),
                link.iter().cloned().collect::<Vec<_>>().join(" ")
            );
            let _ = flags.insert(
                path.to_path_buf(),
                FileFlags {
                    compile: compile.into_iter().collect(),
                    link: link.into_iter().collect(),
                },
            );
        }

        Ok(Self { flags })
    }

    /// Final flags of a file.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::UnknownFile` if the file was not discovered.
    pub fn get(&self, path: &Path) -> Result<&FileFlags> {
        self.flags
            .get(path)
            .ok_or_else(|| BuildError::UnknownFile(path.to_path_buf()))
    }
}

fn detected_for<'a>(detected: &'a BTreeMap<&Path, HeaderFlags>, path: &Path) -> Result<&'a HeaderFlags> {
    detected
        .get(path)
        .ok_or_else(|| BuildError::UnknownFile(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Directives {
        Directives::parse(Path::new("test.cpp"), text).unwrap()
    }

    #[test]
    fn test_split_shell() {
        assert_eq!(split_shell("-O2  -g").unwrap(), vec!["-O2", "-g"]);
        assert_eq!(split_shell("").unwrap(), Vec::<String>::new());
        assert_eq!(
            split_shell(r#"-DNAME="a b" '-DRAW=$x' -I\ spaced"#).unwrap(),
            vec!["-DNAME=a b", "-DRAW=$x", "-I spaced"]
        );
        assert_eq!(split_shell(r#""\"q\" \n""#).unwrap(), vec![r#""q" \n"#]);
        assert_eq!(split_shell("''").unwrap(), vec![""]);
        assert!(split_shell("-DX='open").is_err());
        assert!(split_shell("trailing\\").is_err());
    }

    #[test]
    fn test_directive_kinds() {
        let directives = parse(
            "// compile with: -O0 -g\n\
             // compile related with -DRELATED\n\
             // compile all with: -DALL\n\
             // link with: -lz -lcrypto\n\
             int main() {}\n",
        );
        assert_eq!(directives.compile(DirectiveScope::Own), ["-O0", "-g"]);
        assert_eq!(directives.compile(DirectiveScope::Related), ["-DRELATED"]);
        assert_eq!(directives.compile(DirectiveScope::All), ["-DALL"]);
        assert_eq!(directives.link(), ["-lz", "-lcrypto"]);
    }

    #[test]
    fn test_directives_accumulate() {
        let directives = parse("// link with: -lm\n/* link with: -lrt */\n// link with:\n");
        assert_eq!(directives.link(), ["-lm", "-lrt"]);
    }

    #[test]
    fn test_no_directives() {
        let directives = parse("#include <vector>\nint f();\n");
        assert_eq!(directives, Directives::default());
    }

    #[test]
    fn test_bad_directive() {
        let result = Directives::parse(Path::new("bad.cpp"), "// compile with: -DX=\"oops\n");
        assert!(matches!(result, Err(BuildError::Directive { path, .. }) if path == Path::new("bad.cpp")));
    }

    fn detect(paths: &[&str]) -> HeaderFlags {
        let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
        HeaderFlags::detect(&paths)
    }

    fn set(flags: &[&str]) -> FlagSet {
        flags.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_header_signatures() {
        assert_eq!(detect(&["/usr/include/c++/12/cmath"]).link, set(&["-lm"]));
        assert_eq!(detect(&["/usr/include/math.h"]).link, set(&["-lm"]));
        assert_eq!(detect(&["/usr/include/metis.h"]).link, set(&["-lmetis"]));
        assert_eq!(detect(&["/usr/include/CL/cl2.hpp"]).link, set(&["-lOpenCL"]));
        assert_eq!(detect(&["/opt/include/cl.h"]).link, set(&["-lOpenCL"]));
        assert_eq!(detect(&["/opt/include/MyOpenCL.hpp"]).link, set(&["-lOpenCL"]));
        assert_eq!(
            detect(&["/usr/include/c++/12/thread", "/usr/include/c++/12/atomic"]).link,
            set(&["-lpthread"])
        );
        assert!(detect(&["/usr/include/c++/12/vector", "util.h"]).link.is_empty());
    }

    #[test]
    fn test_openmp_sets_both() {
        let flags = detect(&["/usr/lib/gcc/x86_64-linux-gnu/12/include/omp.h"]);
        assert_eq!(flags.compile, set(&["-fopenmp"]));
        assert_eq!(flags.link, set(&["-fopenmp"]));
    }
}
