//! Recursive `\input` / `\include` expansion.
//!
//! Each inclusion site is replaced in place by the resolved content of the
//! target, wrapped in `% Begin included file` / `% End included file`
//! comments. Missing, unreadable and circular includes leave a comment marker
//! and a [`Diagnostic`]; only nesting past the depth limit fails the run.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::encoding::read_text;
use crate::error::{Result, TexkitError};
use crate::report::Diagnostic;

static RE_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(input|include)\s*\{([^}]+)\}").expect("valid include regex")
});

/// Default nesting limit for includes.
pub const DEFAULT_MAX_DEPTH: usize = 50;

const TEX_EXTENSION: &str = ".tex";

/// Expands inclusion commands, tracking visited files across one run.
#[derive(Debug, Clone)]
pub struct InclusionResolver {
    root_dir: PathBuf,
    max_depth: usize,
    visited: HashSet<PathBuf>,
    opened: BTreeSet<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

impl InclusionResolver {
    /// Resolver whose include names are looked up first under `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            visited: HashSet::new(),
            opened: BTreeSet::new(),
            diagnostics: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Read `path` and expand its includes recursively.
    ///
    /// # Errors
    ///
    /// Returns [`TexkitError::RecursionDepthExceeded`] when `depth` exceeds
    /// the limit anywhere below this call.
    pub fn resolve(&mut self, path: &Path, depth: usize) -> Result<String> {
        if depth > self.max_depth {
            return Err(TexkitError::RecursionDepthExceeded {
                path: path.to_path_buf(),
                max_depth: self.max_depth,
            });
        }

        let key = normalize(path);
        if !self.visited.insert(key.clone()) {
            log::warn!("Circular inclusion detected for {}", path.display());
            self.diagnostics.push(Diagnostic::CircularInclusion {
                path: path.to_path_buf(),
            });
            return Ok(format!("% Circular inclusion: {}\n", path.display()));
        }

        if !path.exists() {
            log::warn!("File not found: {}", path.display());
            self.diagnostics.push(Diagnostic::FileNotFound {
                name: path.display().to_string(),
                included_from: None,
            });
            return Ok(format!("% File not found: {}\n", path.display()));
        }

        log::info!("{}Processing: {}", "  ".repeat(depth), path.display());
        let content = match read_text(path) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("{err}");
                self.diagnostics.push(Diagnostic::ReadFailure {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                });
                return Ok(format!("% Error reading file: {}\n", path.display()));
            }
        };
        self.opened.insert(key);

        self.expand(&content, path, depth)
    }

    /// Files read successfully so far
    #[must_use]
    pub const fn opened_files(&self) -> &BTreeSet<PathBuf> {
        &self.opened
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the resolver, returning opened files and diagnostics.
    #[must_use]
    pub fn into_parts(self) -> (BTreeSet<PathBuf>, Vec<Diagnostic>) {
        (self.opened, self.diagnostics)
    }

    fn expand(&mut self, content: &str, current: &Path, depth: usize) -> Result<String> {
        let mut fatal: Option<TexkitError> = None;

        let expanded = RE_INCLUDE.replace_all(content, |cap: &Captures<'_>| {
            if fatal.is_some() {
                return String::new();
            }
            let name = cap[2].trim();
            let Some(target) = self.locate(name, current) else {
                log::warn!("Included file not found: {name}");
                self.diagnostics.push(Diagnostic::FileNotFound {
                    name: name.to_string(),
                    included_from: Some(current.to_path_buf()),
                });
                return format!("% File not found: {name}\n");
            };

            match self.resolve(&target, depth + 1) {
                Ok(included) => {
                    let file_name = target
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    format!(
                        "\n% Begin included file: {file_name}\n{included}\n% End included file: {file_name}\n"
                    )
                }
                Err(err) => {
                    fatal = Some(err);
                    String::new()
                }
            }
        });

        match fatal {
            Some(err) => Err(err),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Root-relative first, then relative to the including file.
    fn locate(&self, name: &str, current: &Path) -> Option<PathBuf> {
        let file = if name.ends_with(TEX_EXTENSION) {
            name.to_string()
        } else {
            format!("{name}{TEX_EXTENSION}")
        };

        let from_root = self.root_dir.join(&file);
        if from_root.exists() {
            return Some(from_root);
        }
        let from_current = current.parent().unwrap_or(Path::new("")).join(&file);
        from_current.exists().then_some(from_current)
    }
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_no_includes_is_identity() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.tex", "Hello \\section{A} world\n");
        let mut resolver = InclusionResolver::new(dir.path());
        assert_eq!(resolver.resolve(&main, 0).unwrap(), "Hello \\section{A} world\n");
        assert_eq!(resolver.opened_files().len(), 1);
    }

    #[test]
    fn test_include_markers() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.tex", "A\n\\input{intro}\nB\n\\include{body.tex}\n");
        write(&dir, "intro.tex", "intro text");
        write(&dir, "body.tex", "body text");

        let mut resolver = InclusionResolver::new(dir.path());
        let out = resolver.resolve(&main, 0).unwrap();
        assert_eq!(
            out,
            "A\n\n% Begin included file: intro.tex\nintro text\n% End included file: intro.tex\n\nB\n\n% Begin included file: body.tex\nbody text\n% End included file: body.tex\n\n"
        );
        assert_eq!(resolver.opened_files().len(), 3);
        assert!(resolver.diagnostics().is_empty());
    }

    #[test]
    fn test_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.tex", "\\input{chapters/one}");
        write(&dir, "chapters/one.tex", "\\input{two}");
        write(&dir, "chapters/two.tex", "deep");

        let mut resolver = InclusionResolver::new(dir.path());
        let out = resolver.resolve(&main, 0).unwrap();
        assert!(out.contains("% Begin included file: two.tex\ndeep\n"));
    }

    #[test]
    fn test_missing_include_marker() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.tex", "\\input{ghost}");
        let (out, diagnostics) = {
            let mut resolver = InclusionResolver::new(dir.path());
            let out = resolver.resolve(&main, 0).unwrap();
            (out, resolver.into_parts().1)
        };
        assert_eq!(out, "% File not found: ghost\n");
        assert!(matches!(
            &diagnostics[0],
            Diagnostic::FileNotFound { name, included_from: Some(_) } if name == "ghost"
        ));
    }

    #[test]
    fn test_circular_inclusion_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.tex", "A\\input{b}");
        write(&dir, "b.tex", "B\\input{a}");

        let mut resolver = InclusionResolver::new(dir.path());
        let out = resolver.resolve(&a, 0).unwrap();
        assert!(out.contains("% Begin included file: b.tex"));
        assert!(out.contains("% Circular inclusion: "));
        assert!(matches!(
            resolver.diagnostics(),
            [Diagnostic::CircularInclusion { .. }]
        ));
    }

    #[test]
    fn test_depth_limit_is_fatal() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "f0.tex", "\\input{f1}");
        for i in 1..=3 {
            write(&dir, &format!("f{i}.tex"), &format!("\\input{{f{}}}", i + 1));
        }
        write(&dir, "f4.tex", "bottom");

        let mut ok = InclusionResolver::new(dir.path()).with_max_depth(4);
        assert!(ok.resolve(&main, 0).unwrap().contains("bottom"));

        let mut too_deep = InclusionResolver::new(dir.path()).with_max_depth(3);
        let err = too_deep.resolve(&main, 0).unwrap_err();
        assert!(matches!(
            err,
            TexkitError::RecursionDepthExceeded { max_depth: 3, .. }
        ));
    }

    #[test]
    fn test_latin1_include() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "main.tex", "\\input{old}");
        fs::write(dir.path().join("old.tex"), [b'S', b'j', 0xF6, b'd', b'i', b'n']).unwrap();

        let mut resolver = InclusionResolver::new(dir.path());
        assert!(resolver.resolve(&main, 0).unwrap().contains("Sjödin"));
    }
}
