//! Candidate files: ignore patterns and recursive directory expansion.

use std::collections::HashSet;
use std::env;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::error::ContextError;

/// Version control and bytecode caches are never searched.
pub const DEFAULT_IGNORE: &[&str] = &[".git", ".hg", ".svn", "__pycache__"];

/// Compiled ignore patterns. A pattern can be a glob, a file or directory
/// name, or a path. Relative patterns also apply from the current directory,
/// so `tests/*.py` catches `./tests/a.py` and `/abs/cwd/tests/a.py` alike.
#[derive(Debug, Clone)]
pub(crate) struct IgnoreSet {
    globs: GlobSet,
    /// Every pattern as an absolute glob, matched against canonical paths.
    anchored: GlobSet,
    literal: HashSet<PathBuf>,
}

impl IgnoreSet {
    pub(crate) fn new(patterns: &[String]) -> Result<Self, ContextError> {
        Self::relative_to(patterns, env::current_dir().ok().as_deref())
    }

    /// Like [`IgnoreSet::new`], anchoring relative patterns at `base`.
    pub(crate) fn relative_to(
        patterns: &[String],
        base: Option<&Path>,
    ) -> Result<Self, ContextError> {
        let invalid = |pattern: &str, e: globset::Error| ContextError::InvalidIgnore {
            pattern: pattern.to_string(),
            reason: e.kind().to_string(),
        };

        let mut builder = GlobSetBuilder::new();
        let mut anchored = GlobSetBuilder::new();
        let mut literal = HashSet::new();
        for pattern in patterns {
            builder.add(Glob::new(pattern).map_err(|e| invalid(pattern, e))?);
            let pattern_path = Path::new(pattern);
            if pattern_path.is_absolute() {
                anchored.add(Glob::new(pattern).map_err(|e| invalid(pattern, e))?);
            } else if let Some(base) = base {
                let absolute = format!(
                    "{}/{}",
                    globset::escape(base.to_string_lossy().trim_end_matches('/')),
                    strip_dot(pattern_path).display()
                );
                anchored.add(Glob::new(&absolute).map_err(|e| invalid(pattern, e))?);
            }
            let resolved = match base {
                Some(base) => base.join(pattern_path),
                None => pattern_path.to_path_buf(),
            };
            if let Ok(canonical) = resolved.canonicalize() {
                literal.insert(canonical);
            }
        }
        let joined = || patterns.join(",");
        let globs = builder.build().map_err(|e| invalid(&joined(), e))?;
        let anchored = anchored.build().map_err(|e| invalid(&joined(), e))?;
        Ok(IgnoreSet {
            globs,
            anchored,
            literal,
        })
    }

    pub(crate) fn is_ignored(&self, path: &Path) -> bool {
        let path = strip_dot(path);
        if self.globs.is_match(path) {
            return true;
        }
        if path
            .file_name()
            .is_some_and(|name| self.globs.is_match(name))
        {
            return true;
        }
        if self.anchored.is_empty() && self.literal.is_empty() {
            return false;
        }
        path.canonicalize().is_ok_and(|canonical| {
            self.anchored.is_match(&canonical) || self.literal.contains(&canonical)
        })
    }
}

/// `./tests/a.py` → `tests/a.py`. A bare `.` stays.
fn strip_dot(path: &Path) -> &Path {
    match path.strip_prefix(".") {
        Ok(rest) if !rest.as_os_str().is_empty() => rest,
        _ => path,
    }
}

/// Every file under `root`, sorted by name, with ignored directories pruned.
/// Does NOT respect .gitignore: only the ignore set decides what is skipped.
/// Entries that can't be read come back as `Err((path, error))`.
pub(crate) fn walk_files(
    root: &Path,
    ignore: &IgnoreSet,
) -> impl Iterator<Item = Result<PathBuf, (PathBuf, ContextError)>> {
    let filter = ignore.clone();
    let root = root.to_path_buf();
    WalkBuilder::new(&root)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| !filter.is_ignored(entry.path()))
        .build()
        .filter_map(move |entry| match entry {
            Ok(entry) => entry
                .file_type()
                .is_some_and(|ft| ft.is_file())
                .then(|| Ok(entry.into_path())),
            Err(err) => Some(Err(walk_error(&root, err))),
        })
}

fn walk_error(root: &Path, err: ignore::Error) -> (PathBuf, ContextError) {
    let path = error_path(&err).unwrap_or(root).to_path_buf();
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    let error = ContextError::Io {
        path: path.clone(),
        source,
    };
    (path, error)
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn defaults() -> Vec<String> {
        DEFAULT_IGNORE.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn default_set_matches_vcs_and_cache_dirs() {
        let set = IgnoreSet::new(&defaults()).unwrap();
        assert!(set.is_ignored(Path::new("proj/.git")));
        assert!(set.is_ignored(Path::new("proj/pkg/__pycache__")));
        assert!(!set.is_ignored(Path::new("proj/pkg/mod.py")));
    }

    #[test]
    fn globs_match_path_or_file_name() {
        let set = IgnoreSet::new(&["*_test.py".into(), "build/*".into()]).unwrap();
        assert!(set.is_ignored(Path::new("src/parser_test.py")));
        assert!(set.is_ignored(Path::new("build/out.py")));
        assert!(!set.is_ignored(Path::new("src/parser.py")));
    }

    #[test]
    fn leading_dot_slash_is_ignored_when_matching() {
        let set = IgnoreSet::relative_to(&["tests/*.py".into()], None).unwrap();
        assert!(set.is_ignored(Path::new("./tests/a.py")));
        assert!(set.is_ignored(Path::new("tests/a.py")));
        assert!(!set.is_ignored(Path::new("./keep.py")));
        assert!(!set.is_ignored(Path::new(".")));
    }

    #[test]
    fn relative_glob_is_anchored_at_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        fs::create_dir_all(base.join("tests")).unwrap();
        fs::write(base.join("tests/a.py"), "").unwrap();
        fs::write(base.join("keep.py"), "").unwrap();

        let set = IgnoreSet::relative_to(&["tests/*.py".into()], Some(&base)).unwrap();
        let found: Vec<PathBuf> = walk_files(&base, &set).map(Result::unwrap).collect();
        assert_eq!(found, vec![base.join("keep.py")]);

        // Elsewhere, the same relative layout is not ignored.
        let other = tempfile::tempdir().unwrap();
        fs::create_dir_all(other.path().join("tests")).unwrap();
        fs::write(other.path().join("tests/a.py"), "").unwrap();
        assert!(!set.is_ignored(&other.path().join("tests/a.py")));
    }

    #[test]
    fn invalid_glob_is_configuration_error() {
        let err = IgnoreSet::new(&["a[".into()]).unwrap_err();
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn literal_paths_compare_canonically() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("skip.py");
        fs::write(&target, "x = 1\n").unwrap();
        let set = IgnoreSet::new(&[target.display().to_string()]).unwrap();

        let roundabout = dir.path().join(".").join("skip.py");
        assert!(set.is_ignored(&roundabout));
        assert!(!set.is_ignored(&dir.path().join("keep.py")));
    }

    #[test]
    fn walk_prunes_ignored_dirs_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/__pycache__")).unwrap();
        fs::write(dir.path().join("pkg/b.py"), "").unwrap();
        fs::write(dir.path().join("pkg/a.py"), "").unwrap();
        fs::write(dir.path().join("pkg/__pycache__/a.pyc"), "").unwrap();

        let set = IgnoreSet::new(&defaults()).unwrap();
        let found: Vec<PathBuf> = walk_files(dir.path(), &set).map(Result::unwrap).collect();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["pkg/a.py", "pkg/b.py"]);
    }
}
