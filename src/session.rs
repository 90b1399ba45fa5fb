use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::ContextError;
use crate::files::{self, DEFAULT_IGNORE, IgnoreSet};
use crate::format::SourceView;
use crate::matcher::{LineMatcher, Matcher, RegexMatcher, ValueMatcher};
use crate::parse;
use crate::syntax::{LineNumber, SyntaxNode};
use crate::types::{Lang, SearchMode};
use crate::walk::{self, ContextResult};

/// Everything a run needs besides the criterion and the paths.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: SearchMode,
    /// Expand directory arguments.
    pub recursive: bool,
    /// Globs, names or paths to skip. Starts out as [`DEFAULT_IGNORE`].
    pub ignore: Vec<String>,
    /// Parse every file with this grammar instead of detecting by extension.
    pub lang: Option<Lang>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mode: SearchMode::default(),
            recursive: false,
            ignore: DEFAULT_IGNORE.iter().map(ToString::to_string).collect(),
            lang: None,
        }
    }
}

/// A compiled search: a matcher, or the top-level definitions scan.
#[derive(Debug, Clone)]
pub enum Search {
    Matching(Matcher),
    Definitions,
}

impl Search {
    /// Validate the criterion for `mode`. Fails before any file is read.
    pub fn new(mode: SearchMode, criterion: &str) -> Result<Self, ContextError> {
        let matcher = match mode {
            SearchMode::Value => Matcher::Value(ValueMatcher::new(criterion)),
            SearchMode::Line => Matcher::Line(LineMatcher::parse(criterion)?),
            SearchMode::Regex => Matcher::Regex(RegexMatcher::new(criterion)?),
            SearchMode::Definitions => return Ok(Search::Definitions),
        };
        Ok(Search::Matching(matcher))
    }

    pub fn run(&self, root: &SyntaxNode) -> ContextResult {
        match self {
            Search::Matching(matcher) => walk::walk(root, matcher),
            Search::Definitions => walk::definitions(root),
        }
    }
}

/// Context found in one file.
#[derive(Debug)]
pub struct FileContext {
    pub path: PathBuf,
    pub context: ContextResult,
    pub source: SourceView,
}

/// A file left out because of a per-file error.
#[derive(Debug)]
pub struct Skipped {
    pub path: PathBuf,
    pub error: ContextError,
}

/// The outcome of one run. Files without matches are absent.
#[derive(Debug, Default)]
pub struct Report {
    pub files: Vec<FileContext>,
    pub skipped: Vec<Skipped>,
    /// More than one file was in scope, so output names each file.
    pub show_paths: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: BTreeMap<String, Vec<LineNumber>>,
    skipped: Vec<JsonSkipped<'a>>,
}

#[derive(Serialize)]
struct JsonSkipped<'a> {
    path: String,
    kind: &'a str,
    reason: String,
}

impl Report {
    /// File path → sorted context lines.
    #[must_use]
    pub fn line_map(&self) -> BTreeMap<PathBuf, Vec<LineNumber>> {
        self.files
            .iter()
            .map(|f| (f.path.clone(), f.context.to_vec()))
            .collect()
    }

    /// Numbered source lines for every file, blocks separated by a blank line.
    #[must_use]
    pub fn render(&self, color: bool) -> String {
        let blocks: Vec<String> = self
            .files
            .iter()
            .map(|file| {
                let mut out = String::new();
                if self.show_paths {
                    let _ = writeln!(out, "{}", file.path.display());
                }
                out.push_str(&file.source.render(&file.context, color));
                out
            })
            .collect();
        blocks.join("\n")
    }

    /// `None` when nothing was skipped.
    #[must_use]
    pub fn skipped_summary(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        let mut out = String::from("Skipped these files due to errors:");
        for skip in &self.skipped {
            let _ = write!(
                out,
                "\n{}: {}: {}",
                skip.path.display(),
                skip.error.kind(),
                skip.error.reason()
            );
        }
        Some(out)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let report = JsonReport {
            files: self
                .files
                .iter()
                .map(|f| (f.path.display().to_string(), f.context.to_vec()))
                .collect(),
            skipped: self
                .skipped
                .iter()
                .map(|s| JsonSkipped {
                    path: s.path.display().to_string(),
                    kind: s.error.kind(),
                    reason: s.error.reason(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&report)
    }
}

/// Runs searches over files. Holds only configuration; nothing carries over
/// from one file to the next.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    ignore: IgnoreSet,
}

impl Session {
    /// Compiles the ignore patterns; a bad glob fails here.
    pub fn new(config: Config) -> Result<Self, ContextError> {
        let ignore = IgnoreSet::new(&config.ignore)?;
        Ok(Session { config, ignore })
    }

    /// Search every file in `paths`.
    ///
    /// Per-file failures land in [`Report::skipped`]. The run itself fails
    /// only for a bad criterion, or when the single path given can't be read.
    pub fn resolve(&self, criterion: &str, paths: &[PathBuf]) -> Result<Report, ContextError> {
        let search = Search::new(self.config.mode, criterion)?;

        if let [only] = paths {
            fs::metadata(only).map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ContextError::NotFound { path: only.clone() },
                _ => ContextError::Io {
                    path: only.clone(),
                    source,
                },
            })?;
        }

        let mut report = Report {
            show_paths: self.config.recursive || paths.len() > 1,
            ..Report::default()
        };

        for path in paths {
            if self.ignore.is_ignored(path) {
                debug!(path = %path.display(), "ignored");
                continue;
            }

            if !path.is_dir() {
                self.process_explicit(path, &search, &mut report);
            } else if self.config.recursive {
                for entry in files::walk_files(path, &self.ignore) {
                    match entry {
                        Ok(file) => self.process_discovered(&file, &search, &mut report),
                        Err((path, error)) => {
                            debug!(path = %path.display(), %error, "unreadable entry");
                            report.skipped.push(Skipped { path, error });
                        }
                    }
                }
            } else {
                skip(&mut report, path, ContextError::IsDirectory { path: path.clone() });
            }
        }

        Ok(report)
    }

    /// A file named on the command line: an unknown extension is reported.
    fn process_explicit(&self, path: &Path, search: &Search, report: &mut Report) {
        let source = match parse::read_source(path) {
            Ok(source) => source,
            Err(error) => return skip(report, path, error),
        };
        match self.lang_for(path) {
            Some(lang) => self.process_source(path, &source, lang, search, report),
            None => {
                let name = path.extension().map_or_else(
                    || path.display().to_string(),
                    |ext| ext.to_string_lossy().into_owned(),
                );
                skip(report, path, ContextError::UnsupportedLanguage { name });
            }
        }
    }

    /// A file found by directory expansion: anything without a grammar is
    /// quietly passed over.
    fn process_discovered(&self, path: &Path, search: &Search, report: &mut Report) {
        let Some(lang) = self.lang_for(path) else {
            trace!(path = %path.display(), "no grammar");
            return;
        };
        match parse::read_source(path) {
            Ok(source) => self.process_source(path, &source, lang, search, report),
            Err(error) => skip(report, path, error),
        }
    }

    fn process_source(
        &self,
        path: &Path,
        source: &str,
        lang: Lang,
        search: &Search,
        report: &mut Report,
    ) {
        let tree = match parse::parse_source(source, lang, path) {
            Ok(tree) => tree,
            Err(error) => return skip(report, path, error),
        };

        let context = search.run(&tree);
        debug!(path = %path.display(), %lang, lines = context.len(), "walked");
        if context.is_empty() {
            return;
        }

        report.files.push(FileContext {
            path: path.to_path_buf(),
            context,
            source: SourceView::new(source),
        });
    }

    fn lang_for(&self, path: &Path) -> Option<Lang> {
        self.config.lang.or_else(|| Lang::from_path(path))
    }
}

fn skip(report: &mut Report, path: &Path, error: ContextError) {
    debug!(path = %path.display(), %error, "skipped");
    report.skipped.push(Skipped {
        path: path.to_path_buf(),
        error,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_dispatches_on_mode() {
        assert!(matches!(
            Search::new(SearchMode::Value, "x").unwrap(),
            Search::Matching(Matcher::Value(_))
        ));
        assert!(matches!(
            Search::new(SearchMode::Line, "3,5").unwrap(),
            Search::Matching(Matcher::Line(_))
        ));
        assert!(matches!(
            Search::new(SearchMode::Regex, "^x").unwrap(),
            Search::Matching(Matcher::Regex(_))
        ));
        // The criterion is irrelevant for definitions.
        assert!(matches!(
            Search::new(SearchMode::Definitions, "whatever").unwrap(),
            Search::Definitions
        ));
    }

    #[test]
    fn bad_criterion_fails_before_any_file_is_read() {
        let session = Session::new(Config {
            mode: SearchMode::Line,
            ..Config::default()
        })
        .unwrap();
        let err = session
            .resolve("noninteger", &[PathBuf::from("/does/not/exist.py")])
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidCriterion { .. }), "{err:?}");
    }

    #[test]
    fn bad_ignore_glob_fails_session_construction() {
        let err = Session::new(Config {
            ignore: vec!["{unclosed".into()],
            ..Config::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContextError::InvalidIgnore { .. }));
    }

    #[test]
    fn summary_lists_path_kind_and_message() {
        let report = Report {
            skipped: vec![Skipped {
                path: PathBuf::from("pkg/bad.py"),
                error: ContextError::Syntax {
                    path: PathBuf::from("pkg/bad.py"),
                    line: 3,
                    reason: "missing \":\"".into(),
                },
            }],
            ..Report::default()
        };
        assert_eq!(
            report.skipped_summary().unwrap(),
            "Skipped these files due to errors:\npkg/bad.py: SyntaxError: line 3: missing \":\""
        );
        assert!(Report::default().skipped_summary().is_none());
    }

    #[test]
    fn json_lists_files_and_skips() {
        let report = Report {
            files: vec![FileContext {
                path: PathBuf::from("a.py"),
                context: walk::walk(
                    &parse::parse_source("x = 1\n", Lang::Python, Path::new("a.py")).unwrap(),
                    &ValueMatcher::new("x"),
                ),
                source: SourceView::new("x = 1\n"),
            }],
            ..Report::default()
        };
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["files"]["a.py"], serde_json::json!([1]));
        assert_eq!(json["skipped"], serde_json::json!([]));
    }
}
