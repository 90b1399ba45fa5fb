use std::path::Path;

use crate::error::ContextError;

/// A language we have a tree-sitter grammar and a lowering table for.
/// Picked once per file, from the extension or `--lang`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Python,
    JavaScript,
    Go,
    Ruby,
}

impl Lang {
    pub const ALL: [Lang; 4] = [Lang::Python, Lang::JavaScript, Lang::Go, Lang::Ruby];

    /// Detect from the file extension. `None` for anything we have no grammar for.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" | "pyi" => Some(Lang::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Lang::JavaScript),
            "go" => Some(Lang::Go),
            "rb" => Some(Lang::Ruby),
            _ => None,
        }
    }

    /// Resolve a `--lang` argument: a language name or one of its extensions.
    pub fn from_name(name: &str) -> Result<Self, ContextError> {
        let lower = name.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.name() == lower)
            .or_else(|| Self::from_extension(&lower))
            .ok_or_else(|| ContextError::UnsupportedLanguage {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Lang::Python => "python",
            Lang::JavaScript => "javascript",
            Lang::Go => "go",
            Lang::Ruby => "ruby",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the search criterion is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Exact identifier / literal value.
    #[default]
    Value,
    /// One or more line numbers.
    Line,
    Regex,
    /// Top-level function and class definitions; the criterion is ignored.
    Definitions,
}
