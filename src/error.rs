use std::path::PathBuf;

/// Every error enclose can produce.
///
/// Per-file variants (`Syntax`, `Io`, `NotFound`, `IsDirectory`, and
/// `UnsupportedLanguage` for a single file) are collected by the session and
/// never abort a run. Configuration variants are raised before any file is
/// touched.
#[derive(Debug)]
pub enum ContextError {
    Syntax {
        path: PathBuf,
        line: u32,
        reason: String,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    NotFound {
        path: PathBuf,
    },
    IsDirectory {
        path: PathBuf,
    },
    UnsupportedLanguage {
        name: String,
    },
    /// The search criterion doesn't fit the selected mode.
    InvalidCriterion {
        criterion: String,
        reason: String,
    },
    InvalidIgnore {
        pattern: String,
        reason: String,
    },
}

impl ContextError {
    /// Short label used in the verbose skipped-files summary.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SyntaxError",
            Self::Io { .. } | Self::NotFound { .. } | Self::IsDirectory { .. } => "IoError",
            Self::UnsupportedLanguage { .. } => "UnsupportedLanguage",
            Self::InvalidCriterion { .. } | Self::InvalidIgnore { .. } => "ConfigurationError",
        }
    }

    /// The message without the path prefix.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::Syntax { line, reason, .. } => format!("line {line}: {reason}"),
            Self::Io { source, .. } => source.to_string(),
            Self::NotFound { .. } => "no such file or directory".into(),
            Self::IsDirectory { .. } => "is a directory (use --recursive)".into(),
            Self::UnsupportedLanguage { name } => format!("language is not supported: {name}"),
            Self::InvalidCriterion { criterion, reason } => {
                format!("invalid search \"{criterion}\": {reason}")
            }
            Self::InvalidIgnore { pattern, reason } => {
                format!("invalid ignore pattern \"{pattern}\": {reason}")
            }
        }
    }

    /// Exit code for a fatal, whole-run failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Syntax { .. }
            | Self::Io { .. }
            | Self::NotFound { .. }
            | Self::IsDirectory { .. } => 2,
            Self::UnsupportedLanguage { .. }
            | Self::InvalidCriterion { .. }
            | Self::InvalidIgnore { .. } => 3,
        }
    }
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax { path, .. }
            | Self::Io { path, .. }
            | Self::NotFound { path }
            | Self::IsDirectory { path } => write!(f, "{}: {}", path.display(), self.reason()),
            _ => f.write_str(&self.reason()),
        }
    }
}

impl std::error::Error for ContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_path_only_for_file_errors() {
        let err = ContextError::Syntax {
            path: PathBuf::from("pkg/mod.py"),
            line: 7,
            reason: "unexpected \")\"".into(),
        };
        assert_eq!(err.to_string(), "pkg/mod.py: line 7: unexpected \")\"");
        assert_eq!(err.kind(), "SyntaxError");

        let err = ContextError::InvalidCriterion {
            criterion: "abc".into(),
            reason: "not a line number".into(),
        };
        assert_eq!(err.to_string(), "invalid search \"abc\": not a line number");
        assert_eq!(err.kind(), "ConfigurationError");
    }

    #[test]
    fn configuration_errors_exit_differently_from_io() {
        let io = ContextError::NotFound {
            path: PathBuf::from("/nope"),
        };
        let usage = ContextError::UnsupportedLanguage {
            name: "cobol".into(),
        };
        assert_eq!(io.exit_code(), 2);
        assert_eq!(usage.exit_code(), 3);
        assert_ne!(io.exit_code(), usage.exit_code());
    }
}
