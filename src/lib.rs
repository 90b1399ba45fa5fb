#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,  // line numbers as u32 — we target 64-bit
    clippy::module_name_repetitions,   // Rust naming conventions
    clippy::missing_errors_doc,        // error variants document themselves
    clippy::missing_panics_doc,        // same
    clippy::must_use_candidate,        // accessors on small result types
)]

//! enclose — show where a line, name or pattern sits in the code.
//!
//! For every match, the output is the matched line plus each enclosing
//! `if`/`elif`/`else`, `try`/`except`/`finally`, `def` and `class` header on
//! the path down to it. Sibling branches that don't contain the match stay
//! hidden.

pub mod error;
pub(crate) mod files;
pub mod format;
pub mod matcher;
pub mod parse;
pub mod session;
pub mod syntax;
pub mod types;
pub mod walk;

use std::path::PathBuf;

pub use error::ContextError;
pub use files::DEFAULT_IGNORE;
pub use session::{Config, Report, Session};
pub use types::{Lang, SearchMode};

/// The single public entry point: build a session from `config` and search
/// `paths` for `criterion`.
pub fn run(criterion: &str, paths: &[PathBuf], config: &Config) -> Result<Report, ContextError> {
    Session::new(config.clone())?.resolve(criterion, paths)
}
