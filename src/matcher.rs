//! Predicates over a single syntax node.
//!
//! A matcher answers "is this node of interest?" with the node's own line,
//! or `None`. Nodes without a line never match.

use std::ops::RangeInclusive;

use grep_matcher::Matcher as _;

use crate::error::ContextError;
use crate::syntax::{LineNumber, Literal, SyntaxNode, Value};

pub trait NodeMatcher {
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber>;
}

impl<F> NodeMatcher for F
where
    F: Fn(&SyntaxNode) -> Option<LineNumber>,
{
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber> {
        self(node)
    }
}

/// Matches when any slot of the node equals the literal, type included.
#[derive(Debug, Clone)]
pub struct ValueMatcher {
    look_for: Literal,
}

impl ValueMatcher {
    pub fn new(look_for: impl Into<Literal>) -> Self {
        ValueMatcher {
            look_for: look_for.into(),
        }
    }
}

impl NodeMatcher for ValueMatcher {
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber> {
        let line = node.line?;
        node.slots()
            .any(|(_, value)| self.look_for == value)
            .then_some(line)
    }
}

/// Matches nodes that start on one of a set of lines.
#[derive(Debug, Clone)]
pub struct LineMatcher {
    ranges: Vec<RangeInclusive<LineNumber>>,
}

impl LineMatcher {
    pub fn new(lines: impl IntoIterator<Item = LineNumber>) -> Self {
        LineMatcher {
            ranges: lines.into_iter().map(|line| line..=line).collect(),
        }
    }

    /// Parse `"12"`, `"4,9"` or `"20-24"` (and mixes of these).
    pub fn parse(criterion: &str) -> Result<Self, ContextError> {
        let invalid = |reason: String| ContextError::InvalidCriterion {
            criterion: criterion.to_string(),
            reason,
        };
        let number = |s: &str| -> Result<LineNumber, ContextError> {
            match s.trim().parse::<LineNumber>() {
                Ok(0) => Err(invalid("line numbers start at 1".into())),
                Ok(n) => Ok(n),
                Err(_) => Err(invalid(format!("\"{}\" is not a line number", s.trim()))),
            }
        };

        let mut ranges = Vec::new();
        for part in criterion.split(',') {
            if part.trim().is_empty() {
                return Err(invalid("empty line number".into()));
            }
            let range = match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (number(start)?, number(end)?);
                    if start > end {
                        return Err(invalid(format!("range {start}-{end} is reversed")));
                    }
                    start..=end
                }
                None => {
                    let line = number(part)?;
                    line..=line
                }
            };
            ranges.push(range);
        }
        Ok(LineMatcher { ranges })
    }

    fn contains(&self, line: LineNumber) -> bool {
        self.ranges.iter().any(|range| range.contains(&line))
    }
}

impl From<LineNumber> for LineMatcher {
    fn from(line: LineNumber) -> Self {
        LineMatcher::new([line])
    }
}

impl NodeMatcher for LineMatcher {
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber> {
        node.line.filter(|&line| self.contains(line))
    }
}

/// Matches when any text slot contains a match for the pattern. Numeric and
/// boolean slots are skipped.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: grep_regex::RegexMatcher,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> Result<Self, ContextError> {
        let regex =
            grep_regex::RegexMatcher::new(pattern).map_err(|e| ContextError::InvalidCriterion {
                criterion: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(RegexMatcher { regex })
    }

    fn is_match(&self, text: &str) -> bool {
        matches!(self.regex.is_match(text.as_bytes()), Ok(true))
    }
}

impl NodeMatcher for RegexMatcher {
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber> {
        let line = node.line?;
        node.slots()
            .any(|(_, value)| matches!(value, Value::Text(text) if self.is_match(text)))
            .then_some(line)
    }
}

/// One of the three matcher variants, chosen by search mode.
#[derive(Debug, Clone)]
pub enum Matcher {
    Value(ValueMatcher),
    Line(LineMatcher),
    Regex(RegexMatcher),
}

impl NodeMatcher for Matcher {
    fn match_node(&self, node: &SyntaxNode) -> Option<LineNumber> {
        match self {
            Matcher::Value(m) => m.match_node(node),
            Matcher::Line(m) => m.match_node(node),
            Matcher::Regex(m) => m.match_node(node),
        }
    }
}
