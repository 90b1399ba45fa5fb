use std::fmt::Write;

use crate::syntax::LineNumber;
use crate::walk::ContextResult;

// Some ANSI color codes for terminal output
const BLUE: &str = "\x1b[34m";
const GREEN: &str = "\x1b[32m";
const END_COLOR: &str = "\x1b[0m";

/// A file's source lines, addressed by 1-based line number.
#[derive(Debug, Clone, Default)]
pub struct SourceView {
    lines: Vec<String>,
}

impl SourceView {
    #[must_use]
    pub fn new(content: &str) -> Self {
        SourceView {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// 1-indexed; `None` for line 0 and anything past the end.
    #[must_use]
    pub fn line(&self, line: LineNumber) -> Option<&str> {
        let index = (line as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    /// Width of the widest line number: the file's line count, or `last` if
    /// that is somehow larger.
    fn number_width(&self, last: LineNumber) -> usize {
        let widest = self.line_count().max(last as usize).max(1);
        (widest.ilog10() + 1) as usize
    }

    /// `"<n>:  <text>"` with `n` right-aligned to the file's line count.
    #[must_use]
    pub fn format_line(&self, line: LineNumber) -> String {
        let width = self.number_width(line);
        format!("{line:>width$}:  {}", self.line(line).unwrap_or(""))
    }

    /// Every context line on its own line. With `color`, numbers are blue and
    /// lines the matcher fired on are green.
    #[must_use]
    pub fn render(&self, context: &ContextResult, color: bool) -> String {
        let width = self.number_width(context.last().unwrap_or(0));
        let mut out = String::new();
        for line in context.lines() {
            let text = self.line(line).unwrap_or("");
            if !color {
                let _ = writeln!(out, "{line:>width$}:  {text}");
            } else if context.is_hit(line) {
                let _ = writeln!(out, "{BLUE}{line:>width$}:{END_COLOR}  {GREEN}{text}{END_COLOR}");
            } else {
                let _ = writeln!(out, "{BLUE}{line:>width$}:{END_COLOR}  {text}");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::LineMatcher;
    use crate::parse::parse_source;
    use crate::types::Lang;
    use crate::walk::walk;
    use std::path::Path;

    const SOURCE: &str = "\
if a is not None:
    b = a*2
    print(b)
else:
    b = 42
    print(b)
";

    fn context_for(src: &str, line: u32) -> ContextResult {
        let tree = parse_source(src, Lang::Python, Path::new("t.py")).unwrap();
        walk(&tree, &LineMatcher::from(line))
    }

    /// Reads back the numbers from rendered output.
    fn parse_rendered(rendered: &str) -> Vec<u32> {
        rendered
            .lines()
            .map(|l| l.split_once(':').unwrap().0.trim().parse().unwrap())
            .collect()
    }

    #[test]
    fn line_is_one_indexed() {
        let view = SourceView::new(SOURCE);
        assert_eq!(view.line(1), Some("if a is not None:"));
        assert_eq!(view.line(6), Some("    print(b)"));
        assert_eq!(view.line(0), None);
        assert_eq!(view.line(7), None);
    }

    #[test]
    fn format_line_right_aligns_to_line_count() {
        let long: String = (1..=120).map(|i| format!("x{i} = {i}\n")).collect();
        let view = SourceView::new(&long);
        assert_eq!(view.format_line(7), "  7:  x7 = 7");
        assert_eq!(view.format_line(120), "120:  x120 = 120");
        // Past the end renders empty text rather than panicking.
        assert_eq!(view.format_line(500), "500:  ");
    }

    #[test]
    fn renders_else_branch_context() {
        let view = SourceView::new(SOURCE);
        let rendered = view.render(&context_for(SOURCE, 6), false);
        assert_eq!(rendered, "1:  if a is not None:\n4:  else:\n6:      print(b)\n");
    }

    #[test]
    fn rendered_numbers_round_trip() {
        let long: String = (1..=30)
            .map(|i| {
                if i % 5 == 1 {
                    format!("if v{i}:\n")
                } else {
                    format!("    v{i} = {i}\n")
                }
            })
            .collect();
        // Headers on 1, 6, 11, ...; line 13 sits in the block opened on 11.
        let context = context_for(&long, 13);
        let rendered = SourceView::new(&long).render(&context, false);
        assert_eq!(parse_rendered(&rendered), context.to_vec());
    }

    #[test]
    fn color_marks_hits_only() {
        let view = SourceView::new(SOURCE);
        let rendered = view.render(&context_for(SOURCE, 6), true);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(BLUE));
        assert!(!lines[0].contains(GREEN), "header is not a hit: {}", lines[0]);
        assert!(lines[2].contains(&format!("{GREEN}    print(b){END_COLOR}")));
    }
}
