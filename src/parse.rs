//! Lowers tree-sitter concrete trees into [`SyntaxNode`]s.
//!
//! Anonymous tokens and comments are dropped. Body containers that start on
//! the first statement of the body (Python `block`, Ruby `then`) are spliced
//! into their parent so only real headers ever carry a line into the
//! ancestor history.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::ContextError;
use crate::syntax::{DefKind, NodeKind, SyntaxNode};
use crate::types::Lang;

/// Deepest tree-sitter nesting lowered before a file is given up on. Lowering
/// and the context walk both recurse once per level.
const MAX_NESTING: usize = 1000;

/// Lowering hit [`MAX_NESTING`] at this line.
struct TooDeep {
    line: u32,
}

/// What lowering does with one tree-sitter node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Skip,
    /// Replace the node with its lowered children.
    Splice,
    Def(DefKind),
    Wrapper,
    Identifier,
    Str,
    Number,
    True,
    False,
    Null,
    Plain,
}

fn role(lang: Lang, kind: &str) -> Role {
    if kind == "comment" {
        return Role::Skip;
    }
    match lang {
        Lang::Python => match kind {
            "block" => Role::Splice,
            "string_start" | "string_content" | "string_end" | "escape_sequence"
            | "escape_interpolation" => Role::Skip,
            "function_definition" => Role::Def(DefKind::Function),
            "class_definition" => Role::Def(DefKind::Class),
            "decorated_definition" => Role::Wrapper,
            "identifier" => Role::Identifier,
            "string" => Role::Str,
            "integer" | "float" => Role::Number,
            "true" => Role::True,
            "false" => Role::False,
            "none" => Role::Null,
            _ => Role::Plain,
        },
        Lang::JavaScript => match kind {
            "string_fragment" | "escape_sequence" | "html_comment" => Role::Skip,
            "function_declaration" | "generator_function_declaration" | "method_definition" => {
                Role::Def(DefKind::Function)
            }
            "class_declaration" => Role::Def(DefKind::Class),
            "export_statement" => Role::Wrapper,
            "identifier"
            | "property_identifier"
            | "shorthand_property_identifier"
            | "shorthand_property_identifier_pattern"
            | "private_property_identifier"
            | "statement_identifier" => Role::Identifier,
            "string" | "template_string" => Role::Str,
            "number" => Role::Number,
            "true" => Role::True,
            "false" => Role::False,
            "null" | "undefined" => Role::Null,
            _ => Role::Plain,
        },
        Lang::Go => match kind {
            "statement_list" => Role::Splice,
            "escape_sequence"
            | "interpreted_string_literal_content"
            | "raw_string_literal_content" => Role::Skip,
            "function_declaration" | "method_declaration" => Role::Def(DefKind::Function),
            "type_declaration" => Role::Def(DefKind::Class),
            "identifier" | "field_identifier" | "type_identifier" | "package_identifier"
            | "label_name" => Role::Identifier,
            "interpreted_string_literal" | "raw_string_literal" => Role::Str,
            "int_literal" | "float_literal" => Role::Number,
            "true" => Role::True,
            "false" => Role::False,
            "nil" => Role::Null,
            _ => Role::Plain,
        },
        Lang::Ruby => match kind {
            "then" | "body_statement" | "do" => Role::Splice,
            "string_content" | "escape_sequence" => Role::Skip,
            "method" | "singleton_method" => Role::Def(DefKind::Function),
            "class" | "module" | "singleton_class" => Role::Def(DefKind::Class),
            "identifier" | "constant" | "instance_variable" | "class_variable"
            | "global_variable" => Role::Identifier,
            "string" => Role::Str,
            "integer" | "float" => Role::Number,
            "true" => Role::True,
            "false" => Role::False,
            "nil" => Role::Null,
            _ => Role::Plain,
        },
    }
}

/// Get the tree-sitter Language for a given Lang variant.
fn grammar(lang: Lang) -> tree_sitter::Language {
    let lang = match lang {
        Lang::Python => tree_sitter_python::LANGUAGE,
        Lang::JavaScript => tree_sitter_javascript::LANGUAGE,
        Lang::Go => tree_sitter_go::LANGUAGE,
        Lang::Ruby => tree_sitter_ruby::LANGUAGE,
    };
    lang.into()
}

/// Read a source file. Missing files map to `NotFound`, everything else to `Io`.
pub fn read_source(path: &Path) -> Result<String, ContextError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ContextError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ContextError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Parse `source` and lower it. `path` is only used for error messages.
pub fn parse_source(source: &str, lang: Lang, path: &Path) -> Result<SyntaxNode, ContextError> {
    let syntax_error = |line: u32, reason: String| ContextError::Syntax {
        path: path.to_path_buf(),
        line,
        reason,
    };

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&grammar(lang))
        .map_err(|e| syntax_error(0, format!("{lang} grammar unavailable: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| syntax_error(0, "parser gave up".into()))?;

    let root = tree.root_node();
    let bytes = source.as_bytes();
    if let Some(bad) = first_error(root) {
        return Err(syntax_error(line_of(bad), describe_error(bad, bytes)));
    }

    let mut children = Vec::new();
    lower_children(root, bytes, lang, 0, &mut children).map_err(|TooDeep { line }| {
        syntax_error(line, format!("nesting deeper than {MAX_NESTING} levels"))
    })?;
    Ok(SyntaxNode::new(NodeKind::Module, None).with_children(children))
}

/// Pre-order search for the first ERROR or MISSING node. Uses a cursor rather
/// than recursion: a long `a + b + ...` chain nests once per operator.
fn first_error(root: tree_sitter::Node) -> Option<tree_sitter::Node> {
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() && cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return None;
            }
        }
    }
}

fn describe_error(node: tree_sitter::Node, src: &[u8]) -> String {
    if node.is_missing() {
        return format!("missing \"{}\"", node.kind());
    }
    let snippet: String = node_text(node, src)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .take(40)
        .collect();
    if snippet.is_empty() {
        "invalid syntax".into()
    } else {
        format!("unexpected \"{snippet}\"")
    }
}

fn lower_children(
    node: tree_sitter::Node,
    src: &[u8],
    lang: Lang,
    depth: usize,
    out: &mut Vec<SyntaxNode>,
) -> Result<(), TooDeep> {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        lower_into(child, src, lang, depth + 1, out)?;
    }
    Ok(())
}

fn lower_into(
    node: tree_sitter::Node,
    src: &[u8],
    lang: Lang,
    depth: usize,
    out: &mut Vec<SyntaxNode>,
) -> Result<(), TooDeep> {
    if depth > MAX_NESTING {
        return Err(TooDeep {
            line: line_of(node),
        });
    }

    let kind = match role(lang, node.kind()) {
        Role::Skip => return Ok(()),
        Role::Splice => return lower_children(node, src, lang, depth, out),
        Role::Def(def) => NodeKind::Definition {
            def,
            name: definition_name(node, src),
        },
        Role::Wrapper => NodeKind::Wrapper,
        Role::Identifier => NodeKind::Identifier {
            name: node_text(node, src).to_string(),
        },
        Role::Str => NodeKind::Str {
            value: string_value(node_text(node, src), lang),
        },
        Role::Number => number_kind(node_text(node, src)),
        Role::True => NodeKind::Bool { value: true },
        Role::False => NodeKind::Bool { value: false },
        Role::Null => NodeKind::Null,
        Role::Plain => NodeKind::Other,
    };

    let mut children = Vec::new();
    lower_children(node, src, lang, depth, &mut children)?;
    out.push(SyntaxNode::new(kind, Some(line_of(node))).with_children(children));
    Ok(())
}

fn line_of(node: tree_sitter::Node) -> u32 {
    node.start_position().row as u32 + 1
}

fn node_text<'s>(node: tree_sitter::Node, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

/// The defined name: the `name` field, or for Go `type_declaration` the name
/// of its first type spec.
fn definition_name(node: tree_sitter::Node, src: &[u8]) -> Option<String> {
    let name = node.child_by_field_name("name").or_else(|| {
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .find(|c| c.kind().starts_with("type_"))
            .and_then(|spec| spec.child_by_field_name("name"))
    })?;
    let text = node_text(name, src);
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// The value of a string literal: quotes and prefixes gone, escapes decoded.
/// Python raw strings and Go backtick strings are taken as written; Ruby
/// single quotes only know `\\` and `\'`.
fn string_value(raw: &str, lang: Lang) -> String {
    let prefix_len = raw.len() - raw.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len();
    let (prefix, rest) = raw.split_at(prefix_len);
    let inner = strip_quotes(raw);
    let quote = rest.chars().next();

    let raw_literal = match lang {
        Lang::Python => prefix.contains(['r', 'R']),
        Lang::Go => quote == Some('`'),
        Lang::JavaScript | Lang::Ruby => false,
    };
    if raw_literal {
        inner.to_string()
    } else {
        unescape(inner, lang == Lang::Ruby && quote == Some('\''))
    }
}

/// Decode backslash escapes. Unknown or malformed escapes stay as written.
/// With `quotes_only`, only `\\` and `\'` are escapes.
fn unescape(body: &str, quotes_only: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        // Err carries whatever was consumed past `next`, to be put back verbatim.
        let decoded = match next {
            '\\' | '\'' => Ok(next),
            _ if quotes_only => Err(String::new()),
            '"' | '`' => Ok(next),
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '0' => Ok('\0'),
            'a' => Ok('\x07'),
            'b' => Ok('\x08'),
            'f' => Ok('\x0c'),
            'v' => Ok('\x0b'),
            // Line continuation.
            '\n' => continue,
            'x' => hex_escape(&mut chars, 2),
            'u' if chars.peek() == Some(&'{') => braced_escape(&mut chars),
            'u' => hex_escape(&mut chars, 4),
            'U' => hex_escape(&mut chars, 8),
            _ => Err(String::new()),
        };
        match decoded {
            Ok(c) => out.push(c),
            Err(consumed) => {
                out.push('\\');
                out.push(next);
                out.push_str(&consumed);
            }
        }
    }
    out
}

type Chars<'a> = std::iter::Peekable<std::str::Chars<'a>>;

fn hex_escape(chars: &mut Chars<'_>, width: usize) -> Result<char, String> {
    let digits = take_hex(chars, width);
    hex_char(&digits, width).ok_or(digits)
}

/// `\u{1F600}`, with `chars` positioned on the `{`.
fn braced_escape(chars: &mut Chars<'_>) -> Result<char, String> {
    chars.next();
    let digits = take_hex(chars, 6);
    if chars.peek() == Some(&'}')
        && let Some(c) = hex_char(&digits, digits.len())
    {
        chars.next();
        return Ok(c);
    }
    Err(format!("{{{digits}"))
}

fn take_hex(chars: &mut Chars<'_>, max: usize) -> String {
    let mut digits = String::new();
    while digits.len() < max {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                digits.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    digits
}

/// `digits` as a code point, when there are exactly `width` of them.
fn hex_char(digits: &str, width: usize) -> Option<char> {
    if digits.len() != width {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}

/// Strip string prefixes (`f`, `rb`, ...) and the surrounding quotes.
fn strip_quotes(raw: &str) -> &str {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if let Some(inner) = body
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    body
}

fn number_kind(raw: &str) -> NodeKind {
    let digits: String = raw.chars().filter(|c| *c != '_').collect();
    if let Some(value) = parse_int(&digits) {
        NodeKind::Int { value }
    } else if let Ok(value) = digits.parse::<f64>() {
        NodeKind::Float { value }
    } else {
        // Imaginary, BigInt and friends have no value slot.
        NodeKind::Other
    }
}

fn parse_int(digits: &str) -> Option<i64> {
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = match lower.get(..2) {
        Some("0x") => (16, &lower[2..]),
        Some("0o") => (8, &lower[2..]),
        Some("0b") => (2, &lower[2..]),
        _ => (10, lower.as_str()),
    };
    i64::from_str_radix(body, radix).ok()
}
