//! The syntax tree the context walker runs over.
//!
//! Nodes are lowered from tree-sitter (see [`crate::parse`]). Each variant of
//! [`NodeKind`] lists the named slots it carries, so matchers pattern-match on
//! the variant instead of poking at grammar-specific field names.

/// A 1-based source line.
pub type LineNumber = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    /// `None` for nodes without a source position (the module root).
    pub line: Option<LineNumber>,
    pub kind: NodeKind,
    /// In source order.
    pub children: Vec<SyntaxNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefKind {
    Function,
    /// Classes, Ruby modules, Go type declarations.
    Class,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module,
    Definition { def: DefKind, name: Option<String> },
    /// Decorated definition or `export` wrapper around a definition.
    Wrapper,
    Identifier { name: String },
    /// String literal with quotes stripped and escapes decoded, so `"a\tb"`
    /// holds a real tab. Raw literals keep their backslashes.
    Str { value: String },
    Int { value: i64 },
    Float { value: f64 },
    Bool { value: bool },
    Null,
    /// Statements, expressions, clauses: anything without a value slot.
    Other,
}

/// A borrowed view of one slot value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl NodeKind {
    /// Named slots of this variant, as `(slot name, value)`.
    pub fn slots(&self) -> impl Iterator<Item = (&'static str, Value<'_>)> {
        let slot = match self {
            NodeKind::Definition { name, .. } => name.as_deref().map(|n| ("name", Value::Text(n))),
            NodeKind::Identifier { name } => Some(("name", Value::Text(name))),
            NodeKind::Str { value } => Some(("value", Value::Text(value))),
            NodeKind::Int { value } => Some(("value", Value::Int(*value))),
            NodeKind::Float { value } => Some(("value", Value::Float(*value))),
            NodeKind::Bool { value } => Some(("value", Value::Bool(*value))),
            NodeKind::Null => Some(("value", Value::Null)),
            NodeKind::Module | NodeKind::Wrapper | NodeKind::Other => None,
        };
        slot.into_iter()
    }
}

impl SyntaxNode {
    #[must_use]
    pub fn new(kind: NodeKind, line: Option<LineNumber>) -> Self {
        SyntaxNode {
            line,
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<SyntaxNode>) -> Self {
        self.children = children;
        self
    }

    pub fn slots(&self) -> impl Iterator<Item = (&'static str, Value<'_>)> {
        self.kind.slots()
    }

    /// `Some(def)` for function/class definitions.
    #[must_use]
    pub fn definition(&self) -> Option<DefKind> {
        match self.kind {
            NodeKind::Definition { def, .. } => Some(def),
            _ => None,
        }
    }
}

/// An owned value to search for with the exact-value matcher.
/// Equality is by type and value: `Text("42")` never equals `Int(42)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl PartialEq<Value<'_>> for Literal {
    fn eq(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Literal::Text(a), Value::Text(b)) => a == b,
            (Literal::Int(a), Value::Int(b)) => a == b,
            (Literal::Float(a), Value::Float(b)) => a == b,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.to_string())
    }
}
