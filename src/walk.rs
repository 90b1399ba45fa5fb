//! Context resolution: which lines must be shown so a match makes sense.
//!
//! The walk is depth-first and pre-order. Each call receives the chain of
//! header lines above it as a [`History`] borrowed from its caller's stack
//! frame, so a sibling branch can never see lines pushed by another.

use std::collections::BTreeSet;

use tracing::trace;

use crate::matcher::NodeMatcher;
use crate::syntax::{LineNumber, NodeKind, SyntaxNode};

/// Header lines enclosing the current node, innermost first when iterated.
#[derive(Debug, Clone, Copy, Default)]
pub struct History<'a> {
    head: Option<Frame<'a>>,
}

#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    line: LineNumber,
    parent: &'a History<'a>,
}

impl<'a> History<'a> {
    /// A history one frame deeper. A missing line leaves it unchanged.
    #[must_use]
    pub fn push(&'a self, line: Option<LineNumber>) -> History<'a> {
        match line {
            Some(line) => History {
                head: Some(Frame { line, parent: self }),
            },
            None => *self,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = LineNumber> + '_ {
        std::iter::successors(self.head, |frame| frame.parent.head).map(|frame| frame.line)
    }
}

/// Lines to display for one file, ascending and without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextResult {
    lines: BTreeSet<LineNumber>,
    /// Lines the matcher fired on, as opposed to enclosing headers.
    hits: BTreeSet<LineNumber>,
}

impl ContextResult {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = LineNumber> + '_ {
        self.lines.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<LineNumber> {
        self.lines().collect()
    }

    pub fn is_hit(&self, line: LineNumber) -> bool {
        self.hits.contains(&line)
    }

    pub fn last(&self) -> Option<LineNumber> {
        self.lines.last().copied()
    }

    fn record(&mut self, hit: LineNumber, history: &History<'_>) {
        self.hits.insert(hit);
        self.lines.insert(hit);
        self.lines.extend(history.lines());
    }
}

/// Every line the matcher fires on, plus the header lines enclosing each.
pub fn walk<M: NodeMatcher + ?Sized>(root: &SyntaxNode, matcher: &M) -> ContextResult {
    let mut result = ContextResult::default();
    visit(root, &History::default(), matcher, &mut result);
    result
}

fn visit<M: NodeMatcher + ?Sized>(
    node: &SyntaxNode,
    history: &History<'_>,
    matcher: &M,
    result: &mut ContextResult,
) {
    if let Some(line) = matcher.match_node(node) {
        trace!(line, "matched");
        result.record(line, history);
    }

    if node.children.is_empty() {
        return;
    }

    // Both the node and the child go on the history before descending, so a
    // match inside an `else` body pulls in the `if` and the `else` line.
    let inner = history.push(node.line);
    for child in &node.children {
        visit(child, &inner.push(child.line), matcher, result);
    }
}

/// Lines of the function and class definitions directly under the root,
/// in source order. Wrappers (decorators, `export`) report the wrapped
/// definition's line.
pub fn find_top_level(root: &SyntaxNode) -> Vec<LineNumber> {
    root.children
        .iter()
        .filter_map(|child| match child.kind {
            NodeKind::Definition { .. } => child.line,
            NodeKind::Wrapper => child
                .children
                .iter()
                .find(|c| c.definition().is_some())
                .and_then(|c| c.line),
            _ => None,
        })
        .collect()
}

/// [`find_top_level`] as a context result; every line counts as a hit.
pub fn definitions(root: &SyntaxNode) -> ContextResult {
    let lines: BTreeSet<LineNumber> = find_top_level(root).into_iter().collect();
    ContextResult {
        hits: lines.clone(),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{LineMatcher, ValueMatcher};
    use crate::syntax::DefKind;

    fn node(line: u32, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Other, Some(line)).with_children(children)
    }

    fn ident(line: u32, name: &str) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Identifier { name: name.into() }, Some(line))
    }

    fn module(children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Module, None).with_children(children)
    }

    fn def(kind: DefKind, line: u32, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::new(NodeKind::Definition { def: kind, name: None }, Some(line))
            .with_children(children)
    }

    /// if a:          # 1
    ///     b()        # 2
    /// else:          # 3
    ///     c()        # 4
    fn if_else() -> SyntaxNode {
        module(vec![node(
            1,
            vec![
                ident(1, "a"),
                node(2, vec![ident(2, "b")]),
                node(3, vec![node(4, vec![ident(4, "c")])]),
            ],
        )])
    }

    #[test]
    fn history_push_and_iterate() {
        let root = History::default();
        let one = root.push(Some(1));
        let skipped = one.push(None);
        let two = skipped.push(Some(5));
        assert_eq!(two.lines().collect::<Vec<_>>(), vec![5, 1]);
        assert_eq!(one.lines().collect::<Vec<_>>(), vec![1]);
        assert_eq!(root.lines().count(), 0);
    }

    #[test]
    fn top_level_match_is_just_its_line() {
        let tree = module(vec![node(1, vec![ident(1, "x")]), node(2, vec![ident(2, "y")])]);
        assert_eq!(walk(&tree, &ValueMatcher::new("y")).to_vec(), vec![2]);
    }

    #[test]
    fn else_match_pulls_in_if_and_else_headers_only() {
        let result = walk(&if_else(), &ValueMatcher::new("c"));
        assert_eq!(result.to_vec(), vec![1, 3, 4]);
        assert!(result.is_hit(4));
        assert!(!result.is_hit(1));
    }

    #[test]
    fn sibling_branch_lines_never_leak() {
        // Match in both branches: each brings its own header, nothing else.
        let result = walk(&if_else(), &ValueMatcher::new("b"));
        assert_eq!(result.to_vec(), vec![1, 2]);
    }

    #[test]
    fn unrelated_matches_union_their_chains() {
        let tree = module(vec![
            node(1, vec![node(2, vec![ident(2, "x")])]),
            node(5, vec![node(6, vec![node(7, vec![ident(7, "x")])])]),
        ]);
        assert_eq!(walk(&tree, &ValueMatcher::new("x")).to_vec(), vec![1, 2, 5, 6, 7]);
    }

    #[test]
    fn lineless_nodes_do_not_enter_history() {
        let tree = module(vec![node(
            3,
            vec![SyntaxNode::new(NodeKind::Other, None).with_children(vec![ident(4, "z")])],
        )]);
        assert_eq!(walk(&tree, &ValueMatcher::new("z")).to_vec(), vec![3, 4]);
    }

    #[test]
    fn results_are_sorted_and_unique() {
        let every = |n: &SyntaxNode| n.line;
        let result = walk(&if_else(), &every);
        assert_eq!(result.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(result.len(), 4);

        let none = |_: &SyntaxNode| -> Option<LineNumber> { None };
        assert!(walk(&if_else(), &none).is_empty());
    }

    #[test]
    fn line_matcher_through_walk() {
        let result = walk(&if_else(), &LineMatcher::from(4));
        assert_eq!(result.to_vec(), vec![1, 3, 4]);
        assert_eq!(result.last(), Some(4));
    }

    #[test]
    fn top_level_skips_nested_definitions() {
        let tree = module(vec![
            node(1, vec![]),
            def(DefKind::Class, 6, vec![def(DefKind::Function, 9, vec![])]),
            SyntaxNode::new(NodeKind::Wrapper, Some(20))
                .with_children(vec![ident(20, "cache"), def(DefKind::Function, 21, vec![])]),
        ]);
        assert_eq!(find_top_level(&tree), vec![6, 21]);

        let result = definitions(&tree);
        assert_eq!(result.to_vec(), vec![6, 21]);
        assert!(result.is_hit(6) && result.is_hit(21));
    }
}
