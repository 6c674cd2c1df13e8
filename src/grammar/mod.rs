//! The matcher graph.
//!
//! A grammar is a directed, possibly cyclic graph of matcher nodes held in
//! an arena and addressed by [`MatcherId`]. Cycles go through [`Delayed`]
//! nodes, forward references bound exactly once, so recursion is a plain
//! index, not an owning pointer, and node identity doubles as the visited
//! key for graph traversals.
//!
//! The matcher kinds form a closed variant set with a `children` accessor;
//! rewrite passes (token discovery, validation) are written as traversals
//! over that set rather than per-kind dynamic dispatch.
//!
//! [`Delayed`]: MatcherKind::Delayed

mod builder;

pub use builder::{CompileError, GrammarBuilder};

use crate::config::Direction;
use crate::diagnostics::Diagnostic;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Identity of a matcher node in its grammar's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatcherId(pub(crate) usize);

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value produced by a match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    List(Vec<Value>),
    Diagnostic(Diagnostic),
}

impl Value {
    /// The text of a string value, if this is one.
    pub fn text(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Concatenate the string items of a result list.
    pub fn join(values: &[Value]) -> String {
        let mut out = String::new();
        for value in values {
            if let Value::Str(s) = value {
                out.push_str(s);
            }
        }
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Diagnostic(diag) => write!(f, "<error: {}>", diag.message),
        }
    }
}

/// A result-transforming function attached to a matcher.
#[derive(Clone)]
pub struct TransformFn(pub(crate) Arc<dyn Fn(Vec<Value>) -> Vec<Value> + Send + Sync>);

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformFn")
    }
}

/// Bounded repetition of an item, optionally interleaved with a separator.
///
/// `first` matches the initial item; `rest` matches each subsequent step
/// (the item itself, or a separator-then-item sequence synthesized by the
/// builder).
#[derive(Debug, Clone)]
pub struct RepeatSpec {
    pub first: MatcherId,
    pub rest: MatcherId,
    pub min: usize,
    pub max: Option<usize>,
    /// Overrides the configured default direction when set.
    pub direction: Option<Direction>,
}

/// A token boundary: its pattern feeds the compiled lexer, and an optional
/// content sub-grammar re-parses the matched text.
#[derive(Debug, Clone)]
pub struct TokenSpec {
    pub pattern: String,
    pub content: Option<MatcherId>,
    /// Lexer label, assigned during the rewrite pass.
    pub id: Option<usize>,
}

/// The closed set of matcher kinds.
#[derive(Debug, Clone)]
pub enum MatcherKind {
    /// Match an exact character sequence.
    Literal(String),
    /// Match one character; `None` accepts any, `Some` restricts to a set.
    AnyOf(Option<String>),
    /// Match a regular expression with full backtracking over prefixes.
    Regexp(String),
    Sequence(Vec<MatcherId>),
    Choice(Vec<MatcherId>),
    Repeat(RepeatSpec),
    Transform(MatcherId, TransformFn),
    /// Match the item, discard its results.
    Drop(MatcherId),
    Lookahead {
        item: MatcherId,
        negative: bool,
    },
    /// Forward reference, bound exactly once before compilation.
    Delayed(Option<MatcherId>),
    Token(TokenSpec),
    /// Convert a completed sub-match into a diagnostic value.
    Fault {
        item: MatcherId,
        message: String,
    },
    /// Match nothing, successfully.
    Empty,
    /// End of stream.
    Eos,
    /// End of line.
    Eol,
    /// The literal leading whitespace of a line (offside lexing).
    Indent,
    /// Leading whitespace that must equal the current block level.
    BlockIndent,
    /// A nested block: pushes the level of its first line for the body.
    Block {
        body: MatcherId,
    },
}

impl MatcherKind {
    /// Stable kind name for diagnostics and tracing.
    pub fn name(&self) -> &'static str {
        match self {
            MatcherKind::Literal(_) => "literal",
            MatcherKind::AnyOf(_) => "any",
            MatcherKind::Regexp(_) => "regexp",
            MatcherKind::Sequence(_) => "sequence",
            MatcherKind::Choice(_) => "choice",
            MatcherKind::Repeat(_) => "repeat",
            MatcherKind::Transform(_, _) => "transform",
            MatcherKind::Drop(_) => "drop",
            MatcherKind::Lookahead { negative: false, .. } => "lookahead",
            MatcherKind::Lookahead { negative: true, .. } => "not",
            MatcherKind::Delayed(_) => "delayed",
            MatcherKind::Token(_) => "token",
            MatcherKind::Fault { .. } => "fault",
            MatcherKind::Empty => "empty",
            MatcherKind::Eos => "eos",
            MatcherKind::Eol => "eol",
            MatcherKind::Indent => "indent",
            MatcherKind::BlockIndent => "block-indent",
            MatcherKind::Block { .. } => "block",
        }
    }

    /// The node's direct children, in declaration order.
    pub fn children(&self) -> Vec<MatcherId> {
        match self {
            MatcherKind::Sequence(items) | MatcherKind::Choice(items) => items.clone(),
            MatcherKind::Repeat(spec) => {
                if spec.first == spec.rest {
                    vec![spec.first]
                } else {
                    vec![spec.first, spec.rest]
                }
            }
            MatcherKind::Transform(item, _)
            | MatcherKind::Drop(item)
            | MatcherKind::Lookahead { item, .. }
            | MatcherKind::Fault { item, .. }
            | MatcherKind::Block { body: item } => vec![*item],
            MatcherKind::Delayed(target) => target.iter().copied().collect(),
            MatcherKind::Token(spec) => spec.content.iter().copied().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this matcher consumes raw characters directly (relevant to
    /// token/raw mixing validation).
    pub fn consumes_characters(&self) -> bool {
        matches!(
            self,
            MatcherKind::Literal(_) | MatcherKind::AnyOf(_) | MatcherKind::Regexp(_)
        )
    }
}

/// An immutable matcher arena.
#[derive(Debug, Clone)]
pub struct Grammar {
    nodes: Vec<MatcherKind>,
}

impl Grammar {
    pub(crate) fn new(nodes: Vec<MatcherKind>) -> Self {
        Grammar { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: MatcherId) -> &MatcherKind {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: MatcherId) -> &mut MatcherKind {
        &mut self.nodes[id.0]
    }

    /// Follow delayed references to the concrete target. Bindings are
    /// validated at compile time, so chains are finite and complete.
    pub fn resolve(&self, mut id: MatcherId) -> MatcherId {
        let mut steps = 0;
        while let MatcherKind::Delayed(Some(target)) = self.kind(id) {
            id = *target;
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
        }
        id
    }
}

/// Grammar construction misuse, reported at bind or compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// A delayed node was never bound.
    UnboundDelayed(MatcherId),
    /// A delayed node was bound twice.
    AlreadyBound(MatcherId),
    /// `bind` was called on a node that is not delayed.
    NotDelayed(MatcherId),
    /// Delayed nodes form a cycle with no concrete matcher.
    DelayedCycle(MatcherId),
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnboundDelayed(id) => {
                write!(f, "delayed matcher {} was never bound", id)
            }
            GrammarError::AlreadyBound(id) => {
                write!(f, "delayed matcher {} is already bound", id)
            }
            GrammarError::NotDelayed(id) => {
                write!(f, "matcher {} is not a delayed reference", id)
            }
            GrammarError::DelayedCycle(id) => {
                write!(f, "delayed matcher {} resolves to itself", id)
            }
        }
    }
}

impl std::error::Error for GrammarError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_join_and_display() {
        let values = vec![
            Value::Str("ab".to_string()),
            Value::Str("c".to_string()),
            Value::List(vec![Value::Str("ignored".to_string())]),
        ];
        assert_eq!(Value::join(&values), "abc");

        let list = Value::List(vec![
            Value::Str("a".to_string()),
            Value::List(vec![Value::Str("b".to_string())]),
        ]);
        assert_eq!(format!("{}", list), "[a, [b]]");
    }

    #[test]
    fn test_children_accessor() {
        let seq = MatcherKind::Sequence(vec![MatcherId(1), MatcherId(2)]);
        assert_eq!(seq.children(), vec![MatcherId(1), MatcherId(2)]);

        let unbound = MatcherKind::Delayed(None);
        assert!(unbound.children().is_empty());

        let leaf = MatcherKind::Literal("x".to_string());
        assert!(leaf.children().is_empty());
        assert!(leaf.consumes_characters());
    }

    #[test]
    fn test_resolve_follows_delayed_chain() {
        let grammar = Grammar::new(vec![
            MatcherKind::Literal("a".to_string()),
            MatcherKind::Delayed(Some(MatcherId(0))),
            MatcherKind::Delayed(Some(MatcherId(1))),
        ]);
        assert_eq!(grammar.resolve(MatcherId(2)), MatcherId(0));
        assert_eq!(grammar.resolve(MatcherId(0)), MatcherId(0));
    }
}
