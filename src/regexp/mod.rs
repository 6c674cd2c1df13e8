//! Regular expression compiler.
//!
//! A pattern string is tokenized (with logos), parsed into an immutable
//! expression tree, and compiled into automata over a chosen alphabet:
//!
//! - [`Nfa`]: non-deterministic, supports several labelled patterns at
//!   once and enumerates *every* prefix match, longest first. This backend
//!   serves matchers that need full backtracking over the pattern.
//! - [`Dfa`]: deterministic table produced by subset construction, one
//!   longest match per position with label ties broken by declaration
//!   order. This backend serves the compiled lexer.
//!
//! Line anchors (`^` at the start of a pattern, `$` at its end) compile to
//! zero-width conditions checked against the stream's line metadata, the
//! way table-driven lexer generators handle them: two start states for `^`
//! and end-of-line conditional accepts for `$`.

mod dfa;
mod nfa;
mod pattern;

pub use dfa::Dfa;
pub use nfa::Nfa;
pub use pattern::parse_pattern;

use std::fmt;

/// An immutable regular expression tree over some alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexExpr {
    /// A character class: sorted, disjoint inclusive symbol ranges.
    Class(Vec<(u32, u32)>),
    Concat(Vec<RegexExpr>),
    Alt(Vec<RegexExpr>),
    Star(Box<RegexExpr>),
    Opt(Box<RegexExpr>),
    Empty,
    /// Zero-width start-of-line assertion (`^`, pattern start only).
    LineStart,
    /// Zero-width end-of-line assertion (`$`, pattern end only).
    LineEnd,
}

/// A malformed pattern, reported with the offending fragment and its
/// character position within the pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexpError {
    pub message: String,
    pub position: usize,
    pub fragment: String,
}

impl RegexpError {
    pub(crate) fn new(message: impl Into<String>, position: usize, fragment: &str) -> Self {
        RegexpError {
            message: message.into(),
            position,
            fragment: fragment.to_string(),
        }
    }
}

impl fmt::Display for RegexpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed pattern at position {}: {} (near {:?})",
            self.position, self.message, self.fragment
        )
    }
}

impl std::error::Error for RegexpError {}
