//! # parsley
//!
//! A backtracking parser-combinator engine with a compiled lexer and
//! offside-rule support.
//!
//! Grammars are assembled from composable matchers ([`GrammarBuilder`]),
//! compiled into a runnable [`Parser`], and executed against located input
//! streams with resumable, multi-result backtracking. Execution is
//! trampolined, so deep or heavily backtracking grammars never grow the
//! host call stack, and can be bounded, memoized, and traced.
//!
//! A quick taste:
//!
//! ```text
//! let mut g = GrammarBuilder::new();
//! let word = g.token("[a-z]+");
//! let words = g.repeat(word, 1, None);
//! let parser = g.compile(words, EngineConfig::default())?;
//! let values = parser.parse("hello world")?;
//! ```
//!
//! Subsystems, leaves first: [`alphabet`] and [`intervals`] underpin the
//! [`regexp`] compiler (expression trees, NFA, DFA); [`stream`] provides
//! located cursors; [`grammar`] holds the matcher graph; [`engine`] runs
//! it; [`lexer`] splices tokenization ahead of token grammars; [`offside`]
//! tracks indentation; [`diagnostics`], [`config`], and [`parser`] round
//! out the surface.

#![allow(rustdoc::invalid_html_tags)]

pub mod alphabet;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod grammar;
pub mod intervals;
pub mod lexer;
pub mod offside;
pub mod parser;
pub mod regexp;
pub mod stream;

pub use alphabet::{Alphabet, AlphabetKind};
pub use config::{Direction, EngineConfig};
pub use diagnostics::{Diagnostic, SourceInfo};
pub use engine::{MatchItem, State, TraceEvent, TraceOutcome};
pub use grammar::{CompileError, GrammarBuilder, GrammarError, MatcherId, Value};
pub use intervals::IntervalMap;
pub use lexer::{LexerError, RuntimeLexerError};
pub use offside::{BlockMonitor, OffsideError};
pub use parser::{FullFirstMatchError, Matches, ParseError, Parser};
pub use regexp::RegexpError;
