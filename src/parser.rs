//! Compiled-parser entry points.
//!
//! A [`Parser`] is an immutable bundle of grammar, configuration, compiled
//! automata, and (when the grammar declares tokens) the compiled lexer. It
//! exposes the two contracts collaborators consume:
//!
//! - [`Parser::parse`]: the first derivation that consumes the whole
//!   stream, or a [`FullFirstMatchError`] carrying the furthest failure
//!   location;
//! - [`Parser::matches`]: the raw lazy sequence of (possibly partial)
//!   derivations, for callers that want backtracking control themselves.
//!
//! Parsers are freely shareable across threads; every run gets its own
//! engine state.

use crate::config::EngineConfig;
use crate::diagnostics::SourceInfo;
use crate::engine::{Engine, MatchItem, State, TraceEvent, TraceHook};
use crate::grammar::{Grammar, MatcherId, Value};
use crate::lexer::{CompiledLexer, RuntimeLexerError};
use crate::offside::{BlockMonitor, OffsideError};
use crate::regexp::Nfa;
use crate::stream::{Cursor, TextStream};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A runnable parser produced by grammar compilation.
#[derive(Clone)]
pub struct Parser {
    grammar: Arc<Grammar>,
    root: MatcherId,
    config: Arc<EngineConfig>,
    lexer: Option<Arc<CompiledLexer>>,
    automata: Arc<HashMap<MatcherId, Arc<Nfa>>>,
    trace: Option<TraceHook>,
}

impl Parser {
    pub(crate) fn from_parts(
        grammar: Arc<Grammar>,
        root: MatcherId,
        config: EngineConfig,
        lexer: Option<Arc<CompiledLexer>>,
        automata: HashMap<MatcherId, Arc<Nfa>>,
    ) -> Parser {
        Parser {
            grammar,
            root,
            config: Arc::new(config),
            lexer,
            automata: Arc::new(automata),
            trace: None,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn root(&self) -> MatcherId {
        self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install an instrumentation hook invoked on every match attempt,
    /// success, and failure.
    pub fn with_trace<F>(mut self, hook: F) -> Parser
    where
        F: Fn(&TraceEvent) + Send + Sync + 'static,
    {
        self.trace = Some(Arc::new(hook));
        self
    }

    /// Build the starting state for a run: lex the input when the grammar
    /// has tokens, seed the monitor when an offside policy is configured.
    fn start_state(&self, text: &str, filename: Option<String>) -> Result<State, ParseError> {
        let base = TextStream::with_name(text, filename);
        let monitor = if self.config.block_policy {
            Some(BlockMonitor::new())
        } else {
            None
        };
        let cursor = match &self.lexer {
            Some(lexer) => Cursor::Tokens(lexer.lex(&base)?),
            None => Cursor::Text(base),
        };
        Ok(State { cursor, monitor })
    }

    fn engine(&self, start: State) -> Engine {
        Engine::new(
            Arc::clone(&self.grammar),
            Arc::clone(&self.config),
            Arc::clone(&self.automata),
            self.trace.clone(),
            self.root,
            start,
        )
    }

    /// The lazy sequence of derivations over `text`.
    pub fn matches(&self, text: &str) -> Result<Matches, ParseError> {
        let start = self.start_state(text, None)?;
        Ok(Matches {
            engine: self.engine(start),
            errored: false,
        })
    }

    /// Run the grammar over a cursor prepared by the caller, such as a
    /// filtered stream. No lexing pass is applied.
    pub fn matches_in(&self, cursor: Cursor) -> Matches {
        let monitor = if self.config.block_policy {
            Some(BlockMonitor::new())
        } else {
            None
        };
        Matches {
            engine: self.engine(State { cursor, monitor }),
            errored: false,
        }
    }

    /// The first derivation consuming the whole stream (or any derivation,
    /// when a full match is not required by configuration).
    pub fn parse(&self, text: &str) -> Result<Vec<Value>, ParseError> {
        self.parse_inner(text, None)
    }

    /// As [`Parser::parse`], with a filename carried into locations.
    pub fn parse_named(&self, text: &str, filename: &str) -> Result<Vec<Value>, ParseError> {
        self.parse_inner(text, Some(filename.to_string()))
    }

    fn parse_inner(
        &self,
        text: &str,
        filename: Option<String>,
    ) -> Result<Vec<Value>, ParseError> {
        let fallback = TextStream::with_name(text, filename.clone()).location();
        let start = self.start_state(text, filename)?;
        let mut engine = self.engine(start);
        loop {
            match engine.next_result()? {
                Some((values, state)) => {
                    if !self.config.full_match || state.cursor.is_empty() {
                        return Ok(values);
                    }
                }
                None => break,
            }
        }
        let location = engine.furthest_location().unwrap_or(fallback);
        Err(ParseError::NoMatch(FullFirstMatchError { location }))
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("root", &self.root)
            .field("matchers", &self.grammar.len())
            .field("lexing", &self.lexer.is_some())
            .finish()
    }
}

/// Lazy, restartable sequence of derivations from one run.
///
/// Consumers stop pulling to stop the search; after a hard error the
/// iterator fuses.
pub struct Matches {
    engine: Engine,
    errored: bool,
}

impl Iterator for Matches {
    type Item = Result<MatchItem, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.errored {
            return None;
        }
        match self.engine.next_result() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(error) => {
                self.errored = true;
                Some(Err(error))
            }
        }
    }
}

/// No derivation consumed the entire input.
///
/// Carries the furthest position any branch reached before failing: the
/// expected, catchable "grammar did not match" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullFirstMatchError {
    pub location: SourceInfo,
}

impl fmt::Display for FullFirstMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no full match; furthest failure at {} in line {:?}",
            self.location, self.location.line_text
        )
    }
}

impl std::error::Error for FullFirstMatchError {}

/// Runtime failure of a parse attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Lexing got stuck before the grammar ran.
    Lexer(RuntimeLexerError),
    /// Indentation stack misuse or missing offside configuration.
    Offside(OffsideError),
    /// All top-level alternatives were exhausted.
    NoMatch(FullFirstMatchError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lexer(e) => write!(f, "{}", e),
            ParseError::Offside(e) => write!(f, "{}", e),
            ParseError::NoMatch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<RuntimeLexerError> for ParseError {
    fn from(e: RuntimeLexerError) -> Self {
        ParseError::Lexer(e)
    }
}

impl From<OffsideError> for ParseError {
    fn from(e: OffsideError) -> Self {
        ParseError::Offside(e)
    }
}

impl From<FullFirstMatchError> for ParseError {
    fn from(e: FullFirstMatchError) -> Self {
        ParseError::NoMatch(e)
    }
}
