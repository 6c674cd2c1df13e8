//! Combinator surface for assembling grammars.
//!
//! `GrammarBuilder` owns the matcher arena while a grammar is under
//! construction. Combinator methods append nodes and hand back ids;
//! `delayed`/`bind` create forward references for recursive rules; and
//! `compile` freezes the arena, validates it, runs the lexer rewrite, and
//! produces a runnable [`Parser`].
//!
//! Compilation is the point of no return: after it, the grammar is behind
//! an `Arc` and no binding can change, so a grammar can never be rebound
//! while it is running.
//!
//! [`Parser`]: crate::parser::Parser

use crate::alphabet::Alphabet;
use crate::config::{Direction, EngineConfig};
use crate::grammar::{
    Grammar, GrammarError, MatcherId, MatcherKind, RepeatSpec, TokenSpec, TransformFn, Value,
};
use crate::lexer::{self, CompiledLexer, LexerError};
use crate::parser::Parser;
use crate::regexp::{parse_pattern, Nfa, RegexpError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Mutable grammar under construction.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    nodes: Vec<MatcherKind>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        GrammarBuilder { nodes: Vec::new() }
    }

    fn push(&mut self, kind: MatcherKind) -> MatcherId {
        self.nodes.push(kind);
        MatcherId(self.nodes.len() - 1)
    }

    /// Match an exact character sequence.
    pub fn literal(&mut self, text: &str) -> MatcherId {
        self.push(MatcherKind::Literal(text.to_string()))
    }

    /// Match any single character.
    pub fn any(&mut self) -> MatcherId {
        self.push(MatcherKind::AnyOf(None))
    }

    /// Match any single character from a set.
    pub fn any_of(&mut self, chars: &str) -> MatcherId {
        self.push(MatcherKind::AnyOf(Some(chars.to_string())))
    }

    /// Match a regular expression; backtracking explores every prefix
    /// match, longest first. The pattern is compiled at `compile` time
    /// against the configured alphabet.
    pub fn regexp(&mut self, pattern: &str) -> MatcherId {
        self.push(MatcherKind::Regexp(pattern.to_string()))
    }

    /// Match the items in order; results concatenate, and backtracking
    /// walks the Cartesian product depth-first with the left item
    /// outermost.
    pub fn sequence(&mut self, items: &[MatcherId]) -> MatcherId {
        self.push(MatcherKind::Sequence(items.to_vec()))
    }

    /// Ordered choice: alternatives are tried in declaration order and each
    /// contributes its full backtracking sequence.
    pub fn choice(&mut self, items: &[MatcherId]) -> MatcherId {
        self.push(MatcherKind::Choice(items.to_vec()))
    }

    /// Bounded repetition with the configured default direction.
    pub fn repeat(&mut self, item: MatcherId, min: usize, max: Option<usize>) -> MatcherId {
        self.repeat_with(item, min, max, None, None)
    }

    /// Bounded repetition with an optional separator and an explicit
    /// direction override.
    pub fn repeat_with(
        &mut self,
        item: MatcherId,
        min: usize,
        max: Option<usize>,
        separator: Option<MatcherId>,
        direction: Option<Direction>,
    ) -> MatcherId {
        let rest = match separator {
            Some(sep) => self.push(MatcherKind::Sequence(vec![sep, item])),
            None => item,
        };
        self.push(MatcherKind::Repeat(RepeatSpec {
            first: item,
            rest,
            min,
            max,
            direction,
        }))
    }

    /// Zero or more repetitions.
    pub fn star(&mut self, item: MatcherId) -> MatcherId {
        self.repeat(item, 0, None)
    }

    /// One or more repetitions.
    pub fn plus(&mut self, item: MatcherId) -> MatcherId {
        self.repeat(item, 1, None)
    }

    /// Zero or one occurrence.
    pub fn optional(&mut self, item: MatcherId) -> MatcherId {
        self.repeat(item, 0, Some(1))
    }

    /// Transform the item's result list.
    pub fn map<F>(&mut self, item: MatcherId, f: F) -> MatcherId
    where
        F: Fn(Vec<Value>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.push(MatcherKind::Transform(item, TransformFn(Arc::new(f))))
    }

    /// Collapse the item's results into a single list value.
    pub fn group(&mut self, item: MatcherId) -> MatcherId {
        self.map(item, |values| vec![Value::List(values)])
    }

    /// Match the item but contribute no results.
    pub fn discard(&mut self, item: MatcherId) -> MatcherId {
        self.push(MatcherKind::Drop(item))
    }

    /// Zero-width positive lookahead.
    pub fn lookahead(&mut self, item: MatcherId) -> MatcherId {
        self.push(MatcherKind::Lookahead {
            item,
            negative: false,
        })
    }

    /// Zero-width negative lookahead.
    pub fn not(&mut self, item: MatcherId) -> MatcherId {
        self.push(MatcherKind::Lookahead {
            item,
            negative: true,
        })
    }

    /// A token boundary: the pattern joins the compiled lexer and the
    /// matcher consumes one lexeme carrying its label.
    pub fn token(&mut self, pattern: &str) -> MatcherId {
        self.push(MatcherKind::Token(TokenSpec {
            pattern: pattern.to_string(),
            content: None,
            id: None,
        }))
    }

    /// A token whose text is re-parsed by a content sub-grammar; the
    /// content must consume the whole lexeme.
    pub fn token_with(&mut self, pattern: &str, content: MatcherId) -> MatcherId {
        self.push(MatcherKind::Token(TokenSpec {
            pattern: pattern.to_string(),
            content: Some(content),
            id: None,
        }))
    }

    /// Convert a completed sub-match into a diagnostic value, letting the
    /// grammar carry a recoverable error as an ordinary result.
    pub fn fault(&mut self, item: MatcherId, message: &str) -> MatcherId {
        self.push(MatcherKind::Fault {
            item,
            message: message.to_string(),
        })
    }

    /// A forward reference for recursive rules; bind it exactly once.
    pub fn delayed(&mut self) -> MatcherId {
        self.push(MatcherKind::Delayed(None))
    }

    /// Bind a delayed matcher to its target.
    pub fn bind(&mut self, delayed: MatcherId, target: MatcherId) -> Result<(), GrammarError> {
        match &mut self.nodes[delayed.0] {
            MatcherKind::Delayed(slot) => {
                if slot.is_some() {
                    return Err(GrammarError::AlreadyBound(delayed));
                }
                *slot = Some(target);
                Ok(())
            }
            _ => Err(GrammarError::NotDelayed(delayed)),
        }
    }

    /// Match nothing, successfully.
    pub fn empty(&mut self) -> MatcherId {
        self.push(MatcherKind::Empty)
    }

    /// Match the end of the stream.
    pub fn eos(&mut self) -> MatcherId {
        self.push(MatcherKind::Eos)
    }

    /// Match the end of a line.
    pub fn eol(&mut self) -> MatcherId {
        self.push(MatcherKind::Eol)
    }

    /// The literal leading whitespace of a line.
    pub fn indent(&mut self) -> MatcherId {
        self.push(MatcherKind::Indent)
    }

    /// Leading whitespace that must equal the current block level.
    pub fn block_indent(&mut self) -> MatcherId {
        self.push(MatcherKind::BlockIndent)
    }

    /// A nested block: the indentation of its first line becomes the
    /// current level for the body.
    pub fn block(&mut self, body: MatcherId) -> MatcherId {
        self.push(MatcherKind::Block { body })
    }

    /// A line at the current block level: indentation check, body, line end.
    /// The indentation and line end are dropped from the results.
    pub fn line(&mut self, body: MatcherId) -> MatcherId {
        let indent = self.block_indent();
        let indent = self.discard(indent);
        let eol = self.eol();
        let eol = self.discard(eol);
        self.sequence(&[indent, body, eol])
    }

    /// Freeze and validate the grammar, run the lexer rewrite, and produce
    /// a runnable parser rooted at `root`.
    pub fn compile(self, root: MatcherId, config: EngineConfig) -> Result<Parser, CompileError> {
        // Every delayed node must be bound, and bindings must reach a
        // concrete matcher.
        for (i, node) in self.nodes.iter().enumerate() {
            if matches!(node, MatcherKind::Delayed(None)) {
                return Err(GrammarError::UnboundDelayed(MatcherId(i)).into());
            }
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if !matches!(node, MatcherKind::Delayed(Some(_))) {
                continue;
            }
            let mut seen = vec![MatcherId(i)];
            let mut at = MatcherId(i);
            while let MatcherKind::Delayed(Some(target)) = &self.nodes[at.0] {
                at = *target;
                if seen.contains(&at) {
                    return Err(GrammarError::DelayedCycle(MatcherId(i)).into());
                }
                seen.push(at);
            }
        }

        let alphabet = Alphabet::for_kind(config.alphabet);

        // Compile regexp matchers up front; pattern errors surface here.
        let mut automata: HashMap<MatcherId, Arc<Nfa>> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if let MatcherKind::Regexp(pattern) = node {
                let expr = parse_pattern(pattern, alphabet)?;
                automata.insert(MatcherId(i), Arc::new(Nfa::compile(&[expr], alphabet)));
            }
        }

        let mut grammar = Grammar::new(self.nodes);
        let analysis = lexer::analyze(&grammar, root)?;

        let compiled_lexer = if analysis.tokens.is_empty() {
            log::info!("grammar defines no tokens; matching runs over raw characters");
            None
        } else {
            let mut patterns = Vec::new();
            for (label, &token_id) in analysis.tokens.iter().enumerate() {
                grammar.set_token_label(token_id, label);
                if let MatcherKind::Token(spec) = grammar.kind(token_id) {
                    patterns.push(spec.pattern.clone());
                }
            }
            Some(Arc::new(CompiledLexer::build(&patterns, &config)?))
        };

        Ok(Parser::from_parts(
            Arc::new(grammar),
            root,
            config,
            compiled_lexer,
            automata,
        ))
    }
}

impl Grammar {
    /// Assign a lexer label to a token node during the rewrite pass.
    pub(crate) fn set_token_label(&mut self, id: MatcherId, label: usize) {
        if let MatcherKind::Token(spec) = self.node_mut(id) {
            spec.id = Some(label);
        }
    }
}

/// A grammar that cannot be compiled into a parser.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Grammar(GrammarError),
    Lexer(LexerError),
    Regexp(RegexpError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Grammar(e) => write!(f, "{}", e),
            CompileError::Lexer(e) => write!(f, "{}", e),
            CompileError::Regexp(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<GrammarError> for CompileError {
    fn from(e: GrammarError) -> Self {
        CompileError::Grammar(e)
    }
}

impl From<LexerError> for CompileError {
    fn from(e: LexerError) -> Self {
        CompileError::Lexer(e)
    }
}

impl From<RegexpError> for CompileError {
    fn from(e: RegexpError) -> Self {
        CompileError::Regexp(e)
    }
}
