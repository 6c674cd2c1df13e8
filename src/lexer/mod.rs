//! Lexer integration.
//!
//! Before a grammar first runs, a rewrite pass walks the matcher graph
//! looking for token nodes. If it finds any, every token pattern plus a
//! discard pattern compiles into one multi-pattern DFA, and execution is
//! spliced to run lexing ahead of the grammar: the grammar then consumes a
//! stream of pre-identified lexemes instead of raw characters. If it finds
//! none, the rewrite is a no-op and the grammar matches characters
//! directly.
//!
//! Tokens and raw character matching are mutually exclusive at any one
//! grammar level: a token's sub-grammar must not contain another token, and
//! a grammar with tokens must not also reach character-consuming matchers
//! outside a token boundary. Both are structural errors, caught here at
//! rewrite time.

use crate::alphabet::Alphabet;
use crate::config::EngineConfig;
use crate::diagnostics::SourceInfo;
use crate::grammar::{Grammar, MatcherId, MatcherKind};
use crate::regexp::{parse_pattern, Dfa, Nfa, RegexExpr, RegexpError};
use crate::stream::{Cursor, Lexeme, LexemeKind, TextStream, TokenStream};
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Default discard pattern between tokens: runs of blank space.
pub const DEFAULT_DISCARD: &str = r"[ \t\r\n]+";

/// Discard pattern under offside lexing, where line structure is
/// significant and newlines become lexemes.
pub const OFFSIDE_DISCARD: &str = r"[ \t]+";

/// Result of token discovery over a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAnalysis {
    /// Distinct token nodes in breadth-first discovery order.
    pub tokens: Vec<MatcherId>,
    /// Character-consuming matchers reachable outside any token boundary.
    pub raw: Vec<MatcherId>,
}

/// Discover token nodes reachable from `root` and validate the structure.
///
/// Traversal is breadth-first and tracks visited nodes by identity, so
/// shared nodes and cycles through delayed references are walked once.
pub fn analyze(grammar: &Grammar, root: MatcherId) -> Result<TokenAnalysis, LexerError> {
    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    let mut tokens = Vec::new();
    let mut raw = Vec::new();

    queue.push_back(root);
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        let kind = grammar.kind(id);
        if let MatcherKind::Token(spec) = kind {
            tokens.push(id);
            if let Some(content) = spec.content {
                reject_nested_tokens(grammar, id, content)?;
            }
            // The token boundary ends the walk: its content matches
            // characters of the lexeme, not the outer stream.
            continue;
        }
        if kind.consumes_characters() {
            raw.push(id);
        }
        for child in kind.children() {
            if !visited.contains(&child) {
                queue.push_back(child);
            }
        }
    }

    if !tokens.is_empty() && !raw.is_empty() {
        let offenders = raw
            .iter()
            .map(|&id| (id, grammar.kind(id).name()))
            .collect();
        return Err(LexerError::MixedContent { offenders });
    }

    Ok(TokenAnalysis { tokens, raw })
}

/// A token's content sub-grammar must not contain another token.
fn reject_nested_tokens(
    grammar: &Grammar,
    token: MatcherId,
    content: MatcherId,
) -> Result<(), LexerError> {
    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(content);
    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }
        if matches!(grammar.kind(id), MatcherKind::Token(_)) {
            return Err(LexerError::NestedToken { token, nested: id });
        }
        for child in grammar.kind(id).children() {
            if !visited.contains(&child) {
                queue.push_back(child);
            }
        }
    }
    Ok(())
}

/// The compiled multi-pattern lexer spliced ahead of a token grammar.
#[derive(Debug, Clone)]
pub struct CompiledLexer {
    dfa: Dfa,
    /// Labels below this count are tokens; the label at this count is the
    /// discard pattern.
    token_count: usize,
    offside: bool,
}

impl CompiledLexer {
    /// Compile the token patterns plus the discard pattern into one DFA.
    pub fn build(patterns: &[String], config: &EngineConfig) -> Result<CompiledLexer, RegexpError> {
        let alphabet = Alphabet::for_kind(config.alphabet);
        let offside = config.block_policy;
        let discard = config.discard.clone().unwrap_or_else(|| {
            if offside {
                OFFSIDE_DISCARD.to_string()
            } else {
                DEFAULT_DISCARD.to_string()
            }
        });

        let mut exprs: Vec<RegexExpr> = Vec::with_capacity(patterns.len() + 1);
        for pattern in patterns {
            exprs.push(parse_pattern(pattern, alphabet)?);
        }
        exprs.push(parse_pattern(&discard, alphabet)?);

        let nfa = Nfa::compile(&exprs, alphabet);
        Ok(CompiledLexer {
            dfa: Dfa::from_nfa(&nfa),
            token_count: patterns.len(),
            offside,
        })
    }

    /// Lex the whole input into a token stream.
    ///
    /// At each position the longest token match wins, carrying every label
    /// that ties; discard matches are consumed and dropped. Under offside
    /// lexing every line additionally yields its literal leading whitespace
    /// as an indent lexeme and a line-end lexeme at each newline.
    pub fn lex(&self, base: &TextStream) -> Result<TokenStream, RuntimeLexerError> {
        let mut lexemes = Vec::new();
        let mut cursor = Cursor::Text(base.clone());

        if self.offside && !cursor.is_empty() {
            cursor = self.emit_indent(cursor, &mut lexemes);
        }
        loop {
            if cursor.is_empty() {
                break;
            }
            if self.offside && cursor.peek_char() == Some('\n') {
                lexemes.push(Lexeme {
                    kind: LexemeKind::Eol,
                    labels: Vec::new(),
                    text: String::new(),
                    start: cursor.source_offset(),
                });
                cursor = cursor.advance_chars(1);
                if !cursor.is_empty() {
                    cursor = self.emit_indent(cursor, &mut lexemes);
                }
                continue;
            }

            match self.dfa.match_longest_set(&cursor) {
                Some((len, labels)) if len > 0 => {
                    let token_labels: Vec<usize> = labels
                        .into_iter()
                        .filter(|&label| label < self.token_count)
                        .collect();
                    if token_labels.is_empty() {
                        // Only the discard pattern matched.
                        cursor = cursor.advance_chars(len);
                    } else {
                        lexemes.push(Lexeme {
                            kind: LexemeKind::Token,
                            labels: token_labels,
                            text: cursor.take_chars(len),
                            start: cursor.source_offset(),
                        });
                        cursor = cursor.advance_chars(len);
                    }
                }
                _ => {
                    return Err(RuntimeLexerError {
                        location: cursor.location(),
                    })
                }
            }
        }

        // Treat end of input as a line end so grammars need not care
        // whether the last line carries a newline.
        if self.offside
            && lexemes
                .last()
                .map_or(false, |lexeme| lexeme.kind != LexemeKind::Eol)
        {
            lexemes.push(Lexeme {
                kind: LexemeKind::Eol,
                labels: Vec::new(),
                text: String::new(),
                start: cursor.source_offset(),
            });
        }

        Ok(TokenStream::new(lexemes, base.clone()))
    }

    /// Consume the leading whitespace of a line into an indent lexeme; the
    /// run may be empty.
    fn emit_indent(&self, cursor: Cursor, lexemes: &mut Vec<Lexeme>) -> Cursor {
        let mut n = 0;
        while matches!(cursor.char_at(n), Some(' ') | Some('\t')) {
            n += 1;
        }
        lexemes.push(Lexeme {
            kind: LexemeKind::Indent,
            labels: Vec::new(),
            text: cursor.take_chars(n),
            start: cursor.source_offset(),
        });
        cursor.advance_chars(n)
    }
}

/// Illegal token structure, detected at rewrite time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// A token's sub-grammar contains another token.
    NestedToken { token: MatcherId, nested: MatcherId },
    /// Token matchers mixed with raw character matchers at one level.
    MixedContent {
        offenders: Vec<(MatcherId, &'static str)>,
    },
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexerError::NestedToken { token, nested } => {
                write!(f, "token {} contains a nested token {}", token, nested)
            }
            LexerError::MixedContent { offenders } => {
                write!(
                    f,
                    "grammar mixes tokens with raw character matchers outside a token boundary:"
                )?;
                for (id, name) in offenders {
                    write!(f, " {} ({})", id, name)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LexerError {}

/// Lexing got stuck: no token and no discard pattern matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLexerError {
    pub location: SourceInfo,
}

impl fmt::Display for RuntimeLexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no token or discard pattern matches at {}",
            self.location
        )
    }
}

impl std::error::Error for RuntimeLexerError {}
