//! Lexeme stream produced by the compiled lexer.

use crate::diagnostics::SourceInfo;
use crate::stream::TextStream;
use std::sync::Arc;

/// What a lexeme represents in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    /// A run of source text matched by one or more token patterns.
    Token,
    /// The literal leading whitespace of a line (offside lexing only).
    Indent,
    /// A line boundary (offside lexing only).
    Eol,
}

/// One pre-lexed unit of input.
///
/// A lexeme carries every token label that tied at the longest match, so
/// ambiguous token sets stay ambiguous until the grammar resolves them.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    /// Ids of the token matchers whose patterns produced this lexeme.
    pub labels: Vec<usize>,
    pub text: String,
    /// Absolute character offset of the lexeme in the base stream.
    pub start: usize,
}

#[derive(Debug)]
struct TokenData {
    lexemes: Vec<Lexeme>,
    base: TextStream,
}

/// An immutable cursor over a lexed input.
#[derive(Debug, Clone)]
pub struct TokenStream {
    data: Arc<TokenData>,
    offset: usize,
}

impl TokenStream {
    pub fn new(lexemes: Vec<Lexeme>, base: TextStream) -> Self {
        TokenStream {
            data: Arc::new(TokenData { lexemes, base }),
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.lexemes.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lexeme_offset(&self) -> usize {
        self.offset
    }

    pub fn data_ptr(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }

    pub fn peek(&self) -> Option<&Lexeme> {
        self.data.lexemes.get(self.offset)
    }

    pub fn advance(&self, n: usize) -> TokenStream {
        TokenStream {
            data: Arc::clone(&self.data),
            offset: (self.offset + n).min(self.data.lexemes.len()),
        }
    }

    /// Character offset of the current position in the base stream.
    pub fn source_offset(&self) -> usize {
        match self.peek() {
            Some(lexeme) => lexeme.start,
            None => self.data.base.offset() + self.data.base.len(),
        }
    }

    pub fn location(&self) -> SourceInfo {
        self.data.base.location_at(self.source_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexeme(text: &str, start: usize) -> Lexeme {
        Lexeme {
            kind: LexemeKind::Token,
            labels: vec![0],
            text: text.to_string(),
            start,
        }
    }

    #[test]
    fn test_peek_and_advance() {
        let base = TextStream::new("ab cd");
        let stream = TokenStream::new(vec![lexeme("ab", 0), lexeme("cd", 3)], base);
        assert_eq!(stream.peek().unwrap().text, "ab");

        let rest = stream.advance(1);
        assert_eq!(rest.peek().unwrap().text, "cd");
        assert_eq!(stream.peek().unwrap().text, "ab");
        assert!(rest.advance(1).is_empty());
    }

    #[test]
    fn test_location_uses_lexeme_start() {
        let base = TextStream::new("ab\ncd");
        let stream = TokenStream::new(vec![lexeme("ab", 0), lexeme("cd", 3)], base);
        let second = stream.advance(1);
        let loc = second.location();
        assert_eq!(loc.line_number, 2);
        assert_eq!(loc.char_offset, 0);
        assert_eq!(loc.line_text, "cd");
    }

    #[test]
    fn test_exhausted_stream_reports_end() {
        let base = TextStream::new("ab");
        let stream = TokenStream::new(vec![lexeme("ab", 0)], base);
        let end = stream.advance(1);
        assert_eq!(end.location().char_offset, 2);
    }
}
