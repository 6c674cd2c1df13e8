//! Pattern string parsing.
//!
//! Patterns are tokenized with logos and parsed by recursive descent into a
//! [`RegexExpr`]. Supported syntax: literal characters, `\`-escapes,
//! `[...]` / `[^...]` classes with ranges, grouping parentheses, `|`
//! alternation, `*` repetition, `?` option, and the line anchors `^` / `$`
//! at the pattern boundaries.

use crate::alphabet::Alphabet;
use crate::regexp::{RegexExpr, RegexpError};
use logos::Logos;

/// Lexical pieces of a pattern string.
#[derive(Logos, Debug, Clone, PartialEq)]
enum PatternToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("|")]
    Pipe,

    #[token("*")]
    Star,

    #[token("?")]
    Question,

    #[token("^")]
    Caret,

    #[token("$")]
    Dollar,

    // A whole bracketed class, contents parsed separately.
    #[regex(r"\[(\\.|[^\]\\])*\]", |lex| lex.slice().to_owned())]
    Class(String),

    #[regex(r"\\.", |lex| lex.slice().chars().nth(1))]
    Escaped(char),

    #[regex(r"[^\\()\[\]|*?^$]", |lex| lex.slice().chars().next())]
    Char(char),
}

/// Resolve an escape sequence to its literal character.
fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

struct PatternParser<'a> {
    tokens: Vec<(PatternToken, usize)>,
    pos: usize,
    pattern: &'a str,
    alphabet: &'static Alphabet,
}

/// Parse a pattern string against an alphabet.
pub fn parse_pattern(
    pattern: &str,
    alphabet: &'static Alphabet,
) -> Result<RegexExpr, RegexpError> {
    let mut tokens = Vec::new();
    let mut lexer = PatternToken::lexer(pattern);
    while let Some(item) = lexer.next() {
        let span = lexer.span();
        match item {
            Ok(token) => tokens.push((token, span.start)),
            Err(()) => {
                return Err(RegexpError::new(
                    "unexpected character",
                    span.start,
                    &pattern[span.clone()],
                ))
            }
        }
    }

    // Anchors are only legal at the pattern boundaries; that restriction is
    // what lets the DFA compile them as start-state selection and
    // conditional accepts.
    for (i, (token, at)) in tokens.iter().enumerate() {
        if *token == PatternToken::Caret && i != 0 {
            return Err(RegexpError::new("^ is only valid at pattern start", *at, "^"));
        }
        if *token == PatternToken::Dollar && i != tokens.len() - 1 {
            return Err(RegexpError::new("$ is only valid at pattern end", *at, "$"));
        }
    }

    let mut parser = PatternParser {
        tokens,
        pos: 0,
        pattern,
        alphabet,
    };
    let expr = parser.alternation()?;
    if let Some((_, at)) = parser.peek() {
        let at = *at;
        return Err(parser.error("unexpected token", at));
    }
    Ok(expr)
}

impl<'a> PatternParser<'a> {
    fn peek(&self) -> Option<&(PatternToken, usize)> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<(PatternToken, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: &str, position: usize) -> RegexpError {
        let tail = self.pattern.get(position..).unwrap_or("");
        let fragment: String = tail.chars().take(8).collect();
        RegexpError::new(message, position, &fragment)
    }

    fn alternation(&mut self) -> Result<RegexExpr, RegexpError> {
        let mut branches = vec![self.concat()?];
        while matches!(self.peek(), Some((PatternToken::Pipe, _))) {
            self.bump();
            branches.push(self.concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.remove(0))
        } else {
            Ok(RegexExpr::Alt(branches))
        }
    }

    fn concat(&mut self) -> Result<RegexExpr, RegexpError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None | Some((PatternToken::Pipe, _)) | Some((PatternToken::RParen, _)) => break,
                _ => items.push(self.repeatable()?),
            }
        }
        match items.len() {
            0 => Ok(RegexExpr::Empty),
            1 => Ok(items.remove(0)),
            _ => Ok(RegexExpr::Concat(items)),
        }
    }

    fn repeatable(&mut self) -> Result<RegexExpr, RegexpError> {
        let mut expr = self.atom()?;
        while let Some((token, at)) = self.peek().cloned() {
            let star = match token {
                PatternToken::Star => true,
                PatternToken::Question => false,
                _ => break,
            };
            if matches!(expr, RegexExpr::LineStart | RegexExpr::LineEnd) {
                return Err(self.error("nothing to repeat", at));
            }
            self.bump();
            expr = if star {
                RegexExpr::Star(Box::new(expr))
            } else {
                RegexExpr::Opt(Box::new(expr))
            };
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<RegexExpr, RegexpError> {
        match self.bump() {
            Some((PatternToken::Char(c), at)) => self.literal(c, at),
            Some((PatternToken::Escaped(c), at)) => self.literal(unescape(c), at),
            Some((PatternToken::Class(text), at)) => self.class(&text, at),
            Some((PatternToken::Caret, _)) => Ok(RegexExpr::LineStart),
            Some((PatternToken::Dollar, _)) => Ok(RegexExpr::LineEnd),
            Some((PatternToken::LParen, at)) => {
                let inner = self.alternation()?;
                match self.bump() {
                    Some((PatternToken::RParen, _)) => Ok(inner),
                    _ => Err(self.error("unclosed group", at)),
                }
            }
            Some((PatternToken::Star, at)) | Some((PatternToken::Question, at)) => {
                Err(self.error("nothing to repeat", at))
            }
            Some((_, at)) => Err(self.error("unexpected token", at)),
            None => Err(self.error("unexpected end of pattern", self.pattern.chars().count())),
        }
    }

    fn literal(&self, c: char, at: usize) -> Result<RegexExpr, RegexpError> {
        match self.alphabet.encode(c) {
            Some(sym) => Ok(RegexExpr::Class(vec![(sym, sym)])),
            None => Err(self.error("character outside the alphabet", at)),
        }
    }

    /// Parse the contents of a bracketed class, `[...]` or `[^...]`.
    fn class(&self, text: &str, at: usize) -> Result<RegexExpr, RegexpError> {
        let inner: Vec<char> = text.chars().collect();
        debug_assert!(inner.len() >= 2);
        let mut items = &inner[1..inner.len() - 1];
        let negated = items.first() == Some(&'^');
        if negated {
            items = &items[1..];
        }

        let mut ranges: Vec<(u32, u32)> = Vec::new();
        let mut i = 0;
        let next_char = |i: &mut usize| -> Option<char> {
            let c = *items.get(*i)?;
            if c == '\\' {
                let escaped = *items.get(*i + 1)?;
                *i += 2;
                Some(unescape(escaped))
            } else {
                *i += 1;
                Some(c)
            }
        };
        while i < items.len() {
            let low_char = match next_char(&mut i) {
                Some(c) => c,
                None => return Err(self.error("dangling escape in class", at)),
            };
            let low = self
                .alphabet
                .encode(low_char)
                .ok_or_else(|| self.error("character outside the alphabet", at))?;
            // A '-' followed by more content forms a range.
            if items.get(i) == Some(&'-') && i + 1 < items.len() {
                i += 1;
                let high_char = match next_char(&mut i) {
                    Some(c) => c,
                    None => return Err(self.error("dangling escape in class", at)),
                };
                let high = self
                    .alphabet
                    .encode(high_char)
                    .ok_or_else(|| self.error("character outside the alphabet", at))?;
                if low > high {
                    return Err(self.error("class range out of order", at));
                }
                ranges.push((low, high));
            } else {
                ranges.push((low, low));
            }
        }
        if ranges.is_empty() && !negated {
            return Err(self.error("empty character class", at));
        }

        let merged = merge_ranges(ranges);
        let final_ranges = if negated {
            self.alphabet.complement(&merged)
        } else {
            merged
        };
        Ok(RegexExpr::Class(final_ranges))
    }
}

/// Sort and merge overlapping or touching ranges.
fn merge_ranges(mut ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    ranges.sort_unstable();
    let mut out: Vec<(u32, u32)> = Vec::new();
    for (low, high) in ranges {
        match out.last_mut() {
            Some(last) if low <= last.1.saturating_add(1) => {
                last.1 = last.1.max(high);
            }
            _ => out.push((low, high)),
        }
    }
    out
}
