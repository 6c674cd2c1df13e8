//! Integration tests for the lexer rewrite and token grammars.

use parsley::{
    CompileError, EngineConfig, GrammarBuilder, LexerError, ParseError, Value,
};

#[test]
fn test_token_grammar_end_to_end() {
    let mut g = GrammarBuilder::new();
    let word = g.token("[a-z]+");
    let number = g.token("[0-9]+");
    let pair = g.choice(&[word, number]);
    let items = g.repeat(pair, 1, None);
    let parser = g.compile(items, EngineConfig::default()).unwrap();

    // Whitespace between tokens is discarded by default.
    let values = parser.parse("abc 42\n\tdef").unwrap();
    assert_eq!(
        values,
        vec![
            Value::Str("abc".to_string()),
            Value::Str("42".to_string()),
            Value::Str("def".to_string()),
        ]
    );
}

#[test]
fn test_ambiguous_tokens_resolved_by_the_grammar() {
    // "if" lexes as both the keyword and an identifier; the grammar picks
    // whichever its alternatives need.
    let mut g = GrammarBuilder::new();
    let kw = g.token("if");
    let ident = g.token("[a-z]+");
    let kw_first = g.sequence(&[kw, ident]);
    let parser = g.compile(kw_first, EngineConfig::default()).unwrap();

    let values = parser.parse("if other").unwrap();
    assert_eq!(
        values,
        vec![Value::Str("if".to_string()), Value::Str("other".to_string())]
    );

    // "iffy" is only an identifier: the keyword token cannot match it.
    assert!(parser.parse("iffy other").is_err());
}

#[test]
fn test_custom_discard_pattern() {
    let mut g = GrammarBuilder::new();
    let word = g.token("[a-z]+");
    let words = g.plus(word);
    let parser = g
        .compile(
            words,
            EngineConfig::default().with_discard(r"[ ;]+"),
        )
        .unwrap();

    let values = parser.parse("a;b c").unwrap();
    assert_eq!(values.len(), 3);
}

#[test]
fn test_stuck_lexing_reports_position() {
    let mut g = GrammarBuilder::new();
    let word = g.token("[a-z]+");
    let words = g.plus(word);
    let parser = g.compile(words, EngineConfig::default()).unwrap();

    match parser.parse("ab\ncd %oops") {
        Err(ParseError::Lexer(error)) => {
            assert_eq!(error.location.line_number, 2);
            assert_eq!(error.location.char_offset, 3);
            assert_eq!(error.location.line_text, "cd %oops");
        }
        other => panic!("expected a runtime lexer error, got {:?}", other),
    }
}

#[test]
fn test_token_content_subgrammar_must_consume_lexeme() {
    // key=value tokens re-parsed into their parts by a content grammar.
    let mut g = GrammarBuilder::new();
    let content = {
        let key = g.regexp("[a-z]+");
        let eq = g.literal("=");
        let eq = g.discard(eq);
        let value = g.regexp("[0-9]+");
        g.sequence(&[key, eq, value])
    };
    let assignment = g.token_with("[a-z]+=[0-9]+", content);
    let parser = g.compile(assignment, EngineConfig::default()).unwrap();

    let values = parser.parse("width=120").unwrap();
    assert_eq!(
        values,
        vec![Value::Str("width".to_string()), Value::Str("120".to_string())]
    );
}

#[test]
fn test_grammar_without_tokens_runs_over_raw_characters() {
    let mut g = GrammarBuilder::new();
    let letters = {
        let l = g.any_of("abc");
        g.plus(l)
    };
    let parser = g.compile(letters, EngineConfig::default()).unwrap();

    // The rewrite is a no-op: raw characters, no discard handling.
    assert!(parser.parse("abc").is_ok());
    assert!(parser.parse("a b").is_err());
}

#[test]
fn test_nested_token_is_a_compile_error() {
    let mut g = GrammarBuilder::new();
    let inner = g.token("[0-9]+");
    let wrapped = g.group(inner);
    let outer = g.token_with("[a-z0-9]+", wrapped);
    let err = g.compile(outer, EngineConfig::default()).unwrap_err();

    match err {
        CompileError::Lexer(LexerError::NestedToken { token, nested }) => {
            assert_eq!(token, outer);
            assert_eq!(nested, inner);
        }
        other => panic!("expected nested-token error, got {}", other),
    }
}

#[test]
fn test_token_raw_mixing_is_a_compile_error_naming_offenders() {
    let mut g = GrammarBuilder::new();
    let word = g.token("[a-z]+");
    let colon = g.literal(":");
    let pattern = g.regexp("[0-9]+");
    let root = g.sequence(&[word, colon, pattern]);
    let err = g.compile(root, EngineConfig::default()).unwrap_err();

    match err {
        CompileError::Lexer(LexerError::MixedContent { offenders }) => {
            let ids: Vec<_> = offenders.iter().map(|(id, _)| *id).collect();
            assert_eq!(ids, vec![colon, pattern]);
            let names: Vec<_> = offenders.iter().map(|(_, name)| *name).collect();
            assert_eq!(names, vec!["literal", "regexp"]);
        }
        other => panic!("expected mixed-content error, got {}", other),
    }
}

#[test]
fn test_binary_alphabet_grammar() {
    // Patterns over the binary alphabet match streams of 0s and 1s; any
    // other character simply ends the match.
    let mut g = GrammarBuilder::new();
    let bits = g.regexp("(0|1)*1");
    let parser = g
        .compile(
            bits,
            EngineConfig::default()
                .with_alphabet(parsley::AlphabetKind::Binary)
                .with_full_match(false),
        )
        .unwrap();

    let joined: Vec<String> = parser
        .matches("1011")
        .unwrap()
        .map(|item| Value::join(&item.unwrap().0))
        .collect();
    assert_eq!(joined, vec!["1011", "101", "1"]);

    // Characters outside the alphabet stop matching instead of erroring.
    let prefix = parser.matches("1x").unwrap().next().unwrap().unwrap();
    assert_eq!(Value::join(&prefix.0), "1");
}
