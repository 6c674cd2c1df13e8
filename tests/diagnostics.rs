//! Integration tests for failure reporting and diagnostic values.

use parsley::{
    Diagnostic, EngineConfig, GrammarBuilder, ParseError, SourceInfo, TraceOutcome, Value,
};
use std::sync::{Arc, Mutex};

#[test]
fn test_no_match_reports_line_one_offset_zero() {
    let mut g = GrammarBuilder::new();
    let abc = g.literal("abc");
    let parser = g.compile(abc, EngineConfig::default()).unwrap();

    match parser.parse("cabbage") {
        Err(ParseError::NoMatch(error)) => {
            assert_eq!(error.location.line_number, 1);
            assert_eq!(error.location.char_offset, 0);
            assert_eq!(error.location.line_text, "cabbage");
        }
        other => panic!("expected a full-first-match error, got {:?}", other),
    }
}

#[test]
fn test_no_match_carries_furthest_failure() {
    let mut g = GrammarBuilder::new();
    let ab = g.literal("ab");
    let cd = g.literal("cd");
    let seq = g.sequence(&[ab, cd]);
    let parser = g.compile(seq, EngineConfig::default()).unwrap();

    match parser.parse_named("ab!d", "input.txt") {
        Err(ParseError::NoMatch(error)) => {
            // "ab" matched; the failure to find "cd" is the deepest point.
            assert_eq!(error.location.line_number, 1);
            assert_eq!(error.location.char_offset, 2);
            assert_eq!(error.location.filename.as_deref(), Some("input.txt"));
        }
        other => panic!("expected a full-first-match error, got {:?}", other),
    }
}

#[test]
fn test_partial_match_is_not_enough_when_full_match_required() {
    let mut g = GrammarBuilder::new();
    let a = g.any_of("a");
    let run = g.plus(a);
    let parser = g.compile(run, EngineConfig::default()).unwrap();

    assert!(parser.parse("aaa").is_ok());
    assert!(matches!(
        parser.parse("aab"),
        Err(ParseError::NoMatch(_))
    ));

    // Relaxing the requirement accepts the prefix derivation.
    let mut g = GrammarBuilder::new();
    let a = g.any_of("a");
    let run = g.plus(a);
    let relaxed = g
        .compile(run, EngineConfig::default().with_full_match(false))
        .unwrap();
    assert_eq!(relaxed.parse("aab").unwrap().len(), 2);
}

#[test]
fn test_fault_matcher_carries_diagnostic_as_result() {
    // A grammar that accepts a malformed tail as a recoverable diagnostic.
    let mut g = GrammarBuilder::new();
    let good = {
        let digit = g.any_of("0123456789");
        g.plus(digit)
    };
    let bad = {
        let anything = g.any();
        let tail = g.plus(anything);
        g.fault(tail, "expected digits")
    };
    let item = g.choice(&[good, bad]);
    let parser = g.compile(item, EngineConfig::default()).unwrap();

    let values = parser.parse("12").unwrap();
    assert_eq!(values, vec![
        Value::Str("1".to_string()),
        Value::Str("2".to_string()),
    ]);

    let values = parser.parse("oops").unwrap();
    match &values[0] {
        Value::Diagnostic(diag) => {
            assert_eq!(diag.message, "expected digits");
            assert_eq!(diag.location.line_number, 1);
            assert_eq!(diag.location.char_offset, 0);
        }
        other => panic!("expected a diagnostic value, got {:?}", other),
    }
}

#[test]
fn test_diagnostic_serializes_structurally() {
    let diag = Diagnostic::new(
        "expected digits",
        SourceInfo::new(Some("demo.txt".to_string()), 2, 5, "a b c".to_string()),
    );
    let json = serde_json::to_value(&diag).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "message": "expected digits",
            "location": {
                "filename": "demo.txt",
                "line_number": 2,
                "char_offset": 5,
                "line_text": "a b c",
            }
        })
    );
}

#[test]
fn test_trace_hook_sees_attempts_and_outcomes() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&events);

    let mut g = GrammarBuilder::new();
    let a = g.literal("a");
    let b = g.literal("b");
    let alt = g.choice(&[a, b]);
    let parser = g
        .compile(alt, EngineConfig::default())
        .unwrap()
        .with_trace(move |event| {
            seen.lock().unwrap().push((event.kind, event.offset, event.outcome));
        });

    parser.parse("b").unwrap();

    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .any(|(kind, _, outcome)| *kind == "literal" && *outcome == TraceOutcome::Failed));
    assert!(events
        .iter()
        .any(|(kind, _, outcome)| *kind == "literal" && *outcome == TraceOutcome::Yielded));
    assert!(events
        .iter()
        .any(|(kind, _, outcome)| *kind == "choice" && *outcome == TraceOutcome::Attempt));
}
