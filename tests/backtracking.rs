//! Integration tests for the backtracking orders of the core combinators.

use parsley::{Direction, EngineConfig, GrammarBuilder, Value};
use rstest::rstest;

/// Collect every derivation as its joined string values.
fn all_matches(parser: &parsley::Parser, text: &str) -> Vec<String> {
    parser
        .matches(text)
        .unwrap()
        .map(|item| {
            let (values, _) = item.unwrap();
            Value::join(&values)
        })
        .collect()
}

#[rstest]
#[case(Direction::Greedy, &["abc", "ab", "a", ""])]
#[case(Direction::Lazy, &["", "a", "ab", "abc"])]
fn test_repeat_direction_orders(#[case] direction: Direction, #[case] expected: &[&str]) {
    let mut g = GrammarBuilder::new();
    let any = g.any();
    let rep = g.repeat_with(any, 0, None, None, Some(direction));
    let parser = g
        .compile(rep, EngineConfig::default().with_full_match(false))
        .unwrap();

    assert_eq!(all_matches(&parser, "abc"), expected);
}

#[test]
fn test_sequence_is_cartesian_left_outermost() {
    // Left alternatives advance only after the right side is exhausted.
    let mut g = GrammarBuilder::new();
    let left = {
        let ab = g.literal("ab");
        let a = g.literal("a");
        g.choice(&[ab, a])
    };
    let right = {
        let c = g.literal("c");
        let bc = g.literal("bc");
        g.choice(&[c, bc])
    };
    let seq = g.sequence(&[left, right]);
    let parser = g
        .compile(seq, EngineConfig::default().with_full_match(false))
        .unwrap();

    assert_eq!(all_matches(&parser, "abc"), vec!["abc", "abc"]);

    // The same shape with distinguishable results shows the ordering.
    let mut g = GrammarBuilder::new();
    let left = {
        let x = g.any_of("x");
        let x2 = g.any_of("x");
        g.choice(&[x, x2])
    };
    let right = {
        let y = g.any_of("y");
        let y2 = g.any_of("y");
        g.choice(&[y, y2])
    };
    let seq = g.sequence(&[left, right]);
    let parser = g
        .compile(seq, EngineConfig::default().with_full_match(false))
        .unwrap();
    // Two alternatives each side: the full Cartesian product, four results.
    assert_eq!(all_matches(&parser, "xy").len(), 4);
}

#[test]
fn test_choice_concatenates_alternatives_in_order() {
    let mut g = GrammarBuilder::new();
    let long = g.literal("ab");
    let short = g.literal("a");
    let choice = g.choice(&[short, long]);
    let parser = g
        .compile(choice, EngineConfig::default().with_full_match(false))
        .unwrap();

    // Declaration order, not longest-first.
    assert_eq!(all_matches(&parser, "ab"), vec!["a", "ab"]);
}

#[test]
fn test_repeat_with_separator() {
    let mut g = GrammarBuilder::new();
    let item = g.any_of("abc");
    let comma = g.literal(",");
    let sep = g.discard(comma);
    let list = g.repeat_with(item, 1, None, Some(sep), None);
    let parser = g.compile(list, EngineConfig::default()).unwrap();

    let values = parser.parse("a,b,c").unwrap();
    assert_eq!(
        values,
        vec![
            Value::Str("a".to_string()),
            Value::Str("b".to_string()),
            Value::Str("c".to_string()),
        ]
    );
}

#[test]
fn test_repeat_bounds_are_exact() {
    let mut g = GrammarBuilder::new();
    let any = g.any();
    let two = g.repeat(any, 2, Some(2));
    let parser = g
        .compile(two, EngineConfig::default().with_full_match(false))
        .unwrap();

    assert_eq!(all_matches(&parser, "abc"), vec!["ab"]);
    assert!(all_matches(&parser, "a").is_empty());
}

#[test]
fn test_lookahead_is_zero_width() {
    let mut g = GrammarBuilder::new();
    let ahead = {
        let a = g.literal("a");
        g.lookahead(a)
    };
    let any = g.any();
    let seq = g.sequence(&[ahead, any]);
    let parser = g
        .compile(seq, EngineConfig::default().with_full_match(false))
        .unwrap();

    assert_eq!(all_matches(&parser, "a"), vec!["a"]);
    assert!(all_matches(&parser, "b").is_empty());
}

#[test]
fn test_negative_lookahead() {
    let mut g = GrammarBuilder::new();
    let not_digit = {
        let digit = g.any_of("0123456789");
        g.not(digit)
    };
    let any = g.any();
    let seq = g.sequence(&[not_digit, any]);
    let parser = g
        .compile(seq, EngineConfig::default().with_full_match(false))
        .unwrap();

    assert_eq!(all_matches(&parser, "x"), vec!["x"]);
    assert!(all_matches(&parser, "7").is_empty());
}

#[test]
fn test_transform_group_and_drop() {
    let mut g = GrammarBuilder::new();
    let letters = {
        let letter = g.any_of("ab");
        g.plus(letter)
    };
    let upper = g.map(letters, |values| {
        vec![Value::Str(Value::join(&values).to_uppercase())]
    });
    let colon = {
        let c = g.literal(":");
        g.discard(c)
    };
    let digits = {
        let digit = g.any_of("0123456789");
        let run = g.plus(digit);
        g.group(run)
    };
    let seq = g.sequence(&[upper, colon, digits]);
    let parser = g.compile(seq, EngineConfig::default()).unwrap();

    let values = parser.parse("ab:12").unwrap();
    assert_eq!(
        values,
        vec![
            Value::Str("AB".to_string()),
            Value::List(vec![
                Value::Str("1".to_string()),
                Value::Str("2".to_string())
            ]),
        ]
    );
}

#[test]
fn test_recursive_grammar_via_delayed() {
    // Balanced parens: p := "(" p ")" | ""
    let mut g = GrammarBuilder::new();
    let p = g.delayed();
    let open = g.literal("(");
    let close = g.literal(")");
    let nested = g.sequence(&[open, p, close]);
    let empty = g.empty();
    let alt = g.choice(&[nested, empty]);
    g.bind(p, alt).unwrap();
    let parser = g.compile(p, EngineConfig::default()).unwrap();

    assert!(parser.parse("((()))").is_ok());
    assert!(parser.parse("(()").is_err());
}

#[test]
fn test_deep_repetition_does_not_recurse_host_stack() {
    let mut g = GrammarBuilder::new();
    let a = g.any_of("a");
    let run = g.star(a);
    let parser = g.compile(run, EngineConfig::default()).unwrap();

    let input = "a".repeat(20_000);
    let values = parser.parse(&input).unwrap();
    assert_eq!(values.len(), 20_000);
}

#[test]
fn test_queue_bound_truncates_monotonically() {
    // (any | any)[:] over "ab": seven derivations unbounded. Shrinking the
    // bound drops suspended branches, so counts never increase as the
    // bound decreases, and a bound beyond the peak population is a no-op.
    let count_with_bound = |bound: usize| -> usize {
        let mut g = GrammarBuilder::new();
        let item = {
            let first = g.any();
            let second = g.any();
            g.choice(&[first, second])
        };
        let rep = g.star(item);
        let parser = g
            .compile(
                rep,
                EngineConfig::default()
                    .with_full_match(false)
                    .with_queue_bound(bound),
            )
            .unwrap();
        parser.matches("ab").unwrap().count()
    };

    let unbounded = count_with_bound(0);
    assert_eq!(unbounded, 7);
    assert_eq!(count_with_bound(64), unbounded);

    let counts: Vec<usize> = [64, 8, 4, 2, 1].iter().map(|&b| count_with_bound(b)).collect();
    for pair in counts.windows(2) {
        assert!(
            pair[1] <= pair[0],
            "counts must not increase as the bound decreases: {:?}",
            counts
        );
    }
    assert!(*counts.last().unwrap() >= 1);

    // Determinism: a fixed bound reproduces the same truncated count.
    assert_eq!(count_with_bound(2), count_with_bound(2));
}

#[test]
fn test_memoized_and_plain_runs_agree() {
    let mut g = GrammarBuilder::new();
    // Nested optional prefixes force heavy re-derivation without a cache.
    let item = {
        let a = g.any_of("ab");
        g.optional(a)
    };
    let row = g.repeat(item, 0, Some(12));
    let eos = g.eos();
    let eos = g.discard(eos);
    let root = g.sequence(&[row, eos]);

    let plain = g
        .compile(root, EngineConfig::default())
        .unwrap();
    let plain_result = plain.parse("abab").unwrap();

    let mut g = GrammarBuilder::new();
    let item = {
        let a = g.any_of("ab");
        g.optional(a)
    };
    let row = g.repeat(item, 0, Some(12));
    let eos = g.eos();
    let eos = g.discard(eos);
    let root = g.sequence(&[row, eos]);
    let memoized = g
        .compile(root, EngineConfig::default().with_memoize(true))
        .unwrap();

    assert_eq!(memoized.parse("abab").unwrap(), plain_result);
}

#[test]
fn test_memoized_right_recursion_parses() {
    // expr := digit "+" expr | digit
    let mut g = GrammarBuilder::new();
    let expr = g.delayed();
    let digit = g.any_of("0123456789");
    let plus = g.literal("+");
    let chain = g.sequence(&[digit, plus, expr]);
    let alt = g.choice(&[chain, digit]);
    g.bind(expr, alt).unwrap();
    let parser = g
        .compile(expr, EngineConfig::default().with_memoize(true))
        .unwrap();

    let values = parser.parse("1+2+3").unwrap();
    assert_eq!(Value::join(&values), "1+2+3");
}

#[test]
fn test_memoized_left_recursion_terminates() {
    // expr := expr "+" digit | digit is left-recursive; the memo table
    // curtails re-entry, so the parse terminates instead of spinning.
    let mut g = GrammarBuilder::new();
    let expr = g.delayed();
    let digit = g.any_of("0123456789");
    let plus = g.literal("+");
    let chain = g.sequence(&[expr, plus, digit]);
    let alt = g.choice(&[chain, digit]);
    g.bind(expr, alt).unwrap();
    let parser = g
        .compile(expr, EngineConfig::default().with_memoize(true))
        .unwrap();

    // A single digit still parses; the recursive shape does not hang.
    assert!(parser.parse("7").is_ok());
    assert!(parser.parse("1+2").is_err());
}
