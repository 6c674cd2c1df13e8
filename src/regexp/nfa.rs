//! Non-deterministic automaton with labelled accepts.
//!
//! Thompson construction over the expression tree. Several labelled
//! patterns compile into one automaton sharing a start state; each accept
//! state is tagged with the label of the pattern it terminates. Anchors are
//! guarded zero-width edges, taken only when the stream's line metadata
//! satisfies them.
//!
//! `match_prefixes` enumerates every prefix of the input that matches some
//! pattern, including every ambiguous and overlapping match, ordered
//! longest first, then by label declaration order.

use crate::alphabet::Alphabet;
use crate::regexp::RegexExpr;
use crate::stream::Cursor;

pub(crate) type StateId = usize;

/// Zero-width conditions on epsilon edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    LineStart,
    LineEnd,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct NfaState {
    pub epsilon: Vec<StateId>,
    pub guarded: Vec<(Guard, StateId)>,
    pub ranges: Vec<(u32, u32, StateId)>,
    pub accept: Option<usize>,
}

/// A non-deterministic finite automaton over an alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct Nfa {
    pub(crate) states: Vec<NfaState>,
    pub(crate) start: StateId,
    pub(crate) alphabet: &'static Alphabet,
    label_count: usize,
}

impl Nfa {
    /// Compile labelled patterns into one automaton. The label of each
    /// pattern is its index.
    pub fn compile(patterns: &[RegexExpr], alphabet: &'static Alphabet) -> Nfa {
        let mut nfa = Nfa {
            states: vec![NfaState::default()],
            start: 0,
            alphabet,
            label_count: patterns.len(),
        };
        for (label, expr) in patterns.iter().enumerate() {
            let exit = nfa.build(expr, nfa.start);
            nfa.states[exit].accept = Some(label);
        }
        nfa
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    fn add_state(&mut self) -> StateId {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    /// Thompson construction: wire `expr` starting at `from`, returning the
    /// exit state.
    fn build(&mut self, expr: &RegexExpr, from: StateId) -> StateId {
        match expr {
            RegexExpr::Class(ranges) => {
                let exit = self.add_state();
                for &(low, high) in ranges {
                    self.states[from].ranges.push((low, high, exit));
                }
                exit
            }
            RegexExpr::Concat(items) => {
                let mut at = from;
                for item in items {
                    at = self.build(item, at);
                }
                at
            }
            RegexExpr::Alt(items) => {
                let exit = self.add_state();
                for item in items {
                    let branch_exit = self.build(item, from);
                    self.states[branch_exit].epsilon.push(exit);
                }
                exit
            }
            RegexExpr::Star(inner) => {
                let hub = self.add_state();
                self.states[from].epsilon.push(hub);
                let inner_exit = self.build(inner, hub);
                self.states[inner_exit].epsilon.push(hub);
                hub
            }
            RegexExpr::Opt(inner) => {
                let exit = self.add_state();
                let inner_exit = self.build(inner, from);
                self.states[inner_exit].epsilon.push(exit);
                self.states[from].epsilon.push(exit);
                exit
            }
            RegexExpr::Empty => from,
            RegexExpr::LineStart => {
                let exit = self.add_state();
                self.states[from].guarded.push((Guard::LineStart, exit));
                exit
            }
            RegexExpr::LineEnd => {
                let exit = self.add_state();
                self.states[from].guarded.push((Guard::LineEnd, exit));
                exit
            }
        }
    }

    /// Epsilon closure under the given line context. The set is left sorted
    /// and deduplicated.
    fn closure(&self, set: &mut Vec<StateId>, line_start: bool, line_end: bool) {
        let mut i = 0;
        while i < set.len() {
            let state = set[i];
            for &next in &self.states[state].epsilon {
                if !set.contains(&next) {
                    set.push(next);
                }
            }
            for &(guard, next) in &self.states[state].guarded {
                let passes = match guard {
                    Guard::LineStart => line_start,
                    Guard::LineEnd => line_end,
                };
                if passes && !set.contains(&next) {
                    set.push(next);
                }
            }
            i += 1;
        }
        set.sort_unstable();
        set.dedup();
    }

    /// Every `(length, label)` prefix match of the cursor's input, sorted
    /// longest first, then by label.
    pub fn match_prefixes(&self, cursor: &Cursor) -> Vec<(usize, usize)> {
        let mut found: Vec<(usize, usize)> = Vec::new();
        let mut set = vec![self.start];
        self.closure(&mut set, cursor.at_line_start(0), cursor.at_line_end(0));

        let mut i = 0;
        loop {
            for &state in &set {
                if let Some(label) = self.states[state].accept {
                    if !found.contains(&(i, label)) {
                        found.push((i, label));
                    }
                }
            }

            let sym = match cursor.char_at(i).and_then(|c| self.alphabet.encode(c)) {
                Some(sym) => sym,
                None => break,
            };
            let mut next: Vec<StateId> = Vec::new();
            for &state in &set {
                for &(low, high, target) in &self.states[state].ranges {
                    if low <= sym && sym <= high && !next.contains(&target) {
                        next.push(target);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            i += 1;
            self.closure(&mut next, cursor.at_line_start(i), cursor.at_line_end(i));
            set = next;
        }

        found.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regexp::parse_pattern;
    use crate::stream::TextStream;

    fn nfa(patterns: &[&str]) -> Nfa {
        let exprs: Vec<RegexExpr> = patterns
            .iter()
            .map(|p| parse_pattern(p, Alphabet::text()).unwrap())
            .collect();
        Nfa::compile(&exprs, Alphabet::text())
    }

    fn prefixes(n: &Nfa, text: &str) -> Vec<(usize, usize)> {
        n.match_prefixes(&Cursor::Text(TextStream::new(text)))
    }

    #[test]
    fn test_all_prefixes_longest_first() {
        let n = nfa(&["a*"]);
        assert_eq!(prefixes(&n, "aaab"), vec![(3, 0), (2, 0), (1, 0), (0, 0)]);
    }

    #[test]
    fn test_overlapping_labels() {
        let n = nfa(&["ab", "a", "abc"]);
        assert_eq!(prefixes(&n, "abc"), vec![(3, 2), (2, 0), (1, 1)]);
    }

    #[test]
    fn test_alternation_and_group() {
        let n = nfa(&["(x|y)z?"]);
        assert_eq!(prefixes(&n, "yz!"), vec![(2, 0), (1, 0)]);
        assert_eq!(prefixes(&n, "q"), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_line_anchors() {
        let n = nfa(&["^ab$"]);
        assert_eq!(prefixes(&n, "ab"), vec![(2, 0)]);
        assert_eq!(prefixes(&n, "ab\nrest"), vec![(2, 0)]);
        assert_eq!(prefixes(&n, "abc"), Vec::<(usize, usize)>::new());

        // Mid-line start: the ^ guard blocks the match.
        let stream = TextStream::new("xab");
        let cursor = Cursor::Text(stream.advance(1));
        assert_eq!(n.match_prefixes(&cursor), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_anchor_after_newline_is_line_start() {
        let n = nfa(&["^b"]);
        let stream = TextStream::new("a\nb");
        let cursor = Cursor::Text(stream.advance(2));
        assert_eq!(n.match_prefixes(&cursor), vec![(1, 0)]);
    }
}
