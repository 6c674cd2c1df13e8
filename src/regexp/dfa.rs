//! Deterministic automaton built by subset construction.
//!
//! States are canonicalized sorted sets of NFA states; numbering follows
//! worklist discovery order, so compiling the same NFA twice produces an
//! identical table regardless of hash-map iteration order. Each state's
//! transitions are an interval map over the alphabet, giving O(1)-ish
//! per-symbol lookup and at most one transition per symbol.
//!
//! Anchors follow the table-driven lexer convention: `^` selects between
//! two start states (line start vs. mid-line), and `$` turns into accept
//! tags that only apply when the position sits at a line end.

use crate::alphabet::Alphabet;
use crate::intervals::IntervalMap;
use crate::regexp::nfa::{Guard, Nfa, StateId};
use crate::stream::Cursor;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
struct DfaState {
    transitions: IntervalMap<usize>,
    /// Labels accepted unconditionally, sorted by declaration order.
    accepts: Vec<usize>,
    /// Labels accepted only at a line end, sorted by declaration order.
    eol_accepts: Vec<usize>,
}

/// A deterministic finite automaton over an alphabet.
#[derive(Debug, Clone, PartialEq)]
pub struct Dfa {
    states: Vec<DfaState>,
    start_line: usize,
    start_mid: usize,
    alphabet: &'static Alphabet,
}

impl Dfa {
    /// Eagerly determinize an NFA.
    pub fn from_nfa(nfa: &Nfa) -> Dfa {
        let mut builder = Builder {
            nfa,
            sets: Vec::new(),
            ids: HashMap::new(),
            states: Vec::new(),
        };

        let start_line = builder.intern(builder.start_closure(true));
        let start_mid = builder.intern(builder.start_closure(false));

        let mut next = 0;
        while next < builder.sets.len() {
            builder.process(next);
            next += 1;
        }

        Dfa {
            states: builder.states,
            start_line,
            start_mid,
            alphabet: nfa.alphabet,
        }
    }

    /// The single longest prefix match at the cursor, with label ties broken
    /// by declaration order. Table-driven: one transition lookup per symbol.
    pub fn match_longest(&self, cursor: &Cursor) -> Option<(usize, usize)> {
        self.match_longest_set(cursor)
            .map(|(len, labels)| (len, labels[0]))
    }

    /// The longest prefix match with every label that ties at that length,
    /// sorted by declaration order. The lexer uses this to keep ambiguous
    /// token sets ambiguous.
    pub fn match_longest_set(&self, cursor: &Cursor) -> Option<(usize, Vec<usize>)> {
        let mut state = if cursor.at_line_start(0) {
            self.start_line
        } else {
            self.start_mid
        };
        let mut best: Option<(usize, Vec<usize>)> = None;
        let mut i = 0;
        loop {
            let st = &self.states[state];
            let mut labels = st.accepts.clone();
            if cursor.at_line_end(i) {
                labels.extend(st.eol_accepts.iter().copied());
                labels.sort_unstable();
            }
            if !labels.is_empty() && best.as_ref().map_or(true, |(len, _)| i > *len) {
                best = Some((i, labels));
            }

            let sym = match cursor.char_at(i).and_then(|c| self.alphabet.encode(c)) {
                Some(sym) => sym,
                None => break,
            };
            match st.transitions.get(sym) {
                Some(&target) => {
                    state = target;
                    i += 1;
                }
                None => break,
            }
        }
        best
    }
}

struct Builder<'a> {
    nfa: &'a Nfa,
    sets: Vec<Vec<StateId>>,
    ids: HashMap<Vec<StateId>, usize>,
    states: Vec<DfaState>,
}

impl<'a> Builder<'a> {
    /// Closure of the NFA start under epsilon edges, with start-of-line
    /// guards passing or blocked.
    fn start_closure(&self, line_start: bool) -> Vec<StateId> {
        let mut set = vec![self.nfa.start];
        let mut i = 0;
        while i < set.len() {
            let state = set[i];
            for &next in &self.nfa.states[state].epsilon {
                if !set.contains(&next) {
                    set.push(next);
                }
            }
            if line_start {
                for &(guard, next) in &self.nfa.states[state].guarded {
                    if guard == Guard::LineStart && !set.contains(&next) {
                        set.push(next);
                    }
                }
            }
            i += 1;
        }
        set.sort_unstable();
        set.dedup();
        set
    }

    /// Plain epsilon closure; guards are never traversed mid-input.
    fn closure(&self, mut set: Vec<StateId>) -> Vec<StateId> {
        let mut i = 0;
        while i < set.len() {
            let state = set[i];
            for &next in &self.nfa.states[state].epsilon {
                if !set.contains(&next) {
                    set.push(next);
                }
            }
            i += 1;
        }
        set.sort_unstable();
        set.dedup();
        set
    }

    fn intern(&mut self, set: Vec<StateId>) -> usize {
        if let Some(&id) = self.ids.get(&set) {
            return id;
        }
        let id = self.sets.len();
        self.ids.insert(set.clone(), id);
        self.sets.push(set);
        self.states.push(DfaState {
            transitions: IntervalMap::new(),
            accepts: Vec::new(),
            eol_accepts: Vec::new(),
        });
        id
    }

    /// Fill in the transition row and accept tags for one state.
    fn process(&mut self, id: usize) {
        let set = self.sets[id].clone();

        let mut accepts: Vec<usize> = set
            .iter()
            .filter_map(|&s| self.nfa.states[s].accept)
            .collect();
        accepts.sort_unstable();
        accepts.dedup();

        // End-of-line guarded edges only lead to accepts (anchors sit at
        // pattern boundaries), so they contribute conditional accept tags.
        let mut eol_targets: Vec<StateId> = Vec::new();
        for &s in &set {
            for &(guard, next) in &self.nfa.states[s].guarded {
                if guard == Guard::LineEnd && !eol_targets.contains(&next) {
                    eol_targets.push(next);
                }
            }
        }
        let mut eol_accepts: Vec<usize> = self
            .closure(eol_targets)
            .iter()
            .filter_map(|&s| self.nfa.states[s].accept)
            .filter(|label| !accepts.contains(label))
            .collect();
        eol_accepts.sort_unstable();
        eol_accepts.dedup();

        // Split the union of outgoing ranges into atomic windows, each with
        // a uniform target set.
        let mut ranges: Vec<(u32, u32, StateId)> = Vec::new();
        for &s in &set {
            ranges.extend(self.nfa.states[s].ranges.iter().copied());
        }
        let mut points: Vec<u64> = Vec::new();
        for &(low, high, _) in &ranges {
            points.push(low as u64);
            points.push(high as u64 + 1);
        }
        points.sort_unstable();
        points.dedup();

        let mut transitions = IntervalMap::new();
        for window in points.windows(2) {
            let (low, high) = (window[0], window[1] - 1);
            let mut targets: Vec<StateId> = ranges
                .iter()
                .filter(|&&(rl, rh, _)| (rl as u64) <= low && low <= (rh as u64))
                .map(|&(_, _, t)| t)
                .collect();
            targets.sort_unstable();
            targets.dedup();
            if targets.is_empty() {
                continue;
            }
            let target_id = self.intern(self.closure(targets));
            transitions.insert(low as u32, high as u32, target_id);
        }

        self.states[id] = DfaState {
            transitions,
            accepts,
            eol_accepts,
        };
    }
}
