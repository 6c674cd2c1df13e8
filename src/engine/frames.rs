//! Per-matcher resume steps.
//!
//! Each matcher kind defines how a frame reacts to being asked for its next
//! result and to its child's outcomes. The transitions encode the declared
//! backtracking orders: sequences walk the Cartesian product depth-first
//! with the left item outermost, choices concatenate alternatives in
//! declaration order, and repetitions enumerate counts greedily (longest
//! first) or lazily (shortest first).

use crate::config::Direction;
use crate::diagnostics::Diagnostic;
use crate::engine::{Act, Engine, Event, FrameId, MatchItem, MemoKey, State};
use crate::grammar::{MatcherId, MatcherKind, RepeatSpec, TokenSpec};
use crate::offside::{indent_width, OffsideError};
use crate::parser::ParseError;
use crate::stream::{Cursor, LexemeKind, TextStream};
use crate::grammar::Value;

/// Suspended progress of one matcher attempt.
pub(crate) enum FrameState {
    /// Placeholder while a frame is being stepped.
    Taken,
    /// Single-result matchers resolved directly against the start state.
    Leaf { done: bool },
    /// Regexp matcher: prefix lengths enumerated longest first.
    Regexp {
        lengths: Option<Vec<usize>>,
        index: usize,
    },
    Seq {
        children: Vec<FrameId>,
        parts: Vec<MatchItem>,
        done: bool,
    },
    Choice {
        alt: usize,
        child: Option<FrameId>,
    },
    Repeat {
        frames: Vec<FrameId>,
        parts: Vec<MatchItem>,
        phase: RepPhase,
    },
    /// Transform, drop, and fault wrappers.
    Wrapper { child: Option<FrameId> },
    Lookahead {
        child: Option<FrameId>,
        done: bool,
    },
    Token {
        child: Option<FrameId>,
        done: bool,
    },
    Block { child: Option<FrameId> },
    Memo { key: MemoKey, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RepPhase {
    Start,
    Asking,
    AfterYield,
}

/// The initial frame state for a matcher kind.
pub(crate) fn initial_state(kind: &MatcherKind) -> FrameState {
    match kind {
        MatcherKind::Regexp(_) => FrameState::Regexp {
            lengths: None,
            index: 0,
        },
        MatcherKind::Sequence(_) => FrameState::Seq {
            children: Vec::new(),
            parts: Vec::new(),
            done: false,
        },
        MatcherKind::Choice(_) => FrameState::Choice {
            alt: 0,
            child: None,
        },
        MatcherKind::Repeat(_) => FrameState::Repeat {
            frames: Vec::new(),
            parts: Vec::new(),
            phase: RepPhase::Start,
        },
        MatcherKind::Transform(_, _) | MatcherKind::Drop(_) | MatcherKind::Fault { .. } => {
            FrameState::Wrapper { child: None }
        }
        MatcherKind::Lookahead { .. } => FrameState::Lookahead {
            child: None,
            done: false,
        },
        MatcherKind::Token(_) => FrameState::Token {
            child: None,
            done: false,
        },
        MatcherKind::Block { .. } => FrameState::Block { child: None },
        _ => FrameState::Leaf { done: false },
    }
}

impl Engine {
    pub(crate) fn step(&mut self, fid: FrameId, event: Event) -> Act {
        let grammar = std::sync::Arc::clone(&self.grammar);
        let matcher = self.frames[fid].matcher;
        let kind = grammar.kind(matcher);
        let start = self.frames[fid].start.clone();
        let mut state = std::mem::replace(&mut self.frames[fid].state, FrameState::Taken);
        let act = self.dispatch(matcher, kind, &start, &mut state, event);
        self.frames[fid].state = state;
        act
    }

    fn dispatch(
        &mut self,
        matcher: MatcherId,
        kind: &MatcherKind,
        start: &State,
        state: &mut FrameState,
        event: Event,
    ) -> Act {
        match state {
            FrameState::Taken => Act::Fail,
            FrameState::Leaf { done } => self.step_leaf(kind, start, done),
            FrameState::Regexp { lengths, index } => {
                self.step_regexp(matcher, start, lengths, index)
            }
            FrameState::Seq {
                children,
                parts,
                done,
            } => match kind {
                MatcherKind::Sequence(items) => {
                    self.step_seq(items, start, children, parts, done, event)
                }
                _ => Act::Fail,
            },
            FrameState::Choice { alt, child } => match kind {
                MatcherKind::Choice(alts) => self.step_choice(alts, start, alt, child, event),
                _ => Act::Fail,
            },
            FrameState::Repeat {
                frames,
                parts,
                phase,
            } => match kind {
                MatcherKind::Repeat(spec) => {
                    self.step_repeat(spec, start, frames, parts, phase, event)
                }
                _ => Act::Fail,
            },
            FrameState::Wrapper { child } => self.step_wrapper(kind, start, child, event),
            FrameState::Lookahead { child, done } => match kind {
                MatcherKind::Lookahead { item, negative } => {
                    self.step_lookahead(*item, *negative, start, child, done, event)
                }
                _ => Act::Fail,
            },
            FrameState::Token { child, done } => match kind {
                MatcherKind::Token(spec) => self.step_token(spec, start, child, done, event),
                _ => Act::Fail,
            },
            FrameState::Block { child } => match kind {
                MatcherKind::Block { body } => self.step_block(*body, start, child, event),
                _ => Act::Fail,
            },
            FrameState::Memo { key, index } => self.step_memo(matcher, start, key, index, event),
        }
    }

    /// Leaf matchers: one result, computed directly from the start state.
    fn step_leaf(&mut self, kind: &MatcherKind, start: &State, done: &mut bool) -> Act {
        if *done {
            return Act::Fail;
        }
        *done = true;
        match self.match_leaf(kind, start) {
            Ok(Some((values, state))) => Act::Yield(values, state),
            Ok(None) => {
                self.note_failure(start);
                Act::Fail
            }
            Err(error) => Act::Error(error),
        }
    }

    fn match_leaf(
        &self,
        kind: &MatcherKind,
        start: &State,
    ) -> Result<Option<MatchItem>, ParseError> {
        let cursor = &start.cursor;
        let advanced = |cursor: Cursor| State {
            cursor,
            monitor: start.monitor.clone(),
        };
        Ok(match kind {
            MatcherKind::Literal(text) => {
                if cursor.starts_with(text) {
                    let n = text.chars().count();
                    Some((
                        vec![Value::Str(text.clone())],
                        advanced(cursor.advance_chars(n)),
                    ))
                } else {
                    None
                }
            }
            MatcherKind::AnyOf(set) => match cursor.peek_char() {
                Some(c) if set.as_ref().map_or(true, |s| s.contains(c)) => Some((
                    vec![Value::Str(c.to_string())],
                    advanced(cursor.advance_chars(1)),
                )),
                _ => None,
            },
            MatcherKind::Empty => Some((Vec::new(), start.clone())),
            MatcherKind::Eos => {
                if cursor.is_empty() {
                    Some((Vec::new(), start.clone()))
                } else {
                    None
                }
            }
            MatcherKind::Eol => match cursor {
                Cursor::Tokens(_) => match cursor.peek_lexeme() {
                    Some(lexeme) if lexeme.kind == LexemeKind::Eol => {
                        Some((Vec::new(), advanced(cursor.advance_lexeme())))
                    }
                    _ => None,
                },
                _ => {
                    if cursor.peek_char() == Some('\n') {
                        Some((Vec::new(), advanced(cursor.advance_chars(1))))
                    } else if cursor.is_empty() {
                        Some((Vec::new(), start.clone()))
                    } else {
                        None
                    }
                }
            },
            MatcherKind::Indent => match cursor.peek_lexeme() {
                Some(lexeme) if lexeme.kind == LexemeKind::Indent => Some((
                    vec![Value::Str(lexeme.text.clone())],
                    advanced(cursor.advance_lexeme()),
                )),
                _ => None,
            },
            MatcherKind::BlockIndent => {
                let monitor = start
                    .monitor
                    .as_ref()
                    .ok_or(ParseError::Offside(OffsideError::NotConfigured))?;
                match cursor.peek_lexeme() {
                    Some(lexeme)
                        if lexeme.kind == LexemeKind::Indent
                            && indent_width(&lexeme.text, self.config.tab_size)
                                == monitor.current() =>
                    {
                        Some((
                            vec![Value::Str(lexeme.text.clone())],
                            advanced(cursor.advance_lexeme()),
                        ))
                    }
                    _ => None,
                }
            }
            _ => None,
        })
    }

    /// Regexp matcher: every prefix match, longest first.
    fn step_regexp(
        &mut self,
        matcher: MatcherId,
        start: &State,
        lengths: &mut Option<Vec<usize>>,
        index: &mut usize,
    ) -> Act {
        if lengths.is_none() {
            let computed: Vec<usize> = match self.automata.get(&matcher) {
                Some(nfa) => nfa
                    .match_prefixes(&start.cursor)
                    .into_iter()
                    .map(|(len, _)| len)
                    .collect(),
                None => Vec::new(),
            };
            if computed.is_empty() {
                self.note_failure(start);
            }
            *lengths = Some(computed);
        }
        if let Some(found) = lengths {
            if *index < found.len() {
                let len = found[*index];
                *index += 1;
                let text = start.cursor.take_chars(len);
                return Act::Yield(
                    vec![Value::Str(text)],
                    State {
                        cursor: start.cursor.advance_chars(len),
                        monitor: start.monitor.clone(),
                    },
                );
            }
        }
        Act::Fail
    }

    /// Sequence: for each result of the left part, exhaust the right parts
    /// before advancing the left: the Cartesian backtracking product.
    fn step_seq(
        &mut self,
        items: &[MatcherId],
        start: &State,
        children: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        done: &mut bool,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => {
                if items.is_empty() {
                    return if *done {
                        Act::Fail
                    } else {
                        *done = true;
                        Act::Yield(Vec::new(), start.clone())
                    };
                }
                if children.is_empty() {
                    let child = self.alloc_frame(items[0], start.clone());
                    children.push(child);
                    Act::Ask(child)
                } else {
                    // A full result was yielded; advance the deepest item.
                    parts.pop();
                    Act::Ask(children[children.len() - 1])
                }
            }
            Event::ChildResult(values, state) => {
                parts.push((values, state.clone()));
                if parts.len() == items.len() {
                    let combined: Vec<Value> =
                        parts.iter().flat_map(|(v, _)| v.iter().cloned()).collect();
                    Act::Yield(combined, state)
                } else {
                    let child = self.alloc_frame(items[parts.len()], state);
                    children.push(child);
                    Act::Ask(child)
                }
            }
            Event::ChildFailed => {
                children.pop();
                if children.is_empty() {
                    Act::Fail
                } else {
                    parts.pop();
                    Act::Ask(children[children.len() - 1])
                }
            }
        }
    }

    /// Ordered choice: alternatives contribute their full backtracking
    /// sequences in declaration order.
    fn step_choice(
        &mut self,
        alts: &[MatcherId],
        start: &State,
        alt: &mut usize,
        child: &mut Option<FrameId>,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => match child {
                Some(c) => Act::Ask(*c),
                None => {
                    if alts.is_empty() {
                        return Act::Fail;
                    }
                    let c = self.alloc_frame(alts[0], start.clone());
                    *child = Some(c);
                    Act::Ask(c)
                }
            },
            Event::ChildResult(values, state) => Act::Yield(values, state),
            Event::ChildFailed => {
                *alt += 1;
                if *alt >= alts.len() {
                    return Act::Fail;
                }
                let c = self.alloc_frame(alts[*alt], start.clone());
                *child = Some(c);
                Act::Ask(c)
            }
        }
    }

    fn step_repeat(
        &mut self,
        spec: &RepeatSpec,
        start: &State,
        frames: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        phase: &mut RepPhase,
        event: Event,
    ) -> Act {
        let direction = spec.direction.unwrap_or(self.config.direction);
        match event {
            Event::Next => match (*phase, direction) {
                (RepPhase::Start, Direction::Greedy) => {
                    self.rep_extend_or_yield(spec, start, frames, parts, phase)
                }
                (RepPhase::Start, Direction::Lazy) => {
                    if spec.min == 0 {
                        *phase = RepPhase::AfterYield;
                        Act::Yield(Vec::new(), start.clone())
                    } else {
                        self.rep_try_extend(spec, start, frames, parts, phase)
                    }
                }
                (RepPhase::AfterYield, Direction::Greedy) => {
                    self.rep_backtrack(frames, parts, phase)
                }
                (RepPhase::AfterYield, Direction::Lazy) => {
                    self.rep_try_extend(spec, start, frames, parts, phase)
                }
                (RepPhase::Asking, _) => Act::Fail,
            },
            Event::ChildResult(values, state) => {
                parts.push((values, state));
                match direction {
                    Direction::Greedy => {
                        self.rep_extend_or_yield(spec, start, frames, parts, phase)
                    }
                    Direction::Lazy => {
                        if parts.len() >= spec.min {
                            *phase = RepPhase::AfterYield;
                            let (values, state) = rep_prefix(parts, start);
                            Act::Yield(values, state)
                        } else {
                            self.rep_try_extend(spec, start, frames, parts, phase)
                        }
                    }
                }
            }
            Event::ChildFailed => {
                frames.pop();
                match direction {
                    Direction::Greedy => {
                        if parts.len() >= spec.min {
                            *phase = RepPhase::AfterYield;
                            let (values, state) = rep_prefix(parts, start);
                            Act::Yield(values, state)
                        } else {
                            self.rep_backtrack(frames, parts, phase)
                        }
                    }
                    Direction::Lazy => self.rep_backtrack(frames, parts, phase),
                }
            }
        }
    }

    /// Greedy step: go deeper while the bound allows, else yield the
    /// current prefix.
    fn rep_extend_or_yield(
        &mut self,
        spec: &RepeatSpec,
        start: &State,
        frames: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        phase: &mut RepPhase,
    ) -> Act {
        let at_max = spec.max.map_or(false, |max| parts.len() >= max);
        if at_max {
            *phase = RepPhase::AfterYield;
            let (values, state) = rep_prefix(parts, start);
            Act::Yield(values, state)
        } else {
            self.rep_spawn(spec, start, frames, parts, phase)
        }
    }

    /// Lazy step: go deeper while the bound allows, else backtrack.
    fn rep_try_extend(
        &mut self,
        spec: &RepeatSpec,
        start: &State,
        frames: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        phase: &mut RepPhase,
    ) -> Act {
        let at_max = spec.max.map_or(false, |max| parts.len() >= max);
        if at_max {
            self.rep_backtrack(frames, parts, phase)
        } else {
            self.rep_spawn(spec, start, frames, parts, phase)
        }
    }

    fn rep_spawn(
        &mut self,
        spec: &RepeatSpec,
        start: &State,
        frames: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        phase: &mut RepPhase,
    ) -> Act {
        let matcher = if parts.is_empty() {
            spec.first
        } else {
            spec.rest
        };
        let state = parts
            .last()
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| start.clone());
        let child = self.alloc_frame(matcher, state);
        frames.push(child);
        *phase = RepPhase::Asking;
        Act::Ask(child)
    }

    /// Retreat one item and ask it for its next alternative.
    fn rep_backtrack(
        &mut self,
        frames: &mut Vec<FrameId>,
        parts: &mut Vec<MatchItem>,
        phase: &mut RepPhase,
    ) -> Act {
        if parts.is_empty() {
            return Act::Fail;
        }
        parts.pop();
        *phase = RepPhase::Asking;
        match frames.last() {
            Some(&frame) => Act::Ask(frame),
            None => Act::Fail,
        }
    }

    /// Transform, drop, and fault wrappers: pass results through a
    /// reshaping step.
    fn step_wrapper(
        &mut self,
        kind: &MatcherKind,
        start: &State,
        child: &mut Option<FrameId>,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => match child {
                Some(c) => Act::Ask(*c),
                None => {
                    let item = match kind {
                        MatcherKind::Transform(item, _)
                        | MatcherKind::Drop(item)
                        | MatcherKind::Fault { item, .. } => *item,
                        _ => return Act::Fail,
                    };
                    let c = self.alloc_frame(item, start.clone());
                    *child = Some(c);
                    Act::Ask(c)
                }
            },
            Event::ChildResult(values, state) => match kind {
                MatcherKind::Transform(_, f) => Act::Yield((f.0)(values), state),
                MatcherKind::Drop(_) => Act::Yield(Vec::new(), state),
                MatcherKind::Fault { message, .. } => Act::Yield(
                    vec![Value::Diagnostic(Diagnostic::new(
                        message.clone(),
                        start.cursor.location(),
                    ))],
                    state,
                ),
                _ => Act::Fail,
            },
            Event::ChildFailed => Act::Fail,
        }
    }

    /// Zero-width lookahead; the negative form succeeds exactly when the
    /// item fails.
    fn step_lookahead(
        &mut self,
        item: MatcherId,
        negative: bool,
        start: &State,
        child: &mut Option<FrameId>,
        done: &mut bool,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => {
                if *done || child.is_some() {
                    return Act::Fail;
                }
                let c = self.alloc_frame(item, start.clone());
                *child = Some(c);
                Act::Ask(c)
            }
            Event::ChildResult(_, _) => {
                *done = true;
                if negative {
                    self.note_failure(start);
                    Act::Fail
                } else {
                    Act::Yield(Vec::new(), start.clone())
                }
            }
            Event::ChildFailed => {
                *done = true;
                if negative {
                    Act::Yield(Vec::new(), start.clone())
                } else {
                    Act::Fail
                }
            }
        }
    }

    /// Token matcher over a lexed stream: consume one lexeme carrying this
    /// token's label, optionally re-parsing its text with the content
    /// sub-grammar (which must consume the whole lexeme).
    fn step_token(
        &mut self,
        spec: &TokenSpec,
        start: &State,
        child: &mut Option<FrameId>,
        done: &mut bool,
        event: Event,
    ) -> Act {
        let advanced = || State {
            cursor: start.cursor.advance_lexeme(),
            monitor: start.monitor.clone(),
        };
        match event {
            Event::Next => {
                if *done {
                    return Act::Fail;
                }
                if let Some(c) = child {
                    return Act::Ask(*c);
                }
                let matched = match start.cursor.peek_lexeme() {
                    Some(lexeme)
                        if lexeme.kind == LexemeKind::Token
                            && spec.id.map_or(false, |id| lexeme.labels.contains(&id)) =>
                    {
                        Some(lexeme.text.clone())
                    }
                    _ => None,
                };
                match matched {
                    None => {
                        self.note_failure(start);
                        Act::Fail
                    }
                    Some(text) => match spec.content {
                        None => {
                            *done = true;
                            Act::Yield(vec![Value::Str(text)], advanced())
                        }
                        Some(content) => {
                            let content_state = State {
                                cursor: Cursor::Text(TextStream::new(&text)),
                                monitor: start.monitor.clone(),
                            };
                            let c = self.alloc_frame(content, content_state);
                            *child = Some(c);
                            Act::Ask(c)
                        }
                    },
                }
            }
            Event::ChildResult(values, state) => {
                if state.cursor.is_empty() {
                    Act::Yield(values, advanced())
                } else {
                    // Partial content matches are skipped, not errors.
                    match child {
                        Some(c) => Act::Ask(*c),
                        None => Act::Fail,
                    }
                }
            }
            Event::ChildFailed => Act::Fail,
        }
    }

    /// Block: push the level of the upcoming line for the body, pop it on
    /// every result.
    fn step_block(
        &mut self,
        body: MatcherId,
        start: &State,
        child: &mut Option<FrameId>,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => {
                if let Some(c) = child {
                    return Act::Ask(*c);
                }
                let monitor = match &start.monitor {
                    Some(monitor) => monitor.clone(),
                    None => return Act::Error(ParseError::Offside(OffsideError::NotConfigured)),
                };
                let level = match start.cursor.peek_lexeme() {
                    Some(lexeme) if lexeme.kind == LexemeKind::Indent => {
                        indent_width(&lexeme.text, self.config.tab_size)
                    }
                    _ => {
                        self.note_failure(start);
                        return Act::Fail;
                    }
                };
                let body_state = State {
                    cursor: start.cursor.clone(),
                    monitor: Some(monitor.push(level)),
                };
                let c = self.alloc_frame(body, body_state);
                *child = Some(c);
                Act::Ask(c)
            }
            Event::ChildResult(values, state) => {
                let monitor = match &state.monitor {
                    Some(monitor) => monitor,
                    None => return Act::Error(ParseError::Offside(OffsideError::NotConfigured)),
                };
                match monitor.pop() {
                    Ok(popped) => Act::Yield(
                        values,
                        State {
                            cursor: state.cursor,
                            monitor: Some(popped),
                        },
                    ),
                    Err(error) => Act::Error(ParseError::Offside(error)),
                }
            }
            Event::ChildFailed => Act::Fail,
        }
    }

    /// Memoized attempt: replay cached results, extend the shared entry
    /// through its producer frame, curtail on re-entrant extension.
    fn step_memo(
        &mut self,
        matcher: MatcherId,
        start: &State,
        key: &MemoKey,
        index: &mut usize,
        event: Event,
    ) -> Act {
        match event {
            Event::Next => {
                let (cached, complete, running, producer) = match self.memo.get(key) {
                    Some(entry) => (
                        entry.results.get(*index).cloned(),
                        entry.complete,
                        entry.running,
                        entry.producer,
                    ),
                    None => return Act::Fail,
                };
                if let Some((values, state)) = cached {
                    *index += 1;
                    return Act::Yield(values, state);
                }
                if complete || running {
                    // `running` means this key is already being extended
                    // further up the chain: a left-recursive re-entry, which
                    // curtails rather than recursing forever.
                    return Act::Fail;
                }
                let producer = match producer {
                    Some(p) => p,
                    None => self.alloc_producer(matcher, start.clone()),
                };
                if let Some(entry) = self.memo.get_mut(key) {
                    entry.producer = Some(producer);
                    entry.running = true;
                }
                Act::Ask(producer)
            }
            Event::ChildResult(values, state) => {
                if let Some(entry) = self.memo.get_mut(key) {
                    entry.running = false;
                    entry.results.push((values.clone(), state.clone()));
                }
                *index += 1;
                Act::Yield(values, state)
            }
            Event::ChildFailed => {
                if let Some(entry) = self.memo.get_mut(key) {
                    entry.running = false;
                    entry.complete = true;
                }
                Act::Fail
            }
        }
    }
}

fn rep_prefix(parts: &[MatchItem], start: &State) -> (Vec<Value>, State) {
    let values: Vec<Value> = parts.iter().flat_map(|(v, _)| v.iter().cloned()).collect();
    let state = parts
        .last()
        .map(|(_, s)| s.clone())
        .unwrap_or_else(|| start.clone());
    (values, state)
}
