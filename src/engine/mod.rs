//! Trampolined execution engine.
//!
//! A compiled grammar runs without host-stack recursion: every matcher
//! attempt is a frame in a per-run arena, and a driver loop resumes frames
//! with explicit events instead of nested calls. A frame asked for its
//! next result either delegates to a child frame, yields a
//! `(values, state)` pair, or reports exhaustion; the driver keeps the
//! current delegation chain on an explicit stack, so grammar depth and
//! input length never grow the host call stack.
//!
//! Backtracking falls out of the frame protocol: a frame that has yielded
//! stays alive and can be asked again for its next alternative. The engine
//! optionally bounds the number of live suspended frames (evicting the
//! least recently resumed, deterministically) and memoizes attempts keyed
//! by matcher identity, stream position, and indentation context.

mod frames;

use crate::config::EngineConfig;
use crate::diagnostics::SourceInfo;
use crate::grammar::{Grammar, MatcherId, MatcherKind, Value};
use crate::offside::BlockMonitor;
use crate::parser::ParseError;
use crate::regexp::Nfa;
use crate::stream::Cursor;
use frames::FrameState;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-branch parse state: the cursor plus the indentation monitor, when an
/// offside policy is configured. Threading the monitor with the cursor
/// keeps backtracking and concurrent parses free of shared mutable state.
#[derive(Debug, Clone)]
pub struct State {
    pub cursor: Cursor,
    pub monitor: Option<BlockMonitor>,
}

/// One successful derivation: the result values and the remaining state.
pub type MatchItem = (Vec<Value>, State);

pub(crate) type FrameId = usize;

/// How a frame is resumed.
pub(crate) enum Event {
    /// Produce your next result (first or subsequent).
    Next,
    /// The child you asked yielded a result.
    ChildResult(Vec<Value>, State),
    /// The child you asked is exhausted.
    ChildFailed,
}

/// What a resumed frame wants the driver to do.
pub(crate) enum Act {
    /// Resume this child frame with `Next`.
    Ask(FrameId),
    Yield(Vec<Value>, State),
    Fail,
    Error(ParseError),
}

/// Outcome reported to the instrumentation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    Attempt,
    Yielded,
    Failed,
}

/// One instrumentation event: which matcher, where, and what happened.
#[derive(Debug, Clone)]
pub struct TraceEvent {
    pub matcher: MatcherId,
    pub kind: &'static str,
    pub offset: usize,
    pub outcome: TraceOutcome,
}

/// Opt-in callback invoked on every match attempt, success, and failure.
pub type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

pub(crate) struct Frame {
    pub matcher: MatcherId,
    pub state: FrameState,
    pub start: State,
    pub exhausted: bool,
    pub last_resumed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    matcher: MatcherId,
    stream: usize,
    offset: usize,
    monitor: Option<Vec<usize>>,
}

#[derive(Default)]
pub(crate) struct MemoEntry {
    pub results: Vec<MatchItem>,
    pub complete: bool,
    pub running: bool,
    pub producer: Option<FrameId>,
}

/// A single match run over one input.
pub struct Engine {
    pub(crate) grammar: Arc<Grammar>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) automata: Arc<HashMap<MatcherId, Arc<Nfa>>>,
    pub(crate) frames: Vec<Frame>,
    stack: Vec<FrameId>,
    pub(crate) memo: HashMap<MemoKey, MemoEntry>,
    furthest: Option<Cursor>,
    clock: u64,
    live: usize,
    finished: bool,
    trace: Option<TraceHook>,
}

impl Engine {
    pub(crate) fn new(
        grammar: Arc<Grammar>,
        config: Arc<EngineConfig>,
        automata: Arc<HashMap<MatcherId, Arc<Nfa>>>,
        trace: Option<TraceHook>,
        root: MatcherId,
        start: State,
    ) -> Engine {
        let mut engine = Engine {
            grammar,
            config,
            automata,
            frames: Vec::new(),
            stack: Vec::new(),
            memo: HashMap::new(),
            furthest: None,
            clock: 0,
            live: 0,
            finished: false,
            trace,
        };
        let root_frame = engine.alloc_frame(root, start);
        engine.stack.push(root_frame);
        engine
    }

    /// Drive the trampoline until the root yields its next derivation,
    /// exhausts, or a hard error surfaces.
    pub(crate) fn next_result(&mut self) -> Result<Option<MatchItem>, ParseError> {
        if self.finished {
            return Ok(None);
        }
        let mut event = Event::Next;
        loop {
            let active = *self.stack.last().expect("driver stack is never empty");
            let act = if self.frames[active].exhausted {
                Act::Fail
            } else {
                self.clock += 1;
                self.frames[active].last_resumed = self.clock;
                self.step(active, event)
            };
            match act {
                Act::Ask(child) => {
                    if self.frames[child].exhausted {
                        event = Event::ChildFailed;
                    } else {
                        self.stack.push(child);
                        event = Event::Next;
                    }
                }
                Act::Yield(values, state) => {
                    self.emit_trace(active, TraceOutcome::Yielded);
                    if self.stack.len() == 1 {
                        return Ok(Some((values, state)));
                    }
                    self.stack.pop();
                    event = Event::ChildResult(values, state);
                }
                Act::Fail => {
                    if !self.frames[active].exhausted {
                        self.frames[active].exhausted = true;
                        self.live -= 1;
                        self.emit_trace(active, TraceOutcome::Failed);
                    }
                    if self.stack.len() == 1 {
                        self.finished = true;
                        return Ok(None);
                    }
                    self.stack.pop();
                    event = Event::ChildFailed;
                }
                Act::Error(error) => {
                    self.finished = true;
                    return Err(error);
                }
            }
        }
    }

    /// Location of the furthest position any branch failed at, for the
    /// full-first-match error.
    pub(crate) fn furthest_location(&self) -> Option<SourceInfo> {
        self.furthest.as_ref().map(|cursor| cursor.location())
    }

    /// Allocate a frame for a matcher attempt, interposing memoization for
    /// composite kinds when configured, and applying the queue bound.
    pub(crate) fn alloc_frame(&mut self, matcher: MatcherId, start: State) -> FrameId {
        let resolved = self.grammar.resolve(matcher);
        let state = if self.config.memoize && Self::memoizable(self.grammar.kind(resolved)) {
            let (stream, offset) = start.cursor.position_key();
            let key = MemoKey {
                matcher: resolved,
                stream,
                offset,
                monitor: start.monitor.as_ref().map(|m| m.levels().to_vec()),
            };
            self.memo.entry(key.clone()).or_default();
            FrameState::Memo { key, index: 0 }
        } else {
            frames::initial_state(self.grammar.kind(resolved))
        };

        self.clock += 1;
        let id = self.frames.len();
        self.frames.push(Frame {
            matcher: resolved,
            state,
            start,
            exhausted: false,
            last_resumed: self.clock,
        });
        self.live += 1;
        self.emit_trace(id, TraceOutcome::Attempt);
        self.enforce_queue_bound(id);
        id
    }

    /// Allocate the non-memoized frame behind a memo entry.
    pub(crate) fn alloc_producer(&mut self, matcher: MatcherId, start: State) -> FrameId {
        let state = frames::initial_state(self.grammar.kind(matcher));
        self.clock += 1;
        let id = self.frames.len();
        self.frames.push(Frame {
            matcher,
            state,
            start,
            exhausted: false,
            last_resumed: self.clock,
        });
        self.live += 1;
        self.enforce_queue_bound(id);
        id
    }

    fn memoizable(kind: &MatcherKind) -> bool {
        matches!(
            kind,
            MatcherKind::Sequence(_)
                | MatcherKind::Choice(_)
                | MatcherKind::Repeat(_)
                | MatcherKind::Transform(_, _)
                | MatcherKind::Drop(_)
                | MatcherKind::Lookahead { .. }
                | MatcherKind::Token(_)
                | MatcherKind::Fault { .. }
                | MatcherKind::Block { .. }
                | MatcherKind::Regexp(_)
        )
    }

    /// Cap the number of live suspended frames. The victim is the least
    /// recently resumed frame off the active chain, ties broken by the
    /// smaller frame id, so truncation is deterministic for a fixed bound.
    fn enforce_queue_bound(&mut self, newest: FrameId) {
        let bound = self.config.queue_bound;
        if bound == 0 {
            return;
        }
        loop {
            let suspended = self
                .live
                .saturating_sub(self.stack.len())
                .saturating_sub(1); // the frame being allocated
            if suspended <= bound {
                return;
            }
            let victim = self
                .frames
                .iter()
                .enumerate()
                .filter(|(id, frame)| {
                    !frame.exhausted && *id != newest && !self.stack.contains(id)
                })
                .min_by_key(|(id, frame)| (frame.last_resumed, *id))
                .map(|(id, _)| id);
            match victim {
                Some(id) => {
                    log::debug!(
                        "queue bound {} reached; evicting suspended frame {} ({})",
                        bound,
                        id,
                        self.grammar.kind(self.frames[id].matcher).name()
                    );
                    self.frames[id].exhausted = true;
                    self.live -= 1;
                }
                None => return,
            }
        }
    }

    /// Record a failure position for furthest-failure reporting.
    pub(crate) fn note_failure(&mut self, state: &State) {
        let offset = state.cursor.source_offset();
        let beat = match &self.furthest {
            Some(current) => offset > current.source_offset(),
            None => true,
        };
        if beat {
            self.furthest = Some(state.cursor.clone());
        }
    }

    fn emit_trace(&self, frame: FrameId, outcome: TraceOutcome) {
        if let Some(hook) = &self.trace {
            let frame = &self.frames[frame];
            hook(&TraceEvent {
                matcher: frame.matcher,
                kind: self.grammar.kind(frame.matcher).name(),
                offset: frame.start.cursor.source_offset(),
                outcome,
            });
        }
    }
}
