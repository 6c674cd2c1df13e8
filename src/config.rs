//! Engine configuration.
//!
//! Configuration is plain data applied before a grammar's first execution:
//! it selects the alphabet, the lexer discard pattern, the backtracking
//! bound and memoization, the default repetition direction, whether the
//! top-level parse must consume the whole stream, and the offside policy.

use crate::alphabet::AlphabetKind;
use serde::{Deserialize, Serialize};

/// Backtracking order for repetitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Longest repetition count first, then decreasing.
    Greedy,
    /// Shortest repetition count first, then increasing.
    Lazy,
}

/// Settings applied to a grammar at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbol domain for patterns and tokens.
    pub alphabet: AlphabetKind,
    /// Lexer discard pattern; `None` selects the default whitespace run.
    pub discard: Option<String>,
    /// Cap on in-flight backtracking continuations; 0 means unbounded.
    pub queue_bound: usize,
    /// Cache (matcher, position, context) attempts during a parse.
    pub memoize: bool,
    /// Default repetition direction where a matcher does not override it.
    pub direction: Direction,
    /// Whether `parse` must consume the entire stream.
    pub full_match: bool,
    /// Tab expansion width for indentation comparisons; `None` counts a tab
    /// as a single column.
    pub tab_size: Option<usize>,
    /// Enable offside lexing and establish the initial indentation level.
    pub block_policy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            alphabet: AlphabetKind::Text,
            discard: None,
            queue_bound: 0,
            memoize: false,
            direction: Direction::Greedy,
            full_match: true,
            tab_size: Some(8),
            block_policy: false,
        }
    }
}

impl EngineConfig {
    pub fn with_alphabet(mut self, alphabet: AlphabetKind) -> Self {
        self.alphabet = alphabet;
        self
    }

    pub fn with_discard(mut self, pattern: &str) -> Self {
        self.discard = Some(pattern.to_string());
        self
    }

    pub fn with_queue_bound(mut self, bound: usize) -> Self {
        self.queue_bound = bound;
        self
    }

    pub fn with_memoize(mut self, on: bool) -> Self {
        self.memoize = on;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_full_match(mut self, required: bool) -> Self {
        self.full_match = required;
        self
    }

    pub fn with_tab_size(mut self, size: Option<usize>) -> Self {
        self.tab_size = size;
        self
    }

    pub fn with_block_policy(mut self, on: bool) -> Self {
        self.block_policy = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.alphabet, AlphabetKind::Text);
        assert_eq!(config.queue_bound, 0);
        assert!(!config.memoize);
        assert_eq!(config.direction, Direction::Greedy);
        assert!(config.full_match);
    }

    #[test]
    fn test_config_round_trips_through_serde() {
        let config = EngineConfig::default()
            .with_queue_bound(16)
            .with_block_policy(true)
            .with_discard("[ ]+");
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
