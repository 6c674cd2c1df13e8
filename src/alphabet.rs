//! Symbol alphabets for the regexp compiler.
//!
//! An alphabet is an ordered, bounded domain of atomic symbols. Patterns and
//! automata are written against an alphabet rather than against `char`
//! directly so the same machinery serves text grammars (Unicode scalar
//! values) and binary grammars (the two-symbol domain {0, 1}).
//!
//! Alphabets are immutable and cheap to share; the two concrete kinds are
//! cached as process-wide singletons so repeated grammar compilation does not
//! reconstruct them.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Unicode surrogate range, excluded from scalar values.
const SURROGATE_LOW: u32 = 0xD800;
const SURROGATE_HIGH: u32 = 0xDFFF;

/// The available alphabet kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlphabetKind {
    /// Unicode scalar values (the default for text grammars).
    Text,
    /// The binary domain {0, 1}.
    Binary,
}

/// An ordered symbol domain with predecessor/successor operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    kind: AlphabetKind,
    min: u32,
    max: u32,
}

static TEXT: Lazy<Alphabet> = Lazy::new(|| Alphabet {
    kind: AlphabetKind::Text,
    min: 0,
    max: 0x10FFFF,
});

static BINARY: Lazy<Alphabet> = Lazy::new(|| Alphabet {
    kind: AlphabetKind::Binary,
    min: 0,
    max: 1,
});

impl Alphabet {
    /// The cached text alphabet.
    pub fn text() -> &'static Alphabet {
        &TEXT
    }

    /// The cached binary alphabet.
    pub fn binary() -> &'static Alphabet {
        &BINARY
    }

    /// Look up the cached singleton for a kind.
    pub fn for_kind(kind: AlphabetKind) -> &'static Alphabet {
        match kind {
            AlphabetKind::Text => Self::text(),
            AlphabetKind::Binary => Self::binary(),
        }
    }

    pub fn kind(&self) -> AlphabetKind {
        self.kind
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether a symbol belongs to the domain. Text excludes the surrogate
    /// range, which is not a valid scalar value.
    pub fn contains(&self, sym: u32) -> bool {
        if sym < self.min || sym > self.max {
            return false;
        }
        match self.kind {
            AlphabetKind::Text => !(SURROGATE_LOW..=SURROGATE_HIGH).contains(&sym),
            AlphabetKind::Binary => true,
        }
    }

    /// The symbol immediately before `sym`, or `None` at the lower bound.
    pub fn predecessor(&self, sym: u32) -> Option<u32> {
        if sym <= self.min || sym > self.max {
            return None;
        }
        let prev = sym - 1;
        match self.kind {
            AlphabetKind::Text if (SURROGATE_LOW..=SURROGATE_HIGH).contains(&prev) => {
                Some(SURROGATE_LOW - 1)
            }
            _ => Some(prev),
        }
    }

    /// The symbol immediately after `sym`, or `None` at the upper bound.
    pub fn successor(&self, sym: u32) -> Option<u32> {
        if sym >= self.max {
            return None;
        }
        let next = sym + 1;
        match self.kind {
            AlphabetKind::Text if (SURROGATE_LOW..=SURROGATE_HIGH).contains(&next) => {
                Some(SURROGATE_HIGH + 1)
            }
            _ => Some(next),
        }
    }

    /// Map an input character to a symbol of this alphabet.
    ///
    /// For text this is the scalar value; for binary only '0' and '1' encode.
    pub fn encode(&self, c: char) -> Option<u32> {
        match self.kind {
            AlphabetKind::Text => Some(c as u32),
            AlphabetKind::Binary => match c {
                '0' => Some(0),
                '1' => Some(1),
                _ => None,
            },
        }
    }

    /// Complement a set of sorted, disjoint inclusive ranges within the
    /// domain bounds. Used for negated character classes.
    pub fn complement(&self, ranges: &[(u32, u32)]) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut next = self.min;
        for &(low, high) in ranges {
            if low > next {
                out.push((next, low - 1));
            }
            match self.successor(high) {
                Some(s) => next = s.max(next),
                None => return out,
            }
        }
        if next <= self.max {
            out.push((next, self.max));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_are_shared() {
        assert!(std::ptr::eq(Alphabet::text(), Alphabet::text()));
        assert!(std::ptr::eq(
            Alphabet::for_kind(AlphabetKind::Binary),
            Alphabet::binary()
        ));
    }

    #[test]
    fn test_text_skips_surrogates() {
        let a = Alphabet::text();
        assert_eq!(a.successor(0xD7FF), Some(0xE000));
        assert_eq!(a.predecessor(0xE000), Some(0xD7FF));
        assert!(!a.contains(0xD800));
        assert!(a.contains('a' as u32));
    }

    #[test]
    fn test_binary_bounds() {
        let b = Alphabet::binary();
        assert_eq!(b.min(), 0);
        assert_eq!(b.max(), 1);
        assert_eq!(b.successor(0), Some(1));
        assert_eq!(b.successor(1), None);
        assert_eq!(b.predecessor(0), None);
        assert_eq!(b.encode('1'), Some(1));
        assert_eq!(b.encode('x'), None);
    }

    #[test]
    fn test_complement_of_ranges() {
        let b = Alphabet::binary();
        assert_eq!(b.complement(&[(0, 0)]), vec![(1, 1)]);
        assert_eq!(b.complement(&[]), vec![(0, 1)]);
        assert_eq!(b.complement(&[(0, 1)]), Vec::<(u32, u32)>::new());

        let t = Alphabet::text();
        let comp = t.complement(&[('b' as u32, 'd' as u32)]);
        assert_eq!(comp[0], (0, 'a' as u32));
        assert_eq!(comp[1], ('e' as u32, 0x10FFFF));
    }
}
