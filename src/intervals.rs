//! Sorted disjoint interval maps.
//!
//! `IntervalMap` associates inclusive `[low, high]` symbol ranges with a
//! value. Ranges are kept disjoint and sorted at all times; inserting over an
//! existing range splits it, and adjacent ranges carrying an equal value are
//! merged back together. Character classes and the per-state transition rows
//! of the DFA are both interval maps.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval<V> {
    low: u32,
    high: u32,
    value: V,
}

/// A mapping from disjoint, sorted inclusive ranges to values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntervalMap<V> {
    entries: Vec<Interval<V>>,
}

impl<V> IntervalMap<V> {
    pub fn new() -> Self {
        IntervalMap {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of disjoint ranges currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up the value attached to the range containing `point`.
    pub fn get(&self, point: u32) -> Option<&V> {
        let idx = self
            .entries
            .partition_point(|iv| iv.high < point);
        match self.entries.get(idx) {
            Some(iv) if iv.low <= point => Some(&iv.value),
            _ => None,
        }
    }

    /// Iterate over `(low, high, value)` triples in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &V)> {
        self.entries.iter().map(|iv| (iv.low, iv.high, &iv.value))
    }
}

impl<V: Clone + PartialEq> IntervalMap<V> {
    /// Insert `[low, high] -> value`, splitting any overlapped ranges and
    /// merging adjacent ranges that end up with an equal value.
    pub fn insert(&mut self, low: u32, high: u32, value: V) {
        assert!(low <= high, "interval bounds out of order");
        self.remove(low, high);
        let idx = self.entries.partition_point(|iv| iv.high < low);
        self.entries.insert(idx, Interval { low, high, value });
        self.coalesce_around(idx);
    }

    /// Remove `[low, high]`, truncating or splitting partially covered
    /// ranges so only the requested span is cleared.
    pub fn remove(&mut self, low: u32, high: u32) {
        assert!(low <= high, "interval bounds out of order");
        let mut replacement: Vec<Interval<V>> = Vec::new();
        for iv in self.entries.drain(..) {
            if iv.high < low || iv.low > high {
                replacement.push(iv);
                continue;
            }
            if iv.low < low {
                replacement.push(Interval {
                    low: iv.low,
                    high: low - 1,
                    value: iv.value.clone(),
                });
            }
            if iv.high > high {
                replacement.push(Interval {
                    low: high + 1,
                    high: iv.high,
                    value: iv.value,
                });
            }
        }
        self.entries = replacement;
    }

    /// Merge the entry at `idx` with equal-valued neighbours that touch it.
    fn coalesce_around(&mut self, idx: usize) {
        // Merge with the following entry first so `idx` stays valid.
        if idx + 1 < self.entries.len() {
            let touching = self.entries[idx].high != u32::MAX
                && self.entries[idx].high + 1 == self.entries[idx + 1].low;
            if touching && self.entries[idx].value == self.entries[idx + 1].value {
                let next = self.entries.remove(idx + 1);
                self.entries[idx].high = next.high;
            }
        }
        if idx > 0 {
            let touching = self.entries[idx - 1].high != u32::MAX
                && self.entries[idx - 1].high + 1 == self.entries[idx].low;
            if touching && self.entries[idx - 1].value == self.entries[idx].value {
                let cur = self.entries.remove(idx);
                self.entries[idx - 1].high = cur.high;
            }
        }
    }
}

impl<V: fmt::Display> fmt::Display for IntervalMap<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, iv) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{},{}]->{}", iv.low, iv.high, iv.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_lookup_grid() {
        let mut map = IntervalMap::new();
        map.insert(1, 2, 12);
        map.insert(4, 5, 45);

        let expected = [
            (0, None),
            (1, Some(12)),
            (2, Some(12)),
            (3, None),
            (4, Some(45)),
            (5, Some(45)),
            (6, None),
        ];
        for (point, want) in expected {
            assert_eq!(map.get(point).copied(), want, "point {}", point);
        }
    }

    #[test]
    fn test_delete_restores_only_deleted_points() {
        let mut map = IntervalMap::new();
        map.insert(1, 2, 12);
        map.insert(4, 5, 45);
        map.remove(1, 2);

        assert_eq!(map.get(1), None);
        assert_eq!(map.get(2), None);
        assert_eq!(map.get(4), Some(&45));
        assert_eq!(map.get(5), Some(&45));
    }

    #[test]
    fn test_insert_splits_overlap() {
        let mut map = IntervalMap::new();
        map.insert(0, 9, 'a');
        map.insert(3, 5, 'b');

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(2), Some(&'a'));
        assert_eq!(map.get(4), Some(&'b'));
        assert_eq!(map.get(6), Some(&'a'));
    }

    #[test]
    fn test_adjacent_equal_values_merge() {
        let mut map = IntervalMap::new();
        map.insert(0, 2, 'x');
        map.insert(3, 5, 'x');
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(0), Some(&'x'));
        assert_eq!(map.get(5), Some(&'x'));

        map.insert(6, 8, 'y');
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_remove_splits_partial_overlap() {
        let mut map = IntervalMap::new();
        map.insert(0, 9, 1);
        map.remove(4, 6);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(3), Some(&1));
        assert_eq!(map.get(5), None);
        assert_eq!(map.get(7), Some(&1));
    }
}
