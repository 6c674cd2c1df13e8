//! Filtered character stream.
//!
//! Wraps a base text stream and hides or rewrites the characters a mapping
//! function rejects. The kept-offset table maps every filtered position
//! back to a unique base offset, so locations reported from a filtered
//! stream are exact positions in the original source.

use crate::diagnostics::SourceInfo;
use crate::stream::TextStream;
use std::sync::Arc;

#[derive(Debug)]
struct FilteredData {
    base: TextStream,
    /// Base offset and (possibly remapped) character of each survivor.
    kept: Vec<(usize, char)>,
}

/// A text stream with some characters excluded or rewritten.
#[derive(Debug, Clone)]
pub struct FilteredStream {
    data: Arc<FilteredData>,
    offset: usize,
}

impl FilteredStream {
    /// Build a filtered view over `base` keeping only characters the
    /// predicate accepts. Filtering starts at the base stream's current
    /// position.
    pub fn new<F>(base: TextStream, predicate: F) -> Self
    where
        F: Fn(char) -> bool,
    {
        Self::mapped(base, |c| if predicate(c) { Some(c) } else { None })
    }

    /// Build a filtered view that can also rewrite characters: `None`
    /// excludes a character, `Some` replaces it. Locations always report
    /// the underlying base position.
    pub fn mapped<F>(base: TextStream, map: F) -> Self
    where
        F: Fn(char) -> Option<char>,
    {
        let mut kept = Vec::new();
        let start = base.offset();
        let mut i = 0;
        while let Some(c) = base.char_at(i) {
            if let Some(mapped) = map(c) {
                kept.push((start + i, mapped));
            }
            i += 1;
        }
        FilteredStream {
            data: Arc::new(FilteredData { base, kept }),
            offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.kept.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn filtered_offset(&self) -> usize {
        self.offset
    }

    pub fn data_ptr(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }

    /// The base offset this filtered position maps to. Positions past the
    /// end map to the end of the base stream.
    fn base_offset(&self, i: usize) -> usize {
        match self.data.kept.get(self.offset + i) {
            Some((abs, _)) => *abs,
            None => self.data.base.offset() + self.data.base.len(),
        }
    }

    pub fn source_offset(&self) -> usize {
        self.base_offset(0)
    }

    pub fn char_at(&self, i: usize) -> Option<char> {
        self.data.kept.get(self.offset + i).map(|(_, c)| *c)
    }

    pub fn advance(&self, n: usize) -> FilteredStream {
        FilteredStream {
            data: Arc::clone(&self.data),
            offset: (self.offset + n).min(self.data.kept.len()),
        }
    }

    /// Line boundaries are judged at the mapped base position, so anchors
    /// behave as they would on the unfiltered source.
    pub fn at_line_start(&self, i: usize) -> bool {
        let abs = self.base_offset(i);
        let base_rel = abs - self.data.base.offset();
        self.data.base.at_line_start(base_rel)
    }

    pub fn at_line_end(&self, i: usize) -> bool {
        let abs = self.base_offset(i);
        let base_rel = abs - self.data.base.offset();
        self.data.base.at_line_end(base_rel)
    }

    pub fn location(&self) -> SourceInfo {
        self.data.base.location_at(self.base_offset(0))
    }
}
