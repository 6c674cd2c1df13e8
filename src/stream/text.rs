//! Character stream over a source string.

use crate::diagnostics::SourceInfo;
use std::sync::Arc;

#[derive(Debug)]
struct TextData {
    chars: Vec<char>,
    /// Character offsets at which each line begins; always starts with 0.
    line_starts: Vec<usize>,
    filename: Option<String>,
}

/// An immutable, sliceable view over source text with line metadata.
///
/// Slicing produces a new stream sharing the same underlying data, so
/// cursors are cheap to clone and positions always resolve to exact
/// locations in the original source.
#[derive(Debug, Clone)]
pub struct TextStream {
    data: Arc<TextData>,
    offset: usize,
}

impl TextStream {
    pub fn new(source: &str) -> Self {
        Self::with_name(source, None)
    }

    pub fn with_name(source: &str, filename: Option<String>) -> Self {
        let chars: Vec<char> = source.chars().collect();
        let mut line_starts = vec![0];
        for (i, c) in chars.iter().enumerate() {
            if *c == '\n' {
                line_starts.push(i + 1);
            }
        }
        TextStream {
            data: Arc::new(TextData {
                chars,
                line_starts,
                filename,
            }),
            offset: 0,
        }
    }

    /// Remaining character count.
    pub fn len(&self) -> usize {
        self.data.chars.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Absolute character offset in the source.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn data_ptr(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }

    pub fn filename(&self) -> Option<&str> {
        self.data.filename.as_deref()
    }

    /// The character `i` places ahead of the cursor.
    pub fn char_at(&self, i: usize) -> Option<char> {
        self.data.chars.get(self.offset + i).copied()
    }

    /// A new stream advanced by `n` characters (clamped to the end).
    pub fn advance(&self, n: usize) -> TextStream {
        TextStream {
            data: Arc::clone(&self.data),
            offset: (self.offset + n).min(self.data.chars.len()),
        }
    }

    /// Whether the absolute position `i` ahead of the cursor begins a line.
    pub fn at_line_start(&self, i: usize) -> bool {
        let pos = self.offset + i;
        pos == 0 || self.data.chars.get(pos - 1) == Some(&'\n')
    }

    /// Whether the position `i` ahead of the cursor ends a line: the next
    /// character is a newline, or the input is exhausted.
    pub fn at_line_end(&self, i: usize) -> bool {
        let pos = self.offset + i;
        match self.data.chars.get(pos) {
            Some('\n') | None => true,
            Some(_) => false,
        }
    }

    /// Resolve an absolute character offset to a location.
    pub fn location_at(&self, abs_offset: usize) -> SourceInfo {
        let line_idx = self
            .data
            .line_starts
            .partition_point(|s| *s <= abs_offset)
            .saturating_sub(1);
        let line_start = self.data.line_starts[line_idx];
        let line_end = self
            .data
            .line_starts
            .get(line_idx + 1)
            .map(|next| next - 1)
            .unwrap_or(self.data.chars.len());
        let line_text: String = self.data.chars[line_start..line_end].iter().collect();
        SourceInfo::new(
            self.data.filename.clone(),
            line_idx + 1,
            abs_offset - line_start,
            line_text,
        )
    }

    /// Resolve the current position.
    pub fn location(&self) -> SourceInfo {
        self.location_at(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_tracks_lines() {
        let stream = TextStream::new("ab\ncde\nf");
        assert_eq!(stream.location().line_number, 1);
        assert_eq!(stream.location().char_offset, 0);
        assert_eq!(stream.location().line_text, "ab");

        let at_d = stream.advance(4);
        let loc = at_d.location();
        assert_eq!(loc.line_number, 2);
        assert_eq!(loc.char_offset, 1);
        assert_eq!(loc.line_text, "cde");
    }

    #[test]
    fn test_location_at_end_of_input() {
        let stream = TextStream::new("ab\nc");
        let end = stream.advance(4);
        let loc = end.location();
        assert_eq!(loc.line_number, 2);
        assert_eq!(loc.char_offset, 1);
        assert_eq!(loc.line_text, "c");
    }

    #[test]
    fn test_advance_clamps() {
        let stream = TextStream::new("ab");
        let far = stream.advance(10);
        assert!(far.is_empty());
        assert_eq!(far.offset(), 2);
    }

    #[test]
    fn test_filename_carried() {
        let stream = TextStream::with_name("x", Some("demo.txt".to_string()));
        assert_eq!(stream.location().filename.as_deref(), Some("demo.txt"));
    }

    #[test]
    fn test_unicode_offsets_are_character_based() {
        let stream = TextStream::new("aé\nb");
        assert_eq!(stream.char_at(1), Some('é'));
        let second_line = stream.advance(3);
        assert_eq!(second_line.char_at(0), Some('b'));
        assert_eq!(second_line.location().line_number, 2);
    }
}
