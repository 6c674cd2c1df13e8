//! Source locations and diagnostic values.
//!
//! Every failure surface in the crate reports the same location shape:
//! filename, 1-based line number, 0-based character offset within the line,
//! and the text of the line itself. Diagnostics are also ordinary match
//! values (see the fault combinator), so grammars can carry recoverable
//! errors through a parse instead of aborting it.

use serde::Serialize;
use std::fmt;

/// A resolved source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub filename: Option<String>,
    /// 1-based line number.
    pub line_number: usize,
    /// 0-based character offset within the line.
    pub char_offset: usize,
    /// The text of the line the location falls on.
    pub line_text: String,
}

impl SourceInfo {
    pub fn new(
        filename: Option<String>,
        line_number: usize,
        char_offset: usize,
        line_text: String,
    ) -> Self {
        SourceInfo {
            filename,
            line_number,
            char_offset,
            line_text,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filename {
            Some(name) => write!(f, "{}:{}:{}", name, self.line_number, self.char_offset),
            None => write!(f, "{}:{}", self.line_number, self.char_offset),
        }
    }
}

/// A diagnostic produced by a fault matcher and carried as a match value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub location: SourceInfo,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, location: SourceInfo) -> Self {
        Diagnostic {
            message: message.into(),
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.location)
    }
}

/// Format source context around a line: two lines before, the line itself
/// marked with `>>`, and two lines after, all numbered.
pub fn format_source_context(source: &str, line_number: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let error_line = line_number.saturating_sub(1);

    let start_line = error_line.saturating_sub(2);
    let end_line = (error_line + 3).min(lines.len());

    let mut context = String::new();
    for line_idx in start_line..end_line {
        let marker = if line_idx == error_line { ">>" } else { "  " };
        context.push_str(&format!(
            "{} {:3} | {}\n",
            marker,
            line_idx + 1,
            lines[line_idx]
        ));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_info_display() {
        let info = SourceInfo::new(Some("input.txt".to_string()), 3, 7, "abc".to_string());
        assert_eq!(format!("{}", info), "input.txt:3:7");

        let anon = SourceInfo::new(None, 1, 0, "abc".to_string());
        assert_eq!(format!("{}", anon), "1:0");
    }

    #[test]
    fn test_format_source_context_marks_line() {
        let source = "one\ntwo\nthree\nfour\nfive\nsix";
        let context = format_source_context(source, 4);
        assert!(context.contains(">>   4 | four"));
        assert!(context.contains("two"));
        assert!(context.contains("six"));
        assert!(!context.contains("one\n>>"));
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            "unexpected trailing comma",
            SourceInfo::new(None, 2, 4, "a, b,".to_string()),
        );
        assert_eq!(format!("{}", diag), "unexpected trailing comma at 2:4");
    }
}
