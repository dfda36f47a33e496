//! Stateless helpers for whitespace-delimited and `Key:\tvalue` kernel text.
//!
//! Multi-line records are never mutated to delimit lines; parsers keep
//! [`Span`]s (offset + length) into the immutable read buffer instead.

use std::str::FromStr;

/// A byte range of one line inside a text buffer, newline excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    /// The text this span covers, or `""` if it falls outside `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start..self.start + self.len).unwrap_or("")
    }

    /// The bytes this span covers, or an empty slice if out of range.
    pub fn slice_bytes<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        bytes.get(self.start..self.start + self.len).unwrap_or(&[])
    }

    /// The covered bytes as text, if they are valid UTF-8.
    pub fn text<'a>(&self, bytes: &'a [u8]) -> Option<&'a str> {
        std::str::from_utf8(self.slice_bytes(bytes)).ok()
    }
}

/// Returns an owned copy of the whitespace-delimited token at `index`
/// (zero-based). Out-of-range indexes yield an empty string.
pub fn extract_field(text: &str, index: usize) -> String {
    text.split_ascii_whitespace()
        .nth(index)
        .map(str::to_owned)
        .unwrap_or_default()
}

/// Parses the token at `index` into `T`.
pub fn parse_field<T: FromStr>(text: &str, index: usize) -> Option<T> {
    text.split_ascii_whitespace().nth(index)?.parse().ok()
}

/// Iterates the lines of `bytes` as spans. A trailing newline does not
/// produce a final empty line. Kernel text may carry non-UTF-8 bytes (a
/// truncated command name), which must not hide the lines after them.
pub fn byte_line_spans(bytes: &[u8]) -> impl Iterator<Item = Span> + '_ {
    let mut start = 0;
    bytes.split_inclusive(|&b| b == b'\n').map(move |raw| {
        let len = if raw.last() == Some(&b'\n') {
            raw.len() - 1
        } else {
            raw.len()
        };
        let span = Span { start, len };
        start += raw.len();
        span
    })
}

/// Value part of any `Key: value` line.
pub fn line_value(line: &str) -> &str {
    line.split_once(':').map_or("", |(_, v)| v.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Tests for extract_field
    // -------------------------------------------------------------------------

    #[test]
    fn test_extract_field_basic() {
        assert_eq!(extract_field("a b  c", 0), "a");
        assert_eq!(extract_field("a b  c", 1), "b");
        assert_eq!(extract_field("a b  c", 2), "c");
    }

    #[test]
    fn test_extract_field_out_of_range() {
        assert_eq!(extract_field("a b", 5), "");
        assert_eq!(extract_field("", 0), "");
        assert_eq!(extract_field("   \n", 0), "");
    }

    #[test]
    fn test_extract_field_stops_at_newline() {
        assert_eq!(extract_field("  12 34\n56", 1), "34");
        assert_eq!(extract_field("  12 34\n56", 2), "56");
    }

    #[test]
    fn test_extract_field_results_are_independent() {
        let first = extract_field("one two", 0);
        let second = extract_field("three four", 1);
        assert_eq!(first, "one");
        assert_eq!(second, "four");
    }

    #[test]
    fn test_parse_field() {
        assert_eq!(parse_field::<u64>("7 8 9", 2), Some(9));
        assert_eq!(parse_field::<u64>("7 x 9", 1), None);
        assert_eq!(parse_field::<u64>("7", 3), None);
    }

    // -------------------------------------------------------------------------
    // Tests for line spans and key/value helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_line_spans() {
        let text = "Name:\tbash\nUid:\t0\n";
        let lines: Vec<&str> = byte_line_spans(text.as_bytes())
            .map(|s| s.slice(text))
            .collect();
        assert_eq!(lines, vec!["Name:\tbash", "Uid:\t0"]);
    }

    #[test]
    fn test_line_spans_without_trailing_newline() {
        let text = "a\nb";
        let lines: Vec<&str> = byte_line_spans(text.as_bytes())
            .map(|s| s.slice(text))
            .collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_byte_line_spans_cross_invalid_utf8() {
        let bytes = b"Name:\tab\xe4\xb8\nUid:\t0\n";
        let spans: Vec<Span> = byte_line_spans(bytes).collect();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(bytes), None);
        assert_eq!(spans[1].text(bytes), Some("Uid:\t0"));
    }

    #[test]
    fn test_span_out_of_bounds_is_empty() {
        let span = Span { start: 10, len: 4 };
        assert_eq!(span.slice("short"), "");
    }
}
