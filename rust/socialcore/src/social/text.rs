//! Offset helpers: grapheme boundaries and byte <-> character-unit conversion.
//!
//! Regex matchers work in UTF-8 byte offsets. Matches are reported to hosts in
//! character units, either Unicode scalar values or UTF-16 code units
//! (JavaScript strings).

use serde::{Deserialize, Serialize};
use unicode_segmentation::GraphemeCursor;

/// Unit in which match offsets are expressed to the host
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OffsetEncoding {
    /// One unit per Unicode scalar value
    #[default]
    CodePoint,
    /// One unit per UTF-16 code unit
    Utf16,
}

impl OffsetEncoding {
    #[inline]
    pub fn unit_len(self, c: char) -> usize {
        match self {
            OffsetEncoding::CodePoint => 1,
            OffsetEncoding::Utf16 => c.len_utf16(),
        }
    }

    /// Length of `s` in this encoding's units
    pub fn count(self, s: &str) -> usize {
        match self {
            OffsetEncoding::CodePoint => s.chars().count(),
            OffsetEncoding::Utf16 => s.encode_utf16().count(),
        }
    }

    /// Byte offset of `unit` in `text`, or `None` if it is past the end or
    /// lands inside a surrogate pair
    pub fn to_byte(self, text: &str, unit: usize) -> Option<usize> {
        let mut units = 0;
        for (byte, c) in text.char_indices() {
            if units == unit {
                return Some(byte);
            }
            units += self.unit_len(c);
            if units > unit {
                return None;
            }
        }
        (units == unit).then_some(text.len())
    }
}

/// True when `byte` sits on an extended grapheme cluster boundary of `text`
pub fn is_grapheme_boundary(text: &str, byte: usize) -> bool {
    if byte == 0 || byte == text.len() {
        return true;
    }
    if byte > text.len() || !text.is_char_boundary(byte) {
        return false;
    }
    GraphemeCursor::new(byte, text.len(), true)
        .is_boundary(text, 0)
        .unwrap_or(false)
}

/// Forward-only byte -> unit converter.
///
/// Positions passed to [`UnitCursor::advance_to`] must be non-decreasing char
/// boundaries; a sorted, non-overlapping match list satisfies this.
pub struct UnitCursor<'a> {
    text: &'a str,
    encoding: OffsetEncoding,
    byte: usize,
    unit: usize,
}

impl<'a> UnitCursor<'a> {
    pub fn new(text: &'a str, encoding: OffsetEncoding) -> Self {
        Self::starting_at(text, encoding, 0, 0)
    }

    /// Resume from a known `(byte, unit)` pair
    pub fn starting_at(text: &'a str, encoding: OffsetEncoding, byte: usize, unit: usize) -> Self {
        Self { text, encoding, byte, unit }
    }

    pub fn advance_to(&mut self, byte: usize) -> usize {
        debug_assert!(byte >= self.byte, "UnitCursor moved backwards");
        self.unit += self.encoding.count(&self.text[self.byte..byte]);
        self.byte = byte;
        self.unit
    }
}
