//! Incremental re-scan: only the tokens touched by an edit
//!
//! # Architecture
//! - **Snapshot diffing**: common prefix/suffix of old and new text gives the
//!   changed byte region
//! - **Token expansion**: the region grows to the nearest whitespace on each
//!   side, so no token-local match can straddle the window edge
//! - **Coordinate shifting**: previous matches after the window move by the
//!   edit's unit delta
//!
//! Windowed output is identical to a full scan as long as every enabled
//! recognizer is token-local; the controller falls back to a full scan
//! otherwise.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::scanner::{MatchSet, ScanWindow};
use super::text::OffsetEncoding;

/// Windows wider than this share of the text are scanned in full
const MAX_WINDOW_RATIO: f64 = 0.5;

// =============================================================================
// Core Types
// =============================================================================

/// Host-reported edit in character units (start, removed count, inserted
/// count)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl TextEdit {
    pub fn new(start: usize, removed: usize, inserted: usize) -> Self {
        Self { start, removed, inserted }
    }

    /// Caret position after the edit, `None` if the hint overflows
    pub fn caret(&self) -> Option<usize> {
        self.start.checked_add(self.inserted)
    }
}

/// Changed byte region between two snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    /// Length of the common prefix
    pub prefix: usize,
    /// End of the changed region in the old text
    pub old_end: usize,
    /// End of the changed region in the new text
    pub new_end: usize,
}

impl Delta {
    /// Diff two snapshots; bounds land on char boundaries
    pub fn between(old: &str, new: &str) -> Self {
        let (a, b) = (old.as_bytes(), new.as_bytes());

        let mut prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
        while !new.is_char_boundary(prefix) {
            prefix -= 1;
        }

        let max_suffix = a.len().min(b.len()) - prefix;
        let mut suffix = a
            .iter()
            .rev()
            .zip(b.iter().rev())
            .take(max_suffix)
            .take_while(|(x, y)| x == y)
            .count();
        while !new.is_char_boundary(new.len() - suffix) {
            suffix -= 1;
        }

        Self {
            prefix,
            old_end: old.len() - suffix,
            new_end: new.len() - suffix,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.old_end == self.prefix && self.new_end == self.prefix
    }
}

/// Where to re-scan and how to carry the rest of the previous matches over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowPlan {
    /// Window in the new text
    pub window: ScanWindow,
    /// Same region in the old text, in units
    pub old_units: Range<usize>,
    /// Unit shift applied to matches after the window
    pub unit_delta: isize,
}

impl WindowPlan {
    /// Expand `delta` to whole tokens. Returns `None` when the window would be
    /// large enough that a full scan costs about the same.
    pub fn expand(old: &str, new: &str, delta: &Delta, encoding: OffsetEncoding) -> Option<Self> {
        let start = new[..delta.prefix]
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let end = new[delta.new_end..]
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, _)| delta.new_end + i)
            .unwrap_or(new.len());

        if !new.is_empty() && (end - start) as f64 > new.len() as f64 * MAX_WINDOW_RATIO {
            return None;
        }

        // Bytes from `end` onward are the shared suffix
        let old_end = end + old.len() - new.len();

        let unit_start = encoding.count(&new[..start]);
        let new_units_end = unit_start + encoding.count(&new[start..end]);
        let old_units_end = unit_start + encoding.count(&old[start..old_end]);

        Some(Self {
            window: ScanWindow { bytes: start..end, unit_start },
            old_units: unit_start..old_units_end,
            unit_delta: new_units_end as isize - old_units_end as isize,
        })
    }

    /// Previous matches outside the window, shifted, around `window_matches`
    pub fn splice(&self, previous: &MatchSet, window_matches: MatchSet) -> MatchSet {
        let before = previous.iter().filter(|m| m.end <= self.old_units.start).cloned();
        let after = previous
            .iter()
            .filter(|m| m.start >= self.old_units.end)
            .map(|m| m.shifted(self.unit_delta));

        MatchSet::from_sorted(before.chain(window_matches.into_vec()).chain(after).collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
