//! SpanReconciler - minimal patch between two MatchSets
//!
//! Matches are equal only when kind, offsets, recognizer and text all agree.
//! A match that kept its position but changed text is removed and re-added;
//! appliers never see partial edits.

use serde::{Deserialize, Serialize};

use super::scanner::{Match, MatchSet};

/// Styling changes for one reconciliation, consumed once
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    pub to_remove: Vec<Match>,
    pub to_add: Vec<Match>,
    pub to_keep: Vec<Match>,
}

impl Patch {
    /// No annotation changes
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    pub fn summary(&self) -> PatchSummary {
        PatchSummary {
            removed: self.to_remove.len(),
            added: self.to_add.len(),
            kept: self.to_keep.len(),
        }
    }
}

/// Counts from an applied patch
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchSummary {
    pub removed: usize,
    pub added: usize,
    pub kept: usize,
}

/// Two-pointer merge over both sorted sets. O(n + m) in match counts.
pub fn diff(previous: &MatchSet, next: &MatchSet) -> Patch {
    let (old, new) = (previous.as_slice(), next.as_slice());
    let mut patch = Patch::default();
    let (mut i, mut j) = (0, 0);

    while i < old.len() && j < new.len() {
        let (a, b) = (&old[i], &new[j]);
        if a.start < b.start {
            patch.to_remove.push(a.clone());
            i += 1;
        } else if b.start < a.start {
            patch.to_add.push(b.clone());
            j += 1;
        } else {
            // Starts are unique within a set, so this pairs the candidates
            if a == b {
                patch.to_keep.push(b.clone());
            } else {
                patch.to_remove.push(a.clone());
                patch.to_add.push(b.clone());
            }
            i += 1;
            j += 1;
        }
    }
    patch.to_remove.extend_from_slice(&old[i..]);
    patch.to_add.extend_from_slice(&new[j..]);

    patch
}
