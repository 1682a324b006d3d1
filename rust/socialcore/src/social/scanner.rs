//! Scanner - one pass of every enabled recognizer over the text
//!
//! Each recognizer runs independently; the candidates are merged and
//! cross-recognizer overlaps are resolved left to right:
//! 1. earlier start wins
//! 2. then the longer span
//! 3. then the lower priority rank
//!
//! Losers are dropped whole. A recognizer whose output breaks a character or
//! grapheme boundary is excluded from this pass only.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

use super::error::{OffsetFault, SocialError};
use super::registry::{Recognizer, RecognizerHandle, RecognizerKind};
use super::text::{is_grapheme_boundary, OffsetEncoding, UnitCursor};

// ==================== TYPE DEFINITIONS ====================

/// One located token. Offsets are character units, end exclusive.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub kind: RecognizerKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub recognizer_id: RecognizerHandle,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn overlaps(&self, other: &Match) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Token body: hashtags and mentions without their leading symbol
    pub fn value(&self) -> &str {
        match self.kind.sigil_len() {
            0 => &self.text,
            _ => {
                let skip = self.text.chars().next().map_or(0, char::len_utf8);
                &self.text[skip..]
            }
        }
    }

    pub(crate) fn shifted(&self, delta: isize) -> Match {
        Match {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
            ..self.clone()
        }
    }
}

/// Sorted, non-overlapping matches from one scan
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct MatchSet(Vec<Match>);

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap matches already in scanner order
    pub(crate) fn from_sorted(matches: Vec<Match>) -> Self {
        let set = Self(matches);
        debug_assert!(set.is_well_formed(), "MatchSet invariant violated");
        set
    }

    /// Sorted by start, every match non-empty, no overlaps
    pub fn is_well_formed(&self) -> bool {
        self.0.iter().all(|m| m.start < m.end)
            && self.0.windows(2).all(|w| w[0].start < w[1].start && !w[0].overlaps(&w[1]))
    }

    /// Match covering `offset`, by binary search
    pub fn locate(&self, offset: usize) -> Option<&Match> {
        let idx = self.0.partition_point(|m| m.start <= offset);
        idx.checked_sub(1)
            .map(|i| &self.0[i])
            .filter(|m| m.contains(offset))
    }

    pub fn of_kind<'a>(&'a self, kind: &RecognizerKind) -> impl Iterator<Item = &'a Match> + 'a {
        let kind = kind.clone();
        self.0.iter().filter(move |m| m.kind == kind)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Match] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Match> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Region of the text to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWindow {
    /// Byte range; spans starting inside it are collected
    pub bytes: Range<usize>,
    /// Unit offset of `bytes.start`
    pub unit_start: usize,
}

impl ScanWindow {
    pub fn full(text: &str) -> Self {
        Self { bytes: 0..text.len(), unit_start: 0 }
    }
}

/// Result of one scan pass
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub matches: MatchSet,
    /// One `MalformedMatchOffset` per excluded recognizer
    pub excluded: Vec<SocialError>,
    /// Cancelled before completion; `matches` is meaningless
    pub cancelled: bool,
    pub elapsed_us: u64,
}

#[derive(Debug)]
struct Candidate {
    span: Range<usize>,
    rank: (i64, RecognizerHandle),
    recognizer: usize,
}

// ==================== MAIN IMPLEMENTATION ====================

/// Stateless scanner parameterised by the host's offset unit
#[derive(Debug, Clone, Copy, Default)]
pub struct Scanner {
    encoding: OffsetEncoding,
}

impl Scanner {
    pub fn new(encoding: OffsetEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> OffsetEncoding {
        self.encoding
    }

    /// Full-text scan
    pub fn scan(&self, text: &str, recognizers: &[Arc<Recognizer>]) -> ScanReport {
        self.scan_window(text, recognizers, &ScanWindow::full(text), &|| false)
    }

    /// Scan only spans starting in `window`. `is_cancelled` is polled between
    /// recognizers.
    pub fn scan_window(
        &self,
        text: &str,
        recognizers: &[Arc<Recognizer>],
        window: &ScanWindow,
        is_cancelled: &dyn Fn() -> bool,
    ) -> ScanReport {
        let started = instant::Instant::now();
        let mut report = ScanReport::default();
        let mut candidates = Vec::new();

        for (idx, recognizer) in recognizers.iter().enumerate() {
            if is_cancelled() {
                report.cancelled = true;
                return report;
            }

            let spans = recognizer.matcher().find_spans(text, window.bytes.clone());
            if let Err(fault) = validate_spans(text, &spans) {
                report.excluded.push(SocialError::MalformedMatchOffset {
                    recognizer: recognizer.handle(),
                    kind: recognizer.kind().clone(),
                    fault,
                });
                continue;
            }

            let rank = recognizer.rank();
            candidates.extend(spans.into_iter().map(|span| Candidate { span, rank, recognizer: idx }));
        }

        let kept = resolve_overlaps(candidates);

        let mut cursor = UnitCursor::starting_at(text, self.encoding, window.bytes.start, window.unit_start);
        let matches = kept
            .into_iter()
            .map(|c| {
                let recognizer = &recognizers[c.recognizer];
                let start = cursor.advance_to(c.span.start);
                let end = cursor.advance_to(c.span.end);
                Match {
                    kind: recognizer.kind().clone(),
                    start,
                    end,
                    text: text[c.span].to_string(),
                    recognizer_id: recognizer.handle(),
                }
            })
            .collect();

        report.matches = MatchSet::from_sorted(matches);
        report.elapsed_us = started.elapsed().as_micros() as u64;
        report
    }
}

/// Check one recognizer's output against the matcher contract
fn validate_spans(text: &str, spans: &[Range<usize>]) -> Result<(), OffsetFault> {
    let mut previous_end = 0;
    for span in spans {
        if span.start >= span.end {
            return Err(OffsetFault::Empty { start: span.start, end: span.end });
        }
        if span.end > text.len() {
            return Err(OffsetFault::OutOfBounds { end: span.end, len: text.len() });
        }
        if span.start < previous_end {
            return Err(OffsetFault::Unordered { start: span.start, previous_end });
        }
        for at in [span.start, span.end] {
            if !text.is_char_boundary(at) {
                return Err(OffsetFault::SplitsCharacter(at));
            }
            if !is_grapheme_boundary(text, at) {
                return Err(OffsetFault::SplitsGrapheme(at));
            }
        }
        previous_end = span.end;
    }
    Ok(())
}

/// Left-to-right sweep: earlier start, then longer, then lower rank
fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(b.span.end.cmp(&a.span.end))
            .then(a.rank.cmp(&b.rank))
    });

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match kept.last() {
            Some(last) if candidate.span.start < last.span.end => {}
            _ => kept.push(candidate),
        }
    }
    kept
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::config::SocialConfig;
    use crate::social::registry::{Matcher, PatternRegistry};
    use crate::social::style::StyleDescriptor;

    fn default_recognizers() -> Vec<Arc<Recognizer>> {
        PatternRegistry::from_config(&SocialConfig::default()).unwrap().enabled()
    }

    fn summary(set: &MatchSet) -> Vec<(&str, usize, usize)> {
        set.iter().map(|m| (m.text.as_str(), m.start, m.end)).collect()
    }

    #[derive(Debug)]
    struct FixedSpans(Vec<Range<usize>>);

    impl Matcher for FixedSpans {
        fn find_spans(&self, _text: &str, _window: Range<usize>) -> Vec<Range<usize>> {
            self.0.clone()
        }
    }

    fn fixed(id: &str, handle: u32, spans: Vec<Range<usize>>) -> Arc<Recognizer> {
        let mut registry = PatternRegistry::default();
        for i in 0..handle {
            registry
                .register(Recognizer::custom(&format!("pad{}", i), "z", StyleDescriptor::default()).unwrap())
                .unwrap();
        }
        let recognizer = Recognizer::new(
            RecognizerKind::Custom(id.to_string()),
            Arc::new(FixedSpans(spans)),
            StyleDescriptor::default(),
        );
        let handle = registry.register(recognizer).unwrap();
        Arc::new(registry.get(handle).unwrap().clone())
    }

    #[test]
    fn test_scan_social_sentence() {
        let text = "check #rust and @alice at http://x.io";
        let report = Scanner::default().scan(text, &default_recognizers());

        assert!(report.excluded.is_empty());
        assert_eq!(
            summary(&report.matches),
            vec![("#rust", 6, 11), ("@alice", 16, 22), ("http://x.io", 26, 37)]
        );
        let kinds: Vec<&RecognizerKind> = report.matches.iter().map(|m| &m.kind).collect();
        assert_eq!(kinds, vec![&RecognizerKind::Hashtag, &RecognizerKind::Mention, &RecognizerKind::Url]);
    }

    #[test]
    fn test_url_swallows_inner_hashtag() {
        let text = "go https://site.io/#top now";
        let report = Scanner::default().scan(text, &default_recognizers());
        assert_eq!(summary(&report.matches), vec![("https://site.io/#top", 3, 23)]);
    }

    #[test]
    fn test_offsets_are_character_indices() {
        let text = "héllo #wörld";
        let report = Scanner::default().scan(text, &default_recognizers());
        assert_eq!(summary(&report.matches), vec![("#wörld", 6, 12)]);

        let utf16 = Scanner::new(OffsetEncoding::Utf16).scan("😀 @bob", &default_recognizers());
        assert_eq!(summary(&utf16.matches), vec![("@bob", 3, 7)]);
    }

    #[test]
    fn test_longer_earlier_candidate_wins() {
        // "e#alice" from a custom pattern vs "#alice" from the hashtag recognizer
        let text = "name#alice";
        let mut recognizers = default_recognizers();
        recognizers.push(fixed("wide", 3, vec![3..10]));

        let report = Scanner::default().scan(text, &recognizers);
        assert_eq!(summary(&report.matches), vec![("e#alice", 3, 10)]);
        assert_eq!(report.matches.as_slice()[0].kind, RecognizerKind::Custom("wide".into()));
    }

    #[test]
    fn test_same_span_tie_goes_to_lower_rank() {
        let text = "token";
        let a = fixed("a", 0, vec![0..5]);
        let b = fixed("b", 1, vec![0..5]);

        let report = Scanner::default().scan(text, &[b.clone(), a.clone()]);
        assert_eq!(report.matches.as_slice()[0].kind, RecognizerKind::Custom("a".into()));
    }

    #[test]
    fn test_loser_is_dropped_not_truncated() {
        let text = "abcdefgh";
        let a = fixed("a", 0, vec![0..4]);
        let b = fixed("b", 1, vec![2..8]);

        let report = Scanner::default().scan(text, &[a, b]);
        assert_eq!(summary(&report.matches), vec![("abcd", 0, 4)]);
    }

    #[test]
    fn test_chain_keeps_non_overlapping_tail() {
        let text = "0123456789";
        let a = fixed("a", 0, vec![0..5]);
        let b = fixed("b", 1, vec![3..10]);
        let c = fixed("c", 2, vec![6..8]);

        let report = Scanner::default().scan(text, &[a, b, c]);
        assert_eq!(summary(&report.matches), vec![("01234", 0, 5), ("67", 6, 8)]);
    }

    #[test]
    fn test_malformed_recognizer_excluded_alone() {
        // 'é' is two bytes; byte 8 sits inside it
        let text = "#ok café";
        let mut recognizers = default_recognizers();
        recognizers.push(fixed("broken", 3, vec![4..8]));

        let report = Scanner::default().scan(text, &recognizers);
        assert_eq!(summary(&report.matches), vec![("#ok", 0, 3)]);
        assert_eq!(report.excluded.len(), 1);
        assert!(matches!(
            &report.excluded[0],
            SocialError::MalformedMatchOffset { fault: OffsetFault::SplitsCharacter(8), .. }
        ));
    }

    #[test]
    fn test_grapheme_split_is_malformed() {
        let text = "cafe\u{301}";
        let report = Scanner::default().scan(text, &[fixed("split", 0, vec![0..4])]);
        assert!(report.matches.is_empty());
        assert!(matches!(
            &report.excluded[0],
            SocialError::MalformedMatchOffset { fault: OffsetFault::SplitsGrapheme(4), .. }
        ));
    }

    #[test]
    fn test_unordered_and_out_of_bounds_are_malformed() {
        let text = "abcdef";
        let report = Scanner::default().scan(
            text,
            &[fixed("overlap", 0, vec![0..3, 2..4]), fixed("oob", 1, vec![4..9])],
        );
        assert!(report.matches.is_empty());
        assert_eq!(report.excluded.len(), 2);
    }

    #[test]
    fn test_cancelled_scan_stops_early() {
        let report = Scanner::default().scan_window(
            "#a",
            &default_recognizers(),
            &ScanWindow::full("#a"),
            &|| true,
        );
        assert!(report.cancelled);
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_locate() {
        let text = "#one two @three";
        let set = Scanner::default().scan(text, &default_recognizers()).matches;

        for offset in 0..4 {
            assert_eq!(set.locate(offset).map(|m| m.text.as_str()), Some("#one"));
        }
        for offset in 4..9 {
            assert!(set.locate(offset).is_none(), "offset {} should miss", offset);
        }
        assert_eq!(set.locate(9).map(|m| m.value()), Some("three"));
        assert!(set.locate(15).is_none());
    }

    #[test]
    fn test_value_strips_sigil() {
        let set = Scanner::default().scan("＃全角tag @me www.a.io", &default_recognizers()).matches;
        let values: Vec<&str> = set.iter().map(|m| m.value()).collect();
        assert_eq!(values, vec!["me", "www.a.io"]);
    }
}
