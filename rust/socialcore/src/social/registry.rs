//! PatternRegistry - ordered set of recognizers
//!
//! Built-in recognizers (hashtag, mention, URL) are registered first and can
//! only be disabled. Custom recognizers are appended in registration order,
//! which is also their default tie-break priority.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::config::{CustomPattern, SocialConfig};
use super::error::{Result, SocialError};
use super::style::StyleDescriptor;
use super::text::is_grapheme_boundary;

// ==================== BUILT-IN PATTERNS ====================

/// `#` or full-width `＃`, then a word with at least one letter or underscore.
/// Trailing combining marks stay attached to the word.
pub const HASHTAG_PATTERN: &str =
    r"(?i)[#＃][0-9A-Z_À-ÖØ-öø-ÿ]*[A-Z_]+[a-z0-9_üÀ-ÖØ-öø-ÿ\p{M}]*";

/// `@` followed by the same word shape as hashtags
pub const MENTION_PATTERN: &str =
    r"(?i)@[0-9A-Z_À-ÖØ-öø-ÿ]*[A-Z_]+[a-z0-9_üÀ-ÖØ-öø-ÿ\p{M}]*";

/// Scheme- or `www.`-prefixed run of non-space characters, or a bare host
/// (`rust-lang.org`, `example.com:8080/path`) ending in a common generic TLD
/// or a two-letter country code. Trailing punctuation excluded.
pub const URL_PATTERN: &str = concat!(
    r#"(?i)\b(?:"#,
    r#"(?:(?:https?|ftp)://|www\.)[^\s<>"]*[^\s<>"'.,;:!?)\]}]"#,
    r#"|(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+"#,
    r#"(?:com|org|net|edu|gov|mil|int|info|biz|name|pro|io|dev|app|ai|xyz|tech|site|online|blog|shop|cloud|[a-z]{2})\b"#,
    r#"(?::\d{1,5})?(?:/(?:[^\s<>"]*[^\s<>"'.,;:!?)\]}])?)?"#,
    r#")"#,
);

// ==================== TYPE DEFINITIONS ====================

/// What a recognizer finds
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerKind {
    Hashtag,
    Mention,
    Url,
    Custom(String),
}

impl RecognizerKind {
    pub fn is_builtin(&self) -> bool {
        !matches!(self, RecognizerKind::Custom(_))
    }

    /// Parse a host-facing name: `hashtag`, `mention`, `url`, anything else is
    /// a custom id
    pub fn from_name(name: &str) -> Self {
        match name {
            "hashtag" => RecognizerKind::Hashtag,
            "mention" => RecognizerKind::Mention,
            "url" | "hyperlink" => RecognizerKind::Url,
            other => RecognizerKind::Custom(other.to_string()),
        }
    }

    /// Leading symbol stripped by [`crate::Match::value`]
    pub(crate) fn sigil_len(&self) -> usize {
        match self {
            RecognizerKind::Hashtag | RecognizerKind::Mention => 1,
            _ => 0,
        }
    }
}

impl std::fmt::Display for RecognizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognizerKind::Hashtag => write!(f, "hashtag"),
            RecognizerKind::Mention => write!(f, "mention"),
            RecognizerKind::Url => write!(f, "url"),
            RecognizerKind::Custom(id) => write!(f, "custom:{}", id),
        }
    }
}

/// Stable id of a registered recognizer
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecognizerHandle(pub u32);

/// Finds spans in text.
///
/// Spans are UTF-8 byte ranges into `text`, ascending and non-overlapping.
/// Only spans *starting* inside `window` are reported; the whole text is
/// passed so lookaround sees real context.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    fn find_spans(&self, text: &str, window: Range<usize>) -> Vec<Range<usize>>;

    /// True when no span can ever contain whitespace. Only token-local
    /// matchers are eligible for windowed re-scans.
    fn is_token_local(&self) -> bool {
        false
    }
}

/// Regex-backed matcher with leftmost, non-overlapping semantics
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    token_local: bool,
    grapheme_safe: bool,
}

impl RegexMatcher {
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            token_local: false,
            grapheme_safe: false,
        })
    }

    /// Declare that matches never span whitespace
    pub fn token_local(mut self, yes: bool) -> Self {
        self.token_local = yes;
        self
    }

    /// Silently drop individual matches that would split a grapheme cluster
    /// instead of reporting them
    pub fn grapheme_safe(mut self, yes: bool) -> Self {
        self.grapheme_safe = yes;
        self
    }
}

impl Matcher for RegexMatcher {
    fn find_spans(&self, text: &str, window: Range<usize>) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        let mut pos = window.start;

        while pos <= text.len() {
            let Some(m) = self.regex.find_at(text, pos) else { break };
            if m.start() >= window.end {
                break;
            }
            if m.is_empty() {
                // Step past the empty match by one character
                match text[m.end()..].chars().next() {
                    Some(c) => pos = m.end() + c.len_utf8(),
                    None => break,
                }
                continue;
            }
            pos = m.end();

            if self.grapheme_safe
                && !(is_grapheme_boundary(text, m.start()) && is_grapheme_boundary(text, m.end()))
            {
                continue;
            }
            spans.push(m.range());
        }

        spans
    }

    fn is_token_local(&self) -> bool {
        self.token_local
    }
}

/// A registered pattern + style
#[derive(Debug, Clone)]
pub struct Recognizer {
    handle: RecognizerHandle,
    kind: RecognizerKind,
    matcher: Arc<dyn Matcher>,
    style: StyleDescriptor,
    priority: Option<i32>,
}

impl Recognizer {
    pub fn new(kind: RecognizerKind, matcher: Arc<dyn Matcher>, style: StyleDescriptor) -> Self {
        Self {
            handle: RecognizerHandle(u32::MAX),
            kind,
            matcher,
            style,
            priority: None,
        }
    }

    /// Custom regex recognizer
    pub fn custom(id: &str, pattern: &str, style: StyleDescriptor) -> Result<Self> {
        let matcher = RegexMatcher::new(pattern).map_err(|e| SocialError::InvalidPattern {
            id: id.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(RecognizerKind::Custom(id.to_string()), Arc::new(matcher), style))
    }

    pub fn from_pattern(pattern: &CustomPattern) -> Result<Self> {
        let mut recognizer = Self::custom(&pattern.id, &pattern.regex, pattern.style.clone())?;
        recognizer.priority = pattern.priority;
        Ok(recognizer)
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn handle(&self) -> RecognizerHandle {
        self.handle
    }

    pub fn kind(&self) -> &RecognizerKind {
        &self.kind
    }

    pub fn matcher(&self) -> &dyn Matcher {
        self.matcher.as_ref()
    }

    pub fn style(&self) -> &StyleDescriptor {
        &self.style
    }

    /// Tie-break rank: explicit priority, else registration index.
    /// Handle breaks remaining ties.
    pub fn rank(&self) -> (i64, RecognizerHandle) {
        let priority = self.priority.map(i64::from).unwrap_or(self.handle.0 as i64);
        (priority, self.handle)
    }
}

fn builtin(kind: RecognizerKind, pattern: &str, style: &StyleDescriptor) -> Result<Recognizer> {
    let matcher = RegexMatcher::new(pattern)
        .map_err(|e| SocialError::InvalidPattern {
            id: kind.to_string(),
            message: e.to_string(),
        })?
        .grapheme_safe(true);
    // Overrides may contain whitespace; only the shipped patterns are token-local
    let token_local = matches!(pattern, HASHTAG_PATTERN | MENTION_PATTERN | URL_PATTERN);
    Ok(Recognizer::new(kind, Arc::new(matcher.token_local(token_local)), style.clone()))
}

// ==================== SCAN GUARD ====================

/// Marks a scan as in flight for as long as it is alive
#[derive(Debug)]
pub struct ScanGuard {
    counter: Arc<AtomicUsize>,
}

impl ScanGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter: Arc::clone(counter) }
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

// ==================== REGISTRY ====================

#[derive(Debug, Clone)]
struct Entry {
    recognizer: Arc<Recognizer>,
    enabled: bool,
}

/// Ordered recognizer set with enable flags
#[derive(Debug)]
pub struct PatternRegistry {
    entries: Vec<Entry>,
    next_handle: u32,
    /// Bumped whenever the scan-relevant set changes
    revision: u64,
    in_flight: Arc<AtomicUsize>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_handle: 0,
            revision: 0,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PatternRegistry {
    /// Registry with the three built-ins followed by the config's custom
    /// patterns
    pub fn from_config(config: &SocialConfig) -> Result<Self> {
        config.validate()?;
        let mut registry = Self::default();

        let hashtag = config.hashtag_pattern.as_deref().unwrap_or(HASHTAG_PATTERN);
        let mention = config.mention_pattern.as_deref().unwrap_or(MENTION_PATTERN);
        registry.insert(builtin(RecognizerKind::Hashtag, hashtag, &config.hashtag_style)?, config.hashtag_enabled);
        registry.insert(builtin(RecognizerKind::Mention, mention, &config.mention_style)?, config.mention_enabled);
        registry.insert(builtin(RecognizerKind::Url, URL_PATTERN, &config.url_style)?, config.url_enabled);

        for pattern in &config.custom_patterns {
            registry.register(Recognizer::from_pattern(pattern)?)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, mut recognizer: Recognizer, enabled: bool) -> RecognizerHandle {
        let handle = RecognizerHandle(self.next_handle);
        self.next_handle += 1;
        recognizer.handle = handle;
        self.entries.push(Entry {
            recognizer: Arc::new(recognizer),
            enabled,
        });
        self.revision += 1;
        handle
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.in_flight.load(Ordering::Acquire) {
            0 => Ok(()),
            in_flight => Err(SocialError::ConcurrentRegistryMutation { in_flight }),
        }
    }

    fn position(&self, kind: &RecognizerKind) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.recognizer.kind() == kind)
            .ok_or_else(|| SocialError::UnknownRecognizer(kind.to_string()))
    }

    /// Append a custom recognizer
    pub fn register(&mut self, recognizer: Recognizer) -> Result<RecognizerHandle> {
        self.ensure_idle()?;
        match recognizer.kind() {
            RecognizerKind::Custom(id) => {
                if self.entries.iter().any(|e| e.recognizer.kind() == recognizer.kind()) {
                    return Err(SocialError::DuplicateCustomId(id.clone()));
                }
            }
            kind => {
                return Err(SocialError::InvalidConfig(format!(
                    "{} is built in and already registered",
                    kind
                )))
            }
        }
        Ok(self.insert(recognizer, true))
    }

    /// Remove a custom recognizer
    pub fn unregister(&mut self, handle: RecognizerHandle) -> Result<Arc<Recognizer>> {
        self.ensure_idle()?;
        let idx = self
            .entries
            .iter()
            .position(|e| e.recognizer.handle() == handle)
            .ok_or_else(|| SocialError::UnknownRecognizer(format!("handle {}", handle.0)))?;
        let kind = self.entries[idx].recognizer.kind();
        if kind.is_builtin() {
            return Err(SocialError::BuiltinNotRemovable(kind.clone()));
        }
        self.revision += 1;
        Ok(self.entries.remove(idx).recognizer)
    }

    /// Toggle participation in scanning. Returns the previous state.
    pub fn enable(&mut self, kind: &RecognizerKind, enabled: bool) -> Result<bool> {
        self.ensure_idle()?;
        let idx = self.position(kind)?;
        let was = std::mem::replace(&mut self.entries[idx].enabled, enabled);
        if was != enabled {
            self.revision += 1;
        }
        Ok(was)
    }

    /// Replace a recognizer's style. Does not affect scanning.
    pub fn set_style(&mut self, kind: &RecognizerKind, style: StyleDescriptor) -> Result<()> {
        self.ensure_idle()?;
        let idx = self.position(kind)?;
        Arc::make_mut(&mut self.entries[idx].recognizer).style = style;
        Ok(())
    }

    pub fn is_enabled(&self, kind: &RecognizerKind) -> bool {
        self.entries.iter().any(|e| e.enabled && e.recognizer.kind() == kind)
    }

    pub fn get(&self, handle: RecognizerHandle) -> Option<&Recognizer> {
        self.entries
            .iter()
            .map(|e| e.recognizer.as_ref())
            .find(|r| r.handle() == handle)
    }

    pub fn find(&self, kind: &RecognizerKind) -> Option<&Recognizer> {
        self.entries
            .iter()
            .map(|e| e.recognizer.as_ref())
            .find(|r| r.kind() == kind)
    }

    /// Snapshot of enabled recognizers in registration order
    pub fn enabled(&self) -> Vec<Arc<Recognizer>> {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .map(|e| Arc::clone(&e.recognizer))
            .collect()
    }

    pub fn all_token_local(&self) -> bool {
        self.entries
            .iter()
            .filter(|e| e.enabled)
            .all(|e| e.recognizer.matcher().is_token_local())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Mark a scan as outstanding until the guard drops
    pub fn guard(&self) -> ScanGuard {
        ScanGuard::new(&self.in_flight)
    }
}

// ==================== TESTS ====================
