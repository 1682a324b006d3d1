//! Tap dispatch and typing watchers.
//!
//! Listeners are keyed by [`RecognizerKind`]; custom recognizers by their id.
//! A missing listener is a no-op. A failing listener (error or panic) is
//! contained here and reported, never propagated to the touch caller.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use super::diagnostics::Diagnostics;
use super::error::SocialError;
use super::registry::RecognizerKind;
use super::scanner::Match;

/// Tap callback: `(text, start, end)`
pub type Listener = Box<dyn FnMut(&str, usize, usize) -> Result<(), String>>;

/// Typing callback: the partial word after `#` / `@`
pub type Watcher = Box<dyn FnMut(&str) -> Result<(), String>>;

/// Result of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired,
    NoListener,
    Failed,
}

#[derive(Default)]
pub struct Dispatcher {
    listeners: HashMap<RecognizerKind, Listener>,
    watchers: HashMap<RecognizerKind, Watcher>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("watchers", &self.watchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace (Some) or clear (None) the tap listener for `kind`
    pub fn set_listener(&mut self, kind: RecognizerKind, listener: Option<Listener>) {
        match listener {
            Some(listener) => self.listeners.insert(kind, listener),
            None => self.listeners.remove(&kind),
        };
    }

    pub fn set_watcher(&mut self, kind: RecognizerKind, watcher: Option<Watcher>) {
        match watcher {
            Some(watcher) => self.watchers.insert(kind, watcher),
            None => self.watchers.remove(&kind),
        };
    }

    pub fn has_listener(&self, kind: &RecognizerKind) -> bool {
        self.listeners.contains_key(kind)
    }

    /// Invoke the listener for `m.kind` synchronously
    pub fn fire(&mut self, m: &Match, diagnostics: &mut Diagnostics) -> FireOutcome {
        let Some(listener) = self.listeners.get_mut(&m.kind) else {
            return FireOutcome::NoListener;
        };
        let result = contain(|| listener(&m.text, m.start, m.end));
        settle(&m.kind, result, diagnostics)
    }

    /// Notify the watcher for the token being typed at `caret` (byte offset)
    pub fn notify_typing(
        &mut self,
        text: &str,
        caret: usize,
        is_enabled: impl Fn(&RecognizerKind) -> bool,
        diagnostics: &mut Diagnostics,
    ) -> FireOutcome {
        let Some((kind, word)) = typing_token(text, caret) else {
            return FireOutcome::NoListener;
        };
        if !is_enabled(&kind) {
            return FireOutcome::NoListener;
        }
        let Some(watcher) = self.watchers.get_mut(&kind) else {
            return FireOutcome::NoListener;
        };
        let result = contain(|| watcher(word));
        settle(&kind, result, diagnostics)
    }
}

/// Run a host callback, turning panics into errors
fn contain(f: impl FnOnce() -> Result<(), String>) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "listener panicked".to_string())),
    }
}

fn settle(kind: &RecognizerKind, result: Result<(), String>, diagnostics: &mut Diagnostics) -> FireOutcome {
    match result {
        Ok(()) => FireOutcome::Fired,
        Err(message) => {
            diagnostics.report(SocialError::ListenerFailure { kind: kind.clone(), message });
            FireOutcome::Failed
        }
    }
}

/// `#word` or `@word` ending exactly at `caret`, with its kind
pub fn typing_token(text: &str, caret: usize) -> Option<(RecognizerKind, &str)> {
    if caret > text.len() || !text.is_char_boundary(caret) {
        return None;
    }
    let head = &text[..caret];
    let word_start = head
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(i, c)| (i, c, i + c.len_utf8()))?;

    let (_, sigil, start) = word_start;
    let word = &head[start..];
    if word.is_empty() {
        return None;
    }
    match sigil {
        '#' | '＃' => Some((RecognizerKind::Hashtag, word)),
        '@' => Some((RecognizerKind::Mention, word)),
        _ => None,
    }
}
