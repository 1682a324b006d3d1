//! ChangeController - the façade a host drives on every text change
//!
//! # Pipeline
//! text change → Scanner (windowed or full) → `reconcile::diff` → StyleApplier
//!
//! # Usage
//! ```rust
//! use socialcore::{ChangeController, MemoryApplier, SocialConfig};
//!
//! let mut view = ChangeController::bind(SocialConfig::default(), MemoryApplier::new(), "hi #rust")?;
//! view.on_text_changed("hi #rust @bob", None);
//! assert_eq!(view.mentions(), vec!["bob"]);
//! let applier = view.unbind();
//! assert!(applier.is_empty());
//! # Ok::<(), socialcore::SocialError>(())
//! ```
//!
//! Scans run inline by default. Hosts that want them off the UI thread take a
//! [`ScanTicket`] with [`ChangeController::begin_scan`], run it anywhere, and
//! hand the [`ScanOutcome`] back to [`ChangeController::commit`]. A result is
//! applied only if no text change happened since dispatch.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::config::{CustomPattern, SocialConfig};
use super::diagnostics::{Diagnostic, Diagnostics, RescanReason};
use super::dispatch::{Dispatcher, FireOutcome};
use super::error::{Result, SocialError};
use super::incremental::{Delta, TextEdit, WindowPlan};
use super::reconcile::{diff, PatchSummary};
use super::registry::{PatternRegistry, Recognizer, RecognizerHandle, RecognizerKind, ScanGuard};
use super::scanner::{Match, MatchSet, ScanReport, ScanWindow, Scanner};
use super::style::{StyleApplier, StyleDescriptor};

// =============================================================================
// Types
// =============================================================================

/// What `on_text_changed` did with the edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Scanned and reconciled
    Applied(PatchSummary),
    /// Identical to the current snapshot; nothing scanned
    Unchanged,
    /// Held for the debounce window; see [`ChangeController::poll`]
    Deferred,
}

/// Counters for the lifetime of one binding
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    pub full_scans: u64,
    pub windowed_scans: u64,
    pub skipped: u64,
    pub deferred: u64,
    pub stale_discarded: u64,
    pub last_scan_us: u64,
    pub total_scan_us: u64,
}

/// Current text, last applied matches, generation
#[derive(Debug)]
struct EngineState {
    text: String,
    len_units: usize,
    matches: MatchSet,
    generation: Arc<AtomicU64>,
    /// Registry revision the matches were computed against
    scanned_revision: u64,
    /// Last scan dropped some recognizer's output
    had_exclusions: bool,
}

impl EngineState {
    fn new() -> Self {
        Self {
            text: String::new(),
            len_units: 0,
            matches: MatchSet::new(),
            generation: Arc::new(AtomicU64::new(0)),
            scanned_revision: 0,
            had_exclusions: false,
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Debounced edit waiting to be scanned
#[derive(Debug)]
struct PendingEdit {
    text: String,
    /// Byte offset of the caret after an insertion
    caret: Option<usize>,
    due: instant::Instant,
}

// =============================================================================
// Off-thread scanning
// =============================================================================

/// A full scan captured at dispatch time. `Send`; run it on any thread.
///
/// While a ticket (or its outcome) is alive the registry refuses mutation.
#[derive(Debug)]
pub struct ScanTicket {
    text: String,
    recognizers: Vec<Arc<Recognizer>>,
    scanner: Scanner,
    dispatched: u64,
    generation: Arc<AtomicU64>,
    guard: ScanGuard,
}

impl ScanTicket {
    /// Generation this ticket was dispatched at
    pub fn generation(&self) -> u64 {
        self.dispatched
    }

    /// A text change has happened since dispatch
    pub fn is_stale(&self) -> bool {
        self.generation.load(Ordering::Acquire) != self.dispatched
    }

    /// Scan the captured text; stops early once the ticket goes stale
    pub fn run(self) -> ScanOutcome {
        let ScanTicket { text, recognizers, scanner, dispatched, generation, guard } = self;
        let report = scanner.scan_window(
            &text,
            &recognizers,
            &ScanWindow::full(&text),
            &|| generation.load(Ordering::Acquire) != dispatched,
        );
        ScanOutcome { text, dispatched, report, _guard: guard }
    }
}

/// Result of [`ScanTicket::run`], to be handed to [`ChangeController::commit`]
#[derive(Debug)]
pub struct ScanOutcome {
    text: String,
    dispatched: u64,
    report: ScanReport,
    _guard: ScanGuard,
}

impl ScanOutcome {
    pub fn generation(&self) -> u64 {
        self.dispatched
    }

    /// The scan gave up because the ticket went stale
    pub fn is_cancelled(&self) -> bool {
        self.report.cancelled
    }
}

/// Result of a commit
#[derive(Debug)]
pub enum CommitStatus {
    Applied(PatchSummary),
    /// Discarded; a fresh ticket for the current text
    Stale { rescan: ScanTicket },
}

// =============================================================================
// ChangeController
// =============================================================================

/// One bound text surface
pub struct ChangeController<A: StyleApplier> {
    config: SocialConfig,
    registry: PatternRegistry,
    scanner: Scanner,
    applier: A,
    state: EngineState,
    pending: Option<PendingEdit>,
    dispatcher: Dispatcher,
    diagnostics: Diagnostics,
    stats: ControllerStats,
}

impl<A: StyleApplier + std::fmt::Debug> std::fmt::Debug for ChangeController<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeController")
            .field("registry", &self.registry)
            .field("applier", &self.applier)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<A: StyleApplier> ChangeController<A> {
    // ==================== LIFECYCLE ====================

    /// Build the registry from `config`, scan `initial_text` and style it
    pub fn bind(config: SocialConfig, applier: A, initial_text: &str) -> Result<Self> {
        let registry = PatternRegistry::from_config(&config)?;
        let mut controller = Self {
            scanner: Scanner::new(config.offset_encoding),
            diagnostics: Diagnostics::new(config.debug),
            config,
            registry,
            applier,
            state: EngineState::new(),
            pending: None,
            dispatcher: Dispatcher::new(),
            stats: ControllerStats::default(),
        };
        controller.state.text = initial_text.to_string();
        controller.rescan(RescanReason::Bind);
        Ok(controller)
    }

    /// Remove every live annotation and hand the applier back
    pub fn unbind(mut self) -> A {
        for m in self.state.matches.iter() {
            self.applier.remove(m);
        }
        self.applier
    }

    // ==================== TEXT CHANGES ====================

    /// Feed the host's new text. `edit` is only a caret hint for typing
    /// watchers; the changed region is always derived from the snapshots.
    pub fn on_text_changed(&mut self, new_text: &str, edit: Option<TextEdit>) -> Outcome {
        let visible = self.pending.as_ref().map_or(self.state.text.as_str(), |p| p.text.as_str());
        if visible == new_text {
            self.stats.skipped += 1;
            self.diagnostics.emit(Diagnostic::ScanSkipped);
            return Outcome::Unchanged;
        }

        let caret = self.caret_after(visible, new_text, edit);
        self.state.advance();

        if let Some(window) = self.config.debounce() {
            self.pending = Some(PendingEdit {
                text: new_text.to_string(),
                caret,
                due: instant::Instant::now() + window,
            });
            self.stats.deferred += 1;
            return Outcome::Deferred;
        }

        self.pending = None;
        Outcome::Applied(self.apply_text(new_text.to_string(), caret))
    }

    /// Wholesale replacement: every annotation is dropped and the text is
    /// scanned from scratch
    pub fn replace_text(&mut self, new_text: &str) -> PatchSummary {
        self.state.advance();
        self.pending = None;
        for m in std::mem::take(&mut self.state.matches).iter() {
            self.applier.remove(m);
        }
        self.state.text = new_text.to_string();
        self.rescan(RescanReason::Replaced)
    }

    /// Apply a debounced edit now, if one is held
    pub fn flush(&mut self) -> Option<PatchSummary> {
        let pending = self.pending.take()?;
        Some(self.apply_text(pending.text, pending.caret))
    }

    /// Apply a debounced edit whose window has elapsed
    pub fn poll(&mut self) -> Option<PatchSummary> {
        let due = self.pending.as_ref()?.due;
        if instant::Instant::now() < due {
            return None;
        }
        self.flush()
    }

    /// Time left before a held edit becomes due
    pub fn pending_for(&self) -> Option<Duration> {
        let now = instant::Instant::now();
        self.pending
            .as_ref()
            .map(|p| if p.due > now { p.due - now } else { Duration::ZERO })
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    // ==================== OFF-THREAD SCANNING ====================

    /// Capture the current text (including any held edit) for a full scan
    pub fn begin_scan(&mut self) -> ScanTicket {
        let text = self.pending.as_ref().map_or(&self.state.text, |p| &p.text).clone();
        ScanTicket {
            text,
            recognizers: self.registry.enabled(),
            scanner: self.scanner,
            dispatched: self.state.generation(),
            generation: Arc::clone(&self.state.generation),
            guard: self.registry.guard(),
        }
    }

    /// Apply an outcome if its generation is still current
    pub fn commit(&mut self, outcome: ScanOutcome) -> CommitStatus {
        let current = self.state.generation();
        if outcome.dispatched != current || outcome.report.cancelled {
            self.stats.stale_discarded += 1;
            self.diagnostics.emit(Diagnostic::StaleScanDiscarded {
                dispatched: outcome.dispatched,
                current,
            });
            drop(outcome);
            return CommitStatus::Stale { rescan: self.begin_scan() };
        }

        let ScanOutcome { text, report, _guard: guard, .. } = outcome;
        drop(guard);
        // Same generation, so a held edit (if any) is exactly this text
        let caret = self.pending.take().and_then(|p| p.caret);
        self.state.text = text;
        self.record(&report, true);
        let summary = self.reconcile(report.matches);
        self.notify_typing(caret);
        CommitStatus::Applied(summary)
    }

    // ==================== REGISTRY ====================

    /// Add a custom recognizer and rescan
    pub fn register(&mut self, recognizer: Recognizer) -> Result<RecognizerHandle> {
        let handle = self.registry.register(recognizer)?;
        self.rescan(RescanReason::RegistryChanged);
        Ok(handle)
    }

    pub fn register_pattern(&mut self, pattern: &CustomPattern) -> Result<RecognizerHandle> {
        self.register(Recognizer::from_pattern(pattern)?)
    }

    /// Remove a custom recognizer; its annotations go with it
    pub fn unregister(&mut self, handle: RecognizerHandle) -> Result<()> {
        self.registry.unregister(handle)?;
        self.rescan(RescanReason::RegistryChanged);
        Ok(())
    }

    /// Toggle a recognizer. A no-op toggle does not rescan.
    pub fn enable(&mut self, kind: &RecognizerKind, enabled: bool) -> Result<()> {
        if self.registry.enable(kind, enabled)? != enabled {
            self.rescan(RescanReason::RegistryChanged);
        }
        Ok(())
    }

    /// Restyle every live match of `kind`
    pub fn set_style(&mut self, kind: &RecognizerKind, style: StyleDescriptor) -> Result<()> {
        self.registry.set_style(kind, style.clone())?;
        for m in self.state.matches.of_kind(kind) {
            self.applier.remove(m);
            self.applier.apply(m, &style);
        }
        Ok(())
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    // ==================== TOUCH AND LISTENERS ====================

    /// Match covering `offset` in the last applied snapshot
    pub fn locate(&self, offset: usize) -> Option<&Match> {
        self.state.matches.locate(offset)
    }

    /// Locate and fire. `None` when nothing is under `offset`.
    pub fn on_touch(&mut self, offset: usize) -> Option<FireOutcome> {
        let m = self.state.matches.locate(offset)?;
        Some(self.dispatcher.fire(m, &mut self.diagnostics))
    }

    pub fn set_listener<F>(&mut self, kind: RecognizerKind, listener: F)
    where
        F: FnMut(&str, usize, usize) -> std::result::Result<(), String> + 'static,
    {
        self.dispatcher.set_listener(kind, Some(Box::new(listener)));
    }

    pub fn clear_listener(&mut self, kind: RecognizerKind) {
        self.dispatcher.set_listener(kind, None);
    }

    /// Called with the partial word while a hashtag or mention is typed
    pub fn set_watcher<F>(&mut self, kind: RecognizerKind, watcher: F) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<(), String> + 'static,
    {
        match kind {
            RecognizerKind::Hashtag | RecognizerKind::Mention => {
                self.dispatcher.set_watcher(kind, Some(Box::new(watcher)));
                Ok(())
            }
            other => Err(SocialError::InvalidConfig(format!("no typing watcher for {}", other))),
        }
    }

    pub fn clear_watcher(&mut self, kind: RecognizerKind) {
        self.dispatcher.set_watcher(kind, None);
    }

    pub fn set_diagnostics(&mut self, sink: impl FnMut(&Diagnostic) + 'static) {
        self.diagnostics.set_sink(sink);
    }

    pub fn set_error_observer(&mut self, observer: impl FnMut(&SocialError) + 'static) {
        self.diagnostics.set_error_observer(observer);
    }

    // ==================== ACCESSORS ====================

    pub fn hashtags(&self) -> Vec<&str> {
        self.values_of(&RecognizerKind::Hashtag)
    }

    pub fn mentions(&self) -> Vec<&str> {
        self.values_of(&RecognizerKind::Mention)
    }

    pub fn hyperlinks(&self) -> Vec<&str> {
        self.values_of(&RecognizerKind::Url)
    }

    fn values_of(&self, kind: &RecognizerKind) -> Vec<&str> {
        if !self.registry.is_enabled(kind) {
            return Vec::new();
        }
        self.state.matches.of_kind(kind).map(Match::value).collect()
    }

    pub fn matches(&self) -> &MatchSet {
        &self.state.matches
    }

    /// Last applied snapshot
    pub fn text(&self) -> &str {
        &self.state.text
    }

    /// Snapshot length in offset units
    pub fn text_len(&self) -> usize {
        self.state.len_units
    }

    pub fn generation(&self) -> u64 {
        self.state.generation()
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn config(&self) -> &SocialConfig {
        &self.config
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    // ==================== INTERNALS ====================

    /// Caret byte offset in `new` after an edit: end of the insertion, or
    /// the deletion point
    fn caret_after(&self, old: &str, new: &str, edit: Option<TextEdit>) -> Option<usize> {
        match edit {
            Some(edit) if edit.inserted == 0 && edit.removed == 0 => None,
            Some(edit) => self.scanner.encoding().to_byte(new, edit.caret()?),
            None => {
                let delta = Delta::between(old, new);
                (delta.new_end > delta.prefix || delta.old_end > delta.prefix).then_some(delta.new_end)
            }
        }
    }

    /// Why the next scan cannot be windowed, if it cannot
    fn full_scan_reason(&self) -> Option<RescanReason> {
        if !self.config.incremental {
            Some(RescanReason::IncrementalDisabled)
        } else if self.state.scanned_revision != self.registry.revision() {
            Some(RescanReason::RegistryChanged)
        } else if self.state.had_exclusions {
            Some(RescanReason::PreviousExclusions)
        } else if !self.registry.all_token_local() {
            Some(RescanReason::NotTokenLocal)
        } else {
            None
        }
    }

    /// Move the snapshot to `text` and style the difference
    fn apply_text(&mut self, text: String, caret: Option<usize>) -> PatchSummary {
        if text == self.state.text {
            self.stats.skipped += 1;
            self.diagnostics.emit(Diagnostic::ScanSkipped);
            return PatchSummary { kept: self.state.matches.len(), ..Default::default() };
        }

        let old = std::mem::replace(&mut self.state.text, text);
        let scanned = match self.full_scan_reason() {
            Some(reason) => Err(reason),
            None => self.windowed(&old),
        };
        let summary = match scanned {
            Ok(matches) => self.reconcile(matches),
            Err(reason) => self.rescan(reason),
        };
        self.notify_typing(caret);
        summary
    }

    /// Re-scan only the tokens of the new snapshot touched since `old` and
    /// splice them into the current matches
    fn windowed(&mut self, old: &str) -> std::result::Result<MatchSet, RescanReason> {
        let new = self.state.text.as_str();
        let delta = Delta::between(old, new);
        let plan = WindowPlan::expand(old, new, &delta, self.scanner.encoding())
            .ok_or(RescanReason::WindowTooWide)?;

        let report = self.scanner.scan_window(new, &self.registry.enabled(), &plan.window, &|| false);
        if !report.excluded.is_empty() {
            // The full rescan reports them
            return Err(RescanReason::WindowExclusions);
        }

        self.diagnostics.emit(Diagnostic::WindowedRescan { bytes: plan.window.bytes.len() });
        self.stats.windowed_scans += 1;
        self.record(&report, false);
        Ok(plan.splice(&self.state.matches, report.matches))
    }

    /// Full scan of the current snapshot
    fn rescan(&mut self, reason: RescanReason) -> PatchSummary {
        self.diagnostics.emit(Diagnostic::FullRescan { reason });
        let report = self.scanner.scan(&self.state.text, &self.registry.enabled());
        self.record(&report, true);
        self.reconcile(report.matches)
    }

    fn record(&mut self, report: &ScanReport, full: bool) {
        if full {
            self.stats.full_scans += 1;
            self.diagnostics.excluded(&report.excluded);
        }
        self.stats.last_scan_us = report.elapsed_us;
        self.stats.total_scan_us += report.elapsed_us;
        self.state.had_exclusions = !report.excluded.is_empty();
        self.state.scanned_revision = self.registry.revision();
        self.state.len_units = self.scanner.encoding().count(&self.state.text);
    }

    /// Removes first, then adds
    fn reconcile(&mut self, next: MatchSet) -> PatchSummary {
        let patch = diff(&self.state.matches, &next);
        for m in &patch.to_remove {
            self.applier.remove(m);
        }
        let fallback = StyleDescriptor::default();
        for m in &patch.to_add {
            let style = self.registry.get(m.recognizer_id).map_or(&fallback, Recognizer::style);
            self.applier.apply(m, style);
        }
        self.state.matches = next;
        patch.summary()
    }

    fn notify_typing(&mut self, caret: Option<usize>) {
        let Some(caret) = caret else { return };
        let registry = &self.registry;
        self.dispatcher.notify_typing(
            &self.state.text,
            caret,
            |kind| registry.is_enabled(kind),
            &mut self.diagnostics,
        );
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::style::MemoryApplier;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SENTENCE: &str = "check #rust and @alice at http://x.io";

    fn bind(text: &str) -> ChangeController<MemoryApplier> {
        ChangeController::bind(SocialConfig::default(), MemoryApplier::new(), text).unwrap()
    }

    fn styled(controller: &ChangeController<MemoryApplier>) -> Vec<(String, usize, usize)> {
        controller
            .applier()
            .annotations()
            .into_iter()
            .map(|m| (m.text.clone(), m.start, m.end))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    #[test]
    fn test_bind_styles_initial_text() {
        let controller = bind(SENTENCE);
        assert_eq!(
            styled(&controller),
            vec![
                ("#rust".to_string(), 6, 11),
                ("@alice".to_string(), 16, 22),
                ("http://x.io".to_string(), 26, 37),
            ]
        );
        assert_eq!(controller.stats().full_scans, 1);
        assert_eq!(controller.text_len(), 37);
    }

    #[test]
    fn test_bind_rejects_bad_custom_pattern() {
        let mut config = SocialConfig::default();
        config.custom_patterns.push(CustomPattern::new("bad", "(", StyleDescriptor::default()));
        let err = ChangeController::bind(config, MemoryApplier::new(), "").unwrap_err();
        assert!(matches!(err, SocialError::InvalidPattern { .. }));
    }

    #[test]
    fn test_unbind_removes_every_annotation() {
        let applier = bind(SENTENCE).unbind();
        assert!(applier.is_empty());
        assert_eq!(applier.remove_calls(), 3);
    }

    // -------------------------------------------------------------------------
    // Text changes
    // -------------------------------------------------------------------------

    #[test]
    fn test_append_hashtag_adds_only_new_match() {
        let mut controller = bind(SENTENCE);
        let outcome = controller.on_text_changed(&format!("{} #go", SENTENCE), Some(TextEdit::new(37, 0, 4)));

        assert_eq!(outcome, Outcome::Applied(PatchSummary { removed: 0, added: 1, kept: 3 }));
        assert_eq!(controller.applier().apply_calls(), 4);
        assert_eq!(controller.applier().remove_calls(), 0);
        let last = controller.matches().as_slice().last().unwrap();
        assert_eq!((last.text.as_str(), last.start, last.end), ("#go", 38, 41));
    }

    #[test]
    fn test_unchanged_text_is_skipped() {
        let mut controller = bind(SENTENCE);
        let before = controller.generation();
        assert_eq!(controller.on_text_changed(SENTENCE, None), Outcome::Unchanged);
        assert_eq!(controller.generation(), before);
        assert_eq!(controller.stats().skipped, 1);
    }

    #[test]
    fn test_generation_is_monotonic() {
        let mut controller = bind("#a");
        let g0 = controller.generation();
        controller.on_text_changed("#ab", None);
        let g1 = controller.generation();
        controller.replace_text("fresh");
        let g2 = controller.generation();
        assert!(g0 < g1 && g1 < g2);
    }

    #[test]
    fn test_editing_inside_mention_replaces_it() {
        let mut controller = bind("hello @ali and some more words here");
        let outcome = controller.on_text_changed("hello @alic and some more words here", None);
        assert_eq!(outcome, Outcome::Applied(PatchSummary { removed: 1, added: 1, kept: 0 }));
        assert_eq!(controller.mentions(), vec!["alic"]);
        assert_eq!(controller.stats().windowed_scans, 1);
    }

    #[test]
    fn test_replace_text_resets_annotations() {
        let mut controller = bind(SENTENCE);
        let summary = controller.replace_text("#only");
        assert_eq!(summary, PatchSummary { removed: 0, added: 1, kept: 0 });
        assert_eq!(controller.applier().remove_calls(), 3);
        assert_eq!(styled(&controller), vec![("#only".to_string(), 0, 5)]);
    }

    #[test]
    fn test_debounced_edits_coalesce() {
        let config = SocialConfig { debounce_ms: 60_000, ..SocialConfig::default() };
        let mut controller = ChangeController::bind(config, MemoryApplier::new(), "").unwrap();

        assert_eq!(controller.on_text_changed("#r", None), Outcome::Deferred);
        assert_eq!(controller.on_text_changed("#ru", None), Outcome::Deferred);
        assert_eq!(controller.on_text_changed("#ru", None), Outcome::Unchanged);
        assert!(controller.poll().is_none());
        assert!(controller.pending_for().unwrap() > Duration::from_secs(30));
        assert!(controller.applier().is_empty());

        let summary = controller.flush().unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(controller.hashtags(), vec!["ru"]);
        assert_eq!(controller.stats().deferred, 2);
        assert!(controller.flush().is_none());
    }

    #[test]
    fn test_full_scan_when_pattern_is_not_token_local() {
        let mut controller = bind("one two three four five six");
        controller
            .register_pattern(&CustomPattern::new("pair", r"two three", StyleDescriptor::default()))
            .unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        controller.set_diagnostics(move |d| sink.borrow_mut().push(d.clone()));

        controller.on_text_changed("one two three four five six!", None);
        assert_eq!(
            events.borrow().as_slice(),
            &[Diagnostic::FullRescan { reason: RescanReason::NotTokenLocal }]
        );
    }

    // -------------------------------------------------------------------------
    // Registry passthroughs
    // -------------------------------------------------------------------------

    #[test]
    fn test_disable_removes_and_hides_kind() {
        let mut controller = bind(SENTENCE);
        controller.enable(&RecognizerKind::Mention, false).unwrap();
        assert!(controller.mentions().is_empty());
        assert_eq!(controller.applier().len(), 2);

        controller.enable(&RecognizerKind::Mention, false).unwrap();
        assert_eq!(controller.stats().full_scans, 2);
    }

    #[test]
    fn test_register_and_unregister_custom() {
        let mut controller = bind("ticket JIRA-12 open");
        let handle = controller
            .register(Recognizer::custom("jira", r"[A-Z]+-\d+", StyleDescriptor::color("red")).unwrap())
            .unwrap();
        let jira = RecognizerKind::Custom("jira".into());
        assert_eq!(controller.matches().of_kind(&jira).count(), 1);

        controller.unregister(handle).unwrap();
        assert!(controller.applier().is_empty());
    }

    #[test]
    fn test_set_style_restyles_live_matches() {
        let mut controller = bind(SENTENCE);
        controller.set_style(&RecognizerKind::Hashtag, StyleDescriptor::color("green")).unwrap();

        let hashtag = controller.matches().as_slice()[0].clone();
        assert_eq!(controller.applier().style_of(&hashtag), Some(&StyleDescriptor::color("green")));
        assert_eq!(controller.applier().remove_calls(), 1);
    }

    // -------------------------------------------------------------------------
    // Off-thread scanning
    // -------------------------------------------------------------------------

    #[test]
    fn test_ticket_commits_when_current() {
        let config = SocialConfig { debounce_ms: 60_000, ..SocialConfig::default() };
        let mut controller = ChangeController::bind(config, MemoryApplier::new(), "").unwrap();
        controller.on_text_changed("#one @two", None);

        let ticket = controller.begin_scan();
        let outcome = std::thread::spawn(move || ticket.run()).join().unwrap();
        match controller.commit(outcome) {
            CommitStatus::Applied(summary) => assert_eq!(summary.added, 2),
            other => panic!("expected applied, got {:?}", other),
        }
        assert!(!controller.has_pending());
        assert_eq!(controller.registry().in_flight(), 0);
    }

    #[test]
    fn test_stale_outcome_is_discarded() {
        let mut controller = bind("#one");
        let ticket = controller.begin_scan();
        controller.on_text_changed("#one #two", None);
        assert!(ticket.is_stale());

        let outcome = ticket.run();
        assert!(outcome.is_cancelled());
        assert!(outcome.generation() < controller.generation());
        let status = controller.commit(outcome);
        let CommitStatus::Stale { rescan } = status else {
            panic!("expected stale");
        };
        assert_eq!(rescan.generation(), controller.generation());
        assert_eq!(controller.stats().stale_discarded, 1);
        assert_eq!(controller.hashtags(), vec!["one", "two"]);
    }

    #[test]
    fn test_registry_mutation_refused_while_scan_outstanding() {
        let mut controller = bind("#one");
        let ticket = controller.begin_scan();
        let err = controller.enable(&RecognizerKind::Hashtag, false).unwrap_err();
        assert_eq!(err, SocialError::ConcurrentRegistryMutation { in_flight: 1 });

        drop(ticket);
        assert!(controller.enable(&RecognizerKind::Hashtag, false).is_ok());
    }

    // -------------------------------------------------------------------------
    // Touch and typing
    // -------------------------------------------------------------------------

    #[test]
    fn test_on_touch_fires_listener() {
        let mut controller = bind(SENTENCE);
        let hits = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&hits);
        controller.set_listener(RecognizerKind::Url, move |text, start, end| {
            sink.borrow_mut().push((text.to_string(), start, end));
            Ok(())
        });

        assert_eq!(controller.on_touch(30), Some(FireOutcome::Fired));
        assert_eq!(controller.on_touch(7), Some(FireOutcome::NoListener));
        assert_eq!(controller.on_touch(12), None);
        assert_eq!(hits.borrow().as_slice(), &[("http://x.io".to_string(), 26, 37)]);
    }

    #[test]
    fn test_typing_watcher_gets_partial_word() {
        let mut controller = bind("say ");
        let words = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&words);
        controller
            .set_watcher(RecognizerKind::Mention, move |w| {
                sink.borrow_mut().push(w.to_string());
                Ok(())
            })
            .unwrap();

        controller.on_text_changed("say @", Some(TextEdit::new(4, 0, 1)));
        controller.on_text_changed("say @b", Some(TextEdit::new(5, 0, 1)));
        controller.on_text_changed("say @bo", None);
        controller.on_text_changed("say @b", Some(TextEdit::new(6, 1, 0)));
        assert_eq!(words.borrow().as_slice(), &["b".to_string(), "bo".to_string(), "b".to_string()]);

        assert!(controller.set_watcher(RecognizerKind::Url, |_| Ok(())).is_err());
    }

    #[test]
    fn test_backspace_without_hint_narrows_word() {
        let mut controller = bind("tag #rust");
        let words = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&words);
        controller
            .set_watcher(RecognizerKind::Hashtag, move |w| {
                sink.borrow_mut().push(w.to_string());
                Ok(())
            })
            .unwrap();

        controller.on_text_changed("tag #rus", None);
        controller.on_text_changed("tag #ru", None);
        controller.on_text_changed("tag ", None);
        assert_eq!(words.borrow().as_slice(), &["rus".to_string(), "ru".to_string()]);
    }

    #[test]
    fn test_out_of_range_hint_is_ignored() {
        let mut controller = bind("");
        let words = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&words);
        controller
            .set_watcher(RecognizerKind::Hashtag, move |w| {
                sink.borrow_mut().push(w.to_string());
                Ok(())
            })
            .unwrap();

        let outcome = controller.on_text_changed("#a", Some(TextEdit::new(usize::MAX, 0, 1)));
        assert!(matches!(outcome, Outcome::Applied(_)));
        controller.on_text_changed("#ab", Some(TextEdit::new(40, 0, 1)));
        controller.on_text_changed("#abc", Some(TextEdit::new(1, usize::MAX, usize::MAX)));

        assert!(words.borrow().is_empty());
        assert_eq!(controller.hashtags(), vec!["abc"]);
    }
}
