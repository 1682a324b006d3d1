//! Diagnostics channel: silent by default, observable by hosts and tests.

use serde::Serialize;

use super::error::SocialError;
use super::registry::RecognizerKind;

/// Why a scan covered the whole text
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RescanReason {
    Bind,
    Replaced,
    RegistryChanged,
    NotTokenLocal,
    WindowTooWide,
    IncrementalDisabled,
    PreviousExclusions,
    WindowExclusions,
}

/// Observable engine events
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A recognizer's output was dropped for one scan
    RecognizerExcluded { kind: RecognizerKind, reason: String },
    /// A scan result arrived after the text moved on
    StaleScanDiscarded { dispatched: u64, current: u64 },
    /// A listener or watcher failed and was contained
    ListenerFailed { kind: RecognizerKind, message: String },
    FullRescan { reason: RescanReason },
    WindowedRescan { bytes: usize },
    /// Text identical to the snapshot
    ScanSkipped,
}

type Sink = Box<dyn FnMut(&Diagnostic)>;
type ErrorObserver = Box<dyn FnMut(&SocialError)>;

/// Fan-out for diagnostics and listener errors
#[derive(Default)]
pub struct Diagnostics {
    sink: Option<Sink>,
    error_observer: Option<ErrorObserver>,
    debug: bool,
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("sink", &self.sink.is_some())
            .field("error_observer", &self.error_observer.is_some())
            .field("debug", &self.debug)
            .finish()
    }
}

impl Diagnostics {
    pub fn new(debug: bool) -> Self {
        Self { debug, ..Default::default() }
    }

    pub fn set_sink(&mut self, sink: impl FnMut(&Diagnostic) + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn set_error_observer(&mut self, observer: impl FnMut(&SocialError) + 'static) {
        self.error_observer = Some(Box::new(observer));
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if self.debug {
            console_log(&diagnostic);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink(&diagnostic);
        }
    }

    /// Report a contained error; listener failures also become diagnostics
    pub fn report(&mut self, error: SocialError) {
        if let SocialError::ListenerFailure { kind, message } = &error {
            self.emit(Diagnostic::ListenerFailed {
                kind: kind.clone(),
                message: message.clone(),
            });
        }
        if let Some(observer) = self.error_observer.as_mut() {
            observer(&error);
        }
    }

    pub fn excluded(&mut self, errors: &[SocialError]) {
        for error in errors {
            if let SocialError::MalformedMatchOffset { kind, fault, .. } = error {
                self.emit(Diagnostic::RecognizerExcluded {
                    kind: kind.clone(),
                    reason: fault.to_string(),
                });
            }
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn console_log(diagnostic: &Diagnostic) {
    let line = format!("[SocialCore] {:?}", diagnostic);
    match diagnostic {
        Diagnostic::RecognizerExcluded { .. } | Diagnostic::ListenerFailed { .. } => {
            web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(&line))
        }
        _ => web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(&line)),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn console_log(_diagnostic: &Diagnostic) {}
