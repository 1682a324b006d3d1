//! JavaScript binding: `SocialView` wraps a controller whose applier calls
//! back into two JS functions.
//!
//! ```javascript,ignore
//! const view = new SocialView(
//!   { mentionStyle: { color: '#1da1f2' } },
//!   (match, style) => editor.mark(match.start, match.end, style),
//!   (match) => editor.unmark(match.start, match.end),
//!   editor.value,
//! );
//! editor.oninput = (e) => view.onTextChanged(editor.value, e.start, e.before, e.count);
//! view.setListener('mention', (text, start, end) => openProfile(text));
//! ```
//!
//! Offsets default to UTF-16 code units here, matching JS string indexing.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use super::config::{CustomPattern, SocialConfig};
use super::controller::{ChangeController, Outcome};
use super::incremental::TextEdit;
use super::reconcile::PatchSummary;
use super::registry::{RecognizerHandle, RecognizerKind};
use super::scanner::Match;
use super::style::{StyleApplier, StyleDescriptor};
use super::text::OffsetEncoding;

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn js_message(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Applier forwarding to host callbacks `(match, style)` and `(match)`
#[derive(Debug)]
pub struct JsStyleApplier {
    apply: js_sys::Function,
    remove: js_sys::Function,
}

impl StyleApplier for JsStyleApplier {
    fn apply(&mut self, m: &Match, style: &StyleDescriptor) {
        let result = to_js(m)
            .and_then(|m| Ok((m, to_js(style)?)))
            .and_then(|(m, style)| self.apply.call2(&JsValue::NULL, &m, &style));
        if let Err(e) = result {
            web_sys::console::warn_2(&JsValue::from_str("[SocialCore] apply failed"), &e);
        }
    }

    fn remove(&mut self, m: &Match) {
        let result = to_js(m).and_then(|m| self.remove.call1(&JsValue::NULL, &m));
        if let Err(e) = result {
            web_sys::console::warn_2(&JsValue::from_str("[SocialCore] remove failed"), &e);
        }
    }
}

/// Parse a JS config object; `offsetEncoding` defaults to `utf16`
fn parse_config(config: JsValue) -> Result<SocialConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(SocialConfig { offset_encoding: OffsetEncoding::Utf16, ..SocialConfig::default() });
    }
    let explicit = js_sys::Reflect::has(&config, &JsValue::from_str("offsetEncoding")).unwrap_or(false);
    let mut parsed: SocialConfig = serde_wasm_bindgen::from_value(config).map_err(js_err)?;
    if !explicit {
        parsed.offset_encoding = OffsetEncoding::Utf16;
    }
    Ok(parsed)
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum JsOutcome {
    Applied(PatchSummary),
    Unchanged,
    Deferred,
}

impl From<Outcome> for JsOutcome {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied(summary) => JsOutcome::Applied(summary),
            Outcome::Unchanged => JsOutcome::Unchanged,
            Outcome::Deferred => JsOutcome::Deferred,
        }
    }
}

#[wasm_bindgen]
pub struct SocialView {
    inner: ChangeController<JsStyleApplier>,
}

#[wasm_bindgen]
impl SocialView {
    #[wasm_bindgen(constructor)]
    pub fn new(
        config: JsValue,
        apply: js_sys::Function,
        remove: js_sys::Function,
        initial_text: &str,
    ) -> Result<SocialView, JsValue> {
        let config = parse_config(config)?;
        let inner = ChangeController::bind(config, JsStyleApplier { apply, remove }, initial_text)
            .map_err(js_err)?;
        Ok(SocialView { inner })
    }

    /// Mirrors a `TextWatcher`-style callback: `start`, `before` (removed)
    /// and `count` (inserted) are optional
    #[wasm_bindgen(js_name = onTextChanged)]
    pub fn on_text_changed(
        &mut self,
        text: &str,
        start: Option<usize>,
        before: Option<usize>,
        count: Option<usize>,
    ) -> Result<JsValue, JsValue> {
        let edit = start.map(|start| TextEdit::new(start, before.unwrap_or(0), count.unwrap_or(0)));
        to_js(&JsOutcome::from(self.inner.on_text_changed(text, edit)))
    }

    #[wasm_bindgen(js_name = replaceText)]
    pub fn replace_text(&mut self, text: &str) -> Result<JsValue, JsValue> {
        to_js(&self.inner.replace_text(text))
    }

    /// Apply a debounced edit now. Returns false if none was held.
    #[wasm_bindgen]
    pub fn flush(&mut self) -> bool {
        self.inner.flush().is_some()
    }

    /// Apply a debounced edit if it is due. Call from a timer.
    #[wasm_bindgen]
    pub fn poll(&mut self) -> bool {
        self.inner.poll().is_some()
    }

    /// Fire the listener under `offset`. Returns true on a hit.
    #[wasm_bindgen(js_name = onTouch)]
    pub fn on_touch(&mut self, offset: usize) -> bool {
        self.inner.on_touch(offset).is_some()
    }

    #[wasm_bindgen]
    pub fn locate(&self, offset: usize) -> Result<JsValue, JsValue> {
        match self.inner.locate(offset) {
            Some(m) => to_js(m),
            None => Ok(JsValue::NULL),
        }
    }

    /// `kind` is `hashtag`, `mention`, `url` or a custom pattern id
    #[wasm_bindgen(js_name = setListener)]
    pub fn set_listener(&mut self, kind: &str, listener: js_sys::Function) {
        self.inner.set_listener(RecognizerKind::from_name(kind), move |text, start, end| {
            listener
                .call3(
                    &JsValue::NULL,
                    &JsValue::from_str(text),
                    &JsValue::from(start as u32),
                    &JsValue::from(end as u32),
                )
                .map(|_| ())
                .map_err(js_message)
        });
    }

    #[wasm_bindgen(js_name = clearListener)]
    pub fn clear_listener(&mut self, kind: &str) {
        self.inner.clear_listener(RecognizerKind::from_name(kind));
    }

    /// `kind` is `hashtag` or `mention`
    #[wasm_bindgen(js_name = setWatcher)]
    pub fn set_watcher(&mut self, kind: &str, watcher: js_sys::Function) -> Result<(), JsValue> {
        self.inner
            .set_watcher(RecognizerKind::from_name(kind), move |word| {
                watcher
                    .call1(&JsValue::NULL, &JsValue::from_str(word))
                    .map(|_| ())
                    .map_err(js_message)
            })
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&mut self, kind: &str, enabled: bool) -> Result<(), JsValue> {
        self.inner.enable(&RecognizerKind::from_name(kind), enabled).map_err(js_err)
    }

    #[wasm_bindgen(js_name = setStyle)]
    pub fn set_style(&mut self, kind: &str, style: JsValue) -> Result<(), JsValue> {
        let style: StyleDescriptor = serde_wasm_bindgen::from_value(style).map_err(js_err)?;
        self.inner.set_style(&RecognizerKind::from_name(kind), style).map_err(js_err)
    }

    /// `{ id, regex, style?, priority? }`; returns the recognizer handle
    #[wasm_bindgen(js_name = registerPattern)]
    pub fn register_pattern(&mut self, pattern: JsValue) -> Result<u32, JsValue> {
        let pattern: CustomPattern = serde_wasm_bindgen::from_value(pattern).map_err(js_err)?;
        self.inner.register_pattern(&pattern).map(|h| h.0).map_err(js_err)
    }

    #[wasm_bindgen(js_name = unregisterPattern)]
    pub fn unregister_pattern(&mut self, handle: u32) -> Result<(), JsValue> {
        self.inner.unregister(RecognizerHandle(handle)).map_err(js_err)
    }

    #[wasm_bindgen]
    pub fn hashtags(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.hashtags())
    }

    #[wasm_bindgen]
    pub fn mentions(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.mentions())
    }

    #[wasm_bindgen]
    pub fn hyperlinks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.hyperlinks())
    }

    #[wasm_bindgen]
    pub fn matches(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.matches())
    }

    #[wasm_bindgen]
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        to_js(self.inner.stats())
    }

    #[wasm_bindgen]
    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }

    /// Receives every diagnostic as a `{ type, ... }` object
    #[wasm_bindgen(js_name = setDiagnostics)]
    pub fn set_diagnostics(&mut self, sink: js_sys::Function) {
        self.inner.set_diagnostics(move |diagnostic| {
            if let Ok(value) = to_js(diagnostic) {
                let _ = sink.call1(&JsValue::NULL, &value);
            }
        });
    }

    /// Receives listener failures as strings
    #[wasm_bindgen(js_name = setErrorObserver)]
    pub fn set_error_observer(&mut self, observer: js_sys::Function) {
        self.inner.set_error_observer(move |error| {
            let _ = observer.call1(&JsValue::NULL, &JsValue::from_str(&error.to_string()));
        });
    }

    /// Remove all styling. The view is unusable afterwards.
    #[wasm_bindgen]
    pub fn unbind(self) {
        self.inner.unbind();
    }
}
