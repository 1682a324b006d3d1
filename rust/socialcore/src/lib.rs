//! SocialCore: incremental hashtag / mention / link styling engine
//!
//! A Rust/WASM library that keeps social tokens in an editable text styled
//! as the text changes, and routes taps on them to host listeners.
//!
//! # Architecture
//!
//! ## Recognition
//! - `registry.rs` - PatternRegistry: built-in hashtag, mention and URL
//!   recognizers plus custom regex recognizers
//! - `scanner.rs` - Scanner: one pass over the text, overlaps resolved into a
//!   sorted MatchSet
//! - `incremental.rs` - Snapshot diffing and windowed re-scan
//!
//! ## Lifecycle
//! - `reconcile.rs` - SpanReconciler: add / remove / keep patch between scans
//! - `style.rs` - StyleApplier trait and the in-memory applier
//! - `controller.rs` - ChangeController: bind, text changes, debouncing,
//!   off-thread scans, unbind
//! - `dispatch.rs` - Tap listeners and typing watchers
//!
//! ## Ambient
//! - `config.rs` - SocialConfig (serde, camelCase)
//! - `error.rs` - SocialError
//! - `diagnostics.rs` - Diagnostic events and debug console output
//! - `wasm.rs` - SocialView, the JavaScript binding
//!
//! # Usage (Rust)
//! ```rust
//! use socialcore::{ChangeController, MemoryApplier, RecognizerKind, SocialConfig};
//!
//! let mut view = ChangeController::bind(
//!     SocialConfig::default().with_accent("#1da1f2"),
//!     MemoryApplier::new(),
//!     "check #rust and @alice at http://x.io",
//! )?;
//! assert_eq!(view.hashtags(), vec!["rust"]);
//! assert_eq!(view.locate(18).map(|m| m.kind.clone()), Some(RecognizerKind::Mention));
//! # Ok::<(), socialcore::SocialError>(())
//! ```
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { SocialView } from 'socialcore';
//!
//! await init();
//!
//! const view = new SocialView({ hashtagStyle: { color: '#1da1f2' } }, apply, remove, text);
//! view.setListener('hashtag', (tag, start, end) => search(tag));
//! view.onTextChanged(editor.value, start, before, count);
//! console.log(view.stats());  // full vs windowed scans, timings
//! ```

pub mod social;

pub use social::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Install the panic hook so panics show up in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("socialcore v{}", env!("CARGO_PKG_VERSION"))
}
