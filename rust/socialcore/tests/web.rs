//! Browser smoke tests for the JavaScript binding.
//!
//! Run with `wasm-pack test --headless --firefox rust/socialcore`.

#![cfg(target_arch = "wasm32")]

use socialcore::SocialView;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn noop() -> js_sys::Function {
    js_sys::Function::new_no_args("")
}

#[wasm_bindgen_test]
fn binds_and_lists_tokens() {
    let view = SocialView::new(JsValue::UNDEFINED, noop(), noop(), "hi #rust 😀 @bob").unwrap();
    let mentions: Vec<String> = serde_wasm_bindgen::from_value(view.mentions().unwrap()).unwrap();
    assert_eq!(mentions, vec!["bob".to_string()]);

    // UTF-16 offsets by default: the emoji is two units wide
    let hit = view.locate(12).unwrap();
    assert!(!hit.is_null());
}

#[wasm_bindgen_test]
fn counts_apply_calls() {
    let calls = js_sys::Array::new();
    let apply = js_sys::Function::new_with_args("m, s", "this.push(m.text)").bind(&calls);
    let mut view = SocialView::new(JsValue::UNDEFINED, apply, noop(), "#a").unwrap();
    view.on_text_changed("#a #b", Some(2), Some(0), Some(3)).unwrap();
    assert_eq!(calls.length(), 2);
    view.unbind();
}

#[wasm_bindgen_test]
fn rejects_duplicate_custom_ids() {
    let config = js_sys::JSON::parse(
        r#"{ "customPatterns": [ { "id": "x", "regex": "a" }, { "id": "x", "regex": "b" } ] }"#,
    )
    .unwrap();
    assert!(SocialView::new(config, noop(), noop(), "").is_err());
}
