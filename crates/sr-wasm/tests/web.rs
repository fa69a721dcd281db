//! Browser-side checks, run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

use sr_wasm::*;

wasm_bindgen_test_configure!(run_in_browser);

fn json(text: &str) -> JsValue {
    js_sys::JSON::parse(text).unwrap()
}

fn redirect_url(result: &JsValue) -> Option<String> {
    js_sys::Reflect::get(result, &"redirectUrl".into()).ok()?.as_string()
}

const STATE: &str = r#"{
    "redirectRules": [
        {"id": "rule_1", "source": "old.com", "destination": "https://new.com", "matchType": "exact", "enabled": true, "created": "2024-01-01T00:00:00.000Z"}
    ],
    "extensionEnabled": true
}"#;

#[wasm_bindgen_test]
fn redirects_main_frame_only() {
    assert!(!init_background(json(STATE)).unwrap());

    assert_eq!(redirect_url(&on_before_request("https://old.com/x", "main_frame")), Some("https://new.com".to_string()));
    assert!(on_before_request("https://old.com/x", "script").is_undefined());
    assert!(on_before_request("https://sub.old.com/", "main_frame").is_undefined());
}

#[wasm_bindgen_test]
fn storage_changes_update_cache() {
    init_background(json(STATE)).unwrap();

    on_storage_changed(json(r#"{"extensionEnabled": {"oldValue": true, "newValue": false}}"#)).unwrap();
    assert!(on_before_request("https://old.com/", "main_frame").is_undefined());

    on_storage_changed(json(r#"{"extensionEnabled": {"newValue": true}, "redirectRules": {"newValue": []}}"#)).unwrap();
    assert!(on_before_request("https://old.com/", "main_frame").is_undefined());
    assert_eq!(refresh_rules(json(STATE)).unwrap(), 1);
}

#[wasm_bindgen_test]
fn empty_state_requests_onboarding() {
    assert!(init_background(JsValue::UNDEFINED).unwrap());
    let response = handle_message(json(r#"{"action": "updateRules"}"#), json(STATE)).unwrap();
    assert_eq!(js_sys::Reflect::get(&response, &"success".into()).unwrap(), JsValue::TRUE);
    assert!(redirect_url(&on_before_request("http://old.com", "main_frame")).is_some());
}

#[wasm_bindgen_test]
fn create_rule_reports_validation_message() {
    let draft = json(r#"{"source": "ab", "destination": "https://x.com", "matchType": "exact"}"#);
    let err = create_rule(JsValue::NULL, draft).unwrap_err();
    assert_eq!(err.as_string().unwrap(), "Please enter a valid source website");
}
