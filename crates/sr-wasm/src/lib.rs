//! WebAssembly bindings for Smart Redirect
//!
//! The background script keeps one [`Background`] alive over a
//! [`MemoryStore`] that mirrors `chrome.storage.local`. The glue feeds it
//! the initial storage read, every `storage.onChanged` payload and every
//! runtime message; `webRequest.onBeforeRequest` is answered synchronously
//! from the cached rules.
//!
//! The options page and popup use the stateless helpers at the bottom of
//! this file and do their own storage writes.

use std::cell::RefCell;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use sr_core::{
    draft::build_rule,
    exchange::{apply_import, ensure_json_file_name, export_file_name, parse_import},
    status::summarize,
    store::KEY_RULES,
    Background, EditorError, ExportDocument, ImportPolicy, MemoryStore, Message, NavigationRequest, RequestType,
    Rule, RuleDraft, RuleStore, StoreChange, StoreSnapshot,
};

thread_local! {
    static BACKGROUND: RefCell<Option<Background<MemoryStore>>> = const { RefCell::new(None) };
}

// =============================================================================
// Logging
// =============================================================================

/// Forwards `log` records to the devtools console.
struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[smart-redirect] {}", record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::debug_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route core logging to the console. Safe to call more than once.
#[wasm_bindgen]
pub fn init_logging(verbose: bool) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

// =============================================================================
// Background
// =============================================================================

/// Start the background from a storage read of all keys.
///
/// Returns `true` when the setup page should be opened. Calling it again
/// (service worker restart) replaces the previous instance.
#[wasm_bindgen]
pub fn init_background(state: JsValue) -> Result<bool, JsValue> {
    let snapshot = snapshot_from_js(&state)?;
    let mut background = Background::new(MemoryStore::with_snapshot(snapshot));
    let needs_onboarding = background.start();

    BACKGROUND.with(|cell| {
        if cell.borrow_mut().replace(background).is_some() {
            log::debug!("Background re-initialized");
        }
    });
    Ok(needs_onboarding)
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    BACKGROUND.with(|cell| cell.borrow().is_some())
}

/// `webRequest.onBeforeRequest` handler body.
///
/// Returns `{ redirectUrl }` or `undefined`. Always `undefined` before
/// [`init_background`].
#[wasm_bindgen]
pub fn on_before_request(url: &str, request_type: &str) -> JsValue {
    let request = NavigationRequest {
        url,
        request_type: RequestType::from_str(request_type),
    };
    let decision = BACKGROUND.with(|cell| cell.borrow().as_ref().map(|background| background.evaluate(&request)));

    match decision.as_ref().and_then(|decision| decision.redirect_url()) {
        Some(redirect_url) => {
            let result = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&result, &"redirectUrl".into(), &JsValue::from_str(redirect_url));
            result.into()
        }
        None => JsValue::UNDEFINED,
    }
}

/// `runtime.onMessage` handler body.
///
/// `state`, when given, is a fresh storage read that replaces the mirror
/// before the message is handled, so an `updateRules` sent right after a
/// write never sees a stale mirror. Unknown actions return `undefined`.
#[wasm_bindgen]
pub fn handle_message(message: JsValue, state: JsValue) -> Result<JsValue, JsValue> {
    let message = Message::from_json(&from_js::<Value>(&message)?);
    let snapshot = if state.is_undefined() || state.is_null() {
        None
    } else {
        Some(snapshot_from_js(&state)?)
    };

    let response = with_background(|background| {
        if let Some(snapshot) = snapshot {
            background.store().replace(snapshot).map_err(storage_error)?;
            background.pump();
        }
        Ok(background.handle_message(message))
    })?;

    match response {
        Some(response) => to_js(&response),
        None => Ok(JsValue::UNDEFINED),
    }
}

/// `storage.onChanged` handler body for the `local` area.
#[wasm_bindgen]
pub fn on_storage_changed(changes: JsValue) -> Result<(), JsValue> {
    let changes: Value = from_js(&changes)?;
    let change = StoreChange::from_browser_changes(&changes);
    if change.is_empty() {
        return Ok(());
    }

    with_background(|background| {
        let store = background.store();
        if change.rules_changed {
            let new_value = changes
                .get(KEY_RULES)
                .and_then(|entry| entry.get("newValue"))
                .cloned()
                .unwrap_or(Value::Null);
            let rules: Option<Vec<Rule>> = serde_json::from_value(new_value).map_err(json_error)?;
            store.save(&rules.unwrap_or_default()).map_err(storage_error)?;
        }
        if let Some(enabled) = change.enabled {
            store.set_enabled(enabled).map_err(storage_error)?;
        }
        background.pump();
        Ok(())
    })
}

/// Replace the mirror with a fresh storage read and reload the cache.
/// Returns the number of cached rules.
#[wasm_bindgen]
pub fn refresh_rules(state: JsValue) -> Result<usize, JsValue> {
    let snapshot = snapshot_from_js(&state)?;
    with_background(|background| {
        background.store().replace(snapshot).map_err(storage_error)?;
        background.pump();
        Ok(background.interceptor().rules().len())
    })
}

fn with_background<T>(f: impl FnOnce(&mut Background<MemoryStore>) -> Result<T, JsValue>) -> Result<T, JsValue> {
    BACKGROUND.with(|cell| match cell.borrow_mut().as_mut() {
        Some(background) => f(background),
        None => Err(JsValue::from_str("Background not initialized. Call init_background first.")),
    })
}

// =============================================================================
// Page helpers
// =============================================================================

/// First enabled rule matching `url`, or `null`.
#[wasm_bindgen]
pub fn find_matching_rule(url: &str, rules: JsValue) -> Result<JsValue, JsValue> {
    let rules = rules_from_js(&rules)?;
    match sr_core::find_matching_rule(url, &rules) {
        Some(rule) => to_js(rule),
        None => Ok(JsValue::NULL),
    }
}

#[wasm_bindgen]
pub fn clean_source(source: &str) -> String {
    sr_core::clean_source(source)
}

/// Validate the add-rule form against `rules` and build the new rule.
///
/// Errors carry the message to show the user.
#[wasm_bindgen]
pub fn create_rule(rules: JsValue, draft: JsValue) -> Result<JsValue, JsValue> {
    let rules = rules_from_js(&rules)?;
    let draft: RuleDraft = from_js(&draft)?;
    let rule = build_rule(&rules, &draft).map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&rule)
}

/// Parse an import file and return the resulting rule list.
#[wasm_bindgen]
pub fn import_rules(current: JsValue, text: &str, replace: bool, file_name: Option<String>) -> Result<JsValue, JsValue> {
    if let Some(name) = file_name.as_deref() {
        ensure_json_file_name(name).map_err(|e| JsValue::from_str(&e.to_string()))?;
    }
    let current = rules_from_js(&current)?;
    let imported = parse_import(text).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let policy = if replace { ImportPolicy::Replace } else { ImportPolicy::Merge };
    to_js(&apply_import(&current, imported, policy))
}

/// Returns `{ fileName, content }` for the download.
#[wasm_bindgen]
pub fn export_rules(rules: JsValue) -> Result<JsValue, JsValue> {
    let rules = rules_from_js(&rules)?;
    if rules.is_empty() {
        return Err(JsValue::from_str(&EditorError::NothingToExport.to_string()));
    }
    let content = ExportDocument::new(rules).to_json().map_err(json_error)?;

    let result = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&result, &"fileName".into(), &JsValue::from_str(&export_file_name()));
    let _ = js_sys::Reflect::set(&result, &"content".into(), &JsValue::from_str(&content));
    Ok(result.into())
}

/// Popup summary for the active tab.
#[wasm_bindgen]
pub fn status_summary(rules: JsValue, enabled: bool, url: Option<String>) -> Result<JsValue, JsValue> {
    let rules = rules_from_js(&rules)?;
    to_js(&summarize(&rules, enabled, url.as_deref()))
}

// =============================================================================
// Conversions
// =============================================================================

fn from_js<T: DeserializeOwned>(value: &JsValue) -> Result<T, JsValue> {
    let text: String = if value.is_undefined() {
        "null".to_string()
    } else {
        js_sys::JSON::stringify(value)?.into()
    };
    serde_json::from_str(&text).map_err(json_error)
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(json_error)?;
    js_sys::JSON::parse(&text)
}

fn rules_from_js(value: &JsValue) -> Result<Vec<Rule>, JsValue> {
    Ok(from_js::<Option<Vec<Rule>>>(value)?.unwrap_or_default())
}

fn snapshot_from_js(value: &JsValue) -> Result<StoreSnapshot, JsValue> {
    Ok(from_js::<Option<StoreSnapshot>>(value)?.unwrap_or_default())
}

fn json_error(e: serde_json::Error) -> JsValue {
    JsValue::from_str(&format!("Invalid JSON value: {}", e))
}

fn storage_error(e: sr_core::StorageError) -> JsValue {
    JsValue::from_str(&e.to_string())
}
