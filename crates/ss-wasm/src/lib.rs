//! WebAssembly bindings for Scarlet Swap
//!
//! The content script owns the live DOM and the MutationObserver; this
//! module owns the decisions. JS walks text nodes and calls
//! [`rewrite_text`] per node; the returned segment list tells it exactly
//! which spans to build. Settings arrive as merged JSON snapshots: on a
//! "settings updated" notification the script re-fetches ground truth from
//! storage and calls [`settings_changed`], which also drops the per-host
//! compiled-rule cache.

use std::cell::RefCell;
use std::collections::HashMap;

use wasm_bindgen::prelude::*;

use ss_core::select::{build_applicable_rules, ApplicableRuleSet};
use ss_core::settings::Settings;
use ss_engine::rewrite::{rewrite_segments, sanitize_css, Segment};

struct SwapState {
    settings: Settings,
    /// Applicable rule sets compiled per host, invalidated wholesale on
    /// every settings change.
    by_host: HashMap<String, ApplicableRuleSet>,
}

thread_local! {
    static STATE: RefCell<Option<SwapState>> = const { RefCell::new(None) };
}

#[wasm_bindgen]
pub fn init(settings_json: &str) -> Result<(), JsValue> {
    let settings = parse_settings(settings_json);
    STATE.with(|state| {
        *state.borrow_mut() = Some(SwapState {
            settings,
            by_host: HashMap::new(),
        });
    });
    Ok(())
}

#[wasm_bindgen]
pub fn is_initialized() -> bool {
    STATE.with(|state| state.borrow().is_some())
}

/// Replace the settings snapshot and drop all compiled rules.
#[wasm_bindgen]
pub fn settings_changed(settings_json: &str) -> Result<(), JsValue> {
    let settings = parse_settings(settings_json);
    web_sys::console::log_1(&"scarlet-swap: settings reloaded".into());
    STATE.with(|state| {
        *state.borrow_mut() = Some(SwapState {
            settings,
            by_host: HashMap::new(),
        });
    });
    Ok(())
}

/// Master kill switch, for the content script's early-exit check.
#[wasm_bindgen]
pub fn is_enabled() -> bool {
    STATE.with(|state| {
        state
            .borrow()
            .as_ref()
            .map(|s| s.settings.enabled)
            .unwrap_or(false)
    })
}

/// How many rules are applicable on `host`. Zero means the script can skip
/// observing this page entirely.
#[wasm_bindgen]
pub fn rule_count_for_host(host: &str) -> u32 {
    with_host_rules(host, |set| set.len() as u32).unwrap_or(0)
}

/// Compute the segment list for one text node.
///
/// Returns a JS array of `{kind, text, original, title, css}` objects, or
/// `null` when no rule matched and the node must stay untouched.
/// `prior_title` is the enclosing replacement span's tooltip, if the node
/// was inserted inside one; it threads the provenance chain.
#[wasm_bindgen]
pub fn rewrite_text(text: &str, host: &str, prior_title: Option<String>) -> JsValue {
    let segments = with_host_rules(host, |set| rewrite_segments(text, &set.rules));
    let segments = match segments.flatten() {
        Some(segments) => segments,
        None => return JsValue::NULL,
    };

    let result = js_sys::Array::new();
    for segment in segments {
        let obj = js_sys::Object::new();
        match segment {
            Segment::Text(t) => {
                let _ = js_sys::Reflect::set(&obj, &"kind".into(), &"text".into());
                let _ = js_sys::Reflect::set(&obj, &"text".into(), &JsValue::from_str(&t));
            }
            Segment::Swap(swap) => {
                let _ = js_sys::Reflect::set(&obj, &"kind".into(), &"swap".into());
                let _ = js_sys::Reflect::set(&obj, &"text".into(), &JsValue::from_str(&swap.text));
                let _ = js_sys::Reflect::set(
                    &obj,
                    &"original".into(),
                    &JsValue::from_str(&swap.original),
                );
                let title = match &prior_title {
                    Some(prior) => format!("{prior} -> {}", swap.original),
                    None => swap.original.clone(),
                };
                let _ = js_sys::Reflect::set(&obj, &"title".into(), &JsValue::from_str(&title));
                if let Some(css) = swap.css.as_deref().and_then(sanitize_css) {
                    let _ = js_sys::Reflect::set(&obj, &"css".into(), &JsValue::from_str(&css));
                }
            }
        }
        result.push(&obj);
    }
    result.into()
}

/// Parse a merged snapshot, logging and falling back to defaults on
/// malformed input. A bad payload must not leave the page undefined.
fn parse_settings(settings_json: &str) -> Settings {
    match Settings::from_json(settings_json) {
        Ok(settings) => settings,
        Err(e) => {
            web_sys::console::warn_1(
                &format!("scarlet-swap: malformed settings, using defaults: {e}").into(),
            );
            Settings::default()
        }
    }
}

fn with_host_rules<R>(host: &str, f: impl FnOnce(&ApplicableRuleSet) -> R) -> Option<R> {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        let SwapState { settings, by_host } = state.as_mut()?;
        if !settings.enabled {
            return Some(f(&ApplicableRuleSet::default()));
        }
        let set = by_host
            .entry(host.to_string())
            .or_insert_with(|| build_applicable_rules(settings, host));
        Some(f(set))
    })
}
