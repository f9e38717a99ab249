//! WebAssembly bindings for site-core.
//!
//! Backs the components with browser `localStorage` and forwards consent
//! updates to `gtag` when the page loaded it.

use std::fmt::Display;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::consent::{ConsentSignal, ConsentStore, LoadOutcome, SignalCategory};
use crate::inquiry::{InquiryRequest, ValidationResult};
use crate::locale::{LanguagePreference, Locale};
use crate::storage::{KeyValueStorage, StorageError};
use crate::visitor::VisitorLog;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn to_js(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn js_unavailable(value: &JsValue) -> StorageError {
    StorageError::Unavailable(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// `window.localStorage` as a [`KeyValueStorage`].
#[derive(Debug, Clone)]
pub struct LocalStorage {
    inner: web_sys::Storage,
}

impl LocalStorage {
    /// Open the page's local storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] outside a window context or when
    /// the browser has storage disabled.
    pub fn from_window() -> Result<Self, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".into()))?;
        let inner = window
            .local_storage()
            .map_err(|e| js_unavailable(&e))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".into()))?;
        Ok(Self { inner })
    }
}

impl KeyValueStorage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key).map_err(|e| js_unavailable(&e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_item(key, value).map_err(|e| js_unavailable(&e))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key).map_err(|e| js_unavailable(&e))
    }
}

/// Forwards consent updates to the page's `gtag` function.
#[derive(Debug, Clone)]
pub struct GtagSignal {
    gtag: js_sys::Function,
}

impl GtagSignal {
    /// Look up `window.gtag`. Returns `None` if the tag manager isn't loaded.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let gtag = js_sys::Reflect::get(&window, &JsValue::from_str("gtag")).ok()?;
        gtag.dyn_into::<js_sys::Function>()
            .ok()
            .map(|gtag| Self { gtag })
    }
}

impl ConsentSignal for GtagSignal {
    fn notify_consent(&self, category: SignalCategory, granted: bool) {
        let update = js_sys::Object::new();
        let value = if granted { "granted" } else { "denied" };
        if js_sys::Reflect::set(
            &update,
            &JsValue::from_str(category.as_str()),
            &JsValue::from_str(value),
        )
        .is_err()
        {
            return;
        }
        if let Err(e) = self.gtag.call3(
            &JsValue::NULL,
            &JsValue::from_str("consent"),
            &JsValue::from_str("update"),
            &update,
        ) {
            tracing::warn!("gtag consent update failed: {e:?}");
        }
    }
}

/// Consent manager for JavaScript callers.
#[wasm_bindgen]
pub struct WasmConsent {
    store: ConsentStore<LocalStorage>,
}

#[wasm_bindgen]
impl WasmConsent {
    /// Create a consent manager over `localStorage`.
    ///
    /// # Errors
    ///
    /// Returns an error string if local storage is unavailable.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmConsent, JsValue> {
        let storage = LocalStorage::from_window().map_err(to_js)?;
        let signal = GtagSignal::detect().map(|s| Box::new(s) as Box<dyn ConsentSignal>);
        Ok(Self {
            store: ConsentStore::new(storage, signal),
        })
    }

    /// Load the stored decision. Returns `true` when the banner should show.
    #[wasm_bindgen(js_name = loadOrInitialize)]
    pub fn load_or_initialize(&mut self) -> bool {
        self.store.restore() == LoadOutcome::PresentBanner
    }

    /// Grant every category.
    ///
    /// # Errors
    ///
    /// Returns an error string if the decision cannot be stored.
    #[wasm_bindgen(js_name = acceptAll)]
    pub fn accept_all(&mut self) -> Result<(), JsValue> {
        self.store.accept_all().map_err(to_js)
    }

    /// Deny every optional category.
    ///
    /// # Errors
    ///
    /// Returns an error string if the decision cannot be stored.
    #[wasm_bindgen(js_name = rejectAll)]
    pub fn reject_all(&mut self) -> Result<(), JsValue> {
        self.store.reject_all().map_err(to_js)
    }

    /// Store the settings-dialog selection.
    ///
    /// # Errors
    ///
    /// Returns an error string if the decision cannot be stored.
    #[wasm_bindgen(js_name = saveCustom)]
    pub fn save_custom(
        &mut self,
        analytics: bool,
        marketing: bool,
        preferences: bool,
    ) -> Result<(), JsValue> {
        self.store
            .save_custom(analytics, marketing, preferences)
            .map_err(to_js)
    }

    /// Whether `category` is currently allowed.
    #[wasm_bindgen(js_name = isAllowed)]
    #[must_use]
    pub fn is_allowed(&self, category: &str) -> bool {
        self.store.is_allowed(category)
    }

    /// Current preferences as JSON, for pre-filling the settings dialog.
    #[wasm_bindgen(js_name = preferencesJson)]
    #[must_use]
    pub fn preferences_json(&self) -> String {
        self.store.preferences().to_json().unwrap_or_default()
    }

    /// Clear every stored decision and visit marker.
    ///
    /// # Errors
    ///
    /// Returns an error string if storage refuses the removal.
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.store.reset().map_err(to_js)
    }
}

/// Mark this page load as seen. Returns `true` when the splash should play.
///
/// # Errors
///
/// Returns an error string if local storage is unavailable.
#[wasm_bindgen(js_name = recordVisit)]
pub fn record_visit() -> Result<bool, JsValue> {
    let storage = LocalStorage::from_window().map_err(to_js)?;
    let kind = VisitorLog::new(storage).record_visit().map_err(to_js)?;
    Ok(kind.shows_splash())
}

/// Saved interface language code.
///
/// # Errors
///
/// Returns an error string if local storage is unavailable.
#[wasm_bindgen(js_name = preferredLanguage)]
pub fn preferred_language() -> Result<String, JsValue> {
    let storage = LocalStorage::from_window().map_err(to_js)?;
    let locale = LanguagePreference::new(storage).load().map_err(to_js)?;
    Ok(locale.code().to_string())
}

/// Remember the interface language.
///
/// # Errors
///
/// Returns an error string for unsupported codes or unavailable storage.
#[wasm_bindgen(js_name = setPreferredLanguage)]
pub fn set_preferred_language(code: &str) -> Result<(), JsValue> {
    let locale: Locale = code.parse().map_err(to_js)?;
    let storage = LocalStorage::from_window().map_err(to_js)?;
    LanguagePreference::new(storage).save(locale).map_err(to_js)
}

#[derive(Debug, Serialize)]
struct FieldMessage {
    field: &'static str,
    kind: String,
    message: &'static str,
}

fn field_messages(result: &ValidationResult, locale: Locale) -> Vec<FieldMessage> {
    result
        .errors()
        .iter()
        .map(|e| FieldMessage {
            field: e.field.as_str(),
            kind: e.kind.to_string(),
            message: e.message(locale),
        })
        .collect()
}

/// Validate an inquiry given as JSON.
///
/// Returns a JSON array of `{field, kind, message}`; empty when valid.
///
/// # Errors
///
/// Returns an error string if the JSON cannot be parsed.
#[wasm_bindgen(js_name = validateInquiry)]
pub fn validate_inquiry(json: &str, language: &str) -> Result<String, JsValue> {
    let request: InquiryRequest = serde_json::from_str(json).map_err(to_js)?;
    let locale = language.parse().unwrap_or_default();
    let messages = field_messages(&request.validate(), locale);
    serde_json::to_string(&messages).map_err(to_js)
}
