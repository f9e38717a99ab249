//! Cookie-consent state: what the visitor agreed to, persisted and applied.
//!
//! ```text
//!   ┌─────────┐  accept_all / reject_all / save_custom  ┌─────────┐
//!   │ Unknown │ ──────────────────────────────────────▶ │ Decided │
//!   └─────────┘ ◀────────────────────────────────────── └─────────┘
//!                               reset
//! ```
//!
//! Every decision overwrites the stored record wholesale. Applying a record
//! notifies the injected [`ConsentSignal`] for the analytics and marketing
//! categories; the `preferences` category has no downstream mechanism.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConsentError, ConsentResult};
use crate::storage::{
    iso_timestamp_now, parse_iso_timestamp, KeyValueStorage, CONSENT_DATE_KEY, CONSENT_KEY,
    FIRST_VISIT_KEY, VISITED_KEY,
};

/// Keys cleared by [`ConsentStore::reset`].
const RESET_KEYS: [&str; 4] = [CONSENT_KEY, CONSENT_DATE_KEY, VISITED_KEY, FIRST_VISIT_KEY];

/// Consent categories shown in the settings dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentCategory {
    /// Strictly necessary storage. Always allowed.
    Necessary,
    /// Usage analytics.
    Analytics,
    /// Advertising and remarketing.
    Marketing,
    /// Remembered interface preferences.
    Preferences,
}

impl ConsentCategory {
    /// Category name as used in storage and lookups.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Necessary => "necessary",
            Self::Analytics => "analytics",
            Self::Marketing => "marketing",
            Self::Preferences => "preferences",
        }
    }

    /// Downstream consent-mode keys governed by this category.
    #[must_use]
    pub fn signals(self) -> &'static [SignalCategory] {
        match self {
            Self::Analytics => &[SignalCategory::AnalyticsStorage],
            Self::Marketing => &[
                SignalCategory::AdStorage,
                SignalCategory::AdUserData,
                SignalCategory::AdPersonalization,
            ],
            Self::Necessary | Self::Preferences => &[],
        }
    }
}

impl fmt::Display for ConsentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown consent category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for ConsentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "necessary" => Ok(Self::Necessary),
            "analytics" => Ok(Self::Analytics),
            "marketing" => Ok(Self::Marketing),
            "preferences" => Ok(Self::Preferences),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Consent-mode storage keys understood by the tag manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalCategory {
    /// `analytics_storage`
    AnalyticsStorage,
    /// `ad_storage`
    AdStorage,
    /// `ad_user_data`
    AdUserData,
    /// `ad_personalization`
    AdPersonalization,
}

impl SignalCategory {
    /// Key name passed to the tag manager.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnalyticsStorage => "analytics_storage",
            Self::AdStorage => "ad_storage",
            Self::AdUserData => "ad_user_data",
            Self::AdPersonalization => "ad_personalization",
        }
    }
}

impl fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of consent updates, typically a tag-management API.
pub trait ConsentSignal {
    /// Report `category` as granted or denied.
    fn notify_consent(&self, category: SignalCategory, granted: bool);
}

impl<F> ConsentSignal for F
where
    F: Fn(SignalCategory, bool),
{
    fn notify_consent(&self, category: SignalCategory, granted: bool) {
        self(category, granted);
    }
}

/// The four-boolean consent record.
///
/// `necessary` is always `true`; no constructor or parser produces anything
/// else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StoredPreferences")]
pub struct ConsentPreferences {
    necessary: bool,
    analytics: bool,
    marketing: bool,
    preferences: bool,
}

/// Wire shape of the stored record, before the invariant is checked.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredPreferences {
    necessary: bool,
    analytics: bool,
    marketing: bool,
    preferences: bool,
}

impl TryFrom<StoredPreferences> for ConsentPreferences {
    type Error = String;

    fn try_from(stored: StoredPreferences) -> Result<Self, Self::Error> {
        if !stored.necessary {
            return Err("necessary must be true".to_string());
        }
        Ok(Self::custom(
            stored.analytics,
            stored.marketing,
            stored.preferences,
        ))
    }
}

impl Default for ConsentPreferences {
    fn default() -> Self {
        Self::necessary_only()
    }
}

impl ConsentPreferences {
    /// Everything granted.
    #[must_use]
    pub fn all_granted() -> Self {
        Self::custom(true, true, true)
    }

    /// Only strictly necessary storage.
    #[must_use]
    pub fn necessary_only() -> Self {
        Self::custom(false, false, false)
    }

    /// Explicit selection; `necessary` is forced on.
    #[must_use]
    pub fn custom(analytics: bool, marketing: bool, preferences: bool) -> Self {
        Self {
            necessary: true,
            analytics,
            marketing,
            preferences,
        }
    }

    /// Always `true`.
    #[must_use]
    pub fn necessary(&self) -> bool {
        self.necessary
    }

    /// Usage analytics allowed.
    #[must_use]
    pub fn analytics(&self) -> bool {
        self.analytics
    }

    /// Advertising allowed.
    #[must_use]
    pub fn marketing(&self) -> bool {
        self.marketing
    }

    /// Remembered interface preferences allowed.
    #[must_use]
    pub fn preferences(&self) -> bool {
        self.preferences
    }

    /// Value for a single category.
    #[must_use]
    pub fn allows(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => self.necessary,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
            ConsentCategory::Preferences => self.preferences,
        }
    }

    /// Parse a stored record.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Malformed`] for invalid JSON, missing or extra
    /// fields, or `necessary: false`.
    pub fn from_json(json: &str) -> ConsentResult<Self> {
        serde_json::from_str(json).map_err(|e| ConsentError::Malformed(e.to_string()))
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> ConsentResult<String> {
        serde_json::to_string(self).map_err(|e| ConsentError::Malformed(e.to_string()))
    }
}

/// Whether the visitor has decided yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    /// No decision on record; the banner should be offered.
    Unknown,
    /// A decision is on record and has been applied.
    Decided,
}

/// Result of [`ConsentStore::load_or_initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing on record; present the consent banner.
    PresentBanner,
    /// A stored decision was found and applied.
    Restored(ConsentPreferences),
}

/// Persisted consent preferences plus their downstream effects.
pub struct ConsentStore<S> {
    storage: S,
    signal: Option<Box<dyn ConsentSignal>>,
    preferences: ConsentPreferences,
    state: ConsentState,
}

impl<S> fmt::Debug for ConsentStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentStore")
            .field("preferences", &self.preferences)
            .field("state", &self.state)
            .field("signal", &self.signal.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStorage> ConsentStore<S> {
    /// Create a store in the Unknown state.
    ///
    /// With `signal` set to `None`, applying preferences is a no-op.
    #[must_use]
    pub fn new(storage: S, signal: Option<Box<dyn ConsentSignal>>) -> Self {
        Self {
            storage,
            signal,
            preferences: ConsentPreferences::default(),
            state: ConsentState::Unknown,
        }
    }

    /// Current in-memory preferences.
    #[must_use]
    pub fn preferences(&self) -> ConsentPreferences {
        self.preferences
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConsentState {
        self.state
    }

    /// Read the stored decision and apply it.
    ///
    /// When nothing is stored the store stays Unknown and nothing is written.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Malformed`] if the stored record cannot be
    /// parsed (the store is left Unknown), or [`ConsentError::Storage`] if the
    /// backend cannot be read.
    pub fn load_or_initialize(&mut self) -> ConsentResult<LoadOutcome> {
        self.state = ConsentState::Unknown;
        self.preferences = ConsentPreferences::default();

        let Some(raw) = self.storage.get(CONSENT_KEY)? else {
            tracing::debug!("No consent on record, presenting banner");
            return Ok(LoadOutcome::PresentBanner);
        };

        let prefs = ConsentPreferences::from_json(&raw)?;
        tracing::debug!("Consent on record, applying {prefs:?}");
        self.preferences = prefs;
        self.state = ConsentState::Decided;
        self.apply(&prefs);
        Ok(LoadOutcome::Restored(prefs))
    }

    /// [`load_or_initialize`](Self::load_or_initialize), treating any failure
    /// as an absent record.
    pub fn restore(&mut self) -> LoadOutcome {
        match self.load_or_initialize() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Ignoring stored consent: {e}");
                LoadOutcome::PresentBanner
            }
        }
    }

    /// Grant every category.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError`] if the decision cannot be persisted. It is
    /// applied regardless.
    pub fn accept_all(&mut self) -> ConsentResult<()> {
        tracing::info!("Consent: accept all");
        self.decide(ConsentPreferences::all_granted())
    }

    /// Deny every optional category.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError`] if the decision cannot be persisted. It is
    /// applied regardless.
    pub fn reject_all(&mut self) -> ConsentResult<()> {
        tracing::info!("Consent: reject all");
        self.decide(ConsentPreferences::necessary_only())
    }

    /// Store an explicit selection from the settings dialog.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError`] if the decision cannot be persisted. It is
    /// applied regardless.
    pub fn save_custom(
        &mut self,
        analytics: bool,
        marketing: bool,
        preferences: bool,
    ) -> ConsentResult<()> {
        tracing::info!(
            analytics,
            marketing,
            preferences,
            "Consent: custom selection"
        );
        self.decide(ConsentPreferences::custom(analytics, marketing, preferences))
    }

    /// Push `prefs` to the consent signal.
    pub fn apply(&self, prefs: &ConsentPreferences) {
        let Some(signal) = self.signal.as_deref() else {
            tracing::debug!("No consent signal configured, skipping apply");
            return;
        };
        for category in [ConsentCategory::Analytics, ConsentCategory::Marketing] {
            let granted = prefs.allows(category);
            for key in category.signals() {
                signal.notify_consent(*key, granted);
            }
        }
        // `preferences` gates nothing beyond local storage itself.
    }

    /// Look up a category by name. Unknown names are never allowed.
    #[must_use]
    pub fn is_allowed(&self, category: &str) -> bool {
        category
            .parse::<ConsentCategory>()
            .is_ok_and(|c| self.preferences.allows(c))
    }

    /// When the current decision was made, if one is on record.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Storage`] if the backend cannot be read.
    pub fn decided_at(&self) -> ConsentResult<Option<DateTime<Utc>>> {
        let stored = self.storage.get(CONSENT_DATE_KEY)?;
        Ok(stored.as_deref().and_then(parse_iso_timestamp))
    }

    /// Forget every stored decision and visit marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConsentError::Storage`] if a key cannot be removed.
    pub fn reset(&mut self) -> ConsentResult<()> {
        self.state = ConsentState::Unknown;
        self.preferences = ConsentPreferences::default();
        for key in RESET_KEYS {
            self.storage.remove(key)?;
        }
        tracing::info!("Consent storage cleared");
        Ok(())
    }

    fn decide(&mut self, prefs: ConsentPreferences) -> ConsentResult<()> {
        self.preferences = prefs;
        self.state = ConsentState::Decided;
        let persisted = self.persist(&prefs);
        if let Err(ref e) = persisted {
            tracing::warn!("Failed to persist consent: {e}");
        }
        self.apply(&prefs);
        persisted
    }

    fn persist(&self, prefs: &ConsentPreferences) -> ConsentResult<()> {
        self.storage.set(CONSENT_KEY, &prefs.to_json()?)?;
        self.storage.set(CONSENT_DATE_KEY, &iso_timestamp_now())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::storage::{MemoryStorage, StorageError};

    type Calls = Rc<RefCell<Vec<(SignalCategory, bool)>>>;

    fn recording_store(storage: MemoryStorage) -> (ConsentStore<MemoryStorage>, Calls) {
        let calls: Calls = Rc::default();
        let sink = Rc::clone(&calls);
        let signal = move |category: SignalCategory, granted: bool| {
            sink.borrow_mut().push((category, granted));
        };
        (ConsentStore::new(storage, Some(Box::new(signal))), calls)
    }

    #[test]
    fn first_visit_presents_banner_and_writes_nothing() {
        let storage = MemoryStorage::new();
        let (mut store, calls) = recording_store(storage.clone());

        let outcome = store.load_or_initialize().expect("load");
        assert_eq!(outcome, LoadOutcome::PresentBanner);
        assert_eq!(store.state(), ConsentState::Unknown);
        assert!(storage.is_empty());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn accept_all_survives_reload() {
        let storage = MemoryStorage::new();
        let (mut store, _) = recording_store(storage.clone());
        store.accept_all().expect("accept");

        let (mut reloaded, calls) = recording_store(storage);
        let outcome = reloaded.load_or_initialize().expect("load");
        assert_eq!(
            outcome,
            LoadOutcome::Restored(ConsentPreferences::all_granted())
        );
        assert_eq!(reloaded.state(), ConsentState::Decided);
        assert_eq!(calls.borrow().len(), 4, "restored prefs are re-applied");
    }

    #[test]
    fn reject_all_denies_marketing() {
        let (mut store, calls) = recording_store(MemoryStorage::new());
        store.reject_all().expect("reject");

        let prefs = store.preferences();
        assert!(prefs.necessary());
        assert!(!prefs.analytics());
        assert!(!prefs.marketing());
        assert!(!prefs.preferences());
        assert!(!store.is_allowed("marketing"));
        assert!(store.is_allowed("necessary"));
        assert!(calls.borrow().iter().all(|(_, granted)| !granted));
    }

    #[test]
    fn save_custom_forces_necessary_and_signals_each_key() {
        let (mut store, calls) = recording_store(MemoryStorage::new());
        store.save_custom(true, false, true).expect("save");

        assert!(store.is_allowed("analytics"));
        assert!(!store.is_allowed("marketing"));
        assert!(store.is_allowed("preferences"));
        assert_eq!(
            *calls.borrow(),
            vec![
                (SignalCategory::AnalyticsStorage, true),
                (SignalCategory::AdStorage, false),
                (SignalCategory::AdUserData, false),
                (SignalCategory::AdPersonalization, false),
            ]
        );
    }

    #[test]
    fn unknown_category_is_not_allowed() {
        let (mut store, _) = recording_store(MemoryStorage::new());
        store.accept_all().expect("accept");
        assert!(!store.is_allowed("telemetry"));
        assert!(!store.is_allowed("Analytics"));
    }

    #[test]
    fn stored_record_has_exactly_four_fields_and_a_timestamp() {
        let storage = MemoryStorage::new();
        let (mut store, _) = recording_store(storage.clone());
        store.save_custom(false, true, false).expect("save");

        let raw = storage.get(CONSENT_KEY).expect("get").expect("present");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "necessary": true,
                "analytics": false,
                "marketing": true,
                "preferences": false
            })
        );
        assert!(store.decided_at().expect("date").is_some());
    }

    #[test]
    fn malformed_record_is_reported_and_left_unknown() {
        let storage = MemoryStorage::new();
        storage.set(CONSENT_KEY, "{not json").expect("set");
        let (mut store, calls) = recording_store(storage);

        let err = store.load_or_initialize().unwrap_err();
        assert!(err.is_malformed());
        assert_eq!(store.state(), ConsentState::Unknown);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn missing_field_is_malformed() {
        let storage = MemoryStorage::new();
        storage
            .set(CONSENT_KEY, r#"{"necessary":true,"analytics":true}"#)
            .expect("set");
        let (mut store, _) = recording_store(storage);
        assert!(store.load_or_initialize().unwrap_err().is_malformed());
    }

    #[test]
    fn extra_field_is_malformed() {
        let storage = MemoryStorage::new();
        storage
            .set(
                CONSENT_KEY,
                r#"{"necessary":true,"analytics":true,"marketing":true,"preferences":true,"version":2}"#,
            )
            .expect("set");
        let (mut store, _) = recording_store(storage);
        assert!(store.load_or_initialize().unwrap_err().is_malformed());
    }

    #[test]
    fn necessary_false_is_malformed() {
        let parsed = ConsentPreferences::from_json(
            r#"{"necessary":false,"analytics":true,"marketing":true,"preferences":true}"#,
        );
        assert!(parsed.unwrap_err().is_malformed());
    }

    #[test]
    fn restore_falls_back_to_banner() {
        let storage = MemoryStorage::new();
        storage.set(CONSENT_KEY, "[]").expect("set");
        let (mut store, _) = recording_store(storage);
        assert_eq!(store.restore(), LoadOutcome::PresentBanner);
        assert_eq!(store.state(), ConsentState::Unknown);
    }

    #[test]
    fn reset_returns_to_unknown() {
        let storage = MemoryStorage::new();
        storage.set(VISITED_KEY, "true").expect("set");
        let (mut store, _) = recording_store(storage.clone());
        store.accept_all().expect("accept");

        store.reset().expect("reset");
        assert_eq!(store.state(), ConsentState::Unknown);
        assert!(!store.is_allowed("analytics"));
        assert!(storage.is_empty());
        assert_eq!(
            store.load_or_initialize().expect("load"),
            LoadOutcome::PresentBanner
        );
    }

    #[test]
    fn without_signal_apply_is_noop() {
        let mut store = ConsentStore::new(MemoryStorage::new(), None);
        store.accept_all().expect("accept");
        assert!(store.is_allowed("marketing"));
    }

    struct ReadOnly;

    impl KeyValueStorage for ReadOnly {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".into()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn persist_failure_still_applies_decision() {
        let calls: Calls = Rc::default();
        let sink = Rc::clone(&calls);
        let mut store = ConsentStore::new(
            ReadOnly,
            Some(Box::new(move |c: SignalCategory, g: bool| {
                sink.borrow_mut().push((c, g));
            })),
        );

        let err = store.accept_all().unwrap_err();
        assert!(matches!(err, ConsentError::Storage(_)));
        assert_eq!(store.state(), ConsentState::Decided);
        assert!(store.is_allowed("analytics"));
        assert_eq!(calls.borrow().len(), 4);
    }

    #[test]
    fn category_signals() {
        assert_eq!(ConsentCategory::Analytics.signals().len(), 1);
        assert_eq!(ConsentCategory::Marketing.signals().len(), 3);
        assert!(ConsentCategory::Preferences.signals().is_empty());
        assert_eq!(SignalCategory::AdUserData.to_string(), "ad_user_data");
    }
}
