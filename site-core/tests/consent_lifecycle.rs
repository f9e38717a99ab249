//! Integration tests for consent and visit state across page reloads.
//!
//! A reload is simulated by dropping every component and building fresh ones
//! over the same data directory.

use site_core::{
    ConsentPreferences, ConsentState, ConsentStore, FileStorage, KeyValueStorage,
    LanguagePreference, LoadOutcome, Locale, VisitKind, VisitorLog,
};

fn open(dir: &std::path::Path) -> FileStorage {
    FileStorage::with_data_dir(dir).expect("storage")
}

#[test]
fn test_first_visit_then_accept_then_reload() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Phase 1: fresh profile
    {
        let storage = open(dir.path());
        let visit = VisitorLog::new(&storage).record_visit().expect("visit");
        assert_eq!(visit, VisitKind::First);

        let mut consent = ConsentStore::new(&storage, None);
        assert_eq!(
            consent.load_or_initialize().expect("load"),
            LoadOutcome::PresentBanner
        );
        consent.accept_all().expect("accept");
    }

    // Phase 2: reload
    let storage = open(dir.path());
    assert_eq!(
        VisitorLog::new(&storage).record_visit().expect("visit"),
        VisitKind::Returning
    );

    let mut consent = ConsentStore::new(&storage, None);
    let outcome = consent.load_or_initialize().expect("load");
    assert_eq!(
        outcome,
        LoadOutcome::Restored(ConsentPreferences::all_granted())
    );
    for category in ["necessary", "analytics", "marketing", "preferences"] {
        assert!(consent.is_allowed(category), "{category} should be allowed");
    }
    assert!(consent.decided_at().expect("date").is_some());
}

#[test]
fn test_decision_overwrites_previous_wholesale() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(dir.path());

    let mut consent = ConsentStore::new(&storage, None);
    consent.accept_all().expect("accept");
    consent.save_custom(false, false, true).expect("custom");

    let mut reloaded = ConsentStore::new(open(dir.path()), None);
    reloaded.load_or_initialize().expect("load");
    assert_eq!(
        reloaded.preferences(),
        ConsentPreferences::custom(false, false, true)
    );
}

#[test]
fn test_reset_clears_consent_and_visit_markers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(dir.path());
    VisitorLog::new(&storage).record_visit().expect("visit");
    LanguagePreference::new(&storage)
        .save(Locale::En)
        .expect("language");

    let mut consent = ConsentStore::new(&storage, None);
    consent.reject_all().expect("reject");
    consent.reset().expect("reset");

    let mut reloaded = ConsentStore::new(open(dir.path()), None);
    assert_eq!(
        reloaded.load_or_initialize().expect("load"),
        LoadOutcome::PresentBanner
    );
    assert_eq!(reloaded.state(), ConsentState::Unknown);
    assert_eq!(
        VisitorLog::new(&storage).record_visit().expect("visit"),
        VisitKind::First
    );
    // Language is not a consent key and survives the reset.
    assert_eq!(
        LanguagePreference::new(&storage).load().expect("language"),
        Locale::En
    );
}

#[test]
fn test_corrupted_file_falls_back_to_banner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = open(dir.path());
    storage
        .set("cookieConsent", "{\"necessary\":true,")
        .expect("write garbage");

    let mut consent = ConsentStore::new(&storage, None);
    assert!(consent
        .load_or_initialize()
        .expect_err("should be malformed")
        .is_malformed());
    assert_eq!(consent.restore(), LoadOutcome::PresentBanner);
    assert!(!consent.is_allowed("analytics"));
}
