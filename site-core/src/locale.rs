//! Interface language and the user-facing strings that depend on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::inquiry::{ErrorKind, InquiryField};
use crate::storage::{KeyValueStorage, StorageError, LANGUAGE_KEY};

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Polish, the site's primary language.
    #[default]
    Pl,
    /// English.
    En,
}

impl Locale {
    /// Two-letter language code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Pl => "pl",
            Self::En => "en",
        }
    }

    /// Stand-in for optional inquiry fields the visitor left empty.
    #[must_use]
    pub fn not_provided(self) -> &'static str {
        match self {
            Self::Pl => "Nie podano",
            Self::En => "Not provided",
        }
    }

    /// Message shown next to a field that failed validation.
    #[must_use]
    pub fn field_error(self, field: InquiryField, kind: ErrorKind) -> &'static str {
        match (self, field, kind) {
            (Self::Pl, InquiryField::Name, _) => "Imię musi mieć co najmniej 2 znaki",
            (Self::En, InquiryField::Name, _) => "Name must be at least 2 characters",
            (Self::Pl, InquiryField::Email, _) => "Podaj poprawny adres email",
            (Self::En, InquiryField::Email, _) => "Please enter a valid email address",
            (Self::Pl, InquiryField::Service, _) => "Wybierz rodzaj strony internetowej",
            (Self::En, InquiryField::Service, _) => "Please select a website type",
            (Self::Pl, InquiryField::Message, _) => "Wiadomość musi mieć co najmniej 10 znaków",
            (Self::En, InquiryField::Message, _) => "Message must be at least 10 characters",
        }
    }

    /// Single generic message for a failed submission.
    ///
    /// `fallback_email` is suggested as an alternative channel when known.
    #[must_use]
    pub fn transport_failure(self, fallback_email: Option<&str>) -> String {
        match (self, fallback_email) {
            (Self::Pl, Some(email)) => format!(
                "Wystąpił błąd podczas wysyłania. Spróbuj ponownie lub napisz na {email}"
            ),
            (Self::Pl, None) => "Wystąpił błąd podczas wysyłania. Spróbuj ponownie.".to_string(),
            (Self::En, Some(email)) => {
                format!("An error occurred while sending. Please try again or email {email}")
            }
            (Self::En, None) => "An error occurred while sending. Please try again.".to_string(),
        }
    }

    /// Label for the submit button while a submission is in flight.
    #[must_use]
    pub fn sending_label(self) -> &'static str {
        match self {
            Self::Pl => "Wysyłanie...",
            Self::En => "Sending...",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when parsing an unsupported language code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language: {0}")]
pub struct UnknownLocale(pub String);

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pl" => Ok(Self::Pl),
            "en" => Ok(Self::En),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

/// Persisted language choice.
///
/// Written unconditionally, whatever the `preferences` consent category says.
#[derive(Debug, Clone)]
pub struct LanguagePreference<S> {
    storage: S,
}

impl<S: KeyValueStorage> LanguagePreference<S> {
    /// Wrap a storage handle.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The saved language, or the default when nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    pub fn load(&self) -> Result<Locale, StorageError> {
        let stored = self.storage.get(LANGUAGE_KEY)?;
        Ok(stored
            .and_then(|code| match code.parse::<Locale>() {
                Ok(locale) => Some(locale),
                Err(e) => {
                    tracing::debug!("Ignoring stored language: {e}");
                    None
                }
            })
            .unwrap_or_default())
    }

    /// Remember `locale` for the next visit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    pub fn save(&self, locale: Locale) -> Result<(), StorageError> {
        self.storage.set(LANGUAGE_KEY, locale.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn default_is_polish() {
        assert_eq!(Locale::default(), Locale::Pl);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("EN".parse::<Locale>(), Ok(Locale::En));
        assert_eq!(" pl ".parse::<Locale>(), Ok(Locale::Pl));
        assert!("de".parse::<Locale>().is_err());
    }

    #[test]
    fn sentinels_differ_per_locale() {
        assert_eq!(Locale::Pl.not_provided(), "Nie podano");
        assert_eq!(Locale::En.not_provided(), "Not provided");
    }

    #[test]
    fn transport_failure_mentions_fallback() {
        let msg = Locale::En.transport_failure(Some("hello@example.com"));
        assert!(msg.contains("hello@example.com"));
        let msg = Locale::Pl.transport_failure(None);
        assert!(msg.starts_with("Wystąpił błąd"));
    }

    #[test]
    fn preference_defaults_when_missing_or_garbage() {
        let storage = MemoryStorage::new();
        let pref = LanguagePreference::new(storage.clone());
        assert_eq!(pref.load().expect("load"), Locale::Pl);

        storage.set(LANGUAGE_KEY, "klingon").expect("set");
        assert_eq!(pref.load().expect("load"), Locale::Pl);
    }

    #[test]
    fn preference_roundtrip() {
        let storage = MemoryStorage::new();
        let pref = LanguagePreference::new(&storage);
        pref.save(Locale::En).expect("save");
        assert_eq!(storage.get(LANGUAGE_KEY).expect("get").as_deref(), Some("en"));
        assert_eq!(pref.load().expect("load"), Locale::En);
    }
}
