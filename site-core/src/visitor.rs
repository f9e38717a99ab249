//! First-visit tracking.
//!
//! The loading splash only plays for first-time visitors; returning visitors
//! skip straight to the page.

use chrono::{DateTime, Utc};

use crate::storage::{
    iso_timestamp_now, parse_iso_timestamp, KeyValueStorage, StorageError, FIRST_VISIT_KEY,
    VISITED_KEY,
};

/// Value written under the visited key.
const VISITED_SENTINEL: &str = "true";

/// Whether this page load is the visitor's first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitKind {
    /// Nothing on record before this load.
    First,
    /// The visited marker was already present.
    Returning,
}

impl VisitKind {
    /// Whether the loading splash should play.
    #[must_use]
    pub fn shows_splash(self) -> bool {
        self == Self::First
    }
}

/// Visit markers kept in storage.
#[derive(Debug, Clone)]
pub struct VisitorLog<S> {
    storage: S,
}

impl<S: KeyValueStorage> VisitorLog<S> {
    /// Wrap a storage handle.
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Classify this page load and mark the visitor as seen.
    ///
    /// The first-visit timestamp is only written once.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read or written.
    pub fn record_visit(&self) -> Result<VisitKind, StorageError> {
        if self.storage.get(VISITED_KEY)?.is_some() {
            tracing::debug!("Returning visitor");
            return Ok(VisitKind::Returning);
        }

        tracing::debug!("First visit");
        self.storage.set(VISITED_KEY, VISITED_SENTINEL)?;
        self.storage.set(FIRST_VISIT_KEY, &iso_timestamp_now())?;
        Ok(VisitKind::First)
    }

    /// Whether the visited marker holds the expected sentinel.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    pub fn has_visited(&self) -> Result<bool, StorageError> {
        Ok(self.storage.get(VISITED_KEY)?.as_deref() == Some(VISITED_SENTINEL))
    }

    /// When the visitor was first seen.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    pub fn first_visit(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let stored = self.storage.get(FIRST_VISIT_KEY)?;
        Ok(stored.as_deref().and_then(parse_iso_timestamp))
    }
}
