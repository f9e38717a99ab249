//! Contact-form submission with a single-flight guard.
//!
//! ```text
//!        submit()                 response / failure
//!   Idle ────────▶ Submitting ─────────────────────────▶ Idle
//!                      │
//!                      └── submit() ──▶ AlreadyInProgress
//! ```
//!
//! The Submitting flag is owned by a drop guard, so it is cleared on every
//! exit path, including when the caller drops the future mid-flight.

use std::sync::atomic::{AtomicBool, Ordering};

use site_core::{InquiryField, InquiryRequest, Locale, ValidationError, ValidationResult};

use crate::intake::IntakeTransport;

/// How a call to [`InquirySubmitter::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The endpoint accepted the inquiry.
    Success,
    /// Another submission is in flight; nothing was done.
    AlreadyInProgress,
    /// The inquiry was rejected locally; nothing was sent.
    ValidationFailed(Vec<ValidationError>),
    /// Sending failed or the endpoint refused the inquiry.
    TransportFailure(String),
}

impl SubmissionOutcome {
    /// Whether the inquiry was delivered.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Localized per-field messages for a validation failure.
    #[must_use]
    pub fn field_messages(&self, locale: Locale) -> Vec<(InquiryField, &'static str)> {
        match self {
            Self::ValidationFailed(errors) => errors
                .iter()
                .map(|e| (e.field, e.message(locale)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Validates inquiries and delivers them through an [`IntakeTransport`].
#[derive(Debug)]
pub struct InquirySubmitter<T> {
    transport: T,
    locale: Locale,
    access_key: Option<String>,
    fallback_email: Option<String>,
    submitting: AtomicBool,
}

impl<T: IntakeTransport> InquirySubmitter<T> {
    /// Create an idle submitter.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            locale: Locale::default(),
            access_key: None,
            fallback_email: None,
            submitting: AtomicBool::new(false),
        }
    }

    /// Language for sentinels and user-facing messages.
    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Intake provider form key, sent with every payload.
    #[must_use]
    pub fn with_access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Address suggested to the visitor when sending fails.
    #[must_use]
    pub fn with_fallback_email(mut self, email: impl Into<String>) -> Self {
        self.fallback_email = Some(email.into());
        self
    }

    /// Configured language.
    #[must_use]
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Check an inquiry without sending it.
    #[must_use]
    pub fn validate(&self, request: &InquiryRequest) -> ValidationResult {
        request.validate()
    }

    /// The single message shown to the visitor after a transport failure.
    #[must_use]
    pub fn failure_notice(&self) -> String {
        self.locale.transport_failure(self.fallback_email.as_deref())
    }

    /// Validate `request` and, if it passes, deliver it once.
    ///
    /// Never retries. Returns [`SubmissionOutcome::AlreadyInProgress`]
    /// immediately while another call on this instance is pending.
    pub async fn submit(&self, request: &InquiryRequest) -> SubmissionOutcome {
        let Some(_guard) = SubmitGuard::acquire(&self.submitting) else {
            tracing::debug!("Submission already in flight, ignoring");
            return SubmissionOutcome::AlreadyInProgress;
        };

        if let ValidationResult::Invalid(errors) = request.validate() {
            tracing::debug!(count = errors.len(), "Inquiry failed validation");
            return SubmissionOutcome::ValidationFailed(errors);
        }

        let payload = request.to_payload(self.locale, self.access_key.as_deref());
        tracing::info!(service = request.service_label(), "Submitting inquiry");

        match self.transport.post(&payload).await {
            Ok(response) if response.is_success() => {
                tracing::info!("Inquiry delivered");
                SubmissionOutcome::Success
            }
            Ok(response) => {
                let detail = response
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", response.status));
                tracing::warn!(status = response.status, "Intake refused inquiry: {detail}");
                SubmissionOutcome::TransportFailure(detail)
            }
            Err(e) => {
                tracing::warn!("Inquiry delivery failed: {e}");
                SubmissionOutcome::TransportFailure(e.to_string())
            }
        }
    }
}

/// Holds the Submitting flag for the duration of one submission.
struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
