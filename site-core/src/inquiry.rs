//! Contact inquiries: the request model and its client-side validation.
//!
//! Validation collects every violation instead of stopping at the first, so
//! the form can mark all offending fields at once. Optional fields are never
//! validated; they are replaced by the locale's "not provided" sentinel when
//! the request is turned into an [`IntakePayload`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::locale::Locale;

/// Minimum trimmed length of the name field.
pub const MIN_NAME_LEN: usize = 2;

/// Minimum trimmed length of the message field.
pub const MIN_MESSAGE_LEN: usize = 10;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Fields of the contact form that carry validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InquiryField {
    /// Visitor's name.
    Name,
    /// Reply address.
    Email,
    /// Selected service category.
    Service,
    /// Free-form project description.
    Message,
}

impl InquiryField {
    /// Form field name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Service => "service",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for InquiryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Shorter than the field's minimum after trimming.
    TooShort,
    /// Does not look like an email address.
    InvalidFormat,
    /// Missing or blank.
    Required,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TooShort => "TooShort",
            Self::InvalidFormat => "InvalidFormat",
            Self::Required => "Required",
        };
        f.write_str(s)
    }
}

/// A single rejected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: {kind}")]
pub struct ValidationError {
    /// The offending field.
    pub field: InquiryField,
    /// What is wrong with it.
    pub kind: ErrorKind,
}

impl ValidationError {
    /// Create a validation error.
    #[must_use]
    pub fn new(field: InquiryField, kind: ErrorKind) -> Self {
        Self { field, kind }
    }

    /// Localized message for display next to the field.
    #[must_use]
    pub fn message(&self, locale: Locale) -> &'static str {
        locale.field_error(self.field, self.kind)
    }
}

/// Outcome of [`InquiryRequest::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every rule passed.
    Valid,
    /// One or more rules failed, in form order. Never empty.
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    /// Whether every rule passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// The collected violations, empty when valid.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    fn from_errors(errors: Vec<ValidationError>) -> Self {
        if errors.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(errors)
        }
    }
}

/// Service categories offered on the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Single-page site.
    Onepage,
    /// Multi-page static site.
    Static,
    /// WordPress CMS.
    Wordpress,
    /// Online shop.
    Ecommerce,
    /// Web application.
    Webapp,
    /// Anything else.
    Other,
}

impl ServiceKind {
    /// All known categories, in form order.
    pub const ALL: [Self; 6] = [
        Self::Onepage,
        Self::Static,
        Self::Wordpress,
        Self::Ecommerce,
        Self::Webapp,
        Self::Other,
    ];

    /// Selector value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Onepage => "onepage",
            Self::Static => "static",
            Self::Wordpress => "wordpress",
            Self::Ecommerce => "ecommerce",
            Self::Webapp => "webapp",
            Self::Other => "other",
        }
    }

    /// Human-readable label used in inquiry summaries.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Onepage => "One Page Website",
            Self::Static => "Strona Statyczna (Multi-page)",
            Self::Wordpress => "WordPress CMS",
            Self::Ecommerce => "Sklep E-commerce",
            Self::Webapp => "Aplikacja Web",
            Self::Other => "Projekt Indywidualny",
        }
    }

    /// Look up a selector value.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

/// A contact inquiry as entered in the form.
///
/// Optional fields are `None` when the visitor left them empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryRequest {
    /// Visitor's name.
    pub name: String,
    /// Reply address.
    pub email: String,
    /// Company name.
    #[serde(default)]
    pub company: Option<String>,
    /// Selected service category value.
    pub service: String,
    /// Project description.
    pub message: String,
    /// Budget bracket.
    #[serde(default)]
    pub budget: Option<String>,
    /// Expected timeline.
    #[serde(default)]
    pub timeline: Option<String>,
}

impl InquiryRequest {
    /// Create a request from the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        service: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            service: service.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Set the company name.
    #[must_use]
    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Set the budget bracket.
    #[must_use]
    pub fn with_budget(mut self, budget: impl Into<String>) -> Self {
        self.budget = Some(budget.into());
        self
    }

    /// Set the expected timeline.
    #[must_use]
    pub fn with_timeline(mut self, timeline: impl Into<String>) -> Self {
        self.timeline = Some(timeline.into());
        self
    }

    /// Check every rule and collect all violations.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.name.trim().chars().count() < MIN_NAME_LEN {
            errors.push(ValidationError::new(InquiryField::Name, ErrorKind::TooShort));
        }
        if !is_valid_email(&self.email) {
            errors.push(ValidationError::new(
                InquiryField::Email,
                ErrorKind::InvalidFormat,
            ));
        }
        if self.service.trim().is_empty() {
            errors.push(ValidationError::new(
                InquiryField::Service,
                ErrorKind::Required,
            ));
        }
        if self.message.trim().chars().count() < MIN_MESSAGE_LEN {
            errors.push(ValidationError::new(
                InquiryField::Message,
                ErrorKind::TooShort,
            ));
        }

        ValidationResult::from_errors(errors)
    }

    /// Known service category, if the selector value is one.
    #[must_use]
    pub fn service_kind(&self) -> Option<ServiceKind> {
        ServiceKind::from_value(&self.service)
    }

    /// Label for the selected service, falling back to the raw value.
    #[must_use]
    pub fn service_label(&self) -> &str {
        self.service_kind()
            .map_or(self.service.as_str(), |kind| kind.label())
    }

    /// Build the body sent to the intake endpoint.
    ///
    /// Fields are sent as entered. Optional fields that are empty or blank
    /// become `locale`'s sentinel.
    #[must_use]
    pub fn to_payload(&self, locale: Locale, access_key: Option<&str>) -> IntakePayload {
        let fill = |value: &Option<String>| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(locale.not_provided())
                .to_string()
        };

        IntakePayload {
            access_key: access_key.map(str::to_string),
            name: self.name.clone(),
            email: self.email.clone(),
            company: fill(&self.company),
            service: self.service.clone(),
            message: self.message.clone(),
            budget: fill(&self.budget),
            timeline: fill(&self.timeline),
        }
    }
}

/// Whether `email` looks like `local@domain.tld`.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// JSON body posted to the intake endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakePayload {
    /// Intake provider form key, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    /// Visitor's name.
    pub name: String,
    /// Reply address.
    pub email: String,
    /// Company name or sentinel.
    pub company: String,
    /// Selected service category value.
    pub service: String,
    /// Project description.
    pub message: String,
    /// Budget bracket or sentinel.
    pub budget: String,
    /// Expected timeline or sentinel.
    pub timeline: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> InquiryRequest {
        InquiryRequest::new(
            "Ala",
            "ala@example.com",
            "onepage",
            "Potrzebuję strony wizytówki.",
        )
    }

    fn kinds(result: &ValidationResult) -> Vec<(InquiryField, ErrorKind)> {
        result.errors().iter().map(|e| (e.field, e.kind)).collect()
    }

    #[test]
    fn valid_request_passes() {
        assert_eq!(valid_request().validate(), ValidationResult::Valid);
    }

    #[test]
    fn short_message_is_the_only_error() {
        let req = InquiryRequest::new("Al", "a@b.com", "onepage", "short");
        assert_eq!(
            kinds(&req.validate()),
            vec![(InquiryField::Message, ErrorKind::TooShort)]
        );
    }

    #[test]
    fn name_is_trimmed_before_length_check() {
        let mut req = valid_request();
        req.name = "  A  ".to_string();
        assert_eq!(
            kinds(&req.validate()),
            vec![(InquiryField::Name, ErrorKind::TooShort)]
        );
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        let mut req = valid_request();
        req.name = "Łó".to_string();
        assert!(req.validate().is_valid());
    }

    #[test]
    fn blank_service_is_required() {
        let mut req = valid_request();
        req.service = "   ".to_string();
        assert_eq!(
            kinds(&req.validate()),
            vec![(InquiryField::Service, ErrorKind::Required)]
        );
    }

    #[test]
    fn unknown_service_value_is_accepted() {
        let mut req = valid_request();
        req.service = "landing-v2".to_string();
        assert!(req.validate().is_valid());
        assert_eq!(req.service_label(), "landing-v2");
    }

    #[test]
    fn all_rules_violated_reports_four_in_form_order() {
        let req = InquiryRequest::new("", "nope", "", "");
        assert_eq!(
            kinds(&req.validate()),
            vec![
                (InquiryField::Name, ErrorKind::TooShort),
                (InquiryField::Email, ErrorKind::InvalidFormat),
                (InquiryField::Service, ErrorKind::Required),
                (InquiryField::Message, ErrorKind::TooShort),
            ]
        );
    }

    #[test]
    fn email_pattern_cases() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.domain.pl"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email("a@@b.c"));
        assert!(!is_valid_email(" a@b.c"));
    }

    #[test]
    fn payload_fills_sentinels_per_locale() {
        let req = valid_request().with_company("   ");
        let pl = req.to_payload(Locale::Pl, None);
        assert_eq!(pl.company, "Nie podano");
        assert_eq!(pl.budget, "Nie podano");
        assert_eq!(pl.timeline, "Nie podano");

        let en = req.with_budget("5-10k").to_payload(Locale::En, None);
        assert_eq!(en.company, "Not provided");
        assert_eq!(en.budget, "5-10k");
    }

    #[test]
    fn payload_keeps_values_as_entered() {
        let req = InquiryRequest::new(
            " Ala ",
            "ala@example.com",
            "wordpress",
            "  Nowa strona WWW. ",
        )
        .with_timeline(" ASAP ");
        let payload = req.to_payload(Locale::Pl, None);
        assert_eq!(payload.name, " Ala ");
        assert_eq!(payload.message, "  Nowa strona WWW. ");
        assert_eq!(payload.service, "wordpress");
        assert_eq!(payload.timeline, " ASAP ");
    }

    #[test]
    fn payload_omits_missing_access_key() {
        let json = serde_json::to_value(valid_request().to_payload(Locale::Pl, None))
            .expect("serialize");
        assert!(json.get("access_key").is_none());
        assert_eq!(json["service"], "onepage");

        let json = serde_json::to_value(valid_request().to_payload(Locale::Pl, Some("k-123")))
            .expect("serialize");
        assert_eq!(json["access_key"], "k-123");
    }

    #[test]
    fn service_labels() {
        assert_eq!(ServiceKind::from_value("webapp"), Some(ServiceKind::Webapp));
        assert_eq!(valid_request().service_label(), "One Page Website");
        assert!(ServiceKind::from_value("Webapp").is_none());
    }

    #[test]
    fn validation_error_display_and_message() {
        let err = ValidationError::new(InquiryField::Email, ErrorKind::InvalidFormat);
        assert_eq!(err.to_string(), "email: InvalidFormat");
        assert_eq!(err.message(Locale::En), "Please enter a valid email address");
    }
}
