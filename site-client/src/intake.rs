//! HTTP transport to the remote inquiry intake endpoint.
//!
//! The endpoint takes a JSON body and answers with a JSON object. Only the
//! status code decides success; a `message` field, when present, is carried
//! along as failure detail.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use site_core::IntakePayload;
use thiserror::Error;
use url::Url;

/// Default intake endpoint.
pub const DEFAULT_INTAKE_URL: &str = "https://api.web3forms.com/submit";

const JSON_MIME: &str = "application/json";

/// Errors that can occur while talking to the intake endpoint.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The configured endpoint URL is invalid.
    #[error("invalid intake URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("intake HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A 200 response body was not a JSON object.
    #[error("malformed intake response: {0}")]
    MalformedBody(String),
}

/// What the endpoint answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeResponse {
    /// HTTP status code.
    pub status: u16,
    /// `message` field of the JSON body, if any.
    pub message: Option<String>,
}

impl IntakeResponse {
    /// Whether the endpoint accepted the inquiry.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Sends an inquiry payload somewhere and reports the answer.
#[async_trait]
pub trait IntakeTransport: Send + Sync {
    /// Perform a single delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError`] when no well-formed answer was received.
    async fn post(&self, payload: &IntakePayload) -> Result<IntakeResponse, IntakeError>;
}

/// Posts inquiries to the intake endpoint over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpIntake {
    http: Client,
    endpoint: Url,
}

impl HttpIntake {
    /// Create a transport for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidUrl`] if the URL is malformed or not HTTP(S).
    /// Returns [`IntakeError::Http`] if the HTTP client fails to build.
    pub fn new(endpoint: &str) -> Result<Self, IntakeError> {
        let endpoint =
            Url::parse(endpoint).map_err(|e| IntakeError::InvalidUrl(e.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(IntakeError::InvalidUrl(format!(
                "unsupported scheme: {}",
                endpoint.scheme()
            )));
        }

        let http = Client::builder()
            .user_agent(concat!("site-client/", env!("CARGO_PKG_VERSION")))
            // Disable proxy detection to avoid macOS system-configuration panic
            .no_proxy()
            .build()?;

        Ok(Self { http, endpoint })
    }

    /// The endpoint inquiries are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl IntakeTransport for HttpIntake {
    async fn post(&self, payload: &IntakePayload) -> Result<IntakeResponse, IntakeError> {
        tracing::debug!("POST {}", self.endpoint);
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_MIME)
            .header(ACCEPT, JSON_MIME)
            .json(payload)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, "Intake responded");

        parse_body(status, &body)
    }
}

/// A refusal with an unreadable body is still reported by its status; only an
/// unreadable body on 200 is an error.
fn parse_body(status: u16, body: &str) -> Result<IntakeResponse, IntakeError> {
    let parsed = serde_json::from_str::<Value>(body)
        .map_err(|e| e.to_string())
        .and_then(|value| match value {
            Value::Object(fields) => Ok(fields),
            _ => Err("expected a JSON object".to_string()),
        });

    match parsed {
        Ok(fields) => {
            let message = fields
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            Ok(IntakeResponse { status, message })
        }
        Err(reason) if status == 200 => Err(IntakeError::MalformedBody(reason)),
        Err(reason) => {
            tracing::debug!(status, "Ignoring unreadable refusal body: {reason}");
            Ok(IntakeResponse {
                status,
                message: None,
            })
        }
    }
}
