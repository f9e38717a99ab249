//! # Site Client
//!
//! Native side of the codingmaks site: delivers contact-form inquiries to
//! the remote intake endpoint and exposes the consent and visitor state
//! through the `site-ops` operator tool.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p site-client -- consent show
//! cargo run -p site-client -- inquiry submit --name "Ala" --email ala@example.com \
//!     --service onepage --message "Potrzebuję prostej strony."
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ClientConfig` - Intake endpoint, access key, data directory and language
//! - `HttpIntake` - reqwest transport implementing `IntakeTransport`
//! - `InquirySubmitter` - Validation plus single-flight delivery

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod intake;
mod submitter;

pub use intake::{HttpIntake, IntakeError, IntakeResponse, IntakeTransport, DEFAULT_INTAKE_URL};
pub use submitter::{InquirySubmitter, SubmissionOutcome};

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use site_core::{InquiryRequest, Locale};

/// Default directory for persisted site state.
pub const DEFAULT_DATA_DIR: &str = ".site-data";

/// Command-line arguments for site-ops.
#[derive(Debug, Clone, Parser)]
#[command(name = "site-ops")]
#[command(about = "Inspect site consent state and deliver contact inquiries")]
#[command(version)]
pub struct CliArgs {
    /// Intake endpoint URL
    #[arg(long, env = "SITE_INTAKE_URL", default_value = DEFAULT_INTAKE_URL, global = true)]
    pub intake_url: String,

    /// Intake provider form access key
    #[arg(long, env = "SITE_ACCESS_KEY", hide_env_values = true, global = true)]
    pub access_key: Option<String>,

    /// Address suggested to visitors when sending fails
    #[arg(long, env = "SITE_FALLBACK_EMAIL", global = true)]
    pub fallback_email: Option<String>,

    /// Directory holding persisted site state
    #[arg(long, env = "SITE_DATA_DIR", default_value = DEFAULT_DATA_DIR, global = true)]
    pub data_dir: PathBuf,

    /// Language override (pl, en); defaults to the stored preference
    #[arg(long, env = "SITE_LOCALE", global = true)]
    pub locale: Option<Locale>,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Inspect or change the stored cookie consent
    Consent {
        /// Consent operation
        #[command(subcommand)]
        action: ConsentAction,
    },
    /// Validate or deliver a contact inquiry
    Inquiry {
        /// Inquiry operation
        #[command(subcommand)]
        action: InquiryAction,
    },
    /// Record a page visit and report whether the splash would play
    Visit,
    /// Show the preferred language, or store a new one
    Language {
        /// Language to store (pl, en)
        code: Option<Locale>,
    },
}

/// Consent operations.
#[derive(Debug, Clone, Subcommand)]
pub enum ConsentAction {
    /// Print the stored decision
    Show,
    /// Grant every category
    Accept,
    /// Keep only necessary storage
    Reject,
    /// Store a per-category decision
    Custom {
        /// Allow analytics
        #[arg(long)]
        analytics: bool,
        /// Allow marketing
        #[arg(long)]
        marketing: bool,
        /// Allow preference storage
        #[arg(long)]
        preferences: bool,
    },
    /// Forget the decision and the visit markers
    Reset,
}

/// Inquiry operations.
#[derive(Debug, Clone, Subcommand)]
pub enum InquiryAction {
    /// Check the fields without sending
    Validate(InquiryArgs),
    /// Validate and send to the intake endpoint
    Submit(InquiryArgs),
}

/// Contact form fields.
#[derive(Debug, Clone, Args)]
pub struct InquiryArgs {
    /// Visitor name
    #[arg(long, default_value = "")]
    pub name: String,
    /// Reply address
    #[arg(long, default_value = "")]
    pub email: String,
    /// Website type (onepage, static, wordpress, ecommerce, webapp, other)
    #[arg(long, default_value = "")]
    pub service: String,
    /// Project description
    #[arg(long, default_value = "")]
    pub message: String,
    /// Company name
    #[arg(long)]
    pub company: Option<String>,
    /// Budget range
    #[arg(long)]
    pub budget: Option<String>,
    /// Desired timeline
    #[arg(long)]
    pub timeline: Option<String>,
}

impl From<InquiryArgs> for InquiryRequest {
    fn from(args: InquiryArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            company: args.company,
            service: args.service,
            message: args.message,
            budget: args.budget,
            timeline: args.timeline,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Intake endpoint URL.
    pub intake_url: String,
    /// Intake provider form access key.
    pub access_key: Option<String>,
    /// Address suggested to visitors when sending fails.
    pub fallback_email: Option<String>,
    /// Directory holding persisted site state.
    pub data_dir: PathBuf,
    /// Language override; `None` means use the stored preference.
    pub locale: Option<Locale>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            intake_url: DEFAULT_INTAKE_URL.to_string(),
            access_key: None,
            fallback_email: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            locale: None,
        }
    }

    /// Build a submitter over `transport` using this configuration.
    #[must_use]
    pub fn submitter<T: IntakeTransport>(
        &self,
        transport: T,
        locale: Locale,
    ) -> InquirySubmitter<T> {
        let mut submitter = InquirySubmitter::new(transport).with_locale(locale);
        if let Some(ref key) = self.access_key {
            submitter = submitter.with_access_key(key.clone());
        }
        if let Some(ref email) = self.fallback_email {
            submitter = submitter.with_fallback_email(email.clone());
        }
        submitter
    }
}

impl From<CliArgs> for ClientConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            intake_url: args.intake_url,
            access_key: args.access_key,
            fallback_email: args.fallback_email,
            data_dir: args.data_dir,
            locale: args.locale,
        }
    }
}
