//! # site-ops
//!
//! Operator tool for the site's persisted state and contact intake.

use anyhow::Context;
use clap::Parser;
use site_client::{
    CliArgs, ClientConfig, Command, ConsentAction, HttpIntake, InquiryAction, SubmissionOutcome,
};
use site_core::{
    ConsentStore, FileStorage, InquiryRequest, LanguagePreference, LoadOutcome, Locale,
    SignalCategory, ValidationResult, VisitorLog,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_client=info,site_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = ClientConfig::from(args);

    let storage = FileStorage::with_data_dir(&config.data_dir)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;
    let locale = match config.locale {
        Some(locale) => locale,
        None => LanguagePreference::new(&storage).load()?,
    };
    tracing::debug!(%locale, data_dir = %config.data_dir.display(), "site-ops ready");

    match command {
        Command::Consent { action } => run_consent(&storage, action),
        Command::Inquiry { action } => run_inquiry(&config, locale, action).await,
        Command::Visit => {
            let log = VisitorLog::new(&storage);
            let kind = log.record_visit()?;
            println!("visit: {kind:?} (splash: {})", kind.shows_splash());
            if let Some(first) = log.first_visit()? {
                println!("first seen: {}", first.to_rfc3339());
            }
            Ok(())
        }
        Command::Language { code } => {
            let pref = LanguagePreference::new(&storage);
            if let Some(code) = code {
                pref.save(code)?;
            }
            println!("{}", pref.load()?);
            Ok(())
        }
    }
}

/// Logs consent signals instead of forwarding them to a tag manager.
fn log_signal(category: SignalCategory, granted: bool) {
    tracing::info!(
        "consent update: {category} = {}",
        if granted { "granted" } else { "denied" }
    );
}

fn run_consent(storage: &FileStorage, action: ConsentAction) -> anyhow::Result<()> {
    let mut store = ConsentStore::new(storage, Some(Box::new(log_signal)));

    match action {
        ConsentAction::Show => match store.restore() {
            LoadOutcome::PresentBanner => println!("no decision stored; banner would be shown"),
            LoadOutcome::Restored(prefs) => {
                println!("{}", prefs.to_json()?);
                if let Some(at) = store.decided_at()? {
                    println!("decided at: {}", at.to_rfc3339());
                }
            }
        },
        ConsentAction::Accept => store.accept_all()?,
        ConsentAction::Reject => store.reject_all()?,
        ConsentAction::Custom {
            analytics,
            marketing,
            preferences,
        } => store.save_custom(analytics, marketing, preferences)?,
        ConsentAction::Reset => {
            store.reset()?;
            println!("consent and visit markers cleared");
        }
    }
    Ok(())
}

async fn run_inquiry(
    config: &ClientConfig,
    locale: Locale,
    action: InquiryAction,
) -> anyhow::Result<()> {
    match action {
        InquiryAction::Validate(fields) => {
            let request = InquiryRequest::from(fields);
            match request.validate() {
                ValidationResult::Valid => {
                    println!("valid: {}", request.service_label());
                    Ok(())
                }
                ValidationResult::Invalid(errors) => {
                    for error in &errors {
                        println!("{}: {}", error.field.as_str(), error.message(locale));
                    }
                    anyhow::bail!("{} field(s) invalid", errors.len())
                }
            }
        }
        InquiryAction::Submit(fields) => {
            let transport = HttpIntake::new(&config.intake_url)?;
            let submitter = config.submitter(transport, locale);
            let request = InquiryRequest::from(fields);

            println!("{}", locale.sending_label());
            match submitter.submit(&request).await {
                SubmissionOutcome::Success => {
                    println!("inquiry delivered");
                    Ok(())
                }
                outcome @ SubmissionOutcome::ValidationFailed(_) => {
                    for (field, message) in outcome.field_messages(locale) {
                        println!("{}: {message}", field.as_str());
                    }
                    anyhow::bail!("inquiry not sent")
                }
                SubmissionOutcome::TransportFailure(detail) => {
                    tracing::warn!("intake failure: {detail}");
                    anyhow::bail!(submitter.failure_notice())
                }
                SubmissionOutcome::AlreadyInProgress => {
                    anyhow::bail!("a submission is already in progress")
                }
            }
        }
    }
}
