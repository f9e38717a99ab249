//! # Site Core
//!
//! Stateful core of the codingmaks.com client layer.
//! Compiles to WASM for the browser and runs natively for tests and tooling.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               site-core.wasm                │
//! ├─────────────────────────────────────────────┤
//! │  Consent          │  Inquiry                │
//! │  - Preferences    │  - Request model        │
//! │  - Decisions      │  - Validation rules     │
//! │  - Consent signal │  - Intake payload       │
//! ├─────────────────────────────────────────────┤
//! │  Storage          │  Visitor / Locale       │
//! │  - Memory / File  │  - First-visit marker   │
//! │  - localStorage   │  - Preferred language   │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod consent;
pub mod error;
pub mod inquiry;
pub mod locale;
pub mod storage;
pub mod visitor;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use consent::{
    ConsentCategory, ConsentPreferences, ConsentSignal, ConsentState, ConsentStore, LoadOutcome,
    SignalCategory,
};
pub use error::{ConsentError, ConsentResult};
pub use inquiry::{
    ErrorKind, InquiryField, InquiryRequest, IntakePayload, ServiceKind, ValidationError,
    ValidationResult,
};
pub use locale::{LanguagePreference, Locale};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use visitor::{VisitKind, VisitorLog};

/// Site core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
