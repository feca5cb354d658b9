//! Rule engine for FingerKonnect
//!
//! Models automation rules, validates and normalizes them, and keeps the
//! ordered rule collection persisted through a pluggable key-value backend.

pub mod error;
pub mod model;
pub mod repeat;
pub mod validator;
pub mod form;
pub mod persistence;
pub mod templates;
pub mod store;

pub use error::{BackendError, InputError, StoreError, ValidationError};
pub use form::RuleForm;
pub use model::*;
pub use persistence::{FileBackend, MemoryBackend, StorageBackend};
pub use repeat::{decode_repeat, encode_repeat, NoRepeat, RepeatMode, RepeatSelection, Weekday};
pub use store::{DeleteOutcome, RuleEvent, RuleStore, StoredRule};
pub use validator::{Check, ValidationPolicy};
