//! Error types for the rule engine

use thiserror::Error;

/// Reasons a candidate rule is rejected by the validator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No action selected
    #[error("Please select an action.")]
    MissingAction,

    /// Name is mandatory under the active policy and is blank
    #[error("Please enter a name for the event.")]
    MissingName,

    /// Neither a sensor threshold nor a date/time was given
    #[error(
        "You must specify at least one condition (humidity, temperature, luminosity) OR a date/time."
    )]
    EmptyCondition,

    /// Only one of date/hour was given without any sensor threshold
    #[error("A date and an hour are both required when no sensor condition is set.")]
    IncompleteSchedule,

    /// Date is not `DD/MM/YYYY`
    #[error("Invalid date (expected DD/MM/YYYY): {0}")]
    InvalidDate(String),

    /// Hour is not `HH:MM`
    #[error("Invalid hour (expected HH:MM): {0}")]
    InvalidHour(String),
}

impl ValidationError {
    /// Stable error code for API clients
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAction => "MISSING_ACTION",
            Self::MissingName => "MISSING_NAME",
            Self::EmptyCondition => "EMPTY_CONDITION",
            Self::IncompleteSchedule => "INCOMPLETE_SCHEDULE",
            Self::InvalidDate(_) => "INVALID_DATE",
            Self::InvalidHour(_) => "INVALID_HOUR",
        }
    }
}

/// Rejected form input; the field keeps its previous value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: String,
    },

    #[error("{field} is not a number: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be formatted as {expected}, got {value}")]
    BadFormat {
        field: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

/// Errors from a storage backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("Storage error: {0}")]
    Other(String),
}

/// Errors that can occur in the rule store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Draft rejected by the validator; nothing changed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Position is outside the collection
    #[error("Rule index {index} out of range (len {len})")]
    Index { index: usize, len: usize },

    /// No rule with this id
    #[error("Rule not found: {0}")]
    NotFound(String),

    /// No template with this name
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Persisted collection could not be read or parsed
    #[error("Failed to load rules: {0}")]
    Load(String),

    /// The in-memory change at `index` happened but was not saved
    #[error("Rule {index} changed but could not be saved: {source}")]
    Persist {
        index: usize,
        #[source]
        source: BackendError,
    },
}

