use std::result::Result as StdResult;

use thiserror::Error;

/// Failures raised while retrieving or validating the field catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed catalog: {0}")]
    Malformed(String),
    #[error("Duplicate storage key `{0}` in taxonomy")]
    DuplicateKey(String),
    #[error("Catalog request failed with HTTP status {0}")]
    Http(u16),
    #[error("Catalog transport error: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Malformed(err.to_string())
    }
}

/// Cursor movements that cannot be satisfied by the loaded taxonomy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("The taxonomy has no categories")]
    EmptyTaxonomy,
    #[error("Unknown category `{0}`")]
    UnknownCategory(String),
    #[error("Unknown subcategory `{sub}` in `{main}`")]
    UnknownSubcategory { main: String, sub: String },
}

/// Rejected edits to a row of the active step.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("No step is open for editing")]
    NoActiveStep,
    #[error("Row {0} does not exist")]
    RowOutOfRange(usize),
    #[error("`{0}` is a section header and cannot be edited")]
    ReadOnly(String),
    #[error("Enter a number using digits and at most one `.`")]
    NotNumeric,
    #[error("At most {0} decimal place(s) allowed")]
    TooManyDecimals(u8),
    #[error("Value is longer than {0} characters")]
    TooLong(usize),
    #[error("Value must be one of: {0}")]
    NotAnOption(String),
    #[error("Use YYYY-MM-DD format")]
    InvalidDate,
    #[error("Value of kind `{0}` does not fit this field")]
    KindMismatch(&'static str),
    #[error("Frequency does not apply to `{0}`")]
    FrequencyNotApplicable(String),
    #[error("Frequency `{0}` is not offered for this field")]
    FrequencyNotOffered(String),
}

/// Outcome of a failed submission attempt. Persisted state is untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Submission rejected with HTTP status {0}")]
    Http(u16),
    #[error("Submission transport error: {0}")]
    Transport(String),
    #[error("Submission timed out")]
    Timeout,
    #[error("Submission aborted")]
    Aborted,
    #[error("A submission is already in progress")]
    InFlight,
    #[error("Could not encode submission payload: {0}")]
    Encode(String),
    #[error("No submission endpoint configured")]
    NoEndpoint,
}

/// Configuration persistence failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Unknown configuration key `{0}`")]
    UnknownKey(String),
    #[error("Invalid value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
}

/// Unified error type for the wizard library.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = StdResult<T, WizardError>;

impl From<serde_json::Error> for WizardError {
    fn from(err: serde_json::Error) -> Self {
        WizardError::Serde(err.to_string())
    }
}
