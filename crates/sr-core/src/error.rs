//! Error types for Smart Redirect.
//!
//! None of these are fatal: the interceptor falls back to letting the
//! navigation load, and the editing surfaces report the message and keep
//! their last known good state.

use thiserror::Error;

/// Malformed input that could not be parsed.
#[derive(Error, Debug)]
pub enum ParseError {
    /// URL without a usable scheme or host
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Import text is not JSON at all
    #[error("Error importing rules. Please check the file format. ({0})")]
    InvalidJson(#[from] serde_json::Error),

    /// JSON without a top-level `rules` array
    #[error("Invalid file format: expected a top-level \"rules\" array")]
    InvalidImportFormat,

    /// An entry of the `rules` array is unusable
    #[error("Invalid rule at index {index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    /// Import file is not a `.json` file
    #[error("Please select a valid JSON file")]
    NotJsonFile,
}

/// Failure of the underlying persistence layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO error
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Another holder of the store panicked mid-write
    #[error("storage lock poisoned")]
    Poisoned,

    /// Backend refused the operation
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A "rules changed" message could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("message channel closed: {0}")]
pub struct NotifyError(pub String);

/// Rejected form input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid source website")]
    SourceTooShort,

    #[error("Please enter a destination URL")]
    MissingDestination,

    #[error("Please enter a valid destination URL (include http:// or https://)")]
    InvalidDestination,

    #[error("Source website should be just the domain name (without http://)")]
    SourceHasScheme,

    #[error("A rule for this website already exists!")]
    DuplicateRule,
}

/// Error type for rule editing operations.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No rule with this id in the current list
    #[error("rule not found: {0}")]
    RuleNotFound(String),

    #[error("No rules to export")]
    NothingToExport,

    #[error("No rules to clear")]
    NothingToClear,

    /// The user answered "no" to a confirmation
    #[error("operation cancelled")]
    Declined,

    /// Rules were saved but the background could not be told
    #[error("rules saved, but the background was not notified: {0}")]
    NotifyFailed(#[from] NotifyError),

    /// The popup has no page to create a rule for
    #[error("Unable to detect current site")]
    NoCurrentSite,
}

/// Result type alias for editing operations.
pub type Result<T> = std::result::Result<T, EditorError>;
