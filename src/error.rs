// Error types for the analytics pipeline
// One variant per failure kind the pipeline can surface

use thiserror::Error;

/// Failure kinds for the upload-to-report pipeline.
///
/// `Parse` and `MissingColumn` are user-data errors (the request can be
/// retried with a corrected file); `Render` and `Io` are server-side faults.
/// The missing-upload case is handled locally by the HTTP layer and never
/// reaches this enum, and the optional treemap capability is a configuration
/// flag rather than an error.
#[derive(Debug, Error)]
pub enum InsightError {
    /// The uploaded bytes are not well-formed delimited text.
    #[error("failed to parse CSV: {0}")]
    Parse(String),

    /// A column the fixed chart catalog depends on is absent.
    #[error("required column '{0}' is missing from the dataset")]
    MissingColumn(String),

    /// A value column referenced by an aggregation is not numeric.
    #[error("column '{0}' is not numeric")]
    NonNumeric(String),

    /// A mandatory chart failed to render; fatal for the whole request.
    #[error("failed to render chart '{title}': {message}")]
    Render { title: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InsightError {
    pub fn render(title: &str, message: impl ToString) -> Self {
        InsightError::Render {
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    /// True when the failure is caused by the uploaded data rather than the
    /// server, so the HTTP layer can pick a 4xx status.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InsightError::Parse(_) | InsightError::MissingColumn(_) | InsightError::NonNumeric(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
