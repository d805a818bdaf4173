//! Error types for the tally-alerts crate.

use thiserror::Error;

/// Errors that can occur in the detection subsystem.
///
/// The fire-and-forget event path swallows all of these after logging;
/// they surface only through the store's query methods.
#[derive(Debug, Error)]
pub enum AlertError {
    /// No alert exists with the given id.
    #[error("alert not found: {id}")]
    AlertNotFound {
        /// The alert id that was not found.
        id: String,
    },

    /// A source record could not be read.
    #[error("source record read failed: {0}")]
    RecordStore(#[from] tally_records::RecordStoreError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
