//! Error types for the tally-records crate.

use thiserror::Error;

/// Errors that can occur when reading source records.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// The record backend could not be reached.
    #[error("record store unavailable: {reason}")]
    Unavailable {
        /// Why the backend could not be reached.
        reason: String,
    },

    /// A record exists but could not be decoded.
    #[error("record {id} is corrupt: {reason}")]
    Corrupt {
        /// The id of the corrupt record.
        id: String,
        /// Why decoding failed.
        reason: String,
    },

    /// An identifier could not be parsed.
    #[error("invalid identifier: {reason}")]
    InvalidId {
        /// Why the identifier is invalid.
        reason: String,
    },
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordStoreError>;
