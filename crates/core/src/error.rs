//! Error types for pancarte
//!
//! This module defines the error taxonomy shared by every layer of the store.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::record::RecordKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pancarte operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the pancarte store
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input to a write or read call.
    ///
    /// Rejected before the record enters the buffer; never corrupts state.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A stored block could not be decoded
    #[error("Malformed block {}: {reason}", path.display())]
    MalformedBlock {
        /// Path of the offending block file
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// A block with the same span already exists on disk
    #[error("Duplicate block: {} already exists", path.display())]
    DuplicateBlock {
        /// Path that was about to be overwritten
        path: PathBuf,
    },

    /// A read filter names a field the requested kind does not have
    #[error("Unknown filter field '{field}' for {kind} records")]
    UnknownFilterField {
        /// Field name supplied by the caller
        field: String,
        /// Record kind whose schema lacks the field
        kind: RecordKind,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error (directory creation, block write, listing)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store has been closed and no longer accepts writes
    #[error("Store is closed")]
    Closed,
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a malformed block error
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::MalformedBlock {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error concerns a single unreadable block.
    ///
    /// Range scans skip such blocks instead of aborting.
    pub fn is_malformed_block(&self) -> bool {
        matches!(self, Error::MalformedBlock { .. })
    }
}
