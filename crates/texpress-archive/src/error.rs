//! Error types for batch packaging

use std::path::PathBuf;

use texpress_core::PdfError;
use thiserror::Error;

/// Errors that can occur while packing a batch
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// No documents were given
    #[error("Cannot pack an empty batch")]
    EmptyBatch,

    /// The zip container could not be created or written
    #[error("Failed to create archive {}: {reason}", path.display())]
    ArchiveCreationFailed { path: PathBuf, reason: String },

    /// One of the documents failed to compile
    #[error(transparent)]
    Compile(#[from] PdfError),

    /// Error reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub(crate) fn creation(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArchiveCreationFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for packaging operations
pub type Result<T> = std::result::Result<T, ArchiveError>;
