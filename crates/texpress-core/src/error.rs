//! Error types for PDF generation

use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::CompilationError;

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Errors that can occur during PDF generation
#[derive(Error, Debug)]
pub enum PdfError {
    /// Template id did not resolve in the template host
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A typesetting pass exited unsuccessfully or timed out
    #[error("Compiler invocation failed: {0}")]
    CompilerInvocationFailed(Box<CompilationError>),

    /// The temporary workspace could not be allocated or written
    #[error("Workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PdfError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdfError::Workspace {
            path: path.into(),
            source,
        }
    }

    /// The diagnosed compiler failure, if this error carries one
    pub fn compilation(&self) -> Option<&CompilationError> {
        match self {
            PdfError::CompilerInvocationFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
