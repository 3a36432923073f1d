//! Error types shared across Conform crates.

use std::path::PathBuf;

/// Top-level error type for Conform operations.
///
/// Only unrecoverable conditions surface here. Per-item compromises made
/// during a conversion are collected as [`crate::diag::Diagnostic`] entries
/// instead of being raised.
#[derive(Debug, thiserror::Error)]
pub enum ConformError {
    #[error("Container error: {message}")]
    Container { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    #[error("Time conversion error: {message}")]
    Time { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ConformError.
pub type ConformResult<T> = Result<T, ConformError>;

impl ConformError {
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container {
            message: msg.into(),
        }
    }

    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription {
            message: msg.into(),
        }
    }

    pub fn time(msg: impl Into<String>) -> Self {
        Self::Time {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
