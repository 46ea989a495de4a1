//! Error types for the core library

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Failed to persist tasks to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt task store {}: {reason}", .path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::TaskNotFound(_) | Self::Validation { .. })
    }
}
