//! FILENAME: persistence/src/error.rs

use engine::{ErrorKind, WorkbookError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Unexpected value type: {0}")]
    TypeMismatch(String),

    #[error("Invalid workbook content: {0}")]
    Workbook(#[from] WorkbookError),
}

impl PersistenceError {
    /// Maps the failure onto the workbook's error classification.
    /// Unreadable input counts as a bad argument.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistenceError::MissingKey(_) | PersistenceError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            PersistenceError::Workbook(e) => e.kind(),
            PersistenceError::Io(_) | PersistenceError::Json(_) => ErrorKind::InvalidArgument,
        }
    }
}
