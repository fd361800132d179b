//! FILENAME: engine/src/error.rs
//! PURPOSE: API-level failures reported to callers of the workbook.
//! CONTEXT: Value-level problems (#REF!, #DIV/0!, ...) are cell values, not
//! errors. This type only covers malformed arguments to a public call; a
//! failing call leaves the workbook untouched.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkbookError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Invalid cell location: {0}")]
    InvalidLocation(String),

    #[error("Invalid sheet name: {0:?}")]
    InvalidSheetName(String),

    #[error("Sheet name already in use: {0}")]
    DuplicateSheetName(String),

    #[error("Sheet index {index} out of range for {count} sheets")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Invalid sort columns: {0}")]
    InvalidSortColumns(String),

    #[error("Target region falls outside the sheet: {0}")]
    TargetOutOfBounds(String),
}

/// Coarse classification of API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    /// Only produced by document loaders, for values of the wrong type.
    TypeMismatch,
}

impl WorkbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkbookError::SheetNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::InvalidArgument,
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkbookError>;
