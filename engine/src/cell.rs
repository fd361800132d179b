//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct, the `CellValue` enum and the
//! error taxonomy. It separates the user's input (contents) from the calculated
//! result (value), and keeps the parsed formula cached next to both.

use crate::dependency_graph::CellId;
use parser::{ErrorLiteral, Expression};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kinds of error a cell can hold.
/// Declaration order is propagation priority: when several operands are
/// errors, the one that sorts first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CellErrorType {
    Parse,             // #ERROR!
    CircularReference, // #CIRCREF!
    BadReference,      // #REF!
    BadName,           // #NAME?
    TypeError,         // #VALUE!
    DivideByZero,      // #DIV/0!
}

impl CellErrorType {
    pub fn literal(&self) -> &'static str {
        ErrorLiteral::from(*self).as_str()
    }
}

impl From<ErrorLiteral> for CellErrorType {
    fn from(literal: ErrorLiteral) -> Self {
        match literal {
            ErrorLiteral::Error => CellErrorType::Parse,
            ErrorLiteral::CircRef => CellErrorType::CircularReference,
            ErrorLiteral::Ref => CellErrorType::BadReference,
            ErrorLiteral::Name => CellErrorType::BadName,
            ErrorLiteral::Value => CellErrorType::TypeError,
            ErrorLiteral::Div0 => CellErrorType::DivideByZero,
        }
    }
}

impl From<CellErrorType> for ErrorLiteral {
    fn from(kind: CellErrorType) -> Self {
        match kind {
            CellErrorType::Parse => ErrorLiteral::Error,
            CellErrorType::CircularReference => ErrorLiteral::CircRef,
            CellErrorType::BadReference => ErrorLiteral::Ref,
            CellErrorType::BadName => ErrorLiteral::Name,
            CellErrorType::TypeError => ErrorLiteral::Value,
            CellErrorType::DivideByZero => ErrorLiteral::Div0,
        }
    }
}

/// An error value. Equality looks at the kind only; `detail` is diagnostic text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellError {
    pub kind: CellErrorType,
    pub detail: String,
}

impl CellError {
    pub fn new(kind: CellErrorType, detail: impl Into<String>) -> Self {
        CellError {
            kind,
            detail: detail.into(),
        }
    }
}

impl PartialEq for CellError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.literal())
    }
}

/// Represents the calculated result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn error(kind: CellErrorType, detail: impl Into<String>) -> Self {
        CellValue::Error(CellError::new(kind, detail))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// Classifies literal (non-formula) contents. Expects trimmed, non-empty text.
    pub fn from_literal(contents: &str) -> CellValue {
        if let Some(text) = contents.strip_prefix('\'') {
            return CellValue::Text(text.to_string());
        }
        if let Some(literal) = ErrorLiteral::from_text(contents) {
            let kind = CellErrorType::from(literal);
            return CellValue::error(kind, format!("literal {}", kind.literal()));
        }
        if contents.eq_ignore_ascii_case("true") {
            return CellValue::Boolean(true);
        }
        if contents.eq_ignore_ascii_case("false") {
            return CellValue::Boolean(false);
        }
        match parse_number(contents) {
            Some(n) => CellValue::Number(normalize(n)),
            None => CellValue::Text(contents.to_string()),
        }
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => normalize(*n).to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            CellValue::Error(e) => e.to_string(),
        }
    }
}

/// Drops insignificant trailing zeros; -0 becomes 0.
pub fn normalize(n: Decimal) -> Decimal {
    let n = n.normalize();
    if n.is_zero() {
        Decimal::ZERO
    } else {
        n
    }
}

/// Parses text as a finite decimal number, in plain or scientific notation.
/// Surrounding whitespace is ignored.
pub fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text).ok().or_else(|| {
        if text.contains(['e', 'E']) {
            Decimal::from_scientific(text).ok()
        } else {
            None
        }
    })
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Trimmed contents as entered; formulas keep their leading '='.
    pub contents: String,
    pub value: CellValue,
    /// Parsed formula, valid while `contents` is unchanged.
    pub(crate) formula: Option<Expression>,
    /// Cells read during the last evaluation.
    pub(crate) references: BTreeSet<CellId>,
}

impl Cell {
    pub fn new(contents: impl Into<String>) -> Self {
        Cell {
            contents: contents.into(),
            value: CellValue::Empty,
            formula: None,
            references: BTreeSet::new(),
        }
    }

    pub fn is_formula(&self) -> bool {
        self.contents.starts_with('=')
    }
}
