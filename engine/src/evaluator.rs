//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to compute cell values.
//! CONTEXT: After a formula is parsed into an AST, this module traverses
//! the tree and computes the final result. Cell lookups go through the
//! `EvalContext` trait, which the workbook implements. Every cell the walk
//! reads is recorded, and that set becomes the formula's graph edges.
//!
//! SUPPORTED FEATURES:
//! - Literal evaluation: Numbers, Strings, Booleans, Error literals
//! - Cell reference lookup, including cross-sheet references
//! - Ranges, kept unevaluated until a function expands them
//! - Binary operations: +, -, *, /, &, =, ==, <>, !=, <, >, <=, >=
//! - Unary operations: + and -
//! - Function calls through the table in `functions.rs`
//!
//! ERROR PRECEDENCE: when several operands are errors, the kind that sorts
//! first in `CellErrorType` wins, and the leftmost operand wins ties.

use crate::cell::{normalize, parse_number, CellError, CellErrorType, CellValue};
use crate::coord::{a1_to_coord, normalize_corners, CellCoord};
use crate::dependency_graph::CellId;
use crate::functions::{lookup_function, Function};
use parser::{BinaryOperator, Expression, SheetRef, UnaryOperator, Value};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Read access to cell values during evaluation.
pub trait EvalContext {
    /// Value stored at `coord` on the sheet with canonical key `sheet_key`.
    /// Returns None when no such sheet exists; unset cells are `CellValue::Empty`.
    fn cell_value(&self, sheet_key: &str, coord: CellCoord) -> Option<CellValue>;
}

/// A rectangular block of cells on one sheet, not yet evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRef {
    pub sheet: String,
    /// Top-left corner.
    pub start: CellCoord,
    /// Bottom-right corner.
    pub end: CellCoord,
}

impl RangeRef {
    pub fn rows(&self) -> u32 {
        self.end.0 - self.start.0 + 1
    }

    pub fn cols(&self) -> u32 {
        self.end.1 - self.start.1 + 1
    }

    /// Cell at a 0-based offset inside the block.
    pub fn cell(&self, row: u32, col: u32) -> CellId {
        CellId::new(self.sheet.clone(), (self.start.0 + row, self.start.1 + col))
    }

    /// All cells, row-major.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.rows()).flat_map(move |r| (0..self.cols()).map(move |c| self.cell(r, c)))
    }
}

/// The result of evaluating an expression.
/// This maps directly to CellValue but also carries ranges, which only
/// functions can consume.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Empty,
    Number(Decimal),
    Text(String),
    Boolean(bool),
    Error(CellError),
    Range(RangeRef),
}

impl From<CellValue> for EvalResult {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => EvalResult::Empty,
            CellValue::Number(n) => EvalResult::Number(n),
            CellValue::Text(s) => EvalResult::Text(s),
            CellValue::Boolean(b) => EvalResult::Boolean(b),
            CellValue::Error(e) => EvalResult::Error(e),
        }
    }
}

impl EvalResult {
    pub fn error(kind: CellErrorType, detail: impl Into<String>) -> Self {
        EvalResult::Error(CellError::new(kind, detail))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }

    /// Converts the evaluation result to a CellValue for storage.
    /// A bare range cannot be stored and becomes #VALUE!.
    pub fn into_cell_value(self) -> CellValue {
        match self {
            EvalResult::Empty => CellValue::Empty,
            EvalResult::Number(n) => CellValue::Number(n),
            EvalResult::Text(s) => CellValue::Text(s),
            EvalResult::Boolean(b) => CellValue::Boolean(b),
            EvalResult::Error(e) => CellValue::Error(e),
            EvalResult::Range(_) => {
                CellValue::error(CellErrorType::TypeError, "range used where a single value is expected")
            }
        }
    }

    /// Coerces to a number: empty is 0, booleans are 1/0, text must parse.
    pub fn as_number(&self) -> Result<Decimal, CellError> {
        match self {
            EvalResult::Empty => Ok(Decimal::ZERO),
            EvalResult::Number(n) => Ok(*n),
            EvalResult::Boolean(b) => Ok(if *b { Decimal::ONE } else { Decimal::ZERO }),
            EvalResult::Text(s) => parse_number(s).ok_or_else(|| {
                CellError::new(CellErrorType::TypeError, format!("cannot convert {:?} to a number", s))
            }),
            EvalResult::Error(e) => Err(e.clone()),
            EvalResult::Range(_) => Err(range_error()),
        }
    }

    /// Coerces to a boolean: "true"/"false" text, nonzero numbers, empty is false.
    pub fn as_boolean(&self) -> Result<bool, CellError> {
        match self {
            EvalResult::Empty => Ok(false),
            EvalResult::Number(n) => Ok(!n.is_zero()),
            EvalResult::Boolean(b) => Ok(*b),
            EvalResult::Text(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            EvalResult::Text(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            EvalResult::Text(s) => Err(CellError::new(
                CellErrorType::TypeError,
                format!("cannot convert {:?} to a boolean", s),
            )),
            EvalResult::Error(e) => Err(e.clone()),
            EvalResult::Range(_) => Err(range_error()),
        }
    }

    /// Coerces to text: empty is "", numbers print normalized, booleans as TRUE/FALSE.
    pub fn as_text(&self) -> Result<String, CellError> {
        match self {
            EvalResult::Empty => Ok(String::new()),
            EvalResult::Number(n) => Ok(normalize(*n).to_string()),
            EvalResult::Text(s) => Ok(s.clone()),
            EvalResult::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            EvalResult::Error(e) => Err(e.clone()),
            EvalResult::Range(_) => Err(range_error()),
        }
    }
}

fn range_error() -> CellError {
    CellError::new(CellErrorType::TypeError, "range used where a single value is expected")
}

/// Picks the error to propagate among `results`: lowest kind first,
/// leftmost on ties. None if no result is an error.
pub fn highest_precedence_error<'r>(results: impl IntoIterator<Item = &'r EvalResult>) -> Option<CellError> {
    let mut best: Option<&CellError> = None;
    for result in results {
        if let EvalResult::Error(e) = result {
            match best {
                Some(b) if b.kind <= e.kind => {}
                _ => best = Some(e),
            }
        }
    }
    best.cloned()
}

/// Tree-walking evaluator for one formula.
/// Holds the context used for lookups and the references collected so far.
pub struct Evaluator<'a> {
    context: &'a dyn EvalContext,
    /// Canonical key of the sheet the formula lives on.
    sheet: String,
    references: BTreeSet<CellId>,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a dyn EvalContext, sheet_key: impl Into<String>) -> Self {
        Evaluator {
            context,
            sheet: sheet_key.into(),
            references: BTreeSet::new(),
        }
    }

    /// Evaluates a whole formula for storage in a cell, returning the value
    /// and every cell read. Empty results become 0 and numbers are normalized.
    pub fn evaluate_formula(
        context: &'a dyn EvalContext,
        sheet_key: &str,
        expr: &Expression,
    ) -> (CellValue, BTreeSet<CellId>) {
        let mut evaluator = Evaluator::new(context, sheet_key);
        let value = match evaluator.evaluate(expr).into_cell_value() {
            CellValue::Empty => CellValue::Number(Decimal::ZERO),
            CellValue::Number(n) => CellValue::Number(normalize(n)),
            other => other,
        };
        (value, evaluator.references)
    }

    /// Cells read so far.
    pub fn references(&self) -> &BTreeSet<CellId> {
        &self.references
    }

    /// Evaluates an expression and returns the result.
    /// This is the shared entry point lazy functions call for the arguments they select.
    pub fn evaluate(&mut self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(value) => self.eval_literal(value),
            Expression::CellRef { sheet, col, row, .. } => self.eval_cell_ref(sheet.as_ref(), col, *row),
            Expression::Range { sheet, start, end } => self.eval_range(sheet.as_ref(), start, end),
            Expression::BinaryOp { left, op, right } => self.eval_binary_op(left, *op, right),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(*op, operand),
            Expression::FunctionCall { name, args } => self.eval_function(name, args),
            Expression::Parenthesized(inner) => self.evaluate(inner),
        }
    }

    fn eval_literal(&self, value: &Value) -> EvalResult {
        match value {
            Value::Number(n) => EvalResult::Number(*n),
            Value::String(s) => EvalResult::Text(s.clone()),
            Value::Boolean(b) => EvalResult::Boolean(*b),
            Value::Error(literal) => {
                let kind = CellErrorType::from(*literal);
                EvalResult::error(kind, format!("literal {}", literal))
            }
        }
    }

    fn sheet_key(&self, sheet: Option<&SheetRef>) -> String {
        match sheet {
            Some(sheet) => sheet.name.to_lowercase(),
            None => self.sheet.clone(),
        }
    }

    fn eval_cell_ref(&mut self, sheet: Option<&SheetRef>, col: &str, row: u32) -> EvalResult {
        match a1_to_coord(col, row) {
            Some(coord) => {
                let id = CellId::new(self.sheet_key(sheet), coord);
                self.eval_cell(&id)
            }
            None => EvalResult::error(
                CellErrorType::BadReference,
                format!("{}{} is outside the sheet", col, row),
            ),
        }
    }

    /// Reads one cell and records it as a reference.
    pub fn eval_cell(&mut self, id: &CellId) -> EvalResult {
        self.references.insert(id.clone());
        match self.context.cell_value(&id.sheet, id.coord) {
            Some(value) => EvalResult::from(value),
            None => EvalResult::error(
                CellErrorType::BadReference,
                format!("sheet {:?} does not exist", id.sheet),
            ),
        }
    }

    fn eval_range(&mut self, sheet: Option<&SheetRef>, start: &Expression, end: &Expression) -> EvalResult {
        let (Some(a), Some(b)) = (endpoint_coord(start), endpoint_coord(end)) else {
            return EvalResult::error(CellErrorType::BadReference, "range endpoint is not a valid cell");
        };
        let (start, end) = normalize_corners(a, b);
        EvalResult::Range(RangeRef {
            sheet: self.sheet_key(sheet),
            start,
            end,
        })
    }

    /// Replaces every range among `results` by its cells' values, row-major.
    pub fn expand_ranges(&mut self, results: Vec<EvalResult>) -> Vec<EvalResult> {
        let mut flat = Vec::with_capacity(results.len());
        for result in results {
            match result {
                EvalResult::Range(range) => {
                    for id in range.cells() {
                        flat.push(self.eval_cell(&id));
                    }
                }
                other => flat.push(other),
            }
        }
        flat
    }

    // ==================== Operators ====================

    fn eval_binary_op(&mut self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalResult {
        let left = self.evaluate(left);
        let right = self.evaluate(right);

        if let Some(error) = highest_precedence_error([&left, &right]) {
            return EvalResult::Error(error);
        }

        match op {
            BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide => eval_arithmetic(op, &left, &right),
            BinaryOperator::Concat => eval_concat(&left, &right),
            _ => eval_comparison(op, &left, &right),
        }
    }

    fn eval_unary_op(&mut self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let value = match self.evaluate(operand).as_number() {
            Ok(n) => n,
            Err(e) => return EvalResult::Error(e),
        };
        match op {
            UnaryOperator::Plus => EvalResult::Number(normalize(value)),
            UnaryOperator::Negate => EvalResult::Number(normalize(-value)),
        }
    }

    // ==================== Functions ====================

    fn eval_function(&mut self, name: &str, args: &[Expression]) -> EvalResult {
        let Some(function) = lookup_function(name) else {
            return EvalResult::error(CellErrorType::BadName, format!("unknown function {}", name));
        };

        match function {
            Function::Lazy { call } => call(self, args),
            Function::Eager {
                min_args,
                max_args,
                flatten_ranges,
                call,
            } => {
                let mut values: Vec<EvalResult> = args.iter().map(|arg| self.evaluate(arg)).collect();
                if flatten_ranges {
                    values = self.expand_ranges(values);
                }
                if let Some(error) = highest_precedence_error(&values) {
                    return EvalResult::Error(error);
                }
                if args.len() < min_args || max_args.is_some_and(|max| args.len() > max) {
                    return EvalResult::error(
                        CellErrorType::TypeError,
                        format!("{} got {} arguments", name.to_uppercase(), args.len()),
                    );
                }
                call(&values)
            }
        }
    }
}

/// Location of a range endpoint; None for #REF! or out-of-grid cells.
fn endpoint_coord(endpoint: &Expression) -> Option<CellCoord> {
    match endpoint {
        Expression::CellRef { col, row, .. } => a1_to_coord(col, *row),
        _ => None,
    }
}

fn eval_arithmetic(op: BinaryOperator, left: &EvalResult, right: &EvalResult) -> EvalResult {
    let (l, r) = match (left.as_number(), right.as_number()) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return EvalResult::Error(e),
    };

    let result = match op {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Subtract => l.checked_sub(r),
        BinaryOperator::Multiply => l.checked_mul(r),
        _ => {
            if r.is_zero() {
                return EvalResult::error(CellErrorType::DivideByZero, "division by zero");
            }
            l.checked_div(r)
        }
    };

    match result {
        Some(n) => EvalResult::Number(normalize(n)),
        None => EvalResult::error(CellErrorType::TypeError, "numeric overflow"),
    }
}

fn eval_concat(left: &EvalResult, right: &EvalResult) -> EvalResult {
    match (left.as_text(), right.as_text()) {
        (Ok(l), Ok(r)) => EvalResult::Text(l + &r),
        (Err(e), _) | (_, Err(e)) => EvalResult::Error(e),
    }
}

/// Zero value of the other operand's type, for comparing against an empty cell.
fn empty_as(other: &EvalResult) -> EvalResult {
    match other {
        EvalResult::Number(_) => EvalResult::Number(Decimal::ZERO),
        EvalResult::Text(_) => EvalResult::Text(String::new()),
        EvalResult::Boolean(_) => EvalResult::Boolean(false),
        other => other.clone(),
    }
}

fn type_rank(value: &EvalResult) -> u8 {
    match value {
        EvalResult::Error(_) => 0,
        EvalResult::Empty | EvalResult::Number(_) => 1,
        EvalResult::Text(_) => 2,
        EvalResult::Boolean(_) => 3,
        EvalResult::Range(_) => 4,
    }
}

/// Orders two non-error values: empties take the other side's zero value,
/// mismatched types order by type rank, text compares case-insensitively.
pub fn compare_values(left: &EvalResult, right: &EvalResult) -> Result<Ordering, CellError> {
    if matches!(left, EvalResult::Range(_)) || matches!(right, EvalResult::Range(_)) {
        return Err(range_error());
    }
    let (left, right) = match (left, right) {
        (EvalResult::Empty, EvalResult::Empty) => return Ok(Ordering::Equal),
        (EvalResult::Empty, other) => (empty_as(other), other.clone()),
        (other, EvalResult::Empty) => (other.clone(), empty_as(other)),
        (l, r) => (l.clone(), r.clone()),
    };

    let ordering = match (&left, &right) {
        (EvalResult::Number(l), EvalResult::Number(r)) => l.cmp(r),
        (EvalResult::Text(l), EvalResult::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (EvalResult::Boolean(l), EvalResult::Boolean(r)) => l.cmp(r),
        (l, r) => type_rank(l).cmp(&type_rank(r)),
    };
    Ok(ordering)
}

fn eval_comparison(op: BinaryOperator, left: &EvalResult, right: &EvalResult) -> EvalResult {
    let ordering = match compare_values(left, right) {
        Ok(ordering) => ordering,
        Err(e) => return EvalResult::Error(e),
    };
    let result = match op {
        BinaryOperator::Equal | BinaryOperator::EqualEqual => ordering == Ordering::Equal,
        BinaryOperator::NotEqual | BinaryOperator::BangEqual => ordering != Ordering::Equal,
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    EvalResult::Boolean(result)
}
