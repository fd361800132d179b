//! FILENAME: engine/src/reference_rewriter.rs
//! PURPOSE: Rewrites the references inside a parsed formula.
//! CONTEXT: Copying, moving and sorting cells relocate formulas by a row and
//! column delta. Renaming a sheet replaces its name in every qualifier.
//! Both work on the AST; the workbook re-serializes the result with
//! `Display` and stores it as the new contents.

use crate::coord::{a1_to_coord, index_to_col, offset_coord};
use parser::{ErrorLiteral, Expression, SheetRef, Value};

/// A structural change to apply to a formula's references.
#[derive(Debug, Clone, Copy)]
pub enum Rewrite<'a> {
    /// Shift relative axes by (rows, cols).
    Relocate { row_delta: i64, col_delta: i64 },
    /// Replace the sheet qualifier `old` (any case) with `new`.
    RenameSheet { old: &'a str, new: &'a str },
}

/// Shifts every relative reference by the delta.
/// References pushed off the grid become `#REF!`.
pub fn relocate(expr: &Expression, row_delta: i64, col_delta: i64) -> Expression {
    rewrite(expr, Rewrite::Relocate { row_delta, col_delta })
}

/// Replaces the sheet name `old` with `new` in every qualifier, and drops
/// quotes the remaining qualifiers no longer need.
pub fn rename_sheet(expr: &Expression, old: &str, new: &str) -> Expression {
    rewrite(expr, Rewrite::RenameSheet { old, new })
}

/// Applies a rewrite to the whole tree.
pub fn rewrite(expr: &Expression, op: Rewrite<'_>) -> Expression {
    match expr {
        Expression::CellRef { .. } => match op {
            Rewrite::Relocate { row_delta, col_delta } => relocate_cell(expr, row_delta, col_delta, true),
            Rewrite::RenameSheet { old, new } => rename_qualifier(expr, old, new),
        },
        Expression::Range { sheet, start, end } => match op {
            Rewrite::Relocate { row_delta, col_delta } => Expression::Range {
                sheet: sheet.clone(),
                start: Box::new(relocate_cell(start, row_delta, col_delta, false)),
                end: Box::new(relocate_cell(end, row_delta, col_delta, false)),
            },
            Rewrite::RenameSheet { old, new } => rename_qualifier(expr, old, new),
        },
        Expression::BinaryOp { left, op: bin_op, right } => Expression::BinaryOp {
            left: Box::new(rewrite(left, op)),
            op: *bin_op,
            right: Box::new(rewrite(right, op)),
        },
        Expression::UnaryOp { op: un_op, operand } => Expression::UnaryOp {
            op: *un_op,
            operand: Box::new(rewrite(operand, op)),
        },
        Expression::FunctionCall { name, args } => Expression::FunctionCall {
            name: name.clone(),
            args: args.iter().map(|arg| rewrite(arg, op)).collect(),
        },
        Expression::Parenthesized(inner) => Expression::Parenthesized(Box::new(rewrite(inner, op))),
        Expression::Literal(_) => expr.clone(),
    }
}

fn ref_error() -> Expression {
    Expression::Literal(Value::Error(ErrorLiteral::Ref))
}

/// Relocates one cell reference or range endpoint. `keep_sheet` is false
/// for range endpoints, whose qualifier lives on the range.
fn relocate_cell(expr: &Expression, row_delta: i64, col_delta: i64, keep_sheet: bool) -> Expression {
    let Expression::CellRef {
        sheet,
        col,
        row,
        col_absolute,
        row_absolute,
    } = expr
    else {
        // A #REF! endpoint stays as it is.
        return expr.clone();
    };

    // Out-of-grid references are already dangling; they only get worse.
    let Some(coord) = a1_to_coord(col, *row) else {
        return ref_error();
    };
    let drow = if *row_absolute { 0 } else { row_delta };
    let dcol = if *col_absolute { 0 } else { col_delta };
    let Some((new_row, new_col)) = offset_coord(coord, drow, dcol) else {
        return ref_error();
    };

    Expression::CellRef {
        sheet: if keep_sheet { sheet.clone() } else { None },
        col: index_to_col(new_col),
        row: new_row + 1,
        col_absolute: *col_absolute,
        row_absolute: *row_absolute,
    }
}

fn rename_qualifier(expr: &Expression, old: &str, new: &str) -> Expression {
    let old = old.to_lowercase();
    let renamed = |sheet: &Option<SheetRef>| {
        sheet.as_ref().map(|s| {
            let name = if s.name.to_lowercase() == old {
                new.to_string()
            } else {
                s.name.clone()
            };
            SheetRef { name, quoted: false }
        })
    };
    match expr {
        Expression::CellRef {
            sheet,
            col,
            row,
            col_absolute,
            row_absolute,
        } => Expression::CellRef {
            sheet: renamed(sheet),
            col: col.clone(),
            row: *row,
            col_absolute: *col_absolute,
            row_absolute: *row_absolute,
        },
        Expression::Range { sheet, start, end } => Expression::Range {
            sheet: renamed(sheet),
            start: start.clone(),
            end: end.clone(),
        },
        other => other.clone(),
    }
}

/// True if any reference in the tree is qualified with `name` (any case),
/// including references inside branches that would not be evaluated.
pub fn mentions_sheet(expr: &Expression, name: &str) -> bool {
    let name = name.to_lowercase();
    let matches = |sheet: &Option<SheetRef>| sheet.as_ref().is_some_and(|s| s.name.to_lowercase() == name);
    match expr {
        Expression::CellRef { sheet, .. } | Expression::Range { sheet, .. } => matches(sheet),
        Expression::BinaryOp { left, right, .. } => mentions_sheet(left, &name) || mentions_sheet(right, &name),
        Expression::UnaryOp { operand, .. } => mentions_sheet(operand, &name),
        Expression::FunctionCall { args, .. } => args.iter().any(|arg| mentions_sheet(arg, &name)),
        Expression::Parenthesized(inner) => mentions_sheet(inner, &name),
        Expression::Literal(_) => false,
    }
}
