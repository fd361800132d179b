//! FILENAME: engine/src/functions.rs
//! PURPOSE: The closed table of built-in spreadsheet functions.
//! CONTEXT: `lookup_function` maps a name (any case) to either an eager
//! function, whose arguments the evaluator computes up front, or a lazy
//! one, which receives the raw argument expressions and evaluates only
//! what it needs. Laziness matters for dependency tracking: a branch that
//! is never evaluated contributes no references.

use crate::cell::{normalize, CellErrorType};
use crate::evaluator::{highest_precedence_error, EvalResult, Evaluator, RangeRef};
use parser::{parse_reference, Expression};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Receives evaluated arguments, already free of errors.
pub type EagerFn = fn(&[EvalResult]) -> EvalResult;

/// Receives the unevaluated argument expressions.
pub type LazyFn = fn(&mut Evaluator<'_>, &[Expression]) -> EvalResult;

#[derive(Clone, Copy)]
pub enum Function {
    Eager {
        min_args: usize,
        max_args: Option<usize>,
        /// Expand range arguments into their cells' values before the call.
        flatten_ranges: bool,
        call: EagerFn,
    },
    Lazy {
        call: LazyFn,
    },
}

const fn eager(min_args: usize, max_args: Option<usize>, flatten_ranges: bool, call: EagerFn) -> Function {
    Function::Eager {
        min_args,
        max_args,
        flatten_ranges,
        call,
    }
}

const fn lazy(call: LazyFn) -> Function {
    Function::Lazy { call }
}

/// Finds a built-in function by name, case-insensitively.
pub fn lookup_function(name: &str) -> Option<Function> {
    let function = match name.to_ascii_uppercase().as_str() {
        // Logical
        "AND" => eager(1, None, false, fn_and),
        "OR" => eager(1, None, false, fn_or),
        "XOR" => eager(1, None, false, fn_xor),
        "NOT" => eager(1, Some(1), false, fn_not),
        "IF" => lazy(fn_if),
        "IFERROR" => lazy(fn_iferror),
        "CHOOSE" => lazy(fn_choose),

        // Information
        "ISBLANK" => lazy(fn_isblank),
        "ISERROR" => lazy(fn_iserror),
        "ISNUMBER" => lazy(fn_isnumber),
        "ISTEXT" => lazy(fn_istext),
        "VERSION" => eager(0, Some(0), false, fn_version),

        // Text
        "EXACT" => eager(2, Some(2), false, fn_exact),
        "LEN" => eager(1, Some(1), false, fn_len),
        "UPPER" => eager(1, Some(1), false, fn_upper),
        "LOWER" => eager(1, Some(1), false, fn_lower),
        "TRIM" => eager(1, Some(1), false, fn_trim),
        "CONCATENATE" => eager(1, None, false, fn_concatenate),

        // Aggregate
        "SUM" => eager(1, None, true, fn_sum),
        "MIN" => eager(1, None, true, fn_min),
        "MAX" => eager(1, None, true, fn_max),
        "AVERAGE" => eager(1, None, true, fn_average),
        "COUNT" => eager(1, None, true, fn_count),

        // Math
        "ABS" => eager(1, Some(1), false, fn_abs),
        "ROUND" => eager(1, Some(2), false, fn_round),

        // Lookup & reference
        "INDIRECT" => lazy(fn_indirect),
        "VLOOKUP" => lazy(fn_vlookup),
        "HLOOKUP" => lazy(fn_hlookup),

        _ => return None,
    };
    Some(function)
}

fn arity_error(name: &str, got: usize) -> EvalResult {
    EvalResult::error(CellErrorType::TypeError, format!("{} got {} arguments", name, got))
}

fn number(n: Decimal) -> EvalResult {
    EvalResult::Number(normalize(n))
}

fn overflow() -> EvalResult {
    EvalResult::error(CellErrorType::TypeError, "numeric overflow")
}

/// Boolean coercion of every argument, stopping at the first failure.
fn collect_booleans(args: &[EvalResult]) -> Result<Vec<bool>, EvalResult> {
    args.iter()
        .map(|arg| arg.as_boolean().map_err(EvalResult::Error))
        .collect()
}

/// Numeric coercion of every non-empty argument.
fn collect_numbers(args: &[EvalResult]) -> Result<Vec<Decimal>, EvalResult> {
    args.iter()
        .filter(|arg| !matches!(arg, EvalResult::Empty))
        .map(|arg| arg.as_number().map_err(EvalResult::Error))
        .collect()
}

fn checked_sum(numbers: &[Decimal]) -> Option<Decimal> {
    numbers
        .iter()
        .try_fold(Decimal::ZERO, |acc, n| acc.checked_add(*n))
}

// ==================== Logical Functions ====================

fn fn_and(args: &[EvalResult]) -> EvalResult {
    match collect_booleans(args) {
        Ok(values) => EvalResult::Boolean(values.iter().all(|b| *b)),
        Err(e) => e,
    }
}

fn fn_or(args: &[EvalResult]) -> EvalResult {
    match collect_booleans(args) {
        Ok(values) => EvalResult::Boolean(values.iter().any(|b| *b)),
        Err(e) => e,
    }
}

/// True when an odd number of arguments are true.
fn fn_xor(args: &[EvalResult]) -> EvalResult {
    match collect_booleans(args) {
        Ok(values) => EvalResult::Boolean(values.iter().filter(|b| **b).count() % 2 == 1),
        Err(e) => e,
    }
}

fn fn_not(args: &[EvalResult]) -> EvalResult {
    match args[0].as_boolean() {
        Ok(b) => EvalResult::Boolean(!b),
        Err(e) => EvalResult::Error(e),
    }
}

fn fn_if(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    if !(2..=3).contains(&args.len()) {
        return arity_error("IF", args.len());
    }
    let condition = match evaluator.evaluate(&args[0]).as_boolean() {
        Ok(b) => b,
        Err(e) => return EvalResult::Error(e),
    };
    if condition {
        evaluator.evaluate(&args[1])
    } else if let Some(otherwise) = args.get(2) {
        evaluator.evaluate(otherwise)
    } else {
        EvalResult::Boolean(false)
    }
}

fn fn_iferror(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    if !(1..=2).contains(&args.len()) {
        return arity_error("IFERROR", args.len());
    }
    let value = evaluator.evaluate(&args[0]);
    if !value.is_error() {
        return value;
    }
    match args.get(1) {
        Some(fallback) => evaluator.evaluate(fallback),
        None => EvalResult::Text(String::new()),
    }
}

/// CHOOSE(index, v1, v2, ...): evaluates only the selected value.
fn fn_choose(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    if args.len() < 2 {
        return arity_error("CHOOSE", args.len());
    }
    let index = match evaluator.evaluate(&args[0]).as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    let choices = args.len() - 1;
    match index_in(index, choices) {
        Some(i) => evaluator.evaluate(&args[i]),
        None => EvalResult::error(
            CellErrorType::TypeError,
            format!("CHOOSE index {} not in 1..={}", index, choices),
        ),
    }
}

/// An integral `n` in 1..=limit, as usize.
fn index_in(n: Decimal, limit: usize) -> Option<usize> {
    if !n.fract().is_zero() {
        return None;
    }
    let i = n.to_usize()?;
    (1..=limit).contains(&i).then_some(i)
}

// ==================== Information Functions ====================

fn classify(
    evaluator: &mut Evaluator<'_>,
    args: &[Expression],
    name: &str,
    test: fn(&EvalResult) -> bool,
) -> EvalResult {
    if args.len() != 1 {
        return arity_error(name, args.len());
    }
    let value = evaluator.evaluate(&args[0]);
    EvalResult::Boolean(test(&value))
}

fn fn_isblank(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    classify(evaluator, args, "ISBLANK", |v| matches!(v, EvalResult::Empty))
}

fn fn_iserror(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    classify(evaluator, args, "ISERROR", |v| v.is_error())
}

fn fn_isnumber(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    classify(evaluator, args, "ISNUMBER", |v| matches!(v, EvalResult::Number(_)))
}

fn fn_istext(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    classify(evaluator, args, "ISTEXT", |v| matches!(v, EvalResult::Text(_)))
}

fn fn_version(_args: &[EvalResult]) -> EvalResult {
    EvalResult::Text(env!("CARGO_PKG_VERSION").to_string())
}

// ==================== Text Functions ====================

fn map_text(arg: &EvalResult, f: impl FnOnce(String) -> EvalResult) -> EvalResult {
    match arg.as_text() {
        Ok(s) => f(s),
        Err(e) => EvalResult::Error(e),
    }
}

/// Case-sensitive equality of the two texts.
fn fn_exact(args: &[EvalResult]) -> EvalResult {
    match (args[0].as_text(), args[1].as_text()) {
        (Ok(a), Ok(b)) => EvalResult::Boolean(a == b),
        (Err(e), _) | (_, Err(e)) => EvalResult::Error(e),
    }
}

fn fn_len(args: &[EvalResult]) -> EvalResult {
    map_text(&args[0], |s| EvalResult::Number(Decimal::from(s.chars().count())))
}

fn fn_upper(args: &[EvalResult]) -> EvalResult {
    map_text(&args[0], |s| EvalResult::Text(s.to_uppercase()))
}

fn fn_lower(args: &[EvalResult]) -> EvalResult {
    map_text(&args[0], |s| EvalResult::Text(s.to_lowercase()))
}

/// Strips the ends and collapses inner runs of whitespace to one space.
fn fn_trim(args: &[EvalResult]) -> EvalResult {
    map_text(&args[0], |s| {
        EvalResult::Text(s.split_whitespace().collect::<Vec<_>>().join(" "))
    })
}

fn fn_concatenate(args: &[EvalResult]) -> EvalResult {
    let mut out = String::new();
    for arg in args {
        match arg.as_text() {
            Ok(s) => out.push_str(&s),
            Err(e) => return EvalResult::Error(e),
        }
    }
    EvalResult::Text(out)
}

// ==================== Aggregate Functions ====================

fn fn_sum(args: &[EvalResult]) -> EvalResult {
    match collect_numbers(args) {
        Ok(numbers) => checked_sum(&numbers).map_or_else(overflow, number),
        Err(e) => e,
    }
}

fn fn_min(args: &[EvalResult]) -> EvalResult {
    match collect_numbers(args) {
        Ok(numbers) => number(numbers.into_iter().min().unwrap_or(Decimal::ZERO)),
        Err(e) => e,
    }
}

fn fn_max(args: &[EvalResult]) -> EvalResult {
    match collect_numbers(args) {
        Ok(numbers) => number(numbers.into_iter().max().unwrap_or(Decimal::ZERO)),
        Err(e) => e,
    }
}

fn fn_average(args: &[EvalResult]) -> EvalResult {
    let numbers = match collect_numbers(args) {
        Ok(numbers) => numbers,
        Err(e) => return e,
    };
    if numbers.is_empty() {
        return EvalResult::error(CellErrorType::DivideByZero, "AVERAGE of no values");
    }
    let count = Decimal::from(numbers.len());
    match checked_sum(&numbers).and_then(|total| total.checked_div(count)) {
        Some(avg) => number(avg),
        None => overflow(),
    }
}

/// Counts number values; text, booleans and empties are skipped.
fn fn_count(args: &[EvalResult]) -> EvalResult {
    let count = args
        .iter()
        .filter(|arg| matches!(arg, EvalResult::Number(_)))
        .count();
    EvalResult::Number(Decimal::from(count))
}

// ==================== Math Functions ====================

fn fn_abs(args: &[EvalResult]) -> EvalResult {
    match args[0].as_number() {
        Ok(n) => number(n.abs()),
        Err(e) => EvalResult::Error(e),
    }
}

/// ROUND(number, [digits]): half away from zero. Negative digits round
/// to tens, hundreds and so on.
fn fn_round(args: &[EvalResult]) -> EvalResult {
    let value = match args[0].as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };
    let digits = match args.get(1).map(|arg| arg.as_number()).transpose() {
        Ok(d) => d.unwrap_or(Decimal::ZERO).trunc(),
        Err(e) => return EvalResult::Error(e),
    };

    let strategy = RoundingStrategy::MidpointAwayFromZero;
    if digits >= Decimal::ZERO {
        let dp = digits.to_u32().unwrap_or(u32::MAX).min(28);
        return number(value.round_dp_with_strategy(dp, strategy));
    }

    let Some(places) = (-digits).to_u32().filter(|p| *p <= 28) else {
        return EvalResult::Number(Decimal::ZERO);
    };
    let mut factor = Decimal::ONE;
    for _ in 0..places {
        factor *= Decimal::TEN;
    }
    let scaled = (value / factor).round_dp_with_strategy(0, strategy);
    match scaled.checked_mul(factor) {
        Some(n) => number(n),
        None => overflow(),
    }
}

// ==================== Lookup & Reference Functions ====================

/// INDIRECT(text): evaluates the reference spelled out by `text`.
fn fn_indirect(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    if args.len() != 1 {
        return arity_error("INDIRECT", args.len());
    }
    let text = match evaluator.evaluate(&args[0]) {
        EvalResult::Text(s) => s,
        EvalResult::Error(e) => return EvalResult::Error(e),
        _ => return EvalResult::error(CellErrorType::BadReference, "INDIRECT expects reference text"),
    };
    match parse_reference(text.trim()) {
        Ok(reference) => evaluator.evaluate(&reference),
        Err(e) => EvalResult::error(CellErrorType::BadReference, e.message),
    }
}

#[derive(Clone, Copy)]
enum LookupAxis {
    /// Search the first column, return from a column of the matching row.
    Vertical,
    /// Search the first row, return from a row of the matching column.
    Horizontal,
}

fn fn_vlookup(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    lookup(evaluator, args, LookupAxis::Vertical)
}

fn fn_hlookup(evaluator: &mut Evaluator<'_>, args: &[Expression]) -> EvalResult {
    lookup(evaluator, args, LookupAxis::Horizontal)
}

/// Exact-match equality for lookups: same type only, text ignores case.
fn lookup_matches(key: &EvalResult, candidate: &EvalResult) -> bool {
    match (key, candidate) {
        (EvalResult::Empty, EvalResult::Empty) => true,
        (EvalResult::Number(a), EvalResult::Number(b)) => a == b,
        (EvalResult::Text(a), EvalResult::Text(b)) => a.to_lowercase() == b.to_lowercase(),
        (EvalResult::Boolean(a), EvalResult::Boolean(b)) => a == b,
        _ => false,
    }
}

fn lookup(evaluator: &mut Evaluator<'_>, args: &[Expression], axis: LookupAxis) -> EvalResult {
    let name = match axis {
        LookupAxis::Vertical => "VLOOKUP",
        LookupAxis::Horizontal => "HLOOKUP",
    };
    if args.len() != 3 {
        return arity_error(name, args.len());
    }

    let key = evaluator.evaluate(&args[0]);
    let table = evaluator.evaluate(&args[1]);
    let index = evaluator.evaluate(&args[2]);
    if let Some(error) = highest_precedence_error([&key, &table, &index]) {
        return EvalResult::Error(error);
    }

    let EvalResult::Range(table) = table else {
        return EvalResult::error(CellErrorType::TypeError, format!("{} expects a range", name));
    };
    let index = match index.as_number() {
        Ok(n) => n,
        Err(e) => return EvalResult::Error(e),
    };

    // (lines to search, length of each line)
    let (lines, width) = match axis {
        LookupAxis::Vertical => (table.rows(), table.cols()),
        LookupAxis::Horizontal => (table.cols(), table.rows()),
    };
    let Some(index) = index_in(index, width as usize) else {
        return EvalResult::error(
            CellErrorType::TypeError,
            format!("{} index {} not in 1..={}", name, index, width),
        );
    };

    let at = |line: u32, offset: u32, table: &RangeRef| match axis {
        LookupAxis::Vertical => table.cell(line, offset),
        LookupAxis::Horizontal => table.cell(offset, line),
    };

    let keys: Vec<EvalResult> = (0..lines)
        .map(|line| evaluator.eval_cell(&at(line, 0, &table)))
        .collect();
    if let Some(error) = highest_precedence_error(&keys) {
        return EvalResult::Error(error);
    }

    let Some(found) = keys.iter().position(|candidate| lookup_matches(&key, candidate)) else {
        return EvalResult::error(CellErrorType::TypeError, format!("{}: no match for key", name));
    };

    let mut line: Vec<EvalResult> = (0..width)
        .map(|offset| evaluator.eval_cell(&at(found as u32, offset, &table)))
        .collect();
    line.swap_remove(index - 1)
}

#[cfg(test)]
mod tests {
    use crate::cell::{CellErrorType, CellValue};
    use crate::evaluator::tests::{eval, eval_with_refs, kind, num, TestBook};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.into())
    }

    fn book() -> TestBook {
        TestBook::with_sheet("sheet1")
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(eval(&book(), "=sum(1,2)"), num("3"));
        assert_eq!(eval(&book(), "=Sum(1,2)"), num("3"));
    }

    #[test]
    fn test_wrong_arity_is_type_error() {
        for formula in ["=NOT(1,2)", "=NOT()", "=IF(TRUE)", "=EXACT(\"a\")", "=VERSION(1)", "=AND()", "=ISBLANK()"] {
            assert_eq!(kind(&eval(&book(), formula)), Some(CellErrorType::TypeError), "{}", formula);
        }
    }

    #[test]
    fn test_logical_functions() {
        let b = book();
        assert_eq!(eval(&b, "=AND(TRUE,1,\"true\")"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=AND(TRUE,0)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=OR(FALSE,A1)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=OR(FALSE,2)"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=XOR(TRUE,TRUE,TRUE)"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=XOR(TRUE,TRUE)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=NOT(\"FALSE\")"), CellValue::Boolean(true));
        assert_eq!(kind(&eval(&b, "=AND(\"yes\")")), Some(CellErrorType::TypeError));
    }

    #[test]
    fn test_if_evaluates_only_taken_branch() {
        let (value, refs) = eval_with_refs(&book(), "=IF(TRUE, A1, B1)");
        assert_eq!(value, num("0"));
        assert_eq!(refs.len(), 1);

        let (value, refs) = eval_with_refs(&book(), "=IF(1>2, A1)");
        assert_eq!(value, CellValue::Boolean(false));
        assert!(refs.is_empty());

        assert_eq!(kind(&eval(&book(), "=IF(1/0, 1, 2)")), Some(CellErrorType::DivideByZero));
    }

    #[test]
    fn test_iferror() {
        let b = book();
        assert_eq!(eval(&b, "=IFERROR(1/0, \"oops\")"), text("oops"));
        assert_eq!(eval(&b, "=IFERROR(1/0)"), text(""));
        assert_eq!(eval(&b, "=IFERROR(5, 1/0)"), num("5"));
    }

    #[test]
    fn test_choose() {
        let b = book();
        assert_eq!(eval(&b, "=CHOOSE(2, \"a\", \"b\", \"c\")"), text("b"));
        assert_eq!(eval(&b, "=CHOOSE(\"1\", 10, 1/0)"), num("10"));
        assert_eq!(kind(&eval(&b, "=CHOOSE(4, 1, 2, 3)")), Some(CellErrorType::TypeError));
        assert_eq!(kind(&eval(&b, "=CHOOSE(0, 1)")), Some(CellErrorType::TypeError));
        assert_eq!(kind(&eval(&b, "=CHOOSE(1.5, 1, 2)")), Some(CellErrorType::TypeError));
    }

    #[test]
    fn test_information_functions_do_not_propagate_errors() {
        let mut b = book();
        b.set("sheet1", "A1", text("x"));
        assert_eq!(eval(&b, "=ISERROR(1/0)"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=ISERROR(A1)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=ISBLANK(B1)"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=ISBLANK(A1)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=ISTEXT(A1)"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=ISNUMBER(1/0)"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=ISNUMBER(3)"), CellValue::Boolean(true));
    }

    #[test]
    fn test_version() {
        assert_eq!(eval(&book(), "=VERSION()"), text(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_text_functions() {
        let b = book();
        assert_eq!(eval(&b, "=EXACT(\"a\", \"A\")"), CellValue::Boolean(false));
        assert_eq!(eval(&b, "=EXACT(1.50, \"1.5\")"), CellValue::Boolean(true));
        assert_eq!(eval(&b, "=LEN(\"héllo\")"), num("5"));
        assert_eq!(eval(&b, "=UPPER(\"abc\")"), text("ABC"));
        assert_eq!(eval(&b, "=LOWER(TRUE)"), text("true"));
        assert_eq!(eval(&b, "=TRIM(\"  a   b \")"), text("a b"));
        assert_eq!(eval(&b, "=CONCATENATE(\"a\", 1, FALSE)"), text("a1FALSE"));
    }

    #[test]
    fn test_aggregates_flatten_ranges() {
        let mut b = book();
        b.set("sheet1", "A1", num("1"));
        b.set("sheet1", "A2", num("2.5"));
        b.set("sheet1", "B1", text("4"));
        // B2 stays empty

        let (value, refs) = eval_with_refs(&b, "=SUM(A1:B2)");
        assert_eq!(value, num("7.5"));
        assert_eq!(refs.len(), 4);

        assert_eq!(eval(&b, "=MIN(A1:B2, 10)"), num("1"));
        assert_eq!(eval(&b, "=MAX(A1:B2)"), num("4"));
        assert_eq!(eval(&b, "=AVERAGE(A1:A2)"), num("1.75"));
        assert_eq!(eval(&b, "=COUNT(A1:B2)"), num("2"));
        assert_eq!(eval(&b, "=MIN(C1:C3)"), num("0"));
        assert_eq!(kind(&eval(&b, "=AVERAGE(C1:C3)")), Some(CellErrorType::DivideByZero));
    }

    #[test]
    fn test_aggregate_errors() {
        let mut b = book();
        b.set("sheet1", "A1", CellValue::error(CellErrorType::DivideByZero, ""));
        b.set("sheet1", "A2", text("word"));
        assert_eq!(kind(&eval(&b, "=SUM(A1:A3)")), Some(CellErrorType::DivideByZero));
        assert_eq!(kind(&eval(&b, "=SUM(A2)")), Some(CellErrorType::TypeError));
        assert_eq!(kind(&eval(&b, "=SUM(A1:#REF!)")), Some(CellErrorType::BadReference));
    }

    #[test]
    fn test_boolean_functions_reject_ranges() {
        assert_eq!(kind(&eval(&book(), "=AND(A1:A2)")), Some(CellErrorType::TypeError));
    }

    #[test]
    fn test_math_functions() {
        let b = book();
        assert_eq!(eval(&b, "=ABS(-2.5)"), num("2.5"));
        assert_eq!(eval(&b, "=ROUND(2.5)"), num("3"));
        assert_eq!(eval(&b, "=ROUND(-2.5)"), num("-3"));
        assert_eq!(eval(&b, "=ROUND(1.2345, 2)"), num("1.23"));
        assert_eq!(eval(&b, "=ROUND(1250, -2)"), num("1300"));
        assert_eq!(eval(&b, "=ROUND(5, -40)"), num("0"));
    }

    #[test]
    fn test_indirect() {
        let mut b = book();
        b.sheets.insert("other sheet".into(), Default::default());
        b.set("other sheet", "B2", num("9"));
        b.set("sheet1", "A1", num("1"));
        b.set("sheet1", "A2", num("2"));

        let (value, refs) = eval_with_refs(&b, "=INDIRECT(\"'Other Sheet'!B2\")");
        assert_eq!(value, num("9"));
        assert_eq!(refs.len(), 1);

        assert_eq!(eval(&b, "=SUM(INDIRECT(\"A1:A2\"))"), num("3"));
        assert_eq!(kind(&eval(&b, "=INDIRECT(\"1+2\")")), Some(CellErrorType::BadReference));
        assert_eq!(kind(&eval(&b, "=INDIRECT(5)")), Some(CellErrorType::BadReference));
        assert_eq!(kind(&eval(&b, "=INDIRECT(1/0)")), Some(CellErrorType::DivideByZero));
    }

    fn lookup_book() -> TestBook {
        let mut b = book();
        for (row, (key, value)) in [("apple", "1"), ("Pear", "2"), ("plum", "3")].iter().enumerate() {
            b.set("sheet1", &format!("A{}", row + 1), text(key));
            b.set("sheet1", &format!("B{}", row + 1), num(value));
        }
        b
    }

    #[test]
    fn test_vlookup() {
        let b = lookup_book();
        let (value, refs) = eval_with_refs(&b, "=VLOOKUP(\"pear\", A1:C3, 2)");
        assert_eq!(value, num("2"));
        // Search column plus the whole matched row
        assert_eq!(refs.len(), 3 + 2);

        assert_eq!(eval(&b, "=VLOOKUP(\"plum\", A1:C3, 3)"), num("0"));
        assert_eq!(kind(&eval(&b, "=VLOOKUP(\"fig\", A1:B3, 2)")), Some(CellErrorType::TypeError));
        assert_eq!(kind(&eval(&b, "=VLOOKUP(\"plum\", A1:B3, 3)")), Some(CellErrorType::TypeError));
        assert_eq!(kind(&eval(&b, "=VLOOKUP(\"plum\", A1, 1)")), Some(CellErrorType::TypeError));
        // Type-strict: the number 1 does not match text
        assert_eq!(kind(&eval(&b, "=VLOOKUP(\"1\", B1:B3, 1)")), Some(CellErrorType::TypeError));
        assert_eq!(eval(&b, "=VLOOKUP(3, B1:B3, 1)"), num("3"));
    }

    #[test]
    fn test_hlookup() {
        let mut b = book();
        b.set("sheet1", "A1", num("10"));
        b.set("sheet1", "B1", num("20"));
        b.set("sheet1", "A2", text("ten"));
        b.set("sheet1", "B2", text("twenty"));
        assert_eq!(eval(&b, "=HLOOKUP(20, A1:B2, 2)"), text("twenty"));
        assert_eq!(kind(&eval(&b, "=HLOOKUP(\"20\", A1:B2, 2)")), Some(CellErrorType::TypeError));
    }
}
