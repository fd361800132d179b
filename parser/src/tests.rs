//! FILENAME: parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, ErrorLiteral, Expression, SheetRef, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::parser::{parse, parse_reference, split_cell_reference};
use crate::token::Token;
use rust_decimal::Decimal;
use std::str::FromStr;

fn num(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

fn cell(col: &str, row: u32) -> Expression {
    Expression::CellRef {
        sheet: None,
        col: col.to_string(),
        row,
        col_absolute: false,
        row_absolute: false,
    }
}

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_simple_math() {
    let mut lexer = Lexer::new("=1 + 2.50");

    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::Number(num("1")));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(num("2.50")));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_keeps_identifier_case() {
    let mut lexer = Lexer::new("sum(a1, $B$2)");

    assert_eq!(lexer.next_token(), Token::Identifier("sum".to_string()));
    assert_eq!(lexer.next_token(), Token::LParen);
    assert_eq!(lexer.next_token(), Token::Identifier("a1".to_string()));
    assert_eq!(lexer.next_token(), Token::Comma);
    assert_eq!(lexer.next_token(), Token::Identifier("$B$2".to_string()));
    assert_eq!(lexer.next_token(), Token::RParen);
}

#[test]
fn lexer_handles_strings_and_bools() {
    let mut lexer = Lexer::new("\"Say \"\"hi\"\"\" true FALSE");

    assert_eq!(lexer.next_token(), Token::String("Say \"hi\"".to_string()));
    assert_eq!(lexer.next_token(), Token::Boolean(true));
    assert_eq!(lexer.next_token(), Token::Boolean(false));
}

#[test]
fn lexer_rejects_unterminated_string() {
    let mut lexer = Lexer::new("\"open");
    assert_eq!(lexer.next_token(), Token::Illegal('"'));
}

#[test]
fn lexer_tokenizes_comparison_operators() {
    let mut lexer = Lexer::new("< > <= >= <> = == !=");

    assert_eq!(lexer.next_token(), Token::LessThan);
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.next_token(), Token::GreaterEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::DoubleEquals);
    assert_eq!(lexer.next_token(), Token::BangEqual);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_distinguishes_sheet_separator_from_not_equal() {
    let mut lexer = Lexer::new("Sheet1!A1!=2");

    assert_eq!(lexer.next_token(), Token::Identifier("Sheet1".to_string()));
    assert_eq!(lexer.next_token(), Token::Exclamation);
    assert_eq!(lexer.next_token(), Token::Identifier("A1".to_string()));
    assert_eq!(lexer.next_token(), Token::BangEqual);
    assert_eq!(lexer.next_token(), Token::Number(num("2")));
}

#[test]
fn lexer_quoted_identifier_with_escaped_quote() {
    let mut lexer = Lexer::new("'John''s Sheet'!A1");
    assert_eq!(lexer.next_token(), Token::QuotedIdentifier("John's Sheet".to_string()));
    assert_eq!(lexer.next_token(), Token::Exclamation);
}

#[test]
fn lexer_reads_error_literals_case_insensitively() {
    let mut lexer = Lexer::new("#ref! #DIV/0! #name? #Value! #CIRCREF! #error!");

    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::Ref));
    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::Div0));
    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::Name));
    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::Value));
    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::CircRef));
    assert_eq!(lexer.next_token(), Token::ErrorLiteral(ErrorLiteral::Error));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_rejects_unknown_error_literal() {
    let mut lexer = Lexer::new("#BOGUS!");
    assert_eq!(lexer.next_token(), Token::Illegal('#'));
}

#[test]
fn lexer_accepts_leading_and_trailing_dot_numbers() {
    let mut lexer = Lexer::new(".5 7.");
    assert_eq!(lexer.next_token(), Token::Number(num("0.5")));
    assert_eq!(lexer.next_token(), Token::Number(num("7")));
}

// ========================================
// PARSER TESTS - LITERALS
// ========================================

#[test]
fn parser_parses_number_literal() {
    let result = parse("=42").unwrap();
    assert_eq!(result, Expression::Literal(Value::Number(num("42"))));
}

#[test]
fn parser_parses_string_literal() {
    let result = parse("=\"Hello World\"").unwrap();
    assert_eq!(
        result,
        Expression::Literal(Value::String("Hello World".to_string()))
    );
}

#[test]
fn parser_parses_boolean_literal() {
    assert_eq!(parse("=TRUE").unwrap(), Expression::Literal(Value::Boolean(true)));
    assert_eq!(parse("=false").unwrap(), Expression::Literal(Value::Boolean(false)));
}

#[test]
fn parser_parses_error_literal() {
    assert_eq!(
        parse("=#div/0!").unwrap(),
        Expression::Literal(Value::Error(ErrorLiteral::Div0))
    );
}

// ========================================
// PARSER TESTS - CELL REFERENCES
// ========================================

#[test]
fn parser_parses_simple_cell_ref() {
    assert_eq!(parse("=a1").unwrap(), cell("A", 1));
}

#[test]
fn parser_parses_absolute_markers() {
    let result = parse("=$AA$100").unwrap();
    assert_eq!(
        result,
        Expression::CellRef {
            sheet: None,
            col: "AA".to_string(),
            row: 100,
            col_absolute: true,
            row_absolute: true
        }
    );

    let result = parse("=B$7").unwrap();
    assert_eq!(
        result,
        Expression::CellRef {
            sheet: None,
            col: "B".to_string(),
            row: 7,
            col_absolute: false,
            row_absolute: true
        }
    );
}

#[test]
fn parser_keeps_out_of_bounds_rows_for_the_engine() {
    // Syntax is valid; the engine reports #REF! on evaluation
    assert_eq!(parse("=A0").unwrap(), cell("A", 0));
    assert_eq!(parse("=ZZZZZ99999").unwrap(), cell("ZZZZZ", 99999));
}

#[test]
fn parser_parses_sheet_qualified_refs() {
    let result = parse("=Sheet2!B3").unwrap();
    assert_eq!(
        result,
        Expression::CellRef {
            sheet: Some(SheetRef::new("Sheet2")),
            col: "B".to_string(),
            row: 3,
            col_absolute: false,
            row_absolute: false
        }
    );

    let result = parse("='My Sheet'!C4").unwrap();
    assert_eq!(
        result,
        Expression::CellRef {
            sheet: Some(SheetRef {
                name: "My Sheet".to_string(),
                quoted: true
            }),
            col: "C".to_string(),
            row: 4,
            col_absolute: false,
            row_absolute: false
        }
    );
}

#[test]
fn parser_parses_range() {
    let result = parse("=A1:B10").unwrap();
    assert_eq!(
        result,
        Expression::Range {
            sheet: None,
            start: Box::new(cell("A", 1)),
            end: Box::new(cell("B", 10)),
        }
    );
}

#[test]
fn parser_parses_sheet_qualified_range() {
    let result = parse("=Data!A1:A3").unwrap();
    assert_eq!(
        result,
        Expression::Range {
            sheet: Some(SheetRef::new("Data")),
            start: Box::new(cell("A", 1)),
            end: Box::new(cell("A", 3)),
        }
    );
}

#[test]
fn parser_accepts_ref_error_as_range_endpoint() {
    let result = parse("=SUM(A1:#REF!)").unwrap();
    assert_eq!(
        result,
        Expression::FunctionCall {
            name: "SUM".to_string(),
            args: vec![Expression::Range {
                sheet: None,
                start: Box::new(cell("A", 1)),
                end: Box::new(Expression::Literal(Value::Error(ErrorLiteral::Ref))),
            }],
        }
    );
    assert!(parse("=#REF!:B2").is_ok());
}

// ========================================
// PARSER TESTS - OPERATORS
// ========================================

#[test]
fn parser_respects_precedence() {
    let result = parse("=1+2*3").unwrap();
    assert_eq!(
        result,
        Expression::BinaryOp {
            left: Box::new(Expression::Literal(Value::Number(num("1")))),
            op: BinaryOperator::Add,
            right: Box::new(Expression::BinaryOp {
                left: Box::new(Expression::Literal(Value::Number(num("2")))),
                op: BinaryOperator::Multiply,
                right: Box::new(Expression::Literal(Value::Number(num("3")))),
            }),
        }
    );
}

#[test]
fn parser_binds_concat_looser_than_addition() {
    match parse("=1+2&\"x\"").unwrap() {
        Expression::BinaryOp { op, left, .. } => {
            assert_eq!(op, BinaryOperator::Concat);
            assert!(matches!(*left, Expression::BinaryOp { op: BinaryOperator::Add, .. }));
        }
        other => panic!("unexpected tree: {:?}", other),
    }
}

#[test]
fn parser_binds_comparison_loosest() {
    match parse("=A1&\"b\"<>\"ab\"").unwrap() {
        Expression::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::NotEqual),
        other => panic!("unexpected tree: {:?}", other),
    }
    match parse("=A1!=B1").unwrap() {
        Expression::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::BangEqual),
        other => panic!("unexpected tree: {:?}", other),
    }
}

#[test]
fn parser_parses_unary_operators() {
    let result = parse("=-+A1").unwrap();
    assert_eq!(
        result,
        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(Expression::UnaryOp {
                op: UnaryOperator::Plus,
                operand: Box::new(cell("A", 1)),
            }),
        }
    );
}

#[test]
fn parser_keeps_parentheses() {
    let result = parse("=(1)").unwrap();
    assert_eq!(
        result,
        Expression::Parenthesized(Box::new(Expression::Literal(Value::Number(num("1")))))
    );
}

// ========================================
// PARSER TESTS - FUNCTIONS
// ========================================

#[test]
fn parser_parses_function_calls() {
    let result = parse("=if(A1>0, \"yes\", version())").unwrap();
    match result {
        Expression::FunctionCall { name, args } => {
            assert_eq!(name, "if");
            assert_eq!(args.len(), 3);
            assert_eq!(
                args[2],
                Expression::FunctionCall {
                    name: "version".to_string(),
                    args: vec![]
                }
            );
        }
        other => panic!("unexpected tree: {:?}", other),
    }
}

// ========================================
// PARSER TESTS - ERRORS
// ========================================

#[test]
fn parser_rejects_malformed_input() {
    assert!(parse("=").is_err());
    assert!(parse("=1+").is_err());
    assert!(parse("=(1").is_err());
    assert!(parse("=1 2").is_err());
    assert!(parse("=foo").is_err());
    assert!(parse("=Sheet1!").is_err());
    assert!(parse("=Sheet1!#REF!").is_err());
    assert!(parse("=\"unterminated").is_err());
    assert!(parse("=SUM(1,)").is_err());
    assert!(parse("=$SUM(1)").is_err());
    assert!(parse("=A1:").is_err());
}

#[test]
fn split_cell_reference_validates_shape() {
    assert_eq!(
        split_cell_reference("$b12").unwrap(),
        ("B".to_string(), 12, true, false)
    );
    assert!(split_cell_reference("12").is_err());
    assert!(split_cell_reference("A").is_err());
    assert!(split_cell_reference("A1B").is_err());
    assert!(split_cell_reference("A$").is_err());
}

#[test]
fn split_cell_reference_saturates_huge_rows() {
    assert_eq!(
        split_cell_reference("A99999999999").unwrap(),
        ("A".to_string(), u32::MAX, false, false)
    );
    assert!(parse("=A99999999999+1").is_ok());
}

#[test]
fn parse_reference_accepts_only_references() {
    assert!(parse_reference("Sheet2!$A$1").is_ok());
    assert!(parse_reference("'My Sheet'!a1:b4").is_ok());
    assert!(parse_reference("A1+1").is_err());
    assert!(parse_reference("hello").is_err());
    assert!(parse_reference("").is_err());
}

// ========================================
// DISPLAY (formula reconstruction)
// ========================================

#[test]
fn display_reprints_formulas_without_spaces() {
    let cases = [
        ("=B1 * 2", "B1*2"),
        ("= sum( A1:b2 , 3 )", "sum(A1:B2,3)"),
        ("=-(1.50 + $C$3)", "-(1.50+$C$3)"),
        ("=A1 == \"x\"\"y\"", "A1==\"x\"\"y\""),
        ("=NOT(true) & #value!", "NOT(TRUE)&#VALUE!"),
    ];
    for (input, expected) in cases {
        assert_eq!(parse(input).unwrap().to_string(), expected);
    }
}

#[test]
fn display_quotes_sheet_names_only_when_needed() {
    assert_eq!(parse("=Sheet1!A1").unwrap().to_string(), "Sheet1!A1");
    assert_eq!(parse("='Sheet1'!A1").unwrap().to_string(), "'Sheet1'!A1");
    assert_eq!(parse("='My Sheet'!A1:B2").unwrap().to_string(), "'My Sheet'!A1:B2");
    assert_eq!(parse("='it''s'!A1").unwrap().to_string(), "'it''s'!A1");

    assert!(SheetRef::requires_quotes("2020"));
    assert!(SheetRef::requires_quotes("a b"));
    assert!(SheetRef::requires_quotes(""));
    assert!(!SheetRef::requires_quotes("_data2"));
}

#[test]
fn display_quotes_boolean_sheet_names() {
    assert!(SheetRef::requires_quotes("True"));
    assert!(SheetRef::requires_quotes("FALSE"));
    assert!(!SheetRef::requires_quotes("Truth"));

    let printed = parse("='True'!A1+'false'!B2:C3").unwrap().to_string();
    assert_eq!(printed, "'True'!A1+'false'!B2:C3");
    assert_eq!(parse(&format!("={}", printed)).unwrap().to_string(), printed);
}

#[test]
fn display_reprints_ref_error_endpoints() {
    assert_eq!(parse("=SUM(A1:#REF!)").unwrap().to_string(), "SUM(A1:#REF!)");
}
