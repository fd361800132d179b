//! FILENAME: parser/src/lib.rs
//! PURPOSE: Library root for the GridCalc formula parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to convert formula strings into evaluatable expression trees,
//! and to print (possibly rewritten) trees back into formula text.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!                                                               \--> Display --> Formula String
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Comparison: =, ==, <>, !=, <, >, <=, >=
//! - String concatenation: &
//! - Cell references: A1, $AA$100, Sheet2!B3, 'My Sheet'!C4
//! - Ranges: A1:B10
//! - Error literals: #REF!, #DIV/0!, #NAME?, #VALUE!, #CIRCREF!, #ERROR!
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")
//! - Parentheses for grouping
//! - Unary plus and negation: +5, -5

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

// Register the separate tests module
#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, ErrorLiteral, Expression, SheetRef, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{parse, parse_reference, split_cell_reference, ParseError, ParseResult, Parser};
pub use token::Token;
