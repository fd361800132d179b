//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for formula expressions.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The Evaluator then traverses
//! this tree to compute the final result, and the reference rewriter
//! transforms it and prints it back through `Display`.
//!
//! SUPPORTED EXPRESSIONS:
//! - Literals: Numbers, Strings, Booleans, Error literals (#REF!, #DIV/0!, ...)
//! - Cell references: A1, AA100, Sheet1!A1, 'Sheet Name'!A1
//! - Absolute references: $A$1, A$1, $A1
//! - Ranges: A1:B10, Sheet1!A1:B10, $A$1:$B$10
//! - Binary operations: +, -, *, /, &, =, ==, <>, !=, <, >, <=, >=
//! - Unary operations: + and - (negation)
//! - Function calls: SUM(A1:A10), IF(A1>0, "yes", "no")
//! - Parentheses, kept so the printed formula matches its source

use rust_decimal::Decimal;
use std::fmt;

/// Represents a parsed formula expression.
/// This is the core data structure that the evaluator will traverse.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A literal value: number, string, boolean or error.
    Literal(Value),

    /// A single cell reference like A1, B2, AA100, $A$1, or Sheet1!A1.
    /// The column is stored upper-cased (e.g., "A", "AA") and row as 1-indexed integer.
    /// The row is whatever was written; bounds are checked by the engine.
    CellRef {
        sheet: Option<SheetRef>,
        col: String,
        row: u32,
        col_absolute: bool,
        row_absolute: bool,
    },

    /// A range reference like A1:B10 or Sheet1!$A$1:$B$10.
    /// Each endpoint is a CellRef without a sheet, or a `#REF!` literal
    /// left behind by relocation. The sheet applies to the entire range.
    Range {
        sheet: Option<SheetRef>,
        start: Box<Expression>,
        end: Box<Expression>,
    },

    /// A binary operation: left op right (e.g., 5 + 3, A1 > 10).
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// A function call like SUM(A1:A10). The name keeps its written case.
    FunctionCall { name: String, args: Vec<Expression> },

    /// A parenthesized sub-expression.
    Parenthesized(Box<Expression>),
}

/// Sheet qualifier of a reference, as written.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SheetRef {
    pub name: String,
    /// Whether the source text used quotes ('My Sheet'!A1).
    pub quoted: bool,
}

impl SheetRef {
    pub fn new(name: impl Into<String>) -> Self {
        SheetRef {
            name: name.into(),
            quoted: false,
        }
    }

    /// True when the name can only be written inside quotes. Boolean words
    /// count, since unquoted they lex as literals.
    pub fn requires_quotes(name: &str) -> bool {
        if name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE") {
            return true;
        }
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                !chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => true,
        }
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted || Self::requires_quotes(&self.name) {
            write!(f, "'{}'!", self.name.replace('\'', "''"))
        } else {
            write!(f, "{}!", self.name)
        }
    }
}

/// Literal values that can appear in formulas.
#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    /// Keeps the written scale, so 1.50 prints back as 1.50.
    Number(Decimal),
    String(String),
    Boolean(bool),
    Error(ErrorLiteral),
}

/// The error literals recognized in formulas and cell contents.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ErrorLiteral {
    Error,  // #ERROR!
    CircRef, // #CIRCREF!
    Ref,    // #REF!
    Name,   // #NAME?
    Value,  // #VALUE!
    Div0,   // #DIV/0!
}

impl ErrorLiteral {
    pub const ALL: [ErrorLiteral; 6] = [
        ErrorLiteral::Error,
        ErrorLiteral::CircRef,
        ErrorLiteral::Ref,
        ErrorLiteral::Name,
        ErrorLiteral::Value,
        ErrorLiteral::Div0,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorLiteral::Error => "#ERROR!",
            ErrorLiteral::CircRef => "#CIRCREF!",
            ErrorLiteral::Ref => "#REF!",
            ErrorLiteral::Name => "#NAME?",
            ErrorLiteral::Value => "#VALUE!",
            ErrorLiteral::Div0 => "#DIV/0!",
        }
    }

    /// Case-insensitive lookup of a complete literal such as "#ref!".
    pub fn from_text(text: &str) -> Option<ErrorLiteral> {
        Self::ALL
            .into_iter()
            .find(|literal| literal.as_str().eq_ignore_ascii_case(text))
    }
}

/// Binary operators for expressions.
/// Listed in order of precedence groups (comparison is lowest).
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    // Comparison operators (lowest precedence)
    Equal,        // =
    EqualEqual,   // ==
    NotEqual,     // <>
    BangEqual,    // !=
    LessThan,     // <
    GreaterThan,  // >
    LessEqual,    // <=
    GreaterEqual, // >=

    // String concatenation
    Concat, // &

    // Arithmetic operators
    Add,      // +
    Subtract, // -
    Multiply, // *
    Divide,   // /
}

impl BinaryOperator {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::EqualEqual
                | BinaryOperator::NotEqual
                | BinaryOperator::BangEqual
                | BinaryOperator::LessThan
                | BinaryOperator::GreaterThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterEqual
        )
    }
}

/// Unary operators.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Plus,   // +
    Negate, // -
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Concat => write!(f, "&"),
            BinaryOperator::Equal => write!(f, "="),
            BinaryOperator::EqualEqual => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "<>"),
            BinaryOperator::BangEqual => write!(f, "!="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::LessEqual => write!(f, "<="),
            BinaryOperator::GreaterEqual => write!(f, ">="),
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Plus => write!(f, "+"),
            UnaryOperator::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for ErrorLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

/// Prints the formula body (without the leading '=') with no extra spaces.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::CellRef {
                sheet,
                col,
                row,
                col_absolute,
                row_absolute,
            } => {
                if let Some(sheet) = sheet {
                    write!(f, "{}", sheet)?;
                }
                write!(
                    f,
                    "{}{}{}{}",
                    if *col_absolute { "$" } else { "" },
                    col,
                    if *row_absolute { "$" } else { "" },
                    row
                )
            }
            Expression::Range { sheet, start, end } => {
                if let Some(sheet) = sheet {
                    write!(f, "{}", sheet)?;
                }
                write!(f, "{}:{}", start, end)
            }
            Expression::BinaryOp { left, op, right } => write!(f, "{}{}{}", left, op, right),
            Expression::UnaryOp { op, operand } => write!(f, "{}{}", op, operand),
            Expression::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Parenthesized(inner) => write!(f, "({})", inner),
        }
    }
}
