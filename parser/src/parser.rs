//! FILENAME: parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into an AST.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds an Expression tree that can be evaluated.
//!
//! GRAMMAR:
//!   expression     --> comparison
//!   comparison     --> concatenation ( CMP_OP concatenation )*
//!   CMP_OP         --> "=" | "==" | "<>" | "!=" | "<" | ">" | "<=" | ">="
//!   concatenation  --> additive ( "&" additive )*
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> ("+" | "-") unary | primary
//!   primary        --> NUMBER | STRING | BOOLEAN | ERROR | reference | function_call | "(" expression ")"
//!   reference      --> [sheet_prefix] endpoint (":" endpoint)?
//!   sheet_prefix   --> (IDENTIFIER | QUOTED_IDENTIFIER) "!"
//!   endpoint       --> IDENTIFIER                // cell reference like $A$1
//!                    | "#REF!"                   // only inside a range
//!   function_call  --> IDENTIFIER "(" arguments? ")"
//!   arguments      --> expression ("," expression)*

use crate::ast::{BinaryOperator, ErrorLiteral, Expression, SheetRef, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::token::Token;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Parses the entire input and returns the AST.
    /// Handles the optional leading '=' that indicates a formula.
    pub fn parse(&mut self) -> ParseResult<Expression> {
        if self.current_token == Token::Equals {
            self.advance();
        }

        if self.current_token == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expr = self.parse_expression()?;

        // Ensure we consumed all tokens
        if self.current_token != Token::EOF {
            return Err(ParseError::new(format!(
                "Unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "Expected {}, found {}",
                expected, self.current_token
            )))
        }
    }

    /// Entry point for expression parsing.
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_comparison()
    }

    /// Parses comparison expressions (=, ==, <>, !=, <, >, <=, >=).
    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match &self.current_token {
                Token::Equals => BinaryOperator::Equal,
                Token::DoubleEquals => BinaryOperator::EqualEqual,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::BangEqual => BinaryOperator::BangEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_concatenation()?;

            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses concatenation expressions (&).
    fn parse_concatenation(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive()?;

        while self.current_token == Token::Ampersand {
            self.advance();
            let right = self.parse_additive()?;

            left = Expression::BinaryOp {
                left: Box::new(left),
                op: BinaryOperator::Concat,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses additive expressions (+ and -).
    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative()?;

            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses multiplicative expressions (* and /).
    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary()?;

            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses unary expressions (+ and -).
    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current_token {
            Token::Minus => UnaryOperator::Negate,
            Token::Plus => UnaryOperator::Plus,
            _ => return self.parse_primary(),
        };

        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expression::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    /// Parses primary expressions (literals, cell refs, function calls, parentheses).
    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Value::Number(n)))
            }

            Token::String(s) => {
                self.advance();
                Ok(Expression::Literal(Value::String(s)))
            }

            Token::Boolean(b) => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(b)))
            }

            // An error literal; #REF! may also open a range left behind by relocation
            Token::ErrorLiteral(literal) => {
                self.advance();
                let start = Expression::Literal(Value::Error(literal));
                if literal == ErrorLiteral::Ref && self.current_token == Token::Colon {
                    return self.parse_range(None, start);
                }
                Ok(start)
            }

            // Quoted identifier - must be a sheet reference
            Token::QuotedIdentifier(sheet_name) => {
                self.advance();
                self.expect(Token::Exclamation)?;
                self.parse_sheet_reference(SheetRef {
                    name: sheet_name,
                    quoted: true,
                })
            }

            // Identifier: could be a cell reference, range, function call,
            // or sheet reference prefix
            Token::Identifier(name) => {
                self.advance();

                // Check if it's a sheet reference (followed by '!')
                if self.current_token == Token::Exclamation {
                    if name.contains('$') {
                        return Err(ParseError::new(format!("Invalid sheet name: {}", name)));
                    }
                    self.advance();
                    return self.parse_sheet_reference(SheetRef::new(name));
                }

                // Check if it's a function call (followed by '(')
                if self.current_token == Token::LParen {
                    return self.parse_function_call(name);
                }

                let start = self.parse_cell_ref(None, &name)?;
                if self.current_token == Token::Colon {
                    return self.parse_range(None, start);
                }
                Ok(start)
            }

            // Parenthesized expression
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(Expression::Parenthesized(Box::new(expr)))
            }

            // Error cases
            Token::EOF => Err(ParseError::new("Unexpected end of expression")),

            Token::Illegal(ch) => Err(ParseError::new(format!("Illegal character: {}", ch))),

            token => Err(ParseError::new(format!("Unexpected token: {}", token))),
        }
    }

    /// Parses a reference after a sheet prefix (SheetName!).
    fn parse_sheet_reference(&mut self, sheet: SheetRef) -> ParseResult<Expression> {
        let start = self.parse_endpoint()?;

        if self.current_token == Token::Colon {
            return self.parse_range(Some(sheet), start);
        }

        match start {
            Expression::CellRef {
                col,
                row,
                col_absolute,
                row_absolute,
                ..
            } => Ok(Expression::CellRef {
                sheet: Some(sheet),
                col,
                row,
                col_absolute,
                row_absolute,
            }),
            _ => Err(ParseError::new(format!(
                "Expected cell reference after '{}'",
                sheet
            ))),
        }
    }

    /// Parses the rest of a range after its start endpoint, consuming the ':'.
    fn parse_range(&mut self, sheet: Option<SheetRef>, start: Expression) -> ParseResult<Expression> {
        self.expect(Token::Colon)?;
        let end = self.parse_endpoint()?;
        Ok(Expression::Range {
            sheet,
            start: Box::new(start),
            end: Box::new(end),
        })
    }

    /// Parses one end of a reference: a cell like $A1 or a #REF! placeholder.
    fn parse_endpoint(&mut self) -> ParseResult<Expression> {
        match self.current_token.clone() {
            Token::Identifier(name) => {
                self.advance();
                self.parse_cell_ref(None, &name)
            }
            Token::ErrorLiteral(ErrorLiteral::Ref) => {
                self.advance();
                Ok(Expression::Literal(Value::Error(ErrorLiteral::Ref)))
            }
            token => Err(ParseError::new(format!(
                "Expected cell reference, found {}",
                token
            ))),
        }
    }

    /// Parses a cell reference from an identifier string like "A1", "$AA$100".
    fn parse_cell_ref(&self, sheet: Option<SheetRef>, identifier: &str) -> ParseResult<Expression> {
        let (col, row, col_absolute, row_absolute) = split_cell_reference(identifier)?;
        Ok(Expression::CellRef {
            sheet,
            col,
            row,
            col_absolute,
            row_absolute,
        })
    }

    /// Parses a function call after seeing "IDENTIFIER (".
    fn parse_function_call(&mut self, name: String) -> ParseResult<Expression> {
        if name.contains('$') {
            return Err(ParseError::new(format!("Invalid function name: {}", name)));
        }

        // Consume the '('
        self.advance();

        let mut args = Vec::new();

        // Check for empty argument list
        if self.current_token == Token::RParen {
            self.advance();
            return Ok(Expression::FunctionCall { name, args });
        }

        args.push(self.parse_expression()?);

        while self.current_token == Token::Comma {
            self.advance();
            args.push(self.parse_expression()?);
        }

        self.expect(Token::RParen)?;

        Ok(Expression::FunctionCall { name, args })
    }
}

/// Splits a reference like "$A$1" into (column, row, col_absolute, row_absolute).
/// The column is upper-cased. Accepts `\$?[A-Za-z]+\$?[0-9]+`.
pub fn split_cell_reference(identifier: &str) -> ParseResult<(String, u32, bool, bool)> {
    let invalid = || ParseError::new(format!("Invalid cell reference: {}", identifier));

    let rest = identifier.strip_prefix('$');
    let col_absolute = rest.is_some();
    let rest = rest.unwrap_or(identifier);

    let letters_end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .ok_or_else(invalid)?;
    let (col, rest) = rest.split_at(letters_end);
    if col.is_empty() {
        return Err(invalid());
    }

    let digits = rest.strip_prefix('$');
    let row_absolute = digits.is_some();
    let digits = digits.unwrap_or(rest);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    // Only overflow can fail here. Saturate so the reference stays off-grid.
    let row = digits.parse::<u32>().unwrap_or(u32::MAX);

    Ok((col.to_ascii_uppercase(), row, col_absolute, row_absolute))
}

/// Convenience function to parse a formula string directly.
pub fn parse(input: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(input);
    parser.parse()
}

/// Parses text that must consist of exactly one cell or range reference,
/// optionally sheet-qualified ("Sheet2!$B$3", "'My Sheet'!A1:B4").
pub fn parse_reference(input: &str) -> ParseResult<Expression> {
    match parse(input)? {
        expr @ (Expression::CellRef { .. } | Expression::Range { .. }) => Ok(expr),
        other => Err(ParseError::new(format!("Not a reference: {}", other))),
    }
}
