//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, decimal number parsing, string literals, quoted
//! identifiers for sheet names, error literals and multi-character
//! operators like <=, <>, == and !=.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / & ( ) , : = < > !
//! - Multi char: <= >= <> == !=
//! - Quoted identifiers: 'Sheet Name'
//! - Error literals: #REF!, #DIV/0!, #NAME?, ...

use crate::ast::ErrorLiteral;
use crate::token::Token;
use rust_decimal::Decimal;
use std::iter::Peekable;
use std::str::Chars;
use std::str::FromStr;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('&') => Token::Ampersand,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some(',') => Token::Comma,
            Some(':') => Token::Colon,

            // '!' separates a sheet name, unless it starts '!='
            Some('!') => self.read_bang(),

            Some('=') => self.read_equals(),

            // Handle < and potentially <= or <>
            Some('<') => self.read_less_than_operator(),

            // Handle > and potentially >=
            Some('>') => self.read_greater_than_operator(),

            Some('"') => self.read_string(),

            // Handle single quotes for sheet names with spaces
            Some('\'') => self.read_quoted_identifier(),

            Some('#') => self.read_error_literal(),

            // Handle Numbers (starts with digit or dot)
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            // Identifiers may carry absolute markers: $A$1
            Some(ch) if is_letter(ch) || ch == '$' => self.read_identifier(ch),

            // End of input
            None => Token::EOF,

            // Unknown character
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_bang(&mut self) -> Token {
        if self.input.peek() == Some(&'=') {
            self.input.next();
            Token::BangEqual
        } else {
            Token::Exclamation
        }
    }

    fn read_equals(&mut self) -> Token {
        if self.input.peek() == Some(&'=') {
            self.input.next();
            Token::DoubleEquals
        } else {
            Token::Equals
        }
    }

    /// Handles operators starting with '<': <, <=, <>
    fn read_less_than_operator(&mut self) -> Token {
        match self.input.peek() {
            Some('=') => {
                self.input.next();
                Token::LessEqual
            }
            Some('>') => {
                self.input.next();
                Token::NotEqual
            }
            _ => Token::LessThan,
        }
    }

    /// Handles operators starting with '>': >, >=
    fn read_greater_than_operator(&mut self) -> Token {
        match self.input.peek() {
            Some('=') => {
                self.input.next();
                Token::GreaterEqual
            }
            _ => Token::GreaterThan,
        }
    }

    /// Reads a double-quoted string. A doubled quote ("") stands for one quote.
    /// An unterminated string is illegal.
    fn read_string(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == '"' {
                if self.input.peek() == Some(&'"') {
                    result.push('"');
                    self.input.next();
                } else {
                    return Token::String(result);
                }
            } else {
                result.push(ch);
            }
        }
        Token::Illegal('"')
    }

    /// Reads a quoted identifier (sheet name with spaces): 'Sheet Name'
    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(&ch) = self.input.peek() {
            if ch == '\'' {
                // Check for escaped single quote ('')
                self.input.next();
                if self.input.peek() == Some(&'\'') {
                    result.push('\'');
                    self.input.next();
                } else {
                    return Token::QuotedIdentifier(result);
                }
            } else {
                result.push(ch);
                self.input.next();
            }
        }
        Token::Illegal('\'')
    }

    /// Reads an error literal after its leading '#', e.g. "REF!" or "DIV/0!".
    fn read_error_literal(&mut self) -> Token {
        let mut text = String::from('#');
        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() || ch == '/' {
                text.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        if let Some(&ch) = self.input.peek() {
            if ch == '!' || ch == '?' {
                text.push(ch);
                self.input.next();
            }
        }

        match ErrorLiteral::from_text(&text) {
            Some(literal) => Token::ErrorLiteral(literal),
            None => Token::Illegal('#'),
        }
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // "5." and ".5" are accepted spellings of 5 and 0.5
        if number_str.ends_with('.') {
            number_str.pop();
        }
        if number_str.starts_with('.') {
            number_str.insert(0, '0');
        }

        match Decimal::from_str(&number_str) {
            Ok(n) => Token::Number(n),
            // Fallback if parsing fails (e.g. just "." or too many digits)
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if is_letter(ch) || ch.is_ascii_digit() || ch == '$' {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        if ident.eq_ignore_ascii_case("TRUE") {
            Token::Boolean(true)
        } else if ident.eq_ignore_ascii_case("FALSE") {
            Token::Boolean(false)
        } else {
            Token::Identifier(ident)
        }
    }
}

/// Returns true if `ch` can start an identifier: ASCII letters and underscore.
fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}
