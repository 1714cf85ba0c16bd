use crate::Span;
use crate::evaluator::EvalError;
use crate::lexer::{LexerError, Token, TokenKind};
use crate::types::Value;
use std::iter::Peekable;
use std::vec::IntoIter; // To iterate over Vec<Token>
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Unexpected token `{}` at {}, expected {expected}", .found.kind, .found.span)]
    UnexpectedToken { found: Token, expected: String },
    // `span` covers whatever was read of the unfinished expression
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error("{0}")]
    LexerError(#[from] LexerError),
}

// Result type alias for convenience
type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    last_span: Span,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens: tokens.into_iter().peekable(),
            last_span: Span::default(),
        }
    }

    // Consumes the next token if available.
    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.next();
        if let Some(token) = &token {
            self.last_span = token.span;
        }
        token
    }

    fn at_end(&mut self) -> bool {
        self.tokens.peek().is_none()
    }

    /// Parses a single expression starting with `token`.
    fn parse_expr_with_token(&mut self, token: Option<Token>) -> ParseResult<Value> {
        match token {
            Some(Token {
                kind: TokenKind::LParen,
                span,
            }) => self.parse_list(span),
            Some(
                found @ Token {
                    kind: TokenKind::RParen,
                    ..
                },
            ) => Err(ParseError::UnexpectedToken {
                found,
                expected: "an expression".to_string(),
            }),
            Some(atom) => Self::parse_atom(atom),
            None => Err(ParseError::UnexpectedEof {
                expected: "an expression".to_string(),
                span: self.last_span,
            }),
        }
    }

    pub fn parse_expr(&mut self) -> ParseResult<Value> {
        let token = self.next_token();
        self.parse_expr_with_token(token)
    }

    /// Converts an atomic token (symbol, number, boolean, string) into its value.
    fn parse_atom(token: Token) -> ParseResult<Value> {
        Ok(match token.kind {
            TokenKind::Symbol(s) => Value::Symbol(s),
            TokenKind::Number(n) => Value::Number(n),
            TokenKind::Boolean(b) => Value::Boolean(b),
            TokenKind::String(s) => Value::String(s),
            other_token => Err(ParseError::UnexpectedToken {
                found: Token {
                    kind: other_token,
                    span: token.span,
                },
                expected: "an atom (symbol, number, boolean, string)".to_string(),
            })?,
        })
    }

    /// Parses the rest of a list `(...)` whose opening paren is at `open`.
    fn parse_list(&mut self, open: Span) -> ParseResult<Value> {
        let mut items = Vec::new();
        loop {
            match self.next_token() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => return Ok(Value::Sequence(items)),
                Some(token) => items.push(self.parse_expr_with_token(Some(token))?),
                None => {
                    // Reached EOF before finding ')'
                    return Err(ParseError::UnexpectedEof {
                        expected: "')'".to_string(),
                        span: open.merge(self.last_span),
                    });
                }
            }
        }
    }

    /// Parses exactly one top-level expression; anything after it is an error.
    pub fn parse(mut self) -> ParseResult<Value> {
        let expr = self.parse_expr()?;

        if let Some(found) = self.next_token() {
            Err(ParseError::UnexpectedToken {
                found,
                expected: "end of input".to_string(),
            })
        } else {
            Ok(expr)
        }
    }

    /// Parses every top-level expression in order. Empty input yields no expressions.
    pub fn parse_all(mut self) -> ParseResult<Vec<Value>> {
        let mut expressions = Vec::new();
        while !self.at_end() {
            expressions.push(self.parse_expr()?);
        }
        Ok(expressions)
    }
}

// Helper function to lex and parse a string directly (useful for tests and REPL)
pub fn parse_str(input: &str) -> ParseResult<Value> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse()
}

/// Lexes and parses a whole program (a file, or a REPL line holding several forms).
pub fn parse_program(input: &str) -> ParseResult<Vec<Value>> {
    let tokens = crate::lexer::tokenize(input)?;
    Parser::new(tokens).parse_all()
}

/// Reads one expression from text. Malformed input comes back as an Error value.
pub fn read(input: &str) -> Value {
    match parse_str(input) {
        Ok(value) => value,
        Err(err) => EvalError::Syntax(err.to_string()).into(),
    }
}
