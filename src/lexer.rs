use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::source::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(skip r";[^\n\r]*")] // Skip comments
#[logos(error = LexerErrorKind)]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Boolean(bool),
    // Outranks Symbol so plain digits lex as numbers
    #[regex(r"-?[0-9]+", |lex| {
        let slice = lex.slice();
        slice
            .parse::<i64>()
            .map_err(|_| LexerErrorKind::InvalidNumberFormat(slice.to_string()))
    }, priority = 3)]
    Number(i64),
    #[regex(r#""([^"\\]|\\.)*.?"#, |lex| {
        let slice = lex.slice();
        let len = slice.len();
        // make sure string was terminated
        if len == 1 || !slice.ends_with('"') {
            return Err(LexerErrorKind::UnterminatedString);
        }
        unescape::unescape(&slice[1..len-1])
    })]
    String(String),
    #[regex(r"[a-zA-Z0-9_+\-*/\\=<>!&?%^~.:]+", |lex| lex.slice().to_string())]
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

mod unescape {
    use super::{LexerErrorKind, LexerResult};

    pub fn unescape(s: &str) -> LexerResult<String> {
        // un-escaping should only ever reduce the length of the string.
        let mut result = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some(c) => return Err(LexerErrorKind::UnknownEscapeSequence(c)),
                    None => return Err(LexerErrorKind::UnterminatedString),
                }
            } else {
                result.push(c);
            }
        }
        Ok(result)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Boolean(b) => write!(f, "{}", b),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s), // Display with quotes for clarity
            TokenKind::Symbol(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Error)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Invalid number format: '{0}'")]
    InvalidNumberFormat(String),
    #[error("Unknown escape sequence: '\\{0}'")]
    UnknownEscapeSequence(char),
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

type LexerResult<T> = Result<T, LexerErrorKind>;

type LexerRangedResult<T> = Result<T, LexerError>;

// Helper function to tokenize a string directly (useful for tests and parser)
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    TokenKind::lexer(input)
        .spanned()
        .map(|(result, range)| match result {
            Ok(kind) => Ok(Token {
                kind,
                span: range.into(),
            }),
            Err(error) => Err(LexerError {
                error,
                span: range.into(),
            }),
        })
        .collect()
}
