use crate::ParseError;
use ariadne::{Label, Report, ReportKind, Source};
use std::io;
use std::ops::Range;

impl ParseError {
    /// Builds a diagnostic for this error against the text it was read from.
    pub fn report<'a>(&self, source_name: &'a str, input: &str) -> Report<'a, (&'a str, Range<usize>)> {
        match self {
            ParseError::UnexpectedToken { found, expected } => {
                Report::build(ReportKind::Error, (source_name, found.span.to_range()))
                    .with_message(format!("Unexpected token: {}", found.kind))
                    .with_label(
                        Label::new((source_name, found.span.to_range()))
                            .with_message(format!("Expected {expected}")),
                    )
                    .finish()
            }
            ParseError::UnexpectedEof { expected, span } => {
                let idx = input.len();
                Report::build(ReportKind::Error, (source_name, idx..idx))
                    .with_message("Unexpected EOF")
                    .with_label(
                        Label::new((source_name, span.to_range()))
                            .with_message(format!("Expected {expected} to finish this")),
                    )
                    .finish()
            }
            ParseError::LexerError(lex_err) => {
                Report::build(ReportKind::Error, (source_name, lex_err.span.to_range()))
                    .with_message("Lexer Error")
                    .with_label(
                        Label::new((source_name, lex_err.span.to_range()))
                            .with_message(lex_err.error.to_string()),
                    )
                    .finish()
            }
        }
    }

    /// Writes the diagnostic to stderr.
    pub fn pretty_print(&self, source_name: &str, input: &str) -> io::Result<()> {
        self.report(source_name, input)
            .eprint((source_name, Source::from(input)))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_str;

    fn rendered(input: &str) -> String {
        let err = match parse_str(input) {
            Ok(value) => panic!("Expected a parse error for '{}', got {:?}", input, value),
            Err(err) => err,
        };
        let mut buffer = Vec::new();
        err.report("test", input)
            .write(("test", ariadne::Source::from(input)), &mut buffer)
            .expect("writing to a Vec cannot fail");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    #[test]
    fn test_report_unexpected_token() {
        let text = rendered("(+ 1 2))");
        assert!(text.contains("Unexpected token: )"), "{}", text);
        assert!(text.contains("Expected end of input"), "{}", text);
    }

    #[test]
    fn test_report_unexpected_eof() {
        let text = rendered("(+ 1");
        assert!(text.contains("Unexpected EOF"), "{}", text);
        assert!(text.contains("Expected ')' to finish this"), "{}", text);
    }

    #[test]
    fn test_report_lexer_error() {
        let text = rendered("\"never closed");
        assert!(text.contains("Lexer Error"), "{}", text);
        assert!(text.contains("Unterminated string literal"), "{}", text);
    }
}
