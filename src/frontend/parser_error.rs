use thiserror::Error;

use crate::frontend::lexer::Span;

/// A recorded syntax error with source location.
///
/// `line` and `col` are 1-based positions of the token the parser was looking
/// at when the error was recorded. Parsing continues after recording one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl ParserError {
    pub fn at(span: Span, message: impl Into<String>) -> Self {
        ParserError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }
}
