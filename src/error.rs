use thiserror::Error;

use crate::bytecode::compile_error::CompileError;
use crate::frontend::lexer::LexError;
use crate::frontend::parser_error::ParserError;
use crate::runtime::runtime_error::RuntimeError;

/// One entry of the ordered error list a compile cycle produces.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParserError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("lexer error: {0}")]
    Lex(#[from] LexError),

    /// Syntax errors followed by compile errors. The input did not run.
    #[error("{} error(s) found", .0.len())]
    Diagnostics(Vec<Diagnostic>),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("session image error: {0}")]
    Image(#[from] postcard::Error),

    #[error("session image holds {slots} slots, more than the configured {capacity}")]
    ImageCapacity { slots: usize, capacity: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
