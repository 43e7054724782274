use thiserror::Error;

use crate::bytecode::ir::Category;
use crate::frontend::lexer::Spanned;

/// An error recorded while compiling. Compilation carries on after one, but
/// the produced bytecode must not be run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// An identifier that is not in the name table
    #[error("{line}:{col}: variable not defined: {name}")]
    UndefinedVariable {
        name: String,
        line: usize,
        col: usize,
    },

    /// Operands of different (or unknown) categories
    #[error("{line}:{col}: invalid operands for '{op}': {left} and {right}")]
    InvalidOperands {
        op: String,
        left: Category,
        right: Category,
        line: usize,
        col: usize,
    },

    /// Matching categories, but the operator is not defined for them
    #[error("{line}:{col}: unsupported operator '{op}' for {category} operands")]
    UnsupportedOperator {
        op: String,
        category: Category,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: the '{op}' operator only works with {expected} operands, got {found}")]
    InvalidUnaryOperand {
        op: String,
        expected: Category,
        found: Category,
        line: usize,
        col: usize,
    },

    /// A token the parser never places at this position
    #[error("{line}:{col}: unexpected token '{token}'")]
    UnexpectedToken {
        token: String,
        line: usize,
        col: usize,
    },

    #[error("{line}:{col}: {table} is full")]
    TableFull {
        table: &'static str,
        line: usize,
        col: usize,
    },
}

impl CompileError {
    pub fn undefined_variable(name: &str, at: &Spanned) -> Self {
        CompileError::UndefinedVariable {
            name: name.to_string(),
            line: at.span.line,
            col: at.span.col,
        }
    }

    pub fn invalid_operands(op: &Spanned, left: Category, right: Category) -> Self {
        CompileError::InvalidOperands {
            op: op.token.to_string(),
            left,
            right,
            line: op.span.line,
            col: op.span.col,
        }
    }

    pub fn unsupported_operator(op: &Spanned, category: Category) -> Self {
        CompileError::UnsupportedOperator {
            op: op.token.to_string(),
            category,
            line: op.span.line,
            col: op.span.col,
        }
    }

    pub fn invalid_unary_operand(op: &Spanned, expected: Category, found: Category) -> Self {
        CompileError::InvalidUnaryOperand {
            op: op.token.to_string(),
            expected,
            found,
            line: op.span.line,
            col: op.span.col,
        }
    }

    pub fn unexpected_token(at: &Spanned) -> Self {
        CompileError::UnexpectedToken {
            token: at.token.to_string(),
            line: at.span.line,
            col: at.span.col,
        }
    }

    pub fn table_full(table: &'static str, at: &Spanned) -> Self {
        CompileError::TableFull {
            table,
            line: at.span.line,
            col: at.span.col,
        }
    }
}
