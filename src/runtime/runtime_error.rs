use thiserror::Error;

use crate::bytecode::codec::DecodeError;
use crate::bytecode::stack_check::StackCheckError;

/// An error that aborts a run. Globals stored before it are kept.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("runtime error: unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("runtime error: {0}")]
    Decode(DecodeError),

    #[error("runtime error: division by zero at offset {offset}")]
    DivisionByZero { offset: usize },

    #[error("runtime error: stack overflow ({capacity} entries) at offset {offset}")]
    StackOverflow { offset: usize, capacity: usize },

    #[error("runtime error: stack underflow at offset {offset}")]
    StackUnderflow { offset: usize },

    #[error("runtime error: type error at offset {offset}: {op} expected {expected}, got {found}")]
    TypeMismatch {
        offset: usize,
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("runtime error: constant {index} out of range at offset {offset}")]
    ConstantOutOfRange { offset: usize, index: u32 },

    #[error("runtime error: slot {slot} beyond capacity {capacity} at offset {offset}")]
    SlotOutOfRange {
        offset: usize,
        slot: u32,
        capacity: usize,
    },

    #[error("runtime error: cannot write output: {0}")]
    Output(String),

    #[error("runtime error: execution step limit exceeded ({0})")]
    StepLimit(usize),

    #[error("runtime error: {0}")]
    StackCheck(#[from] StackCheckError),
}

impl From<DecodeError> for RuntimeError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::UnknownOpcode { opcode, offset } => {
                RuntimeError::UnknownOpcode { opcode, offset }
            }
            other => RuntimeError::Decode(other),
        }
    }
}
