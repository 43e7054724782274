use thiserror::Error;

use crate::bytecode::codec::{self, DecodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackCheckError {
    #[error("stack-check error: {0}")]
    Decode(#[from] DecodeError),

    #[error("stack-check error: stack underflow at offset {offset}, {mnemonic} needs {needed} items")]
    Underflow {
        offset: usize,
        mnemonic: String,
        needed: usize,
    },

    #[error("stack-check error: stack would exceed {capacity} entries at offset {offset}")]
    Overflow { offset: usize, capacity: usize },
}

/// Checks stack effects of a packed stream with a given initial height.
///
/// The instruction set has no jumps, so one linear scan sees every path.
/// Returns the height left on the stack after the last instruction.
pub fn check_code_with_initial(
    code: &[u8],
    initial_height: usize,
    capacity: usize,
) -> Result<usize, StackCheckError> {
    let mut height = initial_height;
    let mut offset = 0;

    while offset < code.len() {
        let (instruction, next) = codec::decode(code, offset)?;
        let (pops, pushes) = instruction.effect();

        height = height
            .checked_sub(pops)
            .ok_or_else(|| StackCheckError::Underflow {
                offset,
                mnemonic: instruction.opcode().mnemonic().to_string(),
                needed: pops,
            })?;
        height += pushes;

        if height > capacity {
            return Err(StackCheckError::Overflow { offset, capacity });
        }
        offset = next;
    }

    Ok(height)
}

/// Checks stack effects starting from an empty stack.
pub fn check_code(code: &[u8], capacity: usize) -> Result<usize, StackCheckError> {
    check_code_with_initial(code, 0, capacity)
}
