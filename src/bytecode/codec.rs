//! Byte layout of the instruction stream.
//!
//! ```text
//! [opcode] [operand: u32 BE]*        PUSHF PUSHS STORE LOAD PRINT
//! [marker] [sub-opcode]              CMP UNARY BOOL
//! ```
//!
//! There is no length prefix: the opcode alone decides how many bytes follow,
//! so [`decode`] must mirror [`encode`] exactly for the instruction pointer to
//! stay in step.

use thiserror::Error;

use crate::bytecode::op::{BinaryOp, Instruction, Opcode, UnaryOp};

pub const OPERAND_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("invalid {marker} sub-opcode {opcode:#04x} at offset {offset}")]
    InvalidSubOpcode {
        marker: Opcode,
        opcode: u8,
        offset: usize,
    },

    #[error("unexpected end of bytecode at offset {offset}")]
    UnexpectedEnd { offset: usize },
}

/// Appends the encoding of `instruction` to `out`.
pub fn encode(instruction: &Instruction, out: &mut Vec<u8>) {
    out.push(instruction.opcode().byte());
    match instruction {
        Instruction::PushNumber(n) => write_operand(out, n.to_bits()),
        Instruction::PushConst(index) | Instruction::Store(index) | Instruction::Load(index) => {
            write_operand(out, *index)
        }
        Instruction::Bool(b) => {
            let sub = if *b { Opcode::True } else { Opcode::False };
            out.push(sub.byte());
        }
        Instruction::Binary(op) => out.push(op.opcode().byte()),
        Instruction::Unary(op) => out.push(op.opcode().byte()),
        Instruction::Print => {}
    }
}

/// Encodes a whole instruction sequence.
pub fn assemble(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for instruction in instructions {
        encode(instruction, &mut out);
    }
    out
}

fn write_operand(out: &mut Vec<u8>, operand: u32) {
    out.extend_from_slice(&operand.to_be_bytes());
}

/// Reads the big-endian operand starting at `offset`.
pub fn read_operand(code: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let bytes = code
        .get(offset..offset + OPERAND_WIDTH)
        .ok_or(DecodeError::UnexpectedEnd { offset })?;
    let mut buf = [0u8; OPERAND_WIDTH];
    buf.copy_from_slice(bytes);
    Ok(u32::from_be_bytes(buf))
}

fn read_opcode(code: &[u8], offset: usize) -> Result<Opcode, DecodeError> {
    let byte = *code
        .get(offset)
        .ok_or(DecodeError::UnexpectedEnd { offset })?;
    Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode {
        opcode: byte,
        offset,
    })
}

/// Decodes the instruction at `offset`.
///
/// Returns the instruction and the offset of the one after it.
pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize), DecodeError> {
    let opcode = read_opcode(code, offset)?;
    let operand_at = offset + 1;

    if opcode.is_marker() {
        let sub = read_opcode(code, operand_at)?;
        let invalid = DecodeError::InvalidSubOpcode {
            marker: opcode,
            opcode: sub.byte(),
            offset: operand_at,
        };
        let instruction = match opcode {
            Opcode::Cmp => Instruction::Binary(BinaryOp::from_opcode(sub).ok_or(invalid)?),
            Opcode::Unary => Instruction::Unary(UnaryOp::from_opcode(sub).ok_or(invalid)?),
            _ => match sub {
                Opcode::True => Instruction::Bool(true),
                Opcode::False => Instruction::Bool(false),
                _ => return Err(invalid),
            },
        };
        return Ok((instruction, operand_at + 1));
    }

    let instruction = match opcode {
        Opcode::PushF => Instruction::PushNumber(f32::from_bits(read_operand(code, operand_at)?)),
        Opcode::PushS => Instruction::PushConst(read_operand(code, operand_at)?),
        Opcode::Store => Instruction::Store(read_operand(code, operand_at)?),
        Opcode::Load => Instruction::Load(read_operand(code, operand_at)?),
        Opcode::Print => Instruction::Print,
        // a concrete operation byte with no marker in front of it
        other => {
            return Err(DecodeError::UnknownOpcode {
                opcode: other.byte(),
                offset,
            });
        }
    };
    let next = operand_at + OPERAND_WIDTH * opcode.operand_count();
    Ok((instruction, next))
}

/// Decodes a whole stream into `(offset, instruction)` pairs.
pub fn decode_all(code: &[u8]) -> Result<Vec<(usize, Instruction)>, DecodeError> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let (instruction, next) = decode(code, offset)?;
        out.push((offset, instruction));
        offset = next;
    }
    Ok(out)
}
