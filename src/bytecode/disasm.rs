use std::fmt::Write as _;

use crate::bytecode::codec::{self, DecodeError};
use crate::bytecode::ir::CompiledUnit;
use crate::bytecode::op::Instruction;

/// One decoded line of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub offset: usize,
    pub instruction: Instruction,
}

/// Decoded view of a compiled unit's instruction stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub lines: Vec<Line>,
}

impl Listing {
    pub fn new(code: &[u8]) -> Result<Self, DecodeError> {
        let lines = codec::decode_all(code)?
            .into_iter()
            .map(|(offset, instruction)| Line {
                offset,
                instruction,
            })
            .collect();
        Ok(Listing { lines })
    }

    /// Re-encodes the listing. Always equal to the stream it was built from.
    pub fn assemble(&self) -> Vec<u8> {
        let instructions: Vec<Instruction> = self.lines.iter().map(|l| l.instruction).collect();
        codec::assemble(&instructions)
    }

    /// Renders the listing, resolving constants and slot names against `unit`.
    pub fn render(&self, unit: &CompiledUnit) -> String {
        let mut out = String::new();
        for line in &self.lines {
            // writing into a String cannot fail
            let _ = writeln!(
                out,
                "{:04}  {:<6} {}",
                line.offset,
                line.instruction.opcode(),
                operands(&line.instruction, unit)
            );
        }
        out
    }
}

fn operands(instruction: &Instruction, unit: &CompiledUnit) -> String {
    match instruction {
        Instruction::PushNumber(n) => format!("{}", n),
        Instruction::PushConst(index) => match unit.constants.get(*index) {
            Some(value) => format!("{:<6} ; {:?}", index, value.to_string()),
            None => format!("{:<6} ; <out of range>", index),
        },
        Instruction::Bool(b) => {
            if *b {
                "TRUE".to_string()
            } else {
                "FALSE".to_string()
            }
        }
        Instruction::Binary(op) => op.opcode().to_string(),
        Instruction::Unary(op) => op.opcode().to_string(),
        Instruction::Store(slot) | Instruction::Load(slot) => match unit.names.name(*slot) {
            Some(name) => format!("{:<6} ; {}", slot, name),
            None => slot.to_string(),
        },
        Instruction::Print => String::new(),
    }
}

/// Disassembles the whole unit into text.
pub fn disassemble(unit: &CompiledUnit) -> Result<String, DecodeError> {
    Ok(Listing::new(&unit.code)?.render(unit))
}
