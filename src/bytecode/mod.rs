pub mod codec;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;
pub mod stack_check;

pub use ir::{Category, CompiledUnit, ConstantPool, NameTable};
pub use op::{BinaryOp, Instruction, Opcode, UnaryOp};
