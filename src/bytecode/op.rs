use serde::{Deserialize, Serialize};

// =============================================================================
// OPCODE - the byte that starts (or, after a marker, completes) an instruction
// =============================================================================

/// Single-byte instruction tag.
///
/// The numeric values are part of the binary format. `Unary`, `Cmp` and
/// `Bool` are markers: the byte after them is another opcode naming the
/// concrete operation, not a 4-byte operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    PushF = 0,
    PushS = 1,
    AddS = 2,
    SubS = 3,
    Add = 4,
    Sub = 5,
    Mul = 6,
    Div = 7,
    UNeg = 8,
    Not = 9,

    Unary = 10,
    Cmp = 11,

    Eq = 12,
    Neq = 13,
    Lt = 14,
    Leq = 15,
    Gt = 16,
    Geq = 17,
    And = 18,
    Or = 19,

    Bool = 20,
    True = 21,
    False = 22,

    Store = 23,
    Load = 24,
    Print = 25,
}

impl Opcode {
    pub const ALL: [Opcode; 26] = [
        Opcode::PushF,
        Opcode::PushS,
        Opcode::AddS,
        Opcode::SubS,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::UNeg,
        Opcode::Not,
        Opcode::Unary,
        Opcode::Cmp,
        Opcode::Eq,
        Opcode::Neq,
        Opcode::Lt,
        Opcode::Leq,
        Opcode::Gt,
        Opcode::Geq,
        Opcode::And,
        Opcode::Or,
        Opcode::Bool,
        Opcode::True,
        Opcode::False,
        Opcode::Store,
        Opcode::Load,
        Opcode::Print,
    ];

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.get(usize::from(byte)).copied()
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Number of 4-byte operands that follow the opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Opcode::PushF | Opcode::PushS | Opcode::Store | Opcode::Load => 1,
            _ => 0,
        }
    }

    /// Markers are followed by exactly one sub-opcode byte.
    pub fn is_marker(self) -> bool {
        matches!(self, Opcode::Unary | Opcode::Cmp | Opcode::Bool)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::PushF => "PUSHF",
            Opcode::PushS => "PUSHS",
            Opcode::AddS => "ADDS",
            Opcode::SubS => "SUBS",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::UNeg => "UNEG",
            Opcode::Not => "NOT",
            Opcode::Unary => "UNARY",
            Opcode::Cmp => "CMP",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Lt => "LT",
            Opcode::Leq => "LEQ",
            Opcode::Gt => "GT",
            Opcode::Geq => "GEQ",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Bool => "BOOL",
            Opcode::True => "TRUE",
            Opcode::False => "FALSE",
            Opcode::Store => "STORE",
            Opcode::Load => "LOAD",
            Opcode::Print => "PRINT",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.mnemonic())
    }
}

// =============================================================================
// INSTRUCTION - decoded form matched by the VM
// =============================================================================

/// Concrete operation selected after a `CMP` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // strings
    AddStr,
    SubStr,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // logic
    And,
    Or,
}

impl BinaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            BinaryOp::AddStr => Opcode::AddS,
            BinaryOp::SubStr => Opcode::SubS,
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::Ne => Opcode::Neq,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Le => Opcode::Leq,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Ge => Opcode::Geq,
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
        }
    }

    pub fn from_opcode(opcode: Opcode) -> Option<BinaryOp> {
        let op = match opcode {
            Opcode::AddS => BinaryOp::AddStr,
            Opcode::SubS => BinaryOp::SubStr,
            Opcode::Add => BinaryOp::Add,
            Opcode::Sub => BinaryOp::Sub,
            Opcode::Mul => BinaryOp::Mul,
            Opcode::Div => BinaryOp::Div,
            Opcode::Eq => BinaryOp::Eq,
            Opcode::Neq => BinaryOp::Ne,
            Opcode::Lt => BinaryOp::Lt,
            Opcode::Leq => BinaryOp::Le,
            Opcode::Gt => BinaryOp::Gt,
            Opcode::Geq => BinaryOp::Ge,
            Opcode::And => BinaryOp::And,
            Opcode::Or => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }
}

/// Concrete operation selected after a `UNARY` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            UnaryOp::Neg => Opcode::UNeg,
            UnaryOp::Not => Opcode::Not,
        }
    }

    pub fn from_opcode(opcode: Opcode) -> Option<UnaryOp> {
        match opcode {
            Opcode::UNeg => Some(UnaryOp::Neg),
            Opcode::Not => Some(UnaryOp::Not),
            _ => None,
        }
    }
}

/// One decoded instruction.
///
/// This is the closed set the VM dispatches on; the byte layout of each
/// variant lives in [`crate::bytecode::codec`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// `PUSHF <f32 bits>` ( -- n )
    PushNumber(f32),
    /// `PUSHS <const>` ( -- value )
    PushConst(u32),
    /// `BOOL TRUE|FALSE` ( -- b )
    Bool(bool),
    /// `CMP <op>` ( left right -- result )
    Binary(BinaryOp),
    /// `UNARY <op>` ( a -- result )
    Unary(UnaryOp),
    /// `STORE <slot>` ( value -- )
    Store(u32),
    /// `LOAD <slot>` ( -- value )
    Load(u32),
    /// `PRINT` ( value -- )
    Print,
}

impl Instruction {
    /// The leading byte of the encoded instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::PushNumber(_) => Opcode::PushF,
            Instruction::PushConst(_) => Opcode::PushS,
            Instruction::Bool(_) => Opcode::Bool,
            Instruction::Binary(_) => Opcode::Cmp,
            Instruction::Unary(_) => Opcode::Unary,
            Instruction::Store(_) => Opcode::Store,
            Instruction::Load(_) => Opcode::Load,
            Instruction::Print => Opcode::Print,
        }
    }

    /// Encoded size in bytes.
    pub fn width(&self) -> usize {
        let opcode = self.opcode();
        if opcode.is_marker() {
            2
        } else {
            1 + 4 * opcode.operand_count()
        }
    }

    /// Stack effect as `(pops, pushes)`.
    pub fn effect(&self) -> (usize, usize) {
        match self {
            Instruction::PushNumber(_)
            | Instruction::PushConst(_)
            | Instruction::Bool(_)
            | Instruction::Load(_) => (0, 1),
            Instruction::Binary(_) => (2, 1),
            Instruction::Unary(_) => (1, 1),
            Instruction::Store(_) | Instruction::Print => (1, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes_are_stable() {
        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.byte() as usize, i, "{} out of place", op);
            assert_eq!(Opcode::from_byte(op.byte()), Some(*op));
        }
        assert_eq!(Opcode::from_byte(26), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_only_markers_take_a_sub_opcode() {
        let markers: Vec<Opcode> = Opcode::ALL
            .iter()
            .copied()
            .filter(|op| op.is_marker())
            .collect();
        assert_eq!(markers, vec![Opcode::Unary, Opcode::Cmp, Opcode::Bool]);
        assert!(markers.iter().all(|op| op.operand_count() == 0));
    }

    #[test]
    fn test_binary_op_opcode_mapping() {
        for op in Opcode::ALL {
            if let Some(binary) = BinaryOp::from_opcode(op) {
                assert_eq!(binary.opcode(), op);
            }
        }
        assert_eq!(BinaryOp::from_opcode(Opcode::UNeg), None);
        assert_eq!(UnaryOp::from_opcode(Opcode::Not), Some(UnaryOp::Not));
    }

    #[test]
    fn test_widths() {
        assert_eq!(Instruction::PushNumber(1.0).width(), 5);
        assert_eq!(Instruction::Load(3).width(), 5);
        assert_eq!(Instruction::Binary(BinaryOp::Add).width(), 2);
        assert_eq!(Instruction::Bool(true).width(), 2);
        assert_eq!(Instruction::Print.width(), 1);
    }
}
