use std::io::Write;

use tracing::trace;

use crate::bytecode::codec;
use crate::bytecode::ir::CompiledUnit;
use crate::bytecode::op::{BinaryOp, Instruction, UnaryOp};
use crate::bytecode::stack_check::{StackCheckError, check_code};
use crate::lang::value::Value;
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::slots::GlobalSlots;

pub const STACK_SIZE: usize = 2048;
pub const VALUES_SIZE: usize = 65536;

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub stack_capacity: usize,
    pub slot_capacity: usize,
    pub max_steps: Option<usize>,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_capacity: STACK_SIZE,
            slot_capacity: VALUES_SIZE,
            max_steps: None,
        }
    }
}

/// Stack machine over the packed instruction stream.
///
/// The operand stack starts empty on every run. Global slots belong to the
/// caller so that values outlive a single run.
pub struct Vm {
    stack: Vec<Value>,
    // Safety limits
    config: VmConfig,
    steps: usize,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            config,
            steps: 0,
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Operand stack as the last run left it.
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn reset_execution_state(&mut self) {
        self.stack.clear();
        self.steps = 0;
    }

    /// Static stack check of `unit` against this VM's stack capacity.
    pub fn check(&self, unit: &CompiledUnit) -> Result<(), RuntimeError> {
        check_code(&unit.code, self.config.stack_capacity)
            .map(|_| ())
            .map_err(|e| match e {
                StackCheckError::Decode(decode) => RuntimeError::from(decode),
                other => RuntimeError::StackCheck(other),
            })
    }

    /// Executes `unit` against `slots`, writing `print` output to `out`.
    ///
    /// Returns the value left on top of the stack, if any. The stream is
    /// stack-checked first; a unit that would underflow or overflow does not
    /// run at all.
    pub fn run(
        &mut self,
        unit: &CompiledUnit,
        slots: &mut GlobalSlots,
        out: &mut impl Write,
    ) -> Result<Option<Value>, RuntimeError> {
        self.reset_execution_state();
        self.check(unit)?;

        let code = unit.code.as_slice();
        let mut ip: usize = 0;

        while ip < code.len() {
            self.check_limits()?;

            let (instruction, next) = codec::decode(code, ip)?;
            trace!(offset = ip, ?instruction, depth = self.stack.len(), "exec");

            match instruction {
                Instruction::PushNumber(n) => self.push(ip, Value::Number(n))?,

                Instruction::PushConst(index) => {
                    let value = unit
                        .constants
                        .get(index)
                        .cloned()
                        .ok_or(RuntimeError::ConstantOutOfRange { offset: ip, index })?;
                    self.push(ip, value)?;
                }

                Instruction::Bool(b) => self.push(ip, Value::Bool(b))?,

                Instruction::Binary(op) => {
                    let right = self.pop(ip)?;
                    let left = self.pop(ip)?;
                    let result = binary(op, left, right, ip)?;
                    self.push(ip, result)?;
                }

                Instruction::Unary(op) => {
                    let operand = self.pop(ip)?;
                    let result = unary(op, operand, ip)?;
                    self.push(ip, result)?;
                }

                Instruction::Store(slot) => {
                    let value = self.pop(ip)?;
                    slots
                        .set(slot, value)
                        .map_err(|_| RuntimeError::SlotOutOfRange {
                            offset: ip,
                            slot,
                            capacity: slots.capacity(),
                        })?;
                }

                Instruction::Load(slot) => {
                    let value = slots.get(slot).ok_or(RuntimeError::SlotOutOfRange {
                        offset: ip,
                        slot,
                        capacity: slots.capacity(),
                    })?;
                    self.push(ip, value)?;
                }

                Instruction::Print => {
                    let value = self.pop(ip)?;
                    writeln!(out, "{}", value).map_err(|e| RuntimeError::Output(e.to_string()))?;
                }
            }

            ip = next;
        }

        Ok(self.stack.last().cloned())
    }

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::StepLimit(max));
            }
        }

        Ok(())
    }

    fn push(&mut self, offset: usize, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.config.stack_capacity {
            return Err(RuntimeError::StackOverflow {
                offset,
                capacity: self.config.stack_capacity,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow { offset })
    }
}

fn binary(op: BinaryOp, left: Value, right: Value, offset: usize) -> Result<Value, RuntimeError> {
    use Value::{Bool, Number, Str};

    let value = match (op, left, right) {
        (BinaryOp::AddStr, Str(l), Str(r)) => Str(l + &r),
        (BinaryOp::SubStr, Str(l), Str(r)) => {
            let mut s = l.trim_end_matches(' ').to_string();
            s.push_str(&r);
            Str(s)
        }

        (BinaryOp::Add, Number(l), Number(r)) => Number(l + r),
        (BinaryOp::Sub, Number(l), Number(r)) => Number(l - r),
        (BinaryOp::Mul, Number(l), Number(r)) => Number(l * r),
        (BinaryOp::Div, Number(l), Number(r)) => {
            if r == 0.0 {
                return Err(RuntimeError::DivisionByZero { offset });
            }
            Number(l / r)
        }

        (BinaryOp::Eq, Number(l), Number(r)) => Bool(l == r),
        (BinaryOp::Ne, Number(l), Number(r)) => Bool(l != r),
        (BinaryOp::Lt, Number(l), Number(r)) => Bool(l < r),
        (BinaryOp::Le, Number(l), Number(r)) => Bool(l <= r),
        (BinaryOp::Gt, Number(l), Number(r)) => Bool(l > r),
        (BinaryOp::Ge, Number(l), Number(r)) => Bool(l >= r),

        // both sides are already evaluated; there is no short-circuit
        (BinaryOp::And, Bool(l), Bool(r)) => Bool(l && r),
        (BinaryOp::Or, Bool(l), Bool(r)) => Bool(l || r),

        (op, l, r) => {
            let expected = match op {
                BinaryOp::AddStr | BinaryOp::SubStr => "string",
                BinaryOp::And | BinaryOp::Or => "boolean",
                _ => "number",
            };
            let found = if l.type_name() != expected { l } else { r };
            return Err(RuntimeError::TypeMismatch {
                offset,
                op: op.opcode().mnemonic(),
                expected,
                found: found.type_name(),
            });
        }
    };

    Ok(value)
}

fn unary(op: UnaryOp, operand: Value, offset: usize) -> Result<Value, RuntimeError> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(RuntimeError::TypeMismatch {
            offset,
            op: op.opcode().mnemonic(),
            expected: match op {
                UnaryOp::Neg => "number",
                UnaryOp::Not => "boolean",
            },
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::codec::assemble;
    use crate::bytecode::compile::Compiler;
    use crate::bytecode::ir::{ConstantPool, NameTable};
    use crate::bytecode::op::Opcode;
    use crate::frontend::{lexer::Lexer, parser::Parser};
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> CompiledUnit {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        Compiler::new().compile(&program).into_result().unwrap()
    }

    fn run_unit(unit: &CompiledUnit) -> (Result<Option<Value>, RuntimeError>, String) {
        let mut vm = Vm::new();
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let mut out = Vec::new();
        let result = vm.run(unit, &mut slots, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    fn run(source: &str) -> (Result<Option<Value>, RuntimeError>, String) {
        run_unit(&compile(source))
    }

    fn unit_from(instructions: &[Instruction], constants: ConstantPool) -> CompiledUnit {
        CompiledUnit {
            code: assemble(instructions),
            constants,
            names: NameTable::new(),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(run("1 + 2 * 3").0, Ok(Some(Value::Number(7.0))));
        assert_eq!(run("(1 + 2) * 3").0, Ok(Some(Value::Number(9.0))));
        assert_eq!(run("10 - 4 - 3").0, Ok(Some(Value::Number(3.0))));
        assert_eq!(run("-2.5 * 2").0, Ok(Some(Value::Number(-5.0))));
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(
            run(r#""foo" + "bar""#).0,
            Ok(Some(Value::Str("foobar".to_string())))
        );
        assert_eq!(
            run(r#""ab  " - "c""#).0,
            Ok(Some(Value::Str("abc".to_string())))
        );
        // only trailing spaces are trimmed
        assert_eq!(
            run(r#""a\t " - "b""#).0,
            Ok(Some(Value::Str("a\tb".to_string())))
        );
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(run("1 < 2").0, Ok(Some(Value::Bool(true))));
        assert_eq!(run("2 <= 1").0, Ok(Some(Value::Bool(false))));
        assert_eq!(run("3 == 3 and 4 != 4").0, Ok(Some(Value::Bool(false))));
        assert_eq!(run("false or !false").0, Ok(Some(Value::Bool(true))));
    }

    #[test]
    fn test_division_by_zero() {
        let mut vm = Vm::new();
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let mut out = Vec::new();
        let result = vm.run(&compile("1 / 0"), &mut slots, &mut out);
        assert_eq!(result, Err(RuntimeError::DivisionByZero { offset: 10 }));
        // operands were popped, nothing was pushed
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_print_writes_output() {
        let (result, output) = run(r#"print 1 + 2 * 3 print "hi" print 1 > 2"#);
        assert_eq!(result, Ok(None));
        assert_eq!(output, "7\nhi\nfalse\n");
    }

    #[test]
    fn test_store_and_load() {
        let (result, output) = run("var x = 1 var x = 2 print x");
        assert_eq!(result, Ok(None));
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_slots_persist_across_runs() {
        let mut vm = Vm::new();
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let mut out = Vec::new();

        vm.run(&compile("var x = 5"), &mut slots, &mut out).unwrap();
        let load = unit_from(&[Instruction::Load(0), Instruction::Print], ConstantPool::new());
        vm.run(&load, &mut slots, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "5\n");
    }

    #[test]
    fn test_unset_slot_loads_empty() {
        let unit = unit_from(&[Instruction::Load(3)], ConstantPool::new());
        assert_eq!(run_unit(&unit).0, Ok(Some(Value::Empty)));
    }

    #[test]
    fn test_unknown_opcode() {
        let unit = CompiledUnit {
            code: vec![0xEE],
            ..CompiledUnit::default()
        };
        assert_eq!(
            run_unit(&unit).0,
            Err(RuntimeError::UnknownOpcode {
                opcode: 0xEE,
                offset: 0
            })
        );
    }

    #[test]
    fn test_underflowing_unit_is_rejected_before_running() {
        let unit = unit_from(
            &[Instruction::PushNumber(1.0), Instruction::Print, Instruction::Print],
            ConstantPool::new(),
        );
        let (result, output) = run_unit(&unit);
        assert!(matches!(
            result,
            Err(RuntimeError::StackCheck(StackCheckError::Underflow { offset: 6, .. }))
        ));
        assert_eq!(output, "");
    }

    #[test]
    fn test_constant_out_of_range() {
        let unit = unit_from(&[Instruction::PushConst(4)], ConstantPool::new());
        assert_eq!(
            run_unit(&unit).0,
            Err(RuntimeError::ConstantOutOfRange {
                offset: 0,
                index: 4
            })
        );
    }

    #[test]
    fn test_slot_beyond_capacity() {
        let unit = unit_from(
            &[Instruction::Bool(true), Instruction::Store(8)],
            ConstantPool::new(),
        );
        let mut vm = Vm::new();
        let mut slots = GlobalSlots::new(8);
        let result = vm.run(&unit, &mut slots, &mut std::io::sink());
        assert_eq!(
            result,
            Err(RuntimeError::SlotOutOfRange {
                offset: 2,
                slot: 8,
                capacity: 8
            })
        );
    }

    #[test]
    fn test_type_mismatch_in_handler() {
        let mut constants = ConstantPool::new();
        constants.push(Value::Str("s".to_string()));
        let unit = unit_from(
            &[
                Instruction::PushNumber(1.0),
                Instruction::PushConst(0),
                Instruction::Binary(BinaryOp::Add),
            ],
            constants,
        );
        assert_eq!(
            run_unit(&unit).0,
            Err(RuntimeError::TypeMismatch {
                offset: 10,
                op: "ADD",
                expected: "number",
                found: "string"
            })
        );

        let unit = unit_from(
            &[Instruction::PushNumber(1.0), Instruction::Unary(UnaryOp::Not)],
            ConstantPool::new(),
        );
        assert!(matches!(
            run_unit(&unit).0,
            Err(RuntimeError::TypeMismatch { op: "NOT", .. })
        ));
    }

    #[test]
    fn test_stack_capacity() {
        let config = VmConfig {
            stack_capacity: 2,
            ..VmConfig::default()
        };
        let mut vm = Vm::with_config(config);
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let result = vm.run(&compile("1 2 3"), &mut slots, &mut std::io::sink());
        assert!(matches!(
            result,
            Err(RuntimeError::StackCheck(StackCheckError::Overflow { capacity: 2, .. }))
        ));
    }

    #[test]
    fn test_step_limit() {
        let config = VmConfig {
            max_steps: Some(2),
            ..VmConfig::default()
        };
        let mut vm = Vm::with_config(config);
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let result = vm.run(&compile("print 1 + 2"), &mut slots, &mut std::io::sink());
        assert_eq!(result, Err(RuntimeError::StepLimit(2)));
    }

    #[test]
    fn test_globals_kept_after_runtime_error() {
        let mut vm = Vm::new();
        let mut slots = GlobalSlots::new(VALUES_SIZE);
        let result = vm.run(&compile("var x = 1 var y = x / 0"), &mut slots, &mut std::io::sink());
        assert!(result.is_err());
        assert_eq!(slots.get(0), Some(Value::Number(1.0)));
        assert_eq!(slots.get(1), Some(Value::Empty));
    }

    #[test]
    fn test_marker_bytes_are_not_operands() {
        // BOOL TRUE must advance by two, or the 21 would be read as an opcode
        let code = vec![Opcode::Bool.byte(), Opcode::True.byte(), Opcode::Print.byte()];
        let unit = CompiledUnit {
            code,
            ..CompiledUnit::default()
        };
        let (result, output) = run_unit(&unit);
        assert_eq!(result, Ok(None));
        assert_eq!(output, "true\n");
    }
}
