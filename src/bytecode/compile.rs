use tracing::debug;

use crate::{
    bytecode::{
        codec,
        compile_error::CompileError,
        ir::{Category, CompiledUnit, ConstantPool, NameTable},
        op::{BinaryOp, Instruction, UnaryOp},
    },
    frontend::{lexer::Spanned, token::Token},
    lang::{
        ast::{Expr, Program, Stmt},
        value::Value,
    },
};

/// Result of compiling one program against a session snapshot.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub unit: CompiledUnit,
    pub errors: Vec<CompileError>,
}

impl Compilation {
    pub fn into_result(self) -> Result<CompiledUnit, Vec<CompileError>> {
        if self.errors.is_empty() {
            Ok(self.unit)
        } else {
            Err(self.errors)
        }
    }
}

/// Single-pass AST to bytecode compiler.
///
/// There is no typed intermediate form. The compiler remembers the last
/// instruction it emitted and reads the category of the value on top of the
/// evaluation stack off that instruction; binary and unary operators pick
/// their concrete opcode from the categories captured after each operand.
pub struct Compiler {
    code: Vec<u8>,
    constants: ConstantPool,
    names: NameTable,
    errors: Vec<CompileError>,

    /// Most recently emitted instruction. `None` after an error, which makes
    /// the current category unknown.
    last: Option<Instruction>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_snapshot(NameTable::new(), ConstantPool::new())
    }

    /// Starts from the tables of an earlier cycle; they are only appended to.
    pub fn with_snapshot(names: NameTable, constants: ConstantPool) -> Self {
        Self {
            code: Vec::new(),
            constants,
            names,
            errors: Vec::new(),
            last: None,
        }
    }

    pub fn compile(mut self, program: &Program) -> Compilation {
        for stmt in &program.statements {
            self.compile_stmt(stmt);
        }

        Compilation {
            unit: CompiledUnit {
                code: self.code,
                constants: self.constants,
                names: self.names,
            },
            errors: self.errors,
        }
    }

    fn compile_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init } => {
                self.compile_expr(init);
                let category = self.category();

                let Token::Ident(ident) = &name.token else {
                    self.fail(CompileError::unexpected_token(name));
                    return;
                };
                match self.names.declare(ident, category) {
                    Some(slot) => self.emit(Instruction::Store(slot)),
                    None => self.fail(CompileError::table_full("name table", name)),
                }
            }
            Stmt::Expr(expr) => self.compile_expr(expr),
            Stmt::Print(expr) => {
                self.compile_expr(expr);
                self.emit(Instruction::Print);
            }
        }
    }

    fn compile_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(spanned) => self.compile_literal(spanned),

            Expr::Unary { op, right } => {
                self.compile_expr(right);
                let operand = self.category();

                let selected = match (&op.token, operand) {
                    (Token::Minus, Category::Float) => Ok(UnaryOp::Neg),
                    (Token::Minus, found) => Err(CompileError::invalid_unary_operand(
                        op,
                        Category::Float,
                        found,
                    )),
                    (Token::Bang, Category::Boolean) => Ok(UnaryOp::Not),
                    (Token::Bang, found) => Err(CompileError::invalid_unary_operand(
                        op,
                        Category::Boolean,
                        found,
                    )),
                    _ => Err(CompileError::unexpected_token(op)),
                };

                match selected {
                    Ok(unary) => self.emit(Instruction::Unary(unary)),
                    Err(e) => self.fail(e),
                }
            }

            Expr::Binary { left, op, right } => {
                self.compile_expr(left);
                let lhs = self.category();
                self.compile_expr(right);
                let rhs = self.category();

                debug!(op = %op.token, left = %lhs, right = %rhs, "selecting binary opcode");

                match select_binary(op, lhs, rhs) {
                    Ok(binary) => self.emit(Instruction::Binary(binary)),
                    Err(e) => self.fail(e),
                }
            }
        }
    }

    fn compile_literal(&mut self, spanned: &Spanned) {
        match &spanned.token {
            Token::Number(n) => self.emit(Instruction::PushNumber(*n)),
            Token::Bool(b) => self.emit(Instruction::Bool(*b)),
            Token::String(s) => match self.constants.push(Value::Str(s.clone())) {
                Some(index) => self.emit(Instruction::PushConst(index)),
                None => self.fail(CompileError::table_full("constant pool", spanned)),
            },
            Token::Ident(name) => match self.names.resolve(name) {
                Some(slot) => self.emit(Instruction::Load(slot)),
                None => self.fail(CompileError::undefined_variable(name, spanned)),
            },
            _ => self.fail(CompileError::unexpected_token(spanned)),
        }
    }

    fn emit(&mut self, instruction: Instruction) {
        codec::encode(&instruction, &mut self.code);
        self.last = Some(instruction);
    }

    /// Records `error`. Nothing is emitted and the top of stack becomes unknown.
    fn fail(&mut self, error: CompileError) {
        self.errors.push(error);
        self.last = None;
    }

    /// Category of the value the last emitted instruction leaves on the stack.
    fn category(&self) -> Category {
        match self.last {
            None => Category::Unknown,
            Some(Instruction::Load(slot)) => self.names.category(slot),
            Some(instruction) => category_of(&instruction),
        }
    }
}

/// Category produced by an instruction, judged by its opcode alone.
///
/// `LOAD` is not decidable from the opcode and reports `Unknown` here; the
/// compiler resolves it through the name table instead.
pub fn category_of(instruction: &Instruction) -> Category {
    match instruction {
        Instruction::PushNumber(_)
        | Instruction::Unary(UnaryOp::Neg)
        | Instruction::Binary(BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div) => {
            Category::Float
        }

        Instruction::PushConst(_) | Instruction::Binary(BinaryOp::AddStr | BinaryOp::SubStr) => {
            Category::String
        }

        Instruction::Bool(_)
        | Instruction::Unary(UnaryOp::Not)
        | Instruction::Binary(
            BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge,
        ) => Category::Boolean,

        Instruction::Load(_) | Instruction::Store(_) | Instruction::Print => Category::Unknown,
    }
}

/// Picks the concrete binary opcode for `op` applied to `left` and `right`.
fn select_binary(op: &Spanned, left: Category, right: Category) -> Result<BinaryOp, CompileError> {
    let selected = match (left, right) {
        (Category::Float, Category::Float) => match op.token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Lt => Some(BinaryOp::Lt),
            Token::LtEq => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::GtEq => Some(BinaryOp::Ge),
            Token::EqEq => Some(BinaryOp::Eq),
            Token::NotEq => Some(BinaryOp::Ne),
            _ => None,
        },
        (Category::String, Category::String) => match op.token {
            Token::Plus => Some(BinaryOp::AddStr),
            Token::Minus => Some(BinaryOp::SubStr),
            _ => None,
        },
        (Category::Boolean, Category::Boolean) => match op.token {
            Token::And => Some(BinaryOp::And),
            Token::Or => Some(BinaryOp::Or),
            _ => None,
        },
        _ => return Err(CompileError::invalid_operands(op, left, right)),
    };

    selected.ok_or_else(|| CompileError::unsupported_operator(op, left))
}
