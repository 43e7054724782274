//! # vmlite abstract syntax tree
//!
//! Produced by the parser and consumed, whole, by the bytecode compiler.
//! Operator and literal nodes keep their lexed [`Spanned`] token so that
//! compile errors can point back at the source.
//!
//! The `Display` impls double as the AST printer used by the `parser` run
//! mode: binary nodes render as `(left op right)`, unary as `(op right)`.

use crate::frontend::lexer::Spanned;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or identifier token.
    Literal(Spanned),

    /// Prefix operator: `-x`, `!x`.
    Unary { op: Spanned, right: Box<Expr> },

    /// Infix operator.
    Binary {
        left: Box<Expr>,
        op: Spanned,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var <name> = <init>`
    VarDecl { name: Spanned, init: Expr },

    /// A bare expression; its value stays on the stack.
    Expr(Expr),

    /// `print <expr>`
    Print(Expr),
}

/// Parsed program: statements in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Expr {
    pub fn binary(left: Expr, op: Spanned, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: Spanned, right: Expr) -> Self {
        Expr::Unary {
            op,
            right: Box::new(right),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(spanned) => write!(f, "{}", spanned.token),
            Expr::Unary { op, right } => write!(f, "({} {})", op.token, right),
            Expr::Binary { left, op, right } => write!(f, "({} {} {})", left, op.token, right),
        }
    }
}

impl std::fmt::Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::VarDecl { name, init } => write!(f, "var {} = {}", name.token, init),
            Stmt::Expr(expr) => write!(f, "{}", expr),
            Stmt::Print(expr) => write!(f, "print {}", expr),
        }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}
