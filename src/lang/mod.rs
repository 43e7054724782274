//! # vmlite language model
//!
//! This module defines the syntax tree produced by the parser and the runtime
//! values shared by the compiler's constant pool and the VM.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - Parenthesized forms such as `(1 + 2)` describe tree shape, not
//!   surface syntax.

pub mod ast;
pub mod value;
