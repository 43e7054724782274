//! vmlite: a small expression language compiled to packed bytecode and run
//! on a stack machine.
//!
//! ```text
//! source -> frontend::lexer -> frontend::parser -> bytecode::compile -> runtime::vm
//! ```
//!
//! [`runtime::Session`] ties the stages together and keeps globals, names and
//! constants alive between inputs.

pub mod bytecode;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod repl;
pub mod runtime;

pub use error::{Diagnostic, Error, Result};
