use serde::{Deserialize, Serialize};

/// Runtime value in vmlite.
///
/// Values live on the VM operand stack, in the constant pool and in the
/// global slots.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    /// Contents of a global slot that was never stored to.
    #[default]
    Empty,

    /// 32-bit float; the width of a numeric immediate operand.
    Number(f32),

    /// UTF-8 string value.
    Str(String),

    /// Boolean value.
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "boolean",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Empty => write!(f, "nil"),
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}
