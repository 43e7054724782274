use serde::{Deserialize, Serialize};

use crate::lang::value::Value;

/// Compile-time type proxy for the value on top of the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    Float,
    String,
    Boolean,
    #[default]
    Unknown,
}

impl Category {
    /// Category of a value actually held at runtime.
    pub fn of_value(value: &Value) -> Category {
        match value {
            Value::Number(_) => Category::Float,
            Value::Str(_) => Category::String,
            Value::Bool(_) => Category::Boolean,
            Value::Empty => Category::Unknown,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Float => "float",
            Category::String => "string",
            Category::Boolean => "boolean",
            Category::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Append-only list of literal values referenced by index.
///
/// Entries are never deduplicated: every string literal compiled gets its
/// own index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantPool {
    values: Vec<Value>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value`, returning its index, or `None` once the pool no longer
    /// fits a 4-byte operand.
    pub fn push(&mut self, value: Value) -> Option<u32> {
        let index = u32::try_from(self.values.len()).ok()?;
        self.values.push(value);
        Some(index)
    }

    pub fn get(&self, index: u32) -> Option<&Value> {
        self.values.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}

/// Append-only list of distinct global names. Position is the storage slot.
///
/// Alongside each name the table remembers the category of the value last
/// declared into it, which is what a `LOAD` of that slot produces at compile
/// time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameTable {
    names: Vec<String>,
    categories: Vec<Category>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    /// Resolves `name`, allocating the next slot on first occurrence.
    ///
    /// Redeclaring an existing name aliases its slot and updates the
    /// recorded category. Returns `None` if the table is full.
    pub fn declare(&mut self, name: &str, category: Category) -> Option<u32> {
        if let Some(slot) = self.resolve(name) {
            if let Some(recorded) = self.categories.get_mut(slot as usize) {
                *recorded = category;
            }
            return Some(slot);
        }
        let slot = u32::try_from(self.names.len()).ok()?;
        self.names.push(name.to_string());
        self.categories.push(category);
        Some(slot)
    }

    pub fn name(&self, slot: u32) -> Option<&str> {
        self.names.get(slot as usize).map(String::as_str)
    }

    pub fn category(&self, slot: u32) -> Category {
        self.categories
            .get(slot as usize)
            .copied()
            .unwrap_or_default()
    }

    /// Overwrites the recorded category of an existing slot.
    pub fn set_category(&mut self, slot: u32, category: Category) {
        if let Some(recorded) = self.categories.get_mut(slot as usize) {
            *recorded = category;
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Output of one compile cycle.
///
/// `constants` and `names` are the session tables extended by this input;
/// `code` only refers to indices inside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledUnit {
    pub code: Vec<u8>,
    pub constants: ConstantPool,
    pub names: NameTable,
}
