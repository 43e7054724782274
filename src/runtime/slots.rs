use serde::{Deserialize, Serialize};

use crate::lang::value::Value;

/// Global value store indexed by name-table position.
///
/// Storage grows on demand up to `capacity`; reading a slot that was never
/// stored yields [`Value::Empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSlots {
    values: Vec<Value>,
    capacity: usize,
}

impl GlobalSlots {
    pub fn new(capacity: usize) -> Self {
        GlobalSlots {
            values: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity. Fails with the number of stored slots when they
    /// would not fit.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<(), usize> {
        if self.values.len() > capacity {
            return Err(self.values.len());
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Returns `None` when `slot` is beyond capacity.
    pub fn get(&self, slot: u32) -> Option<Value> {
        let slot = slot as usize;
        if slot >= self.capacity {
            return None;
        }
        Some(self.values.get(slot).cloned().unwrap_or_default())
    }

    /// Stores `value`, handing it back when `slot` is beyond capacity.
    pub fn set(&mut self, slot: u32, value: Value) -> Result<(), Value> {
        let slot = slot as usize;
        if slot >= self.capacity {
            return Err(value);
        }
        if slot >= self.values.len() {
            self.values.resize(slot + 1, Value::Empty);
        }
        self.values[slot] = value;
        Ok(())
    }

    /// Values stored so far, in slot order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_slot_is_empty() {
        let slots = GlobalSlots::new(4);
        assert_eq!(slots.get(2), Some(Value::Empty));
        assert_eq!(slots.get(4), None);
    }

    #[test]
    fn test_set_grows_and_overwrites() {
        let mut slots = GlobalSlots::new(4);
        slots.set(2, Value::Number(1.0)).unwrap();
        slots.set(2, Value::Number(2.0)).unwrap();
        assert_eq!(slots.values().len(), 3);
        assert_eq!(slots.get(2), Some(Value::Number(2.0)));
        assert_eq!(slots.get(0), Some(Value::Empty));
    }

    #[test]
    fn test_set_capacity() {
        let mut slots = GlobalSlots::new(4);
        slots.set(2, Value::Number(1.0)).unwrap();
        assert_eq!(slots.set_capacity(2), Err(3));
        assert_eq!(slots.capacity(), 4);
        assert_eq!(slots.set_capacity(3), Ok(()));
        assert_eq!(slots.get(3), None);
    }

    #[test]
    fn test_set_beyond_capacity() {
        let mut slots = GlobalSlots::new(1);
        assert_eq!(
            slots.set(1, Value::Bool(true)),
            Err(Value::Bool(true))
        );
        assert!(slots.values().is_empty());
    }
}
