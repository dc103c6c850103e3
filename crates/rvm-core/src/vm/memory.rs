//! VM Memory Model
//!
//! Constant pool and per-frame local slots. Index-based and bounds-checked.

use crate::error::{RvmError, RvmResult};
use super::value::Value;

/// Constant pool (read-only)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConstantPool {
    values: Vec<Value>,
}

impl ConstantPool {
    pub fn new(values: Vec<Value>) -> Self {
        ConstantPool { values }
    }

    /// Clone constant `index` for pushing onto the stack
    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).cloned()
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

/// Local variables for a single call frame
#[derive(Debug)]
pub struct Locals {
    values: Vec<Value>,
}

impl Locals {
    /// Create `size` slots, the first of which are filled from `args`
    pub fn with_args(size: usize, args: Vec<Value>) -> Self {
        let mut values = args;
        values.resize(size.max(values.len()), Value::Null);
        Locals { values }
    }

    pub fn load(&self, index: usize) -> RvmResult<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or(RvmError::InvalidLocal {
                index,
                count: self.values.len(),
            })
    }

    pub fn store(&mut self, index: usize, value: Value) -> RvmResult<()> {
        let count = self.values.len();
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RvmError::InvalidLocal { index, count }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
