//! VM Stack Implementation
//!
//! Value stack for VM execution. Typed pops check the top value before
//! removing it, so a failed pop never changes the stack.
//! No execution semantics.

use crate::error::{RvmError, RvmResult};
use super::value::{Value, ValueKind};

/// VM value stack
#[derive(Debug)]
pub struct Stack {
    values: Vec<Value>,
    max_size: usize,
}

fn mismatch(expected: ValueKind, found: &Value) -> RvmError {
    RvmError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

impl Stack {
    /// Create new stack with maximum size
    pub fn new(max_size: usize) -> Self {
        Stack {
            values: Vec::new(),
            max_size,
        }
    }

    /// Push value onto stack, taking ownership of it
    pub fn push(&mut self, value: Value) -> RvmResult<()> {
        if self.values.len() >= self.max_size {
            return Err(RvmError::StackOverflow { limit: self.max_size });
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop value from stack
    pub fn pop(&mut self) -> RvmResult<Value> {
        self.values.pop().ok_or(RvmError::StackUnderflow)
    }

    /// Peek at top of stack without removing
    pub fn peek(&self) -> RvmResult<&Value> {
        self.values.last().ok_or(RvmError::StackUnderflow)
    }

    /// Peek `depth` values below the top (0 is the top)
    pub fn peek_at(&self, depth: usize) -> RvmResult<&Value> {
        self.values
            .len()
            .checked_sub(depth + 1)
            .and_then(|i| self.values.get(i))
            .ok_or(RvmError::StackUnderflow)
    }

    /// Duplicate top value
    pub fn dup(&mut self) -> RvmResult<()> {
        let value = self.peek()?.clone();
        self.push(value)
    }

    /// Swap the two topmost values
    pub fn swap(&mut self) -> RvmResult<()> {
        let len = self.values.len();
        if len < 2 {
            return Err(RvmError::StackUnderflow);
        }
        self.values.swap(len - 1, len - 2);
        Ok(())
    }

    /// Fail unless the top value has the given kind
    pub fn expect_top(&self, kind: ValueKind) -> RvmResult<()> {
        let top = self.peek()?;
        if top.kind() == kind {
            Ok(())
        } else {
            Err(mismatch(kind, top))
        }
    }

    /// Pop the top value if it has the given kind
    pub fn pop_as(&mut self, kind: ValueKind) -> RvmResult<Value> {
        self.expect_top(kind)?;
        self.pop()
    }

    pub fn pop_integer(&mut self) -> RvmResult<i64> {
        match self.pop_as(ValueKind::Int)? {
            Value::Int(n) => Ok(n),
            other => Err(mismatch(ValueKind::Int, &other)),
        }
    }

    pub fn pop_float(&mut self) -> RvmResult<f64> {
        match self.pop_as(ValueKind::Float)? {
            Value::Float(n) => Ok(n),
            other => Err(mismatch(ValueKind::Float, &other)),
        }
    }

    pub fn pop_bool(&mut self) -> RvmResult<bool> {
        match self.pop_as(ValueKind::Bool)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(ValueKind::Bool, &other)),
        }
    }

    /// Pop a text value. The buffer is moved out; the slot is gone, not aliased.
    pub fn pop_text(&mut self) -> RvmResult<String> {
        match self.pop_as(ValueKind::Text)? {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(ValueKind::Text, &other)),
        }
    }

    /// Pop the top `count` values, returned bottom-first.
    /// Fails without popping anything if fewer are present.
    pub fn pop_many(&mut self, count: usize) -> RvmResult<Vec<Value>> {
        if count > self.values.len() {
            return Err(RvmError::StackUnderflow);
        }
        let at = self.values.len() - count;
        Ok(self.values.split_off(at))
    }

    /// Drop everything above `depth`
    pub fn truncate(&mut self, depth: usize) {
        self.values.truncate(depth);
    }

    /// Get current stack size
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Clear stack
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Values from bottom to top
    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }
}
