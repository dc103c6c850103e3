//! Native call boundary
//!
//! A native function receives an [`ExternalState`]: a handle scoped to the
//! calling frame's region of the value stack. It exposes typed pops and
//! pushes only; frames, code and the registry stay out of reach.
//!
//! Ownership: `pop_text` moves the buffer to the native caller. The VM keeps
//! no alias to it. Dropping the `String` (or passing it to [`release_text`])
//! releases it.

use std::num::NonZeroU8;

use thiserror::Error;

use crate::error::{RvmError, RvmResult};
use crate::vm::stack::Stack;
use crate::vm::value::Value;

/// Failure reported by a native function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// A stack access inside the native failed; surfaced to the caller as-is
    #[error("{0}")]
    Fault(RvmError),
    /// The native reported a non-zero status code
    #[error("native status {0}")]
    Status(NonZeroU8),
}

impl NativeError {
    /// Map a numeric status to a native result: zero is success.
    pub fn status(code: u8) -> NativeResult {
        match NonZeroU8::new(code) {
            None => Ok(()),
            Some(code) => Err(NativeError::Status(code)),
        }
    }
}

impl From<RvmError> for NativeError {
    fn from(err: RvmError) -> Self {
        NativeError::Fault(err)
    }
}

pub type NativeResult = Result<(), NativeError>;

/// Host-provided function invoked by `ExternalCall`
pub trait NativeFunction {
    fn call(&mut self, state: &mut ExternalState<'_>) -> NativeResult;
}

impl<F> NativeFunction for F
where
    F: FnMut(&mut ExternalState<'_>) -> NativeResult,
{
    fn call(&mut self, state: &mut ExternalState<'_>) -> NativeResult {
        self(state)
    }
}

/// Stack handle passed to a native function for the duration of one call
pub struct ExternalState<'a> {
    stack: &'a mut Stack,
    floor: usize,
}

impl<'a> ExternalState<'a> {
    pub(crate) fn new(stack: &'a mut Stack, floor: usize) -> Self {
        ExternalState { stack, floor }
    }

    fn guard(&self) -> RvmResult<()> {
        if self.stack.size() <= self.floor {
            return Err(RvmError::StackUnderflow);
        }
        Ok(())
    }

    /// Number of values visible to the native
    pub fn depth(&self) -> usize {
        self.stack.size().saturating_sub(self.floor)
    }

    pub fn peek(&self) -> RvmResult<&Value> {
        self.guard()?;
        self.stack.peek()
    }

    pub fn pop_value(&mut self) -> RvmResult<Value> {
        self.guard()?;
        self.stack.pop()
    }

    pub fn pop_integer(&mut self) -> RvmResult<i64> {
        self.guard()?;
        self.stack.pop_integer()
    }

    pub fn pop_float(&mut self) -> RvmResult<f64> {
        self.guard()?;
        self.stack.pop_float()
    }

    pub fn pop_bool(&mut self) -> RvmResult<bool> {
        self.guard()?;
        self.stack.pop_bool()
    }

    /// Pop a text value; the caller now owns the buffer.
    pub fn pop_text(&mut self) -> RvmResult<String> {
        self.guard()?;
        self.stack.pop_text()
    }

    /// Push a value; the stack takes ownership of it.
    pub fn push(&mut self, value: impl Into<Value>) -> RvmResult<()> {
        self.stack.push(value.into())
    }

    pub fn push_integer(&mut self, value: i64) -> RvmResult<()> {
        self.push(Value::Int(value))
    }

    pub fn push_float(&mut self, value: f64) -> RvmResult<()> {
        self.push(Value::Float(value))
    }

    pub fn push_bool(&mut self, value: bool) -> RvmResult<()> {
        self.push(Value::Bool(value))
    }

    pub fn push_text(&mut self, value: String) -> RvmResult<()> {
        self.push(Value::Text(value))
    }
}

/// Release a text buffer obtained from [`ExternalState::pop_text`].
///
/// Equivalent to dropping it. Releasing twice cannot be expressed: the
/// buffer is moved in.
pub fn release_text(text: String) {
    drop(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::value::ValueKind;

    #[test]
    fn natives_cannot_pop_below_their_floor() {
        let mut stack = Stack::new(8);
        stack.push(Value::Int(1)).unwrap();
        stack.push(Value::Int(2)).unwrap();
        let mut state = ExternalState::new(&mut stack, 1);
        assert_eq!(state.depth(), 1);
        assert_eq!(state.pop_integer().unwrap(), 2);
        assert_eq!(state.pop_integer(), Err(RvmError::StackUnderflow));
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn wrong_kind_leaves_value_in_place() {
        let mut stack = Stack::new(8);
        stack.push(Value::Int(42)).unwrap();
        let mut state = ExternalState::new(&mut stack, 0);
        assert_eq!(
            state.pop_text(),
            Err(RvmError::TypeMismatch {
                expected: ValueKind::Text,
                found: ValueKind::Int
            })
        );
        assert_eq!(state.peek().unwrap(), &Value::Int(42));
    }

    #[test]
    fn pushed_text_is_owned_by_the_stack() {
        let mut stack = Stack::new(8);
        let mut state = ExternalState::new(&mut stack, 0);
        state.push_text(String::from("owned")).unwrap();
        let text = state.pop_text().unwrap();
        release_text(text);
        assert!(stack.is_empty());
    }

    #[test]
    fn status_zero_is_success() {
        assert_eq!(NativeError::status(0), Ok(()));
        let err = NativeError::status(7).unwrap_err();
        assert_eq!(err, NativeError::Status(NonZeroU8::new(7).unwrap()));
        assert_eq!(err.to_string(), "native status 7");
    }
}
