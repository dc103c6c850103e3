//! Operator semantics
//!
//! Pure functions over borrowed operands. Operands are never coerced:
//! int with float is a type mismatch.

use crate::bytecode::OpCode;
use crate::error::{RvmError, RvmResult};
use super::value::{Value, ValueKind};

fn mismatch(lhs: &Value, rhs: &Value) -> RvmError {
    RvmError::TypeMismatch {
        expected: lhs.kind(),
        found: rhs.kind(),
    }
}

fn unsupported(expected: ValueKind, found: &Value) -> RvmError {
    RvmError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

fn checked(result: Option<i64>) -> RvmResult<Value> {
    result.map(Value::Int).ok_or(RvmError::IntegerOverflow)
}

/// Apply a binary opcode to `lhs` and `rhs` (rhs was on top)
pub fn binary(op: OpCode, lhs: &Value, rhs: &Value) -> RvmResult<Value> {
    if lhs.kind() != rhs.kind() {
        return Err(mismatch(lhs, rhs));
    }

    match op {
        OpCode::Add => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => checked(a.checked_add(*b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
            _ => Err(unsupported(ValueKind::Int, lhs)),
        },
        OpCode::Sub => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => checked(a.checked_sub(*b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
            _ => Err(unsupported(ValueKind::Int, lhs)),
        },
        OpCode::Mul => match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => checked(a.checked_mul(*b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
            _ => Err(unsupported(ValueKind::Int, lhs)),
        },
        OpCode::Div => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(RvmError::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => checked(a.checked_div(*b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
            _ => Err(unsupported(ValueKind::Int, lhs)),
        },
        OpCode::Mod => match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) => Err(RvmError::DivisionByZero),
            (Value::Int(a), Value::Int(b)) => checked(a.checked_rem(*b)),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a % b)),
            _ => Err(unsupported(ValueKind::Int, lhs)),
        },

        OpCode::Equal => Ok(Value::Bool(lhs == rhs)),
        OpCode::NotEqual => Ok(Value::Bool(lhs != rhs)),

        OpCode::Less | OpCode::LessEqual | OpCode::Greater | OpCode::GreaterEqual => {
            let ordering = match (lhs, rhs) {
                (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
                (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
                (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
                _ => return Err(unsupported(ValueKind::Int, lhs)),
            };
            // NaN compares false under every ordering
            let result = ordering.is_some_and(|o| match op {
                OpCode::Less => o.is_lt(),
                OpCode::LessEqual => o.is_le(),
                OpCode::Greater => o.is_gt(),
                _ => o.is_ge(),
            });
            Ok(Value::Bool(result))
        }

        OpCode::And | OpCode::Or => match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == OpCode::And {
                *a && *b
            } else {
                *a || *b
            })),
            _ => Err(unsupported(ValueKind::Bool, lhs)),
        },

        _ => Err(RvmError::InvalidInstruction(format!(
            "{} is not a binary operator",
            op.mnemonic()
        ))),
    }
}

/// Apply a unary opcode to `operand`
pub fn unary(op: OpCode, operand: &Value) -> RvmResult<Value> {
    match (op, operand) {
        (OpCode::Neg, Value::Int(n)) => checked(n.checked_neg()),
        (OpCode::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (OpCode::Neg, other) => Err(unsupported(ValueKind::Int, other)),
        (OpCode::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (OpCode::Not, other) => Err(unsupported(ValueKind::Bool, other)),
        _ => Err(RvmError::InvalidInstruction(format!(
            "{} is not a unary operator",
            op.mnemonic()
        ))),
    }
}
