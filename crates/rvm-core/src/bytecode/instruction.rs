//! Bytecode Instruction Representation
//!
//! Decoded instruction format for RVM bytecode.
//! This layer contains no execution semantics.

use std::fmt;

use super::opcode::OpCode;

/// Decoded bytecode instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub operand: u32,
}

impl Instruction {
    /// Create an instruction with no operand
    pub fn new(opcode: OpCode) -> Self {
        Instruction {
            opcode,
            operand: 0,
        }
    }

    /// Create an instruction with a single operand
    pub fn with_operand(opcode: OpCode, operand: u32) -> Self {
        Instruction {
            opcode,
            operand,
        }
    }

    /// Number of bytes this instruction occupies when encoded
    pub fn encoded_len(&self) -> usize {
        1 + self.opcode.operand_width()
    }

    /// Append the encoded form of this instruction to `out`
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        match self.opcode.operand_width() {
            2 => out.extend_from_slice(&(self.operand as u16).to_be_bytes()),
            4 => out.extend_from_slice(&self.operand.to_be_bytes()),
            _ => {}
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opcode.operand_width() == 0 {
            write!(f, "{}", self.opcode.mnemonic())
        } else {
            write!(f, "{} {}", self.opcode.mnemonic(), self.operand)
        }
    }
}
