//! Bytecode Opcode Definitions
//!
//! Defines the raw opcode set for RVM bytecode.
//! This file contains no execution semantics.
//! Opcode values are part of the file format.

/// Bytecode opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Stack operations
    Push = 0x01,
    Pop  = 0x02,
    Dup  = 0x03,
    Swap = 0x04,

    // Local access
    LoadLocal  = 0x10,
    StoreLocal = 0x11,

    // Arithmetic
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Mod = 0x24,
    Neg = 0x25,

    // Comparison and logic
    Equal        = 0x30,
    NotEqual     = 0x31,
    Less         = 0x32,
    LessEqual    = 0x33,
    Greater      = 0x34,
    GreaterEqual = 0x35,
    Not          = 0x36,
    And          = 0x37,
    Or           = 0x38,

    // Control flow
    Jump         = 0x40,
    JumpIf       = 0x41,
    Call         = 0x42,
    Return       = 0x43,
    ExternalCall = 0x44,
    JumpIfNot    = 0x45,

    // System
    Nop  = 0xF0,
    Halt = 0xFF,
}

impl OpCode {
    /// Convert raw byte to opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(OpCode::Push),
            0x02 => Some(OpCode::Pop),
            0x03 => Some(OpCode::Dup),
            0x04 => Some(OpCode::Swap),

            0x10 => Some(OpCode::LoadLocal),
            0x11 => Some(OpCode::StoreLocal),

            0x20 => Some(OpCode::Add),
            0x21 => Some(OpCode::Sub),
            0x22 => Some(OpCode::Mul),
            0x23 => Some(OpCode::Div),
            0x24 => Some(OpCode::Mod),
            0x25 => Some(OpCode::Neg),

            0x30 => Some(OpCode::Equal),
            0x31 => Some(OpCode::NotEqual),
            0x32 => Some(OpCode::Less),
            0x33 => Some(OpCode::LessEqual),
            0x34 => Some(OpCode::Greater),
            0x35 => Some(OpCode::GreaterEqual),
            0x36 => Some(OpCode::Not),
            0x37 => Some(OpCode::And),
            0x38 => Some(OpCode::Or),

            0x40 => Some(OpCode::Jump),
            0x41 => Some(OpCode::JumpIf),
            0x42 => Some(OpCode::Call),
            0x43 => Some(OpCode::Return),
            0x44 => Some(OpCode::ExternalCall),
            0x45 => Some(OpCode::JumpIfNot),

            0xF0 => Some(OpCode::Nop),
            0xFF => Some(OpCode::Halt),

            _ => None,
        }
    }

    /// Width in bytes of the operand that follows this opcode.
    pub fn operand_width(self) -> usize {
        match self {
            OpCode::LoadLocal | OpCode::StoreLocal => 2,
            OpCode::Push
            | OpCode::Jump
            | OpCode::JumpIf
            | OpCode::JumpIfNot
            | OpCode::Call
            | OpCode::ExternalCall => 4,
            _ => 0,
        }
    }

    /// Assembly mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Push => "push",
            OpCode::Pop => "pop",
            OpCode::Dup => "dup",
            OpCode::Swap => "swap",
            OpCode::LoadLocal => "load_local",
            OpCode::StoreLocal => "store_local",
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::Mod => "mod",
            OpCode::Neg => "neg",
            OpCode::Equal => "eq",
            OpCode::NotEqual => "ne",
            OpCode::Less => "lt",
            OpCode::LessEqual => "le",
            OpCode::Greater => "gt",
            OpCode::GreaterEqual => "ge",
            OpCode::Not => "not",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Jump => "jump",
            OpCode::JumpIf => "jump_if",
            OpCode::Call => "call",
            OpCode::Return => "ret",
            OpCode::ExternalCall => "extcall",
            OpCode::JumpIfNot => "jump_if_not",
            OpCode::Nop => "nop",
            OpCode::Halt => "halt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_its_byte() {
        for byte in 0u8..=0xFF {
            if let Some(op) = OpCode::from_u8(byte) {
                assert_eq!(op as u8, byte);
            }
        }
    }

    #[test]
    fn operand_widths() {
        assert_eq!(OpCode::Add.operand_width(), 0);
        assert_eq!(OpCode::LoadLocal.operand_width(), 2);
        assert_eq!(OpCode::ExternalCall.operand_width(), 4);
    }
}
