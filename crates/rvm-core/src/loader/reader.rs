//! Bytecode reader
//!
//! Parses an untrusted byte stream into a [`CodeHolder`].
//! This layer performs structural validation only; type discipline is
//! enforced by the interpreter at execution time.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::bytecode::{Instruction, OpCode};
use crate::code::{CodeHolder, Function};
use crate::error::{LoadError, RvmResult, Section};
use crate::vm::value::Value;

use super::{
    BYTECODE_MAGIC, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_TEXT, VERSION_MAJOR,
};

/// Bytecode loader
pub struct BytecodeLoader;

impl BytecodeLoader {
    /// Load bytecode from raw bytes
    pub fn load(bytes: &[u8]) -> Result<CodeHolder, LoadError> {
        let mut cursor = Cursor::new(bytes);

        // Header
        let magic = cursor.read_u32()?;
        if magic != BYTECODE_MAGIC {
            return Err(LoadError::InvalidMagic(magic));
        }
        let major = cursor.read_u8()?;
        let minor = cursor.read_u8()?;
        let _patch = cursor.read_u8()?;
        if major != VERSION_MAJOR {
            return Err(LoadError::UnsupportedVersion { major, minor });
        }
        // Reserved
        cursor.read_u8()?;

        // Constants
        cursor.section = Section::Constants;
        let constant_count = cursor.read_u32()?;
        let mut constants = Vec::new();
        for _ in 0..constant_count {
            constants.push(cursor.read_constant()?);
        }

        // Imports
        cursor.section = Section::Imports;
        let import_count = cursor.read_u32()?;
        let mut imports = Vec::new();
        for _ in 0..import_count {
            imports.push(cursor.read_string()?);
        }

        // Functions
        cursor.section = Section::Functions;
        let function_count = cursor.read_u32()?;
        let mut functions = Vec::new();
        for _ in 0..function_count {
            let name = cursor.read_string()?;
            let entry = cursor.read_u32()?;
            let arity = cursor.read_u8()?;
            let locals = cursor.read_u16()?;
            functions.push(Function {
                name,
                entry,
                arity,
                locals,
            });
        }

        // Code
        cursor.section = Section::Code;
        let code_len = cursor.read_u32()? as usize;
        let code = cursor.take(code_len)?;
        if cursor.remaining() != 0 {
            return Err(LoadError::TrailingBytes(cursor.remaining()));
        }
        let instructions = Self::decode_instructions(code)?;

        debug!(
            constants = constants.len(),
            imports = imports.len(),
            functions = functions.len(),
            instructions = instructions.len(),
            "bytecode loaded"
        );

        CodeHolder::new(constants, imports, functions, instructions)
    }

    /// Read a bytecode file and load it
    pub fn read_file(path: impl AsRef<Path>) -> RvmResult<CodeHolder> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading bytecode file");
        let bytes = fs::read(path)?;
        Ok(Self::load(&bytes)?)
    }

    /// Decode a code section into instructions
    pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>, LoadError> {
        let mut cursor = Cursor::new(code);
        cursor.section = Section::Code;
        let mut instructions = Vec::new();

        while cursor.remaining() > 0 {
            let offset = cursor.pos;
            let byte = cursor.read_u8()?;
            let opcode = OpCode::from_u8(byte).ok_or(LoadError::InvalidOpcode { offset, byte })?;
            let operand = match opcode.operand_width() {
                2 => u32::from(cursor.read_u16()?),
                4 => cursor.read_u32()?,
                _ => 0,
            };
            instructions.push(Instruction::with_operand(opcode, operand));
        }

        Ok(instructions)
    }
}

/// Bounds-checked reader over a byte slice
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    section: Section,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor {
            bytes,
            pos: 0,
            section: Section::Header,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LoadError> {
        if len > self.remaining() {
            return Err(LoadError::Truncated {
                section: self.section,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], LoadError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_u8(&mut self) -> Result<u8, LoadError> {
        Ok(self.take_array::<1>()?[0])
    }

    fn read_u16(&mut self) -> Result<u16, LoadError> {
        Ok(u16::from_be_bytes(self.take_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, LoadError> {
        Ok(u32::from_be_bytes(self.take_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, LoadError> {
        Ok(i64::from_be_bytes(self.take_array()?))
    }

    fn read_f64(&mut self) -> Result<f64, LoadError> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    fn read_string(&mut self) -> Result<String, LoadError> {
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| LoadError::InvalidUtf8 {
            section: self.section,
        })
    }

    fn read_constant(&mut self) -> Result<Value, LoadError> {
        let tag = self.read_u8()?;

        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_INT => Ok(Value::Int(self.read_i64()?)),
            TAG_FLOAT => Ok(Value::Float(self.read_f64()?)),
            TAG_TEXT => Ok(Value::Text(self.read_string()?)),
            TAG_BOOL => match self.read_u8()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                byte => Err(LoadError::InvalidBool(byte)),
            },
            _ => Err(LoadError::InvalidConstantTag(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operands_by_width() {
        let code = [
            OpCode::Push as u8, 0, 0, 0, 7,
            OpCode::LoadLocal as u8, 0, 2,
            OpCode::Add as u8,
        ];
        let instructions = BytecodeLoader::decode_instructions(&code).unwrap();
        assert_eq!(
            instructions,
            vec![
                Instruction::with_operand(OpCode::Push, 7),
                Instruction::with_operand(OpCode::LoadLocal, 2),
                Instruction::new(OpCode::Add),
            ]
        );
    }

    #[test]
    fn unknown_opcode_reports_offset() {
        let code = [OpCode::Nop as u8, 0x99];
        assert_eq!(
            BytecodeLoader::decode_instructions(&code),
            Err(LoadError::InvalidOpcode { offset: 1, byte: 0x99 })
        );
    }

    #[test]
    fn truncated_operand_is_rejected() {
        let code = [OpCode::Jump as u8, 0, 0];
        assert_eq!(
            BytecodeLoader::decode_instructions(&code),
            Err(LoadError::Truncated { section: Section::Code })
        );
    }

    #[test]
    fn bool_constant_must_be_zero_or_one() {
        let mut cursor = Cursor::new(&[TAG_BOOL, 1, TAG_BOOL, 0x02]);
        cursor.section = Section::Constants;
        assert_eq!(cursor.read_constant(), Ok(Value::Bool(true)));
        assert_eq!(cursor.read_constant(), Err(LoadError::InvalidBool(0x02)));
    }

    #[test]
    fn huge_string_length_does_not_allocate() {
        let mut cursor = Cursor::new(&[0xFF, 0xFF, 0xFF, 0xFF, b'a']);
        cursor.section = Section::Imports;
        assert_eq!(
            cursor.read_string(),
            Err(LoadError::Truncated { section: Section::Imports })
        );
    }
}
