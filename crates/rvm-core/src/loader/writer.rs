//! Bytecode writer
//!
//! Encodes a [`CodeHolder`] into the byte layout read by
//! [`BytecodeLoader`](super::BytecodeLoader).

use std::fs;
use std::path::Path;

use crate::code::CodeHolder;
use crate::error::RvmResult;
use crate::vm::value::Value;

use super::{
    BYTECODE_MAGIC, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_NULL, TAG_TEXT, VERSION_MAJOR,
    VERSION_MINOR,
};

/// Bytecode writer
pub struct BytecodeWriter;

impl BytecodeWriter {
    /// Encode a program to bytes
    pub fn encode(code: &CodeHolder) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&BYTECODE_MAGIC.to_be_bytes());
        buf.push(VERSION_MAJOR);
        buf.push(VERSION_MINOR);
        buf.push(0); // patch
        buf.push(0); // reserved

        Self::write_len(&mut buf, code.constants().len());
        for value in code.constants().iter() {
            Self::write_constant(&mut buf, value);
        }

        Self::write_len(&mut buf, code.imports().len());
        for name in code.imports() {
            Self::write_string(&mut buf, name);
        }

        Self::write_len(&mut buf, code.function_count());
        for function in code.functions() {
            Self::write_string(&mut buf, &function.name);
            buf.extend_from_slice(&function.entry.to_be_bytes());
            buf.push(function.arity);
            buf.extend_from_slice(&function.locals.to_be_bytes());
        }

        let mut instructions = Vec::new();
        for instr in code.instructions() {
            instr.encode(&mut instructions);
        }
        Self::write_len(&mut buf, instructions.len());
        buf.extend_from_slice(&instructions);

        buf
    }

    /// Encode a program and write it to `path`
    pub fn write_file(path: impl AsRef<Path>, code: &CodeHolder) -> RvmResult<()> {
        fs::write(path, Self::encode(code))?;
        Ok(())
    }

    fn write_len(buf: &mut Vec<u8>, len: usize) {
        buf.extend_from_slice(&(len as u32).to_be_bytes());
    }

    fn write_string(buf: &mut Vec<u8>, s: &str) {
        Self::write_len(buf, s.len());
        buf.extend_from_slice(s.as_bytes());
    }

    fn write_constant(buf: &mut Vec<u8>, value: &Value) {
        match value {
            Value::Null => buf.push(TAG_NULL),
            Value::Int(n) => {
                buf.push(TAG_INT);
                buf.extend_from_slice(&n.to_be_bytes());
            }
            Value::Float(n) => {
                buf.push(TAG_FLOAT);
                buf.extend_from_slice(&n.to_be_bytes());
            }
            Value::Text(s) => {
                buf.push(TAG_TEXT);
                Self::write_string(buf, s);
            }
            Value::Bool(b) => {
                buf.push(TAG_BOOL);
                buf.push(u8::from(*b));
            }
        }
    }
}
