//! RVM Error Types
//!
//! Defines every fault the Resurgence VM can report. Load errors describe a
//! malformed program; runtime faults describe a violated stack or call
//! discipline and move the interpreter to its terminal `Faulted` state.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::vm::value::ValueKind;

/// Section of a bytecode stream, used to locate load errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Constants,
    Imports,
    Functions,
    Code,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::Header => "header",
            Section::Constants => "constants",
            Section::Imports => "imports",
            Section::Functions => "functions",
            Section::Code => "code",
        };
        f.write_str(name)
    }
}

/// Structural problems found while loading or assembling a program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid bytecode magic number: 0x{0:08X}")]
    InvalidMagic(u32),

    #[error("unsupported bytecode version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("bytecode truncated in {section} section")]
    Truncated { section: Section },

    #[error("invalid constant tag 0x{0:02X}")]
    InvalidConstantTag(u8),

    #[error("invalid bool constant byte 0x{0:02X}")]
    InvalidBool(u8),

    #[error("invalid UTF-8 string in {section} section")]
    InvalidUtf8 { section: Section },

    #[error("invalid opcode 0x{byte:02X} at code offset {offset}")]
    InvalidOpcode { offset: usize, byte: u8 },

    #[error("{0} trailing bytes after code section")]
    TrailingBytes(usize),

    #[error("instruction {at} references constant {index} (pool has {len})")]
    ConstantOutOfRange { at: usize, index: u32, len: usize },

    #[error("instruction {at} references import {index} (program declares {len})")]
    ImportOutOfRange { at: usize, index: u32, len: usize },

    #[error("instruction {at} references function {index} (table has {len})")]
    FunctionOutOfRange { at: usize, index: u32, len: usize },

    #[error("instruction {at} jumps to {target} (code has {len} instructions)")]
    JumpOutOfRange { at: usize, target: u32, len: usize },

    #[error("function `{name}` enters at {entry} (code has {len} instructions)")]
    EntryOutOfRange { name: String, entry: u32, len: usize },

    #[error("function `{name}` declares {locals} locals for {arity} parameters")]
    LocalsBelowArity { name: String, arity: u8, locals: u16 },

    #[error("duplicate function `{0}`")]
    DuplicateFunction(String),

    #[error("duplicate import `{0}`")]
    DuplicateImport(String),

    #[error("function `{0}` was declared but never defined")]
    UndefinedFunction(String),
}

/// Every fault produced by the VM.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RvmError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("io error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Registry
    #[error("external function `{0}` is already registered")]
    DuplicateRegistration(String),

    #[error("unresolved imports: {}", .0.join(", "))]
    UnresolvedImport(Vec<String>),

    // Entry
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("function `{function}` takes {expected} arguments, got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    // Stack discipline
    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack overflow (limit {limit})")]
    StackOverflow { limit: usize },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },

    // Execution
    #[error("external function `{import}` failed with code {code}")]
    ExternalCall { import: String, code: u8 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid local access: {index} (frame has {count})")]
    InvalidLocal { index: usize, count: usize },

    #[error("call depth exceeded (limit {limit})")]
    CallDepthExceeded { limit: usize },

    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("program counter out of bounds: {0}")]
    ProgramCounterOutOfBounds(usize),

    #[error("interpreter is faulted: {0}")]
    EngineFaulted(String),
}

impl From<io::Error> for RvmError {
    fn from(err: io::Error) -> Self {
        RvmError::Io(err.to_string())
    }
}

pub type RvmResult<T> = Result<T, RvmError>;
