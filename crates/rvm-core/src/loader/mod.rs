//! Bytecode Loader
//!
//! Reads and writes the RVM bytecode format. All integers are big-endian.
//!
//! ```text
//! header    magic u32, major u8, minor u8, patch u8, reserved u8
//! constants count u32, then tag u8 + payload per entry
//! imports   count u32, then names
//! functions count u32, then name, entry u32, arity u8, locals u16
//! code      byte length u32, then encoded instructions
//! ```
//!
//! Strings are a u32 byte length followed by UTF-8 bytes.

pub mod reader;
pub mod writer;

pub use reader::BytecodeLoader;
pub use writer::BytecodeWriter;

/// Bytecode magic: "RVM\x88"
pub const BYTECODE_MAGIC: u32 = 0x5256_4D88;

/// Supported bytecode version
pub const VERSION_MAJOR: u8 = 1;
pub const VERSION_MINOR: u8 = 0;

pub(crate) const TAG_NULL: u8 = 0x00;
pub(crate) const TAG_INT: u8 = 0x01;
pub(crate) const TAG_FLOAT: u8 = 0x02;
pub(crate) const TAG_TEXT: u8 = 0x03;
pub(crate) const TAG_BOOL: u8 = 0x04;
