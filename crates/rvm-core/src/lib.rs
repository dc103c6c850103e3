//! Resurgence VM - Core Library
//!
//! Public API surface for the RVM core: load a program into a
//! [`CodeHolder`], move it into an [`Interpreter`], register native
//! functions for its imports, and execute functions by name.

pub mod builder;
pub mod bytecode;
pub mod code;
pub mod config;
pub mod error;
pub mod external;
pub mod loader;
pub mod vm;

// Re-export commonly used types
pub use builder::ProgramBuilder;
pub use bytecode::{Instruction, OpCode};
pub use code::{CodeHolder, Function};
pub use config::RvmConfig;
pub use error::{LoadError, RvmError, RvmResult};
pub use external::{release_text, ExternalState, NativeError, NativeFunction, NativeResult};
pub use loader::{BytecodeLoader, BytecodeWriter};
pub use vm::{EngineState, ExecutionEngine, Interpreter, Value, ValueKind};
