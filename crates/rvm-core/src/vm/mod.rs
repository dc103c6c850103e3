pub mod interpreter;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod value;

pub use interpreter::{EngineState, ExecutionEngine, Interpreter};
pub use value::{Value, ValueKind};
