//! RVM Configuration
//!
//! Runtime limits for the Resurgence interpreter.
//! Configuration specifies constraints only; enforcement is handled by the VM.

/// Interpreter configuration
#[derive(Debug, Clone)]
pub struct RvmConfig {
    /// Maximum value stack depth
    pub max_stack_size: usize,

    /// Maximum number of local slots a single function may declare
    pub max_locals: usize,

    /// Maximum call depth (recursion limit)
    pub max_call_depth: usize,

    /// Resolve every import before execution instead of at the call site
    pub strict_imports: bool,
}

impl Default for RvmConfig {
    fn default() -> Self {
        RvmConfig {
            max_stack_size: 1024,
            max_locals: 256,
            max_call_depth: 256,
            strict_imports: false,
        }
    }
}

impl RvmConfig {
    /// Create a new configuration with default limits
    pub fn new() -> Self {
        Self::default()
    }
}
