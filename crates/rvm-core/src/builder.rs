//! Program Builder
//!
//! In-memory assembler for [`CodeHolder`]s. Functions may be declared before
//! they are defined so calls can refer to them ahead of their body; forward
//! jumps are emitted with a placeholder target and patched later.

use crate::bytecode::{Instruction, OpCode};
use crate::code::{CodeHolder, Function};
use crate::error::LoadError;
use crate::vm::value::Value;

#[derive(Debug)]
struct Declared {
    name: String,
    arity: u8,
    locals: u16,
    entry: Option<u32>,
}

/// Incremental program assembler
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    constants: Vec<Value>,
    imports: Vec<String>,
    functions: Vec<Declared>,
    instructions: Vec<Instruction>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant, returning its pool index
    pub fn constant(&mut self, value: impl Into<Value>) -> u32 {
        self.constants.push(value.into());
        (self.constants.len() - 1) as u32
    }

    /// Declare an import, returning its index. Repeated names share an index.
    pub fn import(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.imports.iter().position(|n| n == name) {
            return pos as u32;
        }
        self.imports.push(name.to_string());
        (self.imports.len() - 1) as u32
    }

    /// Declare a function without a body yet, returning its table index
    pub fn declare_function(&mut self, name: &str, arity: u8, locals: u16) -> u32 {
        self.functions.push(Declared {
            name: name.to_string(),
            arity,
            locals,
            entry: None,
        });
        (self.functions.len() - 1) as u32
    }

    /// Start the body of a declared function at the current position
    pub fn define_function(&mut self, index: u32) {
        let here = self.here();
        if let Some(function) = self.functions.get_mut(index as usize) {
            function.entry = Some(here);
        }
    }

    /// Declare a function whose body starts at the current position
    pub fn begin_function(&mut self, name: &str, arity: u8, locals: u16) -> u32 {
        let index = self.declare_function(name, arity, locals);
        self.define_function(index);
        index
    }

    /// Index the next emitted instruction will have
    pub fn here(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// Emit an instruction without an operand
    pub fn emit(&mut self, opcode: OpCode) -> u32 {
        self.emit_with(opcode, 0)
    }

    /// Emit an instruction with an operand, returning its index
    pub fn emit_with(&mut self, opcode: OpCode, operand: u32) -> u32 {
        let at = self.here();
        self.instructions.push(Instruction::with_operand(opcode, operand));
        at
    }

    /// Push a constant value (added to the pool)
    pub fn push_constant(&mut self, value: impl Into<Value>) -> u32 {
        let index = self.constant(value);
        self.emit_with(OpCode::Push, index)
    }

    /// Emit an external call to `name`, declaring the import if needed
    pub fn external_call(&mut self, name: &str) -> u32 {
        let index = self.import(name);
        self.emit_with(OpCode::ExternalCall, index)
    }

    /// Rewrite the operand of an already emitted instruction
    pub fn patch(&mut self, at: u32, operand: u32) {
        if let Some(instr) = self.instructions.get_mut(at as usize) {
            instr.operand = operand;
        }
    }

    /// Validate and produce the program
    pub fn build(self) -> Result<CodeHolder, LoadError> {
        let mut functions = Vec::with_capacity(self.functions.len());
        for declared in self.functions {
            let entry = declared
                .entry
                .ok_or_else(|| LoadError::UndefinedFunction(declared.name.clone()))?;
            functions.push(Function {
                name: declared.name,
                entry,
                arity: declared.arity,
                locals: declared.locals,
            });
        }
        CodeHolder::new(self.constants, self.imports, functions, self.instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_declared_function_gets_its_entry() {
        let mut b = ProgramBuilder::new();
        let helper = b.declare_function("helper", 0, 0);
        b.begin_function("main", 0, 0);
        b.emit_with(OpCode::Call, helper);
        b.emit(OpCode::Return);
        b.define_function(helper);
        b.emit(OpCode::Return);

        let code = b.build().unwrap();
        assert_eq!(code.function("helper").unwrap().1.entry, 2);
        assert_eq!(code.function("main").unwrap().1.entry, 0);
    }

    #[test]
    fn undefined_function_fails_build() {
        let mut b = ProgramBuilder::new();
        b.declare_function("ghost", 0, 0);
        b.emit(OpCode::Halt);
        assert_eq!(b.build().unwrap_err(), LoadError::UndefinedFunction("ghost".into()));
    }

    #[test]
    fn imports_are_deduplicated() {
        let mut b = ProgramBuilder::new();
        b.begin_function("main", 0, 0);
        b.external_call("printNumber");
        b.external_call("printNumber");
        b.emit(OpCode::Return);
        let code = b.build().unwrap();
        assert_eq!(code.imports(), &["printNumber".to_string()]);
    }
}
