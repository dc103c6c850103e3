//! Code Representation
//!
//! `CodeHolder` is the immutable, loaded form of a program: decoded
//! instructions, the constant pool, declared imports, and the function table.
//! It is move-only: building an `Interpreter` consumes it.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::bytecode::{Instruction, OpCode};
use crate::error::LoadError;
use crate::vm::memory::ConstantPool;
use crate::vm::value::Value;

/// Function table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    /// Index of the first instruction
    pub entry: u32,
    /// Number of arguments moved into the leading local slots
    pub arity: u8,
    /// Total number of local slots, parameters included
    pub locals: u16,
}

/// Loaded, validated program
#[derive(Debug, PartialEq)]
pub struct CodeHolder {
    constants: ConstantPool,
    imports: Vec<String>,
    functions: IndexMap<String, Function>,
    instructions: Vec<Instruction>,
}

impl CodeHolder {
    /// Assemble a holder from its parts, running the structural checks
    /// shared by the loader and the program builder.
    pub fn new(
        constants: Vec<Value>,
        imports: Vec<String>,
        functions: Vec<Function>,
        instructions: Vec<Instruction>,
    ) -> Result<Self, LoadError> {
        let mut seen = HashSet::new();
        for name in &imports {
            if !seen.insert(name.as_str()) {
                return Err(LoadError::DuplicateImport(name.clone()));
            }
        }

        let mut table = IndexMap::with_capacity(functions.len());
        for function in functions {
            if function.entry as usize >= instructions.len() {
                return Err(LoadError::EntryOutOfRange {
                    name: function.name,
                    entry: function.entry,
                    len: instructions.len(),
                });
            }
            if u16::from(function.arity) > function.locals {
                return Err(LoadError::LocalsBelowArity {
                    name: function.name,
                    arity: function.arity,
                    locals: function.locals,
                });
            }
            if table.contains_key(&function.name) {
                return Err(LoadError::DuplicateFunction(function.name));
            }
            table.insert(function.name.clone(), function);
        }

        let holder = CodeHolder {
            constants: ConstantPool::new(constants),
            imports,
            functions: table,
            instructions,
        };
        holder.check_operands()?;
        Ok(holder)
    }

    fn check_operands(&self) -> Result<(), LoadError> {
        let code_len = self.instructions.len();
        for (at, instr) in self.instructions.iter().enumerate() {
            let index = instr.operand;
            match instr.opcode {
                OpCode::Push if index as usize >= self.constants.len() => {
                    return Err(LoadError::ConstantOutOfRange {
                        at,
                        index,
                        len: self.constants.len(),
                    });
                }
                OpCode::ExternalCall if index as usize >= self.imports.len() => {
                    return Err(LoadError::ImportOutOfRange {
                        at,
                        index,
                        len: self.imports.len(),
                    });
                }
                OpCode::Call if index as usize >= self.functions.len() => {
                    return Err(LoadError::FunctionOutOfRange {
                        at,
                        index,
                        len: self.functions.len(),
                    });
                }
                OpCode::Jump | OpCode::JumpIf | OpCode::JumpIfNot
                    if index as usize >= code_len =>
                {
                    return Err(LoadError::JumpOutOfRange {
                        at,
                        target: index,
                        len: code_len,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Declared import names, in declaration order
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn import_name(&self, index: usize) -> Option<&str> {
        self.imports.get(index).map(String::as_str)
    }

    /// Function table, in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Look a function up by exact name, returning its table index
    pub fn function(&self, name: &str) -> Option<(usize, &Function)> {
        self.functions
            .get_full(name)
            .map(|(index, _, function)| (index, function))
    }

    pub fn function_at(&self, index: usize) -> Option<&Function> {
        self.functions.get_index(index).map(|(_, function)| function)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(&self, pc: usize) -> Option<Instruction> {
        self.instructions.get(pc).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_fn(entry: u32) -> Function {
        Function {
            name: "main".to_string(),
            entry,
            arity: 0,
            locals: 0,
        }
    }

    #[test]
    fn rejects_constant_index_past_pool() {
        let err = CodeHolder::new(
            vec![],
            vec![],
            vec![main_fn(0)],
            vec![Instruction::with_operand(OpCode::Push, 0)],
        )
        .unwrap_err();
        assert_eq!(err, LoadError::ConstantOutOfRange { at: 0, index: 0, len: 0 });
    }

    #[test]
    fn rejects_entry_past_code() {
        let err = CodeHolder::new(vec![], vec![], vec![main_fn(3)], vec![Instruction::new(OpCode::Return)])
            .unwrap_err();
        assert!(matches!(err, LoadError::EntryOutOfRange { entry: 3, .. }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let code = vec![Instruction::new(OpCode::Return)];
        let err = CodeHolder::new(vec![], vec![], vec![main_fn(0), main_fn(0)], code.clone())
            .unwrap_err();
        assert_eq!(err, LoadError::DuplicateFunction("main".into()));

        let err = CodeHolder::new(
            vec![],
            vec!["printNumber".into(), "printNumber".into()],
            vec![main_fn(0)],
            code,
        )
        .unwrap_err();
        assert_eq!(err, LoadError::DuplicateImport("printNumber".into()));
    }

    #[test]
    fn rejects_arity_above_locals() {
        let f = Function {
            name: "f".into(),
            entry: 0,
            arity: 2,
            locals: 1,
        };
        let err = CodeHolder::new(vec![], vec![], vec![f], vec![Instruction::new(OpCode::Return)])
            .unwrap_err();
        assert!(matches!(err, LoadError::LocalsBelowArity { .. }));
    }

    #[test]
    fn function_lookup_reports_table_index() {
        let f = Function {
            name: "helper".into(),
            entry: 1,
            arity: 1,
            locals: 1,
        };
        let holder = CodeHolder::new(
            vec![],
            vec![],
            vec![main_fn(0), f],
            vec![Instruction::new(OpCode::Return), Instruction::new(OpCode::Return)],
        )
        .unwrap();
        let (index, found) = holder.function("helper").unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.arity, 1);
        assert_eq!(holder.function_at(0).unwrap().name, "main");
        assert!(holder.function("missing").is_none());
    }
}
