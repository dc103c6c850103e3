//! Interpreter
//!
//! Owns a [`CodeHolder`], the value stack, call frames, and the external
//! function registry, and runs the dispatch loop.
//!
//! Lifecycle: `Constructed` -> `Resolved` -> `Running` -> `Halted` | `Faulted`.
//! `Halted` may run again; `Faulted` is terminal and only dropping the
//! interpreter is meaningful afterwards.

use tracing::{debug, error, trace};

use crate::bytecode::OpCode;
use crate::code::CodeHolder;
use crate::config::RvmConfig;
use crate::error::{LoadError, RvmError, RvmResult};
use crate::external::{BindingId, ExternalRegistry, ExternalState, NativeError, NativeFunction, NativeResult};

use super::memory::Locals;
use super::ops;
use super::stack::Stack;
use super::value::Value;

/// Observable interpreter state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Loaded; imports not yet verified
    Constructed,
    /// Every declared import is bound
    Resolved,
    /// Dispatch loop active
    Running,
    /// Last call completed normally
    Halted,
    /// A fault occurred; no further execution
    Faulted,
}

/// Entry points shared by execution engines
pub trait ExecutionEngine {
    /// Verify that every declared import has a binding
    fn resolve_imports(&mut self) -> RvmResult<()>;

    /// Run `name` with `args` until it returns, halts, or faults
    fn execute_function_with(&mut self, name: &str, args: Vec<Value>) -> RvmResult<Option<Value>>;

    /// Run a function that takes no arguments
    fn execute_function(&mut self, name: &str) -> RvmResult<Option<Value>> {
        self.execute_function_with(name, Vec::new())
    }

    fn state(&self) -> EngineState;
}

/// Call frame representing a single function invocation
#[derive(Debug)]
struct CallFrame {
    function: usize,
    /// `None` for the frame entered from `execute_function`
    return_pc: Option<usize>,
    locals: Locals,
    /// Stack depth where this frame's operands begin
    stack_base: usize,
}

/// What the dispatch loop does after an instruction
enum Flow {
    Continue,
    Finished(Option<Value>),
}

/// Stack-based bytecode interpreter
#[derive(Debug)]
pub struct Interpreter {
    config: RvmConfig,
    code: CodeHolder,
    stack: Stack,
    call_stack: Vec<CallFrame>,
    registry: ExternalRegistry,
    /// One slot per declared import, filled at registration time
    bindings: Vec<Option<BindingId>>,
    pc: usize,
    state: EngineState,
    fault: Option<RvmError>,
}

impl Interpreter {
    /// Create an interpreter with default limits, consuming `code`
    pub fn new(code: CodeHolder) -> RvmResult<Self> {
        Self::with_config(code, RvmConfig::default())
    }

    /// Create an interpreter, consuming `code`
    pub fn with_config(code: CodeHolder, config: RvmConfig) -> RvmResult<Self> {
        if config.max_stack_size == 0 || config.max_call_depth == 0 {
            return Err(RvmError::InvalidConfig(
                "stack size and call depth must be non-zero".to_string(),
            ));
        }
        if let Some(function) = code
            .functions()
            .find(|f| usize::from(f.locals) > config.max_locals)
        {
            return Err(RvmError::InvalidConfig(format!(
                "function `{}` declares {} locals (limit {})",
                function.name, function.locals, config.max_locals
            )));
        }

        debug!(
            functions = code.function_count(),
            imports = code.imports().len(),
            "interpreter constructed"
        );

        Ok(Interpreter {
            stack: Stack::new(config.max_stack_size),
            call_stack: Vec::new(),
            registry: ExternalRegistry::new(),
            bindings: vec![None; code.imports().len()],
            pc: 0,
            state: EngineState::Constructed,
            fault: None,
            code,
            config,
        })
    }

    /// Register a native function under `name`.
    ///
    /// Any declared import with that exact name is bound immediately.
    pub fn register_function<F>(&mut self, native: F, name: &str) -> RvmResult<()>
    where
        F: FnMut(&mut ExternalState<'_>) -> NativeResult + 'static,
    {
        self.register_native(Box::new(native), name)
    }

    /// Register a boxed native function under `name`
    pub fn register_native(&mut self, native: Box<dyn NativeFunction>, name: &str) -> RvmResult<()> {
        self.ensure_not_faulted()?;
        let id = self.registry.register(name, native)?;

        let mut bound = 0;
        for (slot, import) in self.bindings.iter_mut().zip(self.code.imports()) {
            if import == name {
                *slot = Some(id);
                bound += 1;
            }
        }
        debug!(name, bound, "external function registered");
        Ok(())
    }

    /// Names of declared imports that have no binding, in declaration order
    pub fn unresolved_imports(&self) -> Vec<String> {
        self.bindings
            .iter()
            .zip(self.code.imports())
            .filter(|(slot, _)| slot.is_none())
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn fault(&self) -> Option<&RvmError> {
        self.fault.as_ref()
    }

    pub fn code(&self) -> &CodeHolder {
        &self.code
    }

    pub fn config(&self) -> &RvmConfig {
        &self.config
    }

    pub fn registry(&self) -> &ExternalRegistry {
        &self.registry
    }

    /// Read-only view of the value stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Tear the interpreter down, releasing code, stack, frames and registry
    pub fn destroy(self) {
        debug!(state = ?self.state, "interpreter destroyed");
    }

    fn ensure_not_faulted(&self) -> RvmResult<()> {
        match (&self.state, &self.fault) {
            (EngineState::Faulted, Some(fault)) => Err(RvmError::EngineFaulted(fault.to_string())),
            (EngineState::Faulted, None) => Err(RvmError::EngineFaulted("unknown fault".to_string())),
            _ => Ok(()),
        }
    }

    fn enter_fault(&mut self, fault: &RvmError) {
        error!(%fault, pc = self.pc, depth = self.call_stack.len(), "interpreter faulted");
        self.state = EngineState::Faulted;
        self.fault = Some(fault.clone());
    }

    /// Execute until the entry frame returns or the program halts
    fn run(&mut self) -> RvmResult<Option<Value>> {
        loop {
            if let Flow::Finished(result) = self.step()? {
                return Ok(result);
            }
        }
    }

    /// Execute a single instruction
    fn step(&mut self) -> RvmResult<Flow> {
        let pc = self.pc;
        let instr = self
            .code
            .instruction(pc)
            .ok_or(RvmError::ProgramCounterOutOfBounds(pc))?;
        self.pc = pc + 1;
        trace!(pc, %instr, depth = self.stack.size(), "dispatch");

        let operand = instr.operand as usize;
        match instr.opcode {
            OpCode::Nop => {}
            OpCode::Halt => {
                self.call_stack.clear();
                self.stack.clear();
                return Ok(Flow::Finished(None));
            }

            // Stack
            OpCode::Push => {
                let value = self.code.constants().get(operand).ok_or_else(|| {
                    LoadError::ConstantOutOfRange {
                        at: pc,
                        index: instr.operand,
                        len: self.code.constants().len(),
                    }
                })?;
                self.stack.push(value)?;
            }
            OpCode::Pop => {
                self.require(1)?;
                self.stack.pop()?;
            }
            OpCode::Dup => {
                self.require(1)?;
                self.stack.dup()?;
            }
            OpCode::Swap => {
                self.require(2)?;
                self.stack.swap()?;
            }

            // Locals
            OpCode::LoadLocal => {
                let value = self.frame()?.locals.load(operand)?;
                self.stack.push(value)?;
            }
            OpCode::StoreLocal => {
                self.require(1)?;
                let count = self.frame()?.locals.len();
                if operand >= count {
                    return Err(RvmError::InvalidLocal { index: operand, count });
                }
                let value = self.stack.pop()?;
                self.frame_mut()?.locals.store(operand, value)?;
            }

            // Arithmetic, comparison, logic
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::Less
            | OpCode::LessEqual
            | OpCode::Greater
            | OpCode::GreaterEqual
            | OpCode::And
            | OpCode::Or => {
                self.require(2)?;
                let result = ops::binary(instr.opcode, self.stack.peek_at(1)?, self.stack.peek_at(0)?)?;
                self.stack.truncate(self.stack.size() - 2);
                self.stack.push(result)?;
            }
            OpCode::Neg | OpCode::Not => {
                self.require(1)?;
                let result = ops::unary(instr.opcode, self.stack.peek()?)?;
                self.stack.pop()?;
                self.stack.push(result)?;
            }

            // Control flow
            OpCode::Jump => self.pc = operand,
            OpCode::JumpIf | OpCode::JumpIfNot => {
                self.require(1)?;
                let condition = self.stack.pop_bool()?;
                if condition == (instr.opcode == OpCode::JumpIf) {
                    self.pc = operand;
                }
            }
            OpCode::Call => self.call(operand, Some(self.pc))?,
            OpCode::Return => return self.ret(),
            OpCode::ExternalCall => self.external_call(operand)?,
        }

        Ok(Flow::Continue)
    }

    fn frame(&self) -> RvmResult<&CallFrame> {
        self.call_stack.last().ok_or(RvmError::StackUnderflow)
    }

    fn frame_mut(&mut self) -> RvmResult<&mut CallFrame> {
        self.call_stack.last_mut().ok_or(RvmError::StackUnderflow)
    }

    /// Stack depth below which the current frame may not pop
    fn floor(&self) -> usize {
        self.call_stack.last().map_or(0, |f| f.stack_base)
    }

    /// Fail unless the current frame has at least `count` operands
    fn require(&self, count: usize) -> RvmResult<()> {
        if self.stack.size() < self.floor() + count {
            return Err(RvmError::StackUnderflow);
        }
        Ok(())
    }

    /// Push a frame for function `index`, moving its arguments off the stack
    fn call(&mut self, index: usize, return_pc: Option<usize>) -> RvmResult<()> {
        if self.call_stack.len() >= self.config.max_call_depth {
            return Err(RvmError::CallDepthExceeded {
                limit: self.config.max_call_depth,
            });
        }
        let function = self.code.function_at(index).ok_or(LoadError::FunctionOutOfRange {
            at: self.pc.saturating_sub(1),
            index: index as u32,
            len: self.code.function_count(),
        })?;
        let (entry, arity, locals) = (
            function.entry as usize,
            usize::from(function.arity),
            usize::from(function.locals),
        );

        self.require(arity)?;
        let args = self.stack.pop_many(arity)?;
        trace!(function = index, entry, arity, "call");

        self.call_stack.push(CallFrame {
            function: index,
            return_pc,
            locals: Locals::with_args(locals, args),
            stack_base: self.stack.size(),
        });
        self.pc = entry;
        Ok(())
    }

    /// Pop the current frame, carrying its topmost operand back to the caller
    fn ret(&mut self) -> RvmResult<Flow> {
        let frame = self.call_stack.pop().ok_or(RvmError::StackUnderflow)?;
        let result = if self.stack.size() > frame.stack_base {
            Some(self.stack.pop()?)
        } else {
            None
        };
        self.stack.truncate(frame.stack_base);
        trace!(function = frame.function, has_result = result.is_some(), "return");

        match frame.return_pc {
            None => Ok(Flow::Finished(result)),
            Some(return_pc) => {
                if let Some(value) = result {
                    self.stack.push(value)?;
                }
                self.pc = return_pc;
                Ok(Flow::Continue)
            }
        }
    }

    /// Hand the current frame's stack region to the native bound to import `index`
    fn external_call(&mut self, index: usize) -> RvmResult<()> {
        let import = self.code.import_name(index).unwrap_or_default();
        let binding = self
            .bindings
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| RvmError::UnresolvedImport(vec![import.to_string()]))?;

        let floor = self.floor();
        let (name, native) = self
            .registry
            .get_mut(binding)
            .ok_or_else(|| RvmError::UnresolvedImport(vec![import.to_string()]))?;
        trace!(import = name, depth = self.stack.size() - floor, "external call");

        let mut state = ExternalState::new(&mut self.stack, floor);
        match native.call(&mut state) {
            Ok(()) => Ok(()),
            Err(NativeError::Fault(fault)) => Err(fault),
            Err(NativeError::Status(code)) => Err(RvmError::ExternalCall {
                import: name.to_string(),
                code: code.get(),
            }),
        }
    }
}

impl ExecutionEngine for Interpreter {
    /// Idempotent. Reports every missing import, not just the first.
    fn resolve_imports(&mut self) -> RvmResult<()> {
        self.ensure_not_faulted()?;
        let missing = self.unresolved_imports();
        if !missing.is_empty() {
            debug!(?missing, "import resolution failed");
            return Err(RvmError::UnresolvedImport(missing));
        }
        if self.state == EngineState::Constructed {
            self.state = EngineState::Resolved;
        }
        debug!(imports = self.bindings.len(), "imports resolved");
        Ok(())
    }

    fn execute_function_with(&mut self, name: &str, args: Vec<Value>) -> RvmResult<Option<Value>> {
        self.ensure_not_faulted()?;

        let (index, function) = self
            .code
            .function(name)
            .ok_or_else(|| RvmError::UnknownFunction(name.to_string()))?;
        if args.len() != usize::from(function.arity) {
            return Err(RvmError::ArityMismatch {
                function: name.to_string(),
                expected: usize::from(function.arity),
                found: args.len(),
            });
        }
        // Caller errors: reported without faulting
        if self.stack.size() + args.len() > self.config.max_stack_size {
            return Err(RvmError::StackOverflow {
                limit: self.config.max_stack_size,
            });
        }
        if self.config.strict_imports {
            self.resolve_imports()?;
        }

        debug!(function = name, args = args.len(), "execute function");
        self.state = EngineState::Running;

        let outcome = args
            .into_iter()
            .try_for_each(|arg| self.stack.push(arg))
            .and_then(|()| self.call(index, None))
            .and_then(|()| self.run());

        match outcome {
            Ok(result) => {
                self.state = EngineState::Halted;
                debug!(function = name, ?result, "function completed");
                Ok(result)
            }
            Err(fault) => {
                self.enter_fault(&fault);
                Err(fault)
            }
        }
    }

    fn state(&self) -> EngineState {
        self.state
    }
}
