//! Host crate: ready-made native functions for RVM programs
//!
//! [`Console`] binds the conventional printing imports (`printNumber`,
//! `printFloat`, `printBool`, `printString`) to a writer. Each native pops one
//! value of its kind and writes `"<import> called: <value>"` on its own line.

use std::cell::{Ref, RefCell};
use std::fmt::Display;
use std::io::{self, Write};
use std::rc::Rc;

use tracing::warn;

use rvm_core::{release_text, ExternalState, Interpreter, NativeError, NativeResult, RvmResult};

pub const PRINT_NUMBER: &str = "printNumber";
pub const PRINT_FLOAT: &str = "printFloat";
pub const PRINT_BOOL: &str = "printBool";
pub const PRINT_STRING: &str = "printString";

/// Status returned by a console native when its writer fails
pub const WRITE_FAILED: u8 = 2;

/// Printing natives sharing one output sink
pub struct Console<W: Write> {
    sink: Rc<RefCell<W>>,
}

impl Console<io::Stdout> {
    pub fn stdout() -> Self {
        Console::new(io::stdout())
    }
}

impl<W: Write + 'static> Console<W> {
    pub fn new(sink: W) -> Self {
        Console {
            sink: Rc::new(RefCell::new(sink)),
        }
    }

    /// Register every console native on `interpreter`
    pub fn register(&self, interpreter: &mut Interpreter) -> RvmResult<()> {
        let sink = Rc::clone(&self.sink);
        interpreter.register_function(
            move |state: &mut ExternalState<'_>| {
                let n = state.pop_integer()?;
                emit(&*sink, PRINT_NUMBER, &n)
            },
            PRINT_NUMBER,
        )?;

        let sink = Rc::clone(&self.sink);
        interpreter.register_function(
            move |state: &mut ExternalState<'_>| {
                let n = state.pop_float()?;
                emit(&*sink, PRINT_FLOAT, &n)
            },
            PRINT_FLOAT,
        )?;

        let sink = Rc::clone(&self.sink);
        interpreter.register_function(
            move |state: &mut ExternalState<'_>| {
                let b = state.pop_bool()?;
                emit(&*sink, PRINT_BOOL, &b)
            },
            PRINT_BOOL,
        )?;

        let sink = Rc::clone(&self.sink);
        interpreter.register_function(
            move |state: &mut ExternalState<'_>| {
                let text = state.pop_text()?;
                let outcome = emit(&*sink, PRINT_STRING, &text);
                release_text(text);
                outcome
            },
            PRINT_STRING,
        )?;

        Ok(())
    }

    /// Borrow the sink, e.g. to inspect captured output
    pub fn sink(&self) -> Ref<'_, W> {
        self.sink.borrow()
    }

    /// Recover the sink. `None` while an interpreter still holds the natives.
    pub fn into_inner(self) -> Option<W> {
        Rc::try_unwrap(self.sink).ok().map(RefCell::into_inner)
    }
}

fn emit<W: Write>(sink: &RefCell<W>, import: &str, value: &dyn Display) -> NativeResult {
    let mut out = sink.borrow_mut();
    match writeln!(out, "{} called: {}", import, value) {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(%err, import, "console write failed");
            NativeError::status(WRITE_FAILED)
        }
    }
}
