use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rvm_core::{
    BytecodeLoader, EngineState, ExecutionEngine, ExternalState, Interpreter, NativeError,
    NativeResult, OpCode, RvmError, ValueKind,
};

// Build a program whose `main` pushes 42 and calls `printNumber`:
//   constants: [int 42]
//   imports:   [printNumber]
//   functions: [main @0, arity 0, locals 0]
//   code:      push 0; extcall 0; ret
fn print_number_program() -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend(&0x5256_4D88u32.to_be_bytes()); // magic
    buf.push(1u8); buf.push(0u8); buf.push(0u8); buf.push(0u8); // version + reserved

    buf.extend(&1u32.to_be_bytes()); // 1 constant
    buf.push(0x01u8); buf.extend(&42i64.to_be_bytes());

    buf.extend(&1u32.to_be_bytes()); // 1 import
    buf.extend(&11u32.to_be_bytes()); buf.extend(b"printNumber");

    buf.extend(&1u32.to_be_bytes()); // 1 function
    buf.extend(&4u32.to_be_bytes()); buf.extend(b"main");
    buf.extend(&0u32.to_be_bytes()); // entry
    buf.push(0u8); // arity
    buf.extend(&0u16.to_be_bytes()); // locals

    let mut code = vec![OpCode::Push as u8];
    code.extend(&0u32.to_be_bytes());
    code.push(OpCode::ExternalCall as u8);
    code.extend(&0u32.to_be_bytes());
    code.push(OpCode::Return as u8);
    buf.extend(&(code.len() as u32).to_be_bytes());
    buf.extend(&code);
    buf
}

fn load_interpreter() -> Interpreter {
    let code = BytecodeLoader::load(&print_number_program()).expect("load failed");
    Interpreter::new(code).expect("construct failed")
}

#[test]
fn native_receives_integer_pushed_by_main() {
    let received = Rc::new(Cell::new(None));
    let sink = Rc::clone(&received);

    let mut vm = load_interpreter();
    vm.register_function(
        move |state: &mut ExternalState<'_>| {
            let n = state.pop_integer()?;
            sink.set(Some(n));
            NativeError::status(if n == 42 { 0 } else { 1 })
        },
        "printNumber",
    )
    .unwrap();
    vm.resolve_imports().unwrap();

    assert_eq!(vm.execute_function("main"), Ok(None));
    assert_eq!(received.get(), Some(42));
    assert_eq!(vm.state(), EngineState::Halted);
    vm.destroy();
}

#[test]
fn popping_text_from_integer_top_is_a_type_mismatch() {
    let mut vm = load_interpreter();
    vm.register_function(
        |state: &mut ExternalState<'_>| {
            let _text = state.pop_text()?;
            Ok(())
        },
        "printNumber",
    )
    .unwrap();

    let err = vm.execute_function("main").unwrap_err();
    assert_eq!(
        err,
        RvmError::TypeMismatch {
            expected: ValueKind::Text,
            found: ValueKind::Int
        }
    );
    assert_eq!(vm.state(), EngineState::Faulted);
    // The failed pop left the integer in place
    assert_eq!(vm.stack().as_slice().len(), 1);
}

#[test]
fn duplicate_registration_keeps_first_binding() {
    let first_calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&first_calls);

    let mut vm = load_interpreter();
    vm.register_function(
        move |state: &mut ExternalState<'_>| {
            assert_eq!(state.pop_integer()?, 42);
            counter.set(counter.get() + 1);
            Ok(())
        },
        "printNumber",
    )
    .unwrap();

    let second = vm.register_function(
        |_: &mut ExternalState<'_>| NativeError::status(99),
        "printNumber",
    );
    assert_eq!(second, Err(RvmError::DuplicateRegistration("printNumber".into())));

    vm.resolve_imports().unwrap();
    vm.execute_function("main").unwrap();
    assert_eq!(first_calls.get(), 1);
}

#[test]
fn non_zero_status_faults_with_that_code() {
    let mut vm = load_interpreter();
    vm.register_function(
        |state: &mut ExternalState<'_>| -> NativeResult {
            state.pop_integer()?;
            NativeError::status(7)
        },
        "printNumber",
    )
    .unwrap();

    assert_eq!(
        vm.execute_function("main"),
        Err(RvmError::ExternalCall {
            import: "printNumber".into(),
            code: 7
        })
    );
    assert_eq!(vm.state(), EngineState::Faulted);

    // Further calls fail instead of running
    let again = vm.execute_function("main").unwrap_err();
    assert!(matches!(again, RvmError::EngineFaulted(ref msg) if msg.contains("code 7")));
}

#[test]
fn skipped_resolution_surfaces_at_call_site() {
    let mut vm = load_interpreter();
    assert_eq!(
        vm.execute_function("main"),
        Err(RvmError::UnresolvedImport(vec!["printNumber".into()]))
    );
    assert_eq!(vm.state(), EngineState::Faulted);
}

#[test]
fn explicit_resolution_surfaces_missing_import_first() {
    let mut vm = load_interpreter();
    assert_eq!(
        vm.resolve_imports(),
        Err(RvmError::UnresolvedImport(vec!["printNumber".into()]))
    );
    // Still usable: register and go
    vm.register_function(
        |state: &mut ExternalState<'_>| state.pop_integer().map(drop).map_err(Into::into),
        "printNumber",
    )
    .unwrap();
    vm.resolve_imports().unwrap();
    assert_eq!(vm.execute_function("main"), Ok(None));
}

#[test]
fn unused_registrations_are_inert() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let entries = Rc::clone(&log);

    let mut vm = load_interpreter();
    vm.register_function(
        move |state: &mut ExternalState<'_>| {
            entries.borrow_mut().push(state.pop_integer()?);
            Ok(())
        },
        "printNumber",
    )
    .unwrap();
    vm.register_function(|_: &mut ExternalState<'_>| NativeError::status(1), "neverCalled")
        .unwrap();

    vm.resolve_imports().unwrap();
    vm.execute_function("main").unwrap();
    vm.execute_function("main").unwrap();
    assert_eq!(*log.borrow(), vec![42, 42]);
}

#[test]
fn unknown_function_leaves_engine_ready() {
    let mut vm = load_interpreter();
    vm.register_function(|s: &mut ExternalState<'_>| s.pop_integer().map(drop).map_err(Into::into), "printNumber")
        .unwrap();
    vm.resolve_imports().unwrap();

    assert_eq!(
        vm.execute_function("start"),
        Err(RvmError::UnknownFunction("start".into()))
    );
    assert_eq!(vm.state(), EngineState::Resolved);
    assert!(vm.execute_function("main").is_ok());
}
