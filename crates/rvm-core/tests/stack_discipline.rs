use proptest::prelude::*;

use rvm_core::vm::stack::Stack;
use rvm_core::{RvmError, Value, ValueKind};

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        any::<bool>().prop_map(Value::Bool),
        "[a-z]{0,8}".prop_map(Value::Text),
    ]
}

fn kind_strategy() -> impl Strategy<Value = ValueKind> {
    prop_oneof![
        Just(ValueKind::Null),
        Just(ValueKind::Int),
        Just(ValueKind::Float),
        Just(ValueKind::Bool),
        Just(ValueKind::Text),
    ]
}

proptest! {
    #[test]
    fn wrong_kind_pop_never_mutates(
        values in prop::collection::vec(value_strategy(), 1..16),
        requested in kind_strategy(),
    ) {
        let mut stack = Stack::new(64);
        for value in &values {
            stack.push(value.clone()).unwrap();
        }
        let top = values.last().unwrap().kind();
        prop_assume!(top != requested);

        let err = stack.pop_as(requested).unwrap_err();
        prop_assert_eq!(err, RvmError::TypeMismatch { expected: requested, found: top });
        prop_assert_eq!(stack.as_slice(), values.as_slice());
    }

    #[test]
    fn matching_kind_pop_removes_exactly_one(values in prop::collection::vec(value_strategy(), 1..16)) {
        let mut stack = Stack::new(64);
        for value in &values {
            stack.push(value.clone()).unwrap();
        }
        let top = values.last().unwrap();
        let popped = stack.pop_as(top.kind()).unwrap();
        prop_assert_eq!(&popped, top);
        prop_assert_eq!(stack.as_slice(), &values[..values.len() - 1]);
    }
}
