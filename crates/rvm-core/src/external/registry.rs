//! External Function Registry
//!
//! Maps import names to host-provided native functions.
//! Names are unique: registering a name twice is an error and the first
//! binding stays active.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{RvmError, RvmResult};
use super::state::NativeFunction;

/// Stable slot of a registered native function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub usize);

impl From<usize> for BindingId {
    fn from(index: usize) -> Self {
        BindingId(index)
    }
}

impl From<BindingId> for usize {
    fn from(id: BindingId) -> Self {
        id.0
    }
}

/// Registry of native functions keyed by exact name
#[derive(Default)]
pub struct ExternalRegistry {
    natives: IndexMap<String, Box<dyn NativeFunction>>,
}

impl ExternalRegistry {
    /// New registry with no bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a native under `name`
    pub fn register(
        &mut self,
        name: &str,
        native: Box<dyn NativeFunction>,
    ) -> RvmResult<BindingId> {
        if self.natives.contains_key(name) {
            return Err(RvmError::DuplicateRegistration(name.to_string()));
        }
        let (index, _) = self.natives.insert_full(name.to_string(), native);
        Ok(BindingId(index))
    }

    /// Find the binding registered under `name`
    pub fn lookup(&self, name: &str) -> Option<BindingId> {
        self.natives.get_index_of(name).map(BindingId)
    }

    /// Borrow a bound native together with its name
    pub fn get_mut(&mut self, id: BindingId) -> Option<(&str, &mut dyn NativeFunction)> {
        let (name, native) = self.natives.get_index_mut(id.0)?;
        Some((name.as_str(), &mut **native))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.natives.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }
}

impl fmt::Debug for ExternalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::state::{ExternalState, NativeError, NativeResult};

    fn noop(_: &mut ExternalState<'_>) -> NativeResult {
        Ok(())
    }

    fn failing(_: &mut ExternalState<'_>) -> NativeResult {
        NativeError::status(9)
    }

    #[test]
    fn duplicate_name_is_rejected_and_first_kept() {
        let mut registry = ExternalRegistry::new();
        let first = registry.register("printNumber", Box::new(noop)).unwrap();
        let err = registry.register("printNumber", Box::new(failing)).unwrap_err();
        assert_eq!(err, RvmError::DuplicateRegistration("printNumber".into()));
        assert_eq!(registry.lookup("printNumber"), Some(first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_is_exact() {
        let mut registry = ExternalRegistry::new();
        registry.register("printString", Box::new(noop)).unwrap();
        assert!(registry.lookup("printstring").is_none());
        assert!(registry.contains("printString"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["printString"]);
    }

    #[test]
    fn bound_native_is_callable_through_its_id() {
        let mut registry = ExternalRegistry::new();
        registry.register("noop", Box::new(noop)).unwrap();
        let id = registry.register("failing", Box::new(failing)).unwrap();

        let mut stack = crate::vm::stack::Stack::new(4);
        let mut state = ExternalState::new(&mut stack, 0);
        let (name, native) = registry.get_mut(id).unwrap();
        assert_eq!(name, "failing");
        assert_eq!(native.call(&mut state), NativeError::status(9));
        assert!(registry.get_mut(BindingId(5)).is_none());
    }
}
