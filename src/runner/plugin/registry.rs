//! Registry of native method implementations.

use std::collections::HashMap;

use tracing::debug;

use super::types::{BuiltInFn, NativeFn};
use crate::runner::ds::env::Environment;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::Stash;
use crate::runner::eval::instr::Control;

/// Natives keyed by descriptor, `"ClassName::methodName(T1,T2): R"`.
#[derive(Debug, Default)]
pub struct NativeRegistry {
    natives: HashMap<String, NativeFn>,
}

impl NativeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        NativeRegistry {
            natives: HashMap::new(),
        }
    }

    /// Register an implementation, replacing any previous one for `descriptor`.
    pub fn register(&mut self, descriptor: &str, native: NativeFn) {
        debug!(descriptor, "native registered");
        self.natives.insert(descriptor.to_string(), native);
    }

    /// Register a plain function.
    pub fn register_fn(&mut self, descriptor: &str, f: BuiltInFn) {
        self.register(descriptor, NativeFn::BuiltIn(f));
    }

    /// Register a closure.
    pub fn register_closure<F>(&mut self, descriptor: &str, f: F)
    where
        F: Fn(&mut Control, &mut Stash, &mut Environment) -> Result<(), EvalError> + 'static,
    {
        self.register(descriptor, NativeFn::Plugin(Box::new(f)));
    }

    pub fn get(&self, descriptor: &str) -> Option<&NativeFn> {
        self.natives.get(descriptor)
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.natives.contains_key(descriptor)
    }

    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::{StashItem, Value};

    fn forty_two(_: &mut Control, stash: &mut Stash, _: &mut Environment) -> Result<(), EvalError> {
        stash.push(StashItem::Value(Value::int(42)));
        Ok(())
    }

    #[test]
    fn test_register_and_call() {
        let mut registry = NativeRegistry::new();
        registry.register_fn("Main::answer(): int", forty_two);
        assert!(registry.contains("Main::answer(): int"));
        assert!(registry.get("Main::answer(int): int").is_none());

        let mut control = Control::new();
        let mut stash = Stash::new();
        let mut env = Environment::new();
        registry
            .get("Main::answer(): int")
            .unwrap()
            .call(&mut control, &mut stash, &mut env)
            .unwrap();
        assert_eq!(stash.pop().and_then(|s| s.as_value().cloned()), Some(Value::int(42)));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = NativeRegistry::new();
        registry.register_fn("A::f(): void", forty_two);
        registry.register_closure("A::f(): void", |_, stash, _| {
            stash.push(StashItem::Value(Value::Void));
            Ok(())
        });
        assert_eq!(registry.len(), 1);
        assert!(matches!(registry.get("A::f(): void"), Some(NativeFn::Plugin(_))));
    }
}
