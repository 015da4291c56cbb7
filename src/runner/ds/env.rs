//! The environment: a tree of named frames with a movable `current` pointer.
//!
//! Parents are strong references and children are weak ones, so a frame lives
//! as long as something executing below it (or a closure or object built on
//! it) does. Scopes are left by restoring a node captured earlier with an
//! `Env` instruction; there is no stack of environments.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{ClosureRef, Object, ObjectRef, Value, Variable, VariableRef};

pub const GLOBAL_ENV: &str = "global";
pub const OBJECT_ENV: &str = "object";
pub const BLOCK_ENV: &str = "block";

const MIN_PRUNE_LEN: usize = 32;

#[derive(Debug, Clone)]
pub enum Binding {
    Variable(VariableRef),
    Closure(ClosureRef),
    Class(ClassRef),
}

/// Name to binding map. Only `has`, `get` and `set` are exposed.
#[derive(Default)]
pub struct Frame {
    bindings: HashMap<String, Binding>,
}

impl Frame {
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_string(), binding);
    }

    fn clear(&mut self) {
        self.bindings.clear();
    }
}

pub type EnvNodeRef = Rc<RefCell<EnvNode>>;

pub struct EnvNode {
    pub name: String,
    pub frame: Frame,
    parent: Option<EnvNodeRef>,
    children: Vec<Weak<RefCell<EnvNode>>>,
    prune_at: usize,
}

impl EnvNode {
    fn new_ref(name: &str, parent: Option<EnvNodeRef>) -> EnvNodeRef {
        Rc::new(RefCell::new(EnvNode {
            name: name.to_string(),
            frame: Frame::default(),
            parent,
            children: vec![],
            prune_at: MIN_PRUNE_LEN,
        }))
    }

    fn add_child(&mut self, child: &EnvNodeRef) {
        if self.children.len() >= self.prune_at {
            self.children.retain(|c| c.strong_count() > 0);
            self.prune_at = (self.children.len() * 2).max(MIN_PRUNE_LEN);
        }
        self.children.push(Rc::downgrade(child));
    }

    /// Looks `name` up in this frame and then in each ancestor.
    pub fn lookup(node: &EnvNodeRef, name: &str) -> Option<Binding> {
        let mut cursor = Some(node.clone());
        while let Some(n) = cursor {
            let n = n.borrow();
            if let Some(binding) = n.frame.get(name) {
                return Some(binding);
            }
            cursor = n.parent.clone();
        }
        None
    }
}

impl fmt::Debug for EnvNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvNode({})", self.name)
    }
}

pub struct Environment {
    global: EnvNodeRef,
    current: EnvNodeRef,
}

impl Environment {
    pub fn new() -> Self {
        let global = EnvNode::new_ref(GLOBAL_ENV, None);
        Environment {
            current: global.clone(),
            global,
        }
    }

    pub fn global(&self) -> EnvNodeRef {
        self.global.clone()
    }

    pub fn current(&self) -> EnvNodeRef {
        self.current.clone()
    }

    pub fn current_name(&self) -> String {
        self.current.borrow().name.clone()
    }

    /// Creates a child of `from` and makes it current.
    pub fn extend_env(&mut self, from: &EnvNodeRef, name: &str) -> EnvNodeRef {
        let node = EnvNode::new_ref(name, Some(from.clone()));
        from.borrow_mut().add_child(&node);
        self.current = node.clone();
        node
    }

    /// Creates the frame of a new instance of `class` and makes it current.
    /// Fields are declared by the caller.
    pub fn create_obj(&mut self, class: &ClassRef) -> ObjectRef {
        let frame = self.extend_env(&class.frame, OBJECT_ENV);
        Rc::new(Object {
            id: Uuid::new_v4(),
            class: class.clone(),
            frame,
        })
    }

    pub fn restore_env(&mut self, node: EnvNodeRef) {
        self.current = node;
    }

    /// Binds `name` in the current frame without a value.
    pub fn declare_variable(&mut self, name: &str, declared_type: &str) -> Result<VariableRef, EvalError> {
        self.bind_variable(name, declared_type, None)
    }

    pub fn define_variable(
        &mut self,
        name: &str,
        declared_type: &str,
        value: Value,
    ) -> Result<VariableRef, EvalError> {
        self.bind_variable(name, declared_type, Some(value))
    }

    fn bind_variable(
        &mut self,
        name: &str,
        declared_type: &str,
        value: Option<Value>,
    ) -> Result<VariableRef, EvalError> {
        let mut current = self.current.borrow_mut();
        if current.frame.has(name) {
            return Err(EvalError::Redeclaration(name.to_string()));
        }
        let variable = Variable::new_ref(name, declared_type, value);
        current.frame.set(name, Binding::Variable(variable.clone()));
        Ok(variable)
    }

    pub fn get_name(&self, name: &str) -> Result<Binding, EvalError> {
        EnvNode::lookup(&self.current, name).ok_or_else(|| EvalError::UndeclaredName(name.to_string()))
    }

    pub fn get_variable(&self, name: &str) -> Result<VariableRef, EvalError> {
        match EnvNode::lookup(&self.current, name) {
            Some(Binding::Variable(v)) => Ok(v),
            _ => Err(EvalError::UndeclaredVariable(name.to_string())),
        }
    }

    /// Classes are registered globally, so the search starts at the root.
    pub fn get_class(&self, name: &str) -> Result<ClassRef, EvalError> {
        match self.global.borrow().frame.get(name) {
            Some(Binding::Class(c)) => Ok(c),
            _ => Err(EvalError::UndeclaredClass(name.to_string())),
        }
    }

    /// Binds a method or constructor in the current (class) frame.
    pub fn define_mtd_or_con(&mut self, descriptor: &str, closure: ClosureRef) -> Result<(), EvalError> {
        let mut current = self.current.borrow_mut();
        if current.frame.has(descriptor) {
            return Err(EvalError::Redeclaration(format!(
                "{}.{}",
                closure.class_name, descriptor
            )));
        }
        current.frame.set(descriptor, Binding::Closure(closure));
        Ok(())
    }

    pub fn define_class(&mut self, name: &str, class: ClassRef) -> Result<(), EvalError> {
        let mut global = self.global.borrow_mut();
        if global.frame.has(name) {
            return Err(EvalError::Redeclaration(name.to_string()));
        }
        global.frame.set(name, Binding::Class(class));
        Ok(())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment(current: {})", self.current.borrow().name)
    }
}

// Classes hold their frame, frames hold closures bound to themselves and
// objects can reference each other, so every frame reachable from the root
// is emptied when the environment goes away.
impl Drop for Environment {
    fn drop(&mut self) {
        let mut pending = vec![self.global.clone()];
        while let Some(node) = pending.pop() {
            let children = {
                let mut node = node.borrow_mut();
                node.frame.clear();
                std::mem::take(&mut node.children)
            };
            pending.extend(children.iter().filter_map(Weak::upgrade));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_then_lookup_through_parent() {
        let mut env = Environment::new();
        env.define_variable("x", "int", Value::int(1)).unwrap();
        let global = env.global();
        env.extend_env(&global, BLOCK_ENV);
        let x = env.get_variable("x").unwrap();
        assert_eq!(x.borrow().value, Some(Value::int(1)));
        assert_eq!(env.current_name(), BLOCK_ENV);
    }

    #[test]
    fn test_redeclaration_only_checks_current_frame() {
        let mut env = Environment::new();
        env.declare_variable("x", "int").unwrap();
        assert_eq!(
            env.declare_variable("x", "int").unwrap_err(),
            EvalError::Redeclaration("x".to_string())
        );
        let global = env.global();
        env.extend_env(&global, BLOCK_ENV);
        assert!(env.declare_variable("x", "long").is_ok());
        assert_eq!(env.get_variable("x").unwrap().borrow().declared_type, "long");
    }

    #[test]
    fn test_restore_env() {
        let mut env = Environment::new();
        let saved = env.current();
        let global = env.global();
        env.extend_env(&global, "m");
        env.declare_variable("y", "int").unwrap();
        env.restore_env(saved);
        assert_eq!(env.current_name(), GLOBAL_ENV);
        assert_eq!(
            env.get_variable("y").unwrap_err(),
            EvalError::UndeclaredVariable("y".to_string())
        );
    }

    #[test]
    fn test_unknown_class() {
        let env = Environment::new();
        assert_eq!(
            env.get_class("Foo").unwrap_err(),
            EvalError::UndeclaredClass("Foo".to_string())
        );
        assert_eq!(
            env.get_name("foo").unwrap_err(),
            EvalError::UndeclaredName("foo".to_string())
        );
    }

    #[test]
    fn test_dead_children_are_pruned() {
        let mut env = Environment::new();
        let global = env.global();
        for _ in 0..1000 {
            env.extend_env(&global, BLOCK_ENV);
            env.restore_env(global.clone());
        }
        assert!(global.borrow().children.len() <= 2 * MIN_PRUNE_LEN);
    }
}
