//! Core types for native methods.

use crate::runner::ds::env::Environment;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::Stash;
use crate::runner::eval::instr::Control;

/// Function signature for compiled-in natives.
///
/// A native runs inside the frame of the call, so its parameters are reachable
/// through the environment. It leaves its result (or `Value::Void`) on the
/// stash; a `Reset(Return)` has already been queued to unwind the call.
pub type BuiltInFn =
    fn(control: &mut Control, stash: &mut Stash, env: &mut Environment) -> Result<(), EvalError>;

/// Native method implementation - either compiled-in or host-provided.
pub enum NativeFn {
    /// Direct function pointer.
    BuiltIn(BuiltInFn),

    /// Host-provided closure, e.g. one capturing an output buffer.
    Plugin(Box<dyn Fn(&mut Control, &mut Stash, &mut Environment) -> Result<(), EvalError>>),
}

impl NativeFn {
    pub fn call(
        &self,
        control: &mut Control,
        stash: &mut Stash,
        env: &mut Environment,
    ) -> Result<(), EvalError> {
        match self {
            NativeFn::BuiltIn(f) => f(control, stash, env),
            NativeFn::Plugin(f) => f(control, stash, env),
        }
    }
}

impl std::fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeFn::BuiltIn(_) => write!(f, "NativeFn::BuiltIn"),
            NativeFn::Plugin(_) => write!(f, "NativeFn::Plugin"),
        }
    }
}
