//! Native method hooks.
//!
//! A method declared `native` has no body. When it is invoked the machine sets
//! up the call frame as usual (parameters bound, return marker in place) and
//! hands control, stash and environment to the implementation registered for
//! the method's descriptor:
//!
//! ```text
//! ClassName::methodName(ParamType1,ParamType2): ReturnType
//! ```
//!
//! ## Example
//!
//! ```
//! use jcse::runner::plugin::NativeRegistry;
//! use jcse::runner::ds::value::{StashItem, Value};
//!
//! let mut natives = NativeRegistry::new();
//! natives.register_closure("Main::twice(int): int", |_, stash, env| {
//!     let n = env.get_variable("n")?.borrow().value.clone();
//!     let n = match n {
//!         Some(Value::Number(n)) => n.as_i64() as i32,
//!         _ => 0,
//!     };
//!     stash.push(StashItem::Value(Value::int(n * 2)));
//!     Ok(())
//! });
//! assert!(natives.contains("Main::twice(int): int"));
//! ```

pub mod registry;
pub mod types;

pub use registry::NativeRegistry;
pub use types::{BuiltInFn, NativeFn};
