//! Runtime data structures of the machine: stacks, frames, values and classes.

pub mod class;
pub mod env;
pub mod error;
pub mod operations;
pub mod stack;
pub mod types;
pub mod value;
