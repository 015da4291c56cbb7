//! Execution: runtime data structures, the CSE machine, native hooks and the
//! entry points that tie them to the parser.

pub mod api;
pub mod config;
pub mod ds;
pub mod eval;
pub mod plugin;
