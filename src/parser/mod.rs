mod api;
pub mod ast;

pub use api::{JavaParser, ParseError, Rule};
