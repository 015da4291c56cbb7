//! # jcse - an explicit-control evaluator for a Java subset
//!
//! Programs are parsed with a PEG grammar into an AST and run on a CSE
//! machine: a **C**ontrol stack of pending work, a **S**tash of intermediate
//! results, and an **E**nvironment of nested frames. Every step pops one
//! control item, so a run can be stopped after any number of steps, inspected,
//! and resumed.
//!
//! ## Quick Start
//!
//! ### Evaluating an expression
//!
//! ```
//! use jcse::runner::api::run_expression;
//! use jcse::runner::ds::value::Value;
//!
//! let value = run_expression("2/1-3*(5%4)+6").unwrap();
//! assert_eq!(value, Value::int(5));
//! ```
//!
//! ### Running a program
//!
//! ```
//! use jcse::runner::api::run_program;
//! use jcse::runner::ds::value::Value;
//!
//! let code = r#"
//!     public class Main {
//!         static int total;
//!         public static void main(String[] args) {
//!             for (int i = 1; i <= 4; i++) {
//!                 total += i;
//!             }
//!         }
//!     }
//! "#;
//! let ctx = run_program(code).unwrap();
//! assert_eq!(ctx.static_field("Main", "total").unwrap(), Value::int(10));
//! ```
//!
//! ### Stepping
//!
//! ```
//! use jcse::parser::JavaParser;
//! use jcse::runner::eval::{evaluate, EvalContext};
//!
//! let mut ctx = EvalContext::new();
//! ctx.load_expression(JavaParser::parse_expression("1 + 2 * 3").unwrap());
//! evaluate(&mut ctx, 2).unwrap();
//! assert!(!ctx.is_finished());
//! evaluate(&mut ctx, usize::MAX).unwrap();
//! assert!(ctx.is_finished());
//! ```
//!
//! ## Dispatch
//!
//! Overloads are selected at the call site from static types: the declared
//! type of the qualifier and of each argument. Instance methods are then
//! re-dispatched on the runtime class of the receiver; static methods are not.
//! Calls through `super` skip re-dispatch.
//!
//! ## Architecture
//!
//! - **[`parser`]** - PEG grammar and AST types
//! - **[`runner`]** - The machine
//!   - **[`runner::ds`]** - Stacks, environment, values, classes, errors
//!   - **[`runner::eval`]** - Control items and their evaluators
//!   - **[`runner::plugin`]** - Native method hooks
//!   - **[`runner::api`]** - Parse-and-run entry points

#[macro_use]
extern crate lazy_static;

pub mod parser;
pub mod runner;
