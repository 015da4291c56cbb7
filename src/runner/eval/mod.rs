//! The CSE machine.
//!
//! Evaluation keeps three registers in an [`EvalContext`]: the control stack
//! of pending work, the stash of intermediate results, and the environment.
//! Each step pops one control item; node handlers never recurse, they push the
//! sub-trees and instructions that finish their work.

pub mod class;
pub mod expression;
pub mod instr;
pub mod instruction;
pub mod interpreter;
pub mod nodes;
pub mod resolution;
pub mod statement;

pub use instr::{Control, ControlItem, Instr, MarkerKind, Node};
pub use interpreter::{evaluate, EvalContext};
