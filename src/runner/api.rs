//! Entry points tying the parser to the machine.

use thiserror::Error;
use tracing::debug;

use crate::parser::{JavaParser, ParseError};
use crate::runner::config::MachineConfig;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{StashItem, Value};
use crate::runner::eval::{evaluate, EvalContext};
use crate::runner::plugin::NativeRegistry;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Eval(#[from] EvalError),
}

/// Parses and runs a program under the default step budget. The returned
/// context holds the final control, stash and environment.
pub fn run_program(source: &str) -> Result<EvalContext, RunError> {
    run_program_with(source, MachineConfig::default(), NativeRegistry::new())
}

pub fn run_program_with(
    source: &str,
    config: MachineConfig,
    natives: NativeRegistry,
) -> Result<EvalContext, RunError> {
    let unit = JavaParser::parse_compilation_unit(source)?;
    debug!(classes = unit.classes.len(), "program parsed");
    let mut ctx = EvalContext::with_natives(natives);
    ctx.load_program(unit);
    evaluate(&mut ctx, config.target_step())?;
    Ok(ctx)
}

/// Parses and evaluates a standalone expression, e.g. `2/1-3*(5%4)+6`.
pub fn run_expression(source: &str) -> Result<Value, RunError> {
    run_expression_with(source, MachineConfig::default()).map(|(value, _)| value)
}

/// Like [`run_expression`], also returning the context so a run cut short by
/// the step budget can be resumed. An unfinished run yields whatever value is
/// on top of the stash, `Void` if there is none.
pub fn run_expression_with(
    source: &str,
    config: MachineConfig,
) -> Result<(Value, EvalContext), RunError> {
    let expression = JavaParser::parse_expression(source)?;
    let mut ctx = EvalContext::new();
    ctx.load_expression(expression);
    let value = match evaluate(&mut ctx, config.target_step())? {
        Some(StashItem::Value(v)) => v,
        _ => Value::Void,
    };
    Ok((value, ctx))
}
