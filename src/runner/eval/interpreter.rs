//! The driver: an `EvalContext` holding the three registers and the loop that
//! pops one control item per step.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::parser::ast::{CompilationUnit, Expression};
use crate::runner::ds::env::Environment;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{Stash, StashItem, Value};
use crate::runner::eval::instr::{Control, ControlItem, Node};
use crate::runner::eval::{class, expression, instruction, statement};
use crate::runner::plugin::NativeRegistry;

/// Control, stash and environment of one evaluation, plus the natives it may
/// call. Independent contexts never share state.
pub struct EvalContext {
    pub control: Control,
    pub stash: Stash,
    pub environment: Environment,
    pub natives: NativeRegistry,
    /// Steps executed over every `evaluate` call on this context.
    pub total_steps: usize,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::with_natives(NativeRegistry::new())
    }

    pub fn with_natives(natives: NativeRegistry) -> Self {
        EvalContext {
            control: Control::new(),
            stash: Stash::new(),
            environment: Environment::new(),
            natives,
            total_steps: 0,
        }
    }

    /// Queues a whole program.
    pub fn load_program(&mut self, unit: CompilationUnit) {
        self.control
            .push(ControlItem::Node(Node::CompilationUnit(Rc::new(unit))));
    }

    /// Queues a single expression, evaluated in the global frame.
    pub fn load_expression(&mut self, expression: Rc<Expression>) {
        self.control.push(expression.into());
    }

    /// True once control has been drained.
    pub fn is_finished(&self) -> bool {
        self.control.is_empty()
    }

    /// Current value of static field `field` of class `class_name`.
    pub fn static_field(&self, class_name: &str, field: &str) -> Result<Value, EvalError> {
        let class = self.environment.get_class(class_name)?;
        let variable = class
            .own_variable(field)
            .ok_or_else(|| EvalError::UndeclaredVariable(format!("{}.{}", class_name, field)))?;
        let variable = variable.borrow();
        variable
            .value
            .clone()
            .ok_or_else(|| EvalError::UnassignedVariable(variable.name.clone()))
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs until control is empty or `target_step` steps have been taken in this
/// call, then returns the top of the stash. Stopping early leaves the context
/// resumable by another call.
pub fn evaluate(ctx: &mut EvalContext, target_step: usize) -> Result<Option<StashItem>, EvalError> {
    let mut steps = 0;
    while steps < target_step {
        let item = match ctx.control.pop() {
            Some(item) => item,
            None => break,
        };
        trace!(step = ctx.total_steps, "{}", item);
        match item {
            ControlItem::Node(node) => eval_node(ctx, node)?,
            ControlItem::Instr(instr) => instruction::eval_instr(ctx, instr)?,
        }
        steps += 1;
        ctx.total_steps += 1;
    }
    if !ctx.control.is_empty() {
        debug!(
            steps,
            pending = ctx.control.size(),
            "step budget reached before control was drained"
        );
    }
    Ok(ctx.stash.peek().cloned())
}

fn eval_node(ctx: &mut EvalContext, node: Node) -> Result<(), EvalError> {
    match node {
        Node::CompilationUnit(unit) => class::eval_compilation_unit(ctx, &unit),
        Node::Class(decl) => class::eval_class_declaration(ctx, &decl),
        Node::Method(decl) => class::eval_method_declaration(ctx, decl),
        Node::Constructor(decl) => class::eval_constructor_declaration(ctx, decl),
        Node::Field(decl) => class::eval_field_declaration(ctx, &decl),
        Node::Statement(s) => statement::eval_statement(ctx, &s),
        Node::Expression(e) => expression::eval_expression(ctx, &e),
    }
}
