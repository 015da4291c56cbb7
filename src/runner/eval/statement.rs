//! Statement evaluators. Each handler only pushes work; nothing here recurses
//! into sub-statements directly.

use std::rc::Rc;

use tracing::trace;

use crate::parser::ast::{
    Expression, Literal, LocalVariableDeclaration, Statement, ThisOrSuper, VariableDeclarator,
    ExplicitConstructorInvocation,
};
use crate::runner::ds::env::BLOCK_ENV;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::StashItem;
use crate::runner::eval::instr::{ControlItem, Instr, MarkerKind};
use crate::runner::eval::interpreter::EvalContext;
use crate::runner::eval::nodes::{self, SUPER, THIS};

pub fn eval_statement(ctx: &mut EvalContext, statement: &Rc<Statement>) -> Result<(), EvalError> {
    match statement.as_ref() {
        Statement::Block(block) => {
            let current = ctx.environment.current();
            ctx.control.push(Instr::Env(current.clone()).into());
            ctx.environment.extend_env(&current, BLOCK_ENV);
            push_statements(ctx, &block.statements);
        }
        Statement::LocalVariableDeclaration(decl) => eval_local_variable_declaration(ctx, decl)?,
        Statement::Expression(e) => {
            ctx.control.push(Instr::Pop.into());
            ctx.control.push(e.clone().into());
        }
        Statement::Return(e) => {
            ctx.control.push(Instr::Reset(MarkerKind::Return).into());
            let e = e.clone().unwrap_or_else(|| Rc::new(Expression::Void));
            ctx.control.push(e.into());
        }
        Statement::If {
            condition,
            consequent,
            alternative,
        } => {
            ctx.control.push(
                Instr::Branch {
                    on_true: vec![consequent.clone().into()],
                    on_false: alternative.iter().map(|s| s.clone().into()).collect(),
                }
                .into(),
            );
            ctx.control.push(condition.clone().into());
        }
        Statement::While { condition, body } => {
            ctx.control
                .push(Instr::Env(ctx.environment.current()).into());
            ctx.control.push(Instr::Marker(MarkerKind::Break).into());
            ctx.control.push(
                Instr::WhileIter {
                    condition: condition.clone(),
                    body: body.clone(),
                }
                .into(),
            );
        }
        Statement::BasicFor {
            init,
            condition,
            update,
            body,
        } => {
            let current = ctx.environment.current();
            ctx.control.push(Instr::Env(current.clone()).into());
            ctx.environment.extend_env(&current, "for");
            ctx.control.push(Instr::Marker(MarkerKind::Break).into());
            ctx.control.push(
                Instr::ForIter {
                    condition: condition.clone(),
                    update: update.clone(),
                    body: body.clone(),
                }
                .into(),
            );
            push_statements(ctx, init);
        }
        Statement::Switch {
            discriminant,
            cases,
        } => {
            ctx.control
                .push(Instr::Env(ctx.environment.current()).into());
            ctx.control.push(Instr::Marker(MarkerKind::Break).into());
            ctx.control.push(Instr::Switch(cases.clone()).into());
            ctx.control.push(discriminant.clone().into());
        }
        Statement::Break => ctx.control.push(Instr::Reset(MarkerKind::Break).into()),
        Statement::Continue => ctx.control.push(Instr::Reset(MarkerKind::Continue).into()),
        Statement::Empty => {}
        Statement::ExplicitConstructorInvocation(inv) => {
            eval_explicit_constructor_invocation(ctx, inv)?
        }
    }
    Ok(())
}

/// Pushes statements so the first one runs next.
pub fn push_statements(ctx: &mut EvalContext, statements: &[Rc<Statement>]) {
    ctx.control
        .push_all(statements.iter().rev().map(|s| ControlItem::from(s.clone())));
}

fn eval_local_variable_declaration(
    ctx: &mut EvalContext,
    decl: &LocalVariableDeclaration,
) -> Result<(), EvalError> {
    if decl.declarators.len() > 1 {
        // `int a = 1, b = a;` runs as one declaration per declarator.
        let split: Vec<ControlItem> = decl
            .declarators
            .iter()
            .rev()
            .map(|d| {
                Rc::new(Statement::LocalVariableDeclaration(LocalVariableDeclaration {
                    local_type: decl.local_type.clone(),
                    declarators: vec![d.clone()],
                }))
                .into()
            })
            .collect();
        ctx.control.push_all(split);
        return Ok(());
    }
    for declarator in &decl.declarators {
        declare(ctx, &decl.local_type, declarator, None)?;
    }
    Ok(())
}

/// Declares one variable in the current frame. With an initializer, the
/// variable goes on the stash and an assignment is queued; otherwise it gets
/// `default`, or stays unassigned when there is none.
pub fn declare(
    ctx: &mut EvalContext,
    declared_type: &str,
    declarator: &VariableDeclarator,
    default: Option<Literal>,
) -> Result<(), EvalError> {
    match (&declarator.initializer, default) {
        (Some(init), _) => {
            let variable = ctx
                .environment
                .declare_variable(&declarator.name, declared_type)?;
            ctx.stash.push(StashItem::Variable(variable));
            ctx.control.push(Instr::Pop.into());
            ctx.control.push(Instr::Assign.into());
            ctx.control.push(init.clone().into());
        }
        (None, Some(default)) => {
            ctx.environment.define_variable(
                &declarator.name,
                declared_type,
                (&default).into(),
            )?;
        }
        (None, None) => {
            ctx.environment
                .declare_variable(&declarator.name, declared_type)?;
        }
    }
    trace!(name = %declarator.name, declared_type, "declared");
    Ok(())
}

/// `this(...)` or `super(...)` on the object under construction: resolve the
/// constructor, evaluate the receiver and the arguments, invoke, and drop the
/// returned object.
fn eval_explicit_constructor_invocation(
    ctx: &mut EvalContext,
    inv: &ExplicitConstructorInvocation,
) -> Result<(), EvalError> {
    let receiver = match inv.this_or_super {
        ThisOrSuper::This => THIS,
        ThisOrSuper::Super => SUPER,
    };
    let class_name = ctx
        .environment
        .get_variable(receiver)?
        .borrow()
        .declared_type
        .clone();
    let arity = inv.arguments.len();
    ctx.control.push(Instr::Pop.into());
    ctx.control.push(Instr::Invocation { arity: arity + 1 }.into());
    ctx.control
        .push_all(inv.arguments.iter().rev().map(|a| ControlItem::from(a.clone())));
    ctx.control.push(nodes::name(receiver).into());
    ctx.control.push(Instr::ResConOverload { class_name, arity }.into());
    ctx.control.push_all(
        inv.arguments
            .iter()
            .rev()
            .map(|a| ControlItem::from(Instr::ResType(a.clone()))),
    );
    Ok(())
}
