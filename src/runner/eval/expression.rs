//! Expression evaluators.

use std::rc::Rc;

use crate::parser::ast::{split_qualified, BinaryOperator, Expression, Literal};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{StashItem, Value};
use crate::runner::eval::instr::{ControlItem, Instr};
use crate::runner::eval::interpreter::EvalContext;
use crate::runner::eval::nodes;

pub fn eval_expression(ctx: &mut EvalContext, expression: &Rc<Expression>) -> Result<(), EvalError> {
    match expression.as_ref() {
        Expression::Literal(l) => ctx.stash.push(StashItem::Value(l.into())),
        Expression::Void => ctx.stash.push(StashItem::Value(Value::Void)),
        Expression::Name(name) => {
            ctx.control.push(Instr::Deref.into());
            ctx.control.push(Instr::EvalVar(name.clone()).into());
        }
        Expression::Assignment { target, value } => {
            ctx.control.push(Instr::Assign.into());
            ctx.control.push(value.clone().into());
            ctx.control.push(Instr::EvalVar(target.clone()).into());
        }
        Expression::CompoundAssignment {
            operator,
            target,
            value,
        } => {
            ctx.control.push(Instr::CompoundAssign(*operator).into());
            ctx.control.push(value.clone().into());
            ctx.control.push(Instr::Load.into());
            ctx.control.push(Instr::EvalVar(target.clone()).into());
        }
        Expression::Increment {
            operator,
            target,
            prefix,
        } => {
            ctx.control.push(
                Instr::Increment {
                    operator: *operator,
                    prefix: *prefix,
                }
                .into(),
            );
            ctx.control.push(Instr::EvalVar(target.clone()).into());
        }
        Expression::Binary {
            operator: BinaryOperator::ConditionalAnd,
            left,
            right,
        } => {
            ctx.control.push(
                Instr::Branch {
                    on_true: vec![right.clone().into()],
                    on_false: vec![nodes::literal(Literal::Boolean(false)).into()],
                }
                .into(),
            );
            ctx.control.push(left.clone().into());
        }
        Expression::Binary {
            operator: BinaryOperator::ConditionalOr,
            left,
            right,
        } => {
            ctx.control.push(
                Instr::Branch {
                    on_true: vec![nodes::literal(Literal::Boolean(true)).into()],
                    on_false: vec![right.clone().into()],
                }
                .into(),
            );
            ctx.control.push(left.clone().into());
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => {
            ctx.control.push(Instr::BinOp(*operator).into());
            ctx.control.push(right.clone().into());
            ctx.control.push(left.clone().into());
        }
        Expression::Unary { operator, operand } => {
            ctx.control.push(Instr::UnOp(*operator).into());
            ctx.control.push(operand.clone().into());
        }
        Expression::MethodInvocation { name, arguments } => {
            eval_method_invocation(ctx, name, arguments)?
        }
        Expression::ClassInstanceCreation {
            class_name,
            arguments,
        } => {
            let arity = arguments.len();
            ctx.control.push(Instr::Invocation { arity: arity + 1 }.into());
            push_arguments(ctx, arguments);
            ctx.control.push(Instr::New(class_name.clone()).into());
            ctx.control.push(
                Instr::ResConOverload {
                    class_name: class_name.clone(),
                    arity,
                }
                .into(),
            );
            push_arg_types(ctx, arguments);
        }
        Expression::ArrayCreation {
            element_type,
            elements,
        } => {
            ctx.control.push(
                Instr::ArrayLit {
                    element_type: element_type.clone(),
                    size: elements.len(),
                }
                .into(),
            );
            push_arguments(ctx, elements);
        }
    }
    Ok(())
}

/// `q.m(a1..an)`: type the qualifier and each argument, pick an overload,
/// then evaluate the arguments and invoke. `ResOverload` adds the receiver
/// when the chosen method is an instance method.
fn eval_method_invocation(
    ctx: &mut EvalContext,
    name: &str,
    arguments: &[Rc<Expression>],
) -> Result<(), EvalError> {
    let (qualifier, method) = split_qualified(name).ok_or_else(|| {
        EvalError::Unsupported(format!("unqualified call to {} outside of a class", name))
    })?;
    let arity = arguments.len();
    ctx.control.push(Instr::Invocation { arity }.into());
    push_arguments(ctx, arguments);
    ctx.control.push(
        Instr::ResOverload {
            name: method.to_string(),
            arity,
            qualifier: qualifier.to_string(),
        }
        .into(),
    );
    push_arg_types(ctx, arguments);
    ctx.control
        .push(Instr::ResType(nodes::name(qualifier)).into());
    Ok(())
}

fn push_arguments(ctx: &mut EvalContext, arguments: &[Rc<Expression>]) {
    ctx.control
        .push_all(arguments.iter().rev().map(|a| ControlItem::from(a.clone())));
}

fn push_arg_types(ctx: &mut EvalContext, arguments: &[Rc<Expression>]) {
    ctx.control.push_all(
        arguments
            .iter()
            .rev()
            .map(|a| ControlItem::from(Instr::ResType(a.clone()))),
    );
}
