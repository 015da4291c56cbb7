//! Instruction evaluators, including the invocation protocol.

use std::rc::Rc;

use tracing::debug;

use crate::parser::ast::{split_qualified, BinaryOperator, Expression, Literal, Statement, SwitchCase, SwitchLabel, UnaryOperator};
use crate::runner::ds::class::{Class, ClassRef};
use crate::runner::ds::env::{Binding, BLOCK_ENV};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::operations::{binary_op, unary_op, values_equal};
use crate::runner::ds::types::{
    coerce, default_value, element_type, is_numeric, is_primitive, narrow,
};
use crate::runner::ds::value::{
    ArrayValue, Callable, ClosureRef, StashItem, Value, Variable, VariableRef,
};
use crate::runner::eval::instr::{ControlItem, Instr, MarkerKind};
use crate::runner::eval::interpreter::EvalContext;
use crate::runner::eval::nodes::{self, SUPER, THIS};
use crate::runner::eval::resolution::{
    field_type, is_super_qualifier, name_type, resolve_constructor, resolve_overload,
    resolve_override, static_type,
};
use crate::runner::eval::statement::push_statements;

pub fn eval_instr(ctx: &mut EvalContext, instr: Instr) -> Result<(), EvalError> {
    match instr {
        Instr::Assign => assign(ctx)?,
        Instr::CompoundAssign(operator) => compound_assign(ctx, operator)?,
        Instr::Increment { operator, prefix } => increment(ctx, operator, prefix)?,
        Instr::Load => load(ctx)?,
        Instr::BinOp(operator) => {
            let right = pop_value(ctx)?;
            let left = pop_value(ctx)?;
            ctx.stash.push(binary_op(operator, left, right)?.into());
        }
        Instr::UnOp(operator) => {
            let operand = pop_value(ctx)?;
            ctx.stash.push(unary_op(operator, operand)?.into());
        }
        Instr::Pop => {
            pop_item(ctx)?;
        }
        Instr::EvalVar(name) => eval_var(ctx, &name)?,
        Instr::Deref => deref(ctx)?,
        Instr::Res(field) => res(ctx, &field)?,
        Instr::ArrayLit { element_type, size } => {
            let mut elements = pop_values(ctx, size)?;
            for e in elements.iter_mut() {
                *e = coerce(e.clone(), &element_type)?;
            }
            ctx.stash.push(
                Value::Array(Rc::new(ArrayValue {
                    element_type,
                    elements,
                }))
                .into(),
            );
        }
        Instr::Env(node) => ctx.environment.restore_env(node),
        Instr::Marker(_) => {}
        Instr::Reset(kind) => reset(ctx, kind)?,
        Instr::Branch { on_true, on_false } => match pop_value(ctx)? {
            Value::Boolean(true) => ctx.control.push_all(on_true),
            Value::Boolean(false) => ctx.control.push_all(on_false),
            other => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} cannot be converted to boolean",
                    other.type_name()
                )))
            }
        },
        Instr::WhileIter { condition, body } => {
            let on_true = vec![
                Instr::WhileIter {
                    condition: condition.clone(),
                    body: body.clone(),
                }
                .into(),
                Instr::Env(ctx.environment.current()).into(),
                Instr::Marker(MarkerKind::Continue).into(),
                body.into(),
            ];
            ctx.control.push(
                Instr::Branch {
                    on_true,
                    on_false: vec![],
                }
                .into(),
            );
            ctx.control.push(condition.into());
        }
        Instr::ForIter {
            condition,
            update,
            body,
        } => {
            let mut on_true: Vec<ControlItem> = vec![Instr::ForIter {
                condition: condition.clone(),
                update: update.clone(),
                body: body.clone(),
            }
            .into()];
            on_true.extend(update.iter().rev().map(|s| ControlItem::from(s.clone())));
            on_true.push(Instr::Env(ctx.environment.current()).into());
            on_true.push(Instr::Marker(MarkerKind::Continue).into());
            on_true.push(body.into());
            ctx.control.push(
                Instr::Branch {
                    on_true,
                    on_false: vec![],
                }
                .into(),
            );
            let condition = condition.unwrap_or_else(|| nodes::literal(Literal::Boolean(true)));
            ctx.control.push(condition.into());
        }
        Instr::Switch(cases) => switch(ctx, &cases)?,
        Instr::ResType(expression) => res_type(ctx, expression)?,
        Instr::ResTypeCont(field) => {
            let owner = pop_type(ctx)?;
            let t = field_type(&ctx.environment, &owner, &field)?;
            ctx.stash.push(StashItem::Type(t));
        }
        Instr::ResOverload {
            name,
            arity,
            qualifier,
        } => res_overload(ctx, &name, arity, &qualifier)?,
        Instr::ResOverride => res_override(ctx)?,
        Instr::ResConOverload { class_name, arity } => {
            let arg_types = pop_types(ctx, arity)?;
            let closure = resolve_constructor(&ctx.environment, &class_name, &arg_types)?;
            debug!(constructor = %closure.descriptor, class = %class_name, "constructor resolved");
            ctx.stash.push(StashItem::Closure(closure));
        }
        Instr::New(class_name) => new_object(ctx, &class_name)?,
        Instr::Invocation { arity } => invoke(ctx, arity)?,
    }
    Ok(())
}

// ── Stash helpers ──

fn pop_item(ctx: &mut EvalContext) -> Result<StashItem, EvalError> {
    ctx.stash
        .pop()
        .ok_or_else(|| EvalError::Internal("stash is empty".to_string()))
}

fn pop_value(ctx: &mut EvalContext) -> Result<Value, EvalError> {
    match pop_item(ctx)? {
        StashItem::Value(v) => Ok(v),
        other => Err(EvalError::Internal(format!("expected a value, found {}", other))),
    }
}

/// Pops `n` values, returned in the order they were pushed.
fn pop_values(ctx: &mut EvalContext, n: usize) -> Result<Vec<Value>, EvalError> {
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(pop_value(ctx)?);
    }
    values.reverse();
    Ok(values)
}

fn pop_type(ctx: &mut EvalContext) -> Result<String, EvalError> {
    match pop_item(ctx)? {
        StashItem::Type(t) => Ok(t),
        other => Err(EvalError::Internal(format!("expected a type, found {}", other))),
    }
}

fn pop_types(ctx: &mut EvalContext, n: usize) -> Result<Vec<String>, EvalError> {
    let mut types = Vec::with_capacity(n);
    for _ in 0..n {
        types.push(pop_type(ctx)?);
    }
    types.reverse();
    Ok(types)
}

fn pop_closure(ctx: &mut EvalContext) -> Result<ClosureRef, EvalError> {
    match pop_item(ctx)? {
        StashItem::Closure(c) => Ok(c),
        other => Err(EvalError::Internal(format!("expected a closure, found {}", other))),
    }
}

// ── Variables and fields ──

fn pop_variable(ctx: &mut EvalContext) -> Result<VariableRef, EvalError> {
    match pop_item(ctx)? {
        StashItem::Variable(v) => Ok(v),
        other => Err(EvalError::TypeMismatch(format!("cannot assign to {}", other))),
    }
}

fn current_value(variable: &VariableRef) -> Result<Value, EvalError> {
    let v = variable.borrow();
    let value = match &v.value {
        Some(value) => Ok(value.clone()),
        None => Err(EvalError::UnassignedVariable(v.name.clone())),
    };
    value
}

fn assign(ctx: &mut EvalContext) -> Result<(), EvalError> {
    let value = pop_value(ctx)?;
    let variable = pop_variable(ctx)?;
    let declared_type = variable.borrow().declared_type.clone();
    let value = coerce(value, &declared_type)?;
    variable.borrow_mut().value = Some(value.clone());
    ctx.stash.push(value.into());
    Ok(())
}

/// `x op= v` is `x = (T) (x op v)` with the left operand read before `v`.
fn compound_assign(ctx: &mut EvalContext, operator: BinaryOperator) -> Result<(), EvalError> {
    let value = pop_value(ctx)?;
    let old = pop_value(ctx)?;
    let variable = pop_variable(ctx)?;
    let declared_type = variable.borrow().declared_type.clone();
    let value = narrow(binary_op(operator, old, value)?, &declared_type)?;
    variable.borrow_mut().value = Some(value.clone());
    ctx.stash.push(value.into());
    Ok(())
}

fn increment(ctx: &mut EvalContext, operator: BinaryOperator, prefix: bool) -> Result<(), EvalError> {
    let variable = pop_variable(ctx)?;
    let declared_type = variable.borrow().declared_type.clone();
    if !is_numeric(&declared_type) {
        return Err(EvalError::TypeMismatch(format!(
            "bad operand type {} for {}{}",
            declared_type,
            operator.symbol(),
            operator.symbol()
        )));
    }
    let old = current_value(&variable)?;
    let new = narrow(binary_op(operator, old.clone(), Value::int(1))?, &declared_type)?;
    variable.borrow_mut().value = Some(new.clone());
    ctx.stash.push(if prefix { new } else { old }.into());
    Ok(())
}

fn load(ctx: &mut EvalContext) -> Result<(), EvalError> {
    let value = match ctx.stash.peek() {
        Some(StashItem::Variable(v)) => current_value(v)?,
        Some(other) => return Err(EvalError::TypeMismatch(format!("cannot assign to {}", other))),
        None => return Err(EvalError::Internal("stash is empty".to_string())),
    };
    ctx.stash.push(value.into());
    Ok(())
}

fn eval_var(ctx: &mut EvalContext, name: &str) -> Result<(), EvalError> {
    if let Some((qualifier, field)) = split_qualified(name) {
        ctx.control.push(Instr::Res(field.to_string()).into());
        ctx.control.push(Instr::EvalVar(qualifier.to_string()).into());
        return Ok(());
    }
    let item = match ctx.environment.get_name(name)? {
        Binding::Variable(v) => StashItem::Variable(v),
        Binding::Class(c) => StashItem::Class(c),
        Binding::Closure(c) => {
            return Err(EvalError::TypeMismatch(format!(
                "{} is a method, not a variable",
                c.descriptor
            )))
        }
    };
    ctx.stash.push(item);
    Ok(())
}

fn deref(ctx: &mut EvalContext) -> Result<(), EvalError> {
    let item = match pop_item(ctx)? {
        StashItem::Variable(v) => StashItem::Value(current_value(&v)?),
        other => other,
    };
    ctx.stash.push(item);
    Ok(())
}

/// Static field `field` of `class` or one of its ancestors.
fn static_field(class: &ClassRef, field: &str) -> Result<VariableRef, EvalError> {
    let info = Class::find_field(class, field)
        .ok_or_else(|| EvalError::UndeclaredVariable(format!("{}.{}", class.name, field)))?;
    if !info.is_static {
        return Err(EvalError::TypeMismatch(format!(
            "non-static variable {} cannot be referenced from a static context",
            field
        )));
    }
    info.owner
        .own_variable(field)
        .ok_or_else(|| EvalError::Internal(format!("{}.{} is not bound", info.owner.name, field)))
}

/// Field `field` through a qualifier of static type `declared_type` holding
/// `value`. Static fields resolve on the declared type alone, so a `null`
/// qualifier only faults for instance fields.
fn field_of(
    ctx: &EvalContext,
    qualifier: &str,
    declared_type: &str,
    value: Option<Value>,
    field: &str,
) -> Result<VariableRef, EvalError> {
    if element_type(declared_type).is_some() {
        return match (field, value) {
            ("length", Some(Value::Array(a))) => Ok(Variable::new_ref(
                "length",
                "int",
                Some(Value::int(a.elements.len() as i32)),
            )),
            ("length", Some(Value::Null)) => Err(EvalError::NullPointer(format!(
                "cannot read the array length because {} is null",
                qualifier
            ))),
            ("length", None) => Err(EvalError::UnassignedVariable(qualifier.to_string())),
            _ => Err(EvalError::UndeclaredVariable(format!("{}.{}", qualifier, field))),
        };
    }
    if is_primitive(declared_type) {
        return Err(EvalError::TypeMismatch(format!(
            "{} cannot be dereferenced",
            declared_type
        )));
    }
    let class = ctx.environment.get_class(declared_type)?;
    let info = Class::find_field(&class, field)
        .ok_or_else(|| EvalError::UndeclaredVariable(format!("{}.{}", declared_type, field)))?;
    if info.is_static {
        return static_field(&class, field);
    }
    match value {
        Some(Value::Object(o)) => {
            let binding = o.frame.borrow().frame.get(field);
            match binding {
                Some(Binding::Variable(v)) => Ok(v),
                _ => Err(EvalError::Internal(format!("{} has no field {}", o, field))),
            }
        }
        Some(Value::Null) => Err(EvalError::NullPointer(format!(
            "cannot read field {} because {} is null",
            field, qualifier
        ))),
        Some(other) => Err(EvalError::TypeMismatch(format!(
            "{} cannot be dereferenced",
            other.type_name()
        ))),
        None => Err(EvalError::UnassignedVariable(qualifier.to_string())),
    }
}

fn res(ctx: &mut EvalContext, field: &str) -> Result<(), EvalError> {
    let variable = match pop_item(ctx)? {
        StashItem::Class(class) => static_field(&class, field)?,
        StashItem::Variable(v) => {
            let (name, declared_type, value) = {
                let v = v.borrow();
                (v.name.clone(), v.declared_type.clone(), v.value.clone())
            };
            field_of(ctx, &name, &declared_type, value, field)?
        }
        StashItem::Value(value) => {
            let runtime_type = value.type_name();
            field_of(ctx, &runtime_type, &runtime_type, Some(value), field)?
        }
        other => {
            return Err(EvalError::Internal(format!(
                "cannot resolve field {} on {}",
                field, other
            )))
        }
    };
    ctx.stash.push(StashItem::Variable(variable));
    Ok(())
}

// ── Unwinding and switch ──

fn marker_name(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::Return => "return",
        MarkerKind::Break => "break",
        MarkerKind::Continue => "continue",
    }
}

/// Discards control items up to and including the nearest `Marker(kind)`.
/// `break` and `continue` never cross a method boundary.
fn reset(ctx: &mut EvalContext, kind: MarkerKind) -> Result<(), EvalError> {
    loop {
        match ctx.control.pop() {
            Some(ControlItem::Instr(Instr::Marker(k))) if k == kind => return Ok(()),
            Some(ControlItem::Instr(Instr::Marker(MarkerKind::Return))) | None => {
                return Err(EvalError::MissingMarker(marker_name(kind).to_string()))
            }
            Some(_) => {}
        }
    }
}

/// Value of a `case` label; labels must be constants.
fn case_constant(expression: &Expression) -> Result<Value, EvalError> {
    match expression {
        Expression::Literal(l) => Ok(l.into()),
        Expression::Unary {
            operator: UnaryOperator::Minus,
            operand,
        } => match operand.as_ref() {
            Expression::Literal(l) => unary_op(UnaryOperator::Minus, l.into()),
            _ => Err(EvalError::Unsupported(
                "case labels must be constant expressions".to_string(),
            )),
        },
        _ => Err(EvalError::Unsupported(
            "case labels must be constant expressions".to_string(),
        )),
    }
}

/// Runs the statements of the matching case and every case after it.
fn switch(ctx: &mut EvalContext, cases: &[SwitchCase]) -> Result<(), EvalError> {
    let value = pop_value(ctx)?;
    let mut start = None;
    'cases: for (idx, case) in cases.iter().enumerate() {
        for label in &case.labels {
            if let SwitchLabel::Case(e) = label {
                if values_equal(&case_constant(e)?, &value) {
                    start = Some(idx);
                    break 'cases;
                }
            }
        }
    }
    let start = start.or_else(|| {
        cases
            .iter()
            .position(|c| c.labels.contains(&SwitchLabel::Default))
    });
    if let Some(start) = start {
        let current = ctx.environment.current();
        ctx.environment.extend_env(&current, BLOCK_ENV);
        let statements: Vec<Rc<Statement>> = cases[start..]
            .iter()
            .flat_map(|c| c.statements.iter().cloned())
            .collect();
        push_statements(ctx, &statements);
    }
    Ok(())
}

// ── Dispatch ──

fn res_type(ctx: &mut EvalContext, expression: Rc<Expression>) -> Result<(), EvalError> {
    if let Expression::Name(name) = expression.as_ref() {
        match split_qualified(name) {
            Some((qualifier, field)) => {
                ctx.control.push(Instr::ResTypeCont(field.to_string()).into());
                ctx.control
                    .push(Instr::ResType(nodes::name(qualifier)).into());
            }
            None => {
                let t = name_type(&ctx.environment, name)?;
                ctx.stash.push(StashItem::Type(t));
            }
        }
        return Ok(());
    }
    let t = static_type(&ctx.environment, &expression)?;
    ctx.stash.push(StashItem::Type(t));
    Ok(())
}

/// Selects the overload for `qualifier.name(..arity)` from the static types
/// on the stash. An instance method also needs its receiver: the queued
/// `Invocation` takes one more argument and the qualifier is evaluated again
/// (through `ResOverride`, unless it is `super`).
fn res_overload(ctx: &mut EvalContext, name: &str, arity: usize, qualifier: &str) -> Result<(), EvalError> {
    let arg_types = pop_types(ctx, arity)?;
    let qualifier_type = pop_type(ctx)?;
    let closure = resolve_overload(&ctx.environment, &qualifier_type, name, &arg_types)?;
    debug!(
        method = %closure.descriptor,
        class = %closure.class_name,
        qualifier_type = %qualifier_type,
        "overload resolved"
    );
    let is_static = closure.callable.is_static();
    ctx.stash.push(StashItem::Closure(closure));
    if is_static {
        return Ok(());
    }
    match ctx.control.peek_n_mut(arity) {
        Some(ControlItem::Instr(Instr::Invocation { arity: queued })) => *queued += 1,
        _ => {
            return Err(EvalError::Internal(format!(
                "no pending invocation for {}.{}",
                qualifier, name
            )))
        }
    }
    if !is_super_qualifier(qualifier) {
        ctx.control.push(Instr::ResOverride.into());
    }
    ctx.control.push(nodes::name(qualifier).into());
    Ok(())
}

fn res_override(ctx: &mut EvalContext) -> Result<(), EvalError> {
    let receiver = pop_item(ctx)?;
    let selected = pop_closure(ctx)?;
    let object = match receiver {
        StashItem::Value(Value::Object(o)) => o,
        StashItem::Value(Value::Null) => {
            return Err(EvalError::NullPointer(format!(
                "cannot invoke {}.{} on null",
                selected.class_name, selected.descriptor
            )))
        }
        StashItem::Class(_) => {
            return Err(EvalError::TypeMismatch(format!(
                "non-static method {} cannot be referenced from a static context",
                selected.descriptor
            )))
        }
        other => {
            return Err(EvalError::TypeMismatch(format!(
                "cannot invoke {} on {}",
                selected.descriptor, other
            )))
        }
    };
    let closure = resolve_override(&object.class, &selected);
    if !Rc::ptr_eq(&closure, &selected) {
        debug!(
            method = %selected.descriptor,
            from = %selected.class_name,
            to = %closure.class_name,
            "override selected"
        );
    }
    ctx.stash.push(StashItem::Closure(closure));
    ctx.stash.push(Value::Object(object).into());
    Ok(())
}

/// Creates an object with every declared and inherited instance field set to
/// its type's default.
fn new_object(ctx: &mut EvalContext, class_name: &str) -> Result<(), EvalError> {
    let class = ctx.environment.get_class(class_name)?;
    let previous = ctx.environment.current();
    let object = ctx.environment.create_obj(&class);
    let mut fields = Ok(());
    'classes: for c in Class::lineage(&class) {
        for field in &c.instance_fields {
            for d in &field.declarators {
                if let Err(e) = ctx.environment.define_variable(
                    &d.name,
                    &field.field_type,
                    default_value(&field.field_type),
                ) {
                    fields = Err(e);
                    break 'classes;
                }
            }
        }
    }
    ctx.environment.restore_env(previous);
    fields?;
    ctx.stash.push(Value::Object(object).into());
    Ok(())
}

/// Pops the arguments and the closure, then sets up the call: restore point,
/// return marker, a fresh frame over the class (static) or the receiver
/// (instance), implicit `this`/`super`, parameters, and the body.
fn invoke(ctx: &mut EvalContext, arity: usize) -> Result<(), EvalError> {
    let args = pop_values(ctx, arity)?;
    let closure = pop_closure(ctx)?;
    let params = closure.callable.params();
    let is_static = closure.callable.is_static();
    let expected = params.len() + if is_static { 0 } else { 1 };
    if args.len() != expected {
        return Err(EvalError::Internal(format!(
            "{}.{} expects {} arguments, got {}",
            closure.class_name,
            closure.descriptor,
            expected,
            args.len()
        )));
    }
    debug!(method = %closure.descriptor, class = %closure.class_name, "invoke");

    ctx.control.push(Instr::Env(ctx.environment.current()).into());
    ctx.control.push(Instr::Marker(MarkerKind::Return).into());

    let mut args = args.into_iter();
    let receiver = if is_static {
        None
    } else {
        match args.next() {
            Some(Value::Object(o)) => Some(o),
            Some(Value::Null) => {
                return Err(EvalError::NullPointer(format!(
                    "cannot invoke {}.{} on null",
                    closure.class_name, closure.descriptor
                )))
            }
            other => {
                return Err(EvalError::Internal(format!(
                    "bad receiver for {}: {:?}",
                    closure.descriptor, other
                )))
            }
        }
    };
    let base = match &receiver {
        Some(o) => o.frame.clone(),
        None => closure.env.clone(),
    };
    ctx.environment.extend_env(&base, closure.callable.name());

    // Implicit parameters go ahead of the declared ones.
    if let Some(receiver) = receiver {
        ctx.environment
            .define_variable(THIS, &closure.class_name, Value::Object(receiver.clone()))?;
        let class = ctx.environment.get_class(&closure.class_name)?;
        if let Some(superclass) = &class.superclass {
            ctx.environment
                .define_variable(SUPER, &superclass.name, Value::Object(receiver))?;
        }
    }
    for (param, value) in params.iter().zip(args) {
        let value = coerce(value, &param.param_type)?;
        ctx.environment
            .define_variable(&param.name, &param.param_type, value)?;
    }

    match &closure.callable {
        Callable::Method(m) if m.is_native() => {
            ctx.control.push(Instr::Reset(MarkerKind::Return).into());
            let descriptor = closure.native_descriptor();
            let native = ctx
                .natives
                .get(&descriptor)
                .ok_or_else(|| EvalError::NativeNotFound(descriptor.clone()))?;
            native.call(&mut ctx.control, &mut ctx.stash, &mut ctx.environment)?;
        }
        Callable::Method(m) => match &m.body {
            Some(body) => ctx
                .control
                .push(Rc::new(Statement::Block(body.clone())).into()),
            None => {
                return Err(EvalError::Unsupported(format!(
                    "{}.{} has no body",
                    closure.class_name, closure.descriptor
                )))
            }
        },
        Callable::Constructor(c) => ctx
            .control
            .push(Rc::new(Statement::Block(c.body.clone())).into()),
    }
    Ok(())
}
