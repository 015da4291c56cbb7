//! Program entry and one-time class elaboration.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::parser::ast::{
    Block, ClassBodyDeclaration, ClassDeclaration, CompilationUnit, ConstructorDeclaration,
    FieldDeclaration, MethodDeclaration, Modifier, Statement, ThisOrSuper, VOID_TYPE,
    OBJECT_CLASS,
};
use crate::runner::ds::class::Class;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::types::default_literal;
use crate::runner::ds::value::{Callable, Closure};
use crate::runner::eval::instr::{ControlItem, Instr, Node};
use crate::runner::eval::interpreter::EvalContext;
use crate::runner::eval::nodes::{self, MAIN_METHOD, THIS};
use crate::runner::eval::statement;

fn is_main_method(method: &MethodDeclaration) -> bool {
    method.name == MAIN_METHOD
        && method.modifiers.contains(&Modifier::Public)
        && method.is_static()
        && method.result_type == VOID_TYPE
        && method.params.len() == 1
        && method.params[0].param_type == "String[]"
}

fn declares_main(class: &ClassDeclaration) -> bool {
    class.body.iter().any(|member| match member {
        ClassBodyDeclaration::Method(m) => is_main_method(m),
        _ => false,
    })
}

/// Program order, except that a class declared in the unit always follows
/// its superclass.
fn superclasses_first(
    classes: &[Rc<ClassDeclaration>],
) -> Result<Vec<Rc<ClassDeclaration>>, EvalError> {
    let index: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();
    let mut placed = vec![false; classes.len()];
    let mut ordered = Vec::with_capacity(classes.len());
    for start in 0..classes.len() {
        let mut chain = vec![];
        let mut next = Some(start);
        while let Some(i) = next {
            if placed[i] {
                break;
            }
            if chain.contains(&i) {
                return Err(EvalError::CyclicInheritance(classes[i].name.clone()));
            }
            chain.push(i);
            next = classes[i]
                .superclass
                .as_deref()
                .and_then(|s| index.get(s))
                .copied();
        }
        for i in chain.into_iter().rev() {
            placed[i] = true;
            ordered.push(classes[i].clone());
        }
    }
    Ok(ordered)
}

/// Queues the `main` call of the first class declaring it, then every class
/// so each elaborates after its superclass, with `Object` first.
pub fn eval_compilation_unit(ctx: &mut EvalContext, unit: &CompilationUnit) -> Result<(), EvalError> {
    let main_class = unit
        .classes
        .iter()
        .find(|c| declares_main(c))
        .ok_or(EvalError::NoMainMethod)?;
    debug!(class = %main_class.name, "entry point");
    let classes = superclasses_first(&unit.classes)?;
    ctx.control.push(nodes::main_invocation(&main_class.name).into());
    ctx.control.push_all(
        classes
            .into_iter()
            .rev()
            .map(|c| ControlItem::Node(Node::Class(c))),
    );
    if !unit.classes.iter().any(|c| c.name == OBJECT_CLASS) {
        ctx.control
            .push(ControlItem::Node(Node::Class(Rc::new(nodes::object_class()))));
    }
    Ok(())
}

/// Field initialisation prologue for a constructor of `fields`' class.
fn field_initializers(fields: &[Rc<FieldDeclaration>]) -> Vec<Rc<Statement>> {
    fields
        .iter()
        .flat_map(|f| {
            f.declarators.iter().map(move |d| {
                let value = match &d.initializer {
                    Some(init) => init.clone(),
                    None => nodes::literal(default_literal(&f.field_type)),
                };
                nodes::field_init(&d.name, value)
            })
        })
        .collect()
}

/// Rebuilds a constructor body in Java order: an explicit or implicit
/// superclass constructor call, this class's field initialisers, the body,
/// and `return this;` on every exit.
fn elaborate_constructor(
    constructor: &ConstructorDeclaration,
    fields: &[Rc<FieldDeclaration>],
    has_superclass: bool,
) -> ConstructorDeclaration {
    let body = &constructor.body.statements;
    let mut statements: Vec<Rc<Statement>> = vec![];
    let (explicit, rest) = match body.first().map(|s| s.as_ref()) {
        Some(Statement::ExplicitConstructorInvocation(inv)) => {
            statements.push(body[0].clone());
            (Some(inv.this_or_super), &body[1..])
        }
        _ => {
            if has_superclass {
                statements.push(nodes::super_call());
            }
            (None, &body[..])
        }
    };
    if explicit != Some(ThisOrSuper::This) {
        statements.extend(field_initializers(fields));
    }
    statements.extend(rest.iter().cloned());
    let statements = statements
        .iter()
        .map(|s| nodes::return_this_everywhere(&nodes::qualify_statement(s, THIS)))
        .collect();
    ConstructorDeclaration {
        modifiers: constructor.modifiers.clone(),
        name: constructor.name.clone(),
        params: constructor.params.clone(),
        body: Block {
            statements: nodes::with_trailing_return(statements, nodes::return_this()),
        },
    }
}

/// Qualifies bare calls (`this.m` in instance methods, `C.m` in static ones)
/// and makes sure the body ends in a `return`.
fn elaborate_method(method: &MethodDeclaration, class_name: &str) -> MethodDeclaration {
    let qualifier = if method.is_static() { class_name } else { THIS };
    let body = method.body.as_ref().map(|body| {
        let statements = body
            .statements
            .iter()
            .map(|s| nodes::qualify_statement(s, qualifier))
            .collect();
        Block {
            statements: nodes::with_trailing_return(statements, nodes::return_void()),
        }
    });
    MethodDeclaration {
        modifiers: method.modifiers.clone(),
        result_type: method.result_type.clone(),
        name: method.name.clone(),
        params: method.params.clone(),
        body,
    }
}

fn elaborate_static_field(field: &FieldDeclaration, class_name: &str) -> FieldDeclaration {
    let mut field = field.clone();
    for d in field.declarators.iter_mut() {
        d.initializer = d
            .initializer
            .as_ref()
            .map(|init| nodes::qualify_expression(init, class_name));
    }
    field
}

pub fn eval_class_declaration(ctx: &mut EvalContext, decl: &ClassDeclaration) -> Result<(), EvalError> {
    let name = decl.name.as_str();
    let mut instance_fields = vec![];
    let mut static_fields = vec![];
    let mut instance_methods = vec![];
    let mut static_methods = vec![];
    let mut declared_constructors = vec![];
    for member in &decl.body {
        match member {
            ClassBodyDeclaration::Field(f) if f.is_static() => {
                static_fields.push(Rc::new(elaborate_static_field(f, name)))
            }
            ClassBodyDeclaration::Field(f) => instance_fields.push(f.clone()),
            ClassBodyDeclaration::Method(m) if m.is_static() => {
                static_methods.push(Rc::new(elaborate_method(m, name)))
            }
            ClassBodyDeclaration::Method(m) => {
                instance_methods.push(Rc::new(elaborate_method(m, name)))
            }
            ClassBodyDeclaration::Constructor(c) => declared_constructors.push(c.clone()),
        }
    }
    if declared_constructors.is_empty() {
        declared_constructors.push(Rc::new(nodes::default_constructor(name)));
    }

    let superclass = match &decl.superclass {
        Some(s) => Some(ctx.environment.get_class(s)?),
        None if name != OBJECT_CLASS => Some(ctx.environment.get_class(OBJECT_CLASS)?),
        None => None,
    };
    let constructors: Vec<Rc<ConstructorDeclaration>> = declared_constructors
        .iter()
        .map(|c| Rc::new(elaborate_constructor(c, &instance_fields, superclass.is_some())))
        .collect();

    let previous = ctx.environment.current();
    let parent = match &superclass {
        Some(s) => s.frame.clone(),
        None => ctx.environment.global(),
    };
    let frame = ctx.environment.extend_env(&parent, name);
    let class = Rc::new(Class {
        name: name.to_string(),
        frame,
        constructors: constructors.clone(),
        instance_fields,
        instance_methods: instance_methods.clone(),
        static_fields: static_fields.clone(),
        static_methods: static_methods.clone(),
        superclass,
    });
    ctx.environment.define_class(name, class)?;
    debug!(
        class = name,
        superclass = ?decl.superclass,
        constructors = constructors.len(),
        methods = instance_methods.len() + static_methods.len(),
        "class elaborated"
    );

    // Runs as: instance methods, static methods, constructors, static field
    // initialisers, then back to the previous environment.
    ctx.control.push(Instr::Env(previous).into());
    ctx.control.push_all(
        static_fields
            .into_iter()
            .rev()
            .map(|f| ControlItem::Node(Node::Field(f))),
    );
    ctx.control.push_all(
        constructors
            .into_iter()
            .map(|c| ControlItem::Node(Node::Constructor(c))),
    );
    ctx.control.push_all(
        static_methods
            .into_iter()
            .map(|m| ControlItem::Node(Node::Method(m))),
    );
    ctx.control.push_all(
        instance_methods
            .into_iter()
            .map(|m| ControlItem::Node(Node::Method(m))),
    );
    Ok(())
}

/// Binds a closure over the current class frame.
fn define_closure(ctx: &mut EvalContext, callable: Callable) -> Result<(), EvalError> {
    let descriptor = callable.descriptor();
    let closure = Rc::new(Closure {
        env: ctx.environment.current(),
        class_name: ctx.environment.current_name(),
        descriptor: descriptor.clone(),
        callable,
    });
    ctx.environment.define_mtd_or_con(&descriptor, closure)
}

pub fn eval_method_declaration(ctx: &mut EvalContext, decl: Rc<MethodDeclaration>) -> Result<(), EvalError> {
    define_closure(ctx, Callable::Method(decl))
}

pub fn eval_constructor_declaration(
    ctx: &mut EvalContext,
    decl: Rc<ConstructorDeclaration>,
) -> Result<(), EvalError> {
    define_closure(ctx, Callable::Constructor(decl))
}

/// Static fields only; instance fields are set up by `New` and the
/// constructor prologues.
pub fn eval_field_declaration(ctx: &mut EvalContext, decl: &FieldDeclaration) -> Result<(), EvalError> {
    if decl.declarators.len() > 1 {
        let split: Vec<ControlItem> = decl
            .declarators
            .iter()
            .rev()
            .map(|d| {
                let mut single = decl.clone();
                single.declarators = vec![d.clone()];
                ControlItem::Node(Node::Field(Rc::new(single)))
            })
            .collect();
        ctx.control.push_all(split);
        return Ok(());
    }
    for declarator in &decl.declarators {
        statement::declare(
            ctx,
            &decl.field_type,
            declarator,
            Some(default_literal(&decl.field_type)),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::JavaParser;

    fn order(source: &str) -> Result<Vec<String>, EvalError> {
        let unit = JavaParser::parse_compilation_unit(source).unwrap();
        superclasses_first(&unit.classes).map(|cs| cs.iter().map(|c| c.name.clone()).collect())
    }

    #[test]
    fn test_superclasses_move_ahead() {
        assert_eq!(
            order("class C extends B { } class M { } class B extends A { } class A { }").unwrap(),
            vec!["A", "B", "C", "M"]
        );
        assert_eq!(
            order("class A { } class B extends Missing { } class C extends A { }").unwrap(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_cycles_are_rejected() {
        assert_eq!(
            order("class A extends B { } class B extends A { }"),
            Err(EvalError::CyclicInheritance("A".to_string()))
        );
        assert!(order("class S extends S { }").is_err());
    }
}
