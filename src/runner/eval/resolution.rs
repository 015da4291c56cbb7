//! Static typing of expressions and method/constructor selection.
//!
//! Overloads are chosen from the static type of the qualifier and the static
//! types of the arguments; overrides are then chosen from the runtime class of
//! the receiver. The asymmetry is what makes static methods dispatch on the
//! declared type and instance methods on the object.

use crate::parser::ast::{
    split_qualified, BinaryOperator, Expression, TypeName, UnaryOperator, CONSTRUCTOR_NAME,
};
use crate::runner::ds::class::{Class, ClassRef};
use crate::runner::ds::env::{Binding, Environment};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::types::{
    element_type, is_assignable, is_numeric, literal_type, promote, BOOLEAN_TYPE, STRING_TYPE,
};
use crate::runner::ds::value::{descriptor, ClosureRef};
use crate::runner::eval::nodes::SUPER;

/// Static type of a simple name: the declared type of a variable (never the
/// runtime class of its value), or the class itself for a class name.
pub fn name_type(env: &Environment, name: &str) -> Result<TypeName, EvalError> {
    match env.get_name(name)? {
        Binding::Variable(v) => Ok(v.borrow().declared_type.clone()),
        Binding::Class(c) => Ok(c.name.clone()),
        Binding::Closure(c) => Err(EvalError::TypeMismatch(format!(
            "{} is a method, not a value",
            c.descriptor
        ))),
    }
}

/// Declared type of field `field` reached through a qualifier of static type
/// `owner`.
pub fn field_type(env: &Environment, owner: &str, field: &str) -> Result<TypeName, EvalError> {
    if element_type(owner).is_some() && field == "length" {
        return Ok("int".to_string());
    }
    let class = env.get_class(owner)?;
    Class::find_field(&class, field)
        .map(|info| info.field_type)
        .ok_or_else(|| EvalError::UndeclaredVariable(format!("{}.{}", owner, field)))
}

/// Static type of `expression` in the current environment. Pure: nothing is
/// evaluated.
pub fn static_type(env: &Environment, expression: &Expression) -> Result<TypeName, EvalError> {
    Ok(match expression {
        Expression::Literal(l) => literal_type(l).to_string(),
        Expression::Name(name) => match split_qualified(name) {
            None => name_type(env, name)?,
            Some((qualifier, field)) => {
                let owner = static_type(env, &Expression::Name(qualifier.to_string()))?;
                field_type(env, &owner, field)?
            }
        },
        Expression::Assignment { target, .. }
        | Expression::CompoundAssignment { target, .. }
        | Expression::Increment { target, .. } => {
            static_type(env, &Expression::Name(target.clone()))?
        }
        Expression::Binary {
            operator,
            left,
            right,
        } => {
            let left = static_type(env, left)?;
            let right = static_type(env, right)?;
            binary_type(*operator, &left, &right)?
        }
        Expression::Unary { operator, operand } => {
            let operand = static_type(env, operand)?;
            match operator {
                UnaryOperator::Not => BOOLEAN_TYPE.to_string(),
                _ if is_numeric(&operand) => promote(&operand, "int").to_string(),
                _ => {
                    return Err(EvalError::TypeMismatch(format!(
                        "bad operand type {} for unary operator",
                        operand
                    )))
                }
            }
        }
        Expression::MethodInvocation { name, arguments } => {
            let (qualifier, method) = split_qualified(name)
                .ok_or_else(|| EvalError::UndeclaredMethod(name.to_string()))?;
            let qualifier_type = static_type(env, &Expression::Name(qualifier.to_string()))?;
            let arg_types = arguments
                .iter()
                .map(|a| static_type(env, a))
                .collect::<Result<Vec<_>, _>>()?;
            let closure = resolve_overload(env, &qualifier_type, method, &arg_types)?;
            closure.callable.result_type().to_string()
        }
        Expression::ClassInstanceCreation { class_name, .. } => class_name.clone(),
        Expression::ArrayCreation { element_type, .. } => format!("{}[]", element_type),
        Expression::Void => "void".to_string(),
    })
}

fn binary_type(operator: BinaryOperator, left: &str, right: &str) -> Result<TypeName, EvalError> {
    use BinaryOperator::*;
    Ok(match operator {
        Add if left == STRING_TYPE || right == STRING_TYPE => STRING_TYPE.to_string(),
        Add | Subtract | Multiply | Divide | Remainder => {
            if is_numeric(left) && is_numeric(right) {
                promote(left, right).to_string()
            } else {
                return Err(EvalError::TypeMismatch(format!(
                    "bad operand types {} and {} for binary operator {}",
                    left,
                    right,
                    operator.symbol()
                )));
            }
        }
        _ => BOOLEAN_TYPE.to_string(),
    })
}

/// Applicable candidate: a closure with the declared parameter types it was
/// matched on.
struct Candidate {
    closure: ClosureRef,
    param_types: Vec<TypeName>,
}

fn is_applicable(env: &Environment, param_types: &[TypeName], arg_types: &[TypeName]) -> bool {
    param_types.len() == arg_types.len()
        && param_types
            .iter()
            .zip(arg_types)
            .all(|(p, a)| is_assignable(env, p, a))
}

/// `c` is more specific than `d` when every parameter of `d` accepts the
/// corresponding parameter of `c`.
fn more_specific(env: &Environment, c: &Candidate, d: &Candidate) -> bool {
    is_applicable(env, &d.param_types, &c.param_types)
}

enum Selection {
    One(ClosureRef),
    None,
    Ambiguous,
}

fn select_most_specific(env: &Environment, candidates: Vec<Candidate>) -> Selection {
    if candidates.len() <= 1 {
        return match candidates.into_iter().next() {
            Some(c) => Selection::One(c.closure),
            None => Selection::None,
        };
    }
    let maximal: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| candidates.iter().all(|d| std::ptr::eq(*c, d) || more_specific(env, c, d)))
        .collect();
    if maximal.len() == 1 {
        Selection::One(maximal[0].closure.clone())
    } else {
        Selection::Ambiguous
    }
}

fn call_signature(name: &str, arg_types: &[TypeName]) -> String {
    descriptor(name, arg_types.iter().map(|t| t.as_str()))
}

/// Picks the method `name` applicable to `arg_types`, searching the class
/// named by `qualifier_type` and then its ancestors. A descriptor declared
/// in several classes of the chain counts once, for the closest class.
pub fn resolve_overload(
    env: &Environment,
    qualifier_type: &str,
    name: &str,
    arg_types: &[TypeName],
) -> Result<ClosureRef, EvalError> {
    let class = env.get_class(qualifier_type)?;
    if !Class::has_method_named(&class, name) {
        return Err(EvalError::UndeclaredMethod(format!(
            "{}.{}",
            qualifier_type,
            call_signature(name, arg_types)
        )));
    }
    let mut seen: Vec<String> = vec![];
    let mut candidates = vec![];
    for c in Class::lineage(&class) {
        for method in c.instance_methods.iter().chain(c.static_methods.iter()) {
            if method.name != name || method.params.len() != arg_types.len() {
                continue;
            }
            let param_types: Vec<TypeName> =
                method.params.iter().map(|p| p.param_type.clone()).collect();
            let desc = descriptor(name, param_types.iter().map(|t| t.as_str()));
            if seen.contains(&desc) {
                continue;
            }
            seen.push(desc.clone());
            if !is_applicable(env, &param_types, arg_types) {
                continue;
            }
            let closure = c.own_closure(&desc).ok_or_else(|| {
                EvalError::Internal(format!("{}.{} has no closure", c.name, desc))
            })?;
            candidates.push(Candidate {
                closure,
                param_types,
            });
        }
    }
    match select_most_specific(env, candidates) {
        Selection::One(closure) => Ok(closure),
        Selection::None => Err(EvalError::OverloadResolution(format!(
            "{}.{}",
            qualifier_type,
            call_signature(name, arg_types)
        ))),
        Selection::Ambiguous => Err(EvalError::AmbiguousOverload(format!(
            "{}.{}",
            qualifier_type,
            call_signature(name, arg_types)
        ))),
    }
}

/// Picks one of `class_name`'s own constructors. Constructors are not
/// inherited, so ancestors are not searched.
pub fn resolve_constructor(
    env: &Environment,
    class_name: &str,
    arg_types: &[TypeName],
) -> Result<ClosureRef, EvalError> {
    let class = env.get_class(class_name)?;
    let mut candidates = vec![];
    for constructor in &class.constructors {
        let param_types: Vec<TypeName> = constructor
            .params
            .iter()
            .map(|p| p.param_type.clone())
            .collect();
        if !is_applicable(env, &param_types, arg_types) {
            continue;
        }
        let desc = descriptor(CONSTRUCTOR_NAME, param_types.iter().map(|t| t.as_str()));
        let closure = class.own_closure(&desc).ok_or_else(|| {
            EvalError::Internal(format!("{}.{} has no closure", class.name, desc))
        })?;
        candidates.push(Candidate {
            closure,
            param_types,
        });
    }
    match select_most_specific(env, candidates) {
        Selection::One(closure) => Ok(closure),
        Selection::None => Err(EvalError::ConstructorOverloadResolution(call_signature(
            class_name, arg_types,
        ))),
        Selection::Ambiguous => Err(EvalError::AmbiguousOverload(call_signature(
            class_name, arg_types,
        ))),
    }
}

/// Most derived implementation of `selected` for an object of class
/// `runtime_class`.
pub fn resolve_override(runtime_class: &ClassRef, selected: &ClosureRef) -> ClosureRef {
    Class::lineage(runtime_class)
        .iter()
        .filter_map(|c| c.own_closure(&selected.descriptor))
        .find(|c| !c.callable.is_static())
        .unwrap_or_else(|| selected.clone())
}

/// Whether a qualifier names the receiver through `super`, which must not be
/// re-dispatched.
pub fn is_super_qualifier(qualifier: &str) -> bool {
    qualifier == SUPER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Literal;
    use crate::runner::api::run_program;
    use crate::runner::eval::EvalContext;
    use std::rc::Rc;

    const HIERARCHY: &str = r#"
        class Animal {
            String name() { return "animal"; }
        }
        class Dog extends Animal {
            String name() { return "dog"; }
        }
        class Box {
            Box(int size) { }
            Box(long size) { }
        }
        public class Main {
            static void f(Animal a, Dog d) { }
            static void f(Dog d, Animal a) { }
            static void g(Animal a) { }
            static void g(Dog d) { }
            static void h(long x) { }
            public static void main(String[] args) { }
        }
    "#;

    fn load() -> EvalContext {
        match run_program(HIERARCHY) {
            Ok(ctx) => ctx,
            Err(e) => panic!("{}", e),
        }
    }

    fn types(names: &[&str]) -> Vec<TypeName> {
        names.iter().map(|t| t.to_string()).collect()
    }

    fn selected(env: &Environment, name: &str, args: &[&str]) -> String {
        resolve_overload(env, "Main", name, &types(args))
            .unwrap()
            .descriptor
            .clone()
    }

    #[test]
    fn test_most_specific_overload() {
        let ctx = load();
        let env = &ctx.environment;
        assert_eq!(selected(env, "g", &["Dog"]), "g(Dog)");
        assert_eq!(selected(env, "g", &["Animal"]), "g(Animal)");
        assert_eq!(selected(env, "g", &["null"]), "g(Dog)");
        assert_eq!(selected(env, "h", &["int"]), "h(long)");
    }

    #[test]
    fn test_overload_failures() {
        let ctx = load();
        let env = &ctx.environment;
        assert_eq!(
            resolve_overload(env, "Main", "f", &types(&["Dog", "Dog"])).unwrap_err(),
            EvalError::AmbiguousOverload("Main.f(Dog,Dog)".to_string())
        );
        assert_eq!(
            resolve_overload(env, "Main", "h", &types(&["boolean"])).unwrap_err(),
            EvalError::OverloadResolution("Main.h(boolean)".to_string())
        );
        assert_eq!(
            resolve_overload(env, "Main", "k", &[]).unwrap_err(),
            EvalError::UndeclaredMethod("Main.k()".to_string())
        );
    }

    #[test]
    fn test_override_follows_runtime_class() {
        let ctx = load();
        let env = &ctx.environment;
        let declared = resolve_overload(env, "Animal", "name", &[]).unwrap();
        assert_eq!(declared.class_name, "Animal");
        let dog = env.get_class("Dog").unwrap();
        assert_eq!(resolve_override(&dog, &declared).class_name, "Dog");
        let animal = env.get_class("Animal").unwrap();
        assert!(Rc::ptr_eq(&resolve_override(&animal, &declared), &declared));
    }

    #[test]
    fn test_constructor_selection() {
        let ctx = load();
        let env = &ctx.environment;
        let pick = |args: &[&str]| resolve_constructor(env, "Box", &types(args));
        assert_eq!(pick(&["int"]).unwrap().descriptor, "<init>(int)");
        assert_eq!(pick(&["char"]).unwrap().descriptor, "<init>(int)");
        assert_eq!(pick(&["long"]).unwrap().descriptor, "<init>(long)");
        assert_eq!(
            pick(&["boolean"]).unwrap_err(),
            EvalError::ConstructorOverloadResolution("Box(boolean)".to_string())
        );
    }

    #[test]
    fn test_static_types() {
        let ctx = load();
        let env = &ctx.environment;
        let int = |i| Rc::new(Expression::Literal(Literal::Int(i)));
        let sum = Expression::Binary {
            operator: BinaryOperator::Add,
            left: int(1),
            right: Rc::new(Expression::Literal(Literal::Long(2))),
        };
        assert_eq!(static_type(env, &sum).unwrap(), "long");
        let concat = Expression::Binary {
            operator: BinaryOperator::Add,
            left: Rc::new(Expression::Literal(Literal::String("a".to_string()))),
            right: int(1),
        };
        assert_eq!(static_type(env, &concat).unwrap(), STRING_TYPE);
        let create = Expression::ClassInstanceCreation {
            class_name: "Dog".to_string(),
            arguments: vec![],
        };
        assert_eq!(static_type(env, &create).unwrap(), "Dog");
        let call = Expression::MethodInvocation {
            name: "Main.h".to_string(),
            arguments: vec![int(1)],
        };
        assert_eq!(static_type(env, &call).unwrap(), "void");
        assert_eq!(name_type(env, "Main").unwrap(), "Main");
    }
}
