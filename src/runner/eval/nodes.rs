//! Builders for the AST fragments the machine synthesizes: default
//! constructors, implicit `super()`, field initialisation, `return this;`, the
//! `main` call, and the rewrite that qualifies bare method names.

use std::rc::Rc;

use crate::parser::ast::{
    Block, ClassBodyDeclaration, ClassDeclaration, ConstructorDeclaration,
    ExplicitConstructorInvocation, Expression, Literal, LocalVariableDeclaration, Modifier,
    Statement, SwitchCase, SwitchLabel, ThisOrSuper, VariableDeclarator, OBJECT_CLASS,
};
use crate::runner::ds::types::STRING_TYPE;

pub const THIS: &str = "this";
pub const SUPER: &str = "super";
pub const MAIN_METHOD: &str = "main";

pub fn qualified_name(qualifier: &str, name: &str) -> String {
    format!("{}.{}", qualifier, name)
}

pub fn literal(literal: Literal) -> Rc<Expression> {
    Rc::new(Expression::Literal(literal))
}

pub fn name(name: &str) -> Rc<Expression> {
    Rc::new(Expression::Name(name.to_string()))
}

/// `C() {}`
pub fn default_constructor(class_name: &str) -> ConstructorDeclaration {
    ConstructorDeclaration {
        modifiers: vec![Modifier::Public],
        name: class_name.to_string(),
        params: vec![],
        body: Block::default(),
    }
}

/// `super();`
pub fn super_call() -> Rc<Statement> {
    Rc::new(Statement::ExplicitConstructorInvocation(
        ExplicitConstructorInvocation {
            this_or_super: ThisOrSuper::Super,
            arguments: vec![],
        },
    ))
}

/// `this.field = value;`
pub fn field_init(field: &str, value: Rc<Expression>) -> Rc<Statement> {
    Rc::new(Statement::Expression(Rc::new(Expression::Assignment {
        target: qualified_name(THIS, field),
        value,
    })))
}

pub fn return_this() -> Rc<Statement> {
    Rc::new(Statement::Return(Some(name(THIS))))
}

pub fn return_void() -> Rc<Statement> {
    Rc::new(Statement::Return(None))
}

/// `ClassName.main(new String[]{""})`
pub fn main_invocation(class_name: &str) -> Rc<Expression> {
    Rc::new(Expression::MethodInvocation {
        name: qualified_name(class_name, MAIN_METHOD),
        arguments: vec![Rc::new(Expression::ArrayCreation {
            element_type: STRING_TYPE.to_string(),
            elements: vec![literal(Literal::String(String::new()))],
        })],
    })
}

/// The root of every class hierarchy: `class Object { Object() {} }`.
pub fn object_class() -> ClassDeclaration {
    ClassDeclaration {
        modifiers: vec![Modifier::Public],
        name: OBJECT_CLASS.to_string(),
        superclass: None,
        body: vec![ClassBodyDeclaration::Constructor(Rc::new(
            default_constructor(OBJECT_CLASS),
        ))],
    }
}

/// Appends `tail` unless the block already ends with a `return`.
pub fn with_trailing_return(mut statements: Vec<Rc<Statement>>, tail: Rc<Statement>) -> Vec<Rc<Statement>> {
    if !statements.last().map(|s| s.is_return()).unwrap_or(false) {
        statements.push(tail);
    }
    statements
}

/// Rewrites every bare method invocation `m(...)` to `qualifier.m(...)`.
pub fn qualify_statement(statement: &Rc<Statement>, qualifier: &str) -> Rc<Statement> {
    map_statement(statement, &|e| qualify_expression(e, qualifier), &|s| s.clone())
}

pub fn qualify_expression(expression: &Rc<Expression>, qualifier: &str) -> Rc<Expression> {
    let q = |e: &Rc<Expression>| qualify_expression(e, qualifier);
    match expression.as_ref() {
        Expression::MethodInvocation { name, arguments } => {
            let name = if name.contains('.') {
                name.clone()
            } else {
                qualified_name(qualifier, name)
            };
            Rc::new(Expression::MethodInvocation {
                name,
                arguments: arguments.iter().map(q).collect(),
            })
        }
        Expression::Assignment { target, value } => Rc::new(Expression::Assignment {
            target: target.clone(),
            value: q(value),
        }),
        Expression::CompoundAssignment {
            operator,
            target,
            value,
        } => Rc::new(Expression::CompoundAssignment {
            operator: *operator,
            target: target.clone(),
            value: q(value),
        }),
        Expression::Binary {
            operator,
            left,
            right,
        } => Rc::new(Expression::Binary {
            operator: *operator,
            left: q(left),
            right: q(right),
        }),
        Expression::Unary { operator, operand } => Rc::new(Expression::Unary {
            operator: *operator,
            operand: q(operand),
        }),
        Expression::ClassInstanceCreation {
            class_name,
            arguments,
        } => Rc::new(Expression::ClassInstanceCreation {
            class_name: class_name.clone(),
            arguments: arguments.iter().map(q).collect(),
        }),
        Expression::ArrayCreation {
            element_type,
            elements,
        } => Rc::new(Expression::ArrayCreation {
            element_type: element_type.clone(),
            elements: elements.iter().map(q).collect(),
        }),
        Expression::Literal(_)
        | Expression::Name(_)
        | Expression::Increment { .. }
        | Expression::Void => expression.clone(),
    }
}

/// Turns every `return;` into `return this;`, at any depth.
pub fn return_this_everywhere(statement: &Rc<Statement>) -> Rc<Statement> {
    map_statement(statement, &|e| e.clone(), &|s| match s.as_ref() {
        Statement::Return(None) => return_this(),
        _ => s.clone(),
    })
}

/// Rebuilds a statement tree, applying `on_expr` to every top level
/// expression it holds and `on_leaf` to every statement without children.
fn map_statement(
    statement: &Rc<Statement>,
    on_expr: &dyn Fn(&Rc<Expression>) -> Rc<Expression>,
    on_leaf: &dyn Fn(&Rc<Statement>) -> Rc<Statement>,
) -> Rc<Statement> {
    let map = |s: &Rc<Statement>| map_statement(s, on_expr, on_leaf);
    let map_all = |list: &[Rc<Statement>]| list.iter().map(map).collect::<Vec<_>>();
    match statement.as_ref() {
        Statement::Block(block) => Rc::new(Statement::Block(Block {
            statements: map_all(&block.statements),
        })),
        Statement::LocalVariableDeclaration(decl) => {
            Rc::new(Statement::LocalVariableDeclaration(LocalVariableDeclaration {
                local_type: decl.local_type.clone(),
                declarators: decl
                    .declarators
                    .iter()
                    .map(|d| VariableDeclarator {
                        name: d.name.clone(),
                        initializer: d.initializer.as_ref().map(on_expr),
                    })
                    .collect(),
            }))
        }
        Statement::Expression(e) => Rc::new(Statement::Expression(on_expr(e))),
        Statement::Return(Some(e)) => Rc::new(Statement::Return(Some(on_expr(e)))),
        Statement::If {
            condition,
            consequent,
            alternative,
        } => Rc::new(Statement::If {
            condition: on_expr(condition),
            consequent: map(consequent),
            alternative: alternative.as_ref().map(map),
        }),
        Statement::While { condition, body } => Rc::new(Statement::While {
            condition: on_expr(condition),
            body: map(body),
        }),
        Statement::BasicFor {
            init,
            condition,
            update,
            body,
        } => Rc::new(Statement::BasicFor {
            init: map_all(init),
            condition: condition.as_ref().map(on_expr),
            update: map_all(update),
            body: map(body),
        }),
        Statement::Switch {
            discriminant,
            cases,
        } => Rc::new(Statement::Switch {
            discriminant: on_expr(discriminant),
            cases: cases
                .iter()
                .map(|c| SwitchCase {
                    labels: c
                        .labels
                        .iter()
                        .map(|l| match l {
                            SwitchLabel::Case(e) => SwitchLabel::Case(on_expr(e)),
                            SwitchLabel::Default => SwitchLabel::Default,
                        })
                        .collect(),
                    statements: map_all(&c.statements),
                })
                .collect(),
        }),
        Statement::ExplicitConstructorInvocation(inv) => Rc::new(
            Statement::ExplicitConstructorInvocation(ExplicitConstructorInvocation {
                this_or_super: inv.this_or_super,
                arguments: inv.arguments.iter().map(on_expr).collect(),
            }),
        ),
        Statement::Return(None)
        | Statement::Break
        | Statement::Continue
        | Statement::Empty => on_leaf(statement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::BinaryOperator;

    fn call(name: &str) -> Rc<Expression> {
        Rc::new(Expression::MethodInvocation {
            name: name.to_string(),
            arguments: vec![],
        })
    }

    #[test]
    fn test_qualify_nested_calls() {
        let e = Rc::new(Expression::Binary {
            operator: BinaryOperator::Add,
            left: call("f"),
            right: call("other.g"),
        });
        let qualified = qualify_expression(&e, "Main");
        assert_eq!(
            qualified,
            Rc::new(Expression::Binary {
                operator: BinaryOperator::Add,
                left: call("Main.f"),
                right: call("other.g"),
            })
        );
    }

    #[test]
    fn test_qualify_inside_statements() {
        let s = Rc::new(Statement::While {
            condition: call("more"),
            body: Rc::new(Statement::Expression(call("step"))),
        });
        assert_eq!(
            qualify_statement(&s, "this"),
            Rc::new(Statement::While {
                condition: call("this.more"),
                body: Rc::new(Statement::Expression(call("this.step"))),
            })
        );
    }

    #[test]
    fn test_return_this_everywhere() {
        let s = Rc::new(Statement::If {
            condition: literal(Literal::Boolean(true)),
            consequent: return_void(),
            alternative: None,
        });
        match return_this_everywhere(&s).as_ref() {
            Statement::If { consequent, .. } => assert_eq!(consequent, &return_this()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_trailing_return_added_once() {
        let body = with_trailing_return(vec![], return_void());
        assert_eq!(body.len(), 1);
        let body = with_trailing_return(body, return_void());
        assert_eq!(body.len(), 1);
    }
}
