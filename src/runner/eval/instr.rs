//! Control items: AST nodes waiting to be evaluated and the synthetic
//! instructions the evaluators push around them.

use std::fmt;
use std::rc::Rc;

use crate::parser::ast::{
    BinaryOperator, ClassDeclaration, CompilationUnit, ConstructorDeclaration, Expression,
    FieldDeclaration, MethodDeclaration, Statement, SwitchCase, TypeName, UnaryOperator,
};
use crate::runner::ds::env::EnvNodeRef;
use crate::runner::ds::stack::Stack;

pub type Control = Stack<ControlItem>;

#[derive(Debug, Clone)]
pub enum Node {
    CompilationUnit(Rc<CompilationUnit>),
    Class(Rc<ClassDeclaration>),
    Method(Rc<MethodDeclaration>),
    Constructor(Rc<ConstructorDeclaration>),
    Field(Rc<FieldDeclaration>),
    Statement(Rc<Statement>),
    Expression(Rc<Expression>),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::CompilationUnit(_) => "CompilationUnit",
            Node::Class(_) => "NormalClassDeclaration",
            Node::Method(_) => "MethodDeclaration",
            Node::Constructor(_) => "ConstructorDeclaration",
            Node::Field(_) => "FieldDeclaration",
            Node::Statement(s) => s.kind(),
            Node::Expression(e) => e.kind(),
        }
    }
}

/// The construct a `Marker` delimits and a `Reset` unwinds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub enum Instr {
    // ── Values and variables ──
    /// Pops a value and a variable, stores, pushes the value back.
    Assign,
    /// Pops a value, the variable's old value and the variable; stores the
    /// result of the operator narrowed to the declared type.
    CompoundAssign(BinaryOperator),
    /// Pops a variable, steps it by one, pushes the new or the old value.
    Increment {
        operator: BinaryOperator,
        prefix: bool,
    },
    /// Pushes the value of the variable on top of the stash, keeping the
    /// variable.
    Load,
    BinOp(BinaryOperator),
    UnOp(UnaryOperator),
    Pop,
    /// Pushes the variable (or class) a name refers to.
    EvalVar(String),
    /// Replaces a variable on the stash with its value.
    Deref,
    /// Pops a qualifier (variable or class), pushes its field `name`.
    Res(String),
    ArrayLit {
        element_type: TypeName,
        size: usize,
    },

    // ── Scopes and unwinding ──
    Env(EnvNodeRef),
    Marker(MarkerKind),
    Reset(MarkerKind),

    // ── Control flow ──
    /// Pops a boolean and pushes one of the two item lists.
    Branch {
        on_true: Vec<ControlItem>,
        on_false: Vec<ControlItem>,
    },
    WhileIter {
        condition: Rc<Expression>,
        body: Rc<Statement>,
    },
    ForIter {
        condition: Option<Rc<Expression>>,
        update: Vec<Rc<Statement>>,
        body: Rc<Statement>,
    },
    Switch(Vec<SwitchCase>),

    // ── Method and constructor dispatch ──
    /// Pushes the static type of an expression.
    ResType(Rc<Expression>),
    /// Pops a type, pushes the declared type of its field `name`.
    ResTypeCont(String),
    ResOverload {
        name: String,
        arity: usize,
        qualifier: String,
    },
    ResOverride,
    ResConOverload {
        class_name: String,
        arity: usize,
    },
    New(String),
    Invocation {
        arity: usize,
    },
}

impl Instr {
    pub fn kind(&self) -> &'static str {
        match self {
            Instr::Assign => "Assign",
            Instr::CompoundAssign(_) => "CompoundAssign",
            Instr::Increment { .. } => "Increment",
            Instr::Load => "Load",
            Instr::BinOp(_) => "BinOp",
            Instr::UnOp(_) => "UnOp",
            Instr::Pop => "Pop",
            Instr::EvalVar(_) => "EvalVar",
            Instr::Deref => "Deref",
            Instr::Res(_) => "Res",
            Instr::ArrayLit { .. } => "ArrayLit",
            Instr::Env(_) => "Env",
            Instr::Marker(_) => "Marker",
            Instr::Reset(_) => "Reset",
            Instr::Branch { .. } => "Branch",
            Instr::WhileIter { .. } => "WhileIter",
            Instr::ForIter { .. } => "ForIter",
            Instr::Switch(_) => "Switch",
            Instr::ResType(_) => "ResType",
            Instr::ResTypeCont(_) => "ResTypeCont",
            Instr::ResOverload { .. } => "ResOverload",
            Instr::ResOverride => "ResOverride",
            Instr::ResConOverload { .. } => "ResConOverload",
            Instr::New(_) => "New",
            Instr::Invocation { .. } => "Invocation",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ControlItem {
    Node(Node),
    Instr(Instr),
}

impl From<Instr> for ControlItem {
    fn from(instr: Instr) -> Self {
        ControlItem::Instr(instr)
    }
}

impl From<Node> for ControlItem {
    fn from(node: Node) -> Self {
        ControlItem::Node(node)
    }
}

impl From<Rc<Statement>> for ControlItem {
    fn from(statement: Rc<Statement>) -> Self {
        ControlItem::Node(Node::Statement(statement))
    }
}

impl From<Rc<Expression>> for ControlItem {
    fn from(expression: Rc<Expression>) -> Self {
        ControlItem::Node(Node::Expression(expression))
    }
}

impl fmt::Display for ControlItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlItem::Node(node) => match node {
                Node::Class(c) => write!(f, "{} {}", node.kind(), c.name),
                Node::Method(m) => write!(f, "{} {}", node.kind(), m.name),
                Node::Expression(e) => match e.as_ref() {
                    Expression::Name(n) => write!(f, "{} {}", node.kind(), n),
                    Expression::Literal(l) => write!(f, "{} {}", node.kind(), l),
                    Expression::MethodInvocation { name, .. } => {
                        write!(f, "{} {}", node.kind(), name)
                    }
                    _ => write!(f, "{}", node.kind()),
                },
                _ => write!(f, "{}", node.kind()),
            },
            ControlItem::Instr(instr) => match instr {
                Instr::BinOp(op) | Instr::CompoundAssign(op) => {
                    write!(f, "{} {}", instr.kind(), op.symbol())
                }
                Instr::Increment { operator, prefix } => {
                    let fix = if *prefix { "prefix" } else { "postfix" };
                    write!(f, "Increment {} {}", fix, operator.symbol())
                }
                Instr::EvalVar(name) | Instr::Res(name) | Instr::ResTypeCont(name) => {
                    write!(f, "{} {}", instr.kind(), name)
                }
                Instr::Env(node) => write!(f, "Env {}", node.borrow().name),
                Instr::Marker(kind) | Instr::Reset(kind) => write!(f, "{} {:?}", instr.kind(), kind),
                Instr::ResOverload {
                    name,
                    arity,
                    qualifier,
                } => write!(f, "ResOverload {}.{}/{}", qualifier, name, arity),
                Instr::ResConOverload { class_name, arity } => {
                    write!(f, "ResConOverload {}/{}", class_name, arity)
                }
                Instr::New(class_name) => write!(f, "New {}", class_name),
                Instr::Invocation { arity } => write!(f, "Invocation {}", arity),
                _ => write!(f, "{}", instr.kind()),
            },
        }
    }
}
