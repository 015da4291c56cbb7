//! Abstract syntax tree for the supported Java subset.
//!
//! Children are reference counted so the evaluator can push sub-trees onto the
//! control stack without copying them.

use std::fmt;
use std::rc::Rc;

/// A type as written in source: `int`, `String[]`, `Parent`, ... and `void`
/// for method results.
pub type TypeName = String;

pub const VOID_TYPE: &str = "void";
pub const OBJECT_CLASS: &str = "Object";
pub const CONSTRUCTOR_NAME: &str = "<init>";

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub classes: Vec<Rc<ClassDeclaration>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    Static,
    Final,
    Native,
    Abstract,
}

impl Modifier {
    pub fn from_keyword(s: &str) -> Option<Self> {
        Some(match s {
            "public" => Modifier::Public,
            "private" => Modifier::Private,
            "protected" => Modifier::Protected,
            "static" => Modifier::Static,
            "final" => Modifier::Final,
            "native" => Modifier::Native,
            "abstract" => Modifier::Abstract,
            _ => return None,
        })
    }
}

/// `NormalClassDeclaration`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDeclaration {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub superclass: Option<String>,
    pub body: Vec<ClassBodyDeclaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassBodyDeclaration {
    Field(Rc<FieldDeclaration>),
    Method(Rc<MethodDeclaration>),
    Constructor(Rc<ConstructorDeclaration>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub modifiers: Vec<Modifier>,
    pub field_type: TypeName,
    pub declarators: Vec<VariableDeclarator>,
}

impl FieldDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    pub name: String,
    pub initializer: Option<Rc<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormalParameter {
    pub param_type: TypeName,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub modifiers: Vec<Modifier>,
    pub result_type: TypeName,
    pub name: String,
    pub params: Vec<FormalParameter>,
    /// `None` for `native` (and bodiless) methods.
    pub body: Option<Block>,
}

impl MethodDeclaration {
    pub fn is_static(&self) -> bool {
        self.modifiers.contains(&Modifier::Static)
    }

    pub fn is_native(&self) -> bool {
        self.modifiers.contains(&Modifier::Native)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDeclaration {
    pub modifiers: Vec<Modifier>,
    pub name: String,
    pub params: Vec<FormalParameter>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Rc<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariableDeclaration {
    pub local_type: TypeName,
    pub declarators: Vec<VariableDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Block),
    LocalVariableDeclaration(LocalVariableDeclaration),
    Expression(Rc<Expression>),
    Return(Option<Rc<Expression>>),
    If {
        condition: Rc<Expression>,
        consequent: Rc<Statement>,
        alternative: Option<Rc<Statement>>,
    },
    While {
        condition: Rc<Expression>,
        body: Rc<Statement>,
    },
    BasicFor {
        init: Vec<Rc<Statement>>,
        condition: Option<Rc<Expression>>,
        update: Vec<Rc<Statement>>,
        body: Rc<Statement>,
    },
    Switch {
        discriminant: Rc<Expression>,
        cases: Vec<SwitchCase>,
    },
    Break,
    Continue,
    Empty,
    ExplicitConstructorInvocation(ExplicitConstructorInvocation),
}

impl Statement {
    pub fn is_return(&self) -> bool {
        matches!(self, Statement::Return(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Block(_) => "Block",
            Statement::LocalVariableDeclaration(_) => "LocalVariableDeclarationStatement",
            Statement::Expression(_) => "ExpressionStatement",
            Statement::Return(_) => "ReturnStatement",
            Statement::If { .. } => "IfStatement",
            Statement::While { .. } => "WhileStatement",
            Statement::BasicFor { .. } => "BasicForStatement",
            Statement::Switch { .. } => "SwitchStatement",
            Statement::Break => "BreakStatement",
            Statement::Continue => "ContinueStatement",
            Statement::Empty => "EmptyStatement",
            Statement::ExplicitConstructorInvocation(_) => "ExplicitConstructorInvocation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub labels: Vec<SwitchLabel>,
    pub statements: Vec<Rc<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchLabel {
    /// `CaseLabel`
    Case(Rc<Expression>),
    /// `DefaultLabel`
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThisOrSuper {
    This,
    Super,
}

impl ThisOrSuper {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThisOrSuper::This => "this",
            ThisOrSuper::Super => "super",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitConstructorInvocation {
    pub this_or_super: ThisOrSuper,
    pub arguments: Vec<Rc<Expression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Equal,
    NotEqual,
    ConditionalAnd,
    ConditionalOr,
}

impl BinaryOperator {
    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Remainder,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanEqual,
            "==" => BinaryOperator::Equal,
            "!=" => BinaryOperator::NotEqual,
            "&&" => BinaryOperator::ConditionalAnd,
            "||" => BinaryOperator::ConditionalOr,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Remainder => "%",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanEqual => ">=",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::ConditionalAnd => "&&",
            BinaryOperator::ConditionalOr => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Char(char),
    String(String),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// `ExpressionName`, possibly qualified (`a.b.c`, `this.x`, `Main.count`).
    Name(String),
    Assignment {
        target: String,
        value: Rc<Expression>,
    },
    /// `target op= value`, stored as `(T) (target op value)`.
    CompoundAssignment {
        operator: BinaryOperator,
        target: String,
        value: Rc<Expression>,
    },
    /// `++x`, `x--` and friends. `operator` is `Add` or `Subtract`; a prefix
    /// increment yields the new value, a postfix one the old.
    Increment {
        operator: BinaryOperator,
        target: String,
        prefix: bool,
    },
    Binary {
        operator: BinaryOperator,
        left: Rc<Expression>,
        right: Rc<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        operand: Rc<Expression>,
    },
    /// `MethodInvocation`; `name` carries the qualifier (`q.m`) once the class
    /// has been elaborated.
    MethodInvocation {
        name: String,
        arguments: Vec<Rc<Expression>>,
    },
    ClassInstanceCreation {
        class_name: String,
        arguments: Vec<Rc<Expression>>,
    },
    ArrayCreation {
        element_type: TypeName,
        elements: Vec<Rc<Expression>>,
    },
    Void,
}

impl Expression {
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "Literal",
            Expression::Name(_) => "ExpressionName",
            Expression::Assignment { .. } | Expression::CompoundAssignment { .. } => "Assignment",
            Expression::Increment { prefix: true, .. } => "PreIncrementExpression",
            Expression::Increment { prefix: false, .. } => "PostIncrementExpression",
            Expression::Binary { .. } => "BinaryExpression",
            Expression::Unary { .. } => "UnaryExpression",
            Expression::MethodInvocation { .. } => "MethodInvocation",
            Expression::ClassInstanceCreation { .. } => "ClassInstanceCreationExpression",
            Expression::ArrayCreation { .. } => "ArrayCreationExpression",
            Expression::Void => "Void",
        }
    }
}

/// Splits `a.b.c` into `("a.b", "c")`; `None` for a simple name.
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    name.rfind('.').map(|idx| (&name[..idx], &name[idx + 1..]))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Long(l) => write!(f, "{}L", l),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Char(c) => write!(f, "'{}'", c),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Null => write!(f, "null"),
        }
    }
}
