use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::parser::ast::{
    ConstructorDeclaration, FormalParameter, Literal, MethodDeclaration, TypeName,
    CONSTRUCTOR_NAME,
};
use crate::runner::ds::class::ClassRef;
use crate::runner::ds::env::EnvNodeRef;
use crate::runner::ds::stack::Stack;

pub type Stash = Stack<StashItem>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i32),
    Long(i64),
    Double(f64),
}

impl NumberValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            NumberValue::Int(i) => *i as i64,
            NumberValue::Long(l) => *l,
            NumberValue::Double(d) => *d as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int(i) => *i as f64,
            NumberValue::Long(l) => *l as f64,
            NumberValue::Double(d) => *d,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NumberValue::Int(_) => "int",
            NumberValue::Long(_) => "long",
            NumberValue::Double(_) => "double",
        }
    }
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Int(i) => write!(f, "{}", i),
            NumberValue::Long(l) => write!(f, "{}", l),
            NumberValue::Double(d) => write!(f, "{:?}", d),
        }
    }
}

/// Runtime values that can live in a variable or on the stash.
#[derive(Debug, Clone)]
pub enum Value {
    Void,
    Null,
    Boolean(bool),
    Char(char),
    Number(NumberValue),
    String(String),
    Object(ObjectRef),
    Array(Rc<ArrayValue>),
}

impl Value {
    pub fn int(i: i32) -> Self {
        Value::Number(NumberValue::Int(i))
    }

    pub fn long(l: i64) -> Self {
        Value::Number(NumberValue::Long(l))
    }

    pub fn double(d: f64) -> Self {
        Value::Number(NumberValue::Double(d))
    }

    /// Numeric view of the value; `char` takes part in arithmetic as `int`.
    pub fn as_number(&self) -> Option<NumberValue> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Char(c) => Some(NumberValue::Int(*c as i32)),
            _ => None,
        }
    }

    /// Runtime type name, used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(_) => "boolean".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Number(n) => n.type_name().to_string(),
            Value::String(_) => "String".to_string(),
            Value::Object(o) => o.class.name.clone(),
            Value::Array(a) => format!("{}[]", a.element_type),
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Int(i) => Value::int(*i),
            Literal::Long(l) => Value::long(*l),
            Literal::Double(d) => Value::double(*d),
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Char(c) => Value::Char(*c),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Null => Value::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(o) => write!(f, "{}", o),
            Value::Array(a) => {
                let elements: Vec<String> = a.elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
        }
    }
}

/// Single dimension array built from an initializer; elements are fixed.
#[derive(Debug)]
pub struct ArrayValue {
    pub element_type: TypeName,
    pub elements: Vec<Value>,
}

pub type ObjectRef = Rc<Object>;

/// An instance. Its frame holds every instance field, declared and
/// inherited, and is parented at the class frame.
pub struct Object {
    pub id: Uuid,
    pub class: ClassRef,
    pub frame: EnvNodeRef,
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.id)
            .field("class", &self.class.name)
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.to_simple().to_string();
        write!(f, "{}@{}", self.class.name, &id[..8])
    }
}

pub type VariableRef = Rc<RefCell<Variable>>;

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub declared_type: TypeName,
    /// `None` until the first assignment.
    pub value: Option<Value>,
}

impl Variable {
    pub fn new_ref(name: &str, declared_type: &str, value: Option<Value>) -> VariableRef {
        Rc::new(RefCell::new(Variable {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            value,
        }))
    }
}

#[derive(Debug, Clone)]
pub enum Callable {
    Method(Rc<MethodDeclaration>),
    Constructor(Rc<ConstructorDeclaration>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Method(m) => &m.name,
            Callable::Constructor(_) => CONSTRUCTOR_NAME,
        }
    }

    pub fn params(&self) -> &[FormalParameter] {
        match self {
            Callable::Method(m) => &m.params,
            Callable::Constructor(c) => &c.params,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Callable::Method(m) => m.is_static(),
            Callable::Constructor(_) => false,
        }
    }

    pub fn result_type(&self) -> &str {
        match self {
            Callable::Method(m) => &m.result_type,
            Callable::Constructor(c) => &c.name,
        }
    }

    /// `name(T1,T2)`, the key the callable is bound under in its class frame.
    pub fn descriptor(&self) -> String {
        descriptor(self.name(), self.params().iter().map(|p| p.param_type.as_str()))
    }
}

pub fn descriptor<'a, I: IntoIterator<Item = &'a str>>(name: &str, param_types: I) -> String {
    let types: Vec<&str> = param_types.into_iter().collect();
    format!("{}({})", name, types.join(","))
}

pub type ClosureRef = Rc<Closure>;

/// A method or constructor bound to the frame of the class declaring it.
pub struct Closure {
    pub callable: Callable,
    pub env: EnvNodeRef,
    pub class_name: String,
    pub descriptor: String,
}

impl Closure {
    /// Key used to find a native implementation: `Class::name(T1,T2): R`.
    pub fn native_descriptor(&self) -> String {
        format!(
            "{}::{}: {}",
            self.class_name,
            self.descriptor,
            self.callable.result_type()
        )
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({}.{})", self.class_name, self.descriptor)
    }
}

/// Everything that can sit on the stash.
#[derive(Debug, Clone)]
pub enum StashItem {
    Value(Value),
    Variable(VariableRef),
    Class(ClassRef),
    Closure(ClosureRef),
    /// Static type produced by type resolution.
    Type(TypeName),
}

impl StashItem {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StashItem::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for StashItem {
    fn from(v: Value) -> Self {
        StashItem::Value(v)
    }
}

impl fmt::Display for StashItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StashItem::Value(v) => write!(f, "{}", v),
            StashItem::Variable(v) => {
                let v = v.borrow();
                match &v.value {
                    Some(value) => write!(f, "{} {} = {}", v.declared_type, v.name, value),
                    None => write!(f, "{} {} (unassigned)", v.declared_type, v.name),
                }
            }
            StashItem::Class(c) => write!(f, "class {}", c.name),
            StashItem::Closure(c) => write!(f, "{}.{}", c.class_name, c.descriptor),
            StashItem::Type(t) => write!(f, "<{}>", t),
        }
    }
}
