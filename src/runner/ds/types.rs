//! Static typing rules: primitive tables, assignability, coercion and casts.

use std::collections::{HashMap, HashSet};

use crate::parser::ast::{Literal, OBJECT_CLASS};
use crate::runner::ds::class::Class;
use crate::runner::ds::env::Environment;
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{NumberValue, Value};

pub const NULL_TYPE: &str = "null";
pub const STRING_TYPE: &str = "String";
pub const BOOLEAN_TYPE: &str = "boolean";

lazy_static! {
    static ref PRIMITIVE_TYPES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for t in &["byte", "short", "char", "int", "long", "float", "double", "boolean"] {
            s.insert(*t);
        }
        s
    };
    /// Primitive widening conversions, `from -> [to, ...]`.
    static ref WIDENING: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("byte", vec!["short", "int", "long", "float", "double"]);
        m.insert("short", vec!["int", "long", "float", "double"]);
        m.insert("char", vec!["int", "long", "float", "double"]);
        m.insert("int", vec!["long", "float", "double"]);
        m.insert("long", vec!["float", "double"]);
        m.insert("float", vec!["double"]);
        m
    };
    static ref DEFAULT_VALUES: HashMap<&'static str, Literal> = {
        let mut m = HashMap::new();
        m.insert("byte", Literal::Int(0));
        m.insert("short", Literal::Int(0));
        m.insert("int", Literal::Int(0));
        m.insert("long", Literal::Long(0));
        m.insert("float", Literal::Double(0.0));
        m.insert("double", Literal::Double(0.0));
        m.insert("char", Literal::Char('\0'));
        m.insert("boolean", Literal::Boolean(false));
        m
    };
}

pub fn is_primitive(type_name: &str) -> bool {
    PRIMITIVE_TYPES.contains(type_name)
}

pub fn is_reference(type_name: &str) -> bool {
    !is_primitive(type_name) && type_name != "void"
}

pub fn is_numeric(type_name: &str) -> bool {
    is_primitive(type_name) && type_name != BOOLEAN_TYPE
}

pub fn element_type(type_name: &str) -> Option<&str> {
    if type_name.ends_with("[]") {
        Some(&type_name[..type_name.len() - 2])
    } else {
        None
    }
}

/// The value a field of `type_name` holds before it is assigned.
pub fn default_literal(type_name: &str) -> Literal {
    DEFAULT_VALUES
        .get(type_name)
        .cloned()
        .unwrap_or(Literal::Null)
}

pub fn default_value(type_name: &str) -> Value {
    Value::from(&default_literal(type_name))
}

pub fn literal_type(literal: &Literal) -> &'static str {
    match literal {
        Literal::Int(_) => "int",
        Literal::Long(_) => "long",
        Literal::Double(_) => "double",
        Literal::Boolean(_) => BOOLEAN_TYPE,
        Literal::Char(_) => "char",
        Literal::String(_) => STRING_TYPE,
        Literal::Null => NULL_TYPE,
    }
}

/// Whether a value of static type `from` can be passed where `to` is
/// expected: identity, primitive widening, `null` to any reference,
/// subclass to superclass and any reference to `Object`.
pub fn is_assignable(env: &Environment, to: &str, from: &str) -> bool {
    if to == from {
        return true;
    }
    if is_primitive(to) || is_primitive(from) {
        return WIDENING
            .get(from)
            .map(|targets| targets.contains(&to))
            .unwrap_or(false);
    }
    if from == NULL_TYPE || to == OBJECT_CLASS {
        return is_reference(to) && from != "void";
    }
    match env.get_class(from) {
        Ok(class) => Class::is_subclass_of(&class, to),
        Err(_) => false,
    }
}

/// Binary numeric promotion of two primitive type names.
pub fn promote(left: &str, right: &str) -> &'static str {
    if left == "double" || right == "double" || left == "float" || right == "float" {
        "double"
    } else if left == "long" || right == "long" {
        "long"
    } else {
        "int"
    }
}

/// Converts `value` for storage in a variable declared as `declared_type`,
/// applying primitive widening.
pub fn coerce(value: Value, declared_type: &str) -> Result<Value, EvalError> {
    if !is_primitive(declared_type) {
        return Ok(value);
    }
    let mismatch = |value: &Value| {
        EvalError::TypeMismatch(format!(
            "{} cannot be converted to {}",
            value.type_name(),
            declared_type
        ))
    };
    Ok(match declared_type {
        BOOLEAN_TYPE => match value {
            Value::Boolean(_) => value,
            _ => return Err(mismatch(&value)),
        },
        "char" => match value {
            Value::Char(_) => value,
            Value::Number(NumberValue::Int(i)) => match std::char::from_u32(i as u32) {
                Some(c) => Value::Char(c),
                None => return Err(mismatch(&value)),
            },
            _ => return Err(mismatch(&value)),
        },
        "long" => match value.as_number() {
            Some(NumberValue::Int(i)) => Value::long(i as i64),
            Some(NumberValue::Long(_)) => value,
            _ => return Err(mismatch(&value)),
        },
        "float" | "double" => match value.as_number() {
            Some(n) => Value::double(n.as_f64()),
            None => return Err(mismatch(&value)),
        },
        _ => match value.as_number() {
            Some(NumberValue::Int(i)) => Value::int(i),
            _ => return Err(mismatch(&value)),
        },
    })
}

/// Casting conversion for compound assignment and increments. Numbers
/// narrow to the declared primitive type, truncating toward zero and
/// saturating from floating point the way a Java cast does; anything else
/// goes through `coerce`.
pub fn narrow(value: Value, declared_type: &str) -> Result<Value, EvalError> {
    let number = match value.as_number() {
        Some(n) if is_numeric(declared_type) && !matches!(value, Value::Char(_)) => n,
        _ => return coerce(value, declared_type),
    };
    let as_int = match number {
        NumberValue::Int(i) => i,
        NumberValue::Long(l) => l as i32,
        NumberValue::Double(d) => d as i32,
    };
    Ok(match declared_type {
        "byte" => Value::int(as_int as i8 as i32),
        "short" => Value::int(as_int as i16 as i32),
        "char" => match std::char::from_u32(as_int as u16 as u32) {
            Some(c) => Value::Char(c),
            None => {
                return Err(EvalError::TypeMismatch(format!(
                    "{} is not a representable char",
                    number
                )))
            }
        },
        "int" => Value::int(as_int),
        "long" => Value::long(number.as_i64()),
        _ => Value::double(number.as_f64()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_widening() {
        let env = Environment::new();
        assert!(is_assignable(&env, "long", "int"));
        assert!(is_assignable(&env, "double", "char"));
        assert!(!is_assignable(&env, "int", "long"));
        assert!(!is_assignable(&env, "boolean", "int"));
        assert!(!is_assignable(&env, "Object", "int"));
    }

    #[test]
    fn test_reference_rules() {
        let env = Environment::new();
        assert!(is_assignable(&env, "Object", "String"));
        assert!(is_assignable(&env, "String", "null"));
        assert!(is_assignable(&env, "Object", "String[]"));
        assert!(!is_assignable(&env, "int", "null"));
        assert!(!is_assignable(&env, "String", "Object"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_value("int"), Value::int(0));
        assert_eq!(default_value("double"), Value::double(0.0));
        assert_eq!(default_value("boolean"), Value::Boolean(false));
        assert_eq!(default_value("Parent"), Value::Null);
    }

    #[test]
    fn test_coerce_widens() {
        assert_eq!(coerce(Value::int(2), "long").unwrap(), Value::long(2));
        assert_eq!(coerce(Value::Char('a'), "int").unwrap(), Value::int(97));
        assert_eq!(coerce(Value::int(1), "double").unwrap(), Value::double(1.0));
        assert!(coerce(Value::long(1), "int").is_err());
        assert!(coerce(Value::int(1), "boolean").is_err());
    }

    #[test]
    fn test_narrow_casts() {
        assert_eq!(narrow(Value::double(2.5), "int").unwrap(), Value::int(2));
        assert_eq!(narrow(Value::double(-2.5), "int").unwrap(), Value::int(-2));
        assert_eq!(narrow(Value::double(1e20), "int").unwrap(), Value::int(i32::MAX));
        assert_eq!(narrow(Value::long(6), "int").unwrap(), Value::int(6));
        assert_eq!(
            narrow(Value::long(i64::from(i32::MAX) + 1), "int").unwrap(),
            Value::int(i32::MIN)
        );
        assert_eq!(narrow(Value::int(98), "char").unwrap(), Value::Char('b'));
        assert_eq!(narrow(Value::int(200), "byte").unwrap(), Value::int(-56));
        assert_eq!(narrow(Value::double(3.9), "long").unwrap(), Value::long(3));
        assert_eq!(narrow(Value::int(1), "double").unwrap(), Value::double(1.0));
        assert_eq!(
            narrow(Value::String("a1".to_string()), "String").unwrap(),
            Value::String("a1".to_string())
        );
        assert!(narrow(Value::Boolean(true), "int").is_err());
    }
}
