//! Operator semantics over runtime values: binary numeric promotion, integer
//! wrap-around, string concatenation and equality.

use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::runner::ds::error::EvalError;
use crate::runner::ds::value::{NumberValue, Value};

fn bad_operands(operator: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch(format!(
        "bad operand types {} and {} for binary operator {}",
        left.type_name(),
        right.type_name(),
        operator
    ))
}

fn numbers(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
) -> Result<(NumberValue, NumberValue), EvalError> {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(bad_operands(operator.symbol(), left, right)),
    }
}

fn is_double(n: &NumberValue) -> bool {
    matches!(n, NumberValue::Double(_))
}

fn is_long(n: &NumberValue) -> bool {
    matches!(n, NumberValue::Long(_))
}

fn arithmetic(operator: BinaryOperator, l: NumberValue, r: NumberValue) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    if is_double(&l) || is_double(&r) {
        let (a, b) = (l.as_f64(), r.as_f64());
        return Ok(Value::double(match operator {
            Add => a + b,
            Subtract => a - b,
            Multiply => a * b,
            Divide => a / b,
            _ => a % b,
        }));
    }
    if is_long(&l) || is_long(&r) {
        let (a, b) = (l.as_i64(), r.as_i64());
        if b == 0 && (operator == Divide || operator == Remainder) {
            return Err(EvalError::DivisionByZero);
        }
        return Ok(Value::long(match operator {
            Add => a.wrapping_add(b),
            Subtract => a.wrapping_sub(b),
            Multiply => a.wrapping_mul(b),
            Divide => a.wrapping_div(b),
            _ => a.wrapping_rem(b),
        }));
    }
    let (a, b) = (l.as_i64() as i32, r.as_i64() as i32);
    if b == 0 && (operator == Divide || operator == Remainder) {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Value::int(match operator {
        Add => a.wrapping_add(b),
        Subtract => a.wrapping_sub(b),
        Multiply => a.wrapping_mul(b),
        Divide => a.wrapping_div(b),
        _ => a.wrapping_rem(b),
    }))
}

fn compare(operator: BinaryOperator, l: NumberValue, r: NumberValue) -> bool {
    use BinaryOperator::*;
    let ordering = if is_double(&l) || is_double(&r) {
        l.as_f64().partial_cmp(&r.as_f64())
    } else {
        Some(l.as_i64().cmp(&r.as_i64()))
    };
    match ordering {
        // NaN compares false with everything.
        None => false,
        Some(o) => match operator {
            LessThan => o.is_lt(),
            LessThanEqual => o.is_le(),
            GreaterThan => o.is_gt(),
            _ => o.is_ge(),
        },
    }
}

/// `==`: numeric comparison after promotion for primitives, identity for
/// objects and arrays. Strings compare by content.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => {
            if is_double(&l) || is_double(&r) {
                l.as_f64() == r.as_f64()
            } else {
                l.as_i64() == r.as_i64()
            }
        }
        _ => left == right,
    }
}

fn boolean(operator: BinaryOperator, left: &Value, right: &Value) -> Result<bool, EvalError> {
    match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => Ok(match operator {
            BinaryOperator::ConditionalAnd => *l && *r,
            _ => *l || *r,
        }),
        _ => Err(bad_operands(operator.symbol(), left, right)),
    }
}

pub fn binary_op(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOperator::*;
    match operator {
        Add if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", left, right)))
        }
        Add | Subtract | Multiply | Divide | Remainder => {
            let (l, r) = numbers(operator, &left, &right)?;
            arithmetic(operator, l, r)
        }
        LessThan | LessThanEqual | GreaterThan | GreaterThanEqual => {
            let (l, r) = numbers(operator, &left, &right)?;
            Ok(Value::Boolean(compare(operator, l, r)))
        }
        Equal => Ok(Value::Boolean(values_equal(&left, &right))),
        NotEqual => Ok(Value::Boolean(!values_equal(&left, &right))),
        ConditionalAnd | ConditionalOr => Ok(Value::Boolean(boolean(operator, &left, &right)?)),
    }
}

pub fn unary_op(operator: UnaryOperator, operand: Value) -> Result<Value, EvalError> {
    let mismatch = |v: &Value| {
        EvalError::TypeMismatch(format!("bad operand type {} for unary operator", v.type_name()))
    };
    match operator {
        UnaryOperator::Not => match operand {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(mismatch(&other)),
        },
        UnaryOperator::Minus => match operand.as_number() {
            Some(NumberValue::Int(i)) => Ok(Value::int(i.wrapping_neg())),
            Some(NumberValue::Long(l)) => Ok(Value::long(l.wrapping_neg())),
            Some(NumberValue::Double(d)) => Ok(Value::double(-d)),
            None => Err(mismatch(&operand)),
        },
        UnaryOperator::Plus => match operand.as_number() {
            Some(n) => Ok(Value::Number(n)),
            None => Err(mismatch(&operand)),
        },
    }
}
