//! Tests for standalone expression evaluation.
//!
//! These cover operator precedence, numeric promotion, string concatenation
//! and the faults an expression can raise on its own.

extern crate jcse;

use jcse::parser::JavaParser;
use jcse::runner::api::{run_expression, run_expression_with, RunError};
use jcse::runner::config::MachineConfig;
use jcse::runner::ds::error::EvalError;
use jcse::runner::ds::value::{StashItem, Value};
use jcse::runner::eval::{evaluate, EvalContext};

fn eval(code: &str) -> Value {
    run_expression(code).unwrap_or_else(|e| panic!("{}: {}", code, e))
}

fn eval_err(code: &str) -> EvalError {
    match run_expression(code) {
        Err(RunError::Eval(e)) => e,
        Err(e) => panic!("{}: unexpected parse error {}", code, e),
        Ok(v) => panic!("{}: expected an error, got {}", code, v),
    }
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

#[test]
fn test_precedence() {
    assert_eq!(eval("1 + 2 * 3"), Value::int(7));
}

#[test]
fn test_parentheses() {
    assert_eq!(eval("(1 + 2) * 3"), Value::int(9));
}

#[test]
fn test_mixed_arithmetic() {
    assert_eq!(eval("2/1-3*(5%4)+6"), Value::int(5));
}

#[test]
fn test_left_associativity() {
    assert_eq!(eval("10 - 4 - 3"), Value::int(3));
    assert_eq!(eval("64 / 4 / 2"), Value::int(8));
}

#[test]
fn test_integer_division_truncates() {
    assert_eq!(eval("7 / 2"), Value::int(3));
    assert_eq!(eval("-7 / 2"), Value::int(-3));
}

#[test]
fn test_numeric_promotion() {
    assert_eq!(eval("7.0 / 2"), Value::double(3.5));
    assert_eq!(eval("1 + 2L"), Value::long(3));
    assert_eq!(eval("'a' + 1"), Value::int(98));
}

#[test]
fn test_int_overflow_wraps() {
    assert_eq!(eval("2147483647 + 1"), Value::int(i32::MIN));
}

#[test]
fn test_unary_operators() {
    assert_eq!(eval("-5 + +3"), Value::int(-2));
    assert_eq!(eval("!true"), Value::Boolean(false));
}

#[test]
fn test_comparisons_and_logic() {
    assert_eq!(eval("1 < 2 && 2 < 3"), Value::Boolean(true));
    assert_eq!(eval("!(1 == 1) || false"), Value::Boolean(false));
    assert_eq!(eval("1 == 1.0"), Value::Boolean(true));
    assert_eq!(eval("3 >= 4"), Value::Boolean(false));
}

#[test]
fn test_short_circuit_skips_right_operand() {
    // The right operands would divide by zero if they were evaluated.
    assert_eq!(eval("false && 1 / 0 == 0"), Value::Boolean(false));
    assert_eq!(eval("true || 1 / 0 == 0"), Value::Boolean(true));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("\"a\" + 1 + 2"), string("a12"));
    assert_eq!(eval("1 + 2 + \"a\""), string("3a"));
    assert_eq!(eval("\"x\" + 'y' + true + null"), string("xytruenull"));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(eval_err("1 / 0"), EvalError::DivisionByZero);
    assert_eq!(eval_err("5 % 0"), EvalError::DivisionByZero);
    assert_eq!(eval("1.0 / 0"), Value::double(f64::INFINITY));
}

#[test]
fn test_undeclared_name() {
    assert_eq!(eval_err("x + 1"), EvalError::UndeclaredName("x".to_string()));
}

#[test]
fn test_operand_type_mismatch() {
    assert!(matches!(eval_err("true + 1"), EvalError::TypeMismatch(_)));
    assert!(matches!(eval_err("!1"), EvalError::TypeMismatch(_)));
}

#[test]
fn test_parse_error() {
    assert!(matches!(run_expression("1 +"), Err(RunError::Parse(_))));
}

#[test]
fn test_step_limited_evaluation_resumes() {
    let (partial, mut ctx) =
        run_expression_with("1 + 2 * 3", MachineConfig::with_step_limit(3)).unwrap();
    // Only the left operand has been evaluated so far.
    assert_eq!(partial, Value::int(1));
    assert!(!ctx.is_finished());

    let top = evaluate(&mut ctx, usize::MAX).unwrap();
    assert!(ctx.is_finished());
    assert_eq!(ctx.total_steps, 7);
    match top {
        Some(StashItem::Value(v)) => assert_eq!(v, Value::int(7)),
        other => panic!("unexpected stash top {:?}", other),
    }
}

#[test]
fn test_single_step_at_a_time() {
    let mut ctx = EvalContext::new();
    ctx.load_expression(JavaParser::parse_expression("(1 + 2) * 3").unwrap());
    let mut steps = 0;
    while !ctx.is_finished() {
        evaluate(&mut ctx, 1).unwrap();
        steps += 1;
    }
    assert_eq!(steps, ctx.total_steps);
    assert_eq!(ctx.stash.size(), 1);
    assert_eq!(ctx.stash.peek().and_then(|s| s.as_value()), Some(&Value::int(9)));
}
