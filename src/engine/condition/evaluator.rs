//! Condition expression evaluator

use serde_json::Value;
use std::collections::HashMap;

use super::ast::{CompareOp, Expression, Literal};

/// Evaluate a condition against the values its paths resolved to.
///
/// Paths missing from `bindings` compare as null.
pub fn evaluate(expr: &Expression, bindings: &HashMap<String, Value>) -> bool {
    match expr {
        Expression::True => true,
        Expression::False => false,
        Expression::Compare { path, op, right } => {
            evaluate_compare(bindings.get(path), op, right)
        }
        Expression::And(left, right) => evaluate(left, bindings) && evaluate(right, bindings),
        Expression::Or(left, right) => evaluate(left, bindings) || evaluate(right, bindings),
        Expression::Not(inner) => !evaluate(inner, bindings),
    }
}

fn evaluate_compare(left: Option<&Value>, op: &CompareOp, right: &Literal) -> bool {
    match op {
        CompareOp::Eq => values_equal(left, right),
        CompareOp::NotEq => !values_equal(left, right),
        CompareOp::Gt => compare_numbers(left, right, |a, b| a > b),
        CompareOp::Gte => compare_numbers(left, right, |a, b| a >= b),
        CompareOp::Lt => compare_numbers(left, right, |a, b| a < b),
        CompareOp::Lte => compare_numbers(left, right, |a, b| a <= b),
        CompareOp::Contains => check_contains(left, right),
    }
}

/// Numbers stored as text (collapsed chunks, raw params) still compare numerically
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn values_equal(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (None | Some(Value::Null), Literal::Null) => true,
        (None, _) => false,
        (Some(Value::String(s)), Literal::String(rs)) => s == rs,
        (Some(v), Literal::Number(rn)) => as_number(v)
            .map(|f| (f - rn).abs() < f64::EPSILON)
            .unwrap_or(false),
        (Some(Value::Bool(b)), Literal::Boolean(rb)) => b == rb,
        (Some(Value::String(s)), Literal::Boolean(rb)) => s.eq_ignore_ascii_case(&rb.to_string()),
        _ => false,
    }
}

fn compare_numbers<F>(left: Option<&Value>, right: &Literal, cmp: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    match (left.and_then(as_number), right) {
        (Some(l), Literal::Number(rn)) => cmp(l, *rn),
        _ => false,
    }
}

fn check_contains(left: Option<&Value>, right: &Literal) -> bool {
    match (left, right) {
        (Some(Value::String(s)), Literal::String(substr)) => s.contains(substr.as_str()),
        (Some(Value::Array(arr)), Literal::String(val)) => {
            arr.iter().any(|v| v.as_str() == Some(val.as_str()))
        }
        (Some(Value::Array(arr)), Literal::Number(val)) => arr.iter().any(|v| {
            as_number(v)
                .map(|f| (f - val).abs() < f64::EPSILON)
                .unwrap_or(false)
        }),
        (Some(Value::Array(arr)), Literal::Boolean(val)) => {
            arr.iter().any(|v| v.as_bool() == Some(*val))
        }
        (Some(Value::Object(map)), Literal::String(key)) => map.contains_key(key),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::condition::parser::parse;
    use serde_json::json;

    fn bindings(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn eval(input: &str, state: &HashMap<String, Value>) -> bool {
        evaluate(&parse(input).unwrap(), state)
    }

    #[test]
    fn test_string_equality() {
        let state = bindings(vec![("route/intent", json!("search"))]);
        assert!(eval("route/intent == 'search'", &state));
        assert!(!eval("route/intent == 'code'", &state));
        assert!(eval("route/intent != 'code'", &state));
    }

    #[test]
    fn test_number_comparison() {
        let state = bindings(vec![("score", json!(7.5)), ("count", json!("3"))]);

        assert!(eval("score > 5", &state));
        assert!(!eval("score > 10", &state));
        assert!(eval("score >= 7.5", &state));
        assert!(eval("score <= 7.5", &state));
        assert!(!eval("score < 5", &state));

        // numbers kept as text
        assert!(eval("count == 3", &state));
        assert!(eval("count < 4", &state));
    }

    #[test]
    fn test_boolean_and_null() {
        let state = bindings(vec![("ok", json!(true)), ("flag", json!("FALSE")), ("r", json!(null))]);

        assert!(eval("ok == true", &state));
        assert!(eval("flag == false", &state));
        assert!(eval("r == null", &state));
        assert!(eval("missing == null", &state));
        assert!(!eval("missing == 'value'", &state));
        assert!(!eval("missing > 1", &state));
    }

    #[test]
    fn test_contains() {
        let state = bindings(vec![
            ("message", json!("hello world")),
            ("tags", json!(["bug", "urgent"])),
            ("ids", json!([1, 2, 3])),
            ("obj", json!({"k": 1})),
        ]);

        assert!(eval("message contains 'world'", &state));
        assert!(!eval("message contains 'foo'", &state));
        assert!(eval("tags contains 'bug'", &state));
        assert!(!eval("tags contains 'frontend'", &state));
        assert!(eval("ids contains 2", &state));
        assert!(eval("obj contains 'k'", &state));
    }

    #[test]
    fn test_logical_operators() {
        let state = bindings(vec![("type", json!("feature")), ("priority", json!(5))]);

        assert!(eval("type == 'bug' or priority > 3", &state));
        assert!(!eval("type == 'bug' and priority > 3", &state));
        assert!(eval("not type == 'bug'", &state));
        assert!(eval("true", &state));
        assert!(!eval("false", &state));
    }
}
