//! Simple condition expression parser
//!
//! Parses expressions like:
//! - `classify/label == 'spam'`
//! - `score/value > 0.8`
//! - `a/x == 'x' and not b/y > 5`

use super::ast::{CompareOp, Expression, Literal};
use crate::sdk::error::{EnactError, Result};

/// Parse a condition expression string into an AST
pub fn parse(input: &str) -> Result<Expression> {
    let input = input.trim();

    if input == "true" {
        return Ok(Expression::True);
    }
    if input == "false" {
        return Ok(Expression::False);
    }

    if let Some(expr) = try_parse_compound(input)? {
        return Ok(expr);
    }

    if let Some(rest) = input.strip_prefix("not ") {
        return Ok(Expression::Not(Box::new(parse(rest)?)));
    }

    if let Some(inner) = input.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        return parse(inner);
    }

    parse_comparison(input)
}

/// Split on the first top-level `or`, then `and`, so `and` binds tighter
fn try_parse_compound(input: &str) -> Result<Option<Expression>> {
    for (word, is_or) in [(" or ", true), (" and ", false)] {
        if let Some(pos) = find_top_level(input, word) {
            let left = Box::new(parse(&input[..pos])?);
            let right = Box::new(parse(&input[pos + word.len()..])?);
            return Ok(Some(if is_or {
                Expression::Or(left, right)
            } else {
                Expression::And(left, right)
            }));
        }
    }
    Ok(None)
}

fn parse_comparison(input: &str) -> Result<Expression> {
    // longest operators first
    let operators = [
        ("!=", CompareOp::NotEq),
        (">=", CompareOp::Gte),
        ("<=", CompareOp::Lte),
        ("==", CompareOp::Eq),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        (" contains ", CompareOp::Contains),
    ];

    for (op_str, op) in operators {
        if let Some(pos) = find_top_level(input, op_str) {
            let path = input[..pos].trim().to_string();
            if path.is_empty() {
                return Err(EnactError::InvalidCondition(format!(
                    "missing path in '{}'",
                    input
                )));
            }
            let right = parse_literal(&input[pos + op_str.len()..])?;
            return Ok(Expression::Compare { path, op, right });
        }
    }

    Err(EnactError::InvalidCondition(format!(
        "could not parse '{}'",
        input
    )))
}

/// Byte offset of `needle` outside quotes and parentheses
fn find_top_level(input: &str, needle: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, _) if depth == 0 && input[i..].starts_with(needle) => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_literal(input: &str) -> Result<Literal> {
    let input = input.trim();

    match input {
        "null" => return Ok(Literal::Null),
        "true" => return Ok(Literal::Boolean(true)),
        "false" => return Ok(Literal::Boolean(false)),
        _ => {}
    }

    if input.len() >= 2
        && ((input.starts_with('\'') && input.ends_with('\''))
            || (input.starts_with('"') && input.ends_with('"')))
    {
        return Ok(Literal::String(input[1..input.len() - 1].to_string()));
    }

    input
        .parse::<f64>()
        .map(Literal::Number)
        .map_err(|_| EnactError::InvalidCondition(format!("could not parse literal '{}'", input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(path: &str, op: CompareOp, right: Literal) -> Expression {
        Expression::Compare {
            path: path.to_string(),
            op,
            right,
        }
    }

    #[test]
    fn test_parse_simple_equality() {
        assert_eq!(
            parse("classify/label == 'spam'").unwrap(),
            compare("classify/label", CompareOp::Eq, Literal::String("spam".into()))
        );
    }

    #[test]
    fn test_parse_numeric_comparisons() {
        assert_eq!(
            parse("score/value > 0.8").unwrap(),
            compare("score/value", CompareOp::Gt, Literal::Number(0.8))
        );
        assert_eq!(
            parse("count <= 10").unwrap(),
            compare("count", CompareOp::Lte, Literal::Number(10.0))
        );
        assert_eq!(
            parse("n != 3").unwrap(),
            compare("n", CompareOp::NotEq, Literal::Number(3.0))
        );
    }

    #[test]
    fn test_parse_boolean_and_null() {
        assert_eq!(
            parse("check/ok == false").unwrap(),
            compare("check/ok", CompareOp::Eq, Literal::Boolean(false))
        );
        assert_eq!(
            parse("err == null").unwrap(),
            compare("err", CompareOp::Eq, Literal::Null)
        );
    }

    #[test]
    fn test_parse_contains() {
        assert_eq!(
            parse("tags contains 'bug'").unwrap(),
            compare("tags", CompareOp::Contains, Literal::String("bug".into()))
        );
    }

    #[test]
    fn test_operator_inside_quotes_is_ignored() {
        assert_eq!(
            parse(r#"expr == "a >= b""#).unwrap(),
            compare("expr", CompareOp::Eq, Literal::String("a >= b".into()))
        );
        assert_eq!(
            parse("name == 'naïve or not'").unwrap(),
            compare("name", CompareOp::Eq, Literal::String("naïve or not".into()))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse("a == 1 or b == 2 and c == 3").unwrap();
        match expr {
            Expression::Or(left, right) => {
                assert_eq!(*left, compare("a", CompareOp::Eq, Literal::Number(1.0)));
                assert!(matches!(*right, Expression::And(_, _)));
            }
            other => panic!("Expected Or expression, got {:?}", other),
        }
    }

    #[test]
    fn test_not_and_parentheses() {
        assert_eq!(
            parse("not (x == 1)").unwrap(),
            Expression::Not(Box::new(compare("x", CompareOp::Eq, Literal::Number(1.0))))
        );
        assert!(matches!(
            parse("(a == 1 or b == 2) and c == 3").unwrap(),
            Expression::And(_, _)
        ));
    }

    #[test]
    fn test_parse_errors() {
        for input in ["", "just_a_path", "== 3", "x == 'unterminated", "x > abc"] {
            assert!(
                matches!(parse(input), Err(EnactError::InvalidCondition(_))),
                "{} should fail",
                input
            );
        }
    }
}
