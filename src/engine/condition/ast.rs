// SPDX-License-Identifier: MIT

//! Abstract Syntax Tree for if-node conditions

use std::fmt;

/// A condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Comparison expression: state path, operator, literal
    Compare {
        path: String,
        op: CompareOp,
        right: Literal,
    },
    /// Logical AND
    And(Box<Expression>, Box<Expression>),
    /// Logical OR
    Or(Box<Expression>, Box<Expression>),
    /// Logical NOT
    Not(Box<Expression>),
    /// Literal true
    True,
    /// Literal false
    False,
}

impl Expression {
    /// State paths referenced by the expression, in order of appearance
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = vec![];
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Compare { path, .. } => {
                if !out.contains(&path.as_str()) {
                    out.push(path);
                }
            }
            Expression::And(l, r) | Expression::Or(l, r) => {
                l.collect_paths(out);
                r.collect_paths(out);
            }
            Expression::Not(inner) => inner.collect_paths(out),
            Expression::True | Expression::False => {}
        }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring or array membership
    Contains,
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
            CompareOp::Contains => write!(f, "contains"),
        }
    }
}
