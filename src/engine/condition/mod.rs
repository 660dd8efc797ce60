// SPDX-License-Identifier: MIT

//! Condition evaluation for if nodes
//!
//! This module provides parsing and evaluation of branch conditions.
//! Conditions compare state paths against literals:
//! - `classify/label == 'spam'`
//! - `score/value > 0.8`
//! - `check/ok == true and retries/count < 3`

mod ast;
mod evaluator;
mod parser;

pub use ast::{CompareOp, Expression, Literal};
pub use evaluator::evaluate;
pub use parser::parse;
