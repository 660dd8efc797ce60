// SPDX-License-Identifier: MIT

//! Node execution
//!
//! [`Executor`] walks the node arena. Each variant lives in its own module:
//! - `function` - leaf invocation through the function registry
//! - `parallel` - fan-out of a parallel node's branches into a bounded pool
//! - `parallel_for` - run-time loop unrolling and data distribution
//! - `conditional` - if / switch branch selection
//! - `join` - arrival counting on end nodes

mod conditional;
mod executor;
mod function;
mod join;
mod parallel;
mod parallel_for;

pub use executor::Executor;
pub use parallel_for::iteration_count;
