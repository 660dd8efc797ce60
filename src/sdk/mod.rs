// SPDX-License-Identifier: MIT

//! Building blocks shared by the engine and its collaborators: the error
//! taxonomy and the function-invocation seam.

pub mod error;
pub mod function;

pub use error::{EnactError, Result};
pub use function::{EchoFunction, FunctionCall, FunctionInvoker};
