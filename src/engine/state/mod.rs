// SPDX-License-Identifier: MIT

//! State management for workflow runs
//!
//! This module provides:
//! - `StateStore` - the shared, path-addressed value store of one run
//! - `StatePath` / `SourceExpr` - the addressing grammar used by data ports
//! - `PortType` - declared type tags and value coercion

mod path;
mod store;
mod value;

pub use path::{SourceExpr, StatePath};
pub use store::{key_for, StateStore};
pub use value::{as_integer, PortType};
