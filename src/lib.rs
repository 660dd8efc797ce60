// SPDX-License-Identifier: MIT

//! Execution core of a serverless-workflow enactment engine.
//!
//! A workflow is a tree of control nodes ([`engine::node::NodeArena`]). The
//! [`engine::exec::Executor`] walks it, fanning out parallel branches,
//! unrolling parallel-for loops at run time and moving every value through a
//! shared, path-addressed [`engine::state::StateStore`].

pub mod engine;
pub mod sdk;
