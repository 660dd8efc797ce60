//! Per-node execution state
//!
//! Unlike the configuration in `types`, these fields change while a run is in
//! progress and are reset whenever a node is cloned.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Loop and concurrency context propagated from enclosing constructs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuntimeContext {
    /// Zero-based iteration index of the enclosing parallel-for
    pub loop_counter: Option<i64>,
    /// Last counter value of the enclosing parallel-for
    pub max_loop_counter: Option<i64>,
    /// Concurrency budget handed down by the enclosing parallel-for
    pub concurrency_limit: Option<usize>,
    /// When the enclosing construct started
    pub start_time: Option<DateTime<Utc>>,
    /// Number of functions scheduled ahead of this construct on its level
    pub nested_offset: Option<u64>,
    /// Set on function nodes: functions running alongside this one
    pub parallel_functions: Option<u64>,
}

impl RuntimeContext {
    pub fn in_loop(&self) -> bool {
        self.loop_counter.is_some()
    }

    /// Take over the loop fields of an enclosing context
    pub fn inherit_loop(&mut self, outer: &RuntimeContext) {
        self.loop_counter = outer.loop_counter;
        self.max_loop_counter = outer.max_loop_counter;
        self.concurrency_limit = outer.concurrency_limit;
        self.start_time = outer.start_time;
    }
}

/// Lifecycle of a node within one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed(String),
}

impl NodeStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Arrival counter of an end node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinBarrier {
    /// Explicit threshold; `None` falls back to the variant default
    pub expected: Option<usize>,
    pub arrived: usize,
}

impl JoinBarrier {
    /// Count one arrival; true exactly when the threshold is reached
    pub fn arrive(&mut self, fallback: usize) -> bool {
        self.arrived += 1;
        self.arrived == self.expected.unwrap_or(fallback)
    }

    pub fn expect(&mut self, count: usize) {
        self.expected = Some(count);
        self.arrived = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherit_loop_keeps_offsets() {
        let outer = RuntimeContext {
            loop_counter: Some(2),
            max_loop_counter: Some(4),
            concurrency_limit: Some(3),
            start_time: Some(Utc::now()),
            nested_offset: Some(7),
            parallel_functions: None,
        };
        let mut inner = RuntimeContext {
            nested_offset: Some(1),
            ..Default::default()
        };
        inner.inherit_loop(&outer);

        assert!(inner.in_loop());
        assert_eq!(inner.loop_counter, Some(2));
        assert_eq!(inner.concurrency_limit, Some(3));
        assert_eq!(inner.nested_offset, Some(1));
    }

    #[test]
    fn test_barrier_fires_once() {
        let mut barrier = JoinBarrier::default();
        assert!(!barrier.arrive(2));
        assert!(barrier.arrive(2));
        assert!(!barrier.arrive(2));

        barrier.expect(1);
        assert!(barrier.arrive(5));
    }

    #[test]
    fn test_status_finished() {
        assert!(!NodeStatus::Running.is_finished());
        assert!(NodeStatus::Failed("boom".to_string()).is_finished());
    }
}
