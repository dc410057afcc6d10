//! Spreading policy
//!
//! Flattens load across the cluster by always choosing the least utilized
//! fitting node.

use std::sync::Arc;

use super::{pick_highest, Policy, ScheduleError};
use crate::container::Container;
use crate::node::Node;

#[derive(Debug, Default)]
pub struct SpreadPolicy;

impl Policy for SpreadPolicy {
    fn name(&self) -> &str {
        "spread"
    }

    fn schedule(
        &mut self,
        container: &Container,
        nodes: &[Arc<Node>],
    ) -> Result<Arc<Node>, ScheduleError> {
        // Negating the key turns lowest-utilization-first into the shared
        // highest-first ranking.
        let scored = nodes
            .iter()
            .filter_map(|node| {
                let snapshot = node.snapshot();
                container
                    .requests()
                    .fits_within(&snapshot.available)
                    .then(|| (-snapshot.utilization, node.clone()))
            })
            .collect();
        pick_highest(scored)
    }
}
