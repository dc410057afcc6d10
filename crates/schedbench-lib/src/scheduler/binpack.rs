//! Bin-packing policy
//!
//! Packs containers onto already-loaded nodes, leaving emptier nodes free
//! for large future requests.

use std::sync::Arc;

use super::{pick_highest, Policy, ScheduleError};
use crate::container::Container;
use crate::node::Node;

#[derive(Debug, Default)]
pub struct BinPackPolicy;

impl Policy for BinPackPolicy {
    fn name(&self) -> &str {
        "binpack"
    }

    fn schedule(
        &mut self,
        container: &Container,
        nodes: &[Arc<Node>],
    ) -> Result<Arc<Node>, ScheduleError> {
        // One atomic read per node: fit and ranking key come from the same
        // snapshot.
        let scored = nodes
            .iter()
            .filter_map(|node| {
                let snapshot = node.snapshot();
                container
                    .requests()
                    .fits_within(&snapshot.available)
                    .then(|| (snapshot.utilization, node.clone()))
            })
            .collect();
        pick_highest(scored)
    }
}
