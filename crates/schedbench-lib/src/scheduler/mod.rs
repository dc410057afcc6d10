//! Scheduling policies
//!
//! A policy reduces the set of nodes that can fit a container to a single
//! choice. Policies only read node state; the caller applies the placement
//! afterwards, so a rejected add stays possible under concurrent removal.

mod adaptive;
mod binpack;
mod spread;

pub use adaptive::{AdaptivePolicy, Phase, Weights};
pub use binpack::BinPackPolicy;
pub use spread::SpreadPolicy;

use std::sync::Arc;

use thiserror::Error;

use crate::container::Container;
use crate::node::Node;

/// Errors that can occur while scheduling.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The fit filter produced an empty candidate set.
    #[error("no suitable node found")]
    NoSuitableNode,

    /// Unrecognized policy name at startup.
    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),
}

/// A placement policy. `schedule` never mutates node state; ties between
/// equally ranked candidates go to the node earlier in the input sequence.
pub trait Policy: Send {
    fn name(&self) -> &str;

    fn schedule(
        &mut self,
        container: &Container,
        nodes: &[Arc<Node>],
    ) -> Result<Arc<Node>, ScheduleError>;
}

/// Construct a policy from its command-line name.
pub fn policy_by_name(name: &str) -> Result<Box<dyn Policy + Send>, ScheduleError> {
    match name {
        "binpack" => Ok(Box::new(BinPackPolicy)),
        "spread" => Ok(Box::new(SpreadPolicy)),
        "adaptive" => Ok(Box::new(AdaptivePolicy::new())),
        other => Err(ScheduleError::UnknownPolicy(other.to_string())),
    }
}

/// Rank pre-scored candidates and pick the best. A stable descending sort
/// keeps input order among equal keys.
fn pick_highest(mut scored: Vec<(f64, Arc<Node>)>) -> Result<Arc<Node>, ScheduleError> {
    if scored.is_empty() {
        return Err(ScheduleError::NoSuitableNode);
    }
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored.remove(0).1)
}
