//! Cluster nodes
//!
//! A node is a bounded resource bucket into which containers are placed.
//! Capacities are fixed at construction; accounting state (placed containers,
//! running usage, load history, health) lives behind a per-node mutex so the
//! placer and reaper can share a node list. Every read or update of a single
//! node is atomic; a policy scanning several nodes may observe them at
//! slightly different instants.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::container::{Container, Resources};

/// Number of utilization samples retained per node.
const LOAD_HISTORY_LEN: usize = 10;

static NEXT_NODE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct NodeState {
    used: Resources,
    containers: Vec<Container>,
    load_history: VecDeque<f64>,
    health_score: f64,
}

/// A consistent single-node view taken under the node lock, used by policies
/// that need several derived quantities from the same instant.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub available: Resources,
    pub utilization: f64,
    pub load_variance: f64,
    pub health_score: f64,
    pub containers: Vec<Container>,
}

#[derive(Debug)]
pub struct Node {
    id: String,
    name: String,
    total: Resources,
    created_at: Instant,
    state: Mutex<NodeState>,
}

impl Node {
    /// Create a node with the given capacities. All capacities must be
    /// positive.
    pub fn new(name: impl Into<String>, total: Resources) -> Self {
        debug_assert!(total.cpu > 0.0 && total.memory > 0.0 && total.network > 0.0 && total.io > 0.0);
        let seq = NEXT_NODE_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("node-{seq}"),
            name: name.into(),
            total,
            created_at: Instant::now(),
            state: Mutex::new(NodeState {
                used: Resources::default(),
                containers: Vec::new(),
                load_history: VecDeque::with_capacity(LOAD_HISTORY_LEN),
                health_score: 1.0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total(&self) -> Resources {
        self.total
    }

    pub fn used(&self) -> Resources {
        self.state().used
    }

    pub fn available(&self) -> Resources {
        self.total - self.state().used
    }

    /// True when every request of `container` is within current headroom.
    pub fn can_fit(&self, container: &Container) -> bool {
        let state = self.state();
        container.requests().fits_within(&(self.total - state.used))
    }

    /// Place `container` if it fits. The fit check and the accounting update
    /// happen under one lock acquisition; on a false return the node is
    /// unchanged.
    pub fn try_add(&self, container: Container) -> bool {
        let mut state = self.state();
        if !container.requests().fits_within(&(self.total - state.used)) {
            return false;
        }
        // placements are keyed by id; a second copy of the same container
        // is never admitted
        if state.containers.iter().any(|c| c.id() == container.id()) {
            return false;
        }
        state.used += container.requests();
        state.containers.push(container);
        let sample = utilization_of(state.used, self.total);
        push_load_sample(&mut state.load_history, sample);
        true
    }

    /// Remove the container with `container_id`, returning false when it is
    /// not placed here.
    pub fn remove(&self, container_id: &str) -> bool {
        let mut state = self.state();
        let Some(index) = state.containers.iter().position(|c| c.id() == container_id) else {
            return false;
        };
        let container = state.containers.remove(index);
        state.used -= container.requests();
        let sample = utilization_of(state.used, self.total);
        push_load_sample(&mut state.load_history, sample);
        true
    }

    /// Unweighted mean of per-resource used/total ratios, in [0, 1].
    pub fn utilization(&self) -> f64 {
        utilization_of(self.state().used, self.total)
    }

    /// Population standard deviation of the retained utilization samples;
    /// 0 with fewer than two samples.
    pub fn load_variance(&self) -> f64 {
        let state = self.state();
        load_variance_of(&state.load_history)
    }

    pub fn uptime_hours(&self) -> f64 {
        self.created_at.elapsed().as_secs_f64() / 3600.0
    }

    pub fn health_score(&self) -> f64 {
        self.state().health_score
    }

    /// Set the health score, clamped to [0, 1].
    pub fn set_health_score(&self, score: f64) {
        self.state().health_score = score.clamp(0.0, 1.0);
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    /// Snapshot of the placed containers in insertion order.
    pub fn containers(&self) -> Vec<Container> {
        self.state().containers.clone()
    }

    /// Id of the container at `index`, if the list still reaches that far.
    /// The reaper uses this to pick removal victims from a list that may
    /// shrink between ticks.
    pub fn container_id_at(&self, index: usize) -> Option<String> {
        self.state()
            .containers
            .get(index)
            .map(|c| c.id().to_string())
    }

    /// One consistent view of all derived quantities.
    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state();
        NodeSnapshot {
            available: self.total - state.used,
            utilization: utilization_of(state.used, self.total),
            load_variance: load_variance_of(&state.load_history),
            health_score: state.health_score,
            containers: state.containers.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn load_history_len(&self) -> usize {
        self.state().load_history.len()
    }
}

fn utilization_of(used: Resources, total: Resources) -> f64 {
    (used.cpu / total.cpu
        + used.memory / total.memory
        + used.network / total.network
        + used.io / total.io)
        / 4.0
}

fn push_load_sample(history: &mut VecDeque<f64>, sample: f64) {
    if history.len() == LOAD_HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(sample);
}

fn load_variance_of(history: &VecDeque<f64>) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let mean = history.iter().sum::<f64>() / history.len() as f64;
    let variance = history
        .iter()
        .map(|sample| (sample - mean).powi(2))
        .sum::<f64>()
        / history.len() as f64;
    variance.sqrt()
}
