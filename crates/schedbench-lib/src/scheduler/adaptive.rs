//! Adaptive policy
//!
//! Blends weighted resource headroom, co-location interference, and node
//! health into one fitness score. The headroom weights shift with the
//! scheduler's runtime phase and with the most recent request profile seen
//! per container kind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{pick_highest, Policy, ScheduleError};
use crate::container::{Container, Resources};
use crate::node::{Node, NodeSnapshot};

/// Elapsed time below which the scheduler is still starting up.
const STARTUP_PHASE_END: Duration = Duration::from_secs(60);
/// Elapsed time beyond which the scheduler treats the run as high load.
const HIGH_LOAD_PHASE_START: Duration = Duration::from_secs(600);

/// Share of the final score taken by weighted headroom.
const BASE_SHARE: f64 = 0.6;
/// Share taken by each of interference and health.
const SIGNAL_SHARE: f64 = 0.2;

/// Interference never drops below this floor.
const INTERFERENCE_FLOOR: f64 = 0.1;
/// Penalty for a co-located container of the same kind.
const SAME_KIND_PENALTY: f64 = 0.1;
/// Penalty per intensity category shared with a co-located container.
const SHARED_INTENSITY_PENALTY: f64 = 0.15;

/// Runtime phase, derived from wall time since construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Normal,
    HighLoad,
}

impl Phase {
    fn of(elapsed: Duration) -> Phase {
        if elapsed < STARTUP_PHASE_END {
            Phase::Startup
        } else if elapsed > HIGH_LOAD_PHASE_START {
            Phase::HighLoad
        } else {
            Phase::Normal
        }
    }

    fn weights(self) -> Weights {
        match self {
            // early on, network and io headroom dominate
            Phase::Startup => Weights::new(0.2, 0.2, 0.3, 0.3),
            Phase::Normal => Weights::new(0.25, 0.25, 0.25, 0.25),
            // under sustained load, cpu and memory become the scarce
            // resources
            Phase::HighLoad => Weights::new(0.3, 0.3, 0.2, 0.2),
        }
    }
}

/// Per-resource weights applied to the headroom score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub cpu: f64,
    pub memory: f64,
    pub network: f64,
    pub io: f64,
}

impl Weights {
    fn new(cpu: f64, memory: f64, network: f64, io: f64) -> Self {
        Self {
            cpu,
            memory,
            network,
            io,
        }
    }

    pub fn sum(&self) -> f64 {
        self.cpu + self.memory + self.network + self.io
    }
}

pub struct AdaptivePolicy {
    /// Most recent request profile observed per container kind.
    container_history: HashMap<String, Resources>,
    /// Most recent health score observed per node id.
    node_history: HashMap<String, f64>,
    started_at: Instant,
    phase: Phase,
    weights: Weights,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptivePolicy {
    pub fn new() -> Self {
        Self::with_start_time(Instant::now())
    }

    /// Construct with an explicit start instant, pinning the phase window.
    /// Useful for replaying a run from a known point in its lifetime.
    pub fn with_start_time(started_at: Instant) -> Self {
        Self {
            container_history: HashMap::new(),
            node_history: HashMap::new(),
            started_at,
            phase: Phase::Startup,
            weights: Weights::new(0.25, 0.25, 0.25, 0.25),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    fn update_phase(&mut self) {
        self.phase = Phase::of(self.started_at.elapsed());
        self.weights = self.phase.weights();
    }

    fn fitness_score(&self, container: &Container, node: &Node, snapshot: &NodeSnapshot) -> f64 {
        let base = self.base_score(container, node.total(), snapshot.available);
        let interference = interference_score(container, &snapshot.containers);
        let health = self.health_score(node, snapshot);
        base * BASE_SHARE + interference * SIGNAL_SHARE + health * SIGNAL_SHARE
    }

    /// Weighted post-placement headroom, each dimension normalized by the
    /// node's capacity.
    fn base_score(&self, container: &Container, total: Resources, available: Resources) -> f64 {
        let w = self.weights;
        w.cpu * ((available.cpu - container.cpu_request()) / total.cpu)
            + w.memory * ((available.memory - container.memory_request()) / total.memory)
            + w.network * ((available.network - container.network_request()) / total.network)
            + w.io * ((available.io - container.io_request()) / total.io)
    }

    /// Last recorded health for the node (1.0 when unseen), penalized by
    /// load variance and rewarded for uptime up to one day.
    fn health_score(&self, node: &Node, snapshot: &NodeSnapshot) -> f64 {
        let base = self
            .node_history
            .get(node.id())
            .copied()
            .unwrap_or(1.0);
        let variance_penalty = 0.2 * snapshot.load_variance;
        let uptime_bonus = (node.uptime_hours() / 24.0).min(1.0) * 0.1;
        base - variance_penalty + uptime_bonus
    }

    /// Re-derive weights from the last request profile seen for this kind.
    /// Runs after scoring, so it only shapes the next decision. The result
    /// deliberately does not re-normalize to 1.0.
    fn retune_weights(&mut self, kind: &str) {
        let Some(usage) = self.container_history.get(kind) else {
            return;
        };
        let total = usage.sum();
        if total <= 0.0 {
            return;
        }
        self.weights = Weights::new(
            0.1 + usage.cpu / total * 0.6,
            0.1 + usage.memory / total * 0.6,
            0.1 + usage.network / total * 0.6,
            0.1 + usage.io / total * 0.6,
        );
    }

    fn record_placement(&mut self, container: &Container, node: &Node) {
        self.container_history
            .insert(container.kind().to_string(), container.requests());
        self.node_history
            .insert(node.id().to_string(), node.health_score());
    }
}

/// Anti-affinity with already-placed containers: each same-kind neighbor and
/// each shared intensity category subtracts from a perfect 1.0, floored at
/// 0.1.
fn interference_score(container: &Container, existing: &[Container]) -> f64 {
    let incoming = container.intensities();
    let mut score = 1.0;
    for neighbor in existing {
        if neighbor.kind() == container.kind() {
            score -= SAME_KIND_PENALTY;
        }
        let shared = neighbor
            .intensities()
            .into_iter()
            .zip(incoming)
            .filter(|&(a, b)| a && b)
            .count();
        score -= SHARED_INTENSITY_PENALTY * shared as f64;
    }
    score.max(INTERFERENCE_FLOOR)
}

impl Policy for AdaptivePolicy {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn schedule(
        &mut self,
        container: &Container,
        nodes: &[Arc<Node>],
    ) -> Result<Arc<Node>, ScheduleError> {
        self.update_phase();

        let scored = nodes
            .iter()
            .filter_map(|node| {
                let snapshot = node.snapshot();
                container
                    .requests()
                    .fits_within(&snapshot.available)
                    .then(|| (self.fitness_score(container, node, &snapshot), node.clone()))
            })
            .collect();
        let chosen = pick_highest(scored)?;

        self.retune_weights(container.kind());
        self.record_placement(container, &chosen);
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn large_node(name: &str) -> Arc<Node> {
        Arc::new(Node::new(
            name,
            Resources::new(8.0, 16384.0, 5000.0, 20000.0),
        ))
    }

    fn batch_container(cpu: f64) -> Container {
        Container::new(
            "worker",
            "img",
            Resources::new(cpu, 512.0, 50.0, 200.0),
            "batch",
            0,
        )
    }

    /// Pin the policy into the normal phase.
    fn normal_phase_policy() -> AdaptivePolicy {
        let five_minutes_ago = Instant::now() - Duration::from_secs(300);
        AdaptivePolicy::with_start_time(five_minutes_ago)
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(Phase::of(Duration::from_secs(0)), Phase::Startup);
        assert_eq!(Phase::of(Duration::from_secs(59)), Phase::Startup);
        assert_eq!(Phase::of(Duration::from_secs(60)), Phase::Normal);
        assert_eq!(Phase::of(Duration::from_secs(600)), Phase::Normal);
        assert_eq!(Phase::of(Duration::from_secs(601)), Phase::HighLoad);
    }

    #[test]
    fn test_high_load_phase_reweights_before_scoring() {
        let fifteen_minutes_ago = Instant::now() - Duration::from_secs(15 * 60);
        let mut policy = AdaptivePolicy::with_start_time(fifteen_minutes_ago);
        let nodes = vec![large_node("n1")];

        policy.schedule(&batch_container(1.0), &nodes).unwrap();

        assert_eq!(policy.phase(), Phase::HighLoad);
        // no kind history existed before this call, so the phase weights
        // survive the re-tune step
        assert_eq!(policy.weights(), Weights::new(0.3, 0.3, 0.2, 0.2));
    }

    #[test]
    fn test_interference_avoids_same_kind_node() {
        let mut policy = normal_phase_policy();
        let occupied = large_node("n1");
        let empty = large_node("n2");
        // cpu-intensive batch container pre-placed on n1
        assert!(occupied.try_add(batch_container(3.0)));

        let chosen = policy
            .schedule(&batch_container(3.0), &[occupied.clone(), empty.clone()])
            .unwrap();
        assert_eq!(chosen.id(), empty.id());
    }

    #[test]
    fn test_interference_score_floors_at_minimum() {
        let incoming = batch_container(3.0);
        let neighbors: Vec<Container> = (0..10).map(|_| batch_container(3.0)).collect();
        // 10 × (0.1 + 0.15) would take the score far below zero
        assert_eq!(interference_score(&incoming, &neighbors), 0.1);
    }

    #[test]
    fn test_interference_counts_each_shared_category() {
        let incoming = Container::new(
            "hot",
            "img",
            Resources::new(3.0, 4096.0, 50.0, 200.0),
            "batch",
            0,
        );
        let neighbor = Container::new(
            "hot",
            "img",
            Resources::new(2.5, 3000.0, 50.0, 200.0),
            "batch",
            0,
        );
        // same kind (0.1) + cpu overlap (0.15) + memory overlap (0.15)
        let score = interference_score(&incoming, std::slice::from_ref(&neighbor));
        assert!((score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_weights_retuned_from_kind_history() {
        let mut policy = normal_phase_policy();
        let nodes = vec![large_node("n1")];

        // first call records the profile, second call re-tunes from it
        let skewed = Container::new(
            "cpu-heavy",
            "img",
            Resources::new(6.0, 2.0, 1.0, 1.0),
            "batch",
            0,
        );
        policy.schedule(&skewed, &nodes).unwrap();
        policy.schedule(&batch_container(0.5), &nodes).unwrap();

        let weights = policy.weights();
        // cpu dominates the recorded profile: 0.1 + 0.6 * 6/10
        assert!((weights.cpu - 0.46).abs() < 1e-12);
        assert!(weights.cpu > weights.memory);
    }

    #[test]
    fn test_weights_stay_convex_after_any_schedule() {
        let mut policy = normal_phase_policy();
        let nodes = vec![large_node("n1"), large_node("n2")];
        let profiles = [
            Resources::new(6.0, 2.0, 1.0, 1.0),
            Resources::new(0.1, 4000.0, 10.0, 10.0),
            Resources::new(1.0, 1.0, 900.0, 9000.0),
        ];
        for (index, requests) in profiles.into_iter().enumerate() {
            let container =
                Container::new(format!("c{index}"), "img", requests, "batch", 0);
            policy.schedule(&container, &nodes).unwrap();
            let w = policy.weights();
            for weight in [w.cpu, w.memory, w.network, w.io] {
                assert!((0.1..=0.7).contains(&weight));
            }
            assert!(w.sum() <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_node_health_history_feeds_scoring() {
        let mut policy = normal_phase_policy();
        let weak = large_node("weak");
        let strong = large_node("strong");
        weak.set_health_score(0.2);

        // one placement on each records their health
        policy.schedule(&batch_container(0.5), &[weak.clone()]).unwrap();
        policy
            .schedule(&batch_container(0.5), &[strong.clone()])
            .unwrap();

        // with equal load the healthier node wins despite input order
        let chosen = policy
            .schedule(&batch_container(0.5), &[weak.clone(), strong.clone()])
            .unwrap();
        assert_eq!(chosen.id(), strong.id());
    }

    #[test]
    fn test_no_fitting_node_fails_without_recording() {
        let mut policy = normal_phase_policy();
        let tiny = Arc::new(Node::new("tiny", Resources::new(1.0, 512.0, 100.0, 500.0)));
        let big_request = Container::new(
            "big",
            "img",
            Resources::new(4.0, 256.0, 10.0, 100.0),
            "web",
            0,
        );
        assert!(matches!(
            policy.schedule(&big_request, &[tiny]),
            Err(ScheduleError::NoSuitableNode)
        ));
        assert!(policy.container_history.is_empty());
        assert!(policy.node_history.is_empty());
    }
}
