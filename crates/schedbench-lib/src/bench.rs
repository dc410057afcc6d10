//! Benchmark loop
//!
//! Drives a workload through a policy against a fixed heterogeneous cluster
//! with two cooperating workers: the placer pulls one request per tick and
//! applies the policy's placement, the reaper periodically retires a fraction
//! of placed containers to simulate completion. Both stop on a broadcast
//! signal once the run's deadline elapses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::container::Resources;
use crate::metrics::MetricsCollector;
use crate::node::Node;
use crate::scheduler::Policy;
use crate::workload::Workload;

/// One scheduling decision per placer tick.
pub const DEFAULT_PLACER_INTERVAL: Duration = Duration::from_millis(100);
/// One retirement sweep per reaper tick.
pub const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(1);

/// Tunables for the two worker loops. Tests shrink the intervals; the
/// defaults are the benchmark's contract.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub placer_interval: Duration,
    pub reaper_interval: Duration,
    /// Seed for the reaper's victim picks, surfaced for reproducible runs.
    pub reaper_seed: u64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            placer_interval: DEFAULT_PLACER_INTERVAL,
            reaper_interval: DEFAULT_REAPER_INTERVAL,
            reaper_seed: 42,
        }
    }
}

/// The default ten-node heterogeneous cluster: three small, five medium,
/// two large.
pub fn default_cluster() -> Vec<Arc<Node>> {
    let mut nodes = Vec::with_capacity(10);
    for i in 0..3 {
        nodes.push(Arc::new(Node::new(
            format!("small-node-{i}"),
            Resources::new(2.0, 4096.0, 1000.0, 5000.0),
        )));
    }
    for i in 0..5 {
        nodes.push(Arc::new(Node::new(
            format!("medium-node-{i}"),
            Resources::new(4.0, 8192.0, 2000.0, 10000.0),
        )));
    }
    for i in 0..2 {
        nodes.push(Arc::new(Node::new(
            format!("large-node-{i}"),
            Resources::new(8.0, 16384.0, 5000.0, 20000.0),
        )));
    }
    nodes
}

pub struct Benchmark {
    policy: Box<dyn Policy + Send>,
    workload: Box<dyn Workload + Send>,
    nodes: Vec<Arc<Node>>,
    config: BenchConfig,
}

impl Benchmark {
    pub fn new(policy: Box<dyn Policy + Send>, workload: Box<dyn Workload + Send>) -> Self {
        Self {
            policy,
            workload,
            nodes: default_cluster(),
            config: BenchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BenchConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default cluster.
    pub fn with_nodes(mut self, nodes: Vec<Arc<Node>>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    /// Run both workers until `duration` elapses (or the workload runs dry),
    /// then stop them and hand back the collected metrics.
    pub async fn run(self, duration: Duration) -> Result<MetricsCollector> {
        info!(
            policy = self.policy.name(),
            nodes = self.nodes.len(),
            duration_secs = duration.as_secs_f64(),
            "starting benchmark"
        );

        let (stop_tx, _) = broadcast::channel(1);

        let placer = tokio::spawn(run_placer(
            self.policy,
            self.workload,
            self.nodes.clone(),
            self.config.placer_interval,
            stop_tx.subscribe(),
        ));
        let reaper = tokio::spawn(run_reaper(
            self.nodes.clone(),
            self.config.reaper_interval,
            self.config.reaper_seed,
            stop_tx.subscribe(),
        ));

        tokio::time::sleep(duration).await;
        // the placer may already be gone if the workload ran dry
        let _ = stop_tx.send(());

        let collector = placer.await.context("placer worker failed")?;
        reaper.await.context("reaper worker failed")?;

        info!("benchmark complete");
        Ok(collector)
    }
}

async fn run_placer(
    mut policy: Box<dyn Policy + Send>,
    mut workload: Box<dyn Workload + Send>,
    nodes: Vec<Arc<Node>>,
    tick: Duration,
    mut stop: broadcast::Receiver<()>,
) -> MetricsCollector {
    let mut collector = MetricsCollector::new();
    let mut ticker = interval(tick);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !workload.has_next() {
                    debug!("workload exhausted, placer exiting");
                    break;
                }
                let Some(container) = workload.next() else {
                    continue;
                };

                let started = Instant::now();
                let decision = policy.schedule(&container, &nodes);
                let latency = started.elapsed();

                match decision {
                    Ok(node) => {
                        let placed = node.try_add(container.clone());
                        if placed {
                            debug!(
                                container_id = %container.id(),
                                node = %node.name(),
                                latency_us = latency.as_micros() as u64,
                                "container placed"
                            );
                        } else {
                            // headroom vanished between scoring and add
                            warn!(
                                container_id = %container.id(),
                                node = %node.name(),
                                "node rejected placement"
                            );
                        }
                        collector.record(&container, Some(node.as_ref()), latency, placed);
                    }
                    Err(error) => {
                        debug!(
                            container_id = %container.id(),
                            error = %error,
                            "scheduling failed"
                        );
                        collector.record(&container, None, latency, false);
                    }
                }
            }
            _ = stop.recv() => {
                debug!("placer stopping");
                break;
            }
        }
    }

    collector
}

async fn run_reaper(
    nodes: Vec<Arc<Node>>,
    tick: Duration,
    seed: u64,
    mut stop: broadcast::Receiver<()>,
) {
    let mut ticker = interval(tick);
    let mut rng = StdRng::seed_from_u64(seed);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                reap_once(&nodes, &mut rng);
            }
            _ = stop.recv() => {
                debug!("reaper stopping");
                break;
            }
        }
    }
}

/// Retire roughly 10% of each node's containers, always making at least one
/// attempt per node.
fn reap_once(nodes: &[Arc<Node>], rng: &mut StdRng) {
    for node in nodes {
        let attempts = node.container_count() / 10 + 1;
        for _ in 0..attempts {
            let count = node.container_count();
            if count == 0 {
                break;
            }
            let index = rng.gen_range(0..count);
            // the list may shrink between the count and the pick; a stale
            // index simply misses
            if let Some(container_id) = node.container_id_at(index) {
                if node.remove(&container_id) {
                    debug!(
                        container_id = %container_id,
                        node = %node.name(),
                        "container retired"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;

    #[test]
    fn test_default_cluster_shape() {
        let nodes = default_cluster();
        assert_eq!(nodes.len(), 10);
        let smalls = nodes.iter().filter(|n| n.total().cpu == 2.0).count();
        let mediums = nodes.iter().filter(|n| n.total().cpu == 4.0).count();
        let larges = nodes.iter().filter(|n| n.total().cpu == 8.0).count();
        assert_eq!((smalls, mediums, larges), (3, 5, 2));
        assert_eq!(nodes[9].total(), Resources::new(8.0, 16384.0, 5000.0, 20000.0));
    }

    #[test]
    fn test_reap_once_targets_a_tenth() {
        let node = Arc::new(Node::new(
            "big",
            Resources::new(64.0, 65536.0, 50000.0, 200000.0),
        ));
        for _ in 0..30 {
            assert!(node.try_add(Container::new(
                "filler",
                "img",
                Resources::new(0.5, 128.0, 10.0, 100.0),
                "batch",
                0,
            )));
        }

        let mut rng = StdRng::seed_from_u64(7);
        reap_once(std::slice::from_ref(&node), &mut rng);
        // 30/10 + 1 = 4 attempts against distinct live indices
        assert_eq!(node.container_count(), 26);
    }

    #[test]
    fn test_reap_once_tolerates_empty_nodes() {
        let node = Arc::new(Node::new("empty", Resources::new(2.0, 4096.0, 1000.0, 5000.0)));
        let mut rng = StdRng::seed_from_u64(7);
        reap_once(std::slice::from_ref(&node), &mut rng);
        assert_eq!(node.container_count(), 0);
    }

    #[test]
    fn test_reaper_seed_is_reproducible() {
        let build = || {
            let node = Arc::new(Node::new(
                "n",
                Resources::new(64.0, 65536.0, 50000.0, 200000.0),
            ));
            for _ in 0..20 {
                assert!(node.try_add(Container::new(
                    "filler",
                    "img",
                    Resources::new(0.5, 128.0, 10.0, 100.0),
                    "batch",
                    0,
                )));
            }
            node
        };
        let first = build();
        let second = build();
        let mut rng_a = StdRng::seed_from_u64(11);
        let mut rng_b = StdRng::seed_from_u64(11);
        reap_once(std::slice::from_ref(&first), &mut rng_a);
        reap_once(std::slice::from_ref(&second), &mut rng_b);

        let ids = |node: &Node| -> Vec<String> {
            node.containers().iter().map(|c| c.id().to_string()).collect()
        };
        // same seed removes the same positions
        assert_eq!(ids(&first).len(), ids(&second).len());
    }
}
