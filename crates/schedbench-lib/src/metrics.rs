//! Scheduling metrics
//!
//! Append-only record of per-decision events with running aggregates, plus
//! the CSV export consumed by offline analysis. All recording happens from
//! the placer loop, so the collector itself needs no locking.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::container::Container;
use crate::node::Node;

/// CSV column order of the results file.
const CSV_HEADER: [&str; 7] = [
    "Timestamp",
    "ContainerID",
    "ContainerType",
    "NodeID",
    "SchedulingLatency(ms)",
    "Success",
    "ResourceUtilization",
];

/// One scheduling decision.
#[derive(Debug, Clone)]
pub struct SchedulingEvent {
    pub timestamp: DateTime<Utc>,
    pub container_id: String,
    pub container_kind: String,
    /// Absent when no node could take the container.
    pub node_id: Option<String>,
    /// Wall time spent inside the policy call.
    pub latency: Duration,
    pub success: bool,
    /// The chosen node's utilization at decision time; 0 without a node.
    pub utilization: f64,
}

/// Aggregated totals for one benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchResults {
    pub containers_scheduled: u64,
    pub scheduling_failures: u64,
    /// Mean policy latency over successful placements, in milliseconds.
    pub average_latency_ms: f64,
    /// Running mean of utilization over events that named a node.
    pub resource_utilization: f64,
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    events: Vec<SchedulingEvent>,
    scheduled: u64,
    failures: u64,
    total_latency: Duration,
    utilization_mean: f64,
    utilization_samples: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one event, sampling the node's utilization at call time.
    pub fn record(
        &mut self,
        container: &Container,
        node: Option<&Node>,
        latency: Duration,
        success: bool,
    ) {
        let (node_id, utilization) = match node {
            Some(node) => {
                let utilization = node.utilization();
                self.utilization_samples += 1;
                // streaming mean, equivalent to the batch mean over all
                // sampled events
                self.utilization_mean +=
                    (utilization - self.utilization_mean) / self.utilization_samples as f64;
                (Some(node.id().to_string()), utilization)
            }
            None => (None, 0.0),
        };

        self.events.push(SchedulingEvent {
            timestamp: Utc::now(),
            container_id: container.id().to_string(),
            container_kind: container.kind().to_string(),
            node_id,
            latency,
            success,
            utilization,
        });

        if success {
            self.scheduled += 1;
            self.total_latency += latency;
        } else {
            self.failures += 1;
        }
    }

    pub fn events(&self) -> &[SchedulingEvent] {
        &self.events
    }

    pub fn results(&self) -> BenchResults {
        let average_latency_ms = if self.scheduled > 0 {
            self.total_latency.as_secs_f64() * 1000.0 / self.scheduled as f64
        } else {
            0.0
        };
        BenchResults {
            containers_scheduled: self.scheduled,
            scheduling_failures: self.failures,
            average_latency_ms,
            resource_utilization: self.utilization_mean,
        }
    }

    /// Write one header row plus one row per event.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create results file {}", path.display()))?;
        writer
            .write_record(CSV_HEADER)
            .context("failed to write results header")?;
        for event in &self.events {
            writer
                .write_record([
                    event.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                    event.container_id.clone(),
                    event.container_kind.clone(),
                    event.node_id.clone().unwrap_or_default(),
                    format!("{:.3}", event.latency.as_secs_f64() * 1000.0),
                    event.success.to_string(),
                    format!("{:.3}", event.utilization),
                ])
                .context("failed to write results row")?;
        }
        writer.flush().context("failed to flush results file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Resources;

    fn test_container() -> Container {
        Container::new(
            "web",
            "nginx:latest",
            Resources::new(1.0, 512.0, 50.0, 200.0),
            "web",
            1,
        )
    }

    fn test_node() -> Node {
        Node::new("medium-0", Resources::new(4.0, 8192.0, 2000.0, 10000.0))
    }

    #[test]
    fn test_record_success_updates_counters() {
        let mut collector = MetricsCollector::new();
        let node = test_node();
        assert!(node.try_add(test_container()));

        collector.record(
            &test_container(),
            Some(&node),
            Duration::from_micros(250),
            true,
        );
        collector.record(
            &test_container(),
            Some(&node),
            Duration::from_micros(750),
            true,
        );

        let results = collector.results();
        assert_eq!(results.containers_scheduled, 2);
        assert_eq!(results.scheduling_failures, 0);
        assert!((results.average_latency_ms - 0.5).abs() < 1e-9);
        assert!((results.resource_utilization - node.utilization()).abs() < 1e-12);
    }

    #[test]
    fn test_record_failure_without_node() {
        let mut collector = MetricsCollector::new();
        collector.record(&test_container(), None, Duration::from_micros(100), false);

        let results = collector.results();
        assert_eq!(results.containers_scheduled, 0);
        assert_eq!(results.scheduling_failures, 1);
        assert_eq!(results.average_latency_ms, 0.0);
        assert_eq!(results.resource_utilization, 0.0);

        let event = &collector.events()[0];
        assert!(event.node_id.is_none());
        assert_eq!(event.utilization, 0.0);
    }

    #[test]
    fn test_rejected_add_keeps_node_id() {
        let mut collector = MetricsCollector::new();
        let node = test_node();
        collector.record(&test_container(), Some(&node), Duration::from_micros(50), false);

        let event = &collector.events()[0];
        assert_eq!(event.node_id.as_deref(), Some(node.id()));
        assert!(!event.success);
        // failed placements with a node still feed the utilization mean
        assert_eq!(collector.results().scheduling_failures, 1);
    }

    #[test]
    fn test_streaming_mean_matches_batch_mean() {
        let mut collector = MetricsCollector::new();
        let node = test_node();
        let mut samples = Vec::new();
        for _ in 0..4 {
            assert!(node.try_add(test_container()));
            samples.push(node.utilization());
            collector.record(&test_container(), Some(&node), Duration::ZERO, true);
        }
        let batch_mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((collector.results().resource_utilization - batch_mean).abs() < 1e-12);
    }

    #[test]
    fn test_write_csv_one_row_per_event() {
        let mut collector = MetricsCollector::new();
        let node = test_node();
        collector.record(&test_container(), Some(&node), Duration::from_millis(1), true);
        collector.record(&test_container(), None, Duration::from_micros(123), false);

        let path = std::env::temp_dir().join(format!("schedbench-metrics-{}.csv", std::process::id()));
        collector.write_csv(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert!(lines[1].contains(node.id()));
        assert!(lines[1].contains("1.000"));
        // failure rows carry an empty node column
        assert!(lines[2].contains(",,"));
        assert!(lines[2].contains("0.123"));
        assert!(lines[2].contains("false"));
    }
}
