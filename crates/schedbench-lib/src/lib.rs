//! Core library for the container-scheduling benchmark harness
//!
//! This crate provides:
//! - The container/node resource model with fit and utilization accounting
//! - Three scheduling policies: bin-packing, spreading, and adaptive
//! - Per-decision metrics with CSV export
//! - Template-driven synthetic workload generation
//! - The concurrent placer/reaper benchmark loop
//! - The interface to a real container runtime

pub mod bench;
pub mod container;
pub mod metrics;
pub mod node;
pub mod runtime;
pub mod scheduler;
pub mod workload;

pub use bench::{default_cluster, BenchConfig, Benchmark};
pub use container::{Container, Resources};
pub use metrics::{BenchResults, MetricsCollector, SchedulingEvent};
pub use node::{Node, NodeSnapshot};
pub use runtime::{ContainerRuntime, RuntimeStats};
pub use scheduler::{
    policy_by_name, AdaptivePolicy, BinPackPolicy, Policy, ScheduleError, SpreadPolicy,
};
pub use workload::{ContainerTemplate, FileWorkload, Workload, WorkloadDefinition};
