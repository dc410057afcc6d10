//! Container runtime interface
//!
//! The real-container deployment binds the benchmark to a runtime daemon
//! through this seam; the in-memory simulation never touches it. Implementors
//! talk to the daemon named by [`RUNTIME_ENDPOINT_ENV`].

use anyhow::Result;
use async_trait::async_trait;

use crate::container::Container;

/// Environment variable naming the runtime daemon endpoint.
pub const RUNTIME_ENDPOINT_ENV: &str = "SCHEDBENCH_RUNTIME_HOST";

const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Point-in-time usage reported by the runtime for one container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuntimeStats {
    pub cpu_percent: f64,
    pub memory_mib: f64,
}

/// Minimal surface the harness needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Launch `container` and return the runtime's id for it.
    async fn run(&self, container: &Container) -> Result<String>;

    /// Stop and remove a previously launched container.
    async fn stop(&self, runtime_id: &str) -> Result<()>;

    /// Sample current usage of a running container.
    async fn stats(&self, runtime_id: &str) -> Result<RuntimeStats>;
}

/// CPU percentage from two consecutive usage samples: the container's share
/// of the system delta, scaled by core count.
pub fn cpu_percent(cpu_delta: f64, system_delta: f64, num_cpus: usize) -> f64 {
    if cpu_delta > 0.0 && system_delta > 0.0 {
        cpu_delta / system_delta * num_cpus as f64 * 100.0
    } else {
        0.0
    }
}

/// Memory bytes as MiB.
pub fn bytes_to_mib(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MIB
}
