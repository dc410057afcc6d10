//! Container placement requests
//!
//! A container is an immutable descriptor of one placement request: identity,
//! image, and the four resource demands the scheduler accounts for.

use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// CPU demand above which a container counts as cpu-intensive (cores)
pub const CPU_INTENSIVE_CORES: f64 = 2.0;
/// Memory demand above which a container counts as memory-intensive (MiB)
pub const MEMORY_INTENSIVE_MIB: f64 = 2048.0;
/// Network demand above which a container counts as network-intensive (Mbps)
pub const NETWORK_INTENSIVE_MBPS: f64 = 500.0;
/// IO demand above which a container counts as io-intensive (IOPS)
pub const IO_INTENSIVE_IOPS: f64 = 5000.0;

// Process-wide counter; a nanosecond clock is not collision-safe under a
// fast placer.
static NEXT_CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// The four resource dimensions tracked for every container and node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Resources {
    /// CPU cores
    pub cpu: f64,
    /// Memory in MiB
    pub memory: f64,
    /// Network bandwidth in Mbps
    pub network: f64,
    /// IO operations per second
    pub io: f64,
}

impl Resources {
    pub fn new(cpu: f64, memory: f64, network: f64, io: f64) -> Self {
        Self {
            cpu,
            memory,
            network,
            io,
        }
    }

    /// True when every dimension of `self` is at most the matching
    /// dimension of `other`.
    pub fn fits_within(&self, other: &Resources) -> bool {
        self.cpu <= other.cpu
            && self.memory <= other.memory
            && self.network <= other.network
            && self.io <= other.io
    }

    /// Sum of all four dimensions.
    pub fn sum(&self) -> f64 {
        self.cpu + self.memory + self.network + self.io
    }
}

impl Add for Resources {
    type Output = Resources;

    fn add(self, rhs: Resources) -> Resources {
        Resources {
            cpu: self.cpu + rhs.cpu,
            memory: self.memory + rhs.memory,
            network: self.network + rhs.network,
            io: self.io + rhs.io,
        }
    }
}

impl Sub for Resources {
    type Output = Resources;

    fn sub(self, rhs: Resources) -> Resources {
        Resources {
            cpu: self.cpu - rhs.cpu,
            memory: self.memory - rhs.memory,
            network: self.network - rhs.network,
            io: self.io - rhs.io,
        }
    }
}

impl AddAssign for Resources {
    fn add_assign(&mut self, rhs: Resources) {
        *self = *self + rhs;
    }
}

impl SubAssign for Resources {
    fn sub_assign(&mut self, rhs: Resources) {
        *self = *self - rhs;
    }
}

/// Immutable descriptor of a single placement request.
#[derive(Debug, Clone)]
pub struct Container {
    id: String,
    name: String,
    image: String,
    requests: Resources,
    kind: String,
    priority: i32,
    created_at: Instant,
}

impl Container {
    /// Create a container with a fresh process-unique id.
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        requests: Resources,
        kind: impl Into<String>,
        priority: i32,
    ) -> Self {
        let seq = NEXT_CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("ctr-{seq}"),
            name: name.into(),
            image: image.into(),
            requests,
            kind: kind.into(),
            priority,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn requests(&self) -> Resources {
        self.requests
    }

    pub fn cpu_request(&self) -> f64 {
        self.requests.cpu
    }

    pub fn memory_request(&self) -> f64 {
        self.requests.memory
    }

    pub fn network_request(&self) -> f64 {
        self.requests.network
    }

    pub fn io_request(&self) -> f64 {
        self.requests.io
    }

    /// Workload category, e.g. "web" or "batch".
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Time elapsed since the request was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn cpu_intensive(&self) -> bool {
        self.requests.cpu > CPU_INTENSIVE_CORES
    }

    pub fn memory_intensive(&self) -> bool {
        self.requests.memory > MEMORY_INTENSIVE_MIB
    }

    pub fn network_intensive(&self) -> bool {
        self.requests.network > NETWORK_INTENSIVE_MBPS
    }

    pub fn io_intensive(&self) -> bool {
        self.requests.io > IO_INTENSIVE_IOPS
    }

    /// Intensity flags in fixed cpu/memory/network/io order.
    pub fn intensities(&self) -> [bool; 4] {
        [
            self.cpu_intensive(),
            self.memory_intensive(),
            self.network_intensive(),
            self.io_intensive(),
        ]
    }
}
