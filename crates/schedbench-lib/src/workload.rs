//! Workload generation
//!
//! Emits synthetic placement requests from a JSON template file: a template
//! is drawn per request by weight, and each resource value uniformly within
//! the template's range.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::container::{Container, Resources};

/// Default cap on emitted containers.
const DEFAULT_MAX_CONTAINERS: usize = 10_000;

/// Source of placement requests for the benchmark loop.
pub trait Workload: Send {
    fn has_next(&self) -> bool;

    fn next(&mut self) -> Option<Container>;
}

/// One workload template; resource values are drawn from `[min, max)`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerTemplate {
    pub name: String,
    pub image: String,
    pub cpu_min: f64,
    pub cpu_max: f64,
    pub memory_min: f64,
    pub memory_max: f64,
    pub network_min: f64,
    pub network_max: f64,
    pub io_min: f64,
    pub io_max: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub priority: i32,
    pub weight: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadDefinition {
    pub templates: Vec<ContainerTemplate>,
}

/// Template-driven workload with a weighted template draw.
pub struct FileWorkload {
    templates: Vec<ContainerTemplate>,
    total_weight: u32,
    emitted: usize,
    max_containers: usize,
    rng: StdRng,
}

impl FileWorkload {
    /// Load a workload definition from a JSON file. Fatal at startup: the
    /// benchmark never starts with an unreadable workload.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workload file {}", path.display()))?;
        let definition: WorkloadDefinition = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse workload file {}", path.display()))?;
        Self::from_definition(definition)
    }

    /// Build from an in-memory definition.
    pub fn from_definition(definition: WorkloadDefinition) -> Result<Self> {
        ensure!(
            !definition.templates.is_empty(),
            "workload defines no templates"
        );
        let total_weight: u32 = definition.templates.iter().map(|t| t.weight).sum();
        ensure!(total_weight > 0, "workload template weights sum to zero");
        Ok(Self {
            templates: definition.templates,
            total_weight,
            emitted: 0,
            max_containers: DEFAULT_MAX_CONTAINERS,
            rng: StdRng::from_entropy(),
        })
    }

    /// Seed the template and resource draws for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Override the emission cap.
    pub fn with_max_containers(mut self, max_containers: usize) -> Self {
        self.max_containers = max_containers;
        self
    }

    /// Weighted uniform draw over template indices.
    fn pick_template_index(&mut self) -> usize {
        let mut remaining = self.rng.gen_range(0..self.total_weight) as i64;
        for (index, template) in self.templates.iter().enumerate() {
            remaining -= template.weight as i64;
            if remaining < 0 {
                return index;
            }
        }
        // weights sum to total_weight, so the loop always returns
        self.templates.len() - 1
    }

    fn sample(&mut self, min: f64, max: f64) -> f64 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }
}

impl Workload for FileWorkload {
    fn has_next(&self) -> bool {
        self.emitted < self.max_containers
    }

    fn next(&mut self) -> Option<Container> {
        if !self.has_next() {
            return None;
        }
        self.emitted += 1;

        let index = self.pick_template_index();
        let template = self.templates[index].clone();
        let requests = Resources::new(
            self.sample(template.cpu_min, template.cpu_max),
            self.sample(template.memory_min, template.memory_max),
            self.sample(template.network_min, template.network_max),
            self.sample(template.io_min, template.io_max),
        );
        Some(Container::new(
            template.name,
            template.image,
            requests,
            template.kind,
            template.priority,
        ))
    }
}
