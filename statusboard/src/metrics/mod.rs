//! Metrics
//!
//! Pages read their numbers through two narrow traits: `SystemMetrics` for
//! the host itself and `ContainerRuntime` for the container engine. Both
//! are shared as `Arc<dyn ..>` between the pages and the background
//! refresh threads.

mod docker;
mod fixed;
mod host;

pub use docker::{parse_memory, parse_percent, DockerCli};
pub use fixed::{FixedContainers, FixedInterface, FixedMetrics};
pub use host::HostMetrics;

use std::io;
use std::net::Ipv4Addr;

pub const KB: f64 = 1024.0;
pub const MB: f64 = KB * 1024.0;
pub const GB: f64 = MB * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("{0}")]
    IO(#[from] io::Error),
    #[error("'{command}' failed: {detail}")]
    Command { command: String, detail: String },
    #[error("unable to parse {what}: '{input}'")]
    Parse { what: &'static str, input: String },
    #[error("no disk mounted at '{0}'")]
    UnknownMount(String),
    #[error("no such network interface '{0}'")]
    UnknownInterface(String),
    #[error("{0} is not available")]
    Unavailable(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Memory in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Memory {
    pub total: u64,
    pub used: u64,
}

/// Disk usage in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub used: u64,
    pub free: u64,
}

/// Cumulative byte counters of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetCounters {
    pub received: u64,
    pub sent: u64,
}

pub trait SystemMetrics: Send + Sync {
    /// Global CPU utilization in percent since the previous call.
    fn cpu_percent(&self) -> Result<f32, MetricsError>;
    fn cpu_frequency_mhz(&self) -> Result<u64, MetricsError>;
    fn cpu_count(&self) -> usize;
    fn load_average(&self) -> LoadAverage;
    /// CPU temperature in °C.
    fn temperature(&self) -> Result<f32, MetricsError>;
    fn memory(&self) -> Memory;
    fn is_mount_point(&self, path: &str) -> bool;
    fn disk_usage(&self, mount_point: &str) -> Result<DiskUsage, MetricsError>;
    fn interface_exists(&self, interface: &str) -> bool;
    fn net_counters(&self, interface: &str) -> Result<NetCounters, MetricsError>;
    fn ipv4(&self, interface: &str) -> Option<Ipv4Addr>;
    fn hostname(&self) -> String;
}

/// Container service state and the state of every container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerOverview {
    pub active: bool,
    /// One entry per container, e.g. "running", "exited".
    pub states: Vec<String>,
}

impl ContainerOverview {
    pub fn running(&self) -> usize {
        self.states.iter().filter(|s| s.as_str() == "running").count()
    }

    pub fn total(&self) -> usize {
        self.states.len()
    }
}

/// Resource usage of one running container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStats {
    pub cpu_percent: f64,
    /// Bytes.
    pub mem_used: f64,
    /// Bytes.
    pub mem_limit: f64,
    pub pids: u64,
}

/// Totals over all running containers.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerTotals {
    pub cpu_percent: f64,
    pub mem_used: f64,
    /// Limit reported by the first container, usually the host memory.
    pub mem_limit: f64,
    pub pids: u64,
}

impl ContainerTotals {
    pub fn sum(stats: &[ContainerStats]) -> Option<ContainerTotals> {
        let first = stats.first()?;
        Some(ContainerTotals {
            cpu_percent: stats.iter().map(|s| s.cpu_percent).sum(),
            mem_used: stats.iter().map(|s| s.mem_used).sum(),
            mem_limit: first.mem_limit,
            pids: stats.iter().map(|s| s.pids).sum(),
        })
    }
}

pub trait ContainerRuntime: Send + Sync {
    fn overview(&self) -> Result<ContainerOverview, MetricsError>;
    fn stats(&self) -> Result<Vec<ContainerStats>, MetricsError>;
}
