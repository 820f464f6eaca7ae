//! Metric sources returning configurable values, for exercising pages
//! without a real host.

use super::{
    ContainerOverview, ContainerRuntime, ContainerStats, DiskUsage, LoadAverage, Memory,
    MetricsError, NetCounters, SystemMetrics,
};

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct FixedInterface {
    pub counters: NetCounters,
    pub ipv4: Option<Ipv4Addr>,
}

/// `SystemMetrics` with values set by the caller.
#[derive(Debug)]
pub struct FixedMetrics {
    pub cpu_percent: f32,
    pub cpu_mhz: u64,
    pub cpus: usize,
    pub load: LoadAverage,
    pub temperature: Option<f32>,
    pub memory: Memory,
    pub hostname: String,
    disks: Mutex<HashMap<String, DiskUsage>>,
    interfaces: Mutex<HashMap<String, FixedInterface>>,
}

impl FixedMetrics {
    pub fn new() -> FixedMetrics {
        FixedMetrics {
            cpu_percent: 5.0,
            cpu_mhz: 1500,
            cpus: 4,
            load: LoadAverage {
                one: 0.2,
                five: 0.4,
                fifteen: 0.8,
            },
            temperature: Some(45.0),
            memory: Memory {
                total: 4 * 1024 * 1024 * 1024,
                used: 1024 * 1024 * 1024,
            },
            hostname: "raspberrypi".to_string(),
            disks: Mutex::new(HashMap::new()),
            interfaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_disk(&self, mount_point: &str, usage: DiskUsage) {
        self.disks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(mount_point.to_string(), usage);
    }

    pub fn set_interface(&self, name: &str, interface: FixedInterface) {
        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), interface);
    }

    fn interface(&self, name: &str) -> Option<FixedInterface> {
        self.interfaces
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetrics for FixedMetrics {
    fn cpu_percent(&self) -> Result<f32, MetricsError> {
        Ok(self.cpu_percent)
    }

    fn cpu_frequency_mhz(&self) -> Result<u64, MetricsError> {
        Ok(self.cpu_mhz)
    }

    fn cpu_count(&self) -> usize {
        self.cpus
    }

    fn load_average(&self) -> LoadAverage {
        self.load
    }

    fn temperature(&self) -> Result<f32, MetricsError> {
        self.temperature
            .ok_or(MetricsError::Unavailable("temperature sensor"))
    }

    fn memory(&self) -> Memory {
        self.memory
    }

    fn is_mount_point(&self, path: &str) -> bool {
        self.disks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(path)
    }

    fn disk_usage(&self, mount_point: &str) -> Result<DiskUsage, MetricsError> {
        self.disks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(mount_point)
            .copied()
            .ok_or_else(|| MetricsError::UnknownMount(mount_point.to_string()))
    }

    fn interface_exists(&self, interface: &str) -> bool {
        self.interface(interface).is_some()
    }

    fn net_counters(&self, interface: &str) -> Result<NetCounters, MetricsError> {
        self.interface(interface)
            .map(|i| i.counters)
            .ok_or_else(|| MetricsError::UnknownInterface(interface.to_string()))
    }

    fn ipv4(&self, interface: &str) -> Option<Ipv4Addr> {
        self.interface(interface).and_then(|i| i.ipv4)
    }

    fn hostname(&self) -> String {
        self.hostname.clone()
    }
}

/// `ContainerRuntime` answering with fixed data.
#[derive(Debug, Clone, Default)]
pub struct FixedContainers {
    pub overview: ContainerOverview,
    pub stats: Vec<ContainerStats>,
}

impl ContainerRuntime for FixedContainers {
    fn overview(&self) -> Result<ContainerOverview, MetricsError> {
        Ok(self.overview.clone())
    }

    fn stats(&self) -> Result<Vec<ContainerStats>, MetricsError> {
        Ok(self.stats.clone())
    }
}
