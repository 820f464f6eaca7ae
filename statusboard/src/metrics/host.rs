use super::{DiskUsage, LoadAverage, Memory, MetricsError, NetCounters, SystemMetrics};

use std::ffi::CString;
use std::fs;
use std::io;
use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sysinfo::{Components, CpuRefreshKind, Networks, System};

const SYS_CLASS_NET: &str = "/sys/class/net";
const CPU_SENSOR: &str = "cpu_thermal";

/// `SystemMetrics` of the machine we are running on.
pub struct HostMetrics {
    system: Mutex<System>,
    networks: Mutex<Networks>,
    components: Mutex<Components>,
    net_root: PathBuf,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded sysinfo state stays usable even if a holder panicked.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HostMetrics {
    pub fn new() -> HostMetrics {
        let mut system = System::new();
        system.refresh_cpu_specifics(CpuRefreshKind::everything());
        system.refresh_memory();
        HostMetrics {
            system: Mutex::new(system),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            components: Mutex::new(Components::new_with_refreshed_list()),
            net_root: PathBuf::from(SYS_CLASS_NET),
        }
    }
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// True if `path` is the root of a mounted file system.
fn is_mount(path: &Path) -> bool {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return false;
    };
    if !meta.is_dir() {
        return false;
    }
    let Ok(parent) = fs::metadata(path.join("..")) else {
        return false;
    };
    meta.dev() != parent.dev() || meta.ino() == parent.ino()
}

/// Usage of the file system holding `path`. `free` is what unprivileged
/// users may still allocate, `used` excludes the reserved blocks.
fn statvfs(path: &str) -> io::Result<DiskUsage> {
    let c_path =
        CString::new(path).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat: MaybeUninit<libc::statvfs> = MaybeUninit::uninit();
    // SAFETY: `c_path` is NUL terminated and `stat` is only read after
    // statvfs reported success.
    let stat = unsafe {
        if libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) != 0 {
            return Err(io::Error::last_os_error());
        }
        stat.assume_init()
    };
    let frsize = stat.f_frsize as u64;
    let blocks = stat.f_blocks as u64;
    Ok(DiskUsage {
        total: blocks.saturating_mul(frsize),
        used: blocks.saturating_sub(stat.f_bfree as u64).saturating_mul(frsize),
        free: (stat.f_bavail as u64).saturating_mul(frsize),
    })
}

impl SystemMetrics for HostMetrics {
    fn cpu_percent(&self) -> Result<f32, MetricsError> {
        let mut system = lock(&self.system);
        system.refresh_cpu_specifics(CpuRefreshKind::new().with_cpu_usage());
        Ok(system.global_cpu_info().cpu_usage())
    }

    fn cpu_frequency_mhz(&self) -> Result<u64, MetricsError> {
        let mut system = lock(&self.system);
        system.refresh_cpu_specifics(CpuRefreshKind::new().with_frequency());
        system
            .cpus()
            .first()
            .map(|cpu| cpu.frequency())
            .ok_or(MetricsError::Unavailable("cpu frequency"))
    }

    fn cpu_count(&self) -> usize {
        lock(&self.system).cpus().len().max(1)
    }

    fn load_average(&self) -> LoadAverage {
        let load = System::load_average();
        LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        }
    }

    fn temperature(&self) -> Result<f32, MetricsError> {
        let mut components = lock(&self.components);
        components.refresh();
        components
            .iter()
            .find(|c| c.label().contains(CPU_SENSOR))
            .or_else(|| components.iter().next())
            .map(|c| c.temperature())
            .ok_or(MetricsError::Unavailable("temperature sensor"))
    }

    fn memory(&self) -> Memory {
        let mut system = lock(&self.system);
        system.refresh_memory();
        Memory {
            total: system.total_memory(),
            used: system.used_memory(),
        }
    }

    fn is_mount_point(&self, path: &str) -> bool {
        is_mount(Path::new(path))
    }

    fn disk_usage(&self, mount_point: &str) -> Result<DiskUsage, MetricsError> {
        Ok(statvfs(mount_point)?)
    }

    fn interface_exists(&self, interface: &str) -> bool {
        self.net_root.join(interface).exists()
    }

    fn net_counters(&self, interface: &str) -> Result<NetCounters, MetricsError> {
        let mut networks = lock(&self.networks);
        if !networks.contains_key(interface) {
            networks.refresh_list();
        } else {
            networks.refresh();
        }
        let data = networks
            .get(interface)
            .ok_or_else(|| MetricsError::UnknownInterface(interface.to_string()))?;
        Ok(NetCounters {
            received: data.total_received(),
            sent: data.total_transmitted(),
        })
    }

    fn ipv4(&self, interface: &str) -> Option<Ipv4Addr> {
        let addrs = get_if_addrs::get_if_addrs().ok()?;
        addrs
            .into_iter()
            .filter(|iface| iface.name == interface)
            .find_map(|iface| match iface.ip() {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
    }

    fn hostname(&self) -> String {
        System::host_name().unwrap_or_else(|| "?".to_string())
    }
}
