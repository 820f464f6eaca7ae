//! Pages
//!
//! A page knows how to fill the text phase of its visit; icon painting and
//! repaint timing belong to the scheduler. Pages that fail return a
//! `PageError`, which the scheduler turns into a static diagnostic.

mod cpumem;
mod docker;
mod format;
mod network;
mod storage;

pub use cpumem::CpuMemPage;
pub use docker::DockerPage;
pub use network::NetworkPage;
pub use storage::StoragePage;

use crate::display::{DisplayError, Frame, Icon};
use crate::metrics::{ContainerRuntime, MetricsError, SystemMetrics};

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;

/// Default minimum time between two text paints.
pub const TEXT_INTERVAL: Duration = Duration::from_secs(1);

pub trait Page: Send {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Icon shown when the page is entered.
    fn icon(&self) -> Icon;

    /// Minimum time between two text paints.
    fn refresh_interval(&self) -> Duration {
        TEXT_INTERVAL
    }

    /// Called once at the start of every visit, before the icon phase.
    fn enter(&mut self) {}

    /// Draw the text phase of the page into `frame`.
    fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError>;

    /// Drop cached state; called whenever the scheduler navigates.
    fn reset(&mut self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Path '{0}' is not a mount point!")]
    NotMounted(String),
    #[error("Network interface '{0}' does not exist!")]
    NoInterface(String),
    #[error("Docker service is not active or not installed!")]
    ContainersInactive,
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Display(#[from] DisplayError),
}

impl PageError {
    /// Lines painted in place of the page while the error persists.
    pub fn diagnostic(&self) -> Vec<String> {
        match self {
            PageError::NotMounted(path) => vec![
                "Path".to_string(),
                format!("'{}'", path),
                "is not a".to_string(),
                "mount point!".to_string(),
            ],
            PageError::NoInterface(interface) => vec![
                "Network interface".to_string(),
                format!("'{}'", interface),
                "does not exist".to_string(),
            ],
            PageError::ContainersInactive => vec![
                "Docker service".to_string(),
                "is not active".to_string(),
                "or not installed!".to_string(),
            ],
            PageError::Metrics(_) | PageError::Display(_) => {
                vec!["Unable to".to_string(), "read metrics".to_string()]
            }
        }
    }
}

/// Page types known to the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    CpuMem,
    Storage,
    Network,
    Docker,
}

impl PageKind {
    pub fn from_name(name: &str) -> Option<PageKind> {
        match name.to_lowercase().as_str() {
            "cpumem" => Some(PageKind::CpuMem),
            "storage" => Some(PageKind::Storage),
            "network" => Some(PageKind::Network),
            "docker" => Some(PageKind::Docker),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PageKind::CpuMem => "cpumem",
            PageKind::Storage => "storage",
            PageKind::Network => "network",
            PageKind::Docker => "docker",
        }
    }

    /// Advanced pages take an `icon` and a `value`; simple pages take
    /// neither.
    pub fn is_advanced(&self) -> bool {
        matches!(self, PageKind::Storage | PageKind::Network)
    }

    /// Icons an advanced page may be configured with.
    pub fn icons(&self) -> &'static [Icon] {
        match self {
            PageKind::Storage => &[Icon::Emmc, Icon::Hdd, Icon::Sd, Icon::Ssd],
            PageKind::Network => &[Icon::Wifi, Icon::Lan],
            PageKind::CpuMem | PageKind::Docker => &[],
        }
    }

    /// Checks the `value` of an advanced page.
    pub fn accepts_value(&self, value: &str) -> bool {
        match self {
            PageKind::Storage => is_mount_path(value),
            PageKind::Network => is_interface_name(value),
            PageKind::CpuMem | PageKind::Docker => false,
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static MOUNT_PATH: OnceLock<Option<Regex>> = OnceLock::new();
static INTERFACE_NAME: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern_matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

/// Either `/` or one or more `/segment` with segments of `[A-Za-z0-9_-]`.
fn is_mount_path(value: &str) -> bool {
    pattern_matches(&MOUNT_PATH, r"^(/|(/[a-zA-Z0-9_-]+)+)$", value)
}

/// `wlan` or `eth` followed by exactly one digit.
fn is_interface_name(value: &str) -> bool {
    pattern_matches(&INTERFACE_NAME, r"^(wlan|eth)[0-9]$", value)
}

/// Arguments of an advanced page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArgs {
    pub icon: Icon,
    pub value: String,
}

/// Validated description of one configured page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    pub kind: PageKind,
    pub args: Option<PageArgs>,
}

/// Where the pages get their numbers from.
#[derive(Clone)]
pub struct Sources {
    pub system: Arc<dyn SystemMetrics>,
    pub containers: Arc<dyn ContainerRuntime>,
}

/// Instantiate the page described by `spec`.
pub fn build(spec: &PageSpec, sources: &Sources) -> Box<dyn Page> {
    let system = sources.system.clone();
    match (spec.kind, &spec.args) {
        (PageKind::Storage, Some(args)) => {
            Box::new(StoragePage::new(args.icon, &args.value, system))
        }
        (PageKind::Storage, None) => Box::new(StoragePage::new(Icon::Sd, "/", system)),
        (PageKind::Network, Some(args)) => {
            Box::new(NetworkPage::new(args.icon, &args.value, system))
        }
        (PageKind::Network, None) => Box::new(NetworkPage::new(Icon::Lan, "eth0", system)),
        (PageKind::CpuMem, _) => Box::new(CpuMemPage::new(system)),
        (PageKind::Docker, _) => Box::new(DockerPage::new(sources.containers.clone())),
    }
}
