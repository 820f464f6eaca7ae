use super::{format, Page, PageError, TEXT_INTERVAL};
use crate::display::{Frame, Icon, LINE1, LINE2, LINE3, LINE4};
use crate::metrics::{ContainerOverview, ContainerRuntime, ContainerStats, ContainerTotals};
use crate::refresh::RefreshJob;

use std::sync::Arc;
use std::time::Duration;

const PENDING: &str = "get data";

/// Container engine status and resource totals.
///
/// Both the container list and the stats come from external processes, so
/// they are refreshed in the background and painted as they become
/// available.
pub struct DockerPage {
    overview: RefreshJob<ContainerOverview>,
    stats: RefreshJob<Vec<ContainerStats>>,
    complete: bool,
}

impl DockerPage {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> DockerPage {
        let rt = runtime.clone();
        let overview = RefreshJob::new("containers", move || rt.overview());
        let stats = RefreshJob::new("container-stats", move || runtime.stats());
        DockerPage {
            overview,
            stats,
            complete: false,
        }
    }
}

impl Page for DockerPage {
    fn name(&self) -> &str {
        "docker"
    }

    fn icon(&self) -> Icon {
        Icon::Docker
    }

    /// Repaint every second until the totals are in, then every 5 seconds.
    fn refresh_interval(&self) -> Duration {
        if self.complete {
            Duration::from_secs(5)
        } else {
            TEXT_INTERVAL
        }
    }

    // The container list is requested while the icon is up, so the first
    // text paint usually has it.
    fn enter(&mut self) {
        self.overview.kick();
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError> {
        self.overview.kick();
        let overview = self.overview.poll().cloned();
        if let Some(overview) = &overview {
            if !overview.active {
                return Err(PageError::ContainersInactive);
            }
            self.stats.kick();
        }
        let totals = self.stats.poll().and_then(|s| ContainerTotals::sum(s));
        self.complete = overview.is_some() && totals.is_some();

        frame.clear();
        frame.left(LINE1, "RUNNING");
        frame.right(
            LINE1,
            match &overview {
                Some(o) => format!("{} / {}", o.running(), o.total()),
                None => PENDING.to_string(),
            },
        );

        frame.left(LINE2, "CPU LOAD");
        frame.left(LINE3, "MEM");
        frame.left(LINE4, "PIDS");
        match totals {
            Some(t) => {
                frame.right(LINE2, format!("{:.2} %", t.cpu_percent));
                frame.right(LINE3, format::memory(t.mem_used, t.mem_limit));
                frame.right(LINE4, format!("{:6}", t.pids));
            }
            None => {
                frame.right(LINE2, PENDING);
                frame.right(LINE3, PENDING);
                frame.right(LINE4, PENDING);
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.overview.reset();
        self.stats.reset();
        self.complete = false;
    }
}
