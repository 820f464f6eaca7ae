use super::format;
use super::{Page, PageError};
use crate::display::{Frame, Icon, LINE1, LINE2, LINE3, LINE4};
use crate::metrics::SystemMetrics;

use std::sync::Arc;

/// CPU utilization, frequency, load, temperature and memory.
pub struct CpuMemPage {
    system: Arc<dyn SystemMetrics>,
}

impl CpuMemPage {
    pub fn new(system: Arc<dyn SystemMetrics>) -> CpuMemPage {
        CpuMemPage { system }
    }
}

impl Page for CpuMemPage {
    fn name(&self) -> &str {
        "cpumem"
    }

    fn icon(&self) -> Icon {
        Icon::CpuMem
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError> {
        let cpu = self.system.cpu_percent()? as f64;
        frame.left(LINE1, format!("CPU {}", format::percent(cpu)));
        let mhz = self.system.cpu_frequency_mhz()?;
        frame.right(LINE1, format!("{} MHz", mhz));

        // Load averages relative to the number of CPUs.
        let cpus = self.system.cpu_count().max(1) as f64;
        let load = self.system.load_average();
        let loads: Vec<String> = [load.one, load.five, load.fifteen]
            .iter()
            .map(|l| format::percent(l / cpus * 100.0))
            .collect();
        frame.left(LINE2, "LOAD");
        frame.right(LINE2, loads.join(" "));

        frame.left(LINE3, "TEMP");
        frame.right(LINE3, format!("{:.1} °C", self.system.temperature()?));

        let mem = self.system.memory();
        frame.left(LINE4, "MEM");
        frame.right(LINE4, format::memory(mem.used as f64, mem.total as f64));
        Ok(())
    }
}
