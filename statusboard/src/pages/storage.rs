use super::format;
use super::{Page, PageError};
use crate::display::{text_width, Frame, Icon, LINE1, LINE2, LINE3, LINE4, WIDTH};
use crate::metrics::SystemMetrics;

use std::sync::Arc;

/// Usage of one mounted file system.
pub struct StoragePage {
    icon: Icon,
    mount_point: String,
    system: Arc<dyn SystemMetrics>,
}

impl StoragePage {
    pub fn new(icon: Icon, mount_point: &str, system: Arc<dyn SystemMetrics>) -> StoragePage {
        StoragePage {
            icon,
            mount_point: mount_point.to_string(),
            system,
        }
    }
}

impl Page for StoragePage {
    fn name(&self) -> &str {
        "storage"
    }

    fn icon(&self) -> Icon {
        self.icon
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError> {
        if !self.system.is_mount_point(&self.mount_point) {
            return Err(PageError::NotMounted(self.mount_point.clone()));
        }
        let usage = self.system.disk_usage(&self.mount_point)?;

        if text_width(&format!("MOUNT  {}", self.mount_point)) <= WIDTH {
            frame.left(LINE1, "MOUNT");
            frame.right(LINE1, self.mount_point.as_str());
        } else {
            frame.left(LINE1, self.mount_point.as_str());
        }
        frame.left(LINE2, "USED");
        frame.right(LINE2, format::size(usage.used as f64));
        frame.left(LINE3, "FREE");
        frame.right(LINE3, format::size(usage.free as f64));
        frame.left(LINE4, "TOTAL");
        frame.right(LINE4, format::size(usage.total as f64));
        Ok(())
    }
}
