use super::format;
use super::{Page, PageError};
use crate::display::{Anchor, Frame, Icon, Point, LEFT, LINE1, LINE2, LINE3, LINE4};
use crate::metrics::{NetCounters, SystemMetrics};

use std::sync::Arc;

/// Hostname, address and throughput of one network interface.
pub struct NetworkPage {
    icon: Icon,
    interface: String,
    system: Arc<dyn SystemMetrics>,
    /// Counters at the previous paint, None right after a reset.
    last: Option<NetCounters>,
}

impl NetworkPage {
    pub fn new(icon: Icon, interface: &str, system: Arc<dyn SystemMetrics>) -> NetworkPage {
        NetworkPage {
            icon,
            interface: interface.to_string(),
            system,
            last: None,
        }
    }

    /// Bytes (sent, received) since the previous sample.
    fn sample(&mut self) -> Result<(u64, u64), PageError> {
        let now = self.system.net_counters(&self.interface)?;
        let delta = match self.last {
            Some(prev) => (
                now.sent.saturating_sub(prev.sent),
                now.received.saturating_sub(prev.received),
            ),
            None => (0, 0),
        };
        self.last = Some(now);
        Ok(delta)
    }
}

impl Page for NetworkPage {
    fn name(&self) -> &str {
        "network"
    }

    fn icon(&self) -> Icon {
        self.icon
    }

    fn draw(&mut self, frame: &mut Frame) -> Result<(), PageError> {
        if !self.system.interface_exists(&self.interface) {
            return Err(PageError::NoInterface(self.interface.clone()));
        }
        let (sent, received) = self.sample()?;

        frame.left(LINE1, self.system.hostname());
        let address = match self.system.ipv4(&self.interface) {
            Some(ip) => ip.to_string(),
            None => "?".to_string(),
        };
        frame.left(LINE2, address);

        frame.bitmap(Point::new(1, LINE3), Icon::NetUp);
        frame.text(
            Point::new(LEFT + 11, LINE3),
            format::rate(sent as f64),
            Anchor::Left,
        );
        frame.bitmap(Point::new(1, LINE4), Icon::NetDown);
        frame.text(
            Point::new(LEFT + 11, LINE4),
            format::rate(received as f64),
            Anchor::Left,
        );
        frame.right(LINE4, self.interface.as_str());
        Ok(())
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FixedInterface, FixedMetrics};
    use std::net::Ipv4Addr;

    fn set_counters(metrics: &FixedMetrics, sent: u64, received: u64) {
        metrics.set_interface(
            "eth0",
            FixedInterface {
                counters: NetCounters { received, sent },
                ipv4: Some(Ipv4Addr::new(192, 168, 1, 20)),
            },
        );
    }

    #[test]
    fn rates_are_deltas_between_paints() {
        let metrics = Arc::new(FixedMetrics::new());
        set_counters(&metrics, 10_000, 50_000);
        let mut page = NetworkPage::new(Icon::Lan, "eth0", metrics.clone());

        let mut frame = Frame::new();
        page.draw(&mut frame).unwrap();
        assert_eq!(
            frame.texts(),
            vec!["raspberrypi", "192.168.1.20", "0.000 KB/s", "0.000 KB/s", "eth0"]
        );
        assert_eq!(frame.icons(), vec![Icon::NetUp, Icon::NetDown]);

        set_counters(&metrics, 11_500, 2_050_000);
        let mut frame = Frame::new();
        page.draw(&mut frame).unwrap();
        assert_eq!(frame.texts()[2], "1.500 KB/s");
        assert_eq!(frame.texts()[3], "2.000 MB/s");

        // After a reset the first sample is a baseline again.
        page.reset();
        let mut frame = Frame::new();
        page.draw(&mut frame).unwrap();
        assert_eq!(frame.texts()[2], "0.000 KB/s");
    }

    #[test]
    fn missing_interface_is_reported() {
        let metrics = Arc::new(FixedMetrics::new());
        let mut page = NetworkPage::new(Icon::Wifi, "wlan0", metrics);
        let err = page.draw(&mut Frame::new()).unwrap_err();
        assert_eq!(
            err.diagnostic(),
            vec!["Network interface", "'wlan0'", "does not exist"]
        );
    }
}
