use crate::display::{DisplayError, DisplaySink};

use std::time::{Duration, Instant};

use tracing::debug;

/// Turns the display off after a period without button activity.
#[derive(Debug, Clone)]
pub struct Screensaver {
    timeout: Duration,
    last_activity: Instant,
    display_on: bool,
}

impl Screensaver {
    /// A timeout of 0 minutes disables the screensaver.
    pub fn new(minutes: u64, now: Instant) -> Screensaver {
        Screensaver {
            timeout: Duration::from_secs(minutes * 60),
            last_activity: now,
            display_on: true,
        }
    }

    pub fn enabled(&self) -> bool {
        !self.timeout.is_zero()
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    /// Switch the display off once the idle time reaches the timeout.
    pub fn logic<D: DisplaySink + ?Sized>(
        &mut self,
        now: Instant,
        display: &mut D,
    ) -> Result<(), DisplayError> {
        if !self.enabled() || !self.display_on {
            return Ok(());
        }
        if now.saturating_duration_since(self.last_activity) >= self.timeout {
            display.hide()?;
            self.display_on = false;
            debug!("screensaver on");
        }
        Ok(())
    }

    /// Switch the display on and restart the idle timer.
    pub fn wake<D: DisplaySink + ?Sized>(
        &mut self,
        now: Instant,
        display: &mut D,
    ) -> Result<(), DisplayError> {
        self.last_activity = now;
        display.show()?;
        self.display_on = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::MemoryDisplay;

    #[test]
    fn sleeps_after_timeout() {
        let start = Instant::now();
        let mut display = MemoryDisplay::new();
        let mut saver = Screensaver::new(1, start);
        saver.logic(start + Duration::from_secs(59), &mut display).unwrap();
        assert!(saver.is_display_on());
        saver.logic(start + Duration::from_secs(60), &mut display).unwrap();
        assert!(!saver.is_display_on());
        saver.logic(start + Duration::from_secs(61), &mut display).unwrap();
        assert_eq!(display.hides(), 1);
        assert!(!display.is_visible());
    }

    #[test]
    fn zero_minutes_never_sleeps() {
        let start = Instant::now();
        let mut display = MemoryDisplay::new();
        let mut saver = Screensaver::new(0, start);
        assert!(!saver.enabled());
        saver.logic(start + Duration::from_secs(86_400), &mut display).unwrap();
        assert!(saver.is_display_on());
        assert_eq!(display.hides(), 0);
    }

    #[test]
    fn wake_restarts_idle_timer() {
        let start = Instant::now();
        let mut display = MemoryDisplay::new();
        let mut saver = Screensaver::new(1, start);
        saver.wake(start + Duration::from_secs(50), &mut display).unwrap();
        saver.wake(start + Duration::from_secs(50), &mut display).unwrap();
        saver.logic(start + Duration::from_secs(100), &mut display).unwrap();
        assert!(saver.is_display_on());
        saver.logic(start + Duration::from_secs(110), &mut display).unwrap();
        assert!(!saver.is_display_on());
        saver.wake(start + Duration::from_secs(111), &mut display).unwrap();
        assert!(saver.is_display_on());
        assert!(display.is_visible());
        assert_eq!(display.shows(), 3);
    }
}
