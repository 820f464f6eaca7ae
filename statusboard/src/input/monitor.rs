use super::{DigitalInputSource, InputError, InputSwitch};
use crate::runtime::RunFlag;

use std::collections::HashSet;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use tracing::{debug, info, warn};

/// Owns the configured switches and the input source they are read from.
pub struct InputMonitor<S: DigitalInputSource> {
    source: S,
    switches: Vec<InputSwitch>,
    /// Pins whose last read failed, so the failure is only logged once.
    failing: HashSet<u8>,
}

impl<S: DigitalInputSource + 'static> InputMonitor<S> {
    pub fn new(source: S) -> InputMonitor<S> {
        InputMonitor {
            source,
            switches: Vec::new(),
            failing: HashSet::new(),
        }
    }

    /// Configure the switch's pin on the source and register it. Switches
    /// are checked in registration order.
    pub fn add(&mut self, switch: InputSwitch) -> Result<(), InputError> {
        self.source.setup(switch.pin(), switch.pull())?;
        debug!(pin = switch.pin(), kind = ?switch.kind(), "button registered");
        self.switches.push(switch);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Poll every switch once.
    pub fn check(&mut self, now: Instant) {
        for switch in self.switches.iter_mut() {
            let pin = switch.pin();
            match switch.poll(&mut self.source, now) {
                Ok(()) => {
                    self.failing.remove(&pin);
                }
                Err(err) => {
                    if self.failing.insert(pin) {
                        warn!("button read failed: {}", err);
                    }
                }
            }
        }
    }

    /// Run `check()` every `period` on a dedicated thread until `running`
    /// is cleared.
    pub fn spawn(mut self, period: Duration, running: RunFlag) -> io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                info!(buttons = self.len(), "input monitor started");
                let ticker = channel::tick(period);
                while running.is_running() {
                    let Ok(now) = ticker.recv() else {
                        break;
                    };
                    self.check(now);
                }
                info!("input monitor stopped");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Callbacks, Level, Pull, SwitchKind};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakePins {
        levels: HashMap<u8, Level>,
        configured: Vec<(u8, Pull)>,
    }

    impl DigitalInputSource for FakePins {
        fn setup(&mut self, pin: u8, pull: Pull) -> Result<(), InputError> {
            self.configured.push((pin, pull));
            self.levels.insert(pin, Level::High);
            Ok(())
        }

        fn read(&mut self, pin: u8) -> Result<Level, InputError> {
            self.levels.get(&pin).copied().ok_or(InputError::InvalidValue {
                pin,
                value: "unexported".to_string(),
            })
        }
    }

    /// Pins the test can still drive once the monitor runs on its own thread.
    #[derive(Clone, Default)]
    struct SharedPins {
        levels: Arc<Mutex<HashMap<u8, Level>>>,
        reads: Arc<AtomicUsize>,
    }

    impl SharedPins {
        fn set(&self, pin: u8, level: Level) {
            self.levels.lock().unwrap().insert(pin, level);
        }

        /// Block until the monitor has sampled the pins at least once more.
        fn wait_for_reads(&self) {
            let seen = self.reads.load(Ordering::SeqCst);
            let deadline = Instant::now() + Duration::from_secs(5);
            while self.reads.load(Ordering::SeqCst) <= seen + 1 {
                assert!(Instant::now() < deadline, "monitor is not polling");
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    impl DigitalInputSource for SharedPins {
        fn setup(&mut self, pin: u8, _: Pull) -> Result<(), InputError> {
            self.set(pin, Level::High);
            Ok(())
        }

        fn read(&mut self, pin: u8) -> Result<Level, InputError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.levels.lock().unwrap()[&pin])
        }
    }

    fn counting_switch(pin: u8, counter: &Arc<AtomicUsize>) -> InputSwitch {
        let counter = counter.clone();
        let callbacks = Callbacks::new().pressed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        InputSwitch::new(pin, Pull::Up, SwitchKind::Pressed, callbacks)
    }

    #[test]
    fn add_configures_pins_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut monitor = InputMonitor::new(FakePins::default());
        monitor.add(counting_switch(17, &counter)).unwrap();
        monitor.add(counting_switch(27, &counter)).unwrap();
        assert_eq!(monitor.len(), 2);
        assert_eq!(
            monitor.source().configured,
            vec![(17, Pull::Up), (27, Pull::Up)]
        );
    }

    #[test]
    fn check_polls_every_switch() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let mut monitor = InputMonitor::new(FakePins::default());
        monitor.add(counting_switch(17, &a)).unwrap();
        monitor.add(counting_switch(27, &b)).unwrap();

        let t0 = Instant::now();
        monitor.source_mut().levels.insert(27, Level::Low);
        monitor.check(t0);
        monitor.source_mut().levels.insert(27, Level::High);
        monitor.check(t0 + Duration::from_millis(100));

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_pin_does_not_stop_other_switches() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let mut monitor = InputMonitor::new(FakePins::default());
        monitor.add(counting_switch(17, &a)).unwrap();
        monitor.add(counting_switch(27, &b)).unwrap();
        monitor.source_mut().levels.remove(&17);

        let t0 = Instant::now();
        monitor.source_mut().levels.insert(27, Level::Low);
        monitor.check(t0);
        monitor.source_mut().levels.insert(27, Level::High);
        monitor.check(t0 + Duration::from_millis(100));

        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert!(monitor.failing.contains(&17));
    }

    #[test]
    fn spawned_monitor_fires_callbacks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pins = SharedPins::default();
        let mut monitor = InputMonitor::new(pins.clone());
        monitor
            .add(counting_switch(17, &counter).with_debounce(Duration::from_millis(5)))
            .unwrap();
        let running = RunFlag::new();
        let handle = monitor
            .spawn(Duration::from_millis(1), running.clone())
            .unwrap();

        pins.wait_for_reads();
        pins.set(17, Level::Low);
        pins.wait_for_reads();
        thread::sleep(Duration::from_millis(20));
        pins.set(17, Level::High);

        let deadline = Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "press never reported");
            thread::sleep(Duration::from_millis(1));
        }
        running.stop();
        handle.join().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawned_monitor_stops_with_flag() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut monitor = InputMonitor::new(FakePins::default());
        monitor.add(counting_switch(17, &counter)).unwrap();
        let running = RunFlag::new();
        let handle = monitor
            .spawn(Duration::from_millis(1), running.clone())
            .unwrap();
        running.stop();
        handle.join().unwrap();
    }
}
