use super::{DigitalInputSource, InputError, Level, Pull};
use std::fmt;
use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);
pub const DEFAULT_HOLD: Duration = Duration::from_secs(2);

pub type Callback = Box<dyn FnMut() + Send>;

/// Callback slots of a switch. Which slots are evaluated depends on the
/// `SwitchKind`; unused slots are ignored.
#[derive(Default)]
pub struct Callbacks {
    /// Fires on every poll while down for at least the debounce time.
    pub for_pressed: Option<Callback>,
    /// Fires on every poll while down for at least the hold time.
    pub for_held: Option<Callback>,
    pub released: Option<Callback>,
    pub pressed: Option<Callback>,
    pub held: Option<Callback>,
}

impl Callbacks {
    pub fn new() -> Callbacks {
        Callbacks::default()
    }

    pub fn for_pressed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.for_pressed = Some(Box::new(f));
        self
    }

    pub fn for_held(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.for_held = Some(Box::new(f));
        self
    }

    pub fn released(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.released = Some(Box::new(f));
        self
    }

    pub fn pressed(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.pressed = Some(Box::new(f));
        self
    }

    pub fn held(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.held = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("for_pressed", &self.for_pressed.is_some())
            .field("for_held", &self.for_held.is_some())
            .field("released", &self.released.is_some())
            .field("pressed", &self.pressed.is_some())
            .field("held", &self.held.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// `pressed` on a debounced release.
    Pressed,
    /// `released` + `pressed` on release, `for_pressed` while down.
    PressedAdvanced,
    /// `pressed` or `held` on release, depending on how long it was down.
    Held,
    /// `released` + `pressed`/`held` on release, `for_pressed`/`for_held`
    /// while down.
    HeldAdvanced,
}

impl SwitchKind {
    fn is_advanced(&self) -> bool {
        matches!(self, SwitchKind::PressedAdvanced | SwitchKind::HeldAdvanced)
    }

    fn has_hold(&self) -> bool {
        matches!(self, SwitchKind::Held | SwitchKind::HeldAdvanced)
    }
}

/// State machine over one physical button.
pub struct InputSwitch {
    pin: u8,
    pull: Pull,
    kind: SwitchKind,
    debounce: Duration,
    hold: Duration,
    callbacks: Callbacks,

    reading: Level,
    last_reading: Level,
    /// Time of the last 1->0 transition.
    edge: Option<Instant>,
}

fn fire(slot: &mut Option<Callback>) {
    if let Some(cb) = slot {
        cb();
    }
}

impl InputSwitch {
    pub fn new(pin: u8, pull: Pull, kind: SwitchKind, callbacks: Callbacks) -> InputSwitch {
        InputSwitch {
            pin,
            pull,
            kind,
            debounce: DEFAULT_DEBOUNCE,
            hold: DEFAULT_HOLD,
            callbacks,
            reading: Level::High,
            last_reading: Level::High,
            edge: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Hold threshold, only meaningful for the held kinds.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }

    pub fn pull(&self) -> Pull {
        self.pull
    }

    pub fn kind(&self) -> SwitchKind {
        self.kind
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    /// True while the last sample had the button down.
    pub fn is_down(&self) -> bool {
        self.reading == Level::Low
    }

    /// Read the pin from `source` and advance the state machine.
    pub fn poll<S: DigitalInputSource + ?Sized>(
        &mut self,
        source: &mut S,
        now: Instant,
    ) -> Result<(), InputError> {
        let reading = source.read(self.pin)?;
        self.check(reading, now);
        Ok(())
    }

    /// Advance the state machine with one sample taken at `now`. Callbacks
    /// run synchronously from here.
    pub fn check(&mut self, reading: Level, now: Instant) {
        self.reading = reading;
        match (self.last_reading, reading) {
            (Level::High, Level::Low) => self.edge = Some(now),
            (Level::Low, Level::Low) => self.check_down(now),
            (Level::Low, Level::High) => self.check_release(now),
            (Level::High, Level::High) => {}
        }
        self.last_reading = reading;
    }

    fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.edge.map(|t| now.saturating_duration_since(t))
    }

    fn check_down(&mut self, now: Instant) {
        if !self.kind.is_advanced() {
            return;
        }
        let Some(elapsed) = self.elapsed(now) else {
            return;
        };
        if self.kind.has_hold() && elapsed >= self.hold {
            fire(&mut self.callbacks.for_held);
        } else if elapsed >= self.debounce {
            fire(&mut self.callbacks.for_pressed);
        }
    }

    fn check_release(&mut self, now: Instant) {
        let Some(elapsed) = self.elapsed(now) else {
            return;
        };
        let held = self.kind.has_hold() && elapsed >= self.hold;
        if !held && elapsed < self.debounce {
            return;
        }
        if self.kind.is_advanced() {
            fire(&mut self.callbacks.released);
        }
        if held {
            fire(&mut self.callbacks.held);
        } else {
            fire(&mut self.callbacks.pressed);
        }
    }
}

impl fmt::Debug for InputSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSwitch")
            .field("pin", &self.pin)
            .field("kind", &self.kind)
            .field("debounce", &self.debounce)
            .field("hold", &self.hold)
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
