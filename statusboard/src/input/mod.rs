//! Input
//!
//! Push-buttons are sampled from a `DigitalInputSource`. Each button is an
//! `InputSwitch`, a small state machine turning the raw samples into
//! debounced pressed/held callbacks. An `InputMonitor` owns all switches
//! and polls them periodically from its own thread.

mod monitor;
mod switch;
mod sysfs;

pub use monitor::InputMonitor;
pub use switch::{Callback, Callbacks, InputSwitch, SwitchKind, DEFAULT_DEBOUNCE, DEFAULT_HOLD};
pub use sysfs::SysfsGpio;

/// Sampled pin level. With a pull-up a pressed button reads `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_bit(bit: u8) -> Level {
        if bit == 0 {
            Level::Low
        } else {
            Level::High
        }
    }
}

/// Pull resistor configuration of an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("gpio {pin}: {source}")]
    Gpio { pin: u8, source: sysfs_gpio::Error },
    #[error("gpio {pin} was not set up as an input")]
    Unconfigured { pin: u8 },
    #[error("gpio {pin}: unexpected value '{value}'")]
    InvalidValue { pin: u8, value: String },
}

/// Narrow read capability over the digital input pins.
pub trait DigitalInputSource: Send {
    /// Prepare `pin` as an input with the given pull configuration.
    fn setup(&mut self, pin: u8, pull: Pull) -> Result<(), InputError>;

    fn read(&mut self, pin: u8) -> Result<Level, InputError>;
}
