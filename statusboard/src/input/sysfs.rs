use super::{DigitalInputSource, InputError, Level, Pull};

use std::collections::HashMap;

use sysfs_gpio::{Direction, Pin};
use tracing::debug;

/// Input pins through the Linux sysfs GPIO interface.
///
/// Note: sysfs cannot configure pull resistors; they must be set up by the
/// firmware (e.g. `gpio=17=ip,pu` in config.txt).
#[derive(Default)]
pub struct SysfsGpio {
    pins: HashMap<u8, Pin>,
}

impl SysfsGpio {
    pub fn new() -> SysfsGpio {
        SysfsGpio { pins: HashMap::new() }
    }

    /// Pins set up so far, in no particular order.
    pub fn pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.pins.keys().copied()
    }

    fn gpio_err(pin: u8) -> impl FnOnce(sysfs_gpio::Error) -> InputError {
        move |source| InputError::Gpio { pin, source }
    }
}

impl DigitalInputSource for SysfsGpio {
    fn setup(&mut self, pin: u8, pull: Pull) -> Result<(), InputError> {
        let gpio = Pin::new(pin as u64);
        if !gpio.is_exported() {
            gpio.export().map_err(Self::gpio_err(pin))?;
        }
        gpio.set_direction(Direction::In).map_err(Self::gpio_err(pin))?;
        debug!(pin, ?pull, "gpio exported as input, pull left to firmware");
        self.pins.insert(pin, gpio);
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<Level, InputError> {
        let gpio = self.pins.get(&pin).ok_or(InputError::Unconfigured { pin })?;
        match gpio.get_value().map_err(Self::gpio_err(pin))? {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            other => Err(InputError::InvalidValue {
                pin,
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No board has a GPIO 255, so exporting it fails wherever the tests run.
    #[test]
    fn failed_export_names_the_pin() {
        let mut gpio = SysfsGpio::new();
        let err = gpio.setup(255, Pull::Up).unwrap_err();
        assert!(matches!(err, InputError::Gpio { pin: 255, .. }));
        assert!(err.to_string().starts_with("gpio 255: "));
        assert_eq!(gpio.pins().count(), 0);
    }

    #[test]
    fn reading_a_pin_that_was_never_set_up() {
        let mut gpio = SysfsGpio::new();
        assert!(matches!(gpio.read(17), Err(InputError::Unconfigured { pin: 17 })));
    }
}
