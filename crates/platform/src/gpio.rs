//! GPIO pin multiplexing for PWM outputs and capture inputs.

use crate::pwm_types::GpioId;

/// Routes PWM functions onto SoC pads and samples pad levels.
pub trait PinMux {
    /// Attach the PWM function to `gpio`.
    fn map_pwm(&self, gpio: GpioId);

    /// Detach whatever function currently owns `gpio`.
    fn unmap(&self, gpio: GpioId);

    /// Enable the pad pull-up.
    fn pull_up(&self, gpio: GpioId);

    /// Sample the pad input level. `true` is high.
    fn read_input(&self, gpio: GpioId) -> bool;
}

impl<T: PinMux + ?Sized> PinMux for &T {
    fn map_pwm(&self, gpio: GpioId) {
        (**self).map_pwm(gpio);
    }

    fn unmap(&self, gpio: GpioId) {
        (**self).unmap(gpio);
    }

    fn pull_up(&self, gpio: GpioId) {
        (**self).pull_up(gpio);
    }

    fn read_input(&self, gpio: GpioId) -> bool {
        (**self).read_input(gpio)
    }
}
