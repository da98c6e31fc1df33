//! Power management abstraction
//!
//! Provides clock gating for the PWM units and the sleep modes the register
//! checkpoint reacts to.

use crate::pwm_types::UnitId;

/// Clock gating for PWM units.
///
/// Each unit has its own clock domain. Powering a unit down loses every
/// register value in it, which is why the driver checkpoints registers
/// before low-voltage sleep.
pub trait ClockGate {
    /// Enable the clock domain of `unit`.
    fn power_up(&self, unit: UnitId);

    /// Gate the clock domain of `unit`.
    fn power_down(&self, unit: UnitId);

    /// Select the source clock that feeds the unit's prescalers.
    fn select_source(&self, unit: UnitId, source: ClockSource);
}

impl<T: ClockGate + ?Sized> ClockGate for &T {
    fn power_up(&self, unit: UnitId) {
        (**self).power_up(unit);
    }

    fn power_down(&self, unit: UnitId) {
        (**self).power_down(unit);
    }

    fn select_source(&self, unit: UnitId, source: ClockSource) {
        (**self).select_source(unit, source);
    }
}

/// PWM source clocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    /// External crystal (26 MHz); stable across CPU frequency changes.
    Xtal,
    /// System bus clock; follows CPU frequency votes.
    System,
}

/// Sleep modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SleepMode {
    /// Idle mode (CPU stopped, peripherals running)
    Idle,
    /// Low-voltage mode (peripheral clock domains off, RAM retained)
    LowVoltage,
    /// Deep sleep (minimal power, peripherals reset on wake)
    DeepSleep,
}
