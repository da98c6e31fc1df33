//! Duty-cycle normaliser
//!
//! The toggle comparator cannot produce a static output: with duty 0 or
//! duty == period both compare points collapse onto the reload and the pin
//! glitches once per period. These cases are mapped onto the `ForceLow` and
//! `HoldHigh` flip modes instead, with all compares parked at 0.
//!
//! | Request | Level | Flip | CCR1 | CCR2 |
//! |---------|-------|------|------|------|
//! | duty = 0 | low | `ForceLow` | 0 | 0 |
//! | duty = period | high | `HoldHigh` | 0 | 0 |
//! | level low | low | `Toggle` | period − duty | period |
//! | level high | high | `Toggle` | duty | period |
//!
//! Everything here is pure so it can be property-tested on the host.

use platform::config::MIN_COMPARE;
use platform::{PwmError, SignalLevel};

use crate::hal::adapter::Timing;
use crate::hal::FlipMode;

/// Register image produced by [`normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Waveform {
    /// Auto-reload (period − 1)
    pub arr: u32,
    /// Compare 1
    pub ccr1: u32,
    /// Compare 2
    pub ccr2: u32,
    /// Compare 3
    pub ccr3: u32,
    /// Output compare behaviour
    pub flip: FlipMode,
    /// Level before the first compare match
    pub level: SignalLevel,
}

impl Waveform {
    /// Counter image with prescaler `psc`.
    pub fn timing(&self, psc: u32) -> Timing {
        Timing {
            psc,
            arr: self.arr,
            ccr1: self.ccr1,
            ccr2: self.ccr2,
            ccr3: self.ccr3,
        }
    }
}

/// Check that `period` is non-zero and the duties fit inside it.
///
/// An overflowing sum is rejected like an oversized one.
pub fn validate(period: u32, duty: u32, duty2: u32, duty3: u32) -> Result<(), PwmError> {
    if period == 0 {
        return Err(PwmError::InvalidPeriodDuty);
    }
    let total = duty
        .checked_add(duty2)
        .and_then(|sum| sum.checked_add(duty3))
        .ok_or(PwmError::InvalidPeriodDuty)?;
    if total > period {
        return Err(PwmError::InvalidPeriodDuty);
    }
    Ok(())
}

/// Raise a compare value the comparator would never match.
pub fn min_compare(ccr: u32) -> u32 {
    if ccr == 1 {
        MIN_COMPARE
    } else {
        ccr
    }
}

/// Map `(period, duty)` onto a register image.
///
/// `level` is the initial level requested for the middle case; the 0 % and
/// 100 % cases override it. Callers validate first, so `duty <= period` and
/// `period >= 1`.
pub fn normalize(period: u32, duty: u32, level: SignalLevel) -> Waveform {
    let arr = period.saturating_sub(1);
    if duty == 0 {
        return Waveform {
            arr,
            ccr1: 0,
            ccr2: 0,
            ccr3: 0,
            flip: FlipMode::ForceLow,
            level: SignalLevel::Low,
        };
    }
    if duty >= period {
        return Waveform {
            arr,
            ccr1: 0,
            ccr2: 0,
            ccr3: 0,
            flip: FlipMode::HoldHigh,
            level: SignalLevel::High,
        };
    }
    let ccr1 = match level {
        SignalLevel::Low => period.saturating_sub(duty),
        SignalLevel::High => duty,
    };
    Waveform {
        arr,
        ccr1: min_compare(ccr1),
        ccr2: period,
        ccr3: 0,
        flip: FlipMode::Toggle,
        level,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(validate(0, 0, 0, 0), Err(PwmError::InvalidPeriodDuty));
    }

    #[test]
    fn duties_summing_past_period_are_rejected() {
        assert_eq!(validate(100, 60, 30, 20), Err(PwmError::InvalidPeriodDuty));
        assert!(validate(100, 60, 30, 10).is_ok());
    }

    #[test]
    fn overflowing_sum_is_rejected() {
        assert_eq!(
            validate(u32::MAX, u32::MAX, 1, 0),
            Err(PwmError::InvalidPeriodDuty)
        );
    }

    #[test]
    fn zero_duty_forces_low() {
        let w = normalize(100, 0, SignalLevel::High);
        assert_eq!(w.flip, FlipMode::ForceLow);
        assert_eq!(w.level, SignalLevel::Low);
        assert_eq!((w.ccr1, w.ccr2, w.ccr3), (0, 0, 0));
        assert_eq!(w.arr, 99);
    }

    #[test]
    fn full_duty_holds_high() {
        let w = normalize(100, 100, SignalLevel::Low);
        assert_eq!(w.flip, FlipMode::HoldHigh);
        assert_eq!(w.level, SignalLevel::High);
        assert_eq!((w.ccr1, w.ccr2), (0, 0));
    }

    #[test]
    fn low_start_toggles_at_period_minus_duty() {
        let w = normalize(100, 30, SignalLevel::Low);
        assert_eq!(w.flip, FlipMode::Toggle);
        assert_eq!((w.ccr1, w.ccr2), (70, 100));
    }

    #[test]
    fn high_start_toggles_at_duty() {
        let w = normalize(100, 30, SignalLevel::High);
        assert_eq!((w.ccr1, w.ccr2), (30, 100));
        assert_eq!(w.level, SignalLevel::High);
    }

    #[test]
    fn compare_of_one_is_raised_to_two() {
        assert_eq!(normalize(100, 99, SignalLevel::Low).ccr1, 2);
        assert_eq!(normalize(100, 1, SignalLevel::High).ccr1, 2);
    }

    #[test]
    fn timing_carries_prescaler() {
        let t = normalize(1000, 250, SignalLevel::Low).timing(25);
        assert_eq!(t.psc, 25);
        assert_eq!(t.arr, 999);
        assert_eq!(t.ccr1, 750);
    }
}
