//! Property-based tests for the duty normaliser.
//! Verifies the register image is well-formed for ALL valid requests.

#![allow(clippy::arithmetic_side_effects)]

use platform::SignalLevel;
use pwm::duty::{normalize, validate};
use pwm::hal::FlipMode;

fn level(high: bool) -> SignalLevel {
    SignalLevel::from_bit(high)
}

proptest::proptest! {
    /// A validated request always yields compares inside the period, and
    /// never the unmatched compare value 1.
    #[test]
    fn compares_stay_inside_period(
        period in 1u32..=u32::MAX,
        duty_seed in proptest::num::u32::ANY,
        high in proptest::bool::ANY,
    ) {
        let duty = duty_seed % period.saturating_add(1).max(1);
        if validate(period, duty, 0, 0).is_ok() {
            let wave = normalize(period, duty, level(high));
            assert_eq!(wave.arr, period - 1);
            assert!(wave.ccr1 <= period, "ccr1 {} period {}", wave.ccr1, period);
            assert!(wave.ccr2 <= period);
            assert_ne!(wave.ccr1, 1);
            assert_eq!(wave.ccr3, 0);
        }
    }

    /// The extremes are static regardless of the requested level.
    #[test]
    fn extremes_are_static(period in 1u32..=u32::MAX, high in proptest::bool::ANY) {
        let off = normalize(period, 0, level(high));
        assert_eq!((off.flip, off.level), (FlipMode::ForceLow, SignalLevel::Low));
        let on = normalize(period, period, level(high));
        assert_eq!((on.flip, on.level), (FlipMode::HoldHigh, SignalLevel::High));
    }

    /// Low- and high-starting waveforms of the same duty are mirror images.
    #[test]
    fn levels_mirror_each_other(period in 4u32..=1_000_000, duty_seed in proptest::num::u32::ANY) {
        let duty = 2 + duty_seed % (period - 3);
        let low = normalize(period, duty, SignalLevel::Low);
        let high = normalize(period, duty, SignalLevel::High);
        assert_eq!(low.flip, FlipMode::Toggle);
        assert_eq!(high.ccr1, duty);
        assert_eq!(low.ccr1, period - duty);
    }

    /// Validation accepts exactly the requests whose duties fit the period.
    #[test]
    fn validation_matches_checked_sum(period: u32, d1: u32, d2: u32, d3: u32) {
        let fits = u64::from(d1) + u64::from(d2) + u64::from(d3) <= u64::from(period);
        assert_eq!(validate(period, d1, d2, d3).is_ok(), period != 0 && fits);
    }
}
