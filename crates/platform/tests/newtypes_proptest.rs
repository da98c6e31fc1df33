//! Property-based tests for PWM newtype range checks.
//! Verifies invariants hold for ALL inputs, not just fixed examples.

use platform::{DeadCycles, HwChannel};

proptest::proptest! {
    /// DeadCycles::try_new never panics and accepts exactly 0..=0x3FF.
    #[test]
    fn dead_cycles_accepts_exactly_ten_bits(cycles in 0u32..=u32::MAX) {
        let result = DeadCycles::try_new(cycles);
        assert_eq!(result.is_ok(), cycles <= 0x3FF, "cycles = {}", cycles);
        if let Ok(dead) = result {
            assert_eq!(u32::from(dead.get()), cycles);
        }
    }

    /// HwChannel::bit is a single bit for every index that fits a word.
    #[test]
    fn hw_channel_bit_is_single_bit(raw in 0u8..32u8) {
        let bit = HwChannel::new(raw).bit();
        assert_eq!(bit.count_ones(), 1);
        assert_eq!(bit.trailing_zeros(), u32::from(raw));
    }
}
