//! Property-based tests for the capture majority vote.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use pwm::majority::{majority_high, most_frequent};

proptest::proptest! {
    /// The winner occurs in the window, exactly `count` times, and no other
    /// value occurs more often.
    #[test]
    fn winner_is_a_true_mode(samples in proptest::collection::vec(0u32..8, 1..64)) {
        let mut window = samples.clone();
        let vote = most_frequent(&mut window).unwrap();
        let occurrences = |v: u32| samples.iter().filter(|&&s| s == v).count();
        assert_eq!(occurrences(vote.value), vote.count);
        for &other in &samples {
            let n = occurrences(other);
            assert!(n < vote.count || (n == vote.count && other >= vote.value));
        }
    }

    /// Input order does not change the result.
    #[test]
    fn order_does_not_matter(samples in proptest::collection::vec(proptest::num::u32::ANY, 1..64)) {
        let mut forward = samples.clone();
        let mut backward: Vec<u32> = samples.iter().rev().copied().collect();
        assert_eq!(most_frequent(&mut forward), most_frequent(&mut backward));
    }

    /// Level majority needs strictly more highs than lows.
    #[test]
    fn level_majority_is_strict(levels in proptest::collection::vec(proptest::bool::ANY, 0..64)) {
        let highs = levels.iter().filter(|&&l| l).count();
        assert_eq!(majority_high(&levels), highs * 2 > levels.len());
    }
}
