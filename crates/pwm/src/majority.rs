//! Majority vote over capture samples.
//!
//! Capture values jitter by a count or two and the occasional sample is
//! garbage (a glitch edge, a missed interrupt). The most frequent value of a
//! window is taken as the measurement.

/// Winning value of a vote and how many samples carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vote {
    /// Most frequent sample value
    pub value: u32,
    /// Occurrences of `value`
    pub count: usize,
}

/// Most frequent value in `samples`, or `None` for an empty slice.
///
/// Sorts `samples` in place, then scans runs of equal values. On a tie the
/// smaller value wins.
pub fn most_frequent(samples: &mut [u32]) -> Option<Vote> {
    samples.sort_unstable();
    let mut best: Option<Vote> = None;
    let mut run: Option<Vote> = None;
    for &value in samples.iter() {
        run = match run {
            Some(r) if r.value == value => Some(Vote {
                value,
                count: r.count.saturating_add(1),
            }),
            _ => Some(Vote { value, count: 1 }),
        };
        if let Some(r) = run {
            if best.map_or(true, |b| r.count > b.count) {
                best = Some(r);
            }
        }
    }
    best
}

/// Majority of boolean samples; ties resolve to `false`.
pub fn majority_high(levels: &[bool]) -> bool {
    let high = levels.iter().filter(|&&l| l).count();
    high > levels.len().saturating_sub(high)
}
