//! Driver configuration and constants
//!
//! Central sizing values shared by the platform and driver crates. Tables in
//! the driver are sized by these maxima; each hardware revision declares how
//! much of them it actually uses.

/// Crate name reported in log banners.
pub const DRIVER_NAME: &str = "pwm";

/// Driver version (synchronized with Cargo.toml)
pub const DRIVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest number of PWM units on any supported revision.
pub const MAX_UNITS: usize = 2;

/// Largest number of channels in one unit on any supported revision.
pub const MAX_CHANNELS_PER_UNIT: usize = 12;

/// Complementary group slots.
pub const MAX_GROUPS: usize = 6;

/// Channels one phase-shift chain can hold.
pub const MAX_PHASE_CHANNELS: usize = 12;

/// Samples collected per capture measurement before the majority vote.
pub const CAPTURE_SAMPLE_WINDOW: usize = 50;

/// Auto-reload value used in capture mode (free-running counter).
pub const CAPTURE_RELOAD: u32 = 0xFFFF_FFFF;

/// Largest dead time the hardware generator accepts.
pub const DEAD_TIME_MAX: u32 = 0x3FF;

/// Smallest compare value the comparator honours; 1 never matches.
pub const MIN_COMPARE: u32 = 2;

/// Registers saved per unit by the power-management checkpoint.
///
/// 4 global control words + 6 dead-time words + 7 words per channel.
pub const PM_BACKUP_WORDS: usize = 4 + 6 + 7 * MAX_CHANNELS_PER_UNIT;
