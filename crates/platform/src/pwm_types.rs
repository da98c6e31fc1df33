//! PWM domain newtypes for compile-time safety.
//!
//! These zero-cost wrappers keep the different integer spaces of the driver
//! apart:
//! - `ChannelId`: software channel index used by application code
//! - `UnitId` / `HwChannel`: the hardware coordinates a channel maps onto
//! - `DeadCycles`: value for the 10-bit hardware dead-time generator
//! - `GroupId`: slot in the complementary-pair group table
//! - `GpioId`: SoC pad a channel is muxed onto

use core::fmt;

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── ChannelId ────────────────────────────────────────────────────────────────

/// Software channel index.
///
/// Channel `n` lives on unit `n / CHANNELS_PER_UNIT` at hardware channel
/// `n % CHANNELS_PER_UNIT`. Whether a given index exists depends on the
/// hardware revision, so range checking happens in the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ChannelId(u8);

impl ChannelId {
    /// Wrap a raw software channel index.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Return the raw channel index.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for ChannelId {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

// ── UnitId / HwChannel ───────────────────────────────────────────────────────

/// Index of a PWM unit (one register block, one interrupt line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct UnitId(u8);

impl UnitId {
    /// Wrap a raw unit index.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Return the raw unit index.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Return the unit index as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Channel index within one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct HwChannel(u8);

impl HwChannel {
    /// Wrap a raw hardware channel index.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Return the raw hardware channel index.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Return the channel index as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Single-bit mask for this channel in per-unit bitmask registers.
    ///
    /// Returns 0 for indices that do not fit a 32-bit mask.
    #[must_use]
    pub fn bit(self) -> u32 {
        1u32.checked_shl(u32::from(self.0)).unwrap_or(0)
    }
}

// ── DeadCycles ───────────────────────────────────────────────────────────────

/// Dead-time length in timer cycles for the hardware dead-time generator.
///
/// The generator register is 10 bits wide, so the valid range is 0–1023.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct DeadCycles(u16);

impl DeadCycles {
    /// Largest value the dead-time register can hold.
    pub const MAX: u16 = 0x3FF;

    /// Create a `DeadCycles`, returning an error above [`Self::MAX`].
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `cycles > 0x3FF`.
    pub fn try_new(cycles: u32) -> Result<Self, OutOfRangeError> {
        match u16::try_from(cycles) {
            Ok(c) if c <= Self::MAX => Ok(Self(c)),
            _ => Err(OutOfRangeError {
                value: cycles,
                min: 0,
                max: u32::from(Self::MAX),
            }),
        }
    }

    /// Return the raw cycle count.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

// ── GroupId ──────────────────────────────────────────────────────────────────

/// Handle to a complementary-pair group returned by `group_init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct GroupId(u8);

impl GroupId {
    /// Wrap a raw group slot index.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Return the raw slot index.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Return the slot as a table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group{}", self.0)
    }
}

// ── GpioId ───────────────────────────────────────────────────────────────────

/// SoC pad number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct GpioId(u8);

impl GpioId {
    /// Wrap a raw pad number.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Return the raw pad number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

// ── Signal / capture / fade enums ────────────────────────────────────────────

/// Output level a channel drives before its first compare match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SignalLevel {
    /// Output starts low.
    #[default]
    Low,
    /// Output starts high.
    High,
}

impl SignalLevel {
    /// `true` for [`SignalLevel::High`].
    #[must_use]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    /// Build from a bitmask test.
    #[must_use]
    pub const fn from_bit(set: bool) -> Self {
        if set {
            Self::High
        } else {
            Self::Low
        }
    }
}

/// Input edge that latches the counter in capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureEdge {
    /// Latch on rising edges; successive captures measure the period.
    Rising,
    /// Latch on falling edges; successive captures measure the period.
    Falling,
    /// Latch on both edges; captures alternate between high and low time.
    Both,
}

impl CaptureEdge {
    /// Encoding of the edge in the channel control register.
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rising => 0,
            Self::Falling => 1,
            Self::Both => 2,
        }
    }

    /// Decode the control-register field. Unknown encodings read as `Both`.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => Self::Rising,
            1 => Self::Falling,
            _ => Self::Both,
        }
    }
}

/// Direction the fade engine steps the duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FadeDirection {
    /// Duty grows by `scale` every interval.
    Increase,
    /// Duty shrinks by `scale` every interval.
    Decrease,
}

impl FadeDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Increase => Self::Decrease,
            Self::Decrease => Self::Increase,
        }
    }
}
