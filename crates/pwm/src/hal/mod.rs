//! Channel register adapter
//!
//! This module hides the differences between hardware revisions behind one
//! interface. Driver code talks in software channels; the [`Revision`]
//! constants decide which unit and hardware channel that is, which channel
//! pairs own a hardware dead-time generator, and which optional blocks exist.
//! [`RegisterAdapter`] turns the resulting coordinates into register accesses.
//!
//! | Revision | Units | Channels/unit | Fade | Sync-all | Dead-time pairs |
//! |----------|-------|---------------|------|----------|-----------------|
//! | [`V1px`] | 2 | 6 | no | no | (0,1) (2,3) (4,5) |
//! | [`V2p2`] | 1 | 12 | yes | yes | (0,1) … (10,11) |

pub mod adapter;
pub mod registers;
pub mod v1px;
pub mod v2p2;

pub use adapter::RegisterAdapter;
pub use v1px::V1px;
pub use v2p2::V2p2;

use platform::{ChannelId, GpioId, HwChannel, PwmError, UnitId};

/// Output compare behaviour of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlipMode {
    /// Toggle at CCR1 and again at CCR2.
    Toggle,
    /// Hold the initial level for the whole period (100 % duty).
    HoldHigh,
    /// Toggle at CCR1 and again at reload.
    Complementary,
    /// Force the output inactive (0 % duty).
    ForceLow,
}

impl FlipMode {
    /// Encoding of the mode in the channel control register.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Toggle => 1,
            Self::HoldHigh => 2,
            Self::Complementary => 3,
            Self::ForceLow => 4,
        }
    }

    /// Decode the control-register field. Reserved encodings return `None`.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            1 => Some(Self::Toggle),
            2 => Some(Self::HoldHigh),
            3 => Some(Self::Complementary),
            4 => Some(Self::ForceLow),
            _ => None,
        }
    }
}

/// Constants describing one hardware revision of the PWM block.
///
/// Implemented by zero-sized marker types; the driver is generic over it so
/// every table lookup resolves at compile time.
pub trait Revision {
    /// Human-readable revision name for log banners.
    const NAME: &'static str;

    /// Number of PWM units (register blocks / interrupt lines).
    const UNITS: u8;

    /// Channels in each unit.
    const CHANNELS_PER_UNIT: u8;

    /// Byte distance between consecutive unit register blocks.
    const UNIT_STRIDE: u32;

    /// Whether the per-channel fade engine exists.
    const HAS_FADE: bool;

    /// Whether `TIMER_EN` has the sync-all shadow transfer bit.
    const HAS_SYNC_ALL: bool;

    /// Hardware channel pairs that share a dead-time generator, per unit.
    /// Pair `p` owns dead-time register `p`.
    const DEAD_TIME_PAIRS: &'static [(u8, u8)];

    /// Whether the pad level reads inverted while a channel is capturing.
    const CAPTURE_LEVEL_INVERTED: bool;

    /// Pad of every channel, indexed `[unit][hw_channel]`.
    const GPIO_MAP: &'static [&'static [GpioId]];

    /// Split a software channel into its unit and hardware channel.
    fn locate(ch: ChannelId) -> Result<(UnitId, HwChannel), PwmError> {
        let raw = ch.get();
        let unit = raw
            .checked_div(Self::CHANNELS_PER_UNIT)
            .ok_or(PwmError::InvalidChannel(ch))?;
        let hw = raw
            .checked_rem(Self::CHANNELS_PER_UNIT)
            .ok_or(PwmError::InvalidChannel(ch))?;
        if unit >= Self::UNITS {
            return Err(PwmError::InvalidChannel(ch));
        }
        Ok((UnitId::new(unit), HwChannel::new(hw)))
    }

    /// Software channel at `(unit, hw)`.
    fn channel(unit: UnitId, hw: HwChannel) -> ChannelId {
        ChannelId::new(
            unit.get()
                .saturating_mul(Self::CHANNELS_PER_UNIT)
                .saturating_add(hw.get()),
        )
    }

    /// Total software channels.
    fn channel_count() -> u8 {
        Self::UNITS.saturating_mul(Self::CHANNELS_PER_UNIT)
    }

    /// Dead-time register index if `a` and `b` form a hardware pair.
    fn dead_time_pair(a: HwChannel, b: HwChannel) -> Option<u32> {
        Self::DEAD_TIME_PAIRS
            .iter()
            .position(|&(x, y)| {
                (x == a.get() && y == b.get()) || (x == b.get() && y == a.get())
            })
            .and_then(|pair| u32::try_from(pair).ok())
    }

    /// Pad the channel at `(unit, hw)` is muxed onto.
    fn gpio(unit: UnitId, hw: HwChannel) -> Option<GpioId> {
        Self::GPIO_MAP.get(unit.index())?.get(hw.index()).copied()
    }
}

/// Every unit of revision `R`.
pub fn units<R: Revision>() -> impl Iterator<Item = UnitId> {
    (0..R::UNITS).map(UnitId::new)
}

/// Every hardware channel of one unit of revision `R`.
pub fn hw_channels<R: Revision>() -> impl Iterator<Item = HwChannel> {
    (0..R::CHANNELS_PER_UNIT).map(HwChannel::new)
}
