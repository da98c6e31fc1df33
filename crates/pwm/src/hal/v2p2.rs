//! v2p2 revision: one unit of twelve channels.
//!
//! Adds the per-channel fade engine and the `TIMER_EN` sync-all bit. Every
//! adjacent even/odd pair owns a dead-time generator. The pad input stage
//! inverts while a channel is in capture mode.

use platform::GpioId;

use super::Revision;

/// v2p2 marker type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct V2p2;

const PADS: &[GpioId] = &[
    GpioId::new(6),
    GpioId::new(7),
    GpioId::new(8),
    GpioId::new(9),
    GpioId::new(10),
    GpioId::new(11),
    GpioId::new(12),
    GpioId::new(13),
    GpioId::new(14),
    GpioId::new(15),
    GpioId::new(16),
    GpioId::new(17),
];

impl Revision for V2p2 {
    const NAME: &'static str = "v2p2";
    const UNITS: u8 = 1;
    const CHANNELS_PER_UNIT: u8 = 12;
    const UNIT_STRIDE: u32 = 0x200;
    const HAS_FADE: bool = true;
    const HAS_SYNC_ALL: bool = true;
    const DEAD_TIME_PAIRS: &'static [(u8, u8)] =
        &[(0, 1), (2, 3), (4, 5), (6, 7), (8, 9), (10, 11)];
    const CAPTURE_LEVEL_INVERTED: bool = true;
    const GPIO_MAP: &'static [&'static [GpioId]] = &[PADS];
}
