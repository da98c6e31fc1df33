//! v1px revision: two units of six channels.
//!
//! Each unit raises its own interrupt line. Channel pairs (0,1), (2,3) and
//! (4,5) share a hardware dead-time generator. There is no fade engine and
//! no sync-all bit, so phase-shift chains spanning both units start one unit
//! after the other.

use platform::GpioId;

use super::Revision;

/// v1px marker type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct V1px;

const UNIT0_PADS: &[GpioId] = &[
    GpioId::new(6),
    GpioId::new(7),
    GpioId::new(8),
    GpioId::new(9),
    GpioId::new(24),
    GpioId::new(26),
];

const UNIT1_PADS: &[GpioId] = &[
    GpioId::new(14),
    GpioId::new(15),
    GpioId::new(16),
    GpioId::new(17),
    GpioId::new(18),
    GpioId::new(19),
];

impl Revision for V1px {
    const NAME: &'static str = "v1px";
    const UNITS: u8 = 2;
    const CHANNELS_PER_UNIT: u8 = 6;
    const UNIT_STRIDE: u32 = 0x200;
    const HAS_FADE: bool = false;
    const HAS_SYNC_ALL: bool = false;
    const DEAD_TIME_PAIRS: &'static [(u8, u8)] = &[(0, 1), (2, 3), (4, 5)];
    const CAPTURE_LEVEL_INVERTED: bool = false;
    const GPIO_MAP: &'static [&'static [GpioId]] = &[UNIT0_PADS, UNIT1_PADS];
}
