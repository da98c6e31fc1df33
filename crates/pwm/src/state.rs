//! Driver bookkeeping shared between thread mode and the interrupt handler.
//!
//! Everything here lives inside the driver's critical-section mutex. Per-unit
//! masks use bit `n` for hardware channel `n`, matching the register layout.

use platform::config::{MAX_CHANNELS_PER_UNIT, MAX_GROUPS, MAX_UNITS};
#[cfg(feature = "pm")]
use platform::config::PM_BACKUP_WORDS;
use platform::{HwChannel, UnitId};

use crate::group::GroupSlot;
#[cfg(feature = "phase-shift")]
use crate::phase_shift::PhaseState;

/// Per-channel callback invoked from the interrupt dispatcher.
pub type ChannelIsr = fn(HwChannel);

/// Saved register image of one unit across low-voltage sleep.
#[cfg(feature = "pm")]
#[derive(Debug, Clone)]
pub struct Checkpoint {
    /// Unit takes part in low-voltage sleep.
    pub registered: bool,
    /// `words` holds a snapshot not yet written back.
    pub valid: bool,
    /// Snapshot in checkpoint order.
    pub words: [u32; PM_BACKUP_WORDS],
}

#[cfg(feature = "pm")]
impl Checkpoint {
    const fn new() -> Self {
        Self {
            registered: false,
            valid: false,
            words: [0; PM_BACKUP_WORDS],
        }
    }
}

/// Bookkeeping for one PWM unit.
#[derive(Debug, Clone)]
pub struct UnitState {
    /// Initialised channels
    pub chan_init_bits: u32,
    /// Channels whose initial level is high
    pub init_signal_level: u32,
    /// Phase-shift channels whose initial level is high
    pub phase_shift_init_level: u32,
    /// Channels of this unit in the phase-shift chain
    pub phase_mask: u32,
    /// Channels in plain timer mode (callback on every update)
    pub timer_mode_bits: u32,
    /// Registered callbacks
    pub isr: [Option<ChannelIsr>; MAX_CHANNELS_PER_UNIT],
    /// Last period measured on a single edge, per channel
    pub capture_period: [Option<u32>; MAX_CHANNELS_PER_UNIT],
    /// Sleep checkpoint
    #[cfg(feature = "pm")]
    pub checkpoint: Checkpoint,
}

fn with_bit(mask: u32, hw: HwChannel, set: bool) -> u32 {
    if set {
        mask | hw.bit()
    } else {
        mask & !hw.bit()
    }
}

impl UnitState {
    const fn new() -> Self {
        Self {
            chan_init_bits: 0,
            init_signal_level: 0,
            phase_shift_init_level: 0,
            phase_mask: 0,
            timer_mode_bits: 0,
            isr: [None; MAX_CHANNELS_PER_UNIT],
            capture_period: [None; MAX_CHANNELS_PER_UNIT],
            #[cfg(feature = "pm")]
            checkpoint: Checkpoint::new(),
        }
    }

    /// Whether `hw` has been initialised.
    pub fn is_init(&self, hw: HwChannel) -> bool {
        self.chan_init_bits & hw.bit() != 0
    }

    /// Record `hw` as initialised or not.
    pub fn set_init(&mut self, hw: HwChannel, init: bool) {
        self.chan_init_bits = with_bit(self.chan_init_bits, hw, init);
    }

    /// Record the initial level of `hw`.
    pub fn set_level_high(&mut self, hw: HwChannel, high: bool) {
        self.init_signal_level = with_bit(self.init_signal_level, hw, high);
    }

    /// Whether the recorded initial level of `hw` is high.
    pub fn level_high(&self, hw: HwChannel) -> bool {
        self.init_signal_level & hw.bit() != 0
    }

    /// Record the phase-shift initial level of `hw`.
    pub fn set_phase_level_high(&mut self, hw: HwChannel, high: bool) {
        self.phase_shift_init_level = with_bit(self.phase_shift_init_level, hw, high);
    }

    /// Whether the recorded phase-shift initial level of `hw` is high.
    pub fn phase_level_high(&self, hw: HwChannel) -> bool {
        self.phase_shift_init_level & hw.bit() != 0
    }

    /// Put `hw` in or out of plain timer mode.
    pub fn set_timer_mode(&mut self, hw: HwChannel, on: bool) {
        self.timer_mode_bits = with_bit(self.timer_mode_bits, hw, on);
    }

    /// Callback registered for `hw`.
    pub fn isr(&self, hw: HwChannel) -> Option<ChannelIsr> {
        self.isr.get(hw.index()).copied().flatten()
    }

    /// Replace the callback of `hw`.
    pub fn set_isr(&mut self, hw: HwChannel, isr: Option<ChannelIsr>) {
        if let Some(slot) = self.isr.get_mut(hw.index()) {
            *slot = isr;
        }
    }

    /// Cached capture period of `hw`.
    pub fn capture_period(&self, hw: HwChannel) -> Option<u32> {
        self.capture_period.get(hw.index()).copied().flatten()
    }

    /// Cache the capture period of `hw`.
    pub fn set_capture_period(&mut self, hw: HwChannel, period: Option<u32>) {
        if let Some(slot) = self.capture_period.get_mut(hw.index()) {
            *slot = period;
        }
    }
}

/// Complete driver bookkeeping.
#[derive(Debug, Clone)]
pub struct DriverState {
    /// Per-unit bookkeeping
    pub units: [UnitState; MAX_UNITS],
    /// Complementary group table
    pub groups: [Option<GroupSlot>; MAX_GROUPS],
    /// Active phase-shift chain
    #[cfg(feature = "phase-shift")]
    pub phase: Option<PhaseState>,
}

impl DriverState {
    /// Empty state: nothing initialised.
    pub const fn new() -> Self {
        const UNIT: UnitState = UnitState::new();
        Self {
            units: [UNIT; MAX_UNITS],
            groups: [None; MAX_GROUPS],
            #[cfg(feature = "phase-shift")]
            phase: None,
        }
    }

    /// Bookkeeping of `unit`.
    pub fn unit(&self, unit: UnitId) -> Option<&UnitState> {
        self.units.get(unit.index())
    }

    /// Mutable bookkeeping of `unit`.
    pub fn unit_mut(&mut self, unit: UnitId) -> Option<&mut UnitState> {
        self.units.get_mut(unit.index())
    }

    /// Whether `(unit, hw)` has been initialised.
    pub fn is_init(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.unit(unit).is_some_and(|u| u.is_init(hw))
    }

    /// Whether the recorded initial level of `(unit, hw)` is high.
    pub fn level_high(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.unit(unit).is_some_and(|u| u.level_high(hw))
    }

    /// Record the initial level of `(unit, hw)`.
    pub fn set_level_high(&mut self, unit: UnitId, hw: HwChannel, high: bool) {
        if let Some(u) = self.unit_mut(unit) {
            u.set_level_high(hw, high);
        }
    }
}

impl Default for DriverState {
    fn default() -> Self {
        Self::new()
    }
}
