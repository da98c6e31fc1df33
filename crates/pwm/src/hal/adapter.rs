//! Register-level operations on one PWM channel or unit.
//!
//! [`RegisterAdapter`] is the only place that knows register offsets. It
//! performs no locking of its own: callers hold the driver lock for every
//! read-modify-write so the interrupt handler never observes half an update.
//! Writers are crate-private for that reason; outside the crate the adapter
//! is a read-only view of the register file.

use core::marker::PhantomData;

use platform::{CaptureEdge, DeadCycles, HwChannel, RegisterBus, SignalLevel, UnitId};

use super::registers::*;
use super::{FlipMode, Revision};

/// Counter and compare image of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Prescaler
    pub psc: u32,
    /// Auto-reload (period − 1)
    pub arr: u32,
    /// Compare 1
    pub ccr1: u32,
    /// Compare 2
    pub ccr2: u32,
    /// Compare 3
    pub ccr3: u32,
}

/// Fade engine image of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeRegister {
    /// Compare increment per step
    pub scale: u32,
    /// Periods between steps
    pub interval: u32,
    /// Remaining steps
    pub count: u32,
}

/// Register adapter for revision `R` over bus `B`
pub struct RegisterAdapter<B, R> {
    bus: B,
    _revision: PhantomData<R>,
}

impl<B: RegisterBus, R: Revision> RegisterAdapter<B, R> {
    /// Wrap a bus rooted at the base of unit 0.
    pub(crate) fn new(bus: B) -> Self {
        Self {
            bus,
            _revision: PhantomData,
        }
    }

    fn global(unit: UnitId, reg: u32) -> u32 {
        u32::from(unit.get())
            .wrapping_mul(R::UNIT_STRIDE)
            .wrapping_add(reg)
    }

    fn chan(unit: UnitId, hw: HwChannel, reg: u32) -> u32 {
        Self::global(unit, channel_reg(hw, reg))
    }

    fn write_bit(&self, offset: u32, bit: u32, set: bool) {
        if set {
            self.bus.set_bits(offset, bit);
        } else {
            self.bus.clear_bits(offset, bit);
        }
    }

    // ── Unit-wide ─────────────────────────────────────────────────────────

    /// Whether the unit has left soft reset.
    pub fn soft_reset_released(&self, unit: UnitId) -> bool {
        self.bus.read(Self::global(unit, REG_GLOBAL_CTRL)) & GLOBAL_CTRL_SOFT_RESET_N != 0
    }

    /// Take the unit out of soft reset.
    pub(crate) fn release_soft_reset(&self, unit: UnitId) {
        self.bus
            .set_bits(Self::global(unit, REG_GLOBAL_CTRL), GLOBAL_CTRL_SOFT_RESET_N);
    }

    /// Start or stop the counter of one channel.
    pub(crate) fn set_timer_enable(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::global(unit, REG_TIMER_EN), hw.bit(), enable);
    }

    /// Start or stop the counters of every channel in `mask` in one write.
    pub(crate) fn set_multi_timer_enable(&self, unit: UnitId, mask: u32, enable: bool) {
        self.write_bit(Self::global(unit, REG_TIMER_EN), mask, enable);
    }

    /// Whether the counter of one channel is running.
    pub fn timer_enabled(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::global(unit, REG_TIMER_EN)) & hw.bit() != 0
    }

    /// Transfer every shadow register of the unit at once.
    ///
    /// No-op on revisions without the sync-all bit.
    pub(crate) fn pulse_sync_all(&self, unit: UnitId) {
        if R::HAS_SYNC_ALL {
            let offset = Self::global(unit, REG_TIMER_EN);
            self.bus.set_bits(offset, TIMER_EN_SYNC_ALL);
            self.bus.clear_bits(offset, TIMER_EN_SYNC_ALL);
        }
    }

    /// Connect or disconnect the output driver of one channel.
    pub(crate) fn set_output_enable(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::global(unit, REG_OUTPUT_EN), hw.bit(), enable);
    }

    /// Whether the output driver of one channel is connected.
    pub fn output_enabled(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::global(unit, REG_OUTPUT_EN)) & hw.bit() != 0
    }

    /// Enable or disable the update (reload) interrupt.
    pub(crate) fn set_uie(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::global(unit, REG_INT_EN), update_bit(hw), enable);
    }

    /// Whether the update interrupt is enabled.
    pub fn uie(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::global(unit, REG_INT_EN)) & update_bit(hw) != 0
    }

    /// Enable or disable the capture/compare 1 interrupt.
    pub(crate) fn set_cc1ie(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::global(unit, REG_INT_EN), capture_bit(hw), enable);
    }

    /// Whether the capture/compare 1 interrupt is enabled.
    pub fn cc1ie(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::global(unit, REG_INT_EN)) & capture_bit(hw) != 0
    }

    /// Pending interrupt flags of the unit.
    pub fn interrupt_status(&self, unit: UnitId) -> u32 {
        self.bus.read(Self::global(unit, REG_INT_STATUS))
    }

    /// Clear the flags in `bits` (write-1-to-clear).
    pub(crate) fn clear_interrupt_status(&self, unit: UnitId, bits: u32) {
        self.bus.write(Self::global(unit, REG_INT_STATUS), bits);
    }

    /// Program hardware dead-time generator `pair`.
    pub(crate) fn set_dead_time(&self, unit: UnitId, pair: u32, dead: DeadCycles) {
        self.bus.write(
            Self::global(unit, dead_time_reg(pair)),
            u32::from(dead.get()) & DEAD_TIME_MASK,
        );
    }

    // ── Per-channel ───────────────────────────────────────────────────────

    /// Write prescaler, reload and all three compares.
    pub(crate) fn program(&self, unit: UnitId, hw: HwChannel, timing: &Timing) {
        self.bus.write(Self::chan(unit, hw, CH_PSC), timing.psc);
        self.bus.write(Self::chan(unit, hw, CH_ARR), timing.arr);
        self.bus.write(Self::chan(unit, hw, CH_CCR1), timing.ccr1);
        self.bus.write(Self::chan(unit, hw, CH_CCR2), timing.ccr2);
        self.bus.write(Self::chan(unit, hw, CH_CCR3), timing.ccr3);
    }

    /// Write the compares only, keeping prescaler and reload.
    pub(crate) fn set_compare(&self, unit: UnitId, hw: HwChannel, ccr1: u32, ccr2: u32, ccr3: u32) {
        self.bus.write(Self::chan(unit, hw, CH_CCR1), ccr1);
        self.bus.write(Self::chan(unit, hw, CH_CCR2), ccr2);
        self.bus.write(Self::chan(unit, hw, CH_CCR3), ccr3);
    }

    /// Current prescaler.
    pub fn prescaler(&self, unit: UnitId, hw: HwChannel) -> u32 {
        self.bus.read(Self::chan(unit, hw, CH_PSC))
    }

    /// Current auto-reload value.
    pub fn reload(&self, unit: UnitId, hw: HwChannel) -> u32 {
        self.bus.read(Self::chan(unit, hw, CH_ARR))
    }

    /// Current compare 1 value.
    pub fn compare1(&self, unit: UnitId, hw: HwChannel) -> u32 {
        self.bus.read(Self::chan(unit, hw, CH_CCR1))
    }

    /// Current compare 2 value.
    pub fn compare2(&self, unit: UnitId, hw: HwChannel) -> u32 {
        self.bus.read(Self::chan(unit, hw, CH_CCR2))
    }

    /// Select normal (`false`) or inverted (`true`) output polarity.
    pub(crate) fn set_polarity_inverted(&self, unit: UnitId, hw: HwChannel, inverted: bool) {
        self.write_bit(Self::chan(unit, hw, CH_CTRL), CTRL_POLARITY_INVERTED, inverted);
    }

    /// Whether the output polarity is inverted.
    pub fn polarity_inverted(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::chan(unit, hw, CH_CTRL)) & CTRL_POLARITY_INVERTED != 0
    }

    /// Level driven before the first compare match of each period.
    pub(crate) fn set_init_level(&self, unit: UnitId, hw: HwChannel, level: SignalLevel) {
        self.write_bit(
            Self::chan(unit, hw, CH_CTRL),
            CTRL_INIT_LEVEL_HIGH,
            level.is_high(),
        );
    }

    /// Current initial level.
    pub fn init_level(&self, unit: UnitId, hw: HwChannel) -> SignalLevel {
        SignalLevel::from_bit(self.bus.read(Self::chan(unit, hw, CH_CTRL)) & CTRL_INIT_LEVEL_HIGH != 0)
    }

    /// Select the output compare behaviour.
    pub(crate) fn set_flip_mode(&self, unit: UnitId, hw: HwChannel, mode: FlipMode) {
        self.bus.modify(
            Self::chan(unit, hw, CH_CTRL),
            CTRL_FLIP_MASK,
            mode.bits() << CTRL_FLIP_SHIFT,
        );
    }

    /// Current output compare behaviour, `None` if never configured.
    pub fn flip_mode(&self, unit: UnitId, hw: HwChannel) -> Option<FlipMode> {
        let ctrl = self.bus.read(Self::chan(unit, hw, CH_CTRL));
        FlipMode::from_bits((ctrl & CTRL_FLIP_MASK) >> CTRL_FLIP_SHIFT)
    }

    /// Route reload/compare writes through the shadow registers.
    pub(crate) fn set_preload(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::chan(unit, hw, CH_CTRL), CTRL_PRELOAD, enable);
    }

    /// Whether reload/compare writes are shadowed.
    pub fn preload(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::chan(unit, hw, CH_CTRL)) & CTRL_PRELOAD != 0
    }

    /// Put the channel in capture mode: free-running counter cleared on
    /// every `edge`, no prescaler.
    pub(crate) fn configure_capture(&self, unit: UnitId, hw: HwChannel, edge: CaptureEdge) {
        self.bus.write(Self::chan(unit, hw, CH_PSC), 0);
        self.bus
            .write(Self::chan(unit, hw, CH_ARR), platform::config::CAPTURE_RELOAD);
        self.bus.modify(
            Self::chan(unit, hw, CH_CTRL),
            CTRL_CAPTURE_MODE | CTRL_EDGE_MASK | CTRL_CLEAR_ON_CAPTURE,
            CTRL_CAPTURE_MODE | (edge.bits() << CTRL_EDGE_SHIFT) | CTRL_CLEAR_ON_CAPTURE,
        );
    }

    /// Whether the channel is in capture mode.
    pub fn capture_mode(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::chan(unit, hw, CH_CTRL)) & CTRL_CAPTURE_MODE != 0
    }

    /// Leave capture mode.
    pub(crate) fn clear_capture(&self, unit: UnitId, hw: HwChannel) {
        self.bus.clear_bits(
            Self::chan(unit, hw, CH_CTRL),
            CTRL_CAPTURE_MODE | CTRL_EDGE_MASK | CTRL_CLEAR_ON_CAPTURE,
        );
    }

    /// Configured capture edge.
    pub fn capture_edge(&self, unit: UnitId, hw: HwChannel) -> CaptureEdge {
        let ctrl = self.bus.read(Self::chan(unit, hw, CH_CTRL));
        CaptureEdge::from_bits((ctrl & CTRL_EDGE_MASK) >> CTRL_EDGE_SHIFT)
    }

    /// Counter value latched by the last capture event.
    pub fn capture_shadow(&self, unit: UnitId, hw: HwChannel) -> u32 {
        self.bus.read(Self::chan(unit, hw, CH_CCR1_SHADOW))
    }

    // ── Fade (v2p2) ───────────────────────────────────────────────────────

    /// Program scale, interval and step count, leaving the engine stopped.
    pub(crate) fn set_fade(&self, unit: UnitId, hw: HwChannel, fade: &FadeRegister) {
        self.bus.modify(
            Self::chan(unit, hw, CH_FADE),
            FADE_ENABLE | FADE_SCALE_MASK | FADE_INTERVAL_MASK | FADE_COUNT_MASK,
            ((fade.scale << FADE_SCALE_SHIFT) & FADE_SCALE_MASK)
                | ((fade.interval << FADE_INTERVAL_SHIFT) & FADE_INTERVAL_MASK)
                | ((fade.count << FADE_COUNT_SHIFT) & FADE_COUNT_MASK),
        );
    }

    /// Current fade engine image.
    pub fn fade(&self, unit: UnitId, hw: HwChannel) -> FadeRegister {
        let raw = self.bus.read(Self::chan(unit, hw, CH_FADE));
        FadeRegister {
            scale: (raw & FADE_SCALE_MASK) >> FADE_SCALE_SHIFT,
            interval: (raw & FADE_INTERVAL_MASK) >> FADE_INTERVAL_SHIFT,
            count: (raw & FADE_COUNT_MASK) >> FADE_COUNT_SHIFT,
        }
    }

    /// Overwrite the remaining step count.
    pub(crate) fn set_fade_count(&self, unit: UnitId, hw: HwChannel, count: u32) {
        self.bus.modify(
            Self::chan(unit, hw, CH_FADE),
            FADE_COUNT_MASK,
            count << FADE_COUNT_SHIFT,
        );
    }

    /// Step the compare value up (`true`) or down.
    pub(crate) fn set_fade_increase(&self, unit: UnitId, hw: HwChannel, increase: bool) {
        self.write_bit(Self::chan(unit, hw, CH_FADE), FADE_INCREASE, increase);
    }

    /// Whether the fade engine steps the compare value up.
    pub fn fade_increase(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::chan(unit, hw, CH_FADE)) & FADE_INCREASE != 0
    }

    /// Start or stop the fade engine.
    pub(crate) fn set_fade_enable(&self, unit: UnitId, hw: HwChannel, enable: bool) {
        self.write_bit(Self::chan(unit, hw, CH_FADE), FADE_ENABLE, enable);
    }

    /// Whether the fade engine is running.
    pub fn fade_enabled(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.bus.read(Self::chan(unit, hw, CH_FADE)) & FADE_ENABLE != 0
    }

    // ── Checkpoint ────────────────────────────────────────────────────────

    /// Registers saved across low-voltage sleep, in restore order.
    ///
    /// Configuration comes first and the enables last, so counters restart
    /// only once their compares are back.
    #[cfg(feature = "pm")]
    pub fn checkpoint_offsets(unit: UnitId) -> impl Iterator<Item = u32> {
        const CHANNEL_REGS: [u32; 7] = [CH_CTRL, CH_PSC, CH_ARR, CH_CCR1, CH_CCR2, CH_CCR3, CH_FADE];
        let head = core::iter::once(REG_GLOBAL_CTRL).chain((0..DEAD_TIME_WORDS).map(dead_time_reg));
        let channels = super::hw_channels::<R>()
            .flat_map(|hw| CHANNEL_REGS.into_iter().map(move |reg| channel_reg(hw, reg)));
        let tail = [REG_INT_EN, REG_OUTPUT_EN, REG_TIMER_EN].into_iter();
        head.chain(channels)
            .chain(tail)
            .map(move |reg| Self::global(unit, reg))
    }

    /// Snapshot the checkpoint registers of `unit` into `words`.
    #[cfg(feature = "pm")]
    pub(crate) fn backup(&self, unit: UnitId, words: &mut [u32]) {
        for (word, offset) in words.iter_mut().zip(Self::checkpoint_offsets(unit)) {
            *word = self.bus.read(offset);
        }
    }

    /// Write a snapshot taken by [`Self::backup`] back to `unit`.
    #[cfg(feature = "pm")]
    pub(crate) fn restore(&self, unit: UnitId, words: &[u32]) {
        for (word, offset) in words.iter().zip(Self::checkpoint_offsets(unit)) {
            self.bus.write(offset, *word);
        }
    }
}
