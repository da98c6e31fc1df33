//! Channel lifecycle: `init → start → set_period_duty → stop → deinit`.
//!
//! Each public operation takes the driver lock once and works on the locked
//! bookkeeping through `*_locked` helpers, so group and phase-shift code can
//! reuse the same steps without re-entering the mutex.

use platform::config::MIN_COMPARE;
use platform::{
    ChannelId, ClockGate, GpioId, HwChannel, PinMux, PwmError, RegisterBus, SignalLevel, UnitId,
};

use crate::driver::PwmDriver;
use crate::duty;
use crate::hal::{hw_channels, units, FlipMode, Revision};
use crate::state::{ChannelIsr, DriverState};

/// Period and duty of one channel, in counter cycles.
///
/// The three duties together must fit inside the period. Only `duty` shapes
/// the output; `duty2` and `duty3` reserve room for the extra compares and
/// are validated but not programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeriodDutyConfig {
    /// Counter cycles per PWM period
    pub period: u32,
    /// Active cycles per period
    pub duty: u32,
    /// Second compare reservation
    pub duty2: u32,
    /// Third compare reservation
    pub duty3: u32,
    /// Prescaler (counter clock = source / (psc + 1))
    pub psc: u32,
}

impl PeriodDutyConfig {
    /// `duty` active cycles out of `period`, no prescaler.
    pub const fn new(period: u32, duty: u32) -> Self {
        Self {
            period,
            duty,
            duty2: 0,
            duty3: 0,
            psc: 0,
        }
    }

    /// Same config with prescaler `psc`.
    #[must_use]
    pub const fn with_prescaler(mut self, psc: u32) -> Self {
        self.psc = psc;
        self
    }

    fn validate(&self) -> Result<(), PwmError> {
        duty::validate(self.period, self.duty, self.duty2, self.duty3)
    }
}

/// Configuration passed to [`PwmDriver::init`].
pub type PwmInitConfig = PeriodDutyConfig;

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    // ── Locked helpers ────────────────────────────────────────────────────

    /// Program the normalised waveform and record its initial level.
    pub(crate) fn apply_waveform(
        &self,
        st: &mut DriverState,
        unit: UnitId,
        hw: HwChannel,
        config: &PeriodDutyConfig,
        level: SignalLevel,
    ) {
        let wave = duty::normalize(config.period, config.duty, level);
        self.regs.set_init_level(unit, hw, wave.level);
        st.set_level_high(unit, hw, wave.level.is_high());
        self.regs.program(unit, hw, &wave.timing(config.psc));
        self.regs.set_flip_mode(unit, hw, wave.flip);
    }

    fn deinit_locked(&self, st: &mut DriverState, unit: UnitId, hw: HwChannel) {
        self.check_restore(st, unit);
        let idle = PeriodDutyConfig::new(1, 0);
        self.apply_waveform(st, unit, hw, &idle, SignalLevel::Low);
        self.regs.set_output_enable(unit, hw, false);
        self.regs.set_timer_enable(unit, hw, false);
        self.regs.set_uie(unit, hw, false);
        self.regs.set_cc1ie(unit, hw, false);
        if let Some(u) = st.unit_mut(unit) {
            u.set_isr(hw, None);
        }
        self.deinit_common(st, unit, hw);
    }

    /// Whether the channel currently drives a 100 % waveform.
    fn is_full_duty(&self, unit: UnitId, hw: HwChannel) -> bool {
        self.regs.flip_mode(unit, hw) == Some(FlipMode::HoldHigh)
            || self.regs.compare1(unit, hw) == self.regs.reload(unit, hw)
    }

    /// Whether the channel currently drives a 0 % waveform.
    fn is_zero_duty(&self, unit: UnitId, hw: HwChannel) -> bool {
        match self.regs.flip_mode(unit, hw) {
            Some(FlipMode::ForceLow) => true,
            Some(FlipMode::HoldHigh) => false,
            _ => self.regs.compare1(unit, hw) == 0,
        }
    }

    fn set_level_locked(
        &self,
        st: &mut DriverState,
        unit: UnitId,
        hw: HwChannel,
        level: SignalLevel,
    ) {
        self.regs.set_init_level(unit, hw, level);
        st.set_level_high(unit, hw, level.is_high());
    }

    // ── Public operations ─────────────────────────────────────────────────

    /// Initialise `ch`: power its unit, mux its pad and program the waveform.
    ///
    /// The channel starts with its output disabled; call [`Self::start`].
    pub fn init(&self, ch: ChannelId, config: &PwmInitConfig) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            self.check_restore(st, unit);
            if let Err(e) = config.validate() {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "ch{}: rejected period {} duty {}",
                    ch.get(),
                    config.period,
                    config.duty
                );
                return Err(e);
            }
            self.init_common(st, unit, hw);
            self.set_level_locked(st, unit, hw, SignalLevel::Low);
            self.regs.set_preload(unit, hw, true);
            self.apply_waveform(st, unit, hw, config, SignalLevel::Low);
            #[cfg(feature = "defmt")]
            defmt::info!(
                "ch{} init: period {} duty {} psc {}",
                ch.get(),
                config.period,
                config.duty,
                config.psc
            );
            Ok(())
        })
    }

    /// Park `ch` at 0 %, stop it and release its pad and clock share.
    ///
    /// Deinitialising a channel that was never initialised does nothing.
    pub fn deinit(&self, ch: ChannelId) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            if st.is_init(unit, hw) {
                self.deinit_locked(st, unit, hw);
                #[cfg(feature = "defmt")]
                defmt::info!("ch{} deinit", ch.get());
            }
        });
        Ok(())
    }

    /// Connect the output and start the counter.
    pub fn start(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_output_enable(unit, hw, true);
            self.regs.set_timer_enable(unit, hw, true);
            Ok(())
        })
    }

    /// Disconnect the output. The counter keeps running.
    pub fn stop(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_output_enable(unit, hw, false);
            Ok(())
        })
    }

    /// Reprogram period and duty, keeping the channel's initial level.
    ///
    /// With preload enabled the change lands at the next period boundary.
    pub fn set_period_duty(&self, ch: ChannelId, config: &PeriodDutyConfig) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            config.validate()?;
            self.check_restore(st, unit);
            self.regs.set_preload(unit, hw, true);
            let level = SignalLevel::from_bit(st.level_high(unit, hw));
            self.apply_waveform(st, unit, hw, config, level);
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "ch{}: period {} duty {}",
                ch.get(),
                config.period,
                config.duty
            );
            Ok(())
        })
    }

    /// Start each period low. A channel at 100 % stays high.
    pub fn set_init_signal_low(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            let level = if self.is_full_duty(unit, hw) {
                SignalLevel::High
            } else {
                SignalLevel::Low
            };
            self.set_level_locked(st, unit, hw, level);
            Ok(())
        })
    }

    /// Start each period high. A channel at 0 % stays low.
    pub fn set_init_signal_high(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            let level = if self.is_zero_duty(unit, hw) {
                SignalLevel::Low
            } else {
                SignalLevel::High
            };
            self.set_level_locked(st, unit, hw, level);
            Ok(())
        })
    }

    /// Re-mux the channel pad, e.g. after another driver borrowed it.
    pub fn set_gpio(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.mux_gpio(unit, hw);
            Ok(())
        })
    }

    /// Pad the channel is muxed onto.
    pub fn gpio(&self, ch: ChannelId) -> Result<GpioId, PwmError> {
        let (unit, hw) = R::locate(ch)?;
        R::gpio(unit, hw).ok_or(PwmError::InvalidChannel(ch))
    }

    /// Install (or with `None`, remove) the callback for `ch`.
    ///
    /// Callbacks run from [`Self::on_interrupt`] after the driver lock is
    /// released, so they may call back into the driver.
    pub fn register_isr(&self, ch: ChannelId, isr: Option<ChannelIsr>) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            if let Some(u) = st.unit_mut(unit) {
                u.set_isr(hw, isr);
            }
        });
        Ok(())
    }

    /// Enable the capture/compare interrupt of `ch`.
    pub fn enable_interrupt(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_cc1ie(unit, hw, true);
            Ok(())
        })
    }

    /// Disable the capture/compare interrupt of `ch` and drop a pending flag.
    pub fn disable_interrupt(&self, ch: ChannelId) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            self.check_restore(st, unit);
            self.regs.set_cc1ie(unit, hw, false);
            self.regs
                .clear_interrupt_status(unit, crate::hal::registers::capture_bit(hw));
        });
        Ok(())
    }

    /// Run `ch` as a plain periodic timer: output off, update interrupt on.
    ///
    /// The registered callback fires once per period.
    pub fn set_mode_timer(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_output_enable(unit, hw, false);
            self.regs.set_flip_mode(unit, hw, FlipMode::ForceLow);
            if self.regs.compare1(unit, hw) < MIN_COMPARE {
                self.regs.set_compare(unit, hw, MIN_COMPARE, 0, 0);
            }
            if let Some(u) = st.unit_mut(unit) {
                u.set_timer_mode(hw, true);
            }
            self.regs.set_uie(unit, hw, true);
            self.regs.set_timer_enable(unit, hw, true);
            Ok(())
        })
    }

    /// Deinitialise every channel and forget all groups and chains.
    pub fn shutdown(&self) {
        self.with_state(|st| {
            #[cfg(feature = "phase-shift")]
            {
                st.phase = None;
            }
            st.groups = [None; platform::config::MAX_GROUPS];
            for unit in units::<R>() {
                for hw in hw_channels::<R>() {
                    if st.is_init(unit, hw) {
                        self.deinit_locked(st, unit, hw);
                    }
                }
                if let Some(u) = st.unit_mut(unit) {
                    u.phase_mask = 0;
                    u.phase_shift_init_level = 0;
                }
            }
        });
        #[cfg(feature = "defmt")]
        defmt::info!("{} driver shut down", R::NAME);
    }
}
