//! Phase-shifted channel chains.
//!
//! N channels share one period and fire one after the other: each active
//! window starts where the previous one ended, wrapping around the period
//! boundary. Channels at 0 % or 100 % are parked static and do not move the
//! chain.
//!
//! ```text
//! period  |<------------------------------ P ------------------------------>|
//! ch a    |‾‾‾‾‾‾‾‾‾‾‾|__________________________________________________ |
//! ch b    |___________|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|_______________________________ |
//! ch c    |‾‾‾‾|_____________________________|‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾|  (wraps)
//! ```
//!
//! A duty change is applied by the update interrupt of the first chain
//! channel in two passes: the first rewrites every compare pair, the second
//! (one period later, once the compares are live) flips the initial levels
//! that changed.

use heapless::Vec;
use platform::config::{MAX_PHASE_CHANNELS, MIN_COMPARE};
use platform::{
    ChannelId, ClockGate, HwChannel, PinMux, PwmError, RegisterBus, SignalLevel, UnitId,
};

use crate::driver::PwmDriver;
use crate::duty::min_compare;
use crate::hal::adapter::Timing;
use crate::hal::{units, FlipMode, Revision};
use crate::state::{DriverState, UnitState};

/// Duty of one chain member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseDuty {
    /// Channel
    pub chan: ChannelId,
    /// Active cycles per period
    pub duty: u32,
}

/// A phase-shift chain, in firing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseShiftConfig {
    /// Shared period in counter cycles
    pub period: u32,
    /// Shared prescaler
    pub psc: u32,
    /// Chain members in firing order
    pub duties: Vec<PhaseDuty, MAX_PHASE_CHANNELS>,
}

impl PhaseShiftConfig {
    /// Empty chain.
    pub const fn new(period: u32, psc: u32) -> Self {
        Self {
            period,
            psc,
            duties: Vec::new(),
        }
    }

    /// Append a member.
    pub fn push(&mut self, chan: ChannelId, duty: u32) -> Result<(), PwmError> {
        self.duties
            .push(PhaseDuty { chan, duty })
            .map_err(|_| PwmError::PhaseShiftChannelCount)
    }

    /// Builder form of [`Self::push`].
    pub fn with(mut self, chan: ChannelId, duty: u32) -> Result<Self, PwmError> {
        self.push(chan, duty)?;
        Ok(self)
    }

    fn validate<R: Revision>(&self) -> Result<(), PwmError> {
        if self.duties.len() < 2 {
            return Err(PwmError::PhaseShiftChannelCount);
        }
        if self.period == 0 {
            return Err(PwmError::InvalidPeriodDuty);
        }
        for (i, member) in self.duties.iter().enumerate() {
            if member.duty == 1 || member.duty > self.period {
                return Err(PwmError::InvalidPeriodDuty);
            }
            R::locate(member.chan)?;
            if self.duties.iter().take(i).any(|m| m.chan == member.chan) {
                return Err(PwmError::InvalidChannel(member.chan));
            }
        }
        Ok(())
    }

    fn same_members(&self, other: &Self) -> Result<(), PwmError> {
        if self.duties.len() != other.duties.len() {
            return Err(PwmError::PhaseShiftChannelCount);
        }
        match self
            .duties
            .iter()
            .zip(other.duties.iter())
            .find(|(a, b)| a.chan != b.chan)
        {
            Some((_, b)) => Err(PwmError::InvalidChannel(b.chan)),
            None => Ok(()),
        }
    }
}

/// How a chain member occupies the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Window {
    /// 0 %: parked low
    Off,
    /// 100 %: parked high
    Full,
    /// First windowed member; its window opens at the period boundary
    First,
    /// Window opens where the previous windowed member closed
    Chained,
}

/// Planned compare points of one chain member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseSlot {
    /// Channel
    pub chan: ChannelId,
    /// Window kind
    pub window: Window,
    /// Window opens
    pub ccr1: u32,
    /// Window closes
    pub ccr2: u32,
    /// Level at the period boundary
    pub level: SignalLevel,
}

/// Index of the first member whose duty is neither 0 nor the full period.
pub fn first_valid_index(config: &PhaseShiftConfig) -> Option<usize> {
    config
        .duties
        .iter()
        .position(|m| m.duty != 0 && m.duty != config.period)
}

/// Lay the chain out over one period.
///
/// A window that runs past the period boundary wraps; the member then starts
/// the period high and its `ccr2` is the wrapped end.
pub fn plan(config: &PhaseShiftConfig) -> Vec<PhaseSlot, MAX_PHASE_CHANNELS> {
    let first = first_valid_index(config);
    let period = config.period;
    let mut end = 0u32;
    let mut slots = Vec::new();
    for (i, member) in config.duties.iter().enumerate() {
        let slot = if member.duty == 0 {
            PhaseSlot {
                chan: member.chan,
                window: Window::Off,
                ccr1: 0,
                ccr2: 0,
                level: SignalLevel::Low,
            }
        } else if member.duty == period {
            PhaseSlot {
                chan: member.chan,
                window: Window::Full,
                ccr1: 0,
                ccr2: 0,
                level: SignalLevel::High,
            }
        } else if Some(i) == first {
            end = member.duty;
            PhaseSlot {
                chan: member.chan,
                window: Window::First,
                ccr1: 0,
                ccr2: end,
                level: SignalLevel::High,
            }
        } else {
            let start = end;
            let reach = start.saturating_add(member.duty);
            let (ccr2, level) = if reach > period {
                (reach.saturating_sub(period), SignalLevel::High)
            } else {
                (reach, SignalLevel::Low)
            };
            end = ccr2;
            PhaseSlot {
                chan: member.chan,
                window: Window::Chained,
                ccr1: start,
                ccr2,
                level,
            }
        };
        // Capacity matches the config's, so this never drops a slot.
        let _ = slots.push(slot);
    }
    slots
}

/// Active chain plus interrupt-pass bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseState {
    /// Current chain
    pub config: PhaseShiftConfig,
    /// Update pass already done for the pending change (0 or 1)
    pub pass: u8,
}

fn phase_level_high(units: &[UnitState], unit: UnitId, hw: HwChannel) -> bool {
    units
        .get(unit.index())
        .is_some_and(|u| u.phase_level_high(hw))
}

fn set_phase_level(units: &mut [UnitState], unit: UnitId, hw: HwChannel, high: bool) {
    if let Some(u) = units.get_mut(unit.index()) {
        u.set_phase_level_high(hw, high);
    }
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    fn phase_timing(config: &PhaseShiftConfig, ccr1: u32, ccr2: u32) -> Timing {
        Timing {
            psc: config.psc,
            arr: config.period.saturating_sub(1),
            ccr1: min_compare(ccr1),
            ccr2: min_compare(ccr2),
            ccr3: 0,
        }
    }

    fn phase_head(st: &DriverState) -> Result<(UnitId, HwChannel), PwmError> {
        let head = st
            .phase
            .as_ref()
            .and_then(|p| p.config.duties.first())
            .ok_or(PwmError::PhaseShiftNotInit)?;
        R::locate(head.chan)
    }

    fn phase_stop_locked(&self, st: &mut DriverState) {
        for unit in units::<R>() {
            let mask = st.unit(unit).map_or(0, |u| u.phase_mask);
            if mask != 0 {
                self.check_restore(st, unit);
                self.regs.set_multi_timer_enable(unit, mask, false);
            }
        }
    }

    fn phase_release_locked(&self, st: &mut DriverState) {
        self.phase_stop_locked(st);
        let Some(phase) = st.phase.take() else {
            return;
        };
        for member in &phase.config.duties {
            if let Ok((unit, hw)) = R::locate(member.chan) {
                self.regs.set_uie(unit, hw, false);
                self.deinit_common(st, unit, hw);
            }
        }
        for unit in units::<R>() {
            if let Some(u) = st.unit_mut(unit) {
                u.phase_mask = 0;
                u.phase_shift_init_level = 0;
            }
        }
    }

    /// Initialise every chain member and lay out its window.
    ///
    /// An existing chain is stopped and released first. Counters stay
    /// stopped until [`Self::phase_shift_start`].
    pub fn phase_shift_init(&self, config: &PhaseShiftConfig) -> Result<(), PwmError> {
        config.validate::<R>()?;
        self.with_state(|st| {
            self.phase_release_locked(st);
            for unit in units::<R>() {
                self.check_restore(st, unit);
            }
            for slot in plan(config) {
                let (unit, hw) = R::locate(slot.chan)?;
                self.init_common(st, unit, hw);
                self.regs.set_preload(unit, hw, true);
                self.regs.set_flip_mode(unit, hw, FlipMode::Toggle);
                let timing = match slot.window {
                    Window::Off | Window::Full => Self::phase_timing(config, 0, 0),
                    // A window opening at 0 is encoded as opening at the
                    // period with the level already high.
                    Window::First => Self::phase_timing(config, config.period, slot.ccr2),
                    Window::Chained => Self::phase_timing(config, slot.ccr1, slot.ccr2),
                };
                self.regs.set_init_level(unit, hw, slot.level);
                self.regs.program(unit, hw, &timing);
                self.regs.set_output_enable(unit, hw, true);
                if let Some(u) = st.unit_mut(unit) {
                    u.set_phase_level_high(hw, slot.level.is_high());
                    u.phase_mask |= hw.bit();
                }
            }
            st.phase = Some(PhaseState {
                config: config.clone(),
                pass: 0,
            });
            #[cfg(feature = "defmt")]
            defmt::info!(
                "phase shift: {} channels, period {}",
                config.duties.len(),
                config.period
            );
            Ok(())
        })
    }

    /// Stop the chain, release its channels and forget it.
    pub fn phase_shift_deinit(&self) -> Result<(), PwmError> {
        self.with_state(|st| self.phase_release_locked(st));
        Ok(())
    }

    /// Start every chain counter, the first member's unit first.
    pub fn phase_shift_start(&self) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (head_unit, _) = Self::phase_head(st)?;
            let rest = units::<R>().filter(|u| *u != head_unit);
            for unit in core::iter::once(head_unit).chain(rest) {
                self.check_restore(st, unit);
                let mask = st.unit(unit).map_or(0, |u| u.phase_mask);
                if mask != 0 {
                    self.regs.set_multi_timer_enable(unit, mask, true);
                    self.regs.pulse_sync_all(unit);
                }
            }
            Ok(())
        })
    }

    /// Stop every chain counter.
    pub fn phase_shift_stop(&self) -> Result<(), PwmError> {
        self.with_state(|st| self.phase_stop_locked(st));
        Ok(())
    }

    /// Store a new duty for one member. Takes effect with
    /// [`Self::phase_shift_update_duty`].
    pub fn phase_shift_set_duty(&self, ch: ChannelId, duty: u32) -> Result<(), PwmError> {
        self.with_state(|st| {
            let phase = st.phase.as_mut().ok_or(PwmError::PhaseShiftNotInit)?;
            if duty == 1 || duty > phase.config.period {
                return Err(PwmError::InvalidPeriodDuty);
            }
            let member = phase
                .config
                .duties
                .iter_mut()
                .find(|m| m.chan == ch)
                .ok_or(PwmError::InvalidChannel(ch))?;
            member.duty = duty;
            Ok(())
        })
    }

    /// Arm the update interrupt so stored duties are applied.
    pub fn phase_shift_update_duty(&self) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::phase_head(st)?;
            self.check_restore(st, unit);
            self.regs.set_uie(unit, hw, true);
            Ok(())
        })
    }

    /// Replace every duty (and optionally period and prescaler) and arm the
    /// update in one critical section. The member list must match the chain.
    pub fn phase_shift_set_duty_and_update(
        &self,
        config: &PhaseShiftConfig,
    ) -> Result<(), PwmError> {
        config.validate::<R>()?;
        self.with_state(|st| {
            let phase = st.phase.as_mut().ok_or(PwmError::PhaseShiftNotInit)?;
            phase.config.same_members(config)?;
            phase.config = config.clone();
            let (unit, hw) = Self::phase_head(st)?;
            self.check_restore(st, unit);
            self.regs.set_uie(unit, hw, true);
            Ok(())
        })
    }

    /// Whether `(unit, hw)` is the first chain member.
    pub(crate) fn is_phase_head(st: &DriverState, unit: UnitId, hw: HwChannel) -> bool {
        Self::phase_head(st).is_ok_and(|head| head == (unit, hw))
    }

    /// One update-interrupt pass over the chain.
    pub(crate) fn phase_update_step(&self, st: &mut DriverState) {
        let DriverState { units, phase, .. } = st;
        let Some(phase) = phase.as_mut() else {
            return;
        };
        let Some(head) = phase.config.duties.first() else {
            return;
        };
        let Ok((head_unit, head_hw)) = R::locate(head.chan) else {
            return;
        };
        self.regs.set_uie(head_unit, head_hw, false);
        let layout = plan(&phase.config);

        if phase.pass == 0 {
            for slot in &layout {
                let Ok((unit, hw)) = R::locate(slot.chan) else {
                    continue;
                };
                let high = phase_level_high(units.as_slice(), unit, hw);
                self.regs.set_flip_mode(unit, hw, FlipMode::Toggle);
                let timing = match slot.window {
                    Window::Off | Window::Full => Self::phase_timing(&phase.config, 0, 0),
                    Window::First => {
                        let open = if high { phase.config.period } else { MIN_COMPARE };
                        Self::phase_timing(&phase.config, open, slot.ccr2)
                    }
                    Window::Chained => Self::phase_timing(&phase.config, slot.ccr1, slot.ccr2),
                };
                self.regs.program(unit, hw, &timing);
                if slot.window == Window::Off && high {
                    self.regs.set_output_enable(unit, hw, false);
                }
            }
            phase.pass = 1;
            self.regs.set_uie(head_unit, head_hw, true);
        } else {
            phase.pass = 0;
            for slot in &layout {
                let Ok((unit, hw)) = R::locate(slot.chan) else {
                    continue;
                };
                let high = phase_level_high(units.as_slice(), unit, hw);
                match slot.window {
                    Window::First => {}
                    Window::Off => {
                        if high {
                            self.regs.set_init_level(unit, hw, SignalLevel::Low);
                            self.regs.set_output_enable(unit, hw, true);
                        }
                        set_phase_level(units.as_mut_slice(), unit, hw, false);
                    }
                    Window::Full | Window::Chained => {
                        let want = slot.level.is_high();
                        if want != high {
                            self.regs.set_init_level(unit, hw, slot.level);
                        }
                        set_phase_level(units.as_mut_slice(), unit, hw, want);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn chain(period: u32, duties: &[(u8, u32)]) -> PhaseShiftConfig {
        let mut config = PhaseShiftConfig::new(period, 0);
        for &(ch, duty) in duties {
            config.push(ChannelId::new(ch), duty).unwrap();
        }
        config
    }

    #[test]
    fn windows_follow_each_other() {
        let slots = plan(&chain(100, &[(0, 30), (1, 30), (2, 30)]));
        assert_eq!((slots[0].ccr1, slots[0].ccr2), (0, 30));
        assert_eq!((slots[1].ccr1, slots[1].ccr2), (30, 60));
        assert_eq!((slots[2].ccr1, slots[2].ccr2), (60, 90));
        assert_eq!(slots[0].level, SignalLevel::High);
        assert_eq!(slots[1].level, SignalLevel::Low);
        assert_eq!(slots[2].window, Window::Chained);
    }

    #[test]
    fn window_past_period_wraps_high() {
        let slots = plan(&chain(100, &[(0, 60), (1, 70)]));
        assert_eq!((slots[1].ccr1, slots[1].ccr2), (60, 30));
        assert_eq!(slots[1].level, SignalLevel::High);
    }

    #[test]
    fn static_members_do_not_move_the_chain() {
        let slots = plan(&chain(100, &[(0, 0), (1, 100), (2, 40), (3, 0), (4, 20)]));
        assert_eq!(slots[0].window, Window::Off);
        assert_eq!(slots[1].window, Window::Full);
        assert_eq!(slots[1].level, SignalLevel::High);
        assert_eq!(slots[2].window, Window::First);
        assert_eq!((slots[4].ccr1, slots[4].ccr2), (40, 60));
    }

    #[test]
    fn first_valid_skips_static_members() {
        assert_eq!(first_valid_index(&chain(100, &[(0, 0), (1, 100), (2, 5)])), Some(2));
        assert_eq!(first_valid_index(&chain(100, &[(0, 0), (1, 100)])), None);
    }

    #[test]
    fn validation() {
        use crate::hal::V1px;
        assert_eq!(
            chain(100, &[(0, 30)]).validate::<V1px>(),
            Err(PwmError::PhaseShiftChannelCount)
        );
        assert_eq!(
            chain(100, &[(0, 30), (1, 1)]).validate::<V1px>(),
            Err(PwmError::InvalidPeriodDuty)
        );
        assert_eq!(
            chain(100, &[(0, 30), (1, 101)]).validate::<V1px>(),
            Err(PwmError::InvalidPeriodDuty)
        );
        assert_eq!(
            chain(100, &[(0, 30), (0, 30)]).validate::<V1px>(),
            Err(PwmError::InvalidChannel(ChannelId::new(0)))
        );
        assert_eq!(
            chain(100, &[(0, 30), (12, 30)]).validate::<V1px>(),
            Err(PwmError::InvalidChannel(ChannelId::new(12)))
        );
        assert!(chain(100, &[(0, 30), (7, 30)]).validate::<V1px>().is_ok());
    }

    #[test]
    fn member_lists_must_match() {
        let a = chain(100, &[(0, 30), (1, 30)]);
        assert!(a.same_members(&chain(200, &[(0, 10), (1, 90)])).is_ok());
        assert_eq!(
            a.same_members(&chain(100, &[(0, 30), (2, 30)])),
            Err(PwmError::InvalidChannel(ChannelId::new(2)))
        );
    }
}
