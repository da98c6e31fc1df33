//! Complementary channel pairs with dead time.
//!
//! A group drives two channels in anti-phase with a gap of
//! `(period − duty1 − duty2) / 2` cycles around every transition, so the
//! high-side and low-side switches never conduct at the same time.
//!
//! Pairs listed in the revision's dead-time table (same unit) use the
//! hardware generator; any other pair is emulated by offsetting the compare
//! points of the second channel.
//!
//! # Updates
//!
//! [`PwmDriver::group_set_config`] only records the new parameters and arms
//! the update interrupt of `chan1`. The interrupt handler then rewrites both
//! channels at a period boundary, chan2 first. Moving into or out of the
//! static 0 %/100 % states takes two update events:
//!
//! | From | Pass 1 | Pass 2 |
//! |------|--------|--------|
//! | any → 100/0 | compares to 0 | both `ForceLow` |
//! | any → 0/100 | `Toggle` / `Complementary` | both `HoldHigh` |
//! | both `ForceLow` | complementary image | flips restored |
//! | both `HoldHigh` | bridging image | complementary image + flips |
//!
//! Every other update finishes in one pass.

use platform::config::MAX_GROUPS;
use platform::{
    ChannelId, ClockGate, DeadCycles, GroupId, HwChannel, PinMux, PwmError, RegisterBus,
    SignalLevel, UnitId,
};

use crate::driver::PwmDriver;
use crate::hal::adapter::Timing;
use crate::hal::{FlipMode, Revision};
use crate::state::DriverState;

/// Parameters for [`PwmDriver::group_init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupInitConfig {
    /// High-side channel
    pub chan1: ChannelId,
    /// Low-side channel
    pub chan2: ChannelId,
    /// Shared period in counter cycles
    pub period: u32,
    /// Active cycles of `chan1`
    pub chan1_duty: u32,
    /// Active cycles of `chan2`
    pub chan2_duty: u32,
}

/// Parameters for [`PwmDriver::group_set_config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupConfig {
    /// Shared period in counter cycles
    pub period: u32,
    /// Active cycles of `chan1`
    pub chan1_duty: u32,
    /// Active cycles of `chan2`
    pub chan2_duty: u32,
}

/// One occupied slot of the group table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroupSlot {
    /// High-side channel
    pub chan1: ChannelId,
    /// Low-side channel
    pub chan2: ChannelId,
    /// Shared period
    pub period: u32,
    /// Active cycles of `chan1`
    pub duty1: u32,
    /// Active cycles of `chan2`
    pub duty2: u32,
    /// Gap on each side of a transition
    pub dead: u32,
    /// Registers still differ from the stored parameters
    pub param_update_pending: bool,
    /// First pass of a two-pass update not yet done
    pub flip_update_pending: bool,
}

impl GroupSlot {
    fn contains(&self, ch: ChannelId) -> bool {
        self.chan1 == ch || self.chan2 == ch
    }

    fn is_pair(&self, a: ChannelId, b: ChannelId) -> bool {
        (self.chan1 == a && self.chan2 == b) || (self.chan1 == b && self.chan2 == a)
    }
}

/// Dead time left between two windows sharing one period.
pub fn dead_cycles(period: u32, duty1: u32, duty2: u32) -> u32 {
    period.saturating_sub(duty1).saturating_sub(duty2) >> 1
}

/// Check group-init parameters against the table, in reporting order.
fn validate_init<R: Revision>(
    groups: &[Option<GroupSlot>],
    config: &GroupInitConfig,
) -> Result<(), PwmError> {
    R::locate(config.chan1)?;
    R::locate(config.chan2)?;
    if config.chan1 == config.chan2 {
        return Err(PwmError::GroupSameChannel);
    }
    let slots = || groups.iter().flatten();
    if slots().any(|g| g.is_pair(config.chan1, config.chan2)) {
        return Err(PwmError::GroupExists);
    }
    for ch in [config.chan1, config.chan2] {
        if slots().any(|g| g.contains(ch)) {
            return Err(PwmError::GroupChannelInUse(ch));
        }
    }
    let total = config
        .chan1_duty
        .checked_add(config.chan2_duty)
        .ok_or(PwmError::GroupDuty)?;
    if config.period == 0 || config.chan1_duty <= 1 || total > config.period {
        return Err(PwmError::GroupDuty);
    }
    Ok(())
}

/// Check runtime group parameters.
fn validate_update(config: &GroupConfig) -> Result<(), PwmError> {
    let total = config
        .chan1_duty
        .checked_add(config.chan2_duty)
        .ok_or(PwmError::GroupDuty)?;
    if config.period == 0 || total > config.period {
        return Err(PwmError::GroupDuty);
    }
    if (config.chan1_duty == 0 && config.chan2_duty != config.period)
        || (config.chan2_duty == 0 && config.chan1_duty != config.period)
    {
        return Err(PwmError::GroupDuty);
    }
    Ok(())
}

/// Hardware coordinates of both group channels.
struct Pair {
    u1: UnitId,
    h1: HwChannel,
    u2: UnitId,
    h2: HwChannel,
}

impl Pair {
    fn locate<R: Revision>(slot: &GroupSlot) -> Result<Self, PwmError> {
        let (u1, h1) = R::locate(slot.chan1)?;
        let (u2, h2) = R::locate(slot.chan2)?;
        Ok(Self { u1, h1, u2, h2 })
    }
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    fn group_slot(st: &DriverState, group: GroupId) -> Result<GroupSlot, PwmError> {
        st.groups
            .get(group.index())
            .copied()
            .flatten()
            .ok_or(PwmError::GroupNotFound(group))
    }

    fn write_image(&self, unit: UnitId, hw: HwChannel, period: u32, ccr1: u32, ccr2: u32) {
        let timing = Timing {
            psc: 0,
            arr: period.saturating_sub(1),
            ccr1,
            ccr2,
            ccr3: 0,
        };
        self.regs.program(unit, hw, &timing);
    }

    /// Normal complementary register image, chan2 written first.
    fn write_complementary(&self, pair: &Pair, slot: &GroupSlot) {
        let ccr1 = slot.duty1.saturating_add(slot.dead);
        self.write_image(
            pair.u2,
            pair.h2,
            slot.period,
            ccr1,
            ccr1.saturating_add(slot.duty2),
        );
        self.write_image(pair.u1, pair.h1, slot.period, slot.duty1, 0);
    }

    fn set_flips(&self, pair: &Pair, flip1: FlipMode, flip2: FlipMode) {
        self.regs.set_flip_mode(pair.u1, pair.h1, flip1);
        self.regs.set_flip_mode(pair.u2, pair.h2, flip2);
    }

    fn finish_update(&self, pair: &Pair, slot: &mut GroupSlot) {
        self.regs.set_uie(pair.u1, pair.h1, false);
        slot.param_update_pending = false;
    }

    fn configure_hardware_pair(
        &self,
        pair: &Pair,
        config: &GroupInitConfig,
        dead: DeadCycles,
        dead_time_reg: u32,
    ) {
        let arr = config.period.saturating_sub(1);
        let cycles = u32::from(dead.get());
        let channels = [
            (pair.u1, pair.h1, config.chan1_duty, false),
            (pair.u2, pair.h2, config.chan2_duty, true),
        ];
        for (unit, hw, duty, inverted) in channels {
            self.regs.set_preload(unit, hw, true);
            let timing = Timing {
                psc: 0,
                arr,
                ccr1: duty.saturating_add(cycles),
                ccr2: 0,
                ccr3: 0,
            };
            self.regs.program(unit, hw, &timing);
            self.regs.set_flip_mode(unit, hw, FlipMode::Complementary);
            self.regs.set_output_enable(unit, hw, true);
            self.regs.set_polarity_inverted(unit, hw, inverted);
        }
        self.regs.set_dead_time(pair.u1, dead_time_reg, dead);
    }

    fn configure_software_pair(
        &self,
        st: &mut DriverState,
        pair: &Pair,
        config: &GroupInitConfig,
        dead: u32,
    ) {
        self.regs.set_preload(pair.u1, pair.h1, false);
        self.write_image(pair.u1, pair.h1, config.period, config.chan1_duty, 0);
        self.regs
            .set_flip_mode(pair.u1, pair.h1, FlipMode::Complementary);
        self.regs.set_init_level(pair.u1, pair.h1, SignalLevel::High);
        st.set_level_high(pair.u1, pair.h1, true);
        self.regs.set_output_enable(pair.u1, pair.h1, true);

        let ccr1 = config.chan1_duty.saturating_add(dead);
        self.regs.set_preload(pair.u2, pair.h2, false);
        self.write_image(
            pair.u2,
            pair.h2,
            config.period,
            ccr1,
            ccr1.saturating_add(config.chan2_duty),
        );
        self.regs.set_flip_mode(pair.u2, pair.h2, FlipMode::Toggle);
        self.regs.set_init_level(pair.u2, pair.h2, SignalLevel::Low);
        st.set_level_high(pair.u2, pair.h2, false);
        self.regs.set_output_enable(pair.u2, pair.h2, true);
    }

    /// Pair two channels into a complementary group.
    pub fn group_init(&self, config: &GroupInitConfig) -> Result<GroupId, PwmError> {
        self.with_state(|st| {
            if let Err(e) = validate_init::<R>(&st.groups, config) {
                #[cfg(feature = "defmt")]
                defmt::warn!("group init rejected: {}", e);
                return Err(e);
            }
            let index = st
                .groups
                .iter()
                .position(Option::is_none)
                .ok_or(PwmError::GroupTableFull)?;
            let group = GroupId::new(u8::try_from(index).map_err(|_| PwmError::GroupTableFull)?);
            let dead = dead_cycles(config.period, config.chan1_duty, config.chan2_duty);

            let (u1, h1) = R::locate(config.chan1)?;
            let (u2, h2) = R::locate(config.chan2)?;
            let pair = Pair { u1, h1, u2, h2 };
            let hardware = if u1 == u2 {
                R::dead_time_pair(h1, h2)
            } else {
                None
            };
            let generator = match hardware {
                Some(reg) => Some((
                    reg,
                    DeadCycles::try_new(dead).map_err(|_| PwmError::DeadTimeOutOfRange(dead))?,
                )),
                None => None,
            };

            self.check_restore(st, u1);
            self.check_restore(st, u2);
            self.init_common(st, u1, h1);
            self.init_common(st, u2, h2);
            match generator {
                Some((reg, cycles)) => self.configure_hardware_pair(&pair, config, cycles, reg),
                None => self.configure_software_pair(st, &pair, config, dead),
            }

            let slot = GroupSlot {
                chan1: config.chan1,
                chan2: config.chan2,
                period: config.period,
                duty1: config.chan1_duty,
                duty2: config.chan2_duty,
                dead,
                param_update_pending: false,
                flip_update_pending: false,
            };
            if let Some(entry) = st.groups.get_mut(index) {
                *entry = Some(slot);
            }
            #[cfg(feature = "defmt")]
            defmt::info!(
                "{}: ch{}/ch{} period {} duty {}/{} dead {} ({})",
                group.get(),
                config.chan1.get(),
                config.chan2.get(),
                config.period,
                config.chan1_duty,
                config.chan2_duty,
                dead,
                if generator.is_some() { "hw" } else { "sw" }
            );
            Ok(group)
        })
    }

    fn group_stop_locked(&self, pair: &Pair) {
        self.regs.set_timer_enable(pair.u1, pair.h1, false);
        self.regs.set_timer_enable(pair.u2, pair.h2, false);
    }

    /// Stop the group, release both channels and free the slot.
    pub fn group_deinit(&self, group: GroupId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let slot = Self::group_slot(st, group)?;
            let pair = Pair::locate::<R>(&slot)?;
            self.check_restore(st, pair.u1);
            self.check_restore(st, pair.u2);
            self.group_stop_locked(&pair);
            self.regs.set_uie(pair.u1, pair.h1, false);
            self.deinit_common(st, pair.u1, pair.h1);
            self.deinit_common(st, pair.u2, pair.h2);
            if let Some(entry) = st.groups.get_mut(group.index()) {
                *entry = None;
            }
            #[cfg(feature = "defmt")]
            defmt::info!("group{} deinit", group.get());
            Ok(())
        })
    }

    /// Start both counters.
    pub fn group_start(&self, group: GroupId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let slot = Self::group_slot(st, group)?;
            let pair = Pair::locate::<R>(&slot)?;
            self.check_restore(st, pair.u1);
            self.check_restore(st, pair.u2);
            if pair.u1 == pair.u2 {
                self.regs
                    .set_multi_timer_enable(pair.u1, pair.h1.bit() | pair.h2.bit(), true);
            } else {
                self.regs.set_timer_enable(pair.u1, pair.h1, true);
                self.regs.set_timer_enable(pair.u2, pair.h2, true);
            }
            Ok(())
        })
    }

    /// Stop both counters.
    pub fn group_stop(&self, group: GroupId) -> Result<(), PwmError> {
        self.with_state(|st| {
            let slot = Self::group_slot(st, group)?;
            let pair = Pair::locate::<R>(&slot)?;
            self.check_restore(st, pair.u1);
            self.check_restore(st, pair.u2);
            self.group_stop_locked(&pair);
            Ok(())
        })
    }

    /// Queue new period and duties; both channels switch at the next update.
    pub fn group_set_config(&self, group: GroupId, config: &GroupConfig) -> Result<(), PwmError> {
        self.with_state(|st| {
            let slot = Self::group_slot(st, group)?;
            validate_update(config)?;
            let pair = Pair::locate::<R>(&slot)?;
            self.check_restore(st, pair.u1);
            self.check_restore(st, pair.u2);
            self.regs.set_preload(pair.u1, pair.h1, true);
            self.regs.set_preload(pair.u2, pair.h2, true);
            if let Some(Some(entry)) = st.groups.get_mut(group.index()) {
                entry.period = config.period;
                entry.duty1 = config.chan1_duty;
                entry.duty2 = config.chan2_duty;
                entry.dead = dead_cycles(config.period, config.chan1_duty, config.chan2_duty);
                entry.param_update_pending = true;
                entry.flip_update_pending = true;
            }
            self.regs.set_uie(pair.u1, pair.h1, true);
            Ok(())
        })
    }

    /// Whether a queued [`Self::group_set_config`] has not fully landed yet.
    pub fn group_update_pending(&self, group: GroupId) -> Result<bool, PwmError> {
        self.with_state(|st| Self::group_slot(st, group).map(|g| g.param_update_pending))
    }

    /// One step of the update state machine, run from the update interrupt
    /// of `chan1`.
    pub(crate) fn group_update_step(&self, slot: &mut GroupSlot) {
        let Ok(pair) = Pair::locate::<R>(slot) else {
            return;
        };
        let flip1 = self.regs.flip_mode(pair.u1, pair.h1);
        let flip2 = self.regs.flip_mode(pair.u2, pair.h2);
        let both = |mode: FlipMode| flip1 == Some(mode) && flip2 == Some(mode);

        if slot.duty1 == slot.period && slot.duty2 == 0 {
            if both(FlipMode::HoldHigh) {
                self.regs.set_uie(pair.u1, pair.h1, false);
                self.set_flips(&pair, FlipMode::ForceLow, FlipMode::ForceLow);
                slot.param_update_pending = false;
                slot.flip_update_pending = false;
            } else if slot.flip_update_pending {
                let period1 = self.regs.reload(pair.u1, pair.h1).saturating_add(1);
                let period2 = self.regs.reload(pair.u2, pair.h2).saturating_add(1);
                self.write_image(pair.u2, pair.h2, period2, 0, 0);
                self.write_image(pair.u1, pair.h1, period1, 0, 0);
                slot.flip_update_pending = false;
            } else {
                self.set_flips(&pair, FlipMode::ForceLow, FlipMode::ForceLow);
                self.finish_update(&pair, slot);
            }
        } else if slot.duty1 == 0 && slot.duty2 == slot.period {
            if both(FlipMode::ForceLow) {
                self.regs.set_uie(pair.u1, pair.h1, false);
                self.set_flips(&pair, FlipMode::HoldHigh, FlipMode::HoldHigh);
                slot.param_update_pending = false;
                slot.flip_update_pending = false;
            } else if slot.flip_update_pending {
                self.set_flips(&pair, FlipMode::Toggle, FlipMode::Complementary);
                slot.flip_update_pending = false;
            } else {
                self.set_flips(&pair, FlipMode::HoldHigh, FlipMode::HoldHigh);
                self.finish_update(&pair, slot);
            }
        } else if both(FlipMode::ForceLow) {
            if slot.flip_update_pending {
                self.write_complementary(&pair, slot);
                slot.flip_update_pending = false;
            } else {
                self.set_flips(&pair, FlipMode::Complementary, FlipMode::Toggle);
                self.finish_update(&pair, slot);
            }
        } else if both(FlipMode::HoldHigh) {
            if slot.flip_update_pending {
                self.write_image(pair.u2, pair.h2, slot.period, slot.period.saturating_sub(slot.dead), 0);
                self.write_image(pair.u1, pair.h1, slot.period, 0, 0);
                slot.flip_update_pending = false;
            } else {
                self.set_flips(&pair, FlipMode::Complementary, FlipMode::Toggle);
                self.write_complementary(&pair, slot);
                self.finish_update(&pair, slot);
            }
        } else {
            self.write_complementary(&pair, slot);
            self.set_flips(&pair, FlipMode::Complementary, FlipMode::Toggle);
            self.finish_update(&pair, slot);
            slot.flip_update_pending = false;
        }
    }
}

/// Slots of `groups` as `(GroupId, slot)` pairs.
pub(crate) fn occupied(
    groups: &mut [Option<GroupSlot>; MAX_GROUPS],
) -> impl Iterator<Item = (GroupId, &mut GroupSlot)> {
    groups.iter_mut().enumerate().filter_map(|(i, slot)| {
        let id = GroupId::new(u8::try_from(i).ok()?);
        slot.as_mut().map(|s| (id, s))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::hal::V1px;

    fn slot(a: u8, b: u8) -> Option<GroupSlot> {
        Some(GroupSlot {
            chan1: ChannelId::new(a),
            chan2: ChannelId::new(b),
            period: 100,
            duty1: 40,
            duty2: 40,
            dead: 10,
            param_update_pending: false,
            flip_update_pending: false,
        })
    }

    fn init(a: u8, b: u8, period: u32, d1: u32, d2: u32) -> GroupInitConfig {
        GroupInitConfig {
            chan1: ChannelId::new(a),
            chan2: ChannelId::new(b),
            period,
            chan1_duty: d1,
            chan2_duty: d2,
        }
    }

    #[test]
    fn dead_time_is_half_the_slack() {
        assert_eq!(dead_cycles(100, 40, 40), 10);
        assert_eq!(dead_cycles(100, 40, 41), 9);
        assert_eq!(dead_cycles(100, 100, 0), 0);
    }

    #[test]
    fn validation_reports_in_order() {
        let empty = [None; MAX_GROUPS];
        assert_eq!(
            validate_init::<V1px>(&empty, &init(0, 12, 100, 40, 40)),
            Err(PwmError::InvalidChannel(ChannelId::new(12)))
        );
        assert_eq!(
            validate_init::<V1px>(&empty, &init(3, 3, 0, 0, 0)),
            Err(PwmError::GroupSameChannel)
        );

        let mut taken = [None; MAX_GROUPS];
        taken[2] = slot(0, 1);
        assert_eq!(
            validate_init::<V1px>(&taken, &init(1, 0, 0, 0, 0)),
            Err(PwmError::GroupExists)
        );
        assert_eq!(
            validate_init::<V1px>(&taken, &init(4, 1, 0, 0, 0)),
            Err(PwmError::GroupChannelInUse(ChannelId::new(1)))
        );
    }

    #[test]
    fn init_duty_rules() {
        let empty = [None; MAX_GROUPS];
        assert_eq!(
            validate_init::<V1px>(&empty, &init(0, 1, 0, 0, 0)),
            Err(PwmError::GroupDuty)
        );
        assert_eq!(
            validate_init::<V1px>(&empty, &init(0, 1, 100, 1, 10)),
            Err(PwmError::GroupDuty)
        );
        assert_eq!(
            validate_init::<V1px>(&empty, &init(0, 1, 100, 60, 41)),
            Err(PwmError::GroupDuty)
        );
        assert!(validate_init::<V1px>(&empty, &init(0, 1, 100, 60, 40)).is_ok());
    }

    #[test]
    fn update_rules_require_complementary_extremes() {
        let cfg = |period, chan1_duty, chan2_duty| GroupConfig {
            period,
            chan1_duty,
            chan2_duty,
        };
        assert!(validate_update(&cfg(100, 100, 0)).is_ok());
        assert!(validate_update(&cfg(100, 0, 100)).is_ok());
        assert!(validate_update(&cfg(100, 30, 30)).is_ok());
        assert_eq!(validate_update(&cfg(100, 0, 50)), Err(PwmError::GroupDuty));
        assert_eq!(validate_update(&cfg(100, 50, 0)), Err(PwmError::GroupDuty));
        assert_eq!(validate_update(&cfg(0, 0, 0)), Err(PwmError::GroupDuty));
        assert_eq!(
            validate_update(&cfg(100, u32::MAX, 2)),
            Err(PwmError::GroupDuty)
        );
    }
}
