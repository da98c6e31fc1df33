//! Hardware fade engine (revisions with `HAS_FADE`).
//!
//! Every `interval` periods the engine moves the channel's CCR2 by `scale`
//! cycles, `count` times. The active window is bounded by CCR2, so stepping
//! CCR2 up lengthens a high-starting pulse and shortens a low-starting one.

use platform::{ChannelId, ClockGate, FadeDirection, PinMux, PwmError, RegisterBus};

use crate::driver::PwmDriver;
use crate::hal::adapter::FadeRegister;
use crate::hal::registers::{
    FADE_COUNT_MASK, FADE_COUNT_SHIFT, FADE_INTERVAL_MASK, FADE_INTERVAL_SHIFT, FADE_SCALE_MASK,
    FADE_SCALE_SHIFT,
};
use crate::hal::Revision;

/// Fade engine parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FadeConfig {
    /// Compare change per step, in counter cycles (1..=255)
    pub scale: u32,
    /// Periods between steps (0..=255)
    pub interval: u32,
    /// Steps to run (0..=1023)
    pub count: u32,
}

const SCALE_MAX: u32 = FADE_SCALE_MASK >> FADE_SCALE_SHIFT;
const INTERVAL_MAX: u32 = FADE_INTERVAL_MASK >> FADE_INTERVAL_SHIFT;
const COUNT_MAX: u32 = FADE_COUNT_MASK >> FADE_COUNT_SHIFT;

impl FadeConfig {
    fn validate(&self) -> Result<(), PwmError> {
        if self.scale == 0
            || self.scale > SCALE_MAX
            || self.interval > INTERVAL_MAX
            || self.count > COUNT_MAX
        {
            return Err(PwmError::InvalidPeriodDuty);
        }
        Ok(())
    }
}

/// Steps that fit between CCR2 and the end of the counter range.
fn headroom(arr: u32, ccr2: u32, scale: u32, increase: bool) -> u32 {
    let room = if increase {
        arr.saturating_add(1).saturating_sub(ccr2)
    } else {
        ccr2
    };
    room.checked_div(scale).unwrap_or(0)
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Program the fade engine of `ch`, leaving it stopped.
    pub fn fade_init(&self, ch: ChannelId, config: &FadeConfig) -> Result<(), PwmError> {
        if !R::HAS_FADE {
            return Err(PwmError::Unsupported);
        }
        config.validate()?;
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_fade(
                unit,
                hw,
                &FadeRegister {
                    scale: config.scale,
                    interval: config.interval,
                    count: config.count,
                },
            );
            #[cfg(feature = "defmt")]
            defmt::debug!("ch{} fade: {}", ch.get(), config);
            Ok(())
        })
    }

    /// Start fading the duty of `ch` in `direction`.
    ///
    /// The step count is cut to what fits in the current waveform, so the
    /// compare never leaves the period.
    pub fn fade_start(&self, ch: ChannelId, direction: FadeDirection) -> Result<(), PwmError> {
        if !R::HAS_FADE {
            return Err(PwmError::Unsupported);
        }
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            let hw_direction = if st.level_high(unit, hw) {
                direction
            } else {
                direction.reversed()
            };
            let increase = hw_direction == FadeDirection::Increase;
            let fade = self.regs.fade(unit, hw);
            let room = headroom(
                self.regs.reload(unit, hw),
                self.regs.compare2(unit, hw),
                fade.scale,
                increase,
            );
            self.regs.set_fade_count(unit, hw, fade.count.min(room));
            self.regs.set_fade_increase(unit, hw, increase);
            self.regs.set_fade_enable(unit, hw, true);
            Ok(())
        })
    }

    /// Stop the fade engine, keeping the duty reached so far.
    pub fn fade_stop(&self, ch: ChannelId) -> Result<(), PwmError> {
        if !R::HAS_FADE {
            return Err(PwmError::Unsupported);
        }
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_fade_count(unit, hw, 0);
            self.regs.set_fade_enable(unit, hw, false);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use platform::mocks::{MockClockGate, MockPinMux, MockRegisterBus};
    use platform::{HwChannel, UnitId};

    use super::*;
    use crate::channel::PwmInitConfig;
    use crate::hal::{V1px, V2p2};

    const CH: ChannelId = ChannelId::new(4);
    const UNIT: UnitId = UnitId::new(0);
    const HW: HwChannel = HwChannel::new(4);

    #[test]
    fn headroom_depends_on_direction() {
        assert_eq!(headroom(999, 300, 10, false), 30);
        assert_eq!(headroom(999, 300, 10, true), 70);
        assert_eq!(headroom(999, 300, 0, true), 0);
    }

    #[test]
    fn fields_must_fit_their_registers() {
        let ok = FadeConfig {
            scale: 4,
            interval: 255,
            count: 1023,
        };
        assert!(ok.validate().is_ok());
        assert!(FadeConfig { scale: 0, ..ok }.validate().is_err());
        assert!(FadeConfig { scale: 256, ..ok }.validate().is_err());
        assert!(FadeConfig { count: 1024, ..ok }.validate().is_err());
    }

    #[test]
    fn revision_without_engine_refuses() {
        let (bus, clock, pins) = (MockRegisterBus::new(), MockClockGate::new(), MockPinMux::new());
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        let config = FadeConfig {
            scale: 1,
            interval: 1,
            count: 1,
        };
        assert_eq!(pwm.fade_init(CH, &config), Err(PwmError::Unsupported));
        assert_eq!(
            pwm.fade_start(CH, FadeDirection::Increase),
            Err(PwmError::Unsupported)
        );
    }

    #[test]
    fn start_clamps_count_and_follows_level() {
        let (bus, clock, pins) = (MockRegisterBus::new(), MockClockGate::new(), MockPinMux::new());
        let pwm = PwmDriver::<V2p2, _, _, _>::new(&bus, &clock, &pins);
        // Low-starting 25 % waveform: CCR1 = 750, CCR2 = 1000.
        pwm.init(CH, &PwmInitConfig::new(1000, 250)).unwrap();
        pwm.fade_init(
            CH,
            &FadeConfig {
                scale: 10,
                interval: 2,
                count: 500,
            },
        )
        .unwrap();

        pwm.fade_start(CH, FadeDirection::Increase).unwrap();
        let regs = pwm.registers();
        assert!(regs.fade_enabled(UNIT, HW));
        assert!(!regs.fade_increase(UNIT, HW));
        assert_eq!(regs.fade(UNIT, HW).count, 100);

        pwm.fade_stop(CH).unwrap();
        assert!(!regs.fade_enabled(UNIT, HW));
        assert_eq!(regs.fade(UNIT, HW).count, 0);
    }
}
