//! `embedded-hal` view of one channel.
//!
//! [`PwmOutput`] lets generic drivers (LED dimmers, motor controllers) take
//! any `SetDutyCycle` and still run on this block. The handle borrows the
//! driver, so several outputs can coexist with direct driver calls.

use embedded_hal::pwm::{ErrorType, SetDutyCycle};
use platform::{ChannelId, ClockGate, PinMux, PwmError, RegisterBus};

use crate::channel::PeriodDutyConfig;
use crate::driver::PwmDriver;
use crate::hal::Revision;

/// Duty-cycle handle for one initialised channel.
pub struct PwmOutput<'d, R: Revision, B, C, P> {
    driver: &'d PwmDriver<R, B, C, P>,
    ch: ChannelId,
    period: u32,
    psc: u32,
}

/// Scale `duty` out of `max` onto `period` counter cycles.
fn scale(duty: u16, max: u16, period: u32) -> u32 {
    let cycles = u64::from(duty)
        .saturating_mul(u64::from(period))
        .checked_div(u64::from(max))
        .unwrap_or(0);
    u32::try_from(cycles).unwrap_or(period).min(period)
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Duty-cycle handle for `ch`, keeping its current period and prescaler.
    pub fn output(&self, ch: ChannelId) -> Result<PwmOutput<'_, R, B, C, P>, PwmError> {
        let (period, psc) = self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            Ok::<_, PwmError>((
                self.regs.reload(unit, hw).saturating_add(1),
                self.regs.prescaler(unit, hw),
            ))
        })?;
        Ok(PwmOutput {
            driver: self,
            ch,
            period,
            psc,
        })
    }
}

impl<R: Revision, B, C, P> PwmOutput<'_, R, B, C, P> {
    /// Channel behind this handle.
    pub fn channel(&self) -> ChannelId {
        self.ch
    }

    /// Period in counter cycles.
    pub fn period(&self) -> u32 {
        self.period
    }
}

impl<R: Revision, B, C, P> ErrorType for PwmOutput<'_, R, B, C, P> {
    type Error = PwmError;
}

impl<R, B, C, P> SetDutyCycle for PwmOutput<'_, R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    fn max_duty_cycle(&self) -> u16 {
        u16::try_from(self.period).unwrap_or(u16::MAX)
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let cycles = scale(duty, self.max_duty_cycle(), self.period);
        self.driver.set_period_duty(
            self.ch,
            &PeriodDutyConfig::new(self.period, cycles).with_prescaler(self.psc),
        )
    }
}
