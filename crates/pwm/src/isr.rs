//! Per-unit interrupt dispatch.
//!
//! Board code binds each unit's interrupt line to [`PwmDriver::on_interrupt`]:
//!
//! ```ignore
//! #[interrupt]
//! fn PWM0() {
//!     PWM.on_interrupt(UnitId::new(0));
//! }
//! ```

use heapless::Vec;
use platform::config::MAX_CHANNELS_PER_UNIT;
use platform::{ClockGate, HwChannel, PinMux, RegisterBus, UnitId};

use crate::driver::PwmDriver;
use crate::group::occupied;
use crate::hal::registers::{capture_bit, update_bit};
use crate::hal::{hw_channels, Revision};
use crate::state::{ChannelIsr, DriverState};

type Pending = Vec<(ChannelIsr, HwChannel), MAX_CHANNELS_PER_UNIT>;

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Service the interrupt of `unit`.
    ///
    /// Acknowledges every pending flag, advances group and phase-shift
    /// updates, wakes capture waiters and finally runs the registered
    /// callbacks outside the driver lock. Returns the channels that saw a
    /// capture event or a timer-mode update.
    pub fn on_interrupt(&self, unit: UnitId) -> u32 {
        let (pending, dispatched) = self.with_state(|st| {
            let status = self.regs.interrupt_status(unit);
            self.regs.clear_interrupt_status(unit, status);
            self.advance_updates(st, unit, status);
            self.collect_channel_events(st, unit, status)
        });
        for (isr, hw) in pending {
            isr(hw);
        }
        dispatched
    }

    fn advance_updates(&self, st: &mut DriverState, unit: UnitId, status: u32) {
        #[cfg(feature = "phase-shift")]
        {
            if st.phase.is_some() {
                let head_fired = hw_channels::<R>().any(|hw| {
                    status & update_bit(hw) != 0 && Self::is_phase_head(st, unit, hw)
                });
                if head_fired {
                    self.phase_update_step(st);
                }
                return;
            }
        }
        for (_, slot) in occupied(&mut st.groups) {
            if !slot.param_update_pending {
                continue;
            }
            let Ok((u1, h1)) = R::locate(slot.chan1) else {
                continue;
            };
            if u1 == unit && status & update_bit(h1) != 0 {
                self.group_update_step(slot);
            }
        }
    }

    fn collect_channel_events(
        &self,
        st: &DriverState,
        unit: UnitId,
        status: u32,
    ) -> (Pending, u32) {
        let mut pending = Pending::new();
        let mut dispatched = 0;
        let Some(state) = st.unit(unit) else {
            return (pending, dispatched);
        };
        for hw in hw_channels::<R>() {
            let timer_tick =
                status & update_bit(hw) != 0 && state.timer_mode_bits & hw.bit() != 0;
            let captured = status & capture_bit(hw) != 0;
            if captured {
                if let Some(signal) = self.capture_signal(unit) {
                    signal.signal(());
                }
            }
            if !(timer_tick || captured) {
                continue;
            }
            dispatched |= hw.bit();
            if let Some(isr) = state.isr(hw) {
                let _ = pending.push((isr, hw));
            }
        }
        (pending, dispatched)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use platform::mocks::{MockClockGate, MockPinMux, MockRegisterBus};
    use platform::ChannelId;

    use super::*;
    use crate::channel::PwmInitConfig;
    use crate::hal::registers::REG_INT_STATUS;
    use crate::hal::V1px;

    static CALLS: AtomicU32 = AtomicU32::new(0);

    fn count(hw: HwChannel) {
        CALLS.fetch_or(hw.bit(), Ordering::Relaxed);
    }

    #[test]
    fn capture_flag_runs_callback_and_acknowledges() {
        let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]);
        let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        let hw = HwChannel::new(3);
        pwm.init(ChannelId::new(3), &PwmInitConfig::new(100, 50))
            .unwrap();
        pwm.register_isr(ChannelId::new(3), Some(count)).unwrap();

        bus.raise(REG_INT_STATUS, capture_bit(hw));
        assert_eq!(pwm.on_interrupt(UnitId::new(0)), hw.bit());
        assert_ne!(CALLS.load(Ordering::Relaxed) & hw.bit(), 0);
        assert_eq!(bus.peek(REG_INT_STATUS), 0);
    }

    #[test]
    fn update_flag_only_dispatches_timer_channels() {
        let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]);
        let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        let (plain, timer) = (HwChannel::new(0), HwChannel::new(1));
        pwm.init(ChannelId::new(0), &PwmInitConfig::new(100, 50))
            .unwrap();
        pwm.init(ChannelId::new(1), &PwmInitConfig::new(100, 50))
            .unwrap();
        pwm.set_mode_timer(ChannelId::new(1)).unwrap();

        bus.raise(REG_INT_STATUS, update_bit(plain) | update_bit(timer));
        assert_eq!(pwm.on_interrupt(UnitId::new(0)), timer.bit());
    }

    #[test]
    fn other_unit_flags_are_ignored() {
        let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]);
        let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        assert_eq!(pwm.on_interrupt(UnitId::new(1)), 0);
    }
}
