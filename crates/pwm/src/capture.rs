//! Capture mode: measure an incoming signal instead of generating one.
//!
//! The counter free-runs and is cleared on every configured edge, so each
//! capture event latches the distance since the previous edge into the CCR1
//! shadow. [`PwmDriver::capture_period_duty`] collects a window of such
//! samples and majority-votes away the noisy ones.

use embassy_time::{with_timeout, Duration};
use heapless::Vec;
use platform::config::CAPTURE_SAMPLE_WINDOW;
use platform::{
    CaptureEdge, ChannelId, ClockGate, HwChannel, PinMux, PwmError, RegisterBus, UnitId,
};

use crate::driver::PwmDriver;
use crate::hal::Revision;
use crate::majority::{majority_high, most_frequent};
use crate::state::ChannelIsr;

/// Capture events consumed per sample when both edges are captured. Only the
/// last one is kept, which lets the pad settle before its level is read.
const BOTH_EDGE_EVENTS: usize = 3;

/// Configuration passed to [`PwmDriver::capture_init`].
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Edge(s) that latch and clear the counter
    pub edge: CaptureEdge,
    /// Called on every capture event
    pub isr: Option<ChannelIsr>,
}

impl CaptureConfig {
    /// Capture on `edge` without a callback.
    pub const fn new(edge: CaptureEdge) -> Self {
        Self { edge, isr: None }
    }
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Put `ch` in capture mode. The counter stays stopped until
    /// [`Self::capture_start`].
    ///
    /// Calling this again on an initialised channel only changes the edge
    /// and callback. A period measured earlier is kept, which is how a
    /// both-edge measurement follows a single-edge one.
    pub fn capture_init(&self, ch: ChannelId, config: &CaptureConfig) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            self.check_restore(st, unit);
            let fresh = !st.is_init(unit, hw);
            self.init_common(st, unit, hw);
            self.regs.configure_capture(unit, hw, config.edge);
            if let Some(u) = st.unit_mut(unit) {
                u.set_isr(hw, config.isr);
                if fresh {
                    u.set_capture_period(hw, None);
                }
            }
        });
        if let Some(signal) = self.capture_signal(unit) {
            signal.reset();
        }
        #[cfg(feature = "defmt")]
        defmt::info!("ch{} capture init: {}", ch.get(), config.edge);
        Ok(())
    }

    /// Leave capture mode and release the channel.
    pub fn capture_deinit(&self, ch: ChannelId) -> Result<(), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        self.with_state(|st| {
            if !st.is_init(unit, hw) {
                return;
            }
            self.check_restore(st, unit);
            self.regs.set_timer_enable(unit, hw, false);
            self.regs.set_cc1ie(unit, hw, false);
            self.regs.clear_capture(unit, hw);
            if let Some(u) = st.unit_mut(unit) {
                u.set_isr(hw, None);
                u.set_capture_period(hw, None);
            }
            self.deinit_common(st, unit, hw);
        });
        if let Some(signal) = self.capture_signal(unit) {
            signal.reset();
        }
        Ok(())
    }

    /// Start the counter and the capture interrupt.
    pub fn capture_start(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.set_capture_running(ch, true)
    }

    /// Stop the counter and the capture interrupt.
    pub fn capture_stop(&self, ch: ChannelId) -> Result<(), PwmError> {
        self.set_capture_running(ch, false)
    }

    fn set_capture_running(&self, ch: ChannelId, run: bool) -> Result<(), PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            self.regs.set_timer_enable(unit, hw, run);
            self.regs.set_cc1ie(unit, hw, run);
            Ok(())
        })
    }

    /// Counter value latched by the last capture event.
    pub fn capture_value(&self, ch: ChannelId) -> Result<u32, PwmError> {
        self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            Ok(self.regs.capture_shadow(unit, hw))
        })
    }

    /// Wait for the next capture event of `unit`, arming the channel's
    /// interrupt first.
    async fn next_capture(&self, unit: UnitId, hw: HwChannel, timeout: Duration) -> bool {
        let Some(signal) = self.capture_signal(unit) else {
            return false;
        };
        self.with_state(|st| {
            self.check_restore(st, unit);
            self.regs.set_cc1ie(unit, hw, true);
        });
        with_timeout(timeout, signal.wait()).await.is_ok()
    }

    /// Measure the input on `ch`.
    ///
    /// On a single-edge channel this is the period in counter cycles, which
    /// is also remembered for the channel. On a both-edge channel it is the
    /// high time, derived from the remembered period and the majority pad
    /// level, so a single-edge measurement must come first.
    ///
    /// Each capture event is awaited for at most `timeout`; a timeout ends
    /// the window early and the vote runs over what was collected.
    pub async fn capture_period_duty(
        &self,
        ch: ChannelId,
        timeout: Duration,
    ) -> Result<u32, PwmError> {
        let (unit, hw, edge, period) = self.with_state(|st| {
            let (unit, hw) = Self::require_init(st, ch)?;
            self.check_restore(st, unit);
            let period = st.unit(unit).and_then(|u| u.capture_period(hw));
            Ok::<_, PwmError>((unit, hw, self.regs.capture_edge(unit, hw), period))
        })?;
        let both = edge == CaptureEdge::Both;
        if both && period.is_none() {
            #[cfg(feature = "defmt")]
            defmt::warn!("ch{}: both-edge capture without a period", ch.get());
            return Err(PwmError::CaptureNoPeriod);
        }
        if let Some(signal) = self.capture_signal(unit) {
            signal.reset();
        }
        let gpio = R::gpio(unit, hw);
        let events = if both { BOTH_EDGE_EVENTS } else { 1 };

        let mut samples: Vec<u32, CAPTURE_SAMPLE_WINDOW> = Vec::new();
        let mut levels: Vec<bool, CAPTURE_SAMPLE_WINDOW> = Vec::new();
        'window: while !samples.is_full() {
            for _ in 0..events {
                if !self.next_capture(unit, hw, timeout).await {
                    break 'window;
                }
            }
            let (value, level) = self.with_state(|st| {
                self.check_restore(st, unit);
                let level = match (both, gpio) {
                    (true, Some(gpio)) => self.pins.read_input(gpio),
                    _ => false,
                };
                (self.regs.capture_shadow(unit, hw), level)
            });
            let _ = samples.push(value);
            let _ = levels.push(level);
        }
        self.with_state(|st| {
            self.check_restore(st, unit);
            self.regs.set_cc1ie(unit, hw, false);
        });

        let vote = most_frequent(&mut samples).ok_or(PwmError::CaptureTimeout)?;
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ch{}: {} samples, mode {} x{}",
            ch.get(),
            samples.len(),
            vote.value,
            vote.count
        );
        match period {
            Some(period) if both => {
                let high = majority_high(&levels) != R::CAPTURE_LEVEL_INVERTED;
                Ok(if high {
                    period.saturating_sub(vote.value)
                } else {
                    vote.value
                })
            }
            _ => {
                self.with_state(|st| {
                    if let Some(u) = st.unit_mut(unit) {
                        u.set_capture_period(hw, Some(vote.value));
                    }
                });
                Ok(vote.value)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use platform::mocks::{MockClockGate, MockPinMux, MockRegisterBus};

    use super::*;
    use crate::hal::registers::REG_INT_STATUS;
    use crate::hal::V1px;

    const CH: ChannelId = ChannelId::new(2);
    const UNIT: UnitId = UnitId::new(0);
    const HW: HwChannel = HwChannel::new(2);

    fn rig() -> (MockRegisterBus, MockClockGate, MockPinMux) {
        (
            MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]),
            MockClockGate::new(),
            MockPinMux::new(),
        )
    }

    #[test]
    fn init_configures_free_running_counter() {
        let (bus, clock, pins) = rig();
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        pwm.capture_init(CH, &CaptureConfig::new(CaptureEdge::Falling))
            .unwrap();
        let regs = pwm.registers();
        assert!(regs.capture_mode(UNIT, HW));
        assert_eq!(regs.capture_edge(UNIT, HW), CaptureEdge::Falling);
        assert_eq!(regs.reload(UNIT, HW), platform::config::CAPTURE_RELOAD);
        assert!(!regs.timer_enabled(UNIT, HW));
    }

    #[test]
    fn start_and_stop_gate_counter_and_interrupt() {
        let (bus, clock, pins) = rig();
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        assert_eq!(pwm.capture_start(CH), Err(PwmError::ChannelNotInit(CH)));
        pwm.capture_init(CH, &CaptureConfig::new(CaptureEdge::Rising))
            .unwrap();
        pwm.capture_start(CH).unwrap();
        assert!(pwm.registers().timer_enabled(UNIT, HW));
        assert!(pwm.registers().cc1ie(UNIT, HW));
        pwm.capture_stop(CH).unwrap();
        assert!(!pwm.registers().timer_enabled(UNIT, HW));
        assert!(!pwm.registers().cc1ie(UNIT, HW));
    }

    #[test]
    fn deinit_leaves_capture_mode_and_powers_down() {
        let (bus, clock, pins) = rig();
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        pwm.capture_init(CH, &CaptureConfig::new(CaptureEdge::Rising))
            .unwrap();
        pwm.capture_deinit(CH).unwrap();
        assert!(!pwm.registers().capture_mode(UNIT, HW));
        assert!(!clock.is_powered(UNIT));
        assert_eq!(pwm.capture_value(CH), Err(PwmError::ChannelNotInit(CH)));
    }

    #[tokio::test]
    async fn both_edges_need_a_measured_period() {
        let (bus, clock, pins) = rig();
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        pwm.capture_init(CH, &CaptureConfig::new(CaptureEdge::Both))
            .unwrap();
        assert_eq!(
            pwm.capture_period_duty(CH, Duration::from_millis(5)).await,
            Err(PwmError::CaptureNoPeriod)
        );
    }

    #[tokio::test]
    async fn no_event_times_out() {
        let (bus, clock, pins) = rig();
        let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
        pwm.capture_init(CH, &CaptureConfig::new(CaptureEdge::Rising))
            .unwrap();
        assert_eq!(
            pwm.capture_period_duty(CH, Duration::from_millis(5)).await,
            Err(PwmError::CaptureTimeout)
        );
        assert!(!pwm.registers().cc1ie(UNIT, HW));
    }
}
