//! Driver handle and the channel bring-up shared by every mode.
//!
//! [`PwmDriver`] owns the register adapter, the clock gate and the pin mux,
//! plus the bookkeeping in a critical-section mutex. Every operation takes
//! `&self`, so one driver can be shared (e.g. via `static`) between tasks
//! and the per-unit interrupt handlers.
//!
//! Hardware handles are only written from inside [`PwmDriver::with_state`],
//! which makes each register read-modify-write atomic with respect to the
//! interrupt handler. [`PwmDriver::registers`] hands out a read-only view.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use platform::config::MAX_UNITS;
use platform::{
    ChannelId, ClockGate, ClockSource, HwChannel, PinMux, PwmError, RegisterBus, UnitId,
};

use crate::hal::{RegisterAdapter, Revision};
use crate::state::DriverState;

/// Capture semaphore type, one per unit.
pub(crate) type CaptureSignal = Signal<CriticalSectionRawMutex, ()>;

/// PWM driver for hardware revision `R`.
///
/// - `B`: register bus rooted at unit 0
/// - `C`: clock gate for the unit clock domains
/// - `P`: pin mux for channel pads
pub struct PwmDriver<R: Revision, B, C, P> {
    pub(crate) regs: RegisterAdapter<B, R>,
    pub(crate) clock: C,
    pub(crate) pins: P,
    pub(crate) state: Mutex<CriticalSectionRawMutex, RefCell<DriverState>>,
    pub(crate) capture_signals: [CaptureSignal; MAX_UNITS],
}

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Create the driver. No register is touched until a channel is
    /// initialised.
    pub fn new(bus: B, clock: C, pins: P) -> Self {
        #[cfg(feature = "defmt")]
        defmt::info!(
            "{} driver v{} for {} ({} units x {} channels)",
            platform::config::DRIVER_NAME,
            platform::config::DRIVER_VERSION,
            R::NAME,
            R::UNITS,
            R::CHANNELS_PER_UNIT
        );
        Self {
            regs: RegisterAdapter::new(bus),
            clock,
            pins,
            state: Mutex::new(RefCell::new(DriverState::new())),
            capture_signals: core::array::from_fn(|_| Signal::new()),
        }
    }

    /// Read-only view of the register file, for diagnostics and tests.
    ///
    /// Reads are single words and need no lock; every write goes through a
    /// driver operation.
    pub fn registers(&self) -> &RegisterAdapter<B, R> {
        &self.regs
    }

    /// Run `f` with exclusive access to the bookkeeping.
    ///
    /// Must not be re-entered from inside `f`.
    pub(crate) fn with_state<T>(&self, f: impl FnOnce(&mut DriverState) -> T) -> T {
        self.state.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub(crate) fn capture_signal(&self, unit: UnitId) -> Option<&CaptureSignal> {
        self.capture_signals.get(unit.index())
    }

    /// Locate `ch` and check that it has been initialised.
    pub(crate) fn require_init(
        st: &DriverState,
        ch: ChannelId,
    ) -> Result<(UnitId, HwChannel), PwmError> {
        let (unit, hw) = R::locate(ch)?;
        if !st.is_init(unit, hw) {
            return Err(PwmError::ChannelNotInit(ch));
        }
        Ok((unit, hw))
    }

    /// Route the channel pad to the PWM block with a pull-up.
    pub(crate) fn mux_gpio(&self, unit: UnitId, hw: HwChannel) {
        if let Some(gpio) = R::gpio(unit, hw) {
            self.pins.unmap(gpio);
            self.pins.map_pwm(gpio);
            self.pins.pull_up(gpio);
        }
    }

    /// Bring-up shared by PWM, group, phase-shift and capture channels.
    pub(crate) fn init_common(&self, st: &mut DriverState, unit: UnitId, hw: HwChannel) {
        if let Some(u) = st.unit_mut(unit) {
            u.set_init(hw, true);
        }
        self.clock.power_up(unit);
        self.clock.select_source(unit, ClockSource::Xtal);
        self.mux_gpio(unit, hw);
        if !self.regs.soft_reset_released(unit) {
            self.regs.release_soft_reset(unit);
        }
        self.pm_register(st, unit);
    }

    /// Release the channel; the unit clock goes down with its last channel.
    pub(crate) fn deinit_common(&self, st: &mut DriverState, unit: UnitId, hw: HwChannel) {
        self.regs.set_output_enable(unit, hw, false);
        let Some(u) = st.unit_mut(unit) else {
            return;
        };
        u.set_init(hw, false);
        u.set_timer_mode(hw, false);
        if u.chan_init_bits == 0 {
            self.clock.power_down(unit);
            self.pm_unregister(st, unit);
            #[cfg(feature = "defmt")]
            defmt::debug!("unit {} powered down", unit.get());
        }
    }

    #[cfg(not(feature = "pm"))]
    pub(crate) fn check_restore(&self, _st: &mut DriverState, _unit: UnitId) {}

    #[cfg(not(feature = "pm"))]
    pub(crate) fn pm_register(&self, _st: &mut DriverState, _unit: UnitId) {}

    #[cfg(not(feature = "pm"))]
    pub(crate) fn pm_unregister(&self, _st: &mut DriverState, _unit: UnitId) {}
}
