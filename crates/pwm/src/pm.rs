//! Register checkpoint across low-voltage sleep.
//!
//! The PWM register file loses its contents when the unit clock domain is
//! powered down in low-voltage sleep. Units with initialised channels are
//! registered; [`PwmDriver::suspend`] snapshots them and [`PwmDriver::resume`]
//! writes the snapshot back. Any driver entry point that touches a unit
//! before resume restores it first (check-restore), so a wake-up source that
//! runs PWM code early still sees a programmed block.

use platform::{ClockGate, PinMux, RegisterBus, SleepMode, UnitId};

use crate::driver::PwmDriver;
use crate::hal::{units, Revision};
use crate::state::DriverState;

impl<R, B, C, P> PwmDriver<R, B, C, P>
where
    R: Revision,
    B: RegisterBus,
    C: ClockGate,
    P: PinMux,
{
    /// Write back a pending snapshot of `unit`, if any.
    pub(crate) fn check_restore(&self, st: &mut DriverState, unit: UnitId) {
        let Some(u) = st.unit_mut(unit) else {
            return;
        };
        if !u.checkpoint.valid {
            return;
        }
        self.clock.power_up(unit);
        self.regs.restore(unit, &u.checkpoint.words);
        u.checkpoint.valid = false;
        #[cfg(feature = "defmt")]
        defmt::debug!("unit {} restored on access", unit.get());
    }

    pub(crate) fn pm_register(&self, st: &mut DriverState, unit: UnitId) {
        if let Some(u) = st.unit_mut(unit) {
            u.checkpoint.registered = true;
        }
    }

    pub(crate) fn pm_unregister(&self, st: &mut DriverState, unit: UnitId) {
        if let Some(u) = st.unit_mut(unit) {
            u.checkpoint.registered = false;
            u.checkpoint.valid = false;
        }
    }

    /// Enter `mode`. Only [`SleepMode::LowVoltage`] needs a checkpoint.
    pub fn suspend(&self, mode: SleepMode) {
        if mode != SleepMode::LowVoltage {
            return;
        }
        self.with_state(|st| {
            for unit in units::<R>() {
                let Some(u) = st.unit_mut(unit) else {
                    continue;
                };
                if !u.checkpoint.registered {
                    continue;
                }
                if !u.checkpoint.valid {
                    self.regs.backup(unit, &mut u.checkpoint.words);
                    u.checkpoint.valid = true;
                }
                self.clock.power_down(unit);
                #[cfg(feature = "defmt")]
                defmt::debug!("unit {} checkpointed", unit.get());
            }
        });
    }

    /// Leave low-voltage sleep: power registered units and write back their
    /// snapshots.
    pub fn resume(&self) {
        self.with_state(|st| {
            for unit in units::<R>() {
                let Some(u) = st.unit_mut(unit) else {
                    continue;
                };
                if !u.checkpoint.registered {
                    continue;
                }
                self.clock.power_up(unit);
                if u.checkpoint.valid {
                    self.regs.restore(unit, &u.checkpoint.words);
                    u.checkpoint.valid = false;
                }
            }
        });
    }
}
