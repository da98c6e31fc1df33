//! Multi-unit PWM driver
//!
//! Driver for the PWM block found on BK7239N-class SoCs: independent
//! channels, complementary groups with dead time, phase-shifted chains,
//! input capture and (on newer silicon) a hardware fade engine.
//!
//! # Architecture
//!
//! ```text
//! Application / board code
//!         ↓
//! PwmDriver (channel, group, phase_shift, capture, fade, isr, pm)
//!         ↓
//! Register adapter (hal - one revision table per silicon)
//!         ↓
//! Platform seams (RegisterBus, ClockGate, PinMux)
//! ```
//!
//! Software channels are numbered across units; the [`hal::Revision`]
//! parameter maps them onto `(unit, hardware channel)` and decides which
//! optional blocks exist.
//!
//! # Features
//!
//! - `phase-shift` - Phase-shift coordinator
//! - `pm` - Register checkpoint across low-voltage sleep
//! - `defmt` - Logging and `defmt::Format` derives
//! - `std` - Host mocks (re-exported from `platform`)
//!
//! # Example
//!
//! ```no_run
//! use platform::{ChannelId, MmioBus};
//! use pwm::{hal::V1px, PwmDriver, PwmInitConfig};
//! # fn board(clock: impl platform::ClockGate, pins: impl platform::PinMux) -> Result<(), platform::PwmError> {
//! // SAFETY: the PWM block is mapped at this address and owned by the driver.
//! let bus = unsafe { MmioBus::new(0x4480_0000) };
//! let pwm = PwmDriver::<V1px, _, _, _>::new(bus, clock, pins);
//! let led = ChannelId::new(3);
//! pwm.init(led, &PwmInitConfig::new(26_000, 6_500))?;
//! pwm.start(led)?;
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::await_holding_lock)] // the driver lock must never span an .await
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

pub mod capture;
pub mod channel;
pub mod driver;
pub mod duty;
pub mod fade;
pub mod group;
pub mod hal;
pub mod isr;
pub mod majority;
pub mod output;
#[cfg(feature = "phase-shift")]
pub mod phase_shift;
#[cfg(feature = "pm")]
mod pm;
pub mod state;

pub use capture::CaptureConfig;
pub use channel::{PeriodDutyConfig, PwmInitConfig};
pub use driver::PwmDriver;
pub use fade::FadeConfig;
pub use group::{GroupConfig, GroupInitConfig};
pub use output::PwmOutput;
#[cfg(feature = "phase-shift")]
pub use phase_shift::{PhaseDuty, PhaseShiftConfig};
pub use state::ChannelIsr;

#[cfg(feature = "std")]
pub use platform::mocks;
