//! Platform seams for the PWM driver
//!
//! This crate holds everything the driver needs from the SoC that is not the
//! PWM block itself, expressed as traits so the driver can run against
//! silicon or against host-side mocks.
//!
//! # Architecture Layers
//!
//! ```text
//! Application code
//!         ↓
//! PWM driver (pwm crate - channels, groups, capture, fade)
//!         ↓
//! Platform seams (this crate - register bus, clock gate, pin mux)
//!         ↓
//! Silicon (MMIO, clock controller, GPIO matrix)
//! ```
//!
//! # Seams
//!
//! | Trait | Purpose | Silicon | Host |
//! |-------|---------|---------|------|
//! | [`RegisterBus`] | 32-bit register access | [`MmioBus`] | `MockRegisterBus` |
//! | [`ClockGate`] | Per-unit clock domain | board crate | `MockClockGate` |
//! | [`PinMux`] | Pad routing and sampling | board crate | `MockPinMux` |
//!
//! # Features
//!
//! - `std`: Export the mocks outside of this crate's own tests
//! - `defmt`: Enable `defmt::Format` derives on every public type
//!
//! # Example
//!
//! ```no_run
//! use platform::{ChannelId, RegisterBus};
//!
//! fn enabled<B: RegisterBus>(bus: &B, ch: ChannelId) -> bool {
//!     bus.read(0x010) & (1 << ch.get()) != 0
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod gpio;
pub mod power;
pub mod pwm_types;
pub mod register_bus;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use error::PwmError;
pub use gpio::PinMux;
pub use power::{ClockGate, ClockSource, SleepMode};
pub use pwm_types::{
    CaptureEdge, ChannelId, DeadCycles, FadeDirection, GpioId, GroupId, HwChannel,
    OutOfRangeError, SignalLevel, UnitId,
};
pub use register_bus::{MmioBus, RegisterBus};
