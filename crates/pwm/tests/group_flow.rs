//! Complementary group integration tests
//!
//! Covers both ways a group is driven: channel pairs that own a hardware
//! dead-time generator, and pairs across units where the dead time is laid
//! out in the compare registers. Runtime updates are applied by calling the
//! interrupt dispatcher the way the unit ISR would.
//!
//! Run with: cargo test -p pwm --test group_flow

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use platform::mocks::{MockClockGate, MockPinMux, MockRegisterBus};
use platform::{ChannelId, GroupId, HwChannel, PwmError, SignalLevel, UnitId};
use pwm::hal::registers::{dead_time_reg, update_bit, REG_INT_STATUS};
use pwm::hal::{FlipMode, V1px};
use pwm::{GroupConfig, GroupInitConfig, PwmDriver, PwmInitConfig};

type Driver<'a> = PwmDriver<V1px, &'a MockRegisterBus, &'a MockClockGate, &'a MockPinMux>;

const U0: UnitId = UnitId::new(0);
const U1: UnitId = UnitId::new(1);

fn init(chan1: u8, chan2: u8, period: u32, d1: u32, d2: u32) -> GroupInitConfig {
    GroupInitConfig {
        chan1: ChannelId::new(chan1),
        chan2: ChannelId::new(chan2),
        period,
        chan1_duty: d1,
        chan2_duty: d2,
    }
}

/// Raise the update flag of `hw` on `unit` and run the dispatcher.
fn update_irq(bus: &MockRegisterBus, pwm: &Driver<'_>, unit: UnitId, hw: HwChannel) {
    let status = u32::from(unit.get()) * 0x200 + REG_INT_STATUS;
    bus.raise(status, update_bit(hw));
    pwm.on_interrupt(unit);
}

// ─── Hardware dead time ──────────────────────────────────────────────────────

#[test]
fn adjacent_pair_uses_dead_time_generator() {
    let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]);
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);

    let group = pwm.group_init(&init(2, 3, 1000, 400, 400)).unwrap();
    assert_eq!(group, GroupId::new(0));
    assert_eq!(bus.peek(dead_time_reg(1)), 100);

    let regs = pwm.registers();
    let (h2, h3) = (HwChannel::new(2), HwChannel::new(3));
    assert_eq!(regs.flip_mode(U0, h2), Some(FlipMode::Complementary));
    assert_eq!(regs.flip_mode(U0, h3), Some(FlipMode::Complementary));
    assert!(!regs.polarity_inverted(U0, h2));
    assert!(regs.polarity_inverted(U0, h3));
    assert_eq!(regs.compare1(U0, h2), 500);
    assert!(regs.output_enabled(U0, h2));

    pwm.group_start(group).unwrap();
    assert!(regs.timer_enabled(U0, h2) && regs.timer_enabled(U0, h3));
    pwm.group_stop(group).unwrap();
    assert!(!regs.timer_enabled(U0, h2) && !regs.timer_enabled(U0, h3));
}

#[test]
fn dead_time_wider_than_generator_is_refused() {
    let bus = MockRegisterBus::new();
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    // (10_000 - 2 - 2) / 2 = 4998 > 0x3FF
    assert_eq!(
        pwm.group_init(&init(0, 1, 10_000, 2, 2)),
        Err(PwmError::DeadTimeOutOfRange(4998))
    );
    assert!(!clock.is_powered(U0));
}

// ─── Software dead time ──────────────────────────────────────────────────────

#[test]
fn cross_unit_pair_lays_out_dead_time_in_compares() {
    let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS]);
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    pwm.group_init(&init(0, 7, 100, 30, 50)).unwrap();

    let regs = pwm.registers();
    let (h0, h1) = (HwChannel::new(0), HwChannel::new(1));
    assert_eq!(regs.compare1(U0, h0), 30);
    assert_eq!(regs.init_level(U0, h0), SignalLevel::High);
    assert_eq!(regs.compare1(U1, h1), 40);
    assert_eq!(regs.compare2(U1, h1), 90);
    assert_eq!(regs.flip_mode(U1, h1), Some(FlipMode::Toggle));
    assert_eq!(regs.init_level(U1, h1), SignalLevel::Low);
    assert!(clock.is_powered(U0) && clock.is_powered(U1));
}

#[test]
fn runtime_update_lands_on_update_interrupt() {
    let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS, 0x200 + REG_INT_STATUS]);
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    let group = pwm.group_init(&init(0, 7, 100, 30, 50)).unwrap();
    let (h0, h1) = (HwChannel::new(0), HwChannel::new(1));

    pwm.group_set_config(
        group,
        &GroupConfig {
            period: 100,
            chan1_duty: 40,
            chan2_duty: 40,
        },
    )
    .unwrap();
    assert!(pwm.group_update_pending(group).unwrap());
    assert!(pwm.registers().uie(U0, h0));

    // An update on the wrong unit does nothing.
    update_irq(&bus, &pwm, U1, h0);
    assert!(pwm.group_update_pending(group).unwrap());

    update_irq(&bus, &pwm, U0, h0);
    assert!(!pwm.group_update_pending(group).unwrap());
    let regs = pwm.registers();
    assert!(!regs.uie(U0, h0));
    assert_eq!(regs.compare1(U0, h0), 40);
    assert_eq!(regs.compare1(U1, h1), 50);
    assert_eq!(regs.compare2(U1, h1), 90);
}

#[test]
fn full_duty_transition_takes_two_updates() {
    let bus = MockRegisterBus::with_write_one_to_clear(&[REG_INT_STATUS, 0x200 + REG_INT_STATUS]);
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    let group = pwm.group_init(&init(0, 7, 100, 30, 50)).unwrap();
    let h0 = HwChannel::new(0);

    pwm.group_set_config(
        group,
        &GroupConfig {
            period: 100,
            chan1_duty: 100,
            chan2_duty: 0,
        },
    )
    .unwrap();
    update_irq(&bus, &pwm, U0, h0);
    assert!(pwm.group_update_pending(group).unwrap());
    update_irq(&bus, &pwm, U0, h0);
    assert!(!pwm.group_update_pending(group).unwrap());
    assert!(!pwm.registers().uie(U0, h0));
}

// ─── Table management ────────────────────────────────────────────────────────

#[test]
fn channels_belong_to_one_group_at_a_time() {
    let bus = MockRegisterBus::new();
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    pwm.group_init(&init(0, 1, 100, 40, 40)).unwrap();
    assert_eq!(
        pwm.group_init(&init(1, 0, 100, 40, 40)),
        Err(PwmError::GroupExists)
    );
    assert_eq!(
        pwm.group_init(&init(1, 2, 100, 40, 40)),
        Err(PwmError::GroupChannelInUse(ChannelId::new(1)))
    );
    assert_eq!(
        pwm.group_init(&init(4, 4, 100, 40, 40)),
        Err(PwmError::GroupSameChannel)
    );
}

#[test]
fn deinit_frees_slot_and_channels() {
    let bus = MockRegisterBus::new();
    let (clock, pins) = (MockClockGate::new(), MockPinMux::new());
    let pwm = PwmDriver::<V1px, _, _, _>::new(&bus, &clock, &pins);
    let group = pwm.group_init(&init(4, 5, 100, 40, 40)).unwrap();
    pwm.group_deinit(group).unwrap();
    assert!(!clock.is_powered(U0));
    assert_eq!(pwm.group_start(group), Err(PwmError::GroupNotFound(group)));

    // The freed slot and channels are reusable, also as plain channels.
    assert_eq!(pwm.group_init(&init(4, 5, 100, 40, 40)).unwrap(), group);
    pwm.group_deinit(group).unwrap();
    pwm.init(ChannelId::new(4), &PwmInitConfig::new(100, 10))
        .unwrap();
}
