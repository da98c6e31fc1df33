//! Mock implementations for testing
//!
//! Host-side stand-ins for the platform traits. The register file is sparse
//! (unwritten offsets read as zero) and every write that goes through the
//! [`RegisterBus`] trait is logged so tests can assert on ordering.

#![cfg(any(test, feature = "std"))]

use core::cell::{Cell, RefCell};

use heapless::index_map::FnvIndexMap;
use heapless::{Deque, Vec};

use crate::*;

const REGISTER_CAPACITY: usize = 512;
const LOG_CAPACITY: usize = 1024;
const W1C_CAPACITY: usize = 8;
const LEVEL_QUEUE_CAPACITY: usize = 128;

/// Mock register file
pub struct MockRegisterBus {
    regs: RefCell<FnvIndexMap<u32, u32, REGISTER_CAPACITY>>,
    log: RefCell<Vec<(u32, u32), LOG_CAPACITY>>,
    write_one_to_clear: Vec<u32, W1C_CAPACITY>,
}

impl MockRegisterBus {
    /// Create an empty register file.
    pub fn new() -> Self {
        Self {
            regs: RefCell::new(FnvIndexMap::new()),
            log: RefCell::new(Vec::new()),
            write_one_to_clear: Vec::new(),
        }
    }

    /// Create a register file where writes to `offsets` clear the written
    /// bits instead of storing the value (interrupt status registers).
    pub fn with_write_one_to_clear(offsets: &[u32]) -> Self {
        let mut bus = Self::new();
        for &offset in offsets {
            let _ = bus.write_one_to_clear.push(offset);
        }
        bus
    }

    /// Current value at `offset`, without touching the log.
    pub fn peek(&self, offset: u32) -> u32 {
        self.regs.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// Store `value` at `offset` as hardware would (status bits, capture
    /// shadows). Bypasses the log and write-one-to-clear handling.
    pub fn poke(&self, offset: u32, value: u32) {
        let _ = self.regs.borrow_mut().insert(offset, value);
    }

    /// Set bits at `offset` as hardware would.
    pub fn raise(&self, offset: u32, bits: u32) {
        let old = self.peek(offset);
        self.poke(offset, old | bits);
    }

    /// Snapshot of every logged `(offset, value)` write.
    pub fn writes(&self) -> Vec<(u32, u32), LOG_CAPACITY> {
        self.log.borrow().clone()
    }

    /// Number of logged writes to `offset`.
    pub fn write_count(&self, offset: u32) -> usize {
        self.log.borrow().iter().filter(|(o, _)| *o == offset).count()
    }

    /// Value of the most recent logged write to `offset`.
    pub fn last_write(&self, offset: u32) -> Option<u32> {
        self.log
            .borrow()
            .iter()
            .rev()
            .find(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
    }

    /// Forget the write log (register values are kept).
    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }
}

impl Default for MockRegisterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for MockRegisterBus {
    fn read(&self, offset: u32) -> u32 {
        self.peek(offset)
    }

    fn write(&self, offset: u32, value: u32) {
        // Log is best-effort: tests that overflow it only lose history.
        let _ = self.log.borrow_mut().push((offset, value));
        let stored = if self.write_one_to_clear.contains(&offset) {
            self.peek(offset) & !value
        } else {
            value
        };
        self.poke(offset, stored);
    }
}

/// Mock clock gate
pub struct MockClockGate {
    powered: Cell<u32>,
    power_ups: Cell<u32>,
    power_downs: Cell<u32>,
    source: Cell<Option<ClockSource>>,
}

impl MockClockGate {
    /// Create a clock gate with every unit powered down.
    pub fn new() -> Self {
        Self {
            powered: Cell::new(0),
            power_ups: Cell::new(0),
            power_downs: Cell::new(0),
            source: Cell::new(None),
        }
    }

    /// Whether `unit` is currently powered.
    pub fn is_powered(&self, unit: UnitId) -> bool {
        self.powered.get() & unit_bit(unit) != 0
    }

    /// Total `power_up` calls.
    pub fn power_up_count(&self) -> u32 {
        self.power_ups.get()
    }

    /// Total `power_down` calls.
    pub fn power_down_count(&self) -> u32 {
        self.power_downs.get()
    }

    /// Last selected source clock.
    pub fn source(&self) -> Option<ClockSource> {
        self.source.get()
    }
}

impl Default for MockClockGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockGate for MockClockGate {
    fn power_up(&self, unit: UnitId) {
        self.powered.set(self.powered.get() | unit_bit(unit));
        self.power_ups.set(self.power_ups.get().saturating_add(1));
    }

    fn power_down(&self, unit: UnitId) {
        self.powered.set(self.powered.get() & !unit_bit(unit));
        self.power_downs.set(self.power_downs.get().saturating_add(1));
    }

    fn select_source(&self, _unit: UnitId, source: ClockSource) {
        self.source.set(Some(source));
    }
}

fn unit_bit(unit: UnitId) -> u32 {
    1u32.checked_shl(u32::from(unit.get())).unwrap_or(0)
}

/// Mock pin multiplexer
pub struct MockPinMux {
    mapped: Cell<u64>,
    pulled_up: Cell<u64>,
    levels: Cell<u64>,
    queued_levels: RefCell<Deque<bool, LEVEL_QUEUE_CAPACITY>>,
}

impl MockPinMux {
    /// Create a pin mux with no pads mapped and every input low.
    pub fn new() -> Self {
        Self {
            mapped: Cell::new(0),
            pulled_up: Cell::new(0),
            levels: Cell::new(0),
            queued_levels: RefCell::new(Deque::new()),
        }
    }

    /// Whether the PWM function is mapped on `gpio`.
    pub fn is_mapped(&self, gpio: GpioId) -> bool {
        self.mapped.get() & pad_bit(gpio) != 0
    }

    /// Whether the pull-up is enabled on `gpio`.
    pub fn is_pulled_up(&self, gpio: GpioId) -> bool {
        self.pulled_up.get() & pad_bit(gpio) != 0
    }

    /// Set the static input level of `gpio`.
    pub fn set_level(&self, gpio: GpioId, high: bool) {
        let bit = pad_bit(gpio);
        let levels = self.levels.get();
        self.levels.set(if high { levels | bit } else { levels & !bit });
    }

    /// Queue levels returned by the next `read_input` calls, on any pad.
    /// Falls back to the static level once the queue drains.
    pub fn queue_levels(&self, levels: &[bool]) {
        let mut queue = self.queued_levels.borrow_mut();
        for &level in levels {
            let _ = queue.push_back(level);
        }
    }
}

impl Default for MockPinMux {
    fn default() -> Self {
        Self::new()
    }
}

impl PinMux for MockPinMux {
    fn map_pwm(&self, gpio: GpioId) {
        self.mapped.set(self.mapped.get() | pad_bit(gpio));
    }

    fn unmap(&self, gpio: GpioId) {
        self.mapped.set(self.mapped.get() & !pad_bit(gpio));
    }

    fn pull_up(&self, gpio: GpioId) {
        self.pulled_up.set(self.pulled_up.get() | pad_bit(gpio));
    }

    fn read_input(&self, gpio: GpioId) -> bool {
        if let Some(level) = self.queued_levels.borrow_mut().pop_front() {
            return level;
        }
        self.levels.get() & pad_bit(gpio) != 0
    }
}

fn pad_bit(gpio: GpioId) -> u64 {
    1u64.checked_shl(u32::from(gpio.get())).unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_register_reads_zero() {
        let bus = MockRegisterBus::new();
        assert_eq!(bus.read(0x40), 0);
    }

    #[test]
    fn writes_are_logged_in_order() {
        let bus = MockRegisterBus::new();
        bus.write(0x10, 1);
        bus.write(0x14, 2);
        bus.write(0x10, 3);
        assert_eq!(bus.writes().as_slice(), &[(0x10, 1), (0x14, 2), (0x10, 3)]);
        assert_eq!(bus.write_count(0x10), 2);
        assert_eq!(bus.last_write(0x10), Some(3));
    }

    #[test]
    fn write_one_to_clear_only_clears_written_bits() {
        let bus = MockRegisterBus::with_write_one_to_clear(&[0x1C]);
        bus.poke(0x1C, 0b1011);
        bus.write(0x1C, 0b0010);
        assert_eq!(bus.peek(0x1C), 0b1001);
    }

    #[test]
    fn modify_keeps_unmasked_bits() {
        let bus = MockRegisterBus::new();
        bus.poke(0x20, 0xF0F0);
        bus.modify(0x20, 0x00FF, 0x0012);
        assert_eq!(bus.peek(0x20), 0xF012);
    }

    #[test]
    fn clock_gate_tracks_power_per_unit() {
        let clock = MockClockGate::new();
        clock.power_up(UnitId::new(1));
        assert!(clock.is_powered(UnitId::new(1)));
        assert!(!clock.is_powered(UnitId::new(0)));
        clock.power_down(UnitId::new(1));
        assert!(!clock.is_powered(UnitId::new(1)));
        assert_eq!(clock.power_down_count(), 1);
    }

    #[test]
    fn pin_mux_queue_takes_priority_over_static_level() {
        let pins = MockPinMux::new();
        let pad = GpioId::new(18);
        pins.set_level(pad, true);
        pins.queue_levels(&[false]);
        assert!(!pins.read_input(pad));
        assert!(pins.read_input(pad));
    }
}
