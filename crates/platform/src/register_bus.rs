//! Register access abstraction
//!
//! The PWM driver never touches raw pointers itself. Every access goes
//! through a [`RegisterBus`], so the same driver code runs against silicon
//! ([`MmioBus`]) and against the host-side mock register file.
//!
//! Accesses take `&self`: memory-mapped registers are shared between thread
//! mode and the interrupt handler, and neither side owns them exclusively.

/// 32-bit register access relative to the peripheral base.
pub trait RegisterBus {
    /// Read the word at `offset` bytes from the base.
    fn read(&self, offset: u32) -> u32;

    /// Write the word at `offset` bytes from the base.
    fn write(&self, offset: u32, value: u32);

    /// Read-modify-write the bits selected by `mask`.
    fn modify(&self, offset: u32, mask: u32, value: u32) {
        let old = self.read(offset);
        self.write(offset, (old & !mask) | (value & mask));
    }

    /// Set the bits in `bits`, leave the others untouched.
    fn set_bits(&self, offset: u32, bits: u32) {
        self.modify(offset, bits, bits);
    }

    /// Clear the bits in `bits`, leave the others untouched.
    fn clear_bits(&self, offset: u32, bits: u32) {
        self.modify(offset, bits, 0);
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    fn read(&self, offset: u32) -> u32 {
        (**self).read(offset)
    }

    fn write(&self, offset: u32, value: u32) {
        (**self).write(offset, value);
    }
}

/// Volatile memory-mapped bus rooted at the peripheral base address.
#[derive(Debug)]
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// Create a bus for the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of the PWM register block, mapped for
    /// 32-bit volatile access for the whole span the revision describes, and
    /// no other code may own that block as a different type.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn addr(&self, offset: u32) -> usize {
        // usize is at least 32 bits on every supported target.
        self.base.wrapping_add(offset as usize)
    }
}

impl RegisterBus for MmioBus {
    fn read(&self, offset: u32) -> u32 {
        let ptr = self.addr(offset) as *const u32;
        // SAFETY: `new` guarantees the block is mapped and the driver only
        // produces offsets inside the span of its revision.
        unsafe { core::ptr::read_volatile(ptr) }
    }

    fn write(&self, offset: u32, value: u32) {
        let ptr = self.addr(offset) as *mut u32;
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(ptr, value) }
    }
}
