//! PWM register map
//!
//! Every unit is one register block; unit `n` starts at `n * UNIT_STRIDE`
//! (the stride is a revision constant). Offsets below are relative to the
//! start of a unit.
//!
//! # Layout
//!
//! | Offset | Register | Notes |
//! |--------|----------|-------|
//! | `0x000` | `DEVICE_ID` | read-only |
//! | `0x008` | `GLOBAL_CTRL` | soft reset, clock-gate bypass |
//! | `0x010` | `TIMER_EN` | bit n = channel n counter, bit 31 = sync-all |
//! | `0x014` | `OUTPUT_EN` | bit n = channel n output driver |
//! | `0x018` | `INT_EN` | bit n = UIE, bit 16+n = CC1IE |
//! | `0x01C` | `INT_STATUS` | bit n = UIF, bit 16+n = CC1IF, write-1-to-clear |
//! | `0x020` | `DEAD_TIME[p]` | one word per hardware pair, 10 bits |
//! | `0x040` | channel blocks | `0x20` bytes per channel |
//!
//! ## Shadowed writes
//! With `CTRL_PRELOAD` set, ARR and CCR writes land in shadow registers and
//! take effect at the next update event. Without it they take effect
//! immediately, which can glitch the output mid-period.
//!
//! ## Compare value 1
//! The comparator never matches at 1. The driver raises such values to
//! `MIN_COMPARE`.

use platform::HwChannel;

// ---------------------------------------------------------------------------
// Global registers
// ---------------------------------------------------------------------------

/// Device identification (read-only)
pub const REG_DEVICE_ID: u32 = 0x000;

/// Global control: soft reset release and clock gating
pub const REG_GLOBAL_CTRL: u32 = 0x008;

/// Per-channel counter enable
///
/// Bit n starts the counter of hardware channel n. Bit 31 (`TIMER_EN_SYNC_ALL`)
/// transfers every shadow register of the unit in one cycle (v2p2 only).
pub const REG_TIMER_EN: u32 = 0x010;

/// Per-channel output driver enable
pub const REG_OUTPUT_EN: u32 = 0x014;

/// Interrupt enable: UIE in bits [11:0], CC1IE in bits [27:16]
pub const REG_INT_EN: u32 = 0x018;

/// Interrupt status: UIF in bits [11:0], CC1IF in bits [27:16]
///
/// Write 1 to a bit to clear it; writing 0 has no effect.
pub const REG_INT_STATUS: u32 = 0x01C;

/// First hardware dead-time register; pair `p` lives at `+ 4 * p`
pub const REG_DEAD_TIME_BASE: u32 = 0x020;

/// Dead-time words reserved per unit
pub const DEAD_TIME_WORDS: u32 = 6;

/// First channel register block
pub const CHANNEL_BLOCK_BASE: u32 = 0x040;

/// Size of one channel register block
pub const CHANNEL_BLOCK_STRIDE: u32 = 0x20;

// ---------------------------------------------------------------------------
// Channel block offsets
// ---------------------------------------------------------------------------

/// Channel control: polarity, initial level, flip mode, capture, preload
pub const CH_CTRL: u32 = 0x00;

/// Prescaler (counter clock = source / (PSC + 1))
pub const CH_PSC: u32 = 0x04;

/// Auto-reload (period − 1)
pub const CH_ARR: u32 = 0x08;

/// Compare 1: first output transition
pub const CH_CCR1: u32 = 0x0C;

/// Compare 2: second output transition
pub const CH_CCR2: u32 = 0x10;

/// Compare 3: optional third transition
pub const CH_CCR3: u32 = 0x14;

/// Counter value latched by the last capture event (read-only)
pub const CH_CCR1_SHADOW: u32 = 0x18;

/// Fade engine control (v2p2 only)
pub const CH_FADE: u32 = 0x1C;

// ---------------------------------------------------------------------------
// Register field values
// ---------------------------------------------------------------------------

/// Global control: soft reset released (0 holds the unit in reset)
pub const GLOBAL_CTRL_SOFT_RESET_N: u32 = 1 << 0;

/// Global control: bypass the automatic clock gate
pub const GLOBAL_CTRL_CLKGATE_BYPASS: u32 = 1 << 1;

/// Timer enable: transfer all shadow registers at once
pub const TIMER_EN_SYNC_ALL: u32 = 1 << 31;

/// Bit offset of the CC1 flags in `INT_EN` / `INT_STATUS`
pub const INT_CC1_SHIFT: u32 = 16;

/// Dead-time register width
pub const DEAD_TIME_MASK: u32 = 0x3FF;

/// Control: invert output polarity
pub const CTRL_POLARITY_INVERTED: u32 = 1 << 0;

/// Control: output level before the first compare match (1 = high)
pub const CTRL_INIT_LEVEL_HIGH: u32 = 1 << 1;

/// Control: flip mode field shift
pub const CTRL_FLIP_SHIFT: u32 = 2;

/// Control: flip mode field, bits [4:2]
pub const CTRL_FLIP_MASK: u32 = 0b111 << CTRL_FLIP_SHIFT;

/// Control: latch the counter on input edges instead of driving an output
pub const CTRL_CAPTURE_MODE: u32 = 1 << 5;

/// Control: capture edge field shift
pub const CTRL_EDGE_SHIFT: u32 = 6;

/// Control: capture edge field, bits [7:6]
pub const CTRL_EDGE_MASK: u32 = 0b11 << CTRL_EDGE_SHIFT;

/// Control: route ARR/CCR writes through the shadow registers
pub const CTRL_PRELOAD: u32 = 1 << 8;

/// Control: reset the counter on every capture event
pub const CTRL_CLEAR_ON_CAPTURE: u32 = 1 << 9;

/// Fade: engine running
pub const FADE_ENABLE: u32 = 1 << 0;

/// Fade: step the compare value up (0 steps down)
pub const FADE_INCREASE: u32 = 1 << 1;

/// Fade: remaining steps, bits [11:2]
pub const FADE_COUNT_SHIFT: u32 = 2;

/// Fade: remaining steps field
pub const FADE_COUNT_MASK: u32 = 0x3FF << FADE_COUNT_SHIFT;

/// Fade: compare increment per step, bits [19:12]
pub const FADE_SCALE_SHIFT: u32 = 12;

/// Fade: compare increment field
pub const FADE_SCALE_MASK: u32 = 0xFF << FADE_SCALE_SHIFT;

/// Fade: periods between steps, bits [27:20]
pub const FADE_INTERVAL_SHIFT: u32 = 20;

/// Fade: periods between steps field
pub const FADE_INTERVAL_MASK: u32 = 0xFF << FADE_INTERVAL_SHIFT;

// ---------------------------------------------------------------------------
// Address helpers
// ---------------------------------------------------------------------------

/// Offset of register `reg` in the block of hardware channel `hw`.
pub const fn channel_reg(hw: HwChannel, reg: u32) -> u32 {
    CHANNEL_BLOCK_BASE
        .wrapping_add((hw.get() as u32).wrapping_mul(CHANNEL_BLOCK_STRIDE))
        .wrapping_add(reg)
}

/// Offset of the dead-time register of hardware pair `pair`.
pub const fn dead_time_reg(pair: u32) -> u32 {
    REG_DEAD_TIME_BASE.wrapping_add(pair.wrapping_mul(4))
}

/// UIF / UIE bit of `hw`.
pub fn update_bit(hw: HwChannel) -> u32 {
    hw.bit()
}

/// CC1IF / CC1IE bit of `hw`.
pub fn capture_bit(hw: HwChannel) -> u32 {
    hw.bit().checked_shl(INT_CC1_SHIFT).unwrap_or(0)
}
