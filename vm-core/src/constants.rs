//! Layout constants for the 64 KiB address space and instruction word.

/// Total size of the flat byte-addressable memory.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// First address of the memory-mapped I/O window.
pub const IO_BASE: u16 = 0xF000;

/// Last address of the memory-mapped I/O window, inclusive.
pub const IO_END: u16 = 0xF0FF;

/// Output sink byte.
pub const IO_OUTPUT: u16 = 0xF000;

/// Input source byte.
pub const IO_INPUT: u16 = 0xF001;

/// Timer counter low byte (read-only from the CPU's perspective).
pub const IO_TIMER_LOW: u16 = 0xF010;

/// Timer control/high byte: bit0 starts/stops the timer, byte value is also
/// the counter's high byte on read.
pub const IO_TIMER_CTRL: u16 = 0xF011;

/// Reset value of the program counter.
pub const RESET_PC: u16 = 0x8000;

/// Reset value of the stack pointer.
pub const RESET_SP: u16 = 0x7FFF;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 4;

/// Default cycle cap for `Cpu::run`.
pub const DEFAULT_CYCLE_CAP: u64 = 100_000;

/// Width in bits of the opcode field.
pub const OPCODE_WIDTH: u32 = 5;

/// Width in bits of the addressing-mode field.
pub const MODE_WIDTH: u32 = 3;

/// Width in bits of each register-index field.
pub const REG_FIELD_WIDTH: u32 = 3;

pub const OPCODE_SHIFT: u32 = 11;
pub const MODE_SHIFT: u32 = 8;
pub const RD_SHIFT: u32 = 5;
pub const RS_SHIFT: u32 = 2;

pub const OPCODE_MASK: u16 = 0x1F;
pub const MODE_MASK: u16 = 0x07;
pub const REG_FIELD_MASK: u16 = 0x07;
