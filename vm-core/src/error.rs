//! CPU-side error taxonomy: decode failures and execution faults.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("unknown opcode {opcode_raw} at pc={pc:#06x}")]
    UnknownOpcode { pc: u16, opcode_raw: u8 },

    #[error("invalid addressing mode {mode_raw} at pc={pc:#06x}")]
    UnknownMode { pc: u16, mode_raw: u8 },

    #[error("addressing mode {mode:?} is invalid as a destination at pc={pc:#06x}")]
    InvalidDestinationMode { pc: u16, mode: crate::instruction::AddressingMode },

    #[error("addressing mode {mode:?} is invalid for {opcode:?} at pc={pc:#06x}")]
    InvalidModeForOpcode {
        pc: u16,
        opcode: crate::instruction::Opcode,
        mode: crate::instruction::AddressingMode,
    },

    #[error("cycle cap of {cap} exceeded without halting")]
    CycleCapExceeded { cap: u64 },

    #[error("register field {raw} at pc={pc:#06x} has no corresponding R0..R3 register")]
    InvalidRegister { pc: u16, raw: u8 },
}
