//! Trace recorder interface. `vm-core` only defines the trait and the
//! per-cycle data it is fed; concrete sinks (JSON, text) live in `vm-cli`.

use crate::instruction::{AddressingMode, Opcode};
use crate::registers::Flags;

/// A single byte store observed during one cycle's execute phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemWriteEvent {
    pub address: u16,
    pub old_value: u8,
    pub new_value: u8,
}

/// Register state captured after fetch and decode: `pc` is the address of
/// the next instruction, not the one just decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot {
    pub gpr: [u16; 4],
    pub pc: u16,
    pub sp: u16,
    pub flags: Flags,
}

/// The decoded instruction fields for a cycle, replacing the IR/MAR/MDR
/// latches as observational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedView {
    pub opcode_raw: u8,
    pub opcode: Option<Opcode>,
    pub mode_raw: u8,
    pub mode: Option<AddressingMode>,
    pub rd_raw: u8,
    pub rs_raw: u8,
    pub extra_word: Option<u16>,
}

/// Receives, in strict order, the five events of one CPU cycle:
/// `start_cycle`, `record_registers`, `record_decoded`, zero or more
/// `record_mem_write`, `end_cycle`.
pub trait TraceSink {
    fn start_cycle(&mut self, cycle: u64, pc_before_fetch: u16);
    fn record_registers(&mut self, snapshot: RegisterSnapshot);
    fn record_decoded(&mut self, decoded: DecodedView);
    fn record_mem_write(&mut self, event: MemWriteEvent);
    fn end_cycle(&mut self);
}
