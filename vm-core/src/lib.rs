//! Memory, register file, ALU, instruction encoding and CPU sequencer for a
//! simple 16-bit RISC-like processor.
//!
//! This crate has no knowledge of assembly source text (see `vm-asm`) or of
//! any particular trace wire format (see `vm-cli`): it implements the
//! machine itself.

pub mod alu;
pub mod constants;
pub mod cpu;
pub mod error;
pub mod instruction;
pub mod memory;
pub mod registers;
pub mod trace;

pub use alu::{execute as alu_execute, AluOp};
pub use cpu::{Cpu, RunOutcome, StepOutcome};
pub use error::CpuError;
pub use instruction::{decode, encode, AddressingMode, DecodedFields, Opcode};
pub use memory::{LoadImageError, Memory};
pub use registers::{Flag, Flags, RegisterFile, RegisterId};
pub use trace::{DecodedView, MemWriteEvent, RegisterSnapshot, TraceSink};
