//! Fetch-decode-execute sequencer.

use byteorder::ByteOrder;

use crate::alu::{self, AluOp};
use crate::constants::{DEFAULT_CYCLE_CAP, IO_BASE};
use crate::error::CpuError;
use crate::instruction::{decode, AddressingMode, DecodedFields, Opcode};
use crate::memory::Memory;
use crate::registers::{Flag, RegisterFile, RegisterId};
use crate::trace::{DecodedView, MemWriteEvent, RegisterSnapshot, TraceSink};

/// What happened on one call to [`Cpu::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The CPU is still running.
    Continuing,
    /// The CPU just executed `HALT` (or was already halted).
    Halted,
}

/// What happened on one call to [`Cpu::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Halted,
    CycleCapExceeded,
}

pub struct Cpu {
    regs: RegisterFile,
    mem: Memory,
    halted: bool,
    cycle: u64,
}

impl Cpu {
    pub fn new(mem: Memory) -> Cpu {
        Cpu {
            regs: RegisterFile::new(),
            mem,
            halted: false,
            cycle: 0,
        }
    }

    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    pub fn mem(&self) -> &Memory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn reset(&mut self) {
        self.regs.reset();
        self.halted = false;
        self.cycle = 0;
    }

    /// Runs until halted or `cap` cycles have executed.
    pub fn run(&mut self, cap: u64) -> Result<RunOutcome, CpuError> {
        for _ in 0..cap {
            match self.step()? {
                StepOutcome::Halted => return Ok(RunOutcome::Halted),
                StepOutcome::Continuing => {}
            }
        }
        if self.halted {
            Ok(RunOutcome::Halted)
        } else {
            Ok(RunOutcome::CycleCapExceeded)
        }
    }

    pub fn run_default(&mut self) -> Result<RunOutcome, CpuError> {
        self.run(DEFAULT_CYCLE_CAP)
    }

    /// Runs until halted or `cap` cycles, feeding every cycle to `sink`.
    pub fn run_with_trace(
        &mut self,
        cap: u64,
        sink: &mut dyn TraceSink,
    ) -> Result<RunOutcome, CpuError> {
        for _ in 0..cap {
            match self.step_with_trace(Some(sink))? {
                StepOutcome::Halted => return Ok(RunOutcome::Halted),
                StepOutcome::Continuing => {}
            }
        }
        if self.halted {
            Ok(RunOutcome::Halted)
        } else {
            Ok(RunOutcome::CycleCapExceeded)
        }
    }

    /// One fetch-decode-execute cycle, untraced.
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        self.step_with_trace(None)
    }

    /// One fetch-decode-execute cycle. If `sink` is `Some`, the cycle's
    /// events are reported in the order required by `TraceSink`.
    pub fn step_with_trace(
        &mut self,
        sink: Option<&mut dyn TraceSink>,
    ) -> Result<StepOutcome, CpuError> {
        if self.halted {
            return Ok(StepOutcome::Halted);
        }

        let pc_before_fetch = self.regs.pc();

        // Fetch.
        let mar = self.regs.pc();
        let mdr = self.mem.read_word(mar);
        let ir = mdr;
        self.regs.set_pc(mar.wrapping_add(2));

        // Decode.
        let fields = decode(ir);
        let opcode = match fields.opcode {
            Some(opcode) => opcode,
            None => {
                self.halted = true;
                return Err(CpuError::UnknownOpcode {
                    pc: mar,
                    opcode_raw: fields.opcode_raw,
                });
            }
        };
        let mode = match fields.mode {
            Some(mode) => mode,
            None => {
                self.halted = true;
                return Err(CpuError::UnknownMode {
                    pc: mar,
                    mode_raw: fields.mode_raw,
                });
            }
        };
        if fields.rd_raw as usize >= crate::constants::GPR_COUNT
            || fields.rs_raw as usize >= crate::constants::GPR_COUNT
        {
            self.halted = true;
            return Err(CpuError::InvalidRegister {
                pc: mar,
                raw: if fields.rd_raw as usize >= crate::constants::GPR_COUNT {
                    fields.rd_raw
                } else {
                    fields.rs_raw
                },
            });
        }

        let extra_word = if mode.has_extra_word() {
            let w = self.mem.read_word(self.regs.pc());
            self.regs.set_pc(self.regs.pc().wrapping_add(2));
            Some(w)
        } else {
            None
        };
        let pc_after_decode = self.regs.pc();

        log::trace!(
            "cycle {} pc={:#06x} opcode={:?} mode={:?} rd={} rs={} extra={:?}",
            self.cycle,
            pc_before_fetch,
            opcode,
            mode,
            fields.rd_raw,
            fields.rs_raw,
            extra_word,
        );

        let mut sink = sink;
        if let Some(sink) = sink.as_deref_mut() {
            sink.start_cycle(self.cycle, pc_before_fetch);
            sink.record_registers(RegisterSnapshot {
                gpr: [
                    self.regs.gpr(RegisterId::new(0)),
                    self.regs.gpr(RegisterId::new(1)),
                    self.regs.gpr(RegisterId::new(2)),
                    self.regs.gpr(RegisterId::new(3)),
                ],
                pc: self.regs.pc(),
                sp: self.regs.sp(),
                flags: self.regs.flags(),
            });
            sink.record_decoded(DecodedView {
                opcode_raw: fields.opcode_raw,
                opcode: fields.opcode,
                mode_raw: fields.mode_raw,
                mode: fields.mode,
                rd_raw: fields.rd_raw,
                rs_raw: fields.rs_raw,
                extra_word,
            });
        }

        let result = self.execute(opcode, mode, &fields, extra_word, pc_after_decode, sink.as_deref_mut());

        if let Some(sink) = sink {
            sink.end_cycle();
        }

        self.cycle += 1;

        match result {
            Ok(()) => Ok(if self.halted {
                StepOutcome::Halted
            } else {
                StepOutcome::Continuing
            }),
            Err(err) => {
                self.halted = true;
                Err(err)
            }
        }
    }

    fn effective_address(
        &self,
        mode: AddressingMode,
        fields: &DecodedFields,
        extra_word: Option<u16>,
        pc_after_decode: u16,
    ) -> Option<u16> {
        match mode {
            AddressingMode::Direct => extra_word,
            AddressingMode::RegisterIndirect => Some(self.regs.gpr(fields.rs())),
            AddressingMode::RegisterOffset => {
                Some(self.regs.gpr(fields.rs()).wrapping_add(extra_word.unwrap_or(0)))
            }
            AddressingMode::PcRelative => {
                let offset = extra_word.unwrap_or(0) as i16;
                Some(pc_after_decode.wrapping_add(offset as u16))
            }
            AddressingMode::Register | AddressingMode::Immediate => None,
        }
    }

    fn resolve_operand(
        &mut self,
        mode: AddressingMode,
        fields: &DecodedFields,
        extra_word: Option<u16>,
        pc_after_decode: u16,
    ) -> u16 {
        match mode {
            AddressingMode::Register => self.regs.gpr(fields.rs()),
            AddressingMode::Immediate => extra_word.unwrap_or(0),
            _ => {
                let ea = self
                    .effective_address(mode, fields, extra_word, pc_after_decode)
                    .unwrap_or(0);
                self.mem.read_word(ea)
            }
        }
    }

    fn resolve_port(
        &self,
        opcode: Opcode,
        mode: AddressingMode,
        fields: &DecodedFields,
        extra_word: Option<u16>,
        pc: u16,
    ) -> Result<u16, CpuError> {
        match mode {
            AddressingMode::Immediate => Ok(extra_word.unwrap_or(0)),
            AddressingMode::Register => Ok(self.regs.gpr(fields.rs())),
            other => Err(CpuError::InvalidModeForOpcode {
                pc,
                opcode,
                mode: other,
            }),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn execute(
        &mut self,
        opcode: Opcode,
        mode: AddressingMode,
        fields: &DecodedFields,
        extra_word: Option<u16>,
        pc_after_decode: u16,
        mut sink: Option<&mut dyn TraceSink>,
    ) -> Result<(), CpuError> {
        let pc_of_instr = pc_after_decode; // used for error reporting context

        let mut mem_write_word = |mem: &mut Memory, addr: u16, value: u16, sink: &mut Option<&mut dyn TraceSink>| {
            let mut buf = [0u8; 2];
            byteorder::LittleEndian::write_u16(&mut buf, value);
            for (i, byte) in buf.iter().enumerate() {
                let addr = addr.wrapping_add(i as u16);
                let old = mem.read_byte(addr);
                mem.write_byte(addr, *byte);
                if let Some(sink) = sink.as_deref_mut() {
                    sink.record_mem_write(MemWriteEvent {
                        address: addr,
                        old_value: old,
                        new_value: *byte,
                    });
                }
            }
        };

        match opcode {
            Opcode::Nop => {}
            Opcode::Halt => {
                self.halted = true;
            }
            Opcode::Mov => {
                let value = self.resolve_operand(mode, fields, extra_word, pc_after_decode);
                self.regs.set_gpr(fields.rd(), value);
            }
            Opcode::Load => {
                let ea = self
                    .effective_address(mode, fields, extra_word, pc_after_decode)
                    .ok_or(CpuError::InvalidModeForOpcode {
                        pc: pc_of_instr,
                        opcode,
                        mode,
                    })?;
                let value = self.mem.read_word(ea);
                self.regs.set_gpr(fields.rd(), value);
            }
            Opcode::Store => {
                let ea = self
                    .effective_address(mode, fields, extra_word, pc_after_decode)
                    .ok_or(CpuError::InvalidModeForOpcode {
                        pc: pc_of_instr,
                        opcode,
                        mode,
                    })?;
                let value = self.regs.gpr(fields.rd());
                mem_write_word(&mut self.mem, ea, value, &mut sink);
            }
            Opcode::Add
            | Opcode::Sub
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::Cmp
            | Opcode::Shl
            | Opcode::Shr => {
                let a = self.regs.gpr(fields.rd());
                let b = self.resolve_operand(mode, fields, extra_word, pc_after_decode);
                let op = match opcode {
                    Opcode::Add => AluOp::Add,
                    Opcode::Sub => AluOp::Sub,
                    Opcode::And => AluOp::And,
                    Opcode::Or => AluOp::Or,
                    Opcode::Xor => AluOp::Xor,
                    Opcode::Cmp => AluOp::Cmp,
                    Opcode::Shl => AluOp::Shl,
                    Opcode::Shr => AluOp::Shr,
                    _ => unreachable!(),
                };
                let (result, flags) = alu::execute(op, a, b);
                self.regs.set_flags(flags);
                if opcode != Opcode::Cmp {
                    self.regs.set_gpr(fields.rd(), result);
                }
            }
            Opcode::Jmp
            | Opcode::Jz
            | Opcode::Jnz
            | Opcode::Jc
            | Opcode::Jnc
            | Opcode::Jn
            | Opcode::Call => {
                if mode != AddressingMode::PcRelative {
                    return Err(CpuError::InvalidModeForOpcode {
                        pc: pc_of_instr,
                        opcode,
                        mode,
                    });
                }
                let target = self
                    .effective_address(mode, fields, extra_word, pc_after_decode)
                    .expect("pc-relative mode always yields an address");
                let should_jump = match opcode {
                    Opcode::Jmp | Opcode::Call => true,
                    Opcode::Jz => self.regs.flags().get(Flag::Zero),
                    Opcode::Jnz => !self.regs.flags().get(Flag::Zero),
                    Opcode::Jc => self.regs.flags().get(Flag::Carry),
                    Opcode::Jnc => !self.regs.flags().get(Flag::Carry),
                    Opcode::Jn => self.regs.flags().get(Flag::Negative),
                    _ => unreachable!(),
                };
                if opcode == Opcode::Call {
                    let return_addr = pc_after_decode;
                    let addr = self.regs.push_address();
                    mem_write_word(&mut self.mem, addr, return_addr, &mut sink);
                }
                if should_jump {
                    self.regs.set_pc(target);
                }
            }
            Opcode::Ret => {
                let addr = self.regs.pop_address();
                let target = self.mem.read_word(addr);
                self.regs.set_pc(target);
            }
            Opcode::Push => {
                let value = self.regs.gpr(fields.rd());
                let addr = self.regs.push_address();
                mem_write_word(&mut self.mem, addr, value, &mut sink);
            }
            Opcode::Pop => {
                let addr = self.regs.pop_address();
                let value = self.mem.read_word(addr);
                self.regs.set_gpr(fields.rd(), value);
            }
            Opcode::In => {
                let port = self.resolve_port(opcode, mode, fields, extra_word, pc_of_instr)?;
                let addr = IO_BASE.wrapping_add(port & 0xFF);
                let value = self.mem.read_byte(addr) as u16;
                self.regs.set_gpr(fields.rd(), value);
            }
            Opcode::Out => {
                let port = self.resolve_port(opcode, mode, fields, extra_word, pc_of_instr)?;
                let addr = IO_BASE.wrapping_add(port & 0xFF);
                let value = (self.regs.gpr(fields.rd()) & 0xFF) as u8;
                let old = self.mem.read_byte(addr);
                self.mem.write_byte(addr, value);
                if let Some(sink) = sink.as_deref_mut() {
                    sink.record_mem_write(MemWriteEvent {
                        address: addr,
                        old_value: old,
                        new_value: value,
                    });
                }
            }
        }
        Ok(())
    }
}
