//! Human-readable trace sink: one line per cycle, grounded on the same
//! per-cycle field set as the JSON sink but rendered for a terminal instead
//! of a structured document.

use std::io::Write;

use vm_core::{DecodedView, MemWriteEvent, RegisterSnapshot, TraceSink};

pub struct TextTraceSink<W: Write> {
    out: W,
    cycle: u64,
    pc_before_fetch: u16,
}

impl<W: Write> TextTraceSink<W> {
    pub fn new(out: W) -> TextTraceSink<W> {
        TextTraceSink {
            out,
            cycle: 0,
            pc_before_fetch: 0,
        }
    }
}

impl<W: Write> TraceSink for TextTraceSink<W> {
    fn start_cycle(&mut self, cycle: u64, pc_before_fetch: u16) {
        self.cycle = cycle;
        self.pc_before_fetch = pc_before_fetch;
    }

    fn record_registers(&mut self, snapshot: RegisterSnapshot) {
        if let Err(err) = writeln!(
            self.out,
            "cycle {:>6} pc={:#06x} r0={:#06x} r1={:#06x} r2={:#06x} r3={:#06x} sp={:#06x} flags={:#04x}",
            self.cycle,
            self.pc_before_fetch,
            snapshot.gpr[0],
            snapshot.gpr[1],
            snapshot.gpr[2],
            snapshot.gpr[3],
            snapshot.sp,
            snapshot.flags.to_byte(),
        ) {
            log::warn!("trace sink write failed: {}", err);
        }
    }

    fn record_decoded(&mut self, decoded: DecodedView) {
        let extra = match decoded.extra_word {
            Some(word) => format!(" extra={:#06x}", word),
            None => String::new(),
        };
        if let Err(err) = writeln!(
            self.out,
            "    opcode={:?} mode={:?} rd={} rs={}{}",
            decoded.opcode, decoded.mode, decoded.rd_raw, decoded.rs_raw, extra
        ) {
            log::warn!("trace sink write failed: {}", err);
        }
    }

    fn record_mem_write(&mut self, event: MemWriteEvent) {
        if let Err(err) = writeln!(
            self.out,
            "    mem[{:#06x}] {:#04x} -> {:#04x}",
            event.address, event.old_value, event.new_value
        ) {
            log::warn!("trace sink write failed: {}", err);
        }
    }

    fn end_cycle(&mut self) {}
}
