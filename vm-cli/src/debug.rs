//! Interactive step debugger: `step`/`s`, `regs`, `mem <addr> [len]`,
//! `continue`/`c`, `quit`/`q`. Register/flag dump format is grounded on the
//! original emulator's `dump_registers`/`flags_to_string` hex-dump layout.

use std::io::{BufRead, Write};

use vm_core::registers::{Flag, RegisterId};
use vm_core::{Cpu, StepOutcome};

fn flags_to_string(cpu: &Cpu) -> String {
    let flags = cpu.regs().flags();
    let bit = |flag: Flag, ch: char| if flags.get(flag) { ch } else { '-' };
    format!(
        "{}{}{}{}",
        bit(Flag::Zero, 'Z'),
        bit(Flag::Negative, 'N'),
        bit(Flag::Carry, 'C'),
        bit(Flag::Overflow, 'V')
    )
}

fn dump_registers<W: Write>(cpu: &Cpu, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "=== CPU Registers ===")?;
    writeln!(out, "GPRs:")?;
    for i in 0u8..4 {
        writeln!(out, "  R{}: {:#06x}", i, cpu.regs().gpr(RegisterId::new(i)))?;
    }
    writeln!(out, "System:")?;
    writeln!(out, "  PC:    {:#06x}", cpu.regs().pc())?;
    writeln!(out, "  SP:    {:#06x}", cpu.regs().sp())?;
    writeln!(
        out,
        "  FLAGS: {:#04x} ({})",
        cpu.regs().flags().to_byte(),
        flags_to_string(cpu)
    )?;
    writeln!(out, "===================")?;
    Ok(())
}

fn dump_memory<W: Write>(cpu: &Cpu, addr: u16, len: u16, out: &mut W) -> std::io::Result<()> {
    for offset in (0..len).step_by(8) {
        write!(out, "  {:#06x}:", addr.wrapping_add(offset))?;
        for i in 0..8u16.min(len - offset) {
            let byte = cpu.mem().read_byte_const(addr.wrapping_add(offset + i));
            write!(out, " {:02x}", byte)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Runs the interactive debug loop, reading commands from `input` and
/// writing prompts/output to `out`. Returns once the user quits or the
/// input stream is exhausted.
pub fn run_debug_loop<R: BufRead, W: Write>(cpu: &mut Cpu, mut input: R, mut out: W) -> std::io::Result<()> {
    writeln!(out, "vm-cli debugger. Commands: step/s, regs, mem <addr> [len], continue/c, quit/q")?;
    let mut line = String::new();
    loop {
        write!(out, "(vm) ")?;
        out.flush()?;
        line.clear();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let command = line.trim();
        let mut parts = command.split_whitespace();
        match parts.next() {
            Some("step") | Some("s") => {
                let pc_before = cpu.regs().pc();
                match cpu.step() {
                    Ok(StepOutcome::Halted) => writeln!(out, "halted at pc={:#06x}", pc_before)?,
                    Ok(StepOutcome::Continuing) => writeln!(out, "stepped from pc={:#06x}", pc_before)?,
                    Err(err) => writeln!(out, "error: {}", err)?,
                }
            }
            Some("regs") => dump_registers(cpu, &mut out)?,
            Some("mem") => {
                let addr = parts.next().and_then(|s| parse_u16(s));
                let len = parts.next().and_then(|s| parse_u16(s)).unwrap_or(16);
                match addr {
                    Some(addr) => dump_memory(cpu, addr, len, &mut out)?,
                    None => writeln!(out, "usage: mem <addr> [len]")?,
                }
            }
            Some("continue") | Some("c") => loop {
                match cpu.step() {
                    Ok(StepOutcome::Halted) => {
                        writeln!(out, "halted at pc={:#06x}", cpu.regs().pc())?;
                        break;
                    }
                    Ok(StepOutcome::Continuing) => {}
                    Err(err) => {
                        writeln!(out, "error: {}", err)?;
                        break;
                    }
                }
            },
            Some("quit") | Some("q") => break,
            Some(other) => writeln!(out, "unknown command: {}", other)?,
            None => {}
        }
        if cpu.halted() {
            break;
        }
    }
    Ok(())
}

fn parse_u16(text: &str) -> Option<u16> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vm_core::instruction::{encode, AddressingMode as Mode, Opcode as Op};
    use vm_core::Memory;

    fn program() -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut push = |w: u16| {
            bytes.push((w & 0xFF) as u8);
            bytes.push((w >> 8) as u8);
        };
        push(encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
        push(7);
        push(encode(Op::Halt as u8, 0, 0, 0));
        bytes
    }

    #[test]
    fn step_then_regs_then_quit_reports_register_state() {
        let mut mem = Memory::new();
        mem.load_image(&program(), 0x8000).unwrap();
        let mut cpu = Cpu::new(mem);

        let input = "step\nregs\nquit\n";
        let mut output = Vec::new();
        run_debug_loop(&mut cpu, input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("stepped from pc=0x8000"));
        assert!(text.contains("R0: 0x0007"));
    }

    #[test]
    fn continue_runs_to_halt() {
        let mut mem = Memory::new();
        mem.load_image(&program(), 0x8000).unwrap();
        let mut cpu = Cpu::new(mem);

        let input = "continue\n";
        let mut output = Vec::new();
        run_debug_loop(&mut cpu, input.as_bytes(), &mut output).unwrap();
        assert!(cpu.halted());
    }
}
