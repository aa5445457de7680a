//! End-to-end scenarios S1–S6 from the testable-properties table: assemble
//! a tiny program by hand (byte-exact, no `vm-asm` dependency — this crate
//! stays below the assembler in the stack) and run it to completion.

use vm_core::instruction::{encode, AddressingMode as Mode, Opcode as Op};
use vm_core::registers::{Flag, RegisterId};
use vm_core::{Cpu, Memory, RunOutcome};

fn word(bytes: &mut Vec<u8>, w: u16) {
    bytes.push((w & 0xFF) as u8);
    bytes.push((w >> 8) as u8);
}

fn cpu_from(bytes: &[u8]) -> Cpu {
    let mut mem = Memory::new();
    mem.load_image(bytes, 0x8000).unwrap();
    Cpu::new(mem)
}

/// S1: `MOV R0, #42; HALT` is 6 bytes; after running, R0=42 and halted.
#[test]
fn s1_smoke() {
    let mut bytes = Vec::new();
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 42);
    word(&mut bytes, encode(Op::Halt as u8, 0, 0, 0));
    assert_eq!(bytes.len(), 6);

    let mut cpu = cpu_from(&bytes);
    let outcome = cpu.run_default().unwrap();
    assert_eq!(outcome, RunOutcome::Halted);
    assert_eq!(cpu.regs().gpr(RegisterId::new(0)), 42);
    assert!(cpu.halted());
}

/// S2: load R0=3, R1=1, decrement R0 by R1 in a loop, JZ to HALT. Expect
/// termination with R0=0, Z=1, after exactly 3 SUB executions.
#[test]
fn s2_countdown() {
    // 0x8000 MOV R0, #3
    // 0x8004 MOV R1, #1
    // 0x8008 LOOP: SUB R0, R1
    // 0x800C JZ DONE (0x8014)
    // 0x8010 JMP LOOP (0x8008)
    // 0x8014 DONE: HALT
    let jz_offset = (0x8014i32 - (0x800Ci32 + 4)) as i16 as u16;
    let jmp_offset = (0x8008i32 - (0x8010i32 + 4)) as i16 as u16;

    let mut bytes = Vec::new();
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 3);
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 1, 0));
    word(&mut bytes, 1);
    word(&mut bytes, encode(Op::Sub as u8, Mode::Register as u8, 0, 1));
    word(&mut bytes, encode(Op::Jz as u8, Mode::PcRelative as u8, 0, 0));
    word(&mut bytes, jz_offset);
    word(&mut bytes, encode(Op::Jmp as u8, Mode::PcRelative as u8, 0, 0));
    word(&mut bytes, jmp_offset);
    word(&mut bytes, encode(Op::Halt as u8, 0, 0, 0));

    let mut cpu = cpu_from(&bytes);
    let mut sub_count = 0u32;
    loop {
        let pc = cpu.regs().pc();
        match cpu.step().unwrap() {
            vm_core::StepOutcome::Halted => break,
            vm_core::StepOutcome::Continuing => {
                if pc == 0x8008 {
                    sub_count += 1;
                }
            }
        }
    }
    assert_eq!(cpu.regs().gpr(RegisterId::new(0)), 0);
    assert!(cpu.regs().flags().get(Flag::Zero));
    assert_eq!(sub_count, 3);
}

/// S3: store then load a word through Direct addressing round-trips.
#[test]
fn s3_memory_round_trip() {
    let mut bytes = Vec::new();
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 0xBEEF);
    word(&mut bytes, encode(Op::Store as u8, Mode::Direct as u8, 0, 0));
    word(&mut bytes, 0x1000);
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 0);
    word(&mut bytes, encode(Op::Load as u8, Mode::Direct as u8, 0, 0));
    word(&mut bytes, 0x1000);
    word(&mut bytes, encode(Op::Halt as u8, 0, 0, 0));

    let mut cpu = cpu_from(&bytes);
    cpu.run_default().unwrap();
    assert_eq!(cpu.regs().gpr(RegisterId::new(0)), 0xBEEF);
    assert_eq!(cpu.mem().read_byte_const(0x1000), 0xEF);
    assert_eq!(cpu.mem().read_byte_const(0x1001), 0xBE);
}

/// S4: a CALL'd routine writes 3 to R2 and returns; SP is restored.
#[test]
fn s4_call_and_ret() {
    // 0x8000 MOV R0, #1
    // 0x8004 MOV R1, #2
    // 0x8008 CALL ROUTINE (extra word at 0x800A)
    // 0x800C HALT
    // 0x800E ROUTINE: MOV R2, #3 (extra word at 0x8010)
    // 0x8012 RET
    let call_site = 0x8008i32;
    let routine_addr = 0x800Ei32;
    let call_offset = (routine_addr - (call_site + 4)) as i16 as u16;

    let mut bytes = Vec::new();
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 1);
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 1, 0));
    word(&mut bytes, 2);
    word(&mut bytes, encode(Op::Call as u8, Mode::PcRelative as u8, 0, 0));
    word(&mut bytes, call_offset);
    word(&mut bytes, encode(Op::Halt as u8, 0, 0, 0));
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 2, 0));
    word(&mut bytes, 3);
    word(&mut bytes, encode(Op::Ret as u8, 0, 0, 0));

    let mut cpu = cpu_from(&bytes);
    let outcome = cpu.run_default().unwrap();
    assert_eq!(outcome, RunOutcome::Halted);
    assert_eq!(cpu.regs().gpr(RegisterId::new(0)), 1);
    assert_eq!(cpu.regs().gpr(RegisterId::new(1)), 2);
    assert_eq!(cpu.regs().gpr(RegisterId::new(2)), 3);
    assert_eq!(cpu.regs().sp(), 0x7FFF);
}

/// S5: bytes written via OUT arrive at the output sink in order.
#[test]
fn s5_output() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut bytes = Vec::new();
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, b'H' as u16);
    word(&mut bytes, encode(Op::Out as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 0);
    word(&mut bytes, encode(Op::Mov as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, b'i' as u16);
    word(&mut bytes, encode(Op::Out as u8, Mode::Immediate as u8, 0, 0));
    word(&mut bytes, 0);
    word(&mut bytes, encode(Op::Halt as u8, 0, 0, 0));

    let received = Rc::new(RefCell::new(Vec::new()));
    let received_clone = received.clone();
    let mut mem = Memory::new();
    mem.set_output_sink(move |b| received_clone.borrow_mut().push(b));
    mem.load_image(&bytes, 0x8000).unwrap();
    let mut cpu = Cpu::new(mem);
    cpu.run_default().unwrap();
    assert_eq!(*received.borrow(), vec![b'H', b'i']);
}

/// S6: the timer counts while running and clears when stopped.
#[test]
fn s6_timer() {
    let mut mem = Memory::new();
    mem.write_byte(vm_core::constants::IO_TIMER_CTRL, 1);
    mem.tick();
    mem.tick();
    mem.tick();
    assert_eq!(mem.timer(), 3);
    mem.write_byte(vm_core::constants::IO_TIMER_CTRL, 0);
    mem.tick();
    assert_eq!(mem.timer(), 0);
}
