//! Integration tests for the two-pass assembler: symbol resolution across
//! whole programs, directive layout, and line-numbered error categorization.
//! Not a mechanical encode-then-decode grid — see `disassemble` below, used
//! only to check invariant 5 ("semantically equivalent" round trip) on a
//! handful of representative programs.

use vm_asm::{assemble, AsmError, ParseError, SemanticError};
use vm_core::instruction::{decode, AddressingMode, Opcode};

/// A minimal disassembler: decodes a byte image back into a sequence of
/// `(mnemonic, mode, rd, rs, extra_word)` tuples. Used only by these tests
/// to check that assembling a program and decoding it back out describes
/// the same instruction sequence, not as a public crate API.
fn disassemble(bytes: &[u8]) -> Vec<(Opcode, AddressingMode, u8, u8, Option<u16>)> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 1 < bytes.len() {
        let word = u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        i += 2;
        let fields = decode(word);
        let opcode = fields.opcode.expect("disassembling a well-formed image");
        let mode = fields.mode.expect("disassembling a well-formed image");
        let extra = if mode.has_extra_word() && i + 1 < bytes.len() {
            let w = u16::from_le_bytes([bytes[i], bytes[i + 1]]);
            i += 2;
            Some(w)
        } else {
            None
        };
        out.push((opcode, mode, fields.rd_raw, fields.rs_raw, extra));
    }
    out
}

#[test]
fn s1_smoke_program_is_six_bytes_and_halts_after_mov() {
    let out = assemble("MOV R0, #42\nHALT\n").unwrap();
    assert_eq!(out.bytes.len(), 6);
    let decoded = disassemble(&out.bytes);
    assert_eq!(decoded[0].0, Opcode::Mov);
    assert_eq!(decoded[0].1, AddressingMode::Immediate);
    assert_eq!(decoded[0].4, Some(42));
    assert_eq!(decoded[1].0, Opcode::Halt);
}

#[test]
fn s3_memory_round_trip_program_assembles_with_expected_addressing_modes() {
    let src = "\
        MOV R0, #0xBEEF\n\
        STORE R0, [#0x1000]\n\
        MOV R0, #0\n\
        LOAD R0, [#0x1000]\n\
        HALT\n";
    let out = assemble(src).unwrap();
    let decoded = disassemble(&out.bytes);
    assert_eq!(decoded[1].0, Opcode::Store);
    assert_eq!(decoded[1].1, AddressingMode::Direct);
    assert_eq!(decoded[1].4, Some(0x1000));
    assert_eq!(decoded[3].0, Opcode::Load);
    assert_eq!(decoded[3].4, Some(0x1000));
}

#[test]
fn disassembly_of_a_loop_program_reflects_the_same_instruction_sequence() {
    let src = "\
        MOV R0, #3\n\
        MOV R1, #1\n\
        LOOP: SUB R0, R1\n\
        JZ DONE\n\
        JMP LOOP\n\
        DONE: HALT\n";
    let out = assemble(src).unwrap();
    let decoded = disassemble(&out.bytes);
    let mnemonics: Vec<Opcode> = decoded.iter().map(|(op, ..)| *op).collect();
    assert_eq!(
        mnemonics,
        vec![
            Opcode::Mov,
            Opcode::Mov,
            Opcode::Sub,
            Opcode::Jz,
            Opcode::Jmp,
            Opcode::Halt,
        ]
    );
    // Both control-transfer instructions are always PC-relative.
    assert_eq!(decoded[3].1, AddressingMode::PcRelative);
    assert_eq!(decoded[4].1, AddressingMode::PcRelative);
}

#[test]
fn errors_carry_the_offending_line_number() {
    let src = "MOV R0, #1\nMOV R1, #2\nJMP NOWHERE\n";
    let err = assemble(src).unwrap_err();
    assert_eq!(err.line(), 3);
    assert!(matches!(err, AsmError::Semantic(SemanticError::UndefinedLabel { .. })));
}

#[test]
fn missing_operand_after_hash_is_a_parse_error() {
    let src = "MOV R0, #\n";
    let err = assemble(src).unwrap_err();
    assert!(matches!(err, AsmError::Parse(ParseError::MissingOperand { .. })));
}

#[test]
fn malformed_indirection_without_closing_bracket_is_a_parse_error() {
    let src = "LOAD R0, [R1\n";
    let err = assemble(src).unwrap_err();
    assert!(matches!(
        err,
        AsmError::Parse(ParseError::MalformedIndirection { .. })
    ));
}

#[test]
fn out_of_range_immediate_is_a_semantic_error() {
    let src = "MOV R0, #0x10000\n";
    let err = assemble(src).unwrap_err();
    assert!(matches!(
        err,
        AsmError::Semantic(SemanticError::ImmediateOutOfRange { .. })
    ));
}

#[test]
fn org_then_string_then_word_directives_lay_out_contiguously() {
    let src = "\
        .ORG 0x9000\n\
        GREETING: .STRING \"Hi\"\n\
        COUNT: .WORD 7\n\
        START: HALT\n";
    let out = assemble(src).unwrap();
    assert_eq!(out.symbols.get("GREETING"), Some(0x9000));
    // "Hi\0" is 3 bytes, padded to 4.
    assert_eq!(out.symbols.get("COUNT"), Some(0x9004));
    assert_eq!(out.symbols.get("START"), Some(0x9006));
}

#[test]
fn call_ret_routine_resolves_pc_relative_offset_to_the_routine_label() {
    let src = "\
        CALL ROUTINE\n\
        HALT\n\
        ROUTINE: MOV R2, #3\n\
        RET\n";
    let out = assemble(src).unwrap();
    let decoded = disassemble(&out.bytes);
    let routine_addr = out.symbols.get("ROUTINE").unwrap();
    let call_site = 0x8000u16;
    let expected_offset = (routine_addr as i32 - (call_site as i32 + 4)) as u16;
    assert_eq!(decoded[0].0, Opcode::Call);
    assert_eq!(decoded[0].4, Some(expected_offset));
}
