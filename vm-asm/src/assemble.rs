//! Two-pass assembly: source text to a little-endian byte image.
//!
//! Pass 1 walks the parsed lines with a location counter to build the
//! symbol table; pass 2 revisits them to emit bytes, now that every label
//! resolves regardless of whether it was defined before or after its use.

use vm_core::instruction::{encode, AddressingMode, Opcode};

use crate::error::{AsmError, SemanticError};
use crate::lexer::tokenize_line;
use crate::literal::{decode_string_literal, parse_number16};
use crate::parser::{parse_line, Line, Operand, OperandKind};
use crate::source_map::{SourceMap, SourceMapItem};
use crate::symbols::SymbolTable;

const DEFAULT_ORG: u16 = 0x8000;

/// The result of a successful assembly: the byte image, the resolved symbol
/// table (useful to a debugger or disassembler), and a source map of which
/// source lines produced which emitted bytes.
pub struct AssembleOutput {
    pub bytes: Vec<u8>,
    pub symbols: SymbolTable,
    pub source_map: SourceMap,
}

fn opcode_for_mnemonic(name: &str) -> Option<Opcode> {
    Some(match name {
        "NOP" => Opcode::Nop,
        "HALT" => Opcode::Halt,
        "MOV" => Opcode::Mov,
        "LOAD" => Opcode::Load,
        "STORE" => Opcode::Store,
        "ADD" => Opcode::Add,
        "SUB" => Opcode::Sub,
        "AND" => Opcode::And,
        "OR" => Opcode::Or,
        "XOR" => Opcode::Xor,
        "CMP" => Opcode::Cmp,
        "SHL" => Opcode::Shl,
        "SHR" => Opcode::Shr,
        "JMP" => Opcode::Jmp,
        "JZ" => Opcode::Jz,
        "JNZ" => Opcode::Jnz,
        "JC" => Opcode::Jc,
        "JNC" => Opcode::Jnc,
        "JN" => Opcode::Jn,
        "CALL" => Opcode::Call,
        "RET" => Opcode::Ret,
        "PUSH" => Opcode::Push,
        "POP" => Opcode::Pop,
        "IN" => Opcode::In,
        "OUT" => Opcode::Out,
        _ => return None,
    })
}

fn register_index(text: &str, line: u32) -> Result<u8, SemanticError> {
    match text {
        "R0" => Ok(0),
        "R1" => Ok(1),
        "R2" => Ok(2),
        "R3" => Ok(3),
        other => Err(SemanticError::OperandKindMismatch {
            line,
            mnemonic: other.to_string(),
        }),
    }
}

/// Whether a two-operand instruction's second operand forces the 4-byte
/// (extra-word) encoding, per spec.md §4.4 pass 1 rule 3.
fn second_operand_needs_extra_word(kind: &OperandKind) -> bool {
    matches!(
        kind,
        OperandKind::Immediate | OperandKind::Label | OperandKind::Direct
    )
}

fn instruction_size(mnemonic: &str, opcode: Opcode, line: &Line) -> Result<u16, SemanticError> {
    if opcode.is_zero_operand() {
        return Ok(2);
    }
    if matches!(opcode, Opcode::Push | Opcode::Pop) {
        return Ok(2);
    }
    if opcode.is_control_transfer() {
        return Ok(4);
    }
    // Two-operand instructions: MOV, LOAD, STORE, ADD..SHR, CMP, IN, OUT.
    match line.operands.get(1) {
        Some(operand) if second_operand_needs_extra_word(&operand.kind) => Ok(4),
        Some(_) => Ok(2),
        None => Err(SemanticError::OperandCountMismatch {
            line: line.line_number,
            mnemonic: mnemonic.to_string(),
            expected: 2,
            found: line.operands.len(),
        }),
    }
}

/// Parses every line of `source` into a [`Line`], failing on the first lex
/// or parse error encountered (carrying its 1-based line number).
fn parse_source(source: &str) -> Result<Vec<Line>, AsmError> {
    let mut lines = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line_number = (idx + 1) as u32;
        let tokens = tokenize_line(raw_line, line_number)?;
        let line = parse_line(&tokens, line_number)?;
        lines.push(line);
    }
    Ok(lines)
}

fn resolve_value_operand(
    operand: &Operand,
    symbols: &SymbolTable,
    line: u32,
) -> Result<u16, SemanticError> {
    match operand.kind {
        OperandKind::Number | OperandKind::Immediate => parse_number16(&operand.text, line),
        OperandKind::Label | OperandKind::Direct => symbols.resolve(&operand.text, line),
        _ => Err(SemanticError::OperandKindMismatch {
            line,
            mnemonic: operand.text.clone(),
        }),
    }
}

/// Runs pass 1 (layout): assigns each line its emission address and builds
/// the symbol table. Returns the per-line addresses (parallel to `lines`)
/// alongside the finished table.
fn pass1(lines: &[Line]) -> Result<(Vec<u16>, SymbolTable), AsmError> {
    let mut symbols = SymbolTable::new();
    let mut addresses = Vec::with_capacity(lines.len());
    let mut counter: u16 = DEFAULT_ORG;

    for line in lines {
        addresses.push(counter);

        if let Some(label) = &line.label {
            symbols.define(label, counter, line.line_number)?;
        }

        let op = match &line.op {
            Some(op) => op,
            None => continue,
        };

        if line.is_directive {
            match op.as_str() {
                ".ORG" => {
                    let operand = line.operands.first().ok_or(SemanticError::OperandCountMismatch {
                        line: line.line_number,
                        mnemonic: op.clone(),
                        expected: 1,
                        found: 0,
                    })?;
                    counter = match operand.kind {
                        OperandKind::Number => parse_number16(&operand.text, line.line_number)?,
                        OperandKind::Label => symbols.resolve(&operand.text, line.line_number)?,
                        _ => {
                            return Err(SemanticError::OperandKindMismatch {
                                line: line.line_number,
                                mnemonic: op.clone(),
                            }
                            .into())
                        }
                    };
                }
                ".WORD" => {
                    if line.operands.len() != 1 {
                        return Err(SemanticError::OperandCountMismatch {
                            line: line.line_number,
                            mnemonic: op.clone(),
                            expected: 1,
                            found: line.operands.len(),
                        }
                        .into());
                    }
                    counter = counter.wrapping_add(2);
                }
                ".STRING" => {
                    let operand = line.operands.first().ok_or(SemanticError::OperandCountMismatch {
                        line: line.line_number,
                        mnemonic: op.clone(),
                        expected: 1,
                        found: 0,
                    })?;
                    let bytes = decode_string_literal(&operand.text, line.line_number)?;
                    let word_count = ((bytes.len() + 1) / 2) as u16;
                    counter = counter.wrapping_add(word_count * 2);
                }
                other => {
                    return Err(SemanticError::UnknownDirective {
                        line: line.line_number,
                        text: other.to_string(),
                    }
                    .into())
                }
            }
        } else {
            let opcode = opcode_for_mnemonic(op).ok_or(SemanticError::UnknownMnemonic {
                line: line.line_number,
                text: op.clone(),
            })?;
            let size = instruction_size(op, opcode, line)?;
            counter = counter.wrapping_add(size);
        }
    }

    Ok((addresses, symbols))
}

fn emit_instruction_word(bytes: &mut Vec<u8>, opcode: Opcode, mode: AddressingMode, rd: u8, rs: u8) {
    let word = encode(opcode as u8, mode as u8, rd, rs);
    bytes.push((word & 0xFF) as u8);
    bytes.push((word >> 8) as u8);
}

fn emit_word(bytes: &mut Vec<u8>, value: u16) {
    bytes.push((value & 0xFF) as u8);
    bytes.push((value >> 8) as u8);
}

fn pass2(lines: &[Line], addresses: &[u16], symbols: &SymbolTable) -> Result<(Vec<u8>, SourceMap), AsmError> {
    let mut bytes = Vec::new();
    let mut source_map = SourceMap::new();

    for (line, &cur_addr) in lines.iter().zip(addresses.iter()) {
        let op = match &line.op {
            Some(op) => op,
            None => continue,
        };
        let start_len = bytes.len();

        if line.is_directive {
            match op.as_str() {
                ".ORG" => {}
                ".WORD" => {
                    let operand = &line.operands[0];
                    let value = match operand.kind {
                        OperandKind::Number => parse_number16(&operand.text, line.line_number)?,
                        OperandKind::Label => symbols.resolve(&operand.text, line.line_number)?,
                        _ => {
                            return Err(SemanticError::OperandKindMismatch {
                                line: line.line_number,
                                mnemonic: op.clone(),
                            }
                            .into())
                        }
                    };
                    emit_word(&mut bytes, value);
                }
                ".STRING" => {
                    let operand = &line.operands[0];
                    let str_bytes = decode_string_literal(&operand.text, line.line_number)?;
                    bytes.extend_from_slice(&str_bytes);
                    if str_bytes.len() % 2 != 0 {
                        bytes.push(0);
                    }
                }
                _ => unreachable!("unknown directives are rejected in pass 1"),
            }
        } else {
            let opcode = opcode_for_mnemonic(op).expect("unknown mnemonics are rejected in pass 1");
            emit_instruction(&mut bytes, opcode, op, line, cur_addr, symbols)?;
        }

        if bytes.len() > start_len {
            source_map.push(SourceMapItem {
                start_line: line.line_number,
                line_count: 1,
            });
        }
    }

    Ok((bytes, source_map))
}

fn emit_instruction(
    bytes: &mut Vec<u8>,
    opcode: Opcode,
    mnemonic: &str,
    line: &Line,
    cur_addr: u16,
    symbols: &SymbolTable,
) -> Result<(), AsmError> {
    if opcode.is_zero_operand() {
        check_operand_count(mnemonic, line, 0)?;
        emit_instruction_word(bytes, opcode, AddressingMode::Register, 0, 0);
        return Ok(());
    }

    if matches!(opcode, Opcode::Push | Opcode::Pop) {
        check_operand_count(mnemonic, line, 1)?;
        let rd = expect_register(&line.operands[0], line.line_number)?;
        emit_instruction_word(bytes, opcode, AddressingMode::Register, rd, 0);
        return Ok(());
    }

    if opcode.is_control_transfer() {
        check_operand_count(mnemonic, line, 1)?;
        let target = resolve_value_operand(&line.operands[0], symbols, line.line_number)?;
        let next_instr_addr = cur_addr as i32 + 4;
        let offset = (target as i32 - next_instr_addr) as u16;
        emit_instruction_word(bytes, opcode, AddressingMode::PcRelative, 0, 0);
        emit_word(bytes, offset);
        return Ok(());
    }

    // Two-operand instructions: MOV, LOAD, STORE, arithmetic/logic, IN, OUT.
    check_operand_count(mnemonic, line, 2)?;
    let rd = expect_register(&line.operands[0], line.line_number)?;
    let src = &line.operands[1];
    match src.kind {
        OperandKind::Register => {
            let rs = expect_register(src, line.line_number)?;
            emit_instruction_word(bytes, opcode, AddressingMode::Register, rd, rs);
        }
        OperandKind::Immediate => {
            let value = parse_number16(&src.text, line.line_number)?;
            emit_instruction_word(bytes, opcode, AddressingMode::Immediate, rd, 0);
            emit_word(bytes, value);
        }
        OperandKind::Label => {
            // A bare label used as a two-operand source is the label's
            // address itself (akin to `lea`), encoded as Immediate, not
            // dereferenced through Direct.
            let value = symbols.resolve(&src.text, line.line_number)?;
            emit_instruction_word(bytes, opcode, AddressingMode::Immediate, rd, 0);
            emit_word(bytes, value);
        }
        OperandKind::IndirectReg => {
            let rs = expect_register(src, line.line_number)?;
            emit_instruction_word(bytes, opcode, AddressingMode::RegisterIndirect, rd, rs);
        }
        OperandKind::Direct => {
            let value = match src.text.chars().next() {
                Some(c) if c.is_ascii_digit() || c == '\'' => parse_number16(&src.text, line.line_number)?,
                _ => symbols.resolve(&src.text, line.line_number)?,
            };
            emit_instruction_word(bytes, opcode, AddressingMode::Direct, rd, 0);
            emit_word(bytes, value);
        }
        OperandKind::StringLiteral | OperandKind::Number => {
            return Err(SemanticError::OperandKindMismatch {
                line: line.line_number,
                mnemonic: mnemonic.to_string(),
            }
            .into())
        }
    }
    Ok(())
}

fn expect_register(operand: &Operand, line: u32) -> Result<u8, SemanticError> {
    if operand.kind != OperandKind::Register {
        return Err(SemanticError::OperandKindMismatch {
            line,
            mnemonic: operand.text.clone(),
        });
    }
    register_index(&operand.text, line)
}

fn check_operand_count(mnemonic: &str, line: &Line, expected: usize) -> Result<(), SemanticError> {
    if line.operands.len() != expected {
        return Err(SemanticError::OperandCountMismatch {
            line: line.line_number,
            mnemonic: mnemonic.to_string(),
            expected,
            found: line.operands.len(),
        });
    }
    Ok(())
}

/// Assembles `source` into a byte image. The first error aborts assembly;
/// no partial binary is returned.
pub fn assemble(source: &str) -> Result<AssembleOutput, AsmError> {
    let lines = parse_source(source)?;
    log::trace!("parsed {} source line(s)", lines.len());
    let (addresses, symbols) = pass1(&lines)?;
    let (bytes, source_map) = pass2(&lines, &addresses, &symbols)?;
    log::debug!("assembled {} byte(s) from {} line(s)", bytes.len(), lines.len());
    Ok(AssembleOutput {
        bytes,
        symbols,
        source_map,
    })
}
