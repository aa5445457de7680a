//! Instruction word layout: `opcode[15:11] | mode[10:8] | rd[7:5] | rs[4:2] | unused[1:0]`.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::constants::{
    MODE_MASK, MODE_SHIFT, OPCODE_MASK, OPCODE_SHIFT, RD_SHIFT, REG_FIELD_MASK, RS_SHIFT,
};
use crate::registers::RegisterId;

/// The closed set of opcodes, decimal values per the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Opcode {
    Nop = 0,
    Halt = 1,
    Mov = 2,
    Load = 3,
    Store = 4,
    Add = 5,
    Sub = 6,
    And = 7,
    Or = 8,
    Xor = 9,
    Cmp = 10,
    Shl = 11,
    Shr = 12,
    Jmp = 13,
    Jz = 14,
    Jnz = 15,
    Jc = 16,
    Jnc = 17,
    Jn = 18,
    Call = 19,
    Ret = 20,
    Push = 21,
    Pop = 22,
    In = 23,
    Out = 24,
}

impl Opcode {
    /// True for the control-transfer opcodes that are always 4 bytes and
    /// always encoded as PC-relative (13..19 inclusive: JMP..CALL).
    pub fn is_control_transfer(self) -> bool {
        matches!(
            self,
            Opcode::Jmp
                | Opcode::Jz
                | Opcode::Jnz
                | Opcode::Jc
                | Opcode::Jnc
                | Opcode::Jn
                | Opcode::Call
        )
    }

    /// True for opcodes with no operands at all (2 bytes, no extra word).
    pub fn is_zero_operand(self) -> bool {
        matches!(self, Opcode::Nop | Opcode::Halt | Opcode::Ret)
    }
}

/// The 3-bit addressing-mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum AddressingMode {
    Register = 0,
    Immediate = 1,
    Direct = 2,
    RegisterIndirect = 3,
    RegisterOffset = 4,
    PcRelative = 5,
}

impl AddressingMode {
    /// Whether this mode consumes a 16-bit extra word following the
    /// instruction word.
    pub fn has_extra_word(self) -> bool {
        matches!(
            self,
            AddressingMode::Immediate
                | AddressingMode::Direct
                | AddressingMode::RegisterOffset
                | AddressingMode::PcRelative
        )
    }
}

/// The fields unpacked from a raw 16-bit instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFields {
    pub opcode_raw: u8,
    pub opcode: Option<Opcode>,
    pub mode_raw: u8,
    pub mode: Option<AddressingMode>,
    pub rd_raw: u8,
    pub rs_raw: u8,
}

impl DecodedFields {
    pub fn rd(&self) -> RegisterId {
        RegisterId::new(self.rd_raw)
    }

    pub fn rs(&self) -> RegisterId {
        RegisterId::new(self.rs_raw)
    }
}

/// Splits a raw instruction word into its bit fields. Unrecognized opcode or
/// mode values are preserved as `opcode_raw`/`mode_raw` and surfaced as
/// `None` in the typed fields; the caller (the CPU) turns that into a
/// `DecodeError`.
pub fn decode(word: u16) -> DecodedFields {
    let opcode_raw = ((word >> OPCODE_SHIFT) & OPCODE_MASK) as u8;
    let mode_raw = ((word >> MODE_SHIFT) & MODE_MASK) as u8;
    let rd_raw = ((word >> RD_SHIFT) & REG_FIELD_MASK) as u8;
    let rs_raw = ((word >> RS_SHIFT) & REG_FIELD_MASK) as u8;
    DecodedFields {
        opcode_raw,
        opcode: Opcode::from_u8(opcode_raw),
        mode_raw,
        mode: AddressingMode::from_u8(mode_raw),
        rd_raw,
        rs_raw,
    }
}

/// Packs an instruction word from its fields. Register fields outside
/// `0..GPR_COUNT` are still encodable (the format reserves 3 bits per
/// register field though only R0..R3 are valid); encoding never fails, only
/// decoding on the execute side rejects out-of-range registers.
pub fn encode(opcode: u8, mode: u8, rd: u8, rs: u8) -> u16 {
    ((opcode as u16) << OPCODE_SHIFT)
        | ((mode as u16) << MODE_SHIFT)
        | ((rd as u16) << RD_SHIFT)
        | ((rs as u16) << RS_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_round_trips_with_encode() {
        let word = encode(Opcode::Add as u8, AddressingMode::Register as u8, 1, 2);
        let fields = decode(word);
        assert_eq!(fields.opcode, Some(Opcode::Add));
        assert_eq!(fields.mode, Some(AddressingMode::Register));
        assert_eq!(fields.rd_raw, 1);
        assert_eq!(fields.rs_raw, 2);
    }

    #[test]
    fn unknown_opcode_decodes_to_none() {
        let word = encode(31, 0, 0, 0);
        assert_eq!(decode(word).opcode, None);
    }

    #[test]
    fn control_transfer_classification() {
        assert!(Opcode::Call.is_control_transfer());
        assert!(!Opcode::Mov.is_control_transfer());
    }
}
