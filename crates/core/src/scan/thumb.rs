//! Decoding for the two 16-bit Thumb encodings the engine relies on, plus the
//! bounded window searches built on them.
//!
//! `LDR Rd, [PC, #imm8*4]`: `01001 ddd iiiiiiii`
//! `STR Rt, [Rn, #imm5*4]`: `01100 iiiii nnn ttt`

use serde::Serialize;

const OPCODE_MASK: u16 = 0xF800;
const LDR_LITERAL: u16 = 0x4800;
const STR_IMMEDIATE: u16 = 0x6000;

/// Decoded form of one halfword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumb16 {
    /// PC-relative literal load.
    LiteralLoad { rd: u8, word_offset: u8 },
    /// Word store with immediate offset.
    StoreImmediate { rt: u8, rn: u8, imm5: u8 },
    Other,
}

pub fn decode(insn: u16) -> Thumb16 {
    match insn & OPCODE_MASK {
        LDR_LITERAL => Thumb16::LiteralLoad {
            rd: ((insn >> 8) & 0x7) as u8,
            word_offset: (insn & 0xFF) as u8,
        },
        STR_IMMEDIATE => Thumb16::StoreImmediate {
            rt: (insn & 0x7) as u8,
            rn: ((insn >> 3) & 0x7) as u8,
            imm5: ((insn >> 6) & 0x1F) as u8,
        },
        _ => Thumb16::Other,
    }
}

pub fn read_u16(blob: &[u8], offset: usize) -> Option<u16> {
    let bytes = blob.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub fn read_u32(blob: &[u8], offset: usize) -> Option<u32> {
    let bytes = blob.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Address a literal load at `insn_offset` reads from.
///
/// The PC base is the instruction address plus 4, rounded up to a word.
pub fn literal_address(insn_offset: usize, word_offset: u8) -> usize {
    let pc = (insn_offset + 4 + 3) & !3;
    pc + usize::from(word_offset) * 4
}

/// A literal load together with the value it loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiteralLoad {
    pub offset: usize,
    pub rd: u8,
    pub literal_offset: usize,
    pub value: u32,
}

/// A matched immediate-offset store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreImmediate {
    pub offset: usize,
    pub rt: u8,
    pub rn: u8,
    /// Immediate scaled to bytes.
    pub byte_offset: u32,
}

/// Decode the halfword at `offset` as a literal load and fetch its literal.
///
/// Returns `None` if it is not a literal load or the literal lies past the
/// end of `blob`.
pub fn resolve_literal_load(blob: &[u8], offset: usize) -> Option<LiteralLoad> {
    match decode(read_u16(blob, offset)?) {
        Thumb16::LiteralLoad { rd, word_offset } => {
            let literal_offset = literal_address(offset, word_offset);
            let value = read_u32(blob, literal_offset)?;
            Some(LiteralLoad { offset, rd, literal_offset, value })
        }
        _ => None,
    }
}

/// What a backward literal-load search must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFilter {
    /// The loaded literal equals this value.
    Value(u32),
    /// The destination register equals this register.
    Register(u8),
}

impl LoadFilter {
    fn accepts(&self, load: &LiteralLoad) -> bool {
        match *self {
            LoadFilter::Value(value) => load.value == value,
            LoadFilter::Register(reg) => load.rd == reg,
        }
    }
}

/// Halfword-aligned candidates strictly before `from`, nearest first, that
/// stay within `window` bytes of it.
fn backward_offsets(from: usize, window: usize) -> impl Iterator<Item = usize> {
    let start = from & !1;
    let lowest = from.saturating_sub(window.saturating_sub(1));
    (1..)
        .map(move |i| start.checked_sub(2 * i))
        .take_while(move |off| matches!(off, Some(o) if *o >= lowest))
        .flatten()
}

/// Scan backward from `from` for the first literal load accepted by `filter`.
pub fn find_literal_load(
    blob: &[u8],
    from: usize,
    window: usize,
    filter: LoadFilter,
) -> Option<LiteralLoad> {
    backward_offsets(from, window)
        .filter_map(|off| resolve_literal_load(blob, off))
        .find(|load| filter.accepts(load))
}

/// Scan forward from `from` for a store whose source register is `rt`.
pub fn find_store(blob: &[u8], from: usize, window: usize, rt: u8) -> Option<StoreImmediate> {
    let end = from.saturating_add(window);
    let mut off = from + 2;
    while off < end {
        let insn = read_u16(blob, off)?;
        if let Thumb16::StoreImmediate { rt: src, rn, imm5 } = decode(insn) {
            if src == rt {
                let byte_offset = u32::from(imm5) * 4;
                return Some(StoreImmediate { offset: off, rt, rn, byte_offset });
            }
        }
        off += 2;
    }
    None
}
