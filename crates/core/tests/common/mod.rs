#![allow(dead_code)]

//! Synthetic fixtures: DA containers and Thumb code blobs.

pub const HEADER_LEN: usize = 0x6C;
pub const ENTRY_LEN: usize = 0xDC;

pub struct RegionSpec {
    pub addr: u32,
    pub payload: Vec<u8>,
    pub sig_len: usize,
}

impl RegionSpec {
    pub fn new(addr: u32, payload: &[u8], sig_len: usize) -> Self {
        Self { addr, payload: payload.to_vec(), sig_len }
    }

    /// Payload followed by a recognizable signature pattern.
    pub fn data(&self) -> Vec<u8> {
        let mut data = self.payload.clone();
        data.extend((0..self.sig_len).map(|i| 0xA0 ^ (i as u8)));
        data
    }
}

pub struct ImageSpec {
    pub hw_code: u16,
    pub hw_sub_code: u16,
    pub regions: Vec<RegionSpec>,
}

/// The usual shape: a small stub region, then signed stage 1 and stage 2.
pub fn three_region_image(hw_code: u16) -> ImageSpec {
    ImageSpec {
        hw_code,
        hw_sub_code: 0x8A00,
        regions: vec![
            RegionSpec::new(0x0010_0000, &[0x11; 0x20], 0),
            RegionSpec::new(0x0020_0000, &[0x22; 0x40], 0x10),
            RegionSpec::new(0x4000_0000, &[0x33; 0x60], 0x18),
        ],
    }
}

/// Build a v5-style DA file. `gap` filler bytes are placed before every region
/// so the donor layout is not contiguous.
pub fn build_da(id: &str, images: &[ImageSpec], gap: usize) -> Vec<u8> {
    let table_end = HEADER_LEN + images.len() * ENTRY_LEN;
    let mut out = vec![0u8; table_end];

    let id_bytes = id.as_bytes();
    out[0x20..0x20 + id_bytes.len()].copy_from_slice(id_bytes);
    out[0x60..0x64].copy_from_slice(&4u32.to_le_bytes());
    out[0x64..0x68].copy_from_slice(&0x2266_8899u32.to_le_bytes());
    out[0x68..0x6C].copy_from_slice(&(images.len() as u32).to_le_bytes());

    for (i, image) in images.iter().enumerate() {
        let entry = HEADER_LEN + i * ENTRY_LEN;
        out[entry..entry + 2].copy_from_slice(&0xDADAu16.to_le_bytes());
        out[entry + 2..entry + 4].copy_from_slice(&image.hw_code.to_le_bytes());
        out[entry + 4..entry + 6].copy_from_slice(&image.hw_sub_code.to_le_bytes());
        out[entry + 6..entry + 8].copy_from_slice(&0xCA00u16.to_le_bytes());
        out[entry + 0x12..entry + 0x14]
            .copy_from_slice(&(image.regions.len() as u16).to_le_bytes());

        for (r, region) in image.regions.iter().enumerate() {
            out.extend(std::iter::repeat(0xEE).take(gap));
            let offset = out.len() as u32;
            let data = region.data();
            let length = data.len() as u32;
            out.extend_from_slice(&data);

            let row = entry + 0x14 + r * 20;
            out[row..row + 4].copy_from_slice(&offset.to_le_bytes());
            out[row + 4..row + 8].copy_from_slice(&length.to_le_bytes());
            out[row + 8..row + 12].copy_from_slice(&region.addr.to_le_bytes());
            out[row + 12..row + 16]
                .copy_from_slice(&(length - region.sig_len as u32).to_le_bytes());
            out[row + 16..row + 20].copy_from_slice(&(region.sig_len as u32).to_le_bytes());
        }
    }
    out
}

pub fn put_u16(blob: &mut [u8], at: usize, value: u16) {
    blob[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(blob: &mut [u8], at: usize, value: u32) {
    blob[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Encode `LDR Rd, [PC, #imm]` at `insn_off` so that it reads `literal_off`.
pub fn ldr_literal(insn_off: usize, rd: u8, literal_off: usize) -> u16 {
    let pc = (insn_off + 4 + 3) & !3;
    let delta = literal_off - pc;
    assert_eq!(delta % 4, 0, "literal must be word aligned relative to PC");
    let words = delta / 4;
    assert!(words <= 0xFF, "literal out of range");
    0x4800 | (u16::from(rd) << 8) | words as u16
}

/// Encode `STR Rt, [Rn, #byte_off]`.
pub fn str_imm(rt: u8, rn: u8, byte_off: u16) -> u16 {
    0x6000 | ((byte_off / 4) << 6) | (u16::from(rn) << 3) | u16::from(rt)
}

pub const SEJ: [u32; 5] = [0x9ED4_0400, 0x00E8_84A1, 0xE3F0_83BD, 0x2F4E_6D8A, 0x4000_0002];

/// Which links of the LDR -> STR -> LDR chain to emit.
#[derive(Clone, Copy)]
pub struct Chain {
    pub base_ldr: bool,
    pub anchor_ldr: bool,
    pub store: bool,
}

impl Chain {
    pub const FULL: Chain = Chain { base_ldr: true, anchor_ldr: true, store: true };
}

/// Emit an engine init routine at `code`, with its constant pool at `code + 0x80`:
///
/// ```text
/// code+0: LDR R3, =base_literal
/// code+2: LDR R1, =SEJ[0]
/// code+4: STR R1, [R3, #0x10]
/// code+6: BX LR
/// pool:   SEJ[0..5], base_literal
/// ```
pub fn place_routine(blob: &mut [u8], code: usize, base_literal: u32, chain: Chain) {
    let pool = code + 0x80;
    for (i, value) in SEJ.iter().enumerate() {
        put_u32(blob, pool + i * 4, *value);
    }
    put_u32(blob, pool + 0x14, base_literal);

    if chain.base_ldr {
        put_u16(blob, code, ldr_literal(code, 3, pool + 0x14));
    }
    if chain.anchor_ldr {
        put_u16(blob, code + 2, ldr_literal(code + 2, 1, pool));
    }
    if chain.store {
        put_u16(blob, code + 4, str_imm(1, 3, 0x10));
    }
    put_u16(blob, code + 6, 0x4770);
}
