#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// (addr, fill byte, payload length, signature length) of one fixture region.
pub type RegionFixture = (u32, u8, usize, usize);

/// Single-image v5 DA file: stub region, signed da1 (0x40 + 0x10), signed da2 (0x60 + 0x18).
pub fn sample_da() -> Vec<u8> {
    da_with_regions(&[
        (0x0010_0000, 0x11, 0x20, 0),
        (0x0020_0000, 0x22, 0x40, 0x10),
        (0x4000_0000, 0x33, 0x60, 0x18),
    ])
}

/// Single-image v5 DA file with hw_code 0x0766 / hw_sub_code 0x8A00.
pub fn da_with_regions(regions: &[RegionFixture]) -> Vec<u8> {
    let mut out = vec![0u8; 0x6C + 0xDC];
    out[0x20..0x29].copy_from_slice(b"MTK_DA_v5");
    out[0x68..0x6C].copy_from_slice(&1u32.to_le_bytes());
    out[0x6C + 2..0x6C + 4].copy_from_slice(&0x0766u16.to_le_bytes());
    out[0x6C + 4..0x6C + 6].copy_from_slice(&0x8A00u16.to_le_bytes());
    out[0x6C + 0x12..0x6C + 0x14].copy_from_slice(&(regions.len() as u16).to_le_bytes());

    for (r, &(addr, fill, payload_len, sig_len)) in regions.iter().enumerate() {
        let offset = out.len() as u32;
        out.extend(std::iter::repeat(fill).take(payload_len));
        out.extend(std::iter::repeat(0x5A).take(sig_len));
        let length = (payload_len + sig_len) as u32;

        let row = 0x6C + 0x14 + r * 20;
        out[row..row + 4].copy_from_slice(&offset.to_le_bytes());
        out[row + 4..row + 8].copy_from_slice(&length.to_le_bytes());
        out[row + 8..row + 12].copy_from_slice(&addr.to_le_bytes());
        out[row + 12..row + 16].copy_from_slice(&(payload_len as u32).to_le_bytes());
        out[row + 16..row + 20].copy_from_slice(&(sig_len as u32).to_le_bytes());
    }
    out
}

/// Blob with one complete engine init routine whose base literal is 0x1000A040.
pub fn sample_sej_blob() -> Vec<u8> {
    let mut blob = vec![0u8; 0x400];
    let constants: [u32; 6] =
        [0x9ED4_0400, 0x00E8_84A1, 0xE3F0_83BD, 0x2F4E_6D8A, 0x4000_0002, 0x1000_A040];
    for (i, value) in constants.iter().enumerate() {
        blob[0x200 + i * 4..0x204 + i * 4].copy_from_slice(&value.to_le_bytes());
    }
    // LDR R3, [PC, #0x90]; LDR R1, [PC, #0x78]; STR R1, [R3, #0x10]; BX LR
    for (i, insn) in [0x4B24u16, 0x491E, 0x6119, 0x4770].iter().enumerate() {
        blob[0x180 + i * 2..0x182 + i * 2].copy_from_slice(&insn.to_le_bytes());
    }
    blob
}

pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}
