use memchr::memmem;
use tracing::debug;

use super::{slice_at, ContainerParser, ParseError};
use crate::model::{Container, ContainerKind, Image, Region};

/// Size of the fixed file header preceding the image entry table.
pub const FILE_HEADER_LEN: usize = 0x6C;
/// Image entry size for legacy containers.
pub const LEGACY_ENTRY_LEN: usize = 0xD8;
/// Image entry size for v5/v6 containers.
pub const ENTRY_LEN: usize = 0xDC;
/// Offset of the region table inside an image entry.
pub const REGION_TABLE_OFFSET: usize = 0x14;
/// Size of one region table entry.
pub const REGION_ENTRY_LEN: usize = 20;

const LEGACY_MAGIC: &[u8] = b"\xDA\xDA";
const V6_MARKER: &[u8] = b"MTK_DA_v6";

/// Parser for vendor download-agent files.
///
/// Layout of the file header:
///
/// | offset | field |
/// |--------|-------|
/// | 0x20   | id string (0x40 bytes, NUL padded) |
/// | 0x60   | version (u32) |
/// | 0x64   | magic (u32) |
/// | 0x68   | image count (u32) |
///
/// Each image entry carries `magic`, `hw_code`, `hw_sub_code`, `hw_version` as
/// u16 at 0x00..0x08, the region count (u16) at 0x12 and a region table at
/// 0x14. Region entries are `offset`, `length`, `addr`, `region_offset`,
/// `sig_len`, all u32 little-endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct DaFileParser;

impl DaFileParser {
    pub fn new() -> Self {
        Self
    }

    fn detect_kind(header: &[u8]) -> ContainerKind {
        if header.starts_with(LEGACY_MAGIC) {
            ContainerKind::Legacy
        } else if memmem::find(header, V6_MARKER).is_some() {
            ContainerKind::V6
        } else {
            ContainerKind::V5
        }
    }

    fn entry_len(kind: ContainerKind) -> usize {
        match kind {
            ContainerKind::Legacy => LEGACY_ENTRY_LEN,
            ContainerKind::V5 | ContainerKind::V6 => ENTRY_LEN,
        }
    }

    fn entry_start(kind: ContainerKind, index: usize) -> usize {
        FILE_HEADER_LEN + index * Self::entry_len(kind)
    }
}

fn le16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl ContainerParser for DaFileParser {
    fn name(&self) -> &'static str {
        "da-file"
    }

    fn parse(&self, raw: &[u8]) -> Result<Container, ParseError> {
        let header = slice_at(raw, 0, FILE_HEADER_LEN, "file header")?;
        let kind = Self::detect_kind(header);

        let id = String::from_utf8_lossy(&header[0x20..0x60]).trim_end_matches('\0').to_string();
        let version = le32(header, 0x60);
        let image_count = le32(header, 0x68) as usize;
        debug!(kind = kind.as_str(), %id, version, image_count, "parsing DA header");

        let entry_len = Self::entry_len(kind);
        let mut images = Vec::with_capacity(image_count.min(64));
        for index in 0..image_count {
            let entry = slice_at(
                raw,
                Self::entry_start(kind, index),
                entry_len,
                &format!("image entry {index}"),
            )?;

            let magic = le16(entry, 0x00);
            let hw_code = le16(entry, 0x02);
            let hw_sub_code = le16(entry, 0x04);
            let hw_version = le16(entry, 0x06);
            let region_count = le16(entry, 0x12) as usize;

            let mut regions = Vec::with_capacity(region_count);
            for r in 0..region_count {
                let at = REGION_TABLE_OFFSET + r * REGION_ENTRY_LEN;
                let what = format!("image {index} region entry {r}");
                let row = slice_at(entry, at, REGION_ENTRY_LEN, &what)?;
                let offset = le32(row, 0x00);
                let length = le32(row, 0x04);
                let addr = le32(row, 0x08);
                let sig_len = le32(row, 0x10);
                let data = slice_at(
                    raw,
                    offset as usize,
                    length as usize,
                    &format!("image {index} region {r} data"),
                )?;
                debug!(
                    image = index,
                    region = r,
                    offset = %format!("{offset:#010x}"),
                    length = %format!("{length:#010x}"),
                    addr = %format!("{addr:#010x}"),
                    sig_len,
                    "region"
                );
                regions.push(Region { offset, length, addr, sig_len, data: data.to_vec() });
            }

            // Region 0 is the preloader-facing stub; the boot stages follow it.
            let stages = if regions.len() >= 3 { (Some(1), Some(2)) } else { (None, None) };
            images.push(
                Image::new(regions)
                    .with_hw(magic, hw_code, hw_sub_code, hw_version)
                    .with_stages(stages.0, stages.1),
            );
        }

        Ok(Container { kind, id, version, images })
    }

    fn sync_header(
        &self,
        header: &mut [u8],
        image_index: usize,
        image: &Image,
    ) -> Result<(), ParseError> {
        let kind = Self::detect_kind(header);
        let table = Self::entry_start(kind, image_index) + REGION_TABLE_OFFSET;
        let table_end = table + image.regions.len() * REGION_ENTRY_LEN;
        if table_end > header.len() {
            return Err(ParseError::TableOutsideHeader {
                image: image_index,
                header_len: header.len(),
            });
        }

        for (r, region) in image.regions.iter().enumerate() {
            let at = table + r * REGION_ENTRY_LEN;
            let region_offset = region.length.saturating_sub(region.sig_len);
            header[at..at + 4].copy_from_slice(&region.offset.to_le_bytes());
            header[at + 4..at + 8].copy_from_slice(&region.length.to_le_bytes());
            header[at + 12..at + 16].copy_from_slice(&region_offset.to_le_bytes());
        }
        debug!(image = image_index, regions = image.regions.len(), "synced region table");
        Ok(())
    }
}
