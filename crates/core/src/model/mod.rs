//! Object model for download-agent containers.
//!
//! A `Container` is produced by a `ContainerParser` from raw file bytes. The
//! editor reads and mutates these types in place:
//! - `Container`: the whole file, holding one `Image` per supported SoC.
//! - `Image`: one download agent, an ordered list of `Region`s plus the stage
//!   slots the parser resolved.
//! - `Region`: one contiguous byte range (payload followed by `sig_len` bytes
//!   of signature).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Flavour of the container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Legacy,
    V5,
    V6,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Legacy => "legacy",
            ContainerKind::V5 => "v5",
            ContainerKind::V6 => "v6",
        }
    }
}

/// One of the two sequential boot-agent payloads inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "da1")]
    One,
    #[serde(rename = "da2")]
    Two,
}

impl Stage {
    pub const ALL: [Stage; 2] = [Stage::One, Stage::Two];

    /// Short name, also used as the file stem for extracted stages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::One => "da1",
            Stage::Two => "da2",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contiguous byte range within an image.
///
/// `data.len() == length` holds for parser output; the last `sig_len` bytes of
/// `data` are the signature and the prefix is the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Absolute byte position in the container file.
    pub offset: u32,
    /// Payload plus signature length.
    pub length: u32,
    /// Load address on the device.
    pub addr: u32,
    /// Trailing signature byte count (0 = unsigned).
    pub sig_len: u32,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Region {
    /// Build a region whose `length` is derived from `data`, or `None` when
    /// `data` does not fit a 32-bit length.
    pub fn new(offset: u32, addr: u32, sig_len: u32, data: Vec<u8>) -> Option<Self> {
        let length = u32::try_from(data.len()).ok()?;
        Some(Self { offset, length, addr, sig_len, data })
    }

    /// Payload bytes, or `None` when `sig_len` exceeds the data.
    pub fn payload(&self) -> Option<&[u8]> {
        let split = self.data.len().checked_sub(self.sig_len as usize)?;
        Some(&self.data[..split])
    }

    /// Trailing signature bytes; `None` for unsigned regions or a `sig_len`
    /// that does not fit the data.
    pub fn signature(&self) -> Option<&[u8]> {
        if self.sig_len == 0 {
            return None;
        }
        let split = self.data.len().checked_sub(self.sig_len as usize)?;
        Some(&self.data[split..])
    }

    /// One past the last byte covered by this region in the file.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.length)
    }
}

/// One download-agent image inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub magic: u16,
    pub hw_code: u16,
    pub hw_sub_code: u16,
    pub hw_version: u16,
    pub regions: Vec<Region>,
    stage_one: Option<usize>,
    stage_two: Option<usize>,
}

impl Image {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            magic: 0,
            hw_code: 0,
            hw_sub_code: 0,
            hw_version: 0,
            regions,
            stage_one: None,
            stage_two: None,
        }
    }

    /// Record which regions hold the two boot stages. Indices past the end of
    /// `regions` leave the slot empty.
    pub fn with_stages(mut self, stage_one: Option<usize>, stage_two: Option<usize>) -> Self {
        let len = self.regions.len();
        self.stage_one = stage_one.filter(|&i| i < len);
        self.stage_two = stage_two.filter(|&i| i < len);
        self
    }

    pub fn with_hw(mut self, magic: u16, hw_code: u16, hw_sub_code: u16, hw_version: u16) -> Self {
        self.magic = magic;
        self.hw_code = hw_code;
        self.hw_sub_code = hw_sub_code;
        self.hw_version = hw_version;
        self
    }

    /// Region index that holds `stage`, if the parser resolved one.
    pub fn stage_index(&self, stage: Stage) -> Option<usize> {
        match stage {
            Stage::One => self.stage_one,
            Stage::Two => self.stage_two,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&Region> {
        self.stage_index(stage).and_then(|i| self.regions.get(i))
    }

    /// Lowest region offset, i.e. where the opaque header ends.
    pub fn header_end(&self) -> Option<u32> {
        self.regions.iter().map(|r| r.offset).min()
    }
}

/// A parsed container file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub kind: ContainerKind,
    pub id: String,
    pub version: u32,
    pub images: Vec<Image>,
}

impl Container {
    /// Find the image built for a given hardware code pair.
    pub fn image_for_hw_code(&self, hw_code: u16, hw_sub_code: u16) -> Option<(usize, &Image)> {
        self.images
            .iter()
            .enumerate()
            .find(|(_, img)| img.hw_code == hw_code && img.hw_sub_code == hw_sub_code)
    }
}
