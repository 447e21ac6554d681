//! Container editor: stage extraction and donor re-packing.
//!
//! Extraction is a pure read over an `Image`. Merging replaces stage payloads
//! in a donor image, zero-fills their signature slots (re-signing is not
//! performed, so the merged file will not verify against the vendor key),
//! lays every region out back to back starting at the original header
//! boundary, and serializes header + regions into a fresh buffer.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::container::{ContainerParser, ParseError};
use crate::model::{Container, Image, Stage};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Image index {index} out of range (container has {count} images)")]
    ImageOutOfRange { index: usize, count: usize },
    #[error("Stage {0} is not present in the selected image")]
    MissingStage(Stage),
    #[error("Selected image has no regions")]
    NoRegions,
    #[error("Region {index}: sig_len {sig_len:#x} exceeds region data length {data_len:#x}")]
    SignatureOverrun { index: usize, sig_len: u32, data_len: usize },
    #[error("Donor file is {donor_len:#x} bytes but the header ends at {header_end:#x}")]
    DonorTooShort { donor_len: usize, header_end: u32 },
    #[error("Region {index} does not fit in a 32-bit file offset")]
    LayoutOverflow { index: usize },
    #[error("Header sync failed: {0}")]
    HeaderSync(#[from] ParseError),
}

/// Payload (and optional signature) of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedStage {
    pub stage: Stage,
    pub payload: Vec<u8>,
    /// `None` when the region is unsigned.
    pub signature: Option<Vec<u8>>,
}

/// Split a stage region into payload and trailing signature.
pub fn extract_stage(image: &Image, stage: Stage) -> Result<ExtractedStage, EditError> {
    let index = image.stage_index(stage).ok_or(EditError::MissingStage(stage))?;
    let region = image.regions.get(index).ok_or(EditError::MissingStage(stage))?;
    let payload = region.payload().ok_or(EditError::SignatureOverrun {
        index,
        sig_len: region.sig_len,
        data_len: region.data.len(),
    })?;

    Ok(ExtractedStage {
        stage,
        payload: payload.to_vec(),
        signature: region.signature().map(<[u8]>::to_vec),
    })
}

/// Extract every stage the image exposes, in stage order.
pub fn extract_all(image: &Image) -> Result<Vec<ExtractedStage>, EditError> {
    Stage::ALL
        .iter()
        .filter(|stage| image.stage_index(**stage).is_some())
        .map(|stage| extract_stage(image, *stage))
        .collect()
}

/// Replacement payload for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReplacement {
    pub stage: Stage,
    pub payload: Vec<u8>,
}

impl StageReplacement {
    pub fn new(stage: Stage, payload: impl Into<Vec<u8>>) -> Self {
        Self { stage, payload: payload.into() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Rewrite the donor's on-disk region table to the new layout instead of
    /// copying the header verbatim.
    pub sync_header: bool,
}

/// Final placement of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionLayout {
    pub index: usize,
    pub offset: u32,
    pub length: u32,
    pub sig_len: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub replaced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub image_index: usize,
    pub header_end: u32,
    pub total_len: usize,
    pub header_synced: bool,
    pub regions: Vec<RegionLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutput {
    pub bytes: Vec<u8>,
    pub report: MergeReport,
}

/// Re-pack `replacements` into image `image_index` of `container`.
///
/// `donor_raw` must be the bytes `container` was parsed from; its prefix up to
/// the lowest original region offset is reused as the header. On success the
/// selected image is updated in place so callers can inspect the new region
/// table; on any error the container is left as it was.
pub fn merge(
    donor_raw: &[u8],
    container: &mut Container,
    image_index: usize,
    replacements: &[StageReplacement],
    parser: &dyn ContainerParser,
    options: MergeOptions,
) -> Result<MergeOutput, EditError> {
    let count = container.images.len();
    let image = container
        .images
        .get_mut(image_index)
        .ok_or(EditError::ImageOutOfRange { index: image_index, count })?;

    for replacement in replacements {
        if image.stage(replacement.stage).is_none() {
            return Err(EditError::MissingStage(replacement.stage));
        }
    }

    let header_end = image.header_end().ok_or(EditError::NoRegions)?;
    if donor_raw.len() < header_end as usize {
        return Err(EditError::DonorTooShort { donor_len: donor_raw.len(), header_end });
    }

    // All fallible work happens on a staged copy; `image` is only replaced
    // once the output buffer is complete.
    let mut staged = image.clone();
    let mut replaced = Vec::with_capacity(replacements.len());
    for replacement in replacements {
        let index = staged
            .stage_index(replacement.stage)
            .ok_or(EditError::MissingStage(replacement.stage))?;
        let region = &mut staged.regions[index];
        let mut data = Vec::with_capacity(replacement.payload.len() + region.sig_len as usize);
        data.extend_from_slice(&replacement.payload);
        data.resize(replacement.payload.len() + region.sig_len as usize, 0);
        region.data = data;
        replaced.push(index);
        debug!(
            stage = %replacement.stage,
            region = index,
            payload_len = replacement.payload.len(),
            sig_len = region.sig_len,
            "replaced stage payload"
        );
    }

    // Sequential layout in existing region order, no gaps.
    let mut cursor = header_end;
    for (index, region) in staged.regions.iter_mut().enumerate() {
        let length =
            u32::try_from(region.data.len()).map_err(|_| EditError::LayoutOverflow { index })?;
        region.offset = cursor;
        region.length = length;
        cursor = cursor.checked_add(length).ok_or(EditError::LayoutOverflow { index })?;
    }

    let mut bytes = donor_raw[..header_end as usize].to_vec();
    if options.sync_header {
        parser.sync_header(&mut bytes, image_index, &staged)?;
    }
    for region in &staged.regions {
        let start = region.offset as usize;
        let end = start + region.data.len();
        if bytes.len() < end {
            bytes.resize(end, 0);
        }
        bytes[start..end].copy_from_slice(&region.data);
    }
    *image = staged;

    let regions = image
        .regions
        .iter()
        .enumerate()
        .map(|(index, region)| RegionLayout {
            index,
            offset: region.offset,
            length: region.length,
            sig_len: region.sig_len,
            stage: Stage::ALL.into_iter().find(|s| image.stage_index(*s) == Some(index)),
            replaced: replaced.contains(&index),
        })
        .collect();

    let report = MergeReport {
        image_index,
        header_end,
        total_len: bytes.len(),
        header_synced: options.sync_header,
        regions,
    };
    info!(
        parser = parser.name(),
        image = image_index,
        header_end = %format!("{header_end:#x}"),
        total_len = bytes.len(),
        replaced = replaced.len(),
        "merged container"
    );

    Ok(MergeOutput { bytes, report })
}
