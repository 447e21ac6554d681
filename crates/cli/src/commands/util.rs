use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use daforge_core::container::{ContainerParser, DaFileParser};
use daforge_core::model::Container;
use serde::Serialize;

use crate::{read_input, sha256_bytes};

/// How the user picked an image out of a multi-SoC container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageSelector {
    pub index: Option<usize>,
    pub hw_code: Option<u16>,
    pub hw_sub_code: Option<u16>,
}

/// Resolve an `ImageSelector` to an image index. Defaults to the first image.
pub fn select_image(container: &Container, selector: ImageSelector) -> Result<usize> {
    if let Some(hw_code) = selector.hw_code {
        let hw_sub_code = selector.hw_sub_code.unwrap_or(0);
        let (index, _) = container.image_for_hw_code(hw_code, hw_sub_code).ok_or_else(|| {
            anyhow!("No image for hw_code {:#06x} / hw_sub_code {:#06x}", hw_code, hw_sub_code)
        })?;
        return Ok(index);
    }

    let index = selector.index.unwrap_or(0);
    if index >= container.images.len() {
        return Err(anyhow!(
            "Image index {} out of range (container has {} images)",
            index,
            container.images.len()
        ));
    }
    Ok(index)
}

/// Read and parse a DA container, returning the raw bytes alongside it.
pub fn load_container(path: &Path) -> Result<(Vec<u8>, Container)> {
    let raw = read_input(path, "container")?;
    let parser = DaFileParser::new();
    let container = parser
        .parse(&raw)
        .with_context(|| format!("Failed to parse container {}", path.display()))?;
    tracing::debug!(
        parser = parser.name(),
        path = %path.display(),
        images = container.images.len(),
        "loaded container"
    );
    Ok((raw, container))
}

/// One file written by a command.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenFile {
    pub path: String,
    pub size: usize,
    pub sha256: String,
}

/// Write `bytes` to `path` and describe what was written.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<WrittenFile> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(WrittenFile {
        path: path.display().to_string(),
        size: bytes.len(),
        sha256: sha256_bytes(bytes),
    })
}
