use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use daforge_core::editor::extract_all;
use daforge_core::model::Stage;
use serde::Serialize;

use crate::canonicalize_or_current;
use crate::commands::{load_container, select_image, write_output, ImageSelector, WrittenFile};

#[derive(Debug, Serialize)]
pub struct ExtractedFile {
    pub stage: Stage,
    pub kind: &'static str,
    #[serde(flatten)]
    pub file: WrittenFile,
}

#[derive(Debug, Serialize)]
pub struct ExtractReport {
    pub container: String,
    pub image_index: usize,
    pub generated_at: String,
    pub files: Vec<ExtractedFile>,
}

/// Write every stage payload (and signature, if any) of one image to
/// `<out_dir>/da1.bin`, `da1.sig`, `da2.bin`, `da2.sig`.
pub fn extract_command(
    path: &str,
    selector: ImageSelector,
    out_dir: &str,
    json: bool,
) -> Result<ExtractReport> {
    let (_raw, container) = load_container(Path::new(path))?;
    let image_index = select_image(&container, selector)?;
    let image = &container.images[image_index];

    let stages = extract_all(image)
        .with_context(|| format!("Failed to extract stages from image {}", image_index))?;
    if stages.is_empty() {
        tracing::warn!(image = image_index, "image exposes no boot stages");
    }

    let out_root = canonicalize_or_current(out_dir)?;
    let mut files = Vec::new();
    for extracted in stages {
        let bin_path = out_root.join(format!("{}.bin", extracted.stage));
        files.push(ExtractedFile {
            stage: extracted.stage,
            kind: "payload",
            file: write_output(&bin_path, &extracted.payload)?,
        });
        if let Some(signature) = &extracted.signature {
            let sig_path = out_root.join(format!("{}.sig", extracted.stage));
            files.push(ExtractedFile {
                stage: extracted.stage,
                kind: "signature",
                file: write_output(&sig_path, signature)?,
            });
        }
    }

    let report = ExtractReport {
        container: path.to_string(),
        image_index,
        generated_at: Utc::now().to_rfc3339(),
        files,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.files.is_empty() {
        println!("Image {} exposes no boot stages; nothing written.", image_index);
    } else {
        for f in &report.files {
            println!("Wrote {}, size: {} bytes", f.file.path, f.file.size);
        }
        println!("DA stages extracted successfully.");
    }

    Ok(report)
}
