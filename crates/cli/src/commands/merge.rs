use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use daforge_core::container::DaFileParser;
use daforge_core::editor::{merge, MergeOptions, MergeReport, StageReplacement};
use daforge_core::model::Stage;
use serde::Serialize;

use crate::commands::{load_container, select_image, write_output, ImageSelector, WrittenFile};
use crate::read_input;

/// Inputs for the merge command.
#[derive(Debug, Clone, Default)]
pub struct MergeRequest {
    pub donor: PathBuf,
    pub da1: Option<PathBuf>,
    pub da2: Option<PathBuf>,
    pub output: PathBuf,
    pub selector: ImageSelector,
    pub sync_header: bool,
}

#[derive(Debug, Serialize)]
pub struct MergeCommandReport {
    pub donor: String,
    pub generated_at: String,
    pub output: WrittenFile,
    #[serde(flatten)]
    pub layout: MergeReport,
}

/// Re-pack replacement stage payloads into a donor container.
pub fn merge_command(request: &MergeRequest, json: bool) -> Result<MergeCommandReport> {
    let mut replacements = Vec::new();
    for (stage, path) in [(Stage::One, &request.da1), (Stage::Two, &request.da2)] {
        if let Some(path) = path {
            let payload = read_input(path, &format!("{} payload", stage))?;
            replacements.push(StageReplacement::new(stage, payload));
        }
    }
    if replacements.is_empty() {
        return Err(anyhow!("Nothing to merge: pass --da1 and/or --da2"));
    }

    let (donor_raw, mut container) = load_container(&request.donor)?;
    let image_index = select_image(&container, request.selector)?;

    let parser = DaFileParser::new();
    let options = MergeOptions { sync_header: request.sync_header };
    let merged = merge(&donor_raw, &mut container, image_index, &replacements, &parser, options)
        .with_context(|| format!("Failed to merge into {}", request.donor.display()))?;

    let output = write_output(&request.output, &merged.bytes)?;
    let report = MergeCommandReport {
        donor: display(&request.donor),
        generated_at: Utc::now().to_rfc3339(),
        output,
        layout: merged.report,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report);
    }

    println!("Updated DA file written to: {}", report.output.path);
    println!("Updated region offsets:");
    for region in &report.layout.regions {
        let stage = region.stage.map(|s| format!(" [{}]", s)).unwrap_or_default();
        let replaced = if region.replaced { " (replaced)" } else { "" };
        println!(
            "  Region {}: offset={:#010X}, length={:#010X}{}{}",
            region.index, region.offset, region.length, stage, replaced
        );
    }

    Ok(report)
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
