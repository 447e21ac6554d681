use std::path::Path;

use anyhow::Result;
use daforge_core::model::Stage;

use crate::commands::load_container;

/// Show the images and regions of a DA container.
pub fn info_command(path: &str, json: bool) -> Result<()> {
    let (_raw, container) = load_container(Path::new(path))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&container)?);
        return Ok(());
    }

    println!("DA container: {}", path);
    println!("  Kind: {}", container.kind.as_str());
    println!("  Id: {}", container.id);
    println!("  Version: {}", container.version);
    println!("  Images: {}", container.images.len());
    for (i, image) in container.images.iter().enumerate() {
        println!(
            "- Image {}: hw_code={:#06x} hw_sub_code={:#06x} hw_version={:#06x} regions={}",
            i,
            image.hw_code,
            image.hw_sub_code,
            image.hw_version,
            image.regions.len()
        );
        for (r, region) in image.regions.iter().enumerate() {
            let stage = Stage::ALL
                .into_iter()
                .find(|s| image.stage_index(*s) == Some(r))
                .map(|s| format!(" [{}]", s))
                .unwrap_or_default();
            println!(
                "    Region {}: offset={:#010x} length={:#010x} addr={:#010x} sig_len={:#x}{}",
                r, region.offset, region.length, region.addr, region.sig_len, stage
            );
        }
    }

    Ok(())
}
