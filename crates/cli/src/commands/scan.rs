use std::path::Path;

use anyhow::{anyhow, Result};
use daforge_core::config::{load_scan_config, ScanConfig};
use daforge_core::scan::{scan, ScanReport};

use crate::read_input;

/// Recover the security engine base address from a raw boot-stage binary.
///
/// Fails when the scan cannot start (no constants, no clusters) or when no
/// cluster resolves; per-cluster failures are printed inline.
pub fn scan_command(path: &str, config_path: Option<&str>, json: bool) -> Result<ScanReport> {
    let config = match config_path {
        Some(p) => load_scan_config(Path::new(p))?,
        None => ScanConfig::default(),
    };
    let blob = read_input(Path::new(path), "binary")?;
    let report = scan(&blob, &config).map_err(|e| anyhow!("Scan of {} failed: {}", path, e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.base_addresses().is_empty() {
        return Err(anyhow!("No cluster in {} resolved to a base address", path));
    }
    Ok(report)
}

fn print_report(report: &ScanReport) {
    for (i, hits) in report.hits.iter().enumerate() {
        let offsets: Vec<String> = hits.offsets.iter().map(|o| format!("{:#X}", o)).collect();
        println!("Constant {} ({:#X}) found at offsets: {}", i + 1, hits.value, offsets.join(", "));
    }
    println!("{}", "=".repeat(60));

    println!("Found {} cluster(s).", report.clusters.len());
    for (i, cluster) in report.clusters.iter().enumerate() {
        println!("Cluster {}:", i + 1);
        for member in &cluster.members {
            println!("  - Constant {:#X} at offset {:#X}", member.value, member.offset);
        }
    }
    println!("{}", "=".repeat(60));

    for outcome in &report.outcomes {
        let n = outcome.index + 1;
        match &outcome.result {
            Ok(res) => {
                println!(
                    "Cluster {}: LDR {:#X} at {:#X} into R{}",
                    n, res.anchor_load.value, res.anchor_load.offset, res.anchor_load.rd
                );
                println!(
                    "Cluster {}: STR R{} -> [R{}, #{}] at {:#X}",
                    n, res.store.rt, res.store.rn, res.store.byte_offset, res.store.offset
                );
                println!(
                    "Cluster {}: LDR {:#X} at {:#X} into R{}",
                    n, res.raw_address, res.base_load.offset, res.base_load.rd
                );
                println!("SEJ base: {:#X}", res.base_address);
            }
            Err(reason) => {
                println!("Cluster {}: {} (ref offset {:#X})", n, reason, outcome.ref_offset);
            }
        }
    }
}
