use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic values referenced by the security engine's initialization routine.
///
/// The first entry is the anchor constant whose literal load starts the
/// instruction chain.
pub const SEJ_CONSTANTS: [u32; 5] =
    [0x9ED4_0400, 0x00E8_84A1, 0xE3F0_83BD, 0x2F4E_6D8A, 0x4000_0002];

/// Largest byte distance between neighbouring occurrences in one cluster.
pub const DEFAULT_MAX_GAP: usize = 0x10;
/// Distinct constants a cluster must contain to be accepted.
pub const DEFAULT_MIN_DISTINCT: usize = 3;
/// Bytes scanned by each backward/forward instruction search.
pub const DEFAULT_SEARCH_WINDOW: usize = 0x100;
/// Mask applied to the recovered literal to get the register block base.
pub const DEFAULT_BASE_MASK: u32 = !0xFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Signature table is empty")]
    NoSignatures,
    #[error("min_distinct must be at least 1")]
    ZeroMinDistinct,
    #[error("search_window {0:#x} is smaller than one instruction")]
    WindowTooSmall(usize),
}

/// Tunables for the offset recovery engine.
///
/// Loaded from YAML or JSON; every field falls back to the built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub signatures: Vec<u32>,
    pub max_gap: usize,
    pub min_distinct: usize,
    pub search_window: usize,
    pub base_mask: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            signatures: SEJ_CONSTANTS.to_vec(),
            max_gap: DEFAULT_MAX_GAP,
            min_distinct: DEFAULT_MIN_DISTINCT,
            search_window: DEFAULT_SEARCH_WINDOW,
            base_mask: DEFAULT_BASE_MASK,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signatures.is_empty() {
            return Err(ConfigError::NoSignatures);
        }
        if self.min_distinct == 0 {
            return Err(ConfigError::ZeroMinDistinct);
        }
        if self.search_window < 4 {
            return Err(ConfigError::WindowTooSmall(self.search_window));
        }
        Ok(())
    }

    /// Constant the first literal load of the chain must produce.
    pub fn anchor(&self) -> Option<u32> {
        self.signatures.first().copied()
    }
}

/// Load a scan config from disk, choosing YAML or JSON by extension.
pub fn load_scan_config(path: &Path) -> Result<ScanConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scan config at {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    let config: ScanConfig = if is_yaml {
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse YAML scan config {}", path.display()))?
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON scan config {}", path.display()))?
    };
    config.validate().with_context(|| format!("Invalid scan config {}", path.display()))?;
    Ok(config)
}
