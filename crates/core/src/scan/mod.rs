//! Offset recovery engine.
//!
//! Recovers the base address of the security engine from a raw boot-stage
//! binary without a disassembler:
//! 1. find every known constant in the blob;
//! 2. cluster co-located hits and keep clusters with enough distinct values;
//! 3. per cluster, walk `LDR Rx, =anchor` -> `STR Rx, [Rb, #imm]` ->
//!    `LDR Rb, =base` through the surrounding Thumb code;
//! 4. mask the recovered literal down to the register block base.
//!
//! Clusters are resolved independently; one failing never stops the others.

pub mod cluster;
pub mod thumb;

pub use cluster::{cluster_occurrences, find_occurrences, Cluster, ConstantHits, Occurrence};
pub use thumb::{
    decode, find_literal_load, find_store, resolve_literal_load, LiteralLoad, LoadFilter,
    StoreImmediate, Thumb16,
};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, ScanConfig};

/// Whole-scan failures: nothing to resolve.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("Invalid scan config: {0}")]
    Config(#[from] ConfigError),
    #[error("no signatures found")]
    NoSignatures,
    #[error("no clusters found")]
    NoClusters,
}

/// Per-cluster failures, named after the search that came up empty.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveFailure {
    #[error("LDR not found")]
    LdrNotFound,
    #[error("STR not found")]
    StrNotFound,
    #[error("base LDR not found")]
    BaseLdrNotFound,
}

/// A fully resolved instruction chain for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Load of the anchor constant.
    pub anchor_load: LiteralLoad,
    /// Store of the anchor register into the engine.
    pub store: StoreImmediate,
    /// Load of the store's base register.
    pub base_load: LiteralLoad,
    /// Literal loaded into the base register.
    pub raw_address: u32,
    /// `raw_address` masked to the register block.
    pub base_address: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterOutcome {
    pub index: usize,
    pub ref_offset: usize,
    pub result: Result<Resolution, ResolveFailure>,
}

impl ClusterOutcome {
    pub fn base_address(&self) -> Option<u32> {
        self.result.as_ref().ok().map(|r| r.base_address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub hits: Vec<ConstantHits>,
    pub clusters: Vec<Cluster>,
    pub outcomes: Vec<ClusterOutcome>,
}

impl ScanReport {
    /// Aligned base addresses of every resolved cluster, in cluster order.
    pub fn base_addresses(&self) -> Vec<u32> {
        self.outcomes.iter().filter_map(ClusterOutcome::base_address).collect()
    }
}

/// Replay the LDR -> STR -> LDR chain around `ref_offset`.
pub fn resolve_cluster(
    blob: &[u8],
    ref_offset: usize,
    anchor: u32,
    config: &ScanConfig,
) -> Result<Resolution, ResolveFailure> {
    let window = config.search_window;

    let anchor_load = find_literal_load(blob, ref_offset, window, LoadFilter::Value(anchor))
        .ok_or(ResolveFailure::LdrNotFound)?;
    debug!(
        offset = %format!("{:#x}", anchor_load.offset),
        rd = anchor_load.rd,
        "anchor LDR"
    );

    let store = find_store(blob, anchor_load.offset, window, anchor_load.rd)
        .ok_or(ResolveFailure::StrNotFound)?;
    debug!(
        offset = %format!("{:#x}", store.offset),
        rn = store.rn,
        byte_offset = store.byte_offset,
        "STR"
    );

    let base_load = find_literal_load(blob, store.offset, window, LoadFilter::Register(store.rn))
        .ok_or(ResolveFailure::BaseLdrNotFound)?;
    debug!(
        offset = %format!("{:#x}", base_load.offset),
        value = %format!("{:#x}", base_load.value),
        "base LDR"
    );

    Ok(Resolution {
        anchor_load,
        store,
        base_load,
        raw_address: base_load.value,
        base_address: base_load.value & config.base_mask,
    })
}

/// Run the full pipeline over `blob`.
pub fn scan(blob: &[u8], config: &ScanConfig) -> Result<ScanReport, ScanError> {
    config.validate()?;
    let anchor = config.anchor().ok_or(ConfigError::NoSignatures)?;

    let hits = find_occurrences(blob, &config.signatures);
    if hits.is_empty() {
        return Err(ScanError::NoSignatures);
    }
    for h in &hits {
        debug!(value = %format!("{:#010x}", h.value), count = h.offsets.len(), "constant hits");
    }

    let clusters = cluster_occurrences(&hits, config.max_gap, config.min_distinct);
    if clusters.is_empty() {
        return Err(ScanError::NoClusters);
    }
    info!(clusters = clusters.len(), "found constant clusters");

    let outcomes = clusters
        .iter()
        .enumerate()
        .filter_map(|(index, cluster)| {
            let ref_offset = cluster.ref_offset()?;
            let result = resolve_cluster(blob, ref_offset, anchor, config);
            match &result {
                Ok(res) => info!(
                    cluster = index,
                    base = %format!("{:#010x}", res.base_address),
                    "resolved security engine base"
                ),
                Err(reason) => warn!(cluster = index, %reason, "cluster unresolved"),
            }
            Some(ClusterOutcome { index, ref_offset, result })
        })
        .collect();

    Ok(ScanReport { hits, clusters, outcomes })
}
