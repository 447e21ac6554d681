use std::collections::BTreeSet;

use memchr::memmem;
use serde::Serialize;

/// Where one signature value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Occurrence {
    pub offset: usize,
    pub value: u32,
}

/// Every offset of one signature value, in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstantHits {
    pub value: u32,
    pub offsets: Vec<usize>,
}

/// Find each signature's little-endian encoding in `blob`.
///
/// The search restarts one byte after every hit. Signatures with no hits are
/// omitted; the rest keep the order of `signatures`.
pub fn find_occurrences(blob: &[u8], signatures: &[u32]) -> Vec<ConstantHits> {
    let mut hits = Vec::new();
    for &value in signatures {
        let needle = value.to_le_bytes();
        let finder = memmem::Finder::new(&needle);
        let mut offsets = Vec::new();
        let mut pos = 0;
        while let Some(found) = blob.get(pos..).and_then(|rest| finder.find(rest)) {
            offsets.push(pos + found);
            pos += found + 1;
        }
        if !offsets.is_empty() {
            hits.push(ConstantHits { value, offsets });
        }
    }
    hits
}

/// A group of co-located occurrences.
///
/// `members` holds one representative offset per signature value. When a
/// value occurs more than once inside the window, the later offset replaces
/// the earlier one but keeps the earlier one's position in the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub members: Vec<Occurrence>,
    /// All occurrences that fell inside the window, sorted by offset.
    pub occurrences: Vec<Occurrence>,
}

impl Cluster {
    fn from_run(run: &[Occurrence]) -> Self {
        let mut members: Vec<Occurrence> = Vec::new();
        for occ in run {
            match members.iter_mut().find(|m| m.value == occ.value) {
                Some(existing) => existing.offset = occ.offset,
                None => members.push(*occ),
            }
        }
        Self { members, occurrences: run.to_vec() }
    }

    /// Lowest representative offset; the anchor for instruction searches.
    pub fn ref_offset(&self) -> Option<usize> {
        self.members.iter().map(|m| m.offset).min()
    }

    pub fn offset_of(&self, value: u32) -> Option<usize> {
        self.members.iter().find(|m| m.value == value).map(|m| m.offset)
    }

    pub fn distinct_values(&self) -> usize {
        self.members.len()
    }
}

/// Group occurrences whose neighbour gap is at most `max_gap` bytes and keep
/// groups covering at least `min_distinct` different values.
pub fn cluster_occurrences(
    hits: &[ConstantHits],
    max_gap: usize,
    min_distinct: usize,
) -> Vec<Cluster> {
    let mut all: Vec<Occurrence> = hits
        .iter()
        .flat_map(|h| h.offsets.iter().map(move |&offset| Occurrence { offset, value: h.value }))
        .collect();
    all.sort();

    let mut clusters = Vec::new();
    let mut run_start = 0;
    for i in 1..=all.len() {
        let closes = i == all.len() || all[i].offset - all[i - 1].offset > max_gap;
        if !closes {
            continue;
        }
        let run = &all[run_start..i];
        let distinct: BTreeSet<u32> = run.iter().map(|o| o.value).collect();
        if distinct.len() >= min_distinct {
            clusters.push(Cluster::from_run(run));
        }
        run_start = i;
    }
    clusters
}
