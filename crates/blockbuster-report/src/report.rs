use crate::model::{BlendData, DatablockId, DatablockKind};
use crate::references::{Reference, find_references};
use crate::size::{file_size, memory_size};
use log::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default size, in bytes, above which references are looked up
pub const DEFAULT_REFERENCE_THRESHOLD: u64 = 100;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Entries strictly larger than this get a reference list
    pub reference_threshold: u64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            reference_threshold: DEFAULT_REFERENCE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportEntry {
    pub id: DatablockId,
    pub name: String,
    pub kind: DatablockKind,
    pub memory_size: u64,
    pub file_size: u64,
    pub size: u64,
    /// `None` when the entry was at or below the reference threshold
    pub references: Option<Vec<Reference>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SizeReport {
    /// Entries with a positive size, smallest first
    pub entries: Vec<ReportEntry>,
    pub total: u64,
    /// Problems met while building the snapshot
    pub warnings: Vec<String>,
}

impl SizeReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Estimate every mesh, material, texture, image and light, sort them by size and
/// attach references to the large ones.
pub fn build_report(data: &BlendData, options: &ReportOptions) -> SizeReport {
    let blend_dir = data.base_dir();

    let mut sized: Vec<(DatablockId, u64, u64)> = [
        data.meshes(),
        data.materials(),
        data.textures(),
        data.images(),
        data.lights(),
    ]
    .into_iter()
    .flat_map(|ids| data.iter_ids(ids))
    .map(|(id, datablock)| (id, memory_size(datablock), file_size(datablock, blend_dir)))
    .collect();

    // Stable: equal sizes keep collection order
    sized.sort_by_key(|&(_, memory, file)| memory.saturating_add(file));

    let mut report = SizeReport {
        warnings: data.warnings().to_vec(),
        ..Default::default()
    };

    for (id, memory, file) in sized {
        let size = memory.saturating_add(file);
        if size == 0 {
            continue;
        }
        let datablock = &data[id];
        report.total = report.total.saturating_add(size);

        let references = (size > options.reference_threshold).then(|| {
            let refs = find_references(data, id);
            trace!("{} has {} references", datablock.name, refs.len());
            refs
        });

        report.entries.push(ReportEntry {
            id,
            name: datablock.name.clone(),
            kind: datablock.kind(),
            memory_size: memory,
            file_size: file,
            size,
            references,
        });
    }

    debug!(
        "Size report: {} entries, {} bytes total",
        report.entries.len(),
        report.total
    );
    report
}
