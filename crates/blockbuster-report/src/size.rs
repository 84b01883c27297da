//! Per-datablock size estimation.
//!
//! The memory part is a heuristic used for ordering, not an exact byte count.
//! The file part stats the backing file of the datablock, if any.

use crate::bpath::BlendPath;
use crate::model::{Datablock, DatablockKind};
use log::warn;
use std::io::ErrorKind;
use std::path::Path;

/// Bytes charged for a datablock's `users` counter
pub const USERS_COUNTER_SIZE: u64 = size_of::<u32>() as u64;
/// Bytes charged per entry of a datablock's user map
pub const USER_MAP_ENTRY_SIZE: u64 = size_of::<u64>() as u64;

/// Heuristic in-memory size: the shallow size, plus the user bookkeeping of meshes and materials
pub fn memory_size(datablock: &Datablock) -> u64 {
    let mut size = datablock.shallow_size;
    if matches!(
        datablock.kind(),
        DatablockKind::Mesh | DatablockKind::Material
    ) {
        if datablock.users.is_some() {
            size = size.saturating_add(USERS_COUNTER_SIZE);
        }
        if let Some(entries) = datablock.user_map {
            size = size.saturating_add((entries as u64).saturating_mul(USER_MAP_ENTRY_SIZE));
        }
    }
    size
}

/// Size of the data backing a datablock: packed payload, own file, or library file
pub fn file_size(datablock: &Datablock, blend_dir: Option<&Path>) -> u64 {
    if let Some(packed) = &datablock.packed_file {
        return packed.size.unwrap_or(0);
    }

    if let Some(size) = datablock
        .filepath
        .as_deref()
        .and_then(|path| stat_len(path, blend_dir))
    {
        return size;
    }

    datablock
        .library
        .as_deref()
        .and_then(|path| stat_len(path, blend_dir))
        .unwrap_or(0)
}

/// Memory size plus file size
pub fn total_size(datablock: &Datablock, blend_dir: Option<&Path>) -> u64 {
    memory_size(datablock).saturating_add(file_size(datablock, blend_dir))
}

fn stat_len(raw: &str, blend_dir: Option<&Path>) -> Option<u64> {
    let path = BlendPath::new(raw);
    if path.is_empty() {
        return None;
    }
    let resolved = path.resolve(blend_dir);
    match std::fs::metadata(&resolved) {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        Ok(_) => None,
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            warn!("Cannot stat {}: {e}", resolved.display());
            None
        }
    }
}
