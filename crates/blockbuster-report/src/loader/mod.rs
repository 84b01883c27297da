//! Builds a [`BlendData`] snapshot from a parsed .blend file.
//!
//! Datablocks are loaded kind by kind so that every reference (texture to image,
//! material to texture, object to data) points at a datablock loaded earlier.
//! A datablock whose fields cannot be read is skipped and recorded as a warning.

mod id;
mod material;
mod scene;

use crate::model::{BlendData, Datablock, DatablockData, DatablockId, TextureType};
use id::IdFields;
use blockbuster_error::{BlockbusterError, ReportErrorKind, Result};
use blockbuster_parser::{BlendFile, ParseOptions, block_code_to_string, parse_from_path};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

pub(crate) const CODE_MESH: [u8; 4] = *b"ME\0\0";
pub(crate) const CODE_MATERIAL: [u8; 4] = *b"MA\0\0";
pub(crate) const CODE_TEXTURE: [u8; 4] = *b"TE\0\0";
pub(crate) const CODE_IMAGE: [u8; 4] = *b"IM\0\0";
pub(crate) const CODE_LIGHT: [u8; 4] = *b"LA\0\0";
pub(crate) const CODE_ARMATURE: [u8; 4] = *b"AR\0\0";
pub(crate) const CODE_OBJECT: [u8; 4] = *b"OB\0\0";
pub(crate) const CODE_SCENE: [u8; 4] = *b"SC\0\0";
pub(crate) const CODE_GLOBAL: [u8; 4] = *b"GLOB";
/// Placeholder written for datablocks linked from a library
pub(crate) const CODE_LINKED_ID: [u8; 4] = *b"ID\0\0";

/// Upper bound on linked-list walks, guards against corrupt `next` chains
pub(crate) const MAX_LIST_LENGTH: usize = 100_000;

/// Parse `path` and load its snapshot; blend-relative paths resolve against its directory
pub fn load_from_path<P: AsRef<Path>>(path: P, options: Option<&ParseOptions>) -> Result<BlendData> {
    let path = path.as_ref();
    let (mut blend, _mode) = parse_from_path(path, options)?;
    let base_dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
    load_blend_data(&mut blend, base_dir)
}

/// Load the snapshot of an already parsed file
pub fn load_blend_data<R: Read + Seek>(
    blend: &mut BlendFile<R>,
    base_dir: Option<&Path>,
) -> Result<BlendData> {
    let mut loader = Loader::new(blend);
    if let Some(dir) = base_dir {
        loader.data.set_base_dir(dir);
    }
    loader.index_linked_ids();

    loader.load_kind(CODE_IMAGE, material::read_image)?;
    loader.load_kind(CODE_TEXTURE, material::read_texture)?;
    loader.load_kind(CODE_MATERIAL, material::read_material)?;
    loader.load_kind(CODE_MESH, |_, _, id| Ok(id.into_datablock(DatablockData::Mesh)))?;
    loader.load_kind(CODE_LIGHT, |_, _, id| Ok(id.into_datablock(DatablockData::Light)))?;
    loader.load_kind(CODE_ARMATURE, |_, _, id| {
        Ok(id.into_datablock(DatablockData::Armature))
    })?;
    scene::load_scene_objects(&mut loader)?;

    debug!(
        "Loaded {} datablocks, {} scene objects, {} warnings",
        loader.data.len(),
        loader.data.objects().len(),
        loader.data.warnings().len()
    );
    Ok(loader.data)
}

pub(crate) struct Loader<'a, R: Read + Seek> {
    pub(crate) blend: &'a mut BlendFile<R>,
    pub(crate) data: BlendData,
    /// Old address of each loaded ID block
    ids: HashMap<u64, DatablockId>,
    /// `ID` placeholder blocks grouped by the type prefix of their name
    linked: HashMap<[u8; 2], Vec<usize>>,
}

impl<'a, R: Read + Seek> Loader<'a, R> {
    fn new(blend: &'a mut BlendFile<R>) -> Self {
        Loader {
            blend,
            data: BlendData::new(),
            ids: HashMap::new(),
            linked: HashMap::new(),
        }
    }

    /// Group linked placeholders by name prefix, e.g. `IM` for a linked image
    fn index_linked_ids(&mut self) {
        let placeholders = self.blend.blocks_by_type(&CODE_LINKED_ID).to_vec();
        for block_index in placeholders {
            let name = self.blend.read_block_data(block_index).and_then(|bytes| {
                let reader = self.blend.create_field_reader(&bytes);
                reader.read_field_string("ID", "name")
            });
            match name {
                Ok(name) => match name.as_bytes() {
                    [a, b, ..] => self.linked.entry([*a, *b]).or_default().push(block_index),
                    _ => debug!("Linked ID block {block_index} has no type prefix"),
                },
                Err(err) => self.skip(block_index, &err.with_block_index(block_index)),
            }
        }
    }

    /// Datablock loaded from the block at `address`, if any
    pub(crate) fn lookup(&self, address: u64) -> Option<DatablockId> {
        if address == 0 {
            return None;
        }
        self.ids.get(&address).copied()
    }

    pub(crate) fn resolve(&self, address: u64) -> Option<usize> {
        self.blend.find_block_by_address(address)
    }

    /// Record a per-datablock failure and keep going
    pub(crate) fn skip(&mut self, block_index: usize, err: &BlockbusterError) {
        let code = self
            .blend
            .get_block(block_index)
            .map(|b| block_code_to_string(b.header.code))
            .unwrap_or_default();
        let message = format!("Skipped {code} block {block_index}: {}", err.message());
        warn!("{message}");
        self.data.push_warning(message);
    }

    /// Load every ID block with `code`, building each datablock with `build`.
    ///
    /// Linked placeholders of the same type follow the local blocks; they only
    /// carry an `ID`, so they get an empty payload of their kind.
    fn load_kind<F>(&mut self, code: [u8; 4], build: F) -> Result<()>
    where
        F: Fn(&mut Self, usize, IdFields) -> Result<Datablock>,
    {
        let local = self.blend.blocks_by_type(&code).to_vec();
        for block_index in local {
            let result =
                id::read_id(self, block_index).and_then(|fields| build(self, block_index, fields));
            self.finish(block_index, result);
        }

        let linked = self
            .linked
            .get(&[code[0], code[1]])
            .cloned()
            .unwrap_or_default();
        for block_index in linked {
            let result = id::read_id(self, block_index)
                .map(|fields| fields.into_datablock(linked_payload(code)));
            self.finish(block_index, result);
        }
        Ok(())
    }

    fn finish(&mut self, block_index: usize, result: Result<Datablock>) {
        match result {
            Ok(datablock) => {
                let address = self
                    .blend
                    .get_block(block_index)
                    .map(|b| b.header.old_address)
                    .unwrap_or(0);
                let id = self.data.add_datablock(datablock);
                if address != 0 {
                    self.ids.insert(address, id);
                }
            }
            Err(err) => self.skip(block_index, &err.with_block_index(block_index)),
        }
    }

    /// Block indices of a linked list starting at `first`, following `struct_name.next`
    pub(crate) fn walk_list(&mut self, first: u64, struct_name: &str) -> Result<Vec<usize>> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut current = first;

        while let Some(index) = self.resolve(current) {
            if !seen.insert(index) || items.len() >= MAX_LIST_LENGTH {
                break;
            }
            items.push(index);
            current = {
                let bytes = self.blend.read_block_data(index)?;
                let reader = self.blend.create_field_reader(&bytes);
                reader.read_field_pointer(struct_name, "next")?
            };
        }

        Ok(items)
    }

    /// Up to `count` pointers stored in the `DATA` block at `address`
    pub(crate) fn read_pointer_array(&mut self, address: u64, count: usize) -> Result<Vec<u64>> {
        let Some(index) = self.resolve(address) else {
            return Ok(Vec::new());
        };
        let bytes = self.blend.read_block_data(index)?;
        let reader = self.blend.create_field_reader(&bytes);
        let pointer_size = reader.pointer_size;
        let available = bytes.len() / pointer_size;
        (0..count.min(available))
            .map(|i| reader.read_pointer(i * pointer_size))
            .collect()
    }

    /// Raw bytes of the `DATA` block at `address`, empty when it does not resolve
    pub(crate) fn read_bytes(&mut self, address: u64) -> Result<Vec<u8>> {
        match self.resolve(address) {
            Some(index) => self.blend.read_block_data(index),
            None => Ok(Vec::new()),
        }
    }
}

/// Payload of a linked datablock; its contents live in the library file
fn linked_payload(code: [u8; 4]) -> DatablockData {
    match code {
        CODE_MATERIAL => DatablockData::Material {
            node_tree: None,
            texture_slots: Vec::new(),
        },
        CODE_TEXTURE => DatablockData::Texture {
            tex_type: TextureType::Other("linked".to_string()),
            image: None,
        },
        CODE_IMAGE => DatablockData::Image,
        CODE_MESH => DatablockData::Mesh,
        CODE_LIGHT => DatablockData::Light,
        CODE_ARMATURE => DatablockData::Armature,
        other => DatablockData::Other(block_code_to_string(other)),
    }
}

pub(crate) fn unreadable(message: impl Into<String>) -> BlockbusterError {
    BlockbusterError::report(message, ReportErrorKind::UnreadableDatablock)
}
