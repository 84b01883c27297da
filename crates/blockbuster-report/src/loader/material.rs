//! Payloads of images, textures and materials

use super::id::IdFields;
use super::Loader;
use crate::model::{Datablock, DatablockData, DatablockId, Node, NodeTree, PackedFile, TextureType};
use blockbuster_error::Result;
use log::trace;
use std::io::{Read, Seek};

/// `Tex.type` value of image textures
const TEX_IMAGE: i64 = 8;
/// Legacy `bNode.type` code of the image texture shader node
const SH_NODE_TEX_IMAGE: i64 = 143;
const TEX_IMAGE_IDNAME: &str = "ShaderNodeTexImage";

pub(crate) fn read_image<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    block_index: usize,
    id: IdFields,
) -> Result<Datablock> {
    let (filepath, packed_ptr, packed_list_first) = {
        let bytes = loader.blend.read_block_data(block_index)?;
        let reader = loader.blend.create_field_reader(&bytes);

        let field = if reader.has_field("Image", "filepath") {
            "filepath"
        } else {
            "name"
        };
        let filepath = reader.read_field_string("Image", field)?;

        let packed_ptr = if reader.has_field("Image", "packedfile") {
            reader.read_field_pointer("Image", "packedfile")?
        } else {
            0
        };
        let packed_list_first = if reader.has_field("Image", "packedfiles") {
            reader.read_field_listbase_first("Image", "packedfiles")?
        } else {
            0
        };
        (filepath, packed_ptr, packed_list_first)
    };

    let packed_ptr = if packed_ptr != 0 {
        packed_ptr
    } else if let Some(entry) = loader.resolve(packed_list_first) {
        let bytes = loader.blend.read_block_data(entry)?;
        let reader = loader.blend.create_field_reader(&bytes);
        reader.read_field_pointer("ImagePackedFile", "packedfile")?
    } else {
        0
    };

    let packed_file = match loader.resolve(packed_ptr) {
        Some(packed_index) => {
            let bytes = loader.blend.read_block_data(packed_index)?;
            let reader = loader.blend.create_field_reader(&bytes);
            let size = reader
                .read_field_int("PackedFile", "size")
                .ok()
                .and_then(|size| u64::try_from(size).ok());
            Some(PackedFile { size })
        }
        None => None,
    };

    let mut datablock = id.into_datablock(DatablockData::Image);
    datablock.filepath = (!filepath.is_empty()).then_some(filepath);
    datablock.packed_file = packed_file;
    Ok(datablock)
}

pub(crate) fn read_texture<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    block_index: usize,
    id: IdFields,
) -> Result<Datablock> {
    let (tex_type, image_ptr) = {
        let bytes = loader.blend.read_block_data(block_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        let tex_type = reader.read_field_int("Tex", "type")?;
        let image_ptr = if reader.has_field("Tex", "ima") {
            reader.read_field_pointer("Tex", "ima")?
        } else {
            0
        };
        (tex_type, image_ptr)
    };

    let tex_type = if tex_type == TEX_IMAGE {
        TextureType::Image
    } else {
        TextureType::Other(tex_type.to_string())
    };
    let image = loader.lookup(image_ptr);
    Ok(id.into_datablock(DatablockData::Texture { tex_type, image }))
}

pub(crate) fn read_material<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    block_index: usize,
    id: IdFields,
) -> Result<Datablock> {
    let (nodetree_ptr, mtex_ptrs) = {
        let bytes = loader.blend.read_block_data(block_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        let nodetree = if reader.has_field("Material", "nodetree") {
            reader.read_field_pointer("Material", "nodetree")?
        } else {
            0
        };
        let mtex = if reader.has_field("Material", "mtex") {
            reader.read_field_pointer_array("Material", "mtex")?
        } else {
            Vec::new()
        };
        (nodetree, mtex)
    };

    let node_tree = match loader.resolve(nodetree_ptr) {
        Some(tree_index) => Some(read_node_tree(loader, tree_index)?),
        None => None,
    };

    let mut texture_slots = Vec::new();
    for mtex_ptr in mtex_ptrs {
        let Some(mtex_index) = loader.resolve(mtex_ptr) else {
            continue;
        };
        let tex_ptr = {
            let bytes = loader.blend.read_block_data(mtex_index)?;
            let reader = loader.blend.create_field_reader(&bytes);
            reader.read_field_pointer("MTex", "tex")?
        };
        if let Some(texture) = loader.lookup(tex_ptr) {
            texture_slots.push(texture);
        }
    }

    Ok(id.into_datablock(DatablockData::Material {
        node_tree,
        texture_slots,
    }))
}

/// Nodes of an embedded `bNodeTree`; `nodes` is an inline ListBase
fn read_node_tree<R: Read + Seek>(loader: &mut Loader<'_, R>, tree_index: usize) -> Result<NodeTree> {
    let first = {
        let bytes = loader.blend.read_block_data(tree_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        reader.read_field_listbase_first("bNodeTree", "nodes")?
    };

    let mut nodes = Vec::new();
    for node_index in loader.walk_list(first, "bNode")? {
        let (idname, type_code, id_ptr) = {
            let bytes = loader.blend.read_block_data(node_index)?;
            let reader = loader.blend.create_field_reader(&bytes);
            let idname = if reader.has_field("bNode", "idname") {
                reader.read_field_string("bNode", "idname")?
            } else {
                String::new()
            };
            let type_field = if reader.has_field("bNode", "type_legacy") {
                "type_legacy"
            } else {
                "type"
            };
            let type_code = reader.read_field_int("bNode", type_field).ok();
            let id_ptr = reader.read_field_pointer("bNode", "id")?;
            (idname, type_code, id_ptr)
        };

        let is_tex_image = idname == TEX_IMAGE_IDNAME || type_code == Some(SH_NODE_TEX_IMAGE);
        let node = if is_tex_image {
            Node::tex_image(image_of(loader, id_ptr))
        } else if !idname.is_empty() {
            Node::other(idname)
        } else {
            Node::other(format!("type {}", type_code.unwrap_or_default()))
        };
        nodes.push(node);
    }

    trace!("Node tree block {tree_index}: {} nodes", nodes.len());
    Ok(NodeTree { nodes })
}

/// Loaded image behind `address`; anything else counts as no image
fn image_of<R: Read + Seek>(loader: &Loader<'_, R>, address: u64) -> Option<DatablockId> {
    loader
        .lookup(address)
        .filter(|&id| matches!(loader.data[id].data, DatablockData::Image))
}
