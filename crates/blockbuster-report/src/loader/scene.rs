//! Objects of the active scene

use super::{CODE_GLOBAL, CODE_OBJECT, CODE_SCENE, Loader};
use crate::model::{DatablockId, ObjectType, SceneObject};
use blockbuster_error::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::io::{Read, Seek};

const OB_MESH: i64 = 1;
const OB_ARMATURE: i64 = 25;

pub(crate) fn load_scene_objects<R: Read + Seek>(loader: &mut Loader<'_, R>) -> Result<()> {
    let object_blocks = match active_scene(loader)? {
        Some(scene_index) => scene_object_blocks(loader, scene_index)?,
        None => {
            debug!("No scene found, using every object in the file");
            loader.blend.blocks_by_type(&CODE_OBJECT).to_vec()
        }
    };

    for object_index in object_blocks {
        match read_object(loader, object_index) {
            Ok(object) => loader.data.add_object(object),
            Err(err) => loader.skip(object_index, &err.with_block_index(object_index)),
        }
    }
    Ok(())
}

/// `FileGlobal.curscene`, else the first scene block
fn active_scene<R: Read + Seek>(loader: &mut Loader<'_, R>) -> Result<Option<usize>> {
    let scenes = loader.blend.blocks_by_type(&CODE_SCENE).to_vec();

    if let Some(&glob_index) = loader.blend.blocks_by_type(&CODE_GLOBAL).first() {
        let curscene = {
            let bytes = loader.blend.read_block_data(glob_index)?;
            let reader = loader.blend.create_field_reader(&bytes);
            reader.read_field_pointer("FileGlobal", "curscene").ok()
        };
        if let Some(scene) = curscene
            .and_then(|ptr| loader.resolve(ptr))
            .filter(|index| scenes.contains(index))
        {
            return Ok(Some(scene));
        }
    }

    Ok(scenes.first().copied())
}

/// Object blocks of a scene, each once, in collection order
fn scene_object_blocks<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    scene_index: usize,
) -> Result<Vec<usize>> {
    let (master_collection, base_first) = {
        let bytes = loader.blend.read_block_data(scene_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        let master = if reader.has_field("Scene", "master_collection") {
            reader.read_field_pointer("Scene", "master_collection")?
        } else {
            0
        };
        let base = if reader.has_field("Scene", "base") {
            reader.read_field_listbase_first("Scene", "base")?
        } else {
            0
        };
        (master, base)
    };

    let mut objects = Vec::new();
    let mut seen_objects = HashSet::new();

    if let Some(collection) = loader.resolve(master_collection) {
        let mut seen_collections = HashSet::new();
        collect_collection(loader, collection, &mut seen_collections, &mut seen_objects, &mut objects)?;
    } else {
        for base_index in loader.walk_list(base_first, "Base")? {
            let object_ptr = {
                let bytes = loader.blend.read_block_data(base_index)?;
                let reader = loader.blend.create_field_reader(&bytes);
                reader.read_field_pointer("Base", "object")?
            };
            if let Some(object) = loader.resolve(object_ptr) {
                if seen_objects.insert(object) {
                    objects.push(object);
                }
            }
        }
    }

    debug!("Scene block {scene_index}: {} objects", objects.len());
    Ok(objects)
}

/// Depth-first over `Collection.gobject` then `Collection.children`, each collection once
fn collect_collection<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    root: usize,
    seen_collections: &mut HashSet<usize>,
    seen_objects: &mut HashSet<usize>,
    objects: &mut Vec<usize>,
) -> Result<()> {
    let mut stack = vec![root];

    while let Some(collection) = stack.pop() {
        if !seen_collections.insert(collection) {
            continue;
        }

        let (gobject_first, children_first) = {
            let bytes = loader.blend.read_block_data(collection)?;
            let reader = loader.blend.create_field_reader(&bytes);
            (
                reader.read_field_listbase_first("Collection", "gobject")?,
                reader.read_field_listbase_first("Collection", "children")?,
            )
        };

        for item in loader.walk_list(gobject_first, "CollectionObject")? {
            let object_ptr = {
                let bytes = loader.blend.read_block_data(item)?;
                let reader = loader.blend.create_field_reader(&bytes);
                reader.read_field_pointer("CollectionObject", "ob")?
            };
            if let Some(object) = loader.resolve(object_ptr) {
                if seen_objects.insert(object) {
                    objects.push(object);
                }
            }
        }

        let mut children = Vec::new();
        for child in loader.walk_list(children_first, "CollectionChild")? {
            let collection_ptr = {
                let bytes = loader.blend.read_block_data(child)?;
                let reader = loader.blend.create_field_reader(&bytes);
                reader.read_field_pointer("CollectionChild", "collection")?
            };
            if let Some(child_collection) = loader.resolve(collection_ptr) {
                children.push(child_collection);
            }
        }
        stack.extend(children.into_iter().rev());
    }

    Ok(())
}

fn read_object<R: Read + Seek>(loader: &mut Loader<'_, R>, object_index: usize) -> Result<SceneObject> {
    let (name, type_code, data_ptr, totcol, mat_ptr, matbits_ptr) = {
        let bytes = loader.blend.read_block_data(object_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        let name = reader.read_field_string("ID", "name")?;
        let type_code = reader.read_field_int("Object", "type")?;
        let data_ptr = reader.read_field_pointer("Object", "data")?;
        let totcol = reader.read_field_int("Object", "totcol")?;
        let mat_ptr = reader.read_field_pointer("Object", "mat")?;
        let matbits_ptr = reader.read_field_pointer("Object", "matbits")?;
        (name, type_code, data_ptr, totcol, mat_ptr, matbits_ptr)
    };

    let object_type = match type_code {
        OB_MESH => ObjectType::Mesh,
        OB_ARMATURE => ObjectType::Armature,
        _ => ObjectType::Other,
    };
    let totcol = usize::try_from(totcol).unwrap_or(0);

    let object_mats = loader.read_pointer_array(mat_ptr, totcol)?;
    let matbits = loader.read_bytes(matbits_ptr)?;
    let data_mats = match object_type {
        ObjectType::Mesh => mesh_materials(loader, data_ptr)?,
        _ => Vec::new(),
    };

    let material_slots: Vec<Option<DatablockId>> = (0..totcol)
        .map(|slot| {
            let on_object = matbits.get(slot).is_some_and(|&bit| bit != 0);
            let ptr = if on_object {
                object_mats.get(slot)
            } else {
                data_mats.get(slot)
            };
            ptr.and_then(|&ptr| loader.lookup(ptr))
        })
        .collect();

    if object_type == ObjectType::Mesh && data_ptr != 0 && loader.lookup(data_ptr).is_none() {
        warn!("Object {name} points at mesh data that was not loaded");
    }

    Ok(SceneObject::new(
        name.get(2..).unwrap_or_default(),
        object_type,
        loader.lookup(data_ptr),
    )
    .with_material_slots(material_slots))
}

/// `Mesh.mat` pointers of the mesh behind `data_ptr`
fn mesh_materials<R: Read + Seek>(loader: &mut Loader<'_, R>, data_ptr: u64) -> Result<Vec<u64>> {
    let Some(mesh_index) = loader.resolve(data_ptr) else {
        return Ok(Vec::new());
    };
    if loader.blend.block_struct_name(mesh_index) != Some("Mesh") {
        return Ok(Vec::new());
    }

    let (mat_ptr, totcol) = {
        let bytes = loader.blend.read_block_data(mesh_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        (
            reader.read_field_pointer("Mesh", "mat")?,
            reader.read_field_int("Mesh", "totcol")?,
        )
    };
    loader.read_pointer_array(mat_ptr, usize::try_from(totcol).unwrap_or(0))
}
