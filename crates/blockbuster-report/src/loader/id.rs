use super::{Loader, unreadable};
use crate::model::{Datablock, DatablockData};
use blockbuster_error::Result;
use std::io::{Read, Seek};

/// Fields shared by every ID block
pub(crate) struct IdFields {
    pub name: String,
    pub users: u32,
    pub library: Option<String>,
    pub shallow_size: u64,
}

impl IdFields {
    pub fn into_datablock(self, data: DatablockData) -> Datablock {
        let tracks_users = matches!(data, DatablockData::Mesh | DatablockData::Material { .. });
        let mut datablock = Datablock::new(self.name, data)
            .with_users(self.users)
            .with_shallow_size(self.shallow_size);
        if tracks_users {
            datablock.user_map = Some(self.users as usize);
        }
        datablock.library = self.library;
        datablock
    }
}

/// Read the embedded `ID` at the start of an ID block
pub(crate) fn read_id<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    block_index: usize,
) -> Result<IdFields> {
    let shallow_size = loader
        .blend
        .get_block(block_index)
        .map(|b| b.header.size)
        .ok_or_else(|| unreadable(format!("No block at index {block_index}")))?;

    let (raw_name, users, lib_ptr) = {
        let bytes = loader.blend.read_block_data(block_index)?;
        let reader = loader.blend.create_field_reader(&bytes);
        let name = reader.read_field_string("ID", "name")?;
        let users = reader.read_field_int("ID", "us")?;
        let lib = reader.read_field_pointer("ID", "lib")?;
        (name, users, lib)
    };

    // The first two characters are the type code, e.g. "ME" in "MECube"
    let name = raw_name.get(2..).unwrap_or_default().to_string();

    let library = match loader.resolve(lib_ptr) {
        Some(lib_index) => read_library_path(loader, lib_index)?,
        None => None,
    };

    Ok(IdFields {
        name,
        users: u32::try_from(users.max(0)).unwrap_or(u32::MAX),
        library,
        shallow_size,
    })
}

/// File path of a `Library` block; older files keep it in `name`
fn read_library_path<R: Read + Seek>(
    loader: &mut Loader<'_, R>,
    lib_index: usize,
) -> Result<Option<String>> {
    let bytes = loader.blend.read_block_data(lib_index)?;
    let reader = loader.blend.create_field_reader(&bytes);

    let path = if reader.has_field("Library", "filepath") {
        reader.read_field_string("Library", "filepath")?
    } else {
        String::new()
    };
    let path = if path.is_empty() && reader.has_field("Library", "name") {
        reader.read_field_string("Library", "name")?
    } else {
        path
    };

    Ok((!path.is_empty()).then_some(path))
}
