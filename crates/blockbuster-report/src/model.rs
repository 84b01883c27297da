//! Read-only snapshot of a document's datablocks and scene objects.
//!
//! A [`BlendData`] is either built by hand through [`BlendData::add_datablock`]
//! and [`BlendData::add_object`] or produced by [`crate::loader::load_blend_data`].
//! Datablocks live in an arena and refer to each other by [`DatablockId`].

use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Arena index of a datablock inside one [`BlendData`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DatablockId(usize);

impl DatablockId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DatablockKind {
    Mesh,
    Material,
    Texture,
    Image,
    Light,
    Armature,
    Other,
}

impl fmt::Display for DatablockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DatablockKind::Mesh => "Mesh",
            DatablockKind::Material => "Material",
            DatablockKind::Texture => "Texture",
            DatablockKind::Image => "Image",
            DatablockKind::Light => "Light",
            DatablockKind::Armature => "Armature",
            DatablockKind::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Payload embedded in the document rather than stored in an external file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PackedFile {
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NodeType {
    /// Image texture shader node
    TexImage,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Node {
    pub node_type: NodeType,
    pub image: Option<DatablockId>,
}

impl Node {
    pub fn tex_image(image: Option<DatablockId>) -> Self {
        Node {
            node_type: NodeType::TexImage,
            image,
        }
    }

    pub fn other(label: impl Into<String>) -> Self {
        Node {
            node_type: NodeType::Other(label.into()),
            image: None,
        }
    }

    /// Image referenced by this node if it is an image texture node
    pub fn texture_image(&self) -> Option<DatablockId> {
        match self.node_type {
            NodeType::TexImage => self.image,
            NodeType::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TextureType {
    Image,
    Other(String),
}

/// Kind-specific part of a datablock
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DatablockData {
    Mesh,
    Material {
        node_tree: Option<NodeTree>,
        /// Textures in the legacy texture slots
        texture_slots: Vec<DatablockId>,
    },
    Texture {
        tex_type: TextureType,
        image: Option<DatablockId>,
    },
    Image,
    Light,
    Armature,
    /// Any other datablock type, with its type label
    Other(String),
}

impl DatablockData {
    pub fn kind(&self) -> DatablockKind {
        match self {
            DatablockData::Mesh => DatablockKind::Mesh,
            DatablockData::Material { .. } => DatablockKind::Material,
            DatablockData::Texture { .. } => DatablockKind::Texture,
            DatablockData::Image => DatablockKind::Image,
            DatablockData::Light => DatablockKind::Light,
            DatablockData::Armature => DatablockKind::Armature,
            DatablockData::Other(_) => DatablockKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Datablock {
    pub name: String,
    /// Reference count, when the host exposes one
    pub users: Option<u32>,
    /// Number of entries in the reverse user map, when available
    pub user_map: Option<usize>,
    /// Host-reported shallow in-memory size in bytes
    pub shallow_size: u64,
    pub packed_file: Option<PackedFile>,
    pub filepath: Option<String>,
    /// File path of the owning library for linked datablocks
    pub library: Option<String>,
    pub data: DatablockData,
}

impl Datablock {
    pub fn new(name: impl Into<String>, data: DatablockData) -> Self {
        Datablock {
            name: name.into(),
            users: None,
            user_map: None,
            shallow_size: 0,
            packed_file: None,
            filepath: None,
            library: None,
            data,
        }
    }

    pub fn mesh(name: impl Into<String>) -> Self {
        Self::new(name, DatablockData::Mesh)
    }

    pub fn image(name: impl Into<String>) -> Self {
        Self::new(name, DatablockData::Image)
    }

    pub fn light(name: impl Into<String>) -> Self {
        Self::new(name, DatablockData::Light)
    }

    pub fn armature(name: impl Into<String>) -> Self {
        Self::new(name, DatablockData::Armature)
    }

    pub fn material(
        name: impl Into<String>,
        node_tree: Option<NodeTree>,
        texture_slots: Vec<DatablockId>,
    ) -> Self {
        Self::new(
            name,
            DatablockData::Material {
                node_tree,
                texture_slots,
            },
        )
    }

    pub fn texture(name: impl Into<String>, tex_type: TextureType, image: Option<DatablockId>) -> Self {
        Self::new(name, DatablockData::Texture { tex_type, image })
    }

    pub fn with_users(mut self, users: u32) -> Self {
        self.users = Some(users);
        self
    }

    pub fn with_user_map(mut self, entries: usize) -> Self {
        self.user_map = Some(entries);
        self
    }

    pub fn with_shallow_size(mut self, bytes: u64) -> Self {
        self.shallow_size = bytes;
        self
    }

    pub fn with_packed_file(mut self, size: Option<u64>) -> Self {
        self.packed_file = Some(PackedFile { size });
        self
    }

    pub fn with_filepath(mut self, filepath: impl Into<String>) -> Self {
        self.filepath = Some(filepath.into());
        self
    }

    pub fn with_library(mut self, library_filepath: impl Into<String>) -> Self {
        self.library = Some(library_filepath.into());
        self
    }

    pub fn kind(&self) -> DatablockKind {
        self.data.kind()
    }

    /// Material node graph and texture slots, `None` for other kinds
    pub fn as_material(&self) -> Option<(Option<&NodeTree>, &[DatablockId])> {
        match &self.data {
            DatablockData::Material {
                node_tree,
                texture_slots,
            } => Some((node_tree.as_ref(), texture_slots.as_slice())),
            _ => None,
        }
    }

    /// Image wrapped by an image-type texture
    pub fn texture_image(&self) -> Option<DatablockId> {
        match &self.data {
            DatablockData::Texture {
                tex_type: TextureType::Image,
                image,
            } => *image,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObjectType {
    Mesh,
    Armature,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SceneObject {
    pub name: String,
    pub object_type: ObjectType,
    pub data: Option<DatablockId>,
    pub material_slots: Vec<Option<DatablockId>>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, object_type: ObjectType, data: Option<DatablockId>) -> Self {
        SceneObject {
            name: name.into(),
            object_type,
            data,
            material_slots: Vec::new(),
        }
    }

    pub fn with_material_slots(mut self, slots: Vec<Option<DatablockId>>) -> Self {
        self.material_slots = slots;
        self
    }
}

/// Snapshot of a document: datablock arena, typed collections and active scene objects
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlendData {
    datablocks: Vec<Datablock>,
    meshes: Vec<DatablockId>,
    materials: Vec<DatablockId>,
    textures: Vec<DatablockId>,
    images: Vec<DatablockId>,
    lights: Vec<DatablockId>,
    armatures: Vec<DatablockId>,
    objects: Vec<SceneObject>,
    base_dir: Option<PathBuf>,
    warnings: Vec<String>,
}

impl BlendData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a datablock to the arena and to the collection of its kind
    pub fn add_datablock(&mut self, datablock: Datablock) -> DatablockId {
        let id = DatablockId(self.datablocks.len());
        match datablock.kind() {
            DatablockKind::Mesh => self.meshes.push(id),
            DatablockKind::Material => self.materials.push(id),
            DatablockKind::Texture => self.textures.push(id),
            DatablockKind::Image => self.images.push(id),
            DatablockKind::Light => self.lights.push(id),
            DatablockKind::Armature => self.armatures.push(id),
            DatablockKind::Other => {}
        }
        self.datablocks.push(datablock);
        id
    }

    /// Add an object of the active scene
    pub fn add_object(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Directory that `//`-prefixed paths are relative to
    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = Some(dir.into());
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn get(&self, id: DatablockId) -> Option<&Datablock> {
        self.datablocks.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.datablocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datablocks.is_empty()
    }

    pub fn meshes(&self) -> &[DatablockId] {
        &self.meshes
    }

    pub fn materials(&self) -> &[DatablockId] {
        &self.materials
    }

    pub fn textures(&self) -> &[DatablockId] {
        &self.textures
    }

    pub fn images(&self) -> &[DatablockId] {
        &self.images
    }

    pub fn lights(&self) -> &[DatablockId] {
        &self.lights
    }

    pub fn armatures(&self) -> &[DatablockId] {
        &self.armatures
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Iterate a typed collection together with the datablocks it names
    pub fn iter_ids<'a>(
        &'a self,
        ids: &'a [DatablockId],
    ) -> impl Iterator<Item = (DatablockId, &'a Datablock)> + 'a {
        ids.iter()
            .filter_map(move |&id| self.get(id).map(|db| (id, db)))
    }
}

impl Index<DatablockId> for BlendData {
    type Output = Datablock;

    fn index(&self, id: DatablockId) -> &Datablock {
        &self.datablocks[id.0]
    }
}
