//! Reverse-reference discovery: which objects and materials use a datablock.

use crate::model::{BlendData, DatablockId, DatablockKind, ObjectType, SceneObject};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContainerKind {
    Object,
    Material,
}

/// "`container` uses the queried datablock"
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reference {
    pub container: String,
    pub kind: ContainerKind,
}

impl Reference {
    fn object(name: &str) -> Self {
        Reference {
            container: name.to_string(),
            kind: ContainerKind::Object,
        }
    }

    fn material(name: &str) -> Self {
        Reference {
            container: name.to_string(),
            kind: ContainerKind::Material,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " in {}", self.container)
    }
}

enum Visit {
    /// Report a reference as is
    Emit(Reference),
    /// List the containers of a datablock
    Expand(DatablockId),
    /// Report a material and expand it, unless it was already visited
    Claim(DatablockId),
}

/// List every container referencing `target`, in depth-first discovery order.
///
/// Materials reached through texture chains are reported once each and then
/// expanded into the objects using them. Kinds without a rule yield nothing.
pub fn find_references(data: &BlendData, target: DatablockId) -> Vec<Reference> {
    let mut visited = vec![false; data.len()];
    let mut out = Vec::new();
    let mut stack = vec![Visit::Expand(target)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Emit(reference) => out.push(reference),
            Visit::Claim(material) => {
                let Some(seen) = visited.get_mut(material.index()) else {
                    continue;
                };
                if *seen {
                    continue;
                }
                *seen = true;
                stack.push(Visit::Expand(material));
                stack.push(Visit::Emit(Reference::material(&data[material].name)));
            }
            Visit::Expand(id) => {
                let mut children = expand(data, id);
                children.reverse();
                stack.extend(children);
            }
        }
    }

    out
}

fn expand(data: &BlendData, id: DatablockId) -> Vec<Visit> {
    let Some(datablock) = data.get(id) else {
        return Vec::new();
    };

    match datablock.kind() {
        DatablockKind::Material => objects_with(data, ObjectType::Mesh, |object| {
            object
                .material_slots
                .iter()
                .filter(|&&slot| slot == Some(id))
                .count()
        }),
        DatablockKind::Mesh => objects_with(data, ObjectType::Mesh, |object| {
            usize::from(object.data == Some(id))
        }),
        DatablockKind::Armature => objects_with(data, ObjectType::Armature, |object| {
            usize::from(object.data == Some(id))
        }),
        DatablockKind::Image => {
            let mut visits: Vec<Visit> = node_users(data, id)
                .map(|material| Visit::Emit(Reference::material(&data[material].name)))
                .collect();

            for (texture, tex) in data.iter_ids(data.textures()) {
                if tex.texture_image() != Some(id) {
                    continue;
                }
                for (material, mat) in data.iter_ids(data.materials()) {
                    let Some((_, slots)) = mat.as_material() else {
                        continue;
                    };
                    visits.extend(
                        slots
                            .iter()
                            .filter(|&&slot| slot == texture)
                            .map(|_| Visit::Claim(material)),
                    );
                }
            }
            visits
        }
        DatablockKind::Texture => match datablock.texture_image() {
            Some(image) => node_users(data, image).map(Visit::Claim).collect(),
            None => Vec::new(),
        },
        DatablockKind::Light | DatablockKind::Other => Vec::new(),
    }
}

/// One emit per match, so an object using a material in two slots is listed twice
fn objects_with(
    data: &BlendData,
    object_type: ObjectType,
    matches: impl Fn(&SceneObject) -> usize,
) -> Vec<Visit> {
    data.objects()
        .iter()
        .filter(|object| object.object_type == object_type)
        .flat_map(|object| {
            std::iter::repeat_n(object, matches(object))
                .map(|object| Visit::Emit(Reference::object(&object.name)))
        })
        .collect()
}

/// Materials whose node graph holds an image texture node for `image`, once per matching node
fn node_users(data: &BlendData, image: DatablockId) -> impl Iterator<Item = DatablockId> + '_ {
    data.iter_ids(data.materials())
        .flat_map(move |(material, mat)| {
            let count = mat
                .as_material()
                .and_then(|(tree, _)| tree)
                .map(|tree| {
                    tree.nodes
                        .iter()
                        .filter(|node| node.texture_image() == Some(image))
                        .count()
                })
                .unwrap_or(0);
            std::iter::repeat_n(material, count)
        })
}
