use rustc_hash::FxHashSet;

use crate::errors::{Diagnostics, ExportError, Result};
use crate::settings::{ExportSettings, Features, ObjectTypes};
use crate::source::{CollectionKey, ObjectKey, ObjectKind, SourceObject, SourceScene};

/// Node variant chosen for a source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    TransformGroup,
    /// Empty that instances a collection; the node takes the collection's content.
    CollectionInstance(CollectionKey),
    Shape,
    SkinnedMesh,
    MergeGroup(usize),
    MergeChildren,
    Armature,
    Light,
    Camera,
}

/// Maps source objects to node variants.
///
/// Mesh precedence is MergeChildren, then MergeGroup, then SkinnedMesh, then
/// plain Shape. A feature that cannot apply falls through to the next one
/// with a warning instead of failing the export.
pub struct NodeTypeResolver<'a> {
    scene: &'a SourceScene,
    settings: &'a ExportSettings,
    export_set: &'a FxHashSet<ObjectKey>,
}

impl<'a> NodeTypeResolver<'a> {
    #[must_use]
    pub fn new(scene: &'a SourceScene, settings: &'a ExportSettings, export_set: &'a FxHashSet<ObjectKey>) -> Self {
        Self {
            scene,
            settings,
            export_set,
        }
    }

    pub fn resolve(&self, key: ObjectKey, diagnostics: &mut Diagnostics) -> Result<NodeType> {
        let obj = self.scene.get(key)?;
        let node_type = match obj.kind {
            ObjectKind::Mesh => self.resolve_mesh(obj, diagnostics),
            ObjectKind::Curve => NodeType::Shape,
            ObjectKind::Armature => NodeType::Armature,
            ObjectKind::Empty => match obj.instance_collection {
                Some(collection) => NodeType::CollectionInstance(collection),
                None => NodeType::TransformGroup,
            },
            ObjectKind::Light => NodeType::Light,
            ObjectKind::Camera => NodeType::Camera,
            kind @ (ObjectKind::Lattice | ObjectKind::Speaker | ObjectKind::Font) => {
                return Err(ExportError::UnsupportedObjectType {
                    name: obj.name.clone(),
                    kind,
                });
            }
        };
        Ok(node_type)
    }

    fn resolve_mesh(&self, obj: &SourceObject, diagnostics: &mut Diagnostics) -> NodeType {
        if self.settings.has(Features::MERGE_CHILDREN) && obj.merge_children {
            let has_mesh_children = obj
                .children()
                .iter()
                .filter_map(|&c| self.scene.object(c))
                .any(|c| c.kind == ObjectKind::Mesh);
            if has_mesh_children {
                return NodeType::MergeChildren;
            }
            diagnostics.warn(format!(
                "[{}] is marked as 'MergeChildren' but has no child meshes. Exporting as regular Shape.",
                obj.name
            ));
            return NodeType::Shape;
        }

        if self.settings.has(Features::MERGE_GROUPS)
            && let Some(group) = obj.merge_group
        {
            return NodeType::MergeGroup(group);
        }

        if self.settings.has(Features::SKINNED_MESHES)
            && self.settings.object_types.contains(ObjectTypes::ARMATURE)
            && let Some((modifier, target)) = obj.armature_modifier()
        {
            match target {
                None => diagnostics.warn(format!(
                    "[{}] has an armature modifier '{modifier}' without an armature object. Exporting as regular Shape.",
                    obj.name
                )),
                Some(armature) if !self.export_set.contains(&armature) => {
                    let armature_name = self.scene.object(armature).map_or("?", |a| a.name.as_str());
                    diagnostics.warn(format!(
                        "[{}] has an armature modifier, but the armature '{armature_name}' is not included in the export. Exporting as regular Shape.",
                        obj.name
                    ));
                }
                Some(_) => return NodeType::SkinnedMesh,
            }
        }

        NodeType::Shape
    }
}
