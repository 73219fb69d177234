//! Local transform resolution.
//!
//! Every node's local matrix is computed in the target basis from the
//! source scene. Objects use the sandwich conversion; bones use one of four
//! cases depending on where they ended up in the graph:
//!
//! | case | parent                         | local matrix                               |
//! |------|--------------------------------|--------------------------------------------|
//! | 1    | another bone                   | `parent_bone⁻¹ · bone`                     |
//! | 2    | resolved child-of target       | `target_world⁻¹ · armature_world · C·bone` |
//! | 3    | collapsed armature's parent    | `parent_world⁻¹ · armature_world · C·bone` |
//! | 4    | its own armature               | `C·bone`                                   |
//!
//! `bone` is the rest matrix while building the hierarchy and the pose
//! matrix while baking animation.

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::scene::convert::AxisConversion;
use crate::scene::graph::SceneGraph;
use crate::scene::node::{BoneNode, NodeKind, NodeOrigin, SceneNode};
use crate::scene::NodeKey;
use crate::source::object::euler_xyz_from_quat;
use crate::source::{ObjectKey, SourceScene, inverted_safe};

/// Decomposed local transform. Rotation is XYZ Euler in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Trs {
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation: euler_xyz_from_quat(rotation).map(f32::to_degrees),
            scale,
        }
    }
}

/// Which bone matrix feeds the bone cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneMatrixSource {
    Rest,
    Pose,
}

/// The transform case a bone node falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneCase {
    ParentBone,
    ChildOf,
    CollapsedRoot,
    ArmatureSpace,
}

/// Computes local matrices for nodes of a graph against a source scene.
pub struct TransformResolver<'a> {
    scene: &'a SourceScene,
    graph: &'a SceneGraph,
    conversion: &'a AxisConversion,
    bones: BoneMatrixSource,
}

impl<'a> TransformResolver<'a> {
    #[must_use]
    pub fn new(
        scene: &'a SourceScene,
        graph: &'a SceneGraph,
        conversion: &'a AxisConversion,
        bones: BoneMatrixSource,
    ) -> Self {
        Self {
            scene,
            graph,
            conversion,
            bones,
        }
    }

    /// Local matrix of `key` in the target basis.
    pub fn local_matrix(&self, key: NodeKey) -> Result<Mat4> {
        let node = self.graph.node(key)?;
        match (&node.kind, node.origin) {
            (NodeKind::Bone(bone), NodeOrigin::Bone { armature, index }) => {
                self.bone_local(node, bone, armature, index)
            }
            (_, NodeOrigin::Object(object)) => self.object_local(node, object),
            _ => Ok(Mat4::IDENTITY),
        }
    }

    /// Which case [`local_matrix`](Self::local_matrix) applies to a bone node.
    pub fn bone_case(&self, node: &SceneNode, bone: &BoneNode) -> Result<BoneCase> {
        let parent = node.parent.map(|p| self.graph.node(p)).transpose()?;
        if parent.is_some_and(|p| matches!(p.kind, NodeKind::Bone(_))) {
            return Ok(BoneCase::ParentBone);
        }
        if bone.is_child_of && bone.deferred_target.is_none() && parent.is_some() {
            return Ok(BoneCase::ChildOf);
        }
        let collapsed = self
            .graph
            .node(bone.armature)?
            .kind
            .as_armature()
            .is_some_and(|a| a.is_collapsed);
        if collapsed {
            Ok(BoneCase::CollapsedRoot)
        } else {
            Ok(BoneCase::ArmatureSpace)
        }
    }

    fn bone_matrix(&self, armature: ObjectKey, index: usize) -> Result<Mat4> {
        match self.bones {
            BoneMatrixSource::Rest => self.scene.bone_rest_matrix(armature, index),
            BoneMatrixSource::Pose => self.scene.pose_matrix(armature, index),
        }
    }

    fn bone_local(&self, node: &SceneNode, bone: &BoneNode, armature: ObjectKey, index: usize) -> Result<Mat4> {
        let matrix = self.bone_matrix(armature, index)?;
        let case = self.bone_case(node, bone)?;
        log::trace!("[{}] Bone transform case {case:?}", node.name);

        if case == BoneCase::ParentBone
            && let Some(parent) = node.parent
        {
            // Both matrices live in the same armature space, no conversion needed.
            let parent_matrix = match self.graph.node(parent)?.origin {
                NodeOrigin::Bone { armature, index } => self.bone_matrix(armature, index)?,
                _ => Mat4::IDENTITY,
            };
            return Ok(inverted_safe(parent_matrix) * matrix);
        }

        let bone_in_armature = self.conversion.to_target_forward(matrix);
        match case {
            BoneCase::ChildOf | BoneCase::CollapsedRoot => {
                let armature_world = self.conversion.to_target(self.scene.matrix_world(armature)?);
                let parent_world = match node.parent {
                    Some(p) => self.conversion.to_target(self.source_world(p)?),
                    None => Mat4::IDENTITY,
                };
                Ok(inverted_safe(parent_world) * armature_world * bone_in_armature)
            }
            _ => Ok(bone_in_armature),
        }
    }

    fn object_local(&self, node: &SceneNode, object: ObjectKey) -> Result<Mat4> {
        let source_parent = self.scene.get(object)?.parent();
        let graph_parent = node.parent.map(|p| self.graph.node(p)).transpose()?;

        let parents_match = match graph_parent.map(|p| p.origin) {
            None | Some(NodeOrigin::Collection(_)) => source_parent.is_none(),
            Some(NodeOrigin::Object(parent)) => {
                source_parent == Some(parent)
                    || (source_parent.is_none()
                        && self.scene.get(parent)?.instance_collection.is_some())
            }
            Some(NodeOrigin::Bone { .. }) => false,
        };

        let local = if parents_match {
            self.scene.matrix_local(object)?
        } else {
            // The graph parent differs from the source parent, express the
            // object's world matrix relative to the graph parent instead.
            let parent_world = match node.parent {
                Some(p) => self.source_world(p)?,
                None => Mat4::IDENTITY,
            };
            inverted_safe(parent_world) * self.scene.matrix_world(object)?
        };
        Ok(self.conversion.to_target(local))
    }

    /// World matrix of a node's origin in the source basis.
    fn source_world(&self, key: NodeKey) -> Result<Mat4> {
        let node = self.graph.node(key)?;
        match node.origin {
            NodeOrigin::Collection(_) => Ok(Mat4::IDENTITY),
            NodeOrigin::Object(object) => self.scene.matrix_world(object),
            NodeOrigin::Bone { armature, index } => {
                Ok(self.scene.matrix_world(armature)? * self.bone_matrix(armature, index)?)
            }
        }
    }
}

/// Computes and stores the local matrix of every node, parents first.
pub fn finalize_transforms(graph: &mut SceneGraph, scene: &SourceScene, conversion: &AxisConversion) -> Result<()> {
    let order = graph.depth_first();
    let locals = {
        let resolver = TransformResolver::new(scene, graph, conversion, BoneMatrixSource::Rest);
        order
            .iter()
            .map(|&key| resolver.local_matrix(key).map(|m| (key, m)))
            .collect::<Result<Vec<_>>>()?
    };
    for (key, matrix) in locals {
        graph.finalize_transform(key, matrix)?;
    }
    log::debug!("Finalized {} node transforms", order.len());
    Ok(())
}
