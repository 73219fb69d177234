//! Work that has to wait for the whole graph to exist.
//!
//! - Child-of constraints whose target had no node yet when the bone was created.
//! - Shapes whose geometry or skin bindings depend on other nodes: merge
//!   groups, merge children and skinned meshes.

use crate::errors::{Diagnostics, ExportError, Result};
use crate::scene::builder::BuiltGraph;
use crate::scene::shapes::ShapeKind;
use crate::scene::NodeKey;
use crate::source::{ObjectKey, ObjectKind, SourceScene};

/// A bone waiting for its child-of target's node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredConstraint {
    pub bone: NodeKey,
    pub target: ObjectKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredShape {
    /// Index into the scene's merge groups.
    MergeGroup(usize),
    MergeChildren(NodeKey),
    SkinnedMesh(NodeKey),
}

#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    pub constraints: Vec<DeferredConstraint>,
    pub shapes: Vec<DeferredShape>,
}

/// Members of one merge group, first one carries the geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroup {
    pub name: String,
    pub members: Vec<NodeKey>,
}

impl MergeGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeKey> {
        self.members.first().copied()
    }
}

impl BuiltGraph {
    /// Attaches deferred child-of bones to their targets.
    ///
    /// A target that never got a node leaves the bone where it is, without
    /// the child-of flag; a root bone of a collapsed armature then moves to
    /// the armature's parent like its siblings. Returns the number of
    /// resolved constraints.
    pub fn resolve_deferred_constraints(&mut self, scene: &SourceScene, diagnostics: &mut Diagnostics) -> usize {
        let constraints = std::mem::take(&mut self.deferred.constraints);
        log::info!("Resolving {} deferred child-of constraints", constraints.len());

        let mut resolved = 0;
        for constraint in constraints {
            let Some(bone_name) = self.graph.get(constraint.bone).map(|n| n.name.clone()) else {
                continue;
            };
            let target_name = scene.object(constraint.target).map_or("?", |o| o.name.as_str());

            let attached = match self.processed.get(&constraint.target) {
                Some(&target_node) => self.graph.reparent(constraint.bone, Some(target_node)),
                None => false,
            };

            if attached {
                log::debug!("[{bone_name}] Attached to child-of target '{target_name}'");
                if let Some(bone) = self.graph.get_mut(constraint.bone).and_then(|n| n.kind.as_bone_mut()) {
                    bone.deferred_target = None;
                }
                resolved += 1;
                continue;
            }

            diagnostics.warn(format!(
                "[{bone_name}] Child-of target '{target_name}' is not processed or not in export list. Skipping."
            ));
            let Some(bone) = self.graph.get_mut(constraint.bone).and_then(|n| n.kind.as_bone_mut()) else {
                continue;
            };
            bone.is_child_of = false;
            bone.deferred_target = None;
            let armature = bone.armature;

            let parent = self.graph.get(constraint.bone).and_then(|n| n.parent());
            let collapsed = self
                .graph
                .get(armature)
                .and_then(|n| n.kind.as_armature())
                .is_some_and(|a| a.is_collapsed);
            if collapsed && parent == Some(armature) {
                let armature_parent = self.graph.get(armature).and_then(|n| n.parent());
                self.graph.reparent(constraint.bone, armature_parent);
            }
        }
        resolved
    }

    /// Fills in shape ids and skin bindings of deferred shapes.
    pub fn populate_deferred_shapes(&mut self, scene: &SourceScene, diagnostics: &mut Diagnostics) -> Result<()> {
        let shapes = std::mem::take(&mut self.deferred.shapes);
        log::info!("Processing {} deferred shapes", shapes.len());
        for shape in shapes {
            match shape {
                DeferredShape::MergeGroup(group) => self.populate_merge_group(group)?,
                DeferredShape::MergeChildren(node) => self.populate_merge_children(scene, node)?,
                DeferredShape::SkinnedMesh(node) => self.populate_skinned_mesh(scene, node, diagnostics)?,
            }
        }
        Ok(())
    }

    fn populate_merge_group(&mut self, group: usize) -> Result<()> {
        let Some(merge_group) = self.merge_groups.get(&group) else {
            return Ok(());
        };
        let Some(root) = merge_group.root() else {
            return Ok(());
        };

        let mut member_ids = Vec::with_capacity(merge_group.members.len());
        let mut objects = Vec::with_capacity(merge_group.members.len());
        for &member in &merge_group.members {
            let node = self.graph.node(member)?;
            member_ids.push(node.id);
            objects.extend(node.source_object());
        }

        let shape_name = format!("MergedMesh_{}", merge_group.name);
        let shape_id = self.shapes.add_or_get(&shape_name, ShapeKind::MergeGroup, objects);
        log::debug!("[{shape_name}] Merged {} members", member_ids.len());

        if let Some(binding) = self.graph.get_mut(root).and_then(|n| n.kind.shape_mut()) {
            binding.shape_id = Some(shape_id);
            binding.skin_bind_node_ids = member_ids;
        }
        Ok(())
    }

    fn populate_merge_children(&mut self, scene: &SourceScene, node: NodeKey) -> Result<()> {
        let Some(object) = self.graph.node(node)?.source_object() else {
            return Ok(());
        };
        let obj = scene.get(object)?;

        let mut objects = vec![object];
        for descendant in scene.hierarchy(object).into_iter().skip(1) {
            let child = scene.get(descendant)?;
            if child.kind == ObjectKind::Mesh && !child.exclude_from_export {
                objects.push(descendant);
            }
        }
        log::debug!("[{}] Merging {} child meshes", obj.name, objects.len() - 1);

        let shape_id = self.shapes.add_or_get(obj.data_name(), ShapeKind::MergeChildren, objects);
        if let Some(binding) = self.graph.get_mut(node).and_then(|n| n.kind.shape_mut()) {
            binding.shape_id = Some(shape_id);
        }
        Ok(())
    }

    fn populate_skinned_mesh(
        &mut self,
        scene: &SourceScene,
        node: NodeKey,
        diagnostics: &mut Diagnostics,
    ) -> Result<()> {
        let Some(object) = self.graph.node(node)?.source_object() else {
            return Ok(());
        };
        let obj = scene.get(object)?;

        // Vertex groups are matched against every bound armature, first match wins.
        let mut skin_bind_ids: Vec<u32> = Vec::new();
        for group in &obj.vertex_groups {
            let id = obj.armature_objects().find_map(|armature| {
                let root = self.processed.get(&armature)?;
                self.graph.get(*root)?.kind.as_armature()?.bone_mapping.get(group).copied()
            });
            if let Some(id) = id
                && !skin_bind_ids.contains(&id)
            {
                skin_bind_ids.push(id);
            }
        }

        let shape_name = format!("SkinnedMesh_{}", obj.data_name());
        let shape_id = self.shapes.add_or_get(&shape_name, ShapeKind::Skinned, vec![object]);
        if skin_bind_ids.is_empty() {
            diagnostics.warn(format!(
                "[{}] is skinned but no matching bones were found in its vertex groups",
                obj.name
            ));
        }

        let binding = self
            .graph
            .get_mut(node)
            .and_then(|n| n.kind.shape_mut())
            .ok_or_else(|| ExportError::MissingObject(format!("shape binding of '{}'", obj.name)))?;
        binding.shape_id = Some(shape_id);
        binding.skin_bind_node_ids = skin_bind_ids;
        Ok(())
    }
}
