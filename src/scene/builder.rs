//! Scene traversal.
//!
//! Walks the export roots and creates one node per exported object:
//!
//! - A collection exports its child collections first (outliner order),
//!   then its parentless objects sorted by natural name.
//! - Objects marked `exclude_from_export` are skipped with their subtree.
//! - Objects whose type is not exported are skipped; their children are
//!   still exported under the current parent.
//! - A collection instance exports the instanced content in place of its
//!   own children. Instancing a collection from inside itself is an error.
//! - Children of a collapsed armature attach to the armature's parent.
//! - In selected-only mode, an object's children are the selected objects
//!   whose nearest selected ancestor is that object.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::binding::AnimationLinks;
use crate::errors::{Diagnostics, ExportError, Result};
use crate::scene::deferred::{DeferredConstraint, DeferredQueue, DeferredShape, MergeGroup};
use crate::scene::graph::SceneGraph;
use crate::scene::node::{ArmatureRoot, BoneNode, MergeGroupMember, NodeKind, NodeOrigin, ShapeBinding};
use crate::scene::resolve::{NodeType, NodeTypeResolver};
use crate::scene::shapes::{ShapeKind, ShapeTable};
use crate::scene::NodeKey;
use crate::settings::{ExportSelection, ExportSettings};
use crate::source::{CollectionKey, ObjectKey, SourceScene};
use crate::utils::sort_by_natural_name;

/// Everything the traversal produced, handed to the later export phases.
#[derive(Debug, Default)]
pub struct BuiltGraph {
    pub graph: SceneGraph,
    /// Source object to the node created for it.
    pub processed: FxHashMap<ObjectKey, NodeKey>,
    /// `(armature object, bone index)` to bone node.
    pub bone_nodes: FxHashMap<(ObjectKey, usize), NodeKey>,
    pub deferred: DeferredQueue,
    pub merge_groups: BTreeMap<usize, MergeGroup>,
    pub shapes: ShapeTable,
    pub animation_links: AnimationLinks,
}

/// Nearest-selected-ancestor map for selected-only exports.
#[derive(Debug, Default)]
struct SelectionMap {
    selected: Vec<ObjectKey>,
    parents: FxHashMap<ObjectKey, ObjectKey>,
}

impl SelectionMap {
    fn new(scene: &SourceScene, selected: &[ObjectKey]) -> Self {
        let set: FxHashSet<ObjectKey> = selected.iter().copied().collect();
        let mut parents = FxHashMap::default();
        for &key in selected {
            let mut ancestor = scene.object(key).and_then(|o| o.parent());
            while let Some(a) = ancestor {
                if set.contains(&a) {
                    parents.insert(key, a);
                    break;
                }
                ancestor = scene.object(a).and_then(|o| o.parent());
            }
        }
        Self {
            selected: selected.to_vec(),
            parents,
        }
    }

    fn roots(&self) -> Vec<ObjectKey> {
        self.selected
            .iter()
            .copied()
            .filter(|k| !self.parents.contains_key(k))
            .collect()
    }

    fn children_of(&self, parent: ObjectKey) -> Vec<ObjectKey> {
        self.selected
            .iter()
            .copied()
            .filter(|k| self.parents.get(k) == Some(&parent))
            .collect()
    }
}

pub struct SceneGraphBuilder<'a> {
    scene: &'a SourceScene,
    settings: &'a ExportSettings,
    export_set: FxHashSet<ObjectKey>,
    selection: Option<SelectionMap>,
    /// Collections whose content is being exported, outermost first.
    active_collections: Vec<CollectionKey>,
    diagnostics: &'a mut Diagnostics,
    out: BuiltGraph,
}

impl<'a> SceneGraphBuilder<'a> {
    #[must_use]
    pub fn new(
        scene: &'a SourceScene,
        settings: &'a ExportSettings,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            scene,
            settings,
            export_set: FxHashSet::default(),
            selection: None,
            active_collections: Vec::new(),
            diagnostics,
            out: BuiltGraph::default(),
        }
    }

    /// Runs the traversal for the configured selection.
    pub fn build(mut self) -> Result<BuiltGraph> {
        match &self.settings.selection {
            ExportSelection::All => {
                log::info!("'Master Collection' export is selected");
                let master = self.scene.master_collection();
                self.export_set = self.collect_collection_objects(master);
                self.export_collection_content(master, None)?;
            }
            ExportSelection::Collection(name) => {
                let collection = self
                    .scene
                    .find_collection(name)
                    .ok_or_else(|| ExportError::CollectionNotFound(name.clone()))?;
                log::info!("'{name}' collection export is selected");
                self.export_set = self.collect_collection_objects(collection);
                self.export_collection_content(collection, None)?;
            }
            ExportSelection::Objects(names) => {
                let selected = names
                    .iter()
                    .map(|name| {
                        self.scene
                            .find_object(name)
                            .ok_or_else(|| ExportError::Configuration(format!("Selected object '{name}' does not exist")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if selected.is_empty() {
                    self.diagnostics.warn("No objects selected, nothing to export");
                    return Ok(self.out);
                }
                self.export_selection(&selected)?;
            }
        }
        log::info!("Scene graph built with {} nodes", self.out.graph.len());
        Ok(self.out)
    }

    // ========================================================================
    // Export Roots
    // ========================================================================

    fn export_selection(&mut self, selected: &[ObjectKey]) -> Result<()> {
        if self.settings.selection_traverse_children {
            log::info!("'Selected Objects' export is selected");
            for &key in selected {
                self.export_set.extend(self.collect_object_hierarchy(key));
            }
            // Selected objects below another selected object come in through their parent.
            let selected_set: FxHashSet<ObjectKey> = selected.iter().copied().collect();
            let mut roots: Vec<ObjectKey> = selected
                .iter()
                .copied()
                .filter(|&k| !self.has_ancestor_in(k, &selected_set))
                .collect();
            self.sort_objects(&mut roots);
            for key in roots {
                self.add_object(key, None)?;
            }
        } else {
            log::info!("'Selected Objects' export is selected, only selected objects are exported");
            self.export_set.extend(selected.iter().copied());
            let map = SelectionMap::new(self.scene, selected);
            let mut roots = map.roots();
            self.selection = Some(map);
            self.sort_objects(&mut roots);
            for key in roots {
                self.add_object(key, None)?;
            }
        }
        Ok(())
    }

    fn export_collection_content(&mut self, collection: CollectionKey, parent: Option<NodeKey>) -> Result<()> {
        let coll = self
            .scene
            .collection(collection)
            .ok_or_else(|| ExportError::MissingObject(format!("collection {collection:?}")))?;
        if self.active_collections.contains(&collection) {
            return Err(ExportError::Configuration(format!(
                "Collection '{}' instances itself through one of its objects",
                coll.name
            )));
        }

        self.active_collections.push(collection);
        for &child in coll.children() {
            self.add_collection(child, parent)?;
        }

        let mut roots: Vec<ObjectKey> = coll
            .objects()
            .iter()
            .copied()
            .filter(|&k| self.scene.object(k).is_some_and(|o| o.parent().is_none()))
            .collect();
        self.sort_objects(&mut roots);
        for key in roots {
            self.add_object(key, parent)?;
        }
        self.active_collections.pop();
        Ok(())
    }

    fn add_collection(&mut self, collection: CollectionKey, parent: Option<NodeKey>) -> Result<()> {
        let name = self
            .scene
            .collection(collection)
            .map(|c| c.name.clone())
            .ok_or_else(|| ExportError::MissingObject(format!("collection {collection:?}")))?;

        let node = if self.settings.keep_collections_as_transform_groups {
            Some(self.out.graph.add_node(
                name,
                NodeOrigin::Collection(collection),
                NodeKind::TransformGroup,
                parent,
            ))
        } else {
            log::info!("[{name}] will be ignored and its children will be added to nearest parent");
            parent
        };
        self.export_collection_content(collection, node)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    fn add_object(&mut self, key: ObjectKey, parent: Option<NodeKey>) -> Result<()> {
        let obj = self.scene.get(key)?;
        if obj.exclude_from_export {
            log::info!("[{}] is excluded from export", obj.name);
            return Ok(());
        }
        if !self.settings.object_types.contains(obj.kind.type_flag()) {
            log::debug!("[{}] has type {:?} which is not exported, skipping the object only", obj.name, obj.kind);
            return self.add_children(key, parent);
        }

        let parent = self.effective_parent(parent);
        let node_type = NodeTypeResolver::new(self.scene, self.settings, &self.export_set)
            .resolve(key, self.diagnostics)?;
        log::debug!("[{}] Resolved as {node_type:?}", obj.name);

        let node = match node_type {
            NodeType::MergeChildren => {
                // Mesh children become part of the shape, none of the children get nodes.
                let node = self.add_object_node(key, NodeKind::MergeChildrenShape(ShapeBinding::default()), parent);
                self.out.deferred.shapes.push(DeferredShape::MergeChildren(node));
                return Ok(());
            }
            NodeType::CollectionInstance(collection) => {
                // The instanced content replaces the object's own children.
                let node = self.add_object_node(key, NodeKind::TransformGroup, parent);
                log::debug!("[{}] Instancing collection content", obj.name);
                return self.export_collection_content(collection, Some(node));
            }
            NodeType::MergeGroup(group) => self.add_merge_group_member(key, group, parent),
            NodeType::SkinnedMesh => {
                let node = self.add_object_node(key, NodeKind::SkinnedMeshShape(ShapeBinding::default()), parent);
                self.out.deferred.shapes.push(DeferredShape::SkinnedMesh(node));
                node
            }
            NodeType::Shape => {
                let shape_id = self.out.shapes.add_or_get(obj.data_name(), ShapeKind::Mesh, vec![key]);
                let binding = ShapeBinding {
                    shape_id: Some(shape_id),
                    skin_bind_node_ids: Vec::new(),
                };
                self.add_object_node(key, NodeKind::Shape(binding), parent)
            }
            NodeType::Armature => self.add_armature(key, parent)?,
            NodeType::TransformGroup => self.add_object_node(key, NodeKind::TransformGroup, parent),
            NodeType::Light => self.add_object_node(key, NodeKind::Light, parent),
            NodeType::Camera => self.add_object_node(key, NodeKind::Camera, parent),
        };

        self.add_children(key, Some(node))
    }

    fn add_children(&mut self, key: ObjectKey, parent: Option<NodeKey>) -> Result<()> {
        let mut children = match &self.selection {
            Some(selection) => selection.children_of(key),
            None => self.scene.get(key)?.children().to_vec(),
        };
        self.sort_objects(&mut children);
        for child in children {
            self.add_object(child, parent)?;
        }
        Ok(())
    }

    /// Creates the node, records it as processed and links its animation.
    fn add_object_node(&mut self, key: ObjectKey, kind: NodeKind, parent: Option<NodeKey>) -> NodeKey {
        let (name, animation) = match self.scene.object(key) {
            Some(obj) => (obj.name.clone(), obj.animation.clone()),
            None => (String::new(), None),
        };
        let node = self.out.graph.add_node(name, NodeOrigin::Object(key), kind, parent);
        self.out.processed.insert(key, node);
        if let Some(anim) = animation {
            self.out.animation_links.link(anim.action, node, anim.slot);
        }
        node
    }

    fn add_merge_group_member(&mut self, key: ObjectKey, group: usize, parent: Option<NodeKey>) -> NodeKey {
        let is_root = !self.out.merge_groups.contains_key(&group);
        let node = self.add_object_node(
            key,
            NodeKind::MergeGroupShape(MergeGroupMember {
                group,
                is_root,
                shape: ShapeBinding::default(),
            }),
            parent,
        );

        if is_root {
            let name = match self.scene.merge_group_names.get(group) {
                Some(name) => name.clone(),
                None => {
                    self.diagnostics
                        .warn(format!("Merge group index {group} has no name, using 'MergeGroup{group}'"));
                    format!("MergeGroup{group}")
                }
            };
            self.out.merge_groups.insert(group, MergeGroup::new(name));
            self.out.deferred.shapes.push(DeferredShape::MergeGroup(group));
        }
        if let Some(merge_group) = self.out.merge_groups.get_mut(&group) {
            merge_group.members.push(node);
        }
        node
    }

    // ========================================================================
    // Armatures
    // ========================================================================

    fn add_armature(&mut self, key: ObjectKey, parent: Option<NodeKey>) -> Result<NodeKey> {
        let obj = self.scene.get(key)?;
        let is_collapsed = obj.collapse_armature;
        let root = self.add_object_node(
            key,
            NodeKind::ArmatureRoot(ArmatureRoot {
                is_collapsed,
                ..ArmatureRoot::default()
            }),
            parent,
        );

        if let Some(armature) = &obj.armature {
            for bone in armature.root_bones() {
                self.add_bone(key, bone, root, root)?;
            }
        }

        if is_collapsed {
            log::debug!("[{}] Collapsed armature, root bones move to its parent", obj.name);
            let bones = self
                .out
                .graph
                .node(root)?
                .kind
                .as_armature()
                .map(|a| a.bones.clone())
                .unwrap_or_default();
            for bone in bones {
                let node = self.out.graph.node(bone)?;
                let child_of = node.kind.as_bone().is_some_and(|b| b.is_child_of);
                if node.parent() == Some(root) && !child_of {
                    self.out.graph.reparent(bone, parent);
                }
            }
        }
        Ok(root)
    }

    fn add_bone(&mut self, armature: ObjectKey, index: usize, parent: NodeKey, root: NodeKey) -> Result<()> {
        let bone = self
            .scene
            .get(armature)?
            .armature
            .as_ref()
            .and_then(|a| a.bones.get(index))
            .ok_or_else(|| ExportError::MissingObject(format!("bone {index} of armature {armature:?}")))?;

        let mut parent = parent;
        let mut is_child_of = false;
        let mut deferred_target = None;
        if let Some(target) = bone.child_of
            && self.export_set.contains(&target)
        {
            is_child_of = true;
            if let Some(&target_node) = self.out.processed.get(&target) {
                parent = target_node;
            } else {
                log::debug!("[{}] Child-of target not processed yet, deferring", bone.name);
                deferred_target = Some(target);
            }
        }

        let node = self.out.graph.add_node(
            bone.name.clone(),
            NodeOrigin::Bone { armature, index },
            NodeKind::Bone(BoneNode {
                armature: root,
                bone: index,
                is_child_of,
                deferred_target,
            }),
            Some(parent),
        );
        if let Some(target) = deferred_target {
            self.out.deferred.constraints.push(DeferredConstraint { bone: node, target });
        }

        let id = self.out.graph.node(node)?.id;
        if let Some(arm) = self.out.graph.get_mut(root).and_then(|n| n.kind.as_armature_mut()) {
            arm.bones.push(node);
            arm.bone_mapping.insert(bone.name.clone(), id);
        }
        self.out.bone_nodes.insert((armature, index), node);

        for &child in &bone.children {
            self.add_bone(armature, child, node, root)?;
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Nodes never attach to a collapsed armature, they go to its parent.
    fn effective_parent(&self, parent: Option<NodeKey>) -> Option<NodeKey> {
        let node = self.out.graph.get(parent?)?;
        match &node.kind {
            NodeKind::ArmatureRoot(a) if a.is_collapsed => node.parent(),
            _ => parent,
        }
    }

    fn sort_objects(&self, objects: &mut [ObjectKey]) {
        sort_by_natural_name(objects, |&k| self.scene.object(k).map_or("", |o| o.name.as_str()));
    }

    fn has_ancestor_in(&self, key: ObjectKey, set: &FxHashSet<ObjectKey>) -> bool {
        let mut ancestor = self.scene.object(key).and_then(|o| o.parent());
        while let Some(a) = ancestor {
            if set.contains(&a) {
                return true;
            }
            ancestor = self.scene.object(a).and_then(|o| o.parent());
        }
        false
    }

    fn collect_object_hierarchy(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        for object in self.scene.hierarchy(key) {
            out.push(object);
            if let Some(instanced) = self.scene.object(object).and_then(|o| o.instance_collection) {
                out.extend(self.collect_collection_objects(instanced));
            }
        }
        out
    }

    /// Every object reachable from `collection`: its objects and their
    /// hierarchies, child collections and instanced collections.
    fn collect_collection_objects(&self, collection: CollectionKey) -> FxHashSet<ObjectKey> {
        let mut out = FxHashSet::default();
        let mut visited = FxHashSet::default();
        let mut stack = vec![collection];
        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }
            let Some(coll) = self.scene.collection(key) else {
                continue;
            };
            stack.extend(coll.children().iter().copied());
            for &object in coll.objects() {
                for member in self.scene.hierarchy(object) {
                    out.insert(member);
                    if let Some(instanced) = self.scene.object(member).and_then(|o| o.instance_collection) {
                        stack.push(instanced);
                    }
                }
            }
        }
        out
    }
}
