use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::output::record::{NodeElement, NodeRecord};
use crate::scene::NodeKey;
use crate::scene::transform::Trs;
use crate::source::{CollectionKey, ObjectKey};

/// What a node was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOrigin {
    Collection(CollectionKey),
    Object(ObjectKey),
    Bone { armature: ObjectKey, index: usize },
}

/// Reference from a shape node into the shape table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeBinding {
    /// Assigned once the geometry is known; deferred shapes get it after traversal.
    pub shape_id: Option<u32>,
    /// Ordered node ids the geometry is skinned to, empty when unskinned.
    pub skin_bind_node_ids: Vec<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct ArmatureRoot {
    /// Bone nodes in creation order.
    pub bones: Vec<NodeKey>,
    /// Bone name to node id.
    pub bone_mapping: FxHashMap<String, u32>,
    /// Collapsed armatures emit no node of their own.
    pub is_collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoneNode {
    /// The owning [`ArmatureRoot`] node.
    pub armature: NodeKey,
    /// Index into the source armature's bone list.
    pub bone: usize,
    pub is_child_of: bool,
    /// Child-of target that had no node yet when the bone was created.
    pub deferred_target: Option<ObjectKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeGroupMember {
    pub group: usize,
    /// The first member carries the combined geometry.
    pub is_root: bool,
    pub shape: ShapeBinding,
}

/// Node variants.
#[derive(Debug, Clone)]
pub enum NodeKind {
    TransformGroup,
    Shape(ShapeBinding),
    SkinnedMeshShape(ShapeBinding),
    MergeGroupShape(MergeGroupMember),
    MergeChildrenShape(ShapeBinding),
    ArmatureRoot(ArmatureRoot),
    Bone(BoneNode),
    Light,
    Camera,
}

impl NodeKind {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::TransformGroup => "TransformGroup",
            NodeKind::Shape(_) => "Shape",
            NodeKind::SkinnedMeshShape(_) => "SkinnedMeshShape",
            NodeKind::MergeGroupShape(_) => "MergeGroupShape",
            NodeKind::MergeChildrenShape(_) => "MergeChildrenShape",
            NodeKind::ArmatureRoot(_) => "ArmatureRoot",
            NodeKind::Bone(_) => "Bone",
            NodeKind::Light => "Light",
            NodeKind::Camera => "Camera",
        }
    }

    /// Element the node is written as.
    #[must_use]
    pub fn element(&self) -> NodeElement {
        match self {
            NodeKind::Shape(_) | NodeKind::SkinnedMeshShape(_) | NodeKind::MergeChildrenShape(_) => NodeElement::Shape,
            NodeKind::MergeGroupShape(member) if member.is_root => NodeElement::Shape,
            NodeKind::Light => NodeElement::Light,
            NodeKind::Camera => NodeElement::Camera,
            _ => NodeElement::TransformGroup,
        }
    }

    #[must_use]
    pub fn shape(&self) -> Option<&ShapeBinding> {
        match self {
            NodeKind::Shape(s) | NodeKind::SkinnedMeshShape(s) | NodeKind::MergeChildrenShape(s) => Some(s),
            NodeKind::MergeGroupShape(m) if m.is_root => Some(&m.shape),
            _ => None,
        }
    }

    pub fn shape_mut(&mut self) -> Option<&mut ShapeBinding> {
        match self {
            NodeKind::Shape(s) | NodeKind::SkinnedMeshShape(s) | NodeKind::MergeChildrenShape(s) => Some(s),
            NodeKind::MergeGroupShape(m) => Some(&mut m.shape),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bone(&self) -> Option<&BoneNode> {
        match self {
            NodeKind::Bone(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bone_mut(&mut self) -> Option<&mut BoneNode> {
        match self {
            NodeKind::Bone(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_armature(&self) -> Option<&ArmatureRoot> {
        match self {
            NodeKind::ArmatureRoot(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_armature_mut(&mut self) -> Option<&mut ArmatureRoot> {
        match self {
            NodeKind::ArmatureRoot(a) => Some(a),
            _ => None,
        }
    }
}

/// One node of the output scene graph.
///
/// The [`SceneGraph`](super::SceneGraph) owns all nodes. `parent` is a
/// back-reference; `children` is the owning, ordered edge list. Both sides
/// are only changed through the graph so they never disagree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Unique, assigned in creation order.
    pub id: u32,
    pub name: String,
    pub origin: NodeOrigin,
    pub kind: NodeKind,

    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Vec<NodeKey>,

    /// Local matrix in the target basis, valid once `finalized`.
    pub(crate) transform: Mat4,
    pub(crate) finalized: bool,
}

impl SceneNode {
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The finalized local matrix, `None` before finalization.
    #[must_use]
    pub fn transform(&self) -> Option<Mat4> {
        self.finalized.then_some(self.transform)
    }

    /// Collapsed armatures stay in the graph but produce no output node.
    #[must_use]
    pub fn is_emitted(&self) -> bool {
        !matches!(&self.kind, NodeKind::ArmatureRoot(a) if a.is_collapsed)
    }

    #[must_use]
    pub fn source_object(&self) -> Option<ObjectKey> {
        match self.origin {
            NodeOrigin::Object(key) => Some(key),
            _ => None,
        }
    }

    /// The record handed to the serialization sink.
    #[must_use]
    pub fn populate_output(&self) -> NodeRecord {
        let trs = Trs::from_matrix(self.transform);
        let shape = self.kind.shape();
        NodeRecord {
            id: self.id,
            name: self.name.clone(),
            element: self.kind.element(),
            translation: trs.translation,
            rotation: trs.rotation,
            scale: trs.scale,
            shape_id: shape.and_then(|s| s.shape_id),
            skin_bind_node_ids: shape.map(|s| s.skin_bind_node_ids.clone()).unwrap_or_default(),
        }
    }
}
