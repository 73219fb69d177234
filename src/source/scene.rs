use glam::{Mat4, Quat, Vec3};
use slotmap::SlotMap;

use crate::errors::{ExportError, Result};
use crate::source::action::{Action, Channel, ChannelBag};
use crate::source::object::{Collection, LocalTransform, ObjectKind, Rotation, SourceObject};
use crate::source::{ActionKey, CollectionKey, ObjectKey};

/// The evaluated host scene the exporter reads from.
///
/// Object and bone matrices are evaluated at the current frame: rest
/// transforms overridden by the F-curves of each object's bound action slot.
/// The current frame and object visibility are shared evaluation state; the
/// animation baker only changes them through an
/// [`EvaluationScope`](crate::animation::EvaluationScope).
pub struct SourceScene {
    pub(crate) objects: SlotMap<ObjectKey, SourceObject>,
    pub(crate) collections: SlotMap<CollectionKey, Collection>,
    pub(crate) actions: SlotMap<ActionKey, Action>,
    master: CollectionKey,

    frame: f32,
    /// Scene frame rate in frames per second.
    pub fps: f32,
    /// Merge group names, indexed by `SourceObject::merge_group`.
    pub merge_group_names: Vec<String>,
}

impl Default for SourceScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceScene {
    #[must_use]
    pub fn new() -> Self {
        let mut collections = SlotMap::with_key();
        let master = collections.insert(Collection::new("Scene Collection"));
        Self {
            objects: SlotMap::with_key(),
            collections,
            actions: SlotMap::with_key(),
            master,
            frame: 1.0,
            fps: 30.0,
            merge_group_names: Vec::new(),
        }
    }

    // ========================================================================
    // Construction API
    // ========================================================================

    /// Adds an object and links it into `collection`.
    pub fn add_object(&mut self, collection: CollectionKey, name: &str, kind: ObjectKind) -> ObjectKey {
        let key = self.objects.insert(SourceObject::new(name, kind));
        self.link_object(collection, key);
        key
    }

    /// Links an existing object into another collection.
    pub fn link_object(&mut self, collection: CollectionKey, object: ObjectKey) {
        if let Some(c) = self.collections.get_mut(collection)
            && !c.objects.contains(&object)
        {
            c.objects.push(object);
        }
    }

    pub fn add_collection(&mut self, parent: CollectionKey, name: &str) -> CollectionKey {
        let key = self.collections.insert(Collection::new(name));
        if let Some(p) = self.collections.get_mut(parent) {
            p.children.push(key);
        }
        key
    }

    pub fn add_action(&mut self, action: Action) -> ActionKey {
        self.actions.insert(action)
    }

    /// Sets or clears the parent of `child`, keeping both sides in sync.
    pub fn set_parent(&mut self, child: ObjectKey, parent: Option<ObjectKey>) {
        let mut ancestor = parent;
        while let Some(a) = ancestor {
            if a == child {
                log::warn!("Cannot parent an object to itself or one of its descendants!");
                return;
            }
            ancestor = self.objects.get(a).and_then(|o| o.parent);
        }
        let old_parent = self.objects.get(child).and_then(|o| o.parent);
        if let Some(p) = old_parent.and_then(|p| self.objects.get_mut(p)) {
            p.children.retain(|&c| c != child);
        }
        if let Some(p) = parent.and_then(|p| self.objects.get_mut(p)) {
            p.children.push(child);
        }
        if let Some(c) = self.objects.get_mut(child) {
            c.parent = parent;
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn master_collection(&self) -> CollectionKey {
        self.master
    }

    #[must_use]
    pub fn object(&self, key: ObjectKey) -> Option<&SourceObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: ObjectKey) -> Option<&mut SourceObject> {
        self.objects.get_mut(key)
    }

    /// Like [`object`](Self::object) but reports a dangling key as an error.
    pub fn get(&self, key: ObjectKey) -> Result<&SourceObject> {
        self.objects
            .get(key)
            .ok_or_else(|| ExportError::MissingObject(format!("object {key:?}")))
    }

    #[must_use]
    pub fn collection(&self, key: CollectionKey) -> Option<&Collection> {
        self.collections.get(key)
    }

    #[must_use]
    pub fn action(&self, key: ActionKey) -> Option<&Action> {
        self.actions.get(key)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &SourceObject)> {
        self.objects.iter()
    }

    #[must_use]
    pub fn find_object(&self, name: &str) -> Option<ObjectKey> {
        self.objects.iter().find(|(_, o)| o.name == name).map(|(k, _)| k)
    }

    #[must_use]
    pub fn find_collection(&self, name: &str) -> Option<CollectionKey> {
        self.collections.iter().find(|(_, c)| c.name == name).map(|(k, _)| k)
    }

    /// `object` followed by all of its descendants, depth first.
    #[must_use]
    pub fn hierarchy(&self, object: ObjectKey) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut stack = vec![object];
        while let Some(key) = stack.pop() {
            out.push(key);
            if let Some(obj) = self.objects.get(key) {
                stack.extend(obj.children.iter().rev().copied());
            }
        }
        out
    }

    // ========================================================================
    // Evaluation State
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn frame(&self) -> f32 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: f32) {
        self.frame = frame;
    }

    /// Channel bag of the action slot `object` is bound to.
    #[must_use]
    pub fn channelbag(&self, object: ObjectKey) -> Option<&ChannelBag> {
        let anim = self.objects.get(object)?.animation.as_ref()?;
        self.actions.get(anim.action)?.channelbag(&anim.slot)
    }

    /// Object matrix relative to its source parent at the current frame.
    pub fn matrix_local(&self, object: ObjectKey) -> Result<Mat4> {
        let obj = self.get(object)?;
        let mut transform = obj.transform;
        if let Some(bag) = self.channelbag(object) {
            for curve in &bag.fcurves {
                if let (Some(channel), Some(value)) = (curve.object_channel(), curve.evaluate(self.frame)) {
                    transform.apply_channel(channel, curve.array_index, value);
                }
            }
        }
        Ok(transform.to_matrix())
    }

    /// Object matrix in world space at the current frame.
    pub fn matrix_world(&self, object: ObjectKey) -> Result<Mat4> {
        let mut world = self.matrix_local(object)?;
        let mut parent = self.get(object)?.parent;
        while let Some(p) = parent {
            world = self.matrix_local(p)? * world;
            parent = self.get(p)?.parent;
        }
        Ok(world)
    }

    /// Rest matrix of a bone in armature space.
    pub fn bone_rest_matrix(&self, armature: ObjectKey, bone: usize) -> Result<Mat4> {
        self.get(armature)?
            .armature
            .as_ref()
            .and_then(|a| a.bones.get(bone))
            .map(|b| b.matrix_local)
            .ok_or_else(|| ExportError::MissingObject(format!("bone {bone} of armature {armature:?}")))
    }

    /// Posed matrix of a bone in armature space at the current frame.
    ///
    /// `pose = parent_pose · (parent_rest⁻¹ · rest) · basis`, where `basis` is the
    /// bone's animated local transform.
    pub fn pose_matrix(&self, armature: ObjectKey, bone: usize) -> Result<Mat4> {
        let arm = self
            .get(armature)?
            .armature
            .as_ref()
            .ok_or_else(|| ExportError::MissingObject(format!("armature data of {armature:?}")))?;
        let data = arm
            .bones
            .get(bone)
            .ok_or_else(|| ExportError::MissingObject(format!("bone {bone} of armature {armature:?}")))?;

        let basis = self.bone_basis(armature, &data.name);
        match data.parent {
            Some(parent) => {
                let parent_rest = self.bone_rest_matrix(armature, parent)?;
                let parent_pose = self.pose_matrix(armature, parent)?;
                Ok(parent_pose * inverted_safe(parent_rest) * data.matrix_local * basis)
            }
            None => Ok(data.matrix_local * basis),
        }
    }

    fn bone_basis(&self, armature: ObjectKey, bone_name: &str) -> Mat4 {
        let Some(bag) = self.channelbag(armature) else {
            return Mat4::IDENTITY;
        };
        let uses_euler = bag
            .fcurves
            .iter()
            .any(|c| c.bone_channel(bone_name) == Some(Channel::RotationEuler));
        let mut basis = LocalTransform {
            rotation: if uses_euler {
                Rotation::Euler(Vec3::ZERO)
            } else {
                Rotation::Quaternion(Quat::IDENTITY)
            },
            ..LocalTransform::IDENTITY
        };
        for curve in &bag.fcurves {
            if let (Some(channel), Some(value)) = (curve.bone_channel(bone_name), curve.evaluate(self.frame)) {
                basis.apply_channel(channel, curve.array_index, value);
            }
        }
        basis.to_matrix()
    }
}

/// Inverts `m`, falling back to identity for singular matrices.
#[must_use]
pub fn inverted_safe(m: Mat4) -> Mat4 {
    let det = m.determinant();
    if det == 0.0 || !det.is_finite() {
        Mat4::IDENTITY
    } else {
        m.inverse()
    }
}
