use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::settings::ObjectTypes;
use crate::source::action::Channel;
use crate::source::{ActionKey, CollectionKey, ObjectKey};

/// Type tag of a source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectKind {
    Mesh,
    Curve,
    Armature,
    Empty,
    Light,
    Camera,
    Lattice,
    Speaker,
    Font,
}

impl ObjectKind {
    /// The flag this kind occupies in [`ObjectTypes`].
    #[must_use]
    pub fn type_flag(self) -> ObjectTypes {
        match self {
            ObjectKind::Mesh => ObjectTypes::MESH,
            ObjectKind::Curve => ObjectTypes::CURVE,
            ObjectKind::Armature => ObjectTypes::ARMATURE,
            ObjectKind::Empty => ObjectTypes::EMPTY,
            ObjectKind::Light => ObjectTypes::LIGHT,
            ObjectKind::Camera => ObjectTypes::CAMERA,
            ObjectKind::Lattice => ObjectTypes::LATTICE,
            ObjectKind::Speaker => ObjectTypes::SPEAKER,
            ObjectKind::Font => ObjectTypes::FONT,
        }
    }
}

/// Builds `Rz · Ry · Rx` from XYZ Euler angles in radians.
#[must_use]
pub fn quat_from_euler_xyz(euler: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZYX, euler.z, euler.y, euler.x)
}

/// Inverse of [`quat_from_euler_xyz`].
#[must_use]
pub fn euler_xyz_from_quat(rotation: Quat) -> Vec3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vec3::new(x, y, z)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    /// XYZ Euler angles in radians.
    Euler(Vec3),
    Quaternion(Quat),
}

impl Rotation {
    #[must_use]
    pub fn to_quat(self) -> Quat {
        match self {
            Rotation::Euler(euler) => quat_from_euler_xyz(euler),
            Rotation::Quaternion(q) => q.normalize(),
        }
    }
}

/// Translation, rotation and scale relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub translation: Vec3,
    pub rotation: Rotation,
    pub scale: Vec3,
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Rotation::Euler(Vec3::ZERO),
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation.to_quat(), self.translation)
    }

    /// Overrides one component with an animated value.
    ///
    /// Rotation curves only apply when they match the active rotation mode.
    /// Quaternion components are ordered `w x y z`.
    pub fn apply_channel(&mut self, channel: Channel, index: usize, value: f32) {
        if index > 3 {
            return;
        }
        match (channel, &mut self.rotation) {
            (Channel::Location, _) if index < 3 => self.translation[index] = value,
            (Channel::Scale, _) if index < 3 => self.scale[index] = value,
            (Channel::RotationEuler, Rotation::Euler(euler)) if index < 3 => euler[index] = value,
            (Channel::RotationQuaternion, Rotation::Quaternion(q)) => {
                let mut wxyz = [q.w, q.x, q.y, q.z];
                wxyz[index] = value;
                *q = Quat::from_xyzw(wxyz[1], wxyz[2], wxyz[3], wxyz[0]);
            }
            _ => {}
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Armature { name: String, object: Option<ObjectKey> },
    Other { name: String },
}

/// Rest bone of an armature.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub children: SmallVec<[usize; 4]>,
    /// Rest matrix in armature space.
    pub matrix_local: Mat4,
    /// Target of the pose bone's child-of constraint.
    pub child_of: Option<ObjectKey>,
}

#[derive(Debug, Clone, Default)]
pub struct Armature {
    pub bones: Vec<Bone>,
}

impl Armature {
    /// Adds a bone and returns its index. `matrix_local` is in armature space.
    pub fn add_bone(&mut self, name: impl Into<String>, parent: Option<usize>, matrix_local: Mat4) -> usize {
        let index = self.bones.len();
        self.bones.push(Bone {
            name: name.into(),
            parent,
            children: SmallVec::new(),
            matrix_local,
            child_of: None,
        });
        if let Some(parent) = parent.and_then(|p| self.bones.get_mut(p)) {
            parent.children.push(index);
        }
        index
    }

    pub fn set_child_of(&mut self, bone: usize, target: Option<ObjectKey>) {
        if let Some(bone) = self.bones.get_mut(bone) {
            bone.child_of = target;
        }
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Bones without a parent bone, in declaration order.
    pub fn root_bones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.parent.is_none())
            .map(|(i, _)| i)
    }
}

/// Binding of an object to an action slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationData {
    pub action: ActionKey,
    pub slot: String,
}

/// A source object as exposed by the host scene.
#[derive(Debug, Clone)]
pub struct SourceObject {
    pub name: String,
    pub kind: ObjectKind,
    pub(crate) parent: Option<ObjectKey>,
    pub(crate) children: Vec<ObjectKey>,

    pub transform: LocalTransform,

    // === Export attributes ===
    pub exclude_from_export: bool,
    pub merge_children: bool,
    pub merge_group: Option<usize>,
    pub collapse_armature: bool,

    // === Data ===
    pub modifiers: Vec<Modifier>,
    pub instance_collection: Option<CollectionKey>,
    pub mesh_name: Option<String>,
    pub vertex_groups: Vec<String>,
    pub armature: Option<Armature>,
    pub animation: Option<AnimationData>,

    pub hide_viewport: bool,
}

impl SourceObject {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            children: Vec::new(),
            transform: LocalTransform::IDENTITY,
            exclude_from_export: false,
            merge_children: false,
            merge_group: None,
            collapse_armature: false,
            modifiers: Vec::new(),
            instance_collection: None,
            mesh_name: None,
            vertex_groups: Vec::new(),
            armature: (kind == ObjectKind::Armature).then(Armature::default),
            animation: None,
            hide_viewport: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectKey> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[ObjectKey] {
        &self.children
    }

    /// Name of the object's data block, falling back to the object name.
    #[must_use]
    pub fn data_name(&self) -> &str {
        self.mesh_name.as_deref().unwrap_or(&self.name)
    }

    /// First armature modifier, if any.
    #[must_use]
    pub fn armature_modifier(&self) -> Option<(&str, Option<ObjectKey>)> {
        self.modifiers.iter().find_map(|m| match m {
            Modifier::Armature { name, object } => Some((name.as_str(), *object)),
            Modifier::Other { .. } => None,
        })
    }

    /// Armatures referenced by any armature modifier.
    pub fn armature_objects(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.modifiers.iter().filter_map(|m| match m {
            Modifier::Armature { object, .. } => *object,
            Modifier::Other { .. } => None,
        })
    }
}

/// A collection groups objects and child collections.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    pub(crate) children: Vec<CollectionKey>,
    pub(crate) objects: Vec<ObjectKey>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            objects: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[CollectionKey] {
        &self.children
    }

    #[inline]
    #[must_use]
    pub fn objects(&self) -> &[ObjectKey] {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn euler_round_trip() {
        let euler = Vec3::new(0.3, -0.4, 1.2);
        let back = euler_xyz_from_quat(quat_from_euler_xyz(euler));
        assert!(back.abs_diff_eq(euler, 1e-5), "{back:?}");
    }

    #[test]
    fn euler_xyz_applies_x_first() {
        // X then Z: +Y goes to +Z, then Z rotation leaves it alone.
        let q = quat_from_euler_xyz(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let v = q * Vec3::Y;
        assert!(v.abs_diff_eq(Vec3::Z, 1e-5), "{v:?}");
    }

    #[test]
    fn quaternion_channel_uses_wxyz_order() {
        let mut t = LocalTransform {
            rotation: Rotation::Quaternion(Quat::IDENTITY),
            ..LocalTransform::IDENTITY
        };
        t.apply_channel(Channel::RotationQuaternion, 0, 0.0);
        t.apply_channel(Channel::RotationQuaternion, 3, 1.0);
        assert_eq!(t.rotation, Rotation::Quaternion(Quat::from_xyzw(0.0, 0.0, 1.0, 0.0)));
    }

    #[test]
    fn euler_curve_ignored_in_quaternion_mode() {
        let mut t = LocalTransform {
            rotation: Rotation::Quaternion(Quat::IDENTITY),
            ..LocalTransform::IDENTITY
        };
        t.apply_channel(Channel::RotationEuler, 0, 1.0);
        assert_eq!(t.rotation, Rotation::Quaternion(Quat::IDENTITY));
    }
}
