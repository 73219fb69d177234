//! JSON scene descriptions.
//!
//! A [`SceneDescription`] is a serializable, name-based snapshot of a host
//! scene. It is what the command line tool reads, and what fixtures use to
//! build a [`SourceScene`] without going through the host application.
//!
//! Names are resolved in declaration order: collections and bones must be
//! declared after their parents, objects may reference any other object.

use std::path::Path;

use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::animation::tracks::InterpolationMode;
use crate::errors::{ExportError, Result};
use crate::source::action::{Action, ChannelBag, FCurve};
use crate::source::object::{AnimationData, LocalTransform, Modifier, ObjectKind, Rotation, quat_from_euler_xyz};
use crate::source::scene::SourceScene;
use crate::source::{ActionKey, CollectionKey, ObjectKey};

fn default_fps() -> f32 {
    30.0
}

fn default_frame() -> f32 {
    1.0
}

fn one3() -> [f32; 3] {
    [1.0; 3]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default = "default_frame")]
    pub frame: f32,
    #[serde(default)]
    pub merge_groups: Vec<String>,
    #[serde(default)]
    pub collections: Vec<CollectionDescription>,
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default)]
    pub actions: Vec<ActionDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
    /// Parent collection, the master collection when absent.
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub parent: Option<String>,
    /// Collections the object is linked into, the master collection when empty.
    #[serde(default)]
    pub collections: Vec<String>,

    #[serde(default)]
    pub translation: [f32; 3],
    /// XYZ Euler rotation in degrees.
    #[serde(default)]
    pub rotation: [f32; 3],
    /// `w x y z`; switches the object to quaternion rotation mode.
    #[serde(default)]
    pub rotation_quaternion: Option<[f32; 4]>,
    #[serde(default = "one3")]
    pub scale: [f32; 3],

    #[serde(default)]
    pub exclude_from_export: bool,
    #[serde(default)]
    pub merge_children: bool,
    #[serde(default)]
    pub merge_group: Option<usize>,
    #[serde(default)]
    pub collapse_armature: bool,
    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub armature_modifiers: Vec<ModifierDescription>,
    #[serde(default)]
    pub instance_collection: Option<String>,
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub vertex_groups: Vec<String>,
    #[serde(default)]
    pub bones: Vec<BoneDescription>,
    #[serde(default)]
    pub animation: Option<AnimationDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierDescription {
    pub name: String,
    #[serde(default)]
    pub object: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDescription {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Rest transform in armature space.
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "one3")]
    pub scale: [f32; 3],
    #[serde(default)]
    pub child_of: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationDescription {
    pub action: String,
    #[serde(default)]
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescription {
    pub name: String,
    pub frame_range: [f32; 2],
    #[serde(default)]
    pub slots: Vec<SlotDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDescription {
    #[serde(default)]
    pub slot: String,
    #[serde(default)]
    pub fcurves: Vec<FCurveDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FCurveDescription {
    pub data_path: String,
    #[serde(default)]
    pub index: usize,
    /// `[frame, value]` pairs.
    pub keyframes: Vec<[f32; 2]>,
    #[serde(default)]
    pub interpolation: InterpolationMode,
}

fn rest_matrix(translation: [f32; 3], rotation_deg: [f32; 3], scale: [f32; 3]) -> Mat4 {
    let euler = Vec3::from_array(rotation_deg).map(f32::to_radians);
    Mat4::from_scale_rotation_translation(
        Vec3::from_array(scale),
        quat_from_euler_xyz(euler),
        Vec3::from_array(translation),
    )
}

fn config_err(msg: String) -> ExportError {
    ExportError::Configuration(msg)
}

impl SceneDescription {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Resolves all names and builds the evaluated scene.
    pub fn into_scene(self) -> Result<SourceScene> {
        let mut scene = SourceScene::new();
        scene.fps = self.fps;
        scene.set_frame(self.frame);
        scene.merge_group_names = self.merge_groups;

        let master = scene.master_collection();
        let mut collections: FxHashMap<String, CollectionKey> = FxHashMap::default();
        for desc in &self.collections {
            let parent = match &desc.parent {
                Some(name) => *collections
                    .get(name)
                    .ok_or_else(|| config_err(format!("Collection '{}' has unknown parent '{name}'", desc.name)))?,
                None => master,
            };
            let key = scene.add_collection(parent, &desc.name);
            collections.insert(desc.name.clone(), key);
        }

        let mut actions: FxHashMap<String, ActionKey> = FxHashMap::default();
        for desc in self.actions {
            let mut action = Action::new(desc.name.clone(), (desc.frame_range[0], desc.frame_range[1]));
            for slot in desc.slots {
                let mut bag = ChannelBag::new(slot.slot);
                for curve in slot.fcurves {
                    let keys = curve.keyframes.iter().map(|k| (k[0], k[1])).collect();
                    bag.fcurves
                        .push(FCurve::new(curve.data_path, curve.index, keys).with_interpolation(curve.interpolation));
                }
                action.channelbags.push(bag);
            }
            actions.insert(desc.name, scene.add_action(action));
        }

        // Pass 1: create every object so references can point forward.
        let mut objects: FxHashMap<String, ObjectKey> = FxHashMap::default();
        for desc in &self.objects {
            let mut linked = desc
                .collections
                .iter()
                .map(|name| {
                    collections
                        .get(name)
                        .copied()
                        .ok_or_else(|| config_err(format!("Object '{}' links unknown collection '{name}'", desc.name)))
                })
                .collect::<Result<Vec<_>>>()?;
            if linked.is_empty() {
                linked.push(master);
            }

            let key = scene.add_object(linked[0], &desc.name, desc.kind);
            for &collection in &linked[1..] {
                scene.link_object(collection, key);
            }
            objects.insert(desc.name.clone(), key);
        }

        let lookup = |name: &str, what: &str| {
            objects
                .get(name)
                .copied()
                .ok_or_else(|| config_err(format!("Unknown {what} '{name}'")))
        };

        // Pass 2: attributes and references.
        for desc in self.objects {
            let key = objects[&desc.name];
            let parent = desc.parent.as_deref().map(|p| lookup(p, "parent object")).transpose()?;
            scene.set_parent(key, parent);

            let modifiers = desc
                .armature_modifiers
                .iter()
                .map(|m| {
                    let object = m.object.as_deref().map(|o| lookup(o, "armature")).transpose()?;
                    Ok(Modifier::Armature {
                        name: m.name.clone(),
                        object,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let instance_collection = desc
                .instance_collection
                .as_deref()
                .map(|name| {
                    collections
                        .get(name)
                        .copied()
                        .ok_or_else(|| config_err(format!("Unknown instance collection '{name}'")))
                })
                .transpose()?;

            let animation = desc
                .animation
                .map(|anim| {
                    actions
                        .get(&anim.action)
                        .map(|&action| AnimationData { action, slot: anim.slot })
                        .ok_or_else(|| config_err(format!("Unknown action '{}'", anim.action)))
                })
                .transpose()?;

            let mut bone_targets = Vec::with_capacity(desc.bones.len());
            for bone in &desc.bones {
                bone_targets.push(bone.child_of.as_deref().map(|t| lookup(t, "child-of target")).transpose()?);
            }

            let Some(obj) = scene.object_mut(key) else {
                continue;
            };
            obj.transform = LocalTransform {
                translation: Vec3::from_array(desc.translation),
                rotation: match desc.rotation_quaternion {
                    Some([w, x, y, z]) => Rotation::Quaternion(Quat::from_xyzw(x, y, z, w)),
                    None => Rotation::Euler(Vec3::from_array(desc.rotation).map(f32::to_radians)),
                },
                scale: Vec3::from_array(desc.scale),
            };
            obj.exclude_from_export = desc.exclude_from_export;
            obj.merge_children = desc.merge_children;
            obj.merge_group = desc.merge_group;
            obj.collapse_armature = desc.collapse_armature;
            obj.hide_viewport = desc.hidden;
            obj.modifiers = modifiers;
            obj.instance_collection = instance_collection;
            obj.mesh_name = desc.mesh;
            obj.vertex_groups = desc.vertex_groups;
            obj.animation = animation;

            if !desc.bones.is_empty() {
                let armature = obj.armature.get_or_insert_with(Default::default);
                for (bone, target) in desc.bones.iter().zip(bone_targets) {
                    let parent = match &bone.parent {
                        Some(name) => Some(armature.find(name).ok_or_else(|| {
                            config_err(format!("Bone '{}' has unknown parent bone '{name}'", bone.name))
                        })?),
                        None => None,
                    };
                    let index = armature.add_bone(
                        bone.name.clone(),
                        parent,
                        rest_matrix(bone.translation, bone.rotation, bone.scale),
                    );
                    armature.set_child_of(index, target);
                }
            }
        }

        Ok(scene)
    }
}

impl SourceScene {
    /// Builds a scene from a JSON [`SceneDescription`].
    pub fn from_json(json: &str) -> Result<Self> {
        SceneDescription::from_json(json)?.into_scene()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        SceneDescription::from_path(path)?.into_scene()
    }
}
