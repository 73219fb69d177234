//! Source scene model.
//!
//! The exporter does not talk to the host application directly. It reads a
//! [`SourceScene`]: objects, collections, armatures and actions, evaluated at
//! a current frame.
//!
//! - [`SourceObject`]: one host object with its export attributes
//! - [`Collection`]: grouping of objects and child collections
//! - [`Armature`] / [`Bone`]: rest skeleton of an armature object
//! - [`Action`] / [`FCurve`]: animation bound to objects through slots
//! - [`SceneDescription`]: JSON form of all of the above

pub mod action;
pub mod description;
pub mod object;
pub mod scene;

pub use action::{Action, Channel, ChannelBag, FCurve};
pub use description::SceneDescription;
pub use object::{
    AnimationData, Armature, Bone, Collection, LocalTransform, Modifier, ObjectKind, Rotation, SourceObject,
};
pub use scene::{SourceScene, inverted_safe};

use slotmap::new_key_type;

new_key_type! {
    pub struct ObjectKey;
    pub struct CollectionKey;
    pub struct ActionKey;
}
