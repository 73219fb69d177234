//! Animation: keyframe tracks, action bindings and baking.

mod values;
pub mod bake;
pub mod binding;
pub mod clip;
pub mod scope;
pub mod tracks;

pub use bake::{AnimationBaker, TrackPlan, bake_animations};
pub use binding::{ActionBinding, AnimationLinks, SlotBinding};
pub use clip::{AnimationClip, AnimationSet, Keyframe, NodeKeyframes};
pub use scope::EvaluationScope;
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::Interpolatable;
