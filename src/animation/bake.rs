//! Animation baking.
//!
//! Each linked action becomes an [`AnimationSet`] with one clip. For every
//! bound node the baker decides which frames to sample:
//!
//! - transform-only curves: the union of their key frames
//! - any other animated property (custom properties, constraint
//!   influences, ...): every whole frame of the action's range, since the
//!   effect on the transform can only be observed by evaluating the scene
//!
//! Samples are taken by moving the scene to the frame and re-running the
//! node's transform resolution with posed bones.

use crate::animation::binding::{ActionBinding, AnimationLinks};
use crate::animation::clip::{AnimationClip, AnimationSet, Keyframe, NodeKeyframes};
use crate::animation::scope::EvaluationScope;
use crate::errors::{Diagnostics, ExportError, Result};
use crate::scene::convert::AxisConversion;
use crate::scene::graph::SceneGraph;
use crate::scene::node::{NodeKind, NodeOrigin};
use crate::scene::transform::{BoneMatrixSource, TransformResolver, Trs};
use crate::scene::NodeKey;
use crate::source::action::{Action, Channel, ChannelBag, FCurve};
use crate::source::SourceScene;

/// Channels a track writes and how its frames are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackPlan {
    pub needs_baking: bool,
    pub translation: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl TrackPlan {
    #[must_use]
    pub fn from_curves(curves: &[&FCurve]) -> Self {
        let mut plan = Self::default();
        for curve in curves {
            match curve.channel() {
                Channel::Location => plan.translation = true,
                Channel::RotationEuler | Channel::RotationQuaternion => plan.rotation = true,
                Channel::Scale => plan.scale = true,
                Channel::Other => plan.needs_baking |= !curve.data_path.is_empty(),
            }
        }
        if plan.needs_baking {
            plan.translation = true;
            plan.rotation = true;
            plan.scale = true;
        }
        plan
    }
}

/// Sorted, de-duplicated key frames of `curves`.
#[must_use]
pub fn collect_key_frames(curves: &[&FCurve]) -> Vec<f32> {
    let mut frames: Vec<f32> = curves.iter().flat_map(|c| c.key_frames().iter().copied()).collect();
    frames.sort_by(f32::total_cmp);
    frames.dedup();
    frames
}

pub struct AnimationBaker<'a> {
    graph: &'a SceneGraph,
    conversion: &'a AxisConversion,
    fps: f32,
}

impl<'a> AnimationBaker<'a> {
    #[must_use]
    pub fn new(graph: &'a SceneGraph, conversion: &'a AxisConversion, fps: f32) -> Self {
        Self { graph, conversion, fps }
    }

    /// Bakes one set per linked action, in link order.
    pub fn bake_all(
        &self,
        scope: &mut EvaluationScope<'_>,
        links: &AnimationLinks,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<AnimationSet>> {
        let mut sets = Vec::with_capacity(links.len());
        for link in links.iter() {
            let action = scope
                .scene()
                .action(link.action)
                .cloned()
                .ok_or_else(|| ExportError::MissingObject(format!("action {:?}", link.action)))?;
            log::info!("Baking animation set '{}'", action.name);
            let clip = self.bake_clip(scope, &action, link, diagnostics)?;
            sets.push(AnimationSet {
                name: action.name.clone(),
                clips: vec![clip],
            });
        }
        Ok(sets)
    }

    fn bake_clip(
        &self,
        scope: &mut EvaluationScope<'_>,
        action: &Action,
        link: &ActionBinding,
        diagnostics: &mut Diagnostics,
    ) -> Result<AnimationClip> {
        let (start, end) = action.whole_frame_range();
        let duration = (end - start) as f32 / self.fps * 1000.0;
        let mut tracks = Vec::new();

        for binding in &link.bindings {
            let node = self.graph.node(binding.node)?;
            let Some(bag) = action.channelbag(&binding.slot) else {
                log::debug!("[{}] No channel bag for slot '{}', skipped", node.name, binding.slot);
                continue;
            };

            // An armature animates through its bones, never by itself.
            let targets: Vec<NodeKey> = match &node.kind {
                NodeKind::ArmatureRoot(armature) => armature.bones.clone(),
                _ => vec![binding.node],
            };
            for target in targets {
                if let Some(track) = self.bake_track(scope, target, bag, (start, end), diagnostics)? {
                    tracks.push(track);
                }
            }
        }

        Ok(AnimationClip {
            name: action.name.clone(),
            duration,
            tracks,
        })
    }

    fn bake_track(
        &self,
        scope: &mut EvaluationScope<'_>,
        key: NodeKey,
        bag: &ChannelBag,
        (start, end): (i32, i32),
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<NodeKeyframes>> {
        let node = self.graph.node(key)?;
        let curves: Vec<&FCurve> = match node.origin {
            NodeOrigin::Bone { armature, index } => {
                let bone_name = scope
                    .scene()
                    .get(armature)?
                    .armature
                    .as_ref()
                    .and_then(|a| a.bones.get(index))
                    .map(|b| b.name.clone())
                    .unwrap_or_else(|| node.name.clone());
                bag.fcurves.iter().filter(|c| c.targets_bone(&bone_name)).collect()
            }
            _ => bag.fcurves.iter().collect(),
        };
        if curves.is_empty() {
            log::debug!("[{}] No animation curves", node.name);
            return Ok(None);
        }

        let plan = TrackPlan::from_curves(&curves);
        let frames: Vec<f32> = if plan.needs_baking {
            log::debug!("[{}] Non-transform curves found, baking frames {start}..={end}", node.name);
            (start..=end).map(|f| f as f32).collect()
        } else {
            collect_key_frames(&curves)
        };
        if frames.is_empty() {
            diagnostics.warn(format!("[{}] No keyframes found", node.name));
            return Ok(None);
        }

        let mut keyframes = Vec::with_capacity(frames.len());
        for frame in frames {
            scope.set_frame(frame);
            let resolver = TransformResolver::new(scope.scene(), self.graph, self.conversion, BoneMatrixSource::Pose);
            let trs = Trs::from_matrix(resolver.local_matrix(key)?);
            keyframes.push(Keyframe {
                time: (frame - start as f32) / self.fps * 1000.0,
                translation: plan.translation.then_some(trs.translation),
                rotation: plan.rotation.then_some(trs.rotation),
                scale: plan.scale.then_some(trs.scale),
            });
        }

        log::debug!("[{}] Baked {} keyframes", node.name, keyframes.len());
        Ok(Some(NodeKeyframes {
            node_id: node.id,
            keyframes,
        }))
    }
}

/// Convenience wrapper used by the exporter.
pub fn bake_animations(
    scene: &mut SourceScene,
    graph: &SceneGraph,
    links: &AnimationLinks,
    conversion: &AxisConversion,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<AnimationSet>> {
    if links.is_empty() {
        return Ok(Vec::new());
    }
    let fps = scene.fps;
    let animated: Vec<_> = links
        .nodes()
        .filter_map(|n| graph.get(n).and_then(|n| n.source_object()))
        .collect();

    let mut scope = EvaluationScope::acquire(scene, animated);
    AnimationBaker::new(graph, conversion, fps).bake_all(&mut scope, links, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_property_forces_baking() {
        let loc = FCurve::new("location", 0, vec![(1.0, 0.0)]);
        let custom = FCurve::new("[\"door_open\"]", 0, vec![(1.0, 0.0)]);
        let plan = TrackPlan::from_curves(&[&loc, &custom]);
        assert!(plan.needs_baking);
        assert!(plan.rotation && plan.scale);
    }

    #[test]
    fn flags_follow_curves() {
        let rot = FCurve::new("rotation_quaternion", 0, vec![(1.0, 1.0)]);
        let plan = TrackPlan::from_curves(&[&rot]);
        assert_eq!(
            plan,
            TrackPlan {
                needs_baking: false,
                translation: false,
                rotation: true,
                scale: false
            }
        );
    }

    #[test]
    fn key_frames_are_unique_and_sorted() {
        let a = FCurve::new("location", 0, vec![(10.0, 0.0), (1.0, 0.0)]);
        let b = FCurve::new("location", 1, vec![(5.0, 0.0), (10.0, 1.0)]);
        assert_eq!(collect_key_frames(&[&a, &b]), vec![1.0, 5.0, 10.0]);
    }
}
