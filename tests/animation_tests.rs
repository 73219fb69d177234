//! Animation Baking Tests
//!
//! Tests for:
//! - Key frame sampling and millisecond timing
//! - Channel flags derived from the animated curves
//! - Full-range baking for non-transform curves
//! - Bone tracks of armatures
//! - Restoration of frame and visibility after baking

use glam::{Mat4, Vec3};

use i3d_export::animation::EvaluationScope;
use i3d_export::errors::Result;
use i3d_export::exporter::{ExportOutput, export};
use i3d_export::settings::ExportSettings;
use i3d_export::source::{Action, AnimationData, ChannelBag, FCurve, ObjectKey, ObjectKind, SourceScene};

const EPSILON: f32 = 1e-3;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn bind(scene: &mut SourceScene, object: ObjectKey, action: Action, slot: &str) {
    let action = scene.add_action(action);
    scene.object_mut(object).unwrap().animation = Some(AnimationData {
        action,
        slot: slot.to_string(),
    });
}

fn cube_scene() -> (SourceScene, ObjectKey) {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let cube = scene.add_object(master, "Cube", ObjectKind::Mesh);
    (scene, cube)
}

fn export_default(scene: &mut SourceScene) -> ExportOutput {
    export(scene, &ExportSettings::default()).unwrap()
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn key_frames_map_to_milliseconds() {
    let (mut scene, cube) = cube_scene();
    let action = Action::new("Move", (10.0, 40.0))
        .with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("location", 0, vec![(10.0, 0.0), (40.0, 3.0)])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    assert_eq!(out.animation_sets.len(), 1);
    let set = &out.animation_sets[0];
    assert_eq!(set.name, "Move");
    assert_eq!(set.clip_count(), 1);

    let clip = &set.clips[0];
    assert!(approx(clip.duration, 1000.0));
    assert_eq!(clip.count(), 1);

    let track = &clip.tracks[0];
    assert_eq!(track.node_id, out.node("Cube").unwrap().id);
    assert_eq!(track.keyframes.len(), 2);
    assert!(approx(track.keyframes[0].time, 0.0));
    assert!(approx(track.keyframes[1].time, 1000.0));
    assert!(approx_vec3(track.keyframes[1].translation.unwrap(), Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn only_animated_channels_are_written() {
    let (mut scene, cube) = cube_scene();
    let action = Action::new("Move", (1.0, 20.0))
        .with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("location", 1, vec![(1.0, 0.0), (20.0, 2.0)])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    for key in &out.animation_sets[0].clips[0].tracks[0].keyframes {
        assert!(key.translation.is_some());
        assert!(key.rotation.is_none());
        assert!(key.scale.is_none());
    }
}

#[test]
fn custom_property_bakes_every_frame() {
    let (mut scene, cube) = cube_scene();
    let action = Action::new("Open", (10.0, 40.0)).with_channelbag(
        ChannelBag::new("OBCube")
            .with_curve(FCurve::new("location", 0, vec![(10.0, 0.0), (40.0, 1.0)]))
            .with_curve(FCurve::new("[\"open\"]", 0, vec![(10.0, 0.0), (40.0, 1.0)])),
    );
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    let keys = &out.animation_sets[0].clips[0].tracks[0].keyframes;
    assert_eq!(keys.len(), 31);
    assert!(keys.iter().all(|k| k.translation.is_some() && k.rotation.is_some() && k.scale.is_some()));
    assert!(approx(keys[15].time, 500.0));
}

#[test]
fn frame_rate_scales_times() {
    let (mut scene, cube) = cube_scene();
    scene.fps = 25.0;
    let action = Action::new("Move", (0.0, 50.0))
        .with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("scale", 0, vec![(0.0, 1.0), (25.0, 2.0)])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    let clip = &out.animation_sets[0].clips[0];
    assert!(approx(clip.duration, 2000.0));
    assert!(approx(clip.tracks[0].keyframes[1].time, 1000.0));
}

#[test]
fn shared_action_yields_one_set_with_a_track_per_slot() {
    let (mut scene, cube) = cube_scene();
    let master = scene.master_collection();
    let door = scene.add_object(master, "Door", ObjectKind::Mesh);
    let action = Action::new("Shared", (1.0, 10.0))
        .with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("location", 0, vec![(1.0, 0.0), (10.0, 1.0)])))
        .with_channelbag(
            ChannelBag::new("OBDoor").with_curve(FCurve::new("rotation_euler", 2, vec![(1.0, 0.0), (10.0, 1.0)])),
        );
    let action = scene.add_action(action);
    scene.object_mut(cube).unwrap().animation = Some(AnimationData {
        action,
        slot: "OBCube".into(),
    });
    scene.object_mut(door).unwrap().animation = Some(AnimationData {
        action,
        slot: "OBDoor".into(),
    });

    let out = export_default(&mut scene);
    assert_eq!(out.animation_sets.len(), 1);
    let ids: Vec<u32> = out.animation_sets[0].clips[0].tracks.iter().map(|t| t.node_id).collect();
    assert_eq!(ids, vec![out.node("Cube").unwrap().id, out.node("Door").unwrap().id]);
}

#[test]
fn missing_slot_produces_an_empty_clip() {
    let (mut scene, cube) = cube_scene();
    let action = Action::new("Other", (1.0, 10.0))
        .with_channelbag(ChannelBag::new("OBElse").with_curve(FCurve::new("location", 0, vec![(1.0, 0.0)])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    assert_eq!(out.animation_sets.len(), 1);
    assert_eq!(out.animation_sets[0].clips[0].count(), 0);
}

#[test]
fn curves_without_keys_warn() {
    let (mut scene, cube) = cube_scene();
    let action =
        Action::new("Empty", (1.0, 10.0)).with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("location", 0, vec![])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    assert_eq!(out.animation_sets[0].clips[0].count(), 0);
    assert!(out.warnings.iter().any(|w| w.contains("No keyframes")));
}

// ============================================================================
// Bones
// ============================================================================

#[test]
fn armature_animation_produces_bone_tracks() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let rig = scene.add_object(master, "Rig", ObjectKind::Armature);
    {
        let armature = scene.object_mut(rig).unwrap().armature.as_mut().unwrap();
        let root = armature.add_bone("Root", None, Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)));
        armature.add_bone("Child", Some(root), Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)));
    }
    let action = Action::new("Lift", (1.0, 11.0)).with_channelbag(
        ChannelBag::new("OBRig").with_curve(FCurve::new("pose.bones[\"Root\"].location", 2, vec![(1.0, 0.0), (11.0, 1.0)])),
    );
    bind(&mut scene, rig, action, "OBRig");

    let out = export_default(&mut scene);
    let clip = &out.animation_sets[0].clips[0];
    // Child has no curves of its own.
    assert_eq!(clip.count(), 1);

    let track = &clip.tracks[0];
    assert_eq!(track.node_id, out.bone_node_ids[&(rig, 0)]);
    assert_eq!(track.keyframes.len(), 2);
    assert!(approx(track.keyframes[1].time, 10.0 / 30.0 * 1000.0));
    // Rest (0, 0, 1) plus one unit of pose offset, converted.
    assert!(approx_vec3(track.keyframes[0].translation.unwrap(), Vec3::new(0.0, 1.0, 0.0)));
    assert!(approx_vec3(track.keyframes[1].translation.unwrap(), Vec3::new(0.0, 2.0, 0.0)));

    // Rest transforms are unaffected by the pose.
    let root = out.node("Root").unwrap();
    assert!(approx_vec3(
        root.transform().unwrap().w_axis.truncate(),
        Vec3::new(0.0, 1.0, 0.0)
    ));
}

// ============================================================================
// Evaluation State
// ============================================================================

#[test]
fn export_restores_frame_and_visibility() {
    let (mut scene, cube) = cube_scene();
    scene.set_frame(5.0);
    scene.object_mut(cube).unwrap().hide_viewport = true;
    let action = Action::new("Move", (10.0, 40.0))
        .with_channelbag(ChannelBag::new("OBCube").with_curve(FCurve::new("location", 0, vec![(10.0, 0.0), (40.0, 3.0)])));
    bind(&mut scene, cube, action, "OBCube");

    let out = export_default(&mut scene);
    assert_eq!(out.animation_sets.len(), 1);
    assert!(approx(scene.frame(), 5.0));
    assert!(scene.object(cube).unwrap().hide_viewport);
}

fn evaluate_then_fail(scene: &mut SourceScene, animated: ObjectKey) -> Result<()> {
    let mut scope = EvaluationScope::acquire(scene, [animated]);
    scope.set_frame(99.0);
    assert!(!scope.scene().object(animated).unwrap().hide_viewport);
    scope.scene().get(ObjectKey::default())?;
    Ok(())
}

#[test]
fn evaluation_scope_restores_on_error() {
    let (mut scene, cube) = cube_scene();
    scene.set_frame(3.0);
    scene.object_mut(cube).unwrap().hide_viewport = true;

    assert!(evaluate_then_fail(&mut scene, cube).is_err());
    assert!(approx(scene.frame(), 3.0));
    assert!(scene.object(cube).unwrap().hide_viewport);
}
