//! Transform Resolution Tests
//!
//! Tests for:
//! - Object transforms converted into the target basis
//! - Objects whose graph parent differs from their source parent
//! - The four bone cases: parent bone, child-of, collapsed, armature space
//! - Decomposition into translation / Euler degrees / scale

use glam::{Mat4, Vec3};

use i3d_export::exporter::{ExportOutput, export};
use i3d_export::scene::{AxisConversion, BoneCase, BoneMatrixSource, TransformResolver, Trs};
use i3d_export::settings::{Axis, ExportSelection, ExportSettings};
use i3d_export::source::{LocalTransform, ObjectKey, ObjectKind, Rotation, SourceScene};

const EPSILON: f32 = 1e-4;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    a.abs_diff_eq(b, EPSILON)
}

fn local_trs(out: &ExportOutput, name: &str) -> Trs {
    let node = out.node(name).unwrap_or_else(|| panic!("no node named {name}"));
    Trs::from_matrix(node.transform().expect("transform finalized"))
}

fn place(scene: &mut SourceScene, key: ObjectKey, translation: Vec3) {
    scene.object_mut(key).unwrap().transform = LocalTransform::from_translation(translation);
}

/// Armature `Rig` at `(1, 2, 3)` with bone `Root` at `(0, 0, 1)` and
/// `Child` at `(0, 0, 3)`, both in armature space.
fn rig_scene() -> (SourceScene, ObjectKey) {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let rig = scene.add_object(master, "Rig", ObjectKind::Armature);
    place(&mut scene, rig, Vec3::new(1.0, 2.0, 3.0));
    let armature = scene.object_mut(rig).unwrap().armature.as_mut().unwrap();
    let root = armature.add_bone("Root", None, Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)));
    armature.add_bone("Child", Some(root), Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0)));
    (scene, rig)
}

// ============================================================================
// Objects
// ============================================================================

#[test]
fn object_translation_is_converted() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let cube = scene.add_object(master, "Cube", ObjectKind::Mesh);
    place(&mut scene, cube, Vec3::new(1.0, 2.0, 3.0));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    // Source Y (forward) becomes -Z, source Z (up) becomes Y.
    assert!(approx_vec3(local_trs(&out, "Cube").translation, Vec3::new(1.0, 3.0, -2.0)));
}

#[test]
fn source_axes_leave_transforms_untouched() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let cube = scene.add_object(master, "Cube", ObjectKind::Mesh);
    place(&mut scene, cube, Vec3::new(1.0, 2.0, 3.0));

    let settings = ExportSettings {
        axis_forward: Axis::Y,
        axis_up: Axis::Z,
        ..ExportSettings::default()
    };
    let out = export(&mut scene, &settings).unwrap();
    assert!(approx_vec3(local_trs(&out, "Cube").translation, Vec3::new(1.0, 2.0, 3.0)));
}

#[test]
fn x_rotation_survives_conversion() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let cube = scene.add_object(master, "Cube", ObjectKind::Mesh);
    scene.object_mut(cube).unwrap().transform = LocalTransform {
        rotation: Rotation::Euler(Vec3::new(90f32.to_radians(), 0.0, 0.0)),
        ..LocalTransform::IDENTITY
    };

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    let trs = local_trs(&out, "Cube");
    assert!(approx_vec3(trs.rotation, Vec3::new(90.0, 0.0, 0.0)), "{:?}", trs.rotation);
    assert!(approx_vec3(trs.scale, Vec3::ONE));
}

#[test]
fn child_uses_local_matrix_when_parents_match() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let parent = scene.add_object(master, "Parent", ObjectKind::Empty);
    place(&mut scene, parent, Vec3::new(5.0, 0.0, 0.0));
    let child = scene.add_object(master, "Child", ObjectKind::Empty);
    scene.set_parent(child, Some(parent));
    place(&mut scene, child, Vec3::new(0.0, 0.0, 1.0));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    assert!(approx_vec3(local_trs(&out, "Child").translation, Vec3::new(0.0, 1.0, 0.0)));
}

#[test]
fn selected_only_child_is_relative_to_selected_ancestor() {
    let mut scene = SourceScene::new();
    let master = scene.master_collection();
    let top = scene.add_object(master, "Top", ObjectKind::Empty);
    place(&mut scene, top, Vec3::new(1.0, 0.0, 0.0));
    let middle = scene.add_object(master, "Middle", ObjectKind::Empty);
    scene.set_parent(middle, Some(top));
    place(&mut scene, middle, Vec3::new(0.0, 1.0, 0.0));
    let bottom = scene.add_object(master, "Bottom", ObjectKind::Empty);
    scene.set_parent(bottom, Some(middle));
    place(&mut scene, bottom, Vec3::new(0.0, 0.0, 1.0));

    let settings = ExportSettings {
        selection: ExportSelection::Objects(vec!["Top".into(), "Bottom".into()]),
        selection_traverse_children: false,
        ..ExportSettings::default()
    };
    let out = export(&mut scene, &settings).unwrap();
    // Relative to Top the source offset is (0, 1, 1).
    assert!(approx_vec3(local_trs(&out, "Bottom").translation, Vec3::new(0.0, 1.0, -1.0)));
}

#[test]
fn child_of_collapsed_armature_keeps_world_position() {
    let (mut scene, rig) = rig_scene();
    scene.object_mut(rig).unwrap().collapse_armature = true;
    let master = scene.master_collection();
    let prop = scene.add_object(master, "Prop", ObjectKind::Empty);
    scene.set_parent(prop, Some(rig));
    place(&mut scene, prop, Vec3::new(1.0, 0.0, 0.0));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    // World (2, 2, 3) in source space, no emitted parent.
    assert!(approx_vec3(local_trs(&out, "Prop").translation, Vec3::new(2.0, 3.0, -2.0)));
}

// ============================================================================
// Bones
// ============================================================================

#[test]
fn root_bone_in_armature_space() {
    let (mut scene, _) = rig_scene();
    let out = export(&mut scene, &ExportSettings::default()).unwrap();

    let node = out.node("Root").unwrap();
    let conversion = AxisConversion::from_settings(&ExportSettings::default()).unwrap();
    let resolver = TransformResolver::new(&scene, &out.graph, &conversion, BoneMatrixSource::Rest);
    assert_eq!(
        resolver.bone_case(node, node.kind.as_bone().unwrap()).unwrap(),
        BoneCase::ArmatureSpace
    );
    // C · (0, 0, 1)
    assert!(approx_vec3(local_trs(&out, "Root").translation, Vec3::new(0.0, 1.0, 0.0)));
}

#[test]
fn child_bone_is_relative_to_parent_bone_without_conversion() {
    let (mut scene, _) = rig_scene();
    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    assert!(approx_vec3(local_trs(&out, "Child").translation, Vec3::new(0.0, 0.0, 2.0)));
}

#[test]
fn child_of_identity_target() {
    let (mut scene, rig) = rig_scene();
    let master = scene.master_collection();
    let target = scene.add_object(master, "Anchor", ObjectKind::Empty);
    scene.object_mut(rig).unwrap().armature.as_mut().unwrap().set_child_of(0, Some(target));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    let node = out.node("Root").unwrap();
    let conversion = AxisConversion::from_settings(&ExportSettings::default()).unwrap();
    let resolver = TransformResolver::new(&scene, &out.graph, &conversion, BoneMatrixSource::Rest);
    assert_eq!(
        resolver.bone_case(node, node.kind.as_bone().unwrap()).unwrap(),
        BoneCase::ChildOf
    );

    // identity⁻¹ · armature_world · C·bone = C · (1, 2, 4)
    assert!(approx_vec3(local_trs(&out, "Root").translation, Vec3::new(1.0, 4.0, -2.0)));
}

#[test]
fn deferred_child_of_matches_immediate() {
    let (mut scene, rig) = rig_scene();
    let master = scene.master_collection();
    let target = scene.add_object(master, "ZTarget", ObjectKind::Empty);
    scene.object_mut(rig).unwrap().armature.as_mut().unwrap().set_child_of(0, Some(target));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    assert!(approx_vec3(local_trs(&out, "Root").translation, Vec3::new(1.0, 4.0, -2.0)));
}

#[test]
fn collapsed_root_bone_uses_armature_parent() {
    let (mut scene, rig) = rig_scene();
    scene.object_mut(rig).unwrap().collapse_armature = true;
    let master = scene.master_collection();
    let vehicle = scene.add_object(master, "Vehicle", ObjectKind::Empty);
    place(&mut scene, vehicle, Vec3::new(1.0, 0.0, 0.0));
    scene.set_parent(rig, Some(vehicle));

    let out = export(&mut scene, &ExportSettings::default()).unwrap();
    let node = out.node("Root").unwrap();
    let conversion = AxisConversion::from_settings(&ExportSettings::default()).unwrap();
    let resolver = TransformResolver::new(&scene, &out.graph, &conversion, BoneMatrixSource::Rest);
    assert_eq!(
        resolver.bone_case(node, node.kind.as_bone().unwrap()).unwrap(),
        BoneCase::CollapsedRoot
    );

    // Bone world in source space: (1,0,0) + (1,2,3) + (0,0,1) = (2,2,4); minus Vehicle's (1,0,0).
    assert!(approx_vec3(local_trs(&out, "Root").translation, Vec3::new(1.0, 4.0, -2.0)));
    // The child bone is unaffected by collapsing.
    assert!(approx_vec3(local_trs(&out, "Child").translation, Vec3::new(0.0, 0.0, 2.0)));
}

// ============================================================================
// Finalization
// ============================================================================

#[test]
fn every_node_is_finalized_once() {
    let (mut scene, _) = rig_scene();
    let mut out = export(&mut scene, &ExportSettings::default()).unwrap();
    assert!(out.graph.iter().all(|(_, n)| n.is_finalized()));

    let key = out.graph.find_by_name("Root").unwrap();
    let before = out.graph.get(key).unwrap().transform();
    out.graph.finalize_transform(key, Mat4::from_translation(Vec3::X)).unwrap();
    assert_eq!(out.graph.get(key).unwrap().transform(), before);
}
