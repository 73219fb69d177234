//! i3d document assembly.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;
use rustc_hash::FxHashMap;
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::animation::AnimationSet;
use crate::errors::Result;
use crate::output::record::NodeRecord;
use crate::output::sink::SerializationSink;
use crate::scene::{ShapeKind, ShapeRecord};
use crate::utils::{g6, g6_vec3};

const I3D_VERSION: &str = "1.6";
const EPSILON: f32 = 1e-6;

/// In-memory i3d document; writes itself on [`finish`](SerializationSink::finish)
/// when created with an output path.
#[derive(Debug, Clone, Default)]
pub struct I3dDocument {
    name: String,
    path: Option<PathBuf>,
    shapes: Vec<ShapeRecord>,
    nodes: Vec<(Option<u32>, NodeRecord)>,
    animation_sets: Vec<AnimationSet>,
}

impl I3dDocument {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A document named after the file stem of `path`, saved there on finish.
    #[must_use]
    pub fn with_output_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path: Some(path),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[(Option<u32>, NodeRecord)] {
        &self.nodes
    }

    #[must_use]
    pub fn shapes(&self) -> &[ShapeRecord] {
        &self.shapes
    }

    #[must_use]
    pub fn animation_sets(&self) -> &[AnimationSet] {
        &self.animation_sets
    }

    /// Builds the `<i3D>` element tree.
    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut root = new_element(
            "i3D",
            [
                ("name", self.name.clone()),
                ("version", I3D_VERSION.to_owned()),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance".to_owned()),
                (
                    "xsi:noNamespaceSchemaLocation",
                    format!("http://i3d.giants.ch/schema/i3d-{I3D_VERSION}.xsd"),
                ),
            ],
        );

        let mut asset = Element::new("Asset");
        append(
            &mut asset,
            new_element(
                "Export",
                [
                    ("program", env!("CARGO_PKG_NAME").to_owned()),
                    ("version", env!("CARGO_PKG_VERSION").to_owned()),
                ],
            ),
        );
        append(&mut root, asset);
        append(&mut root, Element::new("Files"));
        append(&mut root, Element::new("Materials"));

        let mut shapes = Element::new("Shapes");
        for shape in &self.shapes {
            append(&mut shapes, shape_element(shape));
        }
        append(&mut root, shapes);
        append(&mut root, Element::new("Dynamics"));

        append(&mut root, self.scene_element());

        let mut animation = Element::new("Animation");
        let mut sets = new_element("AnimationSets", [("count", self.animation_sets.len().to_string())]);
        for set in &self.animation_sets {
            append(&mut sets, animation_set_element(set));
        }
        append(&mut animation, sets);
        append(&mut root, animation);

        append(&mut root, Element::new("UserAttributes"));
        root
    }

    /// The indented XML document, declaration included.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.to_element().write_with_config(&mut buffer, emitter_config())?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = BufWriter::new(File::create(path)?);
        self.to_element().write_with_config(&mut file, emitter_config())?;
        file.flush()?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }

    fn scene_element(&self) -> Element {
        let mut children: FxHashMap<Option<u32>, Vec<&NodeRecord>> = FxHashMap::default();
        for (parent, node) in &self.nodes {
            children.entry(*parent).or_default().push(node);
        }

        let mut scene = Element::new("Scene");
        for root in children.get(&None).into_iter().flatten() {
            append(&mut scene, node_subtree(root, &children));
        }
        scene
    }
}

impl SerializationSink for I3dDocument {
    fn append_shape(&mut self, shape: &ShapeRecord) -> Result<()> {
        self.shapes.push(shape.clone());
        Ok(())
    }

    fn append_node(&mut self, parent: Option<u32>, node: NodeRecord) -> Result<()> {
        self.nodes.push((parent, node));
        Ok(())
    }

    fn append_animation_set(&mut self, set: &AnimationSet) -> Result<()> {
        self.animation_sets.push(set.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        match &self.path {
            Some(path) => self.save(path),
            None => Ok(()),
        }
    }
}

fn emitter_config() -> EmitterConfig {
    EmitterConfig::new().perform_indent(true)
}

fn new_element<const N: usize>(tag: &str, attributes: [(&str, String); N]) -> Element {
    let mut element = Element::new(tag);
    for (key, value) in attributes {
        set_attr(&mut element, key, value);
    }
    element
}

fn set_attr(element: &mut Element, key: &str, value: String) {
    element.attributes.insert(key.to_owned(), value);
}

fn append(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

fn shape_element(shape: &ShapeRecord) -> Element {
    let mut element = new_element(
        "IndexedTriangleSet",
        [("name", shape.name.clone()), ("shapeId", shape.id.to_string())],
    );
    if shape.kind == ShapeKind::Skinned {
        set_attr(&mut element, "isSkinned", "true".to_owned());
    }
    element
}

fn node_subtree(node: &NodeRecord, children: &FxHashMap<Option<u32>, Vec<&NodeRecord>>) -> Element {
    let mut element = node_element(node);
    for child in children.get(&Some(node.id)).into_iter().flatten() {
        append(&mut element, node_subtree(child, children));
    }
    element
}

fn node_element(node: &NodeRecord) -> Element {
    let mut element = new_element(
        node.element.tag(),
        [("name", node.name.clone()), ("nodeId", node.id.to_string())],
    );
    if !node.translation.abs_diff_eq(Vec3::ZERO, EPSILON) {
        set_attr(&mut element, "translation", g6_vec3(node.translation));
    }
    if !node.rotation.abs_diff_eq(Vec3::ZERO, EPSILON) {
        set_attr(&mut element, "rotation", g6_vec3(node.rotation));
    }
    if !node.scale.abs_diff_eq(Vec3::ONE, EPSILON) {
        set_attr(&mut element, "scale", g6_vec3(node.scale));
    }
    if let Some(shape_id) = node.shape_id {
        set_attr(&mut element, "shapeId", shape_id.to_string());
    }
    if !node.skin_bind_node_ids.is_empty() {
        let ids: Vec<String> = node.skin_bind_node_ids.iter().map(u32::to_string).collect();
        set_attr(&mut element, "skinBindNodeIds", ids.join(" "));
    }
    element
}

fn animation_set_element(set: &AnimationSet) -> Element {
    let mut element = new_element(
        "AnimationSet",
        [
            ("name", set.name.clone()),
            ("clipCount", set.clip_count().to_string()),
        ],
    );
    for clip in &set.clips {
        let mut clip_element = new_element(
            "Clip",
            [
                ("name", clip.name.clone()),
                ("duration", g6(clip.duration)),
                ("count", clip.count().to_string()),
            ],
        );
        for track in &clip.tracks {
            let mut keyframes = new_element("Keyframes", [("nodeId", track.node_id.to_string())]);
            for key in &track.keyframes {
                let mut keyframe = new_element("Keyframe", [("time", g6(key.time))]);
                if let Some(t) = key.translation {
                    set_attr(&mut keyframe, "translation", g6_vec3(t));
                }
                if let Some(r) = key.rotation {
                    set_attr(&mut keyframe, "rotation", g6_vec3(r));
                }
                if let Some(s) = key.scale {
                    set_attr(&mut keyframe, "scale", g6_vec3(s));
                }
                append(&mut keyframes, keyframe);
            }
            append(&mut clip_element, keyframes);
        }
        append(&mut element, clip_element);
    }
    element
}
