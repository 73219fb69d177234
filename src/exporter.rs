//! Export entry points.
//!
//! An export runs four sequential phases over one exclusively borrowed
//! scene:
//!
//! 1. traversal builds the node graph ([`SceneGraphBuilder`])
//! 2. deferred child-of constraints and shapes are resolved
//! 3. every node's local transform is finalized
//! 4. linked actions are baked into animation sets
//!
//! [`export`] returns the result in memory. [`export_scene`] additionally
//! hands it to a [`SerializationSink`] and never fails: errors end up in the
//! returned [`ExportReport`].

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::animation::{AnimationSet, bake_animations};
use crate::errors::{Diagnostics, ExportError, Result};
use crate::output::{I3dDocument, NodeRecord, SerializationSink};
use crate::scene::{
    AxisConversion, NodeKey, SceneGraph, SceneGraphBuilder, SceneNode, ShapeTable, finalize_transforms,
};
use crate::settings::ExportSettings;
use crate::source::{ObjectKey, SourceScene};

/// Everything an export produced.
#[derive(Debug)]
pub struct ExportOutput {
    pub graph: SceneGraph,
    /// Source object to its node.
    pub processed: FxHashMap<ObjectKey, NodeKey>,
    /// `(armature object, bone index)` to the bone's node id.
    pub bone_node_ids: FxHashMap<(ObjectKey, usize), u32>,
    pub shapes: ShapeTable,
    pub animation_sets: Vec<AnimationSet>,
    pub warnings: Vec<String>,
}

impl ExportOutput {
    /// First node called `name`.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&SceneNode> {
        self.graph.find_by_name(name).and_then(|k| self.graph.get(k))
    }

    /// Emitted nodes in parent-first order, each with its emitted parent's id.
    #[must_use]
    pub fn node_records(&self) -> Vec<(Option<u32>, NodeRecord)> {
        self.graph
            .depth_first()
            .into_iter()
            .filter_map(|key| {
                let node = self.graph.get(key)?;
                if !node.is_emitted() {
                    return None;
                }
                let parent = self
                    .graph
                    .emitted_parent(key)
                    .and_then(|p| self.graph.get(p))
                    .map(|p| p.id);
                Some((parent, node.populate_output()))
            })
            .collect()
    }

    /// Hands shapes, nodes and animation sets to `sink`, then finishes it.
    pub fn write_to(&self, sink: &mut dyn SerializationSink) -> Result<()> {
        for shape in self.shapes.iter() {
            sink.append_shape(shape)?;
        }
        for (parent, record) in self.node_records() {
            sink.append_node(parent, record)?;
        }
        for set in &self.animation_sets {
            sink.append_animation_set(set)?;
        }
        sink.finish()
    }
}

/// Runs all export phases and returns the result in memory.
pub fn export(scene: &mut SourceScene, settings: &ExportSettings) -> Result<ExportOutput> {
    let mut diagnostics = Diagnostics::default();
    let mut output = run_phases(scene, settings, &mut diagnostics)?;
    output.warnings = diagnostics.into_warnings();
    Ok(output)
}

/// Warnings go to `diagnostics` so they survive a failing phase.
fn run_phases(
    scene: &mut SourceScene,
    settings: &ExportSettings,
    diagnostics: &mut Diagnostics,
) -> Result<ExportOutput> {
    settings.validate()?;
    if !(scene.fps.is_finite() && scene.fps > 0.0) {
        return Err(ExportError::Configuration(format!(
            "Scene frame rate must be positive, got {}",
            scene.fps
        )));
    }
    let conversion = AxisConversion::from_settings(settings)?;
    log::info!("Exporter settings: {settings:?}");

    // Phase 1
    let mut built = SceneGraphBuilder::new(scene, settings, diagnostics).build()?;

    // Phase 2
    if !built.deferred.constraints.is_empty() {
        built.resolve_deferred_constraints(scene, diagnostics);
    }
    if !built.deferred.shapes.is_empty() {
        built.populate_deferred_shapes(scene, diagnostics)?;
    }

    // Phase 3
    finalize_transforms(&mut built.graph, scene, &conversion)?;

    // Phase 4
    let animation_sets = bake_animations(
        scene,
        &built.graph,
        &built.animation_links,
        &conversion,
        diagnostics,
    )?;
    if !animation_sets.is_empty() {
        log::info!("Exported {} animation sets", animation_sets.len());
    }

    let bone_node_ids = built
        .bone_nodes
        .iter()
        .filter_map(|(&bone, &key)| built.graph.get(key).map(|n| (bone, n.id)))
        .collect();

    Ok(ExportOutput {
        graph: built.graph,
        processed: built.processed,
        bone_node_ids,
        shapes: built.shapes,
        animation_sets,
        warnings: Vec::new(),
    })
}

/// Outcome of [`export_scene`].
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub success: bool,
    pub elapsed: Duration,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub node_count: usize,
    pub shape_count: usize,
    pub animation_set_count: usize,
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.elapsed.as_secs_f64();
        match &self.error {
            None => writeln!(
                f,
                "Export finished in {seconds:.3}s: {} nodes, {} shapes, {} animation sets",
                self.node_count, self.shape_count, self.animation_set_count
            )?,
            Some(error) => writeln!(f, "Export failed after {seconds:.3}s: {error}")?,
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Exports into `sink`. Failures are reported, not returned.
pub fn export_scene(
    scene: &mut SourceScene,
    settings: &ExportSettings,
    sink: &mut dyn SerializationSink,
) -> ExportReport {
    let start = Instant::now();
    let mut diagnostics = Diagnostics::default();
    let result = run_phases(scene, settings, &mut diagnostics).and_then(|output| {
        output.write_to(sink)?;
        Ok(output)
    });

    let mut report = ExportReport {
        elapsed: start.elapsed(),
        warnings: diagnostics.into_warnings(),
        ..ExportReport::default()
    };
    match result {
        Ok(output) => {
            report.success = true;
            report.node_count = output.node_records().len();
            report.shape_count = output.shapes.len();
            report.animation_set_count = output.animation_sets.len();
            log::info!("Export took {:.3} seconds", report.elapsed.as_secs_f64());
        }
        Err(error) => {
            log::error!("Export failed: {error}");
            report.error = Some(error.to_string());
        }
    }
    report
}

/// Exports into an i3d file at `path`.
pub fn export_to_file(scene: &mut SourceScene, settings: &ExportSettings, path: impl AsRef<Path>) -> ExportReport {
    let mut document = I3dDocument::with_output_path(path.as_ref());
    export_scene(scene, settings, &mut document)
}
