#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

pub mod animation;
pub mod errors;
pub mod exporter;
pub mod output;
pub mod scene;
pub mod settings;
pub mod source;
pub mod utils;

pub use animation::{AnimationClip, AnimationSet, EvaluationScope, Keyframe, NodeKeyframes};
pub use errors::{ExportError, Result};
pub use exporter::{ExportOutput, ExportReport, export, export_scene, export_to_file};
pub use output::{I3dDocument, SerializationSink};
pub use scene::{AxisConversion, NodeKind, SceneGraph, SceneNode};
pub use settings::{Axis, ExportSelection, ExportSettings, Features, ObjectTypes};
pub use source::{ObjectKind, SourceScene};
