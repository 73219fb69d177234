//! Export settings.
//!
//! [`ExportSettings`] is plain data that can be built in code or loaded from
//! JSON. Every field has a default, so a settings file only needs to list
//! what it changes:
//!
//! ```json
//! { "axis_forward": "-Z", "axis_up": "Y", "features": "MERGE_GROUPS | SKINNED_MESHES" }
//! ```

use std::path::Path;

use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::errors::{ExportError, Result};

bitflags! {
    /// Object types the traversal turns into nodes.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ObjectTypes: u32 {
        const MESH     = 1 << 0;
        const CURVE    = 1 << 1;
        const ARMATURE = 1 << 2;
        const EMPTY    = 1 << 3;
        const LIGHT    = 1 << 4;
        const CAMERA   = 1 << 5;
        const LATTICE  = 1 << 6;
        const SPEAKER  = 1 << 7;
        const FONT     = 1 << 8;

        /// Every type that has a node variant.
        const SUPPORTED = Self::MESH.bits() | Self::CURVE.bits() | Self::ARMATURE.bits()
            | Self::EMPTY.bits() | Self::LIGHT.bits() | Self::CAMERA.bits();
    }
}

impl Default for ObjectTypes {
    fn default() -> Self {
        Self::SUPPORTED
    }
}

bitflags! {
    /// Optional mesh features.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Features: u32 {
        const MERGE_CHILDREN = 1 << 0;
        const MERGE_GROUPS   = 1 << 1;
        const SKINNED_MESHES = 1 << 2;
    }
}

impl Default for Features {
    fn default() -> Self {
        Self::all()
    }
}

/// Signed coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "X")]
    X,
    #[serde(rename = "Y")]
    Y,
    #[serde(rename = "Z")]
    Z,
    #[serde(rename = "-X")]
    NegX,
    #[serde(rename = "-Y")]
    NegY,
    #[serde(rename = "-Z")]
    NegZ,
}

impl Axis {
    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
            Axis::NegX => Vec3::NEG_X,
            Axis::NegY => Vec3::NEG_Y,
            Axis::NegZ => Vec3::NEG_Z,
        }
    }
}

/// What part of the scene to export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "names", rename_all = "snake_case")]
pub enum ExportSelection {
    /// The master collection.
    #[default]
    All,
    /// A collection by name.
    Collection(String),
    /// Objects by name, as if selected in the host.
    Objects(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub axis_forward: Axis,
    pub axis_up: Axis,
    pub object_types: ObjectTypes,
    pub features: Features,
    /// Export collections as TransformGroups instead of flattening them.
    pub keep_collections_as_transform_groups: bool,
    pub selection: ExportSelection,
    /// With [`ExportSelection::Objects`], also export the children of selected objects.
    pub selection_traverse_children: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            axis_forward: Axis::NegZ,
            axis_up: Axis::Y,
            object_types: ObjectTypes::default(),
            features: Features::default(),
            keep_collections_as_transform_groups: true,
            selection: ExportSelection::All,
            selection_traverse_children: true,
        }
    }
}

impl ExportSettings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Whether `feature` is enabled.
    #[inline]
    #[must_use]
    pub fn has(&self, feature: Features) -> bool {
        self.features.contains(feature)
    }

    /// Checks settings that do not depend on the scene.
    pub fn validate(&self) -> Result<()> {
        let forward = self.axis_forward.to_vec3();
        let up = self.axis_up.to_vec3();
        if forward.cross(up).length_squared() < 0.5 {
            return Err(ExportError::Configuration(format!(
                "Forward axis {:?} and up axis {:?} must be perpendicular",
                self.axis_forward, self.axis_up
            )));
        }
        if let ExportSelection::Objects(names) = &self.selection
            && names.is_empty()
        {
            log::warn!("No objects selected for export");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_i3d_conventions() {
        let settings = ExportSettings::default();
        assert_eq!(settings.axis_forward, Axis::NegZ);
        assert_eq!(settings.axis_up, Axis::Y);
        assert_eq!(settings.object_types, ObjectTypes::SUPPORTED);
        assert!(settings.has(Features::MERGE_CHILDREN | Features::SKINNED_MESHES));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings = ExportSettings::from_json(
            r#"{ "features": "SKINNED_MESHES", "selection": { "mode": "collection", "names": "Vehicle" } }"#,
        )
        .unwrap();
        assert_eq!(settings.features, Features::SKINNED_MESHES);
        assert_eq!(settings.selection, ExportSelection::Collection("Vehicle".into()));
        assert!(settings.keep_collections_as_transform_groups);
    }

    #[test]
    fn parallel_axes_are_rejected() {
        let settings = ExportSettings {
            axis_forward: Axis::Y,
            axis_up: Axis::NegY,
            ..ExportSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ExportError::Configuration(_))));
    }
}
