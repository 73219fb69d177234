use glam::{Mat3, Mat4};

use crate::errors::{ExportError, Result};
use crate::settings::{Axis, ExportSettings};

/// Fixed basis change from the source coordinate system (right handed,
/// forward `+Y`, up `+Z`) into the target file's basis.
///
/// Two conversions exist and they are not interchangeable:
/// - [`to_target`](Self::to_target) re-expresses a transform whose parent
///   space is also converted: `C · m · C⁻¹`.
/// - [`to_target_forward`](Self::to_target_forward) only converts the outer
///   space: `C · m`. Bone matrices use it; their own frame stays in the
///   armature's bone basis, so skinning stays consistent between parent and
///   child bones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConversion {
    matrix: Mat4,
    inverse: Mat4,
}

impl AxisConversion {
    pub const IDENTITY: Self = Self {
        matrix: Mat4::IDENTITY,
        inverse: Mat4::IDENTITY,
    };

    /// Builds the conversion mapping source forward/up onto `forward`/`up`.
    pub fn new(forward: Axis, up: Axis) -> Result<Self> {
        let forward_v = forward.to_vec3();
        let up_v = up.to_vec3();
        let right = forward_v.cross(up_v);
        if right.length_squared() < 0.5 {
            return Err(ExportError::Configuration(format!(
                "Cannot build axis conversion: forward {forward:?} and up {up:?} are parallel"
            )));
        }

        // Source basis columns (right, forward, up) are X, Y, Z, so the source
        // matrix is the identity and the conversion is the target basis itself.
        let basis = Mat3::from_cols(right, forward_v, up_v);
        Ok(Self {
            matrix: Mat4::from_mat3(basis),
            inverse: Mat4::from_mat3(basis.transpose()),
        })
    }

    pub fn from_settings(settings: &ExportSettings) -> Result<Self> {
        Self::new(settings.axis_forward, settings.axis_up)
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// `C · m · C⁻¹`
    #[inline]
    #[must_use]
    pub fn to_target(&self, m: Mat4) -> Mat4 {
        self.matrix * m * self.inverse
    }

    /// `C · m`
    #[inline]
    #[must_use]
    pub fn to_target_forward(&self, m: Mat4) -> Mat4 {
        self.matrix * m
    }
}

impl Default for AxisConversion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn source_axes_give_identity() {
        let conv = AxisConversion::new(Axis::Y, Axis::Z).unwrap();
        assert_eq!(conv.matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn y_up_conversion_maps_axes() {
        let conv = AxisConversion::new(Axis::NegZ, Axis::Y).unwrap();
        let m = conv.matrix();
        assert!(m.transform_vector3(Vec3::Y).abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(m.transform_vector3(Vec3::Z).abs_diff_eq(Vec3::Y, 1e-6));
        assert!(m.transform_vector3(Vec3::X).abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn sandwich_and_forward_differ() {
        let conv = AxisConversion::new(Axis::NegZ, Axis::Y).unwrap();
        let m = Mat4::from_rotation_x(0.5);
        assert!(!conv.to_target(m).abs_diff_eq(conv.to_target_forward(m), 1e-4));
    }

    #[test]
    fn parallel_axes_fail() {
        assert!(AxisConversion::new(Axis::Z, Axis::NegZ).is_err());
    }
}
