use crate::animation::tracks::{InterpolationMode, KeyframeTrack};

/// Transform channel an F-curve drives, derived from the tail of its data path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Location,
    RotationEuler,
    RotationQuaternion,
    Scale,
    /// Custom properties, shape keys, constraint influences, ...
    Other,
}

impl Channel {
    /// Classifies a data path by suffix, the way the host reports them
    /// (`location`, `pose.bones["Arm"].rotation_quaternion`, `["custom"]`).
    #[must_use]
    pub fn from_data_path(data_path: &str) -> Self {
        if data_path.ends_with("location") {
            Channel::Location
        } else if data_path.ends_with("rotation_euler") {
            Channel::RotationEuler
        } else if data_path.ends_with("rotation_quaternion") {
            Channel::RotationQuaternion
        } else if data_path.ends_with("scale") {
            Channel::Scale
        } else {
            Channel::Other
        }
    }
}

/// Animation curve for one component of one property.
#[derive(Debug, Clone)]
pub struct FCurve {
    pub data_path: String,
    pub array_index: usize,
    pub(crate) track: KeyframeTrack<f32>,
}

impl FCurve {
    /// Creates a linear curve from `(frame, value)` keys.
    #[must_use]
    pub fn new(data_path: impl Into<String>, array_index: usize, keys: Vec<(f32, f32)>) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            track: KeyframeTrack::from_points(keys, InterpolationMode::Linear),
        }
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: InterpolationMode) -> Self {
        self.track.interpolation = interpolation;
        self
    }

    #[must_use]
    pub fn channel(&self) -> Channel {
        Channel::from_data_path(&self.data_path)
    }

    /// Whether the curve addresses the pose bone `bone_name`.
    #[must_use]
    pub fn targets_bone(&self, bone_name: &str) -> bool {
        self.data_path.contains(&pose_bone_path(bone_name))
    }

    /// The channel when the curve addresses the object itself (no `pose.bones[...]` prefix).
    #[must_use]
    pub fn object_channel(&self) -> Option<Channel> {
        match self.data_path.as_str() {
            "location" => Some(Channel::Location),
            "rotation_euler" => Some(Channel::RotationEuler),
            "rotation_quaternion" => Some(Channel::RotationQuaternion),
            "scale" => Some(Channel::Scale),
            _ => None,
        }
    }

    /// The channel when the curve addresses `bone_name`'s own transform.
    #[must_use]
    pub fn bone_channel(&self, bone_name: &str) -> Option<Channel> {
        let property = self.data_path.strip_prefix(&pose_bone_path(bone_name))?.strip_prefix('.')?;
        match property {
            "location" => Some(Channel::Location),
            "rotation_euler" => Some(Channel::RotationEuler),
            "rotation_quaternion" => Some(Channel::RotationQuaternion),
            "scale" => Some(Channel::Scale),
            _ => None,
        }
    }

    /// Frames holding a key, in ascending order.
    #[must_use]
    pub fn key_frames(&self) -> &[f32] {
        &self.track.times
    }

    #[must_use]
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        self.track.sample(frame)
    }
}

/// `pose.bones["name"]`
#[must_use]
pub fn pose_bone_path(bone_name: &str) -> String {
    format!("pose.bones[\"{bone_name}\"]")
}

/// F-curves of one action slot.
#[derive(Debug, Clone, Default)]
pub struct ChannelBag {
    pub slot: String,
    pub fcurves: Vec<FCurve>,
}

impl ChannelBag {
    #[must_use]
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            fcurves: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_curve(mut self, curve: FCurve) -> Self {
        self.fcurves.push(curve);
        self
    }
}

/// Reusable animation source. Objects bind to it through a slot name.
#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    /// Inclusive `(start, end)` frame range.
    pub frame_range: (f32, f32),
    pub channelbags: Vec<ChannelBag>,
}

impl Action {
    #[must_use]
    pub fn new(name: impl Into<String>, frame_range: (f32, f32)) -> Self {
        Self {
            name: name.into(),
            frame_range,
            channelbags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_channelbag(mut self, bag: ChannelBag) -> Self {
        self.channelbags.push(bag);
        self
    }

    #[must_use]
    pub fn channelbag(&self, slot: &str) -> Option<&ChannelBag> {
        self.channelbags.iter().find(|bag| bag.slot == slot)
    }

    /// Frame range truncated to whole frames.
    #[must_use]
    pub fn whole_frame_range(&self) -> (i32, i32) {
        (self.frame_range.0 as i32, self.frame_range.1 as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_data_paths() {
        assert_eq!(Channel::from_data_path("location"), Channel::Location);
        assert_eq!(
            Channel::from_data_path("pose.bones[\"Arm\"].rotation_quaternion"),
            Channel::RotationQuaternion
        );
        assert_eq!(Channel::from_data_path("[\"door_open\"]"), Channel::Other);
    }

    #[test]
    fn bone_channel_requires_exact_bone() {
        let curve = FCurve::new("pose.bones[\"Arm\"].location", 0, vec![(0.0, 0.0)]);
        assert_eq!(curve.bone_channel("Arm"), Some(Channel::Location));
        assert_eq!(curve.bone_channel("Leg"), None);
        assert!(curve.targets_bone("Arm"));
        assert_eq!(curve.object_channel(), None);
    }
}
