use glam::Vec3;

/// One baked sample of a node's local transform.
///
/// A channel is `None` when the node has no curve for it and the track was
/// not baked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Milliseconds from the clip start.
    pub time: f32,
    pub translation: Option<Vec3>,
    /// XYZ Euler, degrees.
    pub rotation: Option<Vec3>,
    pub scale: Option<Vec3>,
}

/// Keyframes of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeKeyframes {
    pub node_id: u32,
    pub keyframes: Vec<Keyframe>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Milliseconds.
    pub duration: f32,
    pub tracks: Vec<NodeKeyframes>,
}

impl AnimationClip {
    /// Number of animated nodes.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tracks.len()
    }
}

/// Clips baked from one action.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSet {
    pub name: String,
    pub clips: Vec<AnimationClip>,
}

impl AnimationSet {
    #[must_use]
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}
