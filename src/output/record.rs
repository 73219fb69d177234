use glam::Vec3;

/// Scene element a node is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeElement {
    TransformGroup,
    Shape,
    Light,
    Camera,
}

impl NodeElement {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            NodeElement::TransformGroup => "TransformGroup",
            NodeElement::Shape => "Shape",
            NodeElement::Light => "Light",
            NodeElement::Camera => "Camera",
        }
    }
}

/// Output form of a finalized scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: u32,
    pub name: String,
    pub element: NodeElement,
    pub translation: Vec3,
    /// XYZ Euler, degrees.
    pub rotation: Vec3,
    pub scale: Vec3,
    pub shape_id: Option<u32>,
    pub skin_bind_node_ids: Vec<u32>,
}
