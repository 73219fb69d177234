//! Output scene graph.
//!
//! Built from the source scene in phases:
//! - [`builder`]: traversal, one node per exported object or bone
//! - [`deferred`]: child-of constraints and shapes that need the full graph
//! - [`transform`]: local matrices in the target basis, once per node
//!
//! [`SceneGraph`] owns the nodes; [`NodeKind`] is the closed set of node
//! variants the file format knows about.

pub mod builder;
pub mod convert;
pub mod deferred;
pub mod graph;
pub mod node;
pub mod resolve;
pub mod shapes;
pub mod transform;

pub use builder::{BuiltGraph, SceneGraphBuilder};
pub use convert::AxisConversion;
pub use deferred::{DeferredConstraint, DeferredQueue, DeferredShape, MergeGroup};
pub use graph::SceneGraph;
pub use node::{ArmatureRoot, BoneNode, MergeGroupMember, NodeKind, NodeOrigin, SceneNode, ShapeBinding};
pub use resolve::{NodeType, NodeTypeResolver};
pub use shapes::{ShapeKind, ShapeRecord, ShapeTable};
pub use transform::{BoneCase, BoneMatrixSource, TransformResolver, Trs, finalize_transforms};

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeKey;
}
