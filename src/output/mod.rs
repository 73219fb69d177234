//! Output side: records handed to a [`SerializationSink`] and the i3d XML
//! document that implements it.

pub mod document;
pub mod record;
pub mod sink;

pub use document::I3dDocument;
pub use record::{NodeElement, NodeRecord};
pub use sink::SerializationSink;
