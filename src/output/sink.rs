use crate::animation::AnimationSet;
use crate::errors::Result;
use crate::output::record::NodeRecord;
use crate::scene::ShapeRecord;

/// Receiver of the finished export.
///
/// Nodes arrive parents first, so `parent` always names a node the sink has
/// already seen. Shapes arrive before nodes, animation sets after them.
pub trait SerializationSink {
    fn append_shape(&mut self, shape: &ShapeRecord) -> Result<()>;

    fn append_node(&mut self, parent: Option<u32>, node: NodeRecord) -> Result<()>;

    fn append_animation_set(&mut self, set: &AnimationSet) -> Result<()>;

    /// Called once after everything was appended.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
