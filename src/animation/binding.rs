use rustc_hash::FxHashMap;

use crate::scene::NodeKey;
use crate::source::ActionKey;

/// Binding relationship: `node` is animated by the channel bag `slot` of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBinding {
    pub node: NodeKey,
    pub slot: String,
}

/// Every node bound to one action.
#[derive(Debug, Clone)]
pub struct ActionBinding {
    pub action: ActionKey,
    pub bindings: Vec<SlotBinding>,
}

/// Action to node links collected during traversal, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct AnimationLinks {
    entries: Vec<ActionBinding>,
    index: FxHashMap<ActionKey, usize>,
}

impl AnimationLinks {
    pub fn link(&mut self, action: ActionKey, node: NodeKey, slot: impl Into<String>) {
        let i = *self.index.entry(action).or_insert_with(|| {
            self.entries.push(ActionBinding {
                action,
                bindings: Vec::new(),
            });
            self.entries.len() - 1
        });
        self.entries[i].bindings.push(SlotBinding {
            node,
            slot: slot.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionBinding> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bound nodes, across actions.
    pub fn nodes(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.entries.iter().flat_map(|e| e.bindings.iter().map(|b| b.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn groups_by_action_in_first_seen_order() {
        let mut actions: SlotMap<ActionKey, ()> = SlotMap::with_key();
        let walk = actions.insert(());
        let open = actions.insert(());
        let mut nodes: SlotMap<NodeKey, ()> = SlotMap::with_key();
        let (a, b, c) = (nodes.insert(()), nodes.insert(()), nodes.insert(()));

        let mut links = AnimationLinks::default();
        links.link(open, a, "OBDoor");
        links.link(walk, b, "OBRig");
        links.link(open, c, "OBLid");

        let order: Vec<_> = links.iter().map(|e| (e.action, e.bindings.len())).collect();
        assert_eq!(order, vec![(open, 2), (walk, 1)]);
        assert_eq!(links.nodes().collect::<Vec<_>>(), vec![a, c, b]);
    }
}
