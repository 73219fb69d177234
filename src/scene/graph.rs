use glam::Mat4;
use slotmap::SlotMap;

use crate::errors::{ExportError, Result};
use crate::scene::NodeKey;
use crate::scene::node::{NodeKind, NodeOrigin, SceneNode};

/// Owner of every output node.
///
/// Nodes live in a slotmap; hierarchy edges are stored on both sides
/// (`parent` on the child, ordered `children` on the parent) and every edge
/// change goes through [`reparent`](Self::reparent), so the two sides and
/// the root list always agree.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: SlotMap<NodeKey, SceneNode>,
    roots: Vec<NodeKey>,
    next_id: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            roots: Vec::new(),
            next_id: 1,
        }
    }

    // ========================================================================
    // Node Management
    // ========================================================================

    /// Creates a node, assigns the next id and attaches it under `parent`
    /// (or as a root).
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        origin: NodeOrigin,
        kind: NodeKind,
        parent: Option<NodeKey>,
    ) -> NodeKey {
        let id = self.next_id;
        self.next_id += 1;

        let name = name.into();
        log::debug!("[{name}] Created {} node with id {id}", kind.type_name());

        let key = self.nodes.insert(SceneNode {
            id,
            name,
            origin,
            kind,
            parent: None,
            children: Vec::new(),
            transform: Mat4::IDENTITY,
            finalized: false,
        });

        match parent {
            Some(p) if self.nodes.contains_key(p) => {
                if let Some(n) = self.nodes.get_mut(p) {
                    n.children.push(key);
                }
                if let Some(n) = self.nodes.get_mut(key) {
                    n.parent = Some(p);
                }
            }
            Some(_) => {
                log::error!("Parent node not found while creating node {id}!");
                self.roots.push(key);
            }
            None => self.roots.push(key),
        }
        key
    }

    /// Moves `child` under `new_parent` (`None` makes it a root).
    ///
    /// Refuses, with a warning, to attach a node to itself or to one of its
    /// descendants, and to move a node whose transform is already
    /// finalized. Returns whether the move happened.
    pub fn reparent(&mut self, child: NodeKey, new_parent: Option<NodeKey>) -> bool {
        let Some(node) = self.nodes.get(child) else {
            log::error!("Node not found during reparent!");
            return false;
        };
        if node.parent == new_parent {
            return true;
        }
        if node.finalized {
            log::warn!("[{}] Cannot reparent a node whose transform is finalized!", node.name);
            return false;
        }
        if let Some(p) = new_parent {
            if !self.nodes.contains_key(p) {
                log::error!("Parent node not found during reparent!");
                return false;
            }
            if p == child || self.is_ancestor(child, p) {
                log::warn!("[{}] Cannot attach node to itself or one of its descendants!", node.name);
                return false;
            }
        }

        // 1. Detach from old
        let old_parent = node.parent;
        if let Some(p) = old_parent {
            if let Some(n) = self.nodes.get_mut(p)
                && let Some(i) = n.children.iter().position(|&x| x == child)
            {
                n.children.remove(i);
            }
        } else if let Some(i) = self.roots.iter().position(|&x| x == child) {
            self.roots.remove(i);
        }

        // 2. Attach to new
        match new_parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.push(child),
            None => self.roots.push(child),
        }

        // 3. Update child
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = new_parent;
        }
        true
    }

    /// Stores the node's local matrix. A transform is finalized exactly once.
    pub fn finalize_transform(&mut self, key: NodeKey, matrix: Mat4) -> Result<()> {
        let node = self
            .nodes
            .get_mut(key)
            .ok_or_else(|| ExportError::MissingObject(format!("scene node {key:?}")))?;
        if node.finalized {
            log::warn!("[{}] Transform already finalized, keeping the first one", node.name);
            return Ok(());
        }
        node.transform = matrix;
        node.finalized = true;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: NodeKey) -> Option<&mut SceneNode> {
        self.nodes.get_mut(key)
    }

    /// Like [`get`](Self::get) but reports a dangling key as an error.
    pub fn node(&self, key: NodeKey) -> Result<&SceneNode> {
        self.nodes
            .get(key)
            .ok_or_else(|| ExportError::MissingObject(format!("scene node {key:?}")))
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    /// All nodes in pre-order, roots and children in insertion order.
    #[must_use]
    pub fn depth_first(&self) -> Vec<NodeKey> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            if let Some(node) = self.nodes.get(key) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.nodes.iter().find(|(_, n)| n.name == name).map(|(k, _)| k)
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeKey, node: NodeKey) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes.get(p).and_then(|n| n.parent);
        }
        false
    }

    /// Nearest ancestor that produces an output node.
    #[must_use]
    pub fn emitted_parent(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = self.nodes.get(key)?.parent;
        while let Some(p) = current {
            let node = self.nodes.get(p)?;
            if node.is_emitted() {
                return Some(p);
            }
            current = node.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::CollectionKey;

    fn group(graph: &mut SceneGraph, name: &str, parent: Option<NodeKey>) -> NodeKey {
        graph.add_node(
            name,
            NodeOrigin::Collection(CollectionKey::default()),
            NodeKind::TransformGroup,
            parent,
        )
    }

    #[test]
    fn ids_start_at_one() {
        let mut graph = SceneGraph::new();
        let a = group(&mut graph, "a", None);
        let b = group(&mut graph, "b", Some(a));
        assert_eq!(graph.get(a).unwrap().id, 1);
        assert_eq!(graph.get(b).unwrap().id, 2);
    }

    #[test]
    fn reparent_keeps_both_sides_in_sync() {
        let mut graph = SceneGraph::new();
        let a = group(&mut graph, "a", None);
        let b = group(&mut graph, "b", None);
        let c = group(&mut graph, "c", Some(a));

        assert!(graph.reparent(c, Some(b)));
        assert!(graph.get(a).unwrap().children().is_empty());
        assert_eq!(graph.get(b).unwrap().children(), &[c]);
        assert_eq!(graph.get(c).unwrap().parent(), Some(b));

        assert!(graph.reparent(c, None));
        assert_eq!(graph.roots(), &[a, b, c]);
    }

    #[test]
    fn reparent_rejects_cycles() {
        let mut graph = SceneGraph::new();
        let a = group(&mut graph, "a", None);
        let b = group(&mut graph, "b", Some(a));
        assert!(!graph.reparent(a, Some(b)));
        assert!(!graph.reparent(a, Some(a)));
        assert_eq!(graph.get(a).unwrap().parent(), None);
    }

    #[test]
    fn finalized_nodes_do_not_move() {
        let mut graph = SceneGraph::new();
        let a = group(&mut graph, "a", None);
        let b = group(&mut graph, "b", None);
        graph.finalize_transform(b, Mat4::IDENTITY).unwrap();
        assert!(!graph.reparent(b, Some(a)));
    }

    #[test]
    fn depth_first_is_preorder() {
        let mut graph = SceneGraph::new();
        let a = group(&mut graph, "a", None);
        let b = group(&mut graph, "b", Some(a));
        let c = group(&mut graph, "c", None);
        let d = group(&mut graph, "d", Some(b));
        assert_eq!(graph.depth_first(), vec![a, b, d, c]);
    }
}
