use crate::node::{Node, NodeId};

/// Arena that owns every node of a document. Nodes are addressed by their
/// NodeId; detaching a node keeps it in the arena so its id stays valid.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Registers the node and returns its assigned id
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        node.id = id;
        self.nodes.push(node);
        id
    }

    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id.0)
    }

    pub fn get_mut_node(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(node_id.0)
    }

    /// Appends the node as the last child of the parent. The node is
    /// detached from its previous parent first.
    pub fn attach_node(&mut self, parent_id: NodeId, node_id: NodeId) {
        debug_assert!(
            !self.has_ancestor(parent_id, node_id),
            "attach would create a cycle"
        );

        self.detach_node(node_id);
        if let Some(node) = self.nodes.get_mut(node_id.0) {
            node.parent = Some(parent_id);
        }
        if let Some(parent) = self.nodes.get_mut(parent_id.0) {
            parent.children.push(node_id);
        }
    }

    /// Inserts the node into the parent's children right before the
    /// reference node. Falls back to append when the reference is not a
    /// child of the parent.
    pub fn insert_before(&mut self, parent_id: NodeId, node_id: NodeId, reference_id: NodeId) {
        debug_assert!(
            !self.has_ancestor(parent_id, node_id),
            "insert would create a cycle"
        );

        self.detach_node(node_id);
        if let Some(node) = self.nodes.get_mut(node_id.0) {
            node.parent = Some(parent_id);
        }
        if let Some(parent) = self.nodes.get_mut(parent_id.0) {
            match parent.children.iter().position(|&c| c == reference_id) {
                Some(idx) => parent.children.insert(idx, node_id),
                None => parent.children.push(node_id),
            }
        }
    }

    /// Removes the node from its parent; the node itself stays in the arena
    pub fn detach_node(&mut self, node_id: NodeId) {
        let parent_id = match self.nodes.get(node_id.0) {
            Some(node) => node.parent,
            None => None,
        };

        if let Some(parent_id) = parent_id {
            if let Some(parent) = self.nodes.get_mut(parent_id.0) {
                parent.children.retain(|&c| c != node_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(node_id.0) {
            node.parent = None;
        }
    }

    /// True when `ancestor_id` is `node_id` or one of its ancestors
    fn has_ancestor(&self, node_id: NodeId, ancestor_id: NodeId) -> bool {
        let mut current = Some(node_id);
        while let Some(id) = current {
            if id == ancestor_id {
                return true;
            }
            current = self.get_node(id).and_then(|n| n.parent);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::HTML_NAMESPACE;

    #[test]
    fn register_node() {
        let mut arena = NodeArena::new();
        let id = arena.add_node(Node::new_element("div", vec![], HTML_NAMESPACE));
        assert_eq!(id, NodeId(0));
        assert_eq!(arena.get_node(id).map(|n| n.name.as_str()), Some("div"));
    }

    #[test]
    fn attach_and_detach() {
        let mut arena = NodeArena::new();
        let parent = arena.add_node(Node::new_document());
        let child = arena.add_node(Node::new_text("hi"));

        arena.attach_node(parent, child);
        assert_eq!(arena.get_node(parent).map(|n| n.children.clone()), Some(vec![child]));
        assert_eq!(arena.get_node(child).and_then(|n| n.parent), Some(parent));

        arena.detach_node(child);
        assert!(arena.get_node(parent).is_some_and(|n| n.children.is_empty()));
        assert_eq!(arena.get_node(child).and_then(|n| n.parent), None);
        // node is still addressable after detach
        assert!(arena.get_node(child).is_some());
    }

    #[test]
    fn reattach_moves_node() {
        let mut arena = NodeArena::new();
        let a = arena.add_node(Node::new_element("a", vec![], HTML_NAMESPACE));
        let b = arena.add_node(Node::new_element("b", vec![], HTML_NAMESPACE));
        let child = arena.add_node(Node::new_text("x"));

        arena.attach_node(a, child);
        arena.attach_node(b, child);

        assert!(arena.get_node(a).is_some_and(|n| n.children.is_empty()));
        assert_eq!(arena.get_node(b).map(|n| n.children.clone()), Some(vec![child]));
        assert_eq!(arena.get_node(child).and_then(|n| n.parent), Some(b));
    }

    #[test]
    fn insert_before_reference() {
        let mut arena = NodeArena::new();
        let parent = arena.add_node(Node::new_element("p", vec![], HTML_NAMESPACE));
        let first = arena.add_node(Node::new_text("1"));
        let second = arena.add_node(Node::new_text("2"));

        arena.attach_node(parent, first);
        arena.insert_before(parent, second, first);

        assert_eq!(
            arena.get_node(parent).map(|n| n.children.clone()),
            Some(vec![second, first])
        );
    }
}
