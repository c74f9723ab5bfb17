use indexmap::IndexMap;
use smallvec::SmallVec;
use std::collections::HashMap;
use topograph_core::{Edge, EdgeKey, Node, NodeId, NodeKind};

/// The node/edge set currently on the surface. Iteration follows snapshot order.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    pub nodes: IndexMap<NodeId, Node>,
    pub edges: IndexMap<EdgeKey, Edge>,
    adjacency: HashMap<NodeId, SmallVec<[EdgeKey; 4]>>,
}

impl GraphModel {
    /// Callers guarantee every edge endpoint is in `nodes` (see `reconcile::sanitize`).
    pub fn from_parts(nodes: IndexMap<NodeId, Node>, edges: IndexMap<EdgeKey, Edge>) -> Self {
        let mut adjacency: HashMap<NodeId, SmallVec<[EdgeKey; 4]>> = HashMap::new();
        for key in edges.keys() {
            adjacency
                .entry(key.source.clone())
                .or_default()
                .push(key.clone());
            adjacency
                .entry(key.target.clone())
                .or_default()
                .push(key.clone());
        }
        Self {
            nodes,
            edges,
            adjacency,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge_keys_for_node<'a>(&'a self, id: &NodeId) -> impl Iterator<Item = &'a EdgeKey> + 'a {
        self.adjacency.get(id).into_iter().flat_map(|v| v.iter())
    }

    /// Other endpoint of every incident edge; may repeat a node linked twice.
    pub fn neighbors<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.edge_keys_for_node(id).map(move |k| k.other(id))
    }
}

pub fn node_kind_name(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Host => "host",
        NodeKind::Container => "container",
        NodeKind::External => "external",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::{ConnectionType, SourceMethod};

    fn model() -> GraphModel {
        let nodes: IndexMap<NodeId, Node> = [
            Node::new("a", NodeKind::Container, "a"),
            Node::new("b", NodeKind::Container, "b"),
            Node::new("x", NodeKind::External, "1.2.3.4"),
        ]
        .into_iter()
        .map(|n| (n.id.clone(), n))
        .collect();
        let edges: IndexMap<EdgeKey, Edge> = [
            Edge::connection("a", "x", ConnectionType::External, SourceMethod::ProcNet),
            Edge::dependency("a", "b"),
        ]
        .into_iter()
        .map(|e| (e.key(), e))
        .collect();
        GraphModel::from_parts(nodes, edges)
    }

    #[test]
    fn neighbors_cover_both_directions() {
        let m = model();
        let a = NodeId::from("a");
        let x = NodeId::from("x");
        let mut na: Vec<_> = m.neighbors(&a).map(|n| n.0.clone()).collect();
        na.sort();
        assert_eq!(na, vec!["b", "x"]);
        assert_eq!(m.neighbors(&x).collect::<Vec<_>>(), vec![&a]);
        assert_eq!(m.neighbors(&NodeId::from("missing")).count(), 0);
    }

    #[test]
    fn edge_keys_for_node_point_at_stored_edges() {
        let m = model();
        let b = NodeId::from("b");
        let keys: Vec<_> = m.edge_keys_for_node(&b).collect();
        assert_eq!(keys.len(), 1);
        assert_eq!(m.edges.get(keys[0]).map(|e| e.source.clone()), Some(NodeId::from("a")));
    }
}
