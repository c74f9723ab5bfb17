use std::collections::HashSet;
use topograph_core::{
    ConnectionType, Edge, EdgeFilters, EdgeKey, EdgeKind, FilterState, NodeId, NodeKind,
    SourceMethod,
};

use crate::graph::model::GraphModel;
use crate::util::ids::node_host_key;

/// Show/hide decision for every element of a model. Anything not listed is visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub hidden_nodes: HashSet<NodeId>,
    pub hidden_edges: HashSet<EdgeKey>,
}

impl Visibility {
    pub fn node_visible(&self, id: &NodeId) -> bool {
        !self.hidden_nodes.contains(id)
    }

    pub fn edge_visible(&self, key: &EdgeKey) -> bool {
        !self.hidden_edges.contains(key)
    }
}

/// Edge facets only; endpoint visibility is not considered here.
pub fn edge_passes_facets(edge: &Edge, f: &EdgeFilters) -> bool {
    match &edge.kind {
        EdgeKind::Dependency => f.show_dependencies,
        EdgeKind::Connection {
            connection_type,
            source_method,
        } => {
            // unclassified connections skip the network-type facet
            let network_ok = match connection_type {
                None => true,
                Some(ConnectionType::Internal) => f.show_internal,
                Some(ConnectionType::CrossHost) => f.show_cross_host,
                Some(ConnectionType::External) => f.show_external,
            };
            let source_ok = match source_method {
                SourceMethod::ProcNet => f.show_proc_net,
                SourceMethod::Tcpdump => f.show_tcpdump,
                SourceMethod::Both => f.show_proc_net || f.show_tcpdump,
            };
            network_ok && source_ok && f.show_connections
        }
    }
}

/// Runs the host, edge and external passes in that order.
///
/// An external node stays visible only while an edge that survived the edge
/// pass links it to a visible host or container; links between two externals
/// never count.
///
/// Pure function of its inputs, so re-running it with the same filters
/// always yields the same result.
pub fn compute(model: &GraphModel, filters: &FilterState, default_host_key: &str) -> Visibility {
    let mut vis = Visibility::default();

    // host pass: only an explicit `false` hides
    for (id, node) in &model.nodes {
        if node.kind != NodeKind::Container {
            continue;
        }
        let host = node_host_key(node, default_host_key);
        if filters.host_inclusion.get(host) == Some(&false) {
            vis.hidden_nodes.insert(id.clone());
        }
    }

    // edge pass
    for (key, edge) in &model.edges {
        let endpoint_hidden =
            vis.hidden_nodes.contains(&key.source) || vis.hidden_nodes.contains(&key.target);
        if endpoint_hidden || !edge_passes_facets(edge, &filters.edge_filters) {
            vis.hidden_edges.insert(key.clone());
        }
    }

    // external pass: derived from neighbors reachable through surviving edges
    let mut hidden_externals = Vec::new();
    for (id, node) in &model.nodes {
        if node.kind != NodeKind::External {
            continue;
        }
        let anchored = model.edge_keys_for_node(id).any(|k| {
            if vis.hidden_edges.contains(k) {
                return false;
            }
            let other = k.other(id);
            !vis.hidden_nodes.contains(other)
                && model
                    .node(other)
                    .is_some_and(|n| n.kind != NodeKind::External)
        });
        if !anchored {
            hidden_externals.push(id.clone());
        }
    }
    for id in hidden_externals {
        for k in model.edge_keys_for_node(&id) {
            vis.hidden_edges.insert(k.clone());
        }
        vis.hidden_nodes.insert(id);
    }

    vis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::reconcile::sanitize;
    use topograph_core::{Node, Snapshot};

    fn container(id: &str, host: &str) -> Node {
        Node::new(id, NodeKind::Container, id).with_attr("hostname", host)
    }

    fn external(id: &str) -> Node {
        Node::new(id, NodeKind::External, id)
    }

    fn conn(a: &str, b: &str, ct: ConnectionType, sm: SourceMethod) -> Edge {
        Edge::connection(a, b, ct, sm)
    }

    fn model(nodes: Vec<Node>, edges: Vec<Edge>) -> GraphModel {
        let s = sanitize(Snapshot::new(nodes, edges));
        GraphModel::from_parts(s.nodes, s.edges)
    }

    fn key(e: &Edge) -> EdgeKey {
        e.key()
    }

    fn filters(f: impl FnOnce(&mut FilterState)) -> FilterState {
        let mut s = FilterState::default();
        f(&mut s);
        s
    }

    #[test]
    fn everything_visible_by_default() {
        let m = model(
            vec![container("a", "vm1"), container("b", "vm2"), external("x")],
            vec![
                conn("a", "b", ConnectionType::CrossHost, SourceMethod::ProcNet),
                conn("a", "x", ConnectionType::External, SourceMethod::Tcpdump),
            ],
        );
        let v = compute(&m, &FilterState::default(), "unknown");
        assert_eq!(v, Visibility::default());
    }

    #[test]
    fn hiding_internal_hides_only_internal_connections() {
        let internal = conn("a", "b", ConnectionType::Internal, SourceMethod::ProcNet);
        let cross = conn("b", "c", ConnectionType::CrossHost, SourceMethod::ProcNet);
        let dep = Edge::dependency("a", "b");
        let m = model(
            vec![container("a", "vm1"), container("b", "vm1"), container("c", "vm2")],
            vec![internal.clone(), cross.clone(), dep.clone()],
        );

        let v = compute(&m, &filters(|f| f.edge_filters.show_internal = false), "unknown");

        assert!(!v.edge_visible(&key(&internal)));
        assert!(v.edge_visible(&key(&cross)));
        assert!(v.edge_visible(&key(&dep)));
        assert!(v.hidden_nodes.is_empty());
    }

    #[test]
    fn excluded_host_hides_containers_edges_and_orphaned_externals() {
        let on_vm1 = conn("a1", "x1", ConnectionType::External, SourceMethod::ProcNet);
        let shared_a = conn("a1", "x2", ConnectionType::External, SourceMethod::ProcNet);
        let shared_b = conn("b1", "x2", ConnectionType::External, SourceMethod::ProcNet);
        let cross = conn("a1", "b1", ConnectionType::CrossHost, SourceMethod::ProcNet);
        let m = model(
            vec![container("a1", "vm1"), container("b1", "vm2"), external("x1"), external("x2")],
            vec![on_vm1.clone(), shared_a.clone(), shared_b.clone(), cross.clone()],
        );

        let f = filters(|f| {
            f.host_inclusion.insert("vm1".into(), false);
            f.host_inclusion.insert("vm2".into(), true);
        });
        let v = compute(&m, &f, "unknown");

        assert!(!v.node_visible(&NodeId::from("a1")));
        assert!(v.node_visible(&NodeId::from("b1")));
        assert!(!v.node_visible(&NodeId::from("x1")));
        assert!(v.node_visible(&NodeId::from("x2")));
        assert!(!v.edge_visible(&key(&on_vm1)));
        assert!(!v.edge_visible(&key(&shared_a)));
        assert!(!v.edge_visible(&key(&cross)));
        assert!(v.edge_visible(&key(&shared_b)));
    }

    #[test]
    fn both_edge_needs_either_source_facet() {
        let e = conn("a", "b", ConnectionType::Internal, SourceMethod::Both);
        let m = model(vec![container("a", "vm1"), container("b", "vm1")], vec![e.clone()]);
        let run = |proc_net, tcpdump| {
            let f = filters(|f| {
                f.edge_filters.show_proc_net = proc_net;
                f.edge_filters.show_tcpdump = tcpdump;
            });
            compute(&m, &f, "unknown").edge_visible(&key(&e))
        };

        assert!(run(true, true));
        assert!(run(true, false));
        assert!(run(false, true));
        assert!(!run(false, false));
    }

    #[test]
    fn single_source_edges_follow_their_own_facet() {
        let p = conn("a", "b", ConnectionType::Internal, SourceMethod::ProcNet);
        let t = conn("b", "a", ConnectionType::Internal, SourceMethod::Tcpdump);
        let f = filters(|f| f.edge_filters.show_proc_net = false);
        assert!(!edge_passes_facets(&p, &f.edge_filters));
        assert!(edge_passes_facets(&t, &f.edge_filters));
    }

    #[test]
    fn external_hidden_when_its_only_edge_is_filtered() {
        let e = conn("a", "x", ConnectionType::External, SourceMethod::ProcNet);
        let m = model(vec![container("a", "vm1"), external("x")], vec![e.clone()]);

        let v = compute(&m, &filters(|f| f.edge_filters.show_external = false), "unknown");

        assert!(v.node_visible(&NodeId::from("a")));
        assert!(!v.node_visible(&NodeId::from("x")));
    }

    #[test]
    fn dependency_edges_only_follow_their_toggle() {
        let dep = Edge::dependency("a", "b");
        let m = model(vec![container("a", "vm1"), container("b", "vm1")], vec![dep.clone()]);
        let f = filters(|f| {
            f.edge_filters.show_proc_net = false;
            f.edge_filters.show_tcpdump = false;
            f.edge_filters.show_connections = false;
        });
        assert!(compute(&m, &f, "unknown").edge_visible(&key(&dep)));

        let f = filters(|f| f.edge_filters.show_dependencies = false);
        assert!(!compute(&m, &f, "unknown").edge_visible(&key(&dep)));
    }

    #[test]
    fn missing_hostname_filters_under_default_bucket() {
        let m = model(vec![Node::new("c", NodeKind::Container, "c")], vec![]);
        let f = filters(|f| {
            f.host_inclusion.insert("unknown".into(), false);
        });
        assert!(!compute(&m, &f, "unknown").node_visible(&NodeId::from("c")));
    }

    #[test]
    fn recomputing_is_idempotent() {
        let m = model(
            vec![container("a", "vm1"), container("b", "vm2"), external("x")],
            vec![
                conn("a", "b", ConnectionType::CrossHost, SourceMethod::Both),
                conn("b", "x", ConnectionType::External, SourceMethod::Tcpdump),
            ],
        );
        let f = filters(|f| {
            f.host_inclusion.insert("vm2".into(), false);
            f.edge_filters.show_tcpdump = false;
        });
        assert_eq!(compute(&m, &f, "unknown"), compute(&m, &f, "unknown"));
    }
}
