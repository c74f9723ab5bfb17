//! Property tests for the reconcile/visibility engine:
//!
//! 1. Retained nodes keep their rendered coordinate across a snapshot.
//! 2. A new node with a positioned neighbor lands within the offset range of one.
//! 3. Rendered edges always have both endpoints rendered.
//! 4. Visibility is idempotent and externals are only shown when anchored.

use proptest::prelude::*;
use std::collections::HashMap;
use topograph_core::{
    ConnectionType, Edge, EdgeFilters, FilterState, Node, NodeId, NodeKind, Point, Snapshot,
    SourceMethod,
};
use topograph_viewer::app::Viewer;
use topograph_viewer::graph::visibility;
use topograph_viewer::graph::GraphModel;
use topograph_viewer::render::MemorySurface;
use topograph_viewer::util::config::ViewerConfig;

const UNIVERSE: usize = 12;
const HOSTS: [&str; 3] = ["vm1", "vm2", "vm3"];

fn node_for(i: usize, host: usize) -> Node {
    // every fourth id is an external endpoint
    if i % 4 == 3 {
        Node::new(format!("ext:{i}"), NodeKind::External, format!("10.0.0.{i}"))
    } else {
        Node::new(format!("c:{i}"), NodeKind::Container, format!("svc-{i}"))
            .with_attr("hostname", HOSTS[host])
    }
}

fn id_for(i: usize) -> String {
    if i % 4 == 3 {
        format!("ext:{i}")
    } else {
        format!("c:{i}")
    }
}

fn edge_for(a: usize, b: usize, kind: u8) -> Edge {
    let (a, b) = (id_for(a), id_for(b));
    match kind % 5 {
        0 => Edge::dependency(a, b),
        1 => Edge::connection(a, b, ConnectionType::Internal, SourceMethod::ProcNet),
        2 => Edge::connection(a, b, ConnectionType::CrossHost, SourceMethod::Tcpdump),
        3 => Edge::connection(a, b, ConnectionType::External, SourceMethod::Both),
        _ => Edge::connection(a, b, ConnectionType::Internal, SourceMethod::Both),
    }
}

/// Random snapshot over a fixed id universe. Edges may reference absent
/// nodes or loop; sanitation has to cope.
fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (
        prop::collection::vec((any::<bool>(), 0usize..HOSTS.len()), UNIVERSE),
        prop::collection::vec((0usize..UNIVERSE, 0usize..UNIVERSE, any::<u8>()), 0..20),
    )
        .prop_map(|(present, edges)| {
            let nodes = present
                .iter()
                .enumerate()
                .filter(|(_, (p, _))| *p)
                .map(|(i, (_, host))| node_for(i, *host))
                .collect();
            let edges = edges.into_iter().map(|(a, b, k)| edge_for(a, b, k)).collect();
            Snapshot::new(nodes, edges)
        })
}

fn filters_strategy() -> impl Strategy<Value = FilterState> {
    (
        prop::collection::vec(any::<bool>(), 7),
        prop::collection::vec(any::<Option<bool>>(), HOSTS.len()),
    )
        .prop_map(|(f, hosts)| FilterState {
            edge_filters: EdgeFilters {
                show_internal: f[0],
                show_cross_host: f[1],
                show_external: f[2],
                show_proc_net: f[3],
                show_tcpdump: f[4],
                show_connections: f[5],
                show_dependencies: f[6],
            },
            host_inclusion: HOSTS
                .iter()
                .zip(hosts)
                .filter_map(|(h, v)| v.map(|v| (h.to_string(), v)))
                .collect(),
        })
}

fn viewer() -> Viewer<MemorySurface> {
    let cfg = ViewerConfig {
        layout_seed: Some(17),
        layout_iterations: 20,
        ..ViewerConfig::default()
    };
    match Viewer::new(&cfg, MemorySurface::new()) {
        Ok(v) => v,
        Err(e) => panic!("viewer: {e}"),
    }
}

fn positions(v: &Viewer<MemorySurface>) -> HashMap<NodeId, Point> {
    v.surface.dump().nodes.into_iter().map(|n| (n.node.id, n.position)).collect()
}

proptest! {
    #[test]
    fn retained_nodes_keep_their_coordinates(
        first in snapshot_strategy(),
        second in snapshot_strategy(),
    ) {
        let mut v = viewer();
        v.on_snapshot(first);
        let before = positions(&v);

        v.on_snapshot(second);
        let after = positions(&v);

        for (id, p) in &after {
            if let Some(old) = before.get(id) {
                prop_assert_eq!(p, old, "retained node {} moved", id);
            }
        }
    }
}

proptest! {
    #[test]
    fn anchored_new_nodes_land_near_a_neighbor(
        first in snapshot_strategy(),
        second in snapshot_strategy(),
    ) {
        let mut v = viewer();
        v.on_snapshot(first);
        let before = positions(&v);
        if before.is_empty() {
            return Ok(());
        }

        v.on_snapshot(second);
        let after = positions(&v);
        let model: &GraphModel = &v.st.model;

        for id in after.keys().filter(|id| !before.contains_key(*id)) {
            let has_retained_neighbor = model.neighbors(id).any(|nb| before.contains_key(nb));
            if !has_retained_neighbor {
                continue;
            }
            let p = after[id];
            let near = model
                .neighbors(id)
                .filter_map(|nb| after.get(nb))
                .any(|q| q.distance(p) <= 120.0 + 1e-6);
            prop_assert!(near, "new node {} is not near any neighbor", id);
        }
    }
}

proptest! {
    #[test]
    fn rendered_edges_have_rendered_endpoints(
        snaps in prop::collection::vec(snapshot_strategy(), 1..4),
    ) {
        let mut v = viewer();
        for s in snaps {
            v.on_snapshot(s);
        }
        let dump = v.surface.dump();
        let ids: std::collections::HashSet<_> =
            dump.nodes.iter().map(|n| n.node.id.clone()).collect();
        prop_assert_eq!(dump.nodes.len(), v.st.model.nodes.len());
        prop_assert_eq!(dump.edges.len(), v.st.model.edges.len());
        for e in &dump.edges {
            prop_assert!(ids.contains(&e.edge.source) && ids.contains(&e.edge.target));
            prop_assert!(e.edge.source != e.edge.target);
        }
    }
}

proptest! {
    #[test]
    fn visibility_is_idempotent_and_externals_are_derived(
        s in snapshot_strategy(),
        f in filters_strategy(),
    ) {
        let mut v = viewer();
        v.on_snapshot(s);
        v.on_filter_change(f.clone());
        let once = v.surface.dump();
        v.on_filter_change(f.clone());
        prop_assert_eq!(&once, &v.surface.dump());

        let model = &v.st.model;
        let vis = visibility::compute(model, &f, "unknown");
        prop_assert_eq!(&vis, &v.st.visibility);

        for (id, node) in &model.nodes {
            if node.kind != NodeKind::External || !vis.node_visible(id) {
                continue;
            }
            let anchored = model.edge_keys_for_node(id).any(|k| {
                let other = k.other(id);
                vis.edge_visible(k)
                    && vis.node_visible(other)
                    && model.node(other).is_some_and(|n| n.kind != NodeKind::External)
            });
            prop_assert!(anchored, "external {} visible without a visible neighbor", id);
        }
        for key in model.edges.keys() {
            if vis.edge_visible(key) {
                prop_assert!(vis.node_visible(&key.source) && vis.node_visible(&key.target));
            }
        }
    }
}
