use indexmap::IndexMap;
use std::collections::HashMap;
use topograph_core::{Edge, EdgeKey, Node, NodeId, NodeKind, Point, Snapshot};

use crate::graph::colors::ColorAssignmentService;
use crate::graph::model::{node_kind_name, GraphModel};
use crate::render::{NodePatch, SurfacePatch};

/// Why a snapshot record was left out of the model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("edge {key} references missing node {missing}")]
    MissingEndpoint { key: EdgeKey, missing: NodeId },
    #[error("self-loop edge on {0}")]
    SelfLoop(NodeId),
    #[error("duplicate edge {0}")]
    DuplicateEdge(EdgeKey),
}

#[derive(Debug, Default)]
pub struct Sanitized {
    pub nodes: IndexMap<NodeId, Node>,
    pub edges: IndexMap<EdgeKey, Edge>,
    pub rejections: Vec<Rejection>,
}

/// Drops the records that would break the model invariants, one at a time.
pub fn sanitize(snapshot: Snapshot) -> Sanitized {
    let mut out = Sanitized {
        nodes: IndexMap::with_capacity(snapshot.nodes.len()),
        edges: IndexMap::with_capacity(snapshot.edges.len()),
        rejections: Vec::new(),
    };

    for node in snapshot.nodes {
        if out.nodes.contains_key(&node.id) {
            out.rejections.push(Rejection::DuplicateNode(node.id));
            continue;
        }
        out.nodes.insert(node.id.clone(), node);
    }

    for edge in snapshot.edges {
        let key = edge.key();
        let missing = [&key.source, &key.target]
            .into_iter()
            .find(|id| !out.nodes.contains_key(*id))
            .cloned();
        if let Some(missing) = missing {
            let rejection = Rejection::MissingEndpoint { key, missing };
            out.rejections.push(rejection);
            continue;
        }
        if key.source == key.target {
            out.rejections.push(Rejection::SelfLoop(key.source));
            continue;
        }
        if out.edges.contains_key(&key) {
            out.rejections.push(Rejection::DuplicateEdge(key));
            continue;
        }
        out.edges.insert(key, edge);
    }

    for r in &out.rejections {
        tracing::debug!(reason = %r, "dropped snapshot record");
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    pub retained: Vec<NodeId>,
    pub added_edges: Vec<EdgeKey>,
    pub removed_edges: Vec<EdgeKey>,
    pub retained_edges: Vec<EdgeKey>,
}

/// Identity diff. Added/retained follow the new snapshot's order, removed the old model's.
pub fn diff(old: &GraphModel, new: &GraphModel) -> Diff {
    let mut d = Diff::default();

    for id in new.nodes.keys() {
        if old.nodes.contains_key(id) {
            d.retained.push(id.clone());
        } else {
            d.added.push(id.clone());
        }
    }
    d.removed = old
        .nodes
        .keys()
        .filter(|id| !new.nodes.contains_key(*id))
        .cloned()
        .collect();

    for key in new.edges.keys() {
        if old.edges.contains_key(key) {
            d.retained_edges.push(key.clone());
        } else {
            d.added_edges.push(key.clone());
        }
    }
    d.removed_edges = old
        .edges
        .keys()
        .filter(|k| !new.edges.contains_key(*k))
        .cloned()
        .collect();

    d
}

/// Surface changes that turn `old` into `new`.
///
/// Retained nodes only carry a position when the resolved one differs from
/// what the surface showed at capture time (saved override, pending drag,
/// re-placement of a degenerate coordinate). Untouched retained elements are
/// left out entirely so the surface never redraws them.
pub fn build_patch(
    old: &GraphModel,
    new: &GraphModel,
    d: &Diff,
    resolved: &HashMap<NodeId, Point>,
    live: &HashMap<NodeId, Point>,
    colors: &ColorAssignmentService,
) -> SurfacePatch {
    let mut patch = SurfacePatch {
        removed_edges: d.removed_edges.clone(),
        removed_nodes: d.removed.clone(),
        ..SurfacePatch::default()
    };

    for (id, node) in &new.nodes {
        // Assigned in snapshot order so first-seen hosts get the first colors.
        let color = match node.kind {
            NodeKind::Host | NodeKind::Container => Some(colors.color_for(node.hostname())),
            NodeKind::External => None,
        };
        let target = resolved.get(id).copied();

        let Some(previous) = old.nodes.get(id) else {
            if target.is_none() {
                tracing::debug!(
                    node = %id,
                    kind = node_kind_name(node.kind),
                    "added node has no position"
                );
            }
            patch.upserted_nodes.push(NodePatch {
                node: node.clone(),
                position: target,
                color,
            });
            continue;
        };

        let position = match (target, live.get(id)) {
            (Some(p), Some(on_screen)) if p == *on_screen => None,
            (p, _) => p,
        };
        if position.is_none() && previous == node {
            continue;
        }
        patch.upserted_nodes.push(NodePatch {
            node: node.clone(),
            position,
            color,
        });
    }

    for (key, edge) in &new.edges {
        if old.edges.get(key) != Some(edge) {
            patch.upserted_edges.push(edge.clone());
        }
    }

    patch
}
