use serde::Serialize;
use std::collections::HashSet;
use topograph_core::{Edge, EdgeKey, Node, NodeId, Point};

use crate::graph::colors::Color;
use crate::graph::visibility::Visibility;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePatch {
    pub node: Node,
    /// `None` keeps whatever the surface shows.
    pub position: Option<Point>,
    pub color: Option<Color>,
}

/// Everything one reconciliation cycle changes, applied in one batch.
///
/// Order of application: removed edges, removed nodes, upserted nodes,
/// upserted edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurfacePatch {
    pub removed_edges: Vec<EdgeKey>,
    pub removed_nodes: Vec<NodeId>,
    pub upserted_nodes: Vec<NodePatch>,
    pub upserted_edges: Vec<Edge>,
}

impl SurfacePatch {
    pub fn is_empty(&self) -> bool {
        self.removed_edges.is_empty()
            && self.removed_nodes.is_empty()
            && self.upserted_nodes.is_empty()
            && self.upserted_edges.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Emphasis {
    #[default]
    Cleared,
    Search {
        highlighted: HashSet<NodeId>,
        dim_opacity: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "nodes", rename_all = "snake_case")]
pub enum ViewportCommand {
    Center(NodeId),
    Fit(Vec<NodeId>),
}

/// A canvas the engine can drive.
pub trait RenderSurface {
    fn init(&mut self) {}

    fn update(&mut self, patch: &SurfacePatch);

    /// Current coordinates of every rendered node.
    fn node_positions(&self) -> Vec<(NodeId, Point)>;

    fn apply_visibility(&mut self, visibility: &Visibility);

    fn apply_emphasis(&mut self, emphasis: &Emphasis);

    fn apply_viewport(&mut self, command: &ViewportCommand);

    fn destroy(&mut self) {}
}
