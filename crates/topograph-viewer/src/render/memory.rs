use indexmap::IndexMap;
use serde::Serialize;
use topograph_core::{Edge, EdgeKey, Node, NodeId, Point};

use crate::graph::colors::Color;
use crate::graph::visibility::Visibility;
use crate::render::surface::{Emphasis, RenderSurface, SurfacePatch, ViewportCommand};

pub const FULL_OPACITY: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub node: Node,
    pub position: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    pub hidden: bool,
    pub opacity: f32,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEdge {
    pub edge: Edge,
    pub hidden: bool,
    pub opacity: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SurfaceDump {
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<RenderedEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportCommand>,
}

/// Headless surface: keeps exactly what a canvas would draw.
#[derive(Debug, Default)]
pub struct MemorySurface {
    nodes: IndexMap<NodeId, RenderedNode>,
    edges: IndexMap<EdgeKey, RenderedEdge>,
    viewport: Option<ViewportCommand>,
    updates: usize,
    initialized: bool,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a node the way a user drag would. Returns false for unknown ids.
    pub fn drag(&mut self, id: &NodeId, to: Point) -> bool {
        let Some(n) = self.nodes.get_mut(id) else {
            return false;
        };
        n.position = to;
        true
    }

    pub fn node(&self, id: &NodeId) -> Option<&RenderedNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&RenderedEdge> {
        self.edges.get(key)
    }

    pub fn position(&self, id: &NodeId) -> Option<Point> {
        self.nodes.get(id).map(|n| n.position)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn viewport(&self) -> Option<&ViewportCommand> {
        self.viewport.as_ref()
    }

    /// Number of `update` calls so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn dump(&self) -> SurfaceDump {
        SurfaceDump {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            viewport: self.viewport.clone(),
        }
    }
}

impl RenderSurface for MemorySurface {
    fn init(&mut self) {
        self.initialized = true;
    }

    fn update(&mut self, patch: &SurfacePatch) {
        self.updates += 1;

        for key in &patch.removed_edges {
            self.edges.shift_remove(key);
        }
        for id in &patch.removed_nodes {
            self.nodes.shift_remove(id);
            // a canvas drops incident edges with the node
            self.edges.retain(|k, _| !k.touches(id));
        }

        for p in &patch.upserted_nodes {
            match self.nodes.get_mut(&p.node.id) {
                Some(existing) => {
                    existing.node = p.node.clone();
                    if let Some(pos) = p.position {
                        existing.position = pos;
                    }
                    if p.color.is_some() {
                        existing.color = p.color;
                    }
                }
                None => {
                    self.nodes.insert(
                        p.node.id.clone(),
                        RenderedNode {
                            node: p.node.clone(),
                            // unpositioned nodes land at the origin like a fresh canvas element
                            position: p.position.unwrap_or(Point::ORIGIN),
                            color: p.color,
                            hidden: false,
                            opacity: FULL_OPACITY,
                            highlighted: false,
                        },
                    );
                }
            }
        }

        for e in &patch.upserted_edges {
            let key = e.key();
            if !self.nodes.contains_key(&key.source) || !self.nodes.contains_key(&key.target) {
                tracing::debug!(edge = %key, "surface ignored edge with missing endpoint");
                continue;
            }
            match self.edges.get_mut(&key) {
                Some(existing) => existing.edge = e.clone(),
                None => {
                    self.edges.insert(
                        key,
                        RenderedEdge {
                            edge: e.clone(),
                            hidden: false,
                            opacity: FULL_OPACITY,
                        },
                    );
                }
            }
        }
    }

    fn node_positions(&self) -> Vec<(NodeId, Point)> {
        self.nodes
            .iter()
            .map(|(id, n)| (id.clone(), n.position))
            .collect()
    }

    fn apply_visibility(&mut self, visibility: &Visibility) {
        for (id, n) in self.nodes.iter_mut() {
            n.hidden = visibility.hidden_nodes.contains(id);
        }
        for (key, e) in self.edges.iter_mut() {
            e.hidden = visibility.hidden_edges.contains(key);
        }
    }

    fn apply_emphasis(&mut self, emphasis: &Emphasis) {
        match emphasis {
            Emphasis::Cleared => {
                for n in self.nodes.values_mut() {
                    n.opacity = FULL_OPACITY;
                    n.highlighted = false;
                }
                for e in self.edges.values_mut() {
                    e.opacity = FULL_OPACITY;
                }
            }
            Emphasis::Search {
                highlighted,
                dim_opacity,
            } => {
                for (id, n) in self.nodes.iter_mut() {
                    let hit = highlighted.contains(id);
                    n.highlighted = hit;
                    n.opacity = if hit { FULL_OPACITY } else { *dim_opacity };
                }
                for e in self.edges.values_mut() {
                    e.opacity = *dim_opacity;
                }
            }
        }
    }

    fn apply_viewport(&mut self, command: &ViewportCommand) {
        self.viewport = Some(command.clone());
    }

    fn destroy(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.viewport = None;
        self.initialized = false;
    }
}
