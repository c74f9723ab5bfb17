use crossbeam_channel::{Receiver, Sender};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;
use topograph_core::{FilterState, Node, NodeId, Point, SavedLayout, Snapshot, ViewerEvent};

use crate::graph::colors::{Color, ColorAssignmentService};
use crate::graph::layout::{ForceParams, LayoutRun};
use crate::graph::metrics::{CycleStats, PerfState};
use crate::graph::model::GraphModel;
use crate::graph::placement::{place_new_nodes, PlacementParams};
use crate::graph::positions::PositionStore;
use crate::graph::reconcile::{build_patch, diff, sanitize, Diff};
use crate::graph::search::{self, SearchParams};
use crate::graph::visibility::{self, Visibility};
use crate::render::{NodePatch, RenderSurface, SurfacePatch};
use crate::util::config::{LayoutMode, ViewerConfig};

#[derive(Debug, Default)]
pub struct UiState {
    pub selected: Option<NodeId>,
    pub search_query: String,
    pub search_hits: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct CfgState {
    pub layout: ForceParams,
    pub layout_mode: LayoutMode,
    pub iterations_per_tick: usize,
    pub placement: PlacementParams,
    pub search: SearchParams,
    pub default_host_key: String,
}

impl Default for CfgState {
    fn default() -> Self {
        Self {
            layout: ForceParams::default(),
            layout_mode: LayoutMode::Blocking,
            iterations_per_tick: 25,
            placement: PlacementParams::default(),
            search: SearchParams::default(),
            default_host_key: "unknown".to_string(),
        }
    }
}

/// A reconciliation waiting for its force layout to finish.
struct PendingCycle {
    next: GraphModel,
    diff: Diff,
    stats: CycleStats,
    layout: LayoutRun,
    started: Instant,
}

/// The engine: current model plus everything needed to move the surface
/// from one snapshot to the next.
pub struct GraphState {
    pub model: GraphModel,
    pub positions: PositionStore,
    pub filters: FilterState,
    pub visibility: Visibility,
    pub ui: UiState,
    pub perf: PerfState,
    pub cfg: CfgState,

    colors: Rc<ColorAssignmentService>,
    events: Sender<ViewerEvent>,
    pending: Option<PendingCycle>,
    rng: StdRng,
}

impl GraphState {
    pub fn new(
        cfg: &ViewerConfig,
        colors: Rc<ColorAssignmentService>,
    ) -> (Self, Receiver<ViewerEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let rng = match cfg.layout_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut st = Self {
            model: GraphModel::default(),
            positions: PositionStore::default(),
            filters: FilterState {
                edge_filters: cfg.edge_filters,
                ..FilterState::default()
            },
            visibility: Visibility::default(),
            ui: UiState::default(),
            perf: PerfState::default(),
            cfg: CfgState::default(),
            colors,
            events: tx,
            pending: None,
            rng,
        };
        st.apply_viewer_config(cfg);
        (st, rx)
    }

    pub fn apply_viewer_config(&mut self, cfg: &ViewerConfig) {
        self.cfg.layout = ForceParams {
            repulsion: cfg.repulsion,
            ideal_edge_length: cfg.ideal_edge_length,
            edge_elasticity: cfg.edge_elasticity,
            gravity: cfg.gravity,
            damping: cfg.damping,
            max_step: cfg.max_step,
            iterations: cfg.layout_iterations,
        };
        self.cfg.layout_mode = cfg.layout_mode;
        self.cfg.iterations_per_tick = cfg.layout_iterations_per_tick.max(1);
        self.cfg.placement = PlacementParams {
            offset_min: cfg.placement_offset_min,
            offset_max: cfg.placement_offset_max,
            ring_margin: cfg.ring_margin,
        };
        self.cfg.search = SearchParams {
            dim_opacity: cfg.search_dim_opacity,
            fit_max: cfg.search_fit_max,
        };
        self.cfg.default_host_key = cfg.default_host_key.clone();
    }

    // ----- Snapshot cycle -----

    /// Starts a reconciliation. In blocking mode, and whenever no full
    /// layout is needed, the cycle commits before this returns.
    pub fn on_snapshot(&mut self, snapshot: Snapshot, surface: &mut dyn RenderSurface) {
        self.on_message();
        if self.pending.take().is_some() {
            self.perf.superseded += 1;
            tracing::debug!("newer snapshot superseded an unfinished layout");
        }

        let started = Instant::now();
        let sanitized = sanitize(snapshot);
        let rejected = sanitized.rejections.len();
        let next = GraphModel::from_parts(sanitized.nodes, sanitized.edges);

        self.positions.capture_live(surface.node_positions());
        let d = diff(&self.model, &next);
        let stats = CycleStats {
            added: d.added.len(),
            removed: d.removed.len(),
            retained: d.retained.len(),
            added_edges: d.added_edges.len(),
            removed_edges: d.removed_edges.len(),
            rejected,
            ..CycleStats::default()
        };

        let resolution = self.positions.resolve_all(next.nodes.keys());
        let mut resolved = resolution.resolved;

        if resolved.is_empty() && !resolution.unresolved.is_empty() {
            let layout = LayoutRun::new(&next, self.cfg.layout, &mut self.rng);
            let cycle = PendingCycle {
                next,
                diff: d,
                stats: CycleStats {
                    full_layout: true,
                    ..stats
                },
                layout,
                started,
            };
            match self.cfg.layout_mode {
                LayoutMode::Blocking => {
                    let mut cycle = cycle;
                    cycle.layout.run_to_completion();
                    self.commit_layout(cycle, surface);
                }
                LayoutMode::Sliced => {
                    tracing::debug!(nodes = cycle.layout.node_count(), "full layout scheduled");
                    self.pending = Some(cycle);
                }
            }
            return;
        }

        let report = place_new_nodes(
            &next,
            &resolution.unresolved,
            &mut resolved,
            &self.cfg.placement,
            &mut self.rng,
        );
        self.commit(next, &d, &resolved, surface);
        self.record_cycle(stats.with_placement(&report), started.elapsed());
    }

    /// Advances a pending layout by one slice. Returns `true` when a cycle
    /// was committed.
    pub fn tick(&mut self, surface: &mut dyn RenderSurface) -> bool {
        let Some(cycle) = self.pending.as_mut() else {
            return false;
        };
        if !cycle.layout.step(self.cfg.iterations_per_tick) {
            return false;
        }
        let Some(cycle) = self.pending.take() else {
            return false;
        };
        self.commit_layout(cycle, surface);
        true
    }

    pub fn is_layout_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn commit_layout(&mut self, cycle: PendingCycle, surface: &mut dyn RenderSurface) {
        let PendingCycle {
            next,
            diff: d,
            stats,
            layout,
            started,
        } = cycle;
        // A saved layout or drag that arrived while the run was pending
        // outranks the computed coordinate.
        let mut resolved: HashMap<NodeId, Point> = HashMap::with_capacity(next.nodes.len());
        let mut computed = Vec::new();
        for (node_id, p) in layout.into_positions() {
            match self.positions.resolve(&node_id) {
                Some((known, _)) => {
                    resolved.insert(node_id, known);
                }
                None => {
                    resolved.insert(node_id.clone(), p);
                    computed.push((node_id, p));
                }
            }
        }

        self.commit(next, &d, &resolved, surface);
        for (node_id, p) in computed {
            self.emit(ViewerEvent::PositionChanged {
                node_id,
                x: p.x,
                y: p.y,
            });
        }
        self.record_cycle(stats, started.elapsed());
    }

    fn commit(
        &mut self,
        next: GraphModel,
        d: &Diff,
        resolved: &HashMap<NodeId, Point>,
        surface: &mut dyn RenderSurface,
    ) {
        let patch = build_patch(
            &self.model,
            &next,
            d,
            resolved,
            self.positions.live(),
            &self.colors,
        );
        if !patch.is_empty() {
            surface.update(&patch);
        }
        self.positions.retire(d.removed.iter());

        let previous = std::mem::replace(&mut self.model, next);
        self.reresolve_selection(&previous);
        self.refresh_visibility(surface);
        self.apply_search(surface, false);
    }

    fn reresolve_selection(&mut self, previous: &GraphModel) {
        let Some(selected) = self.ui.selected.clone() else {
            return;
        };
        match self.model.node(&selected) {
            None => {
                self.ui.selected = None;
                self.emit(ViewerEvent::SelectionChanged { node: None });
            }
            Some(node) if previous.node(&selected) != Some(node) => {
                let node = node.clone();
                self.emit(ViewerEvent::SelectionChanged { node: Some(node) });
            }
            Some(_) => {}
        }
    }

    // ----- Filters and search -----

    pub fn on_filter_change(&mut self, filters: FilterState, surface: &mut dyn RenderSurface) {
        self.on_message();
        self.filters = filters;
        if self.pending.is_some() {
            // the commit re-runs visibility with these filters
            tracing::debug!("filters changed while a layout is pending");
        }
        self.refresh_visibility(surface);
    }

    fn refresh_visibility(&mut self, surface: &mut dyn RenderSurface) {
        self.visibility =
            visibility::compute(&self.model, &self.filters, &self.cfg.default_host_key);
        surface.apply_visibility(&self.visibility);
        self.refresh_counts();
    }

    pub fn on_search(&mut self, query: &str, surface: &mut dyn RenderSurface) {
        self.on_message();
        self.ui.search_query = query.to_string();
        self.apply_search(surface, true);
    }

    /// `move_viewport` is off when re-applying after a reconciliation so the
    /// user's view does not jump on every refresh.
    fn apply_search(&mut self, surface: &mut dyn RenderSurface, move_viewport: bool) {
        let blank = self.ui.search_query.trim().is_empty();
        if blank && !move_viewport && self.ui.search_hits.is_empty() {
            return;
        }

        let outcome = search::run(
            &self.model,
            &self.visibility,
            &self.ui.search_query,
            &self.cfg.search,
        );
        surface.apply_emphasis(&outcome.emphasis);
        if move_viewport {
            if let Some(cmd) = &outcome.viewport {
                surface.apply_viewport(cmd);
            }
        }

        let hits: Vec<NodeId> = outcome.matches.iter().map(|n| n.id.clone()).collect();
        let changed = hits != self.ui.search_hits;
        self.ui.search_hits = hits;
        if move_viewport || changed {
            self.emit(ViewerEvent::SearchResults {
                nodes: outcome.matches,
            });
        }
    }

    // ----- Layout persistence -----

    /// Installs the positions of a (new) dashboard. Nodes already on the
    /// surface move to their saved coordinates right away.
    pub fn on_saved_layout(&mut self, layout: SavedLayout, surface: &mut dyn RenderSurface) {
        self.on_message();
        self.positions.set_saved_layout(layout);
        if self.model.is_empty() {
            return;
        }

        let live: HashMap<NodeId, Point> = surface.node_positions().into_iter().collect();
        let upserted_nodes: Vec<NodePatch> = self
            .model
            .nodes
            .iter()
            .filter_map(|(id, node)| {
                let p = *self.positions.saved().get(id)?;
                (live.get(id) != Some(&p)).then(|| NodePatch {
                    node: node.clone(),
                    position: Some(p),
                    color: None,
                })
            })
            .collect();
        if upserted_nodes.is_empty() {
            return;
        }
        tracing::debug!(moved = upserted_nodes.len(), "applied saved layout to current nodes");
        surface.update(&SurfacePatch {
            upserted_nodes,
            ..SurfacePatch::default()
        });
    }

    /// Drag release. Unknown ids and non-finite coordinates are ignored.
    pub fn on_drag_end(&mut self, id: &NodeId, p: Point) -> bool {
        if !self.model.nodes.contains_key(id) {
            tracing::debug!(node = %id, "drag end for unknown node");
            return false;
        }
        if !self.positions.record_drag(id.clone(), p) {
            return false;
        }
        self.emit(ViewerEvent::PositionChanged {
            node_id: id.clone(),
            x: p.x,
            y: p.y,
        });
        true
    }

    /// The persistence collaborator stored the pending drags.
    pub fn mark_saved(&mut self) -> usize {
        let n = self.positions.promote_pending();
        tracing::debug!(promoted = n, "pending positions saved");
        n
    }

    // ----- Pointer input -----

    /// `None` is a background tap.
    pub fn on_tap(&mut self, id: Option<&NodeId>) {
        let node = id.and_then(|id| self.model.node(id)).cloned();
        self.ui.selected = node.as_ref().map(|n| n.id.clone());
        self.emit(ViewerEvent::SelectionChanged { node });
    }

    pub fn on_context_menu(&mut self, id: &NodeId, screen_x: f64, screen_y: f64) -> bool {
        let Some(node) = self.model.node(id).cloned() else {
            return false;
        };
        self.emit(ViewerEvent::ContextMenuRequested {
            node,
            screen_x,
            screen_y,
        });
        true
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.ui.selected.as_ref().and_then(|id| self.model.node(id))
    }

    pub fn host_legend(&self) -> Vec<(String, Color)> {
        self.colors.host_legend()
    }

    fn emit(&self, ev: ViewerEvent) {
        let _ = self.events.send(ev);
    }
}
