use serde::Serialize;
use std::time::Duration;

use crate::graph::placement::PlacementReport;
use crate::graph::state::GraphState;

/// What one committed reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub added: usize,
    pub removed: usize,
    pub retained: usize,
    pub added_edges: usize,
    pub removed_edges: usize,
    pub rejected: usize,
    pub placed_near_neighbor: usize,
    pub placed_on_ring: usize,
    pub full_layout: bool,
    pub duration_us: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerfState {
    pub messages: u64,
    pub cycles: u64,
    pub superseded: u64,
    pub rejected_total: u64,
    pub layouts: u64,
    pub placed_total: u64,

    pub nodes: usize,
    pub edges: usize,
    pub visible_nodes: usize,
    pub visible_edges: usize,

    pub last_cycle: Option<CycleStats>,
}

impl CycleStats {
    pub(crate) fn with_placement(mut self, report: &PlacementReport) -> Self {
        self.placed_near_neighbor = report.near_neighbor;
        self.placed_on_ring = report.on_ring;
        self
    }
}

impl GraphState {
    pub(crate) fn record_cycle(&mut self, mut stats: CycleStats, elapsed: Duration) {
        stats.duration_us = elapsed.as_micros().min(u64::MAX as u128) as u64;

        self.perf.cycles += 1;
        self.perf.rejected_total += stats.rejected as u64;
        self.perf.placed_total += (stats.placed_near_neighbor + stats.placed_on_ring) as u64;
        if stats.full_layout {
            self.perf.layouts += 1;
        }
        self.refresh_counts();

        tracing::info!(
            added = stats.added,
            removed = stats.removed,
            retained = stats.retained,
            rejected = stats.rejected,
            placed = stats.placed_near_neighbor + stats.placed_on_ring,
            full_layout = stats.full_layout,
            duration_us = stats.duration_us,
            "reconciled snapshot"
        );
        self.perf.last_cycle = Some(stats);
    }

    pub(crate) fn refresh_counts(&mut self) {
        self.perf.nodes = self.model.nodes.len();
        self.perf.edges = self.model.edges.len();
        let (hidden_nodes, hidden_edges) = (
            self.visibility.hidden_nodes.len(),
            self.visibility.hidden_edges.len(),
        );
        self.perf.visible_nodes = self.perf.nodes.saturating_sub(hidden_nodes);
        self.perf.visible_edges = self.perf.edges.saturating_sub(hidden_edges);
    }

    pub(crate) fn on_message(&mut self) {
        self.perf.messages += 1;
    }
}
