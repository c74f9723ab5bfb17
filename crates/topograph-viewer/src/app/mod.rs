use crossbeam_channel::Receiver;
use std::rc::Rc;
use topograph_core::{
    FilterState, NodeId, Point, SavePositionsRequest, SavedLayout, Snapshot, ViewerEvent,
};

use crate::feed::{Incoming, IncomingKind};
use crate::graph::{ColorAssignmentService, GraphState, LayoutCheckpoint};
use crate::render::RenderSurface;
use crate::util::config::{ConfigError, ViewerConfig};

/// Upper bound on feed messages handled per `pump` call.
const PUMP_BATCH: usize = 100_000;

/// Composition root: one engine, one surface, the outbound event queue and
/// the unsaved-changes tracker.
pub struct Viewer<S: RenderSurface> {
    pub st: GraphState,
    pub surface: S,
    events: Receiver<ViewerEvent>,
    checkpoint: LayoutCheckpoint,
    /// Events emitted before the last dashboard switch. Handed out by
    /// `drain_events` but never recorded as unsaved.
    stale: Vec<ViewerEvent>,
    closed_streams: usize,
}

impl<S: RenderSurface> Viewer<S> {
    pub fn new(cfg: &ViewerConfig, mut surface: S) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let colors = Rc::new(ColorAssignmentService::from_config(cfg)?);
        let (st, events) = GraphState::new(cfg, colors);
        surface.init();
        Ok(Self {
            st,
            surface,
            events,
            checkpoint: LayoutCheckpoint::default(),
            stale: Vec::new(),
            closed_streams: 0,
        })
    }

    pub fn on_snapshot(&mut self, snapshot: Snapshot) {
        self.st.on_snapshot(snapshot, &mut self.surface);
    }

    pub fn on_filter_change(&mut self, filters: FilterState) {
        self.st.on_filter_change(filters, &mut self.surface);
    }

    pub fn on_search(&mut self, query: &str) {
        self.st.on_search(query, &mut self.surface);
    }

    pub fn on_saved_layout(&mut self, layout: SavedLayout) {
        // a different dashboard: unsaved changes belong to the old one,
        // including positions still queued on the channel
        self.stale.extend(self.events.try_iter());
        self.checkpoint.clear();
        self.st.on_saved_layout(layout, &mut self.surface);
    }

    pub fn on_drag_end(&mut self, id: &NodeId, p: Point) -> bool {
        self.st.on_drag_end(id, p)
    }

    pub fn on_tap(&mut self, id: Option<&NodeId>) {
        self.st.on_tap(id);
    }

    pub fn on_context_menu(&mut self, id: &NodeId, screen_x: f64, screen_y: f64) -> bool {
        self.st.on_context_menu(id, screen_x, screen_y)
    }

    pub fn tick(&mut self) -> bool {
        self.st.tick(&mut self.surface)
    }

    /// Runs a sliced layout until it commits. No-op when nothing is pending.
    pub fn finish_layout(&mut self) {
        while self.st.is_layout_pending() {
            self.tick();
        }
    }

    /// Drains whatever the feed has queued, without blocking.
    pub fn pump(&mut self, rx: &Receiver<Incoming>) -> usize {
        let batch: Vec<Incoming> = rx.try_iter().take(PUMP_BATCH).collect();
        let n = batch.len();
        self.pump_batch(batch);
        n
    }

    /// Applies a batch in arrival order, except that only the last snapshot
    /// of the batch is reconciled.
    pub fn pump_batch(&mut self, batch: Vec<Incoming>) {
        let last_snapshot = batch.iter().rposition(Incoming::is_snapshot);
        let mut dropped = 0usize;

        for (i, inc) in batch.into_iter().enumerate() {
            match inc.kind {
                IncomingKind::Snapshot(s) => {
                    if Some(i) == last_snapshot {
                        self.on_snapshot(s);
                    } else {
                        dropped += 1;
                    }
                }
                IncomingKind::SavedLayout(l) => self.on_saved_layout(l),
                IncomingKind::Filters(f) => self.on_filter_change(f),
                IncomingKind::Search(q) => self.on_search(&q),
                IncomingKind::Error(e) => {
                    tracing::warn!(stream = %inc.stream, error = %e, "feed error");
                }
                IncomingKind::Closed => {
                    self.closed_streams += 1;
                    tracing::debug!(stream = %inc.stream, "feed closed");
                }
            }
        }

        if dropped > 0 {
            self.st.perf.superseded += dropped as u64;
            tracing::debug!(dropped, "coalesced stale snapshots");
        }
    }

    pub fn closed_streams(&self) -> usize {
        self.closed_streams
    }

    /// Outbound events since the last call. Position changes are also
    /// recorded as unsaved.
    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        let mut evs = std::mem::take(&mut self.stale);
        for ev in self.events.try_iter() {
            self.checkpoint.record(&ev);
            evs.push(ev);
        }
        evs
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.checkpoint.has_unsaved()
    }

    pub fn save_request(&self) -> Option<SavePositionsRequest> {
        self.checkpoint.has_unsaved().then(|| self.checkpoint.request())
    }

    /// The persistence collaborator stored the last `save_request`.
    pub fn mark_saved(&mut self) {
        self.checkpoint.clear();
        self.st.mark_saved();
    }

    pub fn shutdown(mut self) -> S {
        self.surface.destroy();
        self.surface
    }
}
