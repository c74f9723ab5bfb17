use std::collections::HashMap;
use topograph_core::{NodeId, Point, SavedLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    PendingDrag,
    Saved,
    Live,
    Retired,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub resolved: HashMap<NodeId, Point>,
    /// Snapshot order.
    pub unresolved: Vec<NodeId>,
}

/// Coordinates known for nodes, by source.
///
/// Precedence when resolving: pending drag > saved > live > retired.
#[derive(Debug, Default)]
pub struct PositionStore {
    saved: HashMap<NodeId, Point>,
    live: HashMap<NodeId, Point>,
    pending: HashMap<NodeId, Point>,
    retired: HashMap<NodeId, Point>,
}

impl PositionStore {
    /// Switching dashboards: the new layout replaces the old one and drags
    /// made against the old one are dropped.
    pub fn set_saved_layout(&mut self, layout: SavedLayout) {
        self.saved = layout
            .positions
            .into_iter()
            .filter(|(id, p)| {
                let ok = p.is_finite();
                if !ok {
                    tracing::debug!(node = %id, "ignoring non-finite saved position");
                }
                ok
            })
            .collect();
        self.pending.clear();
    }

    /// Replaces the live set with what the surface shows right now.
    pub fn capture_live<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (NodeId, Point)>,
    {
        self.live = positions
            .into_iter()
            .filter(|(_, p)| p.is_finite() && !p.is_origin())
            .collect();
    }

    pub fn record_drag(&mut self, id: NodeId, p: Point) -> bool {
        if !p.is_finite() {
            return false;
        }
        self.live.insert(id.clone(), p);
        self.pending.insert(id, p);
        true
    }

    /// The persistence collaborator committed the pending drags.
    pub fn promote_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.saved.extend(self.pending.drain());
        n
    }

    /// Keeps the last live coordinate of `removed` for exactly one cycle;
    /// whatever was retired before is forgotten.
    pub fn retire<'a, I>(&mut self, removed: I)
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        self.retired = removed
            .into_iter()
            .filter_map(|id| self.live.get(id).map(|p| (id.clone(), *p)))
            .collect();
    }

    pub fn resolve(&self, id: &NodeId) -> Option<(Point, PositionSource)> {
        if let Some(p) = self.pending.get(id) {
            return Some((*p, PositionSource::PendingDrag));
        }
        if let Some(p) = self.saved.get(id) {
            return Some((*p, PositionSource::Saved));
        }
        if let Some(p) = self.live.get(id) {
            return Some((*p, PositionSource::Live));
        }
        self.retired.get(id).map(|p| (*p, PositionSource::Retired))
    }

    pub fn resolve_all<'a, I>(&self, ids: I) -> Resolution
    where
        I: IntoIterator<Item = &'a NodeId>,
    {
        let mut out = Resolution::default();
        for id in ids {
            match self.resolve(id) {
                Some((p, _)) => {
                    out.resolved.insert(id.clone(), p);
                }
                None => out.unresolved.push(id.clone()),
            }
        }
        out
    }

    pub fn saved(&self) -> &HashMap<NodeId, Point> {
        &self.saved
    }

    pub fn live(&self) -> &HashMap<NodeId, Point> {
        &self.live
    }
}
