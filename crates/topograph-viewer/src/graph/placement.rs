use rand::Rng;
use std::collections::HashMap;
use std::f64::consts::TAU;
use topograph_core::{Bounds, NodeId, Point};

use crate::graph::model::GraphModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub offset_min: f64,
    pub offset_max: f64,
    pub ring_margin: f64,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            offset_min: 80.0,
            offset_max: 120.0,
            ring_margin: 150.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementReport {
    pub near_neighbor: usize,
    pub on_ring: usize,
}

/// Gives every id in `unresolved` a coordinate in `positions` without moving
/// anything already there.
///
/// A node with a positioned neighbor lands at a random offset around it;
/// nodes placed earlier in the pass count as positioned. Nodes that still
/// have no anchor are spread on a ring around everything positioned before
/// the pass.
pub fn place_new_nodes<R: Rng>(
    model: &GraphModel,
    unresolved: &[NodeId],
    positions: &mut HashMap<NodeId, Point>,
    params: &PlacementParams,
    rng: &mut R,
) -> PlacementReport {
    let mut report = PlacementReport::default();
    let before = Bounds::from_points(positions.values().copied());

    let mut pending: Vec<&NodeId> = unresolved
        .iter()
        .filter(|id| !positions.contains_key(*id))
        .collect();

    loop {
        let mut progressed = false;
        pending.retain(|id| {
            let anchor = model
                .neighbors(id)
                .find_map(|nb| positions.get(nb).copied());
            let Some(anchor) = anchor else {
                return true;
            };
            let theta = rng.random_range(0.0..TAU);
            let d = rng.random_range(params.offset_min..=params.offset_max);
            let p = Point::new(anchor.x + theta.cos() * d, anchor.y + theta.sin() * d);
            positions.insert((*id).clone(), p);
            report.near_neighbor += 1;
            progressed = true;
            false
        });
        if !progressed || pending.is_empty() {
            break;
        }
    }

    if pending.is_empty() {
        return report;
    }

    let (center, radius) = match before {
        Some(b) => (b.center(), b.width().max(b.height()) / 2.0 + params.ring_margin),
        None => (Point::ORIGIN, params.ring_margin),
    };
    let count = pending.len();
    for (i, id) in pending.into_iter().enumerate() {
        let angle = TAU * i as f64 / count as f64;
        positions.insert(
            id.clone(),
            Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin()),
        );
        report.on_ring += 1;
    }

    report
}
