use rand::Rng;
use std::collections::HashMap;
use topograph_core::{NodeId, Point};

use crate::graph::model::GraphModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceParams {
    pub repulsion: f64,
    pub ideal_edge_length: f64,
    pub edge_elasticity: f64,
    pub gravity: f64,
    pub damping: f64,
    pub max_step: f64,
    pub iterations: usize,
}

impl Default for ForceParams {
    fn default() -> Self {
        Self {
            repulsion: 40_000.0,
            ideal_edge_length: 100.0,
            edge_elasticity: 0.45,
            gravity: 0.02,
            damping: 0.9,
            max_step: 30.0,
            iterations: 300,
        }
    }
}

/// One force-directed layout over a whole model.
///
/// The run can be advanced in slices (`step`) so a host loop can interleave
/// it with input handling; positions are only meaningful once `is_done`.
#[derive(Debug, Clone)]
pub struct LayoutRun {
    ids: Vec<NodeId>,
    links: Vec<(usize, usize)>,
    positions: Vec<Point>,
    velocities: Vec<Point>,
    params: ForceParams,
    iteration: usize,
}

impl LayoutRun {
    /// Random initial placement in a square that grows with the node count.
    pub fn new<R: Rng>(model: &GraphModel, params: ForceParams, rng: &mut R) -> Self {
        let ids: Vec<NodeId> = model.nodes.keys().cloned().collect();
        let index: HashMap<&NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (id, i)).collect();

        let links = model
            .edges
            .keys()
            .filter_map(|k| Some((*index.get(&k.source)?, *index.get(&k.target)?)))
            .collect();

        let half = params.ideal_edge_length.max(1.0) * (ids.len() as f64).sqrt().max(1.0) * 0.5;
        let positions = ids
            .iter()
            .map(|_| Point::new(rng.random_range(-half..=half), rng.random_range(-half..=half)))
            .collect();

        Self {
            velocities: vec![Point::ORIGIN; ids.len()],
            ids,
            links,
            positions,
            params,
            iteration: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.iteration >= self.params.iterations || self.ids.len() <= 1
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Advances at most `budget` iterations. Returns `true` once finished.
    pub fn step(&mut self, budget: usize) -> bool {
        for _ in 0..budget {
            if self.is_done() {
                break;
            }
            self.force_step();
            self.iteration += 1;
        }
        self.is_done()
    }

    pub fn run_to_completion(&mut self) {
        while !self.step(64) {}
    }

    pub fn positions(&self) -> impl Iterator<Item = (&NodeId, Point)> + '_ {
        self.ids.iter().zip(self.positions.iter().copied())
    }

    pub fn into_positions(self) -> Vec<(NodeId, Point)> {
        self.ids.into_iter().zip(self.positions).collect()
    }

    fn force_step(&mut self) {
        let n = self.positions.len();
        let p = self.params;
        let mut forces = vec![Point::ORIGIN; n];

        // repulsion
        for i in 0..n {
            for j in (i + 1)..n {
                let (pa, pb) = (self.positions[i], self.positions[j]);
                let (mut dx, mut dy) = (pa.x - pb.x, pa.y - pb.y);
                if dx == 0.0 && dy == 0.0 {
                    // coincident: push apart along an index-derived direction
                    let a = (i * 31 + j * 17) as f64;
                    dx = a.cos();
                    dy = a.sin();
                }
                let dist2 = (dx * dx + dy * dy).max(0.01);
                let dist = dist2.sqrt();
                let f = p.repulsion / dist2;
                let (fx, fy) = (f * dx / dist, f * dy / dist);
                forces[i].x += fx;
                forces[i].y += fy;
                forces[j].x -= fx;
                forces[j].y -= fy;
            }
        }

        // springs
        for &(a, b) in &self.links {
            let (pa, pb) = (self.positions[a], self.positions[b]);
            let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
            let len = (dx * dx + dy * dy).sqrt().max(0.001);
            let f = p.edge_elasticity * (len - p.ideal_edge_length);
            let (fx, fy) = (f * dx / len, f * dy / len);
            forces[a].x += fx;
            forces[a].y += fy;
            forces[b].x -= fx;
            forces[b].y -= fy;
        }

        // gravity towards the centroid
        let cx = self.positions.iter().map(|q| q.x).sum::<f64>() / n as f64;
        let cy = self.positions.iter().map(|q| q.y).sum::<f64>() / n as f64;
        for (f, q) in forces.iter_mut().zip(&self.positions) {
            f.x += (cx - q.x) * p.gravity;
            f.y += (cy - q.y) * p.gravity;
        }

        // linear cooling keeps late iterations from undoing the layout
        let remaining = 1.0 - self.iteration as f64 / p.iterations.max(1) as f64;
        let max_step = (p.max_step * remaining).max(p.max_step * 0.05).max(0.001);
        let damping = p.damping.clamp(0.0, 1.0);

        for i in 0..n {
            let v = &mut self.velocities[i];
            v.x = (v.x + forces[i].x) * damping;
            v.y = (v.y + forces[i].y) * damping;

            let (mut sx, mut sy) = (v.x, v.y);
            let len = (sx * sx + sy * sy).sqrt();
            if !len.is_finite() {
                *v = Point::ORIGIN;
                continue;
            }
            if len > max_step {
                sx = sx / len * max_step;
                sy = sy / len * max_step;
            }
            self.positions[i].x += sx;
            self.positions[i].y += sy;
        }
    }
}
