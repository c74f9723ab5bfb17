use indexmap::IndexMap;
use topograph_core::{NodeId, NodePosition, Point, SavePositionsRequest, ViewerEvent};

/// Unsaved position changes since the last successful save.
///
/// Only the latest coordinate per node is kept; first-change order is kept
/// so requests are stable.
#[derive(Debug, Default)]
pub struct LayoutCheckpoint {
    changed: IndexMap<NodeId, Point>,
}

impl LayoutCheckpoint {
    /// Picks position changes out of the outbound event stream.
    pub fn record(&mut self, ev: &ViewerEvent) {
        if let ViewerEvent::PositionChanged { node_id, x, y } = ev {
            let p = Point::new(*x, *y);
            if p.is_finite() {
                self.changed.insert(node_id.clone(), p);
            }
        }
    }

    pub fn has_unsaved(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn request(&self) -> SavePositionsRequest {
        SavePositionsRequest {
            positions: self
                .changed
                .iter()
                .map(|(id, p)| NodePosition {
                    node_id: id.clone(),
                    x: p.x,
                    y: p.y,
                })
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::Node;

    fn moved(id: &str, x: f64, y: f64) -> ViewerEvent {
        ViewerEvent::PositionChanged {
            node_id: NodeId::from(id),
            x,
            y,
        }
    }

    #[test]
    fn latest_position_wins_in_first_change_order() {
        let mut cp = LayoutCheckpoint::default();
        cp.record(&moved("b", 1.0, 1.0));
        cp.record(&moved("a", 2.0, 2.0));
        cp.record(&moved("b", 3.0, 3.0));
        cp.record(&ViewerEvent::SelectionChanged { node: None::<Node> });

        let req = cp.request();
        assert_eq!(req.positions.len(), 2);
        assert_eq!(req.positions[0].node_id, NodeId::from("b"));
        assert_eq!((req.positions[0].x, req.positions[0].y), (3.0, 3.0));
        assert!(cp.has_unsaved());

        cp.clear();
        assert!(!cp.has_unsaved());
        assert!(cp.request().positions.is_empty());
    }

    #[test]
    fn non_finite_positions_are_not_saved() {
        let mut cp = LayoutCheckpoint::default();
        cp.record(&moved("a", f64::NAN, 0.0));
        assert!(!cp.has_unsaved());
    }

    #[test]
    fn request_uses_dashboard_wire_shape() {
        let mut cp = LayoutCheckpoint::default();
        cp.record(&moved("container:web", 10.0, -5.5));
        let v = serde_json::to_value(cp.request()).expect("json");
        assert_eq!(
            v,
            serde_json::json!({"positions": [{"node_id": "container:web", "x": 10.0, "y": -5.5}]})
        );
    }
}
