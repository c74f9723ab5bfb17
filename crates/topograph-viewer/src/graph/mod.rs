pub mod checkpoint;
pub mod colors;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod placement;
pub mod positions;
pub mod reconcile;
pub mod search;
pub mod state;
pub mod visibility;

pub use checkpoint::LayoutCheckpoint;
pub use colors::{Color, ColorAssignmentService};
pub use metrics::{CycleStats, PerfState};
pub use model::GraphModel;
pub use state::GraphState;
pub use visibility::Visibility;
