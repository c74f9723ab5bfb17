pub mod memory;
pub mod surface;

pub use memory::{MemorySurface, RenderedEdge, RenderedNode, SurfaceDump};
pub use surface::{Emphasis, NodePatch, RenderSurface, SurfacePatch, ViewportCommand};
