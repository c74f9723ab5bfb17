pub mod app;
pub mod feed;
pub mod graph;
pub mod render;
pub mod util;
