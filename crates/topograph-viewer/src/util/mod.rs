pub mod config;
pub mod ids;
