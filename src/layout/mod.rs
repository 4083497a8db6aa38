//! Tree layout: geometry parameters and the coordinate engine.

pub mod config;
pub mod engine;

pub use config::{LayoutConfig, LAYOUT_VERSION};
pub use engine::{LayoutEngine, TreeLayout, CENTERING_PASSES};
