//! Schema module - Configuration types for chain solver runs.

mod config;
mod palette;
mod seed;

pub use config::*;
pub use palette::*;
pub use seed::*;
