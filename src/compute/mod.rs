//! Compute module - Rank runtime, grid storage and the exchange protocol.

mod buffer;
mod canvas;
mod comm;
#[cfg(feature = "mpi")]
mod comm_mpi;
mod grid;
mod operators;
mod point;
mod run;
mod sync;

pub use buffer::*;
pub use canvas::*;
pub use comm::*;
#[cfg(feature = "mpi")]
pub use comm_mpi::*;
pub use grid::*;
pub use operators::*;
pub use point::*;
pub use run::*;
pub use sync::*;
