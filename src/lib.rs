//! Stencil Chain - distributed 1D stencil solver with overlapped ghost exchange.
//!
//! A 1D grid is split into equal contiguous slices, one per rank, with ranks
//! forming a linear chain. Caller-supplied local operators read a point and
//! its two neighbors and write new per-point values. After every update the
//! boundary points are exchanged with the neighboring ranks into two ghost
//! slots, and the exchange overlaps the interior computation.
//!
//! # Architecture
//!
//! - `schema`: Configuration types (geometry, edge ghosts, operators, colors)
//! - `compute`: Rank runtime, grid buffer, stencil views, synchronizer, grid
//!
//! # Example
//!
//! ```rust,no_run
//! use stencil_chain::compute::{Grid, GridOptions, World};
//!
//! let sums = World::run(4, |comm| {
//!     let mut grid = Grid::new(&comm, 100, 0.01, 1, GridOptions::default(), |p| {
//!         let x = p.x();
//!         p.output()[0] = (-(x - 2.0) * (x - 2.0) * 10.0).exp();
//!     })?;
//!
//!     for _ in 0..100 {
//!         grid.apply_op(1, 1, |p| {
//!             let (l, u, r) = (p.left().input()[0], p.input()[0], p.right().input()[0]);
//!             p.output()[0] = u + 0.25 * (l - 2.0 * u + r);
//!         })?;
//!     }
//!     Ok::<_, stencil_chain::compute::GridError>(grid.stats().sum[0])
//! })
//! .expect("world failed");
//!
//! println!("per-rank mass: {:?}", sums);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::{Communicator, Grid, GridError, GridOptions, StencilPoint, World};
pub use schema::{EdgeGhost, ExchangeSchedule, SolverConfig};
