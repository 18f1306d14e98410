//! Configured runs - one rank's share of a simulation driven by [`SolverConfig`].

use serde::{Deserialize, Serialize};

use crate::schema::SolverConfig;

use super::{Canvas, Communicator, Grid, GridError, GridStats, apply_kind};

/// What one rank hands back after a configured run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankReport {
    pub stats: GridStats,
    /// Coordinates of the first and last owned point.
    pub x_range: (f64, f64),
    /// Row 0 is the initial state, row `s` the state after step `s`.
    pub canvas: Canvas,
}

/// Build this rank's grid from `config`, apply the configured operator
/// `steps` times and colorize every state.
pub fn run_rank<C>(comm: &C, config: &SolverConfig, steps: u64) -> Result<RankReport, GridError>
where
    C: Communicator + ?Sized,
{
    let mut grid = Grid::from_config(comm, config)?;
    let mut canvas = Canvas::new();
    grid.colorize(0, &config.color_map, &mut canvas)?;

    for step in 1..=steps {
        apply_kind(&mut grid, &config.operator)?;
        grid.colorize(step as usize, &config.color_map, &mut canvas)?;
    }
    log::debug!("rank {}: finished {} steps", comm.rank(), steps);

    Ok(RankReport {
        stats: grid.stats(),
        x_range: (grid.coordinate(1), grid.coordinate(grid.num_grids())),
        canvas,
    })
}
