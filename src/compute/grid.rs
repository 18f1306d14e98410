//! Domain-decomposed grid - one rank's slice of the 1D chain.
//!
//! Every update replays the same schedule: compute the two boundary points,
//! start the ghost exchange, compute the interior while the exchange is in
//! flight, then wait. Only the boundary values are needed by the neighbors,
//! so the interior work hides the exchange latency.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schema::{ColorMap, EdgeGhost, ExchangeSchedule, PaletteError, SolverConfig};

use super::{
    BoundarySync, Communicator, FixedNeighbor, FixedPoint, GridBuffer, NeighborView, PixelSink,
    Side, StencilPoint, SyncError,
};

use rayon::prelude::*;

/// Errors raised by grid construction and operator application.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Operator expects {found} input variables, grid holds {expected}")]
    VariableCountMismatch { expected: usize, found: usize },
    #[error("Points must carry at least one variable")]
    NoVariables,
    #[error("A rank must own at least one point")]
    NoPoints,
    #[error("Point spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("Failed to allocate {points} points of {variables} variables")]
    Allocation { points: usize, variables: usize },
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Exchange behavior of a grid.
#[derive(Debug, Clone, Default)]
pub struct GridOptions {
    pub edge: EdgeGhost,
    pub schedule: ExchangeSchedule,
    pub timeout: Option<Duration>,
}

impl From<&SolverConfig> for GridOptions {
    fn from(config: &SolverConfig) -> Self {
        Self {
            edge: config.edge_ghost.clone(),
            schedule: config.schedule,
            timeout: config.exchange_timeout(),
        }
    }
}

/// One rank's owned points plus ghosts, bound to a communicator.
pub struct Grid<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    num_grids: usize,
    dx: f64,
    x0: f64,
    options: GridOptions,
    buffer: GridBuffer,
}

impl<'c, C: Communicator + ?Sized> Grid<'c, C> {
    /// Allocate the rank's points and fill them with `initializer`.
    ///
    /// The initializer sees zero input values and must write all
    /// `num_variables` outputs. Ghosts are exchanged before returning.
    pub fn new<F>(
        comm: &'c C,
        num_grids: usize,
        dx: f64,
        num_variables: usize,
        options: GridOptions,
        mut initializer: F,
    ) -> Result<Self, GridError>
    where
        F: FnMut(&mut StencilPoint<'_>),
    {
        if !(dx.is_finite() && dx > 0.0) {
            return Err(GridError::InvalidSpacing(dx));
        }

        let x0 = num_grids as f64 * dx * comm.rank() as f64;
        let mut buffer = GridBuffer::new(num_grids, num_variables)?;

        sweep(comm, &options, &mut buffer, |i, target| {
            let x = coordinate(x0, dx, i);
            let mut point = StencilPoint::new(x, &[], target.point_mut(i)).with_neighbors(
                NeighborView::detached(x - dx),
                NeighborView::detached(x + dx),
            );
            initializer(&mut point);
        })?;

        log::info!(
            "rank {}/{}: {} points x {} variables from x0 = {}",
            comm.rank(),
            comm.size(),
            num_grids,
            num_variables,
            x0
        );

        Ok(Self {
            comm,
            num_grids,
            dx,
            x0,
            options,
            buffer,
        })
    }

    /// Build a grid from a solver configuration.
    pub fn from_config(comm: &'c C, config: &SolverConfig) -> Result<Self, GridError> {
        let initial = config.initial.clone();
        Self::new(
            comm,
            config.num_grids,
            config.dx,
            config.variables,
            GridOptions::from(config),
            |p| initial.initialize(p),
        )
    }

    /// Apply a local operator to every owned point.
    ///
    /// `num_input` must equal the current variable count; the grid holds
    /// `num_output` variables afterwards. The operator must fill every output
    /// slot and may read only its own and its neighbors' inputs.
    pub fn apply_op<F>(
        &mut self,
        num_input: usize,
        num_output: usize,
        mut op: F,
    ) -> Result<(), GridError>
    where
        F: FnMut(&mut StencilPoint<'_>),
    {
        self.check_input(num_input)?;
        let mut next = GridBuffer::new(self.num_grids, num_output)?;

        let old = &self.buffer;
        let (x0, dx) = (self.x0, self.dx);
        sweep(self.comm, &self.options, &mut next, |i, target| {
            let x = coordinate(x0, dx, i);
            let mut point = StencilPoint::new(x, old.point(i), target.point_mut(i))
                .with_neighbors(
                    NeighborView::new(x - dx, old.point(i - 1)),
                    NeighborView::new(x + dx, old.point(i + 1)),
                );
            op(&mut point);
        })?;

        self.buffer = next;
        Ok(())
    }

    /// Apply an operator whose variable counts are fixed at compile time.
    pub fn apply_fixed<const IN: usize, const OUT: usize, F>(
        &mut self,
        mut op: F,
    ) -> Result<(), GridError>
    where
        F: FnMut(&mut FixedPoint<'_, IN, OUT>),
    {
        self.check_input(IN)?;
        if OUT == 0 {
            return Err(GridError::NoVariables);
        }
        let mut next = GridBuffer::new(self.num_grids, OUT)?;

        let (cells, _) = self.buffer.as_slice().as_chunks::<IN>();
        let (x0, dx) = (self.x0, self.dx);
        sweep(self.comm, &self.options, &mut next, |i, target| {
            let x = coordinate(x0, dx, i);
            let mut point = FixedPoint::new(
                x,
                &cells[i],
                target.cell_mut::<OUT>(i),
                FixedNeighbor::new(x - dx, &cells[i - 1]),
                FixedNeighbor::new(x + dx, &cells[i + 1]),
            );
            op(&mut point);
        })?;

        self.buffer = next;
        Ok(())
    }

    fn check_input(&self, num_input: usize) -> Result<(), GridError> {
        let expected = self.buffer.num_variables();
        if num_input != expected {
            log::error!(
                "rank {}: operator expects {} variables, grid holds {}",
                self.comm.rank(),
                num_input,
                expected
            );
            return Err(GridError::VariableCountMismatch {
                expected,
                found: num_input,
            });
        }
        Ok(())
    }

    /// Emit one `(column, row, r, g, b)` per owned point into `sink`.
    ///
    /// Every channel is checked against the current variable count before
    /// anything is emitted.
    pub fn colorize<S>(
        &self,
        row: usize,
        color_map: &ColorMap,
        sink: &mut S,
    ) -> Result<(), GridError>
    where
        S: PixelSink + ?Sized,
    {
        color_map.validate(self.num_variables())?;

        let buffer = &self.buffer;
        let colors: Vec<[f64; 3]> = (1..=self.num_grids)
            .into_par_iter()
            .map(|i| color_map.rgb(buffer.point(i)))
            .collect();

        for (column, [r, g, b]) in colors.into_iter().enumerate() {
            sink.set(column, row, r, g, b);
        }
        Ok(())
    }

    /// Per-variable statistics over owned points.
    pub fn stats(&self) -> GridStats {
        GridStats::from_buffer(self.comm.rank(), &self.buffer)
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    #[inline]
    pub fn num_grids(&self) -> usize {
        self.num_grids
    }

    #[inline]
    pub fn num_variables(&self) -> usize {
        self.buffer.num_variables()
    }

    #[inline]
    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Coordinate of the first owned point.
    #[inline]
    pub fn x0(&self) -> f64 {
        self.x0
    }

    /// Coordinate of point `index` (1-based for owned points).
    #[inline]
    pub fn coordinate(&self, index: usize) -> f64 {
        coordinate(self.x0, self.dx, index)
    }

    /// Current buffer, ghosts included.
    #[inline]
    pub fn buffer(&self) -> &GridBuffer {
        &self.buffer
    }

    #[inline]
    pub fn ghost(&self, side: Side) -> &[f64] {
        self.buffer.ghost(side)
    }
}

/// Coordinate of 1-based point `index` on a rank starting at `x0`.
#[inline]
fn coordinate(x0: f64, dx: f64, index: usize) -> f64 {
    x0 + (index as f64 - 1.0) * dx
}

/// Fill every owned point of `target` through `update`, overlapping the
/// ghost exchange with the interior according to the schedule.
fn sweep<C, F>(
    comm: &C,
    options: &GridOptions,
    target: &mut GridBuffer,
    mut update: F,
) -> Result<(), GridError>
where
    C: Communicator + ?Sized,
    F: FnMut(usize, &mut GridBuffer),
{
    let last = target.num_grids();

    update(1, target);
    if last > 1 {
        update(last, target);
    }

    let sync = BoundarySync::start(comm, target, &options.edge, options.timeout)?;
    match options.schedule {
        ExchangeSchedule::Overlapped => {
            for i in 2..last {
                update(i, target);
            }
            sync.wait_till_done(target)?;
        }
        ExchangeSchedule::Blocking => {
            sync.wait_till_done(target)?;
            for i in 2..last {
                update(i, target);
            }
        }
    }
    Ok(())
}

/// Summary of one rank's owned values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridStats {
    pub rank: usize,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub sum: Vec<f64>,
}

impl GridStats {
    pub fn from_buffer(rank: usize, buffer: &GridBuffer) -> Self {
        let nv = buffer.num_variables();
        let mut min = vec![f64::INFINITY; nv];
        let mut max = vec![f64::NEG_INFINITY; nv];
        let mut sum = vec![0.0; nv];

        for point in buffer.owned() {
            for (v, &value) in point.iter().enumerate() {
                min[v] = min[v].min(value);
                max[v] = max[v].max(value);
                sum[v] += value;
            }
        }

        Self { rank, min, max, sum }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{Canvas, World};
    use crate::schema::ChannelMap;

    fn coordinate_init(p: &mut StencilPoint<'_>) {
        let x = p.x();
        p.output().fill(x);
    }

    fn identity(p: &mut StencilPoint<'_>) {
        let input = p.input();
        p.output().copy_from_slice(input);
    }

    fn owned_values<C: Communicator + ?Sized>(grid: &Grid<'_, C>) -> Vec<f64> {
        grid.buffer().owned().map(|p| p[0]).collect()
    }

    #[test]
    fn test_two_rank_scenario() {
        let ghosts = World::run(2, |comm| {
            let grid = Grid::new(&comm, 4, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
            (owned_values(&grid), grid.buffer().point(0)[0], grid.buffer().point(5)[0])
        })
        .unwrap();

        assert_eq!(ghosts[0].0, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(ghosts[1].0, vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(ghosts[0].2, 4.0);
        assert_eq!(ghosts[1].1, 3.0);
    }

    #[test]
    fn test_coordinate_continuity() {
        let edges = World::run(4, |comm| {
            let grid = Grid::new(&comm, 5, 0.25, 1, GridOptions::default(), coordinate_init).unwrap();
            (grid.coordinate(1), grid.coordinate(grid.num_grids()))
        })
        .unwrap();

        for pair in edges.windows(2) {
            assert_eq!(pair[0].1 + 0.25, pair[1].0);
        }
    }

    #[test]
    fn test_ghost_consistency_after_steps() {
        let snapshots = World::run(3, |comm| {
            let mut grid = Grid::new(&comm, 6, 1.0, 2, GridOptions::default(), |p| {
                let x = p.x();
                p.output().copy_from_slice(&[x, -x]);
            })
            .unwrap();
            for _ in 0..3 {
                grid.apply_op(2, 2, |p| {
                    let left = p.left().input()[0];
                    let here = p.input().to_vec();
                    p.output()[0] = here[0] + 0.1 * left;
                    p.output()[1] = here[1];
                })
                .unwrap();
            }
            let b = grid.buffer();
            (
                b.point(0).to_vec(),
                b.point(1).to_vec(),
                b.point(6).to_vec(),
                b.point(7).to_vec(),
            )
        })
        .unwrap();

        for r in 0..2 {
            assert_eq!(snapshots[r].3, snapshots[r + 1].1);
            assert_eq!(snapshots[r + 1].0, snapshots[r].2);
        }
    }

    #[test]
    fn test_identity_is_idempotent() {
        let states = World::run(3, |comm| {
            let mut grid = Grid::new(&comm, 4, 0.5, 1, GridOptions::default(), coordinate_init).unwrap();
            let before = grid.buffer().as_slice().to_vec();
            let mut after = Vec::new();
            for _ in 0..5 {
                grid.apply_op(1, 1, identity).unwrap();
                after.push(grid.buffer().as_slice().to_vec());
            }
            (before, after)
        })
        .unwrap();

        for (before, after) in states {
            for state in after {
                assert_eq!(state, before);
            }
        }
    }

    #[test]
    fn test_variable_count_transition() {
        let results = World::run(2, |comm| {
            let mut grid = Grid::new(&comm, 3, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
            grid.apply_op(1, 3, |p| {
                let u = p.input()[0];
                let du = (p.right().input()[0] - p.left().input()[0]) / 2.0;
                p.output().copy_from_slice(&[u, du, u * u]);
            })
            .unwrap();

            let width = grid.num_variables();
            let slots = grid.buffer().as_slice().len();
            let stale = grid.apply_op(1, 1, identity);
            (width, slots, stale, grid.num_variables())
        })
        .unwrap();

        for (width, slots, stale, after) in results {
            assert_eq!(width, 3);
            assert_eq!(slots, 5 * 3);
            assert!(matches!(
                stale,
                Err(GridError::VariableCountMismatch {
                    expected: 3,
                    found: 1
                })
            ));
            assert_eq!(after, 3);
        }
    }

    fn diffuse(p: &mut StencilPoint<'_>) {
        let l = p.left().input()[0];
        let r = p.right().input()[0];
        let u = p.input()[0];
        p.output()[0] = u + 0.25 * (l - 2.0 * u + r);
    }

    fn run_diffusion(schedule: ExchangeSchedule) -> Vec<Vec<f64>> {
        World::run(4, |comm| {
            let options = GridOptions {
                edge: EdgeGhost::Mirror,
                schedule,
                timeout: None,
            };
            let mut grid = Grid::new(&comm, 7, 0.1, 1, options, |p| {
                let x = p.x();
                p.output()[0] = (-(x - 1.4) * (x - 1.4) * 8.0).exp();
            })
            .unwrap();
            for _ in 0..20 {
                grid.apply_op(1, 1, diffuse).unwrap();
            }
            grid.buffer().as_slice().to_vec()
        })
        .unwrap()
    }

    #[test]
    fn test_overlap_matches_blocking_bit_for_bit() {
        let overlapped = run_diffusion(ExchangeSchedule::Overlapped);
        let blocking = run_diffusion(ExchangeSchedule::Blocking);

        for (a, b) in overlapped.iter().zip(&blocking) {
            let a: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
            let b: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_distributed_matches_single_rank() {
        let options = GridOptions {
            edge: EdgeGhost::Mirror,
            ..Default::default()
        };
        let init = |p: &mut StencilPoint<'_>| {
            let x = p.x();
            p.output()[0] = x * x;
        };

        let split = World::run(3, |comm| {
            let mut grid = Grid::new(&comm, 4, 1.0, 1, options.clone(), init).unwrap();
            for _ in 0..4 {
                grid.apply_op(1, 1, diffuse).unwrap();
            }
            owned_values(&grid)
        })
        .unwrap()
        .concat();

        let whole = World::run(1, |comm| {
            let mut grid = Grid::new(&comm, 12, 1.0, 1, options.clone(), init).unwrap();
            for _ in 0..4 {
                grid.apply_op(1, 1, diffuse).unwrap();
            }
            owned_values(&grid)
        })
        .unwrap()
        .concat();

        assert_eq!(split, whole);
    }

    #[test]
    fn test_single_rank_ghosts_untouched() {
        let ghosts = World::run(1, |comm| {
            let mut grid = Grid::new(&comm, 3, 1.0, 1, GridOptions::default(), |p| {
                p.output()[0] = 9.0;
            })
            .unwrap();
            grid.apply_op(1, 1, identity).unwrap();
            (grid.ghost(Side::Left).to_vec(), grid.ghost(Side::Right).to_vec())
        })
        .unwrap();

        assert_eq!(ghosts[0], (vec![0.0], vec![0.0]));
    }

    #[test]
    fn test_periodic_ring() {
        let ghosts = World::run(3, |comm| {
            let options = GridOptions {
                edge: EdgeGhost::Periodic,
                ..Default::default()
            };
            let grid = Grid::new(&comm, 2, 1.0, 1, options, coordinate_init).unwrap();
            (grid.ghost(Side::Left)[0], grid.ghost(Side::Right)[0])
        })
        .unwrap();

        assert_eq!(ghosts[0], (5.0, 2.0));
        assert_eq!(ghosts[1], (1.0, 4.0));
        assert_eq!(ghosts[2], (3.0, 0.0));
    }

    #[test]
    fn test_single_point_per_rank() {
        let values = World::run(3, |comm| {
            let mut grid = Grid::new(&comm, 1, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
            grid.apply_op(1, 1, |p| {
                let sum = p.left().input()[0] + p.right().input()[0];
                p.output()[0] = sum;
            })
            .unwrap();
            grid.buffer().as_slice().to_vec()
        })
        .unwrap();

        // Owned values before the step: 0, 1, 2.
        assert_eq!(values[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(values[1], vec![1.0, 2.0, 1.0]);
        assert_eq!(values[2], vec![2.0, 1.0, 0.0]);
    }

    #[test]
    fn test_operator_sees_coordinates() {
        let xs = World::run(2, |comm| {
            let mut grid = Grid::new(&comm, 3, 2.0, 1, GridOptions::default(), coordinate_init).unwrap();
            let mut seen = Vec::new();
            grid.apply_op(1, 1, |p| {
                assert_eq!(p.left().x() + 2.0, p.x());
                assert_eq!(p.right().x() - 2.0, p.x());
                seen.push(p.x());
                p.output()[0] = 0.0;
            })
            .unwrap();
            seen.sort_by(f64::total_cmp);
            seen
        })
        .unwrap();

        assert_eq!(xs[0], vec![0.0, 2.0, 4.0]);
        assert_eq!(xs[1], vec![6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_apply_fixed_matches_dynamic() {
        let results = World::run(2, |comm| {
            let mut dynamic = Grid::new(&comm, 5, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
            dynamic
                .apply_op(1, 2, |p| {
                    let u = p.input()[0];
                    let du = p.right().input()[0] - p.left().input()[0];
                    p.output().copy_from_slice(&[u, du]);
                })
                .unwrap();

            let mut fixed = Grid::new(&comm, 5, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
            fixed
                .apply_fixed::<1, 2, _>(|p| {
                    let [u] = *p.input();
                    let du = p.right().input()[0] - p.left().input()[0];
                    *p.output() = [u, du];
                })
                .unwrap();

            let mismatch = fixed.apply_fixed::<1, 1, _>(|p| p.output()[0] = 0.0);
            (
                dynamic.buffer().as_slice().to_vec(),
                fixed.buffer().as_slice().to_vec(),
                mismatch.is_err(),
            )
        })
        .unwrap();

        for (dynamic, fixed, mismatch) in results {
            assert_eq!(dynamic, fixed);
            assert!(mismatch);
        }
    }

    #[test]
    fn test_invalid_construction() {
        let comms = World::connect(1).unwrap();
        let comm = &comms[0];
        assert!(matches!(
            Grid::new(comm, 0, 1.0, 1, GridOptions::default(), coordinate_init),
            Err(GridError::NoPoints)
        ));
        assert!(matches!(
            Grid::new(comm, 4, 0.0, 1, GridOptions::default(), coordinate_init),
            Err(GridError::InvalidSpacing(_))
        ));
        assert!(matches!(
            Grid::new(comm, 4, 1.0, 0, GridOptions::default(), coordinate_init),
            Err(GridError::NoVariables)
        ));
    }

    #[test]
    fn test_colorize() {
        let comms = World::connect(1).unwrap();
        let grid = Grid::new(&comms[0], 3, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
        let cm = ColorMap {
            red: ChannelMap {
                variable: 0,
                low: 0.0,
                high: 2.0,
            },
            ..Default::default()
        };

        let mut canvas = Canvas::default();
        grid.colorize(4, &cm, &mut canvas).unwrap();

        assert_eq!(canvas.width(), 3);
        assert_eq!(canvas.height(), 5);
        assert_eq!(canvas.get(0, 4), Some([0.0, 0.0, 0.0]));
        assert_eq!(canvas.get(2, 4), Some([1.0, 2.0, 2.0]));
    }

    #[test]
    fn test_colorize_rejects_bad_variable_before_output() {
        let comms = World::connect(1).unwrap();
        let grid = Grid::new(&comms[0], 3, 1.0, 1, GridOptions::default(), coordinate_init).unwrap();
        let cm = ColorMap {
            blue: ChannelMap {
                variable: 1,
                low: 0.0,
                high: 1.0,
            },
            ..Default::default()
        };

        let mut canvas = Canvas::default();
        let err = grid.colorize(0, &cm, &mut canvas).unwrap_err();
        assert!(matches!(err, GridError::Palette(_)));
        assert_eq!(canvas.height(), 0);
    }

    #[test]
    fn test_stats() {
        let comms = World::connect(1).unwrap();
        let grid = Grid::new(&comms[0], 4, 1.0, 2, GridOptions::default(), |p| {
            let x = p.x();
            p.output().copy_from_slice(&[x, 1.0]);
        })
        .unwrap();

        let stats = grid.stats();
        assert_eq!(stats.min, vec![0.0, 1.0]);
        assert_eq!(stats.max, vec![3.0, 1.0]);
        assert_eq!(stats.sum, vec![6.0, 4.0]);
    }

    #[test]
    fn test_from_config() {
        let config = SolverConfig {
            ranks: 2,
            num_grids: 4,
            dx: 0.5,
            initial: crate::schema::InitialCondition::Constant { value: 2.0 },
            ..Default::default()
        };
        let values = World::run(config.ranks, |comm| {
            let grid = Grid::from_config(&comm, &config).unwrap();
            (grid.x0(), owned_values(&grid))
        })
        .unwrap();

        assert_eq!(values[0], (0.0, vec![2.0; 4]));
        assert_eq!(values[1], (2.0, vec![2.0; 4]));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            #[test]
            fn prop_ghosts_mirror_neighbors(ranks in 1usize..5, num_grids in 1usize..7, steps in 0usize..3) {
                let edges = World::run(ranks, |comm| {
                    let mut grid = Grid::new(&comm, num_grids, 1.0, 1, GridOptions::default(), |p| {
                        let x = p.x();
                        p.output()[0] = x * x;
                    })
                    .unwrap();
                    for _ in 0..steps {
                        grid.apply_op(1, 1, |p| {
                            let next = 0.5 * p.input()[0] + 0.25 * (p.left().input()[0] + p.right().input()[0]);
                            p.output()[0] = next;
                        })
                        .unwrap();
                    }
                    let b = grid.buffer();
                    (b.point(0)[0], b.point(1)[0], b.point(num_grids)[0], b.point(num_grids + 1)[0])
                })
                .unwrap();

                for pair in edges.windows(2) {
                    prop_assert_eq!(pair[0].3, pair[1].1);
                    prop_assert_eq!(pair[1].0, pair[0].2);
                }
            }

            #[test]
            fn prop_coordinates_are_continuous(ranks in 1usize..6, num_grids in 1usize..9, dx in 0.001f64..10.0) {
                let spans = World::run(ranks, |comm| {
                    let grid = Grid::new(&comm, num_grids, dx, 1, GridOptions::default(), |p| {
                        p.output()[0] = 0.0;
                    })
                    .unwrap();
                    (grid.coordinate(1), grid.coordinate(num_grids))
                })
                .unwrap();

                prop_assert_eq!(spans[0].0, 0.0);
                for pair in spans.windows(2) {
                    let gap = pair[1].0 - (pair[0].1 + dx);
                    prop_assert!(gap.abs() <= 1e-9 * pair[1].0.max(1.0), "gap {} at dx {}", gap, dx);
                }
            }
        }
    }
}
