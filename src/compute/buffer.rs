//! Per-rank grid storage with ghost slots.
//!
//! Layout is point-major: point `i` occupies
//! `data[i * num_variables..(i + 1) * num_variables]`. Index `0` and
//! `num_grids + 1` are ghost slots, `1..=num_grids` are owned points.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::GridError;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(0);

/// One end of the owned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Contiguous storage for `num_grids + 2` points of `num_variables` values.
#[derive(Debug)]
pub struct GridBuffer {
    id: u64,
    num_grids: usize,
    num_variables: usize,
    data: Vec<f64>,
    exchange_in_flight: Arc<AtomicBool>,
    ghosts_current: bool,
}

impl GridBuffer {
    /// Allocate a zero-filled buffer.
    pub fn new(num_grids: usize, num_variables: usize) -> Result<Self, GridError> {
        if num_grids == 0 {
            return Err(GridError::NoPoints);
        }
        if num_variables == 0 {
            return Err(GridError::NoVariables);
        }

        let too_large = GridError::Allocation {
            points: num_grids.saturating_add(2),
            variables: num_variables,
        };
        let Some(len) = num_grids
            .checked_add(2)
            .and_then(|points| points.checked_mul(num_variables))
        else {
            return Err(too_large);
        };
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| too_large)?;
        data.resize(len, 0.0);

        Ok(Self {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
            num_grids,
            num_variables,
            data,
            exchange_in_flight: Arc::new(AtomicBool::new(false)),
            ghosts_current: false,
        })
    }

    /// Number of owned points.
    #[inline]
    pub fn num_grids(&self) -> usize {
        self.num_grids
    }

    /// Number of values stored per point.
    #[inline]
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    /// Index of the owned point at `side`.
    #[inline]
    pub fn boundary_index(&self, side: Side) -> usize {
        match side {
            Side::Left => 1,
            Side::Right => self.num_grids,
        }
    }

    /// Index of the ghost slot at `side`.
    #[inline]
    pub fn ghost_index(&self, side: Side) -> usize {
        match side {
            Side::Left => 0,
            Side::Right => self.num_grids + 1,
        }
    }

    /// Values at `index`, which may be a ghost slot.
    ///
    /// Panics if `index > num_grids + 1`.
    #[inline]
    pub fn point(&self, index: usize) -> &[f64] {
        let start = index * self.num_variables;
        &self.data[start..start + self.num_variables]
    }

    /// Mutable values at `index`.
    ///
    /// Writing a boundary point invalidates the ghost state of this buffer.
    #[inline]
    pub fn point_mut(&mut self, index: usize) -> &mut [f64] {
        self.touch(index);
        let start = index * self.num_variables;
        &mut self.data[start..start + self.num_variables]
    }

    /// Fixed-width view of the values at `index`. `N` must equal
    /// `num_variables`.
    #[inline]
    pub(crate) fn cell_mut<const N: usize>(&mut self, index: usize) -> &mut [f64; N] {
        debug_assert_eq!(N, self.num_variables);
        self.touch(index);
        let (cells, _) = self.data.as_chunks_mut::<N>();
        &mut cells[index]
    }

    /// Values of the ghost slot at `side`.
    pub fn ghost(&self, side: Side) -> &[f64] {
        self.point(self.ghost_index(side))
    }

    /// Iterate over owned points, left to right.
    pub fn owned(&self) -> impl Iterator<Item = &[f64]> {
        self.data
            .chunks_exact(self.num_variables)
            .skip(1)
            .take(self.num_grids)
    }

    /// Whole buffer, ghosts included.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// True once a completed exchange has filled the ghosts and no boundary
    /// point has been written since.
    #[inline]
    pub fn ghosts_current(&self) -> bool {
        self.ghosts_current
    }

    /// True between the start of an exchange and its completion.
    #[inline]
    pub fn exchange_in_flight(&self) -> bool {
        self.exchange_in_flight.load(Ordering::Acquire)
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Shared handle to the in-flight flag, held by the exchange that set it.
    pub(crate) fn in_flight_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exchange_in_flight)
    }

    pub(crate) fn set_exchange_in_flight(&mut self, in_flight: bool) {
        self.exchange_in_flight.store(in_flight, Ordering::Release);
    }

    pub(crate) fn mark_ghosts_current(&mut self) {
        self.ghosts_current = true;
    }

    pub(crate) fn fill_ghost(&mut self, side: Side, values: &[f64]) {
        let start = self.ghost_index(side) * self.num_variables;
        self.data[start..start + self.num_variables].copy_from_slice(values);
    }

    /// Copy the owned point at `side` into the adjacent ghost slot.
    pub(crate) fn mirror_ghost(&mut self, side: Side) {
        let nv = self.num_variables;
        let src = self.boundary_index(side) * nv;
        let dst = self.ghost_index(side) * nv;
        self.data.copy_within(src..src + nv, dst);
    }

    fn touch(&mut self, index: usize) {
        if index == 1 || index == self.num_grids {
            if self.exchange_in_flight() {
                log::warn!("boundary point {} written while its exchange is in flight", index);
            }
            self.ghosts_current = false;
        }
    }
}
