//! Boundary synchronizer - non-blocking ghost exchange with chain neighbors.
//!
//! [`BoundarySync::start`] sends the two boundary points of a buffer and
//! returns immediately; [`BoundarySync::wait_till_done`] blocks until the
//! neighbors' boundary points have arrived and writes them into the ghosts.
//! Between the two calls the caller is free to compute interior points.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::schema::EdgeGhost;

use super::{CommError, Communicator, GridBuffer, Side, Tag};

/// Errors raised while exchanging ghost values.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("An exchange is already in flight on this buffer")]
    AlreadyInFlight,
    #[error("Exchange was started on a different buffer")]
    ForeignBuffer,
    #[error("Rank {peer} sent {found} values, expected {expected}")]
    PayloadLength {
        peer: usize,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Comm(#[from] CommError),
}

/// Exchange partners of one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePlan {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl ExchangePlan {
    /// Partners of `rank` in a chain of `size` ranks.
    ///
    /// Endpoints have no partner on their outer side unless the edge
    /// condition is periodic, in which case the chain closes into a ring.
    pub fn for_rank(rank: usize, size: usize, edge: &EdgeGhost) -> Self {
        match edge {
            EdgeGhost::Periodic => Self {
                left: Some((rank + size - 1) % size),
                right: Some((rank + 1) % size),
            },
            _ => Self {
                left: rank.checked_sub(1),
                right: (rank + 1 < size).then_some(rank + 1),
            },
        }
    }

    fn partner(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// Tag carried by values leaving through `side`.
fn outgoing_tag(side: Side) -> Tag {
    match side {
        Side::Left => Tag::Leftward,
        Side::Right => Tag::Rightward,
    }
}

/// Tag carried by values arriving into the ghost at `side`.
fn incoming_tag(side: Side) -> Tag {
    match side {
        Side::Left => Tag::Rightward,
        Side::Right => Tag::Leftward,
    }
}

/// One in-flight ghost exchange. Must be finished with
/// [`wait_till_done`](Self::wait_till_done).
#[must_use = "a started exchange must be awaited with wait_till_done"]
pub struct BoundarySync<'c, C: Communicator + ?Sized> {
    comm: &'c C,
    plan: ExchangePlan,
    edge: EdgeGhost,
    timeout: Option<Duration>,
    buffer_id: u64,
    in_flight: Arc<AtomicBool>,
    done: bool,
}

impl<'c, C: Communicator + ?Sized> BoundarySync<'c, C> {
    /// Send the boundary points of `buffer` to the neighbors.
    pub fn start(
        comm: &'c C,
        buffer: &mut GridBuffer,
        edge: &EdgeGhost,
        timeout: Option<Duration>,
    ) -> Result<Self, SyncError> {
        if buffer.exchange_in_flight() {
            return Err(SyncError::AlreadyInFlight);
        }

        let plan = ExchangePlan::for_rank(comm.rank(), comm.size(), edge);
        for side in [Side::Left, Side::Right] {
            if let Some(peer) = plan.partner(side) {
                let values = buffer.point(buffer.boundary_index(side)).to_vec();
                comm.send(peer, outgoing_tag(side), values)?;
            }
        }
        buffer.set_exchange_in_flight(true);
        log::debug!("rank {}: exchange started {:?}", comm.rank(), plan);

        Ok(Self {
            comm,
            plan,
            edge: edge.clone(),
            timeout,
            buffer_id: buffer.id(),
            in_flight: buffer.in_flight_flag(),
            done: false,
        })
    }

    /// Block until both ghosts of `buffer` hold the neighbors' values.
    ///
    /// Sides without a partner are filled according to the edge condition.
    ///
    /// Passing a buffer other than the one the exchange started on fails with
    /// [`SyncError::ForeignBuffer`]. The neighbors' messages are still
    /// consumed and the original buffer is released, so it can start a fresh
    /// exchange; its ghosts are left as they were.
    pub fn wait_till_done(mut self, buffer: &mut GridBuffer) -> Result<(), SyncError> {
        self.done = true;
        self.in_flight.store(false, Ordering::Release);
        if buffer.id() != self.buffer_id {
            self.discard_incoming();
            return Err(SyncError::ForeignBuffer);
        }

        for side in [Side::Left, Side::Right] {
            match self.plan.partner(side) {
                Some(peer) => {
                    let values = self.comm.receive(peer, incoming_tag(side), self.timeout)?;
                    if values.len() != buffer.num_variables() {
                        return Err(SyncError::PayloadLength {
                            peer,
                            expected: buffer.num_variables(),
                            found: values.len(),
                        });
                    }
                    buffer.fill_ghost(side, &values);
                }
                None => fill_edge(buffer, side, &self.edge),
            }
        }

        buffer.mark_ghosts_current();
        log::debug!("rank {}: exchange complete", self.comm.rank());
        Ok(())
    }

    fn discard_incoming(&self) {
        for side in [Side::Left, Side::Right] {
            if let Some(peer) = self.plan.partner(side)
                && let Err(e) = self.comm.receive(peer, incoming_tag(side), self.timeout)
            {
                log::warn!(
                    "rank {}: abandoned exchange lost {:?} from rank {}: {}",
                    self.comm.rank(),
                    incoming_tag(side),
                    peer,
                    e
                );
            }
        }
    }
}

impl<C: Communicator + ?Sized> Drop for BoundarySync<'_, C> {
    fn drop(&mut self) {
        if !self.done && !std::thread::panicking() {
            log::error!(
                "rank {}: boundary exchange dropped without wait_till_done",
                self.comm.rank()
            );
            debug_assert!(false, "boundary exchange dropped without wait_till_done");
        }
    }
}

fn fill_edge(buffer: &mut GridBuffer, side: Side, edge: &EdgeGhost) {
    match edge {
        EdgeGhost::Stale | EdgeGhost::Periodic => {}
        EdgeGhost::Mirror => buffer.mirror_ghost(side),
        EdgeGhost::Constant { value } => {
            let values = vec![*value; buffer.num_variables()];
            buffer.fill_ghost(side, &values);
        }
    }
}
