//! MPI communicator - one operating-system process per rank.
//!
//! Requires the `mpi` feature flag and an MPI installation. Launch the binary
//! under `mpirun -n <ranks>`; the world size replaces the configured rank
//! count.
//!
//! Sends use MPI buffered mode so [`Communicator::send`] returns as soon as
//! the payload is copied into the attached buffer. Receives match on
//! `(source, tag)` natively.

use std::marker::PhantomData;
use std::thread;
use std::time::{Duration, Instant};

use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator as _, Destination, Source};

use super::{CommError, Communicator, Tag};

/// Sends a rank may have queued at once: two per exchange, and a rank runs
/// at most one exchange ahead of its neighbors. Doubled for user traffic.
const QUEUED_SENDS: usize = 8;

/// Per-message bookkeeping reserved in the send buffer.
const SEND_OVERHEAD: usize = 512;

/// Process-wide MPI runtime. Finalizes MPI when dropped.
pub struct MpiWorld {
    universe: Universe,
}

impl MpiWorld {
    /// Initialize MPI and attach a send buffer sized for payloads of up to
    /// `max_variables` values.
    pub fn initialize(max_variables: usize) -> Result<Self, CommError> {
        let mut universe = mpi::initialize().ok_or(CommError::MpiInitialized)?;
        let message = max_variables * std::mem::size_of::<f64>() + SEND_OVERHEAD;
        universe.set_buffer_size(QUEUED_SENDS * message);
        Ok(Self { universe })
    }

    /// Communicator for this process's rank.
    pub fn comm(&self) -> MpiComm<'_> {
        let world = self.universe.world();
        MpiComm {
            rank: world.rank() as usize,
            size: world.size() as usize,
            world,
            _universe: PhantomData,
        }
    }
}

/// Communicator backed by `MPI_COMM_WORLD`. Lives no longer than its
/// [`MpiWorld`].
pub struct MpiComm<'u> {
    world: SimpleCommunicator,
    rank: usize,
    size: usize,
    _universe: PhantomData<&'u Universe>,
}

impl MpiComm<'_> {
    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank >= self.size {
            return Err(CommError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }
}

/// MPI tag carrying `tag`. Exchange tags come first so user tags cannot
/// collide with them.
fn mpi_tag(tag: Tag) -> Result<i32, CommError> {
    match tag {
        Tag::Leftward => Ok(0),
        Tag::Rightward => Ok(1),
        Tag::User(n) => i32::try_from(n)
            .ok()
            .and_then(|n| n.checked_add(2))
            .ok_or(CommError::TagOutOfRange(tag)),
    }
}

impl Communicator for MpiComm<'_> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        let mpi_tag = mpi_tag(tag)?;
        log::trace!(
            "rank {} -> rank {}: {:?} ({} values)",
            self.rank,
            dest,
            tag,
            payload.len()
        );
        self.world
            .process_at_rank(dest as i32)
            .buffered_send_with_tag(&payload[..], mpi_tag);
        Ok(())
    }

    fn receive(
        &self,
        source: usize,
        tag: Tag,
        timeout: Option<Duration>,
    ) -> Result<Vec<f64>, CommError> {
        self.check_rank(source)?;
        let mpi_tag = mpi_tag(tag)?;
        let process = self.world.process_at_rank(source as i32);

        if let Some(timeout) = timeout {
            let deadline = Instant::now() + timeout;
            while process.immediate_probe_with_tag(mpi_tag).is_none() {
                if Instant::now() >= deadline {
                    return Err(CommError::Timeout {
                        peer: source,
                        tag,
                        timeout,
                    });
                }
                thread::yield_now();
            }
        }

        let (payload, _status) = process.receive_vec_with_tag::<f64>(mpi_tag);
        log::trace!(
            "rank {} <- rank {}: {:?} ({} values)",
            self.rank,
            source,
            tag,
            payload.len()
        );
        Ok(payload)
    }
}
