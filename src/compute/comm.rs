//! Rank runtime - point-to-point message passing along a chain of ranks.
//!
//! Each rank runs on its own OS thread and owns a [`ChannelComm`]. Every
//! ordered pair of ranks is joined by one unbounded crossbeam channel, so a
//! send never blocks and a receive blocks only until the matching message
//! arrives. Messages are matched by `(source, tag)`; messages with the same
//! `(source, tag)` arrive in send order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

/// Message tag used to match sends with receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Leftmost owned point travelling towards the left neighbor.
    Leftward,
    /// Rightmost owned point travelling towards the right neighbor.
    Rightward,
    /// Application-defined tag.
    User(u32),
}

/// Errors raised by the rank runtime.
#[derive(Debug, thiserror::Error)]
pub enum CommError {
    #[error("World must contain at least one rank")]
    EmptyWorld,
    #[error("Rank {rank} is outside a world of {size} ranks")]
    InvalidRank { rank: usize, size: usize },
    #[error("Rank {peer} disconnected before {tag:?} was exchanged")]
    Disconnected { peer: usize, tag: Tag },
    #[error("Timed out after {timeout:?} waiting for {tag:?} from rank {peer}")]
    Timeout {
        peer: usize,
        tag: Tag,
        timeout: Duration,
    },
    #[error("Failed to spawn rank {rank}: {source}")]
    Spawn {
        rank: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("Rank {rank} panicked")]
    RankPanicked { rank: usize },
    #[cfg(feature = "mpi")]
    #[error("MPI was already initialized in this process")]
    MpiInitialized,
    #[cfg(feature = "mpi")]
    #[error("Tag {0:?} does not fit an MPI tag")]
    TagOutOfRange(Tag),
}

/// Point-to-point communication available to a single rank.
pub trait Communicator {
    /// This rank's index in `0..size()`.
    fn rank(&self) -> usize;

    /// Total number of ranks in the chain.
    fn size(&self) -> usize;

    /// Queue `payload` for delivery to `dest`. Never blocks.
    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<(), CommError>;

    /// Block until a message with `tag` from `source` is available.
    ///
    /// With `timeout` set, gives up with [`CommError::Timeout`] once it elapses.
    fn receive(
        &self,
        source: usize,
        tag: Tag,
        timeout: Option<Duration>,
    ) -> Result<Vec<f64>, CommError>;
}

struct Envelope {
    tag: Tag,
    payload: Vec<f64>,
}

/// Channel-backed communicator owned by one rank thread.
pub struct ChannelComm {
    rank: usize,
    size: usize,
    /// Indexed by destination rank.
    outboxes: Vec<Sender<Envelope>>,
    /// Indexed by source rank.
    inboxes: Vec<Receiver<Envelope>>,
    /// Messages that arrived ahead of the receive asking for them, per source.
    parked: RefCell<Vec<VecDeque<Envelope>>>,
}

impl ChannelComm {
    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank >= self.size {
            return Err(CommError::InvalidRank {
                rank,
                size: self.size,
            });
        }
        Ok(())
    }

    fn take_parked(&self, source: usize, tag: Tag) -> Option<Vec<f64>> {
        let mut parked = self.parked.borrow_mut();
        let queue = &mut parked[source];
        let pos = queue.iter().position(|e| e.tag == tag)?;
        queue.remove(pos).map(|e| e.payload)
    }
}

impl Communicator for ChannelComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, tag: Tag, payload: Vec<f64>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        log::trace!(
            "rank {} -> rank {}: {:?} ({} values)",
            self.rank,
            dest,
            tag,
            payload.len()
        );
        self.outboxes[dest]
            .send(Envelope { tag, payload })
            .map_err(|_| CommError::Disconnected { peer: dest, tag })
    }

    fn receive(
        &self,
        source: usize,
        tag: Tag,
        timeout: Option<Duration>,
    ) -> Result<Vec<f64>, CommError> {
        self.check_rank(source)?;
        if let Some(payload) = self.take_parked(source, tag) {
            return Ok(payload);
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        let inbox = &self.inboxes[source];
        loop {
            let envelope = match deadline {
                Some(deadline) => inbox.recv_deadline(deadline).map_err(|e| match e {
                    RecvTimeoutError::Timeout => CommError::Timeout {
                        peer: source,
                        tag,
                        timeout: timeout.unwrap_or_default(),
                    },
                    RecvTimeoutError::Disconnected => CommError::Disconnected { peer: source, tag },
                })?,
                None => inbox
                    .recv()
                    .map_err(|_| CommError::Disconnected { peer: source, tag })?,
            };

            if envelope.tag == tag {
                log::trace!(
                    "rank {} <- rank {}: {:?} ({} values)",
                    self.rank,
                    source,
                    tag,
                    envelope.payload.len()
                );
                return Ok(envelope.payload);
            }
            self.parked.borrow_mut()[source].push_back(envelope);
        }
    }
}

/// Process-wide rank runtime.
///
/// The runtime is brought up once by [`World::run`] and torn down when every
/// rank body has returned. Grids borrow a communicator from inside a rank body
/// and never manage the runtime themselves.
pub struct World;

impl World {
    /// Build a fully connected set of `size` communicators.
    pub fn connect(size: usize) -> Result<Vec<ChannelComm>, CommError> {
        if size == 0 {
            return Err(CommError::EmptyWorld);
        }

        // senders[src][dst] / receivers[dst][src]
        let mut senders: Vec<Vec<Sender<Envelope>>> = (0..size).map(|_| Vec::new()).collect();
        let mut receivers: Vec<Vec<Receiver<Envelope>>> = (0..size).map(|_| Vec::new()).collect();
        for outboxes in senders.iter_mut() {
            for inboxes in receivers.iter_mut() {
                let (tx, rx) = unbounded();
                outboxes.push(tx);
                inboxes.push(rx);
            }
        }

        Ok(senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ChannelComm {
                rank,
                size,
                outboxes,
                inboxes,
                parked: RefCell::new((0..size).map(|_| VecDeque::new()).collect()),
            })
            .collect())
    }

    /// Run `body` once per rank, each on its own thread, and collect the
    /// results in rank order.
    ///
    /// A rank that exits early drops its channels, so peers blocked on it see
    /// [`CommError::Disconnected`] rather than hanging.
    pub fn run<T, F>(size: usize, body: F) -> Result<Vec<T>, CommError>
    where
        T: Send,
        F: Fn(ChannelComm) -> T + Sync,
    {
        let comms = Self::connect(size)?;
        log::debug!("starting world of {} ranks", size);

        thread::scope(|scope| -> Result<Vec<T>, CommError> {
            let body = &body;
            let mut handles = Vec::with_capacity(size);
            for comm in comms {
                let rank = comm.rank;
                let handle = thread::Builder::new()
                    .name(format!("rank-{rank}"))
                    .spawn_scoped(scope, move || body(comm))
                    .map_err(|source| CommError::Spawn { rank, source })?;
                handles.push(handle);
            }

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, handle)| handle.join().map_err(|_| CommError::RankPanicked { rank }))
                .collect()
        })
    }
}
