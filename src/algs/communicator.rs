//! Thin façade over in-process (threads) or inter-process (MPI) message passing.
//!
//! Every component that talks to other ranks takes an explicit `&C: Communicator`;
//! there is no process-wide default channel. Messages are *contiguous byte
//! slices*. Collectives have default implementations layered on `isend`/`irecv`
//! (gather to rank 0, then broadcast back), and backends with native
//! collectives override them.
//!
//! There are no timeouts. A rank that never reaches a collective stalls every
//! other rank forever; operators must treat a hang as fatal.

use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::graph_error::DistGraphError;

/// Typed message tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Tags reserved for the built-in collectives. User traffic should stay below
/// `0x7f00`.
pub mod tags {
    use super::CommTag;

    pub const GATHER: CommTag = CommTag(0x7f00);
    pub const BROADCAST: CommTag = CommTag(0x7f01);
}

/// Reduction applied by `all_reduce_*`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    /// Fold in rank order, so every backend agrees bit-for-bit.
    pub fn fold_u64(self, values: &[u64]) -> u64 {
        match self {
            ReduceOp::Sum => values.iter().sum(),
            ReduceOp::Max => values.iter().copied().max().unwrap_or(0),
            ReduceOp::Min => values.iter().copied().min().unwrap_or(0),
        }
    }

    pub fn fold_f64(self, values: &[f64]) -> f64 {
        match self {
            ReduceOp::Sum => values.iter().sum(),
            ReduceOp::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ReduceOp::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        }
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Block until completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Communication context handed to every collective step of the loader.
pub trait Communicator {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Copy `buf` from `root` into `buf` on every other rank. All ranks must
    /// pass a buffer of the same length.
    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<(), DistGraphError> {
        let size = self.size();
        if root >= size {
            return Err(DistGraphError::RankOutOfRange { rank: root, parts: size });
        }
        if self.rank() == root {
            for peer in (0..size).filter(|&p| p != root) {
                self.isend(peer, tags::BROADCAST.as_u16(), buf).wait();
            }
        } else {
            let data = recv_exact(self, root, tags::BROADCAST, buf.len())?;
            buf.copy_from_slice(&data);
        }
        Ok(())
    }

    /// Every rank contributes one value; every rank gets all of them in rank order.
    fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, DistGraphError> {
        let size = self.size();
        let mut values = vec![0u64; size];
        if self.rank() == 0 {
            values[0] = value;
            for (peer, slot) in values.iter_mut().enumerate().skip(1) {
                let data = recv_exact(self, peer, tags::GATHER, 8)?;
                *slot = decode_u64(&data);
            }
        } else {
            self.isend(0, tags::GATHER.as_u16(), &value.to_le_bytes())
                .wait();
        }
        let mut bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.broadcast(0, &mut bytes)?;
        Ok(bytes.chunks_exact(8).map(decode_u64).collect())
    }

    fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, DistGraphError> {
        Ok(op.fold_u64(&self.all_gather_u64(value)?))
    }

    fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, DistGraphError> {
        let values: Vec<f64> = self
            .all_gather_u64(value.to_bits())?
            .into_iter()
            .map(f64::from_bits)
            .collect();
        Ok(op.fold_f64(&values))
    }

    /// No rank returns before every rank has entered.
    fn barrier(&self) -> Result<(), DistGraphError> {
        self.all_gather_u64(0).map(|_| ())
    }
}

/// Collective: one rank's failure becomes a failure on every rank. The
/// failing rank keeps its own error; the others get `PeerLoadFailed`.
pub fn agree<C: Communicator + ?Sized, T>(
    comm: &C,
    local: Result<T, DistGraphError>,
) -> Result<T, DistGraphError> {
    let failed = comm.all_reduce_u64(u64::from(local.is_err()), ReduceOp::Sum)?;
    match local {
        Err(e) => {
            log::error!("rank {}: {e}", comm.rank());
            Err(e)
        }
        Ok(_) if failed > 0 => {
            log::warn!("rank {}: {failed} peer(s) failed", comm.rank());
            Err(DistGraphError::PeerLoadFailed {
                failed_ranks: failed,
            })
        }
        Ok(v) => Ok(v),
    }
}

fn decode_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(raw)
}

/// Receive one message of exactly `len` bytes from `peer`.
fn recv_exact<C: Communicator + ?Sized>(
    comm: &C,
    peer: usize,
    tag: CommTag,
    len: usize,
) -> Result<Vec<u8>, DistGraphError> {
    let mut buf = vec![0u8; len];
    match comm.irecv(peer, tag.as_u16(), &mut buf).wait() {
        Some(data) if data.len() == len => Ok(data),
        Some(data) => Err(DistGraphError::CommError {
            neighbor: peer,
            message: format!("expected {len} bytes, got {}", data.len()),
        }),
        None => Err(DistGraphError::CommError {
            neighbor: peer,
            message: "receive completed without data".into(),
        }),
    }
}

/// Single-rank communicator for serial runs and unit tests.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- ThreadComm: several ranks inside one process ---
type Key = (usize, usize, u16); // (src, dst, tag)

#[derive(Default)]
struct Mailbox {
    queues: Mutex<HashMap<Key, VecDeque<Bytes>>>,
    arrived: Condvar,
}

/// Ranks simulated by OS threads sharing one mailbox. Messages between a
/// given `(src, dst, tag)` triple are delivered in FIFO order.
#[derive(Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// One communicator per rank, all attached to a fresh mailbox.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        let mailbox = Arc::new(Mailbox::default());
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

pub struct ThreadRecv {
    mailbox: Arc<Mailbox>,
    key: Key,
}

impl Wait for ThreadRecv {
    fn wait(self) -> Option<Vec<u8>> {
        let mut queues = self.mailbox.queues.lock();
        loop {
            if let Some(msg) = queues.get_mut(&self.key).and_then(VecDeque::pop_front) {
                return Some(msg.to_vec());
            }
            self.mailbox.arrived.wait(&mut queues);
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = ThreadRecv;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) {
        let key = (self.rank, peer, tag);
        self.mailbox
            .queues
            .lock()
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
        self.mailbox.arrived.notify_all();
    }

    fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> ThreadRecv {
        ThreadRecv {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
        }
    }
}

/// Run `f` once per rank on its own scoped thread and collect the results in
/// rank order. A panicking rank is re-raised here once every thread has
/// finished, so a rank that panics before a collective hangs the others.
pub fn run_on_threads<T, F>(size: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(ThreadComm) -> T + Sync,
{
    let f = &f;
    std::thread::scope(|s| {
        let handles: Vec<_> = ThreadComm::world(size)
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(v) => v,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::{Communicator as _, CommunicatorCollectives, Destination, Root, Source};

    /// `MPI_COMM_WORLD` with native collectives.
    pub struct MpiComm {
        // dropped before the universe, which finalizes MPI
        world: SimpleCommunicator,
        _universe: Universe,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, DistGraphError> {
            let universe = mpi::initialize()
                .ok_or_else(|| DistGraphError::CommInit("MPI already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                _universe: universe,
                rank,
                size,
            })
        }

        /// Tear down every rank after a fatal load error.
        pub fn abort(&self, code: i32) -> ! {
            self.world.abort(code)
        }

        fn system_op(op: ReduceOp) -> SystemOperation {
            match op {
                ReduceOp::Sum => SystemOperation::sum(),
                ReduceOp::Max => SystemOperation::max(),
                ReduceOp::Min => SystemOperation::min(),
            }
        }
    }

    /// Completed transfer; MPI calls here are blocking.
    pub struct MpiHandle(Option<Vec<u8>>);

    impl Wait for MpiHandle {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiHandle;
        type RecvHandle = MpiHandle;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiHandle {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, i32::from(tag));
            MpiHandle(None)
        }

        fn irecv(&self, peer: usize, tag: u16, _buf: &mut [u8]) -> MpiHandle {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(i32::from(tag));
            MpiHandle(Some(data))
        }

        fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<(), DistGraphError> {
            if root >= self.size {
                return Err(DistGraphError::RankOutOfRange {
                    rank: root,
                    parts: self.size,
                });
            }
            self.world.process_at_rank(root as i32).broadcast_into(buf);
            Ok(())
        }

        fn all_gather_u64(&self, value: u64) -> Result<Vec<u64>, DistGraphError> {
            let mut out = vec![0u64; self.size];
            self.world.all_gather_into(&value, &mut out[..]);
            Ok(out)
        }

        fn all_reduce_u64(&self, value: u64, op: ReduceOp) -> Result<u64, DistGraphError> {
            let mut out = 0u64;
            self.world
                .all_reduce_into(&value, &mut out, Self::system_op(op));
            Ok(out)
        }

        fn all_reduce_f64(&self, value: f64, op: ReduceOp) -> Result<f64, DistGraphError> {
            let mut out = 0f64;
            self.world
                .all_reduce_into(&value, &mut out, Self::system_op(op));
            Ok(out)
        }

        fn barrier(&self) -> Result<(), DistGraphError> {
            self.world.barrier();
            Ok(())
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
