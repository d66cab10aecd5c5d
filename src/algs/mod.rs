//! Communication primitives shared by the partitioner and the loader.

pub mod communicator;

pub use communicator::{CommTag, Communicator, NoComm, ReduceOp, ThreadComm, Wait, agree, run_on_threads};
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
