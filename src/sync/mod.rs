//!
//! Conservative synchronization for multi-process simulations.
//!
//! Each participating process owns one sequential [`Runtime`] and advances
//! it only as far as causal safety allows: no process ever executes a local
//! event at time `T` while a message that could still arrive from a neighbor
//! carries a timestamp below `T`. Two protocols are provided:
//!
//! - [`WindowSimulator`]: barrier-synchronized granted-time windows. All
//!   processes repeatedly agree on the global minimum pending timestamp and
//!   execute strictly below `min + lookahead`.
//! - [`NullMessageSimulator`]: a Chandy–Misra–Bryant variant. Each link
//!   carries a lookahead; null messages propagate per-link safe-advance
//!   bounds, so loosely coupled processes proceed without global barriers.
//!
//! Processes exchange only timestamped messages via a [`Transport`]; there
//! is no shared memory and no cross-process cancellation. The concrete
//! transport is an external collaborator; [`mem`] ships an in-memory
//! reference implementation for tests and examples.
//!
//! Run limits and [`stop`](crate::core::Simulator::stop) remain
//! process-local. In a distributed run every rank must apply an equivalent
//! time limit; a rank that pauses or stops on its own leaves its peers
//! waiting at their next synchronization point.
//!

use crate::core::Runtime;
use crate::time::SimTime;

mod null_message;
mod window;

pub mod mem;

pub use null_message::NullMessageSimulator;
pub use window::WindowSimulator;

use crate::error::Error;

///
/// A cross-process message staged by an executing event via
/// [`Runtime::send_remote`].
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMessage {
    /// Rank of the destination process.
    pub dest: u32,
    /// Absolute timestamp the payload applies at.
    pub time: SimTime,
    /// Opaque model payload.
    pub bytes: Vec<u8>,
}

///
/// The wire unit of the synchronization layer.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// For data: the timestamp the payload applies at. For null messages:
    /// the safe-advance bound; the sender guarantees that no future message
    /// on this link will carry an earlier timestamp.
    pub time: SimTime,
    /// Payload discriminator.
    pub kind: EnvelopeKind,
}

/// Payload discriminator of an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// A causally relevant model message.
    Data(Vec<u8>),
    /// A synchronization-only null message.
    Null,
}

///
/// The per-round advertisement of the window protocol.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    /// Timestamp of the advertising process's next pending event, or
    /// [`SimTime::MAX`] if it has none.
    pub next_event: SimTime,
    /// Data messages sent so far.
    pub sent: u64,
    /// Data messages received so far.
    pub received: u64,
}

///
/// An inter-process message channel plus the consensus primitive of the
/// window protocol.
///
/// Implementations must deliver messages per-link in FIFO order; the
/// null-message protocol derives safe-advance bounds from that property.
///
pub trait Transport {
    /// The rank of the local process, in `0..size`.
    fn rank(&self) -> u32;

    /// The number of participating processes.
    fn size(&self) -> u32;

    /// Sends an envelope to the given rank.
    ///
    /// # Errors
    ///
    /// Fails on transport faults; sending to a peer that has already
    /// finished is not a fault.
    fn send(&mut self, dest: u32, envelope: Envelope) -> Result<(), Error>;

    /// Receives a pending `(source, envelope)` pair without blocking.
    ///
    /// # Errors
    ///
    /// Fails on transport faults.
    fn try_recv(&mut self) -> Result<Option<(u32, Envelope)>, Error>;

    /// Blocks until an envelope arrives.
    ///
    /// # Errors
    ///
    /// Fails on transport faults, including all peers disconnecting while
    /// messages are still expected.
    fn recv(&mut self) -> Result<(u32, Envelope), Error>;

    /// Blocks until every process has entered the barrier. Messages sent
    /// before a barrier are receivable after it.
    ///
    /// # Errors
    ///
    /// Fails on transport faults.
    fn barrier(&mut self) -> Result<(), Error>;

    /// All-gathers one [`SyncSummary`] per process, indexed by rank.
    /// Implies a barrier.
    ///
    /// # Errors
    ///
    /// Fails on transport faults.
    fn exchange(&mut self, local: SyncSummary) -> Result<Vec<SyncSummary>, Error>;
}

///
/// The callback delivering incoming cross-process traffic into the local
/// engine. Receives the engine, the source rank, the carried timestamp and
/// the opaque payload, and is expected to schedule whatever local events the
/// payload implies (via [`Runtime::schedule_absolute`]).
///
pub type Receiver = Box<dyn FnMut(&mut Runtime, u32, SimTime, Vec<u8>)>;

/// `time + lookahead`, saturating at the far end of the time range.
fn bounded_add(time: SimTime, lookahead: SimTime) -> SimTime {
    time.checked_add(lookahead).unwrap_or(SimTime::MAX)
}
