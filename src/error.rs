//! Error types surfaced by the simulation kernel.

use crate::time::SimTime;
use std::io;

/// An error that occurred while configuring or running a simulation.
///
/// Precondition violations (negative delays, use of a destroyed engine,
/// reconfiguration after first use) are programming errors and panic at the
/// call site instead of surfacing here. This type covers the failures a
/// correct program can still observe: invalid synchronization configuration,
/// transport faults, and causality violations reported by a peer process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A distributed engine was configured in a way that cannot guarantee
    /// progress, e.g. a link with zero lookahead.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The inter-process transport failed.
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),

    /// A message arrived with a timestamp earlier than the local clock.
    ///
    /// This indicates a lookahead or protocol bug in the model driving the
    /// simulation. The run is aborted; the engine is left stopped.
    #[error("causality violation: message from rank {from} stamped {stamped} arrived at local time {local}")]
    Causality {
        /// Rank of the sending process.
        from: u32,
        /// Timestamp carried by the offending message.
        stamped: SimTime,
        /// Local simulation time when the message surfaced.
        local: SimTime,
    },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
