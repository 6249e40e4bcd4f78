//!
//! Events: time-stamped, context-tagged, execute-once units of work.
//!

use crate::core::Runtime;
use crate::time::SimTime;
use std::cmp;
use std::fmt::{self, Debug, Display};

/// A process-unique, monotonically increasing event identifier.
///
/// Among events with equal timestamps the smaller id executes first, so the
/// id doubles as the FIFO tie-break of the schedule order.
pub type EventId = u64;

/// The context value of events that run on behalf of no particular entity.
pub const NO_CONTEXT: u32 = u32::MAX;

///
/// The type-erased deferred call an event carries.
///
/// Arguments are captured at schedule time; at execution time the closure
/// receives only the engine, so that it can schedule follow-up events.
///
pub type Payload = Box<dyn FnOnce(&mut Runtime)>;

///
/// An opaque reference to a scheduled event.
///
/// A handle never owns the event and stays valid past its execution:
/// [`cancel`](crate::core::Runtime::cancel) and
/// [`remove`](crate::core::Runtime::remove) on a handle whose event has
/// already run, been cancelled or been removed are no-ops.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub(crate) id: EventId,
    pub(crate) time: SimTime,
}

impl EventHandle {
    /// The identifier of the referenced event.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The timestamp the referenced event was scheduled for.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.time
    }
}

///
/// The observable header of a pending event, as exposed to adapters and
/// pre-dispatch hooks.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventInfo {
    /// The deadline timestamp of the event.
    pub time: SimTime,
    /// The unique identifier of the event.
    pub id: EventId,
    /// The entity on whose behalf the event will run.
    pub context: u32,
}

///
/// A queue node carrying one scheduled event.
///
/// Identity is the id alone; ordering is the full `(time, id)` schedule key,
/// ascending. Queue implementations that need a max-heap wrap nodes in
/// [`cmp::Reverse`].
///
pub(crate) struct EventNode {
    pub(crate) time: SimTime,
    pub(crate) id: EventId,
    pub(crate) context: u32,
    pub(crate) payload: Payload,
}

impl EventNode {
    pub(crate) fn key(&self) -> (SimTime, EventId) {
        (self.time, self.id)
    }

    pub(crate) fn info(&self) -> EventInfo {
        EventInfo {
            time: self.time,
            id: self.id,
            context: self.context,
        }
    }
}

impl cmp::PartialEq for EventNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl cmp::Eq for EventNode {}

impl cmp::PartialOrd for EventNode {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl cmp::Ord for EventNode {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.key().cmp(&other.key())
    }
}

impl Debug for EventNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventNode {{ id: {} time: {} context: {} }}",
            self.id, self.time, self.context
        )
    }
}

impl Display for EventNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self, f)
    }
}
