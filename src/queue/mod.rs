//!
//! Pluggable time-ordered event queues.
//!
//! Every queue implements the same contract (insert, peek the minimum, pop
//! the minimum, remove by key) over the total `(time, id)` schedule order;
//! which concrete structure backs it is an operational choice made once per
//! engine, not a semantic one. Event-arrival patterns vary enormously by
//! model, so no single structure dominates:
//!
//! | kind       | insert      | pop         | arbitrary remove |
//! |------------|-------------|-------------|------------------|
//! | `Map`      | logarithmic | logarithmic | logarithmic      |
//! | `List`     | linear      | constant    | linear           |
//! | `Heap`     | logarithmic | logarithmic | logarithmic      |
//! | `Priority` | logarithmic | logarithmic | unsupported      |
//! | `Calendar` | amortized constant | amortized constant | bucket scan |
//!
//! [`FutureEventSet`] wraps the active queue and owns everything the
//! variants share: id allocation, the handle index that makes `cancel` O(1)
//! everywhere, and the lazy reclamation of cancelled or removed slots.
//!

mod calendar;
mod heap;
mod list;
mod map;
mod priority;

pub(crate) use calendar::CalendarQueue;
pub(crate) use heap::HeapQueue;
pub(crate) use list::ListQueue;
pub(crate) use map::MapQueue;
pub(crate) use priority::PriorityQueue;

use crate::event::{EventHandle, EventId, EventInfo, EventNode, Payload};
use crate::time::SimTime;
use fxhash::FxHashMap;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

///
/// Selects the queue structure backing an engine.
///
/// The choice is fixed once the first event has been scheduled; see
/// [`Runtime::set_scheduler`](crate::core::Runtime::set_scheduler).
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SchedulerKind {
    /// Balanced ordered map. Predictable worst case; the default.
    Map,
    /// Sorted list. Cheap pop, expensive insert; good when few distinct
    /// future timestamps are active.
    List,
    /// Explicit binary heap with a slot index, supporting interior removal.
    Heap,
    /// Array-backed priority queue with minimal overhead. No interior
    /// removal; `remove` degrades to cancel-in-place.
    Priority,
    /// Calendar queue, bucketed by estimated inter-arrival time. Best for
    /// steady, predictable event rates.
    Calendar {
        /// Number of buckets in the ring.
        buckets: usize,
        /// Timespan covered by a single bucket.
        width: SimTime,
    },
}

impl SchedulerKind {
    /// Calendar queue with the default ring geometry.
    #[must_use]
    pub fn calendar() -> SchedulerKind {
        SchedulerKind::Calendar {
            buckets: 1024,
            width: SimTime::from_ticks(1_000_000),
        }
    }
}

impl Default for SchedulerKind {
    fn default() -> Self {
        SchedulerKind::Map
    }
}

impl Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Map => write!(f, "map"),
            SchedulerKind::List => write!(f, "list"),
            SchedulerKind::Heap => write!(f, "heap"),
            SchedulerKind::Priority => write!(f, "priority"),
            SchedulerKind::Calendar { buckets, width } => {
                write!(f, "calendar({buckets}, {width})")
            }
        }
    }
}

/// The error returned when parsing an unknown scheduler name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSchedulerError(String);

impl Display for ParseSchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown scheduler kind '{}'", self.0)
    }
}

impl std::error::Error for ParseSchedulerError {}

impl FromStr for SchedulerKind {
    type Err = ParseSchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "map" => SchedulerKind::Map,
            "list" => SchedulerKind::List,
            "heap" => SchedulerKind::Heap,
            "priority" => SchedulerKind::Priority,
            "calendar" => SchedulerKind::calendar(),
            other => return Err(ParseSchedulerError(other.to_string())),
        })
    }
}

///
/// The uniform contract of the queue variants.
///
/// Implementations only ever see complete nodes keyed by `(time, id)`;
/// id allocation and liveness tracking happen in [`FutureEventSet`].
///
pub(crate) trait EventQueue {
    fn insert(&mut self, node: EventNode);

    /// The node with the smallest `(time, id)` key, without removing it.
    ///
    /// Takes `&mut self` so ring-based implementations may normalize their
    /// cursor while searching.
    fn peek(&mut self) -> Option<&EventNode>;

    fn pop(&mut self) -> Option<EventNode>;

    /// Evicts the node with the given key, if this structure supports
    /// interior removal. Returns `None` both for unknown keys and for
    /// structures without interior removal.
    fn remove(&mut self, time: SimTime, id: EventId) -> Option<EventNode>;

    fn len(&self) -> usize;

    fn descriptor(&self) -> String;
}

fn queue_for(kind: SchedulerKind) -> Box<dyn EventQueue> {
    match kind {
        SchedulerKind::Map => Box::new(MapQueue::new()),
        SchedulerKind::List => Box::new(ListQueue::new()),
        SchedulerKind::Heap => Box::new(HeapQueue::new()),
        SchedulerKind::Priority => Box::new(PriorityQueue::new()),
        SchedulerKind::Calendar { buckets, width } => {
            Box::new(CalendarQueue::new(buckets, width))
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    time: SimTime,
    cancelled: bool,
}

///
/// The future event set of an engine: the active queue variant plus the
/// handle index shared by all variants.
///
/// Liveness rules: an id present in the index is pending (or cancelled, if
/// flagged); an id absent from the index has been executed or removed, and a
/// node for it still sitting in a queue is dead storage that is purged the
/// next time it surfaces.
///
pub(crate) struct FutureEventSet {
    queue: Box<dyn EventQueue>,
    kind: SchedulerKind,
    index: FxHashMap<EventId, IndexEntry>,
    next_id: EventId,
    live: usize,
}

impl FutureEventSet {
    pub(crate) fn new(kind: SchedulerKind) -> Self {
        Self {
            queue: queue_for(kind),
            kind,
            index: FxHashMap::default(),
            next_id: 0,
            live: 0,
        }
    }

    pub(crate) fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub(crate) fn descriptor(&self) -> String {
        format!("FutureEventSet::{}", self.queue.descriptor())
    }

    /// The number of live (pending, not cancelled) events.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Assigns the next event id without inserting anything. Destroy-list
    /// entries draw their ids from the same sequence as queued events.
    pub(crate) fn next_id(&mut self) -> EventId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// A fresh, empty set backed by `kind`, continuing this set's id
    /// sequence.
    pub(crate) fn rebuild(&self, kind: SchedulerKind) -> FutureEventSet {
        FutureEventSet {
            queue: queue_for(kind),
            kind,
            index: FxHashMap::default(),
            next_id: self.next_id,
            live: 0,
        }
    }

    pub(crate) fn insert(&mut self, time: SimTime, context: u32, payload: Payload) -> EventHandle {
        let id = self.next_id;
        self.next_id += 1;

        self.index.insert(
            id,
            IndexEntry {
                time,
                cancelled: false,
            },
        );
        self.live += 1;
        self.queue.insert(EventNode {
            time,
            id,
            context,
            payload,
        });

        EventHandle { id, time }
    }

    ///
    /// The header of the next live event, or `None` if none remain.
    ///
    /// Dead heads (cancelled or removed slots) encountered on the way are
    /// reclaimed.
    ///
    pub(crate) fn peek_next(&mut self) -> Option<EventInfo> {
        loop {
            let id = self.queue.peek()?.id;
            match self.index.get(&id) {
                Some(entry) if !entry.cancelled => return self.queue.peek().map(|n| n.info()),
                Some(_) => {
                    // Cancelled in place, reclaimed now.
                    self.index.remove(&id);
                    self.queue.pop();
                }
                None => {
                    // Removed without queue support, reclaimed now.
                    self.queue.pop();
                }
            }
        }
    }

    ///
    /// Pops the next live event, or `None` if none remain.
    ///
    pub(crate) fn pop_next(&mut self) -> Option<EventNode> {
        self.peek_next()?;
        let node = self.queue.pop()?;
        self.index.remove(&node.id);
        self.live -= 1;
        Some(node)
    }

    ///
    /// Marks the referenced event cancelled in place. O(1); the slot is
    /// reclaimed when it eventually surfaces. No-op on stale handles.
    ///
    pub(crate) fn cancel(&mut self, handle: EventHandle) {
        if let Some(entry) = self.index.get_mut(&handle.id) {
            if !entry.cancelled {
                entry.cancelled = true;
                self.live -= 1;
            }
        }
    }

    ///
    /// Evicts the referenced event immediately, reclaiming its storage where
    /// the active variant supports interior removal (and lazily otherwise).
    /// No-op on stale handles.
    ///
    pub(crate) fn remove(&mut self, handle: EventHandle) {
        if let Some(entry) = self.index.remove(&handle.id) {
            if !entry.cancelled {
                self.live -= 1;
            }
            let _ = self.queue.remove(entry.time, handle.id);
        }
    }

    /// Drops all entries, reclaiming storage.
    pub(crate) fn clear(&mut self) {
        self.queue = queue_for(self.kind);
        self.index.clear();
        self.live = 0;
    }
}

impl Debug for FutureEventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {{ live: {} stored: {} }}",
            self.descriptor(),
            self.live,
            self.queue.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NO_CONTEXT;

    fn kinds() -> Vec<SchedulerKind> {
        vec![
            SchedulerKind::Map,
            SchedulerKind::List,
            SchedulerKind::Heap,
            SchedulerKind::Priority,
            SchedulerKind::Calendar {
                buckets: 8,
                width: SimTime::from_ticks(10),
            },
        ]
    }

    fn noop() -> Payload {
        Box::new(|_| {})
    }

    #[test]
    fn pops_in_time_order() {
        for kind in kinds() {
            let mut fes = FutureEventSet::new(kind);
            for t in [30i64, 10, 20, 25, 5, 40] {
                fes.insert(SimTime::from_ticks(t), NO_CONTEXT, noop());
            }

            let mut order = Vec::new();
            while let Some(node) = fes.pop_next() {
                order.push(node.time.ticks());
            }
            assert_eq!(order, vec![5, 10, 20, 25, 30, 40], "kind {kind}");
            assert!(fes.is_empty());
        }
    }

    #[test]
    fn equal_times_pop_fifo() {
        for kind in kinds() {
            let mut fes = FutureEventSet::new(kind);
            let t = SimTime::from_ticks(17);
            let handles: Vec<_> = (0..5).map(|_| fes.insert(t, NO_CONTEXT, noop())).collect();

            for handle in &handles {
                let node = fes.pop_next().unwrap();
                assert_eq!(node.id, handle.id(), "kind {kind}");
            }
        }
    }

    #[test]
    fn cancel_is_lazy_and_stale_safe() {
        for kind in kinds() {
            let mut fes = FutureEventSet::new(kind);
            let keep = fes.insert(SimTime::from_ticks(2), NO_CONTEXT, noop());
            let drop = fes.insert(SimTime::from_ticks(1), NO_CONTEXT, noop());

            fes.cancel(drop);
            fes.cancel(drop); // second cancel is a no-op
            assert_eq!(fes.len(), 1);

            let node = fes.pop_next().unwrap();
            assert_eq!(node.id, keep.id(), "kind {kind}");
            assert!(fes.pop_next().is_none());

            fes.cancel(keep); // already executed, no-op
            assert!(fes.is_empty());
        }
    }

    #[test]
    fn remove_reclaims_immediately() {
        for kind in kinds() {
            let mut fes = FutureEventSet::new(kind);
            let early = fes.insert(SimTime::from_ticks(1), NO_CONTEXT, noop());
            let late = fes.insert(SimTime::from_ticks(9), NO_CONTEXT, noop());

            fes.remove(early);
            assert_eq!(fes.len(), 1);

            // The removed minimum never surfaces again.
            assert_eq!(fes.peek_next().unwrap().id, late.id());
            assert_eq!(fes.pop_next().unwrap().id, late.id(), "kind {kind}");

            fes.remove(late); // stale, no-op
            assert!(fes.is_empty());
        }
    }

    #[test]
    fn peek_matches_pop() {
        for kind in kinds() {
            let mut fes = FutureEventSet::new(kind);
            for t in [4i64, 2, 8] {
                fes.insert(SimTime::from_ticks(t), 7, noop());
            }
            while let Some(info) = fes.peek_next() {
                let node = fes.pop_next().unwrap();
                assert_eq!(node.id, info.id, "kind {kind}");
                assert_eq!(node.time, info.time);
                assert_eq!(node.context, 7);
            }
        }
    }

    #[test]
    fn parse_kinds() {
        assert_eq!("map".parse::<SchedulerKind>().unwrap(), SchedulerKind::Map);
        assert_eq!(
            "calendar".parse::<SchedulerKind>().unwrap(),
            SchedulerKind::calendar()
        );
        assert!("splay".parse::<SchedulerKind>().is_err());
    }
}
