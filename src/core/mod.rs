//!
//! Central primitives for running a discrete event simulation.
//!

use crate::error::Error;
use crate::event::{EventHandle, EventId, EventInfo, Payload, NO_CONTEXT};
use crate::queue::{FutureEventSet, SchedulerKind};
use crate::sync::RemoteMessage;
use crate::time::{self, SimTime};

use rand::{distributions::Standard, prelude::Distribution, Rng, RngCore};
use std::fmt::{Debug, Display};
use std::time::{Duration, Instant};

mod builder;
pub use builder::*;

mod limit;
pub use limit::*;

///
/// The capability contract every engine satisfies: the sequential core, the
/// distributed engines and any adapter wrapped around them.
///
/// The trait is object safe; payloads arrive pre-boxed. For closure-friendly
/// variants of the scheduling calls see [`SimulatorExt`], which is
/// implemented for every `Simulator`.
///
pub trait Simulator {
    /// Schedules `payload` to run `delay` after the current time, on behalf
    /// of the currently executing context.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative or the engine has been destroyed.
    fn schedule(&mut self, delay: SimTime, payload: Payload) -> EventHandle;

    /// Schedules `payload` at the current time: it runs after the
    /// currently-executing event finishes, but strictly before simulation
    /// time advances to the next distinct timestamp.
    fn schedule_now(&mut self, payload: Payload) -> EventHandle;

    /// As [`schedule`](Simulator::schedule), but on behalf of `context`
    /// instead of the inherited one. Used whenever an event logically
    /// originates from a different entity than the one currently executing.
    fn schedule_with_context(&mut self, context: u32, delay: SimTime, payload: Payload)
        -> EventHandle;

    /// Appends `payload` to the destroy list. Destroy events take no part in
    /// time ordering; they run during [`destroy`](Simulator::destroy), in
    /// registration order.
    fn schedule_destroy(&mut self, payload: Payload) -> EventHandle;

    /// Marks the referenced event cancelled: its payload will never run.
    /// O(1). No-op on stale handles.
    fn cancel(&mut self, handle: EventHandle);

    /// Evicts the referenced event immediately, reclaiming its storage.
    /// No-op on stale handles.
    fn remove(&mut self, handle: EventHandle);

    /// Executes events in `(time, id)` order until the queue empties, a
    /// limit applies, or [`stop`](Simulator::stop) is requested.
    ///
    /// # Errors
    ///
    /// Distributed engines report synchronization and transport failures;
    /// the sequential engine never returns an error.
    fn run(&mut self) -> Result<RunSummary, Error>;

    /// Dispatches at most one event. Returns `false` once the simulation
    /// has finished.
    ///
    /// # Errors
    ///
    /// See [`run`](Simulator::run).
    fn step(&mut self) -> Result<bool, Error>;

    /// Requests the run loop to end after the currently-executing event (if
    /// any) completes. Idempotent.
    fn stop(&mut self);

    /// Drops all pending events, then runs the destroy list in registration
    /// order. Afterwards the engine may only be reconfigured and re-run from
    /// a clean state.
    fn destroy(&mut self);

    /// The current simulation time.
    fn now(&self) -> SimTime;

    /// The context of the event presently executing, or
    /// [`NO_CONTEXT`](crate::event::NO_CONTEXT) outside any event.
    fn context(&self) -> u32;

    /// The header of the next pending event, if any.
    fn next_event(&mut self) -> Option<EventInfo>;
}

///
/// Closure-accepting convenience over any [`Simulator`].
///
pub trait SimulatorExt: Simulator {
    /// [`Simulator::schedule`] without the boxing noise.
    fn schedule_fn<F>(&mut self, delay: SimTime, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        Simulator::schedule(self, delay, Box::new(f))
    }

    /// [`Simulator::schedule_now`] without the boxing noise.
    fn schedule_now_fn<F>(&mut self, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        Simulator::schedule_now(self, Box::new(f))
    }

    /// [`Simulator::schedule_with_context`] without the boxing noise.
    fn schedule_with_context_fn<F>(&mut self, context: u32, delay: SimTime, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        Simulator::schedule_with_context(self, context, delay, Box::new(f))
    }

    /// [`Simulator::schedule_destroy`] without the boxing noise.
    fn schedule_destroy_fn<F>(&mut self, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        Simulator::schedule_destroy(self, Box::new(f))
    }
}

impl<S: Simulator + ?Sized> SimulatorExt for S {}

///
/// The result of a completed (or paused) run.
///
#[derive(Debug, Clone)]
#[must_use]
pub struct RunSummary {
    /// Simulation time when the run returned.
    pub time: SimTime,
    /// Events dispatched by this `run` call.
    pub event_count: usize,
    /// Wall-clock duration of the run.
    pub wall: Duration,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "finished at {} after {} events ({:?} wall)",
            self.time, self.event_count, self.wall
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Ready,
    Running,
    Destroyed,
}

/// An entry of the teardown list. Kept outside the event queue; never
/// participates in time ordering.
struct DestroyEntry {
    id: EventId,
    cancelled: bool,
    payload: Payload,
}

///
/// The sequential engine: one event queue, one clock, one cooperative run
/// loop.
///
/// Within a process the engine is strictly single-threaded: events execute
/// to completion, one at a time, and scheduling calls made from within an
/// executing event are queued, never executed inline. Zero simulated time
/// elapses during an event.
///
/// # Examples
///
/// ```
/// use descore::prelude::*;
///
/// let mut rt = Builder::seeded(42).build();
/// rt.schedule(SimTime::millis(5), |rt| {
///     // Runs at t = 5ms; follow-up work is scheduled, not called.
///     rt.schedule(SimTime::millis(5), |_| {});
/// });
///
/// let summary = rt.run().unwrap();
/// assert_eq!(summary.event_count, 2);
/// assert_eq!(summary.time, SimTime::millis(10));
/// ```
///
pub struct Runtime {
    pub(crate) fes: FutureEventSet,
    destroy_list: Vec<DestroyEntry>,

    time: SimTime,
    context: u32,

    state: State,
    stopped: bool,
    /// False from the first schedule call until the next destroy; guards
    /// scheduler rebinding.
    reconfigurable: bool,
    dispatched: usize,
    limit: RunLimit,

    rng: Box<dyn RngCore>,

    /// Cross-process messages staged by executing events, drained by a
    /// synchronization layer after every dispatch.
    outbox: Vec<RemoteMessage>,
}

impl Runtime {
    /// An engine with default configuration; see [`Builder`] for the rest.
    #[must_use]
    pub fn new() -> Runtime {
        Builder::new().build()
    }

    ///
    /// Schedules `f` to run `delay` after the current time, inheriting the
    /// currently-executing event's context.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative or the engine has been destroyed.
    ///
    pub fn schedule<F>(&mut self, delay: SimTime, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        let context = self.context;
        self.schedule_at_with(self.event_time(delay), context, Box::new(f))
    }

    ///
    /// Schedules `f` at the current time: after the currently-executing
    /// event, before time advances to the next distinct timestamp.
    ///
    pub fn schedule_now<F>(&mut self, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        self.schedule(SimTime::ZERO, f)
    }

    ///
    /// Schedules `f` on behalf of `context`, overriding inheritance.
    ///
    /// # Panics
    ///
    /// Panics if `delay` is negative or the engine has been destroyed.
    ///
    pub fn schedule_with_context<F>(&mut self, context: u32, delay: SimTime, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        self.schedule_at_with(self.event_time(delay), context, Box::new(f))
    }

    ///
    /// Appends `f` to the destroy list. Destroy events run only during
    /// [`destroy`](Runtime::destroy), in registration order (FIFO), and can
    /// be cancelled like any other event.
    ///
    pub fn schedule_destroy<F>(&mut self, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        self.assert_not_destroyed();
        self.reconfigurable = false;
        let id = self.fes.next_id();
        self.destroy_list.push(DestroyEntry {
            id,
            cancelled: false,
            payload: Box::new(f),
        });
        EventHandle {
            id,
            time: self.time,
        }
    }

    fn event_time(&self, delay: SimTime) -> SimTime {
        self.assert_not_destroyed();
        assert!(
            !delay.is_negative(),
            "cannot schedule an event with negative delay {delay}"
        );
        self.time + delay
    }

    fn schedule_at_with(&mut self, time: SimTime, context: u32, payload: Payload) -> EventHandle {
        self.reconfigurable = false;
        self.fes.insert(time, context, payload)
    }

    /// Schedules an event into this engine at an absolute timestamp, on
    /// behalf of `context`. Used by synchronization layers delivering
    /// cross-process traffic; local code uses the delay-based calls.
    ///
    /// # Panics
    ///
    /// Panics if `time` lies before the current simulation time.
    pub fn schedule_absolute<F>(&mut self, time: SimTime, context: u32, f: F) -> EventHandle
    where
        F: FnOnce(&mut Runtime) + 'static,
    {
        self.assert_not_destroyed();
        assert!(
            time >= self.time,
            "cannot schedule an event at {time}, which lies before the current time {}",
            self.time
        );
        self.schedule_at_with(time, context, Box::new(f))
    }

    ///
    /// Marks the referenced event cancelled: its payload will never run, but
    /// its storage is only reclaimed once the slot surfaces in the queue.
    /// No-op on stale handles.
    ///
    pub fn cancel(&mut self, handle: EventHandle) {
        self.fes.cancel(handle);
        if let Some(entry) = self.destroy_list.iter_mut().find(|e| e.id == handle.id) {
            entry.cancelled = true;
        }
    }

    ///
    /// Evicts the referenced event immediately. No-op on stale handles.
    ///
    pub fn remove(&mut self, handle: EventHandle) {
        self.fes.remove(handle);
        if let Some(at) = self.destroy_list.iter().position(|e| e.id == handle.id) {
            self.destroy_list.remove(at);
        }
    }

    ///
    /// The main loop: pops events in `(time, id)` order, advances the clock,
    /// and invokes each payload exactly once, until the queue empties, a
    /// limit applies or [`stop`](Runtime::stop) is requested.
    ///
    /// A run that returns early (limit, stop) leaves the remaining events
    /// queued; calling `run` again continues the simulation.
    ///
    /// # Panics
    ///
    /// Panics when called on a destroyed engine or re-entrantly from within
    /// an executing event.
    #[allow(clippy::missing_errors_doc)]
    pub fn run(&mut self) -> Result<RunSummary, Error> {
        self.assert_not_destroyed();
        assert!(
            self.state != State::Running,
            "cannot re-enter run() from within an executing event"
        );

        self.state = State::Running;
        self.stopped = false;

        let wall = Instant::now();
        let start_count = self.dispatched;

        tracing::debug!(
            scheduler = %self.fes.descriptor(),
            limit = %self.limit,
            time = %self.time,
            "simulation starting"
        );

        while !self.stopped && self.dispatch_next() {
            assert!(
                self.outbox.is_empty(),
                "remote messages were staged without a distributed engine to deliver them"
            );
        }

        self.state = State::Ready;

        let summary = RunSummary {
            time: self.time,
            event_count: self.dispatched - start_count,
            wall: wall.elapsed(),
        };
        tracing::debug!(
            time = %summary.time,
            events = summary.event_count,
            "simulation ended"
        );
        Ok(summary)
    }

    ///
    /// Dispatches at most one event; `false` once no dispatchable event
    /// remains (empty queue, limit reached, or stop requested).
    ///
    pub fn step(&mut self) -> Result<bool, Error> {
        self.assert_not_destroyed();
        assert!(
            self.state != State::Running,
            "cannot re-enter step() from within an executing event"
        );
        if self.stopped {
            return Ok(false);
        }
        let dispatched = self.dispatch_next();
        assert!(
            self.outbox.is_empty(),
            "remote messages were staged without a distributed engine to deliver them"
        );
        Ok(dispatched)
    }

    /// Pops and executes the next live event, if one is dispatchable.
    ///
    /// This is the only place where the clock moves.
    fn dispatch_next(&mut self) -> bool {
        let Some(head) = self.fes.peek_next() else {
            return false;
        };
        if self.limit.applies(self.dispatched + 1, head.time) {
            tracing::debug!(limit = %self.limit, next = %head.time, "run limit reached");
            return false;
        }

        let node = self
            .fes
            .pop_next()
            .expect("peeked head vanished before pop");
        assert!(
            node.time >= self.time,
            "simulation time may not move backwards: {} -> {}",
            self.time,
            node.time
        );

        self.time = node.time;
        time::record_now(node.time);
        self.context = node.context;
        self.dispatched += 1;

        tracing::trace!(event = node.id, time = %node.time, context = node.context, "dispatch");

        let prev = self.state;
        self.state = State::Running;
        (node.payload)(self);
        self.state = prev;

        self.context = NO_CONTEXT;
        true
    }

    ///
    /// Requests the loop to end after the currently-executing event (if any)
    /// completes. Idempotent. The next `run` call starts afresh.
    ///
    pub fn stop(&mut self) {
        if !self.stopped {
            tracing::debug!(time = %self.time, "stop requested");
        }
        self.stopped = true;
    }

    ///
    /// Schedules a stop at `delay` after the current time.
    ///
    pub fn stop_in(&mut self, delay: SimTime) -> EventHandle {
        self.schedule(delay, Runtime::stop)
    }

    ///
    /// Drops all pending events, then runs the destroy list in registration
    /// order, skipping cancelled entries. Idempotent.
    ///
    /// Afterwards the engine only accepts reconfiguration
    /// ([`set_scheduler`](Runtime::set_scheduler)) and [`reset`](Runtime::reset);
    /// scheduling or running a destroyed engine panics.
    ///
    /// # Panics
    ///
    /// Panics when called from within an executing event.
    pub fn destroy(&mut self) {
        assert!(
            self.state != State::Running,
            "cannot destroy the engine from within an executing event"
        );
        if self.state == State::Destroyed {
            return;
        }

        tracing::debug!(pending = self.fes.len(), "destroying engine");
        self.fes.clear();
        self.state = State::Destroyed;
        self.reconfigurable = true;

        let entries = std::mem::take(&mut self.destroy_list);
        for entry in entries {
            if !entry.cancelled {
                (entry.payload)(self);
            }
        }
    }

    ///
    /// Returns a destroyed engine to a clean, runnable state. The clock
    /// keeps its high-water mark; event ids keep counting.
    ///
    /// # Panics
    ///
    /// Panics unless the engine has been destroyed.
    pub fn reset(&mut self) {
        assert!(
            self.state == State::Destroyed,
            "reset() requires a destroyed engine"
        );
        self.state = State::Ready;
        self.stopped = false;
        self.context = NO_CONTEXT;
    }

    ///
    /// Rebinds the queue structure backing this engine.
    ///
    /// An operational choice, not a semantic one, but one that is frozen by
    /// first use: it may only be made before any event has been scheduled,
    /// or after [`destroy`](Runtime::destroy).
    ///
    /// # Panics
    ///
    /// Panics if called after the first schedule call on a live engine.
    pub fn set_scheduler(&mut self, kind: SchedulerKind) {
        assert!(
            self.reconfigurable,
            "cannot rebind the scheduler after the first schedule call"
        );
        self.fes = self.fes.rebuild(kind);
    }

    /// The current simulation time. Monotone non-decreasing over the
    /// engine's lifetime.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.time
    }

    /// The context of the event presently executing, or
    /// [`NO_CONTEXT`](crate::event::NO_CONTEXT) outside any event.
    #[must_use]
    pub fn context(&self) -> u32 {
        self.context
    }

    /// The backing queue structure.
    #[must_use]
    pub fn scheduler_kind(&self) -> SchedulerKind {
        self.fes.kind()
    }

    /// The total number of events dispatched by this engine.
    #[must_use]
    pub fn num_events_dispatched(&self) -> usize {
        self.dispatched
    }

    /// `true` while live (pending, not cancelled) events are queued.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.fes.is_empty()
    }

    /// The header of the next pending event, if any.
    pub fn next_event(&mut self) -> Option<EventInfo> {
        self.fes.peek_next()
    }

    /// The timestamp of the next pending event, if any.
    pub fn next_event_time(&mut self) -> Option<SimTime> {
        self.fes.peek_next().map(|info| info.time)
    }

    ///
    /// Generates a random instance of type T from the engine's RNG.
    ///
    /// With a [`Builder::seeded`] engine this is the reproducible entropy
    /// source models are expected to use.
    ///
    #[must_use]
    pub fn random<T>(&mut self) -> T
    where
        Standard: Distribution<T>,
    {
        self.rng.gen()
    }

    ///
    /// Samples the given distribution from the engine's RNG.
    ///
    pub fn sample<T, D>(&mut self, distr: D) -> T
    where
        D: Distribution<T>,
    {
        self.rng.sample(distr)
    }

    ///
    /// Stages a message addressed to another simulation process, carrying an
    /// absolute timestamp. The surrounding synchronization layer transmits
    /// staged messages after the current event completes.
    ///
    /// # Panics
    ///
    /// Panics if `time` lies before the current simulation time. Running a
    /// purely sequential engine with staged messages panics as well; remote
    /// sends require a distributed engine.
    ///
    pub fn send_remote(&mut self, dest: u32, time: SimTime, bytes: Vec<u8>) {
        assert!(
            time >= self.time,
            "cannot address a remote event at {time}, which lies before the current time {}",
            self.time
        );
        self.outbox.push(RemoteMessage { dest, time, bytes });
    }

    /// Dispatches one event without the no-sync-layer outbox check; the
    /// caller is responsible for draining the outbox afterwards.
    pub(crate) fn dispatch_unsynced(&mut self) -> bool {
        self.dispatch_next()
    }

    pub(crate) fn drain_outbox(&mut self) -> Vec<RemoteMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub(crate) fn limit_applies(&self, time: SimTime) -> bool {
        self.limit.applies(self.dispatched + 1, time)
    }

    pub(crate) fn limit_time_bound(&self) -> Option<SimTime> {
        self.limit.time_bound()
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn clear_stopped(&mut self) {
        self.stopped = false;
    }

    fn assert_not_destroyed(&self) {
        assert!(
            self.state != State::Destroyed,
            "engine has been destroyed; reset() before reuse"
        );
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Runtime {{ time: {} context: {} dispatched: {} enqueued: {} }}",
            self.time,
            self.context,
            self.dispatched,
            self.fes.len()
        )
    }
}

impl Simulator for Runtime {
    fn schedule(&mut self, delay: SimTime, payload: Payload) -> EventHandle {
        let context = self.context;
        self.schedule_at_with(self.event_time(delay), context, payload)
    }

    fn schedule_now(&mut self, payload: Payload) -> EventHandle {
        Simulator::schedule(self, SimTime::ZERO, payload)
    }

    fn schedule_with_context(
        &mut self,
        context: u32,
        delay: SimTime,
        payload: Payload,
    ) -> EventHandle {
        self.schedule_at_with(self.event_time(delay), context, payload)
    }

    fn schedule_destroy(&mut self, payload: Payload) -> EventHandle {
        Runtime::schedule_destroy(self, payload)
    }

    fn cancel(&mut self, handle: EventHandle) {
        Runtime::cancel(self, handle);
    }

    fn remove(&mut self, handle: EventHandle) {
        Runtime::remove(self, handle);
    }

    fn run(&mut self) -> Result<RunSummary, Error> {
        Runtime::run(self)
    }

    fn step(&mut self) -> Result<bool, Error> {
        Runtime::step(self)
    }

    fn stop(&mut self) {
        Runtime::stop(self);
    }

    fn destroy(&mut self) {
        Runtime::destroy(self);
    }

    fn now(&self) -> SimTime {
        Runtime::now(self)
    }

    fn context(&self) -> u32 {
        Runtime::context(self)
    }

    fn next_event(&mut self) -> Option<EventInfo> {
        Runtime::next_event(self)
    }
}
