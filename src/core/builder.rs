use rand::{rngs::StdRng, RngCore, SeedableRng};
use std::fmt::Debug;

use super::{RunLimit, Runtime, State};
use crate::event::NO_CONTEXT;
use crate::queue::{FutureEventSet, SchedulerKind};
use crate::time::SimTime;

///
/// A builder for an engine instance.
///
/// The builder is the configuration surface of the kernel: scheduler kind,
/// RNG seed, start time and run limits are chosen here and consumed by
/// [`build`](Builder::build). After that, the only reconfiguration path is
/// [`Runtime::destroy`] followed by [`Runtime::set_scheduler`].
///
#[must_use]
pub struct Builder {
    scheduler: SchedulerKind,
    rng: Box<dyn RngCore>,
    limit: RunLimit,
    start_time: SimTime,
}

impl Builder {
    /// Creates a new builder with an entropy-seeded RNG.
    pub fn new() -> Builder {
        Builder {
            scheduler: SchedulerKind::default(),
            rng: Box::new(StdRng::from_entropy()),
            limit: RunLimit::None,
            start_time: SimTime::ZERO,
        }
    }

    /// Creates a `Builder` with a static seeded RNG, for reproducible runs.
    pub fn seeded(seed: u64) -> Builder {
        Builder {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            ..Builder::new()
        }
    }

    ///
    /// Selects the queue structure backing the engine.
    ///
    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.scheduler = kind;
        self
    }

    ///
    /// Sets the simulation time the engine starts at (default: zero).
    ///
    pub fn start_time(mut self, time: SimTime) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Bounds the run to at most `n` dispatched events.
    ///
    pub fn max_events(mut self, n: usize) -> Self {
        self.limit.add(RunLimit::EventCount(n));
        self
    }

    ///
    /// Bounds the run to events at or before the given time.
    ///
    pub fn max_time(mut self, time: SimTime) -> Self {
        self.limit.add(RunLimit::Time(time));
        self
    }

    ///
    /// Adds a custom limit, combined with any previously set limits.
    ///
    pub fn limit(mut self, limit: RunLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds the sequential engine.
    ///
    /// # Examples
    ///
    /// ```
    /// use descore::prelude::*;
    ///
    /// let mut rt = Builder::seeded(1).build();
    /// rt.schedule(SimTime::from_ticks(10), |rt| {
    ///     let _ = rt.now();
    /// });
    /// let summary = rt.run().unwrap();
    /// assert_eq!(summary.event_count, 1);
    /// ```
    #[must_use]
    pub fn build(self) -> Runtime {
        Runtime {
            fes: FutureEventSet::new(self.scheduler),
            destroy_list: Vec::new(),
            time: self.start_time,
            context: NO_CONTEXT,
            state: State::Ready,
            stopped: false,
            reconfigurable: true,
            dispatched: 0,
            limit: self.limit,
            rng: self.rng,
            outbox: Vec::new(),
        }
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("scheduler", &self.scheduler)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}
