//!
//! Engine adapters: cross-cutting behaviors composed in front of a core
//! engine.
//!
//! An adapter wraps a delegate satisfying the [`Simulator`] contract,
//! forwards every operation unchanged except the ones it customizes, and may
//! observe each event immediately before it executes. Adapters chain, since
//! a delegate may itself be another adapter; exactly one core engine
//! terminates every chain:
//!
//! ```
//! use descore::adapter::{HookLayer, Pacer};
//! use descore::prelude::*;
//!
//! let core = Builder::seeded(1).build();
//! let mut sim = HookLayer::new(Pacer::new(core, 0.0));
//! sim.add_hook(|info| println!("{} ->", info.time));
//! sim.schedule_fn(SimTime::nanos(10), |_| {});
//! sim.run().unwrap();
//! ```
//!

use crate::core::{RunSummary, Simulator};
use crate::error::Error;
use crate::event::{EventHandle, EventInfo, Payload};
use crate::time::{SimTime, TimeUnit};
use std::time::{Duration, Instant};

macro_rules! forward_simulator_rest {
    () => {
        fn schedule(&mut self, delay: SimTime, payload: Payload) -> EventHandle {
            self.inner.schedule(delay, payload)
        }

        fn schedule_now(&mut self, payload: Payload) -> EventHandle {
            self.inner.schedule_now(payload)
        }

        fn schedule_with_context(
            &mut self,
            context: u32,
            delay: SimTime,
            payload: Payload,
        ) -> EventHandle {
            self.inner.schedule_with_context(context, delay, payload)
        }

        fn schedule_destroy(&mut self, payload: Payload) -> EventHandle {
            self.inner.schedule_destroy(payload)
        }

        fn cancel(&mut self, handle: EventHandle) {
            self.inner.cancel(handle);
        }

        fn remove(&mut self, handle: EventHandle) {
            self.inner.remove(handle);
        }

        fn stop(&mut self) {
            self.inner.stop();
        }

        fn destroy(&mut self) {
            self.inner.destroy();
        }

        fn now(&self) -> SimTime {
            self.inner.now()
        }

        fn context(&self) -> u32 {
            self.inner.context()
        }

        fn next_event(&mut self) -> Option<EventInfo> {
            self.inner.next_event()
        }
    };
}

///
/// An adapter that invokes registered hooks immediately before each event
/// executes, e.g. to feed a live visualization.
///
pub struct HookLayer<S: Simulator> {
    inner: S,
    hooks: Vec<Box<dyn FnMut(&EventInfo)>>,
}

impl<S: Simulator> HookLayer<S> {
    /// Wraps a delegate engine with an empty hook chain.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hooks: Vec::new(),
        }
    }

    /// Appends a hook. Hooks run in registration order.
    pub fn add_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&EventInfo) + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// The wrapped delegate.
    pub fn inner(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwraps the adapter.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Simulator> Simulator for HookLayer<S> {
    fn run(&mut self) -> Result<RunSummary, Error> {
        let wall = Instant::now();
        let mut event_count = 0;
        while self.step()? {
            event_count += 1;
        }
        Ok(RunSummary {
            time: self.inner.now(),
            event_count,
            wall: wall.elapsed(),
        })
    }

    fn step(&mut self) -> Result<bool, Error> {
        if let Some(info) = self.inner.next_event() {
            for hook in &mut self.hooks {
                hook(&info);
            }
        }
        self.inner.step()
    }

    forward_simulator_rest!();
}

///
/// An adapter pacing event execution against the wall clock.
///
/// Before each event the pacer sleeps until the scaled wall-clock time has
/// caught up with the event's timestamp. Pacing is advisory and best-effort:
/// a late wall clock never delays, reorders or drops events, and a scale of
/// `0.0` disables sleeping entirely.
///
pub struct Pacer<S: Simulator> {
    inner: S,
    /// Wall seconds per simulated second. `1.0` is real time.
    scale: f64,
    origin: Option<(Instant, SimTime)>,
}

impl<S: Simulator> Pacer<S> {
    /// Wraps a delegate engine; `scale` is wall seconds per simulated
    /// second.
    pub fn new(inner: S, scale: f64) -> Self {
        assert!(
            scale.is_finite() && scale >= 0.0,
            "pacing scale must be finite and non-negative"
        );
        Self {
            inner,
            scale,
            origin: None,
        }
    }

    /// The wrapped delegate.
    pub fn inner(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwraps the adapter.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn pace_to(&mut self, time: SimTime) {
        if self.scale == 0.0 {
            return;
        }
        let (anchor, start) = *self
            .origin
            .get_or_insert_with(|| (Instant::now(), self.inner.now()));

        let ahead = (time - start).to_f64(TimeUnit::Second) * self.scale;
        if ahead <= 0.0 {
            return;
        }
        let target = anchor + Duration::from_secs_f64(ahead);
        let now = Instant::now();
        if target > now {
            std::thread::sleep(target - now);
        }
    }
}

impl<S: Simulator> Simulator for Pacer<S> {
    fn run(&mut self) -> Result<RunSummary, Error> {
        let wall = Instant::now();
        let mut event_count = 0;
        while self.step()? {
            event_count += 1;
        }
        Ok(RunSummary {
            time: self.inner.now(),
            event_count,
            wall: wall.elapsed(),
        })
    }

    fn step(&mut self) -> Result<bool, Error> {
        if let Some(info) = self.inner.next_event() {
            self.pace_to(info.time);
        }
        self.inner.step()
    }

    forward_simulator_rest!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Builder, SimulatorExt};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn hooks_observe_each_event_in_order() {
        let mut sim = HookLayer::new(Builder::seeded(7).build());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let probe = Rc::clone(&seen);
        sim.add_hook(move |info| probe.borrow_mut().push(info.time.ticks()));

        sim.schedule_fn(SimTime::from_ticks(20), |_| {});
        sim.schedule_fn(SimTime::from_ticks(10), |_| {});

        let summary = sim.run().unwrap();
        assert_eq!(summary.event_count, 2);
        assert_eq!(*seen.borrow(), vec![10, 20]);
    }

    #[test]
    fn chained_adapters_forward_the_contract() {
        let core = Builder::seeded(7).build();
        let mut sim = HookLayer::new(Pacer::new(core, 0.0));

        let handle = sim.schedule_fn(SimTime::from_ticks(5), |_| {});
        sim.schedule_fn(SimTime::from_ticks(3), |rt| {
            rt.schedule(SimTime::from_ticks(4), |_| {});
        });
        sim.cancel(handle);

        let summary = sim.run().unwrap();
        assert_eq!(summary.event_count, 2);
        assert_eq!(sim.now(), SimTime::from_ticks(7));
    }

    #[test]
    fn unscaled_pacer_does_not_sleep() {
        let mut sim = Pacer::new(Builder::seeded(7).build(), 0.0);
        sim.schedule_fn(SimTime::secs(3600), |_| {});
        let summary = sim.run().unwrap();
        assert_eq!(summary.event_count, 1);
        assert!(summary.wall < Duration::from_secs(1));
    }
}
