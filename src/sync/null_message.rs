use super::{bounded_add, Envelope, EnvelopeKind, Receiver, Transport};
use crate::core::{RunSummary, Runtime, Simulator};
use crate::error::Error;
use crate::event::{EventHandle, EventInfo, Payload};
use crate::time::SimTime;
use std::collections::BTreeMap;
use std::time::Instant;

struct OutLink {
    lookahead: SimTime,
    /// Largest bound already promised on this link; nulls below it are
    /// redundant and suppressed.
    promised: SimTime,
}

///
/// The Chandy–Misra–Bryant engine: conservative synchronization through
/// per-link null messages, without global barriers.
///
/// Every link carries a *lookahead*, the minimum delay guaranteed before
/// the sending process can affect the receiver. Whenever a process runs out
/// of safely executable events it promises, on every outgoing link, that it
/// will not send anything stamped below `min(next event, horizon) +
/// lookahead`; symmetric promises from its neighbors are exactly what lets
/// it advance. Local time may move up to the minimum bound received across
/// all incoming links.
///
/// Lookahead must be positive on every link; a zero-lookahead link cannot
/// guarantee progress and is rejected at configuration time. For cyclic
/// topologies the run additionally needs a simulation-time limit on the
/// core engine (see [`Builder::max_time`](crate::core::Builder::max_time)):
/// without one, mutually empty processes would ratchet their promises
/// forever instead of terminating.
///
pub struct NullMessageSimulator<T: Transport> {
    core: Runtime,
    transport: T,
    receiver: Option<Receiver>,

    out_links: BTreeMap<u32, OutLink>,
    /// Per incoming link: the largest safe-advance bound received.
    in_bounds: BTreeMap<u32, SimTime>,

    done: bool,
}

impl<T: Transport> NullMessageSimulator<T> {
    ///
    /// Wraps a sequential engine for null-message-synchronized execution.
    ///
    /// Links are declared with [`add_link`](NullMessageSimulator::add_link)
    /// before running.
    ///
    pub fn new(core: Runtime, transport: T) -> Self {
        Self {
            core,
            transport,
            receiver: None,
            out_links: BTreeMap::new(),
            in_bounds: BTreeMap::new(),
            done: false,
        }
    }

    ///
    /// Declares a bidirectional link between this process and `peer`, with
    /// the given lookahead on the outgoing direction.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Config`] for a non-positive lookahead, an invalid
    /// peer rank, or a duplicate link.
    ///
    pub fn add_link(&mut self, peer: u32, lookahead: SimTime) -> Result<(), Error> {
        if !lookahead.is_positive() {
            return Err(Error::config(format!(
                "link to rank {peer} has non-positive lookahead {lookahead}; \
                 null-message synchronization cannot guarantee progress"
            )));
        }
        if peer == self.transport.rank() || peer >= self.transport.size() {
            return Err(Error::config(format!("invalid link peer rank {peer}")));
        }
        if self.out_links.contains_key(&peer) {
            return Err(Error::config(format!("duplicate link to rank {peer}")));
        }

        self.out_links.insert(
            peer,
            OutLink {
                lookahead,
                promised: SimTime::MIN,
            },
        );
        self.in_bounds.insert(peer, SimTime::ZERO);
        Ok(())
    }

    ///
    /// Registers the callback that turns incoming data messages into local
    /// events. Required before any cross-process traffic arrives.
    ///
    pub fn on_receive<F>(&mut self, f: F)
    where
        F: FnMut(&mut Runtime, u32, SimTime, Vec<u8>) + 'static,
    {
        self.receiver = Some(Box::new(f));
    }

    /// The local sequential engine.
    pub fn core(&mut self) -> &mut Runtime {
        &mut self.core
    }

    /// The rank of the local process.
    pub fn rank(&self) -> u32 {
        self.transport.rank()
    }

    /// The earliest time an un-received cross-process effect could still
    /// arrive: the minimum bound across all incoming links.
    fn horizon(&self) -> SimTime {
        self.in_bounds
            .values()
            .copied()
            .min()
            .unwrap_or(SimTime::MAX)
    }

    fn apply(&mut self, src: u32, envelope: Envelope) -> Result<(), Error> {
        // Any message on a FIFO link raises its bound: nothing earlier can
        // follow it.
        if let Some(bound) = self.in_bounds.get_mut(&src) {
            *bound = (*bound).max(envelope.time);
        }

        match envelope.kind {
            EnvelopeKind::Data(bytes) => {
                if envelope.time < self.core.now() {
                    return Err(Error::Causality {
                        from: src,
                        stamped: envelope.time,
                        local: self.core.now(),
                    });
                }
                let receiver = self.receiver.as_mut().ok_or_else(|| {
                    Error::config("data message arrived but no receiver is registered")
                })?;
                receiver(&mut self.core, src, envelope.time, bytes);
            }
            EnvelopeKind::Null => {
                tracing::trace!(from = src, bound = %envelope.time, "null message");
            }
        }
        Ok(())
    }

    fn drain_incoming(&mut self) -> Result<(), Error> {
        while let Some((src, envelope)) = self.transport.try_recv()? {
            self.apply(src, envelope)?;
        }
        Ok(())
    }

    /// The earliest timestamp any future outgoing message could carry,
    /// before adding a link's lookahead: local execution cannot pass the
    /// next pending event, nor the horizon granted by the neighbors.
    fn earliest_cause(&mut self) -> SimTime {
        let next = self.core.next_event_time().unwrap_or(SimTime::MAX);
        next.min(self.horizon()).max(self.core.now())
    }

    /// Promises updated safe-advance bounds on every outgoing link.
    fn send_nulls(&mut self) -> Result<(), Error> {
        let cause = self.earliest_cause();
        for (&peer, link) in &mut self.out_links {
            let bound = bounded_add(cause, link.lookahead);
            if bound > link.promised {
                link.promised = bound;
                self.transport.send(
                    peer,
                    Envelope {
                        time: bound,
                        kind: EnvelopeKind::Null,
                    },
                )?;
            }
        }
        Ok(())
    }

    fn flush_outbox(&mut self) -> Result<(), Error> {
        for message in self.core.drain_outbox() {
            let link = self
                .out_links
                .get_mut(&message.dest)
                .unwrap_or_else(|| panic!("remote message addressed to undeclared link {}", message.dest));
            assert!(
                message.time >= bounded_add(self.core.now(), link.lookahead),
                "remote message stamped {} violates the link lookahead {} at time {}",
                message.time,
                link.lookahead,
                self.core.now()
            );
            link.promised = link.promised.max(message.time);
            self.transport.send(
                message.dest,
                Envelope {
                    time: message.time,
                    kind: EnvelopeKind::Data(message.bytes),
                },
            )?;
        }
        Ok(())
    }

    /// Checks whether the simulation can end: nothing executable locally and
    /// no possibility of relevant arrivals.
    fn check_done(&mut self) -> bool {
        let next = self.core.next_event_time();
        let local_done = match next {
            Some(t) => self.core.limit_applies(t),
            None => true,
        };
        if !local_done {
            return false;
        }

        let horizon = self.horizon();
        if horizon == SimTime::MAX {
            return true;
        }
        // With a time-bounded run, bounds past the limit settle it: nothing
        // that could still arrive would be dispatched anyway.
        if let Some(bound) = self.core.limit_time_bound() {
            if horizon > bound {
                return true;
            }
        }
        false
    }

    fn step_inner(&mut self) -> Result<bool, Error> {
        loop {
            if self.done || self.core.is_stopped() {
                return Ok(false);
            }

            self.drain_incoming()?;

            let horizon = self.horizon();
            let next = self.core.next_event_time();
            if let Some(t) = next {
                if t < horizon && !self.core.limit_applies(t) {
                    self.core.dispatch_unsynced();
                    self.flush_outbox()?;
                    return Ok(true);
                }
            }

            // Nothing executable: promise progress to the neighbors first,
            // so that mutual waiting cannot deadlock.
            self.send_nulls()?;
            if self.check_done() {
                self.done = true;
                return Ok(false);
            }

            // A count-based limit has no time bound the protocol could
            // settle against; the run pauses locally instead of waiting.
            let paused = next.is_some_and(|t| self.core.limit_applies(t))
                && self.core.limit_time_bound().is_none();
            if paused {
                return Ok(false);
            }

            let (src, envelope) = self.transport.recv()?;
            self.apply(src, envelope)?;
        }
    }

    fn run_inner(&mut self) -> Result<RunSummary, Error> {
        self.core.clear_stopped();
        let wall = Instant::now();
        let start_count = self.core.num_events_dispatched();

        tracing::debug!(
            rank = self.transport.rank(),
            links = self.out_links.len(),
            "null-message simulation starting"
        );

        while self.step_inner()? {}

        let summary = RunSummary {
            time: self.core.now(),
            event_count: self.core.num_events_dispatched() - start_count,
            wall: wall.elapsed(),
        };
        tracing::debug!(rank = self.transport.rank(), %summary, "null-message simulation ended");
        Ok(summary)
    }
}

impl<T: Transport> Simulator for NullMessageSimulator<T> {
    fn schedule(&mut self, delay: SimTime, payload: Payload) -> EventHandle {
        Simulator::schedule(&mut self.core, delay, payload)
    }

    fn schedule_now(&mut self, payload: Payload) -> EventHandle {
        Simulator::schedule_now(&mut self.core, payload)
    }

    fn schedule_with_context(
        &mut self,
        context: u32,
        delay: SimTime,
        payload: Payload,
    ) -> EventHandle {
        Simulator::schedule_with_context(&mut self.core, context, delay, payload)
    }

    fn schedule_destroy(&mut self, payload: Payload) -> EventHandle {
        Simulator::schedule_destroy(&mut self.core, payload)
    }

    fn cancel(&mut self, handle: EventHandle) {
        self.core.cancel(handle);
    }

    fn remove(&mut self, handle: EventHandle) {
        self.core.remove(handle);
    }

    fn run(&mut self) -> Result<RunSummary, Error> {
        self.run_inner()
    }

    fn step(&mut self) -> Result<bool, Error> {
        self.step_inner()
    }

    fn stop(&mut self) {
        self.core.stop();
    }

    fn destroy(&mut self) {
        self.core.destroy();
    }

    fn now(&self) -> SimTime {
        self.core.now()
    }

    fn context(&self) -> u32 {
        self.core.context()
    }

    fn next_event(&mut self) -> Option<EventInfo> {
        self.core.next_event()
    }
}
