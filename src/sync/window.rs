use super::{bounded_add, Envelope, EnvelopeKind, Receiver, SyncSummary, Transport};
use crate::core::{RunSummary, Runtime, Simulator};
use crate::error::Error;
use crate::event::{EventHandle, EventInfo, Payload};
use crate::time::SimTime;
use std::time::Instant;

///
/// The granted-time-window engine: barrier-synchronized conservative
/// parallel simulation.
///
/// Each round, every process advertises the timestamp of its next pending
/// event; the global minimum plus the process lookahead becomes the horizon,
/// and every process executes exactly the local events strictly below it.
/// The rounds continue until every process advertises "no more events" and
/// all counted messages have been drained.
///
/// The lookahead is the minimum delay guaranteed before any locally
/// generated event can affect another process. It must be positive: with a
/// zero lookahead the process owning the global minimum could never execute
/// it, and the protocol could not guarantee progress.
///
pub struct WindowSimulator<T: Transport> {
    core: Runtime,
    transport: T,
    lookahead: SimTime,
    receiver: Option<Receiver>,

    /// Horizon granted by the last completed round.
    granted: SimTime,
    done: bool,

    sent: u64,
    received: u64,
}

impl<T: Transport> WindowSimulator<T> {
    ///
    /// Wraps a sequential engine for window-synchronized execution.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Config`] if `lookahead` is not positive.
    ///
    pub fn new(core: Runtime, transport: T, lookahead: SimTime) -> Result<Self, Error> {
        if !lookahead.is_positive() {
            return Err(Error::config(format!(
                "window synchronization requires a positive lookahead, got {lookahead}"
            )));
        }
        Ok(Self {
            core,
            transport,
            lookahead,
            receiver: None,
            granted: SimTime::MIN,
            done: false,
            sent: 0,
            received: 0,
        })
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

    fn drain_incoming(&mut self) -> Result<(), Error> {
        while let Some((src, envelope)) = self.transport.try_recv()? {
            match envelope.kind {
                EnvelopeKind::Data(bytes) => {
                    if envelope.time < self.core.now() {
                        return Err(Error::Causality {
                            from: src,
                            stamped: envelope.time,
                            local: self.core.now(),
                        });
                    }
                    self.received += 1;
                    let receiver = self.receiver.as_mut().ok_or_else(|| {
                        Error::config("data message arrived but no receiver is registered")
                    })?;
                    receiver(&mut self.core, src, envelope.time, bytes);
                }
                // The window protocol synchronizes via the exchange
                // primitive; stray null messages carry no information here.
                EnvelopeKind::Null => {}
            }
        }
        Ok(())
    }

    fn flush_outbox(&mut self) -> Result<(), Error> {
        for message in self.core.drain_outbox() {
            assert!(
                message.dest != self.transport.rank() && message.dest < self.transport.size(),
                "remote message addressed to invalid rank {}",
                message.dest
            );
            assert!(
                message.time >= bounded_add(self.core.now(), self.lookahead),
                "remote message stamped {} violates the lookahead {} at time {}",
                message.time,
                self.lookahead,
                self.core.now()
            );
            self.sent += 1;
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

    /// One barrier round: deliver in-flight traffic, agree on the next
    /// horizon, detect global quiescence.
    fn sync_round(&mut self) -> Result<(), Error> {
        self.transport.barrier()?;
        self.drain_incoming()?;

        let local = SyncSummary {
            next_event: self.core.next_event_time().unwrap_or(SimTime::MAX),
            sent: self.sent,
            received: self.received,
        };
        let all = self.transport.exchange(local)?;

        let global_min = all
            .iter()
            .map(|s| s.next_event)
            .min()
            .unwrap_or(SimTime::MAX);
        let in_flight = all.iter().map(|s| s.sent).sum::<u64>()
            != all.iter().map(|s| s.received).sum::<u64>();

        if in_flight {
            // Messages are still travelling; the next round will see them.
            return Ok(());
        }
        if global_min == SimTime::MAX {
            self.done = true;
            return Ok(());
        }

        self.granted = bounded_add(global_min, self.lookahead);
        tracing::trace!(granted = %self.granted, "window advanced");
        Ok(())
    }

    fn step_inner(&mut self) -> Result<bool, Error> {
        loop {
            if self.done || self.core.is_stopped() {
                return Ok(false);
            }

            if let Some(next) = self.core.next_event_time() {
                if next < self.granted {
                    if self.core.limit_applies(next) {
                        return Ok(false);
                    }
                    self.core.dispatch_unsynced();
                    self.flush_outbox()?;
                    return Ok(true);
                }
            }

            self.sync_round()?;
        }
    }

    fn run_inner(&mut self) -> Result<RunSummary, Error> {
        self.core.clear_stopped();
        let wall = Instant::now();
        let start_count = self.core.num_events_dispatched();

        tracing::debug!(
            rank = self.transport.rank(),
            size = self.transport.size(),
            lookahead = %self.lookahead,
            "window simulation starting"
        );

        while self.step_inner()? {}

        let summary = RunSummary {
            time: self.core.now(),
            event_count: self.core.num_events_dispatched() - start_count,
            wall: wall.elapsed(),
        };
        tracing::debug!(rank = self.transport.rank(), %summary, "window simulation ended");
        Ok(summary)
    }
}

impl<T: Transport> Simulator for WindowSimulator<T> {
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
