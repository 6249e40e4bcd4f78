#![allow(clippy::needless_doctest_main)]
//!
//! A discrete event simulation kernel.
//!
//! descore is the scheduling core of a network simulator: it represents
//! simulated time, executes time-stamped callbacks ("events") in strict
//! `(time, id)` order, and, in its parallel form, keeps multiple
//! cooperating simulation processes causally synchronized. Everything above
//! the kernel (nodes, channels, protocols) interacts with it solely through
//! scheduling calls.
//!
//! # Building a simple event simulation
//!
//! An engine is configured through a [`Builder`](crate::core::Builder) and
//! driven by scheduling closures. A closure receives the engine, so that it
//! can schedule follow-up events; no simulated time passes while it runs.
//!
//! ```
//! use descore::prelude::*;
//!
//! fn ping(rt: &mut Runtime) {
//!     if rt.now() < SimTime::millis(10) {
//!         rt.schedule(SimTime::millis(1), pong);
//!     }
//! }
//!
//! fn pong(rt: &mut Runtime) {
//!     if rt.now() < SimTime::millis(10) {
//!         rt.schedule(SimTime::millis(1), ping);
//!     }
//! }
//!
//! fn main() {
//!     let mut rt = Builder::seeded(123).build();
//!     rt.schedule(SimTime::ZERO, ping);
//!
//!     let summary = rt.run().unwrap();
//!     assert_eq!(summary.time, SimTime::millis(10));
//! }
//! ```
//!
//! Time is a signed 64-bit tick count against a process-wide resolution,
//! configured once via [`time::set_resolution`] and frozen by first use.
//! The queue structure backing an engine is equally an up-front choice; see
//! [`SchedulerKind`](crate::queue::SchedulerKind) for the available
//! structures and their tradeoffs.
//!
//! # Composing adapters
//!
//! Cross-cutting behaviors such as wall-clock pacing and per-event probes
//! live in [`adapter`] as decorators over the
//! [`Simulator`](crate::core::Simulator) contract, so they can be chained in
//! front of any engine without touching the run loop.
//!
//! # Parallel simulation
//!
//! The [`sync`] module synchronizes one engine per process over an abstract
//! message [`Transport`](crate::sync::Transport), either with barrier
//! rounds ([`WindowSimulator`](crate::sync::WindowSimulator)) or with
//! Chandy–Misra–Bryant null messages
//! ([`NullMessageSimulator`](crate::sync::NullMessageSimulator)). Both are
//! conservative: no process ever executes an event that a still-in-flight
//! message could precede.
//!

pub mod prelude;

pub mod adapter;
pub mod core;
pub mod error;
pub mod event;
pub mod queue;
pub mod sync;
pub mod time;
pub mod tracing;
