//!
//! Convenience re-export of common members.
//!

//
// # Generic core exports
//

pub use crate::core::Builder;
pub use crate::core::RunLimit;
pub use crate::core::RunSummary;
pub use crate::core::Runtime;
pub use crate::core::Simulator;
pub use crate::core::SimulatorExt;

pub use crate::time::SimTime;
pub use crate::time::TimeUnit;

pub use crate::event::EventHandle;
pub use crate::event::EventId;
pub use crate::event::EventInfo;
pub use crate::event::NO_CONTEXT;

pub use crate::queue::SchedulerKind;

pub use crate::error::Error;

//
// # Parallel simulation exports
//

pub use crate::sync::NullMessageSimulator;
pub use crate::sync::Transport;
pub use crate::sync::WindowSimulator;
