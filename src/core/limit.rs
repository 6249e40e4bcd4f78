use crate::time::SimTime;
use std::{fmt::Display, mem};

///
/// A composed bound that ends the event execution of an engine early.
///
/// A limit never drops events: the run simply returns before dispatching the
/// first event beyond the bound, and a later `run` call picks up where the
/// previous one left off.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunLimit {
    /// An unbounded run. It only finishes once all events are handled and
    /// no new events have been created.
    None,

    /// A bound on the number of dispatched events. The run terminates before
    /// the bound-plus-first event, but finishes normally if the bound-th
    /// event is the last one.
    EventCount(usize),

    /// A bound on simulation time. The run terminates once no events at or
    /// before the given time are left.
    Time(SimTime),

    /// Both limits must be reached for the run to terminate.
    And(Box<RunLimit>, Box<RunLimit>),

    /// Either limit terminates the run.
    Or(Box<RunLimit>, Box<RunLimit>),
}

impl RunLimit {
    pub(crate) fn applies(&self, dispatch_count: usize, time: SimTime) -> bool {
        match self {
            Self::None => false,

            Self::EventCount(e) => dispatch_count > *e,
            Self::Time(t) => time > *t,

            Self::And(lhs, rhs) => {
                lhs.applies(dispatch_count, time) && rhs.applies(dispatch_count, time)
            }
            Self::Or(lhs, rhs) => {
                lhs.applies(dispatch_count, time) || rhs.applies(dispatch_count, time)
            }
        }
    }

    /// The simulation-time bound implied by this limit, if any.
    ///
    /// Conservative over combinators: `Or` terminates at the earlier bound,
    /// `And` needs the later one.
    pub(crate) fn time_bound(&self) -> Option<SimTime> {
        match self {
            Self::None | Self::EventCount(_) => None,
            Self::Time(t) => Some(*t),
            Self::Or(lhs, rhs) => match (lhs.time_bound(), rhs.time_bound()) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (bound, None) | (None, bound) => bound,
            },
            Self::And(lhs, rhs) => match (lhs.time_bound(), rhs.time_bound()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            },
        }
    }

    pub(crate) fn add(&mut self, limit: RunLimit) {
        if matches!(self, Self::None) {
            *self = limit;
        } else {
            let mut other = Self::None;
            mem::swap(&mut other, self);
            *self = Self::Or(Box::new(other), Box::new(limit));
        }
    }
}

impl Display for RunLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),

            Self::EventCount(e) => write!(f, "MaxEventCount({e})"),
            Self::Time(t) => write!(f, "MaxTime({t})"),

            Self::And(lhs, rhs) => write!(f, "{lhs} and {rhs}"),
            Self::Or(lhs, rhs) => write!(f, "{lhs} or {rhs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ticks: i64) -> SimTime {
        SimTime::from_ticks(ticks)
    }

    #[test]
    fn raw_limits() {
        let limit = RunLimit::None;
        assert_eq!(limit.to_string(), "None");
        assert!(!limit.applies(123, t(100)));
        assert!(!limit.applies(0, t(0)));
        assert!(!limit.applies(usize::MAX, SimTime::MAX));

        let limit = RunLimit::EventCount(100);
        assert_eq!(limit.to_string(), "MaxEventCount(100)");
        assert!(!limit.applies(23, t(100)));
        assert!(limit.applies(101, t(0)));
        assert!(limit.applies(101, SimTime::MAX));

        let limit = RunLimit::Time(t(100));
        assert!(!limit.applies(0, t(10)));
        assert!(!limit.applies(0, t(100)));
        assert!(limit.applies(0, t(101)));
        assert!(limit.applies(0, SimTime::MAX));
    }

    #[test]
    fn combined_limits() {
        use RunLimit::{And, EventCount, Or, Time};

        let limit = And(Box::new(EventCount(100)), Box::new(Time(t(100))));
        assert!(!limit.applies(200, t(10)));
        assert!(!limit.applies(0, t(200)));
        assert!(limit.applies(101, t(101)));

        let limit = Or(Box::new(EventCount(100)), Box::new(Time(t(100))));
        assert!(!limit.applies(20, t(10)));
        assert!(limit.applies(0, t(200)));
        assert!(limit.applies(101, t(10)));

        let mut other = RunLimit::EventCount(100);
        other.add(Time(t(100)));
        assert_eq!(limit, other);
    }
}
