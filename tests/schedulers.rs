//! The scheduler contract, exercised once per queue variant: the backing
//! structure is an operational choice and must never change semantics.

use descore::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn kinds() -> Vec<SchedulerKind> {
    vec![
        SchedulerKind::Map,
        SchedulerKind::List,
        SchedulerKind::Heap,
        SchedulerKind::Priority,
        SchedulerKind::Calendar {
            buckets: 16,
            width: SimTime::nanos(8),
        },
    ]
}

#[test]
fn all_variants_order_identically() {
    let mut reference: Option<Vec<(SimTime, u32)>> = None;

    for kind in kinds() {
        let mut rt = Builder::seeded(1).scheduler(kind).build();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for i in 0..64u32 {
            let delay = SimTime::nanos(i64::from((i * 13) % 32));
            let probe = Rc::clone(&seen);
            rt.schedule_with_context(i, delay, move |rt| {
                probe.borrow_mut().push((rt.now(), rt.context()));
            });
        }

        let summary = rt.run().unwrap();
        assert_eq!(summary.event_count, 64, "kind {kind}");

        let seen = seen.borrow().clone();
        match &reference {
            None => reference = Some(seen),
            Some(expected) => assert_eq!(&seen, expected, "kind {kind}"),
        }
    }
}

#[test]
fn all_variants_handle_cancel_and_remove() {
    for kind in kinds() {
        let mut rt = Builder::seeded(1).scheduler(kind).build();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let probe = Rc::clone(&seen);
        let cancelled = rt.schedule(SimTime::nanos(1), move |_| {
            probe.borrow_mut().push("cancelled");
        });
        let probe = Rc::clone(&seen);
        let removed = rt.schedule(SimTime::nanos(2), move |_| {
            probe.borrow_mut().push("removed");
        });
        let probe = Rc::clone(&seen);
        rt.schedule(SimTime::nanos(3), move |_| {
            probe.borrow_mut().push("kept");
        });

        rt.cancel(cancelled);
        rt.remove(removed);

        let summary = rt.run().unwrap();
        assert_eq!(summary.event_count, 1, "kind {kind}");
        assert_eq!(*seen.borrow(), vec!["kept"], "kind {kind}");

        // Stale handles stay harmless on every variant.
        rt.cancel(cancelled);
        rt.remove(removed);
    }
}

#[test]
fn all_variants_support_reentrant_scheduling() {
    for kind in kinds() {
        let mut rt = Builder::seeded(1).scheduler(kind).build();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let probe = Rc::clone(&seen);
        rt.schedule(SimTime::nanos(4), move |rt| {
            probe.borrow_mut().push(rt.now());
            let inner = Rc::clone(&probe);
            rt.schedule(SimTime::nanos(4), move |rt| {
                inner.borrow_mut().push(rt.now());
            });
        });

        rt.run().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![SimTime::nanos(4), SimTime::nanos(8)],
            "kind {kind}"
        );
    }
}
