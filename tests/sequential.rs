use descore::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

type Log<T> = Rc<RefCell<Vec<T>>>;

fn log<T>() -> Log<T> {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn empty_simulation_finishes_at_start_time() {
    let mut rt = Builder::seeded(1).build();
    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 0);
    assert_eq!(summary.time, SimTime::ZERO);
}

#[test]
fn events_execute_in_time_order_with_fifo_ties() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    // Schedule order: 100ns, 100ns, 50ns. Execution order must be the 50ns
    // event first, then the two 100ns events in schedule order.
    for (tag, delay) in [("a", 100), ("b", 100), ("c", 50)] {
        let probe = Rc::clone(&seen);
        rt.schedule(SimTime::nanos(delay), move |rt| {
            probe.borrow_mut().push((tag, rt.now()));
        });
    }

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 3);
    assert_eq!(
        *seen.borrow(),
        vec![
            ("c", SimTime::nanos(50)),
            ("a", SimTime::nanos(100)),
            ("b", SimTime::nanos(100)),
        ]
    );
}

#[test]
fn randomized_schedule_keeps_clock_monotone() {
    let mut rt = Builder::seeded(123).build();
    let seen: Log<SimTime> = log();

    let mut delays: Vec<i64> = (0..128).map(|i| (i * 37) % 100).collect();
    delays.reverse();
    for delay in delays {
        let probe = Rc::clone(&seen);
        rt.schedule(SimTime::nanos(delay), move |rt| {
            probe.borrow_mut().push(rt.now());
        });
    }

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 128);

    let seen = seen.borrow();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(summary.time, *seen.last().unwrap());
}

#[test]
fn schedule_now_runs_before_time_advances() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(5), move |rt| {
        probe.borrow_mut().push(("trigger", rt.now()));
        let inner = Rc::clone(&probe);
        rt.schedule_now(move |rt| {
            inner.borrow_mut().push(("immediate", rt.now()));
        });
    });

    // Already queued for the same timestamp: runs before the re-entrant
    // zero-delay event, by id order.
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(5), move |rt| {
        probe.borrow_mut().push(("sibling", rt.now()));
    });

    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(6), move |rt| {
        probe.borrow_mut().push(("later", rt.now()));
    });

    rt.run().unwrap();
    assert_eq!(
        *seen.borrow(),
        vec![
            ("trigger", SimTime::nanos(5)),
            ("sibling", SimTime::nanos(5)),
            ("immediate", SimTime::nanos(5)),
            ("later", SimTime::nanos(6)),
        ]
    );
}

#[test]
fn cancelled_event_never_executes_and_run_exits_immediately() {
    let mut rt = Builder::seeded(1).build();
    let seen: Log<SimTime> = log();

    let probe = Rc::clone(&seen);
    let handle = rt.schedule(SimTime::nanos(10), move |rt| {
        probe.borrow_mut().push(rt.now());
    });
    rt.cancel(handle);

    let summary = rt.run().unwrap();
    assert!(seen.borrow().is_empty());
    assert_eq!(summary.event_count, 0);
    // The clock never reached the cancelled timestamp.
    assert_eq!(summary.time, SimTime::ZERO);
}

#[test]
fn cancel_from_within_an_event() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    let probe = Rc::clone(&seen);
    let victim = rt.schedule(SimTime::nanos(20), move |_| {
        probe.borrow_mut().push("victim");
    });
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(10), move |rt| {
        probe.borrow_mut().push("assassin");
        rt.cancel(victim);
    });

    rt.run().unwrap();
    assert_eq!(*seen.borrow(), vec!["assassin"]);
}

#[test]
fn stale_handles_are_ignored() {
    let mut rt = Builder::seeded(1).build();
    let handle = rt.schedule(SimTime::nanos(1), |_| {});
    rt.run().unwrap();

    // Already executed: all of these are no-ops.
    rt.cancel(handle);
    rt.remove(handle);
    rt.cancel(handle);

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 0);
}

#[test]
fn removed_minimum_never_surfaces() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    let probe = Rc::clone(&seen);
    let first = rt.schedule(SimTime::nanos(1), move |_| {
        probe.borrow_mut().push("first");
    });
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(2), move |_| {
        probe.borrow_mut().push("second");
    });

    rt.remove(first);
    rt.run().unwrap();
    assert_eq!(*seen.borrow(), vec!["second"]);
}

#[test]
fn context_is_inherited_and_overridable() {
    let mut rt = Builder::seeded(1).build();
    let seen: Log<u32> = log();

    assert_eq!(rt.context(), NO_CONTEXT);

    let probe = Rc::clone(&seen);
    rt.schedule_with_context(7, SimTime::nanos(1), move |rt| {
        probe.borrow_mut().push(rt.context());
        let inner = Rc::clone(&probe);
        // Plain schedule inherits the executing context.
        rt.schedule(SimTime::nanos(1), move |rt| {
            inner.borrow_mut().push(rt.context());
        });
        let inner = Rc::clone(&probe);
        // A receive on another node overrides it.
        rt.schedule_with_context(9, SimTime::nanos(1), move |rt| {
            inner.borrow_mut().push(rt.context());
        });
    });

    rt.run().unwrap();
    assert_eq!(*seen.borrow(), vec![7, 7, 9]);
    assert_eq!(rt.context(), NO_CONTEXT);
}

#[test]
fn destroy_list_runs_fifo_and_honors_cancel() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    let probe = Rc::clone(&seen);
    rt.schedule_destroy(move |_| probe.borrow_mut().push("first"));
    let probe = Rc::clone(&seen);
    let middle = rt.schedule_destroy(move |_| probe.borrow_mut().push("middle"));
    let probe = Rc::clone(&seen);
    rt.schedule_destroy(move |_| probe.borrow_mut().push("last"));

    // A pending event that is never run: destroy drops it silently.
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(100), move |_| {
        probe.borrow_mut().push("pending");
    });

    rt.cancel(middle);
    rt.destroy();

    assert_eq!(*seen.borrow(), vec!["first", "last"]);
}

#[test]
fn reset_after_destroy_reuses_the_engine() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::nanos(5), |_| {});
    rt.run().unwrap();

    rt.destroy();
    rt.reset();
    rt.set_scheduler(SchedulerKind::List);

    let seen: Log<SimTime> = log();
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(3), move |rt| {
        probe.borrow_mut().push(rt.now());
    });
    rt.run().unwrap();

    // The clock kept its high-water mark across the destroy cycle.
    assert_eq!(*seen.borrow(), vec![SimTime::nanos(8)]);
}

#[test]
fn stop_ends_the_loop_and_a_later_run_continues() {
    let mut rt = Builder::seeded(1).build();
    let seen = log();

    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(1), move |rt| {
        probe.borrow_mut().push("one");
        rt.stop();
        rt.stop(); // idempotent
    });
    let probe = Rc::clone(&seen);
    rt.schedule(SimTime::nanos(2), move |_| {
        probe.borrow_mut().push("two");
    });

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 1);
    assert_eq!(summary.time, SimTime::nanos(1));
    assert_eq!(*seen.borrow(), vec!["one"]);

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 1);
    assert_eq!(*seen.borrow(), vec!["one", "two"]);
}

#[test]
fn stop_in_schedules_a_stop() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::nanos(10), |_| {});
    rt.schedule(SimTime::nanos(30), |_| {});
    rt.stop_in(SimTime::nanos(20));

    let summary = rt.run().unwrap();
    assert_eq!(summary.time, SimTime::nanos(20));
}

#[test]
fn time_limit_pauses_without_dropping_events() {
    let mut rt = Builder::seeded(1).max_time(SimTime::nanos(5)).build();
    let seen: Log<SimTime> = log();

    for delay in [1i64, 3, 7] {
        let probe = Rc::clone(&seen);
        rt.schedule(SimTime::nanos(delay), move |rt| {
            probe.borrow_mut().push(rt.now());
        });
    }

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 2);
    assert_eq!(summary.time, SimTime::nanos(3));
    assert_eq!(*seen.borrow(), vec![SimTime::nanos(1), SimTime::nanos(3)]);
}

#[test]
fn event_count_limit_bounds_the_run() {
    let mut rt = Builder::seeded(1).max_events(2).build();
    for delay in [1i64, 2, 3, 4] {
        rt.schedule(SimTime::nanos(delay), |_| {});
    }

    let summary = rt.run().unwrap();
    assert_eq!(summary.event_count, 2);
    assert_eq!(summary.time, SimTime::nanos(2));
}

#[test]
fn seeded_runs_are_reproducible() {
    let draw = || {
        let mut rt = Builder::seeded(99).build();
        let values: Log<u64> = log();
        let probe = Rc::clone(&values);
        rt.schedule(SimTime::nanos(1), move |rt| {
            for _ in 0..4 {
                let v = rt.random::<u64>();
                probe.borrow_mut().push(v);
            }
        });
        rt.run().unwrap();
        let values = values.borrow().clone();
        values
    };

    assert_eq!(draw(), draw());
}

#[test]
#[should_panic(expected = "negative delay")]
fn negative_delay_is_fatal() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::from_ticks(-1), |_| {});
}

#[test]
#[should_panic(expected = "destroyed")]
fn scheduling_on_a_destroyed_engine_is_fatal() {
    let mut rt = Builder::seeded(1).build();
    rt.destroy();
    rt.schedule(SimTime::ZERO, |_| {});
}

#[test]
#[should_panic(expected = "re-enter")]
fn reentrant_run_is_fatal() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::ZERO, |rt| {
        let _ = rt.run();
    });
    let _ = rt.run();
}

#[test]
#[should_panic(expected = "rebind")]
fn rebinding_the_scheduler_after_first_use_is_fatal() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::nanos(1), |_| {});
    rt.set_scheduler(SchedulerKind::Heap);
}

#[test]
#[should_panic(expected = "distributed engine")]
fn remote_send_without_a_sync_layer_is_fatal() {
    let mut rt = Builder::seeded(1).build();
    rt.schedule(SimTime::nanos(1), |rt| {
        let time = rt.now() + SimTime::nanos(5);
        rt.send_remote(0, time, vec![1, 2, 3]);
    });
    let _ = rt.run();
}
