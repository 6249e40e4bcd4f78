//! Resolution configuration lives in its own test binary: the resolution is
//! process-wide and frozen by first use, so this is the only place that may
//! change it.

use descore::time::{self, SimTime, TimeUnit};
use serial_test::serial;

#[test]
#[serial]
fn picosecond_resolution_end_to_end() {
    // Overwriting before first use is allowed.
    time::set_resolution(TimeUnit::Femtosecond);
    time::set_resolution(TimeUnit::Picosecond);
    assert_eq!(time::resolution(), TimeUnit::Picosecond);

    // First conversion freezes the resolution.
    let t = SimTime::new(3, TimeUnit::Nanosecond);
    assert_eq!(t.ticks(), 3_000);
    assert_eq!(t.to_int(TimeUnit::Picosecond), 3_000);
    assert_eq!(t.to_f64(TimeUnit::Nanosecond), 3.0);
    assert_eq!(t.to_string(), "3000ps");

    // Sub-resolution values round to the nearest tick.
    assert_eq!(SimTime::new(499, TimeUnit::Femtosecond), SimTime::from_ticks(0));
    assert_eq!(SimTime::new(500, TimeUnit::Femtosecond), SimTime::from_ticks(1));

    // Coarser-unit round trips lose precision, never the sign.
    let fine = SimTime::from_ticks(-1_999);
    let coarse = fine.to_int(TimeUnit::Nanosecond);
    assert_eq!(coarse, -2);
    assert!(SimTime::new(coarse, TimeUnit::Nanosecond).is_negative());

    // Once used, the resolution may not change.
    let frozen = std::panic::catch_unwind(|| time::set_resolution(TimeUnit::Second));
    assert!(frozen.is_err());
    assert_eq!(time::resolution(), TimeUnit::Picosecond);
}
