//!
//! Temporal quantification in a simulation context.
//!
//! Simulated time is a signed count of *ticks*. How long a tick is, is
//! decided once per process by the [`resolution`]: every [`SimTime`] in the
//! process is interpreted against the same unit, and no per-value unit is
//! ever stored. The resolution defaults to [`TimeUnit::Nanosecond`] and is
//! frozen by the first conversion between ticks and units; calling
//! [`set_resolution`] afterwards is a programming error.
//!
//! # Examples
//!
//! ```rust
//! # use descore::time::*;
//! let rtt = SimTime::new(250, TimeUnit::Microsecond);
//! assert_eq!(rtt, SimTime::from_f64(0.25, TimeUnit::Millisecond));
//! assert_eq!(rtt.to_int(TimeUnit::Nanosecond), 250_000);
//!
//! let half = rtt / 2;
//! assert_eq!(half + half, rtt);
//! ```

mod unit;
pub use unit::*;

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, Ordering};

static RESOLUTION: AtomicU8 = AtomicU8::new(RES_DEFAULT);
static RESOLUTION_FROZEN: AtomicBool = AtomicBool::new(false);

const RES_DEFAULT: u8 = TimeUnit::Nanosecond as u8;

/// Last timestamp committed by a running engine, for diagnostics only.
static OBSERVED: AtomicI64 = AtomicI64::new(0);

/// Returns the process-wide time resolution.
///
/// Note that reading the resolution does *not* freeze it; only conversions
/// between ticks and units do.
#[must_use]
pub fn resolution() -> TimeUnit {
    unit_from_u8(RESOLUTION.load(Ordering::SeqCst))
}

/// Sets the process-wide time resolution.
///
/// Must be called before any tick/unit conversion has happened, that is
/// before the first unit-based constructor, extraction or rendering of a
/// [`SimTime`] anywhere in the process. The resolution may be overwritten
/// until then.
///
/// # Panics
///
/// Panics if the resolution has already been used.
pub fn set_resolution(unit: TimeUnit) {
    assert!(
        !RESOLUTION_FROZEN.load(Ordering::SeqCst),
        "cannot change the time resolution once it has been used"
    );
    RESOLUTION.store(unit as u8, Ordering::SeqCst);
}

/// Reads the resolution for a conversion, freezing it.
fn active_resolution() -> TimeUnit {
    RESOLUTION_FROZEN.store(true, Ordering::SeqCst);
    unit_from_u8(RESOLUTION.load(Ordering::SeqCst))
}

fn unit_from_u8(v: u8) -> TimeUnit {
    match v {
        0 => TimeUnit::Femtosecond,
        1 => TimeUnit::Picosecond,
        2 => TimeUnit::Nanosecond,
        3 => TimeUnit::Microsecond,
        4 => TimeUnit::Millisecond,
        5 => TimeUnit::Second,
        6 => TimeUnit::Minute,
        7 => TimeUnit::Hour,
        8 => TimeUnit::Day,
        _ => TimeUnit::Year,
    }
}

pub(crate) fn record_now(time: SimTime) {
    OBSERVED.store(time.ticks(), Ordering::Relaxed);
}

pub(crate) fn observed_now() -> SimTime {
    SimTime::from_ticks(OBSERVED.load(Ordering::Relaxed))
}

///
/// A point in simulated time, or a span between two such points.
///
/// `SimTime` is a plain value type: copy it freely, compare it, do exact
/// integer arithmetic on it. Spans may be negative; engine APIs that require
/// non-negative delays check the sign themselves.
///
#[derive(Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(i64);

impl SimTime {
    /// The time origin.
    pub const ZERO: SimTime = SimTime(0);
    /// The smallest representable instance of a [`SimTime`].
    pub const MIN: SimTime = SimTime(i64::MIN);
    /// The greatest representable instance of a [`SimTime`].
    pub const MAX: SimTime = SimTime(i64::MAX);

    ///
    /// Constructs a `SimTime` from a raw tick count.
    ///
    /// This is exact and independent of the resolution.
    ///
    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        SimTime(ticks)
    }

    /// Returns the raw tick count.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    ///
    /// Constructs a `SimTime` from an integer value in the given unit.
    ///
    /// If the unit is finer than the resolution, the value rounds to the
    /// nearest tick (possibly zero).
    ///
    /// # Panics
    ///
    /// Panics if the value does not fit the 64-bit tick range.
    ///
    #[must_use]
    pub fn new(value: i64, unit: TimeUnit) -> Self {
        let res = active_resolution().femtos();
        let unit = unit.femtos();
        let ticks = if unit >= res {
            let factor = (unit / res) as i128;
            i128::from(value).checked_mul(factor)
        } else {
            Some(div_round_nearest(i128::from(value), (res / unit) as i128))
        };
        SimTime(narrow(ticks, "SimTime::new"))
    }

    ///
    /// Constructs a `SimTime` from a real number of the given unit, rounded
    /// to the nearest tick. Values below the resolution's granularity may
    /// round to zero.
    ///
    /// # Panics
    ///
    /// Panics if the value is not finite or does not fit the 64-bit tick
    /// range.
    ///
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_f64(value: f64, unit: TimeUnit) -> Self {
        let res = active_resolution().femtos() as f64;
        let scaled = (value * (unit.femtos() as f64 / res)).round();
        assert!(
            scaled.is_finite() && scaled >= i64::MIN as f64 && scaled <= i64::MAX as f64,
            "SimTime::from_f64: value out of the 64-bit tick range"
        );
        SimTime(scaled as i64)
    }

    /// Shorthand for [`SimTime::new`] with [`TimeUnit::Second`].
    #[must_use]
    pub fn secs(value: i64) -> Self {
        Self::new(value, TimeUnit::Second)
    }

    /// Shorthand for [`SimTime::new`] with [`TimeUnit::Millisecond`].
    #[must_use]
    pub fn millis(value: i64) -> Self {
        Self::new(value, TimeUnit::Millisecond)
    }

    /// Shorthand for [`SimTime::new`] with [`TimeUnit::Microsecond`].
    #[must_use]
    pub fn micros(value: i64) -> Self {
        Self::new(value, TimeUnit::Microsecond)
    }

    /// Shorthand for [`SimTime::new`] with [`TimeUnit::Nanosecond`].
    #[must_use]
    pub fn nanos(value: i64) -> Self {
        Self::new(value, TimeUnit::Nanosecond)
    }

    ///
    /// Extracts the value as a real number of the given unit.
    ///
    /// Lossy if the unit is coarser than the resolution; the sign is always
    /// preserved.
    ///
    #[must_use]
    pub fn to_f64(self, unit: TimeUnit) -> f64 {
        let res = active_resolution().femtos() as f64;
        self.0 as f64 * (res / unit.femtos() as f64)
    }

    ///
    /// Extracts the value as an integer count of the given unit, rounded to
    /// the nearest whole unit.
    ///
    /// # Panics
    ///
    /// Panics if the converted value does not fit into 64 bit.
    ///
    #[must_use]
    pub fn to_int(self, unit: TimeUnit) -> i64 {
        let res = active_resolution().femtos();
        let unit = unit.femtos();
        let value = if res >= unit {
            i128::from(self.0).checked_mul((res / unit) as i128)
        } else {
            Some(div_round_nearest(i128::from(self.0), (unit / res) as i128))
        };
        narrow(value, "SimTime::to_int")
    }

    /// Returns `true` if this is exactly the time origin / a zero span.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for spans strictly below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Returns `true` for spans strictly above zero.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked tick addition. `None` on overflow.
    #[must_use]
    pub fn checked_add(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_add(rhs.0).map(SimTime)
    }

    /// Checked tick subtraction. `None` on overflow.
    #[must_use]
    pub fn checked_sub(self, rhs: SimTime) -> Option<SimTime> {
        self.0.checked_sub(rhs.0).map(SimTime)
    }

    ///
    /// Renders the value in a caller-chosen unit, independent of the
    /// resolution the value is stored in.
    ///
    /// ```
    /// # use descore::time::{SimTime, TimeUnit};
    /// let t = SimTime::new(1500, TimeUnit::Nanosecond);
    /// assert_eq!(t.display_in(TimeUnit::Microsecond).to_string(), "1.5us");
    /// ```
    ///
    #[must_use]
    pub fn display_in(self, unit: TimeUnit) -> DisplayIn {
        DisplayIn { time: self, unit }
    }
}

fn div_round_nearest(n: i128, d: i128) -> i128 {
    let q = n / d;
    let r = n % d;
    if 2 * r.abs() >= d {
        q + n.signum()
    } else {
        q
    }
}

fn narrow(value: Option<i128>, op: &str) -> i64 {
    match value {
        Some(v) if i64::try_from(v).is_ok() => v as i64,
        _ => panic!("{op}: conversion exceeds the 64-bit tick range"),
    }
}

// OPS

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        self.checked_add(rhs)
            .expect("overflow when adding simulation times")
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        *self = *self + rhs;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.checked_sub(rhs)
            .expect("overflow when subtracting simulation times")
    }
}

impl SubAssign for SimTime {
    fn sub_assign(&mut self, rhs: SimTime) {
        *self = *self - rhs;
    }
}

impl Neg for SimTime {
    type Output = SimTime;

    fn neg(self) -> Self::Output {
        SimTime(
            self.0
                .checked_neg()
                .expect("overflow when negating a simulation time"),
        )
    }
}

impl Mul<i64> for SimTime {
    type Output = SimTime;

    fn mul(self, rhs: i64) -> Self::Output {
        SimTime(
            self.0
                .checked_mul(rhs)
                .expect("overflow when scaling a simulation time"),
        )
    }
}

impl Div<i64> for SimTime {
    type Output = SimTime;

    fn div(self, rhs: i64) -> Self::Output {
        SimTime(
            self.0
                .checked_div(rhs)
                .expect("division of a simulation time by zero"),
        )
    }
}

// FMT

impl Debug for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.0, resolution().suffix())
    }
}

/// Helper returned by [`SimTime::display_in`].
#[derive(Debug, Clone, Copy)]
pub struct DisplayIn {
    time: SimTime,
    unit: TimeUnit,
}

impl Display for DisplayIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.time.to_f64(self.unit), self.unit.suffix())
    }
}

// SERDE

#[cfg(feature = "serde")]
impl serde::Serialize for SimTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_f64(self.to_f64(TimeUnit::Second))
        } else {
            serializer.serialize_i64(self.0)
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SimTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct SimTimeVisitor;
        impl serde::de::Visitor<'_> for SimTimeVisitor {
            type Value = SimTime;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a tick count or a floating point value in seconds")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SimTime::from_ticks(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .map(SimTime::from_ticks)
                    .map_err(|_| E::custom("tick count exceeds 64 bit"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(SimTime::from_f64(v, TimeUnit::Second))
            }
        }

        deserializer.deserialize_any(SimTimeVisitor)
    }
}
