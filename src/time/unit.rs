use std::fmt::{self, Display};
use std::str::FromStr;

/// A unit of simulated time.
///
/// Units are used in two places: once, process-wide, as the *resolution*
/// every [`SimTime`](crate::time::SimTime) tick is interpreted against, and
/// per call-site when constructing or extracting values. The set spans
/// femtoseconds to years; anything finer than the active resolution rounds
/// to the nearest tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeUnit {
    /// `1e-15` seconds.
    Femtosecond,
    /// `1e-12` seconds.
    Picosecond,
    /// `1e-9` seconds.
    Nanosecond,
    /// `1e-6` seconds.
    Microsecond,
    /// `1e-3` seconds.
    Millisecond,
    /// The SI second.
    Second,
    /// 60 seconds.
    Minute,
    /// 3600 seconds.
    Hour,
    /// 86400 seconds.
    Day,
    /// 365 days.
    Year,
}

impl TimeUnit {
    /// The number of femtoseconds in one instance of this unit.
    pub(crate) const fn femtos(self) -> u128 {
        const SEC: u128 = 1_000_000_000_000_000;
        match self {
            TimeUnit::Femtosecond => 1,
            TimeUnit::Picosecond => 1_000,
            TimeUnit::Nanosecond => 1_000_000,
            TimeUnit::Microsecond => 1_000_000_000,
            TimeUnit::Millisecond => 1_000_000_000_000,
            TimeUnit::Second => SEC,
            TimeUnit::Minute => 60 * SEC,
            TimeUnit::Hour => 3_600 * SEC,
            TimeUnit::Day => 86_400 * SEC,
            TimeUnit::Year => 365 * 86_400 * SEC,
        }
    }

    /// The textual suffix used when rendering values in this unit.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Femtosecond => "fs",
            TimeUnit::Picosecond => "ps",
            TimeUnit::Nanosecond => "ns",
            TimeUnit::Microsecond => "us",
            TimeUnit::Millisecond => "ms",
            TimeUnit::Second => "s",
            TimeUnit::Minute => "min",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "d",
            TimeUnit::Year => "y",
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// The error returned when parsing an unknown unit suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeUnitError(String);

impl Display for ParseTimeUnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown time unit '{}'", self.0)
    }
}

impl std::error::Error for ParseTimeUnitError {}

impl FromStr for TimeUnit {
    type Err = ParseTimeUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "fs" => TimeUnit::Femtosecond,
            "ps" => TimeUnit::Picosecond,
            "ns" => TimeUnit::Nanosecond,
            "us" => TimeUnit::Microsecond,
            "ms" => TimeUnit::Millisecond,
            "s" => TimeUnit::Second,
            "min" => TimeUnit::Minute,
            "h" => TimeUnit::Hour,
            "d" => TimeUnit::Day,
            "y" => TimeUnit::Year,
            other => return Err(ParseTimeUnitError(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_roundtrip() {
        for unit in [
            TimeUnit::Femtosecond,
            TimeUnit::Picosecond,
            TimeUnit::Nanosecond,
            TimeUnit::Microsecond,
            TimeUnit::Millisecond,
            TimeUnit::Second,
            TimeUnit::Minute,
            TimeUnit::Hour,
            TimeUnit::Day,
            TimeUnit::Year,
        ] {
            assert_eq!(unit.suffix().parse::<TimeUnit>(), Ok(unit));
        }
        assert!("lightyears".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn scale_ordering() {
        assert!(TimeUnit::Femtosecond.femtos() < TimeUnit::Picosecond.femtos());
        assert_eq!(TimeUnit::Second.femtos(), 1_000_000_000 * TimeUnit::Microsecond.femtos() / 1_000);
        assert_eq!(TimeUnit::Year.femtos(), 365 * TimeUnit::Day.femtos());
    }
}
