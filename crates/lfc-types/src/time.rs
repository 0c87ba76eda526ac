//! Time values with units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::lookup::{match_ignore_case, Named};

/// A unit of time as written in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Nsec,
    Usec,
    Msec,
    Sec,
    Min,
    Hour,
    Day,
    Week,
}

struct UnitAlias(&'static str, TimeUnit);

impl Named for UnitAlias {
    fn name(&self) -> &str {
        self.0
    }
}

/// Accepted spellings, canonical spelling first for each unit.
const UNIT_ALIASES: &[UnitAlias] = &[
    UnitAlias("nsec", TimeUnit::Nsec),
    UnitAlias("nsecs", TimeUnit::Nsec),
    UnitAlias("ns", TimeUnit::Nsec),
    UnitAlias("usec", TimeUnit::Usec),
    UnitAlias("usecs", TimeUnit::Usec),
    UnitAlias("us", TimeUnit::Usec),
    UnitAlias("msec", TimeUnit::Msec),
    UnitAlias("msecs", TimeUnit::Msec),
    UnitAlias("ms", TimeUnit::Msec),
    UnitAlias("sec", TimeUnit::Sec),
    UnitAlias("secs", TimeUnit::Sec),
    UnitAlias("second", TimeUnit::Sec),
    UnitAlias("seconds", TimeUnit::Sec),
    UnitAlias("s", TimeUnit::Sec),
    UnitAlias("min", TimeUnit::Min),
    UnitAlias("mins", TimeUnit::Min),
    UnitAlias("minute", TimeUnit::Min),
    UnitAlias("minutes", TimeUnit::Min),
    UnitAlias("hour", TimeUnit::Hour),
    UnitAlias("hours", TimeUnit::Hour),
    UnitAlias("h", TimeUnit::Hour),
    UnitAlias("day", TimeUnit::Day),
    UnitAlias("days", TimeUnit::Day),
    UnitAlias("d", TimeUnit::Day),
    UnitAlias("week", TimeUnit::Week),
    UnitAlias("weeks", TimeUnit::Week),
];

impl TimeUnit {
    /// Resolve a unit spelling, ignoring case.
    pub fn for_name(name: &str) -> Option<Self> {
        match_ignore_case(name, UNIT_ALIASES).map(|a| a.1)
    }

    /// Nanoseconds in one unit.
    pub fn nanos(self) -> u64 {
        match self {
            Self::Nsec => 1,
            Self::Usec => 1_000,
            Self::Msec => 1_000_000,
            Self::Sec => 1_000_000_000,
            Self::Min => 60 * 1_000_000_000,
            Self::Hour => 3_600 * 1_000_000_000,
            Self::Day => 86_400 * 1_000_000_000,
            Self::Week => 604_800 * 1_000_000_000,
        }
    }

    /// Name of the runtime macro converting a magnitude in this unit.
    pub fn runtime_macro(self) -> &'static str {
        match self {
            Self::Nsec => "NSEC",
            Self::Usec => "USEC",
            Self::Msec => "MSEC",
            Self::Sec => "SEC",
            Self::Min => "MINUTE",
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Week => "WEEK",
        }
    }

    fn canonical(self) -> &'static str {
        match self {
            Self::Nsec => "nsec",
            Self::Usec => "usec",
            Self::Msec => "msec",
            Self::Sec => "sec",
            Self::Min => "min",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// A non-negative magnitude with a unit, e.g. `100 msec`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeValue {
    pub magnitude: u64,
    pub unit: TimeUnit,
}

impl TimeValue {
    pub const ZERO: TimeValue = TimeValue {
        magnitude: 0,
        unit: TimeUnit::Nsec,
    };

    pub fn new(magnitude: u64, unit: TimeUnit) -> Self {
        Self { magnitude, unit }
    }

    pub fn msec(magnitude: u64) -> Self {
        Self::new(magnitude, TimeUnit::Msec)
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    /// Total length in nanoseconds, saturating at `u64::MAX`.
    pub fn to_nanos(&self) -> u64 {
        self.magnitude.saturating_mul(self.unit.nanos())
    }

    pub fn to_duration(&self) -> Duration {
        Duration::from_nanos(self.to_nanos())
    }

    /// Render as an expression of the native runtime: `0`, or `MSEC(100)`.
    pub fn to_runtime_expr(&self) -> String {
        if self.is_zero() {
            "0".to_string()
        } else {
            format!("{}({})", self.unit.runtime_macro(), self.magnitude)
        }
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// Failure to read a `<magnitude> <unit>` literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("missing magnitude in time value '{0}'")]
    MissingMagnitude(String),
    #[error("invalid magnitude in time value '{0}'")]
    InvalidMagnitude(String),
    #[error("missing unit in time value '{0}'")]
    MissingUnit(String),
    #[error("unknown time unit '{0}'")]
    UnknownUnit(String),
}

impl FromStr for TimeValue {
    type Err = TimeParseError;

    /// Accepts `10 msec`, `10msec` and the unitless `0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (digits, rest) = text.split_at(split);
        if digits.is_empty() {
            return Err(TimeParseError::MissingMagnitude(s.to_string()));
        }
        let magnitude: u64 = digits
            .parse()
            .map_err(|_| TimeParseError::InvalidMagnitude(s.to_string()))?;
        let unit_text = rest.trim();
        if unit_text.is_empty() {
            return if magnitude == 0 {
                Ok(TimeValue::ZERO)
            } else {
                Err(TimeParseError::MissingUnit(s.to_string()))
            };
        }
        let unit = TimeUnit::for_name(unit_text)
            .ok_or_else(|| TimeParseError::UnknownUnit(unit_text.to_string()))?;
        Ok(TimeValue::new(magnitude, unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_space() {
        assert_eq!("10 msec".parse::<TimeValue>(), Ok(TimeValue::msec(10)));
        assert_eq!("10msec".parse::<TimeValue>(), Ok(TimeValue::msec(10)));
        assert_eq!(
            "2 Seconds".parse::<TimeValue>(),
            Ok(TimeValue::new(2, TimeUnit::Sec))
        );
    }

    #[test]
    fn unitless_only_for_zero() {
        assert_eq!("0".parse::<TimeValue>(), Ok(TimeValue::ZERO));
        assert!(matches!(
            "5".parse::<TimeValue>(),
            Err(TimeParseError::MissingUnit(_))
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "foo".parse::<TimeValue>(),
            Err(TimeParseError::MissingMagnitude(_))
        ));
        assert!(matches!(
            "3 fortnights".parse::<TimeValue>(),
            Err(TimeParseError::UnknownUnit(_))
        ));
    }

    #[test]
    fn duration_and_runtime_expr() {
        let t = TimeValue::msec(10);
        assert_eq!(t.to_duration(), Duration::from_millis(10));
        assert_eq!(t.to_runtime_expr(), "MSEC(10)");
        assert_eq!(TimeValue::ZERO.to_runtime_expr(), "0");
        assert_eq!(TimeValue::new(1, TimeUnit::Week).to_runtime_expr(), "WEEK(1)");
    }
}
