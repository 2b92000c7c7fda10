//! Expiration Policy Module
//!
//! Resolves duration specifications to seconds and computes absolute expiry
//! timestamps. Expiry is only ever checked lazily at read time; no background
//! sweep exists anywhere in the crate.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, StoreError};

// == Duration Spec ==
/// A duration given either as pre-resolved seconds or as a human-readable
/// string such as `"1 year"`, `"24h"`, or `"1h 30m"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationSpec {
    /// Pre-resolved duration in seconds
    Seconds(u64),
    /// Duration string, parsed against a [`UnitTable`]
    Text(String),
}

impl DurationSpec {
    /// Resolves this spec to a number of seconds.
    pub fn resolve(&self, units: &UnitTable) -> Result<u64> {
        match self {
            DurationSpec::Seconds(secs) => Ok(*secs),
            DurationSpec::Text(text) => parse_duration(text, units),
        }
    }
}

impl From<u64> for DurationSpec {
    fn from(secs: u64) -> Self {
        DurationSpec::Seconds(secs)
    }
}

impl From<&str> for DurationSpec {
    fn from(text: &str) -> Self {
        DurationSpec::Text(text.to_string())
    }
}

impl From<String> for DurationSpec {
    fn from(text: String) -> Self {
        DurationSpec::Text(text)
    }
}

// == Unit Table ==
/// Composition ratios used to resolve calendar-flavored units to seconds.
///
/// The defaults approximate the Gregorian calendar the way duration strings
/// conventionally do: 24-hour days, 7-day weeks, 4-week months, 12-month
/// years.
#[derive(Debug, Clone)]
pub struct UnitTable {
    pub hours_per_day: u64,
    pub days_per_week: u64,
    pub weeks_per_month: u64,
    pub months_per_year: u64,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self {
            hours_per_day: 24,
            days_per_week: 7,
            weeks_per_month: 4,
            months_per_year: 12,
        }
    }
}

impl UnitTable {
    /// Resolves a lowercase unit token to seconds, or None for unknown units.
    ///
    /// Note `m` is minutes; months are `mth`/`month`.
    fn unit_seconds(&self, unit: &str) -> Option<u64> {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 3600;
        let day = self.hours_per_day * HOUR;
        let week = self.days_per_week * day;
        let month = self.weeks_per_month * week;
        let year = self.months_per_year * month;

        match unit {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(1),
            "m" | "min" | "mins" | "minute" | "minutes" => Some(MINUTE),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(HOUR),
            "d" | "day" | "days" => Some(day),
            "w" | "week" | "weeks" => Some(week),
            "mth" | "mths" | "month" | "months" => Some(month),
            "y" | "yr" | "yrs" | "year" | "years" => Some(year),
            _ => None,
        }
    }
}

// == Duration Parsing ==
/// Parses a duration string into seconds.
///
/// The grammar is one or more `<integer> <unit>` groups; whitespace and
/// commas between groups are ignored, and the resolved seconds of all groups
/// are summed (`"1h 30m"` is 5400). A trailing bare integer with no unit
/// counts as seconds.
///
/// # Errors
/// Returns [`StoreError::UnsupportedUnit`] for unit tokens outside the unit
/// table, for input with no magnitude/unit groups at all, and for magnitudes
/// whose resolved seconds overflow `u64`.
pub fn parse_duration(text: &str, units: &UnitTable) -> Result<u64> {
    let mut chars = text.chars().peekable();
    let mut total: u64 = 0;
    let mut seen_group = false;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
            continue;
        }

        // Each group starts with an integer magnitude
        if !c.is_ascii_digit() {
            return Err(StoreError::UnsupportedUnit(text.to_string()));
        }
        let mut magnitude: u64 = 0;
        while let Some(digit) = chars.peek().and_then(|d| d.to_digit(10)) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(digit as u64))
                .ok_or_else(|| StoreError::UnsupportedUnit(text.to_string()))?;
            chars.next();
        }

        // Optional whitespace between magnitude and unit
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut unit = String::new();
        while matches!(chars.peek(), Some(c) if c.is_alphabetic()) {
            unit.push(chars.next().expect("peeked alphabetic char"));
        }

        let group = if unit.is_empty() {
            magnitude
        } else {
            let seconds = units
                .unit_seconds(&unit.to_ascii_lowercase())
                .ok_or_else(|| StoreError::UnsupportedUnit(unit.clone()))?;
            magnitude
                .checked_mul(seconds)
                .ok_or_else(|| StoreError::UnsupportedUnit(text.to_string()))?
        };
        total = total
            .checked_add(group)
            .ok_or_else(|| StoreError::UnsupportedUnit(text.to_string()))?;
        seen_group = true;
    }

    if !seen_group {
        return Err(StoreError::UnsupportedUnit(text.to_string()));
    }
    Ok(total)
}

// == Expiry Math ==
/// Computes an absolute expiry timestamp in Unix milliseconds, saturating
/// at the far end of the epoch rather than wrapping.
pub fn compute_expiry(now_ms: u64, duration_secs: u64) -> u64 {
    now_ms.saturating_add(duration_secs.saturating_mul(1000))
}

/// Checks whether an absolute expiry timestamp has passed.
///
/// Strictly greater-than: an entry read at exactly its expiry instant is
/// still considered live.
pub fn is_expired(expires_at: u64, now_ms: u64) -> bool {
    now_ms > expires_at
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
