// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Signed durations with calendar and clock fields

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::iso;
use crate::core::error::{FeelError, Result};

const NANOS_PER_MICRO: i128 = 1_000;
const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: i128 = 1_000_000_000;
const NANOS_PER_MINUTE: i128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i128 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i128 = 24 * NANOS_PER_HOUR;

/// Raw duration fields, used to build a [`Duration`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DurationFields {
    pub years: i64,
    pub months: i64,
    pub weeks: i64,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub milliseconds: i64,
    pub microseconds: i64,
    pub nanoseconds: i64,
}

impl DurationFields {
    fn values(&self) -> [i64; 10] {
        [
            self.years,
            self.months,
            self.weeks,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.milliseconds,
            self.microseconds,
            self.nanoseconds,
        ]
    }

    fn from_values(v: [i64; 10]) -> Self {
        Self {
            years: v[0],
            months: v[1],
            weeks: v[2],
            days: v[3],
            hours: v[4],
            minutes: v[5],
            seconds: v[6],
            milliseconds: v[7],
            microseconds: v[8],
            nanoseconds: v[9],
        }
    }

    fn try_map(&self, f: impl Fn(i64) -> Option<i64>) -> Option<Self> {
        let mut out = [0i64; 10];
        for (slot, value) in out.iter_mut().zip(self.values()) {
            *slot = f(value)?;
        }
        Some(Self::from_values(out))
    }

    fn try_zip(&self, other: &Self, f: impl Fn(i64, i64) -> Option<i64>) -> Option<Self> {
        let mut out = [0i64; 10];
        for ((slot, a), b) in out.iter_mut().zip(self.values()).zip(other.values()) {
            *slot = f(a, b)?;
        }
        Some(Self::from_values(out))
    }

    /// Flip the sign of every field
    pub fn negated(&self) -> Self {
        Self::from_values(self.values().map(|v| -v))
    }
}

/// A signed duration.
///
/// Every non-zero field carries the same sign. Weeks and days are treated as
/// fixed lengths (7 and 1 days of 24 hours); years and months depend on a
/// reference date and are kept apart from the exact-time fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Duration {
    fields: DurationFields,
}

impl Duration {
    /// Build a duration, rejecting fields with mixed signs
    pub fn new(fields: DurationFields) -> Result<Self> {
        let values = fields.values();
        if values.iter().any(|v| *v > 0) && values.iter().any(|v| *v < 0) {
            return Err(FeelError::parse_error("duration fields have mixed signs"));
        }
        Ok(Self { fields })
    }

    /// The zero duration
    pub fn zero() -> Self {
        Self::default()
    }

    /// Parse an ISO-8601 duration such as `P1DT2H` or `-PT1.5S`
    pub fn parse(text: &str) -> Result<Self> {
        iso::duration_literal(text.trim())
    }

    /// Duration of `millis` milliseconds; the fraction spills into micro- and nanoseconds
    pub fn from_milliseconds(millis: f64) -> Result<Self> {
        if !millis.is_finite() {
            return Err(FeelError::parse_error(format!(
                "invalid millisecond count <{millis}>"
            )));
        }
        let whole = millis.trunc();
        if whole.abs() >= i64::MAX as f64 {
            return Err(FeelError::parse_error(format!(
                "millisecond count <{millis}> is out of range"
            )));
        }
        let fraction = ((millis - whole) * 1_000_000.0).round() as i64;
        Self::new(DurationFields {
            milliseconds: whole as i64,
            microseconds: fraction / 1_000,
            nanoseconds: fraction % 1_000,
            ..DurationFields::default()
        })
    }

    /// Exact duration of `total` nanoseconds, balanced up to hours
    pub fn from_nanoseconds(total: i128) -> Result<Self> {
        Self::balanced(total, false)
    }

    fn balanced(total: i128, with_days: bool) -> Result<Self> {
        let out_of_range = || FeelError::invalid_operation("duration is out of range");
        let mut rest = total.unsigned_abs();
        let mut take = |unit: i128| -> Result<i64> {
            let unit = unit.unsigned_abs();
            let value = rest / unit;
            rest %= unit;
            i64::try_from(value).map_err(|_| out_of_range())
        };
        let days = if with_days { take(NANOS_PER_DAY)? } else { 0 };
        let fields = DurationFields {
            days,
            hours: take(NANOS_PER_HOUR)?,
            minutes: take(NANOS_PER_MINUTE)?,
            seconds: take(NANOS_PER_SECOND)?,
            milliseconds: take(NANOS_PER_MILLI)?,
            microseconds: take(NANOS_PER_MICRO)?,
            nanoseconds: take(1)?,
            ..DurationFields::default()
        };
        Self::new(if total < 0 { fields.negated() } else { fields })
    }

    pub fn years(&self) -> i64 {
        self.fields.years
    }

    pub fn months(&self) -> i64 {
        self.fields.months
    }

    pub fn weeks(&self) -> i64 {
        self.fields.weeks
    }

    pub fn days(&self) -> i64 {
        self.fields.days
    }

    pub fn hours(&self) -> i64 {
        self.fields.hours
    }

    pub fn minutes(&self) -> i64 {
        self.fields.minutes
    }

    pub fn seconds(&self) -> i64 {
        self.fields.seconds
    }

    pub fn milliseconds(&self) -> i64 {
        self.fields.milliseconds
    }

    pub fn microseconds(&self) -> i64 {
        self.fields.microseconds
    }

    pub fn nanoseconds(&self) -> i64 {
        self.fields.nanoseconds
    }

    /// All fields at once
    pub fn fields(&self) -> DurationFields {
        self.fields
    }

    /// -1, 0 or 1
    pub fn sign(&self) -> i32 {
        self.fields
            .values()
            .iter()
            .find(|v| **v != 0)
            .map_or(0, |v| v.signum() as i32)
    }

    pub fn is_zero(&self) -> bool {
        self.sign() == 0
    }

    pub fn negated(&self) -> Self {
        Self {
            fields: self.fields.negated(),
        }
    }

    pub fn abs(&self) -> Self {
        if self.sign() < 0 { self.negated() } else { *self }
    }

    /// Whether years or months are set
    pub fn has_calendar_units(&self) -> bool {
        self.fields.years != 0 || self.fields.months != 0
    }

    fn has_day_units(&self) -> bool {
        self.fields.weeks != 0 || self.fields.days != 0
    }

    /// Years and months folded into months
    pub fn total_months(&self) -> i64 {
        self.fields.years.saturating_mul(12).saturating_add(self.fields.months)
    }

    /// Weeks and days folded into days
    pub fn total_days(&self) -> i64 {
        self.fields.weeks.saturating_mul(7).saturating_add(self.fields.days)
    }

    /// Hours through nanoseconds, in nanoseconds
    pub fn time_nanoseconds(&self) -> i128 {
        let f = &self.fields;
        i128::from(f.hours) * NANOS_PER_HOUR
            + i128::from(f.minutes) * NANOS_PER_MINUTE
            + i128::from(f.seconds) * NANOS_PER_SECOND
            + i128::from(f.milliseconds) * NANOS_PER_MILLI
            + i128::from(f.microseconds) * NANOS_PER_MICRO
            + i128::from(f.nanoseconds)
    }

    /// Total length in nanoseconds, `None` when years or months are set
    pub fn total_nanoseconds(&self) -> Option<i128> {
        if self.has_calendar_units() {
            return None;
        }
        Some(i128::from(self.total_days()) * NANOS_PER_DAY + self.time_nanoseconds())
    }

    /// Total length in (possibly fractional) milliseconds
    pub fn total_milliseconds(&self) -> Option<f64> {
        self.total_nanoseconds()
            .map(|nanos| nanos as f64 / NANOS_PER_MILLI as f64)
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        let summed = self
            .fields
            .try_zip(&other.fields, i64::checked_add)
            .ok_or_else(|| FeelError::invalid_operation("duration is out of range"))?;
        if let Ok(duration) = Self::new(summed) {
            return Ok(duration);
        }
        match (self.total_nanoseconds(), other.total_nanoseconds()) {
            (Some(a), Some(b)) => {
                Self::balanced(a + b, self.has_day_units() || other.has_day_units())
            }
            _ => Err(FeelError::invalid_operation(format!(
                "cannot balance <{self}> and <{other}> without a reference date"
            ))),
        }
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        self.checked_add(&other.negated())
    }

    /// Scale by a number. Fractional factors need an exact-time duration.
    pub fn checked_mul(&self, factor: Decimal) -> Result<Self> {
        let overflow = || FeelError::invalid_operation("duration is out of range");
        if factor.fract().is_zero() {
            let factor = factor.to_i64().ok_or_else(overflow)?;
            let fields = self
                .fields
                .try_map(|v| v.checked_mul(factor))
                .ok_or_else(overflow)?;
            return Self::new(fields);
        }
        let total = self.total_nanoseconds().ok_or_else(|| {
            FeelError::invalid_operation(format!(
                "cannot scale <{self}> by a fraction without a reference date"
            ))
        })?;
        let scaled = Decimal::try_from_i128_with_scale(total, 0)
            .ok()
            .and_then(|d| d.checked_mul(factor))
            .and_then(|d| d.round().to_i128())
            .ok_or_else(overflow)?;
        Self::balanced(scaled, self.has_day_units())
    }

    pub fn checked_div(&self, divisor: Decimal) -> Result<Self> {
        if divisor.is_zero() {
            return Err(FeelError::invalid_operation("division by zero"));
        }
        if self.total_nanoseconds().is_none() {
            let months = Decimal::from(self.total_months())
                .checked_div(divisor)
                .filter(|m| m.fract().is_zero() && self.total_days() == 0 && self.time_nanoseconds() == 0)
                .and_then(|m| m.to_i64())
                .ok_or_else(|| {
                    FeelError::invalid_operation(format!(
                        "cannot divide <{self}> without a reference date"
                    ))
                })?;
            return Self::new(DurationFields {
                years: months / 12,
                months: months % 12,
                ..DurationFields::default()
            });
        }
        let inverse = Decimal::ONE
            .checked_div(divisor)
            .ok_or_else(|| FeelError::invalid_operation("duration is out of range"))?;
        self.checked_mul(inverse)
    }

    /// Order two durations.
    ///
    /// Exact durations compare by length, pure year-month durations by month
    /// count; anything else is incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self.total_nanoseconds(), other.total_nanoseconds()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ if self.is_year_month() && other.is_year_month() => {
                Some(self.total_months().cmp(&other.total_months()))
            }
            _ => None,
        }
    }

    fn is_year_month(&self) -> bool {
        self.total_days() == 0 && self.time_nanoseconds() == 0
    }
}

impl FromStr for Duration {
    type Err = FeelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("PT0S");
        }
        let d = self.abs().fields;
        if self.sign() < 0 {
            f.write_str("-")?;
        }
        f.write_str("P")?;
        for (value, unit) in [(d.years, 'Y'), (d.months, 'M'), (d.weeks, 'W'), (d.days, 'D')] {
            if value != 0 {
                write!(f, "{value}{unit}")?;
            }
        }

        let sub_second = i128::from(d.milliseconds) * NANOS_PER_MILLI
            + i128::from(d.microseconds) * NANOS_PER_MICRO
            + i128::from(d.nanoseconds);
        let seconds = i128::from(d.seconds) + sub_second / NANOS_PER_SECOND;
        let fraction = sub_second % NANOS_PER_SECOND;

        if d.hours == 0 && d.minutes == 0 && seconds == 0 && fraction == 0 {
            return Ok(());
        }
        f.write_str("T")?;
        if d.hours != 0 {
            write!(f, "{}H", d.hours)?;
        }
        if d.minutes != 0 {
            write!(f, "{}M", d.minutes)?;
        }
        if seconds != 0 || fraction != 0 {
            write!(f, "{seconds}")?;
            if fraction != 0 {
                let digits = format!("{fraction:09}");
                write!(f, ".{}", digits.trim_end_matches('0'))?;
            }
            f.write_str("S")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(1500.0, "PT1.5S")]
    #[case(0.0, "PT0S")]
    #[case(-250.0, "-PT0.25S")]
    #[case(60_000.0, "PT60S")]
    fn test_from_milliseconds_display(#[case] millis: f64, #[case] expected: &str) {
        assert_eq!(Duration::from_milliseconds(millis).unwrap().to_string(), expected);
    }

    #[test]
    fn test_from_milliseconds_rejects_non_finite() {
        assert!(Duration::from_milliseconds(f64::NAN).is_err());
        assert!(Duration::from_milliseconds(f64::INFINITY).is_err());
    }

    #[test]
    fn test_mixed_signs_rejected() {
        let fields = DurationFields {
            days: 1,
            hours: -2,
            ..DurationFields::default()
        };
        assert!(Duration::new(fields).is_err());
    }

    #[test]
    fn test_total_milliseconds() {
        let d = Duration::parse("P1W1DT1H").unwrap();
        assert_eq!(d.total_milliseconds(), Some(8.0 * 86_400_000.0 + 3_600_000.0));
        assert_eq!(Duration::parse("P1Y").unwrap().total_milliseconds(), None);
        let d = Duration::parse("PT0.0005S").unwrap();
        assert_eq!(d.total_milliseconds(), Some(0.5));
    }

    #[test]
    fn test_add_balances_mixed_signs() {
        let a = Duration::parse("PT1H").unwrap();
        let b = Duration::parse("-PT90M").unwrap();
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "-PT30M");

        let a = Duration::parse("P1Y").unwrap();
        let b = Duration::parse("-P1D").unwrap();
        assert!(a.checked_add(&b).is_err());

        let a = Duration::parse("P1Y2M").unwrap();
        let b = Duration::parse("P1M").unwrap();
        assert_eq!(a.checked_add(&b).unwrap().to_string(), "P1Y3M");
    }

    #[test]
    fn test_mul_and_div() {
        let d = Duration::parse("PT1H").unwrap();
        assert_eq!(d.checked_mul(Decimal::new(15, 1)).unwrap().to_string(), "PT1H30M");
        assert_eq!(d.checked_mul(Decimal::from(3)).unwrap().to_string(), "PT3H");
        assert_eq!(d.checked_div(Decimal::from(4)).unwrap().to_string(), "PT15M");
        assert!(d.checked_div(Decimal::ZERO).is_err());

        let y = Duration::parse("P2Y").unwrap();
        assert_eq!(y.checked_div(Decimal::from(4)).unwrap().to_string(), "P6M");
        assert!(y.checked_mul(Decimal::new(5, 1)).is_err());
    }

    #[test]
    fn test_compare() {
        let a = Duration::parse("P1D").unwrap();
        let b = Duration::parse("PT23H").unwrap();
        assert_eq!(a.compare(&b), Some(Ordering::Greater));
        let y = Duration::parse("P1Y").unwrap();
        let m = Duration::parse("P13M").unwrap();
        assert_eq!(y.compare(&m), Some(Ordering::Less));
        assert_eq!(y.compare(&a), None);
    }
}
