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

//! Temporal values: zoned date-times, durations and literal resolution

mod duration;
mod iso;
mod provider;
mod resolver;
mod zone;
mod zoned;

use std::fmt;

use serde::{Serialize, Serializer};

pub use duration::{Duration, DurationFields};
pub use provider::{ChronoProvider, FixedClock, TemporalProvider};
pub use resolver::{DEFAULT_DATE_ZONE, DateRequest, DateResolver, TIME_ONLY_DATE};
pub use zone::{Zone, format_offset, parse_offset};
pub use zoned::ZonedDateTime;

use crate::core::error::Result;
use crate::core::value::FeelValue;

/// A temporal value is exactly one of these kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalValue {
    DateTime(ZonedDateTime),
    Duration(Duration),
}

impl TemporalValue {
    pub fn is_date_time(&self) -> bool {
        match self {
            Self::DateTime(_) => true,
            Self::Duration(_) => false,
        }
    }

    pub fn is_duration(&self) -> bool {
        match self {
            Self::DateTime(_) => false,
            Self::Duration(_) => true,
        }
    }

    /// Epoch milliseconds of a date-time, total milliseconds of a duration
    pub fn ms(&self) -> Option<f64> {
        match self {
            Self::DateTime(value) => Some(value.epoch_milliseconds() as f64),
            Self::Duration(value) => value.total_milliseconds(),
        }
    }
}

impl From<ZonedDateTime> for TemporalValue {
    fn from(value: ZonedDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Duration> for TemporalValue {
    fn from(value: Duration) -> Self {
        Self::Duration(value)
    }
}

impl fmt::Display for TemporalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(value) => value.fmt(f),
            Self::Duration(value) => value.fmt(f),
        }
    }
}

impl Serialize for TemporalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether `value` is a zoned date-time
pub fn is_date_time(value: &FeelValue) -> bool {
    matches!(value, FeelValue::Temporal(t) if t.is_date_time())
}

/// Whether `value` is a duration
pub fn is_duration(value: &FeelValue) -> bool {
    matches!(value, FeelValue::Temporal(t) if t.is_duration())
}

/// Project a value to milliseconds; `None` for anything non-temporal or for
/// durations with year/month components
pub fn ms(value: &FeelValue) -> Option<f64> {
    match value {
        FeelValue::Temporal(t) => t.ms(),
        _ => None,
    }
}

/// Resolve a date/time literal with the default provider.
///
/// See [`DateResolver::resolve`] for the rewrite rules and error cases.
pub fn date(date: Option<&str>, time: Option<&str>, zone: Option<&str>) -> Result<ZonedDateTime> {
    DateResolver::default().resolve(date, time, zone)
}

/// Input accepted by [`duration()`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DurationInput<'a> {
    /// ISO-8601 duration text
    Iso(&'a str),
    /// Millisecond count
    Milliseconds(f64),
}

impl<'a> From<&'a str> for DurationInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Iso(text)
    }
}

impl From<f64> for DurationInput<'_> {
    fn from(millis: f64) -> Self {
        Self::Milliseconds(millis)
    }
}

impl From<i64> for DurationInput<'_> {
    fn from(millis: i64) -> Self {
        Self::Milliseconds(millis as f64)
    }
}

impl From<i32> for DurationInput<'_> {
    fn from(millis: i32) -> Self {
        Self::Milliseconds(f64::from(millis))
    }
}

/// Build a duration from ISO text or a millisecond count
pub fn duration<'a>(input: impl Into<DurationInput<'a>>) -> Result<Duration> {
    match input.into() {
        DurationInput::Iso(text) => ChronoProvider.parse_duration(text),
        DurationInput::Milliseconds(millis) => Duration::from_milliseconds(millis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_is_exclusive() {
        let dt = FeelValue::from(date(Some("2020-01-01"), None, None).unwrap());
        let d = FeelValue::from(duration("P1D").unwrap());
        assert!(is_date_time(&dt) && !is_duration(&dt));
        assert!(is_duration(&d) && !is_date_time(&d));
        assert!(!is_date_time(&FeelValue::from("2020-01-01")));
        assert!(!is_duration(&FeelValue::Null));
    }

    #[test]
    fn test_ms_projection() {
        let epoch = FeelValue::from(date(Some("1970-01-01T00:00:00Z"), None, None).unwrap());
        assert_eq!(ms(&epoch), Some(0.0));
        assert_eq!(ms(&FeelValue::from(duration(1500).unwrap())), Some(1500.0));
        assert_eq!(ms(&FeelValue::from("not temporal")), None);
        assert_eq!(ms(&FeelValue::from(duration("P1M").unwrap())), None);
    }
}
