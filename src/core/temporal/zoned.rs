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

//! Zone-aware date-time values

use std::cmp::Ordering;
use std::fmt;

use chrono::{
    DateTime, Datelike, Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta,
    Timelike, Utc,
};
use serde::{Serialize, Serializer};

use super::duration::Duration;
use super::zone::{Zone, format_offset};
use crate::core::error::{FeelError, Result};

/// An absolute instant paired with the zone used to read its wall-clock fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZonedDateTime {
    instant: DateTime<Utc>,
    zone: Zone,
}

impl ZonedDateTime {
    /// Pair an instant with a zone
    pub fn new(instant: DateTime<Utc>, zone: Zone) -> Self {
        Self { instant, zone }
    }

    /// Interpret a wall-clock time in `zone`
    pub fn from_local(local: NaiveDateTime, zone: Zone) -> Result<Self> {
        let instant = zone.resolve_local(&local)?;
        Ok(Self { instant, zone })
    }

    /// Midnight of `date` in `zone`
    pub fn start_of_day(date: NaiveDate, zone: Zone) -> Result<Self> {
        Self::from_local(date.and_time(NaiveTime::default()), zone)
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Offset in effect at this instant
    pub fn offset(&self) -> FixedOffset {
        self.zone.offset_at(&self.instant)
    }

    /// Wall-clock date and time in the attached zone
    pub fn local(&self) -> NaiveDateTime {
        self.instant.with_timezone(&self.offset()).naive_local()
    }

    /// Same instant viewed from another zone
    pub fn with_zone(&self, zone: Zone) -> Self {
        Self {
            instant: self.instant,
            zone,
        }
    }

    pub fn epoch_milliseconds(&self) -> i64 {
        self.instant.timestamp_millis()
    }

    pub fn year(&self) -> i32 {
        self.local().year()
    }

    pub fn month(&self) -> u32 {
        self.local().month()
    }

    pub fn day(&self) -> u32 {
        self.local().day()
    }

    /// ISO weekday, Monday = 1
    pub fn weekday(&self) -> u32 {
        self.local().weekday().number_from_monday()
    }

    pub fn hour(&self) -> u32 {
        self.local().hour()
    }

    pub fn minute(&self) -> u32 {
        self.local().minute()
    }

    pub fn second(&self) -> u32 {
        self.local().second()
    }

    pub fn nanosecond(&self) -> u32 {
        self.local().nanosecond()
    }

    /// Order by instant, ignoring the zone
    pub fn cmp_instant(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }

    /// Add a duration.
    ///
    /// Years, months, weeks and days move the wall-clock date (clamping the day
    /// to the end of a shorter month), then the clock fields are added as exact
    /// elapsed time.
    pub fn checked_add(&self, duration: &Duration) -> Result<Self> {
        let out_of_range =
            || FeelError::invalid_operation(format!("<{self}> + <{duration}> is out of range"));

        let months = duration.total_months();
        let days = duration.total_days();
        let base = if months == 0 && days == 0 {
            self.instant
        } else {
            let local = self.local();
            let months_delta =
                Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?);
            let date = if months >= 0 {
                local.date().checked_add_months(months_delta)
            } else {
                local.date().checked_sub_months(months_delta)
            }
            .ok_or_else(out_of_range)?;
            let days_delta = Days::new(days.unsigned_abs());
            let date = if days >= 0 {
                date.checked_add_days(days_delta)
            } else {
                date.checked_sub_days(days_delta)
            }
            .ok_or_else(out_of_range)?;
            self.zone.resolve_local(&date.and_time(local.time()))?
        };

        let nanos = i64::try_from(duration.time_nanoseconds()).map_err(|_| out_of_range())?;
        let instant = base
            .checked_add_signed(TimeDelta::nanoseconds(nanos))
            .ok_or_else(out_of_range)?;
        Ok(Self::new(instant, self.zone))
    }

    pub fn checked_sub(&self, duration: &Duration) -> Result<Self> {
        self.checked_add(&duration.negated())
    }

    /// Exact time elapsed from `earlier` to `self`, balanced up to hours
    pub fn since(&self, earlier: &Self) -> Result<Duration> {
        let delta = self.instant.signed_duration_since(earlier.instant);
        let nanos = i128::from(delta.num_seconds()) * 1_000_000_000
            + i128::from(delta.subsec_nanos());
        Duration::from_nanoseconds(nanos)
    }
}

impl fmt::Display for ZonedDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offset = self.offset();
        write!(
            f,
            "{}{}[{}]",
            self.local().format("%Y-%m-%dT%H:%M:%S%.f"),
            format_offset(offset.local_minus_utc()),
            self.zone.name()
        )
    }
}

impl Serialize for ZonedDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
