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

//! Temporal value provider
//!
//! The resolver only talks to the calendar engine through
//! [`TemporalProvider`]. [`ChronoProvider`] is the default implementation on
//! top of `chrono` and `chrono-tz`; [`FixedClock`] pins "now" for tests and
//! reproducible runs.

use chrono::{DateTime, Utc};

use super::duration::Duration;
use super::iso::{self, OffsetMark};
use super::zone::Zone;
use super::zoned::ZonedDateTime;
use crate::core::error::{FeelError, Result};

/// Calendar engine operations needed by the literal resolver
pub trait TemporalProvider: Send + Sync {
    /// Parse a date-time carrying a `[Zone]` annotation.
    ///
    /// An explicit numeric offset must agree with the zone at that wall-clock
    /// time; `Z` only fixes the instant.
    fn parse_zoned_date_time(&self, text: &str) -> Result<ZonedDateTime>;

    /// Parse a date-time carrying `Z` or a numeric offset into an instant
    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>>;

    /// View an instant from the named zone
    fn project_instant(&self, instant: DateTime<Utc>, zone: &str) -> Result<ZonedDateTime>;

    /// Current date-time in the provider's default zone
    fn now(&self) -> ZonedDateTime;

    /// Parse an ISO-8601 duration
    fn parse_duration(&self, text: &str) -> Result<Duration>;
}

/// Provider backed by `chrono` and the IANA database in `chrono-tz`
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoProvider;

impl TemporalProvider for ChronoProvider {
    fn parse_zoned_date_time(&self, text: &str) -> Result<ZonedDateTime> {
        let literal = iso::date_time_literal(text)?;
        let zone_name = literal.zone.ok_or_else(|| {
            FeelError::parse_error(format!("<{text}> has no time zone annotation"))
        })?;
        let zone = Zone::parse(zone_name)?;

        match literal.offset {
            None => ZonedDateTime::from_local(literal.local, zone),
            Some(OffsetMark::Utc) => Ok(ZonedDateTime::new(literal.local.and_utc(), zone)),
            Some(mark @ OffsetMark::Fixed(_)) => {
                let offset = mark.fixed();
                let instant = iso::to_utc(&literal.local, offset)?;
                if zone.offset_at(&instant) != offset {
                    return Err(FeelError::parse_error(format!(
                        "offset in <{text}> does not match time zone {zone}"
                    )));
                }
                Ok(ZonedDateTime::new(instant, zone))
            }
        }
    }

    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>> {
        let literal = iso::date_time_literal(text)?;
        let offset = literal
            .offset
            .ok_or_else(|| FeelError::parse_error(format!("<{text}> has no UTC offset")))?
            .fixed();
        iso::to_utc(&literal.local, offset)
    }

    fn project_instant(&self, instant: DateTime<Utc>, zone: &str) -> Result<ZonedDateTime> {
        Ok(ZonedDateTime::new(instant, Zone::parse(zone)?))
    }

    fn now(&self) -> ZonedDateTime {
        ZonedDateTime::new(Utc::now(), Zone::system())
    }

    fn parse_duration(&self, text: &str) -> Result<Duration> {
        Duration::parse(text)
    }
}

/// Provider whose clock is frozen at a given date-time
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: ZonedDateTime,
}

impl FixedClock {
    pub fn new(now: ZonedDateTime) -> Self {
        Self { now }
    }
}

impl TemporalProvider for FixedClock {
    fn parse_zoned_date_time(&self, text: &str) -> Result<ZonedDateTime> {
        ChronoProvider.parse_zoned_date_time(text)
    }

    fn parse_instant(&self, text: &str) -> Result<DateTime<Utc>> {
        ChronoProvider.parse_instant(text)
    }

    fn project_instant(&self, instant: DateTime<Utc>, zone: &str) -> Result<ZonedDateTime> {
        ChronoProvider.project_instant(instant, zone)
    }

    fn now(&self) -> ZonedDateTime {
        self.now
    }

    fn parse_duration(&self, text: &str) -> Result<Duration> {
        ChronoProvider.parse_duration(text)
    }
}
