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

//! Time zone handling: IANA names and fixed UTC offsets

use std::fmt;

use chrono::{
    DateTime, FixedOffset, Local, MappedLocalTime, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::core::error::{FeelError, Result};

/// Zone attached to a [`super::ZonedDateTime`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// IANA time zone (including `UTC`)
    Named(Tz),
    /// Fixed offset from UTC
    Fixed(FixedOffset),
}

impl Zone {
    /// The UTC zone
    pub const UTC: Zone = Zone::Named(Tz::UTC);

    /// Parse a zone designator.
    ///
    /// Accepts IANA names (case-insensitive), `Z`, and numeric offsets in the
    /// forms `+HH:MM`, `+HHMM` and `+HH`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FeelError::parse_error("empty time zone"));
        }
        if text.eq_ignore_ascii_case("z") {
            return Ok(Self::UTC);
        }
        if text.starts_with('+') || text.starts_with('-') {
            return parse_offset(text)
                .map(Self::Fixed)
                .ok_or_else(|| FeelError::parse_error(format!("invalid UTC offset <{text}>")));
        }
        Tz::from_str_insensitive(text)
            .map(Self::Named)
            .map_err(|_| FeelError::parse_error(format!("unknown time zone <{text}>")))
    }

    /// Zone of the host system.
    ///
    /// Uses the `TZ` environment variable when it names a known zone, and the
    /// current local offset otherwise.
    pub fn system() -> Self {
        if let Some(zone) = std::env::var("TZ")
            .ok()
            .and_then(|name| Self::parse(name.trim_start_matches(':')).ok())
        {
            return zone;
        }
        Self::Fixed(Local::now().offset().fix())
    }

    /// Identifier used inside `[...]` annotations
    pub fn name(&self) -> String {
        match self {
            Self::Named(tz) => tz.name().to_string(),
            Self::Fixed(offset) => format_offset(offset.local_minus_utc()),
        }
    }

    /// Offset in effect at the given instant
    pub fn offset_at(&self, instant: &DateTime<Utc>) -> FixedOffset {
        match self {
            Self::Named(tz) => tz.offset_from_utc_datetime(&instant.naive_utc()).fix(),
            Self::Fixed(offset) => *offset,
        }
    }

    /// Map a wall-clock time in this zone to an instant.
    ///
    /// Ambiguous times (clocks turned back) take the earlier offset. Times in a
    /// gap (clocks turned forward) are interpreted with the offset in effect
    /// before the transition, which moves them forward by the gap length.
    pub fn resolve_local(&self, local: &NaiveDateTime) -> Result<DateTime<Utc>> {
        match self {
            Self::Fixed(offset) => match offset.from_local_datetime(local) {
                MappedLocalTime::Single(dt) => Ok(dt.with_timezone(&Utc)),
                _ => Err(FeelError::parse_error(format!(
                    "date-time <{local}> is out of range"
                ))),
            },
            Self::Named(tz) => match tz.from_local_datetime(local) {
                MappedLocalTime::Single(dt) => Ok(dt.with_timezone(&Utc)),
                MappedLocalTime::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
                MappedLocalTime::None => {
                    let shifted = local
                        .checked_sub_signed(TimeDelta::days(1))
                        .ok_or_else(|| {
                            FeelError::parse_error(format!("date-time <{local}> is out of range"))
                        })?;
                    let before = tz.offset_from_utc_datetime(&shifted).fix();
                    let utc = local
                        .checked_sub_signed(TimeDelta::seconds(i64::from(
                            before.local_minus_utc(),
                        )))
                        .ok_or_else(|| {
                            FeelError::parse_error(format!("date-time <{local}> is out of range"))
                        })?;
                    Ok(Utc.from_utc_datetime(&utc))
                }
            },
        }
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::UTC
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Format an offset in seconds as `+HH:MM` (or `+HH:MM:SS` for sub-minute offsets)
pub fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (hours, minutes, secs) = (abs / 3600, (abs / 60) % 60, abs % 60);
    if secs == 0 {
        format!("{sign}{hours:02}:{minutes:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{secs:02}")
    }
}

/// Parse a signed numeric offset (`+HH:MM`, `+HHMM`, `+HH`)
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    let total = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if negative { -total } else { total })
}

/// Whether `text` ends with a numeric `±HH:MM` offset
pub(crate) fn ends_with_offset(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() < 6 {
        return false;
    }
    let tail = &bytes[bytes.len() - 6..];
    matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit()
}
