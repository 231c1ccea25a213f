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

//! ISO-8601 literal grammar for date-times and durations
//!
//! Built with nom combinators. The date-time grammar covers
//! `YYYY-MM-DDTHH:MM[:SS[.fffffffff]][Z|±HH:MM][[Zone]]`, the duration grammar
//! covers `[±]P[nY][nM][nW][nD][T[nH][nM][nS]]` with an optional fraction on
//! the smallest time unit.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, Utc};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while_m_n, take_while1},
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{delimited, preceded},
};

use super::duration::{Duration, DurationFields};
use super::zone::parse_offset;
use crate::core::error::{FeelError, Result};

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Explicit offset written in a literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OffsetMark {
    /// `Z`
    Utc,
    /// `±HH:MM`
    Fixed(FixedOffset),
}

impl OffsetMark {
    pub(crate) fn fixed(&self) -> FixedOffset {
        match self {
            Self::Utc => Utc.fix(),
            Self::Fixed(offset) => *offset,
        }
    }
}

/// Decomposed date-time literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DateTimeLiteral<'a> {
    pub local: NaiveDateTime,
    pub offset: Option<OffsetMark>,
    pub zone: Option<&'a str>,
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn fixed_digits(input: &str, count: usize) -> IResult<&str, u32> {
    map_res(take_while_m_n(count, count, is_digit), |s: &str| s.parse::<u32>()).parse(input)
}

fn two_digits(input: &str) -> IResult<&str, u32> {
    fixed_digits(input, 2)
}

fn year(input: &str) -> IResult<&str, i32> {
    map_res(take_while_m_n(4, 4, is_digit), |s: &str| s.parse::<i32>()).parse(input)
}

fn calendar_date(input: &str) -> IResult<&str, NaiveDate> {
    map_res(
        (year, char('-'), two_digits, char('-'), two_digits),
        |(y, _, m, _, d)| NaiveDate::from_ymd_opt(y, m, d).ok_or("date out of range"),
    )
    .parse(input)
}

fn fraction_nanos(digits: &str) -> u32 {
    let padded = format!("{digits:0<9}");
    padded[..9].parse().unwrap_or(0)
}

fn wall_time(input: &str) -> IResult<&str, NaiveTime> {
    map_res(
        (
            two_digits,
            char(':'),
            two_digits,
            opt(preceded(
                char(':'),
                (
                    two_digits,
                    opt(preceded(one_of(".,"), take_while_m_n(1, 9, is_digit))),
                ),
            )),
        ),
        |(h, _, m, seconds)| {
            let (s, nanos) = match seconds {
                Some((s, fraction)) => (s, fraction.map(fraction_nanos).unwrap_or(0)),
                None => (0, 0),
            };
            NaiveTime::from_hms_nano_opt(h, m, s, nanos).ok_or("time out of range")
        },
    )
    .parse(input)
}

fn offset_mark(input: &str) -> IResult<&str, OffsetMark> {
    alt((
        map(one_of("Zz"), |_| OffsetMark::Utc),
        map_res(
            recognize((one_of("+-"), two_digits, opt(char(':')), two_digits)),
            |s: &str| parse_offset(s).map(OffsetMark::Fixed).ok_or("offset out of range"),
        ),
    ))
    .parse(input)
}

fn zone_annotation(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_while1(|c: char| c != ']'), char(']')).parse(input)
}

/// Parse a full date-time literal, all parts optional after the wall time
pub(crate) fn date_time_literal(text: &str) -> Result<DateTimeLiteral<'_>> {
    let parsed = all_consuming((
        calendar_date,
        one_of("Tt"),
        wall_time,
        opt(offset_mark),
        opt(zone_annotation),
    ))
    .parse(text);

    match parsed {
        Ok((_, (date, _, time, offset, zone))) => Ok(DateTimeLiteral {
            local: date.and_time(time),
            offset,
            zone,
        }),
        Err(_) => Err(FeelError::parse_error(format!("invalid date-time <{text}>"))),
    }
}

/// Instant of a wall-clock time read at a fixed offset
pub(crate) fn to_utc(local: &NaiveDateTime, offset: FixedOffset) -> Result<DateTime<Utc>> {
    local
        .checked_sub_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))
        .map(|utc| utc.and_utc())
        .ok_or_else(|| FeelError::parse_error(format!("date-time <{local}> is out of range")))
}

#[derive(Debug, Clone, Copy)]
struct Component<'a> {
    whole: &'a str,
    fraction: Option<&'a str>,
}

fn component<'a>(
    designator: char,
) -> impl Parser<&'a str, Output = Component<'a>, Error = nom::error::Error<&'a str>> {
    map(
        (
            digit1,
            opt(preceded(one_of(".,"), take_while_m_n(1, 9, is_digit))),
            satisfy(move |c: char| c.eq_ignore_ascii_case(&designator)),
        ),
        |(whole, fraction, _)| Component { whole, fraction },
    )
}

type DateComponents<'a> = (
    Option<Component<'a>>,
    Option<Component<'a>>,
    Option<Component<'a>>,
    Option<Component<'a>>,
);

type TimeComponents<'a> = (
    Option<Component<'a>>,
    Option<Component<'a>>,
    Option<Component<'a>>,
);

fn duration_components(
    input: &str,
) -> IResult<&str, (Option<char>, DateComponents<'_>, Option<TimeComponents<'_>>)> {
    map(
        (
            opt(one_of("+-")),
            satisfy(|c: char| c.eq_ignore_ascii_case(&'P')),
            (
                opt(component('Y')),
                opt(component('M')),
                opt(component('W')),
                opt(component('D')),
            ),
            opt(preceded(
                satisfy(|c: char| c.eq_ignore_ascii_case(&'T')),
                (
                    opt(component('H')),
                    opt(component('M')),
                    opt(component('S')),
                ),
            )),
        ),
        |(sign, _, date, time)| (sign, date, time),
    )
    .parse(input)
}

/// Parse an ISO-8601 duration string
pub(crate) fn duration_literal(text: &str) -> Result<Duration> {
    let invalid = |reason: &str| FeelError::parse_error(format!("invalid duration <{text}>: {reason}"));

    let (sign, (years, months, weeks, days), time) = match all_consuming(duration_components)
        .parse(text)
    {
        Ok((_, parts)) => parts,
        Err(_) => return Err(invalid("malformed")),
    };

    let (hours, minutes, seconds) = time.unwrap_or((None, None, None));
    if time.is_some() && hours.is_none() && minutes.is_none() && seconds.is_none() {
        return Err(invalid("time designator without units"));
    }
    if [years, months, weeks, days, hours, minutes, seconds]
        .iter()
        .all(Option::is_none)
    {
        return Err(invalid("no units"));
    }
    if [years, months, weeks, days]
        .iter()
        .flatten()
        .any(|c| c.fraction.is_some())
    {
        return Err(invalid("fractional calendar unit"));
    }
    let hour_fraction = hours.and_then(|c| c.fraction);
    let minute_fraction = minutes.and_then(|c| c.fraction);
    if (hour_fraction.is_some() && (minutes.is_some() || seconds.is_some()))
        || (minute_fraction.is_some() && seconds.is_some())
    {
        return Err(invalid("fraction on a unit that is not the smallest"));
    }

    let whole = |c: Option<Component<'_>>| -> Result<i64> {
        match c {
            Some(c) => c.whole.parse::<i64>().map_err(|_| invalid("value out of range")),
            None => Ok(0),
        }
    };

    let mut fields = DurationFields {
        years: whole(years)?,
        months: whole(months)?,
        weeks: whole(weeks)?,
        days: whole(days)?,
        hours: whole(hours)?,
        minutes: whole(minutes)?,
        seconds: whole(seconds)?,
        ..DurationFields::default()
    };

    // Spill a fractional unit into the smaller ones.
    let spill = match (hour_fraction, minute_fraction, seconds.and_then(|c| c.fraction)) {
        (Some(f), _, _) => i64::from(fraction_nanos(f)) * 3600,
        (_, Some(f), _) => i64::from(fraction_nanos(f)) * 60,
        (_, _, Some(f)) => i64::from(fraction_nanos(f)),
        _ => 0,
    };
    if spill != 0 {
        fields.minutes += spill / (60 * NANOS_PER_SECOND);
        let rest = spill % (60 * NANOS_PER_SECOND);
        fields.seconds += rest / NANOS_PER_SECOND;
        let nanos = rest % NANOS_PER_SECOND;
        fields.milliseconds = nanos / 1_000_000;
        fields.microseconds = (nanos / 1_000) % 1_000;
        fields.nanoseconds = nanos % 1_000;
    }

    if sign == Some('-') {
        fields = fields.negated();
    }
    Duration::new(fields)
}
