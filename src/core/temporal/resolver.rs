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

//! Temporal literal resolution
//!
//! Normalizes date, time and zone inputs written in overlapping notations into
//! a single [`ZonedDateTime`]. Resolution is a sequence of rewrite rules: each
//! step either produces a value, fails, or rewrites the request into a more
//! resolved one. A request can be rewritten at most a fixed number of times.

use log::debug;

use super::duration::Duration;
use super::provider::{ChronoProvider, TemporalProvider};
use super::zone::ends_with_offset;
use super::zoned::ZonedDateTime;
use crate::core::error::{FeelError, Result};

/// Date used when only a time of day is given
pub const TIME_ONLY_DATE: &str = "1900-01-01";

/// Zone applied to plain calendar dates
pub const DEFAULT_DATE_ZONE: &str = "UTC";

const MAX_REWRITES: usize = 6;

/// Input to [`DateResolver::resolve`]; empty strings count as absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    pub zone: Option<String>,
}

impl DateRequest {
    pub fn new(date: Option<&str>, time: Option<&str>, zone: Option<&str>) -> Self {
        let present = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        Self {
            date: present(date),
            time: present(time),
            zone: present(zone),
        }
    }
}

enum Step {
    Resolved(ZonedDateTime),
    Rewrite(DateRequest),
}

/// Resolves date/time literals through a [`TemporalProvider`]
pub struct DateResolver<'p> {
    provider: &'p dyn TemporalProvider,
}

impl Default for DateResolver<'static> {
    fn default() -> Self {
        Self {
            provider: &ChronoProvider,
        }
    }
}

impl<'p> DateResolver<'p> {
    pub fn with_provider(provider: &'p dyn TemporalProvider) -> Self {
        Self { provider }
    }

    /// Resolve a literal.
    ///
    /// # Errors
    ///
    /// * [`FeelError::ConflictError`] when both a date and a time are given, or
    ///   when a `@Zone` suffix meets a separate zone argument
    /// * [`FeelError::NotImplemented`] for negative years
    /// * [`FeelError::ParseError`] when the provider rejects the normalized text
    pub fn resolve(
        &self,
        date: Option<&str>,
        time: Option<&str>,
        zone: Option<&str>,
    ) -> Result<ZonedDateTime> {
        let mut request = DateRequest::new(date, time, zone);
        for _ in 0..=MAX_REWRITES {
            match self.step(request)? {
                Step::Resolved(value) => return Ok(value),
                Step::Rewrite(next) => {
                    debug!("date literal rewritten to {next:?}");
                    request = next;
                }
            }
        }
        Err(FeelError::parse_error(
            "date literal did not normalize within the rewrite limit",
        ))
    }

    fn step(&self, request: DateRequest) -> Result<Step> {
        let DateRequest { date, time, zone } = request;

        if let Some(time) = time {
            if date.is_some() {
                return Err(FeelError::conflict("<date> and <time> provided"));
            }
            return Ok(Step::Rewrite(DateRequest {
                date: Some(format!("{TIME_ONLY_DATE}T{time}")),
                time: None,
                zone,
            }));
        }

        let Some(date) = date else {
            return Ok(Step::Resolved(self.provider.now()));
        };

        if date.starts_with('-') {
            return Err(FeelError::not_implemented("negative date"));
        }

        let (head, zone_suffix) = match date.split_once('@') {
            Some((head, suffix)) => (head, Some(suffix)),
            None => (date.as_str(), None),
        };

        if !head.contains(['T', 't']) {
            let date = match zone_suffix {
                Some(suffix) => format!("{head}T00:00:00@{suffix}"),
                None => format!("{head}T00:00:00"),
            };
            let zone = match zone_suffix {
                Some(_) => zone,
                None => zone.or_else(|| Some(DEFAULT_DATE_ZONE.to_string())),
            };
            return Ok(Step::Rewrite(DateRequest {
                date: Some(date),
                time: None,
                zone,
            }));
        }

        if let Some(suffix) = zone_suffix {
            if zone.is_some() {
                return Err(FeelError::conflict("<zone> already provided"));
            }
            return Ok(Step::Rewrite(DateRequest {
                date: Some(head.to_string()),
                time: None,
                zone: Some(suffix.to_string()),
            }));
        }

        let literal = date.to_uppercase();

        if let Some(zone) = zone {
            let local = strip_zone_marker(&literal);
            return self
                .provider
                .parse_zoned_date_time(&format!("{local}[{zone}]"))
                .map(Step::Resolved);
        }

        match self.provider.parse_zoned_date_time(&literal) {
            Ok(value) => Ok(Step::Resolved(value)),
            Err(err) if literal.ends_with(']') => Err(err),
            Err(_) => {
                let instant = if literal.ends_with('Z') || ends_with_offset(&literal) {
                    self.provider.parse_instant(&literal)?
                } else {
                    self.provider.parse_instant(&format!("{literal}Z"))?
                };
                self.provider
                    .project_instant(instant, DEFAULT_DATE_ZONE)
                    .map(Step::Resolved)
            }
        }
    }

    /// Build a duration from an ISO-8601 string
    pub fn duration_from_str(&self, text: &str) -> Result<Duration> {
        self.provider.parse_duration(text)
    }
}

/// Remove a trailing `[Zone]`, `Z` or `±HH:MM` from an upper-cased literal
fn strip_zone_marker(literal: &str) -> &str {
    let mut rest = literal;
    if rest.ends_with(']') {
        if let Some(open) = rest.rfind('[') {
            rest = &rest[..open];
        }
    }
    if let Some(stripped) = rest.strip_suffix('Z') {
        return stripped;
    }
    if ends_with_offset(rest) {
        return &rest[..rest.len() - 6];
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::provider::FixedClock;
    use pretty_assertions::assert_eq;

    fn resolve(date: Option<&str>, time: Option<&str>, zone: Option<&str>) -> Result<String> {
        DateResolver::default()
            .resolve(date, time, zone)
            .map(|v| v.to_string())
    }

    #[test]
    fn test_strip_zone_marker() {
        assert_eq!(strip_zone_marker("2020-01-01T10:00Z"), "2020-01-01T10:00");
        assert_eq!(strip_zone_marker("2020-01-01T10:00+01:00"), "2020-01-01T10:00");
        assert_eq!(
            strip_zone_marker("2020-01-01T10:00+01:00[EUROPE/BERLIN]"),
            "2020-01-01T10:00"
        );
        assert_eq!(strip_zone_marker("2020-01-01T10:00"), "2020-01-01T10:00");
    }

    #[test]
    fn test_date_only_defaults_to_utc_midnight() {
        assert_eq!(
            resolve(Some("2020-02-29"), None, None).unwrap(),
            "2020-02-29T00:00:00+00:00[UTC]"
        );
    }

    #[test]
    fn test_date_only_with_zone_suffix() {
        assert_eq!(
            resolve(Some("2020-06-01@Europe/Paris"), None, None).unwrap(),
            "2020-06-01T00:00:00+02:00[Europe/Paris]"
        );
    }

    #[test]
    fn test_time_only_uses_reference_date() {
        assert_eq!(
            resolve(None, Some("10:30:00"), None).unwrap(),
            "1900-01-01T10:30:00+00:00[UTC]"
        );
        assert_eq!(
            resolve(None, Some("10:30:00"), Some("+02:00")).unwrap(),
            "1900-01-01T10:30:00+02:00[+02:00]"
        );
    }

    #[test]
    fn test_conflicts() {
        assert!(matches!(
            resolve(Some("2020-01-01"), Some("10:00"), None),
            Err(FeelError::ConflictError { .. })
        ));
        assert!(matches!(
            resolve(Some("2020-01-01T10:00@Europe/Berlin"), None, Some("UTC")),
            Err(FeelError::ConflictError { .. })
        ));
    }

    #[test]
    fn test_negative_year_not_implemented() {
        assert!(matches!(
            resolve(Some("-0001-01-01"), None, None),
            Err(FeelError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_empty_inputs_mean_now() {
        let now = ChronoProvider
            .parse_zoned_date_time("2024-05-05T05:05:05[Asia/Tokyo]")
            .unwrap();
        let clock = FixedClock::new(now);
        let resolver = DateResolver::with_provider(&clock);
        assert_eq!(resolver.resolve(None, None, None).unwrap(), now);
        assert_eq!(resolver.resolve(Some(""), Some(""), Some("")).unwrap(), now);
    }

    #[test]
    fn test_lowercase_literal_is_normalized() {
        assert_eq!(
            resolve(Some("2020-01-01t10:00:00z"), None, None).unwrap(),
            "2020-01-01T10:00:00+00:00[UTC]"
        );
    }

    #[test]
    fn test_bracket_literal_with_mismatched_offset_fails() {
        assert!(matches!(
            resolve(Some("2020-06-01T10:00:00+01:00[Europe/Berlin]"), None, None),
            Err(FeelError::ParseError { .. })
        ));
    }

    #[test]
    fn test_empty_zone_suffix_is_rejected() {
        assert!(resolve(Some("2020-06-01T10:00@"), None, None).is_err());
    }
}
