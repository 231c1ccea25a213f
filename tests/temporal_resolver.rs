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

//! Temporal literal resolution through the public API

use octofhir_feel::{FeelError, FeelValue, date, duration, is_date_time, is_duration, ms};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("2020-06-01T10:00:00Z")]
#[case("2020-06-01T10:00:00+05:30")]
#[case("2020-06-01T10:00:00@Europe/Paris")]
#[case("2020-06-01T10:00:00[America/New_York]")]
#[case("2021-03-28@Europe/Berlin")]
fn test_display_round_trips_to_same_instant(#[case] literal: &str) {
    let first = date(Some(literal), None, None).unwrap();
    let second = date(Some(&first.to_string()), None, None).unwrap();
    assert_eq!(first.epoch_milliseconds(), second.epoch_milliseconds());
    assert_eq!(first.zone(), second.zone());
}

#[test]
fn test_date_only_literal_is_utc_midnight() {
    let value = date(Some("2023-11-05"), None, None).unwrap();
    assert_eq!(value.to_string(), "2023-11-05T00:00:00+00:00[UTC]");
    assert_eq!(value.hour(), 0);
    assert_eq!(value.minute(), 0);
}

#[rstest]
#[case("2020-06-01T10:00:00", "Europe/Paris")]
#[case("2020-12-24T23:59:59", "Asia/Kolkata")]
#[case("2020-06-01", "America/Los_Angeles")]
fn test_zone_suffix_matches_zone_argument(#[case] literal: &str, #[case] zone: &str) {
    let suffixed = date(Some(&format!("{literal}@{zone}")), None, None).unwrap();
    let argument = date(Some(literal), None, Some(zone)).unwrap();
    assert_eq!(suffixed, argument);
}

#[test]
fn test_zone_suffix_with_zone_argument_conflicts() {
    let err = date(Some("2020-06-01T10:00:00@Europe/Paris"), None, Some("UTC")).unwrap_err();
    assert!(matches!(err, FeelError::ConflictError { .. }));
}

#[test]
fn test_zone_argument_wins_over_offset() {
    let value = date(Some("2020-06-01T10:00:00+05:00"), None, Some("Europe/Paris")).unwrap();
    assert_eq!(value.to_string(), "2020-06-01T10:00:00+02:00[Europe/Paris]");
}

#[test]
fn test_date_and_time_parts_conflict() {
    let err = date(Some("2020-06-01"), Some("10:00:00"), None).unwrap_err();
    assert!(matches!(err, FeelError::ConflictError { .. }));
}

#[test]
fn test_negative_year_is_not_implemented() {
    let err = date(Some("-2020-06-01"), None, None).unwrap_err();
    assert!(matches!(err, FeelError::NotImplemented { .. }));
}

#[test]
fn test_garbage_literal_is_parse_error() {
    let err = date(Some("yesterday"), None, None).unwrap_err();
    assert!(matches!(err, FeelError::ParseError { .. }));
}

#[test]
fn test_millisecond_projection() {
    let epoch = FeelValue::from(date(Some("1970-01-01T00:00:00Z"), None, None).unwrap());
    assert_eq!(ms(&epoch), Some(0.0));
    assert_eq!(ms(&FeelValue::from(duration(1500).unwrap())), Some(1500.0));
    assert_eq!(ms(&FeelValue::from(duration("PT1.5S").unwrap())), Some(1500.0));
    assert_eq!(ms(&FeelValue::from(duration("P1W").unwrap())), Some(604_800_000.0));
    assert_eq!(ms(&FeelValue::from("not temporal")), None);
    assert_eq!(ms(&FeelValue::from(duration("P1Y").unwrap())), None);
}

#[test]
fn test_classifier() {
    let now = FeelValue::from(date(None, None, None).unwrap());
    let span = FeelValue::from(duration("P1DT2H").unwrap());
    assert!(is_date_time(&now) && !is_duration(&now));
    assert!(is_duration(&span) && !is_date_time(&span));
    assert!(!is_date_time(&FeelValue::from(42)));
    assert!(!is_duration(&FeelValue::Null));
}

#[rstest]
#[case("P")]
#[case("PT")]
#[case("P1H")]
#[case("1D")]
#[case("P1DT")]
fn test_malformed_durations(#[case] text: &str) {
    assert!(matches!(duration(text), Err(FeelError::ParseError { .. })));
}

#[test]
fn test_duration_display() {
    assert_eq!(duration("p1dt2h").unwrap().to_string(), "P1DT2H");
    assert_eq!(duration("-PT90M").unwrap().to_string(), "-PT90M");
    assert_eq!(duration(0).unwrap().to_string(), "PT0S");
}
