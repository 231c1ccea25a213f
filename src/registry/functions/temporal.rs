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

//! Temporal built-ins: `date`, `time`, `date and time`, `duration`, `now`, `today`

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;

use crate::core::FeelValue;
use crate::core::temporal::{DateResolver, Duration, Zone, ZonedDateTime};
use crate::registry::function::{
    FeelFunction, FunctionContext, FunctionError, FunctionResult, evaluation_error, type_error,
};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

fn integer_arg(name: &str, index: usize, value: &FeelValue) -> FunctionResult<i64> {
    value
        .as_number()
        .filter(|n| n.fract().is_zero())
        .and_then(|n| n.to_i64())
        .ok_or_else(|| type_error(name, index, "integer number", value))
}

fn component(name: &str, index: usize, value: &FeelValue) -> FunctionResult<u32> {
    let n = integer_arg(name, index, value)?;
    u32::try_from(n).map_err(|_| evaluation_error(name, format!("component {n} out of range")))
}

/// date(from) / date(year, month, day)
pub struct DateFunction;

impl FeelFunction for DateFunction {
    fn name(&self) -> &str {
        "date"
    }
    fn human_friendly_name(&self) -> &str {
        "Date"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("date", vec![ParameterInfo::required("from")]).with_form(vec![
                ParameterInfo::required("year"),
                ParameterInfo::required("month"),
                ParameterInfo::required("day"),
            ])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Date at midnight from an ISO string, a date-time, or year/month/day components."
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        if args.iter().any(FeelValue::is_null) {
            return Ok(FeelValue::Null);
        }
        match args {
            [FeelValue::String(text)] => {
                let resolved = DateResolver::with_provider(context.provider)
                    .resolve(Some(text), None, None)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))?;
                let day = ZonedDateTime::start_of_day(resolved.local().date(), resolved.zone())
                    .map_err(|e| FunctionError::from_feel(self.name(), e))?;
                Ok(day.into())
            }
            [FeelValue::Temporal(_)] => {
                let dt = args[0]
                    .as_date_time()
                    .ok_or_else(|| type_error(self.name(), 0, "string or date and time", &args[0]))?;
                ZonedDateTime::start_of_day(dt.local().date(), dt.zone())
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            [other] => Err(type_error(self.name(), 0, "string or date and time", other)),
            [year, month, day] => {
                let y = integer_arg(self.name(), 0, year)?;
                if y < 0 {
                    return Err(FunctionError::NotImplemented {
                        name: self.name().to_string(),
                        message: "negative years".to_string(),
                    });
                }
                let y = i32::try_from(y)
                    .map_err(|_| evaluation_error(self.name(), format!("year {y} out of range")))?;
                let m = component(self.name(), 1, month)?;
                let d = component(self.name(), 2, day)?;
                let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| {
                    evaluation_error(self.name(), format!("invalid date {y:04}-{m:02}-{d:02}"))
                })?;
                ZonedDateTime::start_of_day(date, Zone::UTC)
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            _ => Err(FunctionError::InvalidArity {
                name: self.name().to_string(),
                min: 1,
                max: Some(3),
                actual: args.len(),
            }),
        }
    }
}

/// time(from) / time(hour, minute, second)
pub struct TimeFunction;

impl FeelFunction for TimeFunction {
    fn name(&self) -> &str {
        "time"
    }
    fn human_friendly_name(&self) -> &str {
        "Time"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("time", vec![ParameterInfo::required("from")]).with_form(vec![
                ParameterInfo::required("hour"),
                ParameterInfo::required("minute"),
                ParameterInfo::required("second"),
            ])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Time of day anchored on 1900-01-01, from an ISO string, a date-time, or components."
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        if args.iter().any(FeelValue::is_null) {
            return Ok(FeelValue::Null);
        }
        let resolver = DateResolver::with_provider(context.provider);
        match args {
            [FeelValue::String(text)] => resolver
                .resolve(None, Some(text), None)
                .map(FeelValue::from)
                .map_err(|e| FunctionError::from_feel(self.name(), e)),
            [value @ FeelValue::Temporal(_)] => {
                let dt = value
                    .as_date_time()
                    .ok_or_else(|| type_error(self.name(), 0, "string or date and time", value))?;
                let anchor = NaiveDate::from_ymd_opt(1900, 1, 1)
                    .ok_or_else(|| evaluation_error(self.name(), "invalid anchor date"))?;
                ZonedDateTime::from_local(NaiveDateTime::new(anchor, dt.local().time()), dt.zone())
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            [other] => Err(type_error(self.name(), 0, "string or date and time", other)),
            [hour, minute, second] => {
                let h = component(self.name(), 0, hour)?;
                let m = component(self.name(), 1, minute)?;
                let s = component(self.name(), 2, second)?;
                if NaiveTime::from_hms_opt(h, m, s).is_none() {
                    return Err(evaluation_error(
                        self.name(),
                        format!("invalid time {h:02}:{m:02}:{s:02}"),
                    ));
                }
                resolver
                    .resolve(None, Some(&format!("{h:02}:{m:02}:{s:02}")), None)
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            _ => Err(FunctionError::InvalidArity {
                name: self.name().to_string(),
                min: 1,
                max: Some(3),
                actual: args.len(),
            }),
        }
    }
}

/// date and time(from) / date and time(date, time)
pub struct DateAndTimeFunction;

impl FeelFunction for DateAndTimeFunction {
    fn name(&self) -> &str {
        "date and time"
    }
    fn human_friendly_name(&self) -> &str {
        "Date And Time"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("date and time", vec![ParameterInfo::required("from")])
                .with_form(vec![
                    ParameterInfo::required("date"),
                    ParameterInfo::required("time"),
                ])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Zoned date-time from an ISO string, or from a date and a time of day in the time's zone."
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        if args.iter().any(FeelValue::is_null) {
            return Ok(FeelValue::Null);
        }
        match args {
            [FeelValue::String(text)] => DateResolver::with_provider(context.provider)
                .resolve(Some(text), None, None)
                .map(FeelValue::from)
                .map_err(|e| FunctionError::from_feel(self.name(), e)),
            [value @ FeelValue::Temporal(_)] if value.as_date_time().is_some() => Ok(value.clone()),
            [other] => Err(type_error(self.name(), 0, "string", other)),
            [date, time] => {
                let date = date
                    .as_date_time()
                    .ok_or_else(|| type_error(self.name(), 0, "date", date))?;
                let time = time
                    .as_date_time()
                    .ok_or_else(|| type_error(self.name(), 1, "time", time))?;
                let local = NaiveDateTime::new(date.local().date(), time.local().time());
                ZonedDateTime::from_local(local, time.zone())
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            _ => Err(FunctionError::InvalidArity {
                name: self.name().to_string(),
                min: 1,
                max: Some(2),
                actual: args.len(),
            }),
        }
    }
}

/// duration(from)
pub struct DurationFunction;

impl FeelFunction for DurationFunction {
    fn name(&self) -> &str {
        "duration"
    }
    fn human_friendly_name(&self) -> &str {
        "Duration"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("duration", vec![ParameterInfo::required("from")])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Duration from ISO-8601 text (`P1DT2H`) or a millisecond count."
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::String(text) => DateResolver::with_provider(context.provider)
                .duration_from_str(text)
                .map(FeelValue::from)
                .map_err(|e| FunctionError::from_feel(self.name(), e)),
            FeelValue::Number(n) => {
                let millis = n
                    .to_f64()
                    .ok_or_else(|| evaluation_error(self.name(), format!("{n} out of range")))?;
                Duration::from_milliseconds(millis)
                    .map(FeelValue::from)
                    .map_err(|e| FunctionError::from_feel(self.name(), e))
            }
            value @ FeelValue::Temporal(_) if value.as_duration().is_some() => Ok(value.clone()),
            other => Err(type_error(self.name(), 0, "string or number", other)),
        }
    }
}

/// now()
pub struct NowFunction;

impl FeelFunction for NowFunction {
    fn name(&self) -> &str {
        "now"
    }
    fn human_friendly_name(&self) -> &str {
        "Now"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::new("now", vec![]));
        &SIG
    }
    fn is_pure(&self) -> bool {
        false
    }
    fn documentation(&self) -> &str {
        "Current date-time in the provider's zone."
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        Ok(context.provider.now().into())
    }
}

/// today()
pub struct TodayFunction;

impl FeelFunction for TodayFunction {
    fn name(&self) -> &str {
        "today"
    }
    fn human_friendly_name(&self) -> &str {
        "Today"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::new("today", vec![]));
        &SIG
    }
    fn is_pure(&self) -> bool {
        false
    }

    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        let now = context.provider.now();
        ZonedDateTime::start_of_day(now.local().date(), now.zone())
            .map(FeelValue::from)
            .map_err(|e| FunctionError::from_feel(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::{ChronoProvider, FixedClock, date};
    use pretty_assertions::assert_eq;

    fn call(f: &dyn FeelFunction, args: &[FeelValue]) -> FunctionResult<FeelValue> {
        f.evaluate(args, &FunctionContext::new(&ChronoProvider))
    }

    #[test]
    fn test_date_forms() {
        let from_text = call(&DateFunction, &[FeelValue::from("2021-03-04")]).unwrap();
        let from_parts = call(
            &DateFunction,
            &[FeelValue::from(2021), FeelValue::from(3), FeelValue::from(4)],
        )
        .unwrap();
        assert_eq!(from_text, from_parts);
        assert_eq!(from_text.to_string(), "2021-03-04T00:00:00+00:00[UTC]");

        let err = call(
            &DateFunction,
            &[FeelValue::from(2021), FeelValue::from(2), FeelValue::from(30)],
        )
        .unwrap_err();
        assert!(matches!(err, FunctionError::EvaluationError { .. }));
        assert!(matches!(
            call(&DateFunction, &[FeelValue::from("-0001-01-01")]),
            Err(FunctionError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_time_anchors_on_1900() {
        let t = call(&TimeFunction, &[FeelValue::from(10), FeelValue::from(30), FeelValue::from(0)])
            .unwrap();
        assert_eq!(t.to_string(), "1900-01-01T10:30:00+00:00[UTC]");
    }

    #[test]
    fn test_date_and_time_combines_in_time_zone() {
        let d = FeelValue::from(date(Some("2021-06-01"), None, None).unwrap());
        let t = FeelValue::from(date(None, Some("08:00:00@Europe/Berlin"), None).unwrap());
        let combined = call(&DateAndTimeFunction, &[d, t]).unwrap();
        assert_eq!(combined.to_string(), "2021-06-01T08:00:00+02:00[Europe/Berlin]");
    }

    #[test]
    fn test_duration_from_text_and_millis() {
        let a = call(&DurationFunction, &[FeelValue::from("PT1.5S")]).unwrap();
        let b = call(&DurationFunction, &[FeelValue::from(1500)]).unwrap();
        assert_eq!(a.to_string(), b.to_string());
        assert!(call(&DurationFunction, &[FeelValue::from("1 day")]).is_err());
    }

    #[test]
    fn test_today_uses_provider_clock() {
        let fixed = date(Some("2022-05-06T13:14:15"), None, Some("Asia/Tokyo")).unwrap();
        let clock = FixedClock::new(fixed);
        let today = TodayFunction
            .evaluate(&[], &FunctionContext::new(&clock))
            .unwrap();
        assert_eq!(today.to_string(), "2022-05-06T00:00:00+09:00[Asia/Tokyo]");
    }
}
