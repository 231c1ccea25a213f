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

//! Runtime values of the FEEL evaluator

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use super::temporal::{Duration, TemporalValue, ZonedDateTime};

/// Entries of a FEEL context value, in insertion order
pub type ContextEntries = IndexMap<String, FeelValue>;

/// A FEEL value. `Null` doubles as the undefined result of a failed
/// sub-expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FeelValue {
    #[default]
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
    List(Vec<FeelValue>),
    Context(ContextEntries),
    Range(Box<FeelRange>),
    Temporal(TemporalValue),
}

/// One end of a range; `inclusive` is false for `(`, `]` openers and `)`, `[` closers
#[derive(Debug, Clone, PartialEq)]
pub struct RangeEndpoint {
    pub value: FeelValue,
    pub inclusive: bool,
}

/// An interval; a missing endpoint leaves that side unbounded
#[derive(Debug, Clone, PartialEq)]
pub struct FeelRange {
    pub start: Option<RangeEndpoint>,
    pub end: Option<RangeEndpoint>,
}

impl FeelRange {
    pub fn closed(start: FeelValue, end: FeelValue) -> Self {
        Self {
            start: Some(RangeEndpoint {
                value: start,
                inclusive: true,
            }),
            end: Some(RangeEndpoint {
                value: end,
                inclusive: true,
            }),
        }
    }
}

impl FeelValue {
    /// Name of the value's type as used in diagnostics and `instance of`
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Context(_) => "context",
            Self::Range(_) => "range",
            Self::Temporal(TemporalValue::DateTime(_)) => "date and time",
            Self::Temporal(TemporalValue::Duration(d)) => {
                if d.total_nanoseconds().is_some() {
                    "days and time duration"
                } else {
                    "years and months duration"
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FeelValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date_time(&self) -> Option<&ZonedDateTime> {
        match self {
            Self::Temporal(TemporalValue::DateTime(dt)) => Some(dt),
            _ => None,
        }
    }

    pub fn as_duration(&self) -> Option<&Duration> {
        match self {
            Self::Temporal(TemporalValue::Duration(d)) => Some(d),
            _ => None,
        }
    }

    /// Convert a JSON document into a FEEL value.
    ///
    /// Numbers that cannot be represented as decimals become `Null`.
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Boolean(*b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Decimal::from)
                .or_else(|| n.as_u64().map(Decimal::from))
                .or_else(|| Decimal::from_str(&n.to_string()).ok())
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
                .map_or(Self::Null, Self::Number),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(map) => Self::Context(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into JSON; temporal values and ranges become strings
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Number(n) => {
                let n = n.normalize();
                if n.scale() == 0 {
                    if let Some(i) = n.to_i64() {
                        return JsonValue::from(i);
                    }
                }
                n.to_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| JsonValue::String(n.to_string()), JsonValue::Number)
            }
            Self::String(s) => JsonValue::String(s.clone()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Context(entries) => JsonValue::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Range(_) | Self::Temporal(_) => JsonValue::String(self.to_string()),
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for FeelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::String(s) => write_string_literal(f, s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Context(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Range(range) => range.fmt(f),
            Self::Temporal(t) => t.fmt(f),
        }
    }
}

impl fmt::Display for FeelRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.start {
            Some(start) => write!(f, "{}{}", if start.inclusive { "[" } else { "(" }, start.value)?,
            None => f.write_str("(")?,
        }
        f.write_str("..")?;
        match &self.end {
            Some(end) => write!(f, "{}{}", end.value, if end.inclusive { "]" } else { ")" }),
            None => f.write_str(")"),
        }
    }
}

impl Serialize for FeelValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<bool> for FeelValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FeelValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FeelValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for FeelValue {
    fn from(value: i32) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<i64> for FeelValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<Decimal> for FeelValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<Vec<FeelValue>> for FeelValue {
    fn from(value: Vec<FeelValue>) -> Self {
        Self::List(value)
    }
}

impl From<ContextEntries> for FeelValue {
    fn from(value: ContextEntries) -> Self {
        Self::Context(value)
    }
}

impl From<FeelRange> for FeelValue {
    fn from(value: FeelRange) -> Self {
        Self::Range(Box::new(value))
    }
}

impl From<TemporalValue> for FeelValue {
    fn from(value: TemporalValue) -> Self {
        Self::Temporal(value)
    }
}

impl From<ZonedDateTime> for FeelValue {
    fn from(value: ZonedDateTime) -> Self {
        Self::Temporal(TemporalValue::DateTime(value))
    }
}

impl From<Duration> for FeelValue {
    fn from(value: Duration) -> Self {
        Self::Temporal(TemporalValue::Duration(value))
    }
}

impl<T: Into<FeelValue>> From<Option<T>> for FeelValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_json_conversion() {
        let json = json!({"name": "Ann", "age": 42, "score": 1.5, "tags": ["a", null], "ok": true});
        let value = FeelValue::from_json(&json);
        let FeelValue::Context(entries) = &value else {
            panic!("expected a context");
        };
        assert_eq!(entries.get("age"), Some(&FeelValue::from(42)));
        assert_eq!(entries.get("score"), Some(&FeelValue::Number(Decimal::new(15, 1))));
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_display() {
        let list = FeelValue::List(vec![
            FeelValue::from(1),
            FeelValue::from("a\"b"),
            FeelValue::Null,
        ]);
        assert_eq!(list.to_string(), r#"[1, "a\"b", null]"#);
        let range = FeelValue::from(FeelRange::closed(FeelValue::from(1), FeelValue::from(5)));
        assert_eq!(range.to_string(), "[1..5]");
        assert_eq!(FeelValue::Number(Decimal::new(1500, 3)).to_string(), "1.5");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FeelValue::Null.type_name(), "Null");
        assert_eq!(FeelValue::from("x").type_name(), "string");
        let d = Duration::parse("P1Y").unwrap();
        assert_eq!(FeelValue::from(d).type_name(), "years and months duration");
    }
}
