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

//! Operator semantics over [`FeelValue`]
//!
//! Each operator returns either a value or the [`Warning`] describing why the
//! operands were rejected; the interpreter records the warning and continues
//! with `null`.

use std::cmp::Ordering;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};

use super::warning::Warning;
use crate::ast::{BinaryOperator, UnaryOperator};
use crate::core::temporal::TemporalValue;
use crate::core::{FeelError, FeelRange, FeelValue};

/// Outcome of an operator application
pub type OperatorResult = Result<FeelValue, Warning>;

/// Order two values of the same comparable kind
pub fn compare(left: &FeelValue, right: &FeelValue) -> Option<Ordering> {
    use FeelValue::*;
    match (left, right) {
        (Number(a), Number(b)) => Some(a.cmp(b)),
        (String(a), String(b)) => Some(a.cmp(b)),
        (Temporal(TemporalValue::DateTime(a)), Temporal(TemporalValue::DateTime(b))) => {
            Some(a.cmp_instant(b))
        }
        (Temporal(TemporalValue::Duration(a)), Temporal(TemporalValue::Duration(b))) => a.compare(b),
        _ => None,
    }
}

/// FEEL equality; `None` when the kinds cannot be compared
pub fn values_equal(left: &FeelValue, right: &FeelValue) -> Option<bool> {
    use FeelValue::*;
    match (left, right) {
        (Null, Null) => Some(true),
        (Null, _) | (_, Null) => Some(false),
        (Boolean(a), Boolean(b)) => Some(a == b),
        (List(a), List(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            let mut all = true;
            for (x, y) in a.iter().zip(b) {
                all &= values_equal(x, y)?;
            }
            Some(all)
        }
        (Context(a), Context(b)) => {
            if a.len() != b.len() {
                return Some(false);
            }
            let mut all = true;
            for (key, x) in a {
                match b.get(key) {
                    Some(y) => all &= values_equal(x, y)?,
                    None => return Some(false),
                }
            }
            Some(all)
        }
        (Range(a), Range(b)) => Some(a == b),
        (Temporal(TemporalValue::Duration(a)), Temporal(TemporalValue::Duration(b))) => {
            Some(a.compare(b).map_or(a == b, Ordering::is_eq))
        }
        _ => compare(left, right).map(Ordering::is_eq),
    }
}

fn mismatch(verb: &str, left: &FeelValue, right: &FeelValue) -> Warning {
    Warning::invalid_type(format!(
        "Can't {verb} {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

fn temporal_fault(err: FeelError) -> Warning {
    Warning::invalid_operation(err.to_string())
}

fn overflow(op: BinaryOperator) -> Warning {
    Warning::invalid_operation(format!("Numeric overflow in '{op}'"))
}

/// Apply a comparison operator
pub fn comparison(op: BinaryOperator, left: &FeelValue, right: &FeelValue) -> OperatorResult {
    let holds = |ord: Ordering| match op {
        BinaryOperator::LessThan => Some(ord.is_lt()),
        BinaryOperator::LessThanOrEqual => Some(ord.is_le()),
        BinaryOperator::GreaterThan => Some(ord.is_gt()),
        BinaryOperator::GreaterThanOrEqual => Some(ord.is_ge()),
        _ => None,
    };

    match op {
        BinaryOperator::Equal | BinaryOperator::NotEqual => match values_equal(left, right) {
            Some(eq) => Ok(FeelValue::Boolean(eq == (op == BinaryOperator::Equal))),
            None => Err(mismatch("compare", left, right)),
        },
        _ if left.is_null() || right.is_null() => Ok(FeelValue::Null),
        _ => match compare(left, right) {
            Some(ord) => holds(ord)
                .map(FeelValue::Boolean)
                .ok_or_else(|| Warning::invalid_operation(format!("'{op}' is not a comparison"))),
            None => Err(mismatch("compare", left, right)),
        },
    }
}

/// Apply an arithmetic operator; any null operand yields null
pub fn arithmetic(op: BinaryOperator, left: &FeelValue, right: &FeelValue) -> OperatorResult {
    if left.is_null() || right.is_null() {
        return Ok(FeelValue::Null);
    }
    match op {
        BinaryOperator::Add => add(left, right),
        BinaryOperator::Subtract => subtract(left, right),
        BinaryOperator::Multiply => multiply(left, right),
        BinaryOperator::Divide => divide(left, right),
        BinaryOperator::Power => power(left, right),
        other => Err(Warning::invalid_operation(format!(
            "'{other}' is not an arithmetic operator"
        ))),
    }
}

fn add(left: &FeelValue, right: &FeelValue) -> OperatorResult {
    use FeelValue::*;
    use TemporalValue::{DateTime, Duration};
    match (left, right) {
        (Number(a), Number(b)) => a
            .checked_add(*b)
            .map(Number)
            .ok_or_else(|| overflow(BinaryOperator::Add)),
        (String(a), String(b)) => Ok(String(format!("{a}{b}"))),
        (Temporal(DateTime(dt)), Temporal(Duration(d)))
        | (Temporal(Duration(d)), Temporal(DateTime(dt))) => {
            dt.checked_add(d).map(FeelValue::from).map_err(temporal_fault)
        }
        (Temporal(Duration(a)), Temporal(Duration(b))) => {
            a.checked_add(b).map(FeelValue::from).map_err(temporal_fault)
        }
        _ => Err(mismatch("add", left, right)),
    }
}

fn subtract(left: &FeelValue, right: &FeelValue) -> OperatorResult {
    use FeelValue::*;
    use TemporalValue::{DateTime, Duration};
    match (left, right) {
        (Number(a), Number(b)) => a
            .checked_sub(*b)
            .map(Number)
            .ok_or_else(|| overflow(BinaryOperator::Subtract)),
        (Temporal(DateTime(dt)), Temporal(Duration(d))) => {
            dt.checked_sub(d).map(FeelValue::from).map_err(temporal_fault)
        }
        (Temporal(DateTime(a)), Temporal(DateTime(b))) => {
            a.since(b).map(FeelValue::from).map_err(temporal_fault)
        }
        (Temporal(Duration(a)), Temporal(Duration(b))) => {
            a.checked_sub(b).map(FeelValue::from).map_err(temporal_fault)
        }
        _ => Err(mismatch("subtract", left, right)),
    }
}

fn multiply(left: &FeelValue, right: &FeelValue) -> OperatorResult {
    use FeelValue::*;
    match (left, right) {
        (Number(a), Number(b)) => a
            .checked_mul(*b)
            .map(Number)
            .ok_or_else(|| overflow(BinaryOperator::Multiply)),
        (Temporal(TemporalValue::Duration(d)), Number(n))
        | (Number(n), Temporal(TemporalValue::Duration(d))) => {
            d.checked_mul(*n).map(FeelValue::from).map_err(temporal_fault)
        }
        _ => Err(mismatch("multiply", left, right)),
    }
}

fn divide(left: &FeelValue, right: &FeelValue) -> OperatorResult {
    use FeelValue::*;
    match (left, right) {
        (Number(_), Number(b)) | (Temporal(TemporalValue::Duration(_)), Number(b))
            if b.is_zero() =>
        {
            Err(Warning::invalid_operation("Division by zero"))
        }
        (Number(a), Number(b)) => a
            .checked_div(*b)
            .map(Number)
            .ok_or_else(|| overflow(BinaryOperator::Divide)),
        (Temporal(TemporalValue::Duration(d)), Number(n)) => {
            d.checked_div(*n).map(FeelValue::from).map_err(temporal_fault)
        }
        (Temporal(TemporalValue::Duration(a)), Temporal(TemporalValue::Duration(b))) => {
            let (Some(a), Some(b)) = (a.total_nanoseconds(), b.total_nanoseconds()) else {
                return Err(Warning::invalid_operation(
                    "Can't divide durations with year or month components",
                ));
            };
            if b == 0 {
                return Err(Warning::invalid_operation("Division by zero"));
            }
            Decimal::from_i128(a)
                .zip(Decimal::from_i128(b))
                .and_then(|(a, b)| a.checked_div(b))
                .map(Number)
                .ok_or_else(|| overflow(BinaryOperator::Divide))
        }
        _ => Err(mismatch("divide", left, right)),
    }
}

fn power(left: &FeelValue, right: &FeelValue) -> OperatorResult {
    let (FeelValue::Number(base), FeelValue::Number(exponent)) = (left, right) else {
        return Err(mismatch("exponentiate", left, right));
    };
    let result = if exponent.fract().is_zero() {
        exponent.to_i64().and_then(|e| base.checked_powi(e))
    } else if base.is_sign_negative() && !base.is_zero() {
        return Err(Warning::invalid_operation(format!(
            "{base} ** {exponent} has no real result"
        )));
    } else {
        base.checked_powd(*exponent)
    };
    result
        .map(FeelValue::Number)
        .ok_or_else(|| overflow(BinaryOperator::Power))
}

/// Apply a unary operator
pub fn unary(op: UnaryOperator, operand: &FeelValue) -> OperatorResult {
    match (op, operand) {
        (_, FeelValue::Null) => Ok(FeelValue::Null),
        (UnaryOperator::Negate, FeelValue::Number(n)) => Ok(FeelValue::Number(-*n)),
        (UnaryOperator::Negate, FeelValue::Temporal(TemporalValue::Duration(d))) => {
            Ok(d.negated().into())
        }
        (UnaryOperator::Negate, other) => Err(Warning::invalid_type(format!(
            "Can't negate {}",
            other.type_name()
        ))),
    }
}

/// Three-valued conjunction
pub fn and(left: &FeelValue, right: &FeelValue) -> FeelValue {
    match (left.as_bool(), right.as_bool()) {
        (Some(false), _) | (_, Some(false)) => FeelValue::Boolean(false),
        (Some(true), Some(true)) => FeelValue::Boolean(true),
        _ => FeelValue::Null,
    }
}

/// Three-valued disjunction
pub fn or(left: &FeelValue, right: &FeelValue) -> FeelValue {
    match (left.as_bool(), right.as_bool()) {
        (Some(true), _) | (_, Some(true)) => FeelValue::Boolean(true),
        (Some(false), Some(false)) => FeelValue::Boolean(false),
        _ => FeelValue::Null,
    }
}

/// Whether `value` lies inside `range`
pub fn range_contains(range: &FeelRange, value: &FeelValue) -> OperatorResult {
    if value.is_null() {
        return Ok(FeelValue::Null);
    }
    let above_start = match &range.start {
        None => Some(true),
        Some(start) => compare(value, &start.value).map(|ord| {
            if start.inclusive {
                ord.is_ge()
            } else {
                ord.is_gt()
            }
        }),
    };
    let below_end = match &range.end {
        None => Some(true),
        Some(end) => compare(value, &end.value).map(|ord| {
            if end.inclusive {
                ord.is_le()
            } else {
                ord.is_lt()
            }
        }),
    };
    match (above_start, below_end) {
        (Some(a), Some(b)) => Ok(FeelValue::Boolean(a && b)),
        _ => Err(Warning::invalid_type(format!(
            "Can't test {} against range {range}",
            value.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::{date, duration};
    use crate::evaluator::warning::WarningType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn n(value: i64) -> FeelValue {
        FeelValue::from(value)
    }

    #[rstest]
    #[case(BinaryOperator::Add, n(2), n(3), n(5))]
    #[case(BinaryOperator::Subtract, n(2), n(3), n(-1))]
    #[case(BinaryOperator::Multiply, n(4), n(3), n(12))]
    #[case(BinaryOperator::Divide, n(9), n(3), n(3))]
    #[case(BinaryOperator::Power, n(2), n(10), n(1024))]
    #[case(BinaryOperator::Add, FeelValue::from("a"), FeelValue::from("b"), FeelValue::from("ab"))]
    #[case(BinaryOperator::Add, FeelValue::Null, n(1), FeelValue::Null)]
    fn test_arithmetic(
        #[case] op: BinaryOperator,
        #[case] left: FeelValue,
        #[case] right: FeelValue,
        #[case] expected: FeelValue,
    ) {
        assert_eq!(arithmetic(op, &left, &right).unwrap(), expected);
    }

    #[test]
    fn test_division_by_zero_is_invalid_operation() {
        let err = arithmetic(BinaryOperator::Divide, &n(1), &n(0)).unwrap_err();
        assert_eq!(err.warning_type, WarningType::InvalidOperation);
    }

    #[test]
    fn test_fractional_power_of_negative_base() {
        let half = FeelValue::Number(Decimal::new(5, 1));
        let err = arithmetic(BinaryOperator::Power, &n(-8), &half).unwrap_err();
        assert_eq!(err.warning_type, WarningType::InvalidOperation);

        assert_eq!(arithmetic(BinaryOperator::Power, &n(-2), &n(3)).unwrap(), n(-8));
    }

    #[test]
    fn test_mismatched_kinds() {
        let err = arithmetic(BinaryOperator::Add, &n(1), &FeelValue::from("a")).unwrap_err();
        assert_eq!(err.warning_type, WarningType::InvalidType);
        let err = comparison(BinaryOperator::Equal, &n(1), &FeelValue::from("1")).unwrap_err();
        assert_eq!(err.warning_type, WarningType::InvalidType);
    }

    #[test]
    fn test_null_equality() {
        let null = FeelValue::Null;
        assert_eq!(comparison(BinaryOperator::Equal, &null, &null).unwrap(), FeelValue::from(true));
        assert_eq!(comparison(BinaryOperator::Equal, &n(1), &null).unwrap(), FeelValue::from(false));
        assert_eq!(comparison(BinaryOperator::NotEqual, &n(1), &null).unwrap(), FeelValue::from(true));
        assert_eq!(comparison(BinaryOperator::LessThan, &n(1), &null).unwrap(), FeelValue::Null);
    }

    #[test]
    fn test_temporal_arithmetic() {
        let start = FeelValue::from(date(Some("2020-01-31"), None, None).unwrap());
        let month = FeelValue::from(duration("P1M").unwrap());
        let shifted = arithmetic(BinaryOperator::Add, &start, &month).unwrap();
        assert_eq!(shifted.to_string(), "2020-02-29T00:00:00+00:00[UTC]");

        let end = FeelValue::from(date(Some("2020-01-31T06:00:00"), None, None).unwrap());
        let elapsed = arithmetic(BinaryOperator::Subtract, &end, &start).unwrap();
        assert_eq!(elapsed.to_string(), "PT6H");

        let doubled = arithmetic(BinaryOperator::Multiply, &n(2), &elapsed).unwrap();
        assert_eq!(doubled.to_string(), "PT12H");
    }

    #[test]
    fn test_temporal_comparison() {
        let utc = FeelValue::from(date(Some("2020-01-01T12:00:00Z"), None, None).unwrap());
        let berlin = FeelValue::from(date(Some("2020-01-01T13:00:00@Europe/Berlin"), None, None).unwrap());
        assert_eq!(comparison(BinaryOperator::Equal, &utc, &berlin).unwrap(), FeelValue::from(true));

        let short = FeelValue::from(duration("PT1H").unwrap());
        let long = FeelValue::from(duration("P1D").unwrap());
        assert_eq!(comparison(BinaryOperator::LessThan, &short, &long).unwrap(), FeelValue::from(true));
    }

    #[rstest]
    #[case(Some(true), Some(false), Some(false))]
    #[case(Some(false), None, Some(false))]
    #[case(Some(true), None, None)]
    #[case(Some(true), Some(true), Some(true))]
    fn test_and_absorption(#[case] a: Option<bool>, #[case] b: Option<bool>, #[case] expected: Option<bool>) {
        assert_eq!(and(&FeelValue::from(a), &FeelValue::from(b)), FeelValue::from(expected));
    }

    #[test]
    fn test_or_absorption() {
        assert_eq!(or(&FeelValue::from(true), &FeelValue::Null), FeelValue::from(true));
        assert_eq!(or(&FeelValue::from(false), &FeelValue::Null), FeelValue::Null);
    }

    #[test]
    fn test_range_contains() {
        let range = FeelRange {
            start: Some(crate::core::RangeEndpoint { value: n(1), inclusive: false }),
            end: Some(crate::core::RangeEndpoint { value: n(5), inclusive: true }),
        };
        assert_eq!(range_contains(&range, &n(1)).unwrap(), FeelValue::from(false));
        assert_eq!(range_contains(&range, &n(5)).unwrap(), FeelValue::from(true));
        assert!(range_contains(&range, &FeelValue::from("x")).is_err());
    }
}
