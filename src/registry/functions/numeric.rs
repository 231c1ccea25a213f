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

//! Numeric built-ins: `abs`, `floor`, `ceiling`, `decimal`

use std::sync::LazyLock;

use rust_decimal::RoundingStrategy;
use rust_decimal::prelude::ToPrimitive;

use crate::core::FeelValue;
use crate::core::temporal::TemporalValue;
use crate::registry::function::{
    FeelFunction, FunctionContext, FunctionResult, evaluation_error, type_error,
};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// abs(n), also accepts durations
pub struct AbsFunction;

impl FeelFunction for AbsFunction {
    fn name(&self) -> &str {
        "abs"
    }
    fn human_friendly_name(&self) -> &str {
        "Absolute Value"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::new("abs", vec![ParameterInfo::required("n")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::Number(n) => Ok(FeelValue::Number(n.abs())),
            FeelValue::Temporal(TemporalValue::Duration(d)) => Ok(d.abs().into()),
            other => Err(type_error(self.name(), 0, "number or duration", other)),
        }
    }
}

/// floor(n)
pub struct FloorFunction;

impl FeelFunction for FloorFunction {
    fn name(&self) -> &str {
        "floor"
    }
    fn human_friendly_name(&self) -> &str {
        "Floor"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::new("floor", vec![ParameterInfo::required("n")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::Number(n) => Ok(FeelValue::Number(n.floor())),
            other => Err(type_error(self.name(), 0, "number", other)),
        }
    }
}

/// ceiling(n)
pub struct CeilingFunction;

impl FeelFunction for CeilingFunction {
    fn name(&self) -> &str {
        "ceiling"
    }
    fn human_friendly_name(&self) -> &str {
        "Ceiling"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("ceiling", vec![ParameterInfo::required("n")])
        });
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::Number(n) => Ok(FeelValue::Number(n.ceil())),
            other => Err(type_error(self.name(), 0, "number", other)),
        }
    }
}

/// decimal(n, scale), rounding half to even
pub struct DecimalFunction;

impl FeelFunction for DecimalFunction {
    fn name(&self) -> &str {
        "decimal"
    }
    fn human_friendly_name(&self) -> &str {
        "Decimal"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "decimal",
                vec![ParameterInfo::required("n"), ParameterInfo::required("scale")],
            )
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Round `n` to `scale` fractional digits using banker's rounding."
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        let (n, scale) = match (&args[0], &args[1]) {
            (FeelValue::Null, _) | (_, FeelValue::Null) => return Ok(FeelValue::Null),
            (FeelValue::Number(n), FeelValue::Number(scale)) => (*n, *scale),
            (FeelValue::Number(_), other) => return Err(type_error(self.name(), 1, "number", other)),
            (other, _) => return Err(type_error(self.name(), 0, "number", other)),
        };
        let scale = scale
            .to_u32()
            .filter(|s| *s <= 28)
            .ok_or_else(|| evaluation_error(self.name(), format!("scale {scale} out of range")))?;
        Ok(FeelValue::Number(
            n.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::{ChronoProvider, duration};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rstest::rstest;

    fn call(f: &dyn FeelFunction, args: &[FeelValue]) -> FunctionResult<FeelValue> {
        f.evaluate(args, &FunctionContext::new(&ChronoProvider))
    }

    fn num(mantissa: i64, scale: u32) -> FeelValue {
        FeelValue::Number(Decimal::new(mantissa, scale))
    }

    #[rstest]
    #[case(num(-15, 1), num(-2, 0), num(-1, 0))]
    #[case(num(15, 1), num(1, 0), num(2, 0))]
    #[case(num(3, 0), num(3, 0), num(3, 0))]
    fn test_floor_and_ceiling(#[case] input: FeelValue, #[case] floor: FeelValue, #[case] ceiling: FeelValue) {
        assert_eq!(call(&FloorFunction, &[input.clone()]).unwrap(), floor);
        assert_eq!(call(&CeilingFunction, &[input]).unwrap(), ceiling);
    }

    #[test]
    fn test_decimal_rounds_half_even() {
        assert_eq!(call(&DecimalFunction, &[num(25, 1), FeelValue::from(0)]).unwrap(), num(2, 0));
        assert_eq!(call(&DecimalFunction, &[num(35, 1), FeelValue::from(0)]).unwrap(), num(4, 0));
        assert_eq!(
            call(&DecimalFunction, &[num(1_2345, 4), FeelValue::from(2)]).unwrap(),
            num(123, 2)
        );
        assert!(call(&DecimalFunction, &[num(1, 0), FeelValue::from(-1)]).is_err());
    }

    #[test]
    fn test_abs() {
        assert_eq!(call(&AbsFunction, &[FeelValue::from(-4)]).unwrap(), FeelValue::from(4));
        let d = FeelValue::from(duration("-PT2H").unwrap());
        assert_eq!(call(&AbsFunction, &[d]).unwrap().to_string(), "PT2H");
        assert!(call(&AbsFunction, &[FeelValue::from("x")]).is_err());
    }
}
