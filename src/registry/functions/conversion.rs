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

//! Conversion and boolean built-ins: `string`, `number`, `not`, `is defined`

use std::str::FromStr;
use std::sync::LazyLock;

use rust_decimal::Decimal;

use crate::core::FeelValue;
use crate::registry::function::{
    FeelFunction, FunctionContext, FunctionResult, evaluation_error, type_error,
};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// string(from)
pub struct StringFunction;

impl FeelFunction for StringFunction {
    fn name(&self) -> &str {
        "string"
    }
    fn human_friendly_name(&self) -> &str {
        "String"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("string", vec![ParameterInfo::required("from")])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Text form of a value; strings are returned unchanged and null stays null."
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        Ok(match &args[0] {
            FeelValue::Null => FeelValue::Null,
            FeelValue::String(s) => FeelValue::String(s.clone()),
            other => FeelValue::String(other.to_string()),
        })
    }
}

/// number(from)
pub struct NumberFunction;

impl FeelFunction for NumberFunction {
    fn name(&self) -> &str {
        "number"
    }
    fn human_friendly_name(&self) -> &str {
        "Number"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("number", vec![ParameterInfo::required("from")])
        });
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::Number(n) => Ok(FeelValue::Number(*n)),
            FeelValue::String(s) => Decimal::from_str(s.trim())
                .or_else(|_| Decimal::from_scientific(s.trim()))
                .map(FeelValue::Number)
                .map_err(|_| evaluation_error(self.name(), format!("<{s}> is not a number"))),
            other => Err(type_error(self.name(), 0, "string", other)),
        }
    }
}

/// not(negand), three-valued
pub struct NotFunction;

impl FeelFunction for NotFunction {
    fn name(&self) -> &str {
        "not"
    }
    fn human_friendly_name(&self) -> &str {
        "Not"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("not", vec![ParameterInfo::required("negand")])
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Logical negation; anything other than a boolean yields null."
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        Ok(match &args[0] {
            FeelValue::Boolean(b) => FeelValue::Boolean(!b),
            _ => FeelValue::Null,
        })
    }
}

/// is defined(value)
pub struct IsDefinedFunction;

impl FeelFunction for IsDefinedFunction {
    fn name(&self) -> &str {
        "is defined"
    }
    fn human_friendly_name(&self) -> &str {
        "Is Defined"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new("is defined", vec![ParameterInfo::required("value")])
        });
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        Ok(FeelValue::Boolean(!args[0].is_null()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::ChronoProvider;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn call(f: &dyn FeelFunction, arg: FeelValue) -> FunctionResult<FeelValue> {
        f.evaluate(&[arg], &FunctionContext::new(&ChronoProvider))
    }

    #[rstest]
    #[case(FeelValue::from(true), FeelValue::from(false))]
    #[case(FeelValue::from(false), FeelValue::from(true))]
    #[case(FeelValue::Null, FeelValue::Null)]
    #[case(FeelValue::from(1), FeelValue::Null)]
    fn test_not(#[case] input: FeelValue, #[case] expected: FeelValue) {
        assert_eq!(call(&NotFunction, input).unwrap(), expected);
    }

    #[test]
    fn test_string_and_number() {
        assert_eq!(call(&StringFunction, FeelValue::from(12)).unwrap(), FeelValue::from("12"));
        assert_eq!(call(&StringFunction, FeelValue::from("x")).unwrap(), FeelValue::from("x"));
        assert_eq!(
            call(&NumberFunction, FeelValue::from(" 1.50 ")).unwrap(),
            FeelValue::Number(Decimal::new(150, 2))
        );
        assert!(call(&NumberFunction, FeelValue::from("abc")).is_err());
        assert!(call(&NumberFunction, FeelValue::from(true)).is_err());
    }

    #[test]
    fn test_is_defined() {
        assert_eq!(call(&IsDefinedFunction, FeelValue::Null).unwrap(), FeelValue::from(false));
        assert_eq!(call(&IsDefinedFunction, FeelValue::from(0)).unwrap(), FeelValue::from(true));
    }
}
