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

//! String built-ins

use std::sync::LazyLock;

use regex::RegexBuilder;
use rust_decimal::prelude::ToPrimitive;

use crate::core::FeelValue;
use crate::registry::function::{
    FeelFunction, FunctionContext, FunctionResult, evaluation_error, type_error,
};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// Strings of all arguments, or `None` if any argument is null
fn string_args<'a>(name: &str, args: &'a [FeelValue]) -> FunctionResult<Option<Vec<&'a str>>> {
    let mut strings = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        match arg {
            FeelValue::Null => return Ok(None),
            FeelValue::String(s) => strings.push(s.as_str()),
            other => return Err(type_error(name, index, "string", other)),
        }
    }
    Ok(Some(strings))
}

/// Single-string built-ins that map one string to a value
macro_rules! unary_string_function {
    ($ty:ident, $name:literal, $friendly:literal, $param:literal, |$s:ident| $body:expr) => {
        pub struct $ty;

        impl FeelFunction for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn human_friendly_name(&self) -> &str {
                $friendly
            }
            fn signature(&self) -> &FunctionSignature {
                static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
                    FunctionSignature::new($name, vec![ParameterInfo::required($param)])
                });
                &SIG
            }

            fn evaluate(
                &self,
                args: &[FeelValue],
                _context: &FunctionContext<'_>,
            ) -> FunctionResult<FeelValue> {
                self.validate_args(args)?;
                Ok(match string_args(self.name(), args)? {
                    Some(strings) => {
                        let $s = strings[0];
                        FeelValue::from($body)
                    }
                    None => FeelValue::Null,
                })
            }
        }
    };
}

/// Two-string predicates
macro_rules! string_predicate {
    ($ty:ident, $name:literal, $friendly:literal, $param:literal, |$s:ident, $m:ident| $body:expr) => {
        pub struct $ty;

        impl FeelFunction for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn human_friendly_name(&self) -> &str {
                $friendly
            }
            fn signature(&self) -> &FunctionSignature {
                static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
                    FunctionSignature::new(
                        $name,
                        vec![ParameterInfo::required("string"), ParameterInfo::required($param)],
                    )
                });
                &SIG
            }

            fn evaluate(
                &self,
                args: &[FeelValue],
                _context: &FunctionContext<'_>,
            ) -> FunctionResult<FeelValue> {
                self.validate_args(args)?;
                Ok(match string_args(self.name(), args)? {
                    Some(strings) => {
                        let ($s, $m) = (strings[0], strings[1]);
                        FeelValue::Boolean($body)
                    }
                    None => FeelValue::Null,
                })
            }
        }
    };
}

unary_string_function!(StringLengthFunction, "string length", "String Length", "string", |s| {
    s.chars().count() as i64
});
unary_string_function!(UpperCaseFunction, "upper case", "Upper Case", "string", |s| s.to_uppercase());
unary_string_function!(LowerCaseFunction, "lower case", "Lower Case", "string", |s| s.to_lowercase());

string_predicate!(ContainsFunction, "contains", "Contains", "match", |s, m| s.contains(m));
string_predicate!(StartsWithFunction, "starts with", "Starts With", "match", |s, m| s.starts_with(m));
string_predicate!(EndsWithFunction, "ends with", "Ends With", "match", |s, m| s.ends_with(m));

/// substring(string, start position, length?)
pub struct SubstringFunction;

impl FeelFunction for SubstringFunction {
    fn name(&self) -> &str {
        "substring"
    }
    fn human_friendly_name(&self) -> &str {
        "Substring"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "substring",
                vec![
                    ParameterInfo::required("string"),
                    ParameterInfo::required("start position"),
                    ParameterInfo::optional("length"),
                ],
            )
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Characters from a 1-based start position; a negative start counts from the end."
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        if args.iter().any(FeelValue::is_null) {
            return Ok(FeelValue::Null);
        }
        let text = args[0]
            .as_str()
            .ok_or_else(|| type_error(self.name(), 0, "string", &args[0]))?;
        let start = args[1]
            .as_number()
            .and_then(|n| n.trunc().to_i64())
            .ok_or_else(|| type_error(self.name(), 1, "number", &args[1]))?;
        let length = match args.get(2) {
            Some(arg) => Some(
                arg.as_number()
                    .and_then(|n| n.trunc().to_i64())
                    .filter(|n| *n >= 0)
                    .ok_or_else(|| type_error(self.name(), 2, "non-negative number", arg))?,
            ),
            None => None,
        };

        let chars: Vec<char> = text.chars().collect();
        let count = chars.len() as i64;
        let begin = match start {
            0 => return Err(evaluation_error(self.name(), "start position must not be 0")),
            s if s > 0 => s - 1,
            s => count + s,
        }
        .clamp(0, count);
        let end = length.map_or(count, |len| begin.saturating_add(len).min(count));

        let slice: String = chars[begin as usize..end as usize].iter().collect();
        Ok(FeelValue::String(slice))
    }
}

/// matches(input, pattern, flags?)
pub struct MatchesFunction;

impl FeelFunction for MatchesFunction {
    fn name(&self) -> &str {
        "matches"
    }
    fn human_friendly_name(&self) -> &str {
        "Matches"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "matches",
                vec![
                    ParameterInfo::required("input"),
                    ParameterInfo::required("pattern"),
                    ParameterInfo::optional("flags"),
                ],
            )
        });
        &SIG
    }
    fn documentation(&self) -> &str {
        "Regular expression search. Flags: `i` (case-insensitive), `s` (dot matches newline), `m` (multi-line), `x` (extended)."
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        let Some(strings) = string_args(self.name(), args)? else {
            return Ok(FeelValue::Null);
        };
        let mut builder = RegexBuilder::new(strings[1]);
        for flag in strings.get(2).copied().unwrap_or_default().chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                's' => builder.dot_matches_new_line(true),
                'm' => builder.multi_line(true),
                'x' => builder.ignore_whitespace(true),
                other => {
                    return Err(evaluation_error(self.name(), format!("unknown flag '{other}'")));
                }
            };
        }
        let regex = builder
            .build()
            .map_err(|e| evaluation_error(self.name(), e.to_string()))?;
        Ok(FeelValue::Boolean(regex.is_match(strings[0])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::ChronoProvider;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn call(f: &dyn FeelFunction, args: &[FeelValue]) -> FunctionResult<FeelValue> {
        f.evaluate(args, &FunctionContext::new(&ChronoProvider))
    }

    #[rstest]
    #[case(3, None, "obar")]
    #[case(3, Some(3), "oba")]
    #[case(-2, Some(1), "a")]
    #[case(-20, Some(2), "fo")]
    #[case(10, None, "")]
    fn test_substring(#[case] start: i64, #[case] length: Option<i64>, #[case] expected: &str) {
        let mut args = vec![FeelValue::from("foobar"), FeelValue::from(start)];
        if let Some(length) = length {
            args.push(FeelValue::from(length));
        }
        assert_eq!(call(&SubstringFunction, &args).unwrap(), FeelValue::from(expected));
    }

    #[test]
    fn test_case_and_length() {
        assert_eq!(call(&UpperCaseFunction, &[FeelValue::from("aBc")]).unwrap(), FeelValue::from("ABC"));
        assert_eq!(call(&LowerCaseFunction, &[FeelValue::from("aBc")]).unwrap(), FeelValue::from("abc"));
        assert_eq!(call(&StringLengthFunction, &[FeelValue::from("héllo")]).unwrap(), FeelValue::from(5));
        assert_eq!(call(&StringLengthFunction, &[FeelValue::Null]).unwrap(), FeelValue::Null);
        assert!(call(&StringLengthFunction, &[FeelValue::from(1)]).is_err());
    }

    #[test]
    fn test_predicates() {
        let s = FeelValue::from("foobar");
        assert_eq!(call(&ContainsFunction, &[s.clone(), FeelValue::from("oba")]).unwrap(), FeelValue::from(true));
        assert_eq!(call(&StartsWithFunction, &[s.clone(), FeelValue::from("bar")]).unwrap(), FeelValue::from(false));
        assert_eq!(call(&EndsWithFunction, &[s, FeelValue::from("bar")]).unwrap(), FeelValue::from(true));
    }

    #[test]
    fn test_matches() {
        let args = [FeelValue::from("FooBar"), FeelValue::from("^foo"), FeelValue::from("i")];
        assert_eq!(call(&MatchesFunction, &args).unwrap(), FeelValue::from(true));
        assert_eq!(
            call(&MatchesFunction, &args[..2]).unwrap(),
            FeelValue::from(false)
        );
        assert!(call(&MatchesFunction, &[FeelValue::from("x"), FeelValue::from("(")]).is_err());
    }
}
