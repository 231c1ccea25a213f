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

//! Unary tests evaluated against the implicit input `?`

use octofhir_feel::{Context, FeelError, FeelValue, WarningType, date, unary_test};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn test_input(tests: &str, input: impl Into<FeelValue>) -> FeelValue {
    let context = Context::new().with("?", input);
    let result = unary_test(tests, &context).unwrap();
    assert!(result.warnings.is_empty(), "unexpected warnings: {:?}", result.warnings);
    result.value
}

#[rstest]
#[case("[10, 20]", 5, false)]
#[case("[10, 20]", 10, true)]
#[case("< 10", 5, true)]
#[case(">= 10", 5, false)]
#[case("[1..10]", 10, true)]
#[case("(1..10)", 10, false)]
#[case("]1..10]", 1, false)]
#[case("1, 2, 3", 2, true)]
#[case("not(1, 2, 3)", 2, false)]
#[case("not(< 0)", 4, true)]
#[case("-", 42, true)]
#[case("? * 2 = 10", 5, true)]
#[case("? > 3 and ? < 5", 4, true)]
fn test_number_input(#[case] tests: &str, #[case] input: i32, #[case] expected: bool) {
    assert_eq!(test_input(tests, input), FeelValue::from(expected));
}

#[rstest]
#[case("\"gold\", \"silver\"", "silver", true)]
#[case("not(\"bronze\")", "gold", true)]
#[case("starts with(?, \"go\")", "gold", true)]
#[case("string length(?) > 10", "gold", false)]
fn test_string_input(#[case] tests: &str, #[case] input: &str, #[case] expected: bool) {
    assert_eq!(test_input(tests, input), FeelValue::from(expected));
}

#[test]
fn test_boolean_input_compares_for_equality() {
    assert_eq!(test_input("true", true), FeelValue::from(true));
    assert_eq!(test_input("true", false), FeelValue::from(false));
    assert_eq!(test_input("false", false), FeelValue::from(true));
}

#[test]
fn test_temporal_input() {
    let input = date(Some("2021-06-15T12:00:00Z"), None, None).unwrap();
    assert_eq!(
        test_input("[@\"2021-01-01\"..@\"2021-12-31\"]", input),
        FeelValue::from(true)
    );
    assert_eq!(test_input("< @\"2021-06-01\"", input), FeelValue::from(false));
}

#[test]
fn test_context_variables_are_visible() {
    let context = Context::new().with("?", 7).with("threshold", 5);
    let result = unary_test("> threshold", &context).unwrap();
    assert_eq!(result.value, FeelValue::from(true));
}

#[test]
fn test_missing_input_is_null() {
    let result = unary_test("null", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::from(true));
    let result = unary_test("< 10", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::Null);
}

#[test]
fn test_mismatched_kinds_warn() {
    let context = Context::new().with("?", "text");
    let result = unary_test("< 10", &context).unwrap();
    assert_eq!(result.value, FeelValue::Null);
    assert_eq!(result.warnings[0].warning_type, WarningType::InvalidType);
}

#[test]
fn test_unary_syntax_error() {
    let err = unary_test("< ", &Context::new().with("?", 1)).unwrap_err();
    assert!(matches!(err, FeelError::SyntaxError { .. }));
}
