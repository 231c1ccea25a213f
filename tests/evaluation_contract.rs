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

//! Behaviour of `evaluate` as seen by a host application

use std::sync::Arc;
use std::thread;

use octofhir_feel::{
    Context, EngineConfig, FeelEngine, FeelError, FeelValue, FixedClock, WarningType, date,
    evaluate,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

fn warning_types(expression: &str, context: &Context) -> Vec<WarningType> {
    evaluate(expression, context)
        .unwrap()
        .warnings
        .iter()
        .map(|w| w.warning_type)
        .collect()
}

#[test]
fn test_variable_lookup() {
    let context = Context::new().with("hello", "HELLO");
    let result = evaluate("hello", &context).unwrap();
    assert_eq!(result.value, FeelValue::from("HELLO"));
    assert!(result.warnings.is_empty());
}

#[test]
fn test_unknown_variable_is_a_warning() {
    let result = evaluate("unknownVar", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::Null);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].warning_type, WarningType::NoVariableFound);
}

#[rstest]
#[case("false and unknownVar", FeelValue::from(false))]
#[case("unknownVar and false", FeelValue::from(false))]
#[case("true and unknownVar", FeelValue::Null)]
#[case("true or unknownVar", FeelValue::from(true))]
#[case("false or unknownVar", FeelValue::Null)]
fn test_three_valued_logic_keeps_warnings(#[case] expression: &str, #[case] expected: FeelValue) {
    let result = evaluate(expression, &Context::new()).unwrap();
    assert_eq!(result.value, expected);
    assert_eq!(
        warning_types(expression, &Context::new()),
        vec![WarningType::NoVariableFound]
    );
}

#[test]
fn test_warnings_keep_evaluation_order() {
    assert_eq!(
        warning_types("[first, {a: 1}.b, nope(1)]", &Context::new()),
        vec![
            WarningType::NoVariableFound,
            WarningType::NoContextEntryFound,
            WarningType::UnknownFunction,
        ]
    );
}

#[rstest]
#[case("1 +")]
#[case("if true then 1")]
#[case("[1, 2")]
#[case("@\"2020-01-01")]
fn test_syntax_errors_escape(#[case] expression: &str) {
    let err = evaluate(expression, &Context::new()).unwrap_err();
    assert!(matches!(err, FeelError::SyntaxError { .. }), "{err:?}");
}

#[test]
fn test_type_mismatch_is_a_warning() {
    let result = evaluate("1 < \"a\"", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::Null);
    assert_eq!(result.warnings[0].warning_type, WarningType::InvalidType);
}

#[test]
fn test_failing_temporal_builtin() {
    let result = evaluate("date(\"2020-01-01\", \"x\")", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::Null);
    assert_eq!(
        result.warnings[0].warning_type,
        WarningType::FunctionInvocationFailure
    );

    let result = evaluate("date(\"not a date\")", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::Null);
    assert_eq!(
        result.warnings[0].warning_type,
        WarningType::FunctionInvocationFailure
    );
}

#[test]
fn test_temporal_arithmetic() {
    let context = Context::new();
    let result = evaluate("@\"2020-01-01\" + @\"P1D\" = @\"2020-01-02\"", &context).unwrap();
    assert_eq!(result.value, FeelValue::from(true));

    let result = evaluate("@\"2020-01-03\" - @\"2020-01-01\" = @\"P2D\"", &context).unwrap();
    assert_eq!(result.value, FeelValue::from(true));

    let result = evaluate("date(\"2020-03-01\") > date(\"2020-02-29\")", &context).unwrap();
    assert_eq!(result.value, FeelValue::from(true));
}

#[test]
fn test_json_context() {
    let context = Context::from_json(&json!({
        "Applicant": {"Age": 34, "Name": "Ann"},
        "Loan amount": 125000.5,
        "flags": [true, false, null]
    }))
    .unwrap();

    let result = evaluate(
        "if Applicant.Age >= 18 and Loan amount < 200000 then \"eligible\" else \"no\"",
        &context,
    )
    .unwrap();
    assert_eq!(result.value, FeelValue::from("eligible"));
    assert!(result.warnings.is_empty());

    let result = evaluate("count(flags[item = true])", &context).unwrap();
    assert_eq!(result.value, FeelValue::from(1));
}

#[test]
fn test_result_serializes_for_hosts() {
    let result = evaluate("[1, 2.5, \"x\", missing]", &Context::new()).unwrap();
    assert_eq!(
        serde_json::to_value(&result).unwrap()["value"],
        json!([1, 2.5, "x", null])
    );
    assert_eq!(
        serde_json::to_value(&result).unwrap()["warnings"][0]["type"],
        json!("NO_VARIABLE_FOUND")
    );
}

#[test]
fn test_engine_with_frozen_clock() {
    let now = date(Some("2024-01-15T08:30:00"), None, Some("Europe/Paris")).unwrap();
    let engine = FeelEngine::with_config(EngineConfig::for_testing())
        .with_provider(Arc::new(FixedClock::new(now)));

    let result = engine.evaluate("now().hour", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::from(8));
    let result = engine.evaluate("today().hour", &Context::new()).unwrap();
    assert_eq!(result.value, FeelValue::from(0));
}

#[test]
fn test_engine_is_shared_across_threads() {
    let engine = Arc::new(FeelEngine::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let context = Context::new().with("n", i);
                engine.evaluate("n * n", &context).unwrap().value
            })
        })
        .collect();

    let squares: Vec<FeelValue> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        squares,
        vec![
            FeelValue::from(0),
            FeelValue::from(1),
            FeelValue::from(4),
            FeelValue::from(9),
        ]
    );
}
