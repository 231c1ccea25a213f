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

//! Unary test semantics
//!
//! The value under test is bound to `?`. A positive test passes when:
//! * `op endpoint`: the comparison `? op endpoint` holds
//! * the test evaluates to a list: some element matches (ranges by
//!   containment, other elements by equality)
//! * it evaluates to a range: the range contains `?`
//! * it evaluates to a boolean: that boolean, unless `?` is itself a boolean
//!   and the test never mentions `?`, in which case the two are compared
//! * anything else: `? = value`

use super::interpreter::Interpreter;
use super::operators;
use crate::ast::{BinaryOperator, ExpressionNode, PositiveUnaryTest, UnaryTests};
use crate::core::{ContextEntries, FeelValue};

pub(crate) fn evaluate_unary_tests(
    interpreter: &mut Interpreter<'_>,
    tests: &UnaryTests,
    input: &FeelValue,
) -> FeelValue {
    match tests {
        UnaryTests::Any => FeelValue::Boolean(true),
        UnaryTests::Positive(tests) => test_any(interpreter, input, tests),
        UnaryTests::Negated(tests) => match test_any(interpreter, input, tests) {
            FeelValue::Boolean(b) => FeelValue::Boolean(!b),
            _ => FeelValue::Null,
        },
    }
}

/// Three-valued disjunction of the tests; every test is evaluated
pub(crate) fn test_any(
    interpreter: &mut Interpreter<'_>,
    input: &FeelValue,
    tests: &[PositiveUnaryTest],
) -> FeelValue {
    let mut outcome = FeelValue::Boolean(false);
    for test in tests {
        let verdict = test_one(interpreter, input, test);
        outcome = operators::or(&outcome, &verdict);
    }
    outcome
}

fn test_one(interpreter: &mut Interpreter<'_>, input: &FeelValue, test: &PositiveUnaryTest) -> FeelValue {
    match test {
        PositiveUnaryTest::Comparison { op, endpoint } => {
            let endpoint = interpreter.evaluate(endpoint);
            let result = operators::comparison(*op, input, &endpoint);
            interpreter.settle(result)
        }
        PositiveUnaryTest::Expression(expr) => {
            let mut frame = ContextEntries::new();
            frame.insert("?".to_string(), input.clone());
            let value = interpreter.with_frame(frame, |me| me.evaluate(expr));

            if references_input(expr) {
                match value {
                    FeelValue::Boolean(_) | FeelValue::Null => return value,
                    _ => {}
                }
            }
            matches_value(interpreter, input, &value)
        }
    }
}

fn matches_value(interpreter: &mut Interpreter<'_>, input: &FeelValue, value: &FeelValue) -> FeelValue {
    match value {
        FeelValue::Boolean(b) if !matches!(input, FeelValue::Boolean(_)) => FeelValue::Boolean(*b),
        FeelValue::List(items) => {
            let mut outcome = FeelValue::Boolean(false);
            for item in items {
                let verdict = match item {
                    FeelValue::Range(range) => {
                        let result = operators::range_contains(range, input);
                        interpreter.settle(result)
                    }
                    other => equals(interpreter, input, other),
                };
                outcome = operators::or(&outcome, &verdict);
            }
            outcome
        }
        FeelValue::Range(range) => {
            let result = operators::range_contains(range, input);
            interpreter.settle(result)
        }
        other => equals(interpreter, input, other),
    }
}

fn equals(interpreter: &mut Interpreter<'_>, left: &FeelValue, right: &FeelValue) -> FeelValue {
    let result = operators::comparison(BinaryOperator::Equal, left, right);
    interpreter.settle(result)
}

/// Whether `?` occurs anywhere in `expr`
fn references_input(expr: &ExpressionNode) -> bool {
    use crate::ast::Arguments;

    match expr {
        ExpressionNode::Name(name) => name == "?",
        ExpressionNode::Literal(_) | ExpressionNode::TemporalLiteral(_) => false,
        ExpressionNode::Path { base, .. } | ExpressionNode::Index { base, .. } => references_input(base),
        ExpressionNode::Filter { base, condition } => {
            references_input(base) || references_input(condition)
        }
        ExpressionNode::FunctionCall(call) => match &call.arguments {
            Arguments::Positional(args) => any_references(args.iter()),
            Arguments::Named(args) => any_references(args.iter().map(|(_, arg)| arg)),
        },
        ExpressionNode::BinaryOp(data) => {
            references_input(&data.left) || references_input(&data.right)
        }
        ExpressionNode::UnaryOp { operand, .. } => references_input(operand),
        ExpressionNode::List(items) => any_references(items.iter()),
        ExpressionNode::Context(entries) => any_references(entries.iter().map(|(_, value)| value)),
        ExpressionNode::Range(data) => any_references(data.start.iter().chain(data.end.iter())),
        ExpressionNode::Conditional(data) => {
            references_input(&data.condition)
                || references_input(&data.then_expr)
                || references_input(&data.else_expr)
        }
        ExpressionNode::For(data) => {
            any_references(data.iterations.iter().map(|it| &it.domain)) || references_input(&data.body)
        }
        ExpressionNode::Quantified(data) => {
            any_references(data.iterations.iter().map(|it| &it.domain))
                || references_input(&data.condition)
        }
        ExpressionNode::Between(data) => {
            references_input(&data.value)
                || references_input(&data.low)
                || references_input(&data.high)
        }
        ExpressionNode::In { value, tests } => {
            references_input(value)
                || tests.iter().any(|test| match test {
                    PositiveUnaryTest::Comparison { endpoint, .. } => references_input(endpoint),
                    PositiveUnaryTest::Expression(expr) => references_input(expr),
                })
        }
        ExpressionNode::InstanceOf { value, .. } => references_input(value),
    }
}

fn any_references<'e>(mut nodes: impl Iterator<Item = &'e ExpressionNode>) -> bool {
    nodes.any(references_input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::ChronoProvider;
    use crate::evaluator::context::Context;
    use crate::parser::parse_unary_tests;
    use crate::registry::standard_registry;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(tests: &str, input: FeelValue) -> FeelValue {
        let context = Context::new().with("?", input.clone());
        let tests = parse_unary_tests(tests).unwrap();
        let mut interpreter = Interpreter::new(&context, standard_registry(), &ChronoProvider);
        interpreter.evaluate_unary_tests(&tests, &input)
    }

    #[rstest]
    #[case("-", FeelValue::from(1), FeelValue::from(true))]
    #[case("5", FeelValue::from(5), FeelValue::from(true))]
    #[case("< 5", FeelValue::from(3), FeelValue::from(true))]
    #[case("< 5, > 10", FeelValue::from(7), FeelValue::from(false))]
    #[case("[1..5]", FeelValue::from(5), FeelValue::from(true))]
    #[case("[1..5)", FeelValue::from(5), FeelValue::from(false))]
    #[case("not(1, 2)", FeelValue::from(3), FeelValue::from(true))]
    #[case("not(1, 2)", FeelValue::from(2), FeelValue::from(false))]
    #[case("\"a\", \"b\"", FeelValue::from("b"), FeelValue::from(true))]
    #[case("? > 3", FeelValue::from(4), FeelValue::from(true))]
    #[case("? = true", FeelValue::from(false), FeelValue::from(false))]
    #[case("true", FeelValue::from(false), FeelValue::from(false))]
    #[case("true", FeelValue::from(true), FeelValue::from(true))]
    #[case("[10, 20]", FeelValue::from(5), FeelValue::from(false))]
    #[case("[10, 20]", FeelValue::from(10), FeelValue::from(true))]
    #[case("[[1..3], 10]", FeelValue::from(2), FeelValue::from(true))]
    fn test_unary_tests(#[case] tests: &str, #[case] input: FeelValue, #[case] expected: FeelValue) {
        assert_eq!(run(tests, input), expected);
    }

    #[test]
    fn test_null_input() {
        assert_eq!(run("null", FeelValue::Null), FeelValue::from(true));
        assert_eq!(run("? > 3", FeelValue::Null), FeelValue::Null);
    }

    #[test]
    fn test_references_input() {
        let expr = crate::parser::parse_expression("count([?, 1]) > 1").unwrap();
        assert!(references_input(&expr));
        let expr = crate::parser::parse_expression("[1, 2]").unwrap();
        assert!(!references_input(&expr));
    }
}
