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

//! Tree-walking interpreter
//!
//! Evaluation never fails: every recoverable problem is recorded as a
//! [`Warning`] and the offending sub-expression evaluates to `null`.
//! Name lookup walks the scope frames innermost first, then the caller's
//! context.

use log::trace;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::config::DEFAULT_RANGE_LIMIT;
use super::context::Context;
use super::operators::{self, OperatorResult};
use super::unary;
use super::warning::{Warning, WarningType};
use crate::ast::{
    Arguments, BinaryOperator, ExpressionNode, FunctionCallData, Iteration, LiteralValue,
    Quantifier, UnaryTests,
};
use crate::core::temporal::{DateResolver, Duration, TemporalProvider, TemporalValue, ZonedDateTime};
use crate::core::{ContextEntries, FeelError, FeelRange, FeelValue, RangeEndpoint};
use crate::registry::{FunctionContext, FunctionError, FunctionRegistry};

/// Evaluation state for one call
pub struct Interpreter<'a> {
    registry: &'a FunctionRegistry,
    provider: &'a dyn TemporalProvider,
    root: &'a ContextEntries,
    frames: Vec<ContextEntries>,
    warnings: Vec<Warning>,
    range_limit: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        context: &'a Context,
        registry: &'a FunctionRegistry,
        provider: &'a dyn TemporalProvider,
    ) -> Self {
        Self {
            registry,
            provider,
            root: context.entries(),
            frames: Vec::new(),
            warnings: Vec::new(),
            range_limit: DEFAULT_RANGE_LIMIT,
        }
    }

    /// Cap the number of integers a range may expand to during iteration
    pub fn with_range_limit(mut self, limit: usize) -> Self {
        self.range_limit = limit;
        self
    }

    /// Warnings collected so far, in order of occurrence
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    pub(crate) fn warn(&mut self, warning_type: WarningType, message: impl Into<String>) {
        self.push_warning(Warning::new(warning_type, message));
    }

    fn push_warning(&mut self, warning: Warning) {
        trace!("warning: {warning}");
        self.warnings.push(warning);
    }

    /// Record the warning of a failed operator and continue with null
    pub(crate) fn settle(&mut self, result: OperatorResult) -> FeelValue {
        match result {
            Ok(value) => value,
            Err(warning) => {
                self.push_warning(warning);
                FeelValue::Null
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<&FeelValue> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.root.get(name))
    }

    /// Run `f` with an extra innermost scope
    pub(crate) fn with_frame<T>(&mut self, frame: ContextEntries, f: impl FnOnce(&mut Self) -> T) -> T {
        self.frames.push(frame);
        let result = f(self);
        self.frames.pop();
        result
    }

    /// Evaluate unary tests against `input`
    pub fn evaluate_unary_tests(&mut self, tests: &UnaryTests, input: &FeelValue) -> FeelValue {
        unary::evaluate_unary_tests(self, tests, input)
    }

    /// Evaluate an expression
    pub fn evaluate(&mut self, node: &ExpressionNode) -> FeelValue {
        match node {
            ExpressionNode::Literal(literal) => match literal {
                LiteralValue::Null => FeelValue::Null,
                LiteralValue::Boolean(b) => FeelValue::Boolean(*b),
                LiteralValue::Number(n) => FeelValue::Number(*n),
                LiteralValue::String(s) => FeelValue::String(s.clone()),
            },
            ExpressionNode::TemporalLiteral(text) => self.temporal_literal(text),
            ExpressionNode::Name(name) => match self.lookup(name) {
                Some(value) => value.clone(),
                None => {
                    self.warn(
                        WarningType::NoVariableFound,
                        format!("No variable found for name <{name}>"),
                    );
                    FeelValue::Null
                }
            },
            ExpressionNode::Path { base, member } => {
                let base = self.evaluate(base);
                self.path(base, member)
            }
            ExpressionNode::Filter { base, condition } => {
                let base = self.evaluate(base);
                self.filter(base, condition)
            }
            ExpressionNode::Index { base, position } => match self.evaluate(base) {
                FeelValue::Null => FeelValue::Null,
                FeelValue::List(items) => index(&items, *position),
                other => index(std::slice::from_ref(&other), *position),
            },
            ExpressionNode::FunctionCall(call) => self.call(call),
            ExpressionNode::BinaryOp(data) => {
                let left = self.evaluate(&data.left);
                let right = self.evaluate(&data.right);
                match data.op {
                    BinaryOperator::And => operators::and(&left, &right),
                    BinaryOperator::Or => operators::or(&left, &right),
                    op if op.is_comparison() => {
                        let result = operators::comparison(op, &left, &right);
                        self.settle(result)
                    }
                    op => {
                        let result = operators::arithmetic(op, &left, &right);
                        self.settle(result)
                    }
                }
            }
            ExpressionNode::UnaryOp { op, operand } => {
                let operand = self.evaluate(operand);
                let result = operators::unary(*op, &operand);
                self.settle(result)
            }
            ExpressionNode::List(items) => {
                FeelValue::List(items.iter().map(|item| self.evaluate(item)).collect())
            }
            ExpressionNode::Context(entries) => {
                // later entries see the earlier ones
                self.frames.push(ContextEntries::new());
                for (key, expr) in entries {
                    let value = self.evaluate(expr);
                    if let Some(frame) = self.frames.last_mut() {
                        frame.insert(key.clone(), value);
                    }
                }
                FeelValue::Context(self.frames.pop().unwrap_or_default())
            }
            ExpressionNode::Range(data) => {
                let start = data.start.as_ref().map(|expr| RangeEndpoint {
                    value: self.evaluate(expr),
                    inclusive: data.start_inclusive,
                });
                let end = data.end.as_ref().map(|expr| RangeEndpoint {
                    value: self.evaluate(expr),
                    inclusive: data.end_inclusive,
                });
                FeelValue::Range(Box::new(FeelRange { start, end }))
            }
            ExpressionNode::Conditional(data) => match self.evaluate(&data.condition) {
                FeelValue::Boolean(true) => self.evaluate(&data.then_expr),
                _ => self.evaluate(&data.else_expr),
            },
            ExpressionNode::For(data) => {
                let mut results = Vec::new();
                self.iterate(&data.iterations, &data.body, &mut results);
                FeelValue::List(results)
            }
            ExpressionNode::Quantified(data) => {
                let mut verdicts = Vec::new();
                self.iterate(&data.iterations, &data.condition, &mut verdicts);
                let is_true = |v: &FeelValue| matches!(v, FeelValue::Boolean(true));
                FeelValue::Boolean(match data.quantifier {
                    Quantifier::Some => verdicts.iter().any(is_true),
                    Quantifier::Every => verdicts.iter().all(is_true),
                })
            }
            ExpressionNode::Between(data) => {
                let value = self.evaluate(&data.value);
                let low = self.evaluate(&data.low);
                let high = self.evaluate(&data.high);
                let above = operators::comparison(BinaryOperator::GreaterThanOrEqual, &value, &low);
                let above = self.settle(above);
                let below = operators::comparison(BinaryOperator::LessThanOrEqual, &value, &high);
                let below = self.settle(below);
                operators::and(&above, &below)
            }
            ExpressionNode::In { value, tests } => {
                let value = self.evaluate(value);
                unary::test_any(self, &value, tests)
            }
            ExpressionNode::InstanceOf { value, type_name } => {
                let value = self.evaluate(value);
                FeelValue::Boolean(is_instance_of(&value, type_name))
            }
        }
    }

    fn temporal_literal(&mut self, text: &str) -> FeelValue {
        let resolver = DateResolver::with_provider(self.provider);
        let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
        let resolved = if unsigned.starts_with(['P', 'p']) {
            resolver.duration_from_str(text).map(FeelValue::from)
        } else if text.chars().nth(2) == Some(':') {
            resolver.resolve(None, Some(text), None).map(FeelValue::from)
        } else {
            resolver.resolve(Some(text), None, None).map(FeelValue::from)
        };

        match resolved {
            Ok(value) => value,
            Err(FeelError::NotImplemented { message }) => {
                self.warn(
                    WarningType::NotImplemented,
                    format!("Temporal literal @\"{text}\" is not supported: {message}"),
                );
                FeelValue::Null
            }
            Err(err) => {
                self.warn(
                    WarningType::FunctionInvocationFailure,
                    format!("Failed to evaluate temporal literal @\"{text}\": {err}"),
                );
                FeelValue::Null
            }
        }
    }

    fn path(&mut self, base: FeelValue, member: &str) -> FeelValue {
        match base {
            FeelValue::Null => FeelValue::Null,
            FeelValue::Context(mut entries) => match entries.swap_remove(member) {
                Some(value) => value,
                None => {
                    self.warn(
                        WarningType::NoContextEntryFound,
                        format!("No context entry found with key <{member}>"),
                    );
                    FeelValue::Null
                }
            },
            FeelValue::List(items) => FeelValue::List(
                items
                    .into_iter()
                    .map(|item| self.path(item, member))
                    .collect(),
            ),
            FeelValue::Temporal(TemporalValue::DateTime(dt)) => {
                let value = date_time_property(&dt, member);
                self.property_or_warn(value, "date and time", member)
            }
            FeelValue::Temporal(TemporalValue::Duration(d)) => {
                let value = duration_property(&d, member);
                self.property_or_warn(value, "duration", member)
            }
            other => {
                self.warn(
                    WarningType::NoContextEntryFound,
                    format!("No property <{member}> on {}", other.type_name()),
                );
                FeelValue::Null
            }
        }
    }

    fn property_or_warn(&mut self, value: Option<FeelValue>, kind: &str, member: &str) -> FeelValue {
        value.unwrap_or_else(|| {
            self.warn(
                WarningType::NoContextEntryFound,
                format!("No property <{member}> on {kind}"),
            );
            FeelValue::Null
        })
    }

    fn filter(&mut self, base: FeelValue, condition: &ExpressionNode) -> FeelValue {
        let items = match base {
            FeelValue::Null => return FeelValue::Null,
            FeelValue::List(items) => items,
            other => vec![other],
        };

        let mut kept = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let mut frame = match item {
                FeelValue::Context(entries) => entries.clone(),
                _ => ContextEntries::new(),
            };
            frame.insert("item".to_string(), item.clone());
            match self.with_frame(frame, |me| me.evaluate(condition)) {
                FeelValue::Boolean(true) => kept.push(item.clone()),
                // a computed number selects by position
                FeelValue::Number(n) if i == 0 => return self.dynamic_index(&items, n),
                _ => {}
            }
        }
        FeelValue::List(kept)
    }

    fn dynamic_index(&mut self, items: &[FeelValue], position: Decimal) -> FeelValue {
        match position.fract().is_zero().then(|| position.to_i64()).flatten() {
            Some(position) => index(items, position),
            None => {
                self.warn(
                    WarningType::InvalidType,
                    format!("List index <{position}> is not an integer"),
                );
                FeelValue::Null
            }
        }
    }

    /// Evaluate `body` once per combination of iteration bindings
    fn iterate(&mut self, iterations: &[Iteration], body: &ExpressionNode, out: &mut Vec<FeelValue>) {
        let Some((first, rest)) = iterations.split_first() else {
            out.push(self.evaluate(body));
            return;
        };
        let Some(items) = self.iteration_domain(&first.domain) else {
            return;
        };
        for item in items {
            let mut frame = ContextEntries::new();
            frame.insert(first.name.clone(), item);
            self.frames.push(frame);
            self.iterate(rest, body, out);
            self.frames.pop();
        }
    }

    fn iteration_domain(&mut self, domain: &ExpressionNode) -> Option<Vec<FeelValue>> {
        match self.evaluate(domain) {
            FeelValue::Null => None,
            FeelValue::List(items) => Some(items),
            FeelValue::Range(range) => self.expand_range(&range),
            other => Some(vec![other]),
        }
    }

    /// Integers covered by a range with integer endpoints, in endpoint order
    fn expand_range(&mut self, range: &FeelRange) -> Option<Vec<FeelValue>> {
        let endpoint = |ep: &Option<RangeEndpoint>| {
            ep.as_ref().and_then(|ep| {
                ep.value
                    .as_number()
                    .filter(|n| n.fract().is_zero())
                    .and_then(|n| n.to_i64())
                    .map(|n| (n, ep.inclusive))
            })
        };
        let (Some((start, start_inclusive)), Some((end, end_inclusive))) =
            (endpoint(&range.start), endpoint(&range.end))
        else {
            self.warn(
                WarningType::InvalidType,
                format!("Can't iterate over range {range}"),
            );
            return None;
        };

        let step: i64 = if start <= end { 1 } else { -1 };
        let bounds = (|| {
            let first = if start_inclusive { start } else { start.checked_add(step)? };
            let last = if end_inclusive { end } else { end.checked_sub(step)? };
            let span = last.checked_sub(first)?.checked_mul(step)?;
            Some((first, span))
        })();
        let count = match bounds {
            Some((_, span)) if span < 0 => return Some(Vec::new()),
            Some((_, span)) => usize::try_from(span).ok().and_then(|s| s.checked_add(1)),
            None => None,
        };
        let (Some((first, _)), Some(count)) = (bounds, count.filter(|c| *c <= self.range_limit))
        else {
            self.warn(
                WarningType::InvalidOperation,
                format!(
                    "Range {range} expands to more than {} items",
                    self.range_limit
                ),
            );
            return None;
        };
        Some(
            (0..count)
                .map(|i| FeelValue::from(first + step * i as i64))
                .collect(),
        )
    }

    fn call(&mut self, call: &FunctionCallData) -> FeelValue {
        let registry = self.registry;
        let function = registry.get(&call.name);

        let args: Result<Vec<FeelValue>, FunctionError> = match &call.arguments {
            Arguments::Positional(args) => Ok(args.iter().map(|arg| self.evaluate(arg)).collect()),
            Arguments::Named(args) => {
                let named: Vec<(String, FeelValue)> = args
                    .iter()
                    .map(|(name, arg)| (name.clone(), self.evaluate(arg)))
                    .collect();
                match function {
                    Some(function) => function.signature().bind_named(named),
                    None => Ok(Vec::new()),
                }
            }
        };

        let Some(function) = function else {
            self.warn(
                WarningType::UnknownFunction,
                format!("Unknown function <{}>", call.name),
            );
            return FeelValue::Null;
        };

        let result = args.and_then(|args| {
            trace!("calling {} with {} argument(s)", call.name, args.len());
            function.evaluate(&args, &FunctionContext::new(self.provider))
        });
        match result {
            Ok(value) => value,
            Err(err @ FunctionError::NotImplemented { .. }) => {
                self.warn(WarningType::NotImplemented, err.to_string());
                FeelValue::Null
            }
            Err(err) => {
                self.warn(
                    WarningType::FunctionInvocationFailure,
                    format!("Failed to invoke function <{}>: {err}", call.name),
                );
                FeelValue::Null
            }
        }
    }
}

/// 1-based position, negative from the end; out of range is null
fn index(items: &[FeelValue], position: i64) -> FeelValue {
    let len = items.len() as i64;
    let offset = match position {
        0 => return FeelValue::Null,
        p if p > 0 => p - 1,
        p => len + p,
    };
    if offset < 0 || offset >= len {
        return FeelValue::Null;
    }
    items[offset as usize].clone()
}

fn date_time_property(dt: &ZonedDateTime, member: &str) -> Option<FeelValue> {
    Some(match member {
        "year" => FeelValue::from(i64::from(dt.year())),
        "month" => FeelValue::from(i64::from(dt.month())),
        "day" => FeelValue::from(i64::from(dt.day())),
        "weekday" => FeelValue::from(i64::from(dt.weekday())),
        "hour" => FeelValue::from(i64::from(dt.hour())),
        "minute" => FeelValue::from(i64::from(dt.minute())),
        "second" => FeelValue::from(i64::from(dt.second())),
        "timezone" => FeelValue::from(dt.zone().name()),
        "time offset" => {
            let seconds = dt.offset().local_minus_utc();
            Duration::from_milliseconds(f64::from(seconds) * 1000.0)
                .ok()
                .map_or(FeelValue::Null, FeelValue::from)
        }
        _ => return None,
    })
}

fn duration_property(d: &Duration, member: &str) -> Option<FeelValue> {
    Some(FeelValue::from(match member {
        "years" => d.years(),
        "months" => d.months(),
        "days" => d.days() + 7 * d.weeks(),
        "hours" => d.hours(),
        "minutes" => d.minutes(),
        "seconds" => d.seconds(),
        _ => return None,
    }))
}

fn is_instance_of(value: &FeelValue, type_name: &str) -> bool {
    match type_name {
        "Any" => !value.is_null(),
        "date" | "time" | "date and time" => value.as_date_time().is_some(),
        "function" => false,
        other => value.type_name() == other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::temporal::ChronoProvider;
    use crate::parser::{KnownNames, parse_expression_with};
    use crate::registry::standard_registry;
    use pretty_assertions::assert_eq;

    fn eval_with(input: &str, context: &Context) -> (FeelValue, Vec<Warning>) {
        let mut names = KnownNames::standard();
        names.extend(context.multi_word_keys());
        let ast = parse_expression_with(input, &names, 64).unwrap();
        let mut interpreter = Interpreter::new(context, standard_registry(), &ChronoProvider);
        let value = interpreter.evaluate(&ast);
        (value, interpreter.into_warnings())
    }

    fn eval(input: &str) -> FeelValue {
        let (value, warnings) = eval_with(input, &Context::new());
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        value
    }

    #[test]
    fn test_literals_and_arithmetic() {
        assert_eq!(eval("1 + 2 * 3"), FeelValue::from(7));
        assert_eq!(eval("\"a\" + \"b\""), FeelValue::from("ab"));
        assert_eq!(eval("-(2 + 3)"), FeelValue::from(-5));
        assert_eq!(eval("2 ** 3"), FeelValue::from(8));
    }

    #[test]
    fn test_context_entries_see_earlier_entries() {
        assert_eq!(eval("{a: 1, b: a + 1}.b"), FeelValue::from(2));
    }

    #[test]
    fn test_filter_and_index() {
        assert_eq!(eval("[1, 2, 3, 4][item > 2]"), eval("[3, 4]"));
        assert_eq!(eval("[1, 2, 3][-1]"), FeelValue::from(3));
        assert_eq!(eval("[1, 2, 3][5]"), FeelValue::Null);
        assert_eq!(eval("[{a: 1}, {a: 2}][a = 2].a"), eval("[2]"));
    }

    #[test]
    fn test_iteration() {
        assert_eq!(eval("for x in [1, 2] return x * 10"), eval("[10, 20]"));
        assert_eq!(eval("for i in 3..1 return i"), eval("[3, 2, 1]"));
        assert_eq!(eval("for x in [1, 2], y in [10] return x + y"), eval("[11, 12]"));
        assert_eq!(eval("some x in [1, 5] satisfies x > 3"), FeelValue::from(true));
        assert_eq!(eval("every x in [1, 5] satisfies x > 3"), FeelValue::from(false));
    }

    #[test]
    fn test_range_at_integer_limits() {
        let (value, warnings) = eval_with(
            "for i in -9223372036854775807..9223372036854775807 return i",
            &Context::new(),
        );
        assert_eq!(value, FeelValue::List(Vec::new()));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].warning_type, WarningType::InvalidOperation);

        assert_eq!(
            eval("for i in (9223372036854775806..9223372036854775807] return i"),
            eval("[9223372036854775807]")
        );
    }

    #[test]
    fn test_range_over_limit() {
        let (value, warnings) = eval_with("for i in 1..100000000000 return i", &Context::new());
        assert_eq!(value, FeelValue::List(Vec::new()));
        assert_eq!(warnings[0].warning_type, WarningType::InvalidOperation);

        let (value, warnings) = eval_with("some i in 1..100000000000 satisfies i = 1", &Context::new());
        assert_eq!(value, FeelValue::from(false));
        assert_eq!(warnings[0].warning_type, WarningType::InvalidOperation);

        let context = Context::new();
        let ast = parse_expression_with("for i in 1..5 return i", &KnownNames::standard(), 64).unwrap();
        let mut interpreter =
            Interpreter::new(&context, standard_registry(), &ChronoProvider).with_range_limit(4);
        assert_eq!(interpreter.evaluate(&ast), FeelValue::List(Vec::new()));
        assert_eq!(interpreter.warnings().len(), 1);
    }

    #[test]
    fn test_between_in_instance_of() {
        assert_eq!(eval("5 between 1 and 10"), FeelValue::from(true));
        assert_eq!(eval("5 in (1..5)"), FeelValue::from(false));
        assert_eq!(eval("5 in [1..5]"), FeelValue::from(true));
        assert_eq!(eval("5 in (< 3, > 4)"), FeelValue::from(true));
        assert_eq!(eval("\"x\" instance of string"), FeelValue::from(true));
        assert_eq!(eval("@\"2020-01-01\" instance of date and time"), FeelValue::from(true));
    }

    #[test]
    fn test_temporal_paths() {
        assert_eq!(eval("@\"2021-07-04T10:20:30@America/New_York\".hour"), FeelValue::from(10));
        assert_eq!(
            eval("@\"2021-07-04T10:20:30@America/New_York\".timezone"),
            FeelValue::from("America/New_York")
        );
        assert_eq!(eval("@\"P2DT3H\".hours"), FeelValue::from(3));
    }

    #[test]
    fn test_duration_literal_sign_and_case() {
        assert_eq!(eval("@\"p1d\""), eval("@\"P1D\""));
        assert_eq!(eval("@\"+P1D\""), eval("@\"P1D\""));
        assert_eq!(eval("@\"-pt2h\""), eval("@\"-PT2H\""));
        assert!(matches!(eval("@\"p1d\""), FeelValue::Temporal(TemporalValue::Duration(_))));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval("upper case(\"abc\")"), FeelValue::from("ABC"));
        assert_eq!(eval("substring(string: \"foobar\", start position: 4)"), FeelValue::from("bar"));
        assert_eq!(eval("not(true)"), FeelValue::from(false));
    }

    #[test]
    fn test_warnings() {
        let (value, warnings) = eval_with("missing.entry", &Context::new());
        assert_eq!(value, FeelValue::Null);
        assert_eq!(warnings[0].warning_type, WarningType::NoVariableFound);

        let (_, warnings) = eval_with("{a: 1}.b", &Context::new());
        assert_eq!(warnings[0].warning_type, WarningType::NoContextEntryFound);

        let (_, warnings) = eval_with("frobnicate(1)", &Context::new());
        assert_eq!(warnings[0].warning_type, WarningType::UnknownFunction);

        let (_, warnings) = eval_with("string length(1)", &Context::new());
        assert_eq!(warnings[0].warning_type, WarningType::FunctionInvocationFailure);

        let (_, warnings) = eval_with("@\"-0001-01-01\"", &Context::new());
        assert_eq!(warnings[0].warning_type, WarningType::NotImplemented);

        let (_, warnings) = eval_with("1 / 0", &Context::new());
        assert_eq!(warnings[0].warning_type, WarningType::InvalidOperation);
    }

    #[test]
    fn test_multi_word_context_key() {
        let context = Context::new().with("Applicant Age", 20);
        let (value, warnings) = eval_with("Applicant Age >= 18", &context);
        assert_eq!(value, FeelValue::from(true));
        assert!(warnings.is_empty());

        let context = Context::new().with("is eligible?", true).with("done?", false);
        let (value, warnings) = eval_with("is eligible? and not(done?)", &context);
        assert_eq!(value, FeelValue::from(true));
        assert!(warnings.is_empty());
    }
}
