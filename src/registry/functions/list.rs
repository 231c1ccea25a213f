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

//! List built-ins: `count`, `sum`, `min`, `max`, `list contains`

use std::cmp::Ordering;
use std::sync::LazyLock;

use crate::core::FeelValue;
use crate::evaluator::operators::{compare, values_equal};
use crate::registry::function::{
    FeelFunction, FunctionContext, FunctionResult, evaluation_error, type_error,
};
use crate::registry::signature::{FunctionSignature, ParameterInfo};

/// Items of a `list` argument; a single non-list value counts as a one-item list
fn list_items<'a>(value: &'a FeelValue) -> &'a [FeelValue] {
    match value {
        FeelValue::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Items for variadic aggregates: `f([a, b])` and `f(a, b)` are the same call
fn aggregate_items(args: &[FeelValue]) -> &[FeelValue] {
    match args {
        [FeelValue::List(items)] => items,
        _ => args,
    }
}

/// count(list)
pub struct CountFunction;

impl FeelFunction for CountFunction {
    fn name(&self) -> &str {
        "count"
    }
    fn human_friendly_name(&self) -> &str {
        "Count"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::new("count", vec![ParameterInfo::required("list")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        match &args[0] {
            FeelValue::Null => Ok(FeelValue::Null),
            FeelValue::List(items) => Ok(FeelValue::from(items.len() as i64)),
            other => Err(type_error(self.name(), 0, "list", other)),
        }
    }
}

/// sum(list) / sum(n1, n2, ...)
pub struct SumFunction;

impl FeelFunction for SumFunction {
    fn name(&self) -> &str {
        "sum"
    }
    fn human_friendly_name(&self) -> &str {
        "Sum"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::variadic("sum", vec![ParameterInfo::required("list")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        let items = aggregate_items(args);
        if items.is_empty() {
            return Ok(FeelValue::Null);
        }
        let mut total = rust_decimal::Decimal::ZERO;
        for (index, item) in items.iter().enumerate() {
            let n = item
                .as_number()
                .ok_or_else(|| type_error(self.name(), index, "number", item))?;
            total = total
                .checked_add(n)
                .ok_or_else(|| evaluation_error(self.name(), "numeric overflow"))?;
        }
        Ok(FeelValue::Number(total))
    }
}

fn extreme(name: &str, args: &[FeelValue], wanted: Ordering) -> FunctionResult<FeelValue> {
    let items = aggregate_items(args);
    let Some((first, rest)) = items.split_first() else {
        return Ok(FeelValue::Null);
    };
    let mut best = first;
    for item in rest {
        match compare(item, best) {
            Some(order) if order == wanted => best = item,
            Some(_) => {}
            None => {
                return Err(evaluation_error(
                    name,
                    format!("cannot compare {} with {}", item.type_name(), best.type_name()),
                ));
            }
        }
    }
    Ok(best.clone())
}

/// min(list) / min(c1, c2, ...)
pub struct MinFunction;

impl FeelFunction for MinFunction {
    fn name(&self) -> &str {
        "min"
    }
    fn human_friendly_name(&self) -> &str {
        "Minimum"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::variadic("min", vec![ParameterInfo::required("list")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        extreme(self.name(), args, Ordering::Less)
    }
}

/// max(list) / max(c1, c2, ...)
pub struct MaxFunction;

impl FeelFunction for MaxFunction {
    fn name(&self) -> &str {
        "max"
    }
    fn human_friendly_name(&self) -> &str {
        "Maximum"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> =
            LazyLock::new(|| FunctionSignature::variadic("max", vec![ParameterInfo::required("list")]));
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        extreme(self.name(), args, Ordering::Greater)
    }
}

/// list contains(list, element)
pub struct ListContainsFunction;

impl FeelFunction for ListContainsFunction {
    fn name(&self) -> &str {
        "list contains"
    }
    fn human_friendly_name(&self) -> &str {
        "List Contains"
    }
    fn signature(&self) -> &FunctionSignature {
        static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
            FunctionSignature::new(
                "list contains",
                vec![ParameterInfo::required("list"), ParameterInfo::required("element")],
            )
        });
        &SIG
    }

    fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
        self.validate_args(args)?;
        if args[0].is_null() {
            return Ok(FeelValue::Null);
        }
        let found = list_items(&args[0])
            .iter()
            .any(|item| values_equal(item, &args[1]) == Some(true));
        Ok(FeelValue::Boolean(found))
    }
}
