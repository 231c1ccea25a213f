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

//! FEEL expression evaluation
//!
//! The [`FeelEngine`] parses and evaluates expressions and unary tests.
//! [`evaluate`] and [`unary_test`] use a shared engine with the default
//! configuration and the system clock.

mod config;
mod context;
mod engine;
mod interpreter;
pub(crate) mod operators;
mod unary;
mod warning;

use std::sync::LazyLock;

pub use config::{DEFAULT_RANGE_LIMIT, EngineConfig};
pub use context::Context;
pub use engine::FeelEngine;
pub use interpreter::Interpreter;
pub use warning::{EvaluationResult, Warning, WarningType};

use crate::core::Result;

static DEFAULT_ENGINE: LazyLock<FeelEngine> = LazyLock::new(FeelEngine::new);

/// Evaluate a FEEL expression with the shared default engine.
///
/// # Errors
///
/// Returns [`FeelError::SyntaxError`](crate::FeelError::SyntaxError) when the
/// expression does not parse. Runtime problems become warnings.
pub fn evaluate(expression: &str, context: &Context) -> Result<EvaluationResult> {
    DEFAULT_ENGINE.evaluate(expression, context)
}

/// Evaluate unary tests against `context["?"]` with the shared default engine.
///
/// # Errors
///
/// Returns [`FeelError::SyntaxError`](crate::FeelError::SyntaxError) when the
/// tests do not parse.
pub fn unary_test(expression: &str, context: &Context) -> Result<EvaluationResult> {
    DEFAULT_ENGINE.unary_test(expression, context)
}
