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

//! FEEL expression evaluation core
//!
//! Parses and evaluates FEEL expressions and unary tests against a JSON-like
//! context, and resolves date, time and duration literals into zone-aware
//! temporal values.
//!
//! ```rust
//! use octofhir_feel::{Context, FeelValue, evaluate};
//!
//! let context = Context::new().with("amount", 120).with("limit", 100);
//! let result = evaluate("if amount > limit then \"review\" else \"ok\"", &context).unwrap();
//! assert_eq!(result.value, FeelValue::from("review"));
//! ```

pub mod ast;
pub mod core;
pub mod evaluator;
pub mod parser;
pub mod registry;

pub use crate::core::temporal::{
    ChronoProvider, Duration, DurationInput, FixedClock, TemporalProvider, TemporalValue, Zone,
    ZonedDateTime, date, duration, is_date_time, is_duration, ms,
};
pub use crate::core::{FeelError, FeelValue, Result};
pub use evaluator::{
    Context, EngineConfig, EvaluationResult, FeelEngine, Warning, WarningType, evaluate, unary_test,
};
pub use parser::{ParseError, parse_expression, parse_unary_tests};
pub use registry::FunctionRegistry;
