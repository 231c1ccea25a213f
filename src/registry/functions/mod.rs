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

//! Built-in function implementations

pub mod conversion;
pub mod list;
pub mod numeric;
pub mod temporal;
pub mod text;

use super::function::FunctionRegistry;

/// Register every built-in into `registry`
pub fn register_builtins(registry: &mut FunctionRegistry) {
    registry.register(temporal::DateFunction);
    registry.register(temporal::TimeFunction);
    registry.register(temporal::DateAndTimeFunction);
    registry.register(temporal::DurationFunction);
    registry.register(temporal::NowFunction);
    registry.register(temporal::TodayFunction);

    registry.register(conversion::StringFunction);
    registry.register(conversion::NumberFunction);
    registry.register(conversion::NotFunction);
    registry.register(conversion::IsDefinedFunction);

    registry.register(numeric::AbsFunction);
    registry.register(numeric::FloorFunction);
    registry.register(numeric::CeilingFunction);
    registry.register(numeric::DecimalFunction);

    registry.register(text::StringLengthFunction);
    registry.register(text::UpperCaseFunction);
    registry.register(text::LowerCaseFunction);
    registry.register(text::ContainsFunction);
    registry.register(text::StartsWithFunction);
    registry.register(text::EndsWithFunction);
    registry.register(text::SubstringFunction);
    registry.register(text::MatchesFunction);

    registry.register(list::CountFunction);
    registry.register(list::SumFunction);
    registry.register(list::MinFunction);
    registry.register(list::MaxFunction);
    registry.register(list::ListContainsFunction);
}
