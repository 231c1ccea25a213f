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

//! Evaluation warnings and results

use std::fmt;

use serde::Serialize;

use crate::core::FeelValue;

/// Category of a recoverable evaluation problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningType {
    /// Name not bound in any scope
    NoVariableFound,
    /// Path member missing from a context
    NoContextEntryFound,
    /// Operand or argument of the wrong kind
    InvalidType,
    /// Operation undefined for these operands (division by zero, overflow)
    InvalidOperation,
    /// Call to a name that is not a function
    UnknownFunction,
    /// A built-in failed
    FunctionInvocationFailure,
    /// Construct recognised but unsupported
    NotImplemented,
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoVariableFound => "NO_VARIABLE_FOUND",
            Self::NoContextEntryFound => "NO_CONTEXT_ENTRY_FOUND",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::UnknownFunction => "UNKNOWN_FUNCTION",
            Self::FunctionInvocationFailure => "FUNCTION_INVOCATION_FAILURE",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable problem met during evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub warning_type: WarningType,
    pub message: String,
}

impl Warning {
    pub fn new(warning_type: WarningType, message: impl Into<String>) -> Self {
        Self {
            warning_type,
            message: message.into(),
        }
    }

    pub fn invalid_type(message: impl Into<String>) -> Self {
        Self::new(WarningType::InvalidType, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(WarningType::InvalidOperation, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.warning_type, self.message)
    }
}

/// Value of an evaluation plus the warnings collected on the way, in order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EvaluationResult {
    pub value: FeelValue,
    pub warnings: Vec<Warning>,
}

impl EvaluationResult {
    pub fn new(value: FeelValue, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_warning_serializes_screaming_snake_case() {
        let result = EvaluationResult::new(
            FeelValue::Null,
            vec![Warning::new(WarningType::NoVariableFound, "No variable found for name <x>")],
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "value": null,
                "warnings": [{"type": "NO_VARIABLE_FOUND", "message": "No variable found for name <x>"}]
            })
        );
    }

    #[test]
    fn test_display_matches_serialized_name() {
        for ty in [
            WarningType::NoContextEntryFound,
            WarningType::FunctionInvocationFailure,
            WarningType::NotImplemented,
        ] {
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(ty.to_string()));
        }
    }
}
