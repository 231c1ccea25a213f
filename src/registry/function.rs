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

//! Function trait, evaluation context and registry

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;

use super::signature::FunctionSignature;
use crate::core::temporal::TemporalProvider;
use crate::core::{FeelError, FeelValue};

/// Result type for function operations
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Function evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Invalid number of arguments
    #[error("Function '{name}' expects {min}-{} arguments, got {actual}", max.map_or("∞".to_string(), |n| n.to_string()))]
    InvalidArity {
        /// Function name
        name: String,
        /// Minimum arguments
        min: usize,
        /// Maximum arguments (None for unlimited)
        max: Option<usize>,
        /// Actual arguments provided
        actual: usize,
    },

    /// Invalid argument type
    #[error("Function '{name}' argument {index} expects {expected}, got {actual}")]
    InvalidArgumentType {
        /// Function name
        name: String,
        /// Argument index (0-based)
        index: usize,
        /// Expected type
        expected: String,
        /// Actual type
        actual: String,
    },

    /// Runtime evaluation error
    #[error("Function '{name}' evaluation error: {message}")]
    EvaluationError {
        /// Function name
        name: String,
        /// Error message
        message: String,
    },

    /// The requested form exists in FEEL but is not supported here
    #[error("Function '{name}' not implemented: {message}")]
    NotImplemented {
        /// Function name
        name: String,
        /// What is missing
        message: String,
    },
}

impl FunctionError {
    /// Wrap a temporal construction fault raised inside function `name`
    pub fn from_feel(name: &str, err: FeelError) -> Self {
        match err {
            FeelError::NotImplemented { message } => Self::NotImplemented {
                name: name.to_string(),
                message,
            },
            other => Self::EvaluationError {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Context handed to built-ins
#[derive(Clone, Copy)]
pub struct FunctionContext<'a> {
    /// Calendar engine used by the temporal built-ins
    pub provider: &'a dyn TemporalProvider,
}

impl<'a> FunctionContext<'a> {
    pub fn new(provider: &'a dyn TemporalProvider) -> Self {
        Self { provider }
    }
}

/// Trait for FEEL built-in functions
pub trait FeelFunction: Send + Sync {
    /// Get the function name as written in expressions (may contain spaces)
    fn name(&self) -> &str;

    /// Get the human-friendly name for the function (for documentation)
    fn human_friendly_name(&self) -> &str;

    /// Get the function signature
    fn signature(&self) -> &FunctionSignature;

    /// Evaluate the function with positional arguments
    fn evaluate(&self, args: &[FeelValue], context: &FunctionContext<'_>) -> FunctionResult<FeelValue>;

    /// Get function documentation
    fn documentation(&self) -> &str {
        ""
    }

    /// Check if this function is pure (deterministic with no side effects)
    fn is_pure(&self) -> bool {
        true
    }

    /// Validate arguments before evaluation
    fn validate_args(&self, args: &[FeelValue]) -> FunctionResult<()> {
        let sig = self.signature();
        if !sig.accepts_arity(args.len()) {
            return Err(FunctionError::InvalidArity {
                name: self.name().to_string(),
                min: sig.min_arity,
                max: sig.max_arity,
                actual: args.len(),
            });
        }
        Ok(())
    }
}

/// Build an [`FunctionError::InvalidArgumentType`] for argument `index`
pub(crate) fn type_error(name: &str, index: usize, expected: &str, actual: &FeelValue) -> FunctionError {
    FunctionError::InvalidArgumentType {
        name: name.to_string(),
        index,
        expected: expected.to_string(),
        actual: actual.type_name().to_string(),
    }
}

/// Build an [`FunctionError::EvaluationError`]
pub(crate) fn evaluation_error(name: &str, message: impl Into<String>) -> FunctionError {
    FunctionError::EvaluationError {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Function registry keyed by the name used in expressions
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, Arc<dyn FeelFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name
    pub fn register<F: FeelFunction + 'static>(&mut self, function: F) {
        let name = function.name().to_string();
        self.functions.insert(name, Arc::new(function));
    }

    /// Get a function by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FeelFunction>> {
        self.functions.get(name)
    }

    /// Check if a function exists
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Names of all registered functions
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::signature::ParameterInfo;
    use std::sync::LazyLock;

    struct Echo;

    impl FeelFunction for Echo {
        fn name(&self) -> &str {
            "echo back"
        }
        fn human_friendly_name(&self) -> &str {
            "Echo Back"
        }
        fn signature(&self) -> &FunctionSignature {
            static SIG: LazyLock<FunctionSignature> = LazyLock::new(|| {
                FunctionSignature::new("echo back", vec![ParameterInfo::required("value")])
            });
            &SIG
        }
        fn evaluate(&self, args: &[FeelValue], _context: &FunctionContext<'_>) -> FunctionResult<FeelValue> {
            self.validate_args(args)?;
            Ok(args[0].clone())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FunctionRegistry::new();
        registry.register(Echo);
        assert!(registry.contains("echo back"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["echo back"]);

        let provider = crate::core::temporal::ChronoProvider;
        let ctx = FunctionContext::new(&provider);
        let f = registry.get("echo back").unwrap();
        assert_eq!(f.evaluate(&[FeelValue::from(1)], &ctx).unwrap(), FeelValue::from(1));
        assert!(matches!(
            f.evaluate(&[], &ctx),
            Err(FunctionError::InvalidArity { min: 1, max: Some(1), actual: 0, .. })
        ));
    }

    #[test]
    fn test_from_feel_keeps_not_implemented() {
        let err = FunctionError::from_feel("date", FeelError::not_implemented("negative years"));
        assert!(matches!(err, FunctionError::NotImplemented { .. }));
        let err = FunctionError::from_feel("date", FeelError::parse_error("bad"));
        assert!(matches!(err, FunctionError::EvaluationError { .. }));
    }
}
