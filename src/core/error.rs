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

//! Error types for the FEEL evaluation core
//!
//! Two channels exist: [`FeelError`] is returned by the temporal constructors
//! and for syntax faults, while recoverable evaluation problems are reported as
//! [`crate::evaluator::Warning`] values alongside a result.

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, FeelError>;

/// Faults raised by literal construction and expression parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeelError {
    /// Two mutually exclusive inputs were supplied together
    #[error("conflicting input: {message}")]
    ConflictError {
        /// Which inputs collided
        message: String,
    },

    /// The input uses a form that is recognized but unsupported
    #[error("not implemented: {message}")]
    NotImplemented {
        /// Unsupported form
        message: String,
    },

    /// A literal could not be parsed into a temporal value
    #[error("invalid literal: {message}")]
    ParseError {
        /// Parser diagnostic
        message: String,
    },

    /// Temporal arithmetic that has no defined result
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the failed operation
        message: String,
    },

    /// The expression text is not valid FEEL
    #[error("syntax error at position {position}: {message}")]
    SyntaxError {
        /// Byte offset into the expression
        position: usize,
        /// Parser diagnostic
        message: String,
    },
}

impl FeelError {
    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::ConflictError {
            message: message.into(),
        }
    }

    /// Create a not-implemented error
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented {
            message: message.into(),
        }
    }

    /// Create a literal parse error
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create an invalid-operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a syntax error
    pub fn syntax_error(position: usize, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            position,
            message: message.into(),
        }
    }

    /// Whether this is a syntax fault
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::SyntaxError { .. })
    }
}

impl From<crate::parser::ParseError> for FeelError {
    fn from(err: crate::parser::ParseError) -> Self {
        Self::SyntaxError {
            position: err.position(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FeelError::conflict("<zone> already provided");
        assert_eq!(err.to_string(), "conflicting input: <zone> already provided");

        let err = FeelError::syntax_error(4, "unexpected token");
        assert_eq!(err.to_string(), "syntax error at position 4: unexpected token");
        assert!(err.is_syntax_error());
        assert!(!FeelError::not_implemented("negative date").is_syntax_error());
    }
}
