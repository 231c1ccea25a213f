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

//! Function signatures and named-argument binding

use std::fmt;

use serde::Serialize;

use super::function::{FunctionError, FunctionResult};
use crate::core::FeelValue;

/// Function signature with one or more parameter lists.
///
/// Built-ins such as `date` accept several forms (`date(from)`,
/// `date(year, month, day)`); each form is a separate parameter list and the
/// arity bounds cover all of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    /// Function name
    pub name: String,
    /// Parameter lists, one per accepted form
    pub forms: Vec<Vec<ParameterInfo>>,
    /// Minimum number of arguments over all forms
    pub min_arity: usize,
    /// Maximum number of arguments (None for variadic)
    pub max_arity: Option<usize>,
}

/// Parameter information for functions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterInfo {
    /// Parameter name, used for named arguments
    pub name: String,
    /// Whether this parameter may be omitted
    pub optional: bool,
}

impl ParameterInfo {
    /// Create a required parameter
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// Create an optional parameter
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

impl FunctionSignature {
    /// Create a signature with a single form
    pub fn new(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let min_arity = parameters.iter().filter(|p| !p.optional).count();
        let max_arity = Some(parameters.len());
        Self {
            name: name.into(),
            forms: vec![parameters],
            min_arity,
            max_arity,
        }
    }

    /// Create a signature accepting any number of trailing arguments
    pub fn variadic(name: impl Into<String>, parameters: Vec<ParameterInfo>) -> Self {
        let mut signature = Self::new(name, parameters);
        signature.max_arity = None;
        signature
    }

    /// Add an alternative parameter list
    pub fn with_form(mut self, parameters: Vec<ParameterInfo>) -> Self {
        let required = parameters.iter().filter(|p| !p.optional).count();
        self.min_arity = self.min_arity.min(required);
        self.max_arity = self.max_arity.map(|max| max.max(parameters.len()));
        self.forms.push(parameters);
        self
    }

    /// Check an argument count against the arity bounds
    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_arity && self.max_arity.is_none_or(|max| count <= max)
    }

    /// Order named arguments by the first form whose parameter names cover them.
    ///
    /// Omitted optional parameters in the middle of a form are passed as null;
    /// trailing ones are dropped.
    pub fn bind_named(&self, mut named: Vec<(String, FeelValue)>) -> FunctionResult<Vec<FeelValue>> {
        let form = self
            .forms
            .iter()
            .find(|form| {
                named.iter().all(|(name, _)| form.iter().any(|p| p.name == *name))
                    && form
                        .iter()
                        .filter(|p| !p.optional)
                        .all(|p| named.iter().any(|(name, _)| *name == p.name))
            })
            .ok_or_else(|| {
                let given: Vec<&str> = named.iter().map(|(name, _)| name.as_str()).collect();
                FunctionError::EvaluationError {
                    name: self.name.clone(),
                    message: format!("no form accepts parameters ({})", given.join(", ")),
                }
            })?;

        let mut args = Vec::with_capacity(form.len());
        for parameter in form {
            match named.iter().position(|(name, _)| *name == parameter.name) {
                Some(index) => args.push(named.swap_remove(index).1),
                None => args.push(FeelValue::Null),
            }
        }
        while args.len() > 1
            && matches!(args.last(), Some(FeelValue::Null))
            && form[args.len() - 1].optional
        {
            args.pop();
        }
        Ok(args)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, form) in self.forms.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{}(", self.name)?;
            for (j, param) in form.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(&param.name)?;
                if param.optional {
                    f.write_str("?")?;
                }
            }
            if self.max_arity.is_none() {
                f.write_str(", ...")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
