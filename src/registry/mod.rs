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

//! Built-in function registry

pub mod function;
pub mod functions;
pub mod signature;

use std::sync::LazyLock;

pub use function::{FeelFunction, FunctionContext, FunctionError, FunctionRegistry, FunctionResult};
pub use signature::{FunctionSignature, ParameterInfo};

static STANDARD: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::standard);

impl FunctionRegistry {
    /// Registry holding all built-ins
    pub fn standard() -> Self {
        let mut registry = Self::new();
        functions::register_builtins(&mut registry);
        registry
    }
}

/// Shared registry of built-ins, built on first use
pub fn standard_registry() -> &'static FunctionRegistry {
    &STANDARD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_multi_word_names() {
        let registry = standard_registry();
        for name in ["date and time", "string length", "is defined", "list contains", "now"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.len(), 27);
    }

    #[test]
    fn test_signatures_match_registered_names() {
        let registry = standard_registry();
        for name in registry.names() {
            let function = registry.get(name).unwrap();
            assert_eq!(function.signature().name, name);
        }
    }

    #[test]
    fn test_only_clock_readers_are_impure() {
        let registry = standard_registry();
        let mut impure: Vec<&str> = registry
            .names()
            .filter(|name| registry.get(name).is_some_and(|f| !f.is_pure()))
            .collect();
        impure.sort_unstable();
        assert_eq!(impure, vec!["now", "today"]);
    }

    #[test]
    fn test_builtins_have_display_names() {
        let registry = standard_registry();
        for name in registry.names() {
            let function = registry.get(name).unwrap();
            assert!(!function.human_friendly_name().is_empty(), "{name}");
        }
        let date = registry.get("date").unwrap();
        assert!(date.documentation().contains("midnight"));
    }
}
