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

//! Engine configuration

use crate::parser::DEFAULT_MAX_DEPTH;

/// Default cap on integers produced by iterating a range
pub const DEFAULT_RANGE_LIMIT: usize = 1_000_000;

/// Engine configuration for [`super::FeelEngine`]
///
/// # Examples
///
/// ```rust
/// use octofhir_feel::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_max_nesting_depth(64)
///     .with_cache_size(256);
/// assert!(config.enable_ast_cache);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum nesting of sub-expressions accepted by the parser.
    ///
    /// Deeper input is rejected as a syntax error instead of exhausting the
    /// stack. Default: 128
    pub max_nesting_depth: usize,

    /// Keep parsed ASTs keyed by source text. Default: true
    pub enable_ast_cache: bool,

    /// Maximum number of cached ASTs, least recently used evicted first.
    /// Default: 1000
    pub max_cache_size: usize,

    /// Maximum number of integers a range may expand to when iterated by
    /// `for`, `some` or `every`. Larger ranges give an `INVALID_OPERATION`
    /// warning. Default: 1000000
    pub max_range_items: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            enable_ast_cache: true,
            max_cache_size: 1000,
            max_range_items: DEFAULT_RANGE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Create new configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Enable or disable AST caching
    pub fn with_ast_cache(mut self, enabled: bool) -> Self {
        self.enable_ast_cache = enabled;
        self
    }

    /// Set maximum cache size
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.max_cache_size = size;
        self
    }

    /// Set the largest range that iteration will expand
    pub fn with_max_range_items(mut self, limit: usize) -> Self {
        self.max_range_items = limit;
        self
    }

    /// Configuration for tests: no cache, shallow nesting
    pub fn for_testing() -> Self {
        Self {
            max_nesting_depth: 32,
            enable_ast_cache: false,
            max_cache_size: 0,
            max_range_items: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_max_nesting_depth(10)
            .with_ast_cache(false)
            .with_cache_size(5)
            .with_max_range_items(7);
        assert_eq!(
            config,
            EngineConfig {
                max_nesting_depth: 10,
                enable_ast_cache: false,
                max_cache_size: 5,
                max_range_items: 7,
            }
        );
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_DEPTH);
        assert!(config.enable_ast_cache);
        assert!(!EngineConfig::for_testing().enable_ast_cache);
    }
}
