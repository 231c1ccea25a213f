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

//! Evaluation engine with an AST cache

use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;
use parking_lot::Mutex;

use super::config::EngineConfig;
use super::context::Context;
use super::interpreter::Interpreter;
use super::warning::EvaluationResult;
use crate::ast::{ExpressionNode, UnaryTests};
use crate::core::temporal::{ChronoProvider, TemporalProvider};
use crate::core::Result;
use crate::parser::{KnownNames, parse_expression_with, parse_unary_tests_with};
use crate::registry::FunctionRegistry;

/// Parsed form depends on the source and on which multi-word names were known
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: String,
    names: Vec<String>,
}

/// LRU cache of one kind of parsed input
struct AstCache<T> {
    label: &'static str,
    entries: Option<Mutex<LruCache<CacheKey, Arc<T>>>>,
}

impl<T> AstCache<T> {
    fn new(label: &'static str, config: &EngineConfig) -> Self {
        let entries = NonZeroUsize::new(config.max_cache_size)
            .filter(|_| config.enable_ast_cache)
            .map(|size| Mutex::new(LruCache::new(size)));
        Self { label, entries }
    }

    fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |cache| cache.lock().len())
    }

    fn clear(&self) {
        if let Some(cache) = &self.entries {
            cache.lock().clear();
        }
    }

    fn get_or_parse(
        &self,
        source: &str,
        context: &Context,
        parse: impl FnOnce() -> Result<T>,
    ) -> Result<Arc<T>> {
        let Some(cache) = &self.entries else {
            return Ok(Arc::new(parse()?));
        };

        let mut names: Vec<String> = context.multi_word_keys().map(str::to_string).collect();
        names.sort_unstable();
        let key = CacheKey {
            source: source.to_string(),
            names,
        };

        if let Some(hit) = cache.lock().get(&key) {
            debug!("AST cache hit for {} <{source}>", self.label);
            return Ok(Arc::clone(hit));
        }
        debug!("AST cache miss for {} <{source}>", self.label);
        let parsed = Arc::new(parse()?);
        cache.lock().put(key, Arc::clone(&parsed));
        Ok(parsed)
    }
}

/// FEEL evaluation engine.
///
/// Holds the function registry, the temporal provider and an optional LRU
/// cache of parsed inputs. The engine is `Send + Sync`; the cache never
/// changes results.
///
/// # Examples
///
/// ```rust
/// use octofhir_feel::{Context, FeelEngine, FeelValue};
///
/// let engine = FeelEngine::new();
/// let context = Context::new().with("hello", "HELLO");
/// let result = engine.evaluate("hello", &context).unwrap();
/// assert_eq!(result.value, FeelValue::from("HELLO"));
/// assert!(result.warnings.is_empty());
/// ```
pub struct FeelEngine {
    config: EngineConfig,
    registry: Arc<FunctionRegistry>,
    provider: Arc<dyn TemporalProvider>,
    names: KnownNames,
    expressions: AstCache<ExpressionNode>,
    unary_tests: AstCache<UnaryTests>,
}

impl Default for FeelEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeelEngine {
    /// Engine with default configuration, all built-ins and the system clock
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, Arc::new(FunctionRegistry::standard()), Arc::new(ChronoProvider))
    }

    /// Replace the temporal provider, e.g. with a frozen clock
    pub fn with_provider(self, provider: Arc<dyn TemporalProvider>) -> Self {
        Self::build(self.config, self.registry, provider)
    }

    /// Replace the function registry
    pub fn with_registry(self, registry: FunctionRegistry) -> Self {
        Self::build(self.config, Arc::new(registry), self.provider)
    }

    fn build(
        config: EngineConfig,
        registry: Arc<FunctionRegistry>,
        provider: Arc<dyn TemporalProvider>,
    ) -> Self {
        let mut names = KnownNames::new();
        names.extend(registry.names());
        let expressions = AstCache::new("expression", &config);
        let unary_tests = AstCache::new("unary tests", &config);
        Self {
            config,
            registry,
            provider,
            names,
            expressions,
            unary_tests,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Number of cached parsed inputs
    pub fn cache_len(&self) -> usize {
        self.expressions.len() + self.unary_tests.len()
    }

    pub fn clear_cache(&self) {
        self.expressions.clear();
        self.unary_tests.clear();
    }

    /// Evaluate an expression against `context`.
    ///
    /// # Errors
    ///
    /// Only syntax errors are returned as `Err`; everything else is reported
    /// through [`EvaluationResult::warnings`].
    pub fn evaluate(&self, expression: &str, context: &Context) -> Result<EvaluationResult> {
        let ast = self.expressions.get_or_parse(expression, context, || {
            self.parse_expression(expression, context)
        })?;
        let mut interpreter = self.interpreter(context);
        let value = interpreter.evaluate(&ast);
        Ok(EvaluationResult::new(value, interpreter.into_warnings()))
    }

    /// Evaluate unary tests against `context["?"]`.
    ///
    /// # Errors
    ///
    /// Only syntax errors are returned as `Err`.
    pub fn unary_test(&self, expression: &str, context: &Context) -> Result<EvaluationResult> {
        let tests = self.unary_tests.get_or_parse(expression, context, || {
            let names = self.names_for(context);
            Ok(parse_unary_tests_with(
                expression,
                &names,
                self.config.max_nesting_depth,
            )?)
        })?;
        let input = context.input().cloned().unwrap_or_default();
        let mut interpreter = self.interpreter(context);
        let value = interpreter.evaluate_unary_tests(&tests, &input);
        Ok(EvaluationResult::new(value, interpreter.into_warnings()))
    }

    /// Parse an expression with the names known for `context`
    pub fn parse_expression(&self, expression: &str, context: &Context) -> Result<ExpressionNode> {
        let names = self.names_for(context);
        Ok(parse_expression_with(
            expression,
            &names,
            self.config.max_nesting_depth,
        )?)
    }

    fn names_for(&self, context: &Context) -> Cow<'_, KnownNames> {
        let mut extra = context.multi_word_keys().peekable();
        if extra.peek().is_none() {
            return Cow::Borrowed(&self.names);
        }
        let mut names = self.names.clone();
        names.extend(extra);
        Cow::Owned(names)
    }

    fn interpreter<'a>(&'a self, context: &'a Context) -> Interpreter<'a> {
        Interpreter::new(context, &self.registry, self.provider.as_ref())
            .with_range_limit(self.config.max_range_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeelError, FeelValue};
    use crate::core::temporal::{FixedClock, date};
    use crate::evaluator::WarningType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cache_reuses_parsed_input() {
        let engine = FeelEngine::new();
        let context = Context::new().with("x", 2);
        engine.evaluate("x * 2", &context).unwrap();
        engine.evaluate("x * 2", &context).unwrap();
        assert_eq!(engine.cache_len(), 1);

        engine.unary_test("x * 2", &context).unwrap();
        assert_eq!(engine.cache_len(), 2);

        // same source, each entry point keeps its own parsed form
        let with_input = context.clone().with("?", 4);
        let verdict = engine.unary_test("x * 2", &with_input).unwrap();
        assert_eq!(verdict.value, FeelValue::from(true));
        let product = engine.evaluate("x * 2", &with_input).unwrap();
        assert_eq!(product.value, FeelValue::from(4));
        assert_eq!(engine.cache_len(), 2);

        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_cache_key_includes_multi_word_names() {
        let engine = FeelEngine::new();
        let plain = Context::new().with("a", true).with("b", true);
        let joined = Context::new().with("a and b", 7);

        assert_eq!(engine.evaluate("a and b", &plain).unwrap().value, FeelValue::from(true));
        assert_eq!(engine.evaluate("a and b", &joined).unwrap().value, FeelValue::from(7));
    }

    #[test]
    fn test_range_limit_from_config() {
        let engine = FeelEngine::with_config(EngineConfig::for_testing().with_max_range_items(3));
        let context = Context::new();
        let small = engine.evaluate("for i in 1..3 return i", &context).unwrap();
        assert_eq!(small.value, FeelValue::from(vec![FeelValue::from(1), FeelValue::from(2), FeelValue::from(3)]));
        assert!(small.warnings.is_empty());

        let large = engine.evaluate("for i in 1..4 return i", &context).unwrap();
        assert_eq!(large.value, FeelValue::List(Vec::new()));
        assert_eq!(large.warnings[0].warning_type, WarningType::InvalidOperation);
    }

    #[test]
    fn test_disabled_cache() {
        let engine = FeelEngine::with_config(EngineConfig::for_testing());
        engine.evaluate("1", &Context::new()).unwrap();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn test_nesting_limit_is_a_syntax_error() {
        let engine = FeelEngine::with_config(EngineConfig::default().with_max_nesting_depth(8));
        let deep = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let err = engine.evaluate(&deep, &Context::new()).unwrap_err();
        assert!(matches!(err, FeelError::SyntaxError { .. }));
    }

    #[test]
    fn test_frozen_clock() {
        let now = date(Some("2024-02-29T12:00:00"), None, Some("UTC")).unwrap();
        let engine = FeelEngine::new().with_provider(Arc::new(FixedClock::new(now)));
        let result = engine.evaluate("today()", &Context::new()).unwrap();
        let midnight = date(Some("2024-02-29T00:00:00"), None, Some("UTC")).unwrap();
        assert_eq!(result.value, FeelValue::from(midnight));
    }
}
