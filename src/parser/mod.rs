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

//! FEEL expression parser
//!
//! Source text is tokenized up front and handed to a Pratt parser that
//! produces [`ExpressionNode`] trees for expressions and [`UnaryTests`] for
//! decision-table style input entries.

pub mod error;
pub mod pratt;
pub mod span;
pub mod tokenizer;

use rustc_hash::FxHashSet;

pub use error::{ParseError, ParseResult};
pub use pratt::{PrattParser, Precedence};
pub use span::Spanned;
pub use tokenizer::{Token, Tokenizer, tokenize};

use crate::ast::{ExpressionNode, UnaryTests};

/// Nesting limit used by the convenience entry points
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Names that may contain spaces, matched greedily while parsing.
///
/// A word sequence such as `date and time` can only be read as one name if
/// the parser knows about it beforehand; otherwise `and` is the boolean
/// operator. Built-in function names and multi-word context keys go here.
#[derive(Debug, Clone, Default)]
pub struct KnownNames {
    names: FxHashSet<String>,
    max_words: usize,
}

impl KnownNames {
    /// Empty set; only single-word names are recognized
    pub fn new() -> Self {
        Self {
            names: FxHashSet::default(),
            max_words: 1,
        }
    }

    /// Names of all built-in functions
    pub fn standard() -> Self {
        let mut names = Self::new();
        names.extend(crate::registry::standard_registry().names());
        names
    }

    /// Add a name, collapsing runs of whitespace into single spaces
    pub fn insert(&mut self, name: &str) {
        let words: Vec<&str> = name.split_whitespace().collect();
        if words.is_empty() {
            return;
        }
        self.max_words = self.max_words.max(words.len());
        self.names.insert(words.join(" "));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Word count of the longest known name
    pub fn max_words(&self) -> usize {
        self.max_words.max(1)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> Extend<S> for KnownNames {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name.as_ref());
        }
    }
}

/// Parse an expression using the built-in names only
pub fn parse_expression(input: &str) -> ParseResult<ExpressionNode> {
    parse_expression_with(input, &KnownNames::standard(), DEFAULT_MAX_DEPTH)
}

/// Parse an expression with caller-supplied names and nesting limit
pub fn parse_expression_with(
    input: &str,
    names: &KnownNames,
    max_depth: usize,
) -> ParseResult<ExpressionNode> {
    PrattParser::new(input, names, max_depth)?.parse()
}

/// Parse unary tests using the built-in names only
pub fn parse_unary_tests(input: &str) -> ParseResult<UnaryTests> {
    parse_unary_tests_with(input, &KnownNames::standard(), DEFAULT_MAX_DEPTH)
}

/// Parse unary tests with caller-supplied names and nesting limit
pub fn parse_unary_tests_with(
    input: &str,
    names: &KnownNames,
    max_depth: usize,
) -> ParseResult<UnaryTests> {
    PrattParser::new(input, names, max_depth)?.parse_unary_tests()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_normalize_whitespace() {
        let mut names = KnownNames::new();
        names.insert("  Applicant    Age ");
        assert!(names.contains("Applicant Age"));
        assert_eq!(names.max_words(), 2);

        names.insert("");
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_standard_names() {
        let names = KnownNames::standard();
        assert!(names.contains("date and time"));
        assert!(names.contains("string length"));
        assert!(names.max_words() >= 3);
    }

    #[test]
    fn test_entry_points() {
        assert!(parse_expression("1 + 1").is_ok());
        assert!(parse_expression("1 +").is_err());
        assert_eq!(parse_unary_tests("-").unwrap(), UnaryTests::Any);
    }
}
