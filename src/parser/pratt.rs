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

//! Pratt parser for FEEL expressions and unary tests
//!
//! Precedence climbing over a pre-tokenized stream. Keeping the whole token
//! vector around lets the parser backtrack cheaply where the grammar is
//! ambiguous (`x in (1..5)` versus `x in (1, 5)`) and lets it assemble
//! multi-word names such as `date and time` by greedy longest match against
//! the set of known names.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use smallvec::SmallVec;

use super::KnownNames;
use super::error::{ParseError, ParseResult};
use super::span::Spanned;
use super::tokenizer::{Token, tokenize};
use crate::ast::{
    Arguments, BetweenData, BinaryOperator, ConditionalData, ExpressionNode, ForData,
    FunctionCallData, Iteration, LiteralValue, PositiveUnaryTest, QuantifiedData, Quantifier,
    RangeData, UnaryOperator, UnaryTests,
};

/// Operator precedence levels (higher = tighter binding)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Entry level: `if`, `for`, `some`, `every` bodies
    Lowest = 0,
    /// Logical OR
    Or = 1,
    /// Logical AND
    And = 2,
    /// Comparisons, `between`, `in`, `instance of`
    Comparison = 3,
    /// Additive operators (+, -)
    Additive = 4,
    /// Multiplicative operators (*, /)
    Multiplicative = 5,
    /// Exponentiation (**)
    Exponent = 6,
    /// Unary minus
    Unary = 7,
    /// Path, filter and call postfixes
    Postfix = 8,
}

impl Precedence {
    /// Get the next higher precedence level for left-associative operators
    pub const fn next_level(self) -> Self {
        match self {
            Precedence::Lowest => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Comparison,
            Precedence::Comparison => Precedence::Additive,
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative => Precedence::Exponent,
            Precedence::Exponent => Precedence::Unary,
            Precedence::Unary => Precedence::Postfix,
            Precedence::Postfix => Precedence::Postfix,
        }
    }
}

const TYPE_NAMES: &[&str] = &[
    "Any",
    "Null",
    "boolean",
    "context",
    "date",
    "date and time",
    "days and time duration",
    "function",
    "list",
    "number",
    "range",
    "string",
    "time",
    "years and months duration",
];

const MAX_TYPE_NAME_WORDS: usize = 4;

fn get_precedence(token: &Token<'_>) -> Option<Precedence> {
    match token {
        Token::Equal
        | Token::NotEqual
        | Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual
        | Token::Between
        | Token::In
        | Token::Instance => Some(Precedence::Comparison),
        Token::Plus | Token::Minus => Some(Precedence::Additive),
        Token::Star | Token::Slash => Some(Precedence::Multiplicative),
        Token::StarStar => Some(Precedence::Exponent),
        Token::And => Some(Precedence::And),
        Token::Or => Some(Precedence::Or),
        _ => None,
    }
}

fn token_to_binary_op(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::StarStar => Some(BinaryOperator::Power),
        Token::Equal => Some(BinaryOperator::Equal),
        Token::NotEqual => Some(BinaryOperator::NotEqual),
        Token::LessThan => Some(BinaryOperator::LessThan),
        Token::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
        Token::GreaterThan => Some(BinaryOperator::GreaterThan),
        Token::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
        Token::And => Some(BinaryOperator::And),
        Token::Or => Some(BinaryOperator::Or),
        _ => None,
    }
}

fn unary_test_operator(token: &Token<'_>) -> Option<BinaryOperator> {
    match token {
        Token::LessThan
        | Token::LessThanOrEqual
        | Token::GreaterThan
        | Token::GreaterThanOrEqual
        | Token::Equal
        | Token::NotEqual => token_to_binary_op(token),
        _ => None,
    }
}

/// Pratt parser over a token stream
pub struct PrattParser<'input, 'names> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    input_len: usize,
    names: &'names KnownNames,
    depth: usize,
    max_depth: usize,
    bracket_postfix: bool,
}

impl<'input, 'names> PrattParser<'input, 'names> {
    /// Tokenize `input` and prepare to parse it
    pub fn new(input: &'input str, names: &'names KnownNames, max_depth: usize) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            input_len: input.len(),
            names,
            depth: 0,
            max_depth,
            bracket_postfix: true,
        })
    }

    fn current(&self) -> Option<&Token<'input>> {
        self.tokens.get(self.pos).map(|t| &t.value)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'input>> {
        self.tokens.get(self.pos + offset).map(|t| &t.value)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.input_len, |t| t.start)
    }

    fn advance(&mut self) -> ParseResult<Spanned<Token<'input>>> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(ParseError::UnexpectedEndOfInput {
                position: self.input_len,
            }),
        }
    }

    fn check(&self, expected: &Token<'_>) -> bool {
        self.current() == Some(expected)
    }

    fn expect(&mut self, expected: Token<'static>) -> ParseResult<()> {
        match self.current() {
            Some(token) if *token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(ParseError::ExpectedToken {
                expected: format!("'{}'", expected.describe()),
                position: self.position(),
            }),
            None => Err(ParseError::UnexpectedEndOfInput {
                position: self.input_len,
            }),
        }
    }

    fn unexpected(&self) -> ParseError {
        match self.tokens.get(self.pos) {
            Some(token) => ParseError::UnexpectedToken {
                token: token.value.describe(),
                position: token.start,
            },
            None => ParseError::UnexpectedEndOfInput {
                position: self.input_len,
            },
        }
    }

    fn with_bracket_postfix<T>(
        &mut self,
        enabled: bool,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = self.bracket_postfix;
        self.bracket_postfix = enabled;
        let result = f(self);
        self.bracket_postfix = saved;
        result
    }

    /// Longest run of word tokens at the cursor that forms a known name.
    ///
    /// Falls back to the single word at the cursor.
    fn parse_name(&mut self) -> ParseResult<String> {
        let first = match self.current().and_then(Token::word) {
            Some(word) => word.to_string(),
            None => return Err(self.unexpected()),
        };

        let mut best = (1, first.clone());
        let mut candidate = first;
        for offset in 1..self.names.max_words() {
            let Some(word) = self.peek_at(offset).and_then(Token::word) else {
                break;
            };
            candidate.push(' ');
            candidate.push_str(word);
            if self.names.contains(&candidate) {
                best = (offset + 1, candidate.clone());
            }
        }

        self.pos += best.0;
        Ok(best.1)
    }

    /// Words up to (not including) `terminator`, joined by single spaces
    fn parse_words_until(&mut self, terminator: &Token<'_>) -> ParseResult<String> {
        let mut words = Vec::new();
        while let Some(word) = self.current().and_then(Token::word) {
            if self.check(terminator) && !words.is_empty() {
                break;
            }
            words.push(word.to_string());
            self.pos += 1;
        }
        if words.is_empty() {
            return Err(self.unexpected());
        }
        Ok(words.join(" "))
    }

    fn parse_number(&self, text: &str, position: usize) -> ParseResult<Decimal> {
        let normalized = if text.starts_with('.') {
            format!("0{text}")
        } else {
            text.to_string()
        };
        Decimal::from_str(&normalized).map_err(|_| ParseError::InvalidLiteral {
            literal_type: "number".to_string(),
            value: text.to_string(),
            position,
        })
    }

    fn parse_primary(&mut self) -> ParseResult<ExpressionNode> {
        let Some(token) = self.current().cloned() else {
            return Err(self.unexpected());
        };
        let start = self.position();

        match token {
            Token::Number(text) => {
                self.pos += 1;
                Ok(ExpressionNode::Literal(LiteralValue::Number(
                    self.parse_number(text, start)?,
                )))
            }
            Token::String(s) => {
                self.pos += 1;
                Ok(ExpressionNode::Literal(LiteralValue::String(s)))
            }
            Token::TemporalLiteral(s) => {
                self.pos += 1;
                Ok(ExpressionNode::TemporalLiteral(s))
            }
            Token::True => {
                self.pos += 1;
                Ok(ExpressionNode::Literal(LiteralValue::Boolean(true)))
            }
            Token::False => {
                self.pos += 1;
                Ok(ExpressionNode::Literal(LiteralValue::Boolean(false)))
            }
            Token::Null => {
                self.pos += 1;
                Ok(ExpressionNode::Literal(LiteralValue::Null))
            }
            Token::Question => {
                self.pos += 1;
                Ok(ExpressionNode::Name("?".to_string()))
            }
            Token::LeftParen => {
                self.pos += 1;
                self.parse_parenthesized()
            }
            Token::LeftBracket => {
                self.pos += 1;
                self.parse_bracketed()
            }
            Token::RightBracket => {
                self.pos += 1;
                let start = self.with_bracket_postfix(true, |p| {
                    p.parse_expression_with_precedence(Precedence::Lowest)
                })?;
                self.expect(Token::DotDot)?;
                self.parse_range_end(Some(start), false)
            }
            Token::LeftBrace => {
                self.pos += 1;
                self.parse_context()
            }
            Token::Not if matches!(self.peek_at(1), Some(Token::LeftParen)) => {
                self.pos += 1;
                self.parse_function_call("not".to_string())
            }
            Token::Name(_) => {
                let name = self.parse_name()?;
                if self.check(&Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(ExpressionNode::Name(name))
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// After `(`: a grouped expression or a range opened with `(`
    fn parse_parenthesized(&mut self) -> ParseResult<ExpressionNode> {
        let inner = self.with_bracket_postfix(true, |p| {
            p.parse_expression_with_precedence(Precedence::Lowest)
        })?;
        if self.check(&Token::DotDot) {
            self.pos += 1;
            return self.parse_range_end(Some(inner), false);
        }
        self.expect(Token::RightParen)?;
        Ok(inner)
    }

    /// After `[`: a list literal or a range opened with `[`
    fn parse_bracketed(&mut self) -> ParseResult<ExpressionNode> {
        if self.check(&Token::RightBracket) {
            self.pos += 1;
            return Ok(ExpressionNode::List(Vec::new()));
        }
        let first = self.with_bracket_postfix(true, |p| {
            p.parse_expression_with_precedence(Precedence::Lowest)
        })?;
        if self.check(&Token::DotDot) {
            self.pos += 1;
            return self.parse_range_end(Some(first), true);
        }

        let mut items = vec![first];
        while self.check(&Token::Comma) {
            self.pos += 1;
            items.push(self.with_bracket_postfix(true, |p| {
                p.parse_expression_with_precedence(Precedence::Lowest)
            })?);
        }
        self.expect(Token::RightBracket)?;
        Ok(ExpressionNode::List(items))
    }

    /// After `..`: the end endpoint and the closing delimiter
    fn parse_range_end(
        &mut self,
        start: Option<ExpressionNode>,
        start_inclusive: bool,
    ) -> ParseResult<ExpressionNode> {
        let end = self.with_bracket_postfix(false, |p| {
            p.parse_expression_with_precedence(Precedence::Lowest)
        })?;
        let end_inclusive = match self.current() {
            Some(Token::RightBracket) => true,
            Some(Token::RightParen) | Some(Token::LeftBracket) => false,
            _ => {
                return Err(ParseError::ExpectedToken {
                    expected: "range end ']', ')' or '['".to_string(),
                    position: self.position(),
                });
            }
        };
        self.pos += 1;
        Ok(ExpressionNode::Range(Box::new(RangeData {
            start,
            start_inclusive,
            end: Some(end),
            end_inclusive,
        })))
    }

    /// After `{`: context entries
    fn parse_context(&mut self) -> ParseResult<ExpressionNode> {
        let mut entries = Vec::new();
        if self.check(&Token::RightBrace) {
            self.pos += 1;
            return Ok(ExpressionNode::Context(entries));
        }
        loop {
            let key = match self.current().cloned() {
                Some(Token::String(s)) => {
                    self.pos += 1;
                    s
                }
                _ => self.parse_words_until(&Token::Colon)?,
            };
            self.expect(Token::Colon)?;
            let value = self.with_bracket_postfix(true, |p| {
                p.parse_expression_with_precedence(Precedence::Lowest)
            })?;
            entries.push((key, value));
            if self.check(&Token::Comma) {
                self.pos += 1;
                continue;
            }
            self.expect(Token::RightBrace)?;
            return Ok(ExpressionNode::Context(entries));
        }
    }

    /// Whether the cursor sits on `word+ :`, the start of a named argument
    fn at_named_argument(&self) -> bool {
        let mut offset = 0;
        while self.peek_at(offset).and_then(Token::word).is_some() {
            offset += 1;
        }
        offset > 0 && matches!(self.peek_at(offset), Some(Token::Colon))
    }

    fn parse_function_call(&mut self, name: String) -> ParseResult<ExpressionNode> {
        self.expect(Token::LeftParen)?;

        let arguments = if self.check(&Token::RightParen) {
            Arguments::Positional(SmallVec::new())
        } else if self.at_named_argument() {
            let mut named = Vec::new();
            loop {
                let param = self.parse_words_until(&Token::Colon)?;
                self.expect(Token::Colon)?;
                let value = self.with_bracket_postfix(true, |p| {
                    p.parse_expression_with_precedence(Precedence::Lowest)
                })?;
                named.push((param, value));
                if !self.check(&Token::Comma) {
                    break;
                }
                self.pos += 1;
            }
            Arguments::Named(named)
        } else {
            let mut positional = SmallVec::new();
            loop {
                positional.push(self.with_bracket_postfix(true, |p| {
                    p.parse_expression_with_precedence(Precedence::Lowest)
                })?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.pos += 1;
            }
            Arguments::Positional(positional)
        };

        self.expect(Token::RightParen)?;
        Ok(ExpressionNode::FunctionCall(Box::new(FunctionCallData {
            name,
            arguments,
        })))
    }

    fn parse_postfix(&mut self, mut left: ExpressionNode) -> ParseResult<ExpressionNode> {
        loop {
            match self.current() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let member = match self.current().and_then(Token::word) {
                        Some(word) => word.to_string(),
                        None => return Err(self.unexpected()),
                    };
                    self.pos += 1;
                    left = ExpressionNode::Path {
                        base: Box::new(left),
                        member,
                    };
                }
                Some(Token::LeftBracket) if self.bracket_postfix => {
                    self.pos += 1;
                    let condition = self.with_bracket_postfix(true, |p| {
                        p.parse_expression_with_precedence(Precedence::Lowest)
                    })?;
                    self.expect(Token::RightBracket)?;
                    left = match &condition {
                        ExpressionNode::Literal(LiteralValue::Number(n)) if n.fract().is_zero() => {
                            match n.to_i64() {
                                Some(position) => ExpressionNode::Index {
                                    base: Box::new(left),
                                    position,
                                },
                                None => return Err(ParseError::InvalidLiteral {
                                    literal_type: "index".to_string(),
                                    value: n.to_string(),
                                    position: self.position(),
                                }),
                            }
                        }
                        _ => ExpressionNode::Filter {
                            base: Box::new(left),
                            condition: Box::new(condition),
                        },
                    };
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_if(&mut self) -> ParseResult<ExpressionNode> {
        self.expect(Token::If)?;
        let condition = self.parse_expression_with_precedence(Precedence::Lowest)?;
        self.expect(Token::Then)?;
        let then_expr = self.parse_expression_with_precedence(Precedence::Lowest)?;
        self.expect(Token::Else)?;
        let else_expr = self.parse_expression_with_precedence(Precedence::Lowest)?;
        Ok(ExpressionNode::Conditional(Box::new(ConditionalData {
            condition,
            then_expr,
            else_expr,
        })))
    }

    fn parse_iterations(&mut self) -> ParseResult<Vec<Iteration>> {
        let mut iterations = Vec::new();
        loop {
            let name = self.parse_words_until(&Token::In)?;
            self.expect(Token::In)?;
            let mut domain = self.parse_expression_with_precedence(Precedence::Lowest)?;
            if self.check(&Token::DotDot) {
                self.pos += 1;
                let end = self.parse_expression_with_precedence(Precedence::Lowest)?;
                domain = ExpressionNode::Range(Box::new(RangeData {
                    start: Some(domain),
                    start_inclusive: true,
                    end: Some(end),
                    end_inclusive: true,
                }));
            }
            iterations.push(Iteration { name, domain });
            if !self.check(&Token::Comma) {
                return Ok(iterations);
            }
            self.pos += 1;
        }
    }

    fn parse_for(&mut self) -> ParseResult<ExpressionNode> {
        self.expect(Token::For)?;
        let iterations = self.parse_iterations()?;
        self.expect(Token::Return)?;
        let body = self.parse_expression_with_precedence(Precedence::Lowest)?;
        Ok(ExpressionNode::For(Box::new(ForData { iterations, body })))
    }

    fn parse_quantified(&mut self, quantifier: Quantifier) -> ParseResult<ExpressionNode> {
        self.pos += 1;
        let iterations = self.parse_iterations()?;
        self.expect(Token::Satisfies)?;
        let condition = self.parse_expression_with_precedence(Precedence::Lowest)?;
        Ok(ExpressionNode::Quantified(Box::new(QuantifiedData {
            quantifier,
            iterations,
            condition,
        })))
    }

    fn parse_prefix(&mut self) -> ParseResult<ExpressionNode> {
        match self.current() {
            Some(Token::Minus) => {
                self.pos += 1;
                let operand = self.parse_expression_with_precedence(Precedence::Unary)?;
                Ok(match operand {
                    ExpressionNode::Literal(LiteralValue::Number(n)) => {
                        ExpressionNode::Literal(LiteralValue::Number(-n))
                    }
                    operand => ExpressionNode::UnaryOp {
                        op: UnaryOperator::Negate,
                        operand: Box::new(operand),
                    },
                })
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Some) => self.parse_quantified(Quantifier::Some),
            Some(Token::Every) => self.parse_quantified(Quantifier::Every),
            _ => {
                let primary = self.parse_primary()?;
                self.parse_postfix(primary)
            }
        }
    }

    /// Precedence climbing entry point, guarded by the nesting limit
    pub fn parse_expression_with_precedence(
        &mut self,
        min_precedence: Precedence,
    ) -> ParseResult<ExpressionNode> {
        if self.depth >= self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
                position: self.position(),
            });
        }
        self.depth += 1;
        let result = self.parse_binary(min_precedence);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_precedence: Precedence) -> ParseResult<ExpressionNode> {
        let mut left = self.parse_prefix()?;

        loop {
            let Some(token) = self.current() else {
                break;
            };
            let Some(precedence) = get_precedence(token) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }

            let token = token.clone();
            match token {
                Token::Between => {
                    self.pos += 1;
                    let low = self.parse_expression_with_precedence(Precedence::Additive)?;
                    self.expect(Token::And)?;
                    let high = self.parse_expression_with_precedence(Precedence::Additive)?;
                    left = ExpressionNode::Between(Box::new(BetweenData {
                        value: left,
                        low,
                        high,
                    }));
                }
                Token::In => {
                    self.pos += 1;
                    let tests = self.parse_in_tests()?;
                    left = ExpressionNode::In {
                        value: Box::new(left),
                        tests,
                    };
                }
                Token::Instance => {
                    self.pos += 1;
                    self.expect(Token::Of)?;
                    let type_name = self.parse_type_name()?;
                    left = ExpressionNode::InstanceOf {
                        value: Box::new(left),
                        type_name,
                    };
                }
                _ => {
                    let Some(op) = token_to_binary_op(&token) else {
                        break;
                    };
                    self.pos += 1;
                    let right = self.parse_expression_with_precedence(precedence.next_level())?;
                    left = ExpressionNode::binary(op, left, right);
                }
            }
        }

        Ok(left)
    }

    /// Longest known type name at the cursor, else a single word
    fn parse_type_name(&mut self) -> ParseResult<String> {
        let mut words: Vec<&str> = Vec::new();
        let mut best: Option<(usize, String)> = None;
        while let Some(word) = self.peek_at(words.len()).and_then(Token::word) {
            words.push(word);
            let candidate = words.join(" ");
            if TYPE_NAMES.contains(&candidate.as_str()) {
                best = Some((words.len(), candidate));
            }
            if words.len() == MAX_TYPE_NAME_WORDS {
                break;
            }
        }
        let (consumed, name) = match best {
            Some(found) => found,
            None => match words.first() {
                Some(word) => (1, word.to_string()),
                None => return Err(self.unexpected()),
            },
        };
        self.pos += consumed;
        Ok(name)
    }

    /// Right-hand side of `in`: one positive unary test or a parenthesized list
    fn parse_in_tests(&mut self) -> ParseResult<Vec<PositiveUnaryTest>> {
        if self.check(&Token::LeftParen) {
            let checkpoint = self.pos;
            if let Ok(test) = self.parse_positive_unary_test(Precedence::Additive) {
                if !self.check(&Token::Comma) {
                    return Ok(vec![test]);
                }
            }
            self.pos = checkpoint + 1;
            let tests = self.parse_positive_unary_test_list(Precedence::Lowest)?;
            self.expect(Token::RightParen)?;
            return Ok(tests);
        }
        Ok(vec![self.parse_positive_unary_test(Precedence::Additive)?])
    }

    fn parse_positive_unary_test(
        &mut self,
        expression_precedence: Precedence,
    ) -> ParseResult<PositiveUnaryTest> {
        if let Some(op) = self.current().and_then(unary_test_operator) {
            self.pos += 1;
            let endpoint = self.parse_expression_with_precedence(Precedence::Additive)?;
            return Ok(PositiveUnaryTest::Comparison { op, endpoint });
        }
        Ok(PositiveUnaryTest::Expression(
            self.parse_expression_with_precedence(expression_precedence)?,
        ))
    }

    fn parse_positive_unary_test_list(
        &mut self,
        expression_precedence: Precedence,
    ) -> ParseResult<Vec<PositiveUnaryTest>> {
        let mut tests = vec![self.parse_positive_unary_test(expression_precedence)?];
        while self.check(&Token::Comma) {
            self.pos += 1;
            tests.push(self.parse_positive_unary_test(expression_precedence)?);
        }
        Ok(tests)
    }

    fn expect_end(&self) -> ParseResult<()> {
        if self.pos < self.tokens.len() {
            return Err(self.unexpected());
        }
        Ok(())
    }

    /// Parse a complete expression
    pub fn parse(&mut self) -> ParseResult<ExpressionNode> {
        let expr = self.parse_expression_with_precedence(Precedence::Lowest)?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse complete unary tests
    pub fn parse_unary_tests(&mut self) -> ParseResult<UnaryTests> {
        if self.tokens.len() == 1 && self.check(&Token::Minus) {
            self.pos += 1;
            return Ok(UnaryTests::Any);
        }

        if self.check(&Token::Not) && matches!(self.peek_at(1), Some(Token::LeftParen)) {
            let checkpoint = self.pos;
            self.pos += 2;
            let negated = self
                .parse_positive_unary_test_list(Precedence::Lowest)
                .and_then(|tests| self.expect(Token::RightParen).map(|_| tests));
            match negated {
                Ok(tests) if self.pos == self.tokens.len() => return Ok(UnaryTests::Negated(tests)),
                _ => self.pos = checkpoint,
            }
        }

        let tests = self.parse_positive_unary_test_list(Precedence::Lowest)?;
        self.expect_end()?;
        Ok(UnaryTests::Positive(tests))
    }
}
