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

//! Expression AST node definitions

use std::fmt;

use rust_decimal::Decimal;
use smallvec::SmallVec;

use super::operator::{BinaryOperator, UnaryOperator};

/// AST representation of FEEL expressions
///
/// Large variants are boxed to keep the enum small.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionNode {
    /// Literal value (number, string, boolean, null)
    Literal(LiteralValue),

    /// Temporal literal (`@"2020-01-01"`, `@"P1D"`), resolved at evaluation time
    TemporalLiteral(String),

    /// Variable or built-in reference, possibly multi-word (`Applicant Age`)
    Name(String),

    /// Member access (`base.member`)
    Path {
        /// Base expression
        base: Box<ExpressionNode>,
        /// Member name
        member: String,
    },

    /// Filter (`list[item > 3]`)
    Filter {
        /// Filtered expression
        base: Box<ExpressionNode>,
        /// Per-item condition
        condition: Box<ExpressionNode>,
    },

    /// Positional access with a literal index (`list[1]`, `list[-1]`)
    Index {
        /// Indexed expression
        base: Box<ExpressionNode>,
        /// 1-based position, negative counts from the end
        position: i64,
    },

    /// Function call (boxed for size optimization)
    FunctionCall(Box<FunctionCallData>),

    /// Binary operation (boxed for size optimization)
    BinaryOp(Box<BinaryOpData>),

    /// Unary operation
    UnaryOp {
        /// The operator
        op: UnaryOperator,
        /// The operand
        operand: Box<ExpressionNode>,
    },

    /// List literal (`[1, 2, 3]`)
    List(Vec<ExpressionNode>),

    /// Context literal (`{a: 1, "b c": 2}`)
    Context(Vec<(String, ExpressionNode)>),

    /// Interval (`[1..10]`, `(a..b)`, `]1..5[`)
    Range(Box<RangeData>),

    /// `if c then a else b`
    Conditional(Box<ConditionalData>),

    /// `for x in xs return e`
    For(Box<ForData>),

    /// `some x in xs satisfies c` / `every x in xs satisfies c`
    Quantified(Box<QuantifiedData>),

    /// `v between a and b`
    Between(Box<BetweenData>),

    /// `v in tests`
    In {
        /// Tested value
        value: Box<ExpressionNode>,
        /// Positive unary tests, combined with three-valued or
        tests: Vec<PositiveUnaryTest>,
    },

    /// `v instance of type`
    InstanceOf {
        /// Checked value
        value: Box<ExpressionNode>,
        /// Type name, e.g. `number` or `date and time`
        type_name: String,
    },
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Number(Decimal),
    String(String),
}

/// Function call data
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallData {
    /// Function name
    pub name: String,
    /// Arguments
    pub arguments: Arguments,
}

/// Call arguments, either all positional or all named
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    Positional(SmallVec<[ExpressionNode; 4]>),
    Named(Vec<(String, ExpressionNode)>),
}

impl Arguments {
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(args) => args.len(),
            Self::Named(args) => args.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binary operation data
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOpData {
    /// The operator
    pub op: BinaryOperator,
    /// Left operand
    pub left: ExpressionNode,
    /// Right operand
    pub right: ExpressionNode,
}

/// Range data; a missing endpoint is unbounded
#[derive(Debug, Clone, PartialEq)]
pub struct RangeData {
    pub start: Option<ExpressionNode>,
    pub start_inclusive: bool,
    pub end: Option<ExpressionNode>,
    pub end_inclusive: bool,
}

/// Conditional expression data
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalData {
    /// Condition to test
    pub condition: ExpressionNode,
    /// Expression if true
    pub then_expr: ExpressionNode,
    /// Expression otherwise (false or null)
    pub else_expr: ExpressionNode,
}

/// One `name in domain` binding of a `for` or quantified expression
#[derive(Debug, Clone, PartialEq)]
pub struct Iteration {
    pub name: String,
    pub domain: ExpressionNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForData {
    pub iterations: Vec<Iteration>,
    pub body: ExpressionNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantifiedData {
    pub quantifier: Quantifier,
    pub iterations: Vec<Iteration>,
    pub condition: ExpressionNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BetweenData {
    pub value: ExpressionNode,
    pub low: ExpressionNode,
    pub high: ExpressionNode,
}

/// Top-level unary tests, matched against the implicit input `?`
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryTests {
    /// `-`, matches anything
    Any,
    /// `not(t1, t2)`
    Negated(Vec<PositiveUnaryTest>),
    /// `t1, t2`
    Positive(Vec<PositiveUnaryTest>),
}

/// A single positive unary test
#[derive(Debug, Clone, PartialEq)]
pub enum PositiveUnaryTest {
    /// `< 10`, `= "x"`, `!= null`
    Comparison {
        op: BinaryOperator,
        endpoint: ExpressionNode,
    },
    /// Any expression; lists test membership, ranges containment, booleans themselves
    Expression(ExpressionNode),
}

impl ExpressionNode {
    pub fn literal(value: LiteralValue) -> Self {
        Self::Literal(value)
    }

    pub fn number(value: impl Into<Decimal>) -> Self {
        Self::Literal(LiteralValue::Number(value.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(LiteralValue::String(value.into()))
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn binary(op: BinaryOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::BinaryOp(Box::new(BinaryOpData { op, left, right }))
    }

    pub fn function_call(name: impl Into<String>, args: Vec<ExpressionNode>) -> Self {
        Self::FunctionCall(Box::new(FunctionCallData {
            name: name.into(),
            arguments: Arguments::Positional(SmallVec::from_vec(args)),
        }))
    }

    pub fn path(base: ExpressionNode, member: impl Into<String>) -> Self {
        Self::Path {
            base: Box::new(base),
            member: member.into(),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_iterations(f: &mut fmt::Formatter<'_>, iterations: &[Iteration]) -> fmt::Result {
    for (i, it) in iterations.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{} in {}", it.name, it.domain)?;
    }
    Ok(())
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(lit) => lit.fmt(f),
            Self::TemporalLiteral(text) => write!(f, "@{text:?}"),
            Self::Name(name) => f.write_str(name),
            Self::Path { base, member } => write!(f, "{base}.{member}"),
            Self::Filter { base, condition } => write!(f, "{base}[{condition}]"),
            Self::Index { base, position } => write!(f, "{base}[{position}]"),
            Self::FunctionCall(call) => {
                write!(f, "{}(", call.name)?;
                match &call.arguments {
                    Arguments::Positional(args) => write_list(f, args)?,
                    Arguments::Named(args) => {
                        for (i, (name, arg)) in args.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{name}: {arg}")?;
                        }
                    }
                }
                f.write_str(")")
            }
            Self::BinaryOp(data) => write!(f, "({} {} {})", data.left, data.op, data.right),
            Self::UnaryOp { op, operand } => write!(f, "{op}{operand}"),
            Self::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Self::Context(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Range(range) => {
                f.write_str(if range.start_inclusive { "[" } else { "(" })?;
                if let Some(start) = &range.start {
                    write!(f, "{start}")?;
                }
                f.write_str("..")?;
                if let Some(end) = &range.end {
                    write!(f, "{end}")?;
                }
                f.write_str(if range.end_inclusive { "]" } else { ")" })
            }
            Self::Conditional(data) => write!(
                f,
                "if {} then {} else {}",
                data.condition, data.then_expr, data.else_expr
            ),
            Self::For(data) => {
                f.write_str("for ")?;
                write_iterations(f, &data.iterations)?;
                write!(f, " return {}", data.body)
            }
            Self::Quantified(data) => {
                f.write_str(match data.quantifier {
                    Quantifier::Some => "some ",
                    Quantifier::Every => "every ",
                })?;
                write_iterations(f, &data.iterations)?;
                write!(f, " satisfies {}", data.condition)
            }
            Self::Between(data) => {
                write!(f, "{} between {} and {}", data.value, data.low, data.high)
            }
            Self::In { value, tests } => {
                write!(f, "{value} in (")?;
                write_list(f, tests)?;
                f.write_str(")")
            }
            Self::InstanceOf { value, type_name } => write!(f, "{value} instance of {type_name}"),
        }
    }
}

impl fmt::Display for PositiveUnaryTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparison { op, endpoint } => write!(f, "{op} {endpoint}"),
            Self::Expression(expr) => expr.fmt(f),
        }
    }
}

impl fmt::Display for UnaryTests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("-"),
            Self::Negated(tests) => {
                f.write_str("not(")?;
                write_list(f, tests)?;
                f.write_str(")")
            }
            Self::Positive(tests) => write_list(f, tests),
        }
    }
}
