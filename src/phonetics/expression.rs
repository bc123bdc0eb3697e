//! Feature expressions.
//!
//! An expression is a bracketed boolean formula over feature classes and
//! literal segments that evaluates to a [`SegmentSet`]:
//!
//! ```text
//! [+stop,-voiced]         stops that are not voiced
//! [+vowel|a]              every vowel, plus the literal segment `a`
//! [+consonant,-[+nasal]]  NOT applied to a bracketed sub-expression
//! ```
//!
//! | syntax      | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `+name`     | members of feature `name`                 |
//! | `-name`     | universe minus members of `name`          |
//! | `-[ .. ]`   | NOT: universe minus the bracketed set     |
//! | `,`         | AND: intersection                         |
//! | `\|`        | OR: union                                 |
//! | `[ .. ]`    | grouping                                  |
//!
//! Precedence is NOT > AND > OR; the binary operators are left-associative.
//!
//! Parsing is a plain shunting-yard pass into postfix; evaluation walks the
//! postfix with a value stack. Both run on fresh local stacks, so an
//! [`Expression`] holds no state between evaluations.

use std::fmt;

use super::{FeatureIndex, SegmentSet};
use crate::ExpressionError;

/// Set operators, closed over the three the language supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Not,
    And,
    Or,
}

impl Operator {
    pub const fn precedence(self) -> u8 {
        match self {
            Operator::Not => 2,
            Operator::And => 1,
            Operator::Or => 0,
        }
    }

    pub const fn arity(self) -> usize {
        match self {
            Operator::Not => 1,
            Operator::And | Operator::Or => 2,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Operator::Not => "-",
            Operator::And => ",",
            Operator::Or => "|",
        }
    }

    /// Pop this operator's operands off `stack` and push the result.
    fn apply(self, stack: &mut Vec<SegmentSet>, universe: &SegmentSet) -> Result<(), ExpressionError> {
        let underflow = || ExpressionError::OperandUnderflow { operator: self };
        let result = match self {
            Operator::Not => {
                let operand = stack.pop().ok_or_else(underflow)?;
                universe.difference(&operand).cloned().collect()
            }
            Operator::And => {
                let right = stack.pop().ok_or_else(underflow)?;
                let left = stack.pop().ok_or_else(underflow)?;
                left.intersection(&right).cloned().collect()
            }
            Operator::Or => {
                let right = stack.pop().ok_or_else(underflow)?;
                let mut left = stack.pop().ok_or_else(underflow)?;
                left.extend(right);
                left
            }
        };
        stack.push(result);
        Ok(())
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A value-producing token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// `+name` (members) or `-name` (complement).
    Feature { name: String, negated: bool },
    /// A literal segment.
    Segment(String),
    /// `#`. Tokenized so it can be reported, never evaluable.
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Operand(Operand),
    Operator(Operator),
    Open,
    Close,
}

/// One step of a postfix program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostfixItem {
    Operand(Operand),
    Operator(Operator),
}

/// Split `source` into tokens.
///
/// Literal segments are matched with the index's longest-first segmenter, so
/// `[aa|a]` yields two distinct literals when both are segments.
pub fn tokenize(source: &str, index: &FeatureIndex) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while let Some(c) = source[offset..].chars().next() {
        let rest = &source[offset..];
        if c.is_whitespace() {
            offset += c.len_utf8();
            continue;
        }

        let (token, len) = match c {
            '[' => (Token::Open, 1),
            ']' => (Token::Close, 1),
            ',' => (Token::Operator(Operator::And), 1),
            '|' => (Token::Operator(Operator::Or), 1),
            '#' => (Token::Operand(Operand::Boundary), 1),
            '-' if rest[1..].trim_start().starts_with('[') => (Token::Operator(Operator::Not), 1),
            '+' | '-' => {
                let caps = regex!(r"\A[+-](\w[\w-]*)").captures(rest).ok_or_else(|| {
                    ExpressionError::UnknownToken { expression: source.to_string(), offset }
                })?;
                let name = caps[1].to_string();
                let len = caps[0].len();
                (Token::Operand(Operand::Feature { name, negated: c == '-' }), len)
            }
            _ => match index.segmenter().segment_at(rest) {
                Some(segment) => (Token::Operand(Operand::Segment(segment.to_string())), segment.len()),
                None => return Err(ExpressionError::UnknownToken { expression: source.to_string(), offset }),
            },
        };

        tokens.push(token);
        offset += len;
    }

    Ok(tokens)
}

/// Shunting-yard: reorder `tokens` into postfix.
///
/// ```text
/// [+a|+b,+c]  ->  +a +b +c , |
/// -[+a],+b    ->  +a - +b ,
/// ```
fn to_postfix(source: &str, tokens: Vec<Token>) -> Result<Vec<PostfixItem>, ExpressionError> {
    let mut output = Vec::with_capacity(tokens.len());
    // Holds `Operator` and `Open` tokens only.
    let mut pending: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Operand(operand) => output.push(PostfixItem::Operand(operand)),
            Token::Operator(op) => {
                // Prefix operators wait for their operand.
                if op.arity() > 1 {
                    while let Some(Token::Operator(top)) = pending.last() {
                        if top.precedence() < op.precedence() {
                            break;
                        }
                        output.push(PostfixItem::Operator(*top));
                        pending.pop();
                    }
                }
                pending.push(Token::Operator(op));
            }
            Token::Open => pending.push(Token::Open),
            Token::Close => loop {
                match pending.pop() {
                    Some(Token::Operator(op)) => output.push(PostfixItem::Operator(op)),
                    Some(_) => break,
                    None => return Err(ExpressionError::UnmatchedClose(source.to_string())),
                }
            },
        }
    }

    while let Some(token) = pending.pop() {
        match token {
            Token::Operator(op) => output.push(PostfixItem::Operator(op)),
            _ => return Err(ExpressionError::UnmatchedOpen(source.to_string())),
        }
    }

    Ok(output)
}

/// A parsed feature expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    postfix: Vec<PostfixItem>,
}

impl Expression {
    /// Tokenize and parse `source`. Feature names are checked at evaluation.
    pub fn parse(source: &str, index: &FeatureIndex) -> Result<Self, ExpressionError> {
        let tokens = tokenize(source, index)?;
        let postfix = to_postfix(source, tokens)?;
        Ok(Expression { source: source.to_string(), postfix })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn postfix(&self) -> &[PostfixItem] {
        &self.postfix
    }

    /// Evaluate against `index` into a concrete (possibly empty) segment set.
    pub fn evaluate(&self, index: &FeatureIndex) -> Result<SegmentSet, ExpressionError> {
        let universe = index.universe();
        let mut stack: Vec<SegmentSet> = Vec::new();

        for item in &self.postfix {
            match item {
                PostfixItem::Operand(Operand::Feature { name, negated }) => {
                    let members =
                        index.segments_of(name).ok_or_else(|| ExpressionError::UnknownFeature(name.clone()))?;
                    let set = if *negated { universe.difference(members).cloned().collect() } else { members.clone() };
                    stack.push(set);
                }
                PostfixItem::Operand(Operand::Segment(segment)) => stack.push(SegmentSet::from([segment.clone()])),
                PostfixItem::Operand(Operand::Boundary) => return Err(ExpressionError::BoundaryInExpression),
                PostfixItem::Operator(op) => op.apply(&mut stack, universe)?,
            }
        }

        match stack.len() {
            1 => Ok(stack.pop().unwrap_or_default()),
            depth => Err(ExpressionError::StackDepth { depth }),
        }
    }

    /// Parse and evaluate in one go.
    pub fn eval(source: &str, index: &FeatureIndex) -> Result<SegmentSet, ExpressionError> {
        Self::parse(source, index)?.evaluate(index)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
