//! Phonetic feature engine.
//!
//! This module owns everything that turns a phonetics document and a list of
//! rule strings into word-to-word transformations.
//!
//! ## How the parts work together
//!
//! ```text
//! segment tree ── FeatureIndex::build              (index.rs)
//!                   - feature -> segments, segment -> features
//!                   - Segmenter: longest-first alternation over the universe
//!                               │
//! "[+stop,-voiced]" ── Expression::parse           (expression.rs)
//!                   - tokenize -> shunting-yard -> postfix
//!                   - evaluate -> SegmentSet
//!                               │
//! "p->b/[+vowel]_[+vowel]" ── CompiledRule::compile (rule.rs)
//!                   - split on `/`, `->`, `_`
//!                   - expand expressions into alternations
//!                   - prefix / target / suffix patterns
//!                               │
//! word ── CompiledRule::apply                      (resolve.rs)
//!                   - left-to-right, non-overlapping matches
//!                   - output expressions resolved by feature distance
//!                               │
//! word ── Change::apply                            (change.rs)
//!                   - rules in declaration order, traced
//! ```
//!
//! Everything built here is immutable once constructed. A [`FeatureIndex`] and
//! the rules compiled against it can be shared freely between threads.
//!
//! ## Debugging
//!
//! Set `GLOSSA_DEBUG_RULES=1` to print compiled patterns and every rule
//! application to stderr.

use std::collections::BTreeSet;

#[path = "phonetics/change.rs"]
mod change;
#[path = "phonetics/expression.rs"]
mod expression;
#[path = "phonetics/index.rs"]
mod index;
#[path = "phonetics/resolve.rs"]
mod resolve;
#[path = "phonetics/rule.rs"]
mod rule;


pub use change::Change;
pub use expression::{Expression, Operand, Operator, PostfixItem, Token, tokenize};
pub use index::{FeatureIndex, Segmenter};
pub use rule::{Atom, Class, CompiledRule, Context, OutputItem};

/// A set of segments. Ordered so that diagnostics and candidate lists are stable.
pub type SegmentSet = BTreeSet<String>;

/// The feature names a segment carries.
pub type FeatureSet = BTreeSet<String>;
