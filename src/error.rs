//! Error types.
//!
//! Every subsystem reports through its own `thiserror` enum so callers can match
//! on the failure they care about; [`Error`] wraps them all for code that just
//! wants to propagate with `?`.
//!
//! None of these are recovered internally: a failing compile aborts loading, a
//! failing rule application aborts that word.

use std::path::PathBuf;

use thiserror::Error;

use crate::phonetics::Operator;

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Sample(#[from] SampleError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Problems found while loading the phonetics or language documents.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {document} document: {source}")]
    Json {
        document: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A node of the segment tree is neither a mapping nor a list of strings.
    #[error("malformed segment tree at `{path}`: expected a mapping or a list of segment strings")]
    MalformedSegmentTree { path: String },

    #[error("empty segment literal at `{path}`")]
    EmptySegment { path: String },

    /// The longest-first alternation over the inventory does not compile.
    #[error("segment inventory of {segments} segments does not compile into a pattern: {source}")]
    SegmentPattern {
        segments: usize,
        #[source]
        source: regex::Error,
    },

    #[error("syllable-count distribution is empty")]
    EmptySyllableDistribution,

    #[error("invalid weight {weight} in {location}")]
    InvalidWeight { location: String, weight: f64 },

    #[error("start state `{0}` has no transitions")]
    UnknownStartState(String),

    #[error("max_syllable_steps must be at least 1")]
    ZeroStepLimit,

    #[error("change `{change}`, rule `{rule}`: {source}")]
    Rule {
        change: String,
        rule: String,
        #[source]
        source: RuleError,
    },
}

/// Failures while tokenizing, parsing or evaluating a feature expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error("unknown token at offset {offset} in `{expression}`")]
    UnknownToken { expression: String, offset: usize },

    #[error("unknown feature `{0}`")]
    UnknownFeature(String),

    #[error("unmatched `[` in `{0}`")]
    UnmatchedOpen(String),

    #[error("unmatched `]` in `{0}`")]
    UnmatchedClose(String),

    #[error("operator `{operator}` is missing an operand")]
    OperandUnderflow { operator: Operator },

    #[error("expression leaves {depth} values on the stack, expected exactly 1")]
    StackDepth { depth: usize },

    #[error("word boundary `#` cannot appear inside an expression")]
    BoundaryInExpression,
}

/// Structural problems in a rule string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("expected at most one `/`, found {0}")]
    ContextSeparators(usize),

    #[error("expected exactly one `->`, found {0}")]
    ChangeArrows(usize),

    #[error("expected exactly one `_` in the context, found {0}")]
    TargetMarkers(usize),

    #[error("`#` may only open a prefix or close a suffix")]
    MisplacedBoundary,

    #[error("`_` marks the target and is only valid in the context")]
    StrayTarget,

    #[error("back-references are only valid on the output side")]
    MisplacedBackReference,

    #[error("output position {position} has no input segment to resolve against")]
    UnpairedOutput { position: usize },

    #[error("back-reference \\{index} is out of range ({available} input segments)")]
    BackReference { index: usize, available: usize },

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("compiled pattern rejected: {0}")]
    Pattern(String),
}

impl From<regex::Error> for RuleError {
    fn from(err: regex::Error) -> Self {
        RuleError::Pattern(err.to_string())
    }
}

/// Failures resolving an output expression while applying a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("rule `{rule}`: output expression `{expression}` has no candidates")]
    EmptyOutput { rule: String, expression: String },

    #[error(
        "rule `{rule}`: output for `{input}` is ambiguous, {candidates:?} are all at feature distance {distance}"
    )]
    AmbiguousOutput { rule: String, input: String, candidates: Vec<String>, distance: usize },
}

/// Precondition violations of the weighted sampler.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("cannot sample from an empty candidate list")]
    Empty,

    #[error("total weight {0} is not a positive finite number")]
    NonPositiveTotal(f64),
}

/// Failures while generating a single word.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("state `{0}` has no outgoing transitions")]
    NoTransitions(String),

    #[error("syllable did not reach a boundary state within {limit} steps (last state `{state}`)")]
    StepLimit { limit: usize, state: String },

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}
