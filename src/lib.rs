//! Procedural word generation and historical sound change for invented languages.
//!
//! The crate has two cooperating halves:
//!
//! - [`phonetics`]: a feature index over phonetic segments, a small boolean
//!   expression language over feature classes, and a compiler that turns
//!   sound-change rules (`p->b/[+vowel]_[+vowel]`) into context-sensitive
//!   substitution patterns.
//! - [`generator`]: a weighted state machine that assembles raw syllables, plus
//!   the weighted sampler it is built on.
//!
//! [`Language`] ties both together: it is loaded once from a phonetics document
//! and a language document, and then generates words on demand.
//!
//! ```text
//! PhoneticsConfig ──▶ FeatureIndex ──┐
//!                                    ├─▶ Language ──▶ generate_traced(rng) ──▶ WordTrace
//! LanguageConfig ──▶ TransitionTable ┤
//!                └─▶ Change (rules) ─┘
//! ```

#[macro_use]
mod macros;
mod api;
pub mod config;
mod error;
pub mod generator;
pub mod phonetics;
mod trace;

pub use api::{Language, Options, rng_for};
pub use config::{ChangeConfig, LanguageConfig, PhoneticsConfig};
pub use error::{ApplyError, ConfigError, Error, ExpressionError, GenerateError, Result, RuleError, SampleError};
pub use generator::{StateMachine, SyllableCounts, Transition, TransitionTable, weighted_choice, weighted_choice_by};
pub use phonetics::{Change, CompiledRule, Expression, FeatureIndex, FeatureSet, Operator, SegmentSet};
pub use trace::{ChangeTrace, RuleStep, WordTrace};

/// Environment variable that switches on rule and generation traces on stderr.
pub(crate) const DEBUG_ENV: &str = "GLOSSA_DEBUG_RULES";
