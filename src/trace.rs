//! Generation traces.
//!
//! The contract of generation is just the final word, but the intermediate forms
//! are what make a sound-change setup debuggable. Every generation and every
//! change application records them here.
//!
//! ```text
//! WordTrace
//! ├── syllables: ["ka", "ta"]        raw state-machine output
//! ├── raw: "kata"
//! ├── changes
//! │   └── ChangeTrace "lenition"
//! │       ├── input: "kata"
//! │       ├── steps: [RuleStep { rule, output: "kada" }, ..]
//! │       └── output: "kada"
//! ├── word: "kada"
//! └── elapsed
//! ```
//!
//! Traces are cheap enough to build on every call; callers that only want the
//! word use [`Language::generate_word`](crate::Language::generate_word).

use std::time::Duration;

/// The word after a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleStep {
    /// Rule text as written in the language document.
    pub rule: String,
    pub output: String,
}

impl RuleStep {
    pub fn changed(&self, input: &str) -> bool {
        self.output != input
    }
}

/// One named change applied to a word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTrace {
    pub name: String,
    pub input: String,
    pub steps: Vec<RuleStep>,
    pub output: String,
}

/// Everything that happened while producing one word.
#[derive(Debug, Clone)]
pub struct WordTrace {
    /// Output of each syllable, in order.
    pub syllables: Vec<String>,
    /// Concatenated syllables, before any change.
    pub raw: String,
    pub changes: Vec<ChangeTrace>,
    /// Final form.
    pub word: String,
    pub elapsed: Duration,
}
