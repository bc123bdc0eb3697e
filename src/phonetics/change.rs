//! Named changes: ordered lists of rules.

use super::{CompiledRule, FeatureIndex};
use crate::{ApplyError, ChangeTrace, ConfigError, RuleStep};

/// A named sequence of rules, applied strictly in order.
#[derive(Debug, Clone)]
pub struct Change {
    name: String,
    rules: Vec<CompiledRule>,
}

impl Change {
    /// Compile every rule of the change. The first failure names both the change
    /// and the offending rule.
    pub fn compile<S: AsRef<str>>(name: &str, rules: &[S], index: &FeatureIndex) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                CompiledRule::compile(rule.as_ref(), index).map_err(|source| ConfigError::Rule {
                    change: name.to_string(),
                    rule: rule.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Change { name: name.to_string(), rules })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Run every rule over `word`, each rule seeing the previous rule's output.
    pub fn apply(&self, word: &str, index: &FeatureIndex) -> Result<ChangeTrace, ApplyError> {
        let mut current = word.to_string();
        let mut steps = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            current = rule.apply(&current, index)?;
            steps.push(RuleStep { rule: rule.source().to_string(), output: current.clone() });
        }

        if std::env::var_os(crate::DEBUG_ENV).is_some() {
            eprintln!("[change] name=\"{}\" \"{}\" -> \"{}\"", self.name, word, current);
        }

        Ok(ChangeTrace { name: self.name.clone(), input: word.to_string(), steps, output: current })
    }
}
