//! Syllable state machine.
//!
//! The transition table is immutable and shared; a [`StateMachine`] is a cheap
//! cursor over it that owns the only mutable bit, the current state. Each word
//! gets its own machine, so concurrent generations never share a cursor.
//!
//! ## Invariants
//!
//! - Transitions are pooled per source state across all target states before
//!   sampling, so a state's total weight is the sum over every target.
//! - A syllable is at least one step long and stops on the first boundary state.
//! - A syllable longer than the table's step limit is an error, not a hang.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use super::sampler::weighted_choice_by;
use crate::config::StateConfig;
use crate::{ConfigError, GenerateError};

/// Step limit applied when the language document does not set one.
pub const DEFAULT_MAX_SYLLABLE_STEPS: usize = 256;

/// One weighted edge of the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: String,
    /// Emitted segment text; empty for silent transitions.
    pub output: String,
    pub weight: f64,
}

/// Immutable description of the machine.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    start: String,
    boundaries: HashSet<String>,
    states: HashMap<String, Vec<Transition>>,
    max_steps: usize,
}

impl TransitionTable {
    pub fn new(start: impl Into<String>, boundaries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TransitionTable {
            start: start.into(),
            boundaries: boundaries.into_iter().map(Into::into).collect(),
            states: HashMap::new(),
            max_steps: DEFAULT_MAX_SYLLABLE_STEPS,
        }
    }

    /// Build from the `states` mapping of a language document:
    /// `state -> next -> [(output, weight)]`, where a `None` output is silent.
    pub fn from_states(
        start: &str,
        boundaries: &[String],
        states: &StateConfig,
        max_steps: usize,
    ) -> Result<Self, ConfigError> {
        let mut table = TransitionTable::new(start, boundaries).with_max_steps(max_steps)?;
        for (state, targets) in states {
            for (next, outputs) in targets {
                for (output, weight) in outputs {
                    table.add_transition(state, next, output.as_deref().unwrap_or(""), *weight)?;
                }
            }
        }

        if table.transitions(start).is_none() {
            return Err(ConfigError::UnknownStartState(start.to_string()));
        }
        Ok(table)
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Result<Self, ConfigError> {
        if max_steps == 0 {
            return Err(ConfigError::ZeroStepLimit);
        }
        self.max_steps = max_steps;
        Ok(self)
    }

    pub fn add_transition(&mut self, from: &str, next: &str, output: &str, weight: f64) -> Result<(), ConfigError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::InvalidWeight { location: format!("states.{from}.{next}[{output:?}]"), weight });
        }
        self.states.entry(from.to_string()).or_default().push(Transition {
            next: next.to_string(),
            output: output.to_string(),
            weight,
        });
        Ok(())
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn is_boundary(&self, state: &str) -> bool {
        self.boundaries.contains(state)
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Outgoing transitions of `state`, pooled across every target state.
    pub fn transitions(&self, state: &str) -> Option<&[Transition]> {
        self.states.get(state).map(Vec::as_slice).filter(|pool| !pool.is_empty())
    }

    pub fn machine(&self) -> StateMachine<'_> {
        StateMachine::new(self)
    }
}

/// A cursor walking a [`TransitionTable`].
#[derive(Debug, Clone)]
pub struct StateMachine<'t> {
    table: &'t TransitionTable,
    state: &'t str,
}

impl<'t> StateMachine<'t> {
    pub fn new(table: &'t TransitionTable) -> Self {
        StateMachine { table, state: &table.start }
    }

    pub fn state(&self) -> &'t str {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = &self.table.start;
    }

    /// Take one weighted transition and return its output.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&'t str, GenerateError> {
        let pool =
            self.table.transitions(self.state).ok_or_else(|| GenerateError::NoTransitions(self.state.to_string()))?;
        let taken = weighted_choice_by(rng, pool, |t| t.weight)?;
        self.state = &taken.next;
        Ok(&taken.output)
    }

    /// Step until a boundary state is reached and return the concatenated output.
    pub fn generate_syllable<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<String, GenerateError> {
        let mut syllable = String::new();
        for _ in 0..self.table.max_steps {
            syllable.push_str(self.step(rng)?);
            if self.table.is_boundary(self.state) {
                if std::env::var_os(crate::DEBUG_ENV).is_some() {
                    eprintln!("[syllable] \"{}\" end_state={}", syllable, self.state);
                }
                return Ok(syllable);
            }
        }
        Err(GenerateError::StepLimit { limit: self.table.max_steps, state: self.state.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeMap;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(11)
    }

    #[test]
    fn single_transition_syllable() {
        let mut table = TransitionTable::new("S0", ["S1"]);
        table.add_transition("S0", "S1", "ba", 1.0).unwrap();

        let mut machine = table.machine();
        let mut rng = rng();
        for _ in 0..10 {
            machine.reset();
            assert_eq!(machine.generate_syllable(&mut rng).unwrap(), "ba");
            assert_eq!(machine.state(), "S1");
        }
    }

    #[test]
    fn syllables_continue_from_the_boundary_state() {
        let mut table = TransitionTable::new("start", ["mid", "end"]);
        table.add_transition("start", "mid", "ka", 1.0).unwrap();
        table.add_transition("mid", "end", "ta", 1.0).unwrap();

        let mut machine = table.machine();
        let mut rng = rng();
        assert_eq!(machine.generate_syllable(&mut rng).unwrap(), "ka");
        assert_eq!(machine.generate_syllable(&mut rng).unwrap(), "ta");
        assert_eq!(machine.generate_syllable(&mut rng).unwrap_err(), GenerateError::NoTransitions("end".into()));

        machine.reset();
        assert_eq!(machine.state(), "start");
    }

    #[test]
    fn transitions_are_pooled_across_targets() {
        let mut table = TransitionTable::new("S", ["B"]);
        table.add_transition("S", "B", "a", 1.0).unwrap();
        table.add_transition("S", "S", "p", 1.0).unwrap();
        table.add_transition("S", "B", "i", 1.0).unwrap();
        assert_eq!(table.transitions("S").unwrap().len(), 3);

        let mut rng = rng();
        let mut machine = table.machine();
        let mut saw_onset = false;
        for _ in 0..200 {
            machine.reset();
            let syllable = machine.generate_syllable(&mut rng).unwrap();
            assert!(syllable.ends_with('a') || syllable.ends_with('i'), "{syllable}");
            saw_onset |= syllable.starts_with('p');
        }
        assert!(saw_onset);
    }

    #[test]
    fn runaway_cycles_hit_the_step_limit() {
        let mut table = TransitionTable::new("A", ["Z"]).with_max_steps(16).unwrap();
        table.add_transition("A", "B", "a", 1.0).unwrap();
        table.add_transition("B", "A", "b", 1.0).unwrap();

        let err = table.machine().generate_syllable(&mut rng()).unwrap_err();
        assert_eq!(err, GenerateError::StepLimit { limit: 16, state: "A".into() });
    }

    #[test]
    fn silent_and_zero_weight_transitions() {
        let mut table = TransitionTable::new("S", ["B"]);
        table.add_transition("S", "B", "", 1.0).unwrap();
        table.add_transition("S", "B", "x", 0.0).unwrap();
        assert_eq!(table.machine().generate_syllable(&mut rng()).unwrap(), "");

        let mut dead = TransitionTable::new("S", ["B"]);
        dead.add_transition("S", "B", "x", 0.0).unwrap();
        assert!(matches!(dead.machine().generate_syllable(&mut rng()), Err(GenerateError::Sample(_))));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut table = TransitionTable::new("S", ["B"]);
        assert!(matches!(table.add_transition("S", "B", "a", -1.0), Err(ConfigError::InvalidWeight { .. })));
        assert!(matches!(table.add_transition("S", "B", "a", f64::NAN), Err(ConfigError::InvalidWeight { .. })));
        assert!(matches!(TransitionTable::new("S", ["B"]).with_max_steps(0), Err(ConfigError::ZeroStepLimit)));

        let states = BTreeMap::from([(
            "other".to_string(),
            BTreeMap::from([("B".to_string(), vec![(Some("a".to_string()), 1.0)])]),
        )]);
        let err = TransitionTable::from_states("S", &["B".to_string()], &states, 8).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownStartState(s) if s == "S"));
    }

    #[test]
    fn from_states_treats_null_output_as_silent() {
        let states = BTreeMap::from([(
            "S".to_string(),
            BTreeMap::from([("B".to_string(), vec![(None, 1.0)])]),
        )]);
        let table = TransitionTable::from_states("S", &["B".to_string()], &states, 8).unwrap();
        assert_eq!(table.transitions("S").unwrap()[0].output, "");
        assert_eq!(table.max_steps(), 8);
    }
}
