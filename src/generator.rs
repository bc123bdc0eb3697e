//! Raw word generation.
//!
//! Words start life as the output of a weighted state machine: each step picks
//! one transition out of the current state with probability proportional to its
//! weight, emits the transition's segment and moves to its target state. A
//! syllable ends when the machine lands in a boundary state.
//!
//! ```text
//!            ┌──── "p" (3) ───┐
//!  onset ────┤                ├──▶ nucleus ── "a" (4) ──▶ coda ── "" (6) ──▶ onset*
//!            └──── ""  (1) ───┘                                │
//!                                                              └── "n" (1) ─▶ onset*
//!  (* boundary state)
//! ```
//!
//! The number of syllables per word is drawn from its own weighted
//! distribution ([`SyllableCounts`]).
//!
//! Randomness always comes from a caller-supplied [`rand::Rng`], so a seeded
//! generator reproduces the same words.

#[path = "generator/machine.rs"]
mod machine;
#[path = "generator/sampler.rs"]
mod sampler;

pub use machine::{DEFAULT_MAX_SYLLABLE_STEPS, StateMachine, Transition, TransitionTable};
pub use sampler::{SyllableCounts, weighted_choice, weighted_choice_by};
