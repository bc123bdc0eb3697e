use std::path::Path;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    ApplyError, Change, ChangeTrace, ConfigError, FeatureIndex, GenerateError, LanguageConfig, PhoneticsConfig,
    StateMachine, SyllableCounts, TransitionTable, WordTrace,
};

/// Options that affect a batch of generations.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Seed for a reproducible batch. `None` seeds from OS entropy.
    pub seed: Option<u64>,
    /// Fixed syllable count for every word instead of sampling one.
    pub syllables: Option<u32>,
}

/// The random source a batch with these options uses.
pub fn rng_for(options: &Options) -> ChaCha8Rng {
    match options.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

/// A loaded language: the feature index, the syllable grammar and the compiled
/// sound changes.
///
/// Immutable after construction, so one `Language` can serve any number of
/// concurrent generations; each generation walks its own [`StateMachine`].
///
/// # Example
/// ```
/// use glossa::{Language, LanguageConfig, PhoneticsConfig};
/// use rand::SeedableRng;
///
/// let phonetics: PhoneticsConfig = r#"{ "segments": { "vowel": ["a"], "consonant": ["p", "b"] } }"#.parse()?;
/// let language: LanguageConfig = r#"{
///     "boundaries": ["S1"], "syllables": [[2, 1.0]], "start": "S0",
///     "states": { "S0": { "S1": [["pa", 1.0]] }, "S1": { "S1": [["pa", 1.0]] } },
///     "changes": [{ "name": "voicing", "rules": ["p->b/a_a"] }]
/// }"#.parse()?;
///
/// let lang = Language::new(&phonetics, &language)?;
/// let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
/// assert_eq!(lang.generate_word(&mut rng, None)?, "paba");
/// # Ok::<(), glossa::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Language {
    index: FeatureIndex,
    table: TransitionTable,
    syllables: SyllableCounts,
    changes: Vec<Change>,
}

impl Language {
    /// Build the index, validate the grammar and compile every rule once.
    pub fn new(phonetics: &PhoneticsConfig, language: &LanguageConfig) -> Result<Self, ConfigError> {
        let index = FeatureIndex::build(&phonetics.segments)?;
        let table = TransitionTable::from_states(
            &language.start,
            &language.boundaries,
            &language.states,
            language.max_syllable_steps,
        )?;
        let syllables = SyllableCounts::new(language.syllables.clone())?;
        let changes = language
            .changes
            .iter()
            .map(|change| Change::compile(&change.name, &change.rules, &index))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Language { index, table, syllables, changes })
    }

    pub fn from_paths(phonetics: impl AsRef<Path>, language: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let phonetics = PhoneticsConfig::from_path(phonetics)?;
        let language = LanguageConfig::from_path(language)?;
        Language::new(&phonetics, &language)
    }

    pub fn index(&self) -> &FeatureIndex {
        &self.index
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn syllable_counts(&self) -> &SyllableCounts {
        &self.syllables
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn sample_syllable_count<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u32, GenerateError> {
        Ok(self.syllables.sample(rng)?)
    }

    /// Generate one word. `syllables` overrides the sampled syllable count.
    pub fn generate_word<R: Rng + ?Sized>(&self, rng: &mut R, syllables: Option<u32>) -> Result<String, GenerateError> {
        self.generate_traced(rng, syllables).map(|trace| trace.word)
    }

    /// Generate one word and keep every intermediate form.
    pub fn generate_traced<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        syllables: Option<u32>,
    ) -> Result<WordTrace, GenerateError> {
        let start = Instant::now();
        let count = match syllables {
            Some(count) => count,
            None => self.sample_syllable_count(rng)?,
        };

        let mut machine = StateMachine::new(&self.table);
        let syllables =
            (0..count).map(|_| machine.generate_syllable(rng)).collect::<Result<Vec<_>, GenerateError>>()?;
        let raw = syllables.concat();

        let changes = self.apply_changes(&raw)?;
        let word = changes.last().map_or_else(|| raw.clone(), |change| change.output.clone());

        Ok(WordTrace { syllables, raw, changes, word, elapsed: start.elapsed() })
    }

    /// Run every change over `word` in declaration order, without any sampling.
    pub fn apply_changes(&self, word: &str) -> Result<Vec<ChangeTrace>, ApplyError> {
        let mut traces = Vec::with_capacity(self.changes.len());
        let mut current = word.to_string();
        for change in &self.changes {
            let trace = change.apply(&current, &self.index)?;
            current = trace.output.clone();
            traces.push(trace);
        }
        Ok(traces)
    }

    /// Generate `count` words from one random source. A failing word does not
    /// stop the batch; its error takes its slot.
    pub fn generate_batch(&self, count: usize, options: &Options) -> Vec<Result<WordTrace, GenerateError>> {
        let mut rng = rng_for(options);
        (0..count).map(|_| self.generate_traced(&mut rng, options.syllables)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONETICS: &str = r#"{
        "segments": {
            "vowel": ["a", "i"],
            "stop": {
                "voiceless-stop": ["p", "t", "k"],
                "voiced-stop": ["b", "d", "g"]
            },
            "labial": ["p", "b"],
            "alveolar": ["t", "d"],
            "velar": ["k", "g"]
        }
    }"#;

    fn language(json: &str) -> Language {
        let phonetics: PhoneticsConfig = PHONETICS.parse().unwrap();
        let language: LanguageConfig = json.parse().unwrap();
        Language::new(&phonetics, &language).unwrap()
    }

    fn voicing() -> Language {
        language(
            r#"{
                "boundaries": ["V"],
                "syllables": [[1, 1.0], [2, 2.0], [3, 1.0]],
                "start": "C",
                "states": {
                    "C": { "N": [["p", 1.0], ["t", 1.0], ["k", 1.0]] },
                    "N": { "V": [["a", 1.0]] },
                    "V": { "N": [["p", 1.0], ["t", 1.0], ["k", 1.0]] }
                },
                "changes": [{ "name": "voicing", "rules": ["[+voiceless-stop]->[+voiced-stop]/a_a"] }]
            }"#,
        )
    }

    #[test]
    fn generate_word_applies_changes() {
        let lang = voicing();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..50 {
            let trace = lang.generate_traced(&mut rng, Some(3)).unwrap();
            assert_eq!(trace.syllables.len(), 3);
            assert_eq!(trace.raw, trace.syllables.concat());
            // Every medial stop sits between two vowels; only the initial one survives.
            let chars: Vec<char> = trace.word.chars().collect();
            assert!("ptk".contains(chars[0]), "{}", trace.word);
            assert!("bdg".contains(chars[2]) && "bdg".contains(chars[4]), "{}", trace.word);
        }
    }

    #[test]
    fn state_carries_across_syllables() {
        let lang = voicing();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let trace = lang.generate_traced(&mut rng, Some(2)).unwrap();
        // First syllable starts in `C`, the second resumes from the boundary `V`.
        assert_eq!(trace.syllables[0].chars().count(), 2);
        assert_eq!(trace.syllables[1].chars().count(), 2);
        assert_eq!(trace.changes.len(), 1);
        assert_eq!(trace.changes[0].input, trace.raw);
    }

    #[test]
    fn seeded_batches_are_reproducible() {
        let lang = voicing();
        let options = Options { seed: Some(42), syllables: None };
        let words = |batch: Vec<Result<WordTrace, GenerateError>>| {
            batch.into_iter().map(|r| r.unwrap().word).collect::<Vec<_>>()
        };
        let first = words(lang.generate_batch(20, &options));
        assert_eq!(first.len(), 20);
        assert_eq!(first, words(lang.generate_batch(20, &options)));
    }

    #[test]
    fn syllable_override_skips_sampling() {
        let lang = voicing();
        let options = Options { seed: Some(9), syllables: Some(1) };
        for trace in lang.generate_batch(10, &options) {
            assert_eq!(trace.unwrap().syllables.len(), 1);
        }
    }

    #[test]
    fn batch_isolates_failures() {
        // `a` is equally far from `p` and `b`; `i` never triggers the rule.
        let lang = language(
            r#"{
                "boundaries": ["B"],
                "syllables": [[1, 1.0]],
                "start": "B",
                "states": { "B": { "B": [["a", 1.0], ["i", 1.0]] } },
                "changes": [{ "name": "broken", "rules": ["a->[+labial]"] }]
            }"#,
        );
        let batch = lang.generate_batch(64, &Options { seed: Some(5), syllables: None });
        assert_eq!(batch.len(), 64);

        let failed = batch.iter().filter(|r| r.is_err()).count();
        assert!(failed > 0 && failed < 64, "{failed} failures");
        for result in &batch {
            match result {
                Ok(trace) => assert_eq!(trace.word, "i"),
                Err(err) => assert!(matches!(err, GenerateError::Apply(ApplyError::AmbiguousOutput { .. }))),
            }
        }
    }

    #[test]
    fn apply_changes_runs_without_sampling() {
        let lang = voicing();
        let traces = lang.apply_changes("apatak").unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].output, "abadak");
    }

    #[test]
    fn load_errors_surface_at_construction() {
        let phonetics: PhoneticsConfig = PHONETICS.parse().unwrap();
        let broken: LanguageConfig = r#"{
            "boundaries": ["B"], "syllables": [[1, 1.0]], "start": "B",
            "states": { "B": { "B": [["a", 1.0]] } },
            "changes": [{ "name": "bad", "rules": ["[+nope]->a"] }]
        }"#
        .parse()
        .unwrap();
        assert!(matches!(Language::new(&phonetics, &broken), Err(ConfigError::Rule { .. })));

        let no_start: LanguageConfig = r#"{
            "boundaries": ["B"], "syllables": [[1, 1.0]], "start": "missing",
            "states": { "B": { "B": [["a", 1.0]] } }
        }"#
        .parse()
        .unwrap();
        assert!(matches!(Language::new(&phonetics, &no_start), Err(ConfigError::UnknownStartState(_))));
    }

    fn sample() -> Language {
        let phonetics: PhoneticsConfig = include_str!("../data/phonetics.json").parse().unwrap();
        let language: LanguageConfig = include_str!("../data/language.json").parse().unwrap();
        Language::new(&phonetics, &language).unwrap()
    }

    #[test]
    fn sample_changes_chain_in_order() {
        let lang = sample();
        let names: Vec<&str> = lang.changes().iter().map(Change::name).collect();
        assert_eq!(names, vec!["lenition", "nasal-assimilation", "apocope", "final-devoicing"]);

        // Each change sees the previous change's output.
        let cases = [("pata", "pat"), ("kanpa", "kampa"), ("anka", "angka"), ("taa", "taa"), ("sapi", "sap")];
        for (input, expected) in cases {
            let traces = lang.apply_changes(input).unwrap();
            assert_eq!(traces.last().unwrap().output, expected, "{input}");
            for pair in traces.windows(2) {
                assert_eq!(pair[0].output, pair[1].input);
            }
        }
    }

    #[test]
    fn sample_words_respect_every_change() {
        let lang = sample();
        let options = Options { seed: Some(2024), syllables: None };
        let segmenter = lang.index().segmenter();
        let is = |segment: &str, feature: &str| lang.index().segments_of(feature).unwrap().contains(segment);

        for result in lang.generate_batch(200, &options) {
            let trace = result.unwrap();
            let segments = segmenter.split(&trace.word);
            assert!(!segments.is_empty());
            assert!(!is(segments[segments.len() - 1], "voiced-stop"), "{}", trace.word);

            for window in segments.windows(2) {
                assert!(!(window[0] == "n" && is(window[1], "labial")), "{}", trace.word);
            }
            for window in segments.windows(3) {
                let intervocalic = is(window[0], "vowel") && is(window[2], "vowel");
                assert!(!(intervocalic && is(window[1], "voiceless-stop")), "{}", trace.word);
            }
        }
    }

    #[test]
    fn language_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Language>();
    }
}
