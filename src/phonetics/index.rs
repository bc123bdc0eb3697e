//! Segment/feature index.
//!
//! The phonetics document describes segments as a nested tree: interior keys are
//! feature names, leaves are lists of segment literals.
//!
//! ```text
//! consonant:
//!   stop:
//!     voiceless: [p, t, k]      p -> {consonant, stop, voiceless}
//!     voiced:    [b, d, g]      b -> {consonant, stop, voiced}
//! labial: [p, b, m]             p -> {.., labial}
//! ```
//!
//! Every leaf segment is registered under every feature on its path, so a segment
//! listed in several branches accumulates the features of all of them. The index
//! is built once and is read-only afterwards.
//!
//! The index also carries a [`Segmenter`]: the universe compiled into a single
//! alternation ordered longest-first, so `aa` is always preferred over `a` when
//! both are segments.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::{FeatureSet, SegmentSet};
use crate::ConfigError;

/// Bidirectional mapping between features and segments.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    segments_by_feature: HashMap<String, SegmentSet>,
    features_by_segment: HashMap<String, FeatureSet>,
    universe: SegmentSet,
    segmenter: Segmenter,
}

impl FeatureIndex {
    /// Build the index from the `segments` tree of a phonetics document.
    ///
    /// The root must be a mapping. Any node that is neither a mapping nor a list
    /// of strings is reported with its dotted path.
    pub fn build(tree: &Value) -> Result<Self, ConfigError> {
        let mut builder = Builder::default();
        let mut path = vec!["segments".to_string()];
        match tree {
            Value::Object(_) => builder.walk(tree, &mut path)?,
            _ => return Err(ConfigError::MalformedSegmentTree { path: path.join(".") }),
        }

        let segmenter = Segmenter::new(&builder.universe)?;
        Ok(FeatureIndex {
            segments_by_feature: builder.segments_by_feature,
            features_by_segment: builder.features_by_segment,
            universe: builder.universe,
            segmenter,
        })
    }

    /// Segments belonging to `feature`, or `None` for an unknown feature.
    pub fn segments_of(&self, feature: &str) -> Option<&SegmentSet> {
        self.segments_by_feature.get(feature)
    }

    /// Features carried by `segment`, or `None` for a segment outside the universe.
    pub fn features_of(&self, segment: &str) -> Option<&FeatureSet> {
        self.features_by_segment.get(segment)
    }

    pub fn universe(&self) -> &SegmentSet {
        &self.universe
    }

    pub fn contains_feature(&self, feature: &str) -> bool {
        self.segments_by_feature.contains_key(feature)
    }

    /// All feature names, sorted.
    pub fn features(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.segments_by_feature.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Size of the symmetric difference between the feature sets of `a` and `b`.
    ///
    /// Segments outside the universe carry no features.
    pub fn feature_distance(&self, a: &str, b: &str) -> usize {
        let empty = FeatureSet::new();
        let fa = self.features_of(a).unwrap_or(&empty);
        let fb = self.features_of(b).unwrap_or(&empty);
        fa.symmetric_difference(fb).count()
    }
}

#[derive(Default)]
struct Builder {
    segments_by_feature: HashMap<String, SegmentSet>,
    features_by_segment: HashMap<String, FeatureSet>,
    universe: SegmentSet,
}

impl Builder {
    /// `path[0]` is the document key, the rest are feature names.
    fn walk(&mut self, node: &Value, path: &mut Vec<String>) -> Result<(), ConfigError> {
        match node {
            Value::Object(children) => {
                for (feature, child) in children {
                    // A feature with no segments is still a known (empty) class.
                    self.segments_by_feature.entry(feature.clone()).or_default();
                    path.push(feature.clone());
                    self.walk(child, path)?;
                    path.pop();
                }
                Ok(())
            }
            Value::Array(items) => {
                for item in items {
                    let Value::String(segment) = item else {
                        return Err(ConfigError::MalformedSegmentTree { path: path.join(".") });
                    };
                    if segment.is_empty() {
                        return Err(ConfigError::EmptySegment { path: path.join(".") });
                    }
                    self.register(segment, &path[1..]);
                }
                Ok(())
            }
            _ => Err(ConfigError::MalformedSegmentTree { path: path.join(".") }),
        }
    }

    fn register(&mut self, segment: &str, features: &[String]) {
        self.universe.insert(segment.to_string());
        let carried = self.features_by_segment.entry(segment.to_string()).or_default();
        for feature in features {
            carried.insert(feature.clone());
            self.segments_by_feature.entry(feature.clone()).or_default().insert(segment.to_string());
        }
    }
}

// --- Segmenter ---------------------------------------------------------------

/// The segment universe compiled into a longest-first alternation.
///
/// Used to tokenize literal segments in expressions and rules, and to find the
/// segment boundaries of a word.
#[derive(Debug, Clone)]
pub struct Segmenter {
    /// Segments sorted by descending length, then lexically.
    ordered: Vec<String>,
    /// `(?:aa|a|...)`, reusable inside larger patterns.
    fragment: String,
    /// `\A(?:aa|a|...)`. `None` when the universe is empty.
    anchored: Option<Regex>,
}

/// Compiled-size ceiling for the segment alternation, the `regex` default.
const SEGMENT_PATTERN_SIZE_LIMIT: usize = 10 * (1 << 20);

impl Segmenter {
    pub fn new(universe: &SegmentSet) -> Result<Self, ConfigError> {
        Segmenter::with_size_limit(universe, SEGMENT_PATTERN_SIZE_LIMIT)
    }

    /// Like [`Segmenter::new`] with an explicit compiled-size ceiling. A universe
    /// whose alternation outgrows it is an error, never a silent fallback.
    pub(crate) fn with_size_limit(universe: &SegmentSet, size_limit: usize) -> Result<Self, ConfigError> {
        let ordered = longest_first(universe.iter().map(String::as_str));
        let mut segmenter = Segmenter { fragment: alternation(&ordered), ordered, anchored: None };
        if !segmenter.ordered.is_empty() {
            let anchored = RegexBuilder::new(&format!(r"\A{}", segmenter.fragment()))
                .size_limit(size_limit)
                .build()
                .map_err(|err| ConfigError::SegmentPattern { segments: segmenter.ordered.len(), source: err })?;
            segmenter.anchored = Some(anchored);
        }
        Ok(segmenter)
    }

    /// Known segments, longest first.
    pub fn ordered(&self) -> &[String] {
        &self.ordered
    }

    /// Alternation fragment matching any known segment.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Longest known segment at the start of `text`.
    pub fn segment_at<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.anchored.as_ref()?.find(text).map(|m| m.as_str())
    }

    /// Byte length of the segment at the start of `text`: the longest known
    /// segment, or one character when nothing known matches.
    pub fn segment_len_at(&self, text: &str) -> usize {
        match self.segment_at(text) {
            Some(segment) => segment.len(),
            None => text.chars().next().map_or(0, char::len_utf8),
        }
    }

    /// Byte offsets of every segment boundary in `word`, including `0` and
    /// `word.len()`.
    ///
    /// ```text
    /// universe {a, aa, p}   word "paap"   -> [0, 1, 3, 4]
    /// ```
    pub fn boundaries(&self, word: &str) -> Vec<usize> {
        let mut offsets = vec![0];
        let mut offset = 0;
        while offset < word.len() {
            offset += self.segment_len_at(&word[offset..]);
            offsets.push(offset);
        }
        offsets
    }

    /// Split `word` into segments.
    pub fn split<'w>(&self, word: &'w str) -> Vec<&'w str> {
        self.boundaries(word).windows(2).map(|w| &word[w[0]..w[1]]).collect()
    }
}

/// Sort literals by descending length so a shorter literal never shadows a
/// longer one that starts with it.
pub(crate) fn longest_first<'a>(literals: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut ordered: Vec<String> = literals.into_iter().map(str::to_string).collect();
    ordered.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    ordered.dedup();
    ordered
}

/// `(?:l1|l2|...)` over escaped literals. An empty list yields a pattern that
/// never matches.
pub(crate) fn alternation(ordered: &[String]) -> String {
    if ordered.is_empty() {
        return r"[^\s\S]".to_string();
    }
    let escaped: Vec<String> = ordered.iter().map(|s| regex::escape(s)).collect();
    format!("(?:{})", escaped.join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stops() -> FeatureIndex {
        FeatureIndex::build(&json!({
            "consonant": {
                "stop": {
                    "voiceless": ["p", "t", "k"],
                    "voiced": ["b", "d", "g"]
                }
            },
            "labial": ["p", "b"]
        }))
        .unwrap()
    }

    #[test]
    fn segments_inherit_every_ancestor_feature() {
        let index = stops();
        let p = index.features_of("p").unwrap();
        assert!(p.contains("consonant"));
        assert!(p.contains("stop"));
        assert!(p.contains("voiceless"));
        assert!(p.contains("labial"));
        assert!(!p.contains("voiced"));
        assert_eq!(index.segments_of("stop").unwrap().len(), 6);
        assert_eq!(index.segments_of("labial").unwrap(), &segments!["p", "b"]);
    }

    #[test]
    fn index_is_bidirectionally_consistent() {
        let index = stops();
        for feature in index.features() {
            for segment in index.segments_of(feature).unwrap() {
                assert!(index.features_of(segment).unwrap().contains(feature), "{segment} missing {feature}");
            }
        }
        for segment in index.universe() {
            for feature in index.features_of(segment).unwrap() {
                assert!(index.segments_of(feature).unwrap().contains(segment));
            }
        }
    }

    #[test]
    fn universe_collects_every_leaf() {
        let index = stops();
        assert_eq!(index.universe(), &segments!["p", "t", "k", "b", "d", "g"]);
    }

    #[test]
    fn malformed_nodes_report_their_path() {
        let err = FeatureIndex::build(&json!({ "vowel": { "high": 3 } })).unwrap_err();
        match err {
            ConfigError::MalformedSegmentTree { path } => assert_eq!(path, "segments.vowel.high"),
            other => panic!("unexpected error: {other}"),
        }

        let err = FeatureIndex::build(&json!({ "vowel": ["a", ["e"]] })).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSegmentTree { .. }));

        let err = FeatureIndex::build(&json!(["a", "e"])).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedSegmentTree { path } if path == "segments"));
    }

    #[test]
    fn empty_segment_literals_are_rejected() {
        let err = FeatureIndex::build(&json!({ "vowel": ["a", ""] })).unwrap_err();
        assert!(matches!(err, ConfigError::EmptySegment { .. }));
    }

    #[test]
    fn feature_distance_is_symmetric_difference() {
        let index = stops();
        assert_eq!(index.feature_distance("p", "p"), 0);
        assert_eq!(index.feature_distance("p", "b"), 2);
        assert_eq!(index.feature_distance("p", "d"), 3);
        assert_eq!(index.feature_distance("p", "?"), 4);
    }

    #[test]
    fn segmenter_prefers_longer_segments() {
        let index = FeatureIndex::build(&json!({ "vowel": ["a", "aa"], "consonant": ["p", "ph"] })).unwrap();
        let segmenter = index.segmenter();
        assert_eq!(segmenter.ordered()[..2], ["aa".to_string(), "ph".to_string()]);
        assert_eq!(segmenter.fragment(), "(?:aa|ph|a|p)");
        assert_eq!(segmenter.split("phaapa"), vec!["ph", "aa", "p", "a"]);
        assert_eq!(segmenter.boundaries("phaapa"), vec![0, 2, 4, 5, 6]);
        assert_eq!(segmenter.split("aaa"), vec!["aa", "a"]);
    }

    #[test]
    fn oversized_segment_pattern_is_an_error() {
        let universe = segments!["a", "aa", "p", "ph"];
        assert!(Segmenter::with_size_limit(&universe, 1 << 16).is_ok());
        let err = Segmenter::with_size_limit(&universe, 16).unwrap_err();
        assert!(matches!(err, ConfigError::SegmentPattern { segments: 4, .. }), "{err}");
    }

    #[test]
    fn huge_inventories_fail_to_build() {
        let filler: Vec<String> = (0..300_000).map(|n| format!("q{n:07}")).collect();
        let err = FeatureIndex::build(&json!({ "vowel": ["a", "aa"], "filler": filler })).unwrap_err();
        assert!(matches!(err, ConfigError::SegmentPattern { segments: 300_002, .. }), "{err}");
    }

    #[test]
    fn segmenter_falls_back_to_single_characters() {
        let index = stops();
        assert_eq!(index.segmenter().split("pxé"), vec!["p", "x", "é"]);
        assert_eq!(index.segmenter().boundaries(""), vec![0]);
    }

    #[test]
    fn empty_universe_never_matches() {
        let index = FeatureIndex::build(&json!({})).unwrap();
        assert!(index.universe().is_empty());
        assert_eq!(index.segmenter().segment_at("abc"), None);
        assert_eq!(index.segmenter().split("ab"), vec!["a", "b"]);
    }
}
