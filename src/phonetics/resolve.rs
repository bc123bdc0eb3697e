//! Rule application and output resolution.
//!
//! A compiled rule is applied by walking the word's segment boundaries left to
//! right. At each boundary the three patterns of the rule are tried:
//!
//! ```text
//! word:      a  p  a  p  a          rule: [+voiceless]->[+voiced]/a_a
//! boundary:  0  1  2  3  4  5
//!               │
//!               ├─ prefix  matches word[..1]  = "a"     ✓
//!               ├─ target  matches word[1..]  = "p.."   ✓ captures ["p"]
//!               └─ suffix  matches word[2..]  = "apa"   ✓
//!                  -> render "b", resume at boundary 2
//! ```
//!
//! Contexts are always checked against the input word, never against output
//! already produced, so the second `p` above also sees its `a_a` context and
//! the result is `ababa`. Matches never overlap. Targets and contexts are made
//! of whole segments: with `aa` in the universe, the context `a_` does not see
//! the second half of `aap`.
//!
//! ## Resolving output expressions
//!
//! An expression in the output (`[+voiced]`) names a set of candidates. The
//! candidate whose feature set is closest to the input segment at the same
//! position wins, where distance is the size of the symmetric difference of the
//! two feature sets. A tie for the minimum is an error rather than a guess, as
//! is an empty candidate set.

use regex::Regex;

use super::FeatureIndex;
use super::rule::{Class, CompiledRule, OutputItem};
use crate::ApplyError;

/// A single match of a rule inside a word.
#[derive(Debug)]
struct RuleMatch<'w> {
    end: usize,
    /// One segment per `before` atom.
    captured: Vec<&'w str>,
}

impl CompiledRule {
    /// Apply the rule to every non-overlapping match in `word`.
    pub fn apply(&self, word: &str, index: &FeatureIndex) -> Result<String, ApplyError> {
        let boundaries = index.segmenter().boundaries(word);
        let mut output = String::with_capacity(word.len());
        let mut copied = 0;
        let mut i = 0;

        while i < boundaries.len() {
            let start = boundaries[i];
            let Some(found) = self.match_at(word, i, &boundaries) else {
                i += 1;
                continue;
            };

            output.push_str(&word[copied..start]);
            self.render(&found.captured, index, &mut output)?;
            copied = found.end;

            // An empty match (pure insertion) still has to move forward.
            i = if found.end == start {
                i + 1
            } else {
                boundaries.binary_search(&found.end).map_or(boundaries.len(), |next| next)
            };
        }

        output.push_str(&word[copied..]);

        if std::env::var_os(crate::DEBUG_ENV).is_some() {
            eprintln!("[rule:apply] rule=\"{}\" \"{}\" -> \"{}\"", self.source(), word, output);
        }

        Ok(output)
    }

    /// Try to match the rule with its target starting at boundary number `at`.
    fn match_at<'w>(&self, word: &'w str, at: usize, boundaries: &[usize]) -> Option<RuleMatch<'w>> {
        let start = boundaries[at];
        let last = boundaries.len() - 1;

        let before = self.prefix.atoms.len();
        if at < before || (self.prefix.anchored && at != before) {
            return None;
        }
        if let Some(prefix) = &self.prefix_pattern {
            aligned(prefix, word, boundaries[at - before], start, boundaries)?;
        }

        let (end, captured) = aligned(&self.target_pattern, word, start, word.len(), boundaries)?;

        let after = self.suffix.atoms.len();
        let end_at = boundaries.binary_search(&end).ok()?;
        if end_at + after > last || (self.suffix.anchored && end_at + after != last) {
            return None;
        }
        if let Some(suffix) = &self.suffix_pattern {
            aligned(suffix, word, end, boundaries[end_at + after], boundaries)?;
        }

        Some(RuleMatch { end, captured })
    }

    /// Render the output template for one match into `out`.
    fn render(&self, captured: &[&str], index: &FeatureIndex, out: &mut String) -> Result<(), ApplyError> {
        for (position, item) in self.after.iter().enumerate() {
            match item {
                OutputItem::Segment(segment) => out.push_str(segment),
                OutputItem::BackReference(n) => out.push_str(captured[n - 1]),
                OutputItem::Class(class) => {
                    // Compilation guarantees a paired input position.
                    let input = captured[position];
                    out.push_str(nearest_segment(class, input, index, self.source())?);
                }
            }
        }
        Ok(())
    }
}

/// Match `pattern` against `word[from..to]` and return the end offset of the
/// match plus one captured segment per group. Every group has to start and end
/// on a segment boundary.
fn aligned<'w>(
    pattern: &Regex,
    word: &'w str,
    from: usize,
    to: usize,
    boundaries: &[usize],
) -> Option<(usize, Vec<&'w str>)> {
    let caps = pattern.captures(&word[from..to])?;
    let on_boundary = |offset: usize| boundaries.binary_search(&(from + offset)).is_ok();

    let mut captured = Vec::with_capacity(caps.len() - 1);
    for group in caps.iter().skip(1) {
        let group = group?;
        if !on_boundary(group.start()) || !on_boundary(group.end()) {
            return None;
        }
        captured.push(group.as_str());
    }
    Some((from + caps.get(0)?.end(), captured))
}

/// Pick the member of `class` whose features are closest to those of `input`.
pub(crate) fn nearest_segment<'c>(
    class: &'c Class,
    input: &str,
    index: &FeatureIndex,
    rule: &str,
) -> Result<&'c str, ApplyError> {
    let mut best: Option<usize> = None;
    let mut tied: Vec<&'c str> = Vec::new();

    for candidate in &class.members {
        let distance = index.feature_distance(candidate, input);
        match best {
            Some(current) if distance > current => {}
            Some(current) if distance == current => tied.push(candidate),
            _ => {
                best = Some(distance);
                tied.clear();
                tied.push(candidate);
            }
        }
    }

    match (best, tied.as_slice()) {
        (Some(_), [only]) => Ok(*only),
        (Some(distance), _) => Err(ApplyError::AmbiguousOutput {
            rule: rule.to_string(),
            input: input.to_string(),
            candidates: tied.iter().map(|s| s.to_string()).collect(),
            distance,
        }),
        (None, _) => Err(ApplyError::EmptyOutput { rule: rule.to_string(), expression: class.source.clone() }),
    }
}
