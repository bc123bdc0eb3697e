//! Sound-change rule compilation.
//!
//! A rule has the shape
//!
//! ```text
//! before -> after [ / prefix _ suffix ]
//!
//! [+voiceless]->[+voiced]/[+vowel]_[+vowel]
//! └── before ─┘ └─ after ┘└ prefix┘ └suffix┘
//! ```
//!
//! Compilation happens once per rule, at load time:
//!
//! 1. Split on `/`, `->` and `_` at bracket depth 0. Zero `/` means the rule
//!    applies anywhere; any other miscount is a [`RuleError`].
//! 2. Lex each side into pieces: literal segments (longest known segment first),
//!    bracketed expressions, `#` word edges and `\N` back-references.
//! 3. Evaluate every expression into a [`Class`] and expand it into an
//!    alternation, longest literal first.
//! 4. Build three anchored patterns with one capture group per atom: the
//!    target is matched from the candidate position, and each context side is
//!    matched against the exact run of segments next to it. Together they
//!    behave like `(?<=prefix)target(?=suffix)` on segment boundaries.
//!
//! Applying a compiled rule lives in `resolve.rs`.

use std::fmt;

use regex::Regex;

use super::index::{alternation, longest_first};
use super::{Expression, FeatureIndex, SegmentSet};
use crate::{ExpressionError, RuleError};

/// A bracketed expression evaluated against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub source: String,
    pub members: SegmentSet,
}

impl Class {
    fn pattern(&self) -> String {
        alternation(&longest_first(self.members.iter().map(String::as_str)))
    }
}

/// One matchable position: a literal segment or a class of segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    Segment(String),
    Class(Class),
}

impl Atom {
    fn pattern(&self) -> String {
        match self {
            Atom::Segment(segment) => regex::escape(segment),
            Atom::Class(class) => class.pattern(),
        }
    }
}

/// One position of the output template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    /// Emitted unchanged.
    Segment(String),
    /// Resolved to the candidate nearest the input segment at the same position.
    Class(Class),
    /// `\N`: copy the segment matched by the N-th (1-based) input position.
    BackReference(usize),
}

/// One side of the conditioning context.
///
/// `anchored` means the side is pinned to the word edge (`#`): the start of the
/// word for a prefix, the end of the word for a suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub anchored: bool,
    pub atoms: Vec<Atom>,
}

impl Context {
    pub fn is_unconditional(&self) -> bool {
        !self.anchored && self.atoms.is_empty()
    }

    fn body(&self) -> String {
        self.atoms.iter().map(Atom::pattern).collect()
    }
}

/// Lexed piece of a rule side, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Atom(Atom),
    Boundary,
    BackReference(usize),
}

/// A compiled sound-change rule.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    source: String,
    pub(crate) before: Vec<Atom>,
    pub(crate) after: Vec<OutputItem>,
    pub(crate) prefix: Context,
    pub(crate) suffix: Context,
    /// Matched against the segments right before the target. `None` without atoms.
    pub(crate) prefix_pattern: Option<Regex>,
    /// Matched against `word[start..]`; one capture group per `before` atom.
    pub(crate) target_pattern: Regex,
    /// Matched against the segments right after the target. `None` without atoms.
    pub(crate) suffix_pattern: Option<Regex>,
}

impl CompiledRule {
    /// Compile `text` against `index`.
    pub fn compile(text: &str, index: &FeatureIndex) -> Result<Self, RuleError> {
        check_brackets(text)?;

        let clauses = split_top_level(text, "/");
        let (change, context) = match clauses.as_slice() {
            [change] => (*change, None),
            [change, context] => (*change, Some(*context)),
            _ => return Err(RuleError::ContextSeparators(clauses.len() - 1)),
        };

        let sides = split_top_level(change, "->");
        let [before_text, after_text] = sides.as_slice() else {
            return Err(RuleError::ChangeArrows(sides.len() - 1));
        };

        let (prefix_text, suffix_text) = match context {
            None => ("", ""),
            Some(context) => {
                let halves = split_top_level(context, "_");
                match halves.as_slice() {
                    [prefix, suffix] => (*prefix, *suffix),
                    _ => return Err(RuleError::TargetMarkers(halves.len() - 1)),
                }
            }
        };

        let before = lex(before_text, index)?
            .into_iter()
            .map(|piece| match piece {
                Piece::Atom(atom) => Ok(atom),
                Piece::Boundary => Err(RuleError::MisplacedBoundary),
                Piece::BackReference(_) => Err(RuleError::MisplacedBackReference),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let after = lex(after_text, index)?
            .into_iter()
            .enumerate()
            .map(|(position, piece)| match piece {
                Piece::Atom(Atom::Segment(segment)) => Ok(OutputItem::Segment(segment)),
                Piece::Atom(Atom::Class(class)) if position < before.len() => Ok(OutputItem::Class(class)),
                Piece::Atom(Atom::Class(_)) => Err(RuleError::UnpairedOutput { position }),
                Piece::BackReference(n) if (1..=before.len()).contains(&n) => Ok(OutputItem::BackReference(n)),
                Piece::BackReference(n) => Err(RuleError::BackReference { index: n, available: before.len() }),
                Piece::Boundary => Err(RuleError::MisplacedBoundary),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let prefix = context_side(lex(prefix_text, index)?, Edge::Start)?;
        let suffix = context_side(lex(suffix_text, index)?, Edge::End)?;

        let target_pattern = Regex::new(&format!(r"\A{}", captures(&before)))?;
        let prefix_pattern = window_pattern(&prefix.atoms)?;
        let suffix_pattern = window_pattern(&suffix.atoms)?;

        let rule = CompiledRule {
            source: text.to_string(),
            before,
            after,
            prefix,
            suffix,
            prefix_pattern,
            target_pattern,
            suffix_pattern,
        };

        if std::env::var_os(crate::DEBUG_ENV).is_some() {
            eprintln!("[rule:compile] rule=\"{}\" pattern=\"{}\"", rule.source, rule.pattern());
        }

        Ok(rule)
    }

    /// The rule text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn before(&self) -> &[Atom] {
        &self.before
    }

    pub fn after(&self) -> &[OutputItem] {
        &self.after
    }

    pub fn prefix(&self) -> &Context {
        &self.prefix
    }

    pub fn suffix(&self) -> &Context {
        &self.suffix
    }

    /// The match pattern in lookaround notation, for diagnostics.
    ///
    /// ```text
    /// a[+stop]->.../#_[+vowel]   =>   (?<=\Aa)((?:p|t|k))(?=(?:a|e|i))
    /// ```
    pub fn pattern(&self) -> String {
        let mut out = String::new();
        if !self.prefix.is_unconditional() {
            let anchor = if self.prefix.anchored { r"\A" } else { "" };
            out.push_str(&format!("(?<={anchor}{})", self.prefix.body()));
        }
        out.push_str(&self.target_pattern.as_str()[2..]);
        if !self.suffix.is_unconditional() {
            let anchor = if self.suffix.anchored { r"\z" } else { "" };
            out.push_str(&format!("(?={}{anchor})", self.suffix.body()));
        }
        out
    }
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// One capture group per atom.
fn captures(atoms: &[Atom]) -> String {
    atoms.iter().map(|atom| format!("({})", atom.pattern())).collect()
}

/// Pattern for a context side, matched against exactly as many segments as it
/// has atoms.
fn window_pattern(atoms: &[Atom]) -> Result<Option<Regex>, RuleError> {
    if atoms.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!(r"\A{}\z", captures(atoms)))?))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// Validate a context side: `#` is allowed only on the outer edge.
fn context_side(mut pieces: Vec<Piece>, edge: Edge) -> Result<Context, RuleError> {
    let anchored = match edge {
        Edge::Start if pieces.first() == Some(&Piece::Boundary) => {
            pieces.remove(0);
            true
        }
        Edge::End if pieces.last() == Some(&Piece::Boundary) => {
            pieces.pop();
            true
        }
        _ => false,
    };

    let atoms = pieces
        .into_iter()
        .map(|piece| match piece {
            Piece::Atom(atom) => Ok(atom),
            Piece::Boundary => Err(RuleError::MisplacedBoundary),
            Piece::BackReference(_) => Err(RuleError::MisplacedBackReference),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Context { anchored, atoms })
}

/// Reject unbalanced brackets before any splitting happens.
fn check_brackets(text: &str) -> Result<(), ExpressionError> {
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1).ok_or_else(|| ExpressionError::UnmatchedClose(text.to_string()))?;
            }
            _ => {}
        }
    }
    if depth > 0 { Err(ExpressionError::UnmatchedOpen(text.to_string())) } else { Ok(()) }
}

/// Split `text` on `separator` wherever it occurs outside brackets.
fn split_top_level<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut chars = text.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && text[i..].starts_with(separator) => {
                parts.push(&text[start..i]);
                start = i + separator.len();
                // Skip the rest of a multi-character separator.
                for _ in 1..separator.chars().count() {
                    chars.next();
                }
            }
            _ => {}
        }
    }

    parts.push(&text[start..]);
    parts
}

/// Lex one side of a rule into pieces.
fn lex(text: &str, index: &FeatureIndex) -> Result<Vec<Piece>, RuleError> {
    let mut pieces = Vec::new();
    let mut offset = 0;

    while let Some(c) = text[offset..].chars().next() {
        let rest = &text[offset..];
        match c {
            _ if c.is_whitespace() => offset += c.len_utf8(),
            '[' => {
                let len = bracket_len(rest).ok_or_else(|| ExpressionError::UnmatchedOpen(rest.to_string()))?;
                let source = &rest[..len];
                let members = Expression::eval(source, index)?;
                pieces.push(Piece::Atom(Atom::Class(Class { source: source.to_string(), members })));
                offset += len;
            }
            ']' => return Err(ExpressionError::UnmatchedClose(text.to_string()).into()),
            '#' => {
                pieces.push(Piece::Boundary);
                offset += 1;
            }
            '_' => return Err(RuleError::StrayTarget),
            '\\' if rest[1..].starts_with(|d: char| d.is_ascii_digit()) => {
                let digits = rest[1..].chars().take_while(char::is_ascii_digit).count();
                // Overlong numbers fall out of range in `compile`.
                let n = rest[1..1 + digits].parse().unwrap_or(usize::MAX);
                pieces.push(Piece::BackReference(n));
                offset += 1 + digits;
            }
            _ => {
                let len = index.segmenter().segment_len_at(rest);
                pieces.push(Piece::Atom(Atom::Segment(rest[..len].to_string())));
                offset += len;
            }
        }
    }

    Ok(pieces)
}

/// Byte length of the bracketed group at the start of `text`, brackets included.
fn bracket_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
