// Pattern domain models - compiled entries and the immutable store snapshot.
//
// Every surviving source line becomes a `CompiledEntry`: a tagged variant of
// the forms it can be matched as. The literal-first / regex-second query
// policy lives in `PatternSnapshot`, which is built fully off to the side
// during a reload and then published atomically by the store.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::normalize::Normalizer;

/// Characters that mark a line as a regex rather than a plain word/phrase.
const REGEX_METACHARS: &str = "^$.*+?{}[]\\|()";

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Pattern source error: {0}")]
    Source(String),
}

/// Options shared by both stores (block-list and allow-list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOptions {
    /// Compile plain (non-regex) lines into substring matchers over their
    /// normalized form, so one entry catches its spelling variants.
    pub auto_variants: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self { auto_variants: true }
    }
}

/// Which form of an entry produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOrigin {
    Literal,
    Regex,
}

impl std::fmt::Display for MatchOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOrigin::Literal => write!(f, "literal"),
            MatchOrigin::Regex => write!(f, "regex"),
        }
    }
}

/// A block-list hit with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The raw source line that matched.
    pub raw: String,
    /// The offending substring. For literal hits this is the raw entry
    /// itself; for regex hits, the matched fragment of the input.
    pub matched: String,
    pub origin: MatchOrigin,
}

/// A plain entry matched as a case-insensitive substring of normalized text.
#[derive(Debug, Clone)]
pub struct LiteralEntry {
    pub raw: String,
    pub normalized: String,
    matcher: Regex,
}

/// An entry matched as a case-insensitive regex.
#[derive(Debug, Clone)]
pub struct RegexEntry {
    pub raw: String,
    pattern: Regex,
}

/// The matchable forms of one source line.
#[derive(Debug, Clone)]
pub enum CompiledEntry {
    LiteralOnly(LiteralEntry),
    RegexOnly(RegexEntry),
    Both {
        literal: LiteralEntry,
        regex: RegexEntry,
    },
}

/// Result of compiling one line; `regex_error` carries a compile failure for
/// the caller to log with its line number.
pub struct CompiledLine {
    pub entry: Option<CompiledEntry>,
    pub regex_error: Option<regex::Error>,
}

pub fn looks_like_regex(value: &str) -> bool {
    value.chars().any(|c| REGEX_METACHARS.contains(c))
}

/// Compile one trimmed, non-comment source line into its matchable forms.
///
/// The literal form exists only when auto-variants is on, the line carries
/// no regex metacharacters, and its normalized form is non-blank. The regex
/// form is always attempted from the raw line; a compile failure drops only
/// that form.
pub fn compile_line(raw: &str, normalizer: &Normalizer, auto_variants: bool) -> CompiledLine {
    let literal = if auto_variants && !looks_like_regex(raw) {
        let normalized = normalizer.normalize(raw);
        if normalized.trim().is_empty() {
            None
        } else {
            RegexBuilder::new(&regex::escape(&normalized))
                .case_insensitive(true)
                .build()
                .ok()
                .map(|matcher| LiteralEntry {
                    raw: raw.to_string(),
                    normalized,
                    matcher,
                })
        }
    } else {
        None
    };

    let (regex, regex_error) = match RegexBuilder::new(raw).case_insensitive(true).build() {
        Ok(pattern) => (
            Some(RegexEntry {
                raw: raw.to_string(),
                pattern,
            }),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    let entry = match (literal, regex) {
        (Some(literal), Some(regex)) => Some(CompiledEntry::Both { literal, regex }),
        (Some(literal), None) => Some(CompiledEntry::LiteralOnly(literal)),
        (None, Some(regex)) => Some(CompiledEntry::RegexOnly(regex)),
        (None, None) => None,
    };

    CompiledLine { entry, regex_error }
}

/// One immutable, consistent view of a store: literal entries, regex entries
/// (both in file order) and the raw line set. Readers hold an `Arc` to a
/// snapshot and are never affected by a concurrent reload.
#[derive(Debug, Clone, Default)]
pub struct PatternSnapshot {
    literals: Vec<LiteralEntry>,
    regexes: Vec<RegexEntry>,
    raw_entries: HashSet<String>,
}

impl PatternSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn insert_raw(&mut self, raw: &str) {
        self.raw_entries.insert(raw.to_string());
    }

    pub(crate) fn push(&mut self, entry: CompiledEntry) {
        match entry {
            CompiledEntry::LiteralOnly(literal) => self.literals.push(literal),
            CompiledEntry::RegexOnly(regex) => self.regexes.push(regex),
            CompiledEntry::Both { literal, regex } => {
                self.literals.push(literal);
                self.regexes.push(regex);
            }
        }
    }

    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    pub fn regex_count(&self) -> usize {
        self.regexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty() && self.regexes.is_empty()
    }

    pub fn contains_raw(&self, value: &str) -> bool {
        self.raw_entries.contains(value.trim())
    }

    /// Block-list query: literals in file order, then regexes in file order;
    /// first hit wins. Literal checks run first to bound the cost of the
    /// common case (plain banned words).
    pub fn find_match(&self, normalized: &str) -> Option<PatternMatch> {
        if normalized.is_empty() {
            return None;
        }
        for literal in &self.literals {
            if literal.matcher.is_match(normalized) {
                return Some(PatternMatch {
                    raw: literal.raw.clone(),
                    matched: literal.raw.clone(),
                    origin: MatchOrigin::Literal,
                });
            }
        }
        for entry in &self.regexes {
            if let Some(found) = entry.pattern.find(normalized) {
                return Some(PatternMatch {
                    raw: entry.raw.clone(),
                    matched: found.as_str().to_string(),
                    origin: MatchOrigin::Regex,
                });
            }
        }
        None
    }

    /// Allow-list query. Literals are checked against the normalized text;
    /// each regex entry is checked against the original text first, then
    /// retried against the normalized text when the two differ. First hit
    /// at any step wins.
    pub fn find_exempt_match(&self, normalized: &str, original: &str) -> Option<String> {
        if normalized.is_empty() && original.is_empty() {
            return None;
        }
        for literal in &self.literals {
            if literal.matcher.is_match(normalized) {
                return Some(literal.raw.clone());
            }
        }
        for entry in &self.regexes {
            if entry.pattern.is_match(original) {
                return Some(entry.raw.clone());
            }
            if !normalized.is_empty() && normalized != original && entry.pattern.is_match(normalized)
            {
                return Some(entry.raw.clone());
            }
        }
        None
    }
}

/// What a reload produced, for operator-facing log lines and admin feedback.
#[derive(Debug, Clone, Copy)]
pub struct ReloadOutcome {
    pub literal_count: usize,
    pub regex_count: usize,
    /// Lines whose regex form failed to compile and was skipped.
    pub skipped_lines: usize,
    /// True when no usable entries were loaded and the store matches nothing.
    pub safe_mode: bool,
}
