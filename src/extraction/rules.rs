//! Deterministic extraction rules.
//!
//! The keyword set, sentence delimiters, fallback items and extractive
//! summary sizes are plain data so deployments can tune them from the
//! `[rules]` config table without touching code.

use crate::defaults;
use crate::error::{MinutesError, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_KEYWORDS: &[&str] = &[
    "will",
    "must",
    "should",
    "need to",
    "needs to",
    "have to",
    "has to",
    "going to",
    "let's",
    "assign",
    "deadline",
    "due",
    "by",
    "complete",
    "finish",
    "prepare",
    "send",
    "review",
    "schedule",
    "put up",
    "remind",
    "meet",
    "help",
    "share",
    "follow up",
];

const DEFAULT_ACTION_ITEMS: &[&str] = &[
    "Review the meeting transcript",
    "Schedule follow-up meeting",
    "Update documentation",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// Words or phrases that mark a clause as an action item.
    /// Matched case-insensitively on whole words.
    pub keywords: Vec<String>,

    /// Marks that end a sentence when followed by whitespace or end of text.
    /// A newline always ends one.
    pub sentence_terminators: Vec<char>,

    /// Returned when no clause qualifies, so the item list is never empty.
    pub default_action_items: Vec<String>,

    /// Sentence units in the extractive summary.
    pub summary_sentences: usize,

    /// A summary shorter than this many characters is extended.
    pub summary_min_chars: usize,

    /// Sentence units used when the summary is extended.
    pub summary_extended_sentences: usize,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            sentence_terminators: vec!['.', '!', '?'],
            default_action_items: DEFAULT_ACTION_ITEMS.iter().map(|s| s.to_string()).collect(),
            summary_sentences: defaults::SUMMARY_SENTENCES,
            summary_min_chars: defaults::SUMMARY_MIN_CHARS,
            summary_extended_sentences: defaults::SUMMARY_EXTENDED_SENTENCES,
        }
    }
}

impl ExtractionRules {
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| MinutesError::ConfigInvalidValue {
            key: format!("rules.{key}"),
            message: message.to_string(),
        };

        if self.default_action_items.iter().all(|i| i.trim().is_empty()) {
            return Err(invalid(
                "default_action_items",
                "must contain at least one non-blank item",
            ));
        }
        if self.summary_sentences == 0 {
            return Err(invalid("summary_sentences", "must be at least 1"));
        }
        if self.summary_extended_sentences < self.summary_sentences {
            return Err(invalid(
                "summary_extended_sentences",
                "must not be smaller than summary_sentences",
            ));
        }
        if self.sentence_terminators.iter().any(|c| c.is_alphanumeric()) {
            return Err(invalid(
                "sentence_terminators",
                "letters and digits cannot end a sentence",
            ));
        }
        Ok(())
    }

    /// Sentence units with their closing punctuation kept.
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        self.split_units(text, true)
    }

    /// Clause units with their closing punctuation dropped.
    pub fn split_clauses(&self, text: &str) -> Vec<String> {
        self.split_units(text, false)
    }

    fn split_units(&self, text: &str, keep_terminator: bool) -> Vec<String> {
        let mut units = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\n' {
                push_unit(&mut units, &mut current);
                continue;
            }

            let ends_unit = self.sentence_terminators.contains(&c)
                && chars.peek().is_none_or(|next| next.is_whitespace());
            if ends_unit {
                if keep_terminator {
                    current.push(c);
                }
                push_unit(&mut units, &mut current);
            } else {
                current.push(c);
            }
        }
        push_unit(&mut units, &mut current);

        units
    }

    pub fn is_action_clause(&self, clause: &str) -> bool {
        KeywordMatcher::new(&self.keywords).matches(clause)
    }

    /// Clauses containing a keyword, in order, without dedup.
    ///
    /// Empty when nothing qualifies; callers substitute the defaults.
    pub fn extract_action_items(&self, text: &str) -> Vec<String> {
        let matcher = KeywordMatcher::new(&self.keywords);
        self.split_clauses(text)
            .into_iter()
            .filter(|clause| matcher.matches(clause))
            .collect()
    }

    pub fn default_items(&self) -> Vec<String> {
        self.default_action_items
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The leading sentences of `text`, extended when they are too short.
    pub fn extractive_summary(&self, text: &str) -> String {
        let sentences = self.split_sentences(text);

        let summary = sentences
            .iter()
            .take(self.summary_sentences)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        if summary.chars().count() < self.summary_min_chars
            && sentences.len() > self.summary_sentences
        {
            return sentences
                .iter()
                .take(self.summary_extended_sentences)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ");
        }

        summary
    }
}

fn push_unit(units: &mut Vec<String>, current: &mut String) {
    let unit = current.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
    current.clear();
}

/// Lowercase words; apostrophes stay inside words so "let's" is one token.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c| c == '\'' || c == '\u{2019}'))
        .filter(|w| !w.is_empty())
        .map(|w| w.replace('\u{2019}', "'").to_lowercase())
        .collect()
}

/// Whole-word phrase matcher built once per extraction.
struct KeywordMatcher {
    phrases: Vec<Vec<String>>,
}

impl KeywordMatcher {
    fn new(keywords: &[String]) -> Self {
        let phrases = keywords
            .iter()
            .map(|k| words(k))
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    fn matches(&self, clause: &str) -> bool {
        let tokens = words(clause);
        self.phrases.iter().any(|phrase| {
            tokens
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
    }
}
