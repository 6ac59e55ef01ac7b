//! Rule-of-thumb grading for short German sentences.
//!
//! The checks are deliberately shallow: a small noun lexicon, a list of
//! common conjugated verbs, and a few surface rules. They are enough to
//! catch the typical beginner slips and to produce a corrected sentence that
//! can be drilled as a card.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::attempt::Attempt;

const POINTS_PER_ISSUE: u32 = 15;
const TERMINALS: [char; 3] = ['.', '!', '?'];
const TRIM: [char; 4] = ['.', ',', '!', '?'];
const ARTICLES: [&str; 3] = ["der", "die", "das"];

const NOUNS: [(&str, &str); 10] = [
    ("Haus", "das"),
    ("Auto", "das"),
    ("Mann", "der"),
    ("Frau", "die"),
    ("Tag", "der"),
    ("Kind", "das"),
    ("Tisch", "der"),
    ("Stuhl", "der"),
    ("Buch", "das"),
    ("Freund", "der"),
];

const VERBS: [&str; 13] = [
    "ist", "hat", "geht", "kommt", "macht", "sehen", "sieht", "isst", "lernt", "arbeitet",
    "spielt", "sprechen", "spricht",
];

struct Noun {
    spelling: &'static str,
    article: &'static str,
}

static NOUN_LEXICON: Lazy<HashMap<String, Noun>> = Lazy::new(|| {
    NOUNS
        .iter()
        .map(|&(spelling, article)| (spelling.to_lowercase(), Noun { spelling, article }))
        .collect()
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Issue {
    Punctuation,
    CapitalizationFirst,
    NounCapitalization {
        word: String,
        suggestion: String,
    },
    VerbPosition {
        verb: String,
        found_index: usize,
    },
    ArticleAgreement {
        article: String,
        noun: String,
        suggestion: String,
    },
}

impl Issue {
    pub fn message(&self) -> String {
        match self {
            Issue::Punctuation => {
                "Sentence should end with a punctuation mark (., !, ?).".to_string()
            }
            Issue::CapitalizationFirst => "Sentence should start with a capital letter.".to_string(),
            Issue::NounCapitalization { .. } => {
                "German nouns must be capitalized (Nomen werden großgeschrieben).".to_string()
            }
            Issue::VerbPosition { .. } => {
                "In main clauses, the conjugated verb often appears in second position (Verb-Zweitstellung).".to_string()
            }
            Issue::ArticleAgreement {
                article,
                noun,
                suggestion,
            } => format!(
                "Article '{article}' may not agree with noun '{noun}'. Suggested: '{suggestion}'."
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Assessment {
    pub original: String,
    pub level: String,
    pub score: u32,
    pub issues: Vec<Issue>,
    pub correction: String,
}

impl Assessment {
    pub fn explanations(&self) -> Vec<String> {
        self.issues.iter().map(Issue::message).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn attempt(&self, now: DateTime<Utc>) -> Attempt {
        Attempt {
            score: Some(self.score.into()),
            created: Some(now),
            ..Attempt::new(self.original.clone(), self.correction.clone())
        }
    }
}

pub fn assess_sentence(sentence: &str, level: &str) -> Assessment {
    let original = sentence.trim();
    let words: Vec<&str> = original.split_whitespace().collect();
    let mut issues = Vec::new();

    if !original.ends_with(TERMINALS) {
        issues.push(Issue::Punctuation);
    }
    if original.chars().next().is_some_and(|c| !c.is_uppercase()) {
        issues.push(Issue::CapitalizationFirst);
    }

    let noun_fixes = lowercase_nouns(&words);
    issues.extend(noun_fixes.iter().map(|(word, suggestion)| {
        Issue::NounCapitalization {
            word: word.to_string(),
            suggestion: suggestion.to_string(),
        }
    }));

    if let Some(issue) = verb_position(&words) {
        issues.push(issue);
    }
    issues.extend(article_agreement(&words));

    let score = 100u32.saturating_sub(POINTS_PER_ISSUE * issues.len() as u32);
    let correction = correct(&words, &noun_fixes);

    Assessment {
        original: original.to_string(),
        level: level.to_string(),
        score,
        issues,
        correction,
    }
}

fn bare(word: &str) -> &str {
    word.trim_matches(TRIM)
}

fn lowercase_nouns<'a>(words: &[&'a str]) -> Vec<(&'a str, &'static str)> {
    words
        .iter()
        .map(|word| bare(*word))
        .filter_map(|word| {
            let first = word.chars().next()?;
            let noun = NOUN_LEXICON.get(&word.to_lowercase())?;
            (!first.is_uppercase()).then_some((word, noun.spelling))
        })
        .collect()
}

fn verb_position(words: &[&str]) -> Option<Issue> {
    if words.len() < 2 {
        return None;
    }
    let (idx, verb) = words
        .iter()
        .map(|word| bare(word).to_lowercase())
        .enumerate()
        .find(|(_, word)| VERBS.contains(&word.as_str()))?;

    (idx != 1).then_some(Issue::VerbPosition {
        verb,
        found_index: idx,
    })
}

fn article_agreement(words: &[&str]) -> Vec<Issue> {
    words
        .windows(2)
        .filter_map(|pair| {
            let article = bare(pair[0]);
            let noun_word = bare(pair[1]);
            let lowered = article.to_lowercase();
            if !ARTICLES.contains(&lowered.as_str()) {
                return None;
            }
            let noun = NOUN_LEXICON.get(&noun_word.to_lowercase())?;
            (lowered != noun.article).then(|| Issue::ArticleAgreement {
                article: article.to_string(),
                noun: noun_word.to_string(),
                suggestion: format!("{} {}", noun.article, noun.spelling),
            })
        })
        .collect()
}

fn correct(words: &[&str], noun_fixes: &[(&str, &'static str)]) -> String {
    let mut corrected = words
        .iter()
        .map(|word| {
            let core = bare(word);
            match noun_fixes.iter().find(|(flagged, _)| *flagged == core) {
                Some((_, fix)) if !core.is_empty() => word.replacen(core, fix, 1),
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if !corrected.ends_with(TERMINALS) {
        corrected.push('.');
    }

    let mut chars = corrected.chars();
    match chars.next() {
        Some(first) if !first.is_uppercase() => first.to_uppercase().chain(chars).collect(),
        _ => corrected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_the_classic_beginner_sentence() {
        let result = assess_sentence("ich habe ein haus", "A1");

        assert_eq!(
            result.issues,
            vec![
                Issue::Punctuation,
                Issue::CapitalizationFirst,
                Issue::NounCapitalization {
                    word: "haus".into(),
                    suggestion: "Haus".into()
                },
            ]
        );
        assert_eq!(result.score, 55);
        assert_eq!(result.correction, "Ich habe ein Haus.");
        assert_eq!(result.level, "A1");
    }

    #[test]
    fn clean_sentence_scores_full_marks() {
        let result = assess_sentence("  Er ist groß.  ", "A2");
        assert!(result.is_clean());
        assert_eq!(result.score, 100);
        assert_eq!(result.original, "Er ist groß.");
        assert_eq!(result.correction, "Er ist groß.");
    }

    #[test]
    fn verb_outside_second_position() {
        let result = assess_sentence("Heute ich spiele, und er spielt.", "A1");
        assert_eq!(
            result.issues,
            vec![Issue::VerbPosition {
                verb: "spielt".into(),
                found_index: 5
            }]
        );
    }

    #[test]
    fn only_the_first_known_verb_is_checked() {
        let result = assess_sentence("Er ist hier und hat Zeit.", "A1");
        assert!(result.is_clean());
    }

    #[test]
    fn article_disagreement_is_reported() {
        let result = assess_sentence("Ich sehe die Tisch.", "A1");
        assert_eq!(
            result.issues,
            vec![Issue::ArticleAgreement {
                article: "die".into(),
                noun: "Tisch".into(),
                suggestion: "der Tisch".into()
            }]
        );
        assert!(result.explanations()[0].contains("der Tisch"));
    }

    #[test]
    fn score_never_goes_negative() {
        let result = assess_sentence("die tisch die stuhl die buch das mann ist", "A1");
        assert!(result.issues.len() > 7);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn correction_keeps_punctuation_around_nouns() {
        let result = assess_sentence("Das ist mein auto, oder?", "A1");
        assert_eq!(result.correction, "Das ist mein Auto, oder?");
    }

    #[test]
    fn attempt_carries_the_correction() {
        let now = Utc::now();
        let attempt = assess_sentence("das kind spielt", "A1").attempt(now);
        assert_eq!(attempt.front(), Some("das kind spielt"));
        assert_eq!(attempt.back(), "Das Kind spielt.");
        assert_eq!(attempt.created, Some(now));
    }

    #[test]
    fn issues_serialize_with_a_type_tag() {
        let json = serde_json::to_value(Issue::NounCapitalization {
            word: "buch".into(),
            suggestion: "Buch".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "noun_capitalization");
        assert_eq!(json["suggestion"], "Buch");
    }
}
