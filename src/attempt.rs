use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::card::timestamp;
use crate::store::{Change, DocumentStore, StoreError};

/// A graded sentence: what the learner wrote and the suggested fix.
///
/// Attempts may come from other tools sharing the document, so unknown
/// keys are kept in `extra` and `sentence` is accepted in place of
/// `original`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attempt {
    pub fn new(original: impl Into<String>, correction: impl Into<String>) -> Self {
        Attempt {
            original: Some(original.into()),
            correction: Some(correction.into()),
            ..Default::default()
        }
    }

    /// The card front this attempt would become, if it has one.
    pub fn front(&self) -> Option<&str> {
        [&self.original, &self.sentence]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|text| !text.trim().is_empty())
    }

    pub fn back(&self) -> &str {
        self.correction.as_deref().unwrap_or_default()
    }
}

/// Appends the attempt to the document and counts it toward `today`'s
/// activity in a single commit.
pub fn record<S: DocumentStore>(
    store: &S,
    attempt: &Attempt,
    today: NaiveDate,
) -> Result<(), StoreError> {
    store.update(|doc| {
        doc.german_attempts.push(attempt.clone());
        doc.study_activity.record_assessment(today);
        Change::Write(())
    })?;
    tracing::info!(score = ?attempt.score, "stored attempt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn accepts_legacy_sentence_key() {
        let attempt: Attempt =
            serde_json::from_str(r#"{"sentence": "ich bin müde", "score": 70}"#).unwrap();
        assert_eq!(attempt.front(), Some("ich bin müde"));
        assert_eq!(attempt.back(), "");
        assert_eq!(attempt.score, Some(70.0));
    }

    #[test]
    fn original_wins_over_sentence() {
        let attempt: Attempt = serde_json::from_str(
            r#"{"original": "Ich lerne", "sentence": "ich lerne", "level": "A1", "score": 85.5}"#,
        )
        .unwrap();
        assert_eq!(attempt.front(), Some("Ich lerne"));
        assert_eq!(attempt.score, Some(85.5));
        assert_eq!(attempt.extra["level"], "A1");

        let json = serde_json::to_value(&attempt).unwrap();
        assert_eq!(json["level"], "A1");
        assert_eq!(json["sentence"], "ich lerne");
    }

    #[test]
    fn empty_original_falls_back_to_sentence() {
        let attempt: Attempt =
            serde_json::from_str(r#"{"original": "", "sentence": "Guten Morgen"}"#).unwrap();
        assert_eq!(attempt.front(), Some("Guten Morgen"));
    }

    #[test]
    fn blank_original_has_no_front() {
        let attempt = Attempt::new("   ", "Hallo.");
        assert_eq!(attempt.front(), None);
        assert_eq!(Attempt::default().front(), None);
    }

    #[test]
    fn unreadable_created_is_dropped() {
        let attempt: Attempt =
            serde_json::from_str(r#"{"original": "Guten Tag", "created": "gestern"}"#).unwrap();
        assert_eq!(attempt.created, None);

        let attempt: Attempt =
            serde_json::from_str(r#"{"original": "Guten Tag", "created": null}"#).unwrap();
        assert_eq!(attempt.created, None);
    }

    #[test]
    fn record_stores_attempt_and_activity_together() {
        let store = MemoryStore::new();
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        record(&store, &Attempt::new("ich bin da", "Ich bin da."), today).unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.revision, 1);
        assert_eq!(doc.german_attempts.len(), 1);
        assert_eq!(doc.study_activity.total_assessments, 1);
        assert_eq!(doc.study_activity.last_active, Some(today));
    }
}
