use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sm2::INITIAL_EASE_FACTOR;

const ID_PREFIX: &str = "c-";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub repetitions: u32,
    #[serde(default)]
    pub interval: u32,
    #[serde(rename = "efactor", default = "default_ease_factor")]
    pub ease_factor: f64,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize_or_now")]
    pub next_review: DateTime<Utc>,
    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize_or_now")]
    pub created: DateTime<Utc>,
}

impl Card {
    pub fn new(front: impl Into<String>, back: impl Into<String>, now: DateTime<Utc>) -> Self {
        Card {
            id: new_card_id(),
            front: front.into(),
            back: back.into(),
            repetitions: 0,
            interval: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review: now,
            created: now,
        }
    }

    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_review <= as_of
    }

    pub fn lifecycle(&self) -> CardLifeCycle {
        if self.repetitions >= 2 {
            CardLifeCycle::Mature
        } else if self.repetitions == 0 && self.interval == 0 {
            CardLifeCycle::New
        } else {
            CardLifeCycle::Learning
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub enum CardLifeCycle {
    New,
    Learning,
    Mature,
}

impl CardLifeCycle {
    pub fn label(&self) -> &'static str {
        match self {
            CardLifeCycle::New => "New",
            CardLifeCycle::Learning => "Learning",
            CardLifeCycle::Mature => "Mature",
        }
    }
}

fn default_ease_factor() -> f64 {
    INITIAL_EASE_FACTOR
}

fn new_card_id() -> String {
    format!("{ID_PREFIX}{:08x}", rand::random::<u32>())
}

/// Reads RFC 3339 timestamps, falling back to offset-less ISO-8601 strings
/// which are taken to be in the local timezone.
pub(crate) mod timestamp {
    use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }

    /// Card schedule timestamp. A value that cannot be read makes the card
    /// due at load time rather than failing the whole document.
    pub fn deserialize_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        match raw.as_str().and_then(parse) {
            Some(at) => Ok(at),
            None => {
                tracing::warn!(value = %raw, "unreadable card timestamp, treating as now");
                Ok(Utc::now())
            }
        }
    }

    /// Optional metadata timestamp; anything unreadable becomes `None`.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(Value::as_str).and_then(parse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, NaiveDate, TimeZone};

    #[test]
    fn new_card_starts_due_now() {
        let now = Utc::now();
        let card = Card::new("Ich habe ein haus", "Ich habe ein Haus.", now);

        assert!(card.id.starts_with("c-"));
        assert_eq!(card.id.len(), 10);
        assert_eq!(card.repetitions, 0);
        assert_eq!(card.interval, 0);
        assert_eq!(card.ease_factor, 2.5);
        assert_eq!(card.next_review, now);
        assert_eq!(card.created, now);
        assert!(card.is_due(now));
        assert!(!card.is_due(now - Duration::seconds(1)));
        assert_eq!(card.lifecycle(), CardLifeCycle::New);
    }

    #[test]
    fn serializes_with_document_keys() {
        let card = Card::new("front", "back", Utc::now());
        let value = serde_json::to_value(&card).unwrap();

        assert!(value.get("efactor").is_some());
        assert!(value.get("next_review").is_some());
        assert!(value.get("created").is_some());
        assert!(value.get("ease_factor").is_none());
    }

    #[test]
    fn round_trip_keeps_sub_second_precision() {
        let now = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let card = Card::new("front", "back", now);

        let json = serde_json::to_string(&card).unwrap();
        let restored: Card = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, card);
        assert_eq!(restored.next_review.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn reads_legacy_naive_timestamps_as_local_time() {
        let json = r#"{
            "id": "c-0badf00d",
            "front": "ich habe ein haus",
            "back": "Ich habe ein Haus.",
            "repetitions": 1,
            "interval": 1,
            "efactor": 2.6,
            "next_review": "2024-03-01T09:30:00.250000",
            "created": "2024-02-29T09:30:00"
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();

        let naive = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(9, 30, 0, 250)
            .unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(card.next_review, expected);
        assert_eq!(card.ease_factor, 2.6);
    }

    #[test]
    fn unreadable_schedule_timestamps_fall_back_to_now() {
        let before = Utc::now();
        let json = r#"{
            "id": "c-0badf00d",
            "front": "ich bin müde",
            "next_review": "",
            "created": 17
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        let after = Utc::now();

        assert!(card.next_review >= before && card.next_review <= after);
        assert!(card.created >= before && card.created <= after);
        assert!(card.is_due(after));
    }

    #[test]
    fn missing_schedule_timestamps_fall_back_to_now() {
        let before = Utc::now();
        let card: Card = serde_json::from_str(r#"{"id": "c-0badf00d", "front": "Tschüss"}"#).unwrap();

        assert!(card.next_review >= before);
        assert!(card.is_due(Utc::now()));
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(timestamp::parse("yesterday").is_none());
        assert!(timestamp::parse("2024-13-01T00:00:00").is_none());
    }

    #[test]
    fn lifecycle_follows_repetitions() {
        let mut card = Card::new("front", "", Utc::now());
        card.repetitions = 1;
        card.interval = 1;
        assert_eq!(card.lifecycle(), CardLifeCycle::Learning);

        card.repetitions = 0;
        card.interval = 1;
        assert_eq!(card.lifecycle(), CardLifeCycle::Learning);

        card.repetitions = 2;
        card.interval = 6;
        assert_eq!(card.lifecycle(), CardLifeCycle::Mature);
    }
}
