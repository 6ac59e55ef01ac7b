use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attempt::Attempt;
use crate::card::Card;
use crate::streaks::StudyActivity;

/// The persisted JSON document.
///
/// Keys this crate doesn't know about (other assistant features share the
/// file) are carried through `extra` untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub srs_cards: Vec<Card>,
    #[serde(default)]
    pub german_attempts: Vec<Attempt>,
    #[serde(default)]
    pub study_activity: StudyActivity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.srs_cards.iter().find(|card| card.id == id)
    }

    pub fn card_mut(&mut self, id: &str) -> Option<&mut Card> {
        self.srs_cards.iter_mut().find(|card| card.id == id)
    }

    pub fn card_by_front(&self, front: &str) -> Option<&Card> {
        self.srs_cards.iter().find(|card| card.front == front)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn empty_object_is_the_default_document() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, Document::default());
    }

    #[test]
    fn unknown_keys_survive_a_round_trip() {
        let raw = r#"{
            "todos": [{"task": "Brot kaufen", "done": false}],
            "reminders": [],
            "srs_cards": []
        }"#;
        let doc: Document = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.extra.len(), 2);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["todos"][0]["task"], "Brot kaufen");
        assert!(json.get("reminders").is_some());
    }

    #[test]
    fn finds_cards_by_id_and_front() {
        let mut doc = Document::default();
        let card = Card::new("Der Hund bellt.", "", Utc::now());
        let id = card.id.clone();
        doc.srs_cards.push(card);

        assert!(doc.card(&id).is_some());
        assert!(doc.card_by_front("Der Hund bellt.").is_some());
        assert!(doc.card_by_front("der hund bellt.").is_none());

        doc.card_mut(&id).unwrap().repetitions = 3;
        assert_eq!(doc.card(&id).unwrap().repetitions, 3);
    }
}
