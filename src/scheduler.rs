use std::collections::HashSet;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::attempt::Attempt;
use crate::card::Card;
use crate::sm2::{self, Quality, QualityPolicy};
use crate::store::{Change, Document, DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("card {0} not found")]
    NotFound(String),
    #[error("card front must not be empty")]
    EmptyFront,
    #[error("quality {0} is outside 0..=5")]
    QualityOutOfRange(i64),
    #[error("study document storage failed")]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Owns the card collection inside a [`DocumentStore`] and applies SM-2.
///
/// Every call re-reads the store; mutations go through
/// [`DocumentStore::update`] so a concurrent writer never gets overwritten.
pub struct Scheduler<S> {
    store: S,
    quality_policy: QualityPolicy,
}

impl<S: DocumentStore> Scheduler<S> {
    pub fn new(store: S) -> Self {
        Scheduler {
            store,
            quality_policy: QualityPolicy::default(),
        }
    }

    pub fn with_quality_policy(mut self, quality_policy: QualityPolicy) -> Self {
        self.quality_policy = quality_policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn add_card(&self, front: &str, back: &str) -> Result<Card> {
        self.add_card_at(front, back, Utc::now())
    }

    pub fn add_card_at(&self, front: &str, back: &str, now: DateTime<Utc>) -> Result<Card> {
        if front.trim().is_empty() {
            return Err(SchedulerError::EmptyFront);
        }

        let card = self.store.update(|doc| {
            if let Some(existing) = doc.card_by_front(front) {
                return Change::Keep(existing.clone());
            }
            let card = fresh_card(doc, front, back, now);
            doc.srs_cards.push(card.clone());
            Change::Write(card)
        })?;
        tracing::debug!(id = %card.id, "add_card");
        Ok(card)
    }

    /// Turns graded attempts into cards, skipping fronts that already exist.
    pub fn import_attempts(&self, attempts: &[Attempt]) -> Result<usize> {
        self.import_attempts_at(attempts, Utc::now())
    }

    pub fn import_attempts_at(&self, attempts: &[Attempt], now: DateTime<Utc>) -> Result<usize> {
        if attempts.is_empty() {
            return Ok(0);
        }

        let added = self.store.update(|doc| {
            let mut fronts: HashSet<String> =
                doc.srs_cards.iter().map(|card| card.front.clone()).collect();
            let mut added = 0;
            for attempt in attempts {
                let Some(front) = attempt.front() else {
                    continue;
                };
                if !fronts.insert(front.to_string()) {
                    continue;
                }
                let card = fresh_card(doc, front, attempt.back(), now);
                doc.srs_cards.push(card);
                added += 1;
            }

            if added == 0 {
                Change::Keep(0)
            } else {
                Change::Write(added)
            }
        })?;

        if added > 0 {
            tracing::info!(added, offered = attempts.len(), "imported attempts as cards");
        }
        Ok(added)
    }

    /// Cards with `next_review <= as_of`, most overdue first.
    pub fn due_cards(&self, as_of: DateTime<Utc>) -> Result<Vec<Card>> {
        let doc = self.store.load()?;
        let mut due: Vec<Card> = doc
            .srs_cards
            .into_iter()
            .filter(|card| card.is_due(as_of))
            .collect();
        due.sort_by_key(|card| card.next_review);
        Ok(due)
    }

    pub fn schedule_card(&self, card_id: &str, quality: i64) -> Result<Card> {
        self.schedule_card_at(card_id, quality, Utc::now())
    }

    pub fn schedule_card_at(
        &self,
        card_id: &str,
        quality: i64,
        now: DateTime<Utc>,
    ) -> Result<Card> {
        let rating = Quality::new(quality, self.quality_policy)
            .ok_or(SchedulerError::QualityOutOfRange(quality))?;

        let updated = self.store.update(|doc| match doc.card_mut(card_id) {
            Some(card) => {
                sm2::review(card, rating, now).apply(card);
                Change::Write(Some(card.clone()))
            }
            None => Change::Keep(None),
        })?;

        let card = updated.ok_or_else(|| SchedulerError::NotFound(card_id.to_string()))?;
        tracing::debug!(
            id = %card.id,
            quality = rating.value(),
            interval = card.interval,
            repetitions = card.repetitions,
            "scheduled card"
        );
        Ok(card)
    }

    pub fn card(&self, card_id: &str) -> Result<Option<Card>> {
        Ok(self.store.load()?.card(card_id).cloned())
    }

    pub fn cards(&self) -> Result<Vec<Card>> {
        Ok(self.store.load()?.srs_cards)
    }
}

// Ids are random; draw again on the rare collision.
fn fresh_card(doc: &Document, front: &str, back: &str, now: DateTime<Utc>) -> Card {
    loop {
        let card = Card::new(front, back, now);
        if doc.card(&card.id).is_none() {
            return card;
        }
    }
}
