use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Local, Utc};

use crate::card::{Card, CardLifeCycle};
use crate::sm2::MIN_EASE_FACTOR;

// ease factors above this land in the top histogram bin
pub const EASE_HISTOGRAM_CEILING: f64 = 3.0;

#[derive(Debug, Default)]
pub struct CardStats {
    pub num_cards: usize,
    pub card_lifecycles: HashMap<CardLifeCycle, usize>,
    pub due_cards: usize,
    pub upcoming_week: BTreeMap<String, usize>,
    pub upcoming_month: usize,
    pub ease_histogram: Histogram<5>,
}

#[derive(Debug, Clone)]
pub struct Histogram<const N: usize> {
    pub bins: [u32; N],
    count: u64,
    sum: f64,
}

impl<const N: usize> Default for Histogram<N> {
    #[inline]
    fn default() -> Self {
        Self {
            bins: [0; N],
            count: 0,
            sum: 0.0,
        }
    }
}

impl<const N: usize> Histogram<N> {
    /// Records a value already normalised to `0.0..=1.0`.
    pub fn update(&mut self, value: f64) {
        let v = value.clamp(0.0, 1.0);
        let idx = ((v * N as f64) as usize).min(N - 1);
        self.bins[idx] += 1;
        self.count += 1;
        self.sum += value;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

impl CardStats {
    pub fn collect<'a>(cards: impl IntoIterator<Item = &'a Card>, now: DateTime<Utc>) -> Self {
        let mut stats = CardStats::default();
        for card in cards {
            stats.update(card, now);
        }
        stats
    }

    pub fn update(&mut self, card: &Card, now: DateTime<Utc>) {
        let week_horizon = now + Duration::days(7);
        let month_horizon = now + Duration::days(30);

        self.num_cards += 1;
        *self.card_lifecycles.entry(card.lifecycle()).or_insert(0) += 1;

        if card.is_due(now) {
            self.due_cards += 1;
            *self.upcoming_week.entry(local_day(now)).or_insert(0) += 1;
            self.upcoming_month += 1;
        } else {
            if card.next_review <= week_horizon {
                *self
                    .upcoming_week
                    .entry(local_day(card.next_review))
                    .or_insert(0) += 1;
            }
            if card.next_review <= month_horizon {
                self.upcoming_month += 1;
            }
        }

        if card.lifecycle() != CardLifeCycle::New {
            let span = EASE_HISTOGRAM_CEILING - MIN_EASE_FACTOR;
            self.ease_histogram
                .update((card.ease_factor - MIN_EASE_FACTOR) / span);
        }
    }

    pub fn lifecycle_count(&self, lifecycle: CardLifeCycle) -> usize {
        self.card_lifecycles.get(&lifecycle).copied().unwrap_or(0)
    }
}

// calendar day as the user sees it
fn local_day(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_due_in(days: i64, now: DateTime<Utc>) -> Card {
        let mut card = Card::new("Q", "A", now);
        card.repetitions = 2;
        card.interval = days.max(1) as u32;
        card.next_review = now + Duration::days(days);
        card
    }

    #[test]
    fn counts_new_card_as_due_and_new() {
        let now = Utc::now();
        let card = Card::new("Q", "A", now);
        let stats = CardStats::collect([&card], now);

        assert_eq!(stats.lifecycle_count(CardLifeCycle::New), 1);
        assert_eq!(stats.due_cards, 1);
        assert_eq!(stats.upcoming_month, 1);
        // ease histogram should NOT be updated for unreviewed cards
        assert_eq!(stats.ease_histogram.count(), 0);
    }

    #[test]
    fn marks_mature_future_due_cards_correctly() {
        let now = Utc::now();
        let card = card_due_in(3, now);
        let stats = CardStats::collect([&card], now);

        assert_eq!(stats.lifecycle_count(CardLifeCycle::Mature), 1);
        assert_eq!(stats.due_cards, 0);
        assert_eq!(stats.upcoming_month, 1);
        assert_eq!(stats.upcoming_week.values().sum::<usize>(), 1);
        assert_eq!(stats.ease_histogram.count(), 1);
    }

    #[test]
    fn upcoming_days_use_the_local_calendar() {
        let now = Utc::now();
        let due_now = Card::new("Q", "A", now);
        let later = card_due_in(2, now);
        let stats = CardStats::collect([&due_now, &later], now);

        let today = now.with_timezone(&Local).date_naive();
        let in_two_days = later.next_review.with_timezone(&Local).date_naive();
        assert_eq!(stats.upcoming_week.get(&today.to_string()), Some(&1));
        assert_eq!(stats.upcoming_week.get(&in_two_days.to_string()), Some(&1));
    }

    #[test]
    fn far_future_cards_fall_outside_both_horizons() {
        let now = Utc::now();
        let card = card_due_in(45, now);
        let stats = CardStats::collect([&card], now);

        assert_eq!(stats.num_cards, 1);
        assert_eq!(stats.upcoming_month, 0);
        assert!(stats.upcoming_week.is_empty());
    }

    #[test]
    fn histogram_mean_returns_none_when_empty() {
        let histogram: Histogram<5> = Histogram::default();
        assert_eq!(histogram.mean(), None);
    }

    #[test]
    fn histogram_mean_calculates_average_correctly() {
        let mut histogram: Histogram<5> = Histogram::default();
        histogram.update(0.2);
        histogram.update(0.4);
        histogram.update(0.6);

        let mean = histogram.mean().unwrap();
        assert!(
            (mean - 0.4).abs() < 0.001,
            "Expected mean ~0.4, got {}",
            mean
        );
    }

    #[test]
    fn floor_ease_lands_in_first_bin() {
        let now = Utc::now();
        let mut card = card_due_in(2, now);
        card.ease_factor = MIN_EASE_FACTOR;
        let stats = CardStats::collect([&card], now);

        assert_eq!(stats.ease_histogram.bins[0], 1);
    }
}
