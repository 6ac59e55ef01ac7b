use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Card;

pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MAX_QUALITY: u8 = 5;
pub const PASSING_QUALITY: u8 = 3;

const FIRST_INTERVAL_DAYS: u32 = 1;
const SECOND_INTERVAL_DAYS: u32 = 6;
const LAPSE_INTERVAL_DAYS: u32 = 1;
// Keeps `next_review` well inside chrono's representable range.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// A recall rating in `0..=5`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u8);

/// What to do with a rating outside `0..=5`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPolicy {
    #[default]
    Clamp,
    Reject,
}

impl Quality {
    pub fn new(raw: i64, policy: QualityPolicy) -> Option<Self> {
        match policy {
            QualityPolicy::Clamp => Some(Quality(raw.clamp(0, MAX_QUALITY as i64) as u8)),
            QualityPolicy::Reject => (0..=MAX_QUALITY as i64)
                .contains(&raw)
                .then_some(Quality(raw as u8)),
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_lapse(self) -> bool {
        self.0 < PASSING_QUALITY
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Blackout",
            1 => "Wrong",
            2 => "Almost",
            3 => "Hard",
            4 => "Good",
            _ => "Easy",
        }
    }
}

impl std::str::FromStr for QualityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(QualityPolicy::Clamp),
            "reject" => Ok(QualityPolicy::Reject),
            other => Err(format!("unknown quality policy '{other}' (expected clamp or reject)")),
        }
    }
}

/// The schedule a card takes on after one review.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Review {
    pub repetitions: u32,
    pub interval: u32,
    pub ease_factor: f64,
    pub next_review: DateTime<Utc>,
}

impl Review {
    pub fn apply(&self, card: &mut Card) {
        card.repetitions = self.repetitions;
        card.interval = self.interval;
        card.ease_factor = self.ease_factor;
        card.next_review = self.next_review;
    }
}

pub fn review(card: &Card, quality: Quality, reviewed_at: DateTime<Utc>) -> Review {
    if quality.is_lapse() {
        return Review {
            repetitions: 0,
            interval: LAPSE_INTERVAL_DAYS,
            ease_factor: card.ease_factor,
            next_review: reviewed_at + Duration::days(LAPSE_INTERVAL_DAYS as i64),
        };
    }

    let repetitions = card.repetitions + 1;
    let interval = match repetitions {
        1 => FIRST_INTERVAL_DAYS,
        2 => SECOND_INTERVAL_DAYS,
        // halves go to the even day: 45 days at ease 2.9 gives 130, not 131
        _ => ((card.interval as f64 * card.ease_factor).round_ties_even() as u32)
            .clamp(1, MAX_INTERVAL_DAYS),
    };

    Review {
        repetitions,
        interval,
        ease_factor: next_ease_factor(card.ease_factor, quality),
        next_review: reviewed_at + Duration::days(interval as i64),
    }
}

// EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), stored to four places
fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let miss = (MAX_QUALITY - quality.value()) as f64;
    let updated = ease_factor + (0.1 - miss * (0.08 + miss * 0.02));
    let rounded = (updated * 10_000.0).round() / 10_000.0;
    rounded.max(MIN_EASE_FACTOR)
}
