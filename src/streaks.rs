use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error};

use crate::card::timestamp;
use crate::store::{Change, DocumentStore, StoreError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayActivity {
    #[serde(default)]
    pub visits: u32,
    #[serde(default)]
    pub assessments: u32,
}

impl DayActivity {
    pub fn is_active(&self) -> bool {
        self.visits + self.assessments > 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyActivity {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DayActivity>,
    #[serde(default)]
    pub total_assessments: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_badges")]
    pub badges: BTreeMap<String, DateTime<Utc>>,
}

fn deserialize_badges<'de, D>(deserializer: D) -> Result<BTreeMap<String, DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, String>::deserialize(deserializer)?
        .into_iter()
        .map(|(name, awarded)| match timestamp::parse(&awarded) {
            Some(at) => Ok((name, at)),
            None => Err(D::Error::custom(format!("invalid badge timestamp: {awarded}"))),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Badge {
    FirstActivity,
    ThreeDayStreak,
    SevenDayStreak,
    ThirtyDayStreak,
    TenAssessments,
}

impl Badge {
    pub const ALL: [Badge; 5] = [
        Badge::FirstActivity,
        Badge::ThreeDayStreak,
        Badge::SevenDayStreak,
        Badge::ThirtyDayStreak,
        Badge::TenAssessments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Badge::FirstActivity => "First Activity",
            Badge::ThreeDayStreak => "3-Day Streak",
            Badge::SevenDayStreak => "7-Day Streak",
            Badge::ThirtyDayStreak => "30-Day Streak",
            Badge::TenAssessments => "10 Assessments",
        }
    }

    fn earned(self, progress: &Progress) -> bool {
        match self {
            Badge::FirstActivity => progress.total_days_active >= 1,
            Badge::ThreeDayStreak => progress.streak >= 3,
            Badge::SevenDayStreak => progress.streak >= 7,
            Badge::ThirtyDayStreak => progress.streak >= 30,
            Badge::TenAssessments => progress.total_assessments >= 10,
        }
    }
}

struct Progress {
    streak: u32,
    total_assessments: u32,
    total_days_active: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StreakInfo {
    pub streak: u32,
    pub total_assessments: u32,
    pub total_days_active: usize,
    pub badges: Vec<String>,
    pub newly_earned: Vec<String>,
    pub last_active: Option<NaiveDate>,
}

impl StudyActivity {
    pub fn record_visit(&mut self, today: NaiveDate) {
        self.days.entry(today).or_default().visits += 1;
        self.last_active = Some(today);
    }

    pub fn record_assessment(&mut self, today: NaiveDate) {
        self.days.entry(today).or_default().assessments += 1;
        self.total_assessments += 1;
        self.last_active = Some(today);
    }

    /// Consecutive active days ending at `today`.
    pub fn streak(&self, today: NaiveDate) -> u32 {
        let mut streak = 0;
        let mut day = today;
        while self.days.get(&day).is_some_and(DayActivity::is_active) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    pub fn total_days_active(&self) -> usize {
        self.days.values().filter(|day| day.is_active()).count()
    }

    /// Streak summary; awards any badge whose condition is now met.
    pub fn streak_info(&mut self, today: NaiveDate, now: DateTime<Utc>) -> StreakInfo {
        let progress = Progress {
            streak: self.streak(today),
            total_assessments: self.total_assessments,
            total_days_active: self.total_days_active(),
        };

        let mut newly_earned = Vec::new();
        for badge in Badge::ALL {
            if badge.earned(&progress) && !self.badges.contains_key(badge.name()) {
                self.badges.insert(badge.name().to_string(), now);
                newly_earned.push(badge.name().to_string());
            }
        }

        StreakInfo {
            streak: progress.streak,
            total_assessments: progress.total_assessments,
            total_days_active: progress.total_days_active,
            badges: self.badges.keys().cloned().collect(),
            newly_earned,
            last_active: self.last_active,
        }
    }
}

pub fn record_visit<S: DocumentStore>(store: &S, today: NaiveDate) -> Result<(), StoreError> {
    store.update(|doc| {
        doc.study_activity.record_visit(today);
        Change::Write(())
    })
}

pub fn streak_info<S: DocumentStore>(
    store: &S,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<StreakInfo, StoreError> {
    store.update(|doc| {
        let info = doc.study_activity.streak_info(today, now);
        if info.newly_earned.is_empty() {
            Change::Keep(info)
        } else {
            tracing::info!(badges = ?info.newly_earned, "awarded study badges");
            Change::Write(info)
        }
    })
}
