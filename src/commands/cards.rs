use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};

use crate::attempt::Attempt;
use crate::card::Card;
use crate::palette::Palette;
use crate::scheduler::Scheduler;
use crate::sm2::{Quality, QualityPolicy};
use crate::store::DocumentStore;
use crate::utils::{pluralize, strip_controls_and_escapes};

pub fn add<S: DocumentStore>(scheduler: &Scheduler<S>, front: &str, back: &str) -> Result<Card> {
    let front = strip_controls_and_escapes(front);
    let back = strip_controls_and_escapes(back);
    let card = scheduler
        .add_card(&front, &back)
        .context("Failed to add card")?;

    println!(
        "{} {} {}",
        Palette::paint(Palette::SUCCESS, "Card"),
        Palette::paint(Palette::INFO, &card.id),
        card.front
    );
    Ok(card)
}

/// Imports attempts from a JSON array file, or from the document's own
/// `german_attempts` when no file is given.
pub fn import<S: DocumentStore>(scheduler: &Scheduler<S>, file: Option<&Path>) -> Result<usize> {
    let attempts = match file {
        Some(path) => read_attempts(path)?,
        None => {
            scheduler
                .store()
                .load()
                .context("Failed to load stored attempts")?
                .german_attempts
        }
    };
    let cleaned: Vec<Attempt> = attempts.iter().filter_map(cleaned_attempt).collect();

    let added = scheduler
        .import_attempts(&cleaned)
        .context("Failed to import attempts")?;
    println!(
        "{} {} {}",
        Palette::paint(Palette::SUCCESS, "Imported"),
        pluralize("card", added),
        Palette::dim(format!("from {}", pluralize("attempt", attempts.len())))
    );
    Ok(added)
}

// same cleanup `add` applies, so both paths agree on what a front is
fn cleaned_attempt(attempt: &Attempt) -> Option<Attempt> {
    let front = strip_controls_and_escapes(attempt.front()?);
    Some(Attempt::new(front, strip_controls_and_escapes(attempt.back())))
}

fn read_attempts(path: &Path) -> Result<Vec<Attempt>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of attempts", path.display()))
}

pub fn due<S: DocumentStore>(scheduler: &Scheduler<S>, limit: Option<usize>) -> Result<Vec<Card>> {
    let now = Utc::now();
    let mut cards = scheduler
        .due_cards(now)
        .context("Failed to load due cards")?;
    if let Some(limit) = limit {
        cards.truncate(limit);
    }

    if cards.is_empty() {
        println!("{}", Palette::paint(Palette::SUCCESS, "Nothing due."));
        return Ok(cards);
    }

    for card in &cards {
        println!(
            "{}  {}  {}",
            Palette::paint(Palette::INFO, &card.id),
            card.front,
            Palette::dim(format!(
                "{} since {}",
                card.lifecycle().label(),
                local_time(card.next_review)
            ))
        );
    }
    println!("{}", Palette::dim(pluralize("card", cards.len())));
    Ok(cards)
}

pub fn review<S: DocumentStore>(
    scheduler: &Scheduler<S>,
    card_id: &str,
    quality: i64,
) -> Result<Card> {
    let card = scheduler
        .schedule_card(card_id, quality)
        .with_context(|| format!("Failed to review card {card_id}"))?;

    let label = match Quality::new(quality, QualityPolicy::Clamp) {
        Some(rating) => Palette::paint(Palette::for_quality(rating), rating.label()),
        None => Palette::dim(quality),
    };
    println!(
        "{} {} {}",
        label,
        Palette::dim("next review"),
        Palette::paint(
            Palette::INFO,
            format!(
                "{} (in {})",
                local_time(card.next_review),
                pluralize("day", card.interval as usize)
            )
        )
    );
    Ok(card)
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
