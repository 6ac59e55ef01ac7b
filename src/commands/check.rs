use crate::{
    card::CardLifeCycle,
    palette::Palette,
    scheduler::Scheduler,
    sm2::MIN_EASE_FACTOR,
    stats::{CardStats, EASE_HISTOGRAM_CEILING, Histogram},
    store::DocumentStore,
    utils::pluralize,
};

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};

pub fn run<S: DocumentStore>(scheduler: &Scheduler<S>) -> Result<CardStats> {
    let cards = scheduler.cards().context("Failed to load cards")?;
    let stats = CardStats::collect(&cards, Utc::now());
    render_plain_summary(&stats);
    Ok(stats)
}

fn render_plain_summary(stats: &CardStats) {
    println!("{}", Palette::paint(Palette::ACCENT, "Collection Summary"));
    println!(
        "{} {}",
        Palette::dim("Cards:"),
        Palette::paint(Palette::INFO, stats.num_cards)
    );
    println!(
        "{} {} {} {} {} {}",
        Palette::dim("New:"),
        Palette::paint(Palette::INFO, stats.lifecycle_count(CardLifeCycle::New)),
        Palette::dim("Learning:"),
        Palette::paint(Palette::INFO, stats.lifecycle_count(CardLifeCycle::Learning)),
        Palette::dim("Mature:"),
        Palette::paint(Palette::INFO, stats.lifecycle_count(CardLifeCycle::Mature)),
    );

    println!("\n{}", Palette::paint(Palette::ACCENT, "Due Status"));
    let load_factor = if stats.num_cards == 0 {
        0.0
    } else {
        stats.due_cards as f32 / stats.num_cards as f32
    };
    let due_color = if stats.due_cards > 0 {
        Palette::WARNING
    } else {
        Palette::SUCCESS
    };
    println!(
        "{} {}",
        Palette::dim("Due load:"),
        Palette::paint(due_color, format!("{:.0}%", load_factor * 100.0))
    );
    println!(
        "{} {}",
        Palette::dim("Due now:"),
        Palette::paint(due_color, stats.due_cards)
    );
    println!(
        "{} {}",
        Palette::dim("Next 7 days:"),
        Palette::paint(Palette::INFO, stats.upcoming_week.values().sum::<usize>())
    );
    println!(
        "{} {}",
        Palette::dim("Next 30 days:"),
        Palette::paint(Palette::INFO, stats.upcoming_month)
    );

    println!("\n{}", Palette::paint(Palette::ACCENT, "Next 7 Days"));
    if stats.upcoming_week.is_empty() {
        println!("{}", Palette::dim("You're clear for the next 7 days."));
    } else {
        let max_count = stats.upcoming_week.values().max().copied().unwrap_or(0);
        for (day, count) in &stats.upcoming_week {
            println!(
                "{} {}",
                Palette::dim(format!("{}:", format_upcoming_label(day))),
                format_bar(*count, max_count)
            );
        }
    }

    println!("\n{}", Palette::paint(Palette::ACCENT, "Ease Factors"));
    render_ease_histogram(&stats.ease_histogram);
}

fn render_ease_histogram(histogram: &Histogram<5>) {
    let Some(mean) = histogram.mean() else {
        println!("{}", Palette::dim("NA - No cards reviewed"));
        return;
    };
    let span = EASE_HISTOGRAM_CEILING - MIN_EASE_FACTOR;
    println!(
        "{} {}",
        Palette::dim("Average:"),
        Palette::paint(Palette::INFO, format!("{:.2}", MIN_EASE_FACTOR + mean * span))
    );

    let max_bin = histogram.bins.iter().copied().max().unwrap_or(0);
    for (idx, label) in ease_bin_labels::<5>().iter().enumerate() {
        println!(
            "{} {}",
            Palette::dim(format!("{label}:")),
            format_bar(histogram.bins[idx] as usize, max_bin as usize)
        );
    }
}

fn ease_bin_labels<const N: usize>() -> [String; N] {
    let step = (EASE_HISTOGRAM_CEILING - MIN_EASE_FACTOR) / N as f64;
    std::array::from_fn(|idx| {
        let low = MIN_EASE_FACTOR + step * idx as f64;
        format!("{:.2}-{:.2}", low, low + step)
    })
}

fn format_bar(count: usize, max: usize) -> String {
    let width = 20usize;
    let filled = if max == 0 {
        0
    } else {
        ((count as f64 / max as f64) * width as f64).round() as usize
    };
    let clamped = filled.min(width);
    let bar = "#".repeat(clamped);
    let remainder = "-".repeat(width - clamped);
    format!(
        "{} {}",
        Palette::paint(Palette::INFO, bar + &remainder),
        Palette::dim(pluralize("card", count))
    )
}

fn format_upcoming_label(day: &str) -> String {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(|date| date.format("%a %d").to_string())
        .unwrap_or_else(|_| day.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn format_upcoming_label_pretty_prints_dates() {
        assert_eq!(format_upcoming_label("2024-12-25"), "Wed 25");
    }

    #[test]
    fn format_upcoming_label_falls_back_to_original_input() {
        assert_eq!(format_upcoming_label("not-a-date"), "not-a-date");
    }

    #[test]
    fn ease_bins_cover_the_full_range() {
        let labels = ease_bin_labels::<5>();
        assert_eq!(labels[0], "1.30-1.64");
        assert_eq!(labels[4], "2.66-3.00");
    }

    #[test]
    fn bar_is_scaled_to_the_largest_bucket() {
        let bar = format_bar(5, 10);
        assert!(bar.contains(&format!("{}{}", "#".repeat(10), "-".repeat(10))));
        assert!(bar.contains("5 cards"));
    }

    #[test]
    fn summary_over_a_store() {
        let scheduler = Scheduler::new(MemoryStore::new());
        scheduler.add_card("das Auto", "the car").unwrap();
        let stats = run(&scheduler).unwrap();
        assert_eq!(stats.num_cards, 1);
        assert_eq!(stats.due_cards, 1);
    }

    #[test]
    fn summary_of_empty_collection() {
        render_plain_summary(&CardStats::default());
    }
}
