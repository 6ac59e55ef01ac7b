use anyhow::{Context, Result};
use chrono::{Local, Utc};

use crate::assess::{Assessment, assess_sentence};
use crate::attempt;
use crate::palette::Palette;
use crate::scheduler::Scheduler;
use crate::store::DocumentStore;
use crate::streaks::{self, StreakInfo};
use crate::tasks::{DEFAULT_KINDS, Task, TaskKind, generate_tasks};
use crate::utils::{pluralize, strip_controls_and_escapes};

pub fn assess<S: DocumentStore>(
    scheduler: &Scheduler<S>,
    sentence: &str,
    level: &str,
    add_card: bool,
) -> Result<Assessment> {
    let sentence = strip_controls_and_escapes(sentence);
    let assessment = assess_sentence(&sentence, level);
    print_assessment(&assessment);

    let attempt = assessment.attempt(Utc::now());
    attempt::record(scheduler.store(), &attempt, Local::now().date_naive())
        .context("Failed to save attempt")?;

    if add_card {
        let added = scheduler
            .import_attempts(std::slice::from_ref(&attempt))
            .context("Failed to add attempt as a card")?;
        if added == 0 {
            println!("{}", Palette::dim("A card for this sentence already exists."));
        } else {
            println!("{}", Palette::paint(Palette::SUCCESS, "Added as a card."));
        }
    }
    Ok(assessment)
}

fn print_assessment(assessment: &Assessment) {
    println!(
        "{} {} {}",
        Palette::dim("Score:"),
        Palette::paint(
            Palette::for_score(assessment.score),
            format!("{}/100", assessment.score)
        ),
        Palette::dim(format!("(level {})", assessment.level))
    );
    if assessment.is_clean() {
        println!("{}", Palette::paint(Palette::SUCCESS, "No issues found."));
    } else {
        for explanation in assessment.explanations() {
            println!("{} {}", Palette::paint(Palette::WARNING, "-"), explanation);
        }
    }
    println!(
        "{} {}",
        Palette::dim("Correction:"),
        Palette::paint(Palette::INFO, &assessment.correction)
    );
}

pub fn tasks(sentence: &str, level: &str, count: usize, kinds: &[TaskKind]) -> Vec<Task> {
    let kinds = if kinds.is_empty() {
        &DEFAULT_KINDS[..]
    } else {
        kinds
    };
    let tasks = generate_tasks(sentence, level, count, kinds, &mut rand::rng());

    if tasks.is_empty() {
        println!("{}", Palette::dim("No exercises could be built from that sentence."));
    }
    for (idx, task) in tasks.iter().enumerate() {
        println!("{}. {}", idx + 1, task.prompt());
        match task {
            Task::FillBlank { answer, .. } => {
                println!("   {}", Palette::dim(format!("answer: {answer}")));
            }
            Task::MultipleChoice {
                options, answer, ..
            } => {
                println!("   {}", options.join(" / "));
                println!("   {}", Palette::dim(format!("answer: {answer}")));
            }
            Task::Correction { answer_example, .. } => {
                println!(
                    "   {}",
                    Palette::dim(format!("example: {}", answer_example.correction))
                );
            }
            Task::Roleplay { note, .. } => println!("   {}", Palette::dim(note)),
            Task::Translation { .. } => {}
        }
    }
    tasks
}

pub fn streak<S: DocumentStore>(store: &S) -> Result<StreakInfo> {
    let today = Local::now().date_naive();
    streaks::record_visit(store, today).context("Failed to record visit")?;
    let info = streaks::streak_info(store, today, Utc::now()).context("Failed to load streak")?;

    println!(
        "{} {}",
        Palette::dim("Current streak:"),
        Palette::paint(Palette::ACCENT, pluralize("day", info.streak as usize))
    );
    println!(
        "{} {} {} {}",
        Palette::dim("Days active:"),
        Palette::paint(Palette::INFO, info.total_days_active),
        Palette::dim("Assessments:"),
        Palette::paint(Palette::INFO, info.total_assessments)
    );
    for badge in &info.newly_earned {
        println!("{} {}", Palette::paint(Palette::SUCCESS, "New badge:"), badge);
    }
    if !info.badges.is_empty() {
        println!("{} {}", Palette::dim("Badges:"), info.badges.join(", "));
    }
    Ok(info)
}
