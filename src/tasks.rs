use clap::ValueEnum;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use serde::Serialize;

use crate::assess::{Assessment, assess_sentence};

const BLANK: &str = "_____";
const MIN_BLANK_LEN: usize = 4;
const MAX_OPTIONS: usize = 4;

pub const DEFAULT_KINDS: [TaskKind; 3] =
    [TaskKind::Correction, TaskKind::FillBlank, TaskKind::Translation];

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TaskKind {
    Correction,
    FillBlank,
    MultipleChoice,
    Translation,
    Roleplay,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    Correction {
        prompt: String,
        answer_example: Assessment,
    },
    FillBlank {
        prompt: String,
        answer: String,
    },
    MultipleChoice {
        prompt: String,
        options: Vec<String>,
        answer: String,
    },
    Translation {
        prompt: String,
    },
    Roleplay {
        prompt: String,
        note: String,
    },
}

impl Task {
    pub fn prompt(&self) -> &str {
        match self {
            Task::Correction { prompt, .. }
            | Task::FillBlank { prompt, .. }
            | Task::MultipleChoice { prompt, .. }
            | Task::Translation { prompt }
            | Task::Roleplay { prompt, .. } => prompt,
        }
    }
}

/// Builds up to `count` exercises, one per entry of `kinds`, in order.
///
/// Blank-based kinds are skipped when the sentence has no word longer than
/// three letters.
pub fn generate_tasks<R: Rng + ?Sized>(
    sentence: &str,
    level: &str,
    count: usize,
    kinds: &[TaskKind],
    rng: &mut R,
) -> Vec<Task> {
    let sentence = sentence.trim();
    let words: Vec<&str> = sentence.split_whitespace().collect();
    let candidates: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, word)| bare(word).chars().count() >= MIN_BLANK_LEN)
        .map(|(idx, _)| idx)
        .collect();

    let mut tasks = Vec::new();
    for kind in kinds.iter().take(count) {
        let task = match kind {
            TaskKind::Correction => Some(Task::Correction {
                prompt: format!("Correct the sentence and explain your changes: {sentence}"),
                answer_example: assess_sentence(sentence, level),
            }),
            TaskKind::FillBlank => candidates.choose(rng).map(|&idx| Task::FillBlank {
                prompt: format!("Fill in the blank: {}", with_blank(&words, idx)),
                answer: bare(words[idx]).to_string(),
            }),
            TaskKind::MultipleChoice => candidates.choose(rng).map(|&idx| {
                let answer = bare(words[idx]).to_string();
                let mut options = choice_options(&answer);
                options.shuffle(rng);
                Task::MultipleChoice {
                    prompt: format!(
                        "Choose the correct word for the blank in: {}",
                        with_blank(&words, idx)
                    ),
                    options,
                    answer,
                }
            }),
            TaskKind::Translation => Some(Task::Translation {
                prompt: format!("Translate to English: {sentence}"),
            }),
            TaskKind::Roleplay => Some(Task::Roleplay {
                prompt: format!(
                    "Roleplay: respond in German as a native speaker to: '{sentence}'"
                ),
                note: "Encourage a short reply of 1-3 sentences.".to_string(),
            }),
        };
        tasks.extend(task);
    }
    tasks
}

fn bare(word: &str) -> &str {
    word.trim_matches(['.', ',', '!', '?'])
}

fn with_blank(words: &[&str], idx: usize) -> String {
    words
        .iter()
        .enumerate()
        .map(|(n, word)| if n == idx { BLANK } else { *word })
        .collect::<Vec<_>>()
        .join(" ")
}

// the answer plus near-miss spellings, without duplicates
fn choice_options(answer: &str) -> Vec<String> {
    let mut options: Vec<String> = Vec::with_capacity(MAX_OPTIONS);
    for option in [
        answer.to_string(),
        capitalize(answer),
        answer.to_lowercase(),
        format!("{answer}en"),
    ] {
        if !options.contains(&option) {
            options.push(option);
        }
    }
    options.truncate(MAX_OPTIONS);
    options
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
