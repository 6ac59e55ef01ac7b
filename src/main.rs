use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use karteikasten::commands::{cards, check, drill, tutor};
use karteikasten::config::Config;
use karteikasten::tasks::TaskKind;

#[derive(Parser, Debug)]
#[command(
    name = "karteikasten",
    version,
    about = "German sentence drills with spaced repetition, in your terminal.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    /// Study document to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    document: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a card, or show the existing card with the same front
    Add {
        #[arg(value_name = "FRONT")]
        front: String,
        #[arg(value_name = "BACK", default_value = "")]
        back: String,
    },
    /// Turn graded attempts into cards
    Import {
        /// JSON array of attempts. Defaults to the attempts stored in the document
        #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    /// List cards due now
    Due {
        #[arg(long, value_name = "COUNT")]
        limit: Option<usize>,
    },
    /// Grade one card (0 = blackout ... 5 = perfect recall)
    Review {
        #[arg(value_name = "ID")]
        id: String,
        #[arg(value_name = "QUALITY", allow_negative_numbers = true)]
        quality: i64,
    },
    /// Drill due cards
    Drill {
        /// Maximum number of cards to drill in a session. By default, all due cards are drilled.
        #[arg(long, value_name = "COUNT")]
        card_limit: Option<usize>,
        /// Randomize the order of cards in the drill session
        #[arg(long, default_value_t = false)]
        shuffle: bool,
    },
    /// Check a German sentence and store the attempt
    Assess {
        #[arg(value_name = "SENTENCE")]
        sentence: String,
        /// CEFR level to record. Defaults to the configured level
        #[arg(long)]
        level: Option<String>,
        /// Also add the sentence and its correction as a card
        #[arg(long, default_value_t = false)]
        add_card: bool,
    },
    /// Build practice exercises from a sentence
    Tasks {
        #[arg(value_name = "SENTENCE")]
        sentence: String,
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Exercise kinds, in order. Repeat the flag for several
        #[arg(long = "kind", value_enum)]
        kinds: Vec<TaskKind>,
        #[arg(long)]
        level: Option<String>,
    },
    /// Record today's visit and show the study streak
    Streak,
    /// Show collection stats
    Check,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run_cli() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()
        .context("Failed to load configuration")?
        .with_document(cli.document);
    let scheduler = config.scheduler();

    match cli.command {
        Command::Add { front, back } => {
            cards::add(&scheduler, &front, &back)?;
        }
        Command::Import { file } => {
            cards::import(&scheduler, file.as_deref())?;
        }
        Command::Due { limit } => {
            cards::due(&scheduler, limit)?;
        }
        Command::Review { id, quality } => {
            cards::review(&scheduler, &id, quality)?;
        }
        Command::Drill {
            card_limit,
            shuffle,
        } => {
            drill::run(&scheduler, card_limit, shuffle)?;
        }
        Command::Assess {
            sentence,
            level,
            add_card,
        } => {
            let level = level.unwrap_or_else(|| config.level.clone());
            tutor::assess(&scheduler, &sentence, &level, add_card)?;
        }
        Command::Tasks {
            sentence,
            count,
            kinds,
            level,
        } => {
            let level = level.unwrap_or_else(|| config.level.clone());
            tutor::tasks(&sentence, &level, count, &kinds);
        }
        Command::Streak => {
            tutor::streak(scheduler.store())?;
        }
        Command::Check => {
            check::run(&scheduler)?;
        }
    }

    Ok(())
}
