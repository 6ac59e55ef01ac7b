use std::io;
use std::time::{Duration, Instant};

use crate::card::Card;
use crate::palette::Palette;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::sm2::{MAX_QUALITY, Quality, QualityPolicy};
use crate::store::DocumentStore;
use crate::tui::Theme;
use crate::utils::pluralize;

use anyhow::{Context, Result};
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

const FLASH_SECS: f64 = 2.0;
// grades below this are repeated at the end of the session
const REPEAT_BELOW: u8 = 4;

pub fn run<S: DocumentStore>(
    scheduler: &Scheduler<S>,
    card_limit: Option<usize>,
    shuffle: bool,
) -> Result<()> {
    let mut cards_due = scheduler
        .due_cards(Utc::now())
        .context("Failed to load due cards")?;

    if let Some(limit) = card_limit {
        cards_due.truncate(limit);
    }
    if shuffle {
        use rand::seq::SliceRandom;
        cards_due.shuffle(&mut rand::rng());
    }

    if cards_due.is_empty() {
        println!("Nothing due. All caught up.");
        return Ok(());
    }

    let reviewed = start_drill_session(scheduler, cards_due)?;
    println!(
        "{} {}",
        Palette::dim("Session finished:"),
        Palette::paint(Palette::SUCCESS, pluralize("card", reviewed))
    );
    Ok(())
}

struct DrillState<'a, S> {
    scheduler: &'a Scheduler<S>,
    cards: Vec<Card>,
    redo_cards: Vec<Card>,
    current_idx: usize,
    show_answer: bool,
    practice: bool,
    reviewed: usize,
    last_action: Option<LastAction>,
    flash: Option<Flash>,
}

struct LastAction {
    quality: Quality,
    // None for practice grades, which are not saved
    interval: Option<u32>,
    last_reviewed_at: Instant,
}

impl LastAction {
    fn print(&self) -> String {
        match self.interval {
            Some(days) => format!(
                " {} (See again in {})",
                self.quality.label(),
                pluralize("day", days as usize)
            ),
            None => format!(" {} (practice, not saved)", self.quality.label()),
        }
    }
}

struct Flash {
    message: String,
    shown_at: Instant,
}

impl<'a, S: DocumentStore> DrillState<'a, S> {
    fn new(scheduler: &'a Scheduler<S>, cards: Vec<Card>) -> Self {
        Self {
            scheduler,
            cards,
            redo_cards: Vec::new(),
            current_idx: 0,
            show_answer: false,
            practice: false,
            reviewed: 0,
            last_action: None,
            flash: None,
        }
    }

    fn current_card(&mut self) -> Option<&Card> {
        if self.current_idx >= self.cards.len() {
            if self.redo_cards.is_empty() {
                return None;
            }
            self.cards = std::mem::take(&mut self.redo_cards);
            self.current_idx = 0;
            self.practice = true;
        }
        self.cards.get(self.current_idx)
    }

    fn reveal_answer(&mut self) {
        self.show_answer = true;
    }

    /// Grades the current card. A failed save keeps the card on screen so
    /// the grade can be retried.
    fn handle_grade(&mut self, quality: Quality) {
        let Some(card) = self.current_card().cloned() else {
            return;
        };

        let interval = if self.practice {
            None
        } else {
            match self.scheduler.schedule_card(&card.id, quality.value().into()) {
                Ok(updated) => {
                    self.reviewed += 1;
                    Some(updated.interval)
                }
                Err(SchedulerError::NotFound(id)) => {
                    self.set_flash(format!("Card {id} no longer exists, skipped"));
                    self.advance();
                    return;
                }
                Err(err) => {
                    tracing::warn!(error = %err, id = %card.id, "failed to save review");
                    self.set_flash(format!("Save failed: {}", error_chain(&err)));
                    return;
                }
            }
        };

        if quality.value() < REPEAT_BELOW {
            self.redo_cards.push(card);
        }
        self.last_action = Some(LastAction {
            quality,
            interval,
            last_reviewed_at: Instant::now(),
        });
        self.advance();
    }

    fn advance(&mut self) {
        self.current_idx += 1;
        self.show_answer = false;
    }

    fn set_flash(&mut self, message: String) {
        self.flash = Some(Flash {
            message,
            shown_at: Instant::now(),
        });
    }

    fn is_complete(&self) -> bool {
        self.current_idx >= self.cards.len() && self.redo_cards.is_empty()
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn start_drill_session<S: DocumentStore>(
    scheduler: &Scheduler<S>,
    cards: Vec<Card>,
) -> Result<usize> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to configure terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to start terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let mut state = DrillState::new(scheduler, cards);
    let loop_result = drill_loop(&mut terminal, &mut state);

    teardown_terminal(&mut terminal)?;

    loop_result.map(|()| state.reviewed)
}

fn drill_loop<S: DocumentStore>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut DrillState<'_, S>,
) -> Result<()> {
    loop {
        let Some(card) = state.current_card().cloned() else {
            return Ok(());
        };

        terminal
            .draw(|frame| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(5), Constraint::Length(5)])
                    .split(frame.area());

                let mut header = vec![
                    Theme::label_span(format!(
                        "Card {}/{}",
                        state.current_idx + 1,
                        state.cards.len()
                    )),
                    Theme::bullet(),
                    Theme::span(format!("{} coming again", state.redo_cards.len())),
                    Theme::bullet(),
                    Theme::span(card.lifecycle().label()),
                ];
                if state.practice {
                    header.push(Theme::bullet());
                    header.push(Theme::key_chip("Practice"));
                }

                let card_widget = Paragraph::new(format_card_text(&card, state.show_answer))
                    .block(Theme::panel_with_line(Line::from(header)))
                    .wrap(Wrap { trim: false });
                frame.render_widget(card_widget, chunks[0]);

                let footer = Paragraph::new(instructions_text(state))
                    .block(Theme::panel_with_line(Theme::section_header("Controls")));
                frame.render_widget(footer, chunks[1]);
            })
            .context("failed to render frame")?;

        if event::poll(Duration::from_millis(16))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            if key.code == KeyCode::Esc
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
            {
                return Ok(());
            }
            match key.code {
                KeyCode::Char(' ') | KeyCode::Enter if !state.show_answer => {
                    state.reveal_answer();
                }
                KeyCode::Char(digit) if state.show_answer => {
                    if let Some(quality) = digit
                        .to_digit(10)
                        .and_then(|d| Quality::new(d.into(), QualityPolicy::Reject))
                    {
                        state.handle_grade(quality);
                    }
                }
                _ => {}
            }
        }

        if state.is_complete() {
            return Ok(());
        }
    }
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("failed to restore terminal")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn instructions_text<S>(state: &DrillState<'_, S>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if state.show_answer {
        let mut line = Vec::new();
        for raw in 0..=MAX_QUALITY {
            if let Some(quality) = Quality::new(raw.into(), QualityPolicy::Reject) {
                line.push(Theme::grade_chip(quality));
                line.push(Theme::span(format!(" {} ", quality.label())));
            }
        }
        line.push(Theme::bullet());
        line.push(Theme::key_chip("Esc"));
        line.push(Theme::span(" exit"));
        lines.push(Line::from(line));
    } else {
        lines.push(Line::from(vec![
            Theme::key_chip("Space"),
            Theme::span(" or "),
            Theme::key_chip("Enter"),
            Theme::span(" show answer"),
            Theme::bullet(),
            Theme::key_chip("Esc"),
            Theme::span(" / "),
            Theme::key_chip("Ctrl+C"),
            Theme::span(" exit"),
        ]));
    }

    if let Some(flash) = &state.flash
        && flash.shown_at.elapsed().as_secs_f64() < FLASH_SECS * 2.0
    {
        lines.push(Line::from(Span::styled(flash.message.clone(), Theme::danger())));
    } else if let Some(action) = &state.last_action
        && action.last_reviewed_at.elapsed().as_secs_f64() < FLASH_SECS
    {
        let style = Style::default().fg(Palette::for_quality(action.quality).tui());
        lines.push(Line::from(vec![
            Theme::span("Last:"),
            Span::styled(action.print(), style),
        ]));
    }

    lines
}

fn format_card_text(card: &Card, show_answer: bool) -> String {
    let mut text = format!("Q:\n{}\n\nA:\n", card.front);
    if show_answer {
        text.push_str(&card.back);
    }
    text
}
