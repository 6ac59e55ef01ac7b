use crate::palette::Palette;
use crate::sm2::Quality;

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

/// Shared styles for the drill screen.
pub struct Theme;

impl Theme {
    pub const KEY_FG: Color = Color::Rgb(255, 255, 255);

    pub fn label() -> Style {
        Style::default()
            .fg(Palette::ACCENT.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn danger() -> Style {
        Style::default()
            .fg(Palette::DANGER.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn emphasis() -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    pub fn panel_with_line<'a>(title: Line<'a>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Palette::BORDER.tui()))
            .title(title)
            .title_alignment(Alignment::Left)
    }

    pub fn label_span(text: impl Into<String>) -> Span<'static> {
        Span::styled(text.into(), Self::label())
    }

    pub fn span(text: impl Into<String>) -> Span<'static> {
        Span::raw(text.into())
    }

    pub fn key_chip(text: impl Into<String>) -> Span<'static> {
        Self::chip(text, Palette::ACCENT.tui())
    }

    /// The digit key for a grade, colored by how the grade schedules.
    pub fn grade_chip(quality: Quality) -> Span<'static> {
        Self::chip(quality.value().to_string(), Palette::for_quality(quality).tui())
    }

    fn chip(text: impl Into<String>, background: Color) -> Span<'static> {
        Span::styled(
            format!(" {} ", text.into()),
            Style::default()
                .fg(Self::KEY_FG)
                .bg(background)
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn bullet() -> Span<'static> {
        Self::span(" • ")
    }

    pub fn section_header(text: impl Into<String>) -> Line<'static> {
        Line::from(vec![Span::styled(text.into(), Self::emphasis())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sm2::QualityPolicy;

    #[test]
    fn grade_chip_shows_the_digit() {
        let quality = Quality::new(3, QualityPolicy::Reject).unwrap();
        let chip = Theme::grade_chip(quality);
        assert_eq!(chip.content, " 3 ");
        assert_eq!(chip.style.bg, Some(Palette::WARNING.tui()));
    }
}
