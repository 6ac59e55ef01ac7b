use std::fmt;

use ratatui::style::Color;

use crate::sm2::Quality;

/// One color usable both in ratatui widgets and in plain ANSI output.
#[derive(Clone, Copy, Debug)]
pub struct PaletteColor {
    tui: Color,
    ansi: &'static str,
}

impl PaletteColor {
    pub const fn new(tui: Color, ansi: &'static str) -> Self {
        Self { tui, ansi }
    }

    pub const fn tui(self) -> Color {
        self.tui
    }

    pub const fn ansi(self) -> &'static str {
        self.ansi
    }
}

pub struct Palette;

impl Palette {
    pub const RESET: &'static str = "\x1b[0m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const ACCENT: PaletteColor = PaletteColor::new(Color::Blue, "\x1b[34m");
    pub const INFO: PaletteColor = PaletteColor::new(Color::Cyan, "\x1b[36m");
    pub const SUCCESS: PaletteColor = PaletteColor::new(Color::Green, "\x1b[32m");
    pub const WARNING: PaletteColor = PaletteColor::new(Color::Yellow, "\x1b[33m");
    pub const DANGER: PaletteColor = PaletteColor::new(Color::Red, "\x1b[31m");
    pub const BORDER: PaletteColor = PaletteColor::new(Color::Gray, "\x1b[90m");

    pub fn paint(color: PaletteColor, value: impl fmt::Display) -> String {
        format!("{}{}{}", color.ansi(), value, Self::RESET)
    }

    pub fn dim(value: impl fmt::Display) -> String {
        format!("{}{}{}", Self::DIM, value, Self::RESET)
    }

    /// Lapses are red, hard passes yellow, the rest green.
    pub fn for_quality(quality: Quality) -> PaletteColor {
        match quality.value() {
            _ if quality.is_lapse() => Self::DANGER,
            3 => Self::WARNING,
            _ => Self::SUCCESS,
        }
    }

    pub fn for_score(score: u32) -> PaletteColor {
        match score {
            85.. => Self::SUCCESS,
            55..85 => Self::WARNING,
            _ => Self::DANGER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sm2::QualityPolicy;

    fn quality(raw: i64) -> Quality {
        Quality::new(raw, QualityPolicy::Reject).unwrap()
    }

    #[test]
    fn quality_colors_split_at_the_passing_grade() {
        assert_eq!(Palette::for_quality(quality(2)).tui(), Color::Red);
        assert_eq!(Palette::for_quality(quality(3)).tui(), Color::Yellow);
        assert_eq!(Palette::for_quality(quality(5)).tui(), Color::Green);
    }

    #[test]
    fn score_colors() {
        assert_eq!(Palette::for_score(100).tui(), Color::Green);
        assert_eq!(Palette::for_score(55).tui(), Color::Yellow);
        assert_eq!(Palette::for_score(40).tui(), Color::Red);
    }

    #[test]
    fn paint_wraps_in_reset() {
        assert_eq!(Palette::paint(Palette::INFO, 3), "\x1b[36m3\x1b[0m");
    }
}
