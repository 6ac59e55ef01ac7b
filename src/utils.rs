use std::path::PathBuf;

use anyhow::{Result, anyhow};
use directories::ProjectDirs;

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

/// Removes ANSI escape sequences and control characters from terminal input.
/// Runs of whitespace, tabs and line breaks included, become one space and
/// the result is trimmed.
pub fn strip_controls_and_escapes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\x1b' => {
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {
                if !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out.trim().to_string()
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "karteikasten")
        .ok_or_else(|| anyhow!("Could not determine project directory"))
}

pub fn get_data_dir() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;
    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;
    Ok(data_dir.to_path_buf())
}

pub fn get_config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_escapes_and_controls() {
        assert_eq!(strip_controls_and_escapes("\x1b[1mHaus\x1b[0m"), "Haus");
        assert_eq!(strip_controls_and_escapes(" das\tAuto\u{7} "), "das Auto");
        assert_eq!(strip_controls_and_escapes("Guten\r\nTag\n"), "Guten Tag");
    }

    #[test]
    fn keeps_umlauts() {
        assert_eq!(strip_controls_and_escapes("Grüße aus Köln"), "Grüße aus Köln");
    }

    #[test]
    fn pluralizes_by_count() {
        assert_eq!(pluralize("card", 0), "0 cards");
        assert_eq!(pluralize("card", 1), "1 card");
        assert_eq!(pluralize("day", 7), "7 days");
    }
}
