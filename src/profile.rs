use crate::config::write_json_atomic;
use crate::grid::Style;
use crate::theme;
use anyhow::{Context, Result};
use crossterm::style::Color;
use serde::{Deserialize, Serialize};
use std::{fs, io::ErrorKind, path::Path};

/// How a named player looks on the board. Colours are crossterm names
/// such as `green` or `dark_cyan`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Profile {
    pub(crate) name: String,
    pub(crate) glyph: char,
    pub(crate) fg: String,
    pub(crate) bg: String,
}

impl Profile {
    pub(crate) fn style(&self) -> Style {
        let fallback = Style::default();
        Style::new(
            parse_color(&self.fg).unwrap_or(fallback.fg),
            parse_color(&self.bg).unwrap_or(fallback.bg),
        )
    }
}

fn parse_color(name: &str) -> Option<Color> {
    Color::try_from(name.trim()).ok()
}

fn color_name(c: Color) -> &'static str {
    match c {
        Color::Green => "green",
        Color::Red => "red",
        Color::Cyan => "cyan",
        Color::Yellow => "yellow",
        Color::Blue => "blue",
        Color::Magenta => "magenta",
        Color::White => "white",
        Color::Black => "black",
        _ => "grey",
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ProfileBook {
    profiles: Vec<Profile>,
}

impl ProfileBook {
    /// Missing file means no profiles yet; a corrupt one is logged and ignored.
    pub(crate) fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), "profiles unreadable: {e}");
                }
                return Self::default();
            }
        };
        match serde_json::from_str::<Vec<Profile>>(&data) {
            Ok(profiles) => Self { profiles },
            Err(e) => {
                tracing::warn!(path = %path.display(), "profiles unparsable: {e}");
                Self::default()
            }
        }
    }

    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.profiles)
            .with_context(|| format!("saving profiles to {}", path.display()))
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Looks `name` up, creating a default profile for the `slot`-th player
    /// if there is none. Returns the profile and whether it was created.
    pub(crate) fn get_or_create(&mut self, name: &str, slot: usize) -> (Profile, bool) {
        if let Some(p) = self.get(name) {
            return (p.clone(), false);
        }
        let colors = theme::player_colors();
        let profile = Profile {
            name: name.to_string(),
            glyph: theme::PLAYER,
            fg: color_name(colors[slot % colors.len()]).to_string(),
            bg: "black".to_string(),
        };
        self.profiles.push(profile.clone());
        (profile, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_get_distinct_defaults() {
        let mut book = ProfileBook::default();
        let (a, created) = book.get_or_create("ada", 0);
        assert!(created);
        let (b, _) = book.get_or_create("bob", 1);
        assert_ne!(a.style(), b.style());
        let (again, created) = book.get_or_create("ada", 3);
        assert!(!created);
        assert_eq!(again, a);
    }

    #[test]
    fn bad_colour_names_fall_back() {
        let p = Profile {
            name: "x".into(),
            glyph: '#',
            fg: "not-a-colour".into(),
            bg: "dark_blue".into(),
        };
        assert_eq!(p.style().fg, Style::default().fg);
        assert_eq!(p.style().bg, Color::DarkBlue);
    }

    #[test]
    fn book_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("profiles.json");
        assert!(ProfileBook::load(&path).get("ada").is_none());
        let mut book = ProfileBook::default();
        book.get_or_create("ada", 0);
        book.save(&path).expect("save");
        let loaded = ProfileBook::load(&path);
        assert_eq!(loaded.get("ada").map(|p| p.glyph), Some(theme::PLAYER));
    }
}
