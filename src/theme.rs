use crate::grid::Style;
use crossterm::style::Color;

pub(crate) const WALL: char = '▒';
pub(crate) const FLOOR: char = ' ';
pub(crate) const PLAYER: char = '█';
pub(crate) const BIT: char = '■';
pub(crate) const ITEM: char = '*';
pub(crate) const BITE_UP: char = '▲';
pub(crate) const BITE_DOWN: char = '▼';
pub(crate) const BITE_LEFT: char = '◄';
pub(crate) const BITE_RIGHT: char = '►';
pub(crate) const BITE_ALL: char = '◆';
pub(crate) const BLAST: char = '░';

/// Styles shared by the whole session.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Palette {
    pub(crate) base: Style,
    pub(crate) bit: Style,
    pub(crate) bite: Style,
    pub(crate) exploded: Style,
    pub(crate) item: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            base: Style::new(Color::Grey, Color::Black),
            bit: Style::new(Color::White, Color::Black),
            bite: Style::new(Color::Magenta, Color::Black),
            exploded: Style::new(Color::Red, Color::Black),
            item: Style::new(Color::Yellow, Color::Black),
        }
    }
}

/// Fallback looks for players without a saved profile, by join order.
pub(crate) fn player_colors() -> [Color; 4] {
    [Color::Green, Color::Red, Color::Grey, Color::Cyan]
}
