use crate::grid::{Pos, Style};

/// Read access shared by every drawable actor.
pub(crate) trait Placed {
    fn pos(&self) -> Pos;
    fn glyph(&self) -> char;
    fn style(&self) -> Style;
}

/// The atomic placeable unit: current and previous position plus looks.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PositionedObject {
    pos: Pos,
    prev: Pos,
    glyph: char,
    style: Style,
    blocked: bool,
}

impl PositionedObject {
    pub(crate) fn new(pos: Pos, glyph: char, style: Style, blocked: bool) -> Self {
        Self {
            pos,
            prev: pos,
            glyph,
            style,
            blocked,
        }
    }

    pub(crate) fn prev(&self) -> Pos {
        self.prev
    }

    pub(crate) fn blocked(&self) -> bool {
        self.blocked
    }

    pub(crate) fn step(&mut self, dx: i32, dy: i32) {
        self.prev = self.pos;
        self.pos = self.pos.offset(dx, dy);
    }

    /// Moves to `to`, remembering where it was.
    pub(crate) fn follow(&mut self, to: Pos) {
        self.prev = self.pos;
        self.pos = to;
    }

    pub(crate) fn set_style(&mut self, style: Style) {
        self.style = style;
    }
}

impl Placed for PositionedObject {
    fn pos(&self) -> Pos {
        self.pos
    }

    fn glyph(&self) -> char {
        self.glyph
    }

    fn style(&self) -> Style {
        self.style
    }
}
