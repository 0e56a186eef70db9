use crate::grid::{Pos, Style};
use crate::object::{Placed, PositionedObject};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ItemEffect {
    /// Ignore every collision except the permanent map.
    WallPass,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ItemId(pub(crate) u64);

#[derive(Clone, Debug)]
pub(crate) struct Item {
    id: ItemId,
    object: PositionedObject,
    effect: ItemEffect,
    activated: bool,
    duration: Duration,
}

impl Item {
    pub(crate) fn new(
        id: ItemId,
        pos: Pos,
        effect: ItemEffect,
        duration: Duration,
        glyph: char,
        style: Style,
    ) -> Self {
        Self {
            id,
            object: PositionedObject::new(pos, glyph, style, false),
            effect,
            activated: false,
            duration,
        }
    }

    pub(crate) fn id(&self) -> ItemId {
        self.id
    }

    pub(crate) fn effect(&self) -> ItemEffect {
        self.effect
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    pub(crate) fn is_active(&self) -> bool {
        self.activated
    }

    /// Returns false if it was already running.
    pub(crate) fn activate(&mut self) -> bool {
        if self.activated {
            return false;
        }
        self.activated = true;
        true
    }
}

impl Placed for Item {
    fn pos(&self) -> Pos {
        self.object.pos()
    }

    fn glyph(&self) -> char {
        self.object.glyph()
    }

    fn style(&self) -> Style {
        self.object.style()
    }
}
