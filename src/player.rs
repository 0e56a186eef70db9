use crate::entity::{Direction, Entity};
use crate::grid::{Pos, Style};
use crate::item::{Item, ItemEffect, ItemId};
use crate::object::Placed;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct PlayerId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerState {
    Alive,
    /// Hit something; lingers one tick in the exploded style.
    Dying,
    /// Out for the rest of the round.
    Dead,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Spawn {
    pub(crate) pos: Pos,
    pub(crate) direction: Direction,
}

#[derive(Clone, Debug)]
pub(crate) struct Player {
    id: PlayerId,
    name: String,
    score: u32,
    body: Entity,
    items: Vec<Item>,
    glyph: char,
    style: Style,
    spawn: Spawn,
    state: PlayerState,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: impl Into<String>, spawn: Spawn, glyph: char, style: Style) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
            body: Entity::new(spawn.pos, spawn.direction, 1, glyph, style),
            items: Vec::new(),
            glyph,
            style,
            spawn,
            state: PlayerState::Alive,
        }
    }

    pub(crate) fn id(&self) -> PlayerId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn score(&self) -> u32 {
        self.score
    }

    pub(crate) fn body(&self) -> &Entity {
        &self.body
    }

    pub(crate) fn body_mut(&mut self) -> &mut Entity {
        &mut self.body
    }

    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn state(&self) -> PlayerState {
        self.state
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state == PlayerState::Alive
    }

    pub(crate) fn head_pos(&self) -> Pos {
        self.body.head_pos()
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
    }

    pub(crate) fn grow(&mut self, n: usize) {
        self.body.add_segment(n, self.glyph, self.style);
    }

    /// Rejects a turn straight back into the neck, including one set up by
    /// two quick turns between ticks.
    pub(crate) fn turn(&mut self, direction: Direction) -> bool {
        if direction == self.body.direction().opposite() {
            return false;
        }
        if let Some(neck) = self.body.segments().get(1) {
            let (dx, dy) = direction.delta();
            if self.head_pos().offset(dx, dy) == neck.pos() {
                return false;
            }
        }
        self.body.set_direction(direction);
        true
    }

    pub(crate) fn die(&mut self, exploded: Style) {
        self.state = PlayerState::Dying;
        self.body.restyle(exploded);
    }

    /// Back to a single segment at the spawn point, score zeroed.
    pub(crate) fn respawn(&mut self) {
        self.body = Entity::new(self.spawn.pos, self.spawn.direction, 1, self.glyph, self.style);
        self.score = 0;
        self.state = PlayerState::Alive;
    }

    pub(crate) fn finish(&mut self) {
        self.state = PlayerState::Dead;
    }

    pub(crate) fn quit(&mut self) {
        self.state = PlayerState::Quit;
    }

    pub(crate) fn take_item(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Starts the oldest idle item; returns what to expire and when.
    pub(crate) fn activate_item(&mut self) -> Option<(ItemId, Duration)> {
        let item = self.items.iter_mut().find(|i| !i.is_active())?;
        item.activate();
        Some((item.id(), item.duration()))
    }

    pub(crate) fn expire_item(&mut self, id: ItemId) -> bool {
        match self.items.iter().position(|i| i.id() == id) {
            Some(i) => {
                self.items.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn has_active(&self, effect: ItemEffect) -> bool {
        self.items
            .iter()
            .any(|i| i.is_active() && i.effect() == effect)
    }
}
