use crate::bit::{self, Bit, BitMode};
use crate::bite::{Bite, BiteId, BiteState, Blast};
use crate::collision::{self, Blocker, Scene};
use crate::config::Rules;
use crate::entity::{Direction, Entity, Patrol};
use crate::grid::{Cell, Grid, Pos, Style};
use crate::item::{Item, ItemEffect, ItemId};
use crate::object::Placed;
use crate::player::{Player, PlayerId, PlayerState, Spawn};
use crate::scores::PlayMode;
use crate::theme::{self, Palette};
use rand::{rngs::StdRng, SeedableRng};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ObstacleId(pub(crate) u64);

/// A patrolling wall.
#[derive(Clone, Debug)]
pub(crate) struct Obstacle {
    id: ObstacleId,
    body: Entity,
}

impl Obstacle {
    pub(crate) fn new(id: ObstacleId, body: Entity) -> Self {
        Self { id, body }
    }

    pub(crate) fn id(&self) -> ObstacleId {
        self.id
    }

    pub(crate) fn body(&self) -> &Entity {
        &self.body
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Paint {
    Blast,
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerTick {
    Continue(Duration),
    Finished,
}

/// A bite that went off this tick, with one cell run per walker.
#[derive(Clone, Debug)]
pub(crate) struct Detonation {
    pub(crate) bite: BiteId,
    pub(crate) paths: Vec<(Direction, Vec<Pos>)>,
}

/// Score to offer the high-score table after a collision.
#[derive(Clone, Debug)]
pub(crate) struct Fall {
    pub(crate) name: String,
    pub(crate) score: u32,
    pub(crate) blocker: Blocker,
}

#[derive(Clone, Debug)]
pub(crate) struct StepReport {
    pub(crate) tick: PlayerTick,
    pub(crate) fall: Option<Fall>,
    pub(crate) detonations: Vec<Detonation>,
}

impl StepReport {
    fn finished() -> Self {
        Self {
            tick: PlayerTick::Finished,
            fall: None,
            detonations: Vec::new(),
        }
    }

    fn after(delay: Duration) -> Self {
        Self {
            tick: PlayerTick::Continue(delay),
            fall: None,
            detonations: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PlayerSetup {
    pub(crate) name: String,
    pub(crate) glyph: char,
    pub(crate) style: Style,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Sprite {
    pub(crate) pos: Pos,
    pub(crate) glyph: char,
    pub(crate) style: Style,
}

impl Sprite {
    fn of<P: Placed>(p: &P) -> Self {
        Self {
            pos: p.pos(),
            glyph: p.glyph(),
            style: p.style(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PlayerView {
    pub(crate) name: String,
    pub(crate) score: u32,
    pub(crate) state: PlayerState,
    pub(crate) body: Vec<Sprite>,
    pub(crate) carrying: usize,
    pub(crate) phasing: bool,
}

/// Read-only picture of a round for the renderer and HUD.
#[derive(Clone, Debug)]
pub(crate) struct Snapshot {
    pub(crate) map: Arc<Grid>,
    pub(crate) overlay: Grid,
    pub(crate) players: Vec<PlayerView>,
    pub(crate) bits: Vec<Sprite>,
    pub(crate) bites: Vec<Sprite>,
    pub(crate) items: Vec<Sprite>,
    pub(crate) obstacles: Vec<Sprite>,
    pub(crate) level: u8,
    pub(crate) round_over: bool,
    /// Best scores for this round's mode, filled in by the session.
    pub(crate) high_scores: Vec<(String, u32)>,
}

/// Everything one round plays on. Built at round start, dropped at round end;
/// only the coordinator task ever holds it.
pub(crate) struct World {
    rules: Rules,
    palette: Palette,
    map: Arc<Grid>,
    overlay: Grid,
    players: Vec<Player>,
    bits: Vec<Bit>,
    bites: Vec<Bite>,
    items: Vec<Item>,
    obstacles: Vec<Obstacle>,
    rng: StdRng,
    next_id: u64,
    round_over: bool,
}

impl World {
    pub(crate) fn new(w: i32, h: i32, rules: Rules, palette: Palette, seed: u64) -> Self {
        let map = Grid::with_boundary(w, h, theme::WALL, theme::FLOOR, palette.base);
        let overlay = Grid::new(map.width(), map.height(), Cell::open(theme::FLOOR, palette.base));
        let rng = if seed == 0 {
            StdRng::from_entropy()
        } else {
            StdRng::seed_from_u64(seed)
        };
        Self {
            rules,
            palette,
            map: Arc::new(map),
            overlay,
            players: Vec::new(),
            bits: Vec::new(),
            bites: Vec::new(),
            items: Vec::new(),
            obstacles: Vec::new(),
            rng,
            next_id: 0,
            round_over: false,
        }
    }

    /// Seats the roster at the default spawn points.
    pub(crate) fn with_roster(mut self, roster: &[PlayerSetup]) -> Self {
        for (i, setup) in roster.iter().enumerate() {
            let spawn = self.default_spawn(i);
            self.spawn_player(setup.clone(), spawn);
        }
        self
    }

    fn default_spawn(&self, slot: usize) -> Spawn {
        let w = self.map.width();
        let h = self.map.height();
        Spawn {
            pos: Pos::new(w / 2, (h / 2 + slot as i32 * 2).min(h - 2)),
            direction: if slot == 0 {
                Direction::Left
            } else {
                Direction::Down
            },
        }
    }

    pub(crate) fn spawn_player(&mut self, setup: PlayerSetup, spawn: Spawn) -> PlayerId {
        let id = PlayerId(self.players.len());
        self.players
            .push(Player::new(id, setup.name, spawn, setup.glyph, setup.style));
        id
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn rules(&self) -> &Rules {
        &self.rules
    }

    pub(crate) fn palette(&self) -> &Palette {
        &self.palette
    }

    pub(crate) fn map(&self) -> &Grid {
        &self.map
    }

    #[cfg(test)]
    pub(crate) fn overlay(&self) -> &Grid {
        &self.overlay
    }

    pub(crate) fn players(&self) -> &[Player] {
        &self.players
    }

    pub(crate) fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0)
    }

    #[cfg(test)]
    pub(crate) fn bits(&self) -> &[Bit] {
        &self.bits
    }

    #[cfg(test)]
    pub(crate) fn bites(&self) -> &[Bite] {
        &self.bites
    }

    #[cfg(test)]
    pub(crate) fn items(&self) -> &[Item] {
        &self.items
    }

    #[cfg(test)]
    pub(crate) fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub(crate) fn mode(&self) -> PlayMode {
        PlayMode::for_players(self.players.len())
    }

    #[cfg(test)]
    pub(crate) fn round_over(&self) -> bool {
        self.round_over
    }

    pub(crate) fn add_bit(&mut self, pos: Pos, points: u32, mode: BitMode) {
        self.bits
            .push(Bit::new(pos, points, mode, theme::BIT, self.palette.bit));
    }

    fn spawn_random_bit(&mut self, mode: BitMode) -> bool {
        match bit::random_open_cell(&mut self.rng, &self.map, &self.overlay) {
            Some(p) => {
                self.add_bit(p, self.rules.bit_points, mode);
                true
            }
            None => false,
        }
    }

    /// Initial population at round start.
    pub(crate) fn seed_bits(&mut self) {
        for _ in 0..self.rules.initial_bits {
            self.spawn_random_bit(BitMode::Roaming);
        }
    }

    /// One generator wave: adds up to `top_up_per_wave` roaming bits while
    /// the generated population is under `top_up_max`.
    pub(crate) fn top_up_bits(&mut self) -> usize {
        let mut added = 0;
        for _ in 0..self.rules.top_up_per_wave {
            let live = self
                .bits
                .iter()
                .filter(|b| b.mode() != BitMode::DroppedRandom)
                .count();
            if live >= self.rules.top_up_max {
                break;
            }
            if self.spawn_random_bit(BitMode::Roaming) {
                added += 1;
            }
        }
        added
    }

    pub(crate) fn lay_bit_line(&mut self) -> usize {
        let (min, max) = self.rules.line_len;
        let line = bit::random_line(
            &mut self.rng,
            &self.map,
            &self.overlay,
            min,
            max,
            self.rules.line_h_spacing,
        );
        for p in &line {
            self.add_bit(*p, self.rules.bit_points, BitMode::Static);
        }
        line.len()
    }

    pub(crate) fn roam_bits(&mut self) {
        for b in self.bits.iter_mut().filter(|b| b.mode() == BitMode::Roaming) {
            b.roam(&mut self.rng, &self.map, &self.overlay);
        }
    }

    pub(crate) fn add_bite(&mut self, pos: Pos, blast: Blast) -> BiteId {
        let id = BiteId(self.alloc_id());
        self.bites.push(Bite::new(
            id,
            pos,
            blast,
            self.rules.bite_points,
            self.palette.bite,
        ));
        id
    }

    /// One hazard wave, capped at `hazard_max` live bites.
    pub(crate) fn spawn_bites(&mut self, omni: bool) -> usize {
        let mut added = 0;
        for _ in 0..self.rules.hazard_per_wave {
            if self.bites.len() >= self.rules.hazard_max {
                break;
            }
            let Some(p) = bit::random_open_cell(&mut self.rng, &self.map, &self.overlay) else {
                break;
            };
            let blast = Blast::pick(&mut self.rng, omni);
            let id = self.add_bite(p, blast);
            debug!(bite = id.0, ?blast, x = p.x, y = p.y, "bite placed");
            added += 1;
        }
        added
    }

    pub(crate) fn retire_bite(&mut self, id: BiteId) -> bool {
        match self.bites.iter().position(|b| b.id() == id) {
            Some(i) => {
                self.bites.swap_remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn place_item(&mut self, pos: Pos, effect: ItemEffect) -> ItemId {
        let id = ItemId(self.alloc_id());
        self.items.push(Item::new(
            id,
            pos,
            effect,
            self.rules.wall_pass,
            theme::ITEM,
            self.palette.item,
        ));
        id
    }

    pub(crate) fn add_obstacle(&mut self, body: Entity) -> ObstacleId {
        let id = ObstacleId(self.alloc_id());
        self.obstacles.push(Obstacle::new(id, body));
        id
    }

    /// One patrol tick; returns the wait before the next, or None once gone.
    pub(crate) fn step_obstacle(&mut self, id: ObstacleId) -> Option<Duration> {
        let o = self.obstacles.iter_mut().find(|o| o.id() == id)?;
        if o.body.patrol(&self.map) == Patrol::Reversed {
            debug!(wall = o.id().0, "wall turned around");
        }
        let d = o.body.direction();
        Some(self.rules.move_interval(d.is_vertical(), o.body.speed()))
    }

    /// Writes one overlay cell for an explosion walker.
    pub(crate) fn paint(&mut self, pos: Pos, paint: Paint) -> bool {
        let cell = match paint {
            Paint::Blast => Cell::solid(theme::BLAST, self.palette.exploded),
            Paint::Clear => Cell::open(theme::FLOOR, self.palette.base),
        };
        self.overlay.set(pos, cell)
    }

    pub(crate) fn turn(&mut self, id: PlayerId, direction: Direction) -> bool {
        match self.players.get_mut(id.0) {
            Some(p) if p.is_alive() => p.turn(direction),
            _ => false,
        }
    }

    pub(crate) fn activate_item(&mut self, id: PlayerId) -> Option<(ItemId, Duration)> {
        self.players.get_mut(id.0)?.activate_item()
    }

    pub(crate) fn expire_item(&mut self, id: PlayerId, item: ItemId) -> bool {
        self.players
            .get_mut(id.0)
            .map_or(false, |p| p.expire_item(item))
    }

    /// Takes one player out of the round. Returns the name and score to record
    /// when the player was still in play.
    pub(crate) fn quit_player(&mut self, id: PlayerId) -> Option<(String, u32)> {
        let p = self.players.get_mut(id.0)?;
        let in_play = matches!(p.state(), PlayerState::Alive | PlayerState::Dying);
        let record = (p.state() == PlayerState::Alive).then(|| (p.name().to_string(), p.score()));
        p.quit();
        info!(player = %p.name(), "player quit");
        if in_play
            && !self
                .players
                .iter()
                .any(|p| matches!(p.state(), PlayerState::Alive | PlayerState::Dying))
        {
            self.round_over = true;
        }
        record
    }

    pub(crate) fn quit_all(&mut self) {
        for p in &mut self.players {
            p.quit();
        }
    }

    fn is_multiplayer(&self) -> bool {
        self.players.len() > 1
    }

    fn interval_for(&self, p: &Player) -> Duration {
        let body = p.body();
        self.rules
            .move_interval(body.direction().is_vertical(), body.speed())
    }

    /// One player tick: resolve the move, apply it or fall, then collect
    /// whatever sits under the head.
    pub(crate) fn step_player(&mut self, id: PlayerId) -> StepReport {
        let Some(state) = self.players.get(id.0).map(|p| p.state()) else {
            return StepReport::finished();
        };
        match state {
            PlayerState::Dead | PlayerState::Quit => return StepReport::finished(),
            PlayerState::Dying => return self.settle_fall(id),
            PlayerState::Alive => {}
        }

        let blocker = {
            let mover = &self.players[id.0];
            let scene = Scene {
                map: &self.map,
                overlay: &self.overlay,
                players: &self.players,
                obstacles: &self.obstacles,
            };
            collision::resolve(&scene, mover, mover.body().next_head())
        };
        if blocker.is_none() {
            self.players[id.0].body_mut().advance();
        }

        let detonations = self.collect_pickups(id);

        let fall = blocker.map(|blocker| self.fall(id, blocker));

        StepReport {
            tick: PlayerTick::Continue(self.interval_for(&self.players[id.0])),
            fall,
            detonations,
        }
    }

    fn fall(&mut self, id: PlayerId, blocker: Blocker) -> Fall {
        let exploded = self.palette.exploded;
        let drop_points = self.rules.dropped_bit_points;
        let multiplayer = self.is_multiplayer();

        let p = &mut self.players[id.0];
        let fall = Fall {
            name: p.name().to_string(),
            score: p.score(),
            blocker,
        };
        p.die(exploded);
        info!(player = %fall.name, score = fall.score, ?blocker, "player crashed");

        if multiplayer {
            let cells: Vec<Pos> = p.body().segments().iter().map(|s| s.pos()).collect();
            for c in cells {
                self.add_bit(c, drop_points, BitMode::DroppedRandom);
            }
        }
        fall
    }

    fn settle_fall(&mut self, id: PlayerId) -> StepReport {
        if self.is_multiplayer() {
            let p = &mut self.players[id.0];
            p.respawn();
            debug!(player = %p.name(), "respawned");
            let delay = self.interval_for(&self.players[id.0]);
            return StepReport::after(delay);
        }
        self.players[id.0].finish();
        self.round_over = true;
        info!("round over");
        StepReport::finished()
    }

    fn collect_pickups(&mut self, id: PlayerId) -> Vec<Detonation> {
        let head = self.players[id.0].head_pos();

        let mut replace = 0;
        while let Some(i) = self.bits.iter().position(|b| b.pos() == head) {
            let eaten = self.bits.swap_remove(i);
            let p = &mut self.players[id.0];
            p.add_score(eaten.points());
            p.grow(1);
            if eaten.mode() == BitMode::Roaming {
                replace += 1;
            }
        }
        for _ in 0..replace {
            self.spawn_random_bit(BitMode::Roaming);
        }

        if let Some(i) = self.items.iter().position(|it| it.pos() == head) {
            let item = self.items.swap_remove(i);
            self.players[id.0].take_item(item);
        }

        let mut detonations = Vec::new();
        let (w, h) = (self.map.width(), self.map.height());
        let exploded = self.palette.exploded;
        for bite in self
            .bites
            .iter_mut()
            .filter(|b| b.pos() == head && b.state() == BiteState::Armed)
        {
            bite.ignite(exploded);
            let p = &mut self.players[id.0];
            p.add_score(bite.points());
            p.grow(self.rules.bite_growth);
            info!(player = %p.name(), bite = bite.id().0, blast = ?bite.blast(), "bite triggered");
            detonations.push(Detonation {
                bite: bite.id(),
                paths: bite.walker_paths(w, h),
            });
        }
        detonations
    }

    pub(crate) fn snapshot(&self, level: u8) -> Snapshot {
        Snapshot {
            map: Arc::clone(&self.map),
            overlay: self.overlay.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    name: p.name().to_string(),
                    score: p.score(),
                    state: p.state(),
                    body: p.body().segments().iter().map(Sprite::of).collect(),
                    carrying: p.items().len(),
                    phasing: p.has_active(ItemEffect::WallPass),
                })
                .collect(),
            bits: self.bits.iter().map(Sprite::of).collect(),
            bites: self.bites.iter().map(Sprite::of).collect(),
            items: self.items.iter().map(Sprite::of).collect(),
            obstacles: self
                .obstacles
                .iter()
                .flat_map(|o| o.body.segments().iter().map(Sprite::of))
                .collect(),
            level,
            round_over: self.round_over,
            high_scores: Vec::new(),
        }
    }
}
