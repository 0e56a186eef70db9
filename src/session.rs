use crate::actor::{self, Fuse, RunState, Ticket};
use crate::bite::BiteId;
use crate::entity::{Direction, Entity};
use crate::grid::Pos;
use crate::item::{ItemEffect, ItemId};
use crate::level::{Feature, LevelDirector, LevelPlan};
use crate::player::{PlayerId, PlayerState};
use crate::scores::{ScoreBoard, ScoreStore};
use crate::theme;
use crate::world::{ObstacleId, Paint, PlayerTick, Snapshot, StepReport, World};
use anyhow::{anyhow, Result};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info};

/// Everything that may touch the world goes through here.
#[derive(Debug)]
pub(crate) enum Cmd {
    StepPlayer {
        player: PlayerId,
        reply: oneshot::Sender<PlayerTick>,
    },
    StepObstacle {
        obstacle: ObstacleId,
        reply: oneshot::Sender<Option<Duration>>,
    },
    TopUpBits,
    LayBitLine,
    RoamBits,
    SpawnBites {
        omni: bool,
    },
    Paint {
        pos: Pos,
        paint: Paint,
    },
    RetireBite(BiteId),
    ExpireItem {
        player: PlayerId,
        item: ItemId,
    },
    Turn {
        player: PlayerId,
        direction: Direction,
    },
    Activate(PlayerId),
    Quit(PlayerId),
    Shutdown,
}

/// Sole owner of the world for one round. Applies commands in arrival order
/// and publishes a snapshot whenever the queue runs dry.
struct Coordinator {
    world: World,
    scores: ScoreBoard,
    store: Arc<dyn ScoreStore>,
    levels: LevelDirector,
    tx: mpsc::Sender<Cmd>,
    session: watch::Receiver<RunState>,
    quits: Vec<watch::Sender<bool>>,
    snapshots: watch::Sender<Arc<Snapshot>>,
}

impl Coordinator {
    fn ticket(&self) -> Ticket {
        Ticket::new(self.session.clone())
    }

    fn open_round(&mut self) {
        let (w, h) = (self.world.map().width(), self.world.map().height());
        if let Some(plan) = self.levels.begin(w, h) {
            self.apply_plan(plan);
        }
        for p in self.world.players() {
            let (quit, quit_rx) = watch::channel(false);
            self.quits.push(quit);
            actor::spawn_actor(
                format!("player {}", p.name()),
                actor::player_loop(p.id(), self.tx.clone(), self.ticket().with_stop(quit_rx)),
            );
        }
        info!(players = self.world.players().len(), "round started");
        self.publish();
    }

    fn apply_plan(&mut self, plan: LevelPlan) {
        for level in &plan.stop {
            self.levels.stop_level(*level);
        }
        let rules = self.world.rules().clone();
        for feature in plan.start {
            let ticket = if feature.is_generator() {
                self.ticket().with_stop(self.levels.open_queue(plan.level))
            } else {
                self.ticket()
            };
            let tx = self.tx.clone();
            match feature {
                Feature::InitialBits => self.world.seed_bits(),
                Feature::WallPassItem(at) => {
                    self.world.place_item(at, ItemEffect::WallPass);
                }
                Feature::TopUpBits => {
                    actor::spawn_actor(
                        "top-up",
                        actor::generator(rules.top_up_every, tx, ticket, || Cmd::TopUpBits),
                    );
                }
                Feature::BitLines => {
                    actor::spawn_actor(
                        "bit lines",
                        actor::generator(rules.line_every, tx, ticket, || Cmd::LayBitLine),
                    );
                }
                Feature::RoamBits => {
                    actor::spawn_actor(
                        "roam",
                        actor::generator(rules.roam_every, tx, ticket, || Cmd::RoamBits),
                    );
                }
                Feature::Hazards { omni } => {
                    actor::spawn_actor(
                        format!("hazards omni={omni}"),
                        actor::generator(rules.hazard_every, tx, ticket, move || Cmd::SpawnBites {
                            omni,
                        }),
                    );
                }
                Feature::Wall {
                    head,
                    direction,
                    len,
                    speed,
                } => {
                    let body = Entity::straight(
                        head,
                        direction,
                        len,
                        speed,
                        theme::WALL,
                        self.world.palette().base,
                    );
                    let id = self.world.add_obstacle(body);
                    actor::spawn_actor(
                        format!("wall {}", id.0),
                        actor::patrol_loop(id, tx, ticket),
                    );
                }
            }
        }
    }

    fn on_step(&mut self, player: PlayerId, report: StepReport) -> PlayerTick {
        let fuse = Fuse::from_rules(self.world.rules());
        for det in report.detonations {
            actor::spawn_actor(
                format!("bite {}", det.bite.0),
                actor::explosion(det.bite, det.paths, fuse, self.tx.clone(), self.ticket()),
            );
        }

        if let Some(fall) = report.fall {
            debug!(player = %fall.name, blocker = ?fall.blocker, "fall recorded");
            if self.scores.submit(self.world.mode(), &fall.name, fall.score) {
                self.scores.persist(self.store.as_ref());
            }
        }

        if let Some(score) = self.world.player(player).map(|p| p.score()) {
            let (w, h) = (self.world.map().width(), self.world.map().height());
            for plan in self.levels.crossed(score, w, h) {
                self.apply_plan(plan);
            }
        }
        report.tick
    }

    fn handle(&mut self, cmd: Cmd) -> bool {
        match cmd {
            Cmd::StepPlayer { player, reply } => {
                let report = self.world.step_player(player);
                let tick = self.on_step(player, report);
                reply.send(tick).ok();
            }
            Cmd::StepObstacle { obstacle, reply } => {
                reply.send(self.world.step_obstacle(obstacle)).ok();
            }
            Cmd::TopUpBits => {
                self.world.top_up_bits();
            }
            Cmd::LayBitLine => {
                let n = self.world.lay_bit_line();
                debug!(bits = n, "line bonus laid");
            }
            Cmd::RoamBits => self.world.roam_bits(),
            Cmd::SpawnBites { omni } => {
                self.world.spawn_bites(omni);
            }
            Cmd::Paint { pos, paint } => {
                self.world.paint(pos, paint);
            }
            Cmd::RetireBite(id) => {
                if self.world.retire_bite(id) {
                    info!(bite = id.0, "bite retired");
                }
            }
            Cmd::ExpireItem { player, item } => {
                self.world.expire_item(player, item);
            }
            Cmd::Turn { player, direction } => {
                self.world.turn(player, direction);
            }
            Cmd::Activate(player) => {
                if let Some((item, lasts)) = self.world.activate_item(player) {
                    debug!(player = player.0, item = item.0, "item activated");
                    actor::spawn_actor(
                        format!("item {}", item.0),
                        actor::item_timer(player, item, lasts, self.tx.clone(), self.ticket()),
                    );
                }
            }
            Cmd::Quit(player) => {
                if let Some(q) = self.quits.get(player.0) {
                    q.send_replace(true);
                }
                let mode = self.world.mode();
                if let Some((name, score)) = self.world.quit_player(player) {
                    if self.scores.submit(mode, &name, score) {
                        self.scores.persist(self.store.as_ref());
                    }
                }
            }
            Cmd::Shutdown => {
                self.close_round();
                return false;
            }
        }
        true
    }

    /// Records anyone still playing, then signals every queue to stop.
    fn close_round(&mut self) {
        let mode = self.world.mode();
        let mut changed = false;
        for p in self.world.players() {
            if p.state() == PlayerState::Alive {
                changed |= self.scores.submit(mode, p.name(), p.score());
            }
        }
        if changed {
            self.scores.persist(self.store.as_ref());
        }
        for q in &self.quits {
            q.send_replace(true);
        }
        self.levels.teardown();
        self.world.quit_all();
        info!(level = self.levels.current(), "round closed");
        self.publish();
    }

    fn publish(&self) {
        let mut snap = self.world.snapshot(self.levels.current());
        snap.high_scores = self
            .scores
            .for_mode(self.world.mode())
            .map(|r| (r.name.clone(), r.score))
            .collect();
        self.snapshots.send_replace(Arc::new(snap));
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Cmd>) -> ScoreBoard {
        while let Some(cmd) = rx.recv().await {
            if !self.handle(cmd) {
                return self.scores;
            }
            while let Ok(cmd) = rx.try_recv() {
                if !self.handle(cmd) {
                    return self.scores;
                }
            }
            self.publish();
        }
        self.scores
    }
}

/// Handle to a running round.
pub(crate) struct Session {
    tx: mpsc::Sender<Cmd>,
    state: watch::Sender<RunState>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    coordinator: JoinHandle<ScoreBoard>,
}

impl Session {
    pub(crate) fn start(world: World, scores: ScoreBoard, store: Arc<dyn ScoreStore>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let (state, session) = watch::channel(RunState::Running);
        let (snap_tx, snapshots) = watch::channel(Arc::new(world.snapshot(0)));
        let levels = LevelDirector::new(&world.rules().level_thresholds);

        let mut coordinator = Coordinator {
            world,
            scores,
            store,
            levels,
            tx: tx.clone(),
            session,
            quits: Vec::new(),
            snapshots: snap_tx,
        };
        coordinator.open_round();

        Self {
            tx,
            state,
            snapshots,
            coordinator: tokio::spawn(coordinator.run(rx)),
        }
    }

    pub(crate) fn latest(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    pub(crate) async fn send(&self, cmd: Cmd) {
        self.tx.send(cmd).await.ok();
    }

    pub(crate) fn is_paused(&self) -> bool {
        *self.state.borrow() == RunState::Paused
    }

    pub(crate) fn toggle_pause(&self) -> RunState {
        self.state.send_modify(|s| {
            *s = match *s {
                RunState::Running => RunState::Paused,
                RunState::Paused => RunState::Running,
                RunState::Stopped => RunState::Stopped,
            }
        });
        let now = *self.state.borrow();
        info!(state = ?now, "run state changed");
        now
    }

    /// Stops every actor and hands back the final high-score table.
    pub(crate) async fn shutdown(self) -> Result<ScoreBoard> {
        self.state.send_replace(RunState::Stopped);
        self.tx.send(Cmd::Shutdown).await.ok();
        self.coordinator
            .await
            .map_err(|e| anyhow!("coordinator failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bite::Blast;
    use crate::config::Rules;
    use crate::player::Spawn;
    use crate::scores::{tests::MemoryStore, PlayMode};
    use crate::theme::Palette;
    use crate::world::tests::setup;
    use tokio::time;

    fn blast_cells(w: i32, h: i32) -> Vec<Pos> {
        let mut cells: Vec<Pos> = (21..=w - 2).map(|x| Pos::new(x, 20)).collect();
        cells.extend((2..=19).map(|x| Pos::new(x, 20)));
        cells.extend((21..=h - 2).map(|y| Pos::new(20, y)));
        cells.extend((2..=19).map(|y| Pos::new(20, y)));
        cells
    }

    #[tokio::test(start_paused = true)]
    async fn omni_bite_floods_then_clears_the_overlay() {
        let rules = Rules::default();
        let mut world = World::new(100, 35, rules.clone(), Palette::default(), 7);
        world.spawn_player(
            setup("ada"),
            Spawn {
                pos: Pos::new(19, 20),
                direction: Direction::Right,
            },
        );
        world.add_bite(Pos::new(20, 20), Blast::All);
        let store = Arc::new(MemoryStore::default());
        let session = Session::start(world, ScoreBoard::new(5), store.clone());

        // longest run is x = 21..=98
        let longest = 78u32;
        let painted = rules.arming + rules.walker_step * longest;
        time::sleep(painted + Duration::from_millis(100)).await;
        let snap = session.latest();
        for c in blast_cells(100, 35) {
            let cell = snap.overlay.get(c).copied().expect("on grid");
            assert!(cell.blocked, "{c:?} not painted");
            assert_eq!(cell.glyph, theme::BLAST);
        }
        assert!(!snap.overlay.is_blocked(Pos::new(20, 20)));

        let cleared = rules.blast_hold + rules.walker_step * (longest + 1);
        time::sleep(cleared).await;
        let snap = session.latest();
        for c in blast_cells(100, 35) {
            assert!(!snap.overlay.is_blocked(c), "{c:?} still blocked");
        }
        assert!(snap.bites.is_empty());

        let board = session.shutdown().await.expect("shutdown");
        let best = board.for_mode(PlayMode::OnePlayer).map(|r| r.score).max();
        assert!(best.unwrap_or(0) >= rules.bite_points);
        assert!(!store.saved.lock().expect("store").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_players_and_resume_continues() {
        let world = World::new(100, 35, Rules::default(), Palette::default(), 3)
            .with_roster(&[setup("ada"), setup("bob")]);
        let session = Session::start(world, ScoreBoard::new(5), Arc::new(MemoryStore::default()));
        let heads = |s: &Session| -> Vec<Pos> {
            s.latest().players.iter().map(|p| p.body[0].pos).collect()
        };

        time::sleep(Duration::from_millis(300)).await;
        let before = heads(&session);
        assert_ne!(before, vec![Pos::new(50, 17), Pos::new(50, 19)]);

        assert_eq!(session.toggle_pause(), RunState::Paused);
        assert!(session.is_paused());
        time::sleep(Duration::from_millis(200)).await;
        let frozen = heads(&session);
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(heads(&session), frozen);

        assert_eq!(session.toggle_pause(), RunState::Running);
        time::sleep(Duration::from_millis(400)).await;
        assert_ne!(heads(&session), frozen);
        assert!(session.latest().level >= 1);

        session.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn turns_go_through_the_queue() {
        let world = World::new(100, 35, Rules::default(), Palette::default(), 3)
            .with_roster(&[setup("ada")]);
        let session = Session::start(world, ScoreBoard::new(5), Arc::new(MemoryStore::default()));
        session
            .send(Cmd::Turn {
                player: PlayerId(0),
                direction: Direction::Up,
            })
            .await;
        time::sleep(Duration::from_millis(500)).await;
        let head = session.latest().players[0].body[0].pos;
        assert!(head.x == 49 || head.x == 50);
        assert!(head.y < 17);

        session.send(Cmd::Quit(PlayerId(0))).await;
        time::sleep(Duration::from_millis(500)).await;
        let snap = session.latest();
        assert_eq!(snap.players[0].body[0].pos, head);
        assert_eq!(snap.players[0].state, PlayerState::Quit);
        assert!(snap.round_over);
        session.shutdown().await.expect("shutdown");
    }

    #[tokio::test(start_paused = true)]
    async fn one_player_quitting_leaves_the_other_running() {
        let world = World::new(100, 35, Rules::default(), Palette::default(), 3)
            .with_roster(&[setup("ada"), setup("bob")]);
        let store = Arc::new(MemoryStore::default());
        let session = Session::start(world, ScoreBoard::new(5), store.clone());

        session.send(Cmd::Quit(PlayerId(1))).await;
        time::sleep(Duration::from_millis(300)).await;
        let snap = session.latest();
        assert_eq!(snap.players[1].state, PlayerState::Quit);
        assert!(!snap.round_over);
        let ada = snap.players[0].body[0].pos;

        time::sleep(Duration::from_millis(300)).await;
        assert_ne!(session.latest().players[0].body[0].pos, ada);
        session.shutdown().await.expect("shutdown");
    }
}
