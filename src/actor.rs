use crate::bite::BiteId;
use crate::config::Rules;
use crate::entity::Direction;
use crate::grid::Pos;
use crate::item::ItemId;
use crate::player::PlayerId;
use crate::session::Cmd;
use crate::world::{ObstacleId, Paint, PlayerTick};
use std::{future::Future, time::Duration};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time,
};
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RunState {
    Running,
    Paused,
    Stopped,
}

/// An actor's permission to keep going: the round's run state plus an
/// optional stop queue for its own feature (player quit, level generator).
#[derive(Clone)]
pub(crate) struct Ticket {
    session: watch::Receiver<RunState>,
    stop: Option<watch::Receiver<bool>>,
}

impl Ticket {
    pub(crate) fn new(session: watch::Receiver<RunState>) -> Self {
        Self {
            session,
            stop: None,
        }
    }

    pub(crate) fn with_stop(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    fn halted(&self) -> bool {
        *self.session.borrow() == RunState::Stopped
            || self.stop.as_ref().map_or(false, |s| *s.borrow())
    }

    /// Loop-head check. Waits out a pause and returns false once stopped.
    pub(crate) async fn proceed(&mut self) -> bool {
        loop {
            if self.halted() {
                return false;
            }
            if *self.session.borrow_and_update() == RunState::Running {
                return true;
            }
            if !changed(&mut self.session, &mut self.stop).await {
                return false;
            }
        }
    }

    /// Sleeps `d` of running time, returning early with false if stopped
    /// meanwhile. The clock holds while the round is paused.
    pub(crate) async fn rest(&mut self, d: Duration) -> bool {
        let mut left = d;
        loop {
            let deadline = time::Instant::now() + left;
            let sleep = time::sleep_until(deadline);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => return true,
                    alive = changed(&mut self.session, &mut self.stop) => {
                        if !alive || self.halted() {
                            return false;
                        }
                    }
                }
                if *self.session.borrow() == RunState::Paused {
                    break;
                }
            }
            left = deadline.saturating_duration_since(time::Instant::now());
            if !self.proceed().await {
                return false;
            }
        }
    }
}

/// Resolves on the next change of either queue; false if a sender is gone.
async fn changed(
    session: &mut watch::Receiver<RunState>,
    stop: &mut Option<watch::Receiver<bool>>,
) -> bool {
    match stop {
        Some(stop) => tokio::select! {
            r = session.changed() => r.is_ok(),
            r = stop.changed() => r.is_ok(),
        },
        None => session.changed().await.is_ok(),
    }
}

/// Runs `fut` as its own task; a panic is logged and ends only that task.
pub(crate) fn spawn_actor<F>(label: impl Into<String>, fut: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let label = label.into();
    let inner = tokio::spawn(fut);
    tokio::spawn(async move {
        match inner.await {
            Ok(()) => debug!(actor = %label, "actor finished"),
            Err(e) if e.is_panic() => error!(actor = %label, "actor panicked: {e}"),
            Err(e) => debug!(actor = %label, "actor cancelled: {e}"),
        }
    })
}

pub(crate) async fn player_loop(player: PlayerId, tx: mpsc::Sender<Cmd>, mut ticket: Ticket) {
    while ticket.proceed().await {
        let (reply, rx) = oneshot::channel();
        if tx.send(Cmd::StepPlayer { player, reply }).await.is_err() {
            break;
        }
        match rx.await {
            Ok(PlayerTick::Continue(delay)) => {
                if !ticket.rest(delay).await {
                    break;
                }
            }
            Ok(PlayerTick::Finished) | Err(_) => break,
        }
    }
}

pub(crate) async fn patrol_loop(obstacle: ObstacleId, tx: mpsc::Sender<Cmd>, mut ticket: Ticket) {
    while ticket.proceed().await {
        let (reply, rx) = oneshot::channel();
        if tx.send(Cmd::StepObstacle { obstacle, reply }).await.is_err() {
            break;
        }
        match rx.await {
            Ok(Some(delay)) if ticket.rest(delay).await => {}
            _ => break,
        }
    }
}

/// Sends `make()` every `every` until stopped.
pub(crate) async fn generator<F>(every: Duration, tx: mpsc::Sender<Cmd>, mut ticket: Ticket, make: F)
where
    F: Fn() -> Cmd + Send + 'static,
{
    while ticket.rest(every).await && ticket.proceed().await {
        if tx.send(make()).await.is_err() {
            break;
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Fuse {
    pub(crate) arming: Duration,
    pub(crate) step: Duration,
    pub(crate) hold: Duration,
}

impl Fuse {
    pub(crate) fn from_rules(rules: &Rules) -> Self {
        Self {
            arming: rules.arming,
            step: rules.walker_step,
            hold: rules.blast_hold,
        }
    }
}

/// One bite going off: arm, paint every run, hold, clear every run, retire.
pub(crate) async fn explosion(
    bite: BiteId,
    paths: Vec<(Direction, Vec<Pos>)>,
    fuse: Fuse,
    tx: mpsc::Sender<Cmd>,
    mut ticket: Ticket,
) {
    if !ticket.rest(fuse.arming).await {
        return;
    }
    if !sweep(bite, &paths, Paint::Blast, fuse.step, &tx, &ticket).await {
        return;
    }
    if !ticket.rest(fuse.hold).await {
        return;
    }
    if !sweep(bite, &paths, Paint::Clear, fuse.step, &tx, &ticket).await {
        return;
    }
    let _ = tx.send(Cmd::RetireBite(bite)).await;
}

/// Runs one walker per path and waits for all of them.
async fn sweep(
    bite: BiteId,
    paths: &[(Direction, Vec<Pos>)],
    paint: Paint,
    step: Duration,
    tx: &mpsc::Sender<Cmd>,
    ticket: &Ticket,
) -> bool {
    let walkers: Vec<JoinHandle<()>> = paths
        .iter()
        .map(|(heading, cells)| {
            spawn_actor(
                format!("bite {} {paint:?} {heading:?}", bite.0),
                walker(cells.clone(), paint, step, tx.clone(), ticket.clone()),
            )
        })
        .collect();
    for w in walkers {
        let _ = w.await;
    }
    !ticket.halted()
}

pub(crate) async fn walker(
    cells: Vec<Pos>,
    paint: Paint,
    step: Duration,
    tx: mpsc::Sender<Cmd>,
    mut ticket: Ticket,
) {
    for pos in cells {
        if !ticket.proceed().await {
            return;
        }
        if tx.send(Cmd::Paint { pos, paint }).await.is_err() {
            return;
        }
        if !ticket.rest(step).await {
            return;
        }
    }
}

pub(crate) async fn item_timer(
    player: PlayerId,
    item: ItemId,
    lasts: Duration,
    tx: mpsc::Sender<Cmd>,
    mut ticket: Ticket,
) {
    if ticket.rest(lasts).await && ticket.proceed().await {
        let _ = tx.send(Cmd::ExpireItem { player, item }).await;
    }
}
