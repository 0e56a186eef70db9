use crate::entity::Direction;
use crate::grid::Pos;
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::info;

/// Something a level switches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Feature {
    InitialBits,
    TopUpBits,
    BitLines,
    WallPassItem(Pos),
    RoamBits,
    Hazards { omni: bool },
    Wall {
        head: Pos,
        direction: Direction,
        len: usize,
        speed: u32,
    },
}

impl Feature {
    /// Features that run as a periodic task until their level queue stops.
    pub(crate) fn is_generator(self) -> bool {
        !matches!(self, Feature::InitialBits | Feature::WallPassItem(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LevelPlan {
    pub(crate) level: u8,
    pub(crate) start: Vec<Feature>,
    /// Earlier levels whose generators this one shuts down.
    pub(crate) stop: Vec<u8>,
}

/// A patrolling wall pulled inside the boundary ring of a `w`×`h` map, its
/// body cut short where the map runs out behind the head.
fn wall(head: Pos, direction: Direction, len: usize, speed: u32, (w, h): (i32, i32)) -> Feature {
    let head = Pos::new(head.x.clamp(1, w - 2), head.y.clamp(1, h - 2));
    let room = match direction.opposite() {
        Direction::Right => w - 1 - head.x,
        Direction::Left => head.x,
        Direction::Down => h - 1 - head.y,
        Direction::Up => head.y,
    };
    Feature::Wall {
        head,
        direction,
        len: len.min(room.max(1) as usize),
        speed,
    }
}

pub(crate) fn plan_for(level: u8, w: i32, h: i32) -> LevelPlan {
    let (start, stop) = match level {
        1 => (
            vec![
                Feature::TopUpBits,
                Feature::BitLines,
                Feature::WallPassItem(Pos::new(w / 2 + 3, h / 2 + 3)),
                Feature::InitialBits,
            ],
            vec![],
        ),
        2 => (vec![Feature::RoamBits], vec![]),
        3 => (vec![Feature::Hazards { omni: true }], vec![]),
        4 => (
            vec![
                wall(Pos::new(16, h / 4), Direction::Left, 16, 2, (w, h)),
                wall(Pos::new(w - 15, h - h / 4), Direction::Right, 16, 2, (w, h)),
            ],
            vec![],
        ),
        5 => (vec![Feature::Hazards { omni: false }], vec![]),
        6 => (
            vec![
                wall(Pos::new(w / 4, 6), Direction::Up, 8, 1, (w, h)),
                wall(Pos::new(w / 4 + 1, 6), Direction::Up, 8, 1, (w, h)),
                wall(Pos::new(w - w / 4, h - 6), Direction::Down, 8, 1, (w, h)),
                wall(Pos::new(w - w / 4 - 1, h - 6), Direction::Down, 8, 1, (w, h)),
            ],
            vec![3],
        ),
        _ => (vec![], vec![]),
    };
    LevelPlan { level, start, stop }
}

/// Tracks the session level and owns one stop queue per reached level.
///
/// The level only ever goes up; a level's plan is handed out once.
pub(crate) struct LevelDirector {
    current: u8,
    thresholds: Vec<u32>,
    queues: BTreeMap<u8, watch::Sender<bool>>,
}

impl LevelDirector {
    pub(crate) fn new(thresholds: &[u32]) -> Self {
        let mut thresholds = thresholds.to_vec();
        thresholds.sort_unstable();
        Self {
            current: 0,
            thresholds,
            queues: BTreeMap::new(),
        }
    }

    pub(crate) fn current(&self) -> u8 {
        self.current
    }

    fn earned(&self, score: u32) -> u8 {
        let passed = self.thresholds.iter().filter(|t| score >= **t).count();
        u8::try_from(passed + 1).unwrap_or(u8::MAX)
    }

    /// Level 1, once per round.
    pub(crate) fn begin(&mut self, w: i32, h: i32) -> Option<LevelPlan> {
        if self.current >= 1 {
            return None;
        }
        self.current = 1;
        info!(level = 1, "level reached");
        Some(plan_for(1, w, h))
    }

    /// Plans for every level `score` reaches beyond the current one, in order.
    pub(crate) fn crossed(&mut self, score: u32, w: i32, h: i32) -> Vec<LevelPlan> {
        let target = self.earned(score);
        let mut plans = Vec::new();
        while self.current < target {
            self.current += 1;
            info!(level = self.current, score, "level reached");
            plans.push(plan_for(self.current, w, h));
        }
        plans
    }

    /// Subscribes to `level`'s stop queue, opening it on first use.
    pub(crate) fn open_queue(&mut self, level: u8) -> watch::Receiver<bool> {
        self.queues
            .entry(level)
            .or_insert_with(|| watch::channel(false).0)
            .subscribe()
    }

    pub(crate) fn stop_level(&mut self, level: u8) -> bool {
        match self.queues.remove(&level) {
            Some(tx) => {
                tx.send_replace(true);
                info!(level, "level generators stopped");
                true
            }
            None => false,
        }
    }

    /// Stops every queue opened so far.
    pub(crate) fn teardown(&mut self) {
        for (_, tx) in std::mem::take(&mut self.queues) {
            tx.send_replace(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn director() -> LevelDirector {
        LevelDirector::new(&[20, 40, 60, 80, 100])
    }

    #[test]
    fn crossing_a_threshold_starts_its_level_once() {
        let mut d = director();
        assert_eq!(d.begin(100, 35).map(|p| p.level), Some(1));
        assert!(d.begin(100, 35).is_none());

        assert!(d.crossed(10, 100, 35).is_empty());
        let plans = d.crossed(20, 100, 35);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].start, vec![Feature::RoamBits]);

        // a respawned player crossing 20 again changes nothing
        assert!(d.crossed(0, 100, 35).is_empty());
        assert!(d.crossed(25, 100, 35).is_empty());
        assert_eq!(d.current(), 2);
    }

    #[test]
    fn jumping_several_thresholds_yields_each_level_in_order() {
        let mut d = director();
        d.begin(100, 35);
        let levels: Vec<u8> = d.crossed(75, 100, 35).iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![2, 3, 4]);
        let levels: Vec<u8> = d.crossed(500, 100, 35).iter().map(|p| p.level).collect();
        assert_eq!(levels, vec![5, 6]);
        assert!(d.crossed(9999, 100, 35).is_empty());
    }

    #[test]
    fn level_six_retires_the_omni_hazards() {
        let plan = plan_for(6, 100, 35);
        assert_eq!(plan.stop, vec![3]);
        assert_eq!(plan.start.len(), 4);
        assert!(plan.start.iter().all(|f| f.is_generator()));
        assert!(!Feature::InitialBits.is_generator());
    }

    fn wall_cells(plan: &LevelPlan) -> Vec<Vec<Pos>> {
        plan.start
            .iter()
            .filter_map(|f| match *f {
                Feature::Wall {
                    head,
                    direction,
                    len,
                    ..
                } => {
                    let (dx, dy) = direction.opposite().delta();
                    Some((0..len as i32).map(|i| head.offset(dx * i, dy * i)).collect())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn walls_keep_their_size_on_the_default_map() {
        let lens: Vec<usize> = wall_cells(&plan_for(4, 100, 35)).iter().map(Vec::len).collect();
        assert_eq!(lens, vec![16, 16]);
        let lens: Vec<usize> = wall_cells(&plan_for(6, 100, 35)).iter().map(Vec::len).collect();
        assert_eq!(lens, vec![8, 8, 8, 8]);
    }

    #[test]
    fn walls_fit_inside_the_smallest_map() {
        let (w, h) = (20, 12);
        for level in [4, 6] {
            for cells in wall_cells(&plan_for(level, w, h)) {
                assert!(!cells.is_empty());
                for c in cells {
                    assert!(c.x >= 1 && c.x <= w - 2, "level {level}: {c:?}");
                    assert!(c.y >= 1 && c.y <= h - 2, "level {level}: {c:?}");
                }
            }
        }
    }

    #[test]
    fn stopping_signals_subscribers() {
        let mut d = director();
        let three = d.open_queue(3);
        let five = d.open_queue(5);
        assert!(!*three.borrow());
        assert!(d.stop_level(3));
        assert!(*three.borrow());
        assert!(!d.stop_level(3));
        assert!(!*five.borrow());
        d.teardown();
        assert!(*five.borrow());
    }
}
