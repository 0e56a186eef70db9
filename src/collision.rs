use crate::grid::{Grid, Pos};
use crate::item::ItemEffect;
use crate::object::Placed;
use crate::player::{Player, PlayerId};
use crate::world::Obstacle;

/// What stopped a move, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Blocker {
    Player(PlayerId),
    OwnBody,
    Map,
    Obstacle,
    Hazard,
}

/// Read-only view of everything a move can run into.
pub(crate) struct Scene<'a> {
    pub(crate) map: &'a Grid,
    pub(crate) overlay: &'a Grid,
    pub(crate) players: &'a [Player],
    pub(crate) obstacles: &'a [Obstacle],
}

/// Classifies a proposed head move. First match wins:
/// other living players, own body past the neck, permanent map,
/// patrolling obstacles, hazard overlay.
///
/// A mover with an active wall-pass only answers to the permanent map.
pub(crate) fn resolve(scene: &Scene<'_>, mover: &Player, target: Pos) -> Option<Blocker> {
    let phasing = mover.has_active(ItemEffect::WallPass);

    if !phasing {
        for other in scene.players {
            if other.id() == mover.id() || !other.is_alive() {
                continue;
            }
            if other.body().segment_at(target).is_some() {
                return Some(Blocker::Player(other.id()));
            }
        }

        // Segment 1 is vacated on the same tick the head moves, so the
        // head can never hit its own neck.
        let own = mover.body().segments();
        if own.iter().skip(2).any(|s| s.pos() == target) {
            return Some(Blocker::OwnBody);
        }
    }

    if scene.map.is_blocked(target) {
        return Some(Blocker::Map);
    }

    if phasing {
        return None;
    }

    if scene
        .obstacles
        .iter()
        .any(|o| o.body().segment_at(target).is_some())
    {
        return Some(Blocker::Obstacle);
    }

    if scene.overlay.is_blocked(target) {
        return Some(Blocker::Hazard);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Direction, Entity};
    use crate::grid::{Cell, Style};
    use crate::item::{Item, ItemId};
    use crate::player::Spawn;
    use crate::world::ObstacleId;
    use std::time::Duration;

    fn grids() -> (Grid, Grid) {
        (
            Grid::with_boundary(40, 20, '#', ' ', Style::default()),
            Grid::new(40, 20, Cell::open(' ', Style::default())),
        )
    }

    fn player(id: usize, at: Pos, direction: Direction) -> Player {
        Player::new(
            PlayerId(id),
            format!("p{id}"),
            Spawn { pos: at, direction },
            '█',
            Style::default(),
        )
    }

    #[test]
    fn moving_onto_another_player_blocks_only_the_mover() {
        let (map, overlay) = grids();
        let a = player(0, Pos::new(10, 10), Direction::Right);
        let b = player(1, Pos::new(11, 10), Direction::Up);
        let players = vec![a, b];
        let scene = Scene {
            map: &map,
            overlay: &overlay,
            players: &players,
            obstacles: &[],
        };
        assert_eq!(
            resolve(&scene, &players[0], Pos::new(11, 10)),
            Some(Blocker::Player(PlayerId(1)))
        );
        assert_eq!(resolve(&scene, &players[1], Pos::new(11, 9)), None);
    }

    #[test]
    fn dying_players_do_not_block() {
        let (map, overlay) = grids();
        let a = player(0, Pos::new(10, 10), Direction::Right);
        let mut b = player(1, Pos::new(11, 10), Direction::Up);
        b.die(Style::default());
        let players = vec![a, b];
        let scene = Scene {
            map: &map,
            overlay: &overlay,
            players: &players,
            obstacles: &[],
        };
        assert_eq!(resolve(&scene, &players[0], Pos::new(11, 10)), None);
    }

    #[test]
    fn neck_is_exempt_but_the_rest_of_the_body_is_not() {
        let (map, overlay) = grids();
        let mut p = player(0, Pos::new(10, 10), Direction::Right);
        for d in [Direction::Right, Direction::Right, Direction::Down, Direction::Left] {
            p.body_mut().set_direction(d);
            p.body_mut().advance();
            p.grow(1);
        }
        let players = vec![p];
        let scene = Scene {
            map: &map,
            overlay: &overlay,
            players: &players,
            obstacles: &[],
        };
        let segs: Vec<Pos> = players[0].body().segments().iter().map(|s| s.pos()).collect();
        assert_eq!(resolve(&scene, &players[0], segs[1]), None);
        for s in &segs[2..] {
            assert_eq!(resolve(&scene, &players[0], *s), Some(Blocker::OwnBody), "{s:?}");
        }
    }

    #[test]
    fn categories_follow_precedence() {
        let (map, mut overlay) = grids();
        let wall = Obstacle::new(
            ObstacleId(0),
            Entity::straight(Pos::new(20, 5), Direction::Left, 3, 1, '▒', Style::default()),
        );
        overlay.set(Pos::new(5, 5), Cell::solid('░', Style::default()));
        overlay.set(Pos::new(0, 5), Cell::solid('░', Style::default()));
        let players = vec![player(0, Pos::new(2, 2), Direction::Right)];
        let obstacles = vec![wall];
        let scene = Scene {
            map: &map,
            overlay: &overlay,
            players: &players,
            obstacles: &obstacles,
        };
        let me = &players[0];
        assert_eq!(resolve(&scene, me, Pos::new(0, 5)), Some(Blocker::Map));
        assert_eq!(resolve(&scene, me, Pos::new(21, 5)), Some(Blocker::Obstacle));
        assert_eq!(resolve(&scene, me, Pos::new(5, 5)), Some(Blocker::Hazard));
        assert_eq!(resolve(&scene, me, Pos::new(6, 6)), None);
    }

    #[test]
    fn wall_pass_only_respects_the_map() {
        let (map, mut overlay) = grids();
        overlay.set(Pos::new(5, 5), Cell::solid('░', Style::default()));
        let mut p = player(0, Pos::new(4, 5), Direction::Right);
        p.take_item(Item::new(
            ItemId(0),
            Pos::new(1, 1),
            ItemEffect::WallPass,
            Duration::from_secs(3),
            '*',
            Style::default(),
        ));
        p.activate_item();
        let players = vec![p, player(1, Pos::new(6, 5), Direction::Left)];
        let scene = Scene {
            map: &map,
            overlay: &overlay,
            players: &players,
            obstacles: &[],
        };
        assert_eq!(resolve(&scene, &players[0], Pos::new(5, 5)), None);
        assert_eq!(resolve(&scene, &players[0], Pos::new(6, 5)), None);
        assert_eq!(resolve(&scene, &players[0], Pos::new(4, 0)), Some(Blocker::Map));
    }

    #[test]
    fn outcome_ignores_player_order() {
        let (map, overlay) = grids();
        let a = player(0, Pos::new(10, 10), Direction::Right);
        let b = player(1, Pos::new(11, 10), Direction::Up);
        let c = player(2, Pos::new(12, 12), Direction::Up);
        let forward = vec![a.clone(), b.clone(), c.clone()];
        let backward = vec![c, b, a];
        for target in [Pos::new(11, 10), Pos::new(12, 12), Pos::new(3, 3), Pos::new(0, 0)] {
            let f = Scene { map: &map, overlay: &overlay, players: &forward, obstacles: &[] };
            let r = Scene { map: &map, overlay: &overlay, players: &backward, obstacles: &[] };
            assert_eq!(
                resolve(&f, &forward[0], target).is_some(),
                resolve(&r, &backward[2], target).is_some()
            );
        }
    }
}
