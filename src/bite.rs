use crate::entity::Direction;
use crate::grid::{Pos, Style};
use crate::object::{Placed, PositionedObject};
use crate::theme;
use rand::Rng;

/// Which half-axes a Bite floods when it goes off.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Blast {
    Up,
    Down,
    Left,
    Right,
    All,
}

impl Blast {
    pub(crate) fn headings(self) -> &'static [Direction] {
        match self {
            Blast::Up => &[Direction::Up],
            Blast::Down => &[Direction::Down],
            Blast::Left => &[Direction::Left],
            Blast::Right => &[Direction::Right],
            Blast::All => &Direction::ALL,
        }
    }

    pub(crate) fn glyph(self) -> char {
        match self {
            Blast::Up => theme::BITE_UP,
            Blast::Down => theme::BITE_DOWN,
            Blast::Left => theme::BITE_LEFT,
            Blast::Right => theme::BITE_RIGHT,
            Blast::All => theme::BITE_ALL,
        }
    }

    /// Omni-directional when `omni`, otherwise one random half-axis.
    pub(crate) fn pick<R: Rng + ?Sized>(rng: &mut R, omni: bool) -> Blast {
        if omni {
            return Blast::All;
        }
        match rng.gen_range(0..4) {
            0 => Blast::Up,
            1 => Blast::Down,
            2 => Blast::Left,
            _ => Blast::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct BiteId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BiteState {
    Armed,
    Exploding,
}

/// A stationary hazard marker.
#[derive(Clone, Debug)]
pub(crate) struct Bite {
    id: BiteId,
    object: PositionedObject,
    blast: Blast,
    points: u32,
    state: BiteState,
}

impl Bite {
    pub(crate) fn new(id: BiteId, pos: Pos, blast: Blast, points: u32, style: Style) -> Self {
        Self {
            id,
            object: PositionedObject::new(pos, blast.glyph(), style, false),
            blast,
            points,
            state: BiteState::Armed,
        }
    }

    pub(crate) fn id(&self) -> BiteId {
        self.id
    }

    pub(crate) fn blast(&self) -> Blast {
        self.blast
    }

    pub(crate) fn points(&self) -> u32 {
        self.points
    }

    pub(crate) fn state(&self) -> BiteState {
        self.state
    }

    /// Switches to the exploding look. Returns false if already going off.
    pub(crate) fn ignite(&mut self, exploded: Style) -> bool {
        if self.state == BiteState::Exploding {
            return false;
        }
        self.state = BiteState::Exploding;
        self.object.set_style(exploded);
        true
    }

    /// One straight run of cells per heading, nearest cell first.
    ///
    /// Right/down runs end at the last interior column/row, left/up runs at
    /// index 2. Each run covers its own half-axis, so no two share a cell.
    pub(crate) fn walker_paths(&self, w: i32, h: i32) -> Vec<(Direction, Vec<Pos>)> {
        let o = self.pos();
        self.blast
            .headings()
            .iter()
            .map(|&d| {
                let cells: Vec<Pos> = match d {
                    Direction::Right => (o.x + 1..=w - 2).map(|x| Pos::new(x, o.y)).collect(),
                    Direction::Left => (2..o.x).rev().map(|x| Pos::new(x, o.y)).collect(),
                    Direction::Down => (o.y + 1..=h - 2).map(|y| Pos::new(o.x, y)).collect(),
                    Direction::Up => (2..o.y).rev().map(|y| Pos::new(o.x, y)).collect(),
                };
                (d, cells)
            })
            .collect()
    }
}

impl Placed for Bite {
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

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn bite(blast: Blast) -> Bite {
        Bite::new(BiteId(1), Pos::new(20, 20), blast, 50, Style::default())
    }

    #[test]
    fn omni_paths_reach_each_edge_without_overlap() {
        let (w, h) = (100, 35);
        let paths = bite(Blast::All).walker_paths(w, h);
        assert_eq!(paths.len(), 4);

        let mut seen = HashSet::new();
        for (_, cells) in &paths {
            for c in cells {
                assert!(seen.insert(*c), "{c:?} walked twice");
                assert_ne!(*c, Pos::new(20, 20));
            }
        }

        let get = |d: Direction| &paths.iter().find(|(h, _)| *h == d).expect("heading").1;
        let right = get(Direction::Right);
        assert_eq!(right.first(), Some(&Pos::new(21, 20)));
        assert_eq!(right.last(), Some(&Pos::new(w - 2, 20)));
        let left = get(Direction::Left);
        assert_eq!(left.first(), Some(&Pos::new(19, 20)));
        assert_eq!(left.last(), Some(&Pos::new(2, 20)));
        let down = get(Direction::Down);
        assert_eq!(down.first(), Some(&Pos::new(20, 21)));
        assert_eq!(down.last(), Some(&Pos::new(20, h - 2)));
        let up = get(Direction::Up);
        assert_eq!(up.first(), Some(&Pos::new(20, 19)));
        assert_eq!(up.last(), Some(&Pos::new(20, 2)));
    }

    #[test]
    fn single_heading_gets_one_walker() {
        let paths = bite(Blast::Left).walker_paths(100, 35);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].0, Direction::Left);
        assert_eq!(paths[0].1.len(), 18);
    }

    #[test]
    fn ignite_only_once() {
        let mut b = bite(Blast::Up);
        assert_eq!(b.glyph(), theme::BITE_UP);
        assert!(b.ignite(Style::default()));
        assert!(!b.ignite(Style::default()));
        assert_eq!(b.state(), BiteState::Exploding);
    }

    #[test]
    fn random_pick_is_never_omni() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            assert_ne!(Blast::pick(&mut rng, false), Blast::All);
        }
        assert_eq!(Blast::pick(&mut rng, true), Blast::All);
    }
}
