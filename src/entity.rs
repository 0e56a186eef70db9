use crate::grid::{Grid, Pos, Style};
use crate::object::{Placed, PositionedObject};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub(crate) const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub(crate) fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub(crate) fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub(crate) fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Patrol {
    Advanced,
    Reversed,
}

/// A chain of segments where each one trails its predecessor by one tick.
/// Segment 0 is the head and always exists.
#[derive(Clone, Debug)]
pub(crate) struct Entity {
    segments: Vec<PositionedObject>,
    direction: Direction,
    speed: u32,
}

impl Entity {
    pub(crate) fn new(head: Pos, direction: Direction, speed: u32, glyph: char, style: Style) -> Self {
        Self {
            segments: vec![PositionedObject::new(head, glyph, style, true)],
            direction,
            speed: speed.max(1),
        }
    }

    /// A straight body of `len` segments laid out behind `head`, facing `direction`.
    pub(crate) fn straight(
        head: Pos,
        direction: Direction,
        len: usize,
        speed: u32,
        glyph: char,
        style: Style,
    ) -> Self {
        let mut e = Self::new(head, direction, speed, glyph, style);
        let (dx, dy) = direction.opposite().delta();
        for i in 1..len.max(1) as i32 {
            let p = head.offset(dx * i, dy * i);
            e.segments.push(PositionedObject::new(p, glyph, style, true));
        }
        e
    }

    /// Moves the head by (dx, dy); every trailing segment takes the spot its
    /// predecessor held before this call.
    pub(crate) fn move_by(&mut self, dx: i32, dy: i32) {
        self.segments[0].step(dx, dy);
        for i in 1..self.segments.len() {
            let to = self.segments[i - 1].prev();
            self.segments[i].follow(to);
        }
    }

    pub(crate) fn advance(&mut self) {
        let (dx, dy) = self.direction.delta();
        self.move_by(dx, dy);
    }

    /// Appends `n` segments where the tail just was, so growth shows no jump.
    pub(crate) fn add_segment(&mut self, n: usize, glyph: char, style: Style) {
        for _ in 0..n {
            let at = self.tail().prev();
            self.segments
                .push(PositionedObject::new(at, glyph, style, true));
        }
    }

    /// Trims up to `n` segments off the tail, never the head.
    #[cfg(test)]
    pub(crate) fn remove_segment(&mut self, n: usize) {
        let keep = self.segments.len().saturating_sub(n).max(1);
        self.segments.truncate(keep);
    }

    /// Tail becomes head and the heading flips.
    pub(crate) fn reverse(&mut self) {
        self.segments.reverse();
        self.direction = self.direction.opposite();
    }

    /// One patrol tick: advance, or turn around when the permanent map is in the way.
    pub(crate) fn patrol(&mut self, map: &Grid) -> Patrol {
        if map.is_blocked(self.next_head()) {
            self.reverse();
            Patrol::Reversed
        } else {
            self.advance();
            Patrol::Advanced
        }
    }

    pub(crate) fn next_head(&self) -> Pos {
        let (dx, dy) = self.direction.delta();
        self.head_pos().offset(dx, dy)
    }

    pub(crate) fn head_pos(&self) -> Pos {
        self.segments[0].pos()
    }

    fn tail(&self) -> &PositionedObject {
        &self.segments[self.segments.len() - 1]
    }

    pub(crate) fn segments(&self) -> &[PositionedObject] {
        &self.segments
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.segments.len()
    }

    pub(crate) fn direction(&self) -> Direction {
        self.direction
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn speed(&self) -> u32 {
        self.speed
    }

    /// Index of the first blocking segment at `p`.
    pub(crate) fn segment_at(&self, p: Pos) -> Option<usize> {
        self.segments
            .iter()
            .position(|s| s.blocked() && s.pos() == p)
    }

    pub(crate) fn restyle(&mut self, style: Style) {
        for s in &mut self.segments {
            s.set_style(style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snake(len: usize) -> Entity {
        Entity::straight(Pos::new(10, 5), Direction::Right, len, 1, 'o', Style::default())
    }

    fn positions(e: &Entity) -> Vec<Pos> {
        e.segments().iter().map(|s| s.pos()).collect()
    }

    #[test]
    fn straight_body_trails_behind_head() {
        let e = snake(4);
        assert_eq!(
            positions(&e),
            vec![
                Pos::new(10, 5),
                Pos::new(9, 5),
                Pos::new(8, 5),
                Pos::new(7, 5)
            ]
        );
    }

    #[test]
    fn each_segment_takes_its_predecessors_old_cell() {
        let mut e = snake(5);
        let turns = [
            Direction::Right,
            Direction::Down,
            Direction::Down,
            Direction::Left,
            Direction::Up,
            Direction::Left,
        ];
        for d in turns {
            let before = positions(&e);
            e.set_direction(d);
            e.advance();
            let after = positions(&e);
            for i in 1..after.len() {
                assert_eq!(after[i], before[i - 1], "segment {i} after {d:?}");
            }
            let (dx, dy) = d.delta();
            assert_eq!(after[0], before[0].offset(dx, dy));
        }
    }

    #[test]
    fn growth_lands_on_tail_previous_cell() {
        let mut e = snake(3);
        e.advance();
        let tail_prev = e.segments()[2].prev();
        e.add_segment(2, 'o', Style::default());
        assert_eq!(e.len(), 5);
        assert_eq!(e.segments()[3].pos(), tail_prev);
        e.advance();
        assert_eq!(e.segments()[3].pos(), e.segments()[2].prev());
    }

    #[test]
    fn single_segment_growth_starts_on_head_trail() {
        let mut e = Entity::new(Pos::new(10, 10), Direction::Right, 1, 'o', Style::default());
        e.advance();
        e.add_segment(1, 'o', Style::default());
        assert_eq!(positions(&e), vec![Pos::new(11, 10), Pos::new(10, 10)]);
    }

    #[test]
    fn remove_keeps_the_head() {
        let mut e = snake(4);
        e.remove_segment(2);
        assert_eq!(e.len(), 2);
        e.remove_segment(10);
        assert_eq!(e.len(), 1);
        assert_eq!(e.head_pos(), Pos::new(10, 5));
    }

    #[test]
    fn patrol_turns_around_at_the_wall() {
        let map = Grid::with_boundary(8, 5, '#', ' ', Style::default());
        let mut e = Entity::straight(Pos::new(5, 2), Direction::Right, 3, 1, '=', Style::default());
        assert_eq!(e.patrol(&map), Patrol::Advanced);
        assert_eq!(e.head_pos(), Pos::new(6, 2));
        assert_eq!(e.patrol(&map), Patrol::Reversed);
        assert_eq!(e.direction(), Direction::Left);
        assert_eq!(e.head_pos(), Pos::new(4, 2));
        assert_eq!(e.patrol(&map), Patrol::Advanced);
        assert_eq!(positions(&e), vec![Pos::new(3, 2), Pos::new(4, 2), Pos::new(5, 2)]);
        for _ in 0..20 {
            e.patrol(&map);
            for s in e.segments() {
                assert!(!map.is_blocked(s.pos()));
            }
        }
    }
}
