use crate::grid::{blocked_in_either, Grid, Pos, Style};
use crate::object::{Placed, PositionedObject};
use rand::Rng;

const PLACEMENT_ATTEMPTS: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BitMode {
    Static,
    Roaming,
    /// Left behind by a fallen player.
    DroppedRandom,
}

/// A point-value pickup.
#[derive(Clone, Debug)]
pub(crate) struct Bit {
    object: PositionedObject,
    points: u32,
    mode: BitMode,
}

impl Bit {
    pub(crate) fn new(pos: Pos, points: u32, mode: BitMode, glyph: char, style: Style) -> Self {
        Self {
            object: PositionedObject::new(pos, glyph, style, false),
            points,
            mode,
        }
    }

    pub(crate) fn points(&self) -> u32 {
        self.points
    }

    pub(crate) fn mode(&self) -> BitMode {
        self.mode
    }

    /// One random drift step to any of the eight neighbours, if that cell is open.
    pub(crate) fn roam<R: Rng + ?Sized>(&mut self, rng: &mut R, map: &Grid, overlay: &Grid) -> bool {
        let (dx, dy) = random_heading(rng);
        let to = self.pos().offset(dx, dy);
        if blocked_in_either(map, overlay, to) {
            return false;
        }
        self.object.step(dx, dy);
        true
    }
}

impl Placed for Bit {
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

/// A step in {-1,0,1}² other than standing still.
pub(crate) fn random_heading<R: Rng + ?Sized>(rng: &mut R) -> (i32, i32) {
    loop {
        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        if dx != 0 || dy != 0 {
            return (dx, dy);
        }
    }
}

/// Uniformly random interior cell open in both grids.
pub(crate) fn random_open_cell<R: Rng + ?Sized>(
    rng: &mut R,
    map: &Grid,
    overlay: &Grid,
) -> Option<Pos> {
    if map.width() < 3 || map.height() < 3 {
        return None;
    }
    for _ in 0..PLACEMENT_ATTEMPTS {
        let p = Pos::new(
            rng.gen_range(1..map.width() - 1),
            rng.gen_range(1..map.height() - 1),
        );
        if !blocked_in_either(map, overlay, p) {
            return Some(p);
        }
    }
    None
}

/// Cells for a line bonus: random orientation and length, every cell open.
/// Horizontal lines skip a column between bits to match the terminal aspect.
pub(crate) fn random_line<R: Rng + ?Sized>(
    rng: &mut R,
    map: &Grid,
    overlay: &Grid,
    min_len: usize,
    max_len: usize,
    h_spacing: i32,
) -> Vec<Pos> {
    let max_len = max_len.max(min_len).max(1);
    for _ in 0..PLACEMENT_ATTEMPTS {
        let len = rng.gen_range(min_len.max(1)..=max_len);
        let (dx, dy) = if rng.gen_bool(0.5) {
            (h_spacing.max(1), 0)
        } else {
            (0, 1)
        };
        let Some(start) = random_open_cell(rng, map, overlay) else {
            return Vec::new();
        };
        let line: Vec<Pos> = (0..len as i32)
            .map(|i| start.offset(dx * i, dy * i))
            .collect();
        if line.iter().all(|p| !blocked_in_either(map, overlay, *p)) {
            return line;
        }
    }
    Vec::new()
}
