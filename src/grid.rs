use crossterm::style::Color;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Pos {
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl Pos {
    pub(crate) const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub(crate) fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Style {
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Style {
    pub(crate) const fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fg: Color::Grey,
            bg: Color::Black,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) glyph: char,
    pub(crate) style: Style,
    pub(crate) blocked: bool,
}

impl Cell {
    pub(crate) const fn open(glyph: char, style: Style) -> Self {
        Self {
            glyph,
            style,
            blocked: false,
        }
    }

    pub(crate) const fn solid(glyph: char, style: Style) -> Self {
        Self {
            glyph,
            style,
            blocked: true,
        }
    }
}

/// Fixed-size W×H cell grid, row-major.
///
/// The permanent map and the hazard overlay are both `Grid`s of the same
/// dimensions; movement treats a cell as blocked when either reports it.
#[derive(Clone, Debug)]
pub(crate) struct Grid {
    w: i32,
    h: i32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Fully open grid where every cell is `fill`.
    pub(crate) fn new(w: i32, h: i32, fill: Cell) -> Self {
        let w = w.max(1);
        let h = h.max(1);
        Self {
            w,
            h,
            cells: vec![fill; (w as usize) * (h as usize)],
        }
    }

    /// Grid with a blocked outer ring of `wall` and an open interior of `floor`.
    pub(crate) fn with_boundary(w: i32, h: i32, wall: char, floor: char, style: Style) -> Self {
        let mut grid = Self::new(w, h, Cell::open(floor, style));
        grid.init_boundary(wall, floor, style);
        grid
    }

    pub(crate) fn init_boundary(&mut self, wall: char, floor: char, style: Style) {
        for y in 0..self.h {
            for x in 0..self.w {
                let p = Pos::new(x, y);
                let cell = if self.is_border(p) {
                    Cell::solid(wall, style)
                } else {
                    Cell::open(floor, style)
                };
                let i = self.idx(p);
                self.cells[i] = cell;
            }
        }
    }

    pub(crate) fn width(&self) -> i32 {
        self.w
    }

    pub(crate) fn height(&self) -> i32 {
        self.h
    }

    fn idx(&self, p: Pos) -> usize {
        (p.y as usize) * (self.w as usize) + (p.x as usize)
    }

    pub(crate) fn contains(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.w && p.y < self.h
    }

    pub(crate) fn is_border(&self, p: Pos) -> bool {
        p.x == 0 || p.y == 0 || p.x == self.w - 1 || p.y == self.h - 1
    }

    pub(crate) fn get(&self, p: Pos) -> Option<&Cell> {
        if self.contains(p) {
            self.cells.get(self.idx(p))
        } else {
            None
        }
    }

    /// Writes `cell` at `p`; returns false when `p` is off the grid.
    pub(crate) fn set(&mut self, p: Pos, cell: Cell) -> bool {
        if !self.contains(p) {
            return false;
        }
        let i = self.idx(p);
        self.cells[i] = cell;
        true
    }

    /// Off-grid positions count as blocked.
    pub(crate) fn is_blocked(&self, p: Pos) -> bool {
        self.get(p).map_or(true, |c| c.blocked)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Pos, &Cell)> + '_ {
        let w = self.w;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, c)| (Pos::new(i as i32 % w, i as i32 / w), c))
    }
}

/// Movement view of the map with the hazard overlay layered on top.
pub(crate) fn blocked_in_either(map: &Grid, overlay: &Grid, p: Pos) -> bool {
    map.is_blocked(p) || overlay.is_blocked(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> Grid {
        Grid::with_boundary(10, 6, '#', ' ', Style::default())
    }

    #[test]
    fn boundary_ring_is_blocked_and_interior_open() {
        let g = map();
        for (p, cell) in g.iter() {
            assert_eq!(cell.blocked, g.is_border(p), "cell {p:?}");
            assert_eq!(cell.glyph, if g.is_border(p) { '#' } else { ' ' });
        }
    }

    #[test]
    fn off_grid_is_blocked() {
        let g = map();
        assert!(g.is_blocked(Pos::new(-1, 2)));
        assert!(g.is_blocked(Pos::new(3, 6)));
        assert!(g.get(Pos::new(10, 0)).is_none());
        assert!(!g.is_blocked(Pos::new(3, 3)));
    }

    #[test]
    fn overlay_blocks_on_top_of_open_floor() {
        let g = map();
        let mut overlay = Grid::new(10, 6, Cell::open(' ', Style::default()));
        let p = Pos::new(4, 3);
        assert!(!blocked_in_either(&g, &overlay, p));
        assert!(overlay.set(p, Cell::solid('░', Style::default())));
        assert!(blocked_in_either(&g, &overlay, p));
        assert!(!overlay.set(Pos::new(40, 3), Cell::solid('░', Style::default())));
    }

    #[test]
    fn iter_walks_row_major() {
        let g = map();
        let positions: Vec<Pos> = g.iter().map(|(p, _)| p).take(11).collect();
        assert_eq!(positions[0], Pos::new(0, 0));
        assert_eq!(positions[9], Pos::new(9, 0));
        assert_eq!(positions[10], Pos::new(0, 1));
    }
}
