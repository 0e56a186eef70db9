use crate::grid::Style;
use crate::player::PlayerState;
use crate::world::{Snapshot, Sprite};
use crossterm::{
    cursor,
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, x: u16, y: u16) -> Option<Cell> {
        (x < self.w && y < self.h).then(|| self.cells[self.idx(x, y)])
    }

    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }

    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            *c = Cell {
                ch: ' ',
                fg: Color::White,
                bg,
            };
        }
    }
}

pub(crate) struct Terminal {
    out: io::Stdout,
    cols: u16,
    rows: u16,
    prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        Ok(Self {
            out,
            cols,
            rows,
            prev: CellBuffer::new(cols, rows),
            cur: CellBuffer::new(cols, rows),
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        queue!(self.out, Clear(ClearType::All))?;
        Ok(true)
    }

    /// Writes the cells that changed since the last frame.
    pub(crate) fn present(&mut self) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, s: &str, fg: Color, bg: Color) {
    for (i, ch) in s.chars().enumerate() {
        let xx = x.saturating_add(i as u16);
        if xx >= buf.w || y >= buf.h {
            break;
        }
        buf.set(xx, y, Cell { ch, fg, bg });
    }
}

/// Board rows start below the one-line HUD.
pub(crate) const BOARD_TOP: u16 = 1;

fn put(buf: &mut CellBuffer, x: i32, y: i32, ch: char, style: Style) {
    let (Ok(x), Ok(y)) = (u16::try_from(x), u16::try_from(y)) else {
        return;
    };
    buf.set(
        x,
        y.saturating_add(BOARD_TOP),
        Cell {
            ch,
            fg: style.fg,
            bg: style.bg,
        },
    );
}

fn put_sprite(buf: &mut CellBuffer, s: &Sprite) {
    put(buf, s.pos.x, s.pos.y, s.glyph, s.style);
}

/// Map, then hazard overlay, then actors; players last so they stay visible.
pub(crate) fn draw_board(buf: &mut CellBuffer, snap: &Snapshot) {
    for (p, cell) in snap.map.iter() {
        put(buf, p.x, p.y, cell.glyph, cell.style);
    }
    for (p, cell) in snap.overlay.iter().filter(|(_, c)| c.blocked) {
        put(buf, p.x, p.y, cell.glyph, cell.style);
    }
    for s in snap
        .bits
        .iter()
        .chain(&snap.items)
        .chain(&snap.bites)
        .chain(&snap.obstacles)
    {
        put_sprite(buf, s);
    }
    for p in &snap.players {
        if p.state == PlayerState::Quit {
            continue;
        }
        // tail first so the head wins on overlap
        for s in p.body.iter().rev() {
            put_sprite(buf, s);
        }
    }
}

pub(crate) struct Hud<'a> {
    pub(crate) paused: bool,
    pub(crate) high_scores: &'a [(String, u32)],
}

pub(crate) fn draw_hud(buf: &mut CellBuffer, snap: &Snapshot, hud: &Hud<'_>) {
    let bg = Color::Black;
    let fg = Color::White;

    let mut line = format!("Level {}", snap.level);
    for p in &snap.players {
        line.push_str(&format!("  |  {} {}", p.name, p.score));
        if p.carrying > 0 {
            line.push_str(&format!(" [{}*]", p.carrying));
        }
        if p.phasing {
            line.push_str(" phasing");
        }
    }
    draw_text(buf, 1, 0, &line, fg, bg);

    let bottom = BOARD_TOP.saturating_add(snap.map.height() as u16);
    let help = if snap.players.len() > 1 {
        "wasd/f p1 | arrows/enter p2 | F12 pause | F1 restart | esc quit"
    } else {
        "wasd/arrows move | f use item | F12 pause | F1 restart | esc quit"
    };
    draw_text(buf, 1, bottom, help, Color::DarkGrey, bg);

    if snap.round_over {
        banner(buf, snap, "GAME OVER  (F1 to play again)", hud.high_scores);
    } else if hud.paused {
        banner(buf, snap, "PAUSED", &[]);
    }
}

fn banner(buf: &mut CellBuffer, snap: &Snapshot, title: &str, rows: &[(String, u32)]) {
    let fg = Color::Yellow;
    let bg = Color::Black;
    let mut lines = vec![title.to_string()];
    if !rows.is_empty() {
        lines.push(String::new());
        lines.push("High scores".to_string());
        for (name, score) in rows {
            lines.push(format!("{name:<16}{score:>6}"));
        }
    }
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
    let x = (snap.map.width() as u16).saturating_sub(width) / 2;
    let y = BOARD_TOP + (snap.map.height() as u16).saturating_sub(lines.len() as u16) / 2;
    for (i, l) in lines.iter().enumerate() {
        let pad = format!("{l:<w$}", w = width as usize);
        draw_text(buf, x, y + i as u16, &pad, fg, bg);
    }
}
