/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// Each frame is composed into `front`, compared against `back` (the
/// previous frame) and only changed cells are written. Commands are
/// batched with `queue!` and flushed once, then the buffers swap.
///
/// Board cells are two terminal columns wide. When entities share a cell
/// the one registered last is drawn and the cell gets an overlap mark.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{EntityId, EntityKind};
use crate::domain::grid::Cell as BoardCell;
use crate::domain::push::Rollback;
use crate::domain::world::World;
use crate::sim::world::{GameState, Phase};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, so the terminal default never
    /// shows through between rows.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from every real cell; forces a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Board occupancy ──

/// Top entity and occupant count per board cell, row-major.
fn occupancy(world: &World) -> Vec<(Option<EntityId>, usize)> {
    let board = world.board();
    let mut grid = Vec::with_capacity(board.width * board.height);
    for y in 0..board.height {
        for x in 0..board.width {
            let ids: Vec<EntityId> = world.occupants(BoardCell::new(x as i32, y as i32)).collect();
            grid.push((ids.last().copied(), ids.len()));
        }
    }
    grid
}

const BLOCK_COLORS: [Color; 6] = [
    Color::Rgb { r: 70, g: 130, b: 220 },
    Color::Rgb { r: 200, g: 90, b: 60 },
    Color::Rgb { r: 80, g: 170, b: 90 },
    Color::Rgb { r: 170, g: 90, b: 190 },
    Color::Rgb { r: 200, g: 160, b: 50 },
    Color::Rgb { r: 60, g: 170, b: 170 },
];

fn block_color(id: EntityId) -> Color {
    BLOCK_COLORS[id % BLOCK_COLORS.len()]
}

// ── Renderer ──

const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const FRAME_ROW: usize = 1;
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const BORDER: Color = Color::Rgb { r: 90, g: 90, b: 120 };
const ACCENT: Color = Color::Rgb { r: 255, g: 200, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }
        log::debug!("renderer: key release events {}", if self.enhanced_keys { "on" } else { "off" });

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, state: &GameState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(state.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(state.phase);
        }

        self.compose(state);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, state: &GameState) {
        self.front.clear();
        match state.phase {
            Phase::Title => self.compose_title(state),
            Phase::Playing => self.compose_game(state),
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, state: &GameState) {
        let world = &state.world;
        let board = world.board();

        // ── HUD row ──
        let mode = match state.rollback {
            Rollback::Branch => "",
            Rollback::Atomic => "  [atomic]",
        };
        let hud = format!(
            " Level {}/{}  {:<18} Moves:{:<5} Refused:{:<4}{}",
            state.current_level + 1, state.levels.len(), state.level_name,
            state.moves, state.refused, mode,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Frame ──
        let inner_w = board.width * CELL_W;
        let top = FRAME_ROW;
        let bottom = FRAME_ROW + board.height + 1;
        let right = inner_w + 1;
        for x in 1..right {
            self.front.set(x, top, Cell::new('─', BORDER, Color::Reset));
            self.front.set(x, bottom, Cell::new('─', BORDER, Color::Reset));
        }
        for y in top + 1..bottom {
            self.front.set(0, y, Cell::new('│', BORDER, Color::Reset));
            self.front.set(right, y, Cell::new('│', BORDER, Color::Reset));
        }
        self.front.set(0, top, Cell::new('┌', BORDER, Color::Reset));
        self.front.set(right, top, Cell::new('┐', BORDER, Color::Reset));
        self.front.set(0, bottom, Cell::new('└', BORDER, Color::Reset));
        self.front.set(right, bottom, Cell::new('┘', BORDER, Color::Reset));

        // ── Board ──
        let occ = occupancy(world);
        for gy in 0..board.height {
            for gx in 0..board.width {
                let (top_id, count) = occ[gy * board.width + gx];
                let col = 1 + gx * CELL_W;
                let row = FRAME_ROW + 1 + gy;
                let (lhs, rhs) = match top_id.and_then(|id| world.get(id).map(|e| (id, e.kind()))) {
                    Some((_, EntityKind::Player)) => (
                        Cell::new('@', ACCENT, Color::Reset),
                        Cell::new(' ', ACCENT, Color::Reset),
                    ),
                    Some((id, EntityKind::Block { glyph })) => (
                        Cell::new(glyph, Color::White, block_color(id)),
                        Cell::new(' ', Color::White, block_color(id)),
                    ),
                    None => (
                        Cell::new('·', Color::DarkGrey, Color::Reset),
                        Cell::new(' ', Color::DarkGrey, Color::Reset),
                    ),
                };
                let rhs = if count > 1 { Cell { ch: '+', ..rhs } } else { rhs };
                self.front.set(col, row, lhs);
                self.front.set(col + 1, row, rhs);
            }
        }

        // ── Message bar ──
        let msg_row = bottom + 1;
        if !state.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" » {} ", state.message), Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help = " ←→↑↓/WASD:Move  R:Restart  N/P:Level  ESC:Title";
        self.front.put_str(0, msg_row + 1, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_title(&mut self, state: &GameState) {
        let title = [
            r"  ___         _                 _    _ ",
            r" | _ \_  _ __| |_   __ _ _ _ __(_)__| |",
            r" |  _/ || (_-< ' \ / _` | '_/ _| / _` |",
            r" |_|  \_,_/__/_||_|\__, |_| \__|_\__,_|",
            r"                   |___/               ",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 1 + i, line, ACCENT, Color::Reset);
        }

        let base = 8;
        let first = state.levels.get(state.current_level).map_or("", |l| l.name.as_str());
        self.front.put_str(6, base, "ENTER   Start", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
        self.front.put_str(6, base + 1, "ESC     Quit", Color::White, Color::Reset);
        let info = format!("{} levels, starting at \"{}\"", state.levels.len(), first);
        self.front.put_str(6, base + 3, &info, Color::DarkGrey, Color::Reset);

        let help = [
            "Controls",
            "  ←→↑↓ / WASD   Move (pushes touching blocks)",
            "  R             Restart level",
            "  N / P         Next / previous level",
            "  ESC           Back to title",
        ];
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { ACCENT } else { Color::White };
            self.front.put_str(6, base + 5 + i, line, color, Color::Reset);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Entity;
    use crate::domain::grid::Board;
    use crate::sim::level::parse_level;
    use std::time::{Duration, Instant};

    fn row_text(buf: &FrameBuffer, y: usize) -> String {
        (0..buf.width).map(|x| buf.get(x, y).ch).collect::<String>().trim_end().to_string()
    }

    #[test]
    fn occupancy_prefers_later_entities_and_counts_overlaps() {
        let world = World::new(
            Board::new(3, 1),
            vec![
                Entity::player(BoardCell::new(0, 0)),
                Entity::block('a', vec![BoardCell::new(1, 0)]),
                Entity::block('b', vec![BoardCell::new(1, 0), BoardCell::new(2, 0)]),
            ],
            0,
        ).unwrap();
        let occ = occupancy(&world);
        assert_eq!(occ, vec![(Some(0), 1), (Some(2), 2), (Some(2), 1)]);
    }

    #[test]
    fn game_frame_shows_board_and_hud() {
        let levels = vec![parse_level("# Tiny\nPa.\n").unwrap()];
        let mut gs = GameState::new(levels, Rollback::Branch, Duration::ZERO).unwrap();
        crate::sim::step::load_level(&mut gs, 0, Instant::now()).unwrap();

        let mut r = Renderer::new();
        r.front.resize(60, 10);
        r.compose(&gs);

        assert!(row_text(&r.front, HUD_ROW).starts_with(" Level 1/1  Tiny"));
        assert_eq!(row_text(&r.front, FRAME_ROW + 1), "│@ a · │");
        assert_eq!(row_text(&r.front, FRAME_ROW + 3), " » Tiny");
    }

    #[test]
    fn title_frame_names_first_level() {
        let levels = vec![parse_level("# Opening\nP.\n").unwrap()];
        let gs = GameState::new(levels, Rollback::Branch, Duration::ZERO).unwrap();
        let mut r = Renderer::new();
        r.front.resize(60, 20);
        r.compose(&gs);
        assert!(row_text(&r.front, 11).contains("\"Opening\""));
    }
}
