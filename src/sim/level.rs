/// Level loader.
///
/// ## Sources (in order):
///   1. Built-in levels (the sandbox is sized from `[board]` in config.toml)
///   2. `levels/` directory (individual `.txt` files, sorted by file name)
///
/// ## Level format (`.txt`):
///   ```text
///   # Level Name
///   @ a 3,4 5,4
///   P.....
///   .aa...
///   ```
///   Line 1 (optional): `# Level Name`
///   Optional, repeatable: `@ <glyph> x,y x,y ...` appends cells to that
///   block. Lets a level author stack blocks on top of each other, which
///   the map grid alone cannot express.
///   Remaining lines: map rows. Board = row count × longest row.
///
/// ## Legend:
///   'P'       = player (exactly one)
///   '.' / ' ' = empty
///   any other ASCII letter or digit = a block; every cell with the same
///   glyph belongs to the same block.
///
/// ## Registration order
///   Player first, then blocks in order of first appearance scanning rows
///   top to bottom, left to right, then blocks that only appear in `@`
///   lines, in line order. This is the push engine's tie-break order.

use std::path::Path;

use thiserror::Error;

use crate::config::GameConfig;
use crate::domain::entity::Entity;
use crate::domain::grid::{Board, Cell};
use crate::domain::world::{World, WorldError};

const PLAYER: char = 'P';

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level has no map rows")]
    Empty,
    #[error("no level number {}", .0 + 1)]
    NoSuchLevel(usize),
    #[error("level has no player 'P'")]
    NoPlayer,
    #[error("second player at {0}")]
    ExtraPlayer(Cell),
    #[error("unknown map character {ch:?} at {cell}")]
    BadGlyph { ch: char, cell: Cell },
    #[error("line {line}: {reason}")]
    BadMetadata { line: usize, reason: String },
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Parsed level, not yet turned into a world.
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
    /// Cells added through `@` lines, per glyph, in line order.
    pub extra_cells: Vec<(char, Vec<Cell>)>,
}

impl LevelDef {
    pub fn board(&self) -> Board {
        let width = self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        Board::new(width, self.rows.len())
    }

    /// Build a fresh world from this definition.
    pub fn build(&self) -> Result<World, LevelError> {
        if self.rows.is_empty() {
            return Err(LevelError::Empty);
        }

        let mut player: Option<Cell> = None;
        let mut blocks: Vec<(char, Vec<Cell>)> = Vec::new();

        for (y, row) in self.rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let cell = Cell::new(x as i32, y as i32);
                match ch {
                    '.' | ' ' => {}
                    PLAYER => {
                        if player.is_some() {
                            return Err(LevelError::ExtraPlayer(cell));
                        }
                        player = Some(cell);
                    }
                    c if c.is_ascii_alphanumeric() => add_cells(&mut blocks, c, &[cell]),
                    c => return Err(LevelError::BadGlyph { ch: c, cell }),
                }
            }
        }

        for (glyph, cells) in &self.extra_cells {
            add_cells(&mut blocks, *glyph, cells);
        }

        let player = player.ok_or(LevelError::NoPlayer)?;
        let mut entities = Vec::with_capacity(blocks.len() + 1);
        entities.push(Entity::player(player));
        entities.extend(blocks.into_iter().map(|(glyph, cells)| Entity::block(glyph, cells)));

        Ok(World::new(self.board(), entities, 0)?)
    }
}

fn add_cells(blocks: &mut Vec<(char, Vec<Cell>)>, glyph: char, cells: &[Cell]) {
    match blocks.iter_mut().find(|(g, _)| *g == glyph) {
        Some((_, shape)) => shape.extend_from_slice(cells),
        None => blocks.push((glyph, cells.to_vec())),
    }
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Every playable level: built-ins, then the levels directory.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let mut levels = embedded_levels(config.board);

    let dir = &config.levels_dir;
    if dir.is_dir() {
        let mut found = load_from_directory(dir);
        found.sort_by(|a, b| a.0.cmp(&b.0));
        log::debug!("levels: {} from {}", found.len(), dir.display());
        levels.extend(found.into_iter().map(|(_, def)| def));
    }

    levels
}

/// Parse a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows = vec![];
    let mut extra_cells: Vec<(char, Vec<Cell>)> = vec![];

    for (idx, line) in content.lines().enumerate() {
        if let Some(rest) = line.strip_prefix('#') {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
        } else if let Some(rest) = line.strip_prefix("@ ") {
            let (glyph, cells) = parse_extra_cells(rest)
                .map_err(|reason| LevelError::BadMetadata { line: idx + 1, reason })?;
            add_cells(&mut extra_cells, glyph, &cells);
        } else {
            rows.push(line.trim_end().to_string());
        }
    }

    while rows.last().map_or(false, |r| r.is_empty()) {
        rows.pop();
    }
    while rows.first().map_or(false, |r| r.is_empty()) {
        rows.remove(0);
    }
    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    // Pad ragged rows so the board is rectangular.
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let len = row.chars().count();
        row.extend(std::iter::repeat('.').take(width - len));
    }

    if name.is_empty() {
        name = "Untitled".to_string();
    }

    Ok(LevelDef { name, rows, extra_cells })
}

/// `a 3,4 5,4` → (`a`, [(3,4), (5,4)]).
fn parse_extra_cells(rest: &str) -> Result<(char, Vec<Cell>), String> {
    let mut parts = rest.split_whitespace();
    let glyph_str = parts.next().ok_or("missing block glyph")?;
    let mut chars = glyph_str.chars();
    let glyph = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() && c != PLAYER => c,
        _ => return Err(format!("{glyph_str:?} is not a block glyph")),
    };

    let mut cells = vec![];
    for pair in parts {
        let (x, y) = pair.split_once(',').ok_or_else(|| format!("bad cell {pair:?}"))?;
        match (x.trim().parse::<i32>(), y.trim().parse::<i32>()) {
            (Ok(x), Ok(y)) => cells.push(Cell::new(x, y)),
            _ => return Err(format!("bad cell {pair:?}")),
        }
    }
    if cells.is_empty() {
        return Err(format!("no cells listed for {glyph:?}"));
    }
    Ok((glyph, cells))
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("levels: cannot read {}: {e}", dir.display());
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(true, |e| e != "txt") {
            continue;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("levels: cannot read {}: {e}", path.display());
                continue;
            }
        };
        // Validate fully now so a broken file never reaches the game loop.
        match parse_level(&content).and_then(|def| def.build().map(|_| def)) {
            Ok(def) => {
                let filename = path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                results.push((filename, def));
            }
            Err(e) => log::warn!("levels: skipping {}: {e}", path.display()),
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Built-in levels
// ══════════════════════════════════════════════════════════════

/// The reference layout: player in the corner, one L-shaped block.
/// Block cells that do not fit a small board are dropped. An empty board
/// yields a definition that fails to build.
pub fn sandbox(board: Board) -> LevelDef {
    let mut rows: Vec<Vec<char>> = vec![vec!['.'; board.width]; board.height];
    if let Some(corner) = rows.first_mut().and_then(|row| row.first_mut()) {
        *corner = PLAYER;
    }
    for (x, y) in [(4, 3), (4, 4), (5, 4)] {
        if x < board.width && y < board.height {
            rows[y][x] = 'a';
        }
    }
    LevelDef {
        name: "Sandbox".to_string(),
        rows: rows.into_iter().map(|r| r.into_iter().collect()).collect(),
        extra_cells: vec![],
    }
}

fn embedded_levels(board: Board) -> Vec<LevelDef> {
    vec![
        sandbox(board),
        make_embedded("Freight Line", &[
            "..............",
            ".P............",
            "..............",
            "...aa..b..cc..",
            "...a...b...c..",
            ".......bb.....",
            "..............",
            "..dd......e...",
            "..d.......ee..",
            "..dd..........",
            "..............",
            "..............",
        ], &[]),
        make_embedded("Buffer Stop", &[
            "..........",
            "..........",
            "P.abcd....",
            "......e...",
            "..........",
            "..ff..gg..",
            "..ff..gg..",
            "..........",
        ], &[]),
        make_embedded("Stacked Crates", &[
            "..........",
            ".P........",
            "...aaa....",
            ".....b....",
            ".....b....",
            "..........",
            "...cc.....",
            "..........",
        ], &[('b', &[(5, 2)]), ('c', &[(3, 7)])]),
        // Pushing left from P: `a` hits `b` (free) and `c` (at the edge).
        // The push is refused, but `b` has already slid over.
        make_embedded("Stranded", &[
            ".......",
            ".......",
            "..baP..",
            "cca....",
            ".......",
            ".......",
        ], &[]),
    ]
}

fn make_embedded(name: &str, map: &[&str], extra: &[(char, &[(i32, i32)])]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
        extra_cells: extra
            .iter()
            .map(|(glyph, cells)| (*glyph, cells.iter().map(|&(x, y)| Cell::new(x, y)).collect()))
            .collect(),
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
