/// Grid model: cells, cardinal directions and the bounded board.
///
/// Everything here is pure. The board is fixed when a world is built and
/// never changes afterwards; all bounds checks go through `Board`.

use std::fmt;

/// A single integer-coordinate position. `(0, 0)` is the top-left cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One-cell move in a cardinal direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Right,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Right,
        Direction::Left,
    ];

    /// Unit step `(dx, dy)`. Screen coordinates: Up decreases y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Right => "right",
            Direction::Left => "left",
        };
        f.write_str(name)
    }
}

/// Board dimensions. Valid cells are `[0, width) × [0, height)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Board {
    pub width: usize,
    pub height: usize,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Board { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as usize) < self.width
            && (cell.y as usize) < self.height
    }

    /// Neighbour of `cell` one step in `direction`, or `None` when that
    /// step would leave the board.
    #[inline]
    pub fn offset(&self, direction: Direction, cell: Cell) -> Option<Cell> {
        let (dx, dy) = direction.delta();
        let next = Cell::new(cell.x + dx, cell.y + dy);
        if self.contains(next) { Some(next) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_moves_one_cell_in_each_direction() {
        let board = Board::new(10, 8);
        let c = Cell::new(4, 3);
        assert_eq!(board.offset(Direction::Up, c), Some(Cell::new(4, 2)));
        assert_eq!(board.offset(Direction::Down, c), Some(Cell::new(4, 4)));
        assert_eq!(board.offset(Direction::Right, c), Some(Cell::new(5, 3)));
        assert_eq!(board.offset(Direction::Left, c), Some(Cell::new(3, 3)));
    }

    #[test]
    fn offset_refuses_every_edge() {
        let board = Board::new(10, 8);
        assert_eq!(board.offset(Direction::Left, Cell::new(0, 4)), None);
        assert_eq!(board.offset(Direction::Up, Cell::new(4, 0)), None);
        assert_eq!(board.offset(Direction::Right, Cell::new(9, 4)), None);
        assert_eq!(board.offset(Direction::Down, Cell::new(4, 7)), None);
    }

    #[test]
    fn offset_along_an_edge_stays_valid() {
        let board = Board::new(10, 8);
        assert_eq!(board.offset(Direction::Down, Cell::new(0, 0)), Some(Cell::new(0, 1)));
        assert_eq!(board.offset(Direction::Left, Cell::new(9, 7)), Some(Cell::new(8, 7)));
    }

    #[test]
    fn contains_rejects_negative_and_overflow() {
        let board = Board::new(3, 2);
        assert!(board.contains(Cell::new(2, 1)));
        assert!(!board.contains(Cell::new(-1, 0)));
        assert!(!board.contains(Cell::new(3, 0)));
        assert!(!board.contains(Cell::new(0, 2)));
    }
}
