/// Entities: the player and pushable blocks.
///
/// An entity is nothing more than a shape (the cells it covers) and a kind
/// tag. The kind only matters to presentation; the push engine treats the
/// player and blocks identically.

use super::grid::{Board, Cell, Direction};

/// Stable index into the world's entity arena. Equal to registration
/// order, which is also the push tie-break order.
pub type EntityId = usize;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityKind {
    Player,
    /// A pushable block. `glyph` is the level-file character it came from.
    Block { glyph: char },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Entity {
    kind: EntityKind,
    shape: Vec<Cell>,
}

impl Entity {
    pub fn player(at: Cell) -> Self {
        Entity { kind: EntityKind::Player, shape: vec![at] }
    }

    pub fn block(glyph: char, shape: Vec<Cell>) -> Self {
        Entity { kind: EntityKind::Block { glyph }, shape }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    /// Cells currently covered, in shape order.
    pub fn occupies(&self) -> &[Cell] {
        &self.shape
    }

    /// Does any of our cells appear in `cells`?
    pub fn overlaps(&self, cells: &[Cell]) -> bool {
        self.shape.iter().any(|c| cells.contains(c))
    }

    /// The whole shape moved one step, or `None` if any single cell would
    /// leave the board. Never partially shifts.
    pub fn try_shift(&self, board: &Board, direction: Direction) -> Option<Vec<Cell>> {
        self.shape
            .iter()
            .map(|&c| board.offset(direction, c))
            .collect()
    }

    /// Swap in a new shape, returning the previous one.
    pub(crate) fn replace_shape(&mut self, shape: Vec<Cell>) -> Vec<Cell> {
        std::mem::replace(&mut self.shape, shape)
    }

    pub(crate) fn set_shape(&mut self, shape: Vec<Cell>) {
        self.shape = shape;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_block() -> Entity {
        Entity::block('a', vec![Cell::new(4, 3), Cell::new(4, 4), Cell::new(5, 4)])
    }

    #[test]
    fn shift_moves_every_cell() {
        let board = Board::new(10, 8);
        let shifted = l_block().try_shift(&board, Direction::Right);
        assert_eq!(
            shifted,
            Some(vec![Cell::new(5, 3), Cell::new(5, 4), Cell::new(6, 4)])
        );
    }

    #[test]
    fn shift_is_all_or_nothing() {
        // Only (5,4) would leave a 6-wide board; the whole shift is refused.
        let board = Board::new(6, 8);
        assert_eq!(l_block().try_shift(&board, Direction::Right), None);
    }

    #[test]
    fn empty_shape_always_shifts() {
        let board = Board::new(1, 1);
        let e = Entity::block('z', vec![]);
        assert_eq!(e.try_shift(&board, Direction::Left), Some(vec![]));
    }

    #[test]
    fn overlaps_is_set_intersection() {
        let e = l_block();
        assert!(e.overlaps(&[Cell::new(0, 0), Cell::new(5, 4)]));
        assert!(!e.overlaps(&[Cell::new(5, 3)]));
        assert!(!e.overlaps(&[]));
    }

    #[test]
    fn replace_shape_hands_back_old() {
        let mut e = Entity::player(Cell::new(0, 0));
        let old = e.replace_shape(vec![Cell::new(1, 0)]);
        assert_eq!(old, vec![Cell::new(0, 0)]);
        assert_eq!(e.occupies(), &[Cell::new(1, 0)]);
        assert!(e.is_player());
    }
}
