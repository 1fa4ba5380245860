/// World: the ordered entity arena for one puzzle.
///
/// Entities are addressed by `EntityId` (their index). Registration order
/// is significant: the push engine inspects overlapping entities in this
/// order. Bounds are validated once here; afterwards only the push engine
/// mutates shapes.

use thiserror::Error;

use super::entity::{Entity, EntityId};
use super::grid::{Board, Cell};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("board must be at least 1x1 (got {width}x{height})")]
    EmptyBoard { width: usize, height: usize },
    #[error("player id {id} is out of range ({len} entities)")]
    MissingPlayer { id: EntityId, len: usize },
    #[error("entity {id} is not a player")]
    NotAPlayer { id: EntityId },
    #[error("entity {id} covers {cell}, outside the {width}x{height} board")]
    OutOfBounds { id: EntityId, cell: Cell, width: usize, height: usize },
}

#[derive(Clone, Debug)]
pub struct World {
    board: Board,
    entities: Vec<Entity>,
    player: EntityId,
}

impl World {
    pub fn new(board: Board, entities: Vec<Entity>, player: EntityId) -> Result<Self, WorldError> {
        if board.is_empty() {
            return Err(WorldError::EmptyBoard { width: board.width, height: board.height });
        }
        match entities.get(player) {
            None => return Err(WorldError::MissingPlayer { id: player, len: entities.len() }),
            Some(e) if !e.is_player() => return Err(WorldError::NotAPlayer { id: player }),
            Some(_) => {}
        }
        for (id, entity) in entities.iter().enumerate() {
            if let Some(&cell) = entity.occupies().iter().find(|c| !board.contains(**c)) {
                return Err(WorldError::OutOfBounds {
                    id,
                    cell,
                    width: board.width,
                    height: board.height,
                });
            }
        }
        Ok(World { board, entities, player })
    }

    pub fn board(&self) -> Board {
        self.board
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// All entities in registration order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate()
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player(&self) -> &Entity {
        &self.entities[self.player]
    }

    /// Ids of every entity covering `cell`, in registration order.
    pub fn occupants(&self, cell: Cell) -> impl Iterator<Item = EntityId> + '_ {
        self.entities()
            .filter(move |(_, e)| e.occupies().contains(&cell))
            .map(|(id, _)| id)
    }

    // ── Engine access ──

    pub(crate) fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id]
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id]
    }

    pub(crate) fn shapes(&self) -> Vec<Vec<Cell>> {
        self.entities.iter().map(|e| e.occupies().to_vec()).collect()
    }

    pub(crate) fn restore_shapes(&mut self, shapes: Vec<Vec<Cell>>) {
        for (entity, shape) in self.entities.iter_mut().zip(shapes) {
            entity.set_shape(shape);
        }
    }
}
