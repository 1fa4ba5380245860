/// Events emitted by `step()` for the presentation layer (sound, messages).
/// The renderer does not depend on them: it redraws the whole world.

use crate::domain::entity::EntityId;
use crate::domain::grid::Direction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// The player moved. `pushed` lists the other entities that moved with it.
    Moved { direction: Direction, pushed: Vec<EntityId> },
    /// The push was refused; the player did not move.
    Refused { direction: Direction },
    /// A refused push that still left these entities shifted.
    Stranded { ids: Vec<EntityId> },
    LevelStarted { index: usize },
    LevelRestarted,
}
