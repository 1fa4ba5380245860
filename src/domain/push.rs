/// Push propagation: moves an entity one cell and shoves everything in
/// its way, recursively.
///
/// ## Algorithm
///
/// `resolve(e)`:
///   1. mark `e` visited
///   2. shift `e`'s shape; refuse if any cell would leave the board
///   3. tentatively install the shifted shape, keeping the old one
///   4. for every *unvisited* entity, in registration order, whose current
///      shape intersects `e`'s new shape: `resolve` it. On the first
///      refusal, put `e`'s old shape back and refuse.
///   5. otherwise `e`'s shift stands
///
/// The visited set belongs to one top-level call. It bounds recursion depth
/// by the entity count and makes mutually overlapping entities terminate.
///
/// ## Rollback scope
///
/// With `Rollback::Branch` a refusal only unwinds the entities on the
/// failing recursion path. A sibling branch that already committed (an
/// entity resolved earlier in step 4 of the same ancestor) keeps its shift
/// even though the push as a whole reports `false`. `Rollback::Atomic`
/// snapshots every shape first and restores them all on refusal.

use super::entity::EntityId;
use super::grid::Direction;
use super::world::World;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Rollback {
    /// Undo only the failing path; committed siblings stay moved.
    #[default]
    Branch,
    /// All-or-nothing: any refusal restores the whole world.
    Atomic,
}

/// What one top-level push did.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PushReport {
    /// True iff the mover's own shift was committed.
    pub accepted: bool,
    /// Entities whose shift stands after the call, in commit order.
    pub moved: Vec<EntityId>,
    /// Entities `resolve` was entered for, in visit order.
    pub visited: Vec<EntityId>,
}

impl PushReport {
    /// A refused push that still left some entities shifted.
    pub fn is_partial(&self) -> bool {
        !self.accepted && !self.moved.is_empty()
    }
}

/// Push `mover` one cell in `direction`. Returns true iff it moved.
pub fn push(world: &mut World, mover: EntityId, direction: Direction) -> bool {
    push_with(world, mover, direction, Rollback::Branch).accepted
}

pub fn push_with(
    world: &mut World,
    mover: EntityId,
    direction: Direction,
    rollback: Rollback,
) -> PushReport {
    if mover >= world.len() {
        log::warn!("push: no entity {mover} (world has {})", world.len());
        return PushReport::default();
    }

    let snapshot = match rollback {
        Rollback::Atomic => Some(world.shapes()),
        Rollback::Branch => None,
    };

    let mut chain = Chain::new(world, direction);
    let accepted = chain.resolve(mover);
    let Chain { visited_order, committed, .. } = chain;

    let moved = match (accepted, snapshot) {
        (false, Some(shapes)) => {
            world.restore_shapes(shapes);
            Vec::new()
        }
        _ => committed,
    };

    if !accepted {
        log::debug!(
            "push {direction} from entity {mover} refused; {} entities stay shifted",
            moved.len()
        );
    }

    PushReport { accepted, moved, visited: visited_order }
}

/// State of one propagation call tree.
struct Chain<'w> {
    world: &'w mut World,
    direction: Direction,
    visited: Vec<bool>,
    visited_order: Vec<EntityId>,
    committed: Vec<EntityId>,
}

impl<'w> Chain<'w> {
    fn new(world: &'w mut World, direction: Direction) -> Self {
        let n = world.len();
        Chain {
            world,
            direction,
            visited: vec![false; n],
            visited_order: Vec::with_capacity(n),
            committed: Vec::with_capacity(n),
        }
    }

    fn resolve(&mut self, id: EntityId) -> bool {
        self.visited[id] = true;
        self.visited_order.push(id);

        let board = self.world.board();
        let shifted = match self.world.entity(id).try_shift(&board, self.direction) {
            Some(cells) => cells,
            None => {
                log::debug!("entity {id} would leave the board moving {}", self.direction);
                return false;
            }
        };
        let old = self.world.entity_mut(id).replace_shape(shifted);

        // Visited flags are re-read per candidate: a deeper branch may have
        // claimed a later entity already.
        for other in 0..self.world.len() {
            if self.visited[other] {
                continue;
            }
            let blocking = self.world.entity(other).overlaps(self.world.entity(id).occupies());
            if blocking && !self.resolve(other) {
                self.world.entity_mut(id).set_shape(old);
                return false;
            }
        }

        self.committed.push(id);
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Entity;
    use crate::domain::grid::{Board, Cell};

    fn cells(pairs: &[(i32, i32)]) -> Vec<Cell> {
        pairs.iter().map(|&(x, y)| Cell::new(x, y)).collect()
    }

    /// Player is always entity 0; blocks follow in the given order.
    fn world(w: usize, h: usize, player: (i32, i32), blocks: &[&[(i32, i32)]]) -> World {
        let mut entities = vec![Entity::player(Cell::new(player.0, player.1))];
        for (i, b) in blocks.iter().enumerate() {
            entities.push(Entity::block((b'a' + i as u8) as char, cells(b)));
        }
        World::new(Board::new(w, h), entities, 0).unwrap()
    }

    fn shape(world: &World, id: EntityId) -> Vec<Cell> {
        world.get(id).unwrap().occupies().to_vec()
    }

    // ── Single entity ──

    #[test]
    fn move_into_empty_space_commits() {
        let mut w = world(10, 8, (3, 3), &[]);
        assert!(push(&mut w, 0, Direction::Down));
        assert_eq!(shape(&w, 0), cells(&[(3, 4)]));
    }

    #[test]
    fn every_direction_offsets_by_one() {
        for d in Direction::ALL {
            let mut w = world(10, 8, (5, 5), &[]);
            assert!(push(&mut w, 0, d));
            let (dx, dy) = d.delta();
            assert_eq!(shape(&w, 0), cells(&[(5 + dx, 5 + dy)]));
        }
    }

    #[test]
    fn left_edge_refuses_and_changes_nothing() {
        let mut w = world(10, 8, (0, 4), &[&[(3, 3), (3, 4)]]);
        let before = w.shapes();
        assert!(!push(&mut w, 0, Direction::Left));
        assert_eq!(w.shapes(), before);
    }

    #[test]
    fn multi_cell_block_refuses_when_one_cell_leaves() {
        let mut w = world(6, 4, (5, 3), &[&[(0, 1), (1, 1)]]);
        assert!(!push(&mut w, 1, Direction::Left));
        assert_eq!(shape(&w, 1), cells(&[(0, 1), (1, 1)]));
    }

    #[test]
    fn empty_shape_moves_vacuously() {
        let mut w = world(4, 4, (3, 3), &[&[]]);
        let report = push_with(&mut w, 1, Direction::Left, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.moved, vec![1]);
        assert!(shape(&w, 1).is_empty());
        assert_eq!(shape(&w, 0), cells(&[(3, 3)]));
    }

    #[test]
    fn unknown_mover_is_refused() {
        let mut w = world(4, 4, (0, 0), &[]);
        let report = push_with(&mut w, 7, Direction::Right, Rollback::Branch);
        assert_eq!(report, PushReport::default());
    }

    // ── Chains ──

    #[test]
    fn chain_moves_everything_by_same_offset() {
        // Player pushes the reference L-block right.
        let mut w = world(10, 8, (3, 3), &[&[(4, 3), (4, 4), (5, 4)]]);
        assert!(push(&mut w, 0, Direction::Right));
        assert_eq!(shape(&w, 0), cells(&[(4, 3)]));
        assert_eq!(shape(&w, 1), cells(&[(5, 3), (5, 4), (6, 4)]));
    }

    #[test]
    fn long_chain_propagates_through_all() {
        let mut w = world(8, 1, (0, 0), &[&[(1, 0)], &[(2, 0)], &[(3, 0)]]);
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.moved, vec![3, 2, 1, 0]);
        for id in 0..4 {
            assert_eq!(shape(&w, id), cells(&[(id as i32 + 1, 0)]));
        }
    }

    #[test]
    fn blocked_chain_rolls_back_every_ancestor() {
        // A(player) -> B -> C, C already at the right edge.
        let mut w = world(4, 1, (1, 0), &[&[(2, 0)], &[(3, 0)]]);
        let before = w.shapes();
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(!report.accepted);
        assert!(report.moved.is_empty());
        assert_eq!(report.visited, vec![0, 1, 2]);
        assert_eq!(w.shapes(), before);
    }

    #[test]
    fn non_touching_blocks_are_left_alone() {
        let mut w = world(10, 8, (1, 1), &[&[(2, 1)], &[(2, 2)]]);
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![0, 1]);
        assert_eq!(shape(&w, 2), cells(&[(2, 2)]));
    }

    // ── Cycles ──

    #[test]
    fn mutual_overlap_terminates_and_visits_each_once() {
        // After shifting, B lands inside A's tentative shape; A is already
        // visited so B does not recurse back into it.
        let mut w = world(6, 3, (0, 2), &[&[(1, 1), (2, 1)], &[(2, 1)]]);
        let report = push_with(&mut w, 1, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![1, 2]);
        assert_eq!(shape(&w, 1), cells(&[(2, 1), (3, 1)]));
        assert_eq!(shape(&w, 2), cells(&[(3, 1)]));
    }

    #[test]
    fn entities_stacked_on_same_cell_move_together() {
        let mut w = world(5, 1, (0, 0), &[&[(1, 0)], &[(1, 0)]]);
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![0, 1, 2]);
        assert_eq!(shape(&w, 1), cells(&[(2, 0)]));
        assert_eq!(shape(&w, 2), cells(&[(2, 0)]));
    }

    // ── Ordering ──

    #[test]
    fn overlapping_candidates_resolve_in_registration_order() {
        // Player's wide shove hits two blocks; the lower-numbered one goes first
        // regardless of where it sits.
        let mut entities = vec![
            Entity::player(Cell::new(0, 0)),
            Entity::block('a', cells(&[(2, 2)])),
            Entity::block('b', cells(&[(2, 1)])),
        ];
        entities[0].set_shape(cells(&[(1, 1), (1, 2)]));
        let mut w = World::new(Board::new(6, 4), entities, 0).unwrap();
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![0, 1, 2]);
        assert_eq!(report.moved, vec![1, 2, 0]);
    }

    #[test]
    fn entity_claimed_by_deeper_branch_is_not_revisited() {
        // A hits B and C; B also hits C. C is resolved inside B's branch and
        // skipped when A reaches it.
        let mut w = world(
            8, 2,
            (0, 0),
            &[&[(1, 0), (1, 1)], &[(2, 1)], &[(2, 0), (3, 1)]],
        );
        // entity 1 = A, 2 = B, 3 = C
        let report = push_with(&mut w, 1, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![1, 2, 3]);
        assert_eq!(shape(&w, 3), cells(&[(3, 0), (4, 1)]));
    }

    #[test]
    fn shape_with_duplicate_cells_shifts_and_pushes() {
        let mut w = world(5, 1, (0, 0), &[&[(1, 0), (1, 0), (2, 0)]]);
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.moved, vec![1, 0]);
        assert_eq!(shape(&w, 0), cells(&[(1, 0)]));
        assert_eq!(shape(&w, 1), cells(&[(2, 0), (2, 0), (3, 0)]));
    }

    // ── Rollback scope ──

    /// Width 5, order [player, A, B, C]. A's shifted (2,2) hits B (free);
    /// its shifted (1,3) hits C, which sits at the left edge.
    fn stranded_world() -> World {
        world(
            5, 5,
            (4, 0),
            &[&[(3, 2), (2, 3)], &[(2, 2)], &[(1, 3), (0, 3)]],
        )
    }

    #[test]
    fn branch_rollback_keeps_committed_sibling() {
        let mut w = stranded_world();
        let report = push_with(&mut w, 1, Direction::Left, Rollback::Branch);
        assert!(!report.accepted);
        assert!(report.is_partial());
        assert_eq!(report.moved, vec![2]);
        assert_eq!(shape(&w, 1), cells(&[(3, 2), (2, 3)]));
        assert_eq!(shape(&w, 2), cells(&[(1, 2)]));
        assert_eq!(shape(&w, 3), cells(&[(1, 3), (0, 3)]));
    }

    #[test]
    fn plain_push_reports_false_for_partial_commit() {
        let mut w = stranded_world();
        assert!(!push(&mut w, 1, Direction::Left));
        assert_eq!(shape(&w, 2), cells(&[(1, 2)]));
    }

    #[test]
    fn atomic_rollback_restores_everything() {
        let mut w = stranded_world();
        let before = w.shapes();
        let report = push_with(&mut w, 1, Direction::Left, Rollback::Atomic);
        assert!(!report.accepted);
        assert!(report.moved.is_empty());
        assert_eq!(w.shapes(), before);
    }

    #[test]
    fn atomic_success_matches_branch_success() {
        let mut a = world(10, 8, (3, 3), &[&[(4, 3), (4, 4), (5, 4)]]);
        let mut b = a.clone();
        let ra = push_with(&mut a, 0, Direction::Right, Rollback::Atomic);
        let rb = push_with(&mut b, 0, Direction::Right, Rollback::Branch);
        assert_eq!(ra, rb);
        assert_eq!(a.shapes(), b.shapes());
    }

    #[test]
    fn visited_state_does_not_leak_between_pushes() {
        let mut w = world(6, 1, (0, 0), &[&[(1, 0)]]);
        assert!(push(&mut w, 0, Direction::Right));
        let report = push_with(&mut w, 0, Direction::Right, Rollback::Branch);
        assert!(report.accepted);
        assert_eq!(report.visited, vec![0, 1]);
        assert_eq!(shape(&w, 1), cells(&[(3, 0)]));
    }
}
